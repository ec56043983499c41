mod cart;
mod catalog;
mod job;
mod order;
mod order_status;
mod product;
mod user;

pub use cart::*;
pub use catalog::*;
pub use job::*;
pub use order::*;
pub use order_status::*;
pub use product::*;
pub use user::*;

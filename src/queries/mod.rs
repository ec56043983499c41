pub mod cart_queries;
pub mod catalog_queries;
pub mod checkout_queries;
pub mod job_queries;
pub mod order_queries;
pub mod product_queries;
pub mod user_queries;

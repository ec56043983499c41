pub mod checkout;
pub mod email_service;
pub mod image_service;
pub mod invoice_service;
pub mod job_service;
pub mod payment_service;
pub mod render_service;
pub mod storage_service;
pub mod tax_service;

#[cfg(test)]
pub(crate) mod testing;

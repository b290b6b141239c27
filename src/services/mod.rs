pub mod form_service;
pub mod frame_service;
pub mod otp_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use form_service::*;
pub use frame_service::*;
pub use otp_service::*;

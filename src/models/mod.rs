pub mod common;
pub mod lead;
pub mod otp;
pub mod page;

pub use common::*;
pub use lead::*;
pub use otp::*;
pub use page::*;

pub mod lead_api;

pub use lead_api::*;

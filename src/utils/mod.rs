pub mod clock;
pub mod email;
pub mod page;

pub use clock::*;
pub use email::*;
pub use page::*;

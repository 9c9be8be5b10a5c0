//! Command implementations.

pub mod export;
pub mod extract;

pub use self::export::execute_export;
pub use self::extract::execute_extract;

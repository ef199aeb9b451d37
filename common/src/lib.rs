//! Wire types and helpers shared by the classifier backend clients.

pub mod types;
pub mod utils;

pub use types::*;

//! Shared utility helpers.

pub mod error;
pub mod retry;

pub use error::{TileMatchError, TileMatchResult};
pub use retry::RetryPolicy;

//! Types shared by the Tuenti SDK crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

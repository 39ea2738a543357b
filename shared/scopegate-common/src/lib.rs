//! Scopegate Common Library
//!
//! Wire types shared by the server and the services that call it.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

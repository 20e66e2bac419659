//! tablecheck Common Library
//!
//! Wire contract shared by the harness and the mock services used in its
//! tests: endpoint paths, request/response bodies and error types.

pub mod api;
pub mod error;

pub use api::*;
pub use error::{Error, Result};

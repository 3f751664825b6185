//! Request module
//!
//! Raw historical queries, their validated canonical form and the cache key
//! derived from it.

pub mod descriptor;
pub mod validator;

pub use descriptor::*;
pub use validator::*;

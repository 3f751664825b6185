//! Producer module
//!
//! Everything that touches the external bar producer: building and running
//! the command, sorting its stderr chatter, and reading its data lines.

pub mod classifier;
pub mod invoker;
pub mod parser;

pub use classifier::*;
pub use invoker::*;
pub use parser::*;

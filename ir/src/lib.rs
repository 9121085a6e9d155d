#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod attr;
pub mod diagnostics;
pub mod dialect;
pub mod error;
pub mod module;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod registry;
pub mod rewrite;
pub mod traits;

pub use module::{Module, OpRef};
pub use ops::{OpId, OpKind, OperationState, ValueId};
pub use registry::Registry;

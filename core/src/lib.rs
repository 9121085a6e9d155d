#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod apint;
pub mod error;
pub mod mod_arith;
pub mod rlwe;
pub mod types;

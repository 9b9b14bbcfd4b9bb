//! Filter module.
//!
//! Contains the filter registry and the built-in provider libraries.

pub mod builtin;
pub mod registry;

pub use builtin::BuiltinFilter;
pub use registry::{FilterFactory, FilterRegistry, RegistryBuilder, SharedRegistry};

//! Core types and traits for filterstack.
//!
//! This module contains the foundational types the engine is built on:
//! - Parameter values and images
//! - Filter stack entries and dialog requests
//! - The filter trait and its metadata
//! - Error types and configuration

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod node;
pub mod types;

// Re-export commonly used types
pub use config::{EditorConfig, LoadOptions, StackOptions};
pub use context::ParameterContext;
pub use error::{DocumentId, EngineError, FilterError, FilterId};
pub use filter::{FilterRequest, FilterSpec};
pub use node::{Category, Filter, FilterMetadata};
pub use types::{ImageValue, Library, ParamValue, Parameters};

//! # Filterstack - Filter Stack Evaluation for Image Editors
//!
//! Filterstack is the engine behind an interactive image-filter editor. Each
//! open document owns an ordered stack of filters applied to a base image;
//! the engine evaluates the stack, previews speculative edits, and memoizes
//! composed results by a fingerprint of the stack configuration.
//!
//! ## Features
//!
//! - **Filter stacks**: add, remove, toggle, reorder and re-parameterize stages
//! - **Previews**: evaluate a hypothetical stack without committing it
//! - **Result caching**: configurations seen before are served from the cache
//! - **Precise eviction**: deleting a filter drops exactly the results it took part in
//! - **Filter libraries**: `opencv`, `scikit`, `pil` and `composite` providers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filterstack::prelude::*;
//!
//! let mut workspace = Workspace::default();
//! let doc = workspace.open_path("input.png")?;
//!
//! let blur = FilterRequest::new(
//!     Library::OpenCv,
//!     "gaussian",
//!     Parameters::new().with("kernel_size", 5).with("sigma", 1.5),
//! );
//!
//! // Slider ticks preview, the OK button commits.
//! workspace.dispatch(doc, SessionEvent::Preview(blur.clone()))?;
//! workspace.dispatch(doc, SessionEvent::Apply(blur))?;
//!
//! let stack = workspace.document(doc).unwrap().stack();
//! stack.current_image().image().save("output.png")?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: parameter values, images, stack entries, errors and configuration
//! - [`filters`]: the filter registry and the built-in libraries
//! - [`stack`]: per-document stacks, replay, fingerprints and the result cache
//! - [`session`]: open dialog sessions
//! - [`workspace`]: open documents and event routing
//!
//! ## Custom Filters
//!
//! Implement [`Filter`](core::node::Filter) and register a factory:
//!
//! ```rust,ignore
//! use filterstack::prelude::*;
//! use image::DynamicImage;
//!
//! struct Posterize(Parameters);
//!
//! impl Filter for Posterize {
//!     fn metadata(&self) -> FilterMetadata {
//!         FilterMetadata::builder(Library::Pil, "posterize", "Posterize")
//!             .category(Category::Adjust)
//!             .build()
//!     }
//!
//!     fn apply(&self, image: &DynamicImage) -> FilterResult<DynamicImage> {
//!         // ...
//!         Ok(image.clone())
//!     }
//! }
//!
//! let mut registry = FilterRegistry::with_builtins();
//! registry.register(|parameters| Box::new(Posterize(parameters)) as Box<dyn Filter>);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod filters;
pub mod session;
pub mod stack;
pub mod workspace;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use filterstack::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{ImageMetadata, ImageValue, Library, ParamValue, Parameters};

    // Stack entries
    pub use crate::core::filter::{FilterRequest, FilterSpec};

    // Filter trait and metadata
    pub use crate::core::node::{Category, Filter, FilterMetadata, ParameterDefinition};

    // Parameter access
    pub use crate::core::context::ParameterContext;

    // Configuration
    pub use crate::core::config::{EditorConfig, LoadOptions, StackOptions};

    // Errors
    pub use crate::core::error::{
        DocumentId, EngineError, EngineResult, FilterError, FilterId, FilterResult,
    };

    // Filters
    pub use crate::filters::builtin::BuiltinFilter;
    pub use crate::filters::registry::{FilterFactory, FilterRegistry, RegistryBuilder, SharedRegistry};

    // Stacks
    pub use crate::stack::{replay, CacheStats, FilterStack, Fingerprint, Replay, StackCache, StackStatus};

    // Sessions and documents
    pub use crate::session::{Session, SessionEvent, SessionKey, SessionRegistry};
    pub use crate::workspace::{DispatchOutcome, Document, Workspace};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

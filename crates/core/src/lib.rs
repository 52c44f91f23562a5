//! Merge per-service OpenAPI TypeScript clients into one library.
//!
//! Each service's generated tree is folded into a shared layout: identical
//! artifacts move to `common/`, same-named but different models get a
//! service prefix, string enums and response envelopes are consolidated in
//! `types/index.ts`, the HTTP primitives become one runtime module, and every
//! import is re-pointed at the new locations.

pub mod client;
pub mod collision;
pub mod enums;
pub mod envelope;
pub mod error;
pub mod fsutil;
pub mod generator;
pub mod layout;
pub mod loader;
pub mod migration;
pub mod openapi;
pub mod paths;
pub mod pipeline;
pub mod relocation;
pub mod rewrite;
pub mod runtime;
pub mod shared;
pub mod ts;
pub mod types_index;

// Re-export commonly used types
pub use error::{MergeError, Result};
pub use generator::{ClientGenerator, CommandGenerator};
pub use layout::{ArtifactKind, OutputLayout};
pub use loader::{DEFAULT_FETCH_TIMEOUT, SpecDocument, SpecLoader};
pub use migration::MigrationRecord;
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use relocation::RelocationMap;

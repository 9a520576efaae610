//! Source acquisition for the ffpkg recipe.
//!
//! Produces a `SourceTree`: the upstream archive fetched, checked against its
//! pinned SHA-256, extracted, renamed to a fixed location, and patched so the
//! library builds without its generated configuration header.
//!
//! # Pipeline
//!
//! ```text
//! SourceSpec --fetch--> <workdir>/ffms2-<rev>/ --rename--> <workdir>/source_subfolder/
//!            --exports--> + CMakeLists.txt --patch--> SourceTree
//! ```

pub mod error;
pub mod fetch;
pub mod fs;
pub mod integrity;
pub mod patch;
pub mod tree;

pub use error::{Result, SourceError};
pub use fetch::{ArchiveFetcher, LocalTreeFetcher, SourceFetcher, SourceSpec};
pub use integrity::ContentHash;
pub use patch::{ffms2_patches, Patch, PatchSet};
pub use tree::{prepare_source, ExportedFile, SourceTree, SOURCE_SUBFOLDER};

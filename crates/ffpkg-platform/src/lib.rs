//! Target platform descriptors for the ffpkg recipe.
//!
//! A build is described by three pieces:
//! - **Descriptor:** target OS, compiler family, architecture, build type
//! - **Host:** the machine running the build (and any Windows subsystem)
//! - **Profile:** a `.profile.toml` file carrying a descriptor on disk

pub mod descriptor;
pub mod error;
pub mod host;
pub mod profile;

pub use descriptor::{Arch, BuildType, CompilerFamily, OperatingSystem, PlatformDescriptor};
pub use error::{PlatformError, Result};
pub use host::{BuildHost, Subsystem};
pub use profile::{load_profile, parse_profile, profile_to_toml, validate_descriptor, ValidationIssue};

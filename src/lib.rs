#![forbid(unsafe_code)]
#![warn(clippy::alloc_instead_of_core)]
#![warn(clippy::std_instead_of_core)]

pub mod document;
pub mod error;
pub mod filter;
pub mod include;
pub mod pose;
pub mod urdf;
pub mod uri;
pub mod validate;

pub use document::{DocumentFormat, SdfDocument};
pub use error::FilterError;
pub use filter::{default_filter, DocumentFilter, FilterBuilder};
pub use uri::UriPathTable;

/// SDF format version emitted for converted URDF documents
pub const SDF_VERSION: &str = "1.6";

/// Filter `path` with the process-wide default filter
///
/// The default filter resolves `model://` against `$HOME/.gazebo/models`
/// and `GAZEBO_MODEL_PATH`.
pub fn filter<P: AsRef<std::path::Path>>(path: P) -> Result<String, FilterError> {
    default_filter()?.filter(path)
}

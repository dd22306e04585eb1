use crate::{
    document::SdfDocument,
    error::FilterError,
    include::IncludeResolver,
    uri::{UriPathTable, HOME_MODEL_CACHE, MODEL_URI_PREFIX},
    validate::validate_sdf,
};
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Maximum nesting of `<include>` before giving up
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Loads SDF/URDF files and renders their canonical SDF text
///
/// A filter owns only immutable configuration and can be shared between
/// threads; every call builds and drops its own document.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    uris: UriPathTable,
    max_include_depth: usize,
}

/// Builder for [`DocumentFilter`]
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    uris: UriPathTable,
    max_include_depth: usize,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBuilder {
    /// Builder with an empty URI table
    pub fn new() -> Self {
        Self {
            uris: UriPathTable::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Builder seeded from `HOME` and `GAZEBO_MODEL_PATH`
    pub fn from_env() -> Result<Self, FilterError> {
        Ok(Self {
            uris: UriPathTable::from_env()?,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        })
    }

    /// Register `<home>/.gazebo/models` for `model://`
    pub fn with_home(
        mut self,
        home: impl AsRef<Path>,
    ) -> Self {
        self.uris
            .add(MODEL_URI_PREFIX, home.as_ref().join(HOME_MODEL_CACHE));
        self
    }

    /// Register an extra `model://` root
    pub fn with_model_path(
        mut self,
        root: impl Into<PathBuf>,
    ) -> Self {
        self.uris.add(MODEL_URI_PREFIX, root);
        self
    }

    /// Register a root for an arbitrary URI prefix
    pub fn with_uri_path(
        mut self,
        prefix: &str,
        root: impl Into<PathBuf>,
    ) -> Self {
        self.uris.add(prefix, root);
        self
    }

    pub fn with_max_include_depth(
        mut self,
        depth: usize,
    ) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn build(self) -> DocumentFilter {
        DocumentFilter {
            uris: self.uris,
            max_include_depth: self.max_include_depth,
        }
    }
}

impl DocumentFilter {
    pub fn builder() -> FilterBuilder {
        FilterBuilder::new()
    }

    /// Filter configured from the process environment
    ///
    /// Fails with [`FilterError::MissingHome`] when `HOME` is unset.
    pub fn from_env() -> Result<Self, FilterError> {
        Ok(FilterBuilder::from_env()?.build())
    }

    pub fn uri_paths(&self) -> &UriPathTable {
        &self.uris
    }

    /// Load `path` and return its canonical SDF text
    pub fn filter<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<String, FilterError> {
        self.load(path)?.to_canonical_string()
    }

    /// Filter in-memory content
    ///
    /// # Note
    /// Relative `<include>` paths are resolved against `base_dir`.
    pub fn filter_str(
        &self,
        content: &str,
        base_dir: &Path,
    ) -> Result<String, FilterError> {
        self.load_str(content, base_dir)?.to_canonical_string()
    }

    /// Load `path` into a fully resolved, validated and canonicalized document
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<SdfDocument, FilterError> {
        let resolver = IncludeResolver::new(&self.uris, self.max_include_depth);
        let doc = resolver.load_file(path.as_ref())?;
        Self::finish(doc)
    }

    pub fn load_str(
        &self,
        content: &str,
        base_dir: &Path,
    ) -> Result<SdfDocument, FilterError> {
        let parsed = SdfDocument::parse(content.as_bytes())?;
        let resolver = IncludeResolver::new(&self.uris, self.max_include_depth);
        let doc = resolver.resolve_document(parsed, base_dir)?;
        Self::finish(doc)
    }

    fn finish(mut doc: SdfDocument) -> Result<SdfDocument, FilterError> {
        validate_sdf(&doc.root)?;
        doc.canonicalize();
        Ok(doc)
    }
}

static DEFAULT_FILTER: OnceLock<Option<DocumentFilter>> = OnceLock::new();

/// Process-wide filter built from the environment on first use
///
/// The environment is read exactly once; a missing `HOME` keeps failing
/// with [`FilterError::MissingHome`] for the life of the process.
pub fn default_filter() -> Result<&'static DocumentFilter, FilterError> {
    DEFAULT_FILTER
        .get_or_init(|| match DocumentFilter::from_env() {
            Ok(filter) => {
                log::debug!("Default model search path: {:?}", filter.uris);
                Some(filter)
            }
            Err(e) => {
                log::error!("{}", e);
                None
            }
        })
        .as_ref()
        .ok_or(FilterError::MissingHome)
}

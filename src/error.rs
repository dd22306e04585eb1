use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("HOME is not set; cannot register the model:// search path")]
    MissingHome,

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in '{}': {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: xmltree::ParseError,
    },

    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    #[error("Unknown document format: root element <{root}> is neither <sdf> nor <robot>")]
    UnknownFormat { root: String },

    #[error("Unsupported SDF version '{version}'")]
    UnsupportedVersion { version: String },

    #[error("Missing attribute '{attribute}' in element '{element}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("Missing child element <{child}> in element '{element}'")]
    MissingElement { element: String, child: String },

    #[error("Invalid value '{value}' in element '{element}': {reason}")]
    InvalidValue {
        element: String,
        value: String,
        reason: String,
    },

    #[error("Invalid URDF: {0}")]
    InvalidUrdf(String),

    #[error("Unable to resolve URI '{uri}'")]
    UnresolvedUri { uri: String },

    #[error("Circular include detected: {}", path.display())]
    CircularInclude { path: PathBuf },

    #[error("Include depth exceeded: depth {depth} > {limit} (possible include loop)")]
    IncludeDepthExceeded { depth: usize, limit: usize },

    /// Writing canonical output only. Input reads use `Io` with the path.
    #[error("Output error: {0}")]
    Write(#[from] std::io::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl FilterError {
    /// Configuration errors happen while building a filter, not while filtering a file.
    pub fn is_config_error(&self) -> bool {
        matches!(self, FilterError::MissingHome)
    }

    pub(crate) fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        FilterError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_attribute(
        element: &str,
        attribute: &str,
    ) -> Self {
        FilterError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn missing_element(
        element: &str,
        child: &str,
    ) -> Self {
        FilterError::MissingElement {
            element: element.to_string(),
            child: child.to_string(),
        }
    }

    pub(crate) fn invalid_value(
        element: &str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        FilterError::InvalidValue {
            element: element.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

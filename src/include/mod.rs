//! `<include>` expansion and per-call document loading
//!
//! Loading a file runs the whole pipeline for that file: XML parse, format
//! detection, URDF conversion, then expansion of every `<include>` against the
//! URI search path table. Included files go through the same pipeline, so an
//! included model may itself be URDF or contain further includes.
//!
//! An `<include>` is replaced by the top-level entity (`model`, `actor` or
//! `light`) of the referenced document, with `<name>`, `<pose>` and
//! `<static>` from the include applied on top.

mod guards;

use crate::{
    document::{child_text, set_child_text, DocumentFormat, SdfDocument},
    error::FilterError,
    uri::UriPathTable,
    urdf,
    validate::KNOWN_SDF_VERSIONS,
};
use core::cell::RefCell;
use guards::IncludeGuard;
use std::{
    fs,
    path::{Path, PathBuf},
};
use xmltree::{Element, XMLNode};

/// File name looked up in a model directory to find the model file
pub const MODEL_CONFIG: &str = "model.config";

/// Model file used when a model directory has no `model.config`
pub const DEFAULT_MODEL_FILE: &str = "model.sdf";

/// Elements an `<include>` can pull in
const INCLUDABLE: &[&str] = &["model", "actor", "light"];

/// Per-call loader state
///
/// Holds the stack of files currently being loaded; never shared between calls.
pub(crate) struct IncludeResolver<'a> {
    uris: &'a UriPathTable,
    max_depth: usize,
    include_stack: RefCell<Vec<PathBuf>>,
}

impl<'a> IncludeResolver<'a> {
    pub(crate) fn new(
        uris: &'a UriPathTable,
        max_depth: usize,
    ) -> Self {
        Self {
            uris,
            max_depth,
            include_stack: RefCell::new(Vec::new()),
        }
    }

    /// Load a file and resolve it into an `<sdf>` rooted document
    ///
    /// The returned document keeps the format detected on input.
    pub(crate) fn load_file(
        &self,
        path: &Path,
    ) -> Result<SdfDocument, FilterError> {
        let path = fs::canonicalize(path).map_err(|e| FilterError::io(path, e))?;

        if self.include_stack.borrow().contains(&path) {
            return Err(FilterError::CircularInclude { path });
        }
        let depth = self.include_stack.borrow().len() + 1;
        if depth > self.max_depth {
            return Err(FilterError::IncludeDepthExceeded {
                depth,
                limit: self.max_depth,
            });
        }

        log::debug!("Loading '{}' (depth {})", path.display(), depth);

        let file = fs::File::open(&path).map_err(|e| FilterError::io(&path, e))?;
        let nodes = Element::parse_all(file).map_err(|source| FilterError::Xml {
            path: path.clone(),
            source,
        })?;
        let doc = SdfDocument::from_nodes(nodes)?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let _guard = IncludeGuard::push(&self.include_stack, path);

        self.resolve_document(doc, &base_dir)
    }

    /// Resolve an already parsed document whose relative references are
    /// relative to `base_dir`
    pub(crate) fn resolve_document(
        &self,
        doc: SdfDocument,
        base_dir: &Path,
    ) -> Result<SdfDocument, FilterError> {
        let mut root = match doc.format {
            DocumentFormat::Sdf => doc.root,
            DocumentFormat::Urdf => urdf::to_sdf(&doc.root)?,
        };
        self.expand_includes(&mut root, base_dir)?;
        Ok(SdfDocument {
            format: doc.format,
            root,
        })
    }

    fn expand_includes(
        &self,
        element: &mut Element,
        base_dir: &Path,
    ) -> Result<(), FilterError> {
        let children = core::mem::take(&mut element.children);
        element.children.reserve(children.len());

        for child in children {
            match child {
                XMLNode::Element(include) if include.name == "include" => {
                    let entity = self.resolve_include(&include, base_dir)?;
                    element.children.push(XMLNode::Element(entity));
                }
                XMLNode::Element(mut elem) => {
                    self.expand_includes(&mut elem, base_dir)?;
                    element.children.push(XMLNode::Element(elem));
                }
                other => element.children.push(other),
            }
        }

        Ok(())
    }

    fn resolve_include(
        &self,
        include: &Element,
        base_dir: &Path,
    ) -> Result<Element, FilterError> {
        let uri = child_text(include, "uri")
            .ok_or_else(|| FilterError::missing_element("include", "uri"))?;

        let target = self.resolve_uri(&uri, base_dir)?;
        let model_file = if target.is_dir() {
            model_file_in(&target)?
        } else {
            target
        };
        log::debug!("Include '{}' -> '{}'", uri, model_file.display());

        let included = self.load_file(&model_file)?;
        let mut entity = included
            .root
            .children
            .into_iter()
            .filter_map(|node| match node {
                XMLNode::Element(elem) => Some(elem),
                _ => None,
            })
            .find(|elem| INCLUDABLE.contains(&elem.name.as_str()))
            .ok_or_else(|| {
                FilterError::invalid_value(
                    "include",
                    &uri,
                    "referenced document has no model, actor or light",
                )
            })?;

        if let Some(name) = child_text(include, "name") {
            entity.attributes.insert("name".to_string(), name);
        }
        for key in ["pose", "static"] {
            if let Some(value) = child_text(include, key) {
                set_child_text(&mut entity, key, &value);
            }
        }

        Ok(entity)
    }

    /// Map an include URI to an existing path
    ///
    /// Registered prefixes go through the URI table. `file://` URIs and plain
    /// paths are taken as absolute or relative to the including file.
    fn resolve_uri(
        &self,
        uri: &str,
        base_dir: &Path,
    ) -> Result<PathBuf, FilterError> {
        let unresolved = || FilterError::UnresolvedUri {
            uri: uri.to_string(),
        };

        if self.uris.matches(uri) {
            return self.uris.resolve(uri).ok_or_else(unresolved);
        }

        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        if raw.contains("://") {
            log::warn!("No search path registered for URI '{}'", uri);
            return Err(unresolved());
        }

        let candidate = if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            base_dir.join(raw)
        };
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(unresolved())
        }
    }
}

/// Pick the model file inside a model directory
///
/// `model.config` lists one `<sdf version="...">file</sdf>` per supported
/// version; the highest version this filter accepts wins. Without
/// `model.config` the directory must contain `model.sdf`.
fn model_file_in(dir: &Path) -> Result<PathBuf, FilterError> {
    let config_path = dir.join(MODEL_CONFIG);

    if !config_path.is_file() {
        let fallback = dir.join(DEFAULT_MODEL_FILE);
        if fallback.is_file() {
            return Ok(fallback);
        }
        return Err(FilterError::UnresolvedUri {
            uri: format!("{} (no {} or {})", dir.display(), MODEL_CONFIG, DEFAULT_MODEL_FILE),
        });
    }

    let file = fs::File::open(&config_path).map_err(|e| FilterError::io(&config_path, e))?;
    let config = Element::parse(file).map_err(|source| FilterError::Xml {
        path: config_path.clone(),
        source,
    })?;

    let best = config
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(|e| e.name == "sdf")
        .filter(|e| match e.attributes.get("version") {
            Some(v) if !KNOWN_SDF_VERSIONS.contains(&v.trim()) => {
                log::debug!("Skipping '{}' entry for unsupported SDF {}", config_path.display(), v);
                false
            }
            _ => true,
        })
        .filter_map(|e| {
            let file = e.get_text()?.trim().to_string();
            if file.is_empty() {
                return None;
            }
            let version = e
                .attributes
                .get("version")
                .map(|v| version_key(v))
                .unwrap_or_default();
            Some((version, file))
        })
        .max_by(|a, b| a.0.cmp(&b.0));

    match best {
        Some((_, file)) => Ok(dir.join(file)),
        None => Err(FilterError::missing_element(MODEL_CONFIG, "sdf")),
    }
}

/// `"1.10"` sorts after `"1.9"`
fn version_key(version: &str) -> Vec<u32> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

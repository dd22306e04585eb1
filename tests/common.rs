// Common test helpers for sdf-filter integration tests
//
// - Processing helpers: run_filter(), test_filter(), ...
// - On-disk fixtures: data_path(), ModelCache
// - XML navigation: parse_xml(), get_attr(), find_child(), child_text()

use sdf_filter::{DocumentFilter, FilterError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use xmltree::{Element, XMLNode};

static INIT: Once = Once::new();

/// Initialize test environment (logging).
///
/// Safe to call multiple times - initialization happens only once.
#[allow(dead_code)]
pub fn test_init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Path of a file under `tests/data`
#[allow(dead_code)]
pub fn data_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(relative)
}

/// Filter whose `$HOME` is `tests/data/home`
#[allow(dead_code)]
pub fn data_home_filter() -> DocumentFilter {
    DocumentFilter::builder()
        .with_home(data_path("home"))
        .build()
}

/// Filter a file with the given filter, return Result.
#[allow(dead_code)]
pub fn test_filter<P: AsRef<Path>>(
    filter: &DocumentFilter,
    path: P,
) -> Result<String, FilterError> {
    test_init();
    filter.filter(path)
}

/// Filter a file and expect success.
#[allow(dead_code)]
pub fn run_filter<P: AsRef<Path>>(
    filter: &DocumentFilter,
    path: P,
) -> String {
    let path_ref = path.as_ref();
    test_filter(filter, path_ref).unwrap_or_else(|e| {
        panic!(
            "Filtering should succeed for {}: {}",
            path_ref.display(),
            e
        )
    })
}

/// Filter a file, then filter the output again; both runs must agree.
#[allow(dead_code)]
pub fn assert_fixed_point<P: AsRef<Path>>(
    filter: &DocumentFilter,
    path: P,
) -> String {
    let first = run_filter(filter, path.as_ref());

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let again = dir.path().join("again.sdf");
    fs::write(&again, &first).expect("Failed to write first pass");
    let second = run_filter(filter, &again);

    assert_eq!(first, second, "Canonical output should be a fixed point");
    first
}

/// Parse output back to an XML root element.
#[allow(dead_code)]
pub fn parse_xml(output: &str) -> Element {
    Element::parse(output.as_bytes()).expect("Output should be valid XML")
}

/// Get attribute value, panicking if absent.
#[allow(dead_code)]
pub fn get_attr<'a>(
    elem: &'a Element,
    name: &str,
) -> &'a str {
    elem.attributes
        .get(name)
        .map(|value| value.as_str())
        .unwrap_or_else(|| panic!("Expected '{}' attribute on <{}>", name, elem.name))
}

/// Find child element by name.
#[allow(dead_code)]
pub fn find_child<'a>(
    parent: &'a Element,
    name: &str,
) -> &'a Element {
    parent.get_child(name).unwrap_or_else(|| {
        panic!(
            "Expected <{}> child element in <{}>",
            name, parent.name
        )
    })
}

/// Find child element by tag and `name` attribute.
#[allow(dead_code)]
pub fn find_named<'a>(
    parent: &'a Element,
    tag: &str,
    name: &str,
) -> &'a Element {
    parent
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .find(|e| e.name == tag && e.attributes.get("name").map(|s| s.as_str()) == Some(name))
        .unwrap_or_else(|| panic!("Expected <{} name=\"{}\"> in <{}>", tag, name, parent.name))
}

/// Trimmed text of a child element.
#[allow(dead_code)]
pub fn child_text(
    parent: &Element,
    name: &str,
) -> String {
    find_child(parent, name)
        .get_text()
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// A temporary `$HOME` with a `.gazebo/models` cache
#[allow(dead_code)]
pub struct ModelCache {
    pub home: TempDir,
}

#[allow(dead_code)]
impl ModelCache {
    pub fn new() -> Self {
        let home = tempfile::tempdir().expect("Failed to create temp home");
        fs::create_dir_all(home.path().join(".gazebo/models")).expect("Failed to create cache");
        Self { home }
    }

    pub fn models_dir(&self) -> PathBuf {
        self.home.path().join(".gazebo/models")
    }

    /// Add `<name>/model.sdf` holding a one-link model
    pub fn add_model(
        &self,
        name: &str,
    ) -> PathBuf {
        self.write(
            &format!("{}/model.sdf", name),
            &format!(
                r#"<?xml version="1.0"?>
<sdf version="1.6">
  <model name="{}">
    <link name="link"/>
  </model>
</sdf>"#,
                name
            ),
        )
    }

    /// Write a file relative to the model cache
    pub fn write(
        &self,
        relative: &str,
        content: &str,
    ) -> PathBuf {
        let path = self.models_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create model dir");
        }
        fs::write(&path, content).expect("Failed to write model file");
        path
    }

    pub fn filter(&self) -> DocumentFilter {
        DocumentFilter::builder().with_home(self.home.path()).build()
    }
}

/// Write `content` to a fresh temp file with the given name
#[allow(dead_code)]
pub fn write_temp(
    dir: &TempDir,
    name: &str,
    content: &str,
) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write temp file");
    path
}

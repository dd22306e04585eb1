//! Structural checks on a resolved SDF tree
//!
//! This is not a schema validator. It checks what the filter needs to be
//! able to emit a meaningful document: a known version, names on the named
//! entities, and well-formed joints.

use crate::{document::child_text, error::FilterError};
use xmltree::{Element, XMLNode};

/// SDF format versions accepted on input
pub const KNOWN_SDF_VERSIONS: &[&str] = &[
    "1.0", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "1.8", "1.9",
];

/// Entities that must carry a non-empty `name` attribute, with the parents
/// they are entities under. Elsewhere the same tag can be a plain reference,
/// e.g. `<contact><collision>link_collision</collision></contact>`.
const NAMED_ELEMENTS: &[(&str, &[&str])] = &[
    ("world", &["sdf"]),
    ("model", &["sdf", "world", "model"]),
    ("actor", &["sdf", "world"]),
    ("light", &["sdf", "world", "model", "link"]),
    ("link", &["model"]),
    ("joint", &["model"]),
    ("collision", &["link"]),
    ("visual", &["link"]),
    ("sensor", &["link", "joint"]),
    ("frame", &["world", "model"]),
];

/// Subtrees that are not checked: free-form plugin content and saved
/// simulation state
const UNCHECKED_SUBTREES: &[&str] = &["plugin", "state"];

const JOINT_TYPES: &[&str] = &[
    "revolute",
    "revolute2",
    "prismatic",
    "ball",
    "screw",
    "universal",
    "fixed",
    "gearbox",
    "continuous",
];

/// Validate an `<sdf>` root after include expansion
pub fn validate_sdf(root: &Element) -> Result<(), FilterError> {
    if root.name != "sdf" {
        return Err(FilterError::UnknownFormat {
            root: root.name.clone(),
        });
    }

    let version = root
        .attributes
        .get("version")
        .map(|v| v.trim())
        .ok_or_else(|| FilterError::missing_attribute("sdf", "version"))?;
    if !KNOWN_SDF_VERSIONS.contains(&version) {
        return Err(FilterError::UnsupportedVersion {
            version: version.to_string(),
        });
    }

    for child in root.children.iter().filter_map(XMLNode::as_element) {
        validate_element(child, "sdf")?;
    }
    Ok(())
}

fn is_entity(
    name: &str,
    parent: &str,
) -> bool {
    NAMED_ELEMENTS
        .iter()
        .any(|(tag, parents)| *tag == name && parents.contains(&parent))
}

fn validate_element(
    element: &Element,
    parent: &str,
) -> Result<(), FilterError> {
    let name = element.name.as_str();

    if UNCHECKED_SUBTREES.contains(&name) {
        return Ok(());
    }

    let entity = is_entity(name, parent);
    if entity {
        let has_name = element
            .attributes
            .get("name")
            .is_some_and(|n| !n.trim().is_empty());
        if !has_name {
            return Err(FilterError::missing_attribute(name, "name"));
        }
    }

    if entity && name == "joint" {
        validate_joint(element)?;
    }

    for child in element.children.iter().filter_map(XMLNode::as_element) {
        validate_element(child, name)?;
    }
    Ok(())
}

fn validate_joint(joint: &Element) -> Result<(), FilterError> {
    let label = joint
        .attributes
        .get("name")
        .map(|n| format!("joint '{}'", n))
        .unwrap_or_else(|| "joint".to_string());

    let kind = joint
        .attributes
        .get("type")
        .ok_or_else(|| FilterError::missing_attribute(&label, "type"))?;
    if !JOINT_TYPES.contains(&kind.trim()) {
        return Err(FilterError::invalid_value(&label, kind, "unknown joint type"));
    }

    for key in ["parent", "child"] {
        if child_text(joint, key).is_none() {
            return Err(FilterError::missing_element(&label, key));
        }
    }
    Ok(())
}

//! URDF to SDF conversion
//!
//! A URDF `<robot>` becomes a single SDF `<model>`. URDF describes every
//! link relative to its parent joint; SDF 1.6 places links in the model frame,
//! so link poses are obtained by walking the kinematic tree from the root link
//! and composing joint origins.

use crate::{
    document::text_element,
    error::FilterError,
    pose::{format_number, parse_number, parse_numbers, Pose},
    SDF_VERSION,
};
use std::collections::{HashMap, HashSet, VecDeque};
use xmltree::{Element, XMLNode};

/// Limits emitted for `continuous` joints, which have none in URDF
const UNLIMITED: f64 = 1e16;

/// URDF `package://` mesh references are rewritten to this prefix
const PACKAGE_URI_PREFIX: &str = "package://";

/// Root link name that anchors a URDF robot to the world frame
const WORLD_LINK: &str = "world";

struct UrdfJoint<'a> {
    element: &'a Element,
    name: &'a str,
    kind: &'a str,
    parent: &'a str,
    child: &'a str,
    origin: Pose,
}

/// Convert a URDF `<robot>` element into a complete `<sdf>` element
pub fn to_sdf(robot: &Element) -> Result<Element, FilterError> {
    let robot_name = required_attr(robot, "name")?;

    let mut links: Vec<&Element> = Vec::new();
    let mut joints: Vec<UrdfJoint> = Vec::new();
    let mut materials: HashMap<&str, String> = HashMap::new();

    for child in robot.children.iter().filter_map(XMLNode::as_element) {
        match child.name.as_str() {
            "link" => links.push(child),
            "joint" => joints.push(read_joint(child)?),
            "material" => {
                let name = required_attr(child, "name")?;
                if let Some(rgba) = read_color(child)? {
                    materials.insert(name, rgba);
                }
            }
            "gazebo" => log::debug!("Skipping <gazebo> extension block"),
            other => log::debug!("Skipping unsupported URDF element <{}>", other),
        }
    }

    let link_poses = link_poses(&links, &joints)?;

    let mut model = Element::new("model");
    model
        .attributes
        .insert("name".to_string(), robot_name.to_string());

    for link in &links {
        let name = required_attr(link, "name")?;
        if is_world_anchor(link, name, &joints) {
            log::debug!("Root link '{}' anchors the robot to the world frame", name);
            continue;
        }
        // link_poses covers every link once the tree checks pass
        let pose = link_poses.get(name).copied().unwrap_or_default();
        model
            .children
            .push(XMLNode::Element(convert_link(link, name, &pose, &materials)?));
    }

    for joint in &joints {
        if joint.kind == "floating" {
            log::warn!(
                "Dropping floating joint '{}': child link '{}' becomes free",
                joint.name,
                joint.child
            );
            continue;
        }
        let child_pose = link_poses.get(joint.child).copied().unwrap_or_default();
        model
            .children
            .push(XMLNode::Element(convert_joint(joint, &child_pose)?));
    }

    let mut sdf = Element::new("sdf");
    sdf.attributes
        .insert("version".to_string(), SDF_VERSION.to_string());
    sdf.children.push(XMLNode::Element(model));

    log::debug!(
        "Converted URDF robot '{}' ({} links, {} joints)",
        robot_name,
        links.len(),
        joints.len()
    );

    Ok(sdf)
}

/// An empty root link named `world` stands for the world frame itself.
/// It is not emitted; joints keep `world` as their parent.
fn is_world_anchor(
    link: &Element,
    name: &str,
    joints: &[UrdfJoint],
) -> bool {
    name == WORLD_LINK
        && link.children.iter().all(|c| c.as_element().is_none())
        && !joints.iter().any(|j| j.child == WORLD_LINK)
}

fn required_attr<'a>(
    element: &'a Element,
    attribute: &str,
) -> Result<&'a str, FilterError> {
    element
        .attributes
        .get(attribute)
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| FilterError::missing_attribute(&element.name, attribute))
}

fn required_child<'a>(
    element: &'a Element,
    child: &str,
) -> Result<&'a Element, FilterError> {
    element
        .get_child(child)
        .ok_or_else(|| FilterError::missing_element(&element.name, child))
}

/// `<origin xyz="..." rpy="..."/>`, both attributes optional
fn read_origin(element: &Element) -> Result<Option<Pose>, FilterError> {
    let Some(origin) = element.get_child("origin") else {
        return Ok(None);
    };
    let xyz = match origin.attributes.get("xyz") {
        Some(text) => parse_numbers::<3>("origin", text)?,
        None => [0.0; 3],
    };
    let rpy = match origin.attributes.get("rpy") {
        Some(text) => parse_numbers::<3>("origin", text)?,
        None => [0.0; 3],
    };
    Ok(Some(Pose::new(xyz, rpy)))
}

fn read_joint(element: &Element) -> Result<UrdfJoint<'_>, FilterError> {
    let name = required_attr(element, "name")?;
    let kind = required_attr(element, "type")?;

    match kind {
        "revolute" | "continuous" | "prismatic" | "fixed" | "floating" => {}
        "planar" => {
            return Err(FilterError::InvalidUrdf(format!(
                "joint '{}': planar joints have no SDF equivalent",
                name
            )))
        }
        other => {
            return Err(FilterError::invalid_value(
                "joint",
                other,
                format!("unknown joint type for joint '{}'", name),
            ))
        }
    }

    let parent = required_attr(required_child(element, "parent")?, "link")?;
    let child = required_attr(required_child(element, "child")?, "link")?;
    let origin = read_origin(element)?.unwrap_or_default();

    Ok(UrdfJoint {
        element,
        name,
        kind,
        parent,
        child,
        origin,
    })
}

/// Model-frame pose of every link, checking the tree shape on the way
fn link_poses<'a>(
    links: &[&'a Element],
    joints: &[UrdfJoint<'a>],
) -> Result<HashMap<&'a str, Pose>, FilterError> {
    if links.is_empty() {
        return Err(FilterError::InvalidUrdf("robot has no links".into()));
    }

    let mut names: HashSet<&'a str> = HashSet::new();
    for &link in links {
        let name = required_attr(link, "name")?;
        if !names.insert(name) {
            return Err(FilterError::InvalidUrdf(format!(
                "duplicate link name '{}'",
                name
            )));
        }
    }

    let mut joint_names: HashSet<&str> = HashSet::new();
    let mut parent_of: HashMap<&str, &str> = HashMap::new();
    let mut children_of: HashMap<&str, Vec<&UrdfJoint>> = HashMap::new();

    for joint in joints {
        if !joint_names.insert(joint.name) {
            return Err(FilterError::InvalidUrdf(format!(
                "duplicate joint name '{}'",
                joint.name
            )));
        }
        for link in [joint.parent, joint.child] {
            if !names.contains(link) {
                return Err(FilterError::InvalidUrdf(format!(
                    "joint '{}' references unknown link '{}'",
                    joint.name, link
                )));
            }
        }
        if let Some(previous) = parent_of.insert(joint.child, joint.parent) {
            return Err(FilterError::InvalidUrdf(format!(
                "link '{}' has two parents: '{}' and '{}'",
                joint.child, previous, joint.parent
            )));
        }
        children_of.entry(joint.parent).or_default().push(joint);
    }

    let roots: Vec<&str> = links
        .iter()
        .filter_map(|&l| l.attributes.get("name").map(|s| s.as_str()))
        .filter(|name| !parent_of.contains_key(name))
        .collect();

    let root = match roots.as_slice() {
        [root] => *root,
        [] => {
            return Err(FilterError::InvalidUrdf(
                "no root link found (kinematic loop)".into(),
            ))
        }
        many => {
            return Err(FilterError::InvalidUrdf(format!(
                "multiple root links: {}",
                many.join(", ")
            )))
        }
    };

    let mut poses: HashMap<&str, Pose> = HashMap::new();
    poses.insert(root, Pose::identity());
    let mut queue = VecDeque::from([root]);

    while let Some(link) = queue.pop_front() {
        let parent_pose = poses[link];
        for joint in children_of.get(link).into_iter().flatten() {
            poses.insert(joint.child, parent_pose.compose(&joint.origin));
            queue.push_back(joint.child);
        }
    }

    if poses.len() != names.len() {
        let mut unreachable: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !poses.contains_key(n))
            .collect();
        unreachable.sort_unstable();
        return Err(FilterError::InvalidUrdf(format!(
            "links not connected to root '{}' (kinematic loop): {}",
            root,
            unreachable.join(", ")
        )));
    }

    Ok(poses)
}

fn convert_link(
    link: &Element,
    name: &str,
    pose: &Pose,
    materials: &HashMap<&str, String>,
) -> Result<Element, FilterError> {
    let mut out = Element::new("link");
    out.attributes.insert("name".to_string(), name.to_string());
    out.children
        .push(XMLNode::Element(text_element("pose", pose.to_sdf_string())));

    if let Some(inertial) = link.get_child("inertial") {
        out.children
            .push(XMLNode::Element(convert_inertial(inertial)?));
    }

    let mut collision_count = 0;
    let mut visual_count = 0;
    for child in link.children.iter().filter_map(XMLNode::as_element) {
        match child.name.as_str() {
            "collision" => {
                let elem = convert_shape(child, "collision", name, collision_count, None)?;
                collision_count += 1;
                out.children.push(XMLNode::Element(elem));
            }
            "visual" => {
                let elem = convert_shape(child, "visual", name, visual_count, Some(materials))?;
                visual_count += 1;
                out.children.push(XMLNode::Element(elem));
            }
            _ => {}
        }
    }

    Ok(out)
}

fn convert_inertial(inertial: &Element) -> Result<Element, FilterError> {
    let mut out = Element::new("inertial");

    if let Some(origin) = read_origin(inertial)? {
        out.children
            .push(XMLNode::Element(text_element("pose", origin.to_sdf_string())));
    }

    let mass = required_attr(required_child(inertial, "mass")?, "value")?;
    out.children.push(XMLNode::Element(text_element(
        "mass",
        format_number(parse_number("mass", mass)?),
    )));

    let inertia = required_child(inertial, "inertia")?;
    let mut inertia_out = Element::new("inertia");
    for key in ["ixx", "ixy", "ixz", "iyy", "iyz", "izz"] {
        let value = required_attr(inertia, key)?;
        inertia_out.children.push(XMLNode::Element(text_element(
            key,
            format_number(parse_number("inertia", value)?),
        )));
    }
    out.children.push(XMLNode::Element(inertia_out));

    Ok(out)
}

/// Convert a `<visual>` or `<collision>` block
///
/// Unnamed blocks get `<link>_<kind>`, with `_<index>` appended after the first.
fn convert_shape(
    shape: &Element,
    kind: &str,
    link_name: &str,
    index: usize,
    materials: Option<&HashMap<&str, String>>,
) -> Result<Element, FilterError> {
    let name = match shape.attributes.get("name").filter(|n| !n.trim().is_empty()) {
        Some(name) => name.clone(),
        None if index == 0 => format!("{}_{}", link_name, kind),
        None => format!("{}_{}_{}", link_name, kind, index),
    };

    let mut out = Element::new(kind);
    out.attributes.insert("name".to_string(), name);

    if let Some(origin) = read_origin(shape)? {
        out.children
            .push(XMLNode::Element(text_element("pose", origin.to_sdf_string())));
    }

    out.children.push(XMLNode::Element(convert_geometry(
        required_child(shape, "geometry")?,
    )?));

    if let (Some(materials), Some(material)) = (materials, shape.get_child("material")) {
        let rgba = match read_color(material)? {
            Some(rgba) => Some(rgba),
            None => material
                .attributes
                .get("name")
                .and_then(|n| materials.get(n.as_str()))
                .cloned(),
        };
        if let Some(rgba) = rgba {
            let mut material_out = Element::new("material");
            material_out
                .children
                .push(XMLNode::Element(text_element("ambient", rgba.clone())));
            material_out
                .children
                .push(XMLNode::Element(text_element("diffuse", rgba)));
            out.children.push(XMLNode::Element(material_out));
        }
    }

    Ok(out)
}

/// `<color rgba="r g b a"/>` inside a material, normalized
fn read_color(material: &Element) -> Result<Option<String>, FilterError> {
    let Some(color) = material.get_child("color") else {
        return Ok(None);
    };
    let rgba = parse_numbers::<4>("color", required_attr(color, "rgba")?)?;
    Ok(Some(join_numbers(&rgba)))
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn convert_geometry(geometry: &Element) -> Result<Element, FilterError> {
    let shape = geometry
        .children
        .iter()
        .find_map(XMLNode::as_element)
        .ok_or_else(|| FilterError::missing_element("geometry", "box|cylinder|sphere|mesh"))?;

    let mut shape_out = Element::new(&shape.name);
    match shape.name.as_str() {
        "box" => {
            let size = parse_numbers::<3>("box", required_attr(shape, "size")?)?;
            shape_out
                .children
                .push(XMLNode::Element(text_element("size", join_numbers(&size))));
        }
        "cylinder" => {
            let radius = parse_number("cylinder", required_attr(shape, "radius")?)?;
            let length = parse_number("cylinder", required_attr(shape, "length")?)?;
            shape_out
                .children
                .push(XMLNode::Element(text_element("radius", format_number(radius))));
            shape_out
                .children
                .push(XMLNode::Element(text_element("length", format_number(length))));
        }
        "sphere" => {
            let radius = parse_number("sphere", required_attr(shape, "radius")?)?;
            shape_out
                .children
                .push(XMLNode::Element(text_element("radius", format_number(radius))));
        }
        "mesh" => {
            let filename = required_attr(shape, "filename")?.trim();
            let uri = match filename.strip_prefix(PACKAGE_URI_PREFIX) {
                Some(rest) => format!("{}{}", crate::uri::MODEL_URI_PREFIX, rest),
                None => filename.to_string(),
            };
            shape_out
                .children
                .push(XMLNode::Element(text_element("uri", uri)));
            if let Some(scale) = shape.attributes.get("scale") {
                let scale = parse_numbers::<3>("mesh", scale)?;
                shape_out
                    .children
                    .push(XMLNode::Element(text_element("scale", join_numbers(&scale))));
            }
        }
        other => {
            return Err(FilterError::invalid_value(
                "geometry",
                other,
                "unsupported geometry type",
            ))
        }
    }

    let mut out = Element::new("geometry");
    out.children.push(XMLNode::Element(shape_out));
    Ok(out)
}

fn convert_joint(
    joint: &UrdfJoint,
    child_pose: &Pose,
) -> Result<Element, FilterError> {
    let sdf_type = match joint.kind {
        "continuous" => "revolute",
        other => other,
    };

    let mut out = Element::new("joint");
    out.attributes
        .insert("name".to_string(), joint.name.to_string());
    out.attributes
        .insert("type".to_string(), sdf_type.to_string());
    out.children
        .push(XMLNode::Element(text_element("parent", joint.parent)));
    out.children
        .push(XMLNode::Element(text_element("child", joint.child)));

    if joint.kind == "fixed" {
        return Ok(out);
    }

    let axis = match joint.element.get_child("axis").and_then(|a| a.attributes.get("xyz")) {
        Some(xyz) => parse_numbers::<3>("axis", xyz)?,
        None => [1.0, 0.0, 0.0],
    };
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if norm == 0.0 {
        return Err(FilterError::invalid_value(
            "axis",
            &join_numbers(&axis),
            format!("joint '{}' has a zero-length axis", joint.name),
        ));
    }
    let axis = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
    // URDF axes are in the joint (child link) frame
    let model_axis = child_pose.rotate(axis);

    let mut axis_out = Element::new("axis");
    axis_out
        .children
        .push(XMLNode::Element(text_element("xyz", join_numbers(&model_axis))));

    axis_out
        .children
        .push(XMLNode::Element(convert_limit(joint)?));

    if let Some(dynamics) = joint.element.get_child("dynamics") {
        let mut dynamics_out = Element::new("dynamics");
        for key in ["damping", "friction"] {
            let value = match dynamics.attributes.get(key) {
                Some(v) => parse_number("dynamics", v)?,
                None => 0.0,
            };
            dynamics_out
                .children
                .push(XMLNode::Element(text_element(key, format_number(value))));
        }
        axis_out.children.push(XMLNode::Element(dynamics_out));
    }

    axis_out.children.push(XMLNode::Element(text_element(
        "use_parent_model_frame",
        "1",
    )));
    out.children.push(XMLNode::Element(axis_out));

    Ok(out)
}

fn convert_limit(joint: &UrdfJoint) -> Result<Element, FilterError> {
    let limit = joint.element.get_child("limit");

    let (lower, upper) = match (joint.kind, limit) {
        ("continuous", _) => (-UNLIMITED, UNLIMITED),
        (_, Some(limit)) => {
            let read = |key: &str| -> Result<f64, FilterError> {
                limit
                    .attributes
                    .get(key)
                    .map_or(Ok(0.0), |v| parse_number("limit", v))
            };
            (read("lower")?, read("upper")?)
        }
        (_, None) => {
            return Err(FilterError::InvalidUrdf(format!(
                "joint '{}' of type '{}' requires a <limit> element",
                joint.name, joint.kind
            )))
        }
    };

    let mut out = Element::new("limit");
    out.children
        .push(XMLNode::Element(text_element("lower", format_number(lower))));
    out.children
        .push(XMLNode::Element(text_element("upper", format_number(upper))));

    if let Some(limit) = limit {
        for key in ["effort", "velocity"] {
            if let Some(value) = limit.attributes.get(key) {
                out.children.push(XMLNode::Element(text_element(
                    key,
                    format_number(parse_number("limit", value)?),
                )));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests;

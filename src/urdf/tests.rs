use super::*;
use crate::document::child_text;

fn convert(xml: &str) -> Result<Element, FilterError> {
    let robot = Element::parse(xml.as_bytes()).unwrap();
    to_sdf(&robot)
}

fn model(sdf: &Element) -> &Element {
    sdf.get_child("model").expect("converted document should have a model")
}

fn find_named<'a>(
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

const TWO_LINK_ARM: &str = r#"<robot name="arm">
  <material name="blue"><color rgba="0 0 0.8 1"/></material>
  <link name="base">
    <inertial>
      <origin xyz="0 0 0.1"/>
      <mass value="2.0"/>
      <inertia ixx="0.1" ixy="0" ixz="0" iyy="0.1" iyz="0" izz="0.05"/>
    </inertial>
    <visual>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
      <material name="blue"/>
    </visual>
    <collision>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
    </collision>
  </link>
  <link name="upper">
    <visual name="upper_shell">
      <origin xyz="0 0 0.25"/>
      <geometry><cylinder radius="0.05" length="0.5"/></geometry>
    </visual>
    <visual>
      <geometry><mesh filename="package://arm_description/meshes/upper.dae" scale="1 1 1"/></geometry>
    </visual>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base"/>
    <child link="upper"/>
    <origin xyz="0 0 0.1" rpy="0 0 1.5707963267948966"/>
    <axis xyz="1 0 0"/>
    <limit lower="-1.57" upper="1.57" effort="10" velocity="2"/>
    <dynamics damping="0.7"/>
  </joint>
  <gazebo reference="base"><material>Gazebo/Blue</material></gazebo>
</robot>"#;

#[test]
fn test_robot_becomes_model() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    assert_eq!(sdf.name, "sdf");
    assert_eq!(sdf.attributes.get("version").map(|s| s.as_str()), Some(SDF_VERSION));
    assert_eq!(model(&sdf).attributes.get("name").map(|s| s.as_str()), Some("arm"));
}

#[test]
fn test_gazebo_blocks_skipped() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    assert!(model(&sdf).get_child("gazebo").is_none());
    assert!(model(&sdf).get_child("material").is_none());
}

#[test]
fn test_link_poses_in_model_frame() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let base = find_named(model(&sdf), "link", "base");
    let upper = find_named(model(&sdf), "link", "upper");
    assert_eq!(child_text(base, "pose").as_deref(), Some("0 0 0 0 0 0"));
    assert_eq!(
        child_text(upper, "pose").as_deref(),
        Some("0 0 0.1 0 0 1.570796327")
    );
}

#[test]
fn test_inertial_converted() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let inertial = find_named(model(&sdf), "link", "base")
        .get_child("inertial")
        .unwrap();
    assert_eq!(child_text(inertial, "pose").as_deref(), Some("0 0 0.1 0 0 0"));
    assert_eq!(child_text(inertial, "mass").as_deref(), Some("2"));
    let inertia = inertial.get_child("inertia").unwrap();
    assert_eq!(child_text(inertia, "ixx").as_deref(), Some("0.1"));
    assert_eq!(child_text(inertia, "izz").as_deref(), Some("0.05"));
}

#[test]
fn test_visual_and_collision_names() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let base = find_named(model(&sdf), "link", "base");
    find_named(base, "visual", "base_visual");
    find_named(base, "collision", "base_collision");

    let upper = find_named(model(&sdf), "link", "upper");
    find_named(upper, "visual", "upper_shell");
    find_named(upper, "visual", "upper_visual_1");
}

#[test]
fn test_named_material_resolved() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let visual = find_named(find_named(model(&sdf), "link", "base"), "visual", "base_visual");
    let material = visual.get_child("material").unwrap();
    assert_eq!(child_text(material, "ambient").as_deref(), Some("0 0 0.8 1"));
    assert_eq!(child_text(material, "diffuse").as_deref(), Some("0 0 0.8 1"));
}

#[test]
fn test_geometry_shapes() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let upper = find_named(model(&sdf), "link", "upper");

    let shell = find_named(upper, "visual", "upper_shell");
    let cylinder = shell.get_child("geometry").unwrap().get_child("cylinder").unwrap();
    assert_eq!(child_text(cylinder, "radius").as_deref(), Some("0.05"));
    assert_eq!(child_text(cylinder, "length").as_deref(), Some("0.5"));

    let mesh_visual = find_named(upper, "visual", "upper_visual_1");
    let mesh = mesh_visual.get_child("geometry").unwrap().get_child("mesh").unwrap();
    assert_eq!(
        child_text(mesh, "uri").as_deref(),
        Some("model://arm_description/meshes/upper.dae")
    );
    assert_eq!(child_text(mesh, "scale").as_deref(), Some("1 1 1"));
}

#[test]
fn test_joint_axis_rotated_into_model_frame() {
    let sdf = convert(TWO_LINK_ARM).unwrap();
    let joint = find_named(model(&sdf), "joint", "shoulder");
    assert_eq!(joint.attributes.get("type").map(|s| s.as_str()), Some("revolute"));
    assert_eq!(child_text(joint, "parent").as_deref(), Some("base"));
    assert_eq!(child_text(joint, "child").as_deref(), Some("upper"));

    let axis = joint.get_child("axis").unwrap();
    // Child frame is yawed by 90 degrees, so its x axis is the model y axis
    assert_eq!(child_text(axis, "xyz").as_deref(), Some("0 1 0"));
    assert_eq!(child_text(axis, "use_parent_model_frame").as_deref(), Some("1"));

    let limit = axis.get_child("limit").unwrap();
    assert_eq!(child_text(limit, "lower").as_deref(), Some("-1.57"));
    assert_eq!(child_text(limit, "upper").as_deref(), Some("1.57"));
    assert_eq!(child_text(limit, "effort").as_deref(), Some("10"));
    assert_eq!(child_text(limit, "velocity").as_deref(), Some("2"));

    let dynamics = axis.get_child("dynamics").unwrap();
    assert_eq!(child_text(dynamics, "damping").as_deref(), Some("0.7"));
    assert_eq!(child_text(dynamics, "friction").as_deref(), Some("0"));
}

#[test]
fn test_continuous_joint_unlimited() {
    let sdf = convert(
        r#"<robot name="wheel">
  <link name="body"/>
  <link name="wheel"/>
  <joint name="spin" type="continuous">
    <parent link="body"/>
    <child link="wheel"/>
    <axis xyz="0 0 2"/>
  </joint>
</robot>"#,
    )
    .unwrap();

    let joint = find_named(model(&sdf), "joint", "spin");
    assert_eq!(joint.attributes.get("type").map(|s| s.as_str()), Some("revolute"));
    let axis = joint.get_child("axis").unwrap();
    assert_eq!(child_text(axis, "xyz").as_deref(), Some("0 0 1"));
    let limit = axis.get_child("limit").unwrap();
    assert_eq!(child_text(limit, "lower").as_deref(), Some("-10000000000000000"));
    assert_eq!(child_text(limit, "upper").as_deref(), Some("10000000000000000"));
}

#[test]
fn test_fixed_joint_has_no_axis() {
    let sdf = convert(
        r#"<robot name="r">
  <link name="a"/>
  <link name="b"/>
  <joint name="weld" type="fixed"><parent link="a"/><child link="b"/></joint>
</robot>"#,
    )
    .unwrap();
    let joint = find_named(model(&sdf), "joint", "weld");
    assert!(joint.get_child("axis").is_none());
}

#[test]
fn test_floating_joint_dropped() {
    let sdf = convert(
        r#"<robot name="r">
  <link name="a"/>
  <link name="b"/>
  <joint name="free" type="floating"><parent link="a"/><child link="b"/></joint>
</robot>"#,
    )
    .unwrap();
    assert!(model(&sdf).get_child("joint").is_none());
    find_named(model(&sdf), "link", "b");
}

#[test]
fn test_planar_joint_rejected() {
    let err = convert(
        r#"<robot name="r">
  <link name="a"/>
  <link name="b"/>
  <joint name="slide" type="planar"><parent link="a"/><child link="b"/></joint>
</robot>"#,
    )
    .unwrap_err();
    assert!(matches!(err, FilterError::InvalidUrdf(_)), "got: {:?}", err);
}

#[test]
fn test_revolute_without_limit_rejected() {
    let err = convert(
        r#"<robot name="r">
  <link name="a"/>
  <link name="b"/>
  <joint name="j" type="revolute"><parent link="a"/><child link="b"/></joint>
</robot>"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("requires a <limit>"), "got: {}", err);
}

#[test]
fn test_unknown_link_reference() {
    let err = convert(
        r#"<robot name="r">
  <link name="a"/>
  <joint name="j" type="fixed"><parent link="a"/><child link="ghost"/></joint>
</robot>"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown link 'ghost'"), "got: {}", err);
}

#[test]
fn test_multiple_roots_rejected() {
    let err = convert(r#"<robot name="r"><link name="a"/><link name="b"/></robot>"#).unwrap_err();
    assert!(err.to_string().contains("multiple root links"), "got: {}", err);
}

#[test]
fn test_kinematic_loop_rejected() {
    let err = convert(
        r#"<robot name="r">
  <link name="root"/>
  <link name="a"/>
  <link name="b"/>
  <joint name="j1" type="fixed"><parent link="a"/><child link="b"/></joint>
  <joint name="j2" type="fixed"><parent link="b"/><child link="a"/></joint>
</robot>"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("kinematic loop"), "got: {}", err);
}

#[test]
fn test_two_parents_rejected() {
    let err = convert(
        r#"<robot name="r">
  <link name="a"/>
  <link name="b"/>
  <link name="c"/>
  <joint name="j1" type="fixed"><parent link="a"/><child link="c"/></joint>
  <joint name="j2" type="fixed"><parent link="b"/><child link="c"/></joint>
</robot>"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("two parents"), "got: {}", err);
}

#[test]
fn test_no_links_rejected() {
    let err = convert(r#"<robot name="empty"/>"#).unwrap_err();
    assert!(err.to_string().contains("no links"), "got: {}", err);
}

#[test]
fn test_robot_name_required() {
    let err = convert(r#"<robot><link name="a"/></robot>"#).unwrap_err();
    assert!(
        matches!(
            err,
            FilterError::MissingAttribute { ref element, ref attribute }
                if element == "robot" && attribute == "name"
        ),
        "got: {:?}",
        err
    );
}

#[test]
fn test_bad_number_reported() {
    let err = convert(
        r#"<robot name="r">
  <link name="a">
    <visual><geometry><sphere radius="big"/></geometry></visual>
  </link>
</robot>"#,
    )
    .unwrap_err();
    assert!(
        matches!(err, FilterError::InvalidValue { ref value, .. } if value == "big"),
        "got: {:?}",
        err
    );
}

const WORLD_ANCHORED: &str = r#"<robot name="arm">
  <link name="world"/>
  <link name="base">
    <visual><geometry><box size="1 1 1"/></geometry></visual>
  </link>
  <joint name="fix" type="fixed">
    <parent link="world"/>
    <child link="base"/>
    <origin xyz="0 0 0.5"/>
  </joint>
</robot>"#;

#[test]
fn test_world_root_link_not_emitted() {
    let sdf = convert(WORLD_ANCHORED).unwrap();
    let model = model(&sdf);

    let links: Vec<&str> = model
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(|e| e.name == "link")
        .filter_map(|e| e.attributes.get("name").map(|s| s.as_str()))
        .collect();
    assert_eq!(links, vec!["base"]);

    let joint = find_named(model, "joint", "fix");
    assert_eq!(child_text(joint, "parent").as_deref(), Some("world"));
    assert_eq!(child_text(joint, "child").as_deref(), Some("base"));

    let base = find_named(model, "link", "base");
    assert_eq!(child_text(base, "pose").as_deref(), Some("0 0 0.5 0 0 0"));
}

#[test]
fn test_world_link_with_content_is_kept() {
    let sdf = convert(
        r#"<robot name="r">
  <link name="world">
    <visual><geometry><sphere radius="0.1"/></geometry></visual>
  </link>
  <link name="base"/>
  <joint name="fix" type="fixed"><parent link="world"/><child link="base"/></joint>
</robot>"#,
    )
    .unwrap();
    find_named(model(&sdf), "link", "world");
}

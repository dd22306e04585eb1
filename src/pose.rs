//! Rigid transforms used when flattening a URDF kinematic tree into model-frame poses

use crate::error::FilterError;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Position and orientation of a frame relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(Isometry3<f64>);

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Pose(Isometry3::identity())
    }

    /// Translation `xyz`, then fixed-axis roll (X), pitch (Y), yaw (Z) as used
    /// by URDF `rpy` and SDF `<pose>`
    pub fn new(
        xyz: [f64; 3],
        rpy: [f64; 3],
    ) -> Self {
        Pose(Isometry3::from_parts(
            Translation3::new(xyz[0], xyz[1], xyz[2]),
            UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
        ))
    }

    /// `child` (relative to `self`) expressed in the frame `self` is relative to
    pub fn compose(
        &self,
        child: &Pose,
    ) -> Pose {
        Pose(self.0 * child.0)
    }

    pub fn position(&self) -> [f64; 3] {
        let t = self.0.translation.vector;
        [t.x, t.y, t.z]
    }

    pub fn rpy(&self) -> [f64; 3] {
        let (roll, pitch, yaw) = self.0.rotation.euler_angles();
        [roll, pitch, yaw]
    }

    /// Rotate a direction vector by this pose's orientation
    pub fn rotate(
        &self,
        v: [f64; 3],
    ) -> [f64; 3] {
        let r = self.0.rotation * Vector3::new(v[0], v[1], v[2]);
        [r.x, r.y, r.z]
    }

    /// SDF `<pose>` text: `x y z roll pitch yaw`
    pub fn to_sdf_string(&self) -> String {
        self.position()
            .iter()
            .chain(self.rpy().iter())
            .map(|v| format_number(*v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decimal rendering with at most 9 fractional digits, trailing zeros
/// trimmed and negative zero folded to `0`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.9}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Parse a single number from attribute or element text
pub fn parse_number(
    element: &str,
    text: &str,
) -> Result<f64, FilterError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| FilterError::invalid_value(element, text, "expected a number"))
}

/// Parse whitespace separated numbers, requiring exactly `N` of them
pub fn parse_numbers<const N: usize>(
    element: &str,
    text: &str,
) -> Result<[f64; N], FilterError> {
    let values = text
        .split_whitespace()
        .map(|part| parse_number(element, part))
        .collect::<Result<Vec<_>, _>>()?;

    <[f64; N]>::try_from(values).map_err(|values| {
        FilterError::invalid_value(
            element,
            text,
            format!("expected {} numbers, found {}", N, values.len()),
        )
    })
}

//! Divider geometry used to classify raw positions
//!
//! All three classifiers are pure functions of a point and the encoder
//! configuration. Points outside the configured span clamp to the nearest
//! bucket or class.

use crate::config::{EncoderConfig, YDividerConfig};
use crate::gaze::code::{YClass, ZClass};
use crate::tracking::detection::Vec3;

/// Horizontal bucket for `point`, or `None` if the bearing is undefined
pub fn x_bucket(point: Vec3, config: &EncoderConfig) -> Option<u32> {
    let origin = Vec3::from(config.origin);
    let dx = point.x - origin.x;
    let dz = point.z - origin.z;
    let bearing = dx.atan2(-dz).to_degrees();
    if !bearing.is_finite() {
        return None;
    }

    let n = config.num_divisions.max(1);
    let span = config.field_of_view_deg;
    let width = span / n as f32;
    let offset = (bearing + span / 2.0) / width;

    if offset <= 0.0 {
        Some(0)
    } else {
        Some((offset.floor() as u32).min(n - 1))
    }
}

/// Signed distance of `point` from a divider tilted by `angle_deg` and
/// passing through `height` at the origin's depth
fn signed_distance(point: Vec3, origin: Vec3, height: f32, angle_deg: f32) -> f32 {
    let angle = angle_deg.to_radians();
    angle.cos() * (point.y - height) + angle.sin() * (point.z - origin.z)
}

/// Vertical class of `point` against the top and bottom dividers
pub fn y_class(point: Vec3, origin: Vec3, dividers: &YDividerConfig) -> YClass {
    let top = signed_distance(point, origin, origin.y + dividers.top, dividers.top_angle_deg);
    let bottom = signed_distance(
        point,
        origin,
        origin.y - dividers.bottom,
        dividers.bottom_angle_deg,
    );

    if top > 0.0 {
        YClass::Up
    } else if bottom < 0.0 {
        YClass::Down
    } else {
        YClass::Straight
    }
}

/// Boundary depth plane, either flat or an arc approximated by segments
#[derive(Debug, Clone)]
pub struct DepthPlane {
    plane_z: f32,
    /// Segment end points `(x, z)` ordered by x; empty when flat
    arc: Vec<(f32, f32)>,
}

impl DepthPlane {
    pub fn new(config: &EncoderConfig) -> Self {
        let plane_z = config.origin[2] - config.z_divider;
        let radius = config.z_divider_curve;
        let segments = config.z_segments.max(1);

        let arc = if radius > 0.0 {
            let start = -std::f32::consts::FRAC_PI_2;
            let step = std::f32::consts::PI / segments as f32;
            (0..=segments)
                .map(|i| {
                    let angle = start + i as f32 * step;
                    (radius * angle.sin(), plane_z - radius * angle.cos())
                })
                .collect()
        } else {
            Vec::new()
        };

        Self { plane_z, arc }
    }

    /// Boundary z at horizontal position `x`
    pub fn boundary_at(&self, x: f32) -> f32 {
        for pair in self.arc.windows(2) {
            let (x1, z1) = pair[0];
            let (x2, z2) = pair[1];
            if x >= x1 && x <= x2 {
                if (x2 - x1).abs() < f32::EPSILON {
                    return z1.min(z2);
                }
                let t = (x - x1) / (x2 - x1);
                return z1 + t * (z2 - z1);
            }
        }
        self.plane_z
    }

    pub fn classify(&self, point: Vec3) -> ZClass {
        if point.z < self.boundary_at(point.x) {
            ZClass::Far
        } else {
            ZClass::Near
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EncoderConfig {
        EncoderConfig {
            field_of_view_deg: 120.0,
            num_divisions: 40,
            ..EncoderConfig::default()
        }
    }

    fn at_bearing(deg: f32, depth: f32) -> Vec3 {
        let rad = deg.to_radians();
        Vec3::new(depth * rad.tan(), 0.0, -depth)
    }

    #[test]
    fn test_straight_ahead_is_middle_bucket() {
        let cfg = config();
        assert_eq!(x_bucket(Vec3::new(0.0, 0.0, -2.0), &cfg), Some(20));
    }

    #[test]
    fn test_bucket_edges() {
        let cfg = config();
        // 3 degrees per bucket
        assert_eq!(x_bucket(at_bearing(-58.5, 1.0), &cfg), Some(0));
        assert_eq!(x_bucket(at_bearing(1.5, 1.0), &cfg), Some(20));
        assert_eq!(x_bucket(at_bearing(58.5, 1.0), &cfg), Some(39));
    }

    #[test]
    fn test_outside_fov_clamps() {
        let cfg = config();
        assert_eq!(x_bucket(at_bearing(-80.0, 1.0), &cfg), Some(0));
        assert_eq!(x_bucket(at_bearing(80.0, 1.0), &cfg), Some(39));
        // Behind the camera
        assert_eq!(x_bucket(Vec3::new(1.0, 0.0, 1.0), &cfg), Some(39));
    }

    #[test]
    fn test_nan_has_no_bucket() {
        assert_eq!(x_bucket(Vec3::new(f32::NAN, 0.0, -1.0), &config()), None);
    }

    #[test]
    fn test_y_classes() {
        let origin = Vec3::default();
        let dividers = YDividerConfig {
            top: 0.3,
            bottom: 0.2,
            top_angle_deg: 0.0,
            bottom_angle_deg: 0.0,
        };
        assert_eq!(y_class(Vec3::new(0.0, 0.5, -1.0), origin, &dividers), YClass::Up);
        assert_eq!(y_class(Vec3::new(0.0, 0.0, -1.0), origin, &dividers), YClass::Straight);
        assert_eq!(y_class(Vec3::new(0.0, -0.5, -1.0), origin, &dividers), YClass::Down);
    }

    #[test]
    fn test_tilted_divider_depends_on_depth() {
        let origin = Vec3::default();
        let dividers = YDividerConfig {
            top: 0.3,
            bottom: 10.0,
            top_angle_deg: 45.0,
            bottom_angle_deg: 0.0,
        };
        // The tilted top plane rises with distance from the camera
        let p_near = Vec3::new(0.0, 0.5, -0.1);
        let p_far = Vec3::new(0.0, 0.5, -2.0);
        assert_eq!(y_class(p_near, origin, &dividers), YClass::Up);
        assert_eq!(y_class(p_far, origin, &dividers), YClass::Straight);
    }

    #[test]
    fn test_flat_depth_plane() {
        let plane = DepthPlane::new(&EncoderConfig {
            z_divider: 2.0,
            ..EncoderConfig::default()
        });
        assert_eq!(plane.classify(Vec3::new(0.0, 0.0, -1.5)), ZClass::Near);
        assert_eq!(plane.classify(Vec3::new(5.0, 0.0, -2.5)), ZClass::Far);
    }

    #[test]
    fn test_curved_depth_plane_bulges_in_the_middle() {
        let plane = DepthPlane::new(&EncoderConfig {
            z_divider: 2.0,
            z_divider_curve: 1.0,
            z_segments: 20,
            ..EncoderConfig::default()
        });
        assert!((plane.boundary_at(0.0) - -3.0).abs() < 1e-3);
        assert!((plane.boundary_at(5.0) - -2.0).abs() < 1e-6);

        // Same depth, far to the side versus straight ahead
        assert_eq!(plane.classify(Vec3::new(0.0, 0.0, -2.5)), ZClass::Near);
        assert_eq!(plane.classify(Vec3::new(3.0, 0.0, -2.5)), ZClass::Far);
    }
}

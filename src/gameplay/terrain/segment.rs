use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Rectangle geometry of one terrain collision body, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentShape {
    pub center: Vec2,
    pub length: f32,
    pub thickness: f32,
    pub angle: f32,
}

impl SegmentShape {
    pub fn between(start: Vec2, end: Vec2, thickness: f32) -> Self {
        let delta = end - start;
        Self {
            center: (start + end) * 0.5,
            length: delta.length(),
            thickness,
            angle: delta.y.atan2(delta.x),
        }
    }

    pub fn area(&self) -> f32 {
        self.length * self.thickness
    }

    pub fn scale_length(&mut self, factor: f32) {
        self.length *= factor;
    }

    /// Moves a recycled body onto `target`: unrotate, normalize to unit length,
    /// stretch to the target length, then rotate.
    pub fn reshape_to(&mut self, target: &SegmentShape) {
        self.center = target.center;
        self.angle = 0.0;
        self.thickness = target.thickness;

        let current_length = self.area() / self.thickness;
        if current_length > f32::EPSILON {
            self.scale_length(1.0 / current_length);
            self.scale_length(target.length);
        } else {
            self.length = target.length;
        }

        self.angle = target.angle;
    }

    pub fn transform(&self, z: f32) -> Transform {
        Transform::from_translation(self.center.extend(z))
            .with_rotation(Quat::from_rotation_z(self.angle))
    }

    pub fn collider(&self) -> Collider {
        Collider::cuboid(self.length * 0.5, self.thickness * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn between_uses_midpoint_distance_and_slope_angle() {
        let shape = SegmentShape::between(Vec2::new(0.0, 0.0), Vec2::new(30.0, 40.0), 10.0);
        assert_eq!(shape.center, Vec2::new(15.0, 20.0));
        assert!((shape.length - 50.0).abs() < 1e-5);
        assert!((shape.angle - (40.0_f32).atan2(30.0)).abs() < 1e-6);
    }

    #[test]
    fn recycling_length_50_to_80_scales_area_by_80_over_50() {
        let mut pooled = SegmentShape {
            center: Vec2::new(-500.0, -430.0),
            length: 50.0,
            thickness: 10.0,
            angle: 0.3,
        };
        let area_before = pooled.area();
        let target = SegmentShape {
            center: Vec2::new(1200.0, -460.0),
            length: 80.0,
            thickness: 10.0,
            angle: -FRAC_PI_4,
        };

        pooled.reshape_to(&target);

        assert!((pooled.area() / area_before - 80.0 / 50.0).abs() < 1e-5);
        assert_eq!(pooled.center, target.center);
        assert_eq!(pooled.angle, target.angle);
    }

    #[test]
    fn reused_shape_matches_a_fresh_one() {
        let start = Vec2::new(100.0, -420.0);
        let end = Vec2::new(163.0, -401.0);
        let fresh = SegmentShape::between(start, end, 10.0);

        let mut reused = SegmentShape::between(Vec2::ZERO, Vec2::new(7.0, 2.0), 10.0);
        reused.reshape_to(&fresh);

        assert!((reused.length - fresh.length).abs() < 1e-3);
        assert_eq!(reused.center, fresh.center);
        assert_eq!(reused.angle, fresh.angle);
        assert_eq!(reused.thickness, fresh.thickness);
    }

    #[test]
    fn transform_rotates_about_z() {
        let shape = SegmentShape {
            center: Vec2::new(4.0, 5.0),
            length: 2.0,
            thickness: 1.0,
            angle: FRAC_PI_4,
        };
        let transform = shape.transform(0.5);
        assert_eq!(transform.translation, Vec3::new(4.0, 5.0, 0.5));
        let (_, _, angle) = transform.rotation.to_euler(EulerRot::XYZ);
        assert!((angle - FRAC_PI_4).abs() < 1e-5);
    }
}

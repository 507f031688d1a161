use std::f32::consts::PI;

use super::math::{Vec2, Vec3};
use super::picking::Ray;

pub const CAMERA_FOV_Y_DEGREES: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;

pub const ORBIT_DISTANCE_DEFAULT: f32 = 10.0;
pub const ORBIT_POLAR_DEFAULT: f32 = PI * 0.35;
pub const ORBIT_POLAR_MIN: f32 = PI * 0.25;
pub const ORBIT_POLAR_MAX: f32 = PI * 0.45;

/// Perspective camera looking from `position` at `target`, world up is +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub ndc: Vec2,
    pub depth: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_y_radians: CAMERA_FOV_Y_DEGREES.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
        }
    }

    pub fn basis(&self) -> CameraBasis {
        let forward = (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let right = forward
            .cross(Vec3::UP)
            .try_normalize()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = right.cross(forward);
        CameraBasis { forward, right, up }
    }

    fn half_height_at_unit_depth(&self) -> f32 {
        (self.fov_y_radians * 0.5).tan()
    }

    /// World-space ray through a point in normalized device coordinates
    /// (x right, y up, both in -1..=1).
    pub fn ray_through_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let basis = self.basis();
        let half_h = self.half_height_at_unit_depth();
        let half_w = half_h * sanitize_aspect(aspect);
        let direction =
            basis.forward + basis.right * (ndc.x * half_w) + basis.up * (ndc.y * half_h);
        Ray {
            origin: self.position,
            direction: direction.try_normalize().unwrap_or(basis.forward),
        }
    }

    /// Inverse of [`Camera3D::ray_through_ndc`]; `None` for points behind the near plane.
    pub fn project(&self, world: Vec3, aspect: f32) -> Option<ProjectedPoint> {
        let basis = self.basis();
        let offset = world - self.position;
        let depth = offset.dot(basis.forward);
        if !depth.is_finite() || depth <= self.near || depth > self.far {
            return None;
        }
        let half_h = self.half_height_at_unit_depth();
        let half_w = half_h * sanitize_aspect(aspect);
        Some(ProjectedPoint {
            ndc: Vec2 {
                x: offset.dot(basis.right) / (depth * half_w),
                y: offset.dot(basis.up) / (depth * half_h),
            },
            depth,
        })
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Orbit-follow rig: the camera sits on a sphere around a followed point.
/// `polar` is measured from +Y, `azimuth` around +Y starting at +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitRig {
    pub azimuth: f32,
    pub polar: f32,
    pub distance: f32,
}

impl Default for OrbitRig {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            polar: ORBIT_POLAR_DEFAULT,
            distance: ORBIT_DISTANCE_DEFAULT,
        }
    }
}

impl OrbitRig {
    pub fn rotate_left(&mut self, radians: f32) {
        if radians.is_finite() {
            self.azimuth = (self.azimuth + radians).rem_euclid(PI * 2.0);
        }
    }

    pub fn rotate_up(&mut self, radians: f32) {
        if radians.is_finite() {
            self.polar = (self.polar - radians).clamp(ORBIT_POLAR_MIN, ORBIT_POLAR_MAX);
        }
    }

    pub fn camera_for(&self, target: Vec3) -> Camera3D {
        let sin_polar = self.polar.sin();
        let offset = Vec3::new(
            self.distance * sin_polar * self.azimuth.sin(),
            self.distance * self.polar.cos(),
            self.distance * sin_polar * self.azimuth.cos(),
        );
        Camera3D::look_at(target + offset, target)
    }

    /// Horizontal direction from the camera towards the followed point.
    pub fn ground_forward(&self) -> Vec3 {
        Vec3::new(-self.azimuth.sin(), 0.0, -self.azimuth.cos())
    }
}

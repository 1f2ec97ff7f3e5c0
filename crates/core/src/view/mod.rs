//! Screen-space to world-space helpers for the AR view.
//!
//! The view camera follows the viewer pose reported by the XR runtime each
//! frame. Touch and pointer coordinates are given in the same client pixel
//! space as the [`Viewport`] rectangle.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A ray in world space. `direction` is unit length or zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersects the horizontal plane `y = height`. Hits behind the origin
    /// and rays parallel to the plane yield `None`.
    pub fn intersect_ground(&self, height: f32) -> Option<Vec3> {
        const EPSILON: f32 = 1e-6;

        if self.direction.y.abs() < EPSILON {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Unit cube sitting on the ground, centred on the origin.
    pub fn unit_footprint() -> Self {
        Self {
            min: Vec3::new(-0.5, 0.0, -0.5),
            max: Vec3::new(0.5, 1.0, 0.5),
        }
    }

    /// Bounds of this box after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = matrix.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }
}

/// Ray-AABB intersection using the slab method.
/// Returns the distance along the ray to the nearest hit, or None.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inv_dir = ray.direction.recip();

    let t1 = (aabb.min - ray.origin) * inv_dir;
    let t2 = (aabb.max - ray.origin) * inv_dir;

    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();

    if tmax < 0.0 || tmin > tmax {
        return None;
    }

    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Pixel rectangle the AR surface occupies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Client coordinates to normalised device coordinates (y up).
    pub fn to_ndc(&self, screen: Vec2) -> Vec2 {
        let width = self.width.max(1.0);
        let height = self.height.max(1.0);
        Vec2::new(
            ((screen.x - self.left) / width) * 2.0 - 1.0,
            -((screen.y - self.top) / height) * 2.0 + 1.0,
        )
    }
}

/// Perspective camera driven by the viewer pose.
#[derive(Debug, Clone)]
pub struct ViewCamera {
    /// Camera-to-world transform.
    pub pose: Mat4,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: Viewport,
}

impl ViewCamera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            pose: Mat4::IDENTITY,
            fov_y: 70.0_f32.to_radians(),
            near: 0.01,
            far: 20.0,
            viewport,
        }
    }

    pub fn set_pose(&mut self, pose: Mat4) {
        self.pose = pose;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn position(&self) -> Vec3 {
        self.pose.w_axis.truncate()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.viewport.aspect(), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.pose.inverse()
    }

    /// Cast a ray from a screen position into the scene.
    pub fn screen_ray(&self, screen: Vec2) -> Ray {
        let ndc = self.viewport.to_ndc(screen);
        let vp_inv = self.view_projection().inverse();

        let near_world = vp_inv * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        Ray::new(self.position(), far - near)
    }
}

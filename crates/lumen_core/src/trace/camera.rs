//! Pinhole camera producing one primary ray per pixel center.

use lumen_shared::{Ray, Vec3, DEFAULT_FOV_DEGREES};

/// A pinhole camera looking from `origin` towards `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    origin: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    half_width: f32,
    half_height: f32,
    width: f32,
    height: f32,
}

impl Camera {
    /// Builds a camera for a `width x height` image with a vertical field of
    /// view of `fov_degrees`. World up is +Y; a target straight above or
    /// below the origin falls back to +Z as up.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn look_at(origin: Vec3, target: Vec3, fov_degrees: f32, width: u32, height: u32) -> Self {
        let forward = (target - origin).normalize();
        let mut right = forward.cross(Vec3::Y).normalize();
        if right == Vec3::ZERO {
            right = forward.cross(Vec3::new(0.0, 0.0, 1.0)).normalize();
        }
        let up = right.cross(forward);

        let (width, height) = (width.max(1) as f32, height.max(1) as f32);
        let half_height = (fov_degrees.to_radians() * 0.5).tan();
        let half_width = half_height * width / height;

        Self { origin, forward, right, up, half_width, half_height, width, height }
    }

    /// Camera at the origin looking down -Z with the default field of view.
    #[must_use]
    pub fn default_for(width: u32, height: u32) -> Self {
        Self::look_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), DEFAULT_FOV_DEGREES, width, height)
    }

    /// Eye position.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Primary ray through the center of pixel `(x, y)`; row 0 is the top.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn primary_ray(&self, x: u32, y: u32) -> Ray {
        let u = ((x as f32 + 0.5) / self.width * 2.0 - 1.0) * self.half_width;
        let v = (1.0 - (y as f32 + 0.5) / self.height * 2.0) * self.half_height;
        Ray::new(self.origin, self.forward + self.right * u + self.up * v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), 90.0, 3, 3);
        let ray = camera.primary_ray(1, 1);
        assert!(close(ray.direction, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_image_orientation() {
        let camera = Camera::default_for(100, 100);
        let top_left = camera.primary_ray(0, 0).direction;
        let bottom_right = camera.primary_ray(99, 99).direction;

        assert!(top_left.x < 0.0 && top_left.y > 0.0);
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
    }

    #[test]
    fn test_vertical_view_has_basis() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0), 60.0, 4, 4);
        let ray = camera.primary_ray(2, 2);
        assert!(ray.direction.length() > 0.99);
    }
}

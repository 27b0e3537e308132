//! A small scene of diffuse spheres under one directional light.

use lumen_core::{Scene, ShadeError};
use lumen_shared::{ColorF, Ray, Vec3};

/// Ambient term added to every lit surface.
const AMBIENT: f32 = 0.1;

/// A diffuse sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    /// Center.
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
    /// Surface color.
    pub color: ColorF,
}

impl Sphere {
    /// Distance along `ray` to the nearest hit in front of the origin.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        [-b - root, -b + root].into_iter().find(|t| *t > 1e-4)
    }
}

/// Spheres, a light direction and a sky color.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereScene {
    spheres: Vec<Sphere>,
    /// Unit vector pointing towards the light.
    light: Vec3,
    sky: ColorF,
}

impl SphereScene {
    /// Creates a scene lit from `light` (need not be normalized).
    #[must_use]
    pub fn new(spheres: Vec<Sphere>, light: Vec3, sky: ColorF) -> Self {
        Self { spheres, light: light.normalize(), sky }
    }

    /// Three spheres on a large ground sphere, in front of a camera at the
    /// origin looking down -Z.
    #[must_use]
    pub fn demo() -> Self {
        let spheres = vec![
            Sphere {
                center: Vec3::new(0.0, -1001.0, -5.0),
                radius: 1000.0,
                color: ColorF::new(0.6, 0.6, 0.6),
            },
            Sphere {
                center: Vec3::new(0.0, 0.0, -5.0),
                radius: 1.0,
                color: ColorF::new(0.9, 0.2, 0.2),
            },
            Sphere {
                center: Vec3::new(-2.2, 0.0, -6.0),
                radius: 1.0,
                color: ColorF::new(0.2, 0.8, 0.3),
            },
            Sphere {
                center: Vec3::new(2.2, 0.0, -6.0),
                radius: 1.0,
                color: ColorF::new(0.2, 0.3, 0.9),
            },
        ];
        Self::new(spheres, Vec3::new(-1.0, 2.0, 1.5), ColorF::new(0.5, 0.7, 1.0))
    }

    /// The spheres.
    #[must_use]
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    fn nearest_hit(&self, ray: &Ray) -> Option<(f32, &Sphere)> {
        self.spheres
            .iter()
            .filter_map(|s| s.intersect(ray).map(|t| (t, s)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn sky_color(&self, ray: &Ray) -> ColorF {
        let blend = 0.5 * (ray.direction.y + 1.0);
        ColorF::WHITE.scale(1.0 - blend) + self.sky.scale(blend)
    }
}

impl Scene for SphereScene {
    fn shade(&self, ray: &Ray) -> Result<ColorF, ShadeError> {
        let d = ray.direction;
        if !(d.x.is_finite() && d.y.is_finite() && d.z.is_finite()) || d == Vec3::ZERO {
            return Err(ShadeError(format!("degenerate ray direction {d:?}")));
        }

        let Some((t, sphere)) = self.nearest_hit(ray) else {
            return Ok(self.sky_color(ray));
        };

        let point = ray.at(t);
        let normal = (point - sphere.center).normalize();

        // Hard shadow towards the light
        let shadow = Ray::new(point + normal * 1e-3, self.light);
        let lit = self.nearest_hit(&shadow).is_none();
        let diffuse = if lit { normal.dot(self.light).max(0.0) } else { 0.0 };

        Ok(sphere.color.scale(AMBIENT + (1.0 - AMBIENT) * diffuse).clamped())
    }
}

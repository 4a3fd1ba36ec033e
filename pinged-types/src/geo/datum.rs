/// Spherical model of the Earth used to calculate distances between geographic points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    radius: f64,
}

impl Datum {
    /// Spherical Earth with the mean radius of 6 371 000 meters.
    pub const SPHERE: Self = Datum { radius: 6_371_000.0 };

    /// Sphere with the given radius in meters.
    pub const fn sphere(radius: f64) -> Self {
        Self { radius }
    }

    /// Radius of the sphere in meters.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::SPHERE
    }
}

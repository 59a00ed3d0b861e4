use serde::{Deserialize, Serialize};

/// Cartesian vector in R^3 used for all unit-sphere math.
///
/// Coordinate convention: +Y is the polar axis (north), +Z pierces the
/// Front face, +X the Right face. Latitude = asin(y) for unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub const ZERO: Vector3D = Vector3D {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Normalize to unit length. Returns ZERO for degenerate input.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < 1e-12 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Rotate this vector around `axis` by `angle` radians using Rodrigues'
    /// rotation formula. The axis is normalized internally.
    pub fn rotate_around_axis(self, axis: Self, angle: f64) -> Self {
        let k = axis.normalize();
        if k == Self::ZERO {
            return self;
        }
        let cos_a = angle.cos();
        let sin_a = angle.sin();
        let cross = k.cross(self);
        let dot = k.dot(self);
        self.scale(cos_a)
            .add(cross.scale(sin_a))
            .add(k.scale(dot * (1.0 - cos_a)))
    }
}

/// Great-circle angular distance between two unit vectors, in radians.
pub fn angular_distance(a: Vector3D, b: Vector3D) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Convert latitude/longitude (degrees) to a unit vector.
/// Longitude 0 is the Front face center (+Z); longitude grows eastward (+X).
pub fn lat_lon_to_vector(lat_deg: f64, lon_deg: f64) -> Vector3D {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    Vector3D::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos())
}

/// Convert a unit vector back to (latitude, longitude) in degrees.
pub fn vector_to_lat_lon(v: Vector3D) -> (f64, f64) {
    let lat = v.y.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = v.x.atan2(v.z).to_degrees();
    (lat, lon)
}

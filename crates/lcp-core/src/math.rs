use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
pub type Pt3 = Point3<Real>;
pub type Mat3 = Matrix3<Real>;

/// Survey azimuth of a horizontal direction, in degrees clockwise from north.
///
/// Computed as `atan2(dx, dy)` and normalized to `[0, 360)`.
pub fn azimuth_deg(dx: Real, dy: Real) -> Real {
    let az = dx.atan2(dy).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if az >= 360.0 {
        0.0
    } else {
        az
    }
}

/// Unit horizontal vector pointing along a survey azimuth given in radians.
pub fn heading_from_azimuth(azimuth_rad: Real) -> Vec2 {
    Vec2::new(azimuth_rad.sin(), azimuth_rad.cos())
}

/// Rotate a horizontal vector clockwise by `angle_rad`.
///
/// A vector pointing north (`+y`) rotated by an azimuth ends up pointing
/// along that azimuth.
pub fn rotate_clockwise(v: &Vec2, angle_rad: Real) -> Vec2 {
    let (s, c) = angle_rad.sin_cos();
    Vec2::new(c * v.x + s * v.y, -s * v.x + c * v.y)
}

/// Angle between two 3-D directions in radians, in `[0, pi]`.
///
/// Uses `atan2(|a x b|, a . b)`, which stays accurate for nearly parallel
/// vectors where `acos` loses precision.
pub fn angle_between(a: &Vec3, b: &Vec3) -> Real {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Angle between two lines (or plane normals) ignoring orientation, in `[0, pi/2]`.
pub fn undirected_angle_between(a: &Vec3, b: &Vec3) -> Real {
    a.cross(b).norm().atan2(a.dot(b).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn azimuth_follows_survey_convention() {
        assert_abs_diff_eq!(azimuth_deg(0.0, 1.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(azimuth_deg(1.0, 0.0), 90.0, epsilon = 1e-12);
        assert_abs_diff_eq!(azimuth_deg(0.0, -1.0), 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(azimuth_deg(-1.0, 0.0), 270.0, epsilon = 1e-12);
        assert_abs_diff_eq!(azimuth_deg(-1.0, 1.0), 315.0, epsilon = 1e-12);
    }

    #[test]
    fn azimuth_is_never_360() {
        let az = azimuth_deg(-1e-300, 1.0);
        assert!((0.0..360.0).contains(&az), "az = {az}");
    }

    #[test]
    fn clockwise_rotation_of_north_matches_heading() {
        let north = Vec2::new(0.0, 1.0);
        for deg in [0.0, 30.0, 90.0, 135.0, 250.0] {
            let a = Real::to_radians(deg);
            let r = rotate_clockwise(&north, a);
            let h = heading_from_azimuth(a);
            assert_abs_diff_eq!(r.x, h.x, epsilon = 1e-12);
            assert_abs_diff_eq!(r.y, h.y, epsilon = 1e-12);
            assert_abs_diff_eq!(azimuth_deg(r.x, r.y), deg, epsilon = 1e-9);
        }
    }

    #[test]
    fn undirected_angle_folds_opposite_normals() {
        let a = Vec3::new(0.0, 0.0, 1.0);
        let b = Vec3::new(0.0, 0.0, -1.0);
        assert_abs_diff_eq!(angle_between(&a, &b), std::f64::consts::PI, epsilon = 1e-12);
        assert_abs_diff_eq!(undirected_angle_between(&a, &b), 0.0, epsilon = 1e-12);
        let c = Vec3::new(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(undirected_angle_between(&a, &c), FRAC_PI_2, epsilon = 1e-12);
    }
}

//! Spherical Mollweide (ESRI:54009) on a sphere of radius 6378137 m, central meridian 0.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

const MAX_NEWTON_STEPS: usize = 50;
const NEWTON_TOLERANCE: f64 = 1e-13;
const DOMAIN_SLACK: f64 = 1e-9;

/// Projects longitude/latitude degrees to Mollweide meters.
/// Returns `None` outside `[-180, 180] x [-90, 90]` or for non-finite input.
pub fn forward(lon: f64, lat: f64) -> Option<(f64, f64)> {
    if !lon.is_finite() || !lat.is_finite() {
        return None;
    }
    if lon.abs() > 180.0 + DOMAIN_SLACK || lat.abs() > 90.0 + DOMAIN_SLACK {
        return None;
    }

    let lam = lon.clamp(-180.0, 180.0).to_radians();
    let phi = lat.clamp(-90.0, 90.0).to_radians();
    let theta = auxiliary_angle(phi);

    let x = EARTH_RADIUS_M * 2.0 * SQRT_2 / PI * lam * theta.cos();
    let y = EARTH_RADIUS_M * SQRT_2 * theta.sin();
    Some((x, y))
}

/// Inverse projection from Mollweide meters to longitude/latitude degrees.
/// Returns `None` for points outside the projected ellipse.
pub fn inverse(x: f64, y: f64) -> Option<(f64, f64)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let s = y / (EARTH_RADIUS_M * SQRT_2);
    if s.abs() > 1.0 + DOMAIN_SLACK {
        return None;
    }
    let theta = s.clamp(-1.0, 1.0).asin();
    let cos_theta = theta.cos();

    let lam = if cos_theta.abs() < 1e-15 {
        if x.abs() > 1e-6 {
            return None;
        }
        0.0
    } else {
        PI * x / (2.0 * SQRT_2 * EARTH_RADIUS_M * cos_theta)
    };
    if lam.abs() > PI + DOMAIN_SLACK {
        return None;
    }

    let two_theta = 2.0 * theta;
    let phi = ((two_theta + two_theta.sin()) / PI).clamp(-1.0, 1.0).asin();
    Some((lam.clamp(-PI, PI).to_degrees(), phi.to_degrees()))
}

/// Solves `2θ + sin 2θ = π sin φ` for θ by Newton iteration on `2θ`.
fn auxiliary_angle(phi: f64) -> f64 {
    if (phi.abs() - FRAC_PI_2).abs() < 1e-15 {
        return phi;
    }
    let k = PI * phi.sin();
    let mut t = phi;
    for _ in 0..MAX_NEWTON_STEPS {
        let step = (t + t.sin() - k) / (1.0 + t.cos());
        t -= step;
        if step.abs() < NEWTON_TOLERANCE {
            break;
        }
    }
    0.5 * t
}

//! Two-body Keplerian elements
//!
//! Used to seed multistep integrators, for the analytic reference orbit of
//! the LVLH position propagator and for the `"kep"` orbit definition.

use super::constants::GM;
use nalgebra::Vector3;
use std::f64::consts::TAU;

/// Tolerance on the eccentric anomaly Newton iteration (rad)
pub const KEPLER_TOLERANCE: f64 = 1e-6;

/// Iteration budget for the eccentric anomaly Newton iteration
pub const KEPLER_MAX_ITERATIONS: usize = 100;

const SMALL: f64 = 1e-10;

/// Classical orbital elements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeplerElements {
    /// Epoch (MJD UTC)
    pub utc: f64,
    /// Semi-major axis (m)
    pub a: f64,
    /// Eccentricity
    pub e: f64,
    /// Inclination (rad)
    pub i: f64,
    /// Right ascension of the ascending node (rad)
    pub raan: f64,
    /// Argument of perigee (rad)
    pub ap: f64,
    /// Eccentric anomaly (rad)
    pub ea: f64,
    /// Mean anomaly (rad)
    pub ma: f64,
    /// True anomaly (rad)
    pub ta: f64,
    /// Mean motion (rad/s)
    pub mm: f64,
    /// Orbital period (s)
    pub period: f64,
}

impl KeplerElements {
    /// Whether the elements describe a closed orbit
    pub fn is_elliptic(&self) -> bool {
        self.a.is_finite() && self.a > 0.0 && self.e < 1.0
    }

    /// Advance the mean anomaly by `dt` seconds and re-solve the eccentric anomaly
    ///
    /// The previous eccentric anomaly seeds the Newton iteration. Returns the
    /// number of iterations used.
    pub fn advance(&mut self, dt: f64) -> usize {
        self.ma += dt * self.mm;
        self.utc += dt / 86400.0;
        let (ea, iterations) = solve_eccentric_anomaly(self.ma, self.e, self.ea);
        self.ea = ea;
        self.ta = true_anomaly(self.ea, self.e);
        iterations
    }
}

/// Newton solve of Kepler's equation `M = E - e sin E`
///
/// Returns the eccentric anomaly and the iteration count.
pub fn solve_eccentric_anomaly(ma: f64, e: f64, guess: f64) -> (f64, usize) {
    let mut ea = guess;
    let mut count = 0;
    loop {
        let dea = (ea - e * ea.sin() - ma) / (1.0 - e * ea.cos());
        ea -= dea;
        count += 1;
        if count >= KEPLER_MAX_ITERATIONS || dea.abs() <= KEPLER_TOLERANCE {
            break;
        }
    }
    (ea, count)
}

fn true_anomaly(ea: f64, e: f64) -> f64 {
    ((1.0 - e * e).sqrt() * ea.sin()).atan2(ea.cos() - e)
}

/// Convert an inertial state vector to Keplerian elements
pub fn eci2kep(utc: f64, s: &Vector3<f64>, v: &Vector3<f64>) -> KeplerElements {
    let mut kep = KeplerElements {
        utc,
        ..Default::default()
    };

    let rmag = s.norm().max(SMALL);
    let vmag2 = v.norm_squared();
    let h = s.cross(v);
    let magh = h.norm();
    if magh < SMALL {
        // Rectilinear motion has no orbital plane
        kep.a = f64::INFINITY;
        kep.e = 1.0;
        return kep;
    }

    let nbar = Vector3::new(-h.y, h.x, 0.0);
    let magn = nbar.norm();
    let c1 = vmag2 - GM / rmag;
    let rdotv = s.dot(v);
    let ebar = (c1 * s - rdotv * v) / GM;
    kep.e = ebar.norm();

    let sme = vmag2 * 0.5 - GM / rmag;
    if sme.abs() > SMALL {
        kep.a = -GM / (2.0 * sme);
        kep.mm = (GM / kep.a.abs().powi(3)).sqrt();
    } else {
        kep.a = f64::INFINITY;
        kep.mm = SMALL;
    }
    kep.period = TAU / kep.mm;

    kep.i = (h.z / magh).clamp(-1.0, 1.0).acos();

    // Argument of latitude; for equatorial orbits measured from the x axis
    let alat = if magn > SMALL * magh {
        kep.raan = (nbar.x / magn).clamp(-1.0, 1.0).acos();
        if nbar.y < 0.0 {
            kep.raan = TAU - kep.raan;
        }
        s.z.atan2((s.y * h.x - s.x * h.y) / magh)
    } else {
        kep.raan = 0.0;
        (s.y * h.z.signum()).atan2(s.x)
    };

    if kep.is_elliptic() {
        kep.ea = (rdotv / (kep.a * GM).sqrt()).atan2(1.0 - rmag / kep.a);
        kep.ma = kep.ea - kep.e * kep.ea.sin();
        kep.ta = true_anomaly(kep.ea, kep.e);
    } else {
        kep.ta = alat;
    }
    kep.ap = alat - kep.ta;

    kep
}

/// Convert elliptic Keplerian elements to an inertial state vector
///
/// Uses the eccentric anomaly; mean motion and period are refreshed in place.
pub fn kep2eci(kep: &mut KeplerElements) -> (Vector3<f64>, Vector3<f64>) {
    let (sea, cea) = kep.ea.sin_cos();
    let sqe = (1.0 - kep.e * kep.e).sqrt();

    kep.mm = (GM / kep.a.powi(3)).sqrt();
    kep.period = TAU / kep.mm;

    let qpos = Vector3::new(kep.a * (cea - kep.e), kep.a * sqe * sea, 0.0);
    let denom = 1.0 - kep.e * cea;
    let qvel = Vector3::new(
        -kep.mm * kep.a * sea / denom,
        kep.mm * kep.a * sqe * cea / denom,
        0.0,
    );

    let (s1, c1) = kep.raan.sin_cos();
    let (s2, c2) = kep.i.sin_cos();
    let (s3, c3) = kep.ap.sin_cos();

    let xx = c1 * c3 - s1 * c2 * s3;
    let xy = -c1 * s3 - s1 * c2 * c3;
    let yx = s1 * c3 + c1 * c2 * s3;
    let yy = -s1 * s3 + c1 * c2 * c3;
    let zx = s2 * s3;
    let zy = s2 * c3;

    let rotate = |q: &Vector3<f64>| {
        Vector3::new(
            q.x * xx + q.y * xy,
            q.x * yx + q.y * yy,
            q.x * zx + q.y * zy,
        )
    };

    (rotate(&qpos), rotate(&qvel))
}

//! Time-tagged kinematic state in every frame the engine uses
//!
//! A [`Location`] never exposes a stale frame: every setter re-derives all
//! dependent representations before returning, so the ECI, geocentric
//! (ITRF), geodetic and LVLH views, the attitude in each frame, and the
//! Sun/Moon geometry always agree with the last write.

use super::constants::{AU, FLATTENING, OMEGA_EARTH, REARTHM, RSUNM, SOLAR_CONSTANT};
use super::error::PhysicsResult;
use super::metrics::circle_intersection_area;
use super::time::{gmst, mjd_to_instant};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use satkit::lpephem;

const GEODETIC_TOLERANCE: f64 = 1e-14;
const GEODETIC_MAX_ITERATIONS: usize = 20;

/// Position, velocity, acceleration and jerk in one frame (m, m/s, m/s², m/s³)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cartesian {
    pub s: Vector3<f64>,
    pub v: Vector3<f64>,
    pub a: Vector3<f64>,
    pub j: Vector3<f64>,
}

impl Cartesian {
    pub fn new(s: Vector3<f64>, v: Vector3<f64>) -> Self {
        Self {
            s,
            v,
            ..Default::default()
        }
    }
}

/// WGS-84 geodetic position (rad, rad, m)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geodetic {
    pub lat: f64,
    pub lon: f64,
    pub h: f64,
}

impl Geodetic {
    pub fn new(lat: f64, lon: f64, h: f64) -> Self {
        Self { lat, lon, h }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64, h: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians(), h)
    }

    /// Earth-fixed cartesian position
    pub fn to_itrf(&self) -> Vector3<f64> {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let (slat, clat) = self.lat.sin_cos();
        let (slon, clon) = self.lon.sin_cos();
        let n = REARTHM / (1.0 - e2 * slat * slat).sqrt();
        Vector3::new(
            (n + self.h) * clat * clon,
            (n + self.h) * clat * slon,
            (n * (1.0 - e2) + self.h) * slat,
        )
    }

    /// Iterative WGS-84 inversion of an Earth-fixed position
    pub fn from_itrf(r: &Vector3<f64>) -> Self {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let p = (r.x * r.x + r.y * r.y).sqrt();
        let lon = r.y.atan2(r.x);

        let mut lat = r.z.atan2(p * (1.0 - e2));
        let mut h = 0.0;
        for _ in 0..GEODETIC_MAX_ITERATIONS {
            let slat = lat.sin();
            let n = REARTHM / (1.0 - e2 * slat * slat).sqrt();
            h = if lat.abs() < std::f64::consts::FRAC_PI_4 {
                p / lat.cos() - n
            } else {
                r.z / slat - n * (1.0 - e2)
            };
            let next = r.z.atan2(p * (1.0 - e2 * n / (n + h)));
            let done = (next - lat).abs() < GEODETIC_TOLERANCE;
            lat = next;
            if done {
                break;
            }
        }

        Self { lat, lon, h }
    }

    /// Local east/north/up unit vectors in the Earth-fixed frame
    pub fn enu_basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let (slat, clat) = self.lat.sin_cos();
        let (slon, clon) = self.lon.sin_cos();
        let east = Vector3::new(-slon, clon, 0.0);
        let north = Vector3::new(-slat * clon, -slat * slon, clat);
        let up = Vector3::new(clat * clon, clat * slon, slat);
        (east, north, up)
    }
}

/// Attitude: ICRF→body-style quaternion, angular velocity and acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QAtt {
    /// Rotation taking frame vectors into the body frame
    pub s: UnitQuaternion<f64>,
    /// Angular velocity (rad/s), expressed in the reference frame
    pub v: Vector3<f64>,
    /// Angular acceleration (rad/s²), expressed in the reference frame
    pub a: Vector3<f64>,
}

impl Default for QAtt {
    fn default() -> Self {
        Self {
            s: UnitQuaternion::identity(),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        }
    }
}

impl QAtt {
    pub fn new(s: UnitQuaternion<f64>) -> Self {
        Self {
            s,
            ..Default::default()
        }
    }
}

/// Orthonormal direction cosine matrix to quaternion
pub fn dcm_to_quaternion(m: &Matrix3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*m))
}

/// Rotation from ECI into the LVLH frame
///
/// z points to nadir, y along the negative orbit normal and x completes the
/// right-handed triad (along-track for circular orbits).
pub fn lvlh_rotation(s: &Vector3<f64>, v: &Vector3<f64>) -> Rotation3<f64> {
    let z = -s.normalize();
    let mut h = s.cross(v);
    if h.norm() <= f64::EPSILON * s.norm() * v.norm().max(1.0) {
        // No orbital plane; pick any normal to the radius
        h = s.cross(&Vector3::z());
        if h.norm() <= f64::EPSILON * s.norm() {
            h = s.cross(&Vector3::x());
        }
    }
    let y = -h.normalize();
    let x = y.cross(&z);
    Rotation3::from_matrix_unchecked(Matrix3::from_rows(&[
        x.transpose(),
        y.transpose(),
        z.transpose(),
    ]))
}

fn earth_rotation(utc: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -gmst(utc))
}

fn omega_earth() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, OMEGA_EARTH)
}

/// Kinematic state of one spacecraft
#[derive(Debug, Clone)]
pub struct Location {
    utc: f64,
    eci: Cartesian,
    geoc: Cartesian,
    geod: Geodetic,
    eci2itrf: Rotation3<f64>,
    icrf2lvlh: Rotation3<f64>,
    att_icrf: QAtt,
    att_lvlh: QAtt,
    att_geoc: QAtt,
    sun: Vector3<f64>,
    moon: Vector3<f64>,
    sun_fraction: f64,
    sun_radiance: f64,
}

impl Location {
    /// Build a location from an inertial state
    pub fn from_eci(utc: f64, eci: Cartesian) -> PhysicsResult<Self> {
        let mut loc = Self {
            utc,
            eci,
            geoc: Cartesian::default(),
            geod: Geodetic::default(),
            eci2itrf: Rotation3::identity(),
            icrf2lvlh: Rotation3::identity(),
            att_icrf: QAtt::default(),
            att_lvlh: QAtt::default(),
            att_geoc: QAtt::default(),
            sun: Vector3::zeros(),
            moon: Vector3::zeros(),
            sun_fraction: 1.0,
            sun_radiance: SOLAR_CONSTANT,
        };
        loc.set_eci(utc, eci)?;
        Ok(loc)
    }

    /// Build a location held at a geodetic position
    pub fn from_geod(utc: f64, geod: Geodetic) -> PhysicsResult<Self> {
        let mut loc = Self::from_eci(utc, Cartesian::new(geod.to_itrf(), Vector3::zeros()))?;
        loc.set_geod(utc, geod)?;
        Ok(loc)
    }

    pub fn utc(&self) -> f64 {
        self.utc
    }

    pub fn eci(&self) -> &Cartesian {
        &self.eci
    }

    /// Earth-fixed (ITRF) state, velocity relative to the rotating Earth
    pub fn geoc(&self) -> &Cartesian {
        &self.geoc
    }

    pub fn geod(&self) -> &Geodetic {
        &self.geod
    }

    pub fn eci2itrf(&self) -> &Rotation3<f64> {
        &self.eci2itrf
    }

    pub fn icrf2lvlh(&self) -> &Rotation3<f64> {
        &self.icrf2lvlh
    }

    pub fn att_icrf(&self) -> &QAtt {
        &self.att_icrf
    }

    pub fn att_lvlh(&self) -> &QAtt {
        &self.att_lvlh
    }

    pub fn att_geoc(&self) -> &QAtt {
        &self.att_geoc
    }

    /// Geocentric Sun position (m, ECI)
    pub fn sun(&self) -> &Vector3<f64> {
        &self.sun
    }

    /// Geocentric Moon position (m, ECI)
    pub fn moon(&self) -> &Vector3<f64> {
        &self.moon
    }

    /// Visible fraction of the solar disk, 0 in umbra
    pub fn sun_fraction(&self) -> f64 {
        self.sun_fraction
    }

    /// Solar irradiance at the spacecraft (W/m²)
    pub fn sun_radiance(&self) -> f64 {
        self.sun_radiance
    }

    pub fn in_umbra(&self) -> bool {
        self.sun_fraction <= 0.0
    }

    pub fn in_penumbra(&self) -> bool {
        self.sun_fraction > 0.0 && self.sun_fraction < 1.0
    }

    /// Spherical radius (m)
    pub fn radius(&self) -> f64 {
        self.eci.s.norm()
    }

    /// Rotate an inertial vector into the body frame
    pub fn to_body(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.att_icrf.s * v
    }

    /// Rotate a body-frame vector into the inertial frame
    pub fn from_body(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.att_icrf.s.inverse() * v
    }

    /// Angular velocity of the LVLH frame in ECI
    fn lvlh_rate(&self) -> Vector3<f64> {
        let r2 = self.eci.s.norm_squared();
        if r2 > 0.0 {
            self.eci.s.cross(&self.eci.v) / r2
        } else {
            Vector3::zeros()
        }
    }

    /// Write the inertial state and re-derive every other frame
    pub fn set_eci(&mut self, utc: f64, eci: Cartesian) -> PhysicsResult<()> {
        self.utc = utc;
        self.eci = eci;
        self.eci2itrf = earth_rotation(utc);
        self.geoc = self.eci_to_geoc(&eci);
        self.geod = Geodetic::from_itrf(&self.geoc.s);
        self.icrf2lvlh = lvlh_rotation(&eci.s, &eci.v);
        self.update_ephemeris()?;
        self.derive_attitudes_from_icrf();
        Ok(())
    }

    /// Write the Earth-fixed state and re-derive every other frame
    pub fn set_geoc(&mut self, utc: f64, geoc: Cartesian) -> PhysicsResult<()> {
        let rot = earth_rotation(utc);
        let w = omega_earth();
        let wxr = w.cross(&geoc.s);
        let inv = rot.inverse();
        let eci = Cartesian {
            s: inv * geoc.s,
            v: inv * (geoc.v + wxr),
            a: inv * (geoc.a + 2.0 * w.cross(&geoc.v) + w.cross(&wxr)),
            j: inv * geoc.j,
        };
        self.set_eci(utc, eci)
    }

    /// Place the spacecraft at rest on a geodetic position
    pub fn set_geod(&mut self, utc: f64, geod: Geodetic) -> PhysicsResult<()> {
        self.set_geoc(utc, Cartesian::new(geod.to_itrf(), Vector3::zeros()))
    }

    /// Update the inertial acceleration and jerk without moving the spacecraft
    pub fn set_eci_accel(&mut self, a: Vector3<f64>, j: Vector3<f64>) {
        self.eci.a = a;
        self.eci.j = j;
        self.geoc = self.eci_to_geoc(&self.eci);
    }

    /// Write the inertial attitude and re-derive the other attitude frames
    pub fn set_att_icrf(&mut self, att: QAtt) {
        self.att_icrf = att;
        self.derive_attitudes_from_icrf();
    }

    /// Write the LVLH-relative attitude and re-derive the other frames
    pub fn set_att_lvlh(&mut self, att: QAtt) {
        let back = self.icrf2lvlh.inverse();
        self.att_icrf = QAtt {
            s: att.s * UnitQuaternion::from_rotation_matrix(&self.icrf2lvlh),
            v: back * att.v + self.lvlh_rate(),
            a: back * att.a,
        };
        self.att_lvlh = att;
        self.att_geoc = self.icrf_to_geoc_att();
    }

    /// Write the Earth-fixed attitude and re-derive the other frames
    pub fn set_att_geoc(&mut self, att: QAtt) {
        let back = self.eci2itrf.inverse();
        self.att_icrf = QAtt {
            s: att.s * UnitQuaternion::from_rotation_matrix(&self.eci2itrf),
            v: back * att.v + omega_earth(),
            a: back * att.a,
        };
        self.att_geoc = att;
        self.att_lvlh = self.icrf_to_lvlh_att();
    }

    /// Write the inertial angular acceleration into every attitude frame
    pub fn set_att_accel(&mut self, alpha_icrf: Vector3<f64>) {
        self.att_icrf.a = alpha_icrf;
        self.att_lvlh.a = self.icrf2lvlh * alpha_icrf;
        self.att_geoc.a = self.eci2itrf * alpha_icrf;
    }

    fn eci_to_geoc(&self, eci: &Cartesian) -> Cartesian {
        let w = omega_earth();
        let s = self.eci2itrf * eci.s;
        let wxr = w.cross(&s);
        let v = self.eci2itrf * eci.v - wxr;
        let a = self.eci2itrf * eci.a - 2.0 * w.cross(&v) - w.cross(&wxr);
        Cartesian {
            s,
            v,
            a,
            j: self.eci2itrf * eci.j,
        }
    }

    fn icrf_to_lvlh_att(&self) -> QAtt {
        QAtt {
            s: self.att_icrf.s * UnitQuaternion::from_rotation_matrix(&self.icrf2lvlh.inverse()),
            v: self.icrf2lvlh * (self.att_icrf.v - self.lvlh_rate()),
            a: self.icrf2lvlh * self.att_icrf.a,
        }
    }

    fn icrf_to_geoc_att(&self) -> QAtt {
        QAtt {
            s: self.att_icrf.s * UnitQuaternion::from_rotation_matrix(&self.eci2itrf.inverse()),
            v: self.eci2itrf * (self.att_icrf.v - omega_earth()),
            a: self.eci2itrf * self.att_icrf.a,
        }
    }

    fn derive_attitudes_from_icrf(&mut self) {
        self.att_lvlh = self.icrf_to_lvlh_att();
        self.att_geoc = self.icrf_to_geoc_att();
    }

    fn update_ephemeris(&mut self) -> PhysicsResult<()> {
        let instant = mjd_to_instant(self.utc)?;
        let sun = lpephem::sun::pos_gcrf(&instant);
        let moon = lpephem::moon::pos_gcrf(&instant);
        self.sun = Vector3::new(sun[0], sun[1], sun[2]);
        self.moon = Vector3::new(moon[0], moon[1], moon[2]);

        let to_sun = self.sun - self.eci.s;
        let dist = to_sun.norm();
        self.sun_fraction = shadow_fraction(&self.eci.s, &self.sun);
        self.sun_radiance = SOLAR_CONSTANT * (AU / dist).powi(2) * self.sun_fraction;
        Ok(())
    }
}

/// Conical Earth shadow: fraction of the solar disk visible from `s`
pub fn shadow_fraction(s: &Vector3<f64>, sun: &Vector3<f64>) -> f64 {
    let to_sun = sun - s;
    let to_earth = -s;
    let ds = to_sun.norm();
    let de = to_earth.norm();
    if de <= REARTHM {
        return 0.0;
    }

    let sun_radius = (RSUNM / ds).asin();
    let earth_radius = (REARTHM / de).asin();
    let separation = (to_sun.dot(&to_earth) / (ds * de)).clamp(-1.0, 1.0).acos();

    let sun_area = std::f64::consts::PI * sun_radius * sun_radius;
    let hidden = circle_intersection_area(sun_radius, earth_radius, separation);
    (1.0 - hidden / sun_area).clamp(0.0, 1.0)
}

/// Circular-orbit state over a geodetic point
///
/// `angle` is the heading of the ground track, measured from north towards
/// east. The velocity is the inertial circular speed in the local horizontal.
pub fn shape2eci(utc: f64, lat: f64, lon: f64, alt: f64, angle: f64) -> Cartesian {
    let geod = Geodetic::new(lat, lon, alt);
    let rot = earth_rotation(utc).inverse();
    let (east, north, _) = geod.enu_basis();
    let s = rot * geod.to_itrf();
    let speed = (super::constants::GM / s.norm()).sqrt();
    let dir = rot * (north * angle.cos() + east * angle.sin());
    Cartesian::new(s, dir * speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constants::GM;

    fn leo() -> Location {
        let r = 7_000_000.0;
        Location::from_eci(
            60000.0,
            Cartesian::new(
                Vector3::new(r, 0.0, 0.0),
                Vector3::new(0.0, 7500.0, 0.0),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_dcm_quaternion_round_trip() {
        // Deterministic sequence of Euler angles covering the sphere
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 11) as f64 / (1u64 << 53) as f64
        };
        for _ in 0..1000 {
            let roll = (next() * 2.0 - 1.0) * std::f64::consts::PI;
            let pitch = (next() * 2.0 - 1.0) * std::f64::consts::FRAC_PI_2;
            let yaw = (next() * 2.0 - 1.0) * std::f64::consts::PI;
            let m = *Rotation3::from_euler_angles(roll, pitch, yaw).matrix();
            let back = dcm_to_quaternion(&m).to_rotation_matrix();
            let err = (back.matrix() - m).abs().max();
            assert!(err < 1e-12, "round trip error {}", err);
        }
    }

    #[test]
    fn test_geodetic_round_trip() {
        for (lat, lon, h) in [
            (0.0, 0.0, 0.0),
            (45.0, 120.0, 500_000.0),
            (-89.9, -70.0, 1_000.0),
            (89.999, 10.0, 35_786_000.0),
        ] {
            let geod = Geodetic::from_degrees(lat, lon, h);
            let r = geod.to_itrf();
            let back = Geodetic::from_itrf(&r).to_itrf();
            assert!((back - r).norm() < 1e-6);
        }
    }

    #[test]
    fn test_frames_are_consistent() {
        let loc = leo();
        let back_from_geod = loc.eci2itrf().inverse() * loc.geod().to_itrf();
        assert!((back_from_geod - loc.eci().s).norm() < 1e-6);

        let nadir = loc.icrf2lvlh() * (-loc.eci().s);
        assert!((nadir - Vector3::new(0.0, 0.0, loc.radius())).norm() < 1e-6);
        let lvlh_back = loc.icrf2lvlh().inverse() * nadir;
        assert!((lvlh_back + loc.eci().s).norm() < 1e-6);
    }

    #[test]
    fn test_lvlh_attitude_round_trip() {
        let mut loc = leo();
        let att = QAtt {
            s: UnitQuaternion::from_euler_angles(0.1, -0.3, 0.7),
            v: Vector3::new(0.0, 1e-3, 0.0),
            a: Vector3::zeros(),
        };
        loc.set_att_lvlh(att);
        let icrf = *loc.att_icrf();
        loc.set_att_icrf(icrf);
        let (q, p) = (loc.att_lvlh().s.coords, att.s.coords);
        assert!((q - p).norm().min((q + p).norm()) < 1e-12);
        assert!((loc.att_lvlh().v - att.v).norm() < 1e-15);
    }

    #[test]
    fn test_geoc_state_round_trip() {
        let mut loc = leo();
        let geoc = *loc.geoc();
        let eci = *loc.eci();
        loc.set_geoc(loc.utc(), geoc).unwrap();
        assert!((loc.eci().s - eci.s).norm() < 1e-6);
        assert!((loc.eci().v - eci.v).norm() < 1e-9);
    }

    #[test]
    fn test_shadow_behind_earth() {
        let sun = Vector3::new(AU, 0.0, 0.0);
        let lit = shadow_fraction(&Vector3::new(7_000_000.0, 0.0, 0.0), &sun);
        let dark = shadow_fraction(&Vector3::new(-7_000_000.0, 0.0, 0.0), &sun);
        assert_eq!(lit, 1.0);
        assert_eq!(dark, 0.0);
    }

    #[test]
    fn test_shape2eci_circular_speed() {
        let cart = shape2eci(60000.0, 0.5, 1.0, 400_000.0, 0.3);
        let r = cart.s.norm();
        assert!((cart.v.norm() - (GM / r).sqrt()).abs() < 1e-9);
        assert!(cart.s.dot(&cart.v).abs() / (r * cart.v.norm()) < 1e-12);
    }
}

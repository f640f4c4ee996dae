//! Time handling
//!
//! The engine keeps time as an `f64` Modified Julian Date in UTC. This module
//! converts between MJD, calendar dates and `satkit::Instant` (needed for
//! ephemerides and SGP4), and provides Greenwich mean sidereal time.

use super::constants::SECONDS_PER_DAY;
use super::error::{PhysicsError, PhysicsResult};
use satkit::Instant;

/// MJD of the J2000 epoch (2000-01-01 12:00)
pub const MJD_J2000: f64 = 51544.5;

/// Calendar date and time of day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarDate {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: f64,
}

/// Convert a calendar date (Gregorian) to MJD
pub fn cal2mjd(year: i32, month: i32, day: f64) -> f64 {
    let (y, m) = if month <= 2 {
        (year - 1, month + 12)
    } else {
        (year, month)
    };
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    let jd = (365.25 * (y as f64 + 4716.0)).floor() + (30.6001 * (m as f64 + 1.0)).floor() + day
        + b
        - 1524.5;
    jd - 2_400_000.5
}

/// Convert MJD to a calendar date
pub fn mjd2cal(mjd: f64) -> CalendarDate {
    let jd = mjd + 2_400_000.5 + 0.5;
    let z = jd.floor();
    let f = jd - z;
    let a = if z < 2_299_161.0 {
        z
    } else {
        let alpha = ((z - 1_867_216.25) / 36_524.25).floor();
        z + 1.0 + alpha - (alpha / 4.0).floor()
    };
    let b = a + 1524.0;
    let c = ((b - 122.1) / 365.25).floor();
    let d = (365.25 * c).floor();
    let e = ((b - d) / 30.6001).floor();

    let day = b - d - (30.6001 * e).floor();
    let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
    let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };

    let mut seconds = f * SECONDS_PER_DAY;
    let hour = (seconds / 3600.0).floor();
    seconds -= hour * 3600.0;
    let minute = (seconds / 60.0).floor();
    seconds -= minute * 60.0;

    CalendarDate {
        year: year as i32,
        month: month as i32,
        day: day as i32,
        hour: hour as i32,
        minute: minute as i32,
        second: seconds,
    }
}

/// Convert MJD (UTC) to a satkit instant
pub fn mjd_to_instant(mjd: f64) -> PhysicsResult<Instant> {
    let cal = mjd2cal(mjd);
    Instant::from_datetime(
        cal.year,
        cal.month,
        cal.day,
        cal.hour,
        cal.minute,
        cal.second,
    )
    .map_err(|_| PhysicsError::args(format!("MJD {} is not a representable instant", mjd)))
}

/// Convert a satkit instant to MJD (UTC)
pub fn instant_to_mjd(instant: &Instant) -> f64 {
    let (year, month, day, hour, minute, second) = instant.as_datetime();
    let fraction = (hour as f64 * 3600.0 + minute as f64 * 60.0 + second as f64) / SECONDS_PER_DAY;
    cal2mjd(year as i32, month as i32, day as f64 + fraction)
}

/// Current wall-clock time as MJD
pub fn current_mjd() -> f64 {
    let now = chrono::Utc::now();
    let unix_seconds = now.timestamp() as f64 + now.timestamp_subsec_nanos() as f64 * 1e-9;
    40587.0 + unix_seconds / SECONDS_PER_DAY
}

/// Greenwich mean sidereal time (IAU-82) in radians, UT1 taken as UTC
pub fn gmst(mjd: f64) -> f64 {
    let t = (mjd - MJD_J2000) / 36525.0;
    let seconds = 67310.54841 + (876_600.0 * 3600.0 + 8_640_184.812866) * t + 0.093104 * t * t
        - 6.2e-6 * t * t * t;
    let angle = (seconds.rem_euclid(SECONDS_PER_DAY) / 240.0).to_radians();
    angle.rem_euclid(std::f64::consts::TAU)
}

/// Round a timestep so that `utc + dt` is exactly representable as a day fraction
///
/// Returns `(dt, dtj)` in seconds and days.
pub fn munge_dt(utc: f64, dt: f64) -> (f64, f64) {
    let test = utc + dt / SECONDS_PER_DAY;
    let dt = SECONDS_PER_DAY * (test - utc);
    (dt, dt / SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_epochs() {
        assert!((cal2mjd(2000, 1, 1.5) - MJD_J2000).abs() < 1e-9);
        assert!((cal2mjd(1858, 11, 17.0)).abs() < 1e-9);
    }

    #[test]
    fn test_calendar_round_trip() {
        let mjd = 60000.123456;
        let cal = mjd2cal(mjd);
        let fraction = (cal.hour as f64 * 3600.0 + cal.minute as f64 * 60.0 + cal.second) / 86400.0;
        let back = cal2mjd(cal.year, cal.month, cal.day as f64 + fraction);
        assert!((back - mjd).abs() < 1e-9);
        assert_eq!(cal.year, 2023);
        assert_eq!(cal.month, 2);
        assert_eq!(cal.day, 25);
    }

    #[test]
    fn test_gmst_at_j2000() {
        // 280.46061837 degrees at J2000.0
        let expected = 280.46061837_f64.to_radians();
        assert!((gmst(MJD_J2000) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_munged_dt_is_consistent() {
        let utc = 60000.0;
        let (dt, dtj) = munge_dt(utc, 60.0);
        assert!((dt - 60.0).abs() < 1e-5);
        assert!((utc + dtj - (utc + 60.0 / 86400.0)).abs() < 1e-11);
    }
}

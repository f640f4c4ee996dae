//! Spherical-harmonic Earth gravity field
//!
//! Coefficients are loaded once into an immutable [`GravityModel`] owned by
//! the caller and shared by reference. The field is evaluated with the
//! cartesian V/W recursion, which needs no trigonometry and no division by
//! cos(latitude), so it is well behaved at the poles.

use super::constants::{GM, REARTHM};
use super::error::{PhysicsError, PhysicsResult};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coefficient set and file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GravityModelId {
    /// PGM2000A, unnormalized, 6 columns per line
    Pgm2000a = 1,
    /// EGM2008, unnormalized, 4 columns per line
    Egm2008 = 2,
    /// PGM2000A, fully normalized
    Pgm2000aNorm = 3,
    /// EGM2008, fully normalized
    #[default]
    Egm2008Norm = 4,
}

impl GravityModelId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pgm2000a => "PGM2000A",
            Self::Egm2008 => "EGM2008",
            Self::Pgm2000aNorm => "PGM2000A (normalized)",
            Self::Egm2008Norm => "EGM2008 (normalized)",
        }
    }

    pub fn all() -> &'static [GravityModelId] {
        &[
            Self::Pgm2000a,
            Self::Egm2008,
            Self::Pgm2000aNorm,
            Self::Egm2008Norm,
        ]
    }

    pub fn from_code(code: i32) -> PhysicsResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|id| *id as i32 == code)
            .ok_or_else(|| PhysicsError::out_of_range(format!("gravity model {}", code)))
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, Self::Pgm2000aNorm | Self::Egm2008Norm)
    }

    /// Whitespace-separated columns per data line
    pub fn columns(&self) -> usize {
        match self {
            Self::Pgm2000a | Self::Pgm2000aNorm => 6,
            Self::Egm2008 | Self::Egm2008Norm => 4,
        }
    }

    /// Highest degree the published file carries
    pub fn max_degree(&self) -> usize {
        match self {
            Self::Pgm2000a | Self::Pgm2000aNorm => 360,
            Self::Egm2008 | Self::Egm2008Norm => 100,
        }
    }
}

/// Factor turning a fully normalized coefficient into an unnormalized one
///
/// `sqrt((2 - δ₀ₘ)(2l + 1)(l - m)! / (l + m)!)`, accumulated as a running
/// product so large degrees never form a factorial.
pub fn normalization(l: usize, m: usize) -> f64 {
    let mut n = if m == 0 { 1.0 } else { 2.0 } * (2 * l + 1) as f64;
    for k in (l - m + 1)..=(l + m) {
        n /= k as f64;
    }
    n.sqrt()
}

/// Unnormalized C/S coefficients up to `degree`
#[derive(Debug, Clone, PartialEq)]
pub struct GravityModel {
    name: String,
    degree: usize,
    c: Vec<Vec<f64>>,
    s: Vec<Vec<f64>>,
}

impl GravityModel {
    fn empty(name: impl Into<String>, degree: usize) -> Self {
        let mut c: Vec<Vec<f64>> = (0..=degree).map(|l| vec![0.0; l + 1]).collect();
        let s = c.clone();
        c[0][0] = 1.0;
        Self {
            name: name.into(),
            degree,
            c,
            s,
        }
    }

    /// Central term only
    pub fn point_mass() -> Self {
        Self::empty("Point mass", 0)
    }

    /// EGM2008 through degree and order 3, no file needed
    pub fn egm2008_low_degree() -> Self {
        const TERMS: [(usize, usize, f64, f64); 7] = [
            (2, 0, -4.841651437908150e-04, 0.0),
            (2, 2, 2.439383573283130e-06, -1.400273703859340e-06),
            (3, 0, 9.571612070934730e-07, 0.0),
            (3, 1, 2.030462010478640e-06, 2.482004158568720e-07),
            (3, 2, 9.047878948095281e-07, -6.190054751776180e-07),
            (3, 3, 7.213217571215680e-07, 1.414349261929410e-06),
            (2, 1, 0.0, 0.0),
        ];
        let mut model = Self::empty("EGM2008 (degree 3)", 3);
        for (l, m, c, s) in TERMS {
            let n = normalization(l, m);
            model.c[l][m] = c * n;
            model.s[l][m] = s * n;
        }
        model
    }

    /// Parse a coefficient table; lines above `max_degree` are ignored
    pub fn parse(id: GravityModelId, text: &str, max_degree: usize) -> PhysicsResult<Self> {
        let max_degree = max_degree.min(id.max_degree());
        let mut model = Self::empty(id.name(), max_degree);
        let mut highest = 0;

        for (lineno, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() || fields[0].starts_with('#') {
                continue;
            }
            if fields.len() < id.columns() {
                return Err(PhysicsError::args(format!(
                    "{} line {}: expected {} columns, found {}",
                    id.name(),
                    lineno + 1,
                    id.columns(),
                    fields.len()
                )));
            }
            let bad = |what: &str| {
                PhysicsError::args(format!("{} line {}: bad {}", id.name(), lineno + 1, what))
            };
            let l: usize = fields[0].parse().map_err(|_| bad("degree"))?;
            let m: usize = fields[1].parse().map_err(|_| bad("order"))?;
            let c = parse_real(fields[2]).ok_or_else(|| bad("C coefficient"))?;
            let s = parse_real(fields[3]).ok_or_else(|| bad("S coefficient"))?;
            if m > l {
                return Err(bad("order above degree"));
            }
            if l > max_degree {
                // Files are sorted by degree
                break;
            }

            let n = if id.is_normalized() {
                normalization(l, m)
            } else {
                1.0
            };
            model.c[l][m] = c * n;
            model.s[l][m] = s * n;
            highest = highest.max(l);
        }

        if highest < max_degree {
            log::warn!(
                "{} supplied coefficients to degree {} of {} requested",
                id.name(),
                highest,
                max_degree
            );
        }
        Ok(model)
    }

    /// Read and parse a coefficient file
    pub fn load(
        id: GravityModelId,
        path: impl AsRef<Path>,
        max_degree: usize,
    ) -> PhysicsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PhysicsError::io(path, &e))?;
        let model = Self::parse(id, &text, max_degree)?;
        log::info!(
            "Loaded {} gravity model to degree {} from {}",
            id.name(),
            model.degree,
            path.display()
        );
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Unnormalized (C, S) for degree `l`, order `m`
    pub fn coefficient(&self, l: usize, m: usize) -> (f64, f64) {
        (self.c[l][m], self.s[l][m])
    }

    /// Acceleration at an Earth-fixed position, in the same frame (m/s²)
    ///
    /// `degree` is clamped to the model's degree.
    pub fn accel(&self, position: &Vector3<f64>, degree: usize) -> Vector3<f64> {
        let degree = degree.min(self.degree);
        let size = degree + 2;
        let mut vc = vec![vec![0.0; size]; size];
        let mut wc = vec![vec![0.0; size]; size];

        let r = position.norm();
        vc[0][0] = REARTHM / r;
        let ratio = vc[0][0] / r;
        let rratio = REARTHM * ratio;
        let xratio = position.x * ratio;
        let yratio = position.y * ratio;
        let zratio = position.z * ratio;

        vc[1][0] = zratio * vc[0][0];
        for il in 2..=degree + 1 {
            let l = il as f64;
            vc[il][0] = (2.0 * l - 1.0) * zratio * vc[il - 1][0] / l
                - (l - 1.0) * rratio * vc[il - 2][0] / l;
        }
        for im in 1..=degree + 1 {
            let m = im as f64;
            vc[im][im] = (2.0 * m - 1.0) * (xratio * vc[im - 1][im - 1] - yratio * wc[im - 1][im - 1]);
            wc[im][im] = (2.0 * m - 1.0) * (xratio * wc[im - 1][im - 1] + yratio * vc[im - 1][im - 1]);
            if im <= degree {
                vc[im + 1][im] = (2.0 * m + 1.0) * zratio * vc[im][im];
                wc[im + 1][im] = (2.0 * m + 1.0) * zratio * wc[im][im];
            }
            for il in im + 2..=degree + 1 {
                let l = il as f64;
                let lm = l - m;
                vc[il][im] = (2.0 * l - 1.0) * zratio * vc[il - 1][im] / lm
                    - (l + m - 1.0) * rratio * vc[il - 2][im] / lm;
                wc[il][im] = (2.0 * l - 1.0) * zratio * wc[il - 1][im] / lm
                    - (l + m - 1.0) * rratio * wc[il - 2][im] / lm;
            }
        }

        let mut accel = Vector3::zeros();
        for im in 0..=degree {
            for il in im..=degree {
                let c = self.c[il][im];
                let s = self.s[il][im];
                if im == 0 {
                    accel.x -= c * vc[il + 1][1];
                    accel.y -= c * wc[il + 1][1];
                    accel.z -= (il + 1) as f64 * c * vc[il + 1][0];
                } else {
                    let fr = ((il - im + 2) * (il - im + 1)) as f64;
                    accel.x -= 0.5
                        * (c * vc[il + 1][im + 1] + s * wc[il + 1][im + 1]
                            - fr * (c * vc[il + 1][im - 1] + s * wc[il + 1][im - 1]));
                    accel.y -= 0.5
                        * (c * wc[il + 1][im + 1] - s * vc[il + 1][im + 1]
                            + fr * (c * wc[il + 1][im - 1] - s * vc[il + 1][im - 1]));
                    accel.z -= (il - im + 1) as f64 * (c * vc[il + 1][im] + s * wc[il + 1][im]);
                }
            }
        }

        accel * (GM / (REARTHM * REARTHM))
    }
}

/// Gravitational acceleration at an Earth-fixed position
pub fn gravity_accel(position: &Vector3<f64>, model: &GravityModel, degree: usize) -> Vector3<f64> {
    model.accel(position, degree)
}

fn parse_real(field: &str) -> Option<f64> {
    field.replace(['D', 'd'], "e").parse().ok()
}

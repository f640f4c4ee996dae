//! Error type shared by the physics engine

/// Physics engine error types
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Orbit radius dropped below the Earth's surface
    TooLow { radius: f64, utc: f64 },

    /// Structure carries no mass; shares the legacy `TooLow` code
    MassTooLow { mass: f64 },

    /// Unknown structure type or malformed sensor geometry
    OutOfRange { message: String },

    /// Malformed orbit definition or other bad input
    ArgsError { message: String },

    /// Coefficient, TLE or settings file could not be read
    Io { path: String, message: String },

    /// An iterative routine ran out of budget
    Timeout { message: String },

    /// TLE parsing or SGP4 evaluation failed
    Tle { message: String },
}

impl PhysicsError {
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    pub fn args(message: impl Into<String>) -> Self {
        Self::ArgsError {
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Legacy integer code for telemetry consumers
    pub fn code(&self) -> i32 {
        match self {
            Self::TooLow { .. } | Self::MassTooLow { .. } => -1,
            Self::OutOfRange { .. } => -2,
            Self::ArgsError { .. } => -3,
            Self::Io { .. } => -4,
            Self::Timeout { .. } => -5,
            Self::Tle { .. } => -6,
        }
    }
}

impl std::fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLow { radius, utc } => {
                write!(
                    f,
                    "Orbit too low: radius {:.1} km at MJD {:.6}",
                    radius / 1000.0,
                    utc
                )
            }
            Self::MassTooLow { mass } => write!(f, "Structure mass too low: {} kg", mass),
            Self::OutOfRange { message } => write!(f, "Out of range: {}", message),
            Self::ArgsError { message } => write!(f, "Invalid arguments: {}", message),
            Self::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
            Self::Timeout { message } => write!(f, "Timed out: {}", message),
            Self::Tle { message } => write!(f, "TLE error: {}", message),
        }
    }
}

impl std::error::Error for PhysicsError {}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

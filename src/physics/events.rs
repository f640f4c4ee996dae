//! Orbital event detection
//!
//! Events are found by comparing consecutive steps, so their times are
//! quantized to the propagation timestep.

use super::constants::SECONDS_PER_DAY;
use super::location::Location;
use super::target::{Target, TargetKind};
use serde::Serialize;

/// Ground station elevation thresholds (deg)
pub const GS_THRESHOLDS: [f64; 3] = [0.0, 5.0, 10.0];

/// Event families with their legacy type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// Latitude crossing northwards
    LatAscending,
    /// Latitude crossing southwards
    LatDescending,
    /// Northernmost point of the orbit
    LatMax,
    /// Southernmost point of the orbit
    LatMin,
    Umbra,
    Penumbra,
    /// Ground station above 0°
    Gs,
    Gs5,
    Gs10,
    /// Highest elevation of a ground station pass
    GsMax,
    /// Imaging target above the horizon
    Target,
    /// Highest elevation of a target pass
    TargetMax,
}

impl EventKind {
    pub fn code(&self) -> u16 {
        match self {
            Self::LatAscending => 0x1101,
            Self::LatDescending => 0x1102,
            Self::LatMax => 0x1110,
            Self::LatMin => 0x1120,
            Self::Umbra => 0x1206,
            Self::Penumbra => 0x1208,
            Self::Gs => 0x1400,
            Self::Gs5 => 0x1401,
            Self::Gs10 => 0x1402,
            Self::GsMax => 0x1404,
            Self::Target => 0x1800,
            Self::TargetMax => 0x1801,
        }
    }

    fn threshold(kind: TargetKind, i: usize) -> Self {
        match (kind, i) {
            (TargetKind::Target, _) => Self::Target,
            (_, 1) => Self::Gs5,
            (_, 2) => Self::Gs10,
            _ => Self::Gs,
        }
    }
}

/// One detected event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Time of the event (MJD UTC)
    pub utc: f64,
    pub kind: EventKind,
    /// Short label such as `UMB_IN` or `AOS5`
    pub name: String,
    /// Ground station or target the event refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Whether this closes an interval
    pub exit: bool,
    /// Length of the closed interval (s), zero for entries and instants
    pub duration: f64,
    /// Peak elevation over the interval, or the latitude for latitude events (rad)
    pub elevation: f64,
    /// Azimuth of the spacecraft from the target at the event time (rad), zero
    /// for eclipse and latitude events
    pub azimuth: f64,
}

impl Event {
    fn instant(utc: f64, kind: EventKind, name: &str, elevation: f64) -> Self {
        Self {
            utc,
            kind,
            name: name.to_string(),
            target: None,
            exit: false,
            duration: 0.0,
            elevation,
            azimuth: 0.0,
        }
    }

    fn for_target(mut self, target: &Target) -> Self {
        self.target = Some(target.name.clone());
        self.azimuth = target.azimuth;
        self
    }
}

/// An interval that has started and not yet ended
#[derive(Debug, Clone, Copy, PartialEq)]
struct Open {
    start: f64,
    peak: f64,
}

impl Open {
    fn new(start: f64, elevation: f64) -> Self {
        Self {
            start,
            peak: elevation,
        }
    }

    fn close(self, utc: f64, kind: EventKind, name: &str) -> Event {
        Event {
            utc,
            kind,
            name: name.to_string(),
            target: None,
            exit: true,
            duration: (utc - self.start) * SECONDS_PER_DAY,
            elevation: self.peak,
            azimuth: 0.0,
        }
    }
}

/// Per-target pass state
#[derive(Debug, Clone, Default)]
struct Track {
    passes: [Option<Open>; 3],
    /// Time, elevation and azimuth at the previous step
    last: Option<(f64, f64, f64)>,
    rising: bool,
}

/// Detects eclipse, latitude and visibility events step by step
#[derive(Debug, Clone, Default)]
pub struct EventGenerator {
    umbra: Option<Open>,
    penumbra: Option<Open>,
    last_lat: Option<(f64, f64)>,
    northward: Option<bool>,
    tracks: Vec<Track>,
    events: Vec<Event>,
}

impl EventGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted by the last call to [`EventGenerator::update`]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Compare `loc` and `targets` with the previous step
    ///
    /// With `force_end`, every interval still open is closed at `loc`'s time.
    pub fn update(&mut self, loc: &Location, targets: &[Target], force_end: bool) -> &[Event] {
        self.events.clear();
        let utc = loc.utc();

        self.shadow(utc, loc.in_umbra(), loc.in_penumbra());
        self.latitude(utc, loc.geod().lat);

        if self.tracks.len() != targets.len() {
            self.tracks.resize_with(targets.len(), Track::default);
        }
        for (i, target) in targets.iter().enumerate() {
            self.visibility(i, utc, target);
        }

        if force_end {
            self.close_all(utc, targets);
        }
        for event in &self.events {
            log::debug!(
                "Event {} {} at MJD {:.6}",
                event.name,
                event.target.as_deref().unwrap_or(""),
                event.utc
            );
        }
        &self.events
    }

    /// Forget all history, e.g. after a reset
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn shadow(&mut self, utc: f64, umbra: bool, penumbra: bool) {
        for (open, inside, kind, names) in [
            (&mut self.umbra, umbra, EventKind::Umbra, ("UMB_IN", "UMB_OUT")),
            (
                &mut self.penumbra,
                penumbra,
                EventKind::Penumbra,
                ("PEN_IN", "PEN_OUT"),
            ),
        ] {
            match (*open, inside) {
                (None, true) => {
                    *open = Some(Open::new(utc, 0.0));
                    self.events.push(Event::instant(utc, kind, names.0, 0.0));
                }
                (Some(interval), false) => {
                    *open = None;
                    self.events.push(interval.close(utc, kind, names.1));
                }
                _ => {}
            }
        }
    }

    fn latitude(&mut self, utc: f64, lat: f64) {
        if let Some((last_utc, last)) = self.last_lat {
            if last < 0.0 && lat >= 0.0 {
                self.events
                    .push(Event::instant(utc, EventKind::LatAscending, "EQA", lat));
            } else if last > 0.0 && lat <= 0.0 {
                self.events
                    .push(Event::instant(utc, EventKind::LatDescending, "EQD", lat));
            }

            if lat != last {
                let northward = lat > last;
                match self.northward {
                    Some(true) if !northward => self.events.push(Event::instant(
                        last_utc,
                        EventKind::LatMax,
                        "MAXN",
                        last,
                    )),
                    Some(false) if northward => self.events.push(Event::instant(
                        last_utc,
                        EventKind::LatMin,
                        "MAXS",
                        last,
                    )),
                    _ => {}
                }
                self.northward = Some(northward);
            }
        }
        self.last_lat = Some((utc, lat));
    }

    fn visibility(&mut self, i: usize, utc: f64, target: &Target) {
        let elevation = target.elevation;
        let track = &mut self.tracks[i];
        let levels = match target.kind {
            TargetKind::GroundStation => GS_THRESHOLDS.len(),
            TargetKind::Target => 1,
        };

        for (level, threshold) in GS_THRESHOLDS.iter().take(levels).enumerate() {
            let kind = EventKind::threshold(target.kind, level);
            let above = elevation > threshold.to_radians();
            match (track.passes[level], above) {
                (None, true) => {
                    track.passes[level] = Some(Open::new(utc, elevation));
                    let name = format!("AOS{}", *threshold as u32);
                    self.events
                        .push(Event::instant(utc, kind, &name, elevation).for_target(target));
                }
                (Some(mut pass), true) => {
                    pass.peak = pass.peak.max(elevation);
                    track.passes[level] = Some(pass);
                }
                (Some(pass), false) => {
                    track.passes[level] = None;
                    let name = format!("LOS{}", *threshold as u32);
                    self.events
                        .push(pass.close(utc, kind, &name).for_target(target));
                }
                (None, false) => {}
            }
        }

        if let Some((last_utc, last, last_azimuth)) = track.last {
            if elevation > last {
                track.rising = true;
            } else if elevation < last && track.rising {
                track.rising = false;
                if last > 0.0 {
                    let kind = match target.kind {
                        TargetKind::GroundStation => EventKind::GsMax,
                        TargetKind::Target => EventKind::TargetMax,
                    };
                    let mut max = Event::instant(last_utc, kind, "MAX", last).for_target(target);
                    max.azimuth = last_azimuth;
                    self.events.push(max);
                }
            }
        }
        track.last = Some((utc, elevation, target.azimuth));
    }

    fn close_all(&mut self, utc: f64, targets: &[Target]) {
        if let Some(interval) = self.umbra.take() {
            self.events
                .push(interval.close(utc, EventKind::Umbra, "UMB_OUT"));
        }
        if let Some(interval) = self.penumbra.take() {
            self.events
                .push(interval.close(utc, EventKind::Penumbra, "PEN_OUT"));
        }
        for (track, target) in self.tracks.iter_mut().zip(targets) {
            for (level, threshold) in GS_THRESHOLDS.iter().enumerate() {
                if let Some(pass) = track.passes[level].take() {
                    let kind = EventKind::threshold(target.kind, level);
                    let name = format!("LOS{}", *threshold as u32);
                    self.events
                        .push(pass.close(utc, kind, &name).for_target(target));
                }
            }
        }
    }
}

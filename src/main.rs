//! spacephys - run one spacecraft simulation from the command line
//!
//! Writes a CSV ephemeris and an events JSON file next to it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use spacephys::physics::constants::SECONDS_PER_DAY;
use spacephys::physics::{Event, OrbitDefinition, PhysicsError, PhysicsSettings, State};

#[derive(Parser, Debug)]
#[command(name = "spacephys", version, about = "Spacecraft orbit, attitude, thermal and power simulation")]
struct Cli {
    /// Orbit definition as inline JSON, e.g. '{"tle":"iss.tle"}'
    #[arg(long, conflicts_with = "orbit_file")]
    orbit: Option<String>,
    /// File holding the orbit definition
    #[arg(long)]
    orbit_file: Option<PathBuf>,
    /// Settings JSON; defaults when absent
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Simulated time span in seconds
    #[arg(long, default_value_t = 5400.0)]
    duration: f64,
    /// CSV ephemeris path; events go to the same stem with .events.json
    #[arg(long, default_value = "out/ephemeris.csv")]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
struct EventReport<'a> {
    generated_at: String,
    start_utc: f64,
    end_utc: f64,
    position: &'static str,
    attitude: &'static str,
    events: &'a [Event],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    if !(cli.duration > 0.0) {
        return Err(anyhow!("duration must be > 0"));
    }

    let text = match (&cli.orbit, &cli.orbit_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading orbit definition {}", path.display()))?,
        (None, None) => return Err(anyhow!("one of --orbit or --orbit-file is required")),
    };
    let orbit = OrbitDefinition::parse(&text).context("parsing orbit definition")?;

    let settings = match &cli.settings {
        Some(path) => PhysicsSettings::load(path)
            .with_context(|| format!("loading settings {}", path.display()))?,
        None => PhysicsSettings::default(),
    };

    let mut state = State::new(settings, &orbit).context("building spacecraft")?;
    state.init().context("initializing propagators")?;

    let start = state.utc();
    let end = start + cli.duration / SECONDS_PER_DAY;
    let steps = (cli.duration / state.dt()).round() as u64;
    log::info!(
        "Propagating {:.0} s from MJD {:.6} in {} steps of {:.3} s",
        cli.duration,
        start,
        steps,
        state.dt()
    );

    if let Some(parent) = cli.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut csv = BufWriter::new(file);
    writeln!(
        csv,
        "utc,x,y,z,vx,vy,vz,lat_deg,lon_deg,alt_m,temp_k,battery_j,powgen_w"
    )?;
    write_row(&mut csv, &state)?;

    let progress = ProgressBar::new(steps);
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
        )?
        .progress_chars("##-"),
    );

    while state.position().clock().before(end) {
        match state.step() {
            Ok(()) => {}
            Err(e @ PhysicsError::TooLow { .. }) => {
                log::warn!("Simulation ended: {}", e);
                break;
            }
            Err(e) => return Err(e).context("propagation failed"),
        }
        write_row(&mut csv, &state)?;
        progress.inc(1);
    }
    progress.finish_and_clear();
    csv.flush()?;
    state.finish();
    log::info!("Wrote ephemeris to {}", cli.output.display());

    let events_path = events_path(&cli.output);
    let report = EventReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        start_utc: start,
        end_utc: state.utc(),
        position: state.position().kind().name(),
        attitude: state.attitude().kind().name(),
        events: state.event_log(),
    };
    let file = File::create(&events_path)
        .with_context(|| format!("creating {}", events_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
    log::info!(
        "Wrote {} events to {}",
        state.event_log().len(),
        events_path.display()
    );
    Ok(())
}

fn write_row(out: &mut impl Write, state: &State) -> Result<()> {
    let loc = state.loc();
    let phys = state.phys();
    let (s, v, geod) = (loc.eci().s, loc.eci().v, loc.geod());
    writeln!(
        out,
        "{:.8},{:.3},{:.3},{:.3},{:.6},{:.6},{:.6},{:.6},{:.6},{:.1},{:.3},{:.1},{:.3}",
        loc.utc(),
        s.x,
        s.y,
        s.z,
        v.x,
        v.y,
        v.z,
        geod.lat.to_degrees(),
        geod.lon.to_degrees(),
        geod.h,
        phys.temp,
        phys.battlev,
        phys.powgen
    )?;
    Ok(())
}

fn events_path(output: &Path) -> PathBuf {
    output.with_extension("events.json")
}

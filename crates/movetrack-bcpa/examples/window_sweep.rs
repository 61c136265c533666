//! Behavioural change point analysis of a loaded track
//!
//! Usage: `cargo run -p movetrack-bcpa --example window_sweep -- <file.tsv> <zone> [individual]`
//!
//! Window size, sensitivity, clusterwidth and threshold are set below and
//! should be tuned to the sampling rate of the data.

use movetrack_bcpa::{
    ChangePointSummaryParameters, ResponseKind, VelocitySeries, WindowSweep, WindowSweepParameters,
};
use movetrack_core::TabularOutput;
use movetrack_track::{Hemisphere, LoaderConfig, ProjectionConfig, TrackLoader};
use tracing_subscriber::EnvFilter;

const WINDOW_SIZE: usize = 8;
const SENSITIVITY: f64 = 2.0;
const CLUSTERWIDTH_HOURS: f64 = 2.0;
const THRESHOLD: usize = 2;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/../movetrack-track/tests/data/sample_track.tsv")
            .to_string()
    });
    let zone: u8 = args.next().map(|z| z.parse()).transpose()?.unwrap_or(33);
    let wanted = args.next();

    println!("=== Behavioural Change Point Analysis ===\n");

    let (track, report) = TrackLoader::new(LoaderConfig::movebank()).from_path(&path)?;
    println!("{report}");
    let projected = track.project(&ProjectionConfig::utm(zone, Hemisphere::North)?)?;
    let id = match wanted {
        Some(id) => id,
        None => projected
            .individuals()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("track has no individuals"))?,
    };
    let trajectory = projected.trajectory(&id)?;
    let series = VelocitySeries::from_trajectory(&trajectory)?;
    println!("{} velocity observations for {id}\n", series.len());

    let params = WindowSweepParameters::new(WINDOW_SIZE, SENSITIVITY)
        .with_response(ResponseKind::Persistence);
    let sweep = WindowSweep::new(params)?.analyze(&series)?;
    println!("{sweep}\n");

    let flat = sweep.flat_summary(&ChangePointSummaryParameters::new(CLUSTERWIDTH_HOURS, THRESHOLD)?)?;
    println!("{flat}");

    println!("--- phases ---");
    flat.phase_table().write_csv(std::io::stdout())?;
    println!("\n--- smooth summary ---");
    sweep.smooth_summary(None)?.write_csv(std::io::stdout())?;

    Ok(())
}

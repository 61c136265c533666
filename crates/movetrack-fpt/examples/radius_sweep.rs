//! First passage time radius sweep over a loaded track
//!
//! Usage: `cargo run -p movetrack-fpt --example radius_sweep -- <file.tsv> <zone> [individual]`

use movetrack_core::TabularOutput;
use movetrack_fpt::{FirstPassageTime, FptParameters};
use movetrack_track::{Hemisphere, LoaderConfig, ProjectionConfig, TrackLoader};
use tracing_subscriber::EnvFilter;

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

    println!("=== First Passage Time ===\n");

    let (track, report) = TrackLoader::new(LoaderConfig::movebank()).from_path(&path)?;
    println!("Loaded {} of {} rows", report.rows_kept, report.rows_read);

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
    println!("{trajectory}\n");

    let analyzer = FirstPassageTime::new(FptParameters::by_step(50.0, 2000.0, 50.0)?)?;
    let result = analyzer.analyze(&trajectory)?;

    println!("{}", result.curve());
    result.curve().write_csv(std::io::stdout())?;

    Ok(())
}

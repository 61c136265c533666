//! Load a Movebank export, project it to UTM and print path metrics
//!
//! Usage: `cargo run -p movetrack-track --example load_and_project -- <file.tsv> [zone] [south]`

use movetrack_core::TabularOutput;
use movetrack_track::{Hemisphere, LoaderConfig, ProjectionConfig, TrackLoader};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("movetrack_track=info".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample_track.tsv").to_string());
    let zone: u8 = args.next().map(|z| z.parse()).transpose()?.unwrap_or(33);
    let hemisphere = match args.next().as_deref() {
        Some("south") => Hemisphere::South,
        _ => Hemisphere::North,
    };

    println!("=== Track loading and projection ===\n");

    let loader = TrackLoader::new(LoaderConfig::movebank());
    let (track, report) = loader.from_path(&path)?;
    println!("{report}\n");

    let projection = ProjectionConfig::utm(zone, hemisphere)?;
    println!("Projection: {projection}");
    let projected = track.project(&projection)?;

    for trajectory in projected.trajectories()? {
        println!("\n--- {trajectory} ---");
        let table = trajectory.path_metrics();
        println!("Total distance: {:.1} m", table.total_distance());
        let elapsed = trajectory.elapsed_hours();
        if let Some(hours) = elapsed.last() {
            println!("Duration: {hours:.1} h");
        }
        table.write_csv(std::io::stdout())?;
    }

    Ok(())
}

//! Two-state HMM fit to a loaded track, compared against a covariate model
//!
//! Usage: `cargo run -p movetrack-hmm --example two_state_fit -- <file.tsv> <zone> [covariate]`
//!
//! Without a covariate the comparison model has three states instead.

use movetrack_core::TabularOutput;
use movetrack_hmm::{
    AngleDistribution, HmmConfig, HmmData, HmmFitter, HmmParameters, ModelComparison,
    StepDistribution,
};
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
    let covariate = args.next();
    let covariates: Vec<&str> = covariate.iter().map(String::as_str).collect();

    println!("=== Two-state HMM ===\n");

    let config = LoaderConfig::movebank().with_covariates(covariates.iter().copied());
    let (track, report) = TrackLoader::new(config).from_path(&path)?;
    println!("{report}");
    let projected = track.project(&ProjectionConfig::utm(zone, Hemisphere::North)?)?;
    let trajectories = projected.trajectories()?;

    let data = HmmData::from_trajectories(&trajectories, &covariates)?;
    println!(
        "{} sequences, {} steps\n",
        data.sequences().len(),
        data.n_observations()
    );

    let initial = HmmParameters::new(
        vec![StepDistribution::gamma(100.0, 80.0), StepDistribution::gamma(600.0, 300.0)],
        vec![
            AngleDistribution::von_mises(std::f64::consts::PI, 0.5),
            AngleDistribution::von_mises(0.0, 3.0),
        ],
    )?;

    let base = HmmFitter::new(HmmConfig::two_state())?.fit(&data, &initial)?;
    println!("{base}\n");

    let (name, alternative) = match &covariate {
        Some(name) => {
            let config = HmmConfig::two_state().with_transition_covariates([name.as_str()]);
            let start = base.parameters().clone().with_covariate_count(1);
            (format!("transitions ~ {name}"), HmmFitter::new(config)?.fit(&data, &start)?)
        }
        None => {
            let start = HmmParameters::new(
                vec![
                    StepDistribution::gamma(50.0, 40.0),
                    StepDistribution::gamma(300.0, 150.0),
                    StepDistribution::gamma(900.0, 400.0),
                ],
                vec![
                    AngleDistribution::von_mises(std::f64::consts::PI, 0.3),
                    AngleDistribution::von_mises(0.0, 1.0),
                    AngleDistribution::von_mises(0.0, 5.0),
                ],
            )?;
            ("three states".to_string(), HmmFitter::new(HmmConfig::with_states(3))?.fit(&data, &start)?)
        }
    };
    println!("{alternative}\n");

    let comparison = ModelComparison::new()
        .add("two states", &base)
        .add(name, &alternative);
    println!("{comparison}");

    let decoding = base.decode(&data)?;
    decoding.write_csv(std::io::stdout())?;

    Ok(())
}

//! Loading a Movebank export end to end: read, drop, project, derive

use approx::assert_abs_diff_eq;
use movetrack_core::{Error, TabularOutput};
use movetrack_track::{Hemisphere, LoaderConfig, ProjectionConfig, TrackLoader};
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/sample_track.tsv")
}

#[test]
fn test_load_movebank_export() {
    let loader = TrackLoader::new(LoaderConfig::movebank());
    let (track, report) = loader.from_path(fixture()).unwrap();

    assert_eq!(report.rows_read, 27);
    assert_eq!(report.rows_kept, 25);
    assert_eq!(report.missing_timestamp, 1);
    assert_eq!(report.missing_coordinates, 1);
    assert_eq!(track.individuals(), vec!["Wolf-1", "Wolf-2"]);
    assert_eq!(track.individual("Wolf-1").unwrap().len(), 12);
    assert_eq!(track.individual("Wolf-2").unwrap().len(), 13);
    assert!(track.individual("Wolf-3").is_none());
}

#[test]
fn test_timestamps_non_decreasing_per_individual() {
    let (track, _) = TrackLoader::default().from_path(fixture()).unwrap();
    for id in track.individuals() {
        let sub = track.individual(id).unwrap();
        assert!(sub
            .records()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }
}

#[test]
fn test_covariates_carried_through_projection() {
    let loader = TrackLoader::new(LoaderConfig::movebank().with_covariates(["ground-speed"]));
    let (track, report) = loader.from_path(fixture()).unwrap();
    assert_eq!(report.missing_covariates, 1);

    let projected = track
        .project(&ProjectionConfig::utm(33, Hemisphere::North).unwrap())
        .unwrap();
    let trajectory = projected.trajectory("Wolf-1").unwrap();
    let speeds = trajectory.covariate("ground-speed").unwrap();
    assert_eq!(speeds.len(), 12);
    assert_abs_diff_eq!(speeds[0], 0.5, epsilon = 1e-12);
    assert!(trajectory.covariate("altitude").is_none());

    let wolf2 = projected.trajectory("Wolf-2").unwrap();
    assert!(wolf2.covariate("ground-speed").unwrap()[12].is_nan());
}

#[test]
fn test_projected_steps_are_metric() {
    let (track, _) = TrackLoader::default().from_path(fixture()).unwrap();
    let config: ProjectionConfig = "+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs"
        .parse()
        .unwrap();
    let trajectories = track.project(&config).unwrap().trajectories().unwrap();
    assert_eq!(trajectories.len(), 2);

    // 0.004° east and 0.001° north at 45°N is roughly 315 m by 111 m
    let steps = trajectories[0].steps();
    assert_eq!(steps.len(), 11);
    for step in &steps {
        assert!(step.length > 300.0 && step.length < 370.0, "step {}", step.length);
        assert_abs_diff_eq!(step.duration_hours, 1.0, epsilon = 1e-9);
    }

    let table = trajectories[0].path_metrics();
    let csv = table.to_csv_string().unwrap();
    assert_eq!(csv.lines().count(), 13);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = TrackLoader::default().from_path("does/not/exist.tsv");
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_wrong_delimiter_reports_missing_columns() {
    let loader = TrackLoader::new(LoaderConfig::movebank_csv());
    assert!(matches!(
        loader.from_path(fixture()),
        Err(Error::Configuration(_))
    ));
}

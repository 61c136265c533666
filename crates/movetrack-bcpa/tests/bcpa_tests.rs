use chrono::{TimeZone, Utc};
use movetrack_bcpa::*;
use movetrack_core::{Error, TabularOutput};
use movetrack_track::Trajectory;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::OnceLock;

/// Two autocorrelated phases of 60 observations each, unit spacing
fn two_phase_series(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let rho: f64 = 0.5;
    let innovation = Normal::new(0.0, (1.0 - rho * rho).sqrt()).unwrap();
    let mut values = Vec::with_capacity(120);
    let mut deviation = 0.0;
    for i in 0..120 {
        deviation = rho * deviation + innovation.sample(&mut rng);
        let mean = if i < 60 { 0.0 } else { 5.0 };
        values.push(mean + deviation);
    }
    ((0..120).map(|i| i as f64).collect(), values)
}

fn sweep_two_phases() -> &'static SweepResult {
    static SWEEP: OnceLock<SweepResult> = OnceLock::new();
    SWEEP.get_or_init(|| {
        let (times, values) = two_phase_series(21);
        WindowSweep::new(WindowSweepParameters::new(30, 2.0))
            .unwrap()
            .sweep(&times, &values)
            .unwrap()
    })
}

#[test]
fn test_two_phases_are_separated() {
    let sweep = sweep_two_phases();
    assert_eq!(sweep.windows().len(), 120 - 30 + 1);

    let flat = sweep
        .flat_summary(&ChangePointSummaryParameters::new(2.0, 5).unwrap())
        .unwrap();
    assert!(flat.has_changepoints());
    let main = flat.most_supported().unwrap();
    assert!((57..=63).contains(&main.index), "change at {}", main.index);
    assert!(main.change_type.mean);
    assert!(main.confidence > 0.0 && main.confidence <= 1.0);

    let phases = flat.phases();
    assert_eq!(phases.len(), flat.count() + 1);
    assert!(phases.first().unwrap().mean < 2.5);
    assert!(phases.last().unwrap().mean > 2.5);
    assert_eq!(phases.iter().map(|p| p.n).sum::<usize>(), 120);
    assert_eq!(phases.first().unwrap().start_index, 0);
    assert_eq!(phases.last().unwrap().end_index, 120);
    for pair in phases.windows(2) {
        assert_eq!(pair[0].end_index, pair[1].start_index);
        assert_eq!(pair[0].end_time, pair[1].start_time);
    }
}

#[test]
fn test_high_threshold_leaves_one_phase() {
    let sweep = sweep_two_phases();
    let flat = sweep
        .flat_summary(&ChangePointSummaryParameters::new(2.0, 1000).unwrap())
        .unwrap();
    assert!(!flat.has_changepoints());
    assert_eq!(flat.phases().len(), 1);
    assert_eq!(flat.phases()[0].n, 120);
    assert_eq!(flat.phases()[0].duration, 119.0);
}

#[test]
fn test_smooth_summary() {
    let sweep = sweep_two_phases();
    let smooth = sweep.smooth_summary(None).unwrap();
    assert_eq!(smooth.rows().len(), 120);
    assert!(smooth.rows().iter().all(|r| r.windows > 0));
    assert!(smooth.rows().iter().all(|r| (0.0..=1.0).contains(&r.break_density)));
    assert_eq!(smooth.rows()[0].windows, 1);
    assert_eq!(smooth.rows()[60].windows, 30);

    let early = smooth.rows()[10].mean.unwrap();
    let late = smooth.rows()[110].mean.unwrap();
    assert!(early < 2.5 && late > 2.5);

    let peak = smooth
        .rows()
        .iter()
        .max_by(|a, b| a.break_density.total_cmp(&b.break_density))
        .unwrap();
    assert!((57..=63).contains(&peak.index), "peak at {}", peak.index);

    let weighted = sweep.smooth_summary(Some(5.0)).unwrap();
    assert_eq!(weighted.bandwidth(), Some(5.0));
    assert_eq!(weighted.rows().len(), 120);
    assert!(sweep.smooth_summary(Some(0.0)).is_err());
}

#[test]
fn test_csv_dumps() {
    let sweep = sweep_two_phases();
    let windows = sweep.to_csv_string().unwrap();
    assert!(windows.starts_with("start,end,break_index,break_time,model,bic,"));
    assert_eq!(windows.lines().count(), 92);

    let scores = sweep.model_scores().to_csv_string().unwrap();
    assert_eq!(scores.lines().count(), 1 + 91 * 8);

    let flat = sweep
        .flat_summary(&ChangePointSummaryParameters::new(2.0, 5).unwrap())
        .unwrap();
    let change_points = flat.to_csv_string().unwrap();
    assert!(change_points.starts_with("index,time,support,confidence,model,changed"));
    let phases = flat.phase_table().to_csv_string().unwrap();
    assert!(phases.starts_with("phase,start_index,end_index,start_time,end_time,duration,n,mean,sd,rho,tau"));

    let smooth = sweep.smooth_summary(None).unwrap().to_csv_string().unwrap();
    assert_eq!(smooth.lines().count(), 121);
}

#[test]
fn test_window_larger_than_track() {
    let start = Utc.with_ymd_and_hms(2011, 7, 1, 0, 0, 0).unwrap();
    let points: Vec<(f64, f64)> = (0..12)
        .map(|i| (i as f64 * 50.0, ((i * 3) % 5) as f64 * 20.0))
        .collect();
    let trajectory = Trajectory::from_xy("short", start, 1.0, &points).unwrap();
    let series = VelocitySeries::from_trajectory(&trajectory).unwrap();
    assert_eq!(series.len(), 10);

    let sweep = WindowSweep::new(WindowSweepParameters::new(30, 2.0)).unwrap();
    match sweep.analyze(&series) {
        Err(Error::InsufficientData { expected, actual }) => {
            assert_eq!(expected, 30);
            assert_eq!(actual, 10);
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
}

#[test]
fn test_trajectory_behaviour_switch() {
    let start = Utc.with_ymd_and_hms(2011, 7, 1, 0, 0, 0).unwrap();
    let mut points = vec![(0.0, 0.0)];
    let mut heading: f64 = 0.0;
    for i in 0..100 {
        let (speed, turn) = if i < 50 {
            (20.0, if i % 2 == 0 { 2.4 } else { -2.1 })
        } else {
            (400.0, if i % 2 == 0 { 0.05 } else { -0.04 })
        };
        heading += turn;
        let (x, y) = *points.last().unwrap();
        points.push((x + speed * heading.cos(), y + speed * heading.sin()));
    }
    let trajectory = Trajectory::from_xy("switch", start, 1.0, &points).unwrap();
    let series = VelocitySeries::from_trajectory(&trajectory).unwrap();
    assert_eq!(series.len(), 99);

    let params = WindowSweepParameters::new(20, 2.0).with_window_step(2);
    let result = WindowSweep::new(params).unwrap().analyze(&series).unwrap();
    let flat = result
        .flat_summary(&ChangePointSummaryParameters::new(3.0, 2).unwrap())
        .unwrap();
    let main = flat.most_supported().unwrap();
    assert!((45..=52).contains(&main.index), "change at {}", main.index);
    assert!(flat.phases().last().unwrap().mean > 300.0);
}

proptest! {
    #[test]
    fn clustering_is_idempotent(
        raw in prop::collection::vec(0u32..500, 0..60),
        width in 0u32..20,
    ) {
        let times: Vec<f64> = raw.iter().map(|&t| t as f64).collect();
        let width = width as f64 + 0.5;

        let once = cluster_break_times(&times, width);
        let merged: Vec<f64> = once.iter().map(|c| c.time).collect();
        let twice = cluster_break_times(&merged, width);
        let remerged: Vec<f64> = twice.iter().map(|c| c.time).collect();

        prop_assert_eq!(&merged, &remerged);
        prop_assert!(twice.iter().all(|c| c.size() == 1));
        prop_assert_eq!(once.iter().map(BreakCluster::size).sum::<usize>(), times.len());
    }

    #[test]
    fn flat_summary_phases_cover_series(threshold in 1usize..40, width in 0.0f64..10.0) {
        let sweep = sweep_two_phases();
        let flat = sweep
            .flat_summary(&ChangePointSummaryParameters::new(width, threshold).unwrap())
            .unwrap();
        prop_assert_eq!(flat.phases().iter().map(|p| p.n).sum::<usize>(), 120);
        prop_assert!(flat.change_points().iter().all(|cp| cp.support >= threshold));
        prop_assert!(flat.change_points().windows(2).all(|p| p[0].index < p[1].index));
        let supported: usize = flat.change_points().iter().map(|cp| cp.support).sum();
        prop_assert!(supported <= sweep.change_windows().count());
    }
}

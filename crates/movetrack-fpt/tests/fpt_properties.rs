//! FPT behaviour on synthetic tracks

use chrono::{TimeZone, Utc};
use movetrack_core::TabularOutput;
use movetrack_fpt::{FirstPassageTime, FptParameters};
use movetrack_track::Trajectory;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

fn trajectory(points: &[(f64, f64)]) -> Trajectory {
    let start = Utc.with_ymd_and_hms(2015, 8, 1, 0, 0, 0).unwrap();
    Trajectory::from_xy("synthetic", start, 1.0, points).unwrap()
}

/// Transit legs of long straight steps broken by tight search patches
fn area_restricted_search(seed: u64) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = Normal::new(0.0, 20.0).unwrap();
    let mut points = Vec::new();
    let (mut x, mut y) = (0.0, 0.0);
    for _ in 0..4 {
        for _ in 0..15 {
            x += 500.0 + jitter.sample(&mut rng);
            y += jitter.sample(&mut rng);
            points.push((x, y));
        }
        for _ in 0..25 {
            let angle: f64 = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
            x += 40.0 * angle.cos();
            y += 40.0 * angle.sin();
            points.push((x, y));
        }
    }
    points
}

#[test]
fn test_search_patches_raise_variance_at_patch_scale() {
    let t = trajectory(&area_restricted_search(7));
    let params = FptParameters::by_step(50.0, 1000.0, 50.0).unwrap();
    let result = FirstPassageTime::new(params).unwrap().analyze(&t).unwrap();

    let curve = result.curve();
    assert!(curve.defined().all(|(_, v)| v >= 0.0));
    let scale = curve.characteristic_scale().unwrap();
    assert!(scale >= 50.0 && scale <= 1000.0);
    let peak = curve
        .defined()
        .find(|&(r, _)| r == scale)
        .map(|(_, v)| v)
        .unwrap();
    assert!(curve.defined().all(|(_, v)| v <= peak));
}

#[test]
fn test_matrix_csv_has_row_per_fix_and_radius() {
    let t = trajectory(&area_restricted_search(11));
    let params = FptParameters::linear(100.0, 300.0, 3).unwrap();
    let result = FirstPassageTime::new(params).unwrap().analyze(&t).unwrap();
    let csv = result.matrix().to_csv_string().unwrap();
    assert_eq!(csv.lines().count(), 1 + 3 * t.len());
    assert!(csv.starts_with("individual_id,fix,elapsed_hours,radius,fpt_hours"));
}

#[test]
fn test_radius_larger_than_track_is_fully_censored() {
    let points: Vec<(f64, f64)> = (0..30).map(|i| ((i % 5) as f64, (i / 5) as f64)).collect();
    let params = FptParameters::new(vec![1.0e4]).unwrap();
    let result = FirstPassageTime::new(params).unwrap().analyze(&trajectory(&points)).unwrap();
    let point = &result.curve().points()[0];
    assert_eq!(point.uncensored, 0);
    assert!(point.log_variance.is_none());
    assert!(result.curve().characteristic_scale().is_none());
}

proptest! {
    #[test]
    fn prop_log_variance_is_non_negative(
        steps in prop::collection::vec((-200.0..200.0f64, -200.0..200.0f64), 5..60),
        r1 in 10.0..300.0f64,
        r2 in 300.0..2000.0f64,
    ) {
        let mut points = vec![(0.0, 0.0)];
        for (dx, dy) in steps {
            let (x, y) = *points.last().unwrap();
            points.push((x + dx, y + dy));
        }
        let t = trajectory(&points);
        let params = FptParameters::new(vec![r1, r2]).unwrap();
        let result = FirstPassageTime::new(params).unwrap().analyze(&t).unwrap();
        for point in result.curve().points() {
            prop_assert_eq!(point.uncensored + point.censored, t.len());
            match point.log_variance {
                Some(v) => {
                    prop_assert!(v >= 0.0);
                    prop_assert!(point.uncensored >= 2);
                }
                None => prop_assert!(point.uncensored < 2),
            }
        }
    }
}

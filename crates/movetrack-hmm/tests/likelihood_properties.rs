use movetrack_hmm::likelihood::{log_likelihood, state_probabilities, viterbi};
use movetrack_hmm::*;
use nalgebra::DMatrix;
use proptest::prelude::*;

fn parameters(stay: f64) -> HmmParameters {
    HmmParameters::new(
        vec![StepDistribution::gamma(15.0, 10.0), StepDistribution::gamma(150.0, 60.0)],
        vec![
            AngleDistribution::von_mises(3.0, 0.4),
            AngleDistribution::von_mises(0.0, 5.0),
        ],
    )
    .unwrap()
    .with_transition_probabilities(&DMatrix::from_row_slice(
        2,
        2,
        &[stay, 1.0 - stay, 1.0 - stay, stay],
    ))
    .unwrap()
}

fn observations() -> impl Strategy<Value = (Vec<f64>, Vec<Option<f64>>)> {
    (2usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(0.5f64..500.0, n),
            prop::collection::vec(prop::option::weighted(0.9, -3.1f64..3.1), n),
        )
    })
}

proptest! {
    #[test]
    fn smoothed_probabilities_are_distributions((steps, angles) in observations(), stay in 0.05f64..0.95) {
        let data = HmmData::from_steps("p", &steps, &angles).unwrap();
        let config = HmmConfig::two_state();
        let params = parameters(stay);

        let probabilities = state_probabilities(&params, &config, &data).unwrap();
        prop_assert_eq!(probabilities[0].nrows(), steps.len());
        for t in 0..steps.len() {
            let row_sum: f64 = probabilities[0].row(t).sum();
            prop_assert!((row_sum - 1.0).abs() < 1e-9);
            prop_assert!(probabilities[0].row(t).iter().all(|p| (0.0..=1.0 + 1e-12).contains(p)));
        }

        let path = viterbi(&params, &config, &data).unwrap();
        prop_assert_eq!(path[0].len(), steps.len());
        prop_assert!(path[0].iter().all(|&s| s < 2));

        let ll = log_likelihood(&params, &config, &data).unwrap();
        prop_assert!(ll.is_finite());
    }

    #[test]
    fn missing_observations_do_not_change_likelihood(steps in prop::collection::vec(0.5f64..500.0, 3..20)) {
        let config = HmmConfig::two_state();
        let params = parameters(0.8);
        let none: Vec<Option<f64>> = vec![None; steps.len()];
        let data = HmmData::from_steps("p", &steps, &none).unwrap();

        let mut observations = data.sequences()[0].observations.clone();
        observations.push(Observation::new(None, None));
        let padded = HmmData::new(
            vec![HmmSequence { id: "p".to_string(), observations }],
            Vec::new(),
        )
        .unwrap();

        let a = log_likelihood(&params, &config, &data).unwrap();
        let b = log_likelihood(&params, &config, &padded).unwrap();
        prop_assert!((a - b).abs() < 1e-9);
    }
}

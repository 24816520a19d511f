//! Property checks for scaling and windowing over seeded random inputs.
//!
//! Inputs are drawn from a fixed-seed ChaCha stream so failures reproduce.

use ndarray::{s, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tributary_seq::{window, ErrorKind, Scaler, ScalerConstants, SeqError, Variable, Windower};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_matrix(rng: &mut ChaCha8Rng, rows: usize, cols: usize, scale: f64) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-scale..scale))
}

fn assert_close(a: f64, b: f64) {
    let tol = 1e-9 * a.abs().max(b.abs()).max(1.0);
    assert!((a - b).abs() <= tol, "{a} vs {b}");
}

// ---------------------------------------------------------------------------
// Scaler
// ---------------------------------------------------------------------------

#[test]
fn inputs_round_trip_reference_scaler() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let scaler = Scaler::default();
    for _ in 0..20 {
        let rows = rng.gen_range(1..50);
        let v = random_matrix(&mut rng, rows, 6, 1e4);
        let z = scaler.normalize(&v, Variable::Inputs).unwrap();
        let back = scaler.rescale(&z, Variable::Inputs).unwrap();
        for (a, b) in v.iter().zip(back.iter()) {
            assert_close(*a, *b);
        }
    }
}

#[test]
fn output_round_trip_reference_scaler() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let scaler = Scaler::default();
    for _ in 0..20 {
        let rows = rng.gen_range(1..50);
        let v = random_matrix(&mut rng, rows, 1, 1e3);
        let z = scaler.normalize(&v, Variable::Output).unwrap();
        let back = scaler.rescale(&z, Variable::Output).unwrap();
        for (a, b) in v.iter().zip(back.iter()) {
            assert_close(*a, *b);
        }
    }
}

#[test]
fn swapped_constants_change_width() {
    let scaler = Scaler::new(ScalerConstants {
        input_means: vec![0.0; 3],
        input_stds: vec![1.0; 3],
        output_mean: 0.0,
        output_std: 1.0,
    })
    .unwrap();
    let v = Array2::from_elem((4, 3), 2.5);
    assert_eq!(scaler.normalize(&v, Variable::Inputs).unwrap(), v);
    let wide = Array2::from_elem((4, 6), 2.5);
    let err = scaler.normalize(&wide, Variable::Inputs).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn unknown_variable_names_fail() {
    for name in ["input", "outputs", "", "Inputs"] {
        let err = name.parse::<Variable>().unwrap_err();
        assert!(matches!(err, SeqError::UnknownVariable { .. }), "{name}");
    }
}

// ---------------------------------------------------------------------------
// Windower
// ---------------------------------------------------------------------------

#[test]
fn windows_are_exact_slices() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..25 {
        let n = rng.gen_range(1..60);
        let f = rng.gen_range(1..8);
        let seq_length = rng.gen_range(1..=n);
        let x = random_matrix(&mut rng, n, f, 100.0);
        let y = random_matrix(&mut rng, n, 1, 100.0);

        let samples = window(&x, &y, seq_length).unwrap();
        assert_eq!(samples.x().shape(), &[n - seq_length + 1, seq_length, f]);
        assert_eq!(samples.y().shape(), &[n - seq_length + 1, 1]);

        for i in 0..samples.n_samples() {
            assert_eq!(
                samples.x().slice(s![i, .., ..]),
                x.slice(s![i..i + seq_length, ..])
            );
            assert_eq!(samples.y()[[i, 0]], y[[i + seq_length - 1, 0]]);
        }
    }
}

#[test]
fn invalid_lengths_are_invalid_arguments() {
    let x = Array2::<f64>::zeros((5, 2));
    let y = Array2::<f64>::zeros((5, 1));
    let short_y = Array2::<f64>::zeros((4, 1));

    for err in [
        window(&x, &y, 0).unwrap_err(),
        window(&x, &y, 6).unwrap_err(),
        window(&x, &short_y, 2).unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn windower_is_reusable() {
    let windower = Windower::new(2).unwrap();
    let x = Array2::from_shape_fn((4, 1), |(t, _)| t as f64);
    let first = windower.window(&x, &x).unwrap();
    let second = windower.window(&x.view(), &x.view()).unwrap();
    assert_eq!(first, second);
}

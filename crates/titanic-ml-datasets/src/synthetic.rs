use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use titanic_ml_core::{MlError, MlResult, Tensor};

pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// One standard-normal draw (Box-Muller).
pub(crate) fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Two Gaussian classes with unit variance whose means sit at
/// `±separation / 2` on every feature.
///
/// Exactly `round(n_samples * positive_fraction)` rows are labelled 1; rows
/// are shuffled.
pub fn make_imbalanced_classification(
    n_samples: usize,
    n_features: usize,
    positive_fraction: f64,
    separation: f64,
    seed: Option<u64>,
) -> MlResult<(Tensor<f64>, Tensor<f64>)> {
    if n_samples == 0 || n_features == 0 {
        return Err(MlError::EmptyInput);
    }
    if !(positive_fraction > 0.0 && positive_fraction < 1.0) {
        return Err(MlError::invalid_parameter(
            "positive_fraction",
            format!("must lie in (0, 1), got {}", positive_fraction),
        ));
    }
    let mut rng = rng_from(seed);
    let n_pos = (n_samples as f64 * positive_fraction).round() as usize;

    let mut labels: Vec<f64> = (0..n_samples).map(|i| if i < n_pos { 1.0 } else { 0.0 }).collect();
    labels.shuffle(&mut rng);

    let mut features = Vec::with_capacity(n_samples * n_features);
    for &label in &labels {
        let centre = if label == 1.0 { separation / 2.0 } else { -separation / 2.0 };
        for _ in 0..n_features {
            features.push(centre + gaussian(&mut rng));
        }
    }

    Ok((
        Tensor::new(features, vec![n_samples, n_features])?,
        Tensor::from_vec(labels),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imbalanced_classification() {
        let (x, y) = make_imbalanced_classification(200, 3, 0.1, 4.0, Some(42)).unwrap();
        assert_eq!(x.shape_vec(), vec![200, 3]);
        assert_eq!(y.data().iter().filter(|&&v| v == 1.0).count(), 20);

        // class means land on opposite sides of zero
        let mean_of = |label: f64| -> f64 {
            let rows: Vec<usize> = (0..200).filter(|&i| y.data()[i] == label).collect();
            rows.iter().map(|&i| x.get(&[i, 0]).unwrap()).sum::<f64>() / rows.len() as f64
        };
        assert!(mean_of(1.0) > 1.0);
        assert!(mean_of(0.0) < -1.0);
    }

    #[test]
    fn test_seeded_generation() {
        let a = make_imbalanced_classification(50, 2, 0.3, 1.0, Some(1)).unwrap();
        let b = make_imbalanced_classification(50, 2, 0.3, 1.0, Some(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(make_imbalanced_classification(10, 2, 1.0, 1.0, None).is_err());
        assert!(make_imbalanced_classification(0, 2, 0.5, 1.0, None).is_err());
    }
}

use rand::Rng;
use titanic_ml_core::{MlError, MlResult, Tensor};

use crate::synthetic::{gaussian, rng_from};

/// Feature columns of the processed passenger table, in order.
pub const TITANIC_FEATURES: [&str; 10] = [
    "Pclass",
    "Sex",
    "Age",
    "SibSp",
    "Parch",
    "Fare",
    "Embarked_C",
    "Embarked_Q",
    "Embarked_S",
    "AgeImputed",
];

/// Median age used for passengers whose age is missing.
const MEDIAN_AGE: f64 = 28.0;

/// A processed passenger table.
#[derive(Debug, Clone, PartialEq)]
pub struct TitanicLike {
    pub features: Tensor<f64>,
    pub survived: Tensor<f64>,
    pub feature_names: Vec<String>,
}

/// Synthetic passengers laid out like the cleaned Titanic table (sex coded
/// male = 1, port of embarkation one-hot, missing ages imputed with the
/// median and flagged in `AgeImputed`).
///
/// Survival follows a logistic model dominated by sex and class; roughly 38%
/// of passengers survive.
pub fn make_titanic_like(n_passengers: usize, seed: Option<u64>) -> MlResult<TitanicLike> {
    if n_passengers == 0 {
        return Err(MlError::EmptyInput);
    }
    let mut rng = rng_from(seed);
    let mut features = Vec::with_capacity(n_passengers * TITANIC_FEATURES.len());
    let mut survived = Vec::with_capacity(n_passengers);

    for _ in 0..n_passengers {
        let pclass = match rng.gen::<f64>() {
            u if u < 0.24 => 1.0,
            u if u < 0.45 => 2.0,
            _ => 3.0,
        };
        let male = if rng.gen::<f64>() < 0.65 { 1.0 } else { 0.0 };

        let age_missing = rng.gen::<f64>() < 0.2;
        let age = if age_missing {
            MEDIAN_AGE
        } else {
            (29.7 + 14.0 * gaussian(&mut rng)).clamp(0.5, 80.0)
        };

        let sibsp = if rng.gen::<f64>() < 0.68 { 0.0 } else { rng.gen_range(1..=4) as f64 };
        let parch = if rng.gen::<f64>() < 0.76 { 0.0 } else { rng.gen_range(1..=3) as f64 };

        let base_fare = match pclass as u8 {
            1 => 84.0,
            2 => 20.0,
            _ => 13.0,
        };
        let fare = base_fare * (0.5 * gaussian(&mut rng)).exp();

        let embarked = match rng.gen::<f64>() {
            u if u < 0.19 => [1.0, 0.0, 0.0],
            u if u < 0.28 => [0.0, 1.0, 0.0],
            _ => [0.0, 0.0, 1.0],
        };

        let logit = 1.45 - 2.5 * male - 0.9 * (pclass - 2.0) - 0.02 * (age - 29.0) - 0.15 * sibsp;
        let p = 1.0 / (1.0 + (-logit).exp());
        survived.push(if rng.gen::<f64>() < p { 1.0 } else { 0.0 });

        features.extend_from_slice(&[pclass, male, age, sibsp, parch, fare]);
        features.extend_from_slice(&embarked);
        features.push(if age_missing { 1.0 } else { 0.0 });
    }

    Ok(TitanicLike {
        features: Tensor::new(features, vec![n_passengers, TITANIC_FEATURES.len()])?,
        survived: Tensor::from_vec(survived),
        feature_names: TITANIC_FEATURES.iter().map(|s| s.to_string()).collect(),
    })
}

use titanic_ml_core::{Float, MlError, MlResult};

fn check_lengths<T: Float>(observed: &[T], probabilities: &[T]) -> MlResult<()> {
    if observed.len() != probabilities.len() {
        return Err(MlError::LengthMismatch {
            observed: observed.len(),
            predicted: probabilities.len(),
        });
    }
    if observed.is_empty() {
        return Err(MlError::EmptyInput);
    }
    Ok(())
}

/// Log loss (binary cross-entropy) for probabilistic predictions.
///
/// L = -mean(y * log(p) + (1-y) * log(1-p)), with p clipped to [1e-15, 1-1e-15].
pub fn log_loss<T: Float>(observed: &[T], probabilities: &[T]) -> MlResult<f64> {
    check_lengths(observed, probabilities)?;
    let eps = 1e-15;
    let total: f64 = observed
        .iter()
        .zip(probabilities)
        .map(|(&y, &p)| {
            let y = y.to_f64();
            let p = p.to_f64().max(eps).min(1.0 - eps);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    Ok(total / observed.len() as f64)
}

/// Brier score: mean squared difference between probability and label.
pub fn brier_score<T: Float>(observed: &[T], probabilities: &[T]) -> MlResult<f64> {
    check_lengths(observed, probabilities)?;
    let total: f64 = observed
        .iter()
        .zip(probabilities)
        .map(|(&y, &p)| {
            let d = p.to_f64() - y.to_f64();
            d * d
        })
        .sum();
    Ok(total / observed.len() as f64)
}

//! Skill scores for comparing predictions against a reference
//!
//! Variance uses the population form (divides by `n`), so `r2` agrees with
//! `1 - mse / var(truth)` as computed by NumPy with default arguments.
//! Sums run sequentially in index order so repeated calls agree bit for bit.

use crate::errors::{PapaError, Result};

fn check_pair(ypred: &[f64], ytruth: &[f64]) -> Result<()> {
    if ypred.len() != ytruth.len() {
        return Err(PapaError::ShapeMismatch {
            context: "prediction/truth".to_string(),
            left: vec![ypred.len()],
            right: vec![ytruth.len()],
        });
    }
    if ypred.is_empty() {
        return Err(PapaError::InvalidArgument(
            "cannot score empty series".to_string(),
        ));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Mean squared error and coefficient of determination.
///
/// A constant `ytruth` has zero variance, so `r2` comes out as `-inf`
/// (or NaN for a perfect prediction).
pub fn mse_r2(ypred: &[f64], ytruth: &[f64]) -> Result<(f64, f64)> {
    check_pair(ypred, ytruth)?;
    let mse = ypred
        .iter()
        .zip(ytruth)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / ypred.len() as f64;
    let r2 = 1.0 - mse / population_variance(ytruth);
    Ok((mse, r2))
}

/// Extended set of skill scores
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FitMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Mean of `ypred - ytruth`
    pub bias: f64,
    /// Number of pairs that entered the scores
    pub n: usize,
}

/// Scores `ypred` against `ytruth`, optionally dropping pairs with a NaN.
pub fn fit_metrics(ypred: &[f64], ytruth: &[f64], skip_nan: bool) -> Result<FitMetrics> {
    check_pair(ypred, ytruth)?;
    let (pred, truth): (Vec<f64>, Vec<f64>) = ypred
        .iter()
        .zip(ytruth)
        .filter(|(p, t)| !skip_nan || (!p.is_nan() && !t.is_nan()))
        .map(|(&p, &t)| (p, t))
        .unzip();
    if pred.is_empty() {
        return Err(PapaError::InvalidArgument(
            "no valid pairs left after dropping NaN".to_string(),
        ));
    }

    let (mse, r2) = mse_r2(&pred, &truth)?;
    let bias = pred
        .iter()
        .zip(&truth)
        .map(|(p, t)| p - t)
        .sum::<f64>()
        / pred.len() as f64;

    Ok(FitMetrics {
        mse,
        rmse: mse.sqrt(),
        r2,
        bias,
        n: pred.len(),
    })
}

//! Descriptive statistics and summary measures
//!
//! Central tendency, dispersion and quantiles for survey scores, per-category
//! summaries, Pearson correlations and a Gaussian kernel density estimate used
//! by the density charts.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Drop NaN values, keeping order
pub fn filter_nan(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|x| !x.is_nan()).collect()
}

/// Arithmetic mean; NaN for empty input
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (data.len() - ddof) as f64
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data, 1).sqrt()
}

/// Sort a copy of the data ascending
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut sorted_data = data.to_vec();
    sorted_data.sort_by(|a, b| a.total_cmp(b));
    sorted_data
}

/// Median of unsorted data
pub fn median(data: &[f64]) -> Result<f64> {
    percentile(&sorted(data), 50.0)
}

/// Percentile of already sorted data, linear interpolation between ranks
pub fn percentile(sorted_data: &[f64], p: f64) -> Result<f64> {
    if sorted_data.is_empty() {
        return Err(Error::InvalidValue(
            "Cannot compute percentile for empty data".into(),
        ));
    }

    if !(0.0..=100.0).contains(&p) {
        return Err(Error::InvalidValue(
            "Percentile must be between 0 and 100".into(),
        ));
    }

    let n = sorted_data.len();
    let index = (p / 100.0) * (n - 1) as f64;
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        Ok(sorted_data[lower_index])
    } else {
        let weight = index - lower_index as f64;
        Ok(sorted_data[lower_index] * (1.0 - weight) + sorted_data[upper_index] * weight)
    }
}

/// Summary of one category of a numeric variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
    pub std: f64,
}

/// Summarize the non-missing values of one group
pub fn summarize(group: &str, data: &[f64]) -> Result<GroupSummary> {
    let values = filter_nan(data);
    if values.is_empty() {
        return Err(Error::InsufficientData(format!(
            "Group '{}' has no valid observations",
            group
        )));
    }
    let sorted_data = sorted(&values);
    Ok(GroupSummary {
        group: group.to_string(),
        count: values.len(),
        min: sorted_data[0],
        q1: percentile(&sorted_data, 25.0)?,
        median: percentile(&sorted_data, 50.0)?,
        mean: mean(&values),
        q3: percentile(&sorted_data, 75.0)?,
        max: sorted_data[sorted_data.len() - 1],
        std: std_dev(&values),
    })
}

/// Pearson correlation over the rows where both values are present
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::InvalidValue(
            "Variables must have same length".into(),
        ));
    }

    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();

    if pairs.len() < 2 {
        return Err(Error::InsufficientData(
            "At least 2 complete observations required".into(),
        ));
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for &(xi, yi) in &pairs {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let denominator = (sum_xx * sum_yy).sqrt();
    if denominator < 1e-12 {
        Ok(f64::NAN)
    } else {
        Ok(sum_xy / denominator)
    }
}

/// Pairwise-complete Pearson correlation matrix. Undefined entries are NaN.
pub fn correlation_matrix(data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n_vars = data.len();
    if n_vars == 0 {
        return Err(Error::InvalidValue("No variables provided".into()));
    }

    let rows: Vec<Vec<f64>> = (0..n_vars)
        .into_par_iter()
        .map(|i| {
            (0..n_vars)
                .map(|j| {
                    if i == j {
                        1.0
                    } else {
                        pearson_correlation(&data[i], &data[j]).unwrap_or(f64::NAN)
                    }
                })
                .collect()
        })
        .collect();

    Ok(rows)
}

/// Gaussian kernel density estimate with Scott's bandwidth, evaluated on
/// `points` evenly spaced values spanning the data range padded by three
/// bandwidths.
pub fn kernel_density(data: &[f64], points: usize) -> Result<Vec<(f64, f64)>> {
    let values = filter_nan(data);
    if values.len() < 2 {
        return Err(Error::InsufficientData(
            "Density estimation needs at least 2 observations".into(),
        ));
    }
    let sd = std_dev(&values);
    if !(sd > 0.0) {
        return Err(Error::Computation(
            "Density estimation needs non-constant data".into(),
        ));
    }

    let n = values.len() as f64;
    let bandwidth = sd * n.powf(-0.2);
    let sorted_data = sorted(&values);
    let lo = sorted_data[0] - 3.0 * bandwidth;
    let hi = sorted_data[sorted_data.len() - 1] + 3.0 * bandwidth;
    let points = points.max(2);
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    Ok((0..points)
        .map(|i| {
            let x = lo + step * i as f64;
            let density = values
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect())
}

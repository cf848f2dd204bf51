/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Computes the population standard deviation (divides by `n`) given a
/// pre-computed mean. Returns `None` for empty input.
pub fn stddev(values: &[f64], mean: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    Some(variance.sqrt())
}

/// Divides `part` by `whole`, or `None` when `whole` is zero.
pub fn ratio(part: f64, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part / whole as f64)
    }
}

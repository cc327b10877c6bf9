/// Quantile color scale: the sorted domain is cut into `range.len()` buckets of
/// roughly equal count, and each bucket maps to one palette entry.
#[derive(Debug, Clone)]
pub struct QuantileScale {
    thresholds: Vec<f64>,
    range: Vec<String>,
}

impl QuantileScale {
    /// Returns `None` when the domain has no finite values or the range is empty;
    /// callers fall back to the default color in that case.
    pub fn new<I>(domain: I, range: &[String]) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = domain.into_iter().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() || range.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let buckets = range.len();
        let thresholds = (1..buckets)
            .map(|i| quantile_sorted(&sorted, i as f64 / buckets as f64))
            .collect();

        Some(Self {
            thresholds,
            range: range.to_vec(),
        })
    }

    #[cfg(test)]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn bucket(&self, value: f64) -> usize {
        // bisect right: values equal to a threshold go to the upper bucket
        self.thresholds.partition_point(|t| *t <= value)
    }

    pub fn color(&self, value: f64) -> &str {
        &self.range[self.bucket(value)]
    }
}

/// Linear interpolation between the closest ranks (R-7).
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = (n - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

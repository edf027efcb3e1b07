use serde::Serialize;

/// Five-number summary plus mean. Every statistic is `None` for an empty
/// sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub count: usize,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl Distribution {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(f64::total_cmp);
        let sum: f64 = sorted.iter().sum();
        Self {
            count: sorted.len(),
            min: sorted.first().copied(),
            q1: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q3: percentile(&sorted, 75.0),
            max: sorted.last().copied(),
            mean: Some(sum / sorted.len() as f64),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// `p`-th percentile of an ascending slice, linearly interpolated between
/// closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted {
        [] => None,
        [only] => Some(*only),
        _ => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_has_no_statistics() {
        let dist = Distribution::from_values(Vec::new());
        assert_eq!(dist, Distribution::default());
        assert!(dist.is_empty());
    }

    #[test]
    fn quartiles_interpolate() {
        let dist = Distribution::from_values([4.0, 1.0, 3.0, 2.0]);
        assert_eq!(dist.count, 4);
        assert_eq!(dist.min, Some(1.0));
        assert_eq!(dist.q1, Some(1.75));
        assert_eq!(dist.median, Some(2.5));
        assert_eq!(dist.q3, Some(3.25));
        assert_eq!(dist.max, Some(4.0));
        assert_eq!(dist.mean, Some(2.5));
    }

    #[test]
    fn single_value_is_every_quartile() {
        let dist = Distribution::from_values([16.0]);
        assert_eq!(dist.q1, Some(16.0));
        assert_eq!(dist.median, Some(16.0));
        assert_eq!(dist.q3, Some(16.0));
    }
}

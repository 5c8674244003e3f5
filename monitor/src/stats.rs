//! Summary statistics over one metric of a capture

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p95: f64,
}

impl SeriesStats {
    /// `None` for an empty series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        // Nearest-rank percentile
        let rank = ((0.95 * count as f64).ceil() as usize).clamp(1, count);
        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            p95: sorted[rank - 1],
        })
    }
}

impl std::fmt::Display for SeriesStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min {:.2}%  mean {:.2}%  p95 {:.2}%  max {:.2}%  ({} samples)",
            self.min, self.mean, self.p95, self.max, self.count
        )
    }
}

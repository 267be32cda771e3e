//! Band statistics derived from the row histogram.
//!
//! Every pixel of the derived raster holds a row id and the table already
//! counts how often each row was produced, so the usual band statistics can
//! be read off the histogram without another pass over the image.

use crate::RowId;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramStats {
    pub minimum: RowId,
    pub maximum: RowId,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub mode: RowId,
    /// First pixel value whose cumulative count reaches half of all pixels.
    pub median: RowId,
    /// Number of histogram bins, one per pixel value starting at zero.
    pub bins: usize,
}

impl HistogramStats {
    /// `hist[v]` is the number of pixels with value `v`. Returns `None` when
    /// no pixel was counted.
    pub fn from_histogram(hist: &[u64]) -> Option<Self> {
        Self::from_offset_histogram(hist, 0)
    }

    /// Like [`from_histogram`](Self::from_histogram) but `hist[i]` counts
    /// pixel value `offset + i`; every value below `offset` has no pixels.
    pub fn from_offset_histogram(hist: &[u64], offset: RowId) -> Option<Self> {
        let total: u64 = hist.iter().sum();
        if total == 0 {
            return None;
        }
        let total_f = total as f64;
        let value = |i: usize| offset as u64 + i as u64;

        let minimum = hist.iter().position(|&c| c > 0)?;
        let maximum = hist.iter().rposition(|&c| c > 0)?;

        let mean = hist
            .iter()
            .enumerate()
            .map(|(i, &c)| value(i) as f64 * c as f64)
            .sum::<f64>()
            / total_f;
        let variance = hist
            .iter()
            .enumerate()
            .map(|(i, &c)| c as f64 * (value(i) as f64 - mean).powi(2))
            .sum::<f64>()
            / total_f;

        // First bin wins ties.
        let mut mode = 0;
        for (i, &c) in hist.iter().enumerate() {
            if c > hist[mode] {
                mode = i;
            }
        }

        let half = total_f / 2.0;
        let mut cumulative = 0u64;
        let mut median = maximum;
        for (i, &c) in hist.iter().enumerate() {
            cumulative += c;
            if cumulative as f64 >= half {
                median = i;
                break;
            }
        }

        Some(Self {
            minimum: value(minimum) as RowId,
            maximum: value(maximum) as RowId,
            mean,
            std_dev: variance.sqrt(),
            mode: value(mode) as RowId,
            median: value(median) as RowId,
            bins: offset as usize + hist.len(),
        })
    }
}

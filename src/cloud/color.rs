//! Photometric summary of a patch: hue histogram and dominant color.
//!
//! The histogram has `num_bins - 2` hue bins plus one bin for dark pixels and
//! one for unsaturated (grey/white) pixels, whose hue is meaningless.

use serde::{Deserialize, Serialize};

/// Pixels with value below this are counted as dark.
const DARK_VALUE: f64 = 0.2;

/// Pixels with saturation below this are counted as unsaturated.
const LOW_SATURATION: f64 = 0.15;

/// Default bin count: 72 hue bins of 5 degrees + dark + unsaturated.
pub const DEFAULT_HUE_BINS: usize = 74;

/// Convert 8-bit RGB to HSV with h in [0, 360), s and v in [0, 1].
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f64, f64, f64) {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f64::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f64::EPSILON { 0.0 } else { delta / max };
    (h, s, max)
}

/// Hue histogram with raw (unnormalized) counts, so that combining two
/// histograms weights each by its number of pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HueHistogram {
    counts: Vec<f64>,
}

impl HueHistogram {
    /// Empty histogram with `num_bins` bins (at least 3).
    pub fn new(num_bins: usize) -> Self {
        Self {
            counts: vec![0.0; num_bins.max(3)],
        }
    }

    /// Histogram of a set of colors.
    pub fn from_colors<'a>(colors: impl IntoIterator<Item = &'a [u8; 3]>, num_bins: usize) -> Self {
        let mut hist = Self::new(num_bins);
        for c in colors {
            let bin = hist.bin_of(*c);
            hist.counts[bin] += 1.0;
        }
        hist
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Bin index for a color.
    pub fn bin_of(&self, rgb: [u8; 3]) -> usize {
        let hue_bins = self.counts.len() - 2;
        let (h, s, v) = rgb_to_hsv(rgb);
        if v < DARK_VALUE {
            hue_bins
        } else if s < LOW_SATURATION {
            hue_bins + 1
        } else {
            ((h / 360.0 * hue_bins as f64) as usize).min(hue_bins - 1)
        }
    }

    /// Accumulate another histogram's counts. Histograms of different bin
    /// counts are not combinable; the other is then ignored.
    pub fn combine(&mut self, other: &HueHistogram) {
        if other.counts.len() != self.counts.len() {
            return;
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
    }

    /// Probability distribution over bins. All zeros for an empty histogram.
    pub fn normalized(&self) -> Vec<f64> {
        let total = self.total();
        if total <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|c| c / total).collect()
    }

    /// Bhattacharyya distance in [0, 1]; 0 for identical distributions.
    pub fn bhattacharyya_distance(&self, other: &HueHistogram) -> f64 {
        if other.counts.len() != self.counts.len() || self.total() <= 0.0 || other.total() <= 0.0 {
            return 1.0;
        }
        let coefficient: f64 = self
            .normalized()
            .iter()
            .zip(other.normalized())
            .map(|(p, q)| (p * q).sqrt())
            .sum();
        (1.0 - coefficient.min(1.0)).max(0.0).sqrt()
    }

    /// Index of the most populated bin.
    pub fn dominant_bin(&self) -> Option<usize> {
        if self.total() <= 0.0 {
            return None;
        }
        self.counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
    }
}

/// Mean color (RGB in [0, 1]) of the pixels falling into the dominant bin.
pub fn main_color<'a>(colors: impl IntoIterator<Item = &'a [u8; 3]>, hist: &HueHistogram) -> [f64; 3] {
    let Some(dominant) = hist.dominant_bin() else {
        return [0.0; 3];
    };
    let mut sum = [0.0; 3];
    let mut count = 0usize;
    for c in colors.into_iter().filter(|c| hist.bin_of(**c) == dominant) {
        for k in 0..3 {
            sum[k] += c[k] as f64 / 255.0;
        }
        count += 1;
    }
    if count == 0 {
        return [0.0; 3];
    }
    [sum[0] / count as f64, sum[1] / count as f64, sum[2] / count as f64]
}

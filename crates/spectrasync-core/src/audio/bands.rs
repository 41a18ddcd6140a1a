//! Band math shared by the extractor and the beat detector.
//!
//! Bands are expressed as fractions of the bin array rather than in Hz, so the
//! same layout works for any spectrum size the audio feed hands us.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Largest value a byte spectrum bin can hold
pub const MAX_SAMPLE_VALUE: f32 = 255.0;

/// The five bands every effect receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyBand {
    /// Lowest ~10% of the spectrum
    Bass,
    /// Lower half of the mid range
    LowMid,
    /// Upper half of the mid range
    Mid,
    /// Split straddling mid and treble
    HighMid,
    /// Top half of the spectrum
    Treble,
}

impl FrequencyBand {
    /// All bands, lowest first
    pub const ALL: [FrequencyBand; 5] = [
        FrequencyBand::Bass,
        FrequencyBand::LowMid,
        FrequencyBand::Mid,
        FrequencyBand::HighMid,
        FrequencyBand::Treble,
    ];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bass => "Bass",
            Self::LowMid => "Low Mid",
            Self::Mid => "Mid",
            Self::HighMid => "High Mid",
            Self::Treble => "Treble",
        }
    }
}

/// Normalized energy per band, each value in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEnergy {
    /// Bass energy
    pub bass: f32,
    /// Low-mid energy
    pub low_mid: f32,
    /// Mid energy
    pub mid: f32,
    /// High-mid energy
    pub high_mid: f32,
    /// Treble energy
    pub treble: f32,
}

impl BandEnergy {
    /// Build a value by evaluating `f` for every band
    pub fn from_fn(mut f: impl FnMut(FrequencyBand) -> f32) -> Self {
        Self {
            bass: f(FrequencyBand::Bass),
            low_mid: f(FrequencyBand::LowMid),
            mid: f(FrequencyBand::Mid),
            high_mid: f(FrequencyBand::HighMid),
            treble: f(FrequencyBand::Treble),
        }
    }

    /// Energy of a single band
    pub fn get(&self, band: FrequencyBand) -> f32 {
        match band {
            FrequencyBand::Bass => self.bass,
            FrequencyBand::LowMid => self.low_mid,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::HighMid => self.high_mid,
            FrequencyBand::Treble => self.treble,
        }
    }

    /// Overwrite a single band
    pub fn set(&mut self, band: FrequencyBand, value: f32) {
        match band {
            FrequencyBand::Bass => self.bass = value,
            FrequencyBand::LowMid => self.low_mid = value,
            FrequencyBand::Mid => self.mid = value,
            FrequencyBand::HighMid => self.high_mid = value,
            FrequencyBand::Treble => self.treble = value,
        }
    }

    /// Mean over all five bands
    pub fn overall(&self) -> f32 {
        FrequencyBand::ALL.iter().map(|b| self.get(*b)).sum::<f32>() / 5.0
    }
}

/// Half-open fractional range `[start, end)` of the bin array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    /// Start fraction (inclusive)
    pub start: f32,
    /// End fraction (exclusive)
    pub end: f32,
}

impl BandRange {
    /// Create a range from two fractions
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }
}

/// Fractional boundaries of the five bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandLayout {
    /// Bass range
    pub bass: BandRange,
    /// Low-mid range
    pub low_mid: BandRange,
    /// Mid range
    pub mid: BandRange,
    /// High-mid range
    pub high_mid: BandRange,
    /// Treble range
    pub treble: BandRange,
}

impl Default for BandLayout {
    fn default() -> Self {
        Self {
            bass: BandRange::new(0.0, 0.10),
            low_mid: BandRange::new(0.10, 0.30),
            mid: BandRange::new(0.30, 0.50),
            high_mid: BandRange::new(0.40, 0.60),
            treble: BandRange::new(0.50, 1.0),
        }
    }
}

impl BandLayout {
    /// Fractional range of a band
    pub fn range(&self, band: FrequencyBand) -> BandRange {
        match band {
            FrequencyBand::Bass => self.bass,
            FrequencyBand::LowMid => self.low_mid,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::HighMid => self.high_mid,
            FrequencyBand::Treble => self.treble,
        }
    }

    /// Measure all five bands of a byte spectrum
    pub fn measure(&self, bins: &[u8]) -> BandEnergy {
        BandEnergy::from_fn(|band| {
            let range = self.range(band);
            band_energy(bins, range.start, range.end)
        })
    }
}

/// Map a fraction of the array to an index, clamped into `0..=len`
///
/// NaN maps to 0, anything above 1.0 to `len`.
pub fn fraction_to_index(fraction: f32, len: usize) -> usize {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    let index = (fraction.min(1.0) * len as f32).floor() as usize;
    index.min(len)
}

/// Bin index range covered by `[start, end)`
///
/// Reversed fractions give an empty range. A non-empty fractional range always
/// covers at least one bin when the array has room for it, so small spectra
/// don't silently drop a band.
pub fn bin_range(len: usize, start: f32, end: f32) -> Range<usize> {
    let first = fraction_to_index(start, len);
    let mut last = fraction_to_index(end, len);
    if last < first {
        return first..first;
    }
    if last == first && end > start && first < len {
        last = first + 1;
    }
    first..last
}

/// Mean of a bin slice normalized to [0, 1]
pub fn band_energy(bins: &[u8], start: f32, end: f32) -> f32 {
    let range = bin_range(bins.len(), start, end);
    if range.is_empty() {
        return 0.0;
    }
    let count = range.len() as f32;
    let sum: u32 = bins[range].iter().map(|&b| b as u32).sum();
    sum as f32 / count / MAX_SAMPLE_VALUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fraction_clamping() {
        assert_eq!(fraction_to_index(-0.5, 100), 0);
        assert_eq!(fraction_to_index(0.1, 100), 10);
        assert_eq!(fraction_to_index(1.5, 100), 100);
        assert_eq!(fraction_to_index(f32::NAN, 100), 0);
        assert_eq!(fraction_to_index(f32::INFINITY, 100), 100);
    }

    #[test]
    fn test_bin_range_edges() {
        assert_eq!(bin_range(1024, 0.0, 0.1), 0..102);
        assert_eq!(bin_range(1024, 0.5, 1.0), 512..1024);
        // Reversed
        assert!(bin_range(1024, 0.8, 0.2).is_empty());
        // Tiny spectrum still gets one bass bin
        assert_eq!(bin_range(4, 0.0, 0.1), 0..1);
        // Past the end
        assert!(bin_range(4, 1.2, 2.0).is_empty());
    }

    #[test]
    fn test_band_energy_full_scale() {
        let bins = vec![255u8; 512];
        let bands = BandLayout::default().measure(&bins);
        for band in FrequencyBand::ALL {
            assert!((bands.get(band) - 1.0).abs() < 1e-6, "{:?}", band);
        }
    }

    #[test]
    fn test_bass_only_signal() {
        let mut bins = vec![0u8; 1000];
        for bin in bins.iter_mut().take(100) {
            *bin = 200;
        }
        let bands = BandLayout::default().measure(&bins);
        assert!((bands.bass - 200.0 / 255.0).abs() < 1e-6);
        assert_eq!(bands.mid, 0.0);
        assert_eq!(bands.treble, 0.0);
    }

    #[test]
    fn test_empty_spectrum() {
        let bands = BandLayout::default().measure(&[]);
        assert_eq!(bands, BandEnergy::default());
    }

    #[test]
    fn test_band_accessors_round_trip() {
        let mut energy = BandEnergy::default();
        for (i, band) in FrequencyBand::ALL.iter().enumerate() {
            energy.set(*band, i as f32 * 0.1);
        }
        assert_eq!(energy.get(FrequencyBand::Treble), 0.4);
        assert!((energy.overall() - 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_zero_spectrum_has_zero_energy(
            len in 0usize..4096,
            start in -2.0f32..3.0,
            end in -2.0f32..3.0,
        ) {
            let bins = vec![0u8; len];
            prop_assert_eq!(band_energy(&bins, start, end), 0.0);
        }

        #[test]
        fn prop_energy_is_normalized(
            bins in proptest::collection::vec(any::<u8>(), 0..2048),
            start in -1.0f32..2.0,
            end in -1.0f32..2.0,
        ) {
            let energy = band_energy(&bins, start, end);
            prop_assert!((0.0..=1.0).contains(&energy));
        }
    }
}

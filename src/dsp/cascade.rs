//! Filter cascade assembly from description strings
//!
//! A cascade description looks like
//! `bqHighPass[q 0.3, freq 200] bwLowPass[order 5, freq 10000]`.
//! Descriptions are validated up front into a [`FilterCascadeSpec`];
//! the stateful [`FilterCascade`] is built per channel once the sample
//! rate is known.

use super::biquad::BiquadFilter;
use super::butterworth::{butterworth_band_pass, butterworth_band_stop, butterworth_high_pass,
                         butterworth_low_pass};
use super::desc::{parse_description, DescElement};
use super::filter::{Filter, IirFilter};
use crate::error::{Result, WavescopeError};

#[derive(Debug, Clone, PartialEq)]
enum FilterSpec {
    BqHighPass { q: f64, freq: f64, forced_gain: f64 },
    BqLowPass { q: f64, freq: f64, forced_gain: f64 },
    BqHighShelf { q: f64, freq: f64, gain: f64, forced_gain: f64 },
    BqLowShelf { q: f64, freq: f64, gain: f64, forced_gain: f64 },
    BqPeak { q: f64, freq: f64, gain: f64, forced_gain: f64 },
    BwLowPass { order: usize, freq: f64, forced_gain: f64 },
    BwHighPass { order: usize, freq: f64, forced_gain: f64 },
    BwBandPass { order: usize, freq_low: f64, freq_high: f64, forced_gain: f64 },
    BwBandStop { order: usize, freq_low: f64, freq_high: f64, forced_gain: f64 },
}

/// Parsed and validated cascade description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCascadeSpec {
    filters: Vec<FilterSpec>,
}

impl FilterCascadeSpec {
    pub fn parse(desc: &str) -> Result<Self> {
        let elements = parse_description(desc).map_err(reason_to_filter_error)?;
        let mut filters = Vec::with_capacity(elements.len());
        for element in &elements {
            filters.push(parse_element(element)?);
        }
        Ok(Self { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn build(&self, sample_rate: u32) -> Result<FilterCascade> {
        let mut filters = Vec::with_capacity(self.filters.len());
        for spec in &self.filters {
            filters.push(build_filter(spec, sample_rate)?);
        }
        Ok(FilterCascade { filters })
    }
}

fn reason_to_filter_error(err: WavescopeError) -> WavescopeError {
    match err {
        WavescopeError::InvalidParams { reason } => WavescopeError::InvalidFilter { reason },
        other => other,
    }
}

fn parse_element(element: &DescElement) -> Result<FilterSpec> {
    let required = |key: &str| -> Result<f64> {
        element
            .arg_f64(key)
            .map_err(reason_to_filter_error)?
            .ok_or_else(|| WavescopeError::InvalidFilter {
                reason: format!("'{}': missing required parameter '{key}'", element.name),
            })
    };
    let optional = |key: &str, default: f64| -> Result<f64> {
        Ok(element
            .arg_f64(key)
            .map_err(reason_to_filter_error)?
            .unwrap_or(default))
    };
    let order = || -> Result<usize> {
        let raw = required("order")?;
        if raw.fract() != 0.0 || raw < 1.0 {
            return Err(WavescopeError::InvalidFilter {
                reason: format!("'{}': order must be a positive integer", element.name),
            });
        }
        Ok(raw as usize)
    };

    let spec = match element.name.as_str() {
        "bqHighPass" => FilterSpec::BqHighPass {
            q: required("q")?,
            freq: required("freq")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bqLowPass" => FilterSpec::BqLowPass {
            q: required("q")?,
            freq: required("freq")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bqHighShelf" => FilterSpec::BqHighShelf {
            q: required("q")?,
            freq: required("freq")?,
            gain: required("gain")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bqLowShelf" => FilterSpec::BqLowShelf {
            q: required("q")?,
            freq: required("freq")?,
            gain: required("gain")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bqPeak" => FilterSpec::BqPeak {
            q: required("q")?,
            freq: required("freq")?,
            gain: required("gain")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bwLowPass" => FilterSpec::BwLowPass {
            order: order()?,
            freq: required("freq")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bwHighPass" => FilterSpec::BwHighPass {
            order: order()?,
            freq: required("freq")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bwBandPass" => FilterSpec::BwBandPass {
            order: order()?,
            freq_low: required("freqLow")?,
            freq_high: required("freqHigh")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        "bwBandStop" => FilterSpec::BwBandStop {
            order: order()?,
            freq_low: required("freqLow")?,
            freq_high: required("freqHigh")?,
            forced_gain: optional("forcedGain", 0.0)?,
        },
        unknown => {
            return Err(WavescopeError::InvalidFilter {
                reason: format!("unknown filter type: '{unknown}'"),
            })
        }
    };
    Ok(spec)
}

enum AnyFilter {
    Biquad(BiquadFilter),
    Iir(IirFilter),
}

impl AnyFilter {
    fn as_filter(&mut self) -> &mut dyn Filter {
        match self {
            AnyFilter::Biquad(f) => f,
            AnyFilter::Iir(f) => f,
        }
    }
}

fn build_filter(spec: &FilterSpec, sample_rate: u32) -> Result<AnyFilter> {
    let mut filter = match *spec {
        FilterSpec::BqHighPass { q, freq, .. } => {
            AnyFilter::Biquad(BiquadFilter::high_pass(sample_rate, q, freq))
        }
        FilterSpec::BqLowPass { q, freq, .. } => {
            AnyFilter::Biquad(BiquadFilter::low_pass(sample_rate, q, freq))
        }
        FilterSpec::BqHighShelf { q, freq, gain, .. } => {
            AnyFilter::Biquad(BiquadFilter::high_shelf(sample_rate, q, freq, gain))
        }
        FilterSpec::BqLowShelf { q, freq, gain, .. } => {
            AnyFilter::Biquad(BiquadFilter::low_shelf(sample_rate, q, freq, gain))
        }
        FilterSpec::BqPeak { q, freq, gain, .. } => {
            AnyFilter::Biquad(BiquadFilter::peak(sample_rate, q, freq, gain))
        }
        FilterSpec::BwLowPass { order, freq, .. } => {
            let params = butterworth_low_pass(order, sample_rate, freq)?;
            AnyFilter::Iir(IirFilter::new(params.a, params.b))
        }
        FilterSpec::BwHighPass { order, freq, .. } => {
            let params = butterworth_high_pass(order, sample_rate, freq)?;
            AnyFilter::Iir(IirFilter::new(params.a, params.b))
        }
        FilterSpec::BwBandPass { order, freq_low, freq_high, .. } => {
            let params = butterworth_band_pass(order, sample_rate, freq_low, freq_high)?;
            AnyFilter::Iir(IirFilter::new(params.a, params.b))
        }
        FilterSpec::BwBandStop { order, freq_low, freq_high, .. } => {
            let params = butterworth_band_stop(order, sample_rate, freq_low, freq_high)?;
            AnyFilter::Iir(IirFilter::new(params.a, params.b))
        }
    };

    // Positive shelf or peak gain raises perceived loudness, so the
    // filter output is attenuated by the same energy amount.
    let (auto_gain, forced_gain) = match *spec {
        FilterSpec::BqHighShelf { gain, forced_gain, .. }
        | FilterSpec::BqLowShelf { gain, forced_gain, .. }
        | FilterSpec::BqPeak { gain, forced_gain, .. } => (-gain.max(0.0), forced_gain),
        FilterSpec::BqHighPass { forced_gain, .. }
        | FilterSpec::BqLowPass { forced_gain, .. }
        | FilterSpec::BwLowPass { forced_gain, .. }
        | FilterSpec::BwHighPass { forced_gain, .. }
        | FilterSpec::BwBandPass { forced_gain, .. }
        | FilterSpec::BwBandStop { forced_gain, .. } => (0.0, forced_gain),
    };
    filter.as_filter().add_gain_db_energy(auto_gain + forced_gain);

    Ok(filter)
}

/// A chain of stateful filters applied in sequence
pub struct FilterCascade {
    filters: Vec<AnyFilter>,
}

impl FilterCascade {
    pub fn apply(&mut self, wave: &mut [f32]) {
        for filter in &mut self.filters {
            filter.as_filter().apply(wave);
        }
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.as_filter().reset();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_build() {
        let spec =
            FilterCascadeSpec::parse("bqHighPass[q 0.3, freq 200] bwLowPass[order 5, freq 10000]")
                .unwrap();
        let cascade = spec.build(48_000).unwrap();
        assert!(!cascade.is_empty());
    }

    #[test]
    fn test_missing_required_param() {
        assert!(FilterCascadeSpec::parse("bqHighPass[q 0.3]").is_err());
        assert!(FilterCascadeSpec::parse("bqPeak[q 0.3, freq 200]").is_err());
    }

    #[test]
    fn test_unknown_filter() {
        assert!(FilterCascadeSpec::parse("chebyshev[order 2, freq 100]").is_err());
    }

    #[test]
    fn test_empty_description() {
        let spec = FilterCascadeSpec::parse("").unwrap();
        assert!(spec.is_empty());
        assert!(spec.build(48_000).unwrap().is_empty());
    }

    #[test]
    fn test_cascade_attenuates_out_of_band() {
        let spec = FilterCascadeSpec::parse("bwBandPass[order 3, freqLow 900, freqHigh 1100]")
            .unwrap();
        let mut cascade = spec.build(48_000).unwrap();

        let mut low: Vec<f32> = (0..48_000)
            .map(|i| (2.0 * std::f32::consts::PI * 50.0 * i as f32 / 48_000.0).sin())
            .collect();
        cascade.apply(&mut low);
        let peak = low[24_000..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 0.05, "out-of-band leak: {peak}");
    }

    #[test]
    fn test_shelf_gain_compensation() {
        // +12 dB shelf carries -12 dB energy compensation, so a DC
        // input well below the shelf is attenuated
        let spec = FilterCascadeSpec::parse("bqHighShelf[q 0.7, freq 10000, gain 12]").unwrap();
        let mut cascade = spec.build(48_000).unwrap();
        let mut wave = vec![1.0_f32; 4096];
        cascade.apply(&mut wave);
        let settled = wave[4095];
        assert!(settled < 0.8, "expected attenuation below shelf, got {settled}");
    }
}

//! Frequency band mapper
//!
//! Maps FFT cascade spectra onto arbitrary frequency bands. Each band
//! accumulates bin magnitudes weighted by geometric overlap, mixes
//! contributions from the cascades whose resolution fits the band,
//! optionally blurs low-confidence cascades, applies temporal
//! smoothing over past ticks and a log-domain sensitivity transform.

use super::FftMeta;
use crate::error::{Result, WavescopeError};
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frequencies closer than this are treated as duplicate band edges
const FREQ_SIMILARITY_THRESHOLD: f64 = 0.07;

const LOG10_INVERSE: f64 = 0.301_029_995_663_981_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SmoothingCurve {
    Flat,
    Linear,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MixFunction {
    #[default]
    Product,
    Average,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandMapperParams {
    pub source: String,
    /// Band edge description, e.g. `log 20 20 20000 | custom 50 60`
    pub freq_list: String,
    /// 1-based fixed cascade range; 0 selects adaptively
    #[serde(default)]
    pub cascade_min: usize,
    #[serde(default)]
    pub cascade_max: usize,
    #[serde(default = "default_target_weight")]
    pub target_weight: f64,
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_true")]
    pub include_zero: bool,
    #[serde(default = "default_true")]
    pub proportional_values: bool,
    #[serde(default = "default_true")]
    pub blur_cascades: bool,
    #[serde(default = "default_blur_radius")]
    pub blur_radius: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: usize,
    #[serde(default)]
    pub smoothing_curve: SmoothingCurve,
    #[serde(default = "default_exponential_factor")]
    pub exponential_factor: f64,
    #[serde(default)]
    pub mix_function: MixFunction,
}

fn default_target_weight() -> f64 {
    1.5
}
fn default_min_weight() -> f64 {
    0.1
}
fn default_true() -> bool {
    true
}
fn default_blur_radius() -> f64 {
    1.0
}
fn default_sensitivity() -> f64 {
    35.0
}
fn default_smoothing_factor() -> usize {
    4
}
fn default_exponential_factor() -> f64 {
    1.5
}

#[derive(Debug, Clone, Copy, Default)]
struct BandInfo {
    magnitude: f64,
    weight: f64,
}

#[derive(Debug, Clone)]
struct Analysis {
    /// 1-based inclusive cascade range that any band actually used
    used_range: Option<(usize, usize)>,
    /// Per-band diagnostic: `band:weight:firstCascade-lastCascade`
    text: String,
    /// Blur sigma per absolute cascade index per band
    blur_sigmas: Vec<Vec<f64>>,
}

#[derive(Default)]
struct KernelCache {
    by_radius: HashMap<usize, Vec<f64>>,
}

impl KernelCache {
    fn for_sigma(&mut self, sigma: f64) -> &[f64] {
        let radius = ((sigma * 3.0).round() as usize).max(1);
        self.by_radius.entry(radius).or_insert_with(|| {
            let mut kernel = vec![0.0; radius * 2 + 1];
            let power_factor = 1.0 / (2.0 * sigma * sigma);
            let mut sum = 0.0;
            for (i, coeff) in kernel.iter_mut().enumerate() {
                let x = i as f64 - radius as f64;
                *coeff = (-x * x * power_factor).exp();
                sum += *coeff;
            }
            let inv = 1.0 / sum;
            kernel.iter_mut().for_each(|c| *c *= inv);
            kernel
        })
    }
}

pub struct BandMapper {
    params: BandMapperParams,
    band_freqs: Vec<f64>,
    multipliers: Vec<f64>,
    log_normalization: f64,
    sample_rate: u32,
    meta: Option<FftMeta>,

    band_info: Vec<Vec<BandInfo>>,
    analysis: Option<Analysis>,
    kernels: KernelCache,
    blur_buf: Vec<f64>,

    values: Vec<f64>,
    past_values: Vec<Vec<f64>>,
    past_index: usize,
}

impl BandMapper {
    pub fn new(params: BandMapperParams) -> Self {
        Self {
            params,
            band_freqs: Vec::new(),
            multipliers: Vec::new(),
            log_normalization: 0.0,
            sample_rate: 0,
            meta: None,
            band_info: Vec::new(),
            analysis: None,
            kernels: KernelCache::default(),
            blur_buf: Vec::new(),
            values: Vec::new(),
            past_values: Vec::new(),
            past_index: 0,
        }
    }

    fn bands_count(&self) -> usize {
        self.band_freqs.len().saturating_sub(1)
    }
}

impl HandlerImpl for BandMapper {
    fn configure(&mut self, sample_rate: u32, source: Option<&Handler>) -> Result<DataSize> {
        let source = source.ok_or_else(|| WavescopeError::SourceNotFound {
            name: self.params.source.clone(),
        })?;
        let meta = source
            .kind()
            .fft_meta()
            .ok_or_else(|| WavescopeError::SourceTypeMismatch {
                name: self.params.source.clone(),
                expected: "fft",
            })?;

        self.band_freqs = parse_freq_list(&self.params.freq_list)?;
        let bands = self.bands_count();

        // Wider bands integrate more signal; the log-scaled width
        // multipliers even that out, normalized to average 1
        self.multipliers = self
            .band_freqs
            .windows(2)
            .map(|edge| (edge[1] - edge[0] + 1.0).ln() / 50.0_f64.ln())
            .collect();
        let average = self.multipliers.iter().sum::<f64>() / bands as f64;
        self.multipliers.iter_mut().for_each(|m| *m /= average);

        self.log_normalization = 20.0 / self.params.sensitivity.max(0.1);

        self.sample_rate = sample_rate;
        self.meta = Some(meta);
        self.values = vec![0.0; bands];
        self.past_values = vec![vec![0.0; bands]; self.params.smoothing_factor.max(1)];
        self.past_index = 0;
        self.analysis = None;

        let eq_wave_size = source
            .data_size()
            .eq_wave_sizes
            .first()
            .copied()
            .unwrap_or(0);
        Ok(DataSize::new(bands, vec![eq_wave_size]))
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext<'_>,
        source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        let Some(source) = source else {
            return Ok(());
        };
        let Some(meta) = self.meta else {
            return Ok(());
        };
        if !source.output().has_chunks() {
            // no new spectra this tick, keep the previous values
            return Ok(());
        }

        let bands = self.bands_count();

        let (begin1, end1) = match &self.analysis {
            Some(analysis) => match analysis.used_range {
                Some((min_used, max_used)) => (min_used, max_used + 1),
                None => (1, meta.cascades_count + 1),
            },
            None => {
                let mut begin = 1;
                let mut end = meta.cascades_count + 1;
                if self.params.cascade_min > 0 {
                    if meta.cascades_count < self.params.cascade_min {
                        return Ok(());
                    }
                    begin = self.params.cascade_min;
                    if self.params.cascade_max >= self.params.cascade_min
                        && meta.cascades_count >= self.params.cascade_max
                    {
                        end = self.params.cascade_max + 1;
                    }
                }
                (begin, end)
            }
        };
        let (begin, end) = (begin1 - 1, end1 - 1);

        self.band_info = vec![vec![BandInfo::default(); bands]; end - begin];

        // Overlap-weighted accumulation, bin width halving per cascade
        let mut bin_width =
            f64::from(self.sample_rate) / (meta.fft_size as f64 * (1 << begin) as f64);
        for cascade in begin..end {
            let spectrum = source.output().latest(cascade);
            let info = &mut self.band_info[cascade - begin];

            let mut bin = if self.params.include_zero { 0 } else { 1 };
            let mut band = 0;
            let mut band_min_freq = self.band_freqs[0];
            let mut band_max_freq = self.band_freqs[1];

            while bin < meta.values_count && band < bands {
                let bin_upper = (bin as f64 + 0.5) * bin_width;
                if bin_upper < band_min_freq {
                    bin += 1;
                    continue;
                }

                let bin_lower = (bin as f64 - 0.5) * bin_width;
                let mut weight = 1.0;
                if bin_lower < band_min_freq {
                    weight -= (band_min_freq - bin_lower) / bin_width;
                }
                if band_max_freq < bin_upper {
                    weight -= (bin_upper - band_max_freq) / bin_width;
                }
                if weight > 0.0 {
                    info[band].magnitude += f64::from(spectrum[bin]) * weight;
                    info[band].weight += weight;
                }

                if band_max_freq >= bin_upper {
                    bin += 1;
                } else {
                    band += 1;
                    if band >= bands {
                        break;
                    }
                    band_min_freq = band_max_freq;
                    band_max_freq = self.band_freqs[band + 1];
                }
            }
            bin_width *= 0.5;
        }

        if self.analysis.is_none() {
            self.analysis = Some(compute_analysis(
                &self.band_info,
                begin1,
                end1,
                meta.cascades_count,
                &self.params,
                bands,
            ));
        }

        if self.params.blur_cascades {
            let analysis = self.analysis.as_ref().map(|a| &a.blur_sigmas);
            self.blur_buf.resize(bands, 0.0);
            for cascade in begin..end {
                let info = &mut self.band_info[cascade - begin];
                for band in 0..bands {
                    let sigma = analysis
                        .and_then(|s| s.get(cascade))
                        .and_then(|row| row.get(band))
                        .copied()
                        .unwrap_or(0.0);
                    if sigma == 0.0 {
                        self.blur_buf[band] = info[band].magnitude;
                        continue;
                    }
                    let kernel = self.kernels.for_sigma(sigma);
                    let radius = kernel.len() / 2;
                    let first = band.saturating_sub(radius);
                    let kernel_first = radius - (band - first);
                    self.blur_buf[band] = kernel[kernel_first..]
                        .iter()
                        .zip(&info[first..])
                        .map(|(k, b)| k * b.magnitude)
                        .sum();
                }
                for (slot, &blurred) in info.iter_mut().zip(&self.blur_buf) {
                    slot.magnitude = blurred;
                }
            }
        }

        self.past_index = (self.past_index + 1) % self.past_values.len();
        for band in 0..bands {
            let mut value = mix_band(&self.params, &self.band_info, band);
            if self.params.proportional_values {
                value *= self.multipliers[band];
            }
            self.past_values[self.past_index][band] = value;
        }

        apply_smoothing(
            &mut self.values,
            &self.past_values,
            self.past_index,
            &self.params,
        );

        for value in &mut self.values {
            let logged = value.log2() * LOG10_INVERSE;
            *value = logged * self.log_normalization + 1.0 + self.params.offset;
        }

        let chunk = out.push_chunk(0)?;
        for (dst, &src) in chunk.iter_mut().zip(&self.values) {
            *dst = src as f32;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        for past in &mut self.past_values {
            past.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    fn prop(&self, name: &str) -> Option<String> {
        let bands = self.bands_count();
        let value = match name {
            "bands count" => bands.to_string(),
            "cascade analysis" => self.analysis.as_ref()?.text.clone(),
            "min cascade used" => self
                .analysis
                .as_ref()?
                .used_range
                .map_or(-1, |(min, _)| min as i64)
                .to_string(),
            "max cascade used" => self
                .analysis
                .as_ref()?
                .used_range
                .map_or(-1, |(_, max)| max as i64)
                .to_string(),
            _ => {
                let indexed = |prefix: &str| -> Option<usize> {
                    let index: usize = name.strip_prefix(prefix)?.trim().parse().ok()?;
                    (index < bands).then_some(index)
                };
                if let Some(band) = indexed("lower bound ") {
                    format!("{}", self.band_freqs[band])
                } else if let Some(band) = indexed("upper bound ") {
                    format!("{}", self.band_freqs[band + 1])
                } else if let Some(band) = indexed("central frequency ") {
                    format!("{}", (self.band_freqs[band] + self.band_freqs[band + 1]) * 0.5)
                } else {
                    return None;
                }
            }
        };
        Some(value)
    }
}

fn compute_analysis(
    band_info: &[Vec<BandInfo>],
    begin1: usize,
    end1: usize,
    cascades_count: usize,
    params: &BandMapperParams,
    bands: usize,
) -> Analysis {
    use std::fmt::Write;

    let mut blur_sigmas = vec![vec![0.0; bands]; cascades_count];
    let mut used_range: Option<(usize, usize)> = None;
    let mut text = String::new();

    for band in 0..bands {
        let mut weight = 0.0;
        let mut band_first: Option<usize> = None;
        let mut band_last: Option<usize> = None;

        for cascade1 in begin1..end1 {
            let info = band_info[cascade1 - begin1][band];

            let sigma = if info.weight >= 1.0 || info.weight < f64::EPSILON {
                0.0
            } else {
                1.0 / info.weight * params.blur_radius * 0.25
            };
            blur_sigmas[cascade1 - 1][band] = sigma;

            if info.weight >= params.min_weight {
                weight += info.weight;
                band_first.get_or_insert(cascade1);
                band_last = Some(cascade1);
                used_range = Some(match used_range {
                    None => (cascade1, cascade1),
                    Some((min, max)) => (min.min(cascade1), max.max(cascade1)),
                });
            }

            if weight >= params.target_weight {
                break;
            }
        }

        let _ = write!(
            text,
            "{band}:{weight:.1}:{}-{} ",
            band_first.map_or(-1, |c| c as i64),
            band_last.map_or(end1 as i64 - 1, |c| c as i64),
        );
    }

    Analysis {
        used_range,
        text,
        blur_sigmas,
    }
}

/// Mixes one band across cascades, stopping once enough weight was
/// seen. Cascades whose overlap weight falls below `min_weight` count
/// neither into the mix nor into the geometric-mean root.
fn mix_band(params: &BandMapperParams, band_info: &[Vec<BandInfo>], band: usize) -> f64 {
    let mut weight = 0.0;
    let mut cascades_summed = 0u32;
    let mut value = match params.mix_function {
        MixFunction::Product => 1.0,
        MixFunction::Average => 0.0,
    };

    for info_row in band_info {
        let info = info_row[band];
        if info.weight >= params.min_weight {
            let cascade_value = info.magnitude / info.weight;
            match params.mix_function {
                MixFunction::Product => value *= cascade_value,
                MixFunction::Average => value += cascade_value,
            }
            weight += info.weight;
            cascades_summed += 1;
        }
        if weight >= params.target_weight {
            break;
        }
    }

    if cascades_summed > 0 {
        value = match params.mix_function {
            MixFunction::Product => value.powf(1.0 / f64::from(cascades_summed)),
            MixFunction::Average => value / f64::from(cascades_summed),
        };
    }
    value
}

fn apply_smoothing(
    values: &mut [f64],
    past: &[Vec<f64>],
    past_index: usize,
    params: &BandMapperParams,
) {
    let factor = past.len();
    if factor <= 1 {
        values.copy_from_slice(&past[0]);
        return;
    }

    // oldest entry comes right after the one just written
    let start = (past_index + 1) % factor;
    let ages = (start..factor).chain(0..start);

    for (band, value) in values.iter_mut().enumerate() {
        let mut out = 0.0;
        let mut weight_sum = 0.0;
        let mut weight = 1.0;
        for i in ages.clone() {
            out += past[i][band] * weight;
            weight_sum += weight;
            match params.smoothing_curve {
                SmoothingCurve::Flat => {}
                SmoothingCurve::Linear => weight += 1.0,
                SmoothingCurve::Exponential => weight *= params.exponential_factor,
            }
        }
        *value = out / weight_sum;
    }
}

/// Parses a `|`-separated list of `linear count min max`,
/// `log count min max` and `custom f1 f2 ...` entries into sorted,
/// deduplicated band edges.
pub fn parse_freq_list(desc: &str) -> Result<Vec<f64>> {
    let mut freqs: Vec<f64> = Vec::new();

    for entry in desc.split('|') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = entry.split_whitespace().collect();
        let parse = |token: &str| -> Result<f64> {
            token.parse().map_err(|_| WavescopeError::InvalidFreqList {
                reason: format!("'{token}' is not a number in '{entry}'"),
            })
        };

        match tokens[0] {
            kind @ ("linear" | "log") => {
                if tokens.len() != 4 {
                    return Err(WavescopeError::InvalidFreqList {
                        reason: format!("{kind} needs exactly count, min, max: '{entry}'"),
                    });
                }
                let count: usize =
                    tokens[1]
                        .parse()
                        .map_err(|_| WavescopeError::InvalidFreqList {
                            reason: format!("invalid count in '{entry}'"),
                        })?;
                if count < 1 {
                    return Err(WavescopeError::InvalidFreqList {
                        reason: format!("count must be >= 1 in '{entry}'"),
                    });
                }
                let min = parse(tokens[2])?;
                let max = parse(tokens[3])?;
                if min >= max {
                    return Err(WavescopeError::InvalidFreqList {
                        reason: format!("min must be < max in '{entry}'"),
                    });
                }

                if kind == "linear" {
                    let delta = max - min;
                    freqs.extend((0..=count).map(|i| min + delta * i as f64 / count as f64));
                } else {
                    let step = 2.0_f64.powf((max / min).log2() / count as f64);
                    let mut freq = min;
                    freqs.push(freq);
                    for _ in 0..count {
                        freq *= step;
                        freqs.push(freq);
                    }
                }
            }
            "custom" => {
                if tokens.len() < 3 {
                    return Err(WavescopeError::InvalidFreqList {
                        reason: format!("custom needs at least two frequencies: '{entry}'"),
                    });
                }
                for token in &tokens[1..] {
                    freqs.push(parse(token)?);
                }
            }
            unknown => {
                return Err(WavescopeError::InvalidFreqList {
                    reason: format!("unknown list type '{unknown}'"),
                })
            }
        }
    }

    freqs.sort_by(f64::total_cmp);

    let mut result = Vec::with_capacity(freqs.len());
    let mut last = -1.0;
    for freq in freqs {
        if freq <= 0.0 {
            return Err(WavescopeError::InvalidFreqList {
                reason: format!("frequency must be > 0, got {freq}"),
            });
        }
        if (freq - last).abs() < FREQ_SIMILARITY_THRESHOLD {
            last = freq;
            continue;
        }
        result.push(freq);
        last = freq;
    }

    if result.len() < 2 {
        return Err(WavescopeError::InvalidFreqList {
            reason: format!("need at least 2 distinct edges, got {}", result.len()),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_list() {
        let edges = parse_freq_list("linear 4 100 500").unwrap();
        assert_eq!(edges, vec![100.0, 200.0, 300.0, 400.0, 500.0]);
    }

    #[test]
    fn test_log_list() {
        let edges = parse_freq_list("log 3 100 800").unwrap();
        assert_eq!(edges.len(), 4);
        assert_abs_diff_eq!(edges[0], 100.0);
        assert_abs_diff_eq!(edges[1], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(edges[3], 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_and_merge() {
        let edges = parse_freq_list("custom 50 1000 | linear 1 100 200").unwrap();
        assert_eq!(edges, vec![50.0, 100.0, 200.0, 1000.0]);
    }

    #[test]
    fn test_near_duplicates_collapse() {
        let edges = parse_freq_list("custom 100 100.05 200").unwrap();
        assert_eq!(edges, vec![100.0, 200.0]);
    }

    #[test]
    fn test_rejects_bad_lists() {
        assert!(parse_freq_list("linear 0 100 200").is_err());
        assert!(parse_freq_list("linear 4 500 100").is_err());
        assert!(parse_freq_list("custom 100").is_err());
        assert!(parse_freq_list("custom 0 100").is_err());
        assert!(parse_freq_list("spline 4 100 200").is_err());
        assert!(parse_freq_list("").is_err());
    }

    #[test]
    fn test_smoothing_factor_one_is_passthrough() {
        let params = BandMapperParams {
            source: "s".into(),
            freq_list: "linear 1 100 200".into(),
            cascade_min: 0,
            cascade_max: 0,
            target_weight: 1.5,
            min_weight: 0.1,
            include_zero: true,
            proportional_values: false,
            blur_cascades: false,
            blur_radius: 1.0,
            sensitivity: 35.0,
            offset: 0.0,
            smoothing_factor: 1,
            smoothing_curve: SmoothingCurve::Flat,
            exponential_factor: 1.5,
            mix_function: MixFunction::Product,
        };
        let past = vec![vec![0.7]];
        let mut values = vec![0.0];
        apply_smoothing(&mut values, &past, 0, &params);
        assert_eq!(values, vec![0.7]);
    }

    #[test]
    fn test_flat_smoothing_averages_history() {
        let params = BandMapperParams {
            smoothing_curve: SmoothingCurve::Flat,
            ..serde_json::from_str(r#"{"source":"s","freqList":"linear 1 100 200"}"#).unwrap()
        };
        let past = vec![vec![1.0], vec![2.0], vec![3.0]];
        let mut values = vec![0.0];
        apply_smoothing(&mut values, &past, 1, &params);
        assert_abs_diff_eq!(values[0], 2.0);
    }

    #[test]
    fn test_exponential_smoothing_favors_recent() {
        let params: BandMapperParams =
            serde_json::from_str(r#"{"source":"s","freqList":"linear 1 100 200"}"#).unwrap();
        assert_eq!(params.smoothing_curve, SmoothingCurve::Exponential);

        // newest value at past_index 2 gets the largest weight
        let past = vec![vec![0.0], vec![0.0], vec![1.0]];
        let mut values = vec![0.0];
        apply_smoothing(&mut values, &past, 2, &params);
        // weights 1, 1.5, 2.25 oldest to newest
        assert_abs_diff_eq!(values[0], 2.25 / 4.75, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        let mut cache = KernelCache::default();
        let kernel = cache.for_sigma(2.0);
        assert_eq!(kernel.len(), 13);
        assert_abs_diff_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_product_mix_takes_geometric_mean() {
        let params: BandMapperParams =
            serde_json::from_str(r#"{"source":"s","freqList":"linear 1 100 200"}"#).unwrap();
        let band_info = vec![
            vec![BandInfo { magnitude: 1.0, weight: 0.5 }],
            vec![BandInfo { magnitude: 4.0, weight: 0.5 }],
        ];
        // cascade values 2 and 8 mix to sqrt(16)
        assert_abs_diff_eq!(mix_band(&params, &band_info, 0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mix_skips_cascades_below_min_weight() {
        let params: BandMapperParams =
            serde_json::from_str(r#"{"source":"s","freqList":"linear 1 100 200"}"#).unwrap();
        let band_info = vec![
            vec![BandInfo { magnitude: 0.05, weight: 0.05 }],
            vec![BandInfo { magnitude: 4.0, weight: 0.5 }],
        ];
        // a cascade under the 0.1 weight floor joins neither the
        // product nor the root count, so the single valid cascade
        // comes through unrooted
        assert_abs_diff_eq!(mix_band(&params, &band_info, 0), 8.0, epsilon = 1e-12);
    }

    fn fft_source(wave: &[f32]) -> Handler {
        let config = serde_json::from_value(serde_json::json!({
            "name": "spectrum", "type": "fft",
            "sizeBy": "sizeExact", "resolution": 1024.0,
            "attackMs": 0.0, "cascadesCount": 1
        }))
        .unwrap();
        let mut source = Handler::new(config);
        source.configure(48_000, None).unwrap();
        let ctx = ProcessContext {
            wave,
            sample_rate: 48_000,
        };
        source.process(&ctx, None).unwrap();
        source
    }

    #[test]
    fn test_band_weights_sum_to_covered_bins() {
        let wave: Vec<f32> = (0..1024)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48_000.0).sin())
            .collect();
        let source = fft_source(&wave);

        let params: BandMapperParams = serde_json::from_value(serde_json::json!({
            "source": "spectrum",
            "freqList": "linear 4 100 475",
            "blurCascades": false,
            "proportionalValues": false,
            "smoothingFactor": 1
        }))
        .unwrap();
        let mut mapper = BandMapper::new(params);
        let size = mapper.configure(48_000, Some(&source)).unwrap();
        let mut out = OutputBuffer::default();
        out.set_data_size(size);
        out.begin_tick();
        let ctx = ProcessContext {
            wave: &[],
            sample_rate: 48_000,
        };
        mapper.process(&ctx, Some(&source), &mut out).unwrap();

        // 100..475 Hz spans exactly 8 bins of 46.875 Hz width; the
        // overlap weights across all bands must add up to that count
        let total: f64 = mapper.band_info[0].iter().map(|b| b.weight).sum();
        assert_abs_diff_eq!(total, 8.0, epsilon = 1e-9);
    }
}

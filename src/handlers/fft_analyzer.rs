//! Spectrum source handler

use super::FftMeta;
use crate::error::Result;
use crate::fft::{FftPyramid, FftPyramidParams, SizeBy};
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext};
use crate::dsp::WindowKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FftAnalyzerParams {
    #[serde(default)]
    pub size_by: SizeBy,
    /// Bin width in Hz, or a sample count, depending on `size_by`
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    #[serde(default = "default_cascades")]
    pub cascades_count: usize,
    #[serde(default = "default_attack")]
    pub attack_ms: f64,
    /// Defaults to the attack time
    #[serde(default)]
    pub decay_ms: Option<f64>,
    #[serde(default = "default_true")]
    pub correct_zero: bool,
    #[serde(default)]
    pub window: WindowKind,
    /// Positive amplitude replaces the input with uniform noise
    #[serde(default)]
    pub test_random: f64,
}

fn default_resolution() -> f64 {
    100.0
}
fn default_overlap() -> f64 {
    0.5
}
fn default_cascades() -> usize {
    5
}
fn default_attack() -> f64 {
    100.0
}
fn default_true() -> bool {
    true
}

pub struct FftAnalyzer {
    params: FftAnalyzerParams,
    pyramid: Option<FftPyramid>,
}

impl FftAnalyzer {
    pub fn new(params: FftAnalyzerParams) -> Self {
        Self {
            params,
            pyramid: None,
        }
    }

    pub fn meta(&self) -> Option<FftMeta> {
        let pyramid = self.pyramid.as_ref()?;
        Some(FftMeta {
            fft_size: pyramid.fft_size(),
            stride: pyramid.stride(),
            cascades_count: pyramid.cascades_count(),
            values_count: pyramid.values_count(),
        })
    }
}

impl HandlerImpl for FftAnalyzer {
    fn configure(&mut self, sample_rate: u32, _source: Option<&Handler>) -> Result<DataSize> {
        let attack_sec = self.params.attack_ms.max(0.0) / 1e3;
        let decay_sec = self.params.decay_ms.map_or(attack_sec, |d| d.max(0.0) / 1e3);

        let pyramid_params = FftPyramidParams {
            size_by: self.params.size_by,
            resolution: self.params.resolution,
            overlap: self.params.overlap,
            cascades_count: self.params.cascades_count,
            attack_sec,
            decay_sec,
            correct_zero: self.params.correct_zero,
            window: self.params.window,
        };
        let mut pyramid = FftPyramid::new(&pyramid_params, sample_rate)?;
        if self.params.test_random > 0.0 {
            pyramid.enable_noise(self.params.test_random);
        }

        // One layer per cascade; a cascade at depth k advances by
        // stride input samples times 2^k
        let eq_wave_sizes = (0..pyramid.cascades_count())
            .map(|depth| pyramid.stride() << depth)
            .collect();
        let data_size = DataSize::new(pyramid.values_count(), eq_wave_sizes);

        self.pyramid = Some(pyramid);
        Ok(data_size)
    }

    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        _source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        let Some(pyramid) = &mut self.pyramid else {
            return Ok(());
        };

        let mut overflowed = false;
        pyramid.process(ctx.wave, |depth, values| {
            match out.push_chunk(depth) {
                Ok(chunk) => chunk.copy_from_slice(values),
                Err(ChunkOverflow) => overflowed = true,
            }
        });

        if overflowed {
            Err(ChunkOverflow)
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) {
        if let Some(pyramid) = &mut self.pyramid {
            pyramid.reset();
        }
    }

    fn prop(&self, name: &str) -> Option<String> {
        let pyramid = self.pyramid.as_ref()?;
        let value = match name {
            "size" => pyramid.fft_size().to_string(),
            "stride" => pyramid.stride().to_string(),
            "cascades count" => pyramid.cascades_count().to_string(),
            "attack" => format!("{}", self.params.attack_ms),
            "decay" => format!("{}", self.params.decay_ms.unwrap_or(self.params.attack_ms)),
            "overlap" => format!("{}", self.params.overlap),
            "resolution" => format!("{:.2}", pyramid.bin_width(0)),
            _ => {
                if let Some(depth) = name.strip_prefix("nyquist frequency ") {
                    let depth: usize = depth.trim().parse().ok()?;
                    if depth >= pyramid.cascades_count() {
                        return None;
                    }
                    format!("{:.2}", pyramid.bin_width(depth) * pyramid.values_count() as f64)
                } else if let Some(depth) = name.strip_prefix("dc ") {
                    let depth: usize = depth.trim().parse().ok()?;
                    format!("{}", pyramid.cascade_dc(depth)?)
                } else {
                    return None;
                }
            }
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FftAnalyzerParams {
        FftAnalyzerParams {
            size_by: SizeBy::SizeExact,
            resolution: 1024.0,
            overlap: 0.5,
            cascades_count: 3,
            attack_ms: 0.0,
            decay_ms: None,
            correct_zero: true,
            window: WindowKind::Hann,
            test_random: 0.0,
        }
    }

    #[test]
    fn test_data_size_shape() {
        let mut analyzer = FftAnalyzer::new(params());
        let ds = analyzer.configure(48_000, None).unwrap();
        assert_eq!(ds.values_count, 512);
        assert_eq!(ds.eq_wave_sizes, vec![512, 1024, 2048]);
    }

    #[test]
    fn test_chunk_emission() {
        let mut analyzer = FftAnalyzer::new(params());
        let ds = analyzer.configure(48_000, None).unwrap();
        let mut out = OutputBuffer::default();
        out.set_data_size(ds);
        out.begin_tick();

        let wave = vec![0.5_f32; 2048];
        let ctx = ProcessContext {
            wave: &wave,
            sample_rate: 48_000,
        };
        analyzer.process(&ctx, None, &mut out).unwrap();

        // 2048 samples: cascade 0 fills at 1024 then strides at 512
        assert_eq!(out.chunk_count(0), 3);
        // cascade 1 sees 1024 downsampled samples: one fill
        assert_eq!(out.chunk_count(1), 1);
        assert_eq!(out.chunk_count(2), 0);
    }

    #[test]
    fn test_params_defaults_from_json() {
        let p: FftAnalyzerParams = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.resolution, 100.0);
        assert_eq!(p.cascades_count, 5);
        assert_eq!(p.overlap, 0.5);
        assert!(p.correct_zero);
    }
}

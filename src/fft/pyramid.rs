//! Cascade pyramid construction and driving

use super::cascade::{self, CascadeSetup, FftCascade};
use super::plan::{next_fast_size, plan_for_size};
use crate::dsp::WindowKind;
use crate::error::{Result, WavescopeError};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How `resolution` is interpreted when choosing the transform size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SizeBy {
    /// Target bin width in Hz; size is rounded up to a fast size
    #[default]
    Resolution,
    /// Requested sample count, rounded up to a fast size
    Size,
    /// Requested sample count, only forced even
    SizeExact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FftPyramidParams {
    pub size_by: SizeBy,
    pub resolution: f64,
    pub overlap: f64,
    pub cascades_count: usize,
    pub attack_sec: f64,
    pub decay_sec: f64,
    pub correct_zero: bool,
    pub window: WindowKind,
}

pub struct FftPyramid {
    fft_size: usize,
    stride: usize,
    sample_rate: u32,
    cascades: Vec<FftCascade>,
    noise: Option<NoiseSource>,
    silence_buf: Vec<f32>,
}

struct NoiseSource {
    rng: StdRng,
    amplitude: f32,
}

impl FftPyramid {
    pub fn new(params: &FftPyramidParams, sample_rate: u32) -> Result<Self> {
        if params.cascades_count == 0 || params.cascades_count > 20 {
            return Err(WavescopeError::InvalidParams {
                reason: format!("cascadesCount must be in [1, 20], got {}", params.cascades_count),
            });
        }
        if !(0.0..1.0).contains(&params.overlap) {
            return Err(WavescopeError::InvalidParams {
                reason: format!("overlap must be in [0, 1), got {}", params.overlap),
            });
        }

        let fft_size = compute_fft_size(params, sample_rate)?;
        let raw_stride = (fft_size as f64 * (1.0 - params.overlap)) as usize;
        let stride = raw_stride.clamp(16.min(fft_size), fft_size);

        let plan = plan_for_size(fft_size);
        let window: std::sync::Arc<[f32]> = params.window.coefficients(fft_size).into();

        let cascades = (0..params.cascades_count)
            .map(|depth| {
                let setup = CascadeSetup {
                    fft_size,
                    stride,
                    sample_rate: f64::from(sample_rate) / (1 << depth) as f64,
                    attack_sec: params.attack_sec,
                    decay_sec: params.decay_sec,
                    correct_zero: params.correct_zero,
                };
                FftCascade::new(depth, &setup, plan.clone(), window.clone())
            })
            .collect();

        Ok(Self {
            fft_size,
            stride,
            sample_rate,
            cascades,
            noise: None,
            silence_buf: Vec::new(),
        })
    }

    /// Replaces real input with uniform noise of the given amplitude,
    /// for response testing
    pub fn enable_noise(&mut self, amplitude: f64) {
        self.noise = Some(NoiseSource {
            rng: StdRng::from_entropy(),
            amplitude: amplitude as f32,
        });
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn cascades_count(&self) -> usize {
        self.cascades.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Half the bin count of the transform; index 0 carries DC
    pub fn values_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Bin width in Hz at the given cascade depth
    pub fn bin_width(&self, depth: usize) -> f64 {
        f64::from(self.sample_rate) / (1 << depth) as f64 / self.fft_size as f64
    }

    pub fn cascade_values(&self, depth: usize) -> Option<&[f32]> {
        self.cascades.get(depth).map(FftCascade::values)
    }

    pub fn cascade_dc(&self, depth: usize) -> Option<f32> {
        self.cascades.get(depth).map(FftCascade::dc)
    }

    pub fn process(&mut self, wave: &[f32], mut on_spectrum: impl FnMut(usize, &[f32])) {
        if let Some(noise) = &mut self.noise {
            let dist = Uniform::new_inclusive(-noise.amplitude, noise.amplitude);
            self.silence_buf.clear();
            self.silence_buf
                .extend((0..wave.len()).map(|_| dist.sample(&mut noise.rng)));
            let buf = std::mem::take(&mut self.silence_buf);
            cascade::feed(&mut self.cascades, &buf, 0, &mut on_spectrum);
            self.silence_buf = buf;
            return;
        }
        cascade::feed(&mut self.cascades, wave, 0, &mut on_spectrum);
    }

    pub fn process_silence(&mut self, frames: usize, mut on_spectrum: impl FnMut(usize, &[f32])) {
        let chunk = frames.min(self.fft_size.max(1024));
        self.silence_buf.clear();
        self.silence_buf.resize(chunk, 0.0);
        let buf = std::mem::take(&mut self.silence_buf);

        let mut remaining = frames;
        while remaining > 0 {
            let take = remaining.min(buf.len());
            cascade::feed(&mut self.cascades, &buf[..take], 0, &mut on_spectrum);
            remaining -= take;
        }
        self.silence_buf = buf;
    }

    pub fn reset(&mut self) {
        for cascade in &mut self.cascades {
            cascade.reset();
        }
    }
}

fn compute_fft_size(params: &FftPyramidParams, sample_rate: u32) -> Result<usize> {
    let size = match params.size_by {
        SizeBy::Resolution => {
            if params.resolution <= 0.0 {
                return Err(WavescopeError::InvalidParams {
                    reason: format!("resolution must be positive, got {}", params.resolution),
                });
            }
            next_fast_size((f64::from(sample_rate) / params.resolution).ceil() as usize)
        }
        SizeBy::Size => next_fast_size(params.resolution.max(0.0) as usize),
        SizeBy::SizeExact => (params.resolution.max(0.0) as usize) & !1,
    };
    if size <= 1 {
        return Err(WavescopeError::InvalidParams {
            reason: format!("computed fft size {size} is too small"),
        });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> FftPyramidParams {
        FftPyramidParams {
            size_by: SizeBy::SizeExact,
            resolution: 1024.0,
            overlap: 0.5,
            cascades_count: 3,
            attack_sec: 0.0,
            decay_sec: 0.0,
            correct_zero: true,
            window: WindowKind::Hann,
        }
    }

    #[test]
    fn test_bin_width_halves_per_cascade() {
        let pyramid = FftPyramid::new(&params(), 48_000).unwrap();
        let w0 = pyramid.bin_width(0);
        assert_abs_diff_eq!(w0, 48_000.0 / 1024.0);
        assert_abs_diff_eq!(pyramid.bin_width(1), w0 / 2.0);
        assert_abs_diff_eq!(pyramid.bin_width(2), w0 / 4.0);
    }

    #[test]
    fn test_resolution_mode_size() {
        let mut p = params();
        p.size_by = SizeBy::Resolution;
        p.resolution = 100.0;
        // 48000 / 100 = 480, next fast even size is 480
        let pyramid = FftPyramid::new(&p, 48_000).unwrap();
        assert_eq!(pyramid.fft_size(), 480);
    }

    #[test]
    fn test_stride_clamp() {
        let mut p = params();
        p.overlap = 0.999;
        let pyramid = FftPyramid::new(&p, 48_000).unwrap();
        assert_eq!(pyramid.stride(), 16);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.cascades_count = 0;
        assert!(FftPyramid::new(&p, 48_000).is_err());

        let mut p = params();
        p.overlap = 1.0;
        assert!(FftPyramid::new(&p, 48_000).is_err());

        let mut p = params();
        p.size_by = SizeBy::Resolution;
        p.resolution = 0.0;
        assert!(FftPyramid::new(&p, 48_000).is_err());
    }

    #[test]
    fn test_silence_produces_zero_spectrum() {
        let mut pyramid = FftPyramid::new(&params(), 48_000).unwrap();
        let mut saw = false;
        pyramid.process_silence(4096, |_, values| {
            saw = true;
            assert!(values.iter().all(|&v| v == 0.0));
        });
        assert!(saw);
    }
}

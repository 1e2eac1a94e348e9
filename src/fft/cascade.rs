//! A single FFT cascade
//!
//! Each cascade owns a ring of `fft_size` samples. Incoming samples are
//! appended until the ring is full; the full ring is windowed and
//! transformed, the freshly arrived region is handed to the next
//! cascade through a 2:1 pair-averaging downsample, and the ring is
//! shifted left by `stride` samples.

use num_complex::Complex32;
use realfft::RealToComplex;
use std::sync::Arc;
use tracing::error;

/// Marks an absent carried sample. Real samples sit in [-1, 1] after
/// mixdown so this value can never occur in a wave.
const ODD_EMPTY: f32 = 10.0;

pub(crate) struct CascadeSetup {
    pub fft_size: usize,
    pub stride: usize,
    /// Effective sample rate at this cascade depth
    pub sample_rate: f64,
    pub attack_sec: f64,
    pub decay_sec: f64,
    pub correct_zero: bool,
}

pub struct FftCascade {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Arc<[f32]>,
    window_inv_sum: f32,

    fft_size: usize,
    stride: usize,
    correct_zero: bool,
    /// Smoothing constants for rising and falling magnitudes
    attack_k: f32,
    decay_k: f32,
    /// Compensates amplitude loss from repeated pair averaging
    downsample_gain: f32,

    ring: Vec<f32>,
    filled: usize,
    /// How much of the ring was already handed to the next cascade
    transferred: usize,
    odd: f32,

    values: Vec<f32>,
    dc: f32,

    transfer_buf: Vec<f32>,
    downsample_buf: Vec<f32>,
    scratch_in: Vec<f32>,
    scratch_out: Vec<Complex32>,
}

impl FftCascade {
    pub(crate) fn new(
        depth: usize,
        setup: &CascadeSetup,
        fft: Arc<dyn RealToComplex<f32>>,
        window: Arc<[f32]>,
    ) -> Self {
        let window_sum: f32 = window.iter().sum();
        let smoothing = |time_sec: f64| -> f32 {
            if time_sec <= 0.0 {
                return 0.0;
            }
            (-2.0 * setup.stride as f64 / (setup.sample_rate * time_sec)).exp() as f32
        };

        Self {
            fft,
            window_inv_sum: 1.0 / window_sum,
            window,
            fft_size: setup.fft_size,
            stride: setup.stride,
            correct_zero: setup.correct_zero,
            attack_k: smoothing(setup.attack_sec),
            decay_k: smoothing(setup.decay_sec),
            downsample_gain: 2.0_f32.powf(depth as f32 * 0.5),
            ring: vec![0.0; setup.fft_size],
            filled: 0,
            transferred: 0,
            odd: ODD_EMPTY,
            values: vec![0.0; setup.fft_size / 2],
            dc: 0.0,
            transfer_buf: Vec::new(),
            downsample_buf: Vec::new(),
            scratch_in: vec![0.0; setup.fft_size],
            scratch_out: vec![Complex32::default(); setup.fft_size / 2 + 1],
        }
    }

    /// Smoothed single-sided magnitudes; index 0 is the DC bin
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dc(&self) -> f32 {
        self.dc
    }

    pub fn reset(&mut self) {
        self.ring.iter_mut().for_each(|s| *s = 0.0);
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.filled = 0;
        self.transferred = 0;
        self.odd = ODD_EMPTY;
        self.dc = 0.0;
    }

    fn accept(&mut self, wave: &[f32]) {
        self.ring[self.filled..self.filled + wave.len()].copy_from_slice(wave);
        self.filled += wave.len();
    }

    fn is_full(&self) -> bool {
        self.filled == self.fft_size
    }

    /// Copies everything the next cascade has not seen yet
    fn stage_transfer(&mut self) {
        self.transfer_buf.clear();
        self.transfer_buf.extend_from_slice(&self.ring[self.transferred..]);
    }

    fn shift(&mut self) {
        self.ring.copy_within(self.stride.., 0);
        self.filled = self.fft_size - self.stride;
        self.transferred = self.filled;
    }

    fn run_fft(&mut self) {
        for (dst, (sample, coeff)) in self
            .scratch_in
            .iter_mut()
            .zip(self.ring.iter().zip(self.window.iter()))
        {
            *dst = sample * coeff;
        }

        if let Err(err) = self.fft.process(&mut self.scratch_in, &mut self.scratch_out) {
            error!("fft of size {} failed: {err}", self.fft_size);
            return;
        }

        // The dc readout keeps its sign; the zeroth magnitude bin takes
        // the sqrt(2) correction and the downsample gain like the rest
        let raw_dc = self.scratch_out[0].re * self.window_inv_sum;
        self.dc = self.smooth(self.dc, raw_dc);
        let mut zeroth = raw_dc.abs();
        if self.correct_zero {
            zeroth *= std::f32::consts::SQRT_2;
        }
        self.values[0] = self.smooth(self.values[0], zeroth * self.downsample_gain);

        let scale = 2.0 * self.window_inv_sum * self.downsample_gain;
        for (value, bin) in self.values[1..].iter_mut().zip(&self.scratch_out[1..]) {
            *value = Self::smooth_with(self.attack_k, self.decay_k, *value, bin.norm() * scale);
        }
    }

    fn smooth(&self, old: f32, new: f32) -> f32 {
        Self::smooth_with(self.attack_k, self.decay_k, old, new)
    }

    fn smooth_with(attack_k: f32, decay_k: f32, old: f32, new: f32) -> f32 {
        let k = if new < old { decay_k } else { attack_k };
        new + k * (old - new)
    }

    /// Averages sample pairs, carrying a dangling odd sample to the
    /// next call
    fn downsample_into(&mut self, wave: &[f32], out: &mut Vec<f32>) {
        out.clear();
        let mut rest = wave;
        if self.odd != ODD_EMPTY {
            if let Some((&first, tail)) = rest.split_first() {
                out.push((self.odd + first) * 0.5);
                self.odd = ODD_EMPTY;
                rest = tail;
            }
        }
        let mut pairs = rest.chunks_exact(2);
        for pair in &mut pairs {
            out.push((pair[0] + pair[1]) * 0.5);
        }
        if let [leftover] = pairs.remainder() {
            self.odd = *leftover;
        }
    }
}

/// Feeds a wave into `cascades[0]`, recursing into deeper cascades as
/// rings fill up. `on_spectrum` fires once per completed transform with
/// the cascade depth and its smoothed magnitudes.
pub(crate) fn feed(
    cascades: &mut [FftCascade],
    wave: &[f32],
    depth: usize,
    on_spectrum: &mut dyn FnMut(usize, &[f32]),
) {
    let Some((head, rest)) = cascades.split_first_mut() else {
        return;
    };

    let mut pos = 0;
    while pos < wave.len() {
        let take = (head.fft_size - head.filled).min(wave.len() - pos);
        head.accept(&wave[pos..pos + take]);
        pos += take;

        if head.is_full() {
            head.stage_transfer();
            head.run_fft();
            on_spectrum(depth, &head.values);
            head.shift();

            if !rest.is_empty() {
                let buf = std::mem::take(&mut head.transfer_buf);
                feed_downsampled(rest, &buf, depth + 1, on_spectrum);
                head.transfer_buf = buf;
            }
        }
    }
}

fn feed_downsampled(
    cascades: &mut [FftCascade],
    wave: &[f32],
    depth: usize,
    on_spectrum: &mut dyn FnMut(usize, &[f32]),
) {
    let Some(head) = cascades.first_mut() else {
        return;
    };
    let mut down = std::mem::take(&mut head.downsample_buf);
    head.downsample_into(wave, &mut down);

    feed(cascades, &down, depth, on_spectrum);
    cascades[0].downsample_buf = down;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::WindowKind;
    use crate::fft::plan_for_size;

    fn make_cascade(fft_size: usize, stride: usize) -> FftCascade {
        let setup = CascadeSetup {
            fft_size,
            stride,
            sample_rate: 48_000.0,
            attack_sec: 0.0,
            decay_sec: 0.0,
            correct_zero: true,
        };
        let window: Arc<[f32]> = WindowKind::Hann.coefficients(fft_size).into();
        FftCascade::new(0, &setup, plan_for_size(fft_size), window)
    }

    #[test]
    fn test_no_event_until_ring_fills() {
        let mut cascades = vec![make_cascade(64, 32)];
        let mut events = 0;
        feed(&mut cascades, &vec![0.1; 63], 0, &mut |_, _| events += 1);
        assert_eq!(events, 0);
        feed(&mut cascades, &[0.1], 0, &mut |_, _| events += 1);
        assert_eq!(events, 1);
    }

    #[test]
    fn test_stride_spacing_after_first_fill() {
        let mut cascades = vec![make_cascade(64, 16)];
        let mut events = 0;
        // 64 to fill, then one event per 16 samples
        feed(&mut cascades, &vec![0.0; 64 + 16 * 3], 0, &mut |_, _| events += 1);
        assert_eq!(events, 4);
    }

    #[test]
    fn test_downsample_carries_odd_sample() {
        let mut c = make_cascade(64, 32);
        let mut out = Vec::new();
        c.downsample_into(&[0.0, 1.0, 0.5], &mut out);
        assert_eq!(out, vec![0.5]);
        c.downsample_into(&[0.5], &mut out);
        // carried 0.5 pairs with incoming 0.5
        assert_eq!(out, vec![0.5]);
    }

    #[test]
    fn test_second_cascade_fills_at_half_rate() {
        let mut cascades = vec![make_cascade(64, 64), make_cascade(64, 64)];
        let mut deep_events = 0;
        // 128 input samples downsample to 64, exactly one deep fill
        feed(&mut cascades, &vec![0.25; 128], 0, &mut |depth, _| {
            if depth == 1 {
                deep_events += 1;
            }
        });
        assert_eq!(deep_events, 1);
    }

    #[test]
    fn test_constant_signal_dc_readout() {
        let mut cascades = vec![make_cascade(64, 64)];
        let mut zeroth = 0.0;
        feed(&mut cascades, &vec![0.5; 64], 0, &mut |_, values| {
            zeroth = values[0];
        });
        // correct_zero boosts the zeroth bin by sqrt(2); the signed dc
        // readout stays at the plain level
        assert!((zeroth - 0.5 * std::f32::consts::SQRT_2).abs() < 1e-4, "got {zeroth}");
        assert!((cascades[0].dc() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let fft_size = 1024;
        let mut cascades = vec![make_cascade(fft_size, fft_size)];
        // Bin 128 of a 1024-point transform at 48 kHz is 6 kHz
        let freq = 48_000.0 * 128.0 / fft_size as f32;
        let wave: Vec<f32> = (0..fft_size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 48_000.0).sin())
            .collect();
        let mut peak_bin = 0;
        feed(&mut cascades, &wave, 0, &mut |_, values| {
            peak_bin = values
                .iter()
                .enumerate()
                .skip(1)
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
        });
        assert_eq!(peak_bin, 128);
    }
}

//! Second-order IIR sections from the Audio EQ Cookbook

use super::filter::Filter;

/// Digital frequencies outside this range make the cookbook formulas
/// degenerate, so cutoffs are clamped before coefficient synthesis.
const MIN_DIGITAL_FREQ: f64 = 0.01;
const MAX_DIGITAL_FREQ: f64 = 0.99;

/// Biquad filter, direct form II transposed
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    a1: f64,
    a2: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    state: [f64; 2],
    gain_amp: f64,
}

impl BiquadFilter {
    /// Coefficients are normalized by `a[0]`
    fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            a1: a[1] / a0,
            a2: a[2] / a0,
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            state: [0.0; 2],
            gain_amp: 1.0,
        }
    }

    pub fn high_pass(sample_rate: u32, q: f64, center_freq: f64) -> Self {
        let w0 = digital_freq(sample_rate, center_freq) * std::f64::consts::PI;
        let cs = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::new(
            [1.0 + alpha, -2.0 * cs, 1.0 - alpha],
            [(1.0 + cs) * 0.5, -(1.0 + cs), (1.0 + cs) * 0.5],
        )
    }

    pub fn low_pass(sample_rate: u32, q: f64, center_freq: f64) -> Self {
        let w0 = digital_freq(sample_rate, center_freq) * std::f64::consts::PI;
        let cs = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::new(
            [1.0 + alpha, -2.0 * cs, 1.0 - alpha],
            [(1.0 - cs) * 0.5, 1.0 - cs, (1.0 - cs) * 0.5],
        )
    }

    pub fn high_shelf(sample_rate: u32, q: f64, center_freq: f64, gain_db: f64) -> Self {
        let amp = 10.0_f64.powf(gain_db / 40.0);
        let w0 = digital_freq(sample_rate, center_freq) * std::f64::consts::PI;
        let cs = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let two_root_a_alpha = 2.0 * amp.sqrt() * alpha;

        Self::new(
            [
                (amp + 1.0) - (amp - 1.0) * cs + two_root_a_alpha,
                2.0 * ((amp - 1.0) - (amp + 1.0) * cs),
                (amp + 1.0) - (amp - 1.0) * cs - two_root_a_alpha,
            ],
            [
                amp * ((amp + 1.0) + (amp - 1.0) * cs + two_root_a_alpha),
                -2.0 * amp * ((amp - 1.0) + (amp + 1.0) * cs),
                amp * ((amp + 1.0) + (amp - 1.0) * cs - two_root_a_alpha),
            ],
        )
    }

    pub fn low_shelf(sample_rate: u32, q: f64, center_freq: f64, gain_db: f64) -> Self {
        let amp = 10.0_f64.powf(gain_db / 40.0);
        let w0 = digital_freq(sample_rate, center_freq) * std::f64::consts::PI;
        let cs = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let two_root_a_alpha = 2.0 * amp.sqrt() * alpha;

        Self::new(
            [
                (amp + 1.0) + (amp - 1.0) * cs + two_root_a_alpha,
                -2.0 * ((amp - 1.0) + (amp + 1.0) * cs),
                (amp + 1.0) + (amp - 1.0) * cs - two_root_a_alpha,
            ],
            [
                amp * ((amp + 1.0) - (amp - 1.0) * cs + two_root_a_alpha),
                2.0 * amp * ((amp - 1.0) - (amp + 1.0) * cs),
                amp * ((amp + 1.0) - (amp - 1.0) * cs - two_root_a_alpha),
            ],
        )
    }

    pub fn peak(sample_rate: u32, q: f64, center_freq: f64, gain_db: f64) -> Self {
        let amp = 10.0_f64.powf(gain_db / 40.0);
        let w0 = digital_freq(sample_rate, center_freq) * std::f64::consts::PI;
        let cs = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::new(
            [1.0 + alpha / amp, -2.0 * cs, 1.0 - alpha / amp],
            [1.0 + alpha * amp, -2.0 * cs, 1.0 - alpha * amp],
        )
    }
}

/// Cutoff as a fraction of the Nyquist frequency, clamped away from the
/// degenerate edges.
fn digital_freq(sample_rate: u32, freq: f64) -> f64 {
    let digital = 2.0 * freq / f64::from(sample_rate);
    digital.clamp(MIN_DIGITAL_FREQ, MAX_DIGITAL_FREQ)
}

impl Filter for BiquadFilter {
    fn process_sample(&mut self, value: f64) -> f64 {
        let filtered = self.b0 * value + self.state[0];
        self.state[0] = self.b1 * value - self.a1 * filtered + self.state[1];
        self.state[1] = self.b2 * value - self.a2 * filtered;
        filtered * self.gain_amp
    }

    fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    fn add_gain_db_energy(&mut self, db: f64) {
        self.gain_amp *= 10.0_f64.powf(db / 40.0);
    }
}

//! Stateful IIR filter application

/// A stateful filter section applied in sequence inside a cascade
pub trait Filter {
    /// Process one sample
    fn process_sample(&mut self, value: f64) -> f64;

    /// Process a wave buffer in-place
    fn apply(&mut self, wave: &mut [f32]) {
        for sample in wave.iter_mut() {
            *sample = self.process_sample(f64::from(*sample)) as f32;
        }
    }

    /// Clear filter history
    fn reset(&mut self);

    /// Adjust output gain; dB value is interpreted on the energy scale,
    /// so the amplitude factor is `10^(db/40)`.
    fn add_gain_db_energy(&mut self, db: f64);
}

/// General variable-order IIR filter, direct form II transposed.
///
/// Both coefficient vectors are normalized by `a[0]` on construction, so
/// the stored `a[0]` is always exactly 1.
#[derive(Debug, Clone)]
pub struct IirFilter {
    a: Vec<f64>,
    b: Vec<f64>,
    state: Vec<f64>,
    gain_amp: f64,
}

impl IirFilter {
    pub fn new(mut a: Vec<f64>, mut b: Vec<f64>) -> Self {
        assert!(!a.is_empty(), "denominator must not be empty");

        let a0 = a[0];
        for value in a.iter_mut() {
            *value /= a0;
        }
        for value in b.iter_mut() {
            *value /= a0;
        }

        let max_size = a.len().max(b.len());
        a.resize(max_size, 0.0);
        b.resize(max_size, 0.0);

        Self {
            state: vec![0.0; max_size - 1],
            a,
            b,
            gain_amp: 1.0,
        }
    }

    pub fn coefficients(&self) -> (&[f64], &[f64]) {
        (&self.a, &self.b)
    }
}

impl Filter for IirFilter {
    fn process_sample(&mut self, value: f64) -> f64 {
        if self.state.is_empty() {
            return self.b[0] * value * self.gain_amp;
        }

        let filtered = self.b[0] * value + self.state[0];

        let last = self.state.len() - 1;
        for i in 0..last {
            self.state[i] = self.b[i + 1] * value - self.a[i + 1] * filtered + self.state[i + 1];
        }
        self.state[last] = self.b[last + 1] * value - self.a[last + 1] * filtered;

        filtered * self.gain_amp
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(|s| *s = 0.0);
    }

    fn add_gain_db_energy(&mut self, db: f64) {
        self.gain_amp *= 10.0_f64.powf(db / 40.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalization() {
        let filter = IirFilter::new(vec![2.0, 1.0], vec![4.0, 2.0]);
        let (a, b) = filter.coefficients();
        assert_abs_diff_eq!(a[0], 1.0);
        assert_abs_diff_eq!(a[1], 0.5);
        assert_abs_diff_eq!(b[0], 2.0);
    }

    #[test]
    fn test_passthrough() {
        // b = [1], a = [1] is an identity filter
        let mut filter = IirFilter::new(vec![1.0], vec![1.0]);
        assert_abs_diff_eq!(filter.process_sample(0.5), 0.5);
    }

    #[test]
    fn test_one_pole_lowpass_step_response() {
        // y[n] = 0.5 x[n] + 0.5 y[n-1] converges to the step level
        let mut filter = IirFilter::new(vec![1.0, -0.5], vec![0.5]);
        let mut y = 0.0;
        for _ in 0..100 {
            y = filter.process_sample(1.0);
        }
        assert_abs_diff_eq!(y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gain_energy() {
        let mut filter = IirFilter::new(vec![1.0], vec![1.0]);
        filter.add_gain_db_energy(-40.0);
        // -40 dB energy = -20 dB amplitude = 0.1x
        assert_abs_diff_eq!(filter.process_sample(1.0), 0.1, epsilon = 1e-12);
    }
}

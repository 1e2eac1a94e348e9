//! Integer-factor decimation toward a target analysis rate

/// Box-car decimator: averages groups of `factor` samples, carrying a
/// partial group across calls so tick boundaries do not drop samples.
#[derive(Debug, Clone)]
pub struct Decimator {
    factor: usize,
    carry: Vec<f32>,
}

impl Decimator {
    /// Factor chosen so the decimated rate does not exceed `target_rate`.
    /// A zero target disables decimation.
    pub fn for_rates(source_rate: u32, target_rate: u32) -> Self {
        let factor = if target_rate == 0 || target_rate >= source_rate {
            1
        } else {
            (source_rate as usize).div_ceil(target_rate as usize)
        };
        Self {
            factor,
            carry: Vec::new(),
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Rate of the decimated signal
    pub fn decimated_rate(&self, source_rate: u32) -> u32 {
        source_rate / self.factor as u32
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Decimate one tick's wave into `out` (cleared first).
    pub fn process(&mut self, wave: &[f32], out: &mut Vec<f32>) {
        out.clear();
        if self.factor <= 1 {
            out.extend_from_slice(wave);
            return;
        }

        self.carry.extend_from_slice(wave);

        let groups = self.carry.len() / self.factor;
        let inv = 1.0 / self.factor as f32;
        for group in 0..groups {
            let start = group * self.factor;
            let sum: f32 = self.carry[start..start + self.factor].iter().sum();
            out.push(sum * inv);
        }

        self.carry.drain(..groups * self.factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_selection() {
        assert_eq!(Decimator::for_rates(48000, 0).factor(), 1);
        assert_eq!(Decimator::for_rates(48000, 48000).factor(), 1);
        assert_eq!(Decimator::for_rates(48000, 24000).factor(), 2);
        assert_eq!(Decimator::for_rates(48000, 20000).factor(), 3);
    }

    #[test]
    fn test_group_average() {
        let mut d = Decimator::for_rates(4, 2);
        let mut out = Vec::new();
        d.process(&[1.0, 3.0, 5.0, 7.0], &mut out);
        assert_eq!(out, vec![2.0, 6.0]);
    }

    #[test]
    fn test_carry_across_calls() {
        let mut d = Decimator::for_rates(4, 2);
        let mut out = Vec::new();
        d.process(&[1.0, 3.0, 5.0], &mut out);
        assert_eq!(out, vec![2.0]);
        d.process(&[7.0], &mut out);
        assert_eq!(out, vec![6.0]);
    }
}

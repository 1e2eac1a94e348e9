//! Analysis window functions

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowKind {
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size == 0 {
            return Vec::new();
        }
        if size == 1 {
            return vec![1.0];
        }
        let n = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let x = i as f32 / n;
                match self {
                    WindowKind::Rectangular => 1.0,
                    WindowKind::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                    WindowKind::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(WindowKind::Hann)]
    #[test_case(WindowKind::Hamming)]
    #[test_case(WindowKind::Blackman)]
    fn test_symmetry(kind: WindowKind) {
        let w = kind.coefficients(512);
        for i in 0..256 {
            assert_abs_diff_eq!(w[i], w[511 - i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_hann_endpoints_and_peak() {
        let w = WindowKind::Hann.coefficients(1025);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1024], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[512], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rectangular_is_unity() {
        assert!(WindowKind::Rectangular
            .coefficients(64)
            .iter()
            .all(|&c| c == 1.0));
    }
}

//! Scalar value-transform pipeline
//!
//! Transforms map raw handler magnitudes into presentation units. A
//! pipeline is described as e.g. `db map[from -70 : 0] clamp` and
//! applied left to right to every value.

use super::desc::{parse_description, DescElement};
use crate::error::{Result, WavescopeError};

#[derive(Debug, Clone, PartialEq)]
enum Transform {
    /// `10 * log10(v)`; non-positive input maps to negative infinity
    Db,
    /// Linear remap of `from` onto `to`
    Map { linear: LinearInterpolator },
    /// Clamp into `to`
    Clamp { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq)]
struct LinearInterpolator {
    alpha: f64,
    beta: f64,
}

impl LinearInterpolator {
    fn new(from: (f64, f64), to: (f64, f64)) -> Result<Self> {
        if from.0 == from.1 {
            return Err(WavescopeError::InvalidTransform {
                reason: format!("map: 'from' bounds must differ, got {} : {}", from.0, from.1),
            });
        }
        let alpha = (to.1 - to.0) / (from.1 - from.0);
        Ok(Self {
            alpha,
            beta: to.0 - alpha * from.0,
        })
    }

    fn to_value(&self, source: f64) -> f64 {
        self.alpha * source + self.beta
    }
}

/// Parsed transform pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueTransformer {
    transforms: Vec<Transform>,
}

impl ValueTransformer {
    pub fn parse(desc: &str) -> Result<Self> {
        let elements = parse_description(desc).map_err(reason_to_transform_error)?;
        let mut transforms = Vec::with_capacity(elements.len());
        for element in &elements {
            transforms.push(parse_element(element)?);
        }
        Ok(Self { transforms })
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn apply(&self, mut value: f64) -> f64 {
        for transform in &self.transforms {
            value = match transform {
                Transform::Db => {
                    if value <= 0.0 {
                        f64::NEG_INFINITY
                    } else {
                        10.0 * value.log10()
                    }
                }
                Transform::Map { linear } => linear.to_value(value),
                Transform::Clamp { min, max } => value.clamp(*min, *max),
            };
        }
        value
    }

    pub fn apply_wave(&self, wave: &mut [f32]) {
        for sample in wave.iter_mut() {
            *sample = self.apply(f64::from(*sample)) as f32;
        }
    }
}

fn reason_to_transform_error(err: WavescopeError) -> WavescopeError {
    match err {
        WavescopeError::InvalidParams { reason } => WavescopeError::InvalidTransform { reason },
        other => other,
    }
}

fn parse_element(element: &DescElement) -> Result<Transform> {
    let range = |key: &str| element.arg_range(key).map_err(reason_to_transform_error);

    match element.name.as_str() {
        "db" => Ok(Transform::Db),
        "map" => {
            let from = range("from")?.ok_or_else(|| WavescopeError::InvalidTransform {
                reason: "map: missing required parameter 'from'".to_string(),
            })?;
            let to = range("to")?.unwrap_or((0.0, 1.0));
            Ok(Transform::Map {
                linear: LinearInterpolator::new(from, to)?,
            })
        }
        "clamp" => {
            let (min, max) = range("to")?.unwrap_or((0.0, 1.0));
            if min > max {
                return Err(WavescopeError::InvalidTransform {
                    reason: format!("clamp: bounds must be ordered, got {min} : {max}"),
                });
            }
            Ok(Transform::Clamp { min, max })
        }
        unknown => Err(WavescopeError::InvalidTransform {
            reason: format!("unknown transform: '{unknown}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_db_of_non_positive() {
        let t = ValueTransformer::parse("db").unwrap();
        assert_eq!(t.apply(0.0), f64::NEG_INFINITY);
        assert_eq!(t.apply(-1.0), f64::NEG_INFINITY);
        assert_abs_diff_eq!(t.apply(1.0), 0.0);
        assert_abs_diff_eq!(t.apply(0.1), -10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_map_default_target() {
        let t = ValueTransformer::parse("map[from -70 : 0]").unwrap();
        assert_abs_diff_eq!(t.apply(-70.0), 0.0);
        assert_abs_diff_eq!(t.apply(0.0), 1.0);
        assert_abs_diff_eq!(t.apply(-35.0), 0.5);
        // out-of-range input extrapolates; clamping is a separate stage
        assert_abs_diff_eq!(t.apply(70.0), 2.0);
    }

    #[test]
    fn test_clamp_default() {
        let t = ValueTransformer::parse("clamp").unwrap();
        assert_abs_diff_eq!(t.apply(1.5), 1.0);
        assert_abs_diff_eq!(t.apply(-0.5), 0.0);
        assert_abs_diff_eq!(t.apply(0.25), 0.25);
    }

    #[test]
    fn test_pipeline_order() {
        let t = ValueTransformer::parse("db map[from -70 : 0] clamp").unwrap();
        assert_abs_diff_eq!(t.apply(1.0), 1.0);
        // -inf dB clamps to 0
        assert_abs_diff_eq!(t.apply(0.0), 0.0);
        assert_abs_diff_eq!(t.apply(10.0_f64.powf(-3.5)), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_map() {
        assert!(ValueTransformer::parse("map[from 5 : 5]").is_err());
    }

    #[test]
    fn test_unknown_transform() {
        assert!(ValueTransformer::parse("pow[exp 2]").is_err());
    }
}

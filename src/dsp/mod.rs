//! Signal processing library
//!
//! Stateless coefficient synthesis for second-order IIR sections and
//! higher-order Butterworth cascades, stateful per-sample application,
//! window functions, and the scalar value-transform pipeline.

mod biquad;
mod butterworth;
mod cascade;
mod desc;
mod filter;
mod transform;
mod window;

pub use biquad::BiquadFilter;
pub use butterworth::{butterworth_band_pass, butterworth_band_stop, butterworth_high_pass,
                      butterworth_low_pass, FilterParams, MAX_BUTTERWORTH_ORDER};
pub use cascade::{FilterCascade, FilterCascadeSpec};
pub use filter::{Filter, IirFilter};
pub use transform::ValueTransformer;
pub use window::WindowKind;

//! Spectral analysis core
//!
//! [`FftPyramid`] runs a chain of FFT cascades over one wave. Cascade 0
//! sees the wave at the input rate; each deeper cascade sees a 2:1
//! downsampled copy, halving its bin width at the cost of latency.

mod cascade;
mod plan;
mod pyramid;

pub use cascade::FftCascade;
pub use plan::{next_fast_size, plan_for_size};
pub use pyramid::{FftPyramid, FftPyramidParams, SizeBy};

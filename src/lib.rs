//! Wavescope - Real-Time Audio Analysis Pipeline
//!
//! Wavescope turns a raw capture stream into consumer-ready analysis
//! values: multi-resolution FFT spectra, arbitrary frequency bands,
//! loudness tracks and scrolling spectrograms.
//!
//! # Architecture
//!
//! The pipeline has three layers:
//! - Wave conditioning: channel split, mono mix, filtering, decimation
//! - Handler graph: per-channel chains of analysis handlers, each
//!   reading the wave or one earlier handler's output
//! - Snapshot: double-buffered results exchanged with consumers
//!
//! One call to [`graph::Orchestrator::process`] is one tick. Ticks run
//! under a wall-clock budget; a tick that overruns is abandoned and the
//! previous snapshot stays authoritative.

pub mod dsp;
pub mod engine;
pub mod error;
pub mod fft;
pub mod graph;
pub mod handlers;

pub use error::{Result, WavescopeError};
pub use graph::Orchestrator;

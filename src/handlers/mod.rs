//! Handler implementations
//!
//! The set of handler kinds is closed: configuration names one of the
//! variants below and the graph dispatches through [`AnyHandler`].

mod band_mapper;
mod fft_analyzer;
mod loudness;
mod spectrogram;
mod value_transformer;

pub use band_mapper::{BandMapper, BandMapperParams, MixFunction, SmoothingCurve};
pub use fft_analyzer::{FftAnalyzer, FftAnalyzerParams};
pub use loudness::{Loudness, LoudnessParams};
pub use spectrogram::{Spectrogram, SpectrogramParams};
pub use value_transformer::{ValueTransformerHandler, ValueTransformerParams};

use crate::error::Result;
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext,
                   SnapshotExtra};
use serde::{Deserialize, Serialize};

/// Geometry of an FFT source, exposed to handlers that consume spectra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftMeta {
    pub fft_size: usize,
    pub stride: usize,
    pub cascades_count: usize,
    /// Bins per cascade, DC included
    pub values_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HandlerParams {
    Fft(FftAnalyzerParams),
    Bands(BandMapperParams),
    Loudness(LoudnessParams),
    Transform(ValueTransformerParams),
    Spectrogram(SpectrogramParams),
}

impl HandlerParams {
    pub fn source_name(&self) -> Option<&str> {
        match self {
            HandlerParams::Fft(_) | HandlerParams::Loudness(_) => None,
            HandlerParams::Bands(p) => Some(&p.source),
            HandlerParams::Transform(p) => Some(&p.source),
            HandlerParams::Spectrogram(p) => Some(&p.source),
        }
    }
}

pub enum AnyHandler {
    Fft(FftAnalyzer),
    Bands(BandMapper),
    Loudness(Loudness),
    Transform(ValueTransformerHandler),
    Spectrogram(Spectrogram),
}

impl AnyHandler {
    pub(crate) fn from_params(params: &HandlerParams) -> Self {
        match params {
            HandlerParams::Fft(p) => AnyHandler::Fft(FftAnalyzer::new(p.clone())),
            HandlerParams::Bands(p) => AnyHandler::Bands(BandMapper::new(p.clone())),
            HandlerParams::Loudness(p) => AnyHandler::Loudness(Loudness::new(p.clone())),
            HandlerParams::Transform(p) => {
                AnyHandler::Transform(ValueTransformerHandler::new(p.clone()))
            }
            HandlerParams::Spectrogram(p) => AnyHandler::Spectrogram(Spectrogram::new(p.clone())),
        }
    }

    pub fn fft_meta(&self) -> Option<FftMeta> {
        match self {
            AnyHandler::Fft(f) => f.meta(),
            _ => None,
        }
    }

    fn dispatch(&self) -> &dyn HandlerImpl {
        match self {
            AnyHandler::Fft(h) => h,
            AnyHandler::Bands(h) => h,
            AnyHandler::Loudness(h) => h,
            AnyHandler::Transform(h) => h,
            AnyHandler::Spectrogram(h) => h,
        }
    }

    fn dispatch_mut(&mut self) -> &mut dyn HandlerImpl {
        match self {
            AnyHandler::Fft(h) => h,
            AnyHandler::Bands(h) => h,
            AnyHandler::Loudness(h) => h,
            AnyHandler::Transform(h) => h,
            AnyHandler::Spectrogram(h) => h,
        }
    }
}

impl HandlerImpl for AnyHandler {
    fn configure(&mut self, sample_rate: u32, source: Option<&Handler>) -> Result<DataSize> {
        self.dispatch_mut().configure(sample_rate, source)
    }

    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        self.dispatch_mut().process(ctx, source, out)
    }

    fn finish(&mut self) {
        self.dispatch_mut().finish();
    }

    fn reset(&mut self) {
        self.dispatch_mut().reset();
    }

    fn prop(&self, name: &str) -> Option<String> {
        self.dispatch().prop(name)
    }

    fn snapshot_extra(&self, extra: &mut SnapshotExtra) {
        self.dispatch().snapshot_extra(extra);
    }
}

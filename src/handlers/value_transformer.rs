//! Per-value transform handler
//!
//! Mirrors its source's shape and applies a transform pipeline to
//! every value of every chunk.

use crate::dsp::ValueTransformer;
use crate::error::{Result, WavescopeError};
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueTransformerParams {
    pub source: String,
    pub transform: String,
}

pub struct ValueTransformerHandler {
    params: ValueTransformerParams,
    transform: ValueTransformer,
}

impl ValueTransformerHandler {
    pub fn new(params: ValueTransformerParams) -> Self {
        Self {
            params,
            transform: ValueTransformer::default(),
        }
    }
}

impl HandlerImpl for ValueTransformerHandler {
    fn configure(&mut self, _sample_rate: u32, source: Option<&Handler>) -> Result<DataSize> {
        let source = source.ok_or_else(|| WavescopeError::SourceNotFound {
            name: self.params.source.clone(),
        })?;
        self.transform = ValueTransformer::parse(&self.params.transform)?;
        if self.transform.is_empty() {
            return Err(WavescopeError::InvalidTransform {
                reason: "transform description is empty".to_string(),
            });
        }
        Ok(source.data_size().clone())
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext<'_>,
        source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        let Some(source) = source else {
            return Ok(());
        };

        for layer in 0..source.data_size().layers() {
            for source_chunk in source.output().chunks(layer) {
                let chunk = out.push_chunk(layer)?;
                chunk.copy_from_slice(source_chunk);
                self.transform.apply_wave(chunk);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loudness_source(wave: &[f32]) -> Handler {
        let config = serde_json::from_value(serde_json::json!({
            "name": "loud", "type": "loudness",
            "updatesPerSecond": 100.0, "transform": ""
        }))
        .unwrap();
        let mut source = Handler::new(config);
        source.configure(48_000, None).unwrap();
        let ctx = ProcessContext {
            wave,
            sample_rate: 48_000,
        };
        source.process(&ctx, None).unwrap();
        source
    }

    fn handler(transform: &str) -> ValueTransformerHandler {
        ValueTransformerHandler::new(ValueTransformerParams {
            source: "loud".to_string(),
            transform: transform.to_string(),
        })
    }

    #[test]
    fn test_configure_without_source_fails() {
        assert!(handler("map[from 0 : 1, to 0 : 10]")
            .configure(48_000, None)
            .is_err());
    }

    #[test]
    fn test_empty_transform_rejected() {
        let source = loudness_source(&[0.0; 480]);
        assert!(handler("").configure(48_000, Some(&source)).is_err());
    }

    #[test]
    fn test_rescales_source_chunks() {
        // one 480-sample update of a constant 0.5 has mean square 0.25
        let source = loudness_source(&vec![0.5; 480]);
        let mut transformer = handler("map[from 0 : 1, to 0 : 10]");
        let size = transformer.configure(48_000, Some(&source)).unwrap();
        assert_eq!(&size, source.data_size());

        let mut out = OutputBuffer::default();
        out.set_data_size(size);
        out.begin_tick();
        let ctx = ProcessContext {
            wave: &[],
            sample_rate: 48_000,
        };
        transformer.process(&ctx, Some(&source), &mut out).unwrap();

        assert_eq!(out.chunk_count(0), source.output().chunk_count(0));
        let raw = source.output().latest(0)[0];
        let scaled = out.latest(0)[0];
        assert!((scaled - raw * 10.0).abs() < 1e-5, "got {scaled} from {raw}");
    }
}

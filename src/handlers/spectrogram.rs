//! Scrolling spectrogram image builder
//!
//! Consumes layer 0 of its source and renders one pixel strip per
//! source chunk into a fixed-length scrolling image. The image is
//! published through the snapshot as pixel data; persisting it is the
//! consumer's concern.

use crate::error::{Result, WavescopeError};
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext,
                   SnapshotExtra, StripImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrogramParams {
    pub source: String,
    /// Number of time strips kept in the image
    #[serde(default = "default_length")]
    pub length: usize,
    /// RGB endpoints of the value gradient
    #[serde(default = "default_base_color")]
    pub base_color: [u8; 3],
    #[serde(default = "default_max_color")]
    pub max_color: [u8; 3],
}

fn default_length() -> usize {
    100
}
fn default_base_color() -> [u8; 3] {
    [0, 0, 0]
}
fn default_max_color() -> [u8; 3] {
    [255, 255, 255]
}

pub struct Spectrogram {
    params: SpectrogramParams,
    image: StripImage,
}

impl Spectrogram {
    pub fn new(params: SpectrogramParams) -> Self {
        Self {
            params,
            image: StripImage::default(),
        }
    }

    fn pixel(&self, value: f32) -> u32 {
        let t = value.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t) as u32;
        let r = lerp(self.params.base_color[0], self.params.max_color[0]);
        let g = lerp(self.params.base_color[1], self.params.max_color[1]);
        let b = lerp(self.params.base_color[2], self.params.max_color[2]);
        0xFF00_0000 | (r << 16) | (g << 8) | b
    }

    fn push_strip(&mut self, values: &[f32]) {
        let width = self.image.width;
        self.image.pixels.copy_within(width.., 0);
        let last_row = self.image.pixels.len() - width;
        for (i, &value) in values.iter().take(width).enumerate() {
            self.image.pixels[last_row + i] = self.pixel(value);
        }
    }
}

impl HandlerImpl for Spectrogram {
    fn configure(&mut self, _sample_rate: u32, source: Option<&Handler>) -> Result<DataSize> {
        let source = source.ok_or_else(|| WavescopeError::SourceNotFound {
            name: self.params.source.clone(),
        })?;
        if self.params.length == 0 {
            return Err(WavescopeError::InvalidParams {
                reason: "spectrogram length must be >= 1".to_string(),
            });
        }
        let width = source.data_size().values_count;
        if width == 0 {
            return Err(WavescopeError::InvalidParams {
                reason: format!("source '{}' produces no values", self.params.source),
            });
        }

        self.image = StripImage {
            width,
            height: self.params.length,
            pixels: vec![0xFF00_0000; width * self.params.length],
        };

        // emits only image data, no numeric chunks
        Ok(DataSize::new(0, Vec::new()))
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext<'_>,
        source: Option<&Handler>,
        _out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        let Some(source) = source else {
            return Ok(());
        };
        for chunk in source.output().chunks(0) {
            self.push_strip(chunk);
        }
        Ok(())
    }

    fn snapshot_extra(&self, extra: &mut SnapshotExtra) {
        *extra = SnapshotExtra::Image(self.image.clone());
    }

    fn prop(&self, name: &str) -> Option<String> {
        match name {
            "width" => Some(self.image.width.to_string()),
            "length" => Some(self.image.height.to_string()),
            _ => None,
        }
    }
}

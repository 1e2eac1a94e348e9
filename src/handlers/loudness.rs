//! Block RMS loudness handler

use crate::dsp::ValueTransformer;
use crate::error::Result;
use crate::graph::{ChunkOverflow, DataSize, Handler, HandlerImpl, OutputBuffer, ProcessContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoudnessParams {
    #[serde(default = "default_updates_per_second")]
    pub updates_per_second: f64,
    /// Defaults to `db map[from -70 : 0] clamp`
    #[serde(default)]
    pub transform: Option<String>,
}

fn default_updates_per_second() -> f64 {
    60.0
}

const DEFAULT_TRANSFORM: &str = "db map[from -70 : 0] clamp";

pub struct Loudness {
    params: LoudnessParams,
    transform: ValueTransformer,
    block_size: usize,
    sum_of_squares: f64,
    counter: usize,
}

impl Loudness {
    pub fn new(params: LoudnessParams) -> Self {
        Self {
            params,
            transform: ValueTransformer::default(),
            block_size: 0,
            sum_of_squares: 0.0,
            counter: 0,
        }
    }
}

impl HandlerImpl for Loudness {
    fn configure(&mut self, sample_rate: u32, _source: Option<&Handler>) -> Result<DataSize> {
        let desc = self.params.transform.as_deref().unwrap_or(DEFAULT_TRANSFORM);
        self.transform = ValueTransformer::parse(desc)?;

        let updates = self.params.updates_per_second.clamp(1.0, f64::from(sample_rate));
        self.block_size = ((f64::from(sample_rate) / updates) as usize).max(1);
        self.sum_of_squares = 0.0;
        self.counter = 0;

        Ok(DataSize::new(1, vec![self.block_size]))
    }

    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        _source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow> {
        for &sample in ctx.wave {
            self.sum_of_squares += f64::from(sample) * f64::from(sample);
            self.counter += 1;

            if self.counter == self.block_size {
                // mean square is a power quantity, so the db transform
                // yields proper power decibels
                let mean_square = self.sum_of_squares / self.block_size as f64;
                out.push_chunk(0)?[0] = self.transform.apply(mean_square) as f32;
                self.sum_of_squares = 0.0;
                self.counter = 0;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.sum_of_squares = 0.0;
        self.counter = 0;
    }

    fn prop(&self, name: &str) -> Option<String> {
        match name {
            "block size" => Some(self.block_size.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn run(wave: &[f32], transform: Option<&str>) -> Vec<f32> {
        let mut loudness = Loudness::new(LoudnessParams {
            updates_per_second: 100.0,
            transform: transform.map(str::to_string),
        });
        // 48000 / 100 = 480 samples per block
        let ds = loudness.configure(48_000, None).unwrap();
        let mut out = OutputBuffer::default();
        out.set_data_size(ds);
        out.begin_tick();

        let ctx = ProcessContext {
            wave,
            sample_rate: 48_000,
        };
        loudness.process(&ctx, None, &mut out).unwrap();
        out.chunks(0).map(|c| c[0]).collect()
    }

    #[test]
    fn test_one_value_per_block() {
        let values = run(&vec![0.0; 480 * 3 + 100], None);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_full_scale_square_is_one() {
        // mean square of a full-scale square wave is 1 -> 0 dB -> 1.0
        let values = run(&vec![1.0; 480], None);
        assert_abs_diff_eq!(values[0], 1.0);
    }

    #[test]
    fn test_silence_clamps_to_zero() {
        let values = run(&vec![0.0; 480], None);
        assert_abs_diff_eq!(values[0], 0.0);
    }

    #[test]
    fn test_raw_transform() {
        let values = run(&vec![0.5; 480], Some(""));
        assert_abs_diff_eq!(values[0], 0.25, epsilon = 1e-6);
    }
}

//! Per-handler output buffering
//!
//! Each handler appends chunks into one flat buffer per tick; per-layer
//! chunk views are recovered from recorded offsets. The previous tick's
//! final chunk is kept per layer so consumers always see a value even
//! on ticks where a handler emits nothing.

/// Output shape a handler commits to at configure time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataSize {
    pub values_count: usize,
    /// One entry per layer: how many input frames one output chunk
    /// accounts for
    pub eq_wave_sizes: Vec<usize>,
}

impl DataSize {
    pub fn new(values_count: usize, eq_wave_sizes: Vec<usize>) -> Self {
        Self {
            values_count,
            eq_wave_sizes,
        }
    }

    pub fn layers(&self) -> usize {
        self.eq_wave_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values_count == 0 || self.eq_wave_sizes.is_empty()
    }
}

/// Returned when a handler floods its buffer within one tick
#[derive(Debug)]
pub struct ChunkOverflow;

/// A runaway handler configuration can try to buffer gigabytes in one
/// tick; pushes beyond this many scalars are refused.
const MAX_BUFFER_VALUES: usize = 1_000_000;

#[derive(Debug, Default)]
pub struct OutputBuffer {
    data_size: DataSize,
    buffer: Vec<f32>,
    chunk_offsets: Vec<Vec<usize>>,
    last_results: Vec<Vec<f32>>,
}

impl OutputBuffer {
    pub fn set_data_size(&mut self, data_size: DataSize) {
        self.buffer.clear();
        self.chunk_offsets = vec![Vec::new(); data_size.layers()];
        self.last_results = vec![vec![0.0; data_size.values_count]; data_size.layers()];
        self.data_size = data_size;
    }

    pub fn data_size(&self) -> &DataSize {
        &self.data_size
    }

    /// Saves the newest chunk of each layer, then clears the tick state
    pub fn begin_tick(&mut self) {
        let count = self.data_size.values_count;
        for (layer, offsets) in self.chunk_offsets.iter_mut().enumerate() {
            if let Some(&offset) = offsets.last() {
                self.last_results[layer].copy_from_slice(&self.buffer[offset..offset + count]);
            }
            offsets.clear();
        }
        self.buffer.clear();
    }

    pub fn push_chunk(&mut self, layer: usize) -> Result<&mut [f32], ChunkOverflow> {
        let count = self.data_size.values_count;
        if self.buffer.len() + count > MAX_BUFFER_VALUES {
            return Err(ChunkOverflow);
        }
        let offset = self.buffer.len();
        self.buffer.resize(offset + count, 0.0);
        self.chunk_offsets[layer].push(offset);
        Ok(&mut self.buffer[offset..])
    }

    pub fn chunk_count(&self, layer: usize) -> usize {
        self.chunk_offsets.get(layer).map_or(0, Vec::len)
    }

    pub fn chunks(&self, layer: usize) -> impl Iterator<Item = &[f32]> {
        let count = self.data_size.values_count;
        self.chunk_offsets
            .get(layer)
            .into_iter()
            .flatten()
            .map(move |&offset| &self.buffer[offset..offset + count])
    }

    /// Newest chunk of this tick, or the carried value from the last
    /// tick that produced one
    pub fn latest(&self, layer: usize) -> &[f32] {
        let count = self.data_size.values_count;
        match self.chunk_offsets.get(layer).and_then(|o| o.last()) {
            Some(&offset) => &self.buffer[offset..offset + count],
            None => &self.last_results[layer],
        }
    }

    pub fn has_chunks(&self) -> bool {
        self.chunk_offsets.iter().any(|o| !o.is_empty())
    }
}

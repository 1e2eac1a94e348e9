//! Interleaved frame splitting and the Auto mono mix

use super::{Channel, ChannelLayout};

/// Splits one tick's interleaved capture buffer into per-channel waves.
///
/// The waves are ephemeral: they live for the duration of one process
/// call and are borrowed read-only by handlers.
#[derive(Debug, Default)]
pub struct ChannelMixer {
    layout: ChannelLayout,
    waves: Vec<Vec<f32>>,
    auto_wave: Vec<f32>,
}

impl ChannelMixer {
    pub fn new(layout: ChannelLayout) -> Self {
        let n = layout.num_channels();
        Self {
            layout,
            waves: vec![Vec::new(); n],
            auto_wave: Vec::new(),
        }
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// Deinterleave one tick's frames and refresh the Auto mix.
    ///
    /// `interleaved.len()` must be a multiple of the layout's channel
    /// count; trailing partial frames are ignored.
    pub fn decompose(&mut self, interleaved: &[f32]) {
        let n = self.layout.num_channels();
        if n == 0 {
            return;
        }
        let frames = interleaved.len() / n;

        for wave in &mut self.waves {
            wave.clear();
            wave.reserve(frames);
        }

        for frame in interleaved.chunks_exact(n) {
            for (ch, &sample) in frame.iter().enumerate() {
                self.waves[ch].push(sample);
            }
        }

        self.mix_auto(frames);
    }

    /// Auto is the average of the front pair, falling back to the first
    /// channel for mono sources.
    fn mix_auto(&mut self, frames: usize) {
        self.auto_wave.clear();
        self.auto_wave.reserve(frames);

        let left = self.layout.index_of(Channel::FrontLeft);
        let right = self.layout.index_of(Channel::FrontRight);

        match (left, right) {
            (Some(l), Some(r)) => {
                for i in 0..frames {
                    self.auto_wave.push((self.waves[l][i] + self.waves[r][i]) * 0.5);
                }
            }
            _ => {
                if let Some(first) = self.waves.first() {
                    self.auto_wave.extend_from_slice(first);
                }
            }
        }
    }

    /// Zero-fill all waves for a tick of idle capture
    pub fn decompose_silence(&mut self, frames: usize) {
        for wave in &mut self.waves {
            wave.clear();
            wave.resize(frames, 0.0);
        }
        self.auto_wave.clear();
        self.auto_wave.resize(frames, 0.0);
    }

    /// Borrow one channel's wave for this tick
    pub fn wave(&self, channel: Channel) -> Option<&[f32]> {
        if channel == Channel::Auto {
            return Some(&self.auto_wave);
        }
        self.layout
            .index_of(channel)
            .map(|i| self.waves[i].as_slice())
    }
}

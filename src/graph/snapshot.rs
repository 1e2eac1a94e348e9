//! Double-buffered result snapshot
//!
//! The audio thread fills one [`DataSnapshot`] per tick; consumers hold
//! their own and swap the two under a mutex that is held only for the
//! duration of the swap.

use crate::engine::Channel;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// One scrolled spectrogram frame, row-major BGRA pixels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SnapshotExtra {
    #[default]
    None,
    Image(StripImage),
}

/// Published state of one handler
#[derive(Debug, Clone, Default)]
pub struct HandlerSnapshot {
    /// Newest values per layer
    pub layers: Vec<Vec<f32>>,
    pub extra: SnapshotExtra,
}

/// processing name -> channel -> handler name -> state
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    map: BTreeMap<String, BTreeMap<Channel, BTreeMap<String, HandlerSnapshot>>>,
}

impl DataSnapshot {
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn entry(
        &mut self,
        processing: &str,
        channel: Channel,
        handler: &str,
    ) -> &mut HandlerSnapshot {
        self.map
            .entry(processing.to_string())
            .or_default()
            .entry(channel)
            .or_default()
            .entry(handler.to_string())
            .or_default()
    }

    pub fn handler(
        &self,
        processing: &str,
        channel: Channel,
        handler: &str,
    ) -> Option<&HandlerSnapshot> {
        self.map.get(processing)?.get(&channel)?.get(handler)
    }

    /// Flat view over every published handler state
    pub fn iter(&self) -> impl Iterator<Item = (&str, Channel, &str, &HandlerSnapshot)> {
        self.map.iter().flat_map(|(processing, channels)| {
            channels.iter().flat_map(move |(&channel, handlers)| {
                handlers.iter().map(move |(handler, snapshot)| {
                    (processing.as_str(), channel, handler.as_str(), snapshot)
                })
            })
        })
    }

    /// Layer-0 value lookup; out-of-range indices read as 0
    pub fn value(&self, processing: &str, channel: Channel, handler: &str, index: usize) -> f32 {
        self.handler(processing, channel, handler)
            .and_then(|snap| snap.layers.first())
            .and_then(|layer| layer.get(index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Swap point between the processing thread and consumers
#[derive(Debug, Default)]
pub struct SnapshotCell {
    inner: Mutex<DataSnapshot>,
}

impl SnapshotCell {
    pub fn exchange(&self, other: &mut DataSnapshot) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::swap(&mut *guard, other);
    }

    pub fn store(&self, snapshot: &mut DataSnapshot) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::swap(&mut *guard, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_lookup() {
        let mut snap = DataSnapshot::default();
        snap.entry("main", Channel::Auto, "spectrum").layers = vec![vec![0.1, 0.2]];
        assert_eq!(snap.value("main", Channel::Auto, "spectrum", 1), 0.2);
        assert_eq!(snap.value("main", Channel::Auto, "spectrum", 9), 0.0);
        assert_eq!(snap.value("main", Channel::Auto, "missing", 0), 0.0);
    }

    #[test]
    fn test_exchange_swaps_contents() {
        let cell = SnapshotCell::default();
        let mut producer = DataSnapshot::default();
        producer.entry("main", Channel::Auto, "h").layers = vec![vec![1.0]];
        cell.exchange(&mut producer);

        let mut consumer = DataSnapshot::default();
        cell.exchange(&mut consumer);
        assert_eq!(consumer.value("main", Channel::Auto, "h", 0), 1.0);
    }
}

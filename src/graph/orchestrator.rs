//! Tick orchestration across processing units

use crate::engine::{Channel, ChannelLayout, ChannelMixer};
use crate::error::Result;
use crate::graph::config::EngineConfig;
use crate::graph::pipeline::Processing;
use crate::graph::snapshot::DataSnapshot;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Owns all processing units and the working snapshot.
///
/// One call to [`Orchestrator::process`] is one tick: every unit runs
/// under a shared wall-clock budget, and the snapshot is updated only
/// if the whole tick finished in time. A killed tick leaves the
/// previous snapshot authoritative.
pub struct Orchestrator {
    processings: Vec<Processing>,
    snapshot: DataSnapshot,
    kill_timeout: Duration,
    sample_rate: u32,
    layout: ChannelLayout,
}

impl Orchestrator {
    pub fn new(config: EngineConfig, sample_rate: u32, layout: ChannelLayout) -> Result<Self> {
        let mut orchestrator = Self {
            processings: Vec::new(),
            snapshot: DataSnapshot::default(),
            kill_timeout: Duration::from_secs_f64(config.kill_timeout_ms.max(0.01) / 1e3),
            sample_rate,
            layout,
        };
        orchestrator.patch(config)?;
        Ok(orchestrator)
    }

    /// Applies a new configuration. Processing units that keep their
    /// name are updated in place, so handlers with unchanged parameters
    /// carry their accumulated state across the patch.
    pub fn patch(&mut self, config: EngineConfig) -> Result<()> {
        self.kill_timeout = Duration::from_secs_f64(config.kill_timeout_ms.max(0.01) / 1e3);
        let mut old = std::mem::take(&mut self.processings);
        let mut next = Vec::with_capacity(config.processings.len());
        for pc in config.processings {
            match old.iter().position(|p| p.name() == pc.name) {
                Some(i) => {
                    let mut processing = old.swap_remove(i);
                    processing.update(pc)?;
                    next.push(processing);
                }
                None => next.push(Processing::new(pc)?),
            }
        }
        self.processings = next;
        self.snapshot.clear();
        self.configure_all()
    }

    /// Adopts a new capture format
    pub fn set_format(&mut self, sample_rate: u32, layout: ChannelLayout) -> Result<()> {
        self.sample_rate = sample_rate;
        self.layout = layout;
        self.configure_all()
    }

    fn configure_all(&mut self) -> Result<()> {
        for processing in &mut self.processings {
            processing.configure(self.sample_rate, &self.layout)?;
        }
        info!(
            processings = self.processings.len(),
            sample_rate = self.sample_rate,
            "pipeline configured"
        );
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// Runs one tick over an interleaved frame buffer
    pub fn process_frames(&mut self, interleaved: &[f32]) {
        let mut mixer = ChannelMixer::new(self.layout.clone());
        mixer.decompose(interleaved);
        self.process(&mixer);
    }

    /// Runs one tick over pre-split channel waves
    pub fn process(&mut self, mixer: &ChannelMixer) {
        let start = Instant::now();
        let deadline = start + self.kill_timeout;

        for processing in &mut self.processings {
            if let Err(err) = processing.process(mixer, start, deadline) {
                error!(
                    processing = processing.name(),
                    %err,
                    "tick killed, keeping previous snapshot"
                );
                return;
            }
        }

        for processing in &self.processings {
            processing.update_snapshot(&mut self.snapshot);
        }
    }

    /// Feeds silence without allocating frame buffers, keeping
    /// time-dependent handler state decaying while capture is idle
    pub fn process_silence(&mut self, frames: usize) {
        let mut mixer = ChannelMixer::new(self.layout.clone());
        mixer.decompose_silence(frames);
        self.process(&mixer);
    }

    /// Swaps the working snapshot with a consumer-held one
    pub fn exchange(&mut self, other: &mut DataSnapshot) {
        std::mem::swap(&mut self.snapshot, other);
    }

    pub fn snapshot(&self) -> &DataSnapshot {
        &self.snapshot
    }

    pub fn value(&self, processing: &str, channel: Channel, handler: &str, index: usize) -> f32 {
        self.snapshot.value(processing, channel, handler, index)
    }

    /// Diagnostic property lookup on a live handler
    pub fn prop(
        &self,
        processing: &str,
        channel: Channel,
        handler: &str,
        prop: &str,
    ) -> Option<String> {
        self.processings
            .iter()
            .find(|p| p.name() == processing)?
            .prop(channel, handler, prop)
    }

    pub fn reset(&mut self) {
        for processing in &mut self.processings {
            processing.reset();
        }
    }

}

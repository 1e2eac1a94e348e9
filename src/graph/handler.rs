//! Handler lifecycle wrapper

use crate::error::{Result, WavescopeError};
use crate::graph::config::HandlerConfig;
use crate::graph::output::{ChunkOverflow, DataSize, OutputBuffer};
use crate::graph::snapshot::{HandlerSnapshot, SnapshotExtra};
use crate::handlers::AnyHandler;

pub struct ProcessContext<'a> {
    /// Conditioned wave of the owning channel for this tick
    pub wave: &'a [f32],
    /// Rate of the conditioned wave
    pub sample_rate: u32,
}

/// Behavior shared by every handler kind.
///
/// `configure` validates parameters against the final sample rate and
/// commits to an output shape. `process` reads the tick wave or its
/// source handler's chunks and appends chunks of its own.
pub trait HandlerImpl {
    fn configure(&mut self, sample_rate: u32, source: Option<&Handler>) -> Result<DataSize>;

    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        source: Option<&Handler>,
        out: &mut OutputBuffer,
    ) -> std::result::Result<(), ChunkOverflow>;

    /// Runs after all handlers of the chain processed the tick
    fn finish(&mut self) {}

    /// Clears accumulated signal state, keeping configuration
    fn reset(&mut self) {}

    /// Named diagnostic properties for consumers
    fn prop(&self, _name: &str) -> Option<String> {
        None
    }

    /// Copies non-numeric payloads into the snapshot
    fn snapshot_extra(&self, _extra: &mut SnapshotExtra) {}
}

/// A configured handler instance inside one channel chain
pub struct Handler {
    name: String,
    config: HandlerConfig,
    kind: AnyHandler,
    output: OutputBuffer,
    valid: bool,
    /// Rate the handler was last configured against, used to skip
    /// redundant reconfiguration that would wipe accumulated state
    configured_rate: Option<u32>,
    pub(crate) source_index: Option<usize>,
}

impl Handler {
    pub fn new(config: HandlerConfig) -> Self {
        let kind = AnyHandler::from_params(&config.params);
        Self {
            name: config.name.clone(),
            config,
            kind,
            output: OutputBuffer::default(),
            valid: false,
            configured_rate: None,
            source_index: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn source_name(&self) -> Option<&str> {
        self.config.params.source_name()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn is_configured_for(&self, sample_rate: u32) -> bool {
        self.valid && self.configured_rate == Some(sample_rate)
    }

    pub fn data_size(&self) -> &DataSize {
        self.output.data_size()
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn kind(&self) -> &AnyHandler {
        &self.kind
    }

    pub fn configure(&mut self, sample_rate: u32, source: Option<&Handler>) -> Result<()> {
        match self.kind.configure(sample_rate, source) {
            Ok(data_size) => {
                self.output.set_data_size(data_size);
                self.valid = true;
                self.configured_rate = Some(sample_rate);
                Ok(())
            }
            Err(err) => {
                self.valid = false;
                self.configured_rate = None;
                Err(err)
            }
        }
    }

    pub fn process(&mut self, ctx: &ProcessContext<'_>, source: Option<&Handler>) -> Result<()> {
        self.output.begin_tick();
        self.kind
            .process(ctx, source, &mut self.output)
            .map_err(|ChunkOverflow| WavescopeError::TooManyValues {
                handler: self.name.clone(),
            })
    }

    pub fn finish(&mut self) {
        self.kind.finish();
    }

    pub fn reset(&mut self) {
        self.kind.reset();
    }

    pub fn prop(&self, name: &str) -> Option<String> {
        self.kind.prop(name)
    }

    pub fn update_snapshot(&self, snapshot: &mut HandlerSnapshot) {
        let layers = self.output.data_size().layers();
        snapshot.layers.resize(layers, Vec::new());
        for (layer, values) in snapshot.layers.iter_mut().enumerate() {
            values.clear();
            values.extend_from_slice(self.output.latest(layer));
        }
        self.kind.snapshot_extra(&mut snapshot.extra);
    }
}

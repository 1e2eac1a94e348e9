//! One processing unit: channel lanes and their handler chains

use crate::dsp::{FilterCascade, FilterCascadeSpec};
use crate::engine::{Channel, ChannelLayout, ChannelMixer, Decimator};
use crate::error::{Result, WavescopeError};
use crate::graph::config::ProcessingConfig;
use crate::graph::handler::{Handler, ProcessContext};
use crate::graph::snapshot::DataSnapshot;
use std::time::Instant;
use tracing::{debug, error, warn};

pub struct Processing {
    config: ProcessingConfig,
    filter_spec: FilterCascadeSpec,
    lanes: Vec<ChannelLane>,
}

struct ChannelLane {
    channel: Channel,
    decimator: Decimator,
    filter: FilterCascade,
    cond_buf: Vec<f32>,
    sample_rate: u32,
    handlers: Vec<Handler>,
}

impl Processing {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        let filter_spec = FilterCascadeSpec::parse(&config.filter)?;
        Ok(Self {
            config,
            filter_spec,
            lanes: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Adopts a patched configuration. An identical configuration is a
    /// no-op so reused handlers keep their state on the next configure.
    pub fn update(&mut self, config: ProcessingConfig) -> Result<()> {
        if self.config != config {
            self.filter_spec = FilterCascadeSpec::parse(&config.filter)?;
            self.config = config;
        }
        Ok(())
    }

    /// Rebuilds channel lanes for a capture format. Handlers whose
    /// configuration did not change are reused so their accumulated
    /// state survives a format change.
    pub fn configure(&mut self, sample_rate: u32, layout: &ChannelLayout) -> Result<()> {
        let mut old_lanes = std::mem::take(&mut self.lanes);

        for &channel in &self.config.channels {
            if !layout.contains(channel) {
                debug!(
                    processing = self.config.name,
                    channel = channel.technical_name(),
                    "channel not present in capture format, skipping"
                );
                continue;
            }

            let decimator = Decimator::for_rates(sample_rate, self.config.target_rate);
            let lane_rate = decimator.decimated_rate(sample_rate);
            let filter = self.filter_spec.build(lane_rate)?;

            let old_handlers = old_lanes
                .iter_mut()
                .position(|lane| lane.channel == channel)
                .map(|i| std::mem::take(&mut old_lanes[i].handlers))
                .unwrap_or_default();

            let mut lane = ChannelLane {
                channel,
                decimator,
                filter,
                cond_buf: Vec::new(),
                sample_rate: lane_rate,
                handlers: rebuild_handlers(&self.config, old_handlers),
            };
            configure_chain(&self.config.name, channel, lane_rate, &mut lane.handlers);
            self.lanes.push(lane);
        }

        Ok(())
    }

    /// Runs one tick. Returns the deadline error if the budget ran out;
    /// per-handler failures only disable the failing handler.
    pub fn process(&mut self, mixer: &ChannelMixer, start: Instant, deadline: Instant) -> Result<()> {
        for lane in &mut self.lanes {
            let Some(wave) = mixer.wave(lane.channel) else {
                continue;
            };

            lane.decimator.process(wave, &mut lane.cond_buf);
            lane.filter.apply(&mut lane.cond_buf);

            let ctx = ProcessContext {
                wave: &lane.cond_buf,
                sample_rate: lane.sample_rate,
            };

            for i in 0..lane.handlers.len() {
                if Instant::now() >= deadline {
                    return Err(WavescopeError::DeadlineExceeded {
                        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
                    });
                }

                let (sources, rest) = lane.handlers.split_at_mut(i);
                let handler = &mut rest[0];
                if !handler.is_valid() {
                    continue;
                }
                let source = handler.source_index.map(|s| &sources[s]);
                if let Some(source) = source {
                    if !source.is_valid() {
                        continue;
                    }
                }

                if let Err(err) = handler.process(&ctx, source) {
                    error!(
                        processing = self.config.name,
                        handler = handler.name(),
                        %err,
                        "handler failed, disabling"
                    );
                    handler.invalidate();
                }
            }

            for handler in &mut lane.handlers {
                if handler.is_valid() {
                    handler.finish();
                }
            }
        }
        Ok(())
    }

    pub fn update_snapshot(&self, snapshot: &mut DataSnapshot) {
        for lane in &self.lanes {
            for handler in &lane.handlers {
                if handler.is_valid() {
                    handler.update_snapshot(snapshot.entry(
                        &self.config.name,
                        lane.channel,
                        handler.name(),
                    ));
                }
            }
        }
    }

    pub fn prop(&self, channel: Channel, handler: &str, prop: &str) -> Option<String> {
        self.lanes
            .iter()
            .find(|lane| lane.channel == channel)?
            .handlers
            .iter()
            .find(|h| h.name() == handler)?
            .prop(prop)
    }

    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.decimator.reset();
            lane.filter.reset();
            for handler in &mut lane.handlers {
                handler.reset();
            }
        }
    }

}

/// Builds the handler list in declaration order, reusing old instances
/// with identical configuration
fn rebuild_handlers(config: &ProcessingConfig, mut old: Vec<Handler>) -> Vec<Handler> {
    config
        .handlers
        .iter()
        .map(|hc| {
            match old
                .iter()
                .position(|h| h.config() == hc)
                .map(|i| old.swap_remove(i))
            {
                Some(reused) => reused,
                None => Handler::new(hc.clone()),
            }
        })
        .collect()
}

/// Configures handlers in declaration order, resolving each source to
/// an earlier handler of the same lane.
///
/// A reused handler already configured for this rate is left alone
/// unless its source was reconfigured, so its ring buffers and
/// smoothing history survive a redundant format or config push.
fn configure_chain(processing: &str, channel: Channel, sample_rate: u32, handlers: &mut [Handler]) {
    let mut refreshed = vec![false; handlers.len()];
    for i in 0..handlers.len() {
        let (sources, rest) = handlers.split_at_mut(i);
        let handler = &mut rest[0];

        let source = match handler.source_name() {
            None => None,
            Some(name) => match sources.iter().position(|h| h.name() == name) {
                Some(index) => {
                    handler.source_index = Some(index);
                    Some(&sources[index])
                }
                None => {
                    warn!(
                        processing,
                        channel = channel.technical_name(),
                        handler = handler.name(),
                        source = name,
                        "source not found among preceding handlers"
                    );
                    handler.invalidate();
                    refreshed[i] = true;
                    continue;
                }
            },
        };

        if source.map_or(false, |s| !s.is_valid()) {
            handler.invalidate();
            refreshed[i] = true;
            continue;
        }

        let source_refreshed = handler.source_index.map_or(false, |s| refreshed[s]);
        if handler.is_configured_for(sample_rate) && !source_refreshed {
            continue;
        }
        refreshed[i] = true;

        if let Err(err) = handler.configure(sample_rate, source) {
            warn!(
                processing,
                channel = channel.technical_name(),
                handler = handler.name(),
                %err,
                "handler configuration failed"
            );
        }
    }
}

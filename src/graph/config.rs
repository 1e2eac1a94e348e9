//! Engine configuration model

use crate::engine::Channel;
use crate::handlers::HandlerParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Per-tick processing budget in milliseconds
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout_ms: f64,
    pub processings: Vec<ProcessingConfig>,
}

fn default_kill_timeout() -> f64 {
    33.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingConfig {
    pub name: String,
    pub channels: Vec<Channel>,
    /// Filter cascade description applied to the wave before handlers
    #[serde(default)]
    pub filter: String,
    /// Decimation target in Hz; 0 keeps the capture rate
    #[serde(default)]
    pub target_rate: u32,
    pub handlers: Vec<HandlerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: HandlerParams,
}

//! Channel roles and layouts

use serde::{Deserialize, Serialize};

/// Enumerated channel roles plus the Auto mono-mix pseudo-channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    FrontLeft,
    FrontRight,
    Center,
    LowFrequency,
    BackLeft,
    BackRight,
    SideLeft,
    SideRight,
    /// Mono mix of the front pair; always available regardless of layout
    Auto,
}

impl Channel {
    /// Short technical name used in logs and props
    pub fn technical_name(&self) -> &'static str {
        match self {
            Channel::FrontLeft => "FL",
            Channel::FrontRight => "FR",
            Channel::Center => "C",
            Channel::LowFrequency => "LFE",
            Channel::BackLeft => "BL",
            Channel::BackRight => "BR",
            Channel::SideLeft => "SL",
            Channel::SideRight => "SR",
            Channel::Auto => "Auto",
        }
    }
}

/// Ordered set of channel roles as delivered by the capture backend
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    order: Vec<Channel>,
}

impl ChannelLayout {
    pub fn new(order: Vec<Channel>) -> Self {
        Self { order }
    }

    pub fn mono() -> Self {
        Self::new(vec![Channel::FrontLeft])
    }

    pub fn stereo() -> Self {
        Self::new(vec![Channel::FrontLeft, Channel::FrontRight])
    }

    pub fn surround_5_1() -> Self {
        Self::new(vec![
            Channel::FrontLeft,
            Channel::FrontRight,
            Channel::Center,
            Channel::LowFrequency,
            Channel::BackLeft,
            Channel::BackRight,
        ])
    }

    /// Position of a channel in the interleaved frame, if present
    pub fn index_of(&self, channel: Channel) -> Option<usize> {
        self.order.iter().position(|&c| c == channel)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        // Auto is synthesized by the mixer, not carried by the capture format
        channel == Channel::Auto || self.index_of(channel).is_some()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.order
    }

    pub fn num_channels(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lookup() {
        let layout = ChannelLayout::stereo();
        assert_eq!(layout.index_of(Channel::FrontLeft), Some(0));
        assert_eq!(layout.index_of(Channel::FrontRight), Some(1));
        assert_eq!(layout.index_of(Channel::Center), None);
        assert!(layout.contains(Channel::Auto));
    }

    #[test]
    fn test_surround_layout() {
        let layout = ChannelLayout::surround_5_1();
        assert_eq!(layout.num_channels(), 6);
        assert_eq!(layout.index_of(Channel::LowFrequency), Some(3));
    }
}

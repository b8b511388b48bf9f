//! Configuration types for tributary operators

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Capacity used by the concurrent combinators when none is given.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How many elements a channel may buffer before producers suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCapacity {
    /// Producers suspend once `n` elements are buffered
    Bounded(usize),
    /// Producers never suspend; memory grows with the backlog
    Unbounded,
}

impl Default for ChannelCapacity {
    fn default() -> Self {
        ChannelCapacity::Bounded(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Channel configuration for the concurrent combinators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub capacity: ChannelCapacity,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a bounded channel holding at most `capacity` elements
    pub fn bounded(mut self, capacity: usize) -> Self {
        self.capacity = ChannelCapacity::Bounded(capacity);
        self
    }

    /// Opt into an unbounded channel (no backpressure)
    pub fn unbounded(mut self) -> Self {
        self.capacity = ChannelCapacity::Unbounded;
        self
    }

    pub fn validate(&self) -> StreamResult<()> {
        match self.capacity {
            ChannelCapacity::Bounded(0) => Err(StreamError::invalid_config(
                "channel capacity must be greater than zero",
            )),
            _ => Ok(()),
        }
    }
}

/// Window geometry shared by the windowing operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub size: usize,
    pub step: usize,
}

impl WindowConfig {
    /// Non-overlapping windows of `size` elements
    pub fn tumbling(size: usize) -> Self {
        Self { size, step: size }
    }

    /// Windows of `size` elements advancing by `step`
    pub fn sliding(size: usize, step: usize) -> Self {
        Self { size, step }
    }

    pub fn validate(&self) -> StreamResult<()> {
        if self.size == 0 {
            return Err(StreamError::invalid_config(
                "window size must be greater than zero",
            ));
        }
        if self.step == 0 {
            return Err(StreamError::invalid_config(
                "window step must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Elements still buffered after a slide, i.e. already emitted once.
    pub(crate) fn retained_after_slide(&self) -> usize {
        self.size.saturating_sub(self.step)
    }

    /// Upstream elements dropped between disjoint windows when `step > size`.
    pub(crate) fn gap(&self) -> usize {
        self.step.saturating_sub(self.size)
    }
}

//! tributary - composable async stream combinators
//!
//! Operators transform, window, rate-limit and fan in pull-based,
//! single-consumer [`Flow`]s. Sequential operators run inside the consumer's
//! pull; the concurrent combinators ([`merge`], [`combine_latest`],
//! [`with_latest_from`]) and [`sample`] drain their upstreams from background
//! tokio tasks that are aborted when the output flow is dropped.
//!
//! ```
//! use tributary::prelude::*;
//! use futures::TryStreamExt;
//!
//! # async fn example() -> StreamResult<()> {
//! let windows: Vec<Vec<i32>> = from_iter(1..=7)
//!     .skip_flow(1)
//!     .tumbling_window_flow(3)?
//!     .try_collect()
//!     .await?;
//! assert_eq!(windows, vec![vec![2, 3, 4], vec![5, 6, 7]]);
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod channel;
pub mod concurrent;
pub mod config;
pub mod error;
pub mod flow;
pub mod flow_ext;
pub mod pipe;
pub mod sequential;
pub mod timing;
pub mod window;

pub use cell::SyncCell;
pub use channel::{channel, ChannelReader, ChannelWriter};
pub use concurrent::{
    combine_latest, combine_latest_with_config, merge, merge_with_config, with_latest_from,
    with_latest_from_with_config,
};
pub use config::{ChannelCapacity, ChannelConfig, WindowConfig, DEFAULT_CHANNEL_CAPACITY};
pub use error::{StreamError, StreamResult};
pub use flow::Flow;
pub use flow_ext::FlowExt;
pub use pipe::Pipe;
pub use timing::{debounce, sample, throttle, timeout};

/// Everything needed to build and consume flows
pub mod prelude {
    pub use crate::concurrent::{combine_latest, merge, with_latest_from};
    pub use crate::config::{ChannelCapacity, ChannelConfig, WindowConfig};
    pub use crate::error::{StreamError, StreamResult};
    pub use crate::flow::{
        emit, emit_after, empty, fail, from_iter, from_results, from_stream, tick, unfold, Flow,
    };
    pub use crate::flow_ext::FlowExt;
    pub use crate::pipe::Pipe;
}

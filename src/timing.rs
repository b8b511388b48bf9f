//! Rate limiting and timing operators
//!
//! Every timer here comes from `tokio::time`, so the operators follow a paused
//! test clock as well as the real one.

use std::time::Duration;

use async_stream::stream;
use futures_util::pin_mut;
use futures_util::stream::StreamExt;
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant, MissedTickBehavior};

use crate::cell::SyncCell;
use crate::channel::channel;
use crate::config::ChannelCapacity;
use crate::error::{StreamError, StreamResult};
use crate::flow::Flow;

fn validate_interval(operator: &str, interval: Duration) -> StreamResult<()> {
    if interval.is_zero() {
        return Err(StreamError::invalid_config(format!(
            "{operator}: duration must be greater than zero"
        )));
    }
    Ok(())
}

/// Enforce a minimum spacing of `interval` between emissions.
///
/// The first element passes immediately. Later elements are delayed until
/// `interval` has elapsed since the previous emission; nothing is dropped.
pub fn throttle<T>(s: Flow<T>, interval: Duration) -> StreamResult<Flow<T>>
where
    T: Send + 'static,
{
    validate_interval("throttle", interval)?;

    Ok(stream! {
        pin_mut!(s);
        let mut last_emit: Option<Instant> = None;

        while let Some(item) = s.next().await {
            match item {
                Ok(item) => {
                    if let Some(last) = last_emit {
                        let due = last + interval;
                        if Instant::now() < due {
                            sleep_until(due).await;
                        }
                    }
                    last_emit = Some(Instant::now());
                    yield Ok(item);
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed())
}

/// Emit a value only after `interval` passes without a newer one.
///
/// Each upstream value replaces the pending one and restarts the single timer.
/// When upstream ends with a value still pending, the timer runs out before the
/// value is emitted and the flow ends.
pub fn debounce<T>(s: Flow<T>, interval: Duration) -> StreamResult<Flow<T>>
where
    T: Send + 'static,
{
    validate_interval("debounce", interval)?;

    Ok(stream! {
        pin_mut!(s);
        let timer = sleep(interval);
        pin_mut!(timer);
        let mut pending: Option<T> = None;
        let mut upstream_done = false;

        loop {
            tokio::select! {
                item = s.next(), if !upstream_done => match item {
                    Some(Ok(item)) => {
                        if pending.replace(item).is_some() {
                            log::trace!("debounce: value superseded, timer restarted");
                        }
                        timer.as_mut().reset(Instant::now() + interval);
                    }
                    Some(Err(e)) => {
                        yield Err(e);
                        return;
                    }
                    None => upstream_done = true,
                },
                _ = &mut timer, if pending.is_some() => {
                    if let Some(item) = pending.take() {
                        yield Ok(item);
                    }
                }
            }

            if upstream_done && pending.is_none() {
                break;
            }
        }
    }
    .boxed())
}

/// Latest upstream value as seen by the sampling ticker
struct Latest<T> {
    value: T,
    /// Not yet emitted by any tick
    fresh: bool,
}

/// Emit the most recent upstream value on every tick of an independent clock.
///
/// Upstream is drained by a background task; a tick before the first value
/// emits nothing, and a slow upstream means the same value is emitted on
/// several ticks. When upstream ends, a value that no tick has emitted yet is
/// flushed before the end.
pub fn sample<T>(s: Flow<T>, interval: Duration) -> StreamResult<Flow<T>>
where
    T: Clone + Send + 'static,
{
    validate_interval("sample", interval)?;

    Ok(stream! {
        let latest: SyncCell<Latest<T>> = SyncCell::new();
        let (signal, mut upstream_end) = channel::<()>(ChannelCapacity::Bounded(1));

        let mut producers = JoinSet::new();
        {
            let latest = latest.clone();
            let mut s = s;
            producers.spawn(async move {
                while let Some(item) = s.next().await {
                    match item {
                        Ok(value) => {
                            latest.set(Latest { value, fresh: true }).await;
                        }
                        Err(e) => {
                            log::warn!("sample: upstream failed: {}", e);
                            signal.fail(e);
                            return;
                        }
                    }
                }
                signal.finish();
            });
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                end = upstream_end.recv() => {
                    match end {
                        Some(Err(e)) => yield Err(e),
                        _ => {
                            let last = {
                                let mut slot = latest.lock().await;
                                match slot.take() {
                                    Some(latest) if latest.fresh => Some(latest.value),
                                    _ => None,
                                }
                            };
                            if let Some(value) = last {
                                yield Ok(value);
                            }
                        }
                    }
                    break;
                }
                _ = ticker.tick() => {
                    let current = {
                        let mut slot = latest.lock().await;
                        slot.as_mut().map(|latest| {
                            latest.fresh = false;
                            latest.value.clone()
                        })
                    };
                    if let Some(value) = current {
                        yield Ok(value);
                    }
                }
            }
        }

        producers.abort_all();
    }
    .boxed())
}

/// Fail with [`StreamError::TimeoutExceeded`] when upstream takes longer than
/// `duration` to produce its next element.
///
/// The pending pull is dropped on timeout. A natural end is never a timeout.
pub fn timeout<T>(s: Flow<T>, duration: Duration) -> StreamResult<Flow<T>>
where
    T: Send + 'static,
{
    validate_interval("timeout", duration)?;

    Ok(stream! {
        pin_mut!(s);
        loop {
            match tokio::time::timeout(duration, s.next()).await {
                Ok(Some(Ok(value))) => yield Ok(value),
                Ok(Some(Err(e))) => {
                    yield Err(e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    log::debug!("timeout: no element within {:?}", duration);
                    yield Err(StreamError::TimeoutExceeded(duration));
                    break;
                }
            }
        }
    }
    .boxed())
}

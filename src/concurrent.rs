//! Fan-in combinators that consume their upstreams from background tasks
//!
//! Each combinator spawns one producer task per upstream on the first pull and
//! funnels results through a [`channel`](crate::channel). The tasks live in a
//! `JoinSet` owned by the output flow, so dropping the flow aborts all of them.
//!
//! Failures are fail-fast: the first producer error completes the channel, is
//! surfaced to the consumer once, and every sibling task is aborted.

use async_stream::stream;
use futures_util::stream::StreamExt;
use tokio::task::JoinSet;

use crate::cell::SyncCell;
use crate::channel::{channel, ChannelReader, ChannelWriter};
use crate::config::ChannelConfig;
use crate::error::StreamResult;
use crate::flow::{empty, Flow};

/// Forward every element of `s` into `writer` until either side stops.
async fn forward<T>(id: usize, mut s: Flow<T>, writer: ChannelWriter<T>)
where
    T: Send + 'static,
{
    log::debug!("producer {} started", id);
    while let Some(item) = s.next().await {
        match item {
            Ok(item) => {
                if let Err(e) = writer.send(item).await {
                    log::debug!("producer {} stopped: {}", id, e);
                    return;
                }
            }
            Err(e) => {
                log::warn!("producer {} failed, tearing down siblings: {}", id, e);
                writer.fail(e);
                return;
            }
        }
    }
    log::debug!("producer {} finished", id);
}

/// Drain `reader` as a flow, aborting `producers` once the channel ends or
/// when the flow is dropped.
fn drain<T>(mut reader: ChannelReader<T>, producers: JoinSet<()>) -> Flow<T>
where
    T: Send + 'static,
{
    stream! {
        let mut producers = producers;
        while let Some(item) = reader.recv().await {
            match item {
                Ok(item) => yield Ok(item),
                Err(e) => {
                    producers.abort_all();
                    yield Err(e);
                    break;
                }
            }
        }
        producers.abort_all();
    }
    .boxed()
}

/// Interleave several flows in arrival order.
///
/// Order is kept within each upstream only. The merged flow ends when every
/// upstream has ended.
pub fn merge<T>(streams: Vec<Flow<T>>) -> Flow<T>
where
    T: Send + 'static,
{
    spawn_merge(streams, ChannelConfig::default())
}

/// [`merge`] with an explicit channel configuration
pub fn merge_with_config<T>(streams: Vec<Flow<T>>, config: &ChannelConfig) -> StreamResult<Flow<T>>
where
    T: Send + 'static,
{
    config.validate()?;
    Ok(spawn_merge(streams, config.clone()))
}

fn spawn_merge<T>(streams: Vec<Flow<T>>, config: ChannelConfig) -> Flow<T>
where
    T: Send + 'static,
{
    if streams.is_empty() {
        return empty();
    }

    stream! {
        let (writer, reader) = channel(config.capacity);
        let mut producers = JoinSet::new();
        for (id, s) in streams.into_iter().enumerate() {
            producers.spawn(forward(id, s, writer.clone()));
        }
        // The channel completes once the last producer drops its writer.
        drop(writer);

        let merged = drain(reader, producers);
        futures_util::pin_mut!(merged);
        while let Some(item) = merged.next().await {
            yield item;
        }
    }
    .boxed()
}

/// Latest value seen on each side of a [`combine_latest`]
struct LatestPair<A, B> {
    left: Option<A>,
    right: Option<B>,
}

/// Emit `(latest_a, latest_b)` whenever either side updates, once both sides
/// have produced at least one value.
///
/// Ends when both upstreams have ended.
pub fn combine_latest<A, B>(a: Flow<A>, b: Flow<B>) -> Flow<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    spawn_combine_latest(a, b, ChannelConfig::default())
}

/// [`combine_latest`] with an explicit channel configuration
pub fn combine_latest_with_config<A, B>(
    a: Flow<A>,
    b: Flow<B>,
    config: &ChannelConfig,
) -> StreamResult<Flow<(A, B)>>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    config.validate()?;
    Ok(spawn_combine_latest(a, b, config.clone()))
}

fn spawn_combine_latest<A, B>(a: Flow<A>, b: Flow<B>, config: ChannelConfig) -> Flow<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    stream! {
        let (writer, reader) = channel(config.capacity);
        let latest: SyncCell<LatestPair<A, B>> = SyncCell::new();
        let mut producers = JoinSet::new();

        producers.spawn(publish_latest(0, a, latest.clone(), writer.clone(), |pair, v: A| {
            pair.left = Some(v);
        }));
        producers.spawn(publish_latest(1, b, latest, writer.clone(), |pair, v: B| {
            pair.right = Some(v);
        }));
        drop(writer);

        let combined = drain(reader, producers);
        futures_util::pin_mut!(combined);
        while let Some(item) = combined.next().await {
            yield item;
        }
    }
    .boxed()
}

/// Producer side of [`combine_latest`]: store each value on its own side and,
/// while still holding the cell, publish the pair if the other side is set.
async fn publish_latest<A, B, V, F>(
    id: usize,
    mut s: Flow<V>,
    latest: SyncCell<LatestPair<A, B>>,
    writer: ChannelWriter<(A, B)>,
    store: F,
) where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    V: Send + 'static,
    F: Fn(&mut LatestPair<A, B>, V) + Send + 'static,
{
    log::debug!("combine_latest producer {} started", id);
    while let Some(item) = s.next().await {
        match item {
            Ok(value) => {
                let mut slot = latest.lock().await;
                let pair = slot.get_or_insert_with(|| LatestPair {
                    left: None,
                    right: None,
                });
                store(pair, value);
                if let (Some(left), Some(right)) = (&pair.left, &pair.right) {
                    let combined = (left.clone(), right.clone());
                    // Sent under the lock so pairs reach the channel in update order.
                    if writer.send(combined).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("combine_latest producer {} failed: {}", id, e);
                writer.fail(e);
                return;
            }
        }
    }
    log::debug!("combine_latest producer {} finished", id);
}

/// On every `trigger` element, emit the latest value of `sampled`.
///
/// The trigger's own payload is discarded, and nothing is emitted before
/// `sampled` has produced a value. Ends when `trigger` ends; the `sampled`
/// producer is aborted at that point.
pub fn with_latest_from<T, U>(trigger: Flow<T>, sampled: Flow<U>) -> Flow<U>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    spawn_with_latest_from(trigger, sampled, ChannelConfig::default())
}

/// [`with_latest_from`] with an explicit channel configuration
pub fn with_latest_from_with_config<T, U>(
    trigger: Flow<T>,
    sampled: Flow<U>,
    config: &ChannelConfig,
) -> StreamResult<Flow<U>>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    config.validate()?;
    Ok(spawn_with_latest_from(trigger, sampled, config.clone()))
}

fn spawn_with_latest_from<T, U>(trigger: Flow<T>, sampled: Flow<U>, config: ChannelConfig) -> Flow<U>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
{
    stream! {
        let (writer, reader) = channel(config.capacity);
        let latest: SyncCell<U> = SyncCell::new();
        let mut producers = JoinSet::new();

        {
            let latest = latest.clone();
            let writer = writer.clone();
            let mut sampled = sampled;
            producers.spawn(async move {
                while let Some(item) = sampled.next().await {
                    match item {
                        Ok(value) => {
                            latest.set(value).await;
                        }
                        Err(e) => {
                            log::warn!("with_latest_from: sampled upstream failed: {}", e);
                            writer.fail(e);
                            return;
                        }
                    }
                }
                log::debug!("with_latest_from: sampled upstream finished");
            });
        }

        {
            let mut trigger = trigger;
            producers.spawn(async move {
                while let Some(item) = trigger.next().await {
                    match item {
                        Ok(_) => {
                            let Some(value) = latest.get().await else {
                                continue;
                            };
                            if writer.send(value).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            log::warn!("with_latest_from: trigger failed: {}", e);
                            writer.fail(e);
                            return;
                        }
                    }
                }
                writer.finish();
            });
        }

        let combined = drain(reader, producers);
        futures_util::pin_mut!(combined);
        while let Some(item) = combined.next().await {
            yield item;
        }
    }
    .boxed()
}

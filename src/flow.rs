//! The stream contract and its constructors
//!
//! A [`Flow`] is a boxed, pull-based, single-consumer stream of
//! `StreamResult<T>`: `Some(Ok(v))` is an element, `Some(Err(e))` a failure and
//! `None` the end. Every operator in this crate takes and returns a `Flow`, so
//! any operator is a valid upstream for further composition.

use async_stream::stream;
use futures_core::Stream;
use futures_util::pin_mut;
use futures_util::{
    future,
    stream::{self, BoxStream, StreamExt},
};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::wrappers::IntervalStream;

use crate::error::{StreamError, StreamResult};

/// A boxed, heap-allocated stream carrying failures in-band
pub type Flow<T> = BoxStream<'static, StreamResult<T>>;

/// Emit a single element
pub fn emit<T>(item: T) -> Flow<T>
where
    T: Send + 'static,
{
    stream::once(future::ready(Ok(item))).boxed()
}

/// A flow that ends immediately
pub fn empty<T>() -> Flow<T>
where
    T: Send + 'static,
{
    stream::empty().boxed()
}

/// A flow that fails immediately with `err`
pub fn fail<T>(err: StreamError) -> Flow<T>
where
    T: Send + 'static,
{
    stream::once(future::ready(Err(err))).boxed()
}

/// Create a flow from an iterator of plain values
pub fn from_iter<I, T>(iter: I) -> Flow<T>
where
    I: IntoIterator<Item = T> + Send + 'static,
    <I as IntoIterator>::IntoIter: Send,
    T: Send + 'static,
{
    stream::iter(iter.into_iter().map(Ok)).boxed()
}

/// Create a flow from an iterator of results.
///
/// The flow stops after the first `Err`, like every other operator.
pub fn from_results<I, T>(iter: I) -> Flow<T>
where
    I: IntoIterator<Item = StreamResult<T>> + Send + 'static,
    <I as IntoIterator>::IntoIter: Send,
    T: Send + 'static,
{
    let iter = iter.into_iter();
    stream! {
        for item in iter {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    }
    .boxed()
}

/// Lift an infallible stream into a flow
pub fn from_stream<S, T>(s: S) -> Flow<T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    s.map(Ok).boxed()
}

/// Emit a single value after a delay
pub fn emit_after<T>(item: T, duration: Duration) -> Flow<T>
where
    T: Send + 'static,
{
    stream::once(async move {
        sleep(duration).await;
        Ok(item)
    })
    .boxed()
}

/// Generate a flow from a seed and an async step function.
///
/// The flow ends when `f` returns `None`.
///
/// # Examples
/// ```
/// use tributary::flow::unfold;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let fibonacci = unfold((0u64, 1u64), |(a, b)| async move { Some((a, (b, a + b))) });
/// let result: Vec<u64> = fibonacci
///     .take(10)
///     .map(|r| r.unwrap())
///     .collect()
///     .await;
/// assert_eq!(result, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
/// # }
/// ```
pub fn unfold<S, T, F, Fut>(init: S, mut f: F) -> Flow<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(S) -> Fut + Send + 'static,
    Fut: Future<Output = Option<(T, S)>> + Send + 'static,
{
    stream! {
        let mut state = init;
        loop {
            match f(state).await {
                Some((item, next_state)) => {
                    yield Ok(item);
                    state = next_state;
                }
                None => break,
            }
        }
    }
    .boxed()
}

/// Emit a clone of `item` every `period`, starting immediately.
///
/// A zero period fails with [`StreamError::InvalidConfiguration`].
pub fn tick<T>(period: Duration, item: T) -> Flow<T>
where
    T: Clone + Send + 'static,
{
    if period.is_zero() {
        return fail(StreamError::invalid_config(
            "tick period must be greater than zero",
        ));
    }

    stream! {
        let ticks = IntervalStream::new(tokio::time::interval(period));
        pin_mut!(ticks);
        while ticks.next().await.is_some() {
            yield Ok(item.clone());
        }
    }
    .boxed()
}

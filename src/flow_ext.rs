use futures_core::Stream;
use futures_util::stream::StreamExt;
use std::time::Duration;

use crate::concurrent::{combine_latest, merge, with_latest_from};
use crate::error::StreamResult;
use crate::flow::Flow;
use crate::pipe::Pipe;
use crate::sequential::{
    distinct, distinct_until_changed, skip, skip_while, start_with, take, take_while, zip,
};
use crate::timing::{debounce, sample, throttle, timeout};
use crate::window::{buffer, sliding_window, tumbling_window};

/// Extension trait providing the tributary operators on any stream of
/// `StreamResult<T>`.
///
/// Methods carry a `_flow` suffix so they never shadow `futures::StreamExt`.
/// Operators whose parameters can be invalid return `StreamResult<Flow<_>>`.
pub trait FlowExt<T: Send + 'static>: Stream<Item = StreamResult<T>> + Sized + Send + 'static {
    /// Box this stream into a [`Flow`]
    fn into_flow(self) -> Flow<T> {
        self.boxed()
    }

    /// Emit the first `n` elements
    fn take_flow(self, n: usize) -> Flow<T> {
        take(self.boxed(), n)
    }

    /// Drop the first `n` elements
    fn skip_flow(self, n: usize) -> Flow<T> {
        skip(self.boxed(), n)
    }

    fn take_while_flow<F>(self, predicate: F) -> Flow<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        take_while(self.boxed(), predicate)
    }

    fn skip_while_flow<F>(self, predicate: F) -> Flow<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        skip_while(self.boxed(), predicate)
    }

    /// Suppress consecutive equal elements
    fn distinct_flow(self) -> Flow<T>
    where
        T: Clone + PartialEq,
    {
        distinct(self.boxed())
    }

    /// Suppress an element when `is_duplicate(previous, element)` holds
    fn distinct_until_changed_flow<F>(self, is_duplicate: F) -> Flow<T>
    where
        T: Clone,
        F: FnMut(&T, &T) -> bool + Send + 'static,
    {
        distinct_until_changed(self.boxed(), is_duplicate)
    }

    fn start_with_flow(self, first: T) -> Flow<T> {
        start_with(self.boxed(), first)
    }

    /// Pair this flow with `other` element by element
    fn zip_flow<U>(self, other: Flow<U>) -> Flow<(T, U)>
    where
        U: Send + 'static,
    {
        zip(self.boxed(), other)
    }

    fn tumbling_window_flow(self, size: usize) -> StreamResult<Flow<Vec<T>>> {
        tumbling_window(self.boxed(), size)
    }

    fn sliding_window_flow(self, size: usize, step: usize) -> StreamResult<Flow<Vec<T>>>
    where
        T: Clone,
    {
        sliding_window(self.boxed(), size, step)
    }

    fn buffer_flow(self, size: usize) -> StreamResult<Flow<Vec<T>>> {
        buffer(self.boxed(), size)
    }

    fn throttle_flow(self, interval: Duration) -> StreamResult<Flow<T>> {
        throttle(self.boxed(), interval)
    }

    fn debounce_flow(self, interval: Duration) -> StreamResult<Flow<T>> {
        debounce(self.boxed(), interval)
    }

    fn sample_flow(self, interval: Duration) -> StreamResult<Flow<T>>
    where
        T: Clone,
    {
        sample(self.boxed(), interval)
    }

    fn timeout_flow(self, duration: Duration) -> StreamResult<Flow<T>> {
        timeout(self.boxed(), duration)
    }

    /// Merge this flow with another in arrival order
    fn merge_flow(self, other: Flow<T>) -> Flow<T> {
        merge(vec![self.boxed(), other])
    }

    fn combine_latest_flow<U>(self, other: Flow<U>) -> Flow<(T, U)>
    where
        T: Clone,
        U: Clone + Send + 'static,
    {
        combine_latest(self.boxed(), other)
    }

    /// Use this flow as the trigger for sampling `sampled`
    fn with_latest_from_flow<U>(self, sampled: Flow<U>) -> Flow<U>
    where
        U: Clone + Send + 'static,
    {
        with_latest_from(self.boxed(), sampled)
    }

    /// Run this flow through a reusable [`Pipe`]
    fn through<O>(self, pipe: &Pipe<T, O>) -> Flow<O>
    where
        O: Send + 'static,
    {
        pipe.apply(self.boxed())
    }
}

impl<T, S> FlowExt<T> for S
where
    T: Send + 'static,
    S: Stream<Item = StreamResult<T>> + Sized + Send + 'static,
{
}

//! Windowing operators: stateful accumulation over one upstream
//!
//! Geometry is validated when the operator is built, so a bad size or step is an
//! `Err` from the constructor rather than a failure halfway through iteration.
//! Partial windows are flushed on a graceful end, never after a failure.

use std::collections::VecDeque;

use async_stream::stream;
use futures_util::pin_mut;
use futures_util::stream::StreamExt;

use crate::config::WindowConfig;
use crate::error::StreamResult;
use crate::flow::Flow;

/// Emit non-overlapping windows of `size` elements.
///
/// A trailing partial window is emitted once at the end. A source of length `L`
/// produces `ceil(L / size)` windows.
pub fn tumbling_window<T>(s: Flow<T>, size: usize) -> StreamResult<Flow<Vec<T>>>
where
    T: Send + 'static,
{
    let config = WindowConfig::tumbling(size);
    config.validate()?;
    Ok(chunked(s, config.size))
}

/// Group elements into batches of `size`.
///
/// Accumulates exactly like [`tumbling_window`]; use it for batching work
/// rather than for analytics.
pub fn buffer<T>(s: Flow<T>, size: usize) -> StreamResult<Flow<Vec<T>>>
where
    T: Send + 'static,
{
    let config = WindowConfig::tumbling(size);
    config.validate()?;
    Ok(chunked(s, config.size))
}

fn chunked<T>(s: Flow<T>, size: usize) -> Flow<Vec<T>>
where
    T: Send + 'static,
{
    stream! {
        let mut buf = Vec::with_capacity(size);
        pin_mut!(s);
        while let Some(item) = s.next().await {
            match item {
                Ok(item) => {
                    buf.push(item);
                    if buf.len() == size {
                        yield Ok(std::mem::replace(&mut buf, Vec::with_capacity(size)));
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if !buf.is_empty() {
            yield Ok(buf);
        }
    }
    .boxed()
}

/// Emit windows of `size` elements that advance by `step`.
///
/// With `step < size` consecutive windows overlap; with `step >= size` they are
/// disjoint and `step - size` elements between them are skipped. At the end a
/// partial window is emitted only when it holds elements no earlier window
/// contained.
///
/// # Examples
/// ```
/// use tributary::flow::from_iter;
/// use tributary::window::sliding_window;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let windows: Vec<Vec<i32>> = sliding_window(from_iter(vec![1, 2, 3, 4, 5]), 3, 1)
///     .unwrap()
///     .map(|r| r.unwrap())
///     .collect()
///     .await;
/// assert_eq!(windows, vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]]);
/// # }
/// ```
pub fn sliding_window<T>(s: Flow<T>, size: usize, step: usize) -> StreamResult<Flow<Vec<T>>>
where
    T: Clone + Send + 'static,
{
    let config = WindowConfig::sliding(size, step);
    config.validate()?;

    Ok(stream! {
        let mut window: VecDeque<T> = VecDeque::with_capacity(config.size);
        let mut emitted_any = false;
        let mut to_skip = 0usize;
        pin_mut!(s);

        while let Some(item) = s.next().await {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if to_skip > 0 {
                to_skip -= 1;
                continue;
            }

            window.push_back(item);
            if window.len() == config.size {
                yield Ok(window.iter().cloned().collect::<Vec<_>>());
                emitted_any = true;
                let slide = config.step.min(window.len());
                window.drain(..slide);
                to_skip = config.gap();
            }
        }

        let retained = if emitted_any { config.retained_after_slide() } else { 0 };
        if window.len() > retained {
            yield Ok(window.into_iter().collect::<Vec<_>>());
        }
    }
    .boxed())
}

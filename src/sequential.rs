//! Single-upstream operators that pull one element at a time
//!
//! All of these rethrow the first upstream failure verbatim and then end.

use async_stream::stream;
use futures_util::pin_mut;
use futures_util::stream::StreamExt;

use crate::flow::{empty, Flow};

/// Emit the first `n` elements, then end.
///
/// Never pulls more than `n` elements from upstream; `n == 0` pulls nothing.
pub fn take<T>(s: Flow<T>, n: usize) -> Flow<T>
where
    T: Send + 'static,
{
    if n == 0 {
        return empty();
    }

    stream! {
        pin_mut!(s);
        let mut remaining = n;
        while remaining > 0 {
            match s.next().await {
                Some(Ok(item)) => {
                    remaining -= 1;
                    yield Ok(item);
                }
                Some(Err(e)) => {
                    yield Err(e);
                    break;
                }
                None => break,
            }
        }
    }
    .boxed()
}

/// Discard the first `n` elements, then pass everything through
pub fn skip<T>(s: Flow<T>, n: usize) -> Flow<T>
where
    T: Send + 'static,
{
    stream! {
        pin_mut!(s);
        let mut to_skip = n;
        while let Some(item) = s.next().await {
            match item {
                Ok(_) if to_skip > 0 => to_skip -= 1,
                Ok(item) => yield Ok(item),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Emit elements while `predicate` holds.
///
/// The first element failing the predicate is discarded and the flow ends for
/// good, even if later elements would pass.
///
/// # Examples
/// ```
/// use tributary::flow::from_iter;
/// use tributary::sequential::take_while;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let result: Vec<i32> = take_while(from_iter(vec![1, 2, 3, 4, 1]), |&x| x < 3)
///     .map(|r| r.unwrap())
///     .collect()
///     .await;
/// assert_eq!(result, vec![1, 2]);
/// # }
/// ```
pub fn take_while<T, F>(s: Flow<T>, mut predicate: F) -> Flow<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    stream! {
        pin_mut!(s);
        while let Some(item) = s.next().await {
            match item {
                Ok(item) if predicate(&item) => yield Ok(item),
                Ok(_) => break,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Discard elements while `predicate` holds.
///
/// Once an element fails the predicate it is emitted and the predicate is never
/// consulted again.
pub fn skip_while<T, F>(s: Flow<T>, mut predicate: F) -> Flow<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    stream! {
        pin_mut!(s);
        let mut skipping = true;
        while let Some(item) = s.next().await {
            match item {
                Ok(item) => {
                    if skipping && predicate(&item) {
                        continue;
                    }
                    skipping = false;
                    yield Ok(item);
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Suppress elements equal to the previously emitted one.
///
/// Only consecutive duplicates are dropped: `[1, 1, 2, 1]` becomes `[1, 2, 1]`.
pub fn distinct<T>(s: Flow<T>) -> Flow<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    distinct_until_changed(s, |prev: &T, next: &T| prev == next)
}

/// Suppress an element when `is_duplicate(previous_emitted, element)` is true
pub fn distinct_until_changed<T, F>(s: Flow<T>, mut is_duplicate: F) -> Flow<T>
where
    T: Clone + Send + 'static,
    F: FnMut(&T, &T) -> bool + Send + 'static,
{
    stream! {
        pin_mut!(s);
        let mut prev: Option<T> = None;

        while let Some(item) = s.next().await {
            match item {
                Ok(item) => match &prev {
                    Some(p) if is_duplicate(p, &item) => {}
                    _ => {
                        prev = Some(item.clone());
                        yield Ok(item);
                    }
                },
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Emit `first` before pulling anything from upstream
pub fn start_with<T>(s: Flow<T>, first: T) -> Flow<T>
where
    T: Send + 'static,
{
    stream! {
        yield Ok(first);
        pin_mut!(s);
        while let Some(item) = s.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    }
    .boxed()
}

/// Pair elements of `a` and `b` step by step.
///
/// Ends as soon as either side ends; an element already pulled from the
/// longer side is dropped.
pub fn zip<A, B>(a: Flow<A>, b: Flow<B>) -> Flow<(A, B)>
where
    A: Send + 'static,
    B: Send + 'static,
{
    stream! {
        pin_mut!(a);
        pin_mut!(b);

        loop {
            match futures_util::future::join(a.next(), b.next()).await {
                (Some(Ok(x)), Some(Ok(y))) => yield Ok((x, y)),
                (Some(Err(e)), _) | (_, Some(Err(e))) => {
                    yield Err(e);
                    break;
                }
                _ => break,
            }
        }
    }
    .boxed()
}

use crate::config::WindowConfig;
use crate::error::StreamResult;
use crate::flow::{fail, Flow};
use crate::window::tumbling_window;
use async_stream::stream;
use futures_util::StreamExt;
use std::sync::Arc;

/// A Pipe is a reusable flow transformation, a function from `Flow<I>` to
/// `Flow<O>`. Cloning a pipe shares the same transformation.
pub struct Pipe<I, O> {
    f: Arc<dyn Fn(Flow<I>) -> Flow<O> + Send + Sync + 'static>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            f: Arc::clone(&self.f),
        }
    }
}

impl<I, O> Pipe<I, O> {
    /// Create a new pipe from a function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Flow<I>) -> Flow<O> + Send + Sync + 'static,
    {
        Pipe { f: Arc::new(f) }
    }

    /// Apply this pipe to a flow
    pub fn apply(&self, input: Flow<I>) -> Flow<O> {
        (self.f)(input)
    }
}

impl<I, O> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Feed the output of this pipe into `next`
    pub fn then<P>(self, next: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static,
    {
        compose(self, next)
    }
}

/// Create a pipe that applies the given function to each element
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> O + Send + Sync + Clone + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| {
        let f = f.clone();
        input.map(move |item| item.map(&f)).boxed()
    })
}

/// Create a pipe that keeps elements matching the predicate
pub fn filter<I, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> bool + Send + Sync + Clone + 'static,
    I: Send + 'static,
{
    Pipe::new(move |input| {
        let predicate = predicate.clone();
        stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                match item {
                    Ok(item) if predicate(&item) => yield Ok(item),
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    })
}

/// Tumbling-window pipe; the size is validated when the pipe is built
pub fn tumbling<I>(size: usize) -> StreamResult<Pipe<I, Vec<I>>>
where
    I: Send + 'static,
{
    WindowConfig::tumbling(size).validate()?;
    Ok(Pipe::new(move |input| {
        tumbling_window(input, size).unwrap_or_else(fail)
    }))
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| p2.apply(p1.apply(input)))
}

/// Identity pipe that passes the flow through untouched
pub fn identity<I>() -> Pipe<I, I>
where
    I: Send + 'static,
{
    Pipe::new(|input| input)
}

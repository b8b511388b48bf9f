//! Single-consumer channel fed by many producer tasks
//!
//! The concurrent combinators funnel every producer into one [`ChannelReader`].
//! Completion is explicit: [`ChannelWriter::finish`] ends the channel once the
//! buffered elements are drained, [`ChannelWriter::fail`] ends it immediately with
//! an error that the reader surfaces exactly once. Dropping every writer is the
//! same as `finish()`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_stream::stream;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Notify};

use crate::config::ChannelCapacity;
use crate::error::{StreamError, StreamResult};
use crate::flow::Flow;

#[derive(Default)]
struct Completion {
    closed: bool,
    error: Option<StreamError>,
}

/// Completion state shared by the writers and the reader.
///
/// Writers enqueue while holding the completion lock, so no element can land
/// after `finish` or `fail` has returned.
struct ChannelState {
    completion: Mutex<Completion>,
    close_notify: Notify,
    capacity: ChannelCapacity,
}

impl ChannelState {
    fn lock(&self) -> MutexGuard<'_, Completion> {
        match self.completion.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mark the channel complete, storing `err` unless it already completed.
    fn close(&self, err: Option<StreamError>) {
        {
            let mut completion = self.lock();
            if completion.closed {
                return;
            }
            completion.closed = true;
            completion.error = err;
        }
        // Single reader: a stored permit is enough if it is not waiting yet.
        self.close_notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn take_error(&self) -> Option<StreamError> {
        self.lock().error.take()
    }
}

enum Tx<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

impl<T> Clone for Tx<T> {
    fn clone(&self) -> Self {
        match self {
            Tx::Bounded(tx) => Tx::Bounded(tx.clone()),
            Tx::Unbounded(tx) => Tx::Unbounded(tx.clone()),
        }
    }
}

enum Rx<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> Rx<T> {
    async fn recv(&mut self) -> Option<T> {
        match self {
            Rx::Bounded(rx) => rx.recv().await,
            Rx::Unbounded(rx) => rx.recv().await,
        }
    }

    fn close(&mut self) {
        match self {
            Rx::Bounded(rx) => rx.close(),
            Rx::Unbounded(rx) => rx.close(),
        }
    }
}

/// Write half of a channel. Clone it once per producer task.
pub struct ChannelWriter<T> {
    tx: Tx<T>,
    state: Arc<ChannelState>,
}

impl<T> Clone for ChannelWriter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Read half of a channel. There is exactly one per channel.
pub struct ChannelReader<T> {
    rx: Rx<T>,
    state: Arc<ChannelState>,
    draining: bool,
    done: bool,
}

/// Create a channel with the given capacity.
///
/// `Bounded(0)` is raised to `Bounded(1)`, the smallest buffer tokio supports;
/// [`ChannelReader::capacity`] reports the capacity actually in use.
pub fn channel<T>(capacity: ChannelCapacity) -> (ChannelWriter<T>, ChannelReader<T>)
where
    T: Send + 'static,
{
    let capacity = match capacity {
        ChannelCapacity::Bounded(0) => ChannelCapacity::Bounded(1),
        other => other,
    };
    let (tx, rx) = match capacity {
        ChannelCapacity::Bounded(n) => {
            let (tx, rx) = mpsc::channel(n);
            (Tx::Bounded(tx), Rx::Bounded(rx))
        }
        ChannelCapacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx))
        }
    };

    let state = Arc::new(ChannelState {
        completion: Mutex::new(Completion::default()),
        close_notify: Notify::new(),
        capacity,
    });

    (
        ChannelWriter {
            tx,
            state: Arc::clone(&state),
        },
        ChannelReader {
            rx,
            state,
            draining: false,
            done: false,
        },
    )
}

impl<T> ChannelWriter<T>
where
    T: Send + 'static,
{
    /// Send an element, suspending while a bounded channel is full.
    ///
    /// Fails with [`StreamError::ChannelClosed`] once the channel completed and
    /// with [`StreamError::Cancelled`] when the reader has been dropped.
    pub async fn send(&self, item: T) -> StreamResult<()> {
        if self.state.is_closed() {
            return Err(StreamError::ChannelClosed);
        }

        match &self.tx {
            Tx::Bounded(tx) => {
                // Wait for room first; the element is only handed over under the lock.
                let permit = match tx.reserve().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(self.rejected()),
                };
                let completion = self.state.lock();
                if completion.closed {
                    return Err(StreamError::ChannelClosed);
                }
                permit.send(item);
                Ok(())
            }
            Tx::Unbounded(tx) => {
                let completion = self.state.lock();
                if completion.closed {
                    return Err(StreamError::ChannelClosed);
                }
                match tx.send(item) {
                    Ok(()) => Ok(()),
                    Err(_) => Err(StreamError::Cancelled),
                }
            }
        }
    }

    /// Why a write the receiver refused failed
    fn rejected(&self) -> StreamError {
        if self.state.is_closed() {
            StreamError::ChannelClosed
        } else {
            StreamError::Cancelled
        }
    }

    /// Mark the channel complete. Idempotent.
    pub fn finish(&self) {
        self.state.close(None);
    }

    /// Complete the channel with a terminal error. The first error wins, and
    /// an error after `finish` is ignored.
    pub fn fail(&self, err: StreamError) {
        self.state.close(Some(err));
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_closed()
    }

    /// Whether the reader has gone away
    pub fn is_cancelled(&self) -> bool {
        match &self.tx {
            Tx::Bounded(tx) => tx.is_closed(),
            Tx::Unbounded(tx) => tx.is_closed(),
        }
    }
}

impl<T> ChannelReader<T>
where
    T: Send + 'static,
{
    /// Receive the next element.
    ///
    /// Returns `None` once the channel finished and its buffer is drained, or
    /// after a stored error has been returned.
    pub async fn recv(&mut self) -> Option<StreamResult<T>> {
        loop {
            if self.done {
                return None;
            }

            if let Some(err) = self.state.take_error() {
                self.done = true;
                self.rx.close();
                return Some(Err(err));
            }

            if self.draining {
                // Closed: no new writes land, buffered ones are handed out.
                return match self.rx.recv().await {
                    Some(item) => Some(Ok(item)),
                    None => {
                        self.done = true;
                        None
                    }
                };
            }

            if self.state.is_closed() {
                self.rx.close();
                self.draining = true;
                continue;
            }

            tokio::select! {
                biased;
                _ = self.state.close_notify.notified() => continue,
                item = self.rx.recv() => match item {
                    Some(item) => return Some(Ok(item)),
                    None => {
                        // Every writer dropped without an explicit finish.
                        self.draining = true;
                        continue;
                    }
                },
            }
        }
    }

    /// Turn the reader into a stream that ends when the channel completes
    pub fn into_flow(self) -> Flow<T> {
        let mut reader = self;
        stream! {
            while let Some(item) = reader.recv().await {
                yield item;
            }
        }
        .boxed()
    }

    pub fn capacity(&self) -> ChannelCapacity {
        self.state.capacity
    }

    pub fn is_finished(&self) -> bool {
        self.done || self.state.is_closed()
    }
}

impl<T> fmt::Debug for ChannelWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("capacity", &self.state.capacity)
            .field("is_finished", &self.state.is_closed())
            .finish()
    }
}

impl<T> fmt::Debug for ChannelReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReader")
            .field("capacity", &self.state.capacity)
            .field("is_finished", &(self.done || self.state.is_closed()))
            .finish()
    }
}

//! Non-blocking fan-out of rendered frames to subscribers.
//!
//! Each subscriber gets its own bounded queue. When a queue is full the oldest
//! queued item is discarded to make room, so a slow consumer sees the most recent
//! frames and the producer never waits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::entity::FrameData;

/// Statistics for one published frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleStats {
    pub frame_id: u64,
    pub track_count: usize,
    pub group_count: usize,
    pub alert_count: usize,
    /// Instantaneous rate, `1 / (elapsed + 1e-4)`
    pub frames_per_second: f64,
}

impl CycleStats {
    pub fn measure(data: &FrameData, elapsed: Duration) -> Self {
        Self {
            frame_id: data.frame_id,
            track_count: data.tracks.len(),
            group_count: data.groups.len(),
            alert_count: data.alerts.len(),
            frames_per_second: 1.0 / (elapsed.as_secs_f64() + 1e-4),
        }
    }
}

/// A rendered image and the statistics of the frame it was rendered from.
#[derive(Debug)]
pub struct Published<I> {
    pub image: Arc<I>,
    pub stats: CycleStats,
}

impl<I> Clone for Published<I> {
    fn clone(&self) -> Self {
        Self {
            image: Arc::clone(&self.image),
            stats: self.stats,
        }
    }
}

/// Consumer end of a subscription. Dropping it unsubscribes.
pub struct Subscription<I> {
    rx: Receiver<Published<I>>,
    closed: Arc<AtomicBool>,
}

impl<I> Subscription<I> {
    /// Block until the next item arrives or the producer goes away.
    pub fn recv(&self) -> Result<Published<I>, RecvError> {
        self.rx.recv()
    }

    pub fn try_recv(&self) -> Result<Published<I>, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Published<I>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Underlying receiver, for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<Published<I>> {
        &self.rx
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<I> Drop for Subscription<I> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

struct Subscriber<I> {
    tx: Sender<Published<I>>,
    // Producer-side handle on the same queue, used to evict the oldest item.
    evict: Receiver<Published<I>>,
    closed: Arc<AtomicBool>,
}

impl<I> Subscriber<I> {
    /// Enqueue without blocking. Returns false once the subscriber is gone.
    fn deliver(&self, mut item: Published<I>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return true,
                Err(TrySendError::Full(back)) => {
                    let _ = self.evict.try_recv();
                    item = back;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

/// Producer end owning every subscriber queue.
pub struct Publisher<I> {
    subscribers: Vec<Subscriber<I>>,
    capacity: usize,
}

impl<I> Publisher<I> {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&mut self) -> Subscription<I> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        let closed = Arc::new(AtomicBool::new(false));
        self.subscribers.push(Subscriber {
            tx,
            evict: rx.clone(),
            closed: Arc::clone(&closed),
        });
        Subscription { rx, closed }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Hand `item` to every live subscriber, pruning closed ones.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&mut self, item: Published<I>) -> usize {
        self.subscribers.retain(|sub| sub.deliver(item.clone()));
        self.subscribers.len()
    }
}

//! Bounded sample queue connecting the engine stages.
//!
//! Every stage hands audio to the next through a [`SampleQueue`]:
//! - decode thread → queue
//! - resampler thread → queue
//! - CPAL callback drains the last queue without blocking
//!
//! Closing a queue is how a stage says "no more data": producers stop, consumers drain what
//! is left and then observe the end. [`crate::speaker::Speaker::clear`] closes queues early to
//! tear a track down.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Thread-safe bounded FIFO of interleaved `f32` samples.
///
/// Samples are interleaved (`frame0[ch0], frame0[ch1], frame1[ch0], ...`) and the channel
/// count is fixed for the lifetime of the queue. The `closed` flag lives under the same
/// mutex as the samples so "closed and empty" is observed atomically.
pub struct SampleQueue {
    channels: usize,
    max_samples: usize,
    inner: Mutex<Inner>,
    cv: Condvar,
}

struct Inner {
    samples: VecDeque<f32>,
    closed: bool,
}

/// How [`SampleQueue::pop`] waits for data.
#[derive(Clone, Copy, Debug)]
pub enum PopStrategy {
    /// Block until exactly `frames` are available; `None` if closed first.
    BlockingExact { frames: usize },
    /// Block until at least one frame is available, then take up to `max_frames`.
    BlockingUpTo { max_frames: usize },
    /// Take up to `max_frames` right now; `None` if nothing is buffered.
    NonBlocking { max_frames: usize },
}

/// Queue capacity in samples for `seconds` of audio at `rate_hz`.
///
/// Non-finite or non-positive `seconds` fall back to two seconds.
pub fn capacity_for(rate_hz: u32, channels: usize, seconds: f32) -> usize {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * secs).ceil() as usize;
    frames.saturating_mul(channels).max(channels)
}

impl SampleQueue {
    pub fn new(channels: usize, max_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            max_samples: max_samples.max(channels),
            inner: Mutex::new(Inner {
                samples: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Buffered frames at the time of the call.
    #[cfg(test)]
    fn len_frames(&self) -> usize {
        self.lock().samples.len() / self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// `true` once the producer closed the queue and every sample was consumed.
    pub fn is_drained(&self) -> bool {
        let g = self.lock();
        g.closed && g.samples.is_empty()
    }

    /// Mark the queue finished and wake every waiter. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.cv.notify_all();
    }

    /// Close the queue and drop anything still buffered.
    pub fn discard(&self) {
        {
            let mut g = self.lock();
            g.closed = true;
            g.samples.clear();
        }
        self.cv.notify_all();
    }

    /// Push samples, blocking while the queue is full.
    ///
    /// Returns `false` if the queue was closed before everything was pushed; the remaining
    /// samples are dropped and the producer should stop.
    pub fn push_blocking(&self, samples: &[f32]) -> bool {
        let mut offset = 0;
        while offset < samples.len() {
            let mut g = self.lock();
            while g.samples.len() >= self.max_samples && !g.closed {
                g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
            }
            if g.closed {
                return false;
            }

            let room = self.max_samples - g.samples.len();
            let take = room.min(samples.len() - offset);
            g.samples.extend(&samples[offset..offset + take]);
            offset += take;

            drop(g);
            self.cv.notify_all();
        }
        true
    }

    /// Pop whole interleaved frames according to `strategy`.
    pub fn pop(&self, strategy: PopStrategy) -> Option<Vec<f32>> {
        let mut g = self.lock();
        let take_samples = match strategy {
            PopStrategy::BlockingExact { frames } => {
                let want = frames.max(1) * self.channels;
                while g.samples.len() < want && !g.closed {
                    g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
                }
                if g.samples.len() < want {
                    return None;
                }
                want
            }
            PopStrategy::BlockingUpTo { max_frames } => {
                while g.samples.len() < self.channels && !g.closed {
                    g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
                }
                self.whole_frames(g.samples.len(), max_frames)
            }
            PopStrategy::NonBlocking { max_frames } => {
                self.whole_frames(g.samples.len(), max_frames)
            }
        };
        if take_samples == 0 {
            return None;
        }

        let out: Vec<f32> = g.samples.drain(..take_samples).collect();
        drop(g);
        self.cv.notify_all();
        Some(out)
    }

    fn whole_frames(&self, buffered_samples: usize, max_frames: usize) -> usize {
        (buffered_samples / self.channels).min(max_frames) * self.channels
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn capacity_for_falls_back_on_bad_seconds() {
        assert_eq!(capacity_for(48_000, 2, 2.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, -1.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, f32::NAN), 192_000);
        assert_eq!(capacity_for(44_100, 1, 0.5), 22_050);
    }

    #[test]
    fn pop_nonblocking_on_empty_queue_is_none() {
        let q = SampleQueue::new(2, 16);
        assert!(q.pop(PopStrategy::NonBlocking { max_frames: 4 }).is_none());
    }

    #[test]
    fn pop_nonblocking_returns_whole_frames_only() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = q.pop(PopStrategy::NonBlocking { max_frames: 8 }).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(q.len_frames(), 0);
    }

    #[test]
    fn pop_blocking_exact_waits_for_producer() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let consumer = q.clone();
        let handle = thread::spawn(move || {
            consumer
                .pop(PopStrategy::BlockingExact { frames: 3 })
                .map(|v| v.len())
        });

        q.push_blocking(&[0.1, 0.2, 0.3, 0.4]);
        q.push_blocking(&[0.5, 0.6]);

        assert_eq!(handle.join().unwrap(), Some(6));
    }

    #[test]
    fn pop_blocking_up_to_drains_tail_then_reports_end() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0]);
        q.close();

        let tail = q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).unwrap();
        assert_eq!(tail.len(), 4);
        assert!(q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).is_none());
        assert!(q.is_drained());
    }

    #[test]
    fn push_blocking_stops_when_closed_while_full() {
        let q = Arc::new(SampleQueue::new(1, 2));
        let producer = q.clone();
        let handle = thread::spawn(move || producer.push_blocking(&[1.0, 2.0, 3.0, 4.0]));

        while q.len_frames() < 2 {
            thread::yield_now();
        }
        q.close();

        assert!(!handle.join().unwrap());
    }

    #[test]
    fn discard_drops_buffered_samples() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0]);
        q.discard();
        assert!(q.is_drained());
        assert!(q.pop(PopStrategy::NonBlocking { max_frames: 1 }).is_none());
    }
}

//! Bounded frame queue between the feeder, resampler and output callback.
//!
//! Every stage downstream of [`wav_stream::WavStream`] speaks stereo [`Sample`] frames, so
//! the queue stores whole frames and never has to reassemble partial ones.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use wav_stream::Sample;

/// Thread-safe bounded FIFO of stereo frames.
///
/// A single [`Condvar`] signals any state change (push, pop, close). The `done` flag lives
/// under the same mutex as the frames so closing cannot race with a waiting pop.
pub struct FrameQueue {
    inner: Mutex<QueueInner>,
    cv: Condvar,
    max_frames: usize,
}

struct QueueInner {
    frames: VecDeque<Sample>,
    done: bool,
    /// Frames ever accepted by `push_blocking`.
    pushed: u64,
}

/// How [`FrameQueue::pop`] waits for data.
pub enum PopStrategy {
    /// Block until exactly `frames` are available; `None` if closed first.
    BlockingExact { frames: usize },
    /// Block until at least one frame is available, then take up to `max_frames`.
    BlockingUpTo { max_frames: usize },
    /// Take up to `max_frames` immediately; `None` if empty.
    NonBlocking { max_frames: usize },
}

/// Queue capacity in frames for `buffer_seconds` of audio at `rate_hz`.
///
/// Non-finite or non-positive durations fall back to two seconds.
pub fn calc_max_buffered_frames(rate_hz: u32, buffer_seconds: f32) -> usize {
    let secs = if buffer_seconds.is_finite() && buffer_seconds > 0.0 {
        buffer_seconds
    } else {
        2.0
    };
    ((rate_hz as f32 * secs).ceil() as usize).max(1)
}

impl FrameQueue {
    pub fn new(max_frames: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                frames: VecDeque::new(),
                done: false,
                pushed: 0,
            }),
            cv: Condvar::new(),
            max_frames: max_frames.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Buffered frames right now (may change immediately).
    pub fn len_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Total frames pushed over the queue's lifetime.
    ///
    /// Once the queue is closed this is the exact number of frames a consumer will see.
    pub fn pushed_frames(&self) -> u64 {
        self.lock().pushed
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// Mark the queue finished and wake every waiter. Idempotent.
    ///
    /// Buffered frames stay poppable; blocked pushes return and drop their remainder.
    pub fn close(&self) {
        self.lock().done = true;
        self.cv.notify_all();
    }

    /// Push frames, blocking while the queue is full.
    ///
    /// Returns `false` if the queue was closed before everything was pushed.
    pub fn push_blocking(&self, frames: &[Sample]) -> bool {
        let mut offset = 0;
        while offset < frames.len() {
            let mut g = self.lock();
            while g.frames.len() >= self.max_frames && !g.done {
                g = self.cv.wait(g).unwrap_or_else(|e| e.into_inner());
            }
            if g.done {
                return false;
            }

            let room = self.max_frames - g.frames.len();
            let take = room.min(frames.len() - offset);
            g.frames.extend(&frames[offset..offset + take]);
            g.pushed += take as u64;
            offset += take;

            drop(g);
            self.cv.notify_all();
        }
        true
    }

    /// Pop frames using `strategy`.
    ///
    /// Returns `None` when nothing can satisfy the request (empty, or closed and drained).
    pub fn pop(&self, strategy: PopStrategy) -> Option<Vec<Sample>> {
        let mut g = self.lock();
        let take = match strategy {
            PopStrategy::BlockingExact { frames } => {
                while g.frames.len() < frames && !g.done {
                    g = self.cv.wait(g).unwrap_or_else(|e| e.into_inner());
                }
                if g.frames.len() < frames {
                    return None;
                }
                frames
            }
            PopStrategy::BlockingUpTo { max_frames } => {
                while g.frames.is_empty() && !g.done {
                    g = self.cv.wait(g).unwrap_or_else(|e| e.into_inner());
                }
                if g.frames.is_empty() {
                    return None;
                }
                g.frames.len().min(max_frames)
            }
            PopStrategy::NonBlocking { max_frames } => {
                let take = g.frames.len().min(max_frames);
                if take == 0 {
                    return None;
                }
                take
            }
        };

        let out: Vec<Sample> = g.frames.drain(..take).collect();
        drop(g);
        self.cv.notify_all();
        Some(out)
    }

    /// Block until the queue is closed and drained, or `cancel` is set.
    ///
    /// Returns `true` on a normal drain, `false` on cancel.
    pub fn wait_drained_or_cancel(&self, cancel: &AtomicBool) -> bool {
        let mut g = self.lock();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            if g.done && g.frames.is_empty() {
                return true;
            }
            let (ng, _timeout) = self
                .cv
                .wait_timeout(g, Duration::from_millis(50))
                .unwrap_or_else(|e| e.into_inner());
            g = ng;
        }
    }
}

//! Frame handoff between the emulation thread and the renderer.
//!
//! A completed frame is a tiny summary record (frame number plus the phosphor
//! ring position at the frame boundary); the dots themselves travel through
//! the phosphor ring. Two slots with ready flags form a lock-free
//! double-buffer: the producer fills a free slot and sets its flag with a
//! release store, the consumer takes a ready slot with an acquire load and
//! clears the flag. If the renderer falls behind and both slots are still
//! ready, the new frame is dropped; the phosphor ring already carries the
//! accumulated dots, so nothing is lost but a wakeup.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Summary of one completed 50 Hz frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// Monotonic frame counter, starting at 1 for the first completed frame.
    pub number: u64,
    /// Phosphor ring `add` index at the instant the frame completed. Dots
    /// appended before this index belong to this frame or an earlier one.
    pub dot_end: u32,
}

struct Slot {
    ready: AtomicBool,
    frame: UnsafeCell<Frame>,
}

struct Channel {
    slots: [Slot; 2],
}

// The ready flag transfers slot ownership: false = producer side may write
// the cell, true = consumer side may read it. All flag stores use
// release/acquire pairs.
unsafe impl Sync for Channel {}
unsafe impl Send for Channel {}

pub struct FrameSender {
    channel: Arc<Channel>,
    next: usize,
}

pub struct FrameReceiver {
    channel: Arc<Channel>,
    next: usize,
}

/// Create a connected sender/receiver pair.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let channel = Arc::new(Channel {
        slots: [
            Slot {
                ready: AtomicBool::new(false),
                frame: UnsafeCell::new(Frame::default()),
            },
            Slot {
                ready: AtomicBool::new(false),
                frame: UnsafeCell::new(Frame::default()),
            },
        ],
    });
    (
        FrameSender {
            channel: Arc::clone(&channel),
            next: 0,
        },
        FrameReceiver { channel, next: 0 },
    )
}

impl FrameSender {
    /// Publish a completed frame. Returns false if both slots were still
    /// ready (consumer behind) and the frame was dropped.
    pub fn publish(&mut self, frame: Frame) -> bool {
        for _ in 0..2 {
            let slot = &self.channel.slots[self.next];
            if !slot.ready.load(Ordering::Acquire) {
                unsafe {
                    *slot.frame.get() = frame;
                }
                slot.ready.store(true, Ordering::Release);
                self.next ^= 1;
                return true;
            }
            self.next ^= 1;
        }
        false
    }
}

impl FrameReceiver {
    /// Non-blocking consume of the next ready frame, if any.
    pub fn try_take(&mut self) -> Option<Frame> {
        for _ in 0..2 {
            let slot = &self.channel.slots[self.next];
            if slot.ready.load(Ordering::Acquire) {
                let frame = unsafe { *slot.frame.get() };
                slot.ready.store(false, Ordering::Release);
                self.next ^= 1;
                return Some(frame);
            }
            self.next ^= 1;
        }
        None
    }
}

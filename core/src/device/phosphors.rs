//! Phosphor trail: a lock-free single-producer/single-consumer dot ring.
//!
//! The video cycle appends dots at the `add` index; the renderer walks the
//! alive range `[fade, add)`, decays each dot's brightness, and retires the
//! leading run of fully faded dots by advancing `fade`. Each index is
//! published with a release store and sampled with an acquire load, so a
//! slot is handed across threads exactly once per lifecycle:
//!
//! - outside `[fade, add)` the slot is dead and the producer may rewrite it;
//! - inside the range the consumer owns it and may mutate its `z`.
//!
//! When the ring is full the producer reclaims the oldest slot by bumping
//! `fade` itself (compare-exchange, since the consumer also moves `fade`
//! forward). A dot reclaimed while the renderer is mid-sweep yields one
//! stale sample for one frame, which is exactly how the tube itself discards
//! phosphor history.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Default ring capacity: a few frames of worst-case beam-on drawing.
pub const PHOSPHOR_CAPACITY: usize = 50_000;

/// One point of brightness on the tube. Coordinates are screen units (the
/// gun's internal units divided by 64); `is_start` marks the first dot of a
/// stroke so the renderer can join the rest into line segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Phosphor {
    pub x: i16,
    pub y: i16,
    pub z: u8,
    pub orig_z: u8,
    pub is_start: bool,
}

struct Ring {
    dots: Box<[UnsafeCell<Phosphor>]>,
    add: AtomicU32,
    fade: AtomicU32,
}

// Slot ownership is transferred through the add/fade indices; see the module
// docs for the discipline.
unsafe impl Sync for Ring {}
unsafe impl Send for Ring {}

impl Ring {
    fn wrap(&self, index: u32) -> u32 {
        if index as usize >= self.dots.len() {
            index - self.dots.len() as u32
        } else {
            index
        }
    }

    fn alive(&self) -> usize {
        let add = self.add.load(Ordering::Acquire) as usize;
        let fade = self.fade.load(Ordering::Acquire) as usize;
        (add + self.dots.len() - fade) % self.dots.len()
    }
}

/// Producer half, owned by the video cycle.
pub struct PhosphorWriter {
    ring: Arc<Ring>,
}

/// Consumer half, owned by the renderer.
pub struct PhosphorReader {
    ring: Arc<Ring>,
}

/// Create a connected writer/reader pair over a ring of `capacity` slots.
/// At most `capacity - 1` dots are alive at once.
pub fn phosphor_ring(capacity: usize) -> (PhosphorWriter, PhosphorReader) {
    let dots = (0..capacity)
        .map(|_| UnsafeCell::new(Phosphor::default()))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let ring = Arc::new(Ring {
        dots,
        add: AtomicU32::new(0),
        fade: AtomicU32::new(0),
    });
    (
        PhosphorWriter {
            ring: Arc::clone(&ring),
        },
        PhosphorReader { ring },
    )
}

impl PhosphorWriter {
    /// Append one dot, reclaiming the oldest slot if the ring is full.
    pub fn append(&mut self, x: i16, y: i16, z: u8, is_start: bool) {
        let ring = &*self.ring;
        let add = ring.add.load(Ordering::Relaxed);
        let next = ring.wrap(add + 1);
        let fade = ring.fade.load(Ordering::Acquire);
        if next == fade {
            // Full: push the oldest dot out. A failed exchange means the
            // consumer just retired it for us.
            let _ = ring.fade.compare_exchange(
                fade,
                ring.wrap(fade + 1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
        unsafe {
            *ring.dots[add as usize].get() = Phosphor {
                x,
                y,
                z,
                orig_z: z,
                is_start,
            };
        }
        ring.add.store(next, Ordering::Release);
    }

    /// Current `add` index; dots appended so far end here.
    pub fn cursor(&self) -> u32 {
        self.ring.add.load(Ordering::Relaxed)
    }

    /// Number of alive dots.
    pub fn alive(&self) -> usize {
        self.ring.alive()
    }
}

impl PhosphorReader {
    /// Walk every alive dot once, oldest first. The visitor may mutate the
    /// dot (typically decaying `z`); after the pass the leading run of dots
    /// whose `z` reached 0 is retired by advancing `fade`. Returns the
    /// number of dots visited.
    pub fn sweep(&mut self, mut visit: impl FnMut(&mut Phosphor)) -> usize {
        let ring = &*self.ring;
        let add = ring.add.load(Ordering::Acquire);
        let mut fade = ring.fade.load(Ordering::Relaxed);
        let mut retiring = true;
        let mut seen = 0;
        let mut index = fade;
        while index != add {
            let dot = unsafe { &mut *ring.dots[index as usize].get() };
            visit(dot);
            seen += 1;
            if retiring {
                if dot.z == 0 {
                    let next = ring.wrap(index + 1);
                    match ring.fade.compare_exchange(
                        fade,
                        next,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => fade = next,
                        // The producer reclaimed past us; stop retiring.
                        Err(_) => retiring = false,
                    }
                } else {
                    retiring = false;
                }
            }
            index = ring.wrap(index + 1);
        }
        seen
    }

    /// Copy of the alive dots, oldest first. Diagnostic helper; the renderer
    /// proper uses [`PhosphorReader::sweep`].
    pub fn snapshot(&self) -> Vec<Phosphor> {
        let ring = &*self.ring;
        let add = ring.add.load(Ordering::Acquire);
        let mut index = ring.fade.load(Ordering::Relaxed);
        let mut dots = Vec::with_capacity(ring.alive());
        while index != add {
            dots.push(unsafe { *ring.dots[index as usize].get() });
            index = ring.wrap(index + 1);
        }
        dots
    }

    /// Number of alive dots.
    pub fn alive(&self) -> usize {
        self.ring.alive()
    }
}

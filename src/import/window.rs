//! Byte-window arithmetic and cross-window line reassembly
//!
//! A source of `L` bytes is cut into windows of `step = ceil(L / 100)` bytes
//! so that a run advances its percent roughly once per window. Windows are
//! half-open `[from, to)`: consecutive windows share no byte, and the final
//! window always ends at `L`.

use crate::source::decode_line;

/// Number of progress increments a chunked import aims for
pub const PROGRESS_STEPS: u64 = 100;

/// Window layout for one range-capable source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    total_length: u64,
    step: u64,
}

impl ChunkPlan {
    /// Lay out windows over `total_length` bytes; `None` for an empty source
    pub fn new(total_length: u64) -> Option<Self> {
        if total_length == 0 {
            return None;
        }
        Some(Self {
            total_length,
            step: total_length.div_ceil(PROGRESS_STEPS),
        })
    }

    /// Source length in bytes
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Window size in bytes
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Number of windows needed to cover the source
    pub fn window_count(&self) -> u64 {
        self.total_length.div_ceil(self.step)
    }

    /// The window starting at byte 0
    pub fn first_window(&self) -> ChunkWindow {
        ChunkWindow {
            from: 0,
            to: self.step.min(self.total_length),
        }
    }

    /// The window after `window`, or `None` once the source is covered
    pub fn next_window(&self, window: ChunkWindow) -> Option<ChunkWindow> {
        if self.is_final(window) {
            return None;
        }
        Some(ChunkWindow {
            from: window.to,
            to: window.to.saturating_add(self.step).min(self.total_length),
        })
    }

    /// Whether `window` reaches the end of the source
    pub fn is_final(&self, window: ChunkWindow) -> bool {
        window.to >= self.total_length
    }

    /// Every window in order
    pub fn windows(&self) -> impl Iterator<Item = ChunkWindow> + '_ {
        std::iter::successors(Some(self.first_window()), move |w| self.next_window(*w))
    }
}

/// One half-open byte span `[from, to)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkWindow {
    /// First byte
    pub from: u64,
    /// One past the last byte
    pub to: u64,
}

impl ChunkWindow {
    /// Last byte, for an inclusive `Range` header
    pub fn last_byte(&self) -> u64 {
        self.to.saturating_sub(1)
    }

    /// Bytes covered
    pub fn len(&self) -> u64 {
        self.to - self.from
    }

    /// Whether the window covers no bytes
    pub fn is_empty(&self) -> bool {
        self.to == self.from
    }
}

/// Line fragment left over from the previous window
///
/// Held as raw bytes: the fragment may end inside a multi-byte character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Carry(Vec<u8>);

impl Carry {
    /// The pending fragment
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reassemble a window's lines with the pending fragment
    ///
    /// The fragment is prepended to the first segment, then the last segment
    /// is held back as the new fragment. Returns the complete lines, decoded.
    pub fn absorb(&mut self, mut segments: Vec<Vec<u8>>) -> Vec<String> {
        let pending = std::mem::take(&mut self.0);
        match segments.first_mut() {
            Some(first) => {
                first.splice(0..0, pending);
            }
            None => segments.push(pending),
        }
        self.0 = segments.pop().unwrap_or_default();
        segments.iter().map(|line| decode_line(line)).collect()
    }

    /// Give up the pending fragment
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

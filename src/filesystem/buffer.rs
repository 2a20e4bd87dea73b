// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Per-handle read-ahead buffer.

use bytes::Bytes;
use std::ops::Range;

/// Where the buffer stands relative to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Nothing fetched yet, or reset by a direct read
    Empty,
    /// Serving bytes from the window starting at `start`; `cursor` is the next byte to hand out
    Buffered { start: u64, cursor: usize },
    /// The window starting at `start` is kept but not serving; a read landing
    /// inside it switches back to `Buffered`
    Bypassed { start: u64 },
}

/// A fixed-capacity window over a remote object.
///
/// The window holds at most `capacity` bytes. A refill takes ownership of the
/// fetched `Bytes` instead of copying into a reused allocation, so the previous
/// window is released on every refill.
#[derive(Debug)]
pub struct ReadBuffer {
    capacity: u64,
    data: Bytes,
    state: BufferState,
}

impl ReadBuffer {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            data: Bytes::new(),
            state: BufferState::Empty,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// File range covered by the window, if one is held.
    pub fn window(&self) -> Option<Range<u64>> {
        match self.state {
            BufferState::Empty => None,
            BufferState::Buffered { start, .. } | BufferState::Bypassed { start } => {
                Some(start..start + self.data.len() as u64)
            }
        }
    }

    /// Position the cursor at `offset`.
    ///
    /// Returns `true` if `offset` lies inside the window, which then serves from
    /// there. Otherwise the window stops serving.
    pub fn position_at(&mut self, offset: u64) -> bool {
        match self.window() {
            Some(window) if window.contains(&offset) => {
                self.state = BufferState::Buffered {
                    start: window.start,
                    cursor: (offset - window.start) as usize,
                };
                true
            }
            _ => {
                self.bypass();
                false
            }
        }
    }

    /// Bytes left between the cursor and the end of the window.
    pub fn available(&self) -> usize {
        match self.state {
            BufferState::Buffered { cursor, .. } => self.data.len() - cursor,
            _ => 0,
        }
    }

    /// Copy as much as possible into `out`, advancing the cursor. Returns the count copied.
    pub fn copy_to(&mut self, out: &mut [u8]) -> usize {
        let BufferState::Buffered { start, cursor } = self.state else {
            return 0;
        };
        let count = out.len().min(self.data.len() - cursor);
        out[..count].copy_from_slice(&self.data[cursor..cursor + count]);
        self.state = BufferState::Buffered {
            start,
            cursor: cursor + count,
        };
        count
    }

    /// Replace the window with `data` fetched at `start` and serve from its beginning.
    pub fn refill(&mut self, start: u64, data: Bytes) {
        debug_assert!(data.len() as u64 <= self.capacity);
        self.data = data;
        self.state = BufferState::Buffered { start, cursor: 0 };
    }

    /// Stop serving from the window but keep it for later reads.
    pub fn bypass(&mut self) {
        self.state = match self.state {
            BufferState::Buffered { start, .. } | BufferState::Bypassed { start } => {
                BufferState::Bypassed { start }
            }
            BufferState::Empty => BufferState::Empty,
        };
    }

    /// Drop the window entirely.
    pub fn reset(&mut self) {
        self.data = Bytes::new();
        self.state = BufferState::Empty;
    }
}

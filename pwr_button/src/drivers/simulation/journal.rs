//! Journal of simulated line operations.

use pwr_common::line::types::{Level, LineId};
use std::collections::VecDeque;
use std::time::Instant;

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// `set_active_low()`
    ActiveLow,
    /// `configure_output()` with the initial level
    Configure(Level),
    /// `write_level()`
    Write(Level),
    /// `release()`
    Release,
}

/// A recorded operation on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    /// Target line.
    pub line: LineId,
    /// What happened.
    pub op: LineOp,
    /// When it happened.
    pub at: Instant,
}

/// Events kept by a default [`SimulationDriver`](super::SimulationDriver).
pub const DEFAULT_JOURNAL_CAPACITY: usize = 4096;

/// Bounded event log with per-line views. Once full, the oldest event is
/// dropped for each new one.
#[derive(Debug)]
pub(crate) struct Journal {
    events: VecDeque<LineEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for Journal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl Journal {
    /// A capacity of 0 records nothing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_JOURNAL_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    pub(crate) fn record(&mut self, line: LineId, op: LineOp) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(LineEvent {
            line,
            op,
            at: Instant::now(),
        });
    }

    pub(crate) fn events(&self) -> impl Iterator<Item = &LineEvent> + '_ {
        self.events.iter()
    }

    pub(crate) fn for_line(&self, line: LineId) -> impl Iterator<Item = &LineEvent> + '_ {
        self.events.iter().filter(move |e| e.line == line)
    }

    /// Events evicted or not recorded since the last `clear()`.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

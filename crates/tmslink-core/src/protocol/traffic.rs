//! Traffic history
//!
//! Keeps the most recent frames sent and received by a session, with their
//! direction and time since the session started, for failure reports.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write;
use std::time::{Duration, Instant};

use super::StatusFlags;

/// Direction of a frame on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Host to stimulator
    Sent,
    /// Stimulator to host
    Received,
}

/// A single frame in the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficEntry {
    /// Which way the frame went
    pub direction: Direction,
    /// The complete frame
    pub bytes: Vec<u8>,
    /// Time since the session started
    pub elapsed: Duration,
}

/// Bounded, oldest-first history of frames
#[derive(Debug)]
pub struct TrafficLog {
    entries: VecDeque<TrafficEntry>,
    capacity: usize,
    start_time: Instant,
}

impl TrafficLog {
    /// Create a history keeping at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            start_time: Instant::now(),
        }
    }

    /// Record a frame, evicting the oldest one when full
    pub fn record(&mut self, direction: Direction, bytes: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TrafficEntry {
            direction,
            bytes: bytes.to_vec(),
            elapsed: self.start_time.elapsed(),
        });
    }

    /// Entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TrafficEntry> {
        self.entries.iter()
    }

    /// Number of frames held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every recorded frame
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render the history and the last known status as text
    pub fn report(&self, status: Option<StatusFlags>) -> String {
        let mut out = String::from("> Communication History:\n");
        for entry in &self.entries {
            let prefix = match entry.direction {
                Direction::Sent => "Out:",
                Direction::Received => "In: ",
            };
            let printable = entry.bytes.escape_ascii().to_string();
            let hex: Vec<String> = entry.bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let _ = writeln!(
                out,
                " - {} {:<12} [{}]  ({:.1} ms)",
                prefix,
                printable,
                hex.join(" "),
                entry.elapsed.as_secs_f64() * 1000.0
            );
        }

        out.push_str("> System Status:\n");
        match status {
            Some(status) => {
                for (field, value) in status.fields() {
                    let _ = writeln!(out, " - {}: {}", field, value);
                }
            }
            None => out.push_str(" - unknown\n"),
        }
        out
    }
}

/*!
 * Waiting Queue
 * FIFO of processes that found no room, retried after every free
 */

use super::types::ProcessTemplate;
use crate::core::types::Size;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A process parked until memory frees up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub template: ProcessTemplate,
    pub requested_size: Size,
}

impl WaitingEntry {
    pub fn new(template: ProcessTemplate) -> Self {
        let requested_size = template.total_size();
        Self {
            template,
            requested_size,
        }
    }
}

/// Strict FIFO with full scan: a failing entry never blocks later ones
#[derive(Debug, Clone, Default)]
pub struct WaitingQueue {
    entries: VecDeque<WaitingEntry>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its zero-based position
    pub fn push(&mut self, entry: WaitingEntry) -> usize {
        self.entries.push_back(entry);
        self.entries.len() - 1
    }

    /// Offer every entry once, front to back.
    ///
    /// Entries for which `admit` returns true leave the queue; the rest keep
    /// their relative order. Returns the number admitted.
    pub fn retry_all<F>(&mut self, mut admit: F) -> usize
    where
        F: FnMut(&WaitingEntry) -> bool,
    {
        let pending = std::mem::take(&mut self.entries);
        let scanned = pending.len();

        for entry in pending {
            if !admit(&entry) {
                self.entries.push_back(entry);
            }
        }

        let admitted = scanned - self.entries.len();
        debug!(
            "Waiting queue scan: {} entries, {} admitted, {} still waiting",
            scanned,
            admitted,
            self.entries.len()
        );
        admitted
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

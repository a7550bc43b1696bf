//! Bounded agent memory.
//!
//! Each step records a `{perception, decision, action}` triple. Only the
//! latest `capacity` entries stay in memory; the full history lives in the
//! persisted action log. The `recorded` counter keeps counting past the
//! bound, so callers can tell how many steps an agent has taken.

use std::collections::VecDeque;

use citylab_types::Action;

use crate::agent::Decision;
use crate::perception::Perception;

/// Entries retained when no capacity is configured.
pub const DEFAULT_MEMORY_CAPACITY: usize = 1;

/// Largest capacity an agent memory accepts: one simulated day of steps.
pub const MAX_MEMORY_CAPACITY: usize = 1440;

/// Slots allocated up front; larger memories grow as they fill.
const PREALLOCATED_ENTRIES: usize = 16;

/// One remembered step.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// What the agent perceived.
    pub perception: Perception,
    /// What it decided.
    pub decision: Decision,
    /// What it emitted.
    pub action: Action,
}

/// Append-only ring buffer of recent steps.
#[derive(Debug, Clone)]
pub struct Memory {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
    recorded: u64,
}

impl Memory {
    /// Memory holding at most `capacity` entries, clamped to
    /// `1..=MAX_MEMORY_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_MEMORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity.min(PREALLOCATED_ENTRIES)),
            capacity,
            recorded: 0,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&mut self, entry: MemoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.recorded = self.recorded.saturating_add(1);
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&MemoryEntry> {
        self.entries.back()
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries ever recorded.
    pub const fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Most entries retained.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use citylab_types::{ActionData, AgentId, CityState};
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::agent::DecisionOrigin;

    fn entry(tick: u64) -> MemoryEntry {
        let agent_id = AgentId::mint(0, "resident_0");
        let data = ActionData::Wait {
            reason: String::from("idle"),
        };
        MemoryEntry {
            perception: Perception {
                agent_id,
                tick,
                simulation_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                hour: 0,
                day: 0,
                location: None,
                nearby_agents: Vec::new(),
                city_state: Arc::new(CityState::default()),
                events: Vec::new(),
            },
            decision: Decision {
                action: data.clone(),
                rationale: String::new(),
                confidence: 1.0,
                origin: DecisionOrigin::Rule,
                prompt: None,
            },
            action: Action {
                agent_id,
                tick,
                action_type: data.action_type(),
                action_data: data,
                rationale: String::new(),
                retrieved_docs: Vec::new(),
                prompt: None,
                confidence: 1.0,
            },
        }
    }

    #[test]
    fn keeps_only_latest_entries() {
        let mut memory = Memory::with_capacity(2);
        for tick in 0..5 {
            memory.record(entry(tick));
        }
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.recorded(), 5);
        let ticks: Vec<u64> = memory.entries().map(|e| e.action.tick).collect();
        assert_eq!(ticks, vec![3, 4]);
        assert_eq!(memory.latest().unwrap().action.tick, 4);
    }

    #[test]
    fn zero_capacity_still_keeps_one() {
        let mut memory = Memory::with_capacity(0);
        memory.record(entry(0));
        memory.record(entry(1));
        assert_eq!(memory.len(), 1);
        assert!(!memory.is_empty());
    }

    #[test]
    fn oversized_capacity_is_clamped() {
        let mut memory = Memory::with_capacity(usize::MAX);
        for tick in 0..3 {
            memory.record(entry(tick));
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.capacity(), MAX_MEMORY_CAPACITY);
    }
}

//! Event collection, canonical ordering and per-tier persistence

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::event::ConjunctionEvent;
use super::risk::RiskTier;
use crate::error::Result;

/// Append-only event buffer shared by detection workers
#[derive(Debug, Default)]
pub struct EventSink {
    events: Mutex<Vec<ConjunctionEvent>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ConjunctionEvent) {
        self.events.lock().push(event);
    }

    /// Append a tick's worth of events under a single lock
    pub fn extend(&self, events: Vec<ConjunctionEvent>) {
        if events.is_empty() {
            return;
        }
        self.events.lock().extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the sink and put events in canonical order
    pub fn finish(self) -> EventCatalog {
        let mut events = self.events.into_inner();
        events.sort_by(ConjunctionEvent::canonical_cmp);
        if events.is_empty() {
            log::warn!("No conjunctions detected");
        }
        EventCatalog { events }
    }
}

/// Events in canonical (primary, hazard, timestamp) order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    events: Vec<ConjunctionEvent>,
}

impl EventCatalog {
    pub fn events(&self) -> &[ConjunctionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events of one tier, still in canonical order
    pub fn tier(&self, tier: RiskTier) -> impl Iterator<Item = &ConjunctionEvent> {
        self.events.iter().filter(move |e| e.risk() == tier)
    }

    /// Split into one collection per tier. Tiers without events are absent.
    pub fn partition(&self) -> BTreeMap<RiskTier, Vec<&ConjunctionEvent>> {
        let mut tiers: BTreeMap<RiskTier, Vec<&ConjunctionEvent>> = BTreeMap::new();
        for event in &self.events {
            tiers.entry(event.risk()).or_default().push(event);
        }
        tiers
    }

    /// Event count per tier, zero-filled
    pub fn counts(&self) -> BTreeMap<RiskTier, usize> {
        let mut counts: BTreeMap<RiskTier, usize> =
            RiskTier::ALL.into_iter().map(|t| (t, 0)).collect();
        for event in &self.events {
            *counts.entry(event.risk()).or_default() += 1;
        }
        counts
    }

    /// Write `<tier>_risk_intervals.csv` for every non-empty tier
    pub fn write_tier_files(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (tier, events) in self.partition() {
            let path = dir.join(tier.file_name());
            let mut writer = csv::Writer::from_path(&path)?;
            for event in &events {
                writer.serialize(event.to_row())?;
            }
            writer.flush()?;

            log::info!("Saved {} {} risk events to {:?}", events.len(), tier, path);
            written.push(path);
        }
        Ok(written)
    }
}

//! In-memory working copy of the signed-in principal's lead records.

use shared::domain::{Lead, LeadId};
use tokio::sync::broadcast;

/// Published to store observers on every write, before control returns to
/// the writer.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Upserted(Lead),
    Removed(LeadId),
    Replaced(Vec<Lead>),
}

/// Insertion-ordered record holder. Reads are public; writes are reserved
/// for the mutation engine's protocol steps.
#[derive(Debug)]
pub struct LeadStore {
    leads: Vec<Lead>,
    events: broadcast::Sender<StoreEvent>,
}

impl LeadStore {
    pub(crate) fn new(events: broadcast::Sender<StoreEvent>) -> Self {
        Self {
            leads: Vec::new(),
            events,
        }
    }

    pub fn list(&self) -> Vec<Lead> {
        self.leads.clone()
    }

    pub fn get(&self, id: LeadId) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub(crate) fn position(&self, id: LeadId) -> Option<usize> {
        self.leads.iter().position(|lead| lead.id == id)
    }

    /// Replace the record with the same id in place, or append as the
    /// newest arrival.
    pub(crate) fn upsert(&mut self, lead: Lead) {
        match self.position(lead.id) {
            Some(index) => self.leads[index] = lead.clone(),
            None => self.leads.push(lead.clone()),
        }
        let _ = self.events.send(StoreEvent::Upserted(lead));
    }

    pub(crate) fn remove(&mut self, id: LeadId) -> Option<Lead> {
        let index = self.position(id)?;
        let removed = self.leads.remove(index);
        let _ = self.events.send(StoreEvent::Removed(id));
        Some(removed)
    }

    /// Rollback helper: put a removed record back at its old position.
    pub(crate) fn insert_at(&mut self, index: usize, lead: Lead) {
        let index = index.min(self.leads.len());
        self.leads.insert(index, lead.clone());
        let _ = self.events.send(StoreEvent::Upserted(lead));
    }

    pub(crate) fn replace_all(&mut self, leads: Vec<Lead>) {
        self.leads = leads.clone();
        let _ = self.events.send(StoreEvent::Replaced(leads));
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;

//! Pipeline stage transitions driven by drag-and-drop input.
//!
//! Gesture recognition itself (pointer capture, hit testing) belongs to the
//! presentation layer; this module only receives completed drops and turns
//! them into move mutations.

use shared::domain::{Lead, LeadId, LeadStatus};
use tracing::info;

use crate::{
    error::{MutationError, ValidationError},
    ClientEvent, CrmClient,
};

/// Minimum pointer displacement, in logical pixels, the gesture collaborator
/// requires before a drag starts. Keeps plain clicks from dispatching moves.
pub const DRAG_ACTIVATION_DISTANCE: f32 = 8.0;

/// A completed drag reported by the gesture collaborator: the dragged lead
/// and the stage column it was dropped on. Drops that end outside a valid
/// target are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDrop {
    pub lead_id: LeadId,
    pub destination: LeadStatus,
}

/// Whether entering `next` from `previous` earns the one-shot celebration.
/// Only transitions into the terminal stage qualify; a lead already in
/// `Won` never re-fires.
pub fn should_celebrate(previous: LeadStatus, next: LeadStatus) -> bool {
    next.is_terminal() && !previous.is_terminal()
}

impl CrmClient {
    /// Handle a drop from the gesture collaborator. Dropping a lead on its
    /// current stage is a no-op with no mutation dispatched; otherwise the
    /// move runs the optimistic mutation protocol, with the celebration
    /// emitted before the remote commit resolves.
    pub async fn drop_on_stage(&self, drop: StageDrop) -> Result<Option<Lead>, MutationError> {
        let Some(current) = self.lead(drop.lead_id).await else {
            return Err(ValidationError::UnknownLead(drop.lead_id).into());
        };
        if current.status == drop.destination {
            return Ok(None);
        }

        if should_celebrate(current.status, drop.destination) {
            info!(lead_id = %drop.lead_id, "deal won");
            let _ = self.events.send(ClientEvent::DealWon {
                lead_id: drop.lead_id,
            });
        }

        let moved = self.move_lead(drop.lead_id, drop.destination).await?;
        Ok(Some(moved))
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;

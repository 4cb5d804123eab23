//! Failure taxonomy for the mutation engine.

use shared::domain::LeadId;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Rejected in the precondition phase, before any remote call; the store is
/// never touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("lead name must not be empty")]
    EmptyName,
    #[error("lead value must be non-negative, got {0}")]
    NegativeValue(f64),
    #[error("no lead with id {0}")]
    UnknownLead(LeadId),
    #[error("lead {0} already has a mutation in flight")]
    MutationInFlight(LeadId),
    #[error("import payload is not a JSON array of lead records: {0}")]
    MalformedBatch(String),
    #[error("not signed in")]
    NoSession,
}

/// The operation a failed remote commit belonged to; labels user-facing
/// failure notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Add,
    Update,
    Move,
    Delete,
    Import,
    ClearAll,
}

impl MutationAction {
    pub fn describe(self) -> &'static str {
        match self {
            MutationAction::Add => "add lead",
            MutationAction::Update => "update lead",
            MutationAction::Move => "move lead",
            MutationAction::Delete => "delete lead",
            MutationAction::Import => "import leads",
            MutationAction::ClearAll => "clear all leads",
        }
    }
}

impl std::fmt::Display for MutationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("remote commit for {action} rejected: {source}")]
    RemoteCommit {
        action: MutationAction,
        #[source]
        source: GatewayError,
    },
}

#[derive(Debug, Error)]
pub enum AccountDeletionError {
    #[error("account data purge failed; session left active")]
    Purge(#[source] MutationError),
    #[error("account data purged but sign-out failed: {0}")]
    SignOut(anyhow::Error),
}

//! Client-resident core of the lead pipeline: an optimistic mutation engine
//! over an in-memory working copy, backed by an authoritative remote store.
//!
//! Every state-changing operation runs the same three-phase protocol:
//! precondition check, immediate local apply, remote commit. A rejected
//! commit rolls the working copy back to its pre-mutation snapshot and
//! surfaces a failure notification naming the attempted action; the store
//! never diverges from the remote for longer than one round trip.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{Lead, LeadId, LeadStatus, PrincipalId},
    protocol::{LeadDraft, LeadPatch},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod error;
pub mod gateway;
pub mod metrics;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{AccountDeletionError, MutationAction, MutationError, ValidationError};
pub use gateway::{GatewayError, HttpRemoteGateway, MissingRemoteGateway, RemoteGateway};
pub use metrics::{pipeline_metrics, PipelineMetrics, StageSummary};
pub use pipeline::{should_celebrate, StageDrop, DRAG_ACTIVATION_DISTANCE};
pub use session::{LocalSession, MissingSessionProvider, SessionEvent, SessionProvider};
pub use store::{LeadStore, StoreEvent};

/// Notifications for surfaces above the store: failures to report, session
/// transitions, and the one-shot celebration on a deal entering `Won`.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    SessionChanged(Option<PrincipalId>),
    DealWon { lead_id: LeadId },
    MutationFailed { action: MutationAction, message: String },
    ImportCompleted { count: usize },
}

struct EngineState {
    principal: Option<PrincipalId>,
    store: LeadStore,
    /// Ids with an unresolved remote commit. A second mutation against one
    /// of these is rejected in the precondition phase, so a rollback can
    /// never clobber another mutation's optimistic state.
    inflight: HashSet<LeadId>,
}

pub struct CrmClient {
    gateway: Arc<dyn RemoteGateway>,
    sessions: Arc<dyn SessionProvider>,
    inner: Mutex<EngineState>,
    store_events: broadcast::Sender<StoreEvent>,
    events: broadcast::Sender<ClientEvent>,
}

impl CrmClient {
    pub fn new(gateway: Arc<dyn RemoteGateway>, sessions: Arc<dyn SessionProvider>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let (store_events, _) = broadcast::channel(256);
        Arc::new(Self {
            gateway,
            sessions,
            inner: Mutex::new(EngineState {
                principal: None,
                store: LeadStore::new(store_events.clone()),
                inflight: HashSet::new(),
            }),
            store_events,
            events,
        })
    }

    /// Detached client with null collaborators, for surfaces that render
    /// before the real gateway and session are wired in.
    pub fn disconnected() -> Arc<Self> {
        Self::new(
            Arc::new(MissingRemoteGateway),
            Arc::new(MissingSessionProvider::new()),
        )
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Store-level change feed; fires synchronously with every write.
    pub fn subscribe_store(&self) -> broadcast::Receiver<StoreEvent> {
        self.store_events.subscribe()
    }

    /// Stable arrival-order snapshot of the working copy.
    pub async fn leads(&self) -> Vec<Lead> {
        self.inner.lock().await.store.list()
    }

    pub async fn lead(&self, id: LeadId) -> Option<Lead> {
        self.inner.lock().await.store.get(id).cloned()
    }

    /// Leads currently sitting in `stage`, in arrival order. Board columns
    /// are filters over the store, not separate storage.
    pub async fn leads_in_stage(&self, stage: LeadStatus) -> Vec<Lead> {
        self.inner
            .lock()
            .await
            .store
            .list()
            .into_iter()
            .filter(|lead| lead.status == stage)
            .collect()
    }

    pub async fn current_principal(&self) -> Option<PrincipalId> {
        self.inner.lock().await.principal
    }

    pub(crate) async fn session(&self) -> Result<PrincipalId, ValidationError> {
        self.inner
            .lock()
            .await
            .principal
            .ok_or(ValidationError::NoSession)
    }

    /// Mirror the auth collaborator: empty and re-populate the working copy
    /// whenever the signed-in principal changes.
    pub fn spawn_session_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let mut sessions = self.sessions.subscribe();
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Ok(event) = sessions.recv().await {
                match event {
                    SessionEvent::SignedIn(principal) => {
                        if let Err(err) = client.apply_sign_in(principal).await {
                            warn!(principal = %principal, "initial lead fetch failed: {err}");
                        }
                    }
                    SessionEvent::SignedOut => client.apply_sign_out().await,
                }
            }
        })
    }

    pub async fn apply_sign_in(&self, principal: PrincipalId) -> Result<(), GatewayError> {
        {
            let mut guard = self.inner.lock().await;
            guard.principal = Some(principal);
            guard.inflight.clear();
            guard.store.replace_all(Vec::new());
        }
        let _ = self
            .events
            .send(ClientEvent::SessionChanged(Some(principal)));
        self.refresh().await
    }

    pub async fn apply_sign_out(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.principal = None;
            guard.inflight.clear();
            guard.store.replace_all(Vec::new());
        }
        let _ = self.events.send(ClientEvent::SessionChanged(None));
    }

    /// Replace the working copy with the remote's view, in creation order.
    /// With no session the working copy is simply emptied.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let principal = { self.inner.lock().await.principal };
        let Some(principal) = principal else {
            self.inner.lock().await.store.replace_all(Vec::new());
            return Ok(());
        };
        let leads = self.gateway.list(principal).await?;
        info!(count = leads.len(), "working copy refreshed from remote");
        self.inner.lock().await.store.replace_all(leads);
        Ok(())
    }

    /// Create a lead. The record is visible in the working copy before the
    /// remote insert resolves; a rejected insert removes it again.
    pub async fn add_lead(&self, draft: LeadDraft) -> Result<Lead, MutationError> {
        validate_draft(&draft)?;
        let principal = self.session().await?;

        let now = Utc::now();
        let lead = Lead {
            id: LeadId::generate(),
            name: draft.name,
            email: draft.email,
            value: draft.value,
            status: draft.status,
            notes: draft.notes,
            created_at: now,
            last_updated: now,
        };

        {
            let mut guard = self.inner.lock().await;
            guard.store.upsert(lead.clone());
            guard.inflight.insert(lead.id);
        }

        let commit = self.gateway.insert(principal, vec![lead.clone()]).await;
        let mut guard = self.inner.lock().await;
        guard.inflight.remove(&lead.id);
        match commit {
            Ok(_confirmed) => {
                drop(guard);
                info!(lead_id = %lead.id, "lead added");
                Ok(lead)
            }
            Err(source) => {
                guard.store.remove(lead.id);
                drop(guard);
                self.report_failure(MutationAction::Add, &source);
                Err(MutationError::RemoteCommit {
                    action: MutationAction::Add,
                    source,
                })
            }
        }
    }

    /// Rewrite an existing lead's fields. The prior record is the rollback
    /// snapshot if the remote rejects the update.
    pub async fn update_lead(&self, id: LeadId, patch: LeadPatch) -> Result<Lead, MutationError> {
        self.update_with_action(id, patch, MutationAction::Update)
            .await
    }

    /// Status-only specialization of update, dispatched by the pipeline
    /// transition controller.
    pub async fn move_lead(
        &self,
        id: LeadId,
        destination: LeadStatus,
    ) -> Result<Lead, MutationError> {
        self.update_with_action(id, LeadPatch::status_only(destination), MutationAction::Move)
            .await
    }

    async fn update_with_action(
        &self,
        id: LeadId,
        mut patch: LeadPatch,
        action: MutationAction,
    ) -> Result<Lead, MutationError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
        }
        if let Some(value) = patch.value {
            if value < 0.0 {
                return Err(ValidationError::NegativeValue(value).into());
            }
        }
        let principal = self.session().await?;

        let (prior, updated) = {
            let mut guard = self.inner.lock().await;
            let Some(prior) = guard.store.get(id).cloned() else {
                return Err(ValidationError::UnknownLead(id).into());
            };
            if guard.inflight.contains(&id) {
                return Err(ValidationError::MutationInFlight(id).into());
            }
            let mut updated = prior.clone();
            patch.apply_to(&mut updated);
            updated.last_updated = Utc::now();
            guard.store.upsert(updated.clone());
            guard.inflight.insert(id);
            (prior, updated)
        };

        patch.last_updated = Some(updated.last_updated);
        let commit = self.gateway.update(principal, id, patch).await;
        let mut guard = self.inner.lock().await;
        guard.inflight.remove(&id);
        match commit {
            Ok(()) => {
                drop(guard);
                info!(lead_id = %id, action = %action, "lead updated");
                Ok(updated)
            }
            Err(source) => {
                guard.store.upsert(prior);
                drop(guard);
                self.report_failure(action, &source);
                Err(MutationError::RemoteCommit { action, source })
            }
        }
    }

    /// Delete a lead. On remote rejection the record is re-inserted at its
    /// old position.
    pub async fn delete_lead(&self, id: LeadId) -> Result<(), MutationError> {
        let principal = self.session().await?;

        let (position, removed) = {
            let mut guard = self.inner.lock().await;
            let Some(position) = guard.store.position(id) else {
                return Err(ValidationError::UnknownLead(id).into());
            };
            if guard.inflight.contains(&id) {
                return Err(ValidationError::MutationInFlight(id).into());
            }
            let Some(removed) = guard.store.remove(id) else {
                return Err(ValidationError::UnknownLead(id).into());
            };
            guard.inflight.insert(id);
            (position, removed)
        };

        let commit = self.gateway.delete(principal, id).await;
        let mut guard = self.inner.lock().await;
        guard.inflight.remove(&id);
        match commit {
            Ok(()) => {
                drop(guard);
                info!(lead_id = %id, "lead deleted");
                Ok(())
            }
            Err(source) => {
                guard.store.insert_at(position, removed);
                drop(guard);
                self.report_failure(MutationAction::Delete, &source);
                Err(MutationError::RemoteCommit {
                    action: MutationAction::Delete,
                    source,
                })
            }
        }
    }

    /// Two-step saga: purge all lead data, then end the session. A failed
    /// purge halts the saga with the session still active.
    pub async fn delete_account(&self) -> Result<(), AccountDeletionError> {
        self.clear_all()
            .await
            .map_err(AccountDeletionError::Purge)?;
        self.sessions
            .sign_out()
            .await
            .map_err(AccountDeletionError::SignOut)?;
        Ok(())
    }

    pub(crate) fn report_failure(&self, action: MutationAction, source: &GatewayError) {
        warn!(action = %action, "remote commit rejected, rolled back: {source}");
        let _ = self.events.send(ClientEvent::MutationFailed {
            action,
            message: source.to_string(),
        });
    }
}

fn validate_draft(draft: &LeadDraft) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if draft.value < 0.0 {
        return Err(ValidationError::NegativeValue(draft.value));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

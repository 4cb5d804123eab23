//! Shared fakes and builders for engine tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{Lead, LeadId, LeadStatus, PrincipalId},
    error::ErrorCode,
    protocol::{LeadDraft, LeadPatch},
};
use tokio::sync::{broadcast, Mutex, Notify};

use crate::{
    gateway::{GatewayError, RemoteGateway},
    session::LocalSession,
    ClientEvent, CrmClient,
};

/// Scripted remote: records every call, optionally failing each one.
pub(crate) struct RecordingGateway {
    fail_with: Option<String>,
    pub inserted: Mutex<Vec<Vec<Lead>>>,
    pub updates: Mutex<Vec<(LeadId, LeadPatch)>>,
    pub deletes: Mutex<Vec<LeadId>>,
    pub delete_all_calls: Mutex<u32>,
    pub list_calls: Mutex<u32>,
    pub list_response: Mutex<Vec<Lead>>,
}

impl RecordingGateway {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::with_failure(None))
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::with_failure(Some(message.into())))
    }

    fn with_failure(fail_with: Option<String>) -> Self {
        Self {
            fail_with,
            inserted: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            delete_all_calls: Mutex::new(0),
            list_calls: Mutex::new(0),
            list_response: Mutex::new(Vec::new()),
        }
    }

    pub async fn total_calls(&self) -> usize {
        self.inserted.lock().await.len()
            + self.updates.lock().await.len()
            + self.deletes.lock().await.len()
            + *self.delete_all_calls.lock().await as usize
            + *self.list_calls.lock().await as usize
    }

    fn outcome(&self) -> Result<(), GatewayError> {
        match &self.fail_with {
            Some(message) => Err(GatewayError::Rejected {
                code: ErrorCode::Internal,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteGateway for RecordingGateway {
    async fn insert(
        &self,
        _principal: PrincipalId,
        leads: Vec<Lead>,
    ) -> Result<Vec<Lead>, GatewayError> {
        self.inserted.lock().await.push(leads.clone());
        self.outcome()?;
        Ok(leads)
    }

    async fn update(
        &self,
        _principal: PrincipalId,
        id: LeadId,
        patch: LeadPatch,
    ) -> Result<(), GatewayError> {
        self.updates.lock().await.push((id, patch));
        self.outcome()
    }

    async fn delete(&self, _principal: PrincipalId, id: LeadId) -> Result<(), GatewayError> {
        self.deletes.lock().await.push(id);
        self.outcome()
    }

    async fn delete_all(&self, _principal: PrincipalId) -> Result<(), GatewayError> {
        *self.delete_all_calls.lock().await += 1;
        self.outcome()
    }

    async fn list(&self, _principal: PrincipalId) -> Result<Vec<Lead>, GatewayError> {
        *self.list_calls.lock().await += 1;
        self.outcome()?;
        Ok(self.list_response.lock().await.clone())
    }
}

/// Remote whose update calls park until released, keeping a commit window
/// open so tests can interleave a second mutation.
pub(crate) struct StalledGateway {
    pub entered: Notify,
    pub release: Notify,
}

impl StalledGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl RemoteGateway for StalledGateway {
    async fn insert(
        &self,
        _principal: PrincipalId,
        leads: Vec<Lead>,
    ) -> Result<Vec<Lead>, GatewayError> {
        Ok(leads)
    }

    async fn update(
        &self,
        _principal: PrincipalId,
        _id: LeadId,
        _patch: LeadPatch,
    ) -> Result<(), GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }

    async fn delete(&self, _principal: PrincipalId, _id: LeadId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn delete_all(&self, _principal: PrincipalId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn list(&self, _principal: PrincipalId) -> Result<Vec<Lead>, GatewayError> {
        Ok(Vec::new())
    }
}

pub(crate) async fn signed_in_client(gateway: Arc<dyn RemoteGateway>) -> Arc<CrmClient> {
    let principal = PrincipalId::generate();
    let client = CrmClient::new(gateway, Arc::new(LocalSession::signed_in(principal)));
    client.inner.lock().await.principal = Some(principal);
    client
}

pub(crate) async fn seed(client: &CrmClient, leads: &[Lead]) {
    let mut guard = client.inner.lock().await;
    for lead in leads {
        guard.store.upsert(lead.clone());
    }
}

pub(crate) fn draft(name: &str, value: f64) -> LeadDraft {
    LeadDraft {
        name: name.into(),
        email: String::new(),
        value,
        status: LeadStatus::default(),
        notes: String::new(),
    }
}

pub(crate) fn sample_lead(name: &str, value: f64, status: LeadStatus) -> Lead {
    let now = Utc::now();
    Lead {
        id: LeadId::generate(),
        name: name.into(),
        email: format!("{name}@example.test"),
        value,
        status,
        notes: String::new(),
        created_at: now,
        last_updated: now,
    }
}

pub(crate) fn drain_events(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

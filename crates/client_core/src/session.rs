//! Session/auth collaborator boundary. The core never owns credential
//! handling; it only observes who is signed in.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::PrincipalId;
use tokio::sync::{broadcast, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(PrincipalId),
    SignedOut,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_principal(&self) -> Option<PrincipalId>;
    async fn sign_out(&self) -> Result<()>;
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Null object: nobody is ever signed in.
pub struct MissingSessionProvider {
    events: broadcast::Sender<SessionEvent>,
}

impl MissingSessionProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for MissingSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for MissingSessionProvider {
    async fn current_principal(&self) -> Option<PrincipalId> {
        None
    }

    async fn sign_out(&self) -> Result<()> {
        Err(anyhow!("session provider is unavailable"))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// In-process session used by the terminal front-end and tests.
pub struct LocalSession {
    principal: Mutex<Option<PrincipalId>>,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            principal: Mutex::new(None),
            events,
        }
    }

    /// Start out already signed in, without broadcasting a transition.
    pub fn signed_in(principal: PrincipalId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            principal: Mutex::new(Some(principal)),
            events,
        }
    }

    pub async fn sign_in(&self, principal: PrincipalId) {
        *self.principal.lock().await = Some(principal);
        let _ = self.events.send(SessionEvent::SignedIn(principal));
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for LocalSession {
    async fn current_principal(&self) -> Option<PrincipalId> {
        *self.principal.lock().await
    }

    async fn sign_out(&self) -> Result<()> {
        *self.principal.lock().await = None;
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

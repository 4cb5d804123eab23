//! Thin contract for the authoritative remote store, plus its HTTP
//! implementation.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use shared::{
    domain::{Lead, LeadId, PrincipalId},
    error::{ApiError, ErrorCode},
    protocol::LeadPatch,
};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("remote transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote rejected request ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },
    #[error("remote gateway is unavailable")]
    Unavailable,
}

/// Remote operations for lead records, scoped to the owning principal. No
/// business logic lives behind this boundary.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Persist a batch of records, returning the remote-confirmed rows.
    async fn insert(
        &self,
        principal: PrincipalId,
        leads: Vec<Lead>,
    ) -> Result<Vec<Lead>, GatewayError>;

    async fn update(
        &self,
        principal: PrincipalId,
        id: LeadId,
        patch: LeadPatch,
    ) -> Result<(), GatewayError>;

    async fn delete(&self, principal: PrincipalId, id: LeadId) -> Result<(), GatewayError>;

    /// Remove every record owned by `principal`.
    async fn delete_all(&self, principal: PrincipalId) -> Result<(), GatewayError>;

    /// All records owned by `principal`, ordered by creation time.
    async fn list(&self, principal: PrincipalId) -> Result<Vec<Lead>, GatewayError>;
}

/// Null object wired in when no remote is configured.
pub struct MissingRemoteGateway;

#[async_trait]
impl RemoteGateway for MissingRemoteGateway {
    async fn insert(
        &self,
        _principal: PrincipalId,
        _leads: Vec<Lead>,
    ) -> Result<Vec<Lead>, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn update(
        &self,
        _principal: PrincipalId,
        _id: LeadId,
        _patch: LeadPatch,
    ) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn delete(&self, _principal: PrincipalId, _id: LeadId) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn delete_all(&self, _principal: PrincipalId) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn list(&self, _principal: PrincipalId) -> Result<Vec<Lead>, GatewayError> {
        Err(GatewayError::Unavailable)
    }
}

#[derive(Serialize)]
struct OwnerScope {
    principal_id: PrincipalId,
}

/// `RemoteGateway` over the remote store's REST surface. Every request
/// carries the owning principal as a query parameter.
pub struct HttpRemoteGateway {
    http: Client,
    base_url: Url,
}

impl HttpRemoteGateway {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

async fn checked(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ApiError>().await {
        Ok(body) => Err(GatewayError::Rejected {
            code: body.code,
            message: body.message,
        }),
        Err(_) => Err(GatewayError::Rejected {
            code: ErrorCode::Internal,
            message: format!("http status {status}"),
        }),
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn insert(
        &self,
        principal: PrincipalId,
        leads: Vec<Lead>,
    ) -> Result<Vec<Lead>, GatewayError> {
        let response = self
            .http
            .post(self.endpoint("/leads"))
            .query(&OwnerScope {
                principal_id: principal,
            })
            .json(&leads)
            .send()
            .await?;
        let confirmed = checked(response).await?.json().await?;
        Ok(confirmed)
    }

    async fn update(
        &self,
        principal: PrincipalId,
        id: LeadId,
        patch: LeadPatch,
    ) -> Result<(), GatewayError> {
        let response = self
            .http
            .patch(self.endpoint(&format!("/leads/{id}")))
            .query(&OwnerScope {
                principal_id: principal,
            })
            .json(&patch)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn delete(&self, principal: PrincipalId, id: LeadId) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/leads/{id}")))
            .query(&OwnerScope {
                principal_id: principal,
            })
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn delete_all(&self, principal: PrincipalId) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(self.endpoint("/leads"))
            .query(&OwnerScope {
                principal_id: principal,
            })
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn list(&self, principal: PrincipalId) -> Result<Vec<Lead>, GatewayError> {
        let leads = checked(
            self.http
                .get(self.endpoint("/leads"))
                .query(&OwnerScope {
                    principal_id: principal,
                })
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        Ok(leads)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;

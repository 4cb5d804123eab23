//! Bulk transfer: JSON export of the working copy, all-or-nothing import,
//! and the owner-wide clear used by account deletion.

use chrono::Utc;
use serde_json::Value;
use shared::{
    domain::{Lead, LeadId},
    protocol::LeadImportRecord,
};
use tracing::info;

use crate::{
    error::{MutationAction, MutationError, ValidationError},
    ClientEvent, CrmClient,
};

/// Decode an externally supplied payload into candidate records. The payload
/// must be a JSON array; one malformed element rejects the whole batch.
pub fn decode_import_payload(payload: &str) -> Result<Vec<LeadImportRecord>, ValidationError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| ValidationError::MalformedBatch(err.to_string()))?;
    let Value::Array(items) = value else {
        return Err(ValidationError::MalformedBatch(
            "expected a JSON array of lead records".into(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|err| ValidationError::MalformedBatch(format!("record {index}: {err}")))
        })
        .collect()
}

impl CrmClient {
    /// Serialize the working copy for the save-file collaborator. Read-only;
    /// the mutation engine is not involved.
    pub async fn export_leads(&self) -> Result<String, serde_json::Error> {
        let leads = self.leads().await;
        serde_json::to_string_pretty(&leads)
    }

    /// Import candidate records as one remote batch, then merge the
    /// confirmed records into the working copy. A rejected batch leaves the
    /// store untouched and reports a single failure.
    pub async fn import_leads(&self, payload: &str) -> Result<usize, MutationError> {
        let records = decode_import_payload(payload)?;
        for record in &records {
            if record.name.trim().is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            if record.value < 0.0 {
                return Err(ValidationError::NegativeValue(record.value).into());
            }
        }
        let principal = self.session().await?;

        let now = Utc::now();
        let batch: Vec<Lead> = records
            .into_iter()
            .map(|record| {
                let created_at = record.created_at.unwrap_or(now);
                Lead {
                    id: LeadId::generate(),
                    name: record.name,
                    email: record.email,
                    value: record.value,
                    status: record.status,
                    notes: record.notes,
                    created_at,
                    last_updated: record.last_updated.unwrap_or(created_at).max(created_at),
                }
            })
            .collect();

        match self.gateway.insert(principal, batch).await {
            Ok(confirmed) => {
                let count = confirmed.len();
                {
                    let mut guard = self.inner.lock().await;
                    for lead in confirmed {
                        guard.store.upsert(lead);
                    }
                }
                info!(count, "import committed");
                let _ = self.events.send(ClientEvent::ImportCompleted { count });
                Ok(count)
            }
            Err(source) => {
                self.report_failure(MutationAction::Import, &source);
                Err(MutationError::RemoteCommit {
                    action: MutationAction::Import,
                    source,
                })
            }
        }
    }

    /// Remove every record owned by the signed-in principal, locally and
    /// remotely. Unlike the single-record operations this propagates the
    /// remote failure to its caller; account deletion builds on it.
    pub async fn clear_all(&self) -> Result<(), MutationError> {
        let principal = self.session().await?;

        let snapshot = {
            let mut guard = self.inner.lock().await;
            if let Some(id) = guard.inflight.iter().next().copied() {
                return Err(ValidationError::MutationInFlight(id).into());
            }
            let snapshot = guard.store.list();
            guard.store.replace_all(Vec::new());
            snapshot
        };

        match self.gateway.delete_all(principal).await {
            Ok(()) => {
                info!(cleared = snapshot.len(), "working copy cleared");
                Ok(())
            }
            Err(source) => {
                self.inner.lock().await.store.replace_all(snapshot);
                self.report_failure(MutationAction::ClearAll, &source);
                Err(MutationError::RemoteCommit {
                    action: MutationAction::ClearAll,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transfer_tests.rs"]
mod tests;

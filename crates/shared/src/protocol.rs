use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Lead, LeadStatus};

/// Fields a caller supplies when creating a lead. Identifier and timestamps
/// are assigned by the mutation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub value: f64,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: String,
}

/// Partial rewrite of an existing lead. `None` leaves a field untouched.
/// `last_updated` is filled in by the engine, never by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl LeadPatch {
    pub fn status_only(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Rewrite `lead`'s fields from the patch, leaving timestamps alone.
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(email) = &self.email {
            lead.email = email.clone();
        }
        if let Some(value) = self.value {
            lead.value = value;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(notes) = &self.notes {
            lead.notes = notes.clone();
        }
    }
}

/// Lead-shaped object accepted from an externally supplied import payload.
/// Identifiers are always reassigned; missing timestamps are freshened at
/// import time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadImportRecord {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub value: f64,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

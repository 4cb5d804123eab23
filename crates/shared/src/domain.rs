use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Ok(Self(value.parse()?))
            }
        }
    };
}

id_newtype!(LeadId);
id_newtype!(PrincipalId);

/// Pipeline stage a lead occupies. The wire representation is the literal
/// stage code (`LEADS`, `CONTACTED`, `NEGOTIATION`, `WON`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    #[default]
    Leads,
    Contacted,
    Negotiation,
    Won,
}

impl LeadStatus {
    /// Pipeline order, left to right on the board.
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Leads,
        LeadStatus::Contacted,
        LeadStatus::Negotiation,
        LeadStatus::Won,
    ];

    pub fn code(self) -> &'static str {
        match self {
            LeadStatus::Leads => "LEADS",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::Negotiation => "NEGOTIATION",
            LeadStatus::Won => "WON",
        }
    }

    /// Column heading shown for this stage.
    pub fn title(self) -> &'static str {
        match self {
            LeadStatus::Leads => "Leads",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Negotiation => "In Negotiation",
            LeadStatus::Won => "Won",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Won)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct UnknownStage(pub String);

impl std::str::FromStr for LeadStatus {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "LEADS" => Ok(LeadStatus::Leads),
            "CONTACTED" => Ok(LeadStatus::Contacted),
            "NEGOTIATION" => Ok(LeadStatus::Negotiation),
            "WON" => Ok(LeadStatus::Won),
            _ => Err(UnknownStage(value.to_string())),
        }
    }
}

/// A prospective client record tracked through the pipeline.
///
/// `id` and `created_at` are fixed at creation; `last_updated` never moves
/// backwards and is refreshed by every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub value: f64,
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

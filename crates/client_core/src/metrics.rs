//! Read-only aggregates over a working-copy snapshot. Rendering stays in
//! the presentation layer.

use shared::domain::{Lead, LeadStatus};

use crate::CrmClient;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSummary {
    pub stage: LeadStatus,
    pub count: usize,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineMetrics {
    pub total_leads: usize,
    pub won_leads: usize,
    /// Sum of `value` across every lead still in play (not yet `Won`).
    pub active_pipeline_value: f64,
    pub won_revenue: f64,
    /// Percentage of leads that reached `Won`; 0 for an empty store.
    pub conversion_rate: f64,
    /// Per-stage totals in pipeline order.
    pub stages: [StageSummary; 4],
}

pub fn pipeline_metrics(leads: &[Lead]) -> PipelineMetrics {
    let mut stages = LeadStatus::ALL.map(|stage| StageSummary {
        stage,
        count: 0,
        total_value: 0.0,
    });
    for lead in leads {
        let summary = &mut stages[stage_index(lead.status)];
        summary.count += 1;
        summary.total_value += lead.value;
    }

    let total_leads = leads.len();
    let won = stages[stage_index(LeadStatus::Won)];
    let active_pipeline_value = stages
        .iter()
        .filter(|summary| summary.stage != LeadStatus::Won)
        .map(|summary| summary.total_value)
        .sum();
    let conversion_rate = if total_leads == 0 {
        0.0
    } else {
        won.count as f64 / total_leads as f64 * 100.0
    };

    PipelineMetrics {
        total_leads,
        won_leads: won.count,
        active_pipeline_value,
        won_revenue: won.total_value,
        conversion_rate,
        stages,
    }
}

fn stage_index(stage: LeadStatus) -> usize {
    match stage {
        LeadStatus::Leads => 0,
        LeadStatus::Contacted => 1,
        LeadStatus::Negotiation => 2,
        LeadStatus::Won => 3,
    }
}

impl CrmClient {
    pub async fn metrics(&self) -> PipelineMetrics {
        pipeline_metrics(&self.leads().await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::domain::{Lead, LeadId, LeadStatus};

    use super::*;

    fn lead(value: f64, status: LeadStatus) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId::generate(),
            name: "acme".into(),
            email: String::new(),
            value,
            status,
            notes: String::new(),
            created_at: now,
            last_updated: now,
        }
    }

    #[test]
    fn aggregates_totals_by_stage() {
        let leads = vec![
            lead(100.0, LeadStatus::Leads),
            lead(250.0, LeadStatus::Contacted),
            lead(400.0, LeadStatus::Negotiation),
            lead(1000.0, LeadStatus::Won),
        ];

        let metrics = pipeline_metrics(&leads);
        assert_eq!(metrics.total_leads, 4);
        assert_eq!(metrics.won_leads, 1);
        assert_eq!(metrics.active_pipeline_value, 750.0);
        assert_eq!(metrics.won_revenue, 1000.0);
        assert_eq!(metrics.conversion_rate, 25.0);
        assert_eq!(metrics.stages[1].count, 1);
        assert_eq!(metrics.stages[1].total_value, 250.0);
    }

    #[test]
    fn empty_store_has_zero_conversion() {
        let metrics = pipeline_metrics(&[]);
        assert_eq!(metrics.total_leads, 0);
        assert_eq!(metrics.conversion_rate, 0.0);
        assert_eq!(metrics.active_pipeline_value, 0.0);
    }
}

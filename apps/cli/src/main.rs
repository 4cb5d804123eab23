use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientEvent, CrmClient, HttpRemoteGateway, LocalSession, StageDrop};
use shared::{
    domain::{Lead, LeadId, LeadStatus, PrincipalId},
    protocol::{LeadDraft, LeadPatch},
};
use tokio::sync::broadcast;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "leads", about = "Terminal front-end for the lead pipeline")]
struct Args {
    /// Base URL of the remote lead store.
    #[arg(long)]
    server_url: Option<String>,
    /// Principal to operate as.
    #[arg(long)]
    principal: Option<PrincipalId>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the pipeline board with per-stage counts and totals.
    Board,
    /// List every lead in arrival order.
    List,
    /// Create a lead.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: f64,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value = "LEADS")]
        status: LeadStatus,
    },
    /// Rewrite fields of an existing lead.
    Update {
        id: LeadId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Drop a lead onto a pipeline stage.
    Move { id: LeadId, stage: LeadStatus },
    /// Delete a lead.
    Delete { id: LeadId },
    /// Export every lead to a JSON file.
    Export { path: PathBuf },
    /// Import leads from a JSON file.
    Import { path: PathBuf },
    /// Remove every lead owned by the principal.
    Clear,
    /// Purge all lead data, then sign out.
    DeleteAccount,
    /// Pipeline totals and conversion rate.
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let settings = settings::load_settings();

    let server_url = args.server_url.unwrap_or(settings.server_url);
    let principal = args
        .principal
        .or(settings.principal)
        .unwrap_or_else(PrincipalId::generate);

    let gateway =
        Arc::new(HttpRemoteGateway::new(&server_url).context("invalid server url")?);
    let sessions = Arc::new(LocalSession::signed_in(principal));
    let client = CrmClient::new(gateway, sessions);
    client
        .apply_sign_in(principal)
        .await
        .context("initial fetch from remote failed")?;
    let mut events = client.subscribe_events();

    match args.command {
        Command::Board => print_board(&client).await,
        Command::List => {
            for lead in client.leads().await {
                print_lead(&lead);
            }
        }
        Command::Add {
            name,
            value,
            email,
            notes,
            status,
        } => {
            let lead = client
                .add_lead(LeadDraft {
                    name,
                    email,
                    value,
                    status,
                    notes,
                })
                .await?;
            println!("added {} ({})", lead.name, lead.id);
        }
        Command::Update {
            id,
            name,
            value,
            email,
            notes,
        } => {
            let patch = LeadPatch {
                name,
                email,
                value,
                notes,
                ..LeadPatch::default()
            };
            let lead = client.update_lead(id, patch).await?;
            print_lead(&lead);
        }
        Command::Move { id, stage } => {
            match client
                .drop_on_stage(StageDrop {
                    lead_id: id,
                    destination: stage,
                })
                .await?
            {
                Some(lead) => println!("moved {} to {}", lead.name, lead.status.title()),
                None => println!("already in {}", stage.title()),
            }
        }
        Command::Delete { id } => {
            client.delete_lead(id).await?;
            println!("deleted {id}");
        }
        Command::Export { path } => {
            let payload = client.export_leads().await?;
            fs::write(&path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "exported {} leads to {}",
                client.leads().await.len(),
                path.display()
            );
        }
        Command::Import { path } => {
            let payload = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let count = client.import_leads(&payload).await?;
            println!("imported {count} leads");
        }
        Command::Clear => {
            let before = client.leads().await.len();
            client.clear_all().await?;
            println!("cleared {before} leads");
        }
        Command::DeleteAccount => {
            client.delete_account().await?;
            println!("account data deleted, signed out");
        }
        Command::Metrics => {
            let metrics = client.metrics().await;
            println!(
                "leads: {}  won: {}  conversion: {:.1}%",
                metrics.total_leads, metrics.won_leads, metrics.conversion_rate
            );
            println!("active pipeline: ${:.2}", metrics.active_pipeline_value);
            println!("revenue won:     ${:.2}", metrics.won_revenue);
            for summary in metrics.stages {
                println!(
                    "  {:<15} {:>3}  ${:.2}",
                    summary.stage.title(),
                    summary.count,
                    summary.total_value
                );
            }
        }
    }

    print_notifications(&mut events);
    Ok(())
}

async fn print_board(client: &CrmClient) {
    for stage in LeadStatus::ALL {
        let leads = client.leads_in_stage(stage).await;
        let total: f64 = leads.iter().map(|lead| lead.value).sum();
        println!("{} ({}) ${:.2}", stage.title(), leads.len(), total);
        for lead in leads {
            println!("  {}  {}  ${:.2}", lead.id, lead.name, lead.value);
        }
    }
}

fn print_lead(lead: &Lead) {
    println!(
        "{}  {:<12} {:<24} ${:.2}  {}",
        lead.id,
        lead.status.code(),
        lead.name,
        lead.value,
        lead.email
    );
}

fn print_notifications(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::DealWon { lead_id } => {
                println!("🎉 deal won: {lead_id}");
            }
            ClientEvent::ImportCompleted { count } => {
                tracing::info!(count, "import completed");
            }
            ClientEvent::MutationFailed { action, message } => {
                eprintln!("failed to {action}: {message}");
            }
            ClientEvent::SessionChanged(_) => {}
        }
    }
}

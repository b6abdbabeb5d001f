//! Aging commands: consolidate, archived, daemon.

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use kindred_core::aging::scheduler::ConsolidationScheduler;
use kindred_core::memory::store::MemoryRepository;
use kindred_types::error::ConsolidationError;
use kindred_types::memory::{ConsolidationReport, MemoryOwner};
use serde::Serialize;

use super::{print_json, short_id, truncate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ScopeReport {
    user_id: uuid::Uuid,
    persona_id: uuid::Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ConsolidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run `run` for every owner in turn. A failing owner is logged and
/// recorded; the remaining owners still run.
async fn consolidate_each<F, Fut>(owners: Vec<MemoryOwner>, mut run: F) -> Vec<ScopeReport>
where
    F: FnMut(MemoryOwner) -> Fut,
    Fut: Future<Output = Result<ConsolidationReport, ConsolidationError>>,
{
    let mut reports = Vec::with_capacity(owners.len());
    for owner in owners {
        let (report, error) = match run(owner).await {
            Ok(report) => (Some(report), None),
            Err(e) => {
                tracing::warn!(
                    user_id = %owner.user_id,
                    persona_id = %owner.persona_id,
                    error = %e,
                    "consolidation pass failed"
                );
                (None, Some(e.to_string()))
            }
        };
        reports.push(ScopeReport {
            user_id: owner.user_id,
            persona_id: owner.persona_id,
            report,
            error,
        });
    }
    reports
}

/// Consolidate one owner, or every owner with memories when `owner` is `None`.
pub async fn consolidate(state: &AppState, owner: Option<MemoryOwner>, json: bool) -> Result<()> {
    let owners = match owner {
        Some(owner) => vec![owner],
        None => state.memories.owner_scopes().await?,
    };

    let now = Utc::now();
    let reports = consolidate_each(owners, |owner| async move {
        state.engine.run_consolidation(&owner, now).await
    })
    .await;
    let failed_scopes = reports.iter().filter(|r| r.error.is_some()).count();

    if json {
        print_json(&reports)?;
    } else if reports.is_empty() {
        println!();
        println!("  {} No memories to consolidate.", style("i").blue().bold());
        println!();
    } else {
        print_reports(&reports);
    }

    if failed_scopes > 0 {
        bail!("consolidation failed for {failed_scopes} of {} personas", reports.len());
    }
    Ok(())
}

fn print_reports(reports: &[ScopeReport]) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Persona").fg(Color::White),
        Cell::new("Examined").fg(Color::White),
        Cell::new("Consolidated").fg(Color::White),
        Cell::new("Archived").fg(Color::White),
        Cell::new("Deleted").fg(Color::White),
        Cell::new("Unchanged").fg(Color::White),
        Cell::new("Failed").fg(Color::White),
    ]);
    for r in reports {
        let persona = Cell::new(short_id(&r.persona_id)).fg(Color::Cyan);
        let Some(report) = &r.report else {
            table.add_row(vec![
                persona,
                Cell::new(truncate(r.error.as_deref().unwrap_or_default(), 60)).fg(Color::Red),
            ]);
            continue;
        };
        let failed = Cell::new(report.failed);
        table.add_row(vec![
            persona,
            Cell::new(report.examined),
            Cell::new(report.consolidated).fg(Color::Green),
            Cell::new(report.archived).fg(Color::Yellow),
            Cell::new(report.deleted).fg(Color::Red),
            Cell::new(report.unchanged).fg(Color::DarkGrey),
            if report.failed > 0 { failed.fg(Color::Red) } else { failed },
        ]);
    }

    println!();
    println!("{table}");
    println!();
}

pub async fn archived(state: &AppState, owner: &MemoryOwner, json: bool) -> Result<()> {
    let memories = state.engine.archived_memories(owner).await?;

    if json {
        return print_json(&memories);
    }

    if memories.is_empty() {
        println!();
        println!("  {} The archive is empty.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Original").fg(Color::White),
        Cell::new("Last rendering").fg(Color::White),
        Cell::new("Decay").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);
    for m in &memories {
        table.add_row(vec![
            Cell::new(truncate(&m.original_content, 50)).fg(Color::White),
            Cell::new(truncate(m.display_content(), 50)).fg(Color::DarkGrey),
            Cell::new(format!("{:.2}", m.decay_factor)).fg(Color::Magenta),
            Cell::new(m.created_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} archived", style(memories.len()).bold());
    println!();
    Ok(())
}

/// Run the scheduler until Ctrl+C or SIGTERM.
pub async fn daemon(state: &AppState, tick_secs: u64) -> Result<()> {
    let tick = Duration::from_secs(tick_secs.max(1));
    let scheduler = ConsolidationScheduler::start(state.engine.clone(), tick);

    println!(
        "  {} Consolidating every {}s per persona (checking every {}s)",
        style("*").green().bold(),
        state.config.aging.consolidation_interval_secs,
        tick.as_secs()
    );
    println!("  Data directory: {}", style(state.data_dir.display()).cyan());
    println!("  {}", style("Press Ctrl+C to stop").dim());

    shutdown_signal().await;
    scheduler.stop().await;

    println!("\n  Scheduler stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

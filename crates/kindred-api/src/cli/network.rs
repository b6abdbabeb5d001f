//! Shared memory network commands.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use kindred_types::error::SharingError;
use kindred_types::memory::{ConnectionKind, MemoryOwner, PermissionLevel};
use kindred_types::network::{AccessibleMemory, NetworkNode};
use uuid::Uuid;

use super::{print_json, short_id, truncate};
use crate::state::AppState;

fn table_with(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::White)));
    table
}

pub async fn share(
    state: &AppState,
    id: &Uuid,
    from: &Uuid,
    to: &[Uuid],
    permission: Option<PermissionLevel>,
    json: bool,
) -> Result<()> {
    let shared = match state.network.share_memory(id, from, to, permission, Utc::now()).await {
        Ok(shared) => shared,
        Err(SharingError::NoEligibleRecipients) => {
            if json {
                return print_json(&serde_json::json!({ "shared": false, "reason": "no eligible recipients" }));
            }
            println!(
                "  {} No requested persona is close enough to receive this memory.",
                style("i").blue().bold()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&shared);
    }

    println!(
        "  {} Shared with {} persona{}",
        style("*").green().bold(),
        shared.shared_with_companions.len(),
        if shared.shared_with_companions.len() == 1 { "" } else { "s" }
    );
    for recipient in &shared.shared_with_companions {
        let level = shared.permission_for(recipient).unwrap_or_default();
        println!("    {} ({level})", style(recipient).cyan());
    }
    Ok(())
}

pub async fn accessible(state: &AppState, owner: &MemoryOwner, json: bool) -> Result<()> {
    let memories = state.network.get_accessible_memories(owner).await?;

    if json {
        return print_json(&memories);
    }

    if memories.is_empty() {
        println!();
        println!("  {} No memories visible to this persona.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = table_with(&["Memory", "Source", "Last referenced", "Id"]);
    for m in &memories {
        let source = match m {
            AccessibleMemory::Own(_) => Cell::new("own").fg(Color::Green),
            AccessibleMemory::Shared(s) => {
                Cell::new(format!("shared by {}", short_id(&s.origin_persona_id))).fg(Color::Magenta)
            }
        };
        table.add_row(vec![
            Cell::new(truncate(m.content(), 60)).fg(Color::White),
            source,
            Cell::new(m.last_referenced().format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
            Cell::new(short_id(&m.id())).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn connect(
    state: &AppState,
    persona: &Uuid,
    a: &Uuid,
    b: &Uuid,
    kind: ConnectionKind,
    description: &str,
    strength: f32,
    json: bool,
) -> Result<()> {
    let connection = state
        .network
        .create_memory_connection(persona, a, b, kind, description, strength, Utc::now())
        .await?;

    if json {
        return print_json(&connection);
    }

    println!(
        "  {} Connected {} -> {} ({}, strength {:.2})",
        style("*").green().bold(),
        style(short_id(a)).cyan(),
        style(short_id(b)).cyan(),
        connection.kind,
        connection.strength
    );
    Ok(())
}

pub async fn auto_share(state: &AppState, owner: &MemoryOwner, json: bool) -> Result<()> {
    let report = state.network.auto_share_memories(owner, Utc::now()).await?;

    if json {
        return print_json(&report);
    }

    println!(
        "  {} {} candidate{}, {} shared, {} skipped",
        style("*").green().bold(),
        report.candidates,
        if report.candidates == 1 { "" } else { "s" },
        style(report.shared.len()).bold(),
        report.skipped
    );
    Ok(())
}

pub async fn set_relationship(
    state: &AppState,
    a: &Uuid,
    b: &Uuid,
    strength: f32,
    trust: f32,
    json: bool,
) -> Result<()> {
    let relationship = state
        .network
        .update_relationship_signals(a, b, strength, trust, Utc::now())
        .await?;

    if json {
        return print_json(&relationship);
    }

    println!(
        "  {} {} <-> {}: strength {:.2}, trust {:.2}",
        style("*").green().bold(),
        style(short_id(&relationship.persona_a)).cyan(),
        style(short_id(&relationship.persona_b)).cyan(),
        relationship.relationship_strength,
        relationship.trust_level
    );
    Ok(())
}

pub async fn list_relationships(state: &AppState, persona: &Uuid, json: bool) -> Result<()> {
    let relationships = state.network.relationships_of(persona).await?;

    if json {
        return print_json(&relationships);
    }

    if relationships.is_empty() {
        println!();
        println!("  {} No relationships yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = table_with(&["Persona", "Strength", "Trust", "Shared", "Connections", "Last interaction"]);
    for r in &relationships {
        let other = r.other(persona).unwrap_or(r.persona_b);
        table.add_row(vec![
            Cell::new(other).fg(Color::Cyan),
            Cell::new(format!("{:.2}", r.relationship_strength)).fg(Color::Yellow),
            Cell::new(format!("{:.2}", r.trust_level)).fg(Color::Yellow),
            Cell::new(r.shared_memory_count),
            Cell::new(r.connection_count),
            Cell::new(r.last_interaction.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

pub async fn clusters(state: &AppState, owner: &MemoryOwner, json: bool) -> Result<()> {
    let clusters = state.network.memory_clusters(owner).await?;

    if json {
        return print_json(&clusters);
    }

    if clusters.is_empty() {
        println!();
        println!("  {} No clusters yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = table_with(&["Theme", "Label", "Memories", "Significance"]);
    for c in &clusters {
        table.add_row(vec![
            Cell::new(c.theme).fg(Color::Cyan),
            Cell::new(&c.label).fg(Color::White),
            Cell::new(c.memory_ids.len()),
            Cell::new(format!("{:.0}%", c.significance * 100.0)).fg(Color::Yellow),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

pub async fn insights(state: &AppState, owner: &MemoryOwner, json: bool) -> Result<()> {
    let insights = state.network.network_insights(owner, Utc::now()).await?;

    if json {
        return print_json(&insights);
    }

    println!();
    if insights.is_empty() {
        println!("  {} Not enough data for insights yet.", style("i").blue().bold());
    }
    for insight in &insights {
        println!(
            "  {} {} {}",
            style("*").cyan().bold(),
            insight.description,
            style(format!("(confidence {:.0}%)", insight.confidence * 100.0)).dim()
        );
    }
    println!();
    Ok(())
}

pub async fn export(
    state: &AppState,
    owner: &MemoryOwner,
    label: &str,
    output: Option<&Path>,
) -> Result<()> {
    let tree = state.network.export_network(owner, label, Utc::now()).await?;
    let body = serde_json::to_string_pretty(&tree)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "  {} Exported network to {}",
                style("*").green().bold(),
                style(path.display()).cyan()
            );
        }
        None => println!("{body}"),
    }
    Ok(())
}

pub async fn import(state: &AppState, owner: &MemoryOwner, path: &Path, json: bool) -> Result<()> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tree: NetworkNode = serde_json::from_str(&body)
        .with_context(|| format!("{} is not an exported memory network", path.display()))?;

    let result = state.network.import_network(&tree, owner, Utc::now()).await;

    if json {
        return print_json(&result);
    }

    let marker = if result.success {
        style("*").green().bold()
    } else {
        style("x").red().bold()
    };
    println!(
        "  {marker} Imported {} memor{}, skipped {}",
        result.imported,
        if result.imported == 1 { "y" } else { "ies" },
        result.skipped
    );
    for warning in &result.warnings {
        println!("    {} {warning}", style("warning:").yellow());
    }
    for error in &result.errors {
        println!("    {} {error}", style("error:").red());
    }
    if !result.success {
        anyhow::bail!("import rejected");
    }
    Ok(())
}

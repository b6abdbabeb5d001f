//! Memory commands: extract, remember, recall, access.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use kindred_core::memory::extractor::FactExtractor;
use kindred_types::extraction::SpeakerRole;
use kindred_types::memory::{MemoryOwner, RankedMemory};
use uuid::Uuid;

use super::{print_json, short_id, truncate};
use crate::state::AppState;

/// Show extracted facts without touching storage.
///
/// ```bash
/// kindred extract "My name is Sam and I work as a nurse"
/// ```
pub fn extract(extractor: &FactExtractor, message: &str, reply: Option<&str>, json: bool) -> Result<()> {
    let facts = match reply {
        Some(reply) => extractor.extract_exchange(message, reply),
        None => extractor.extract(message, SpeakerRole::User),
    };

    if json {
        return print_json(&facts);
    }

    if facts.is_empty() {
        println!();
        println!("  {} No facts found in that message.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Fact").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Confidence").fg(Color::White),
        Cell::new("Tags").fg(Color::White),
    ]);
    for fact in &facts {
        table.add_row(vec![
            Cell::new(&fact.statement).fg(Color::White),
            Cell::new(fact.memory_type.to_string()).fg(Color::Cyan),
            Cell::new(format!("{:.2}", fact.confidence)).fg(Color::Yellow),
            Cell::new(fact.tags.join(", ")).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

pub async fn remember(
    state: &AppState,
    owner: &MemoryOwner,
    message: &str,
    reply: &str,
    session: Option<Uuid>,
    json: bool,
) -> Result<()> {
    let outcome = state
        .retriever
        .remember_exchange(message, reply, owner, session, Utc::now())
        .await;

    if json {
        return print_json(&outcome);
    }

    println!();
    if outcome.stored.is_empty() && outcome.skipped.is_empty() {
        println!("  {} Nothing worth remembering in that exchange.", style("i").blue().bold());
    }
    for id in &outcome.stored {
        println!("  {} Stored memory {}", style("*").green().bold(), style(short_id(id)).cyan());
    }
    for skipped in &outcome.skipped {
        println!(
            "  {} Skipped \"{}\": {}",
            style("!").yellow().bold(),
            skipped.statement,
            style(&skipped.reason).dim()
        );
    }
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn recall(
    state: &AppState,
    owner: &MemoryOwner,
    query: &str,
    limit: Option<usize>,
    across: bool,
    context: bool,
    cross_persona: bool,
    names: &[String],
    json: bool,
) -> Result<()> {
    let now = Utc::now();

    if context {
        let names = parse_names(names)?;
        let lines = state
            .retriever
            .relevant_context(query, owner.user_id, owner.persona_id, cross_persona, &names, now)
            .await;
        if json {
            return print_json(&lines);
        }
        for line in &lines {
            println!("{line}");
        }
        return Ok(());
    }

    let limit = limit.unwrap_or(state.config.retrieval.default_limit);
    let ranked = if across {
        state
            .retriever
            .retrieve_across_personas(query, owner.user_id, limit, now)
            .await
    } else {
        state
            .retriever
            .retrieve(query, owner.user_id, owner.persona_id, limit, now)
            .await
    };

    if json {
        return print_json(&ranked);
    }
    print_ranked(state, &ranked);
    Ok(())
}

fn print_ranked(state: &AppState, ranked: &[RankedMemory]) {
    if ranked.is_empty() {
        println!();
        println!("  {} No relevant memories.", style("i").blue().bold());
        println!();
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Memory").fg(Color::White),
        Cell::new("Persona").fg(Color::White),
        Cell::new("Similarity").fg(Color::White),
        Cell::new("Decay").fg(Color::White),
        Cell::new("Id").fg(Color::White),
    ]);
    for r in ranked {
        table.add_row(vec![
            Cell::new(truncate(&state.engine.render(&r.memory, now), 70)).fg(Color::White),
            Cell::new(short_id(&r.memory.persona_id)).fg(Color::Cyan),
            Cell::new(format!("{:.3}", r.similarity)).fg(Color::Yellow),
            Cell::new(format!("{:.2}", state.engine.current_decay(&r.memory, now))).fg(Color::Magenta),
            Cell::new(short_id(&r.memory.id)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
}

pub async fn access(state: &AppState, id: &Uuid, json: bool) -> Result<()> {
    let memory = state
        .engine
        .access_memory(id, Utc::now())
        .await
        .with_context(|| format!("Memory '{id}' not found"))?;

    if json {
        return print_json(&memory);
    }

    println!(
        "  {} Strengthened memory {} (accessed {} times)",
        style("*").green().bold(),
        style(short_id(&memory.id)).cyan(),
        memory.consolidation_count
    );
    Ok(())
}

/// Parse `<uuid>=<name>` pairs.
fn parse_names(pairs: &[String]) -> Result<HashMap<Uuid, String>> {
    let mut names = HashMap::new();
    for pair in pairs {
        let Some((id, name)) = pair.split_once('=') else {
            bail!("invalid --name '{pair}', expected <uuid>=<name>");
        };
        let id = Uuid::parse_str(id.trim()).with_context(|| format!("invalid persona id in '{pair}'"))?;
        names.insert(id, name.trim().to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let id = Uuid::now_v7();
        let names = parse_names(&[format!("{id}=Aria")]).unwrap();
        assert_eq!(names.get(&id).map(String::as_str), Some("Aria"));

        assert!(parse_names(&["Aria".to_string()]).is_err());
        assert!(parse_names(&["not-a-uuid=Aria".to_string()]).is_err());
    }
}

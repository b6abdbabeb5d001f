//! Derived, non-authoritative observations about a persona's network.

use chrono::{DateTime, Duration, Utc};
use kindred_types::memory::Memory;
use kindred_types::network::{InsightKind, MemoryCluster, NetworkInsight, PersonaRelationship};
use uuid::Uuid;

const STRONG_CONNECTION: f32 = 0.8;
const DOMINANT_THEME_MIN_MEMORIES: usize = 3;
const EMOTIONAL_TREND_THRESHOLD: f32 = 0.3;

/// Regenerate insights for `persona` from current data.
///
/// `clusters` are expected largest-first, as [`super::clustering::cluster_memories`]
/// returns them; on a size tie the earlier cluster is the dominant one.
pub fn generate_insights(
    persona: &Uuid,
    relationships: &[PersonaRelationship],
    memories: &[Memory],
    clusters: &[MemoryCluster],
    window_days: i64,
    now: DateTime<Utc>,
) -> Vec<NetworkInsight> {
    let mut insights = Vec::new();

    let strong = relationships
        .iter()
        .filter(|r| r.involves(persona) && r.relationship_strength > STRONG_CONNECTION)
        .count();
    if strong >= 1 {
        let noun = if strong == 1 { "persona" } else { "personas" };
        insights.push(NetworkInsight {
            kind: InsightKind::StrongConnections,
            description: format!("Strong connections exist with {strong} {noun}"),
            confidence: 0.9,
            generated_at: now,
        });
    }

    let dominant = clusters.iter().reduce(|best, c| {
        if c.memory_ids.len() > best.memory_ids.len() { c } else { best }
    });
    if let Some(dominant) = dominant {
        if dominant.memory_ids.len() > DOMINANT_THEME_MIN_MEMORIES {
            insights.push(NetworkInsight {
                kind: InsightKind::DominantTheme,
                description: format!("Dominant memory theme is {}", dominant.theme),
                confidence: 0.8,
                generated_at: now,
            });
        }
    }

    let since = now - Duration::try_days(window_days).unwrap_or(Duration::MAX);
    let recent: Vec<f32> = memories
        .iter()
        .filter(|m| m.created_at >= since)
        .map(|m| m.emotional_impact)
        .collect();
    if !recent.is_empty() {
        let average = recent.iter().sum::<f32>() / recent.len() as f32;
        let (trend, confidence) = if average > EMOTIONAL_TREND_THRESHOLD {
            ("positive", 0.8)
        } else if average < -EMOTIONAL_TREND_THRESHOLD {
            ("negative", 0.8)
        } else {
            ("neutral", 0.6)
        };
        insights.push(NetworkInsight {
            kind: InsightKind::EmotionalTrend,
            description: format!(
                "Recent memories trend {trend} (average emotional impact {average:.2} over {} memories)",
                recent.len()
            ),
            confidence,
            generated_at: now,
        });
    }

    insights
}

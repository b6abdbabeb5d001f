//! Configuration types for Kindred.
//!
//! `MemoryConfig` represents the top-level `config.toml`. Every field has a
//! default, so an empty file (or no file) yields the documented policy.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the memory subsystem.
///
/// Loaded from `~/.kindred/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub aging: AgingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sharing: SharingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl MemoryConfig {
    /// Return a copy with every value forced into its valid range.
    ///
    /// Rates are clamped into `(0, 1]`, thresholds into `[0, 1]`, and the
    /// delete threshold never exceeds the archive threshold.
    pub fn validated(mut self) -> Self {
        let a = &mut self.aging;
        a.short_rate = clamp_rate(a.short_rate, default_short_rate());
        a.medium_rate = clamp_rate(a.medium_rate, default_medium_rate());
        a.long_rate = clamp_rate(a.long_rate, default_long_rate());
        a.archive_threshold = clamp_unit(a.archive_threshold);
        a.delete_threshold = clamp_unit(a.delete_threshold).min(a.archive_threshold);
        a.batch_size = a.batch_size.max(1);
        a.consolidation_interval_secs = a.consolidation_interval_secs.max(1);

        let r = &mut self.retrieval;
        r.similarity_floor = clamp_unit(r.similarity_floor);

        let s = &mut self.sharing;
        s.min_relationship_strength = clamp_unit(s.min_relationship_strength);
        s.min_trust = clamp_unit(s.min_trust);
        s.initial_relationship_strength = clamp_unit(s.initial_relationship_strength);
        s.initial_trust = clamp_unit(s.initial_trust);
        s.cluster_min_significance = clamp_unit(s.cluster_min_significance);

        self
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn clamp_rate(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v.min(1.0) } else { fallback }
}

/// Decay curve and lifecycle thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingConfig {
    /// Per-hour retention during the first 24 hours.
    #[serde(default = "default_short_rate")]
    pub short_rate: f64,
    /// Per-day retention from 24 hours to 7 days.
    #[serde(default = "default_medium_rate")]
    pub medium_rate: f64,
    /// Per-week retention after 7 days.
    #[serde(default = "default_long_rate")]
    pub long_rate: f64,
    #[serde(default = "default_archive_threshold")]
    pub archive_threshold: f32,
    #[serde(default = "default_delete_threshold")]
    pub delete_threshold: f32,
    #[serde(default = "default_consolidation_interval_secs")]
    pub consolidation_interval_secs: u64,
    /// Memories loaded per consolidation chunk.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_access_bonus")]
    pub access_bonus_per_consolidation: f32,
    #[serde(default = "default_max_access_bonus")]
    pub max_access_bonus: f32,
    #[serde(default = "default_importance_weight")]
    pub importance_weight: f32,
}

fn default_short_rate() -> f64 {
    0.95
}
fn default_medium_rate() -> f64 {
    0.98
}
fn default_long_rate() -> f64 {
    0.995
}
fn default_archive_threshold() -> f32 {
    0.3
}
fn default_delete_threshold() -> f32 {
    0.1
}
fn default_consolidation_interval_secs() -> u64 {
    6 * 60 * 60
}
fn default_batch_size() -> usize {
    200
}
fn default_access_bonus() -> f32 {
    0.1
}
fn default_max_access_bonus() -> f32 {
    0.5
}
fn default_importance_weight() -> f32 {
    0.3
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            short_rate: default_short_rate(),
            medium_rate: default_medium_rate(),
            long_rate: default_long_rate(),
            archive_threshold: default_archive_threshold(),
            delete_threshold: default_delete_threshold(),
            consolidation_interval_secs: default_consolidation_interval_secs(),
            batch_size: default_batch_size(),
            access_bonus_per_consolidation: default_access_bonus(),
            max_access_bonus: default_max_access_bonus(),
            importance_weight: default_importance_weight(),
        }
    }
}

/// Similarity search policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results below this similarity are noise, not context.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_cross_persona_limit")]
    pub cross_persona_limit: usize,
}

fn default_similarity_floor() -> f32 {
    0.7
}
fn default_limit() -> usize {
    5
}
fn default_cross_persona_limit() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_floor: default_similarity_floor(),
            default_limit: default_limit(),
            cross_persona_limit: default_cross_persona_limit(),
        }
    }
}

/// Cross-persona sharing thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharingConfig {
    #[serde(default = "default_min_relationship_strength")]
    pub min_relationship_strength: f32,
    #[serde(default = "default_min_trust")]
    pub min_trust: f32,
    #[serde(default = "default_auto_share_importance")]
    pub auto_share_importance: f32,
    #[serde(default = "default_auto_share_emotional_impact")]
    pub auto_share_emotional_impact: f32,
    /// Strength given to a relationship created lazily on first interaction.
    #[serde(default = "default_initial_strength")]
    pub initial_relationship_strength: f32,
    #[serde(default = "default_initial_trust")]
    pub initial_trust: f32,
    #[serde(default = "default_cluster_min_significance")]
    pub cluster_min_significance: f32,
    #[serde(default = "default_insight_window_days")]
    pub insight_window_days: i64,
}

fn default_min_relationship_strength() -> f32 {
    0.6
}
fn default_min_trust() -> f32 {
    0.5
}
fn default_auto_share_importance() -> f32 {
    0.8
}
fn default_auto_share_emotional_impact() -> f32 {
    0.7
}
fn default_initial_strength() -> f32 {
    0.5
}
fn default_initial_trust() -> f32 {
    0.5
}
fn default_cluster_min_significance() -> f32 {
    0.1
}
fn default_insight_window_days() -> i64 {
    30
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            min_relationship_strength: default_min_relationship_strength(),
            min_trust: default_min_trust(),
            auto_share_importance: default_auto_share_importance(),
            auto_share_emotional_impact: default_auto_share_emotional_impact(),
            initial_relationship_strength: default_initial_strength(),
            initial_trust: default_initial_trust(),
            cluster_min_significance: default_cluster_min_significance(),
            insight_window_days: default_insight_window_days(),
        }
    }
}

/// Fact extraction policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Combined length of user message and reply needed for an exchange summary.
    #[serde(default = "default_min_exchange_length")]
    pub min_exchange_length: usize,
}

fn default_min_exchange_length() -> usize {
    100
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_exchange_length: default_min_exchange_length(),
        }
    }
}

/// Embedding provider settings (OpenAI-compatible `/embeddings` endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dimension() -> usize {
    1536
}
fn default_api_key_env() -> String {
    "KINDRED_EMBEDDING_API_KEY".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key_env: default_api_key_env(),
        }
    }
}

//! CLI command definitions for the `kindred` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! component: memory (extract, remember, recall, access), aging
//! (consolidate, archived, daemon) and network (share, connect, relationship,
//! clusters, insights, export, import).

pub mod aging;
pub mod memory;
pub mod network;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use kindred_types::memory::{ConnectionKind, MemoryOwner, PermissionLevel};
use serde::Serialize;
use uuid::Uuid;

/// Long-term memory for companion personas.
#[derive(Parser)]
#[command(name = "kindred", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// The user/persona pair a command acts for.
#[derive(Args, Debug, Clone, Copy)]
pub struct OwnerArgs {
    /// User id.
    #[arg(long, env = "KINDRED_USER")]
    pub user: Uuid,

    /// Persona id.
    #[arg(long, env = "KINDRED_PERSONA")]
    pub persona: Uuid,
}

impl OwnerArgs {
    pub fn owner(&self) -> MemoryOwner {
        MemoryOwner::new(self.user, self.persona)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the facts that would be extracted from a message (nothing is stored).
    Extract {
        /// The user's message.
        message: String,

        /// Companion reply; enables the exchange summary fact.
        #[arg(long)]
        reply: Option<String>,
    },

    /// Extract facts from an exchange and store them as memories.
    Remember {
        #[command(flatten)]
        owner: OwnerArgs,

        /// The user's message.
        message: String,

        /// Companion reply.
        #[arg(long, default_value = "")]
        reply: String,

        /// Conversation session id.
        #[arg(long)]
        session: Option<Uuid>,
    },

    /// Retrieve memories relevant to a query.
    Recall {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Free-text query.
        query: String,

        /// Maximum results (defaults to the configured limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Search every persona of the user instead of one.
        #[arg(long)]
        across: bool,

        /// Print formatted context lines (strengthens every memory used).
        #[arg(long, conflicts_with = "across")]
        context: bool,

        /// Include other personas' memories in --context output.
        #[arg(long, requires = "context")]
        cross_persona: bool,

        /// Persona display name as `<uuid>=<name>`; repeatable.
        #[arg(long = "name", value_name = "ID=NAME")]
        names: Vec<String>,
    },

    /// Strengthen a memory as if it had been used.
    Access {
        /// Memory id.
        id: Uuid,
    },

    /// Run a consolidation pass now.
    Consolidate {
        /// Restrict to one user (requires --persona).
        #[arg(long, requires = "persona")]
        user: Option<Uuid>,

        /// Restrict to one persona (requires --user).
        #[arg(long, requires = "user")]
        persona: Option<Uuid>,
    },

    /// List archived memories (explicit archive access).
    Archived {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Share a memory with other personas.
    Share {
        /// Memory id.
        id: Uuid,

        /// Persona that owns the memory.
        #[arg(long)]
        from: Uuid,

        /// Requested recipients; ineligible ones are dropped.
        #[arg(long, required = true, num_args = 1..)]
        to: Vec<Uuid>,

        /// Permission granted to recipients (read, write, admin).
        #[arg(long)]
        permission: Option<PermissionLevel>,
    },

    /// List memories a persona can see: its own plus those shared with it.
    Accessible {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Create a typed connection between two memories.
    Connect {
        /// Source memory id.
        a: Uuid,

        /// Target memory id.
        b: Uuid,

        /// Persona authoring the connection.
        #[arg(long)]
        persona: Uuid,

        /// Connection kind (similar, related, contrasting, sequential, causal).
        #[arg(long, default_value = "related")]
        kind: ConnectionKind,

        #[arg(long, default_value = "")]
        description: String,

        /// Strength in [0, 1].
        #[arg(long, default_value_t = 0.5)]
        strength: f32,
    },

    /// Share important or emotional memories with connected personas.
    #[command(name = "auto-share")]
    AutoShare {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Persona relationship signals.
    Relationship {
        #[command(subcommand)]
        action: RelationshipCommand,
    },

    /// Group a persona's memories by theme.
    Clusters {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Derived observations about a persona's network.
    Insights {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Export a persona's memory network as a JSON tree.
    Export {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Root node label.
        #[arg(long, default_value = "Memory network")]
        label: String,

        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import memories from an exported JSON tree.
    Import {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Path to the exported tree.
        path: PathBuf,
    },

    /// Run the consolidation scheduler until Ctrl+C.
    Daemon {
        /// Seconds between scheduler ticks. Each owner is still consolidated
        /// at most once per configured interval.
        #[arg(long, default_value_t = 300)]
        tick_secs: u64,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum RelationshipCommand {
    /// Set strength and trust between two personas.
    Set {
        a: Uuid,
        b: Uuid,

        #[arg(long)]
        strength: f32,

        #[arg(long)]
        trust: f32,
    },

    /// List a persona's relationships, strongest first.
    List {
        persona: Uuid,
    },
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten `s` to at most `max` characters, marking the cut with "...".
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

pub(crate) fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

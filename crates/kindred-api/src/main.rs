//! Kindred CLI entry point.
//!
//! Binary name: `kindred`
//!
//! Parses CLI arguments, initializes tracing, the database and the memory
//! components, then dispatches to the command handler.

mod cli;
mod state;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use kindred_core::memory::extractor::FactExtractor;
use kindred_types::memory::MemoryOwner;

use cli::{Cli, Commands, RelationshipCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,kindred=debug",
        _ => "trace",
    };
    kindred_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    kindred_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need neither the database nor the embedder.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "kindred", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Extract { message, reply } => {
            let config = kindred_infra::config::load_config(
                &kindred_infra::config::resolve_data_dir(),
            )
            .await;
            let extractor = FactExtractor::new(&config.extraction);
            return cli::memory::extract(&extractor, message, reply.as_deref(), cli.json);
        }
        _ => {}
    }

    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Remember {
            owner,
            message,
            reply,
            session,
        } => {
            cli::memory::remember(&state, &owner.owner(), &message, &reply, session, json).await?;
        }

        Commands::Recall {
            owner,
            query,
            limit,
            across,
            context,
            cross_persona,
            names,
        } => {
            cli::memory::recall(
                &state,
                &owner.owner(),
                &query,
                limit,
                across,
                context,
                cross_persona,
                &names,
                json,
            )
            .await?;
        }

        Commands::Access { id } => cli::memory::access(&state, &id, json).await?,

        Commands::Consolidate { user, persona } => {
            let owner = user.zip(persona).map(|(u, p)| MemoryOwner::new(u, p));
            cli::aging::consolidate(&state, owner, json).await?;
        }

        Commands::Archived { owner } => cli::aging::archived(&state, &owner.owner(), json).await?,

        Commands::Share {
            id,
            from,
            to,
            permission,
        } => cli::network::share(&state, &id, &from, &to, permission, json).await?,

        Commands::Accessible { owner } => {
            cli::network::accessible(&state, &owner.owner(), json).await?;
        }

        Commands::Connect {
            a,
            b,
            persona,
            kind,
            description,
            strength,
        } => {
            cli::network::connect(&state, &persona, &a, &b, kind, &description, strength, json)
                .await?;
        }

        Commands::AutoShare { owner } => {
            cli::network::auto_share(&state, &owner.owner(), json).await?;
        }

        Commands::Relationship { action } => match action {
            RelationshipCommand::Set {
                a,
                b,
                strength,
                trust,
            } => cli::network::set_relationship(&state, &a, &b, strength, trust, json).await?,
            RelationshipCommand::List { persona } => {
                cli::network::list_relationships(&state, &persona, json).await?;
            }
        },

        Commands::Clusters { owner } => cli::network::clusters(&state, &owner.owner(), json).await?,

        Commands::Insights { owner } => cli::network::insights(&state, &owner.owner(), json).await?,

        Commands::Export {
            owner,
            label,
            output,
        } => cli::network::export(&state, &owner.owner(), &label, output.as_deref()).await?,

        Commands::Import { owner, path } => {
            cli::network::import(&state, &owner.owner(), &path, json).await?;
        }

        Commands::Daemon { tick_secs } => cli::aging::daemon(&state, tick_secs).await?,

        Commands::Completions { .. } | Commands::Extract { .. } => {}
    }

    Ok(())
}

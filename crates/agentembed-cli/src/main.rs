//! CLI entry point for agentembed.
//!
//! This binary provides the `agentembed` command: `serve` runs the embed
//! server, `agent` manages agent records and their context, and `status`
//! reports the effective configuration.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// agentembed: embeddable chat widgets for configured agents.
#[derive(Parser)]
#[command(
    name = "agentembed",
    version,
    about = "Serve embeddable chat widgets for configured agents"
)]
struct Cli {
    /// Configuration file (defaults to config/default.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the embed server.
    Serve {
        /// Address to bind.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage agents.
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Show configuration, database and upstream key status.
    Status,
}

#[derive(Subcommand)]
enum AgentCommand {
    /// Create an agent.
    Create(CreateArgs),

    /// List all agents.
    List,

    /// Make an agent embeddable (or private again with --private).
    Publish {
        id: String,

        #[arg(long)]
        private: bool,
    },

    /// Attach a context fragment to an agent.
    Context(ContextArgs),
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    objective: String,

    /// expert, friendly, concise or empathetic.
    #[arg(long, default_value = "friendly")]
    personality: String,

    /// Explicit system prompt; replaces the persona template.
    #[arg(long)]
    system_prompt: Option<String>,

    /// Avatar style name.
    #[arg(long, default_value = "bottts")]
    avatar: String,

    #[arg(long)]
    slug: Option<String>,

    /// Publish immediately.
    #[arg(long)]
    public: bool,
}

#[derive(Args)]
struct ContextArgs {
    id: String,

    /// Plain-text knowledge.
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    text: Option<String>,

    /// A reference URL.
    #[arg(long)]
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level, cli.json);

    let mut config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    match cli.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve(config).await
        }
        Commands::Agent(AgentCommand::Create(args)) => {
            commands::agent_create(&config, args.into_new_agent()).await
        }
        Commands::Agent(AgentCommand::List) => commands::agent_list(&config).await,
        Commands::Agent(AgentCommand::Publish { id, private }) => {
            commands::agent_publish(&config, &id, !private).await
        }
        Commands::Agent(AgentCommand::Context(args)) => {
            let content = match (args.text, args.url) {
                (Some(text), _) => agentembed_store::ContextContent::Text(text),
                (None, Some(url)) => agentembed_store::ContextContent::Url(url),
                (None, None) => anyhow::bail!("either --text or --url is required"),
            };
            commands::agent_context(&config, &args.id, content).await
        }
        Commands::Status => commands::status(&config, cli.config.as_deref()).await,
    }
}

impl CreateArgs {
    fn into_new_agent(self) -> agentembed_store::NewAgent {
        let mut agent = agentembed_store::NewAgent::new(self.name);
        agent.objective = self.objective;
        agent.personality = agentembed_store::Personality::from(self.personality.as_str());
        agent.system_prompt = self.system_prompt;
        agent.avatar_style = self.avatar;
        agent.slug = self.slug;
        agent.is_public = self.public;
        agent
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from(["agentembed", "serve", "--port", "8080", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Serve { port, bind } => {
                assert_eq!(port, Some(8080));
                assert!(bind.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn context_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["agentembed", "agent", "context", "a1"]).is_err());
        assert!(
            Cli::try_parse_from([
                "agentembed", "agent", "context", "a1", "--text", "x", "--url", "https://x"
            ])
            .is_err()
        );
        assert!(
            Cli::try_parse_from(["agentembed", "agent", "context", "a1", "--url", "https://x"])
                .is_ok()
        );
    }

    #[test]
    fn create_args_map_to_new_agent() {
        let cli = Cli::try_parse_from([
            "agentembed", "agent", "create", "--name", "Helper", "--personality", "Expert",
            "--public",
        ])
        .unwrap();
        let Commands::Agent(AgentCommand::Create(args)) = cli.command else {
            panic!("expected agent create");
        };
        let agent = args.into_new_agent();
        assert_eq!(agent.name, "Helper");
        assert_eq!(agent.personality, agentembed_store::Personality::Expert);
        assert!(agent.is_public);
        assert_eq!(agent.avatar_style, "bottts");
    }
}

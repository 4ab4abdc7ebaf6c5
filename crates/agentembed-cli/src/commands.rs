//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use agentembed_agent::{CompletionBackend, LlmClient};
use agentembed_store::{AgentStore, ContextContent, ConversationStore, Database, NewAgent};
use agentembed_web::{AppState, EmbedCaches, EmbedServer};

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

pub async fn serve(config: AppConfig) -> Result<()> {
    info!("starting agentembed");

    let db = open_database(&config).await?;

    let llm: Option<Arc<dyn CompletionBackend>> = match config.llm_config() {
        Some(llm_config) => {
            info!(
                provider = %llm_config.provider,
                model = %llm_config.default_model,
                base_url = %llm_config.base_url,
                "upstream configured"
            );
            Some(Arc::new(
                LlmClient::new(llm_config).context("failed to build upstream client")?,
            ))
        }
        None => {
            warn!("CEREBRAS_API_KEY is not set; chat requests will fail until it is configured");
            None
        }
    };

    let state = AppState {
        agents: Arc::new(AgentStore::new(db.clone())),
        conversations: Arc::new(ConversationStore::new(db)),
        llm,
        caches: EmbedCaches::with_ttl(config.cache_ttl()),
        config: config.web_config(),
    };

    EmbedServer::new(state)
        .start()
        .await
        .map_err(|e| anyhow!(e))
        .context("embed server stopped")
}

// ---------------------------------------------------------------------------
// Subcommand: agent
// ---------------------------------------------------------------------------

pub async fn agent_create(config: &AppConfig, new: NewAgent) -> Result<()> {
    let store = AgentStore::new(open_database(config).await?);
    let agent = store.create(new).await.context("failed to create agent")?;

    println!();
    println!("  Created agent {}", agent.name);
    println!("  ID:          {}", agent.id);
    println!("  Personality: {}", agent.personality);
    println!(
        "  Visibility:  {}",
        if agent.is_public { "public" } else { "private" }
    );
    println!("  Embed URL:   {}", embed_url(config, &agent.id));
    println!();
    Ok(())
}

pub async fn agent_list(config: &AppConfig) -> Result<()> {
    let store = AgentStore::new(open_database(config).await?);
    let agents = store.list().await.context("failed to list agents")?;

    if agents.is_empty() {
        println!("No agents yet. Create one with `agentembed agent create --name <NAME>`.");
        return Ok(());
    }

    println!("{:<38} {:<8} {:>6}  NAME", "ID", "PUBLIC", "VIEWS");
    for agent in agents {
        println!(
            "{:<38} {:<8} {:>6}  {}",
            agent.id,
            if agent.is_public { "yes" } else { "no" },
            agent.views,
            agent.name
        );
    }
    Ok(())
}

pub async fn agent_publish(config: &AppConfig, id: &str, public: bool) -> Result<()> {
    let store = AgentStore::new(open_database(config).await?);
    store
        .set_public(id, public)
        .await
        .with_context(|| format!("failed to update agent {id}"))?;

    if public {
        println!("Agent {id} is public: {}", embed_url(config, id));
    } else {
        println!("Agent {id} is private.");
    }
    Ok(())
}

pub async fn agent_context(config: &AppConfig, id: &str, content: ContextContent) -> Result<()> {
    let store = AgentStore::new(open_database(config).await?);
    let fragment = store
        .add_context(id, content)
        .await
        .with_context(|| format!("failed to add context to agent {id}"))?;
    println!("Added context fragment {} to agent {id}.", fragment.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

pub async fn status(config: &AppConfig, config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("  agentembed Status");
    println!("  =================");
    println!();

    let config_path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    if config_path.exists() {
        println!("  Config:           OK ({})", config_path.display());
    } else {
        println!("  Config:           DEFAULTS (no {})", config_path.display());
    }

    println!(
        "  Listen:           {}:{}",
        config.server.bind, config.server.port
    );
    println!("  Embed base:       {}", public_base(config));

    let db_path = &config.database.path;
    if db_path.exists() {
        match Database::open_and_migrate(db_path.clone()).await {
            Ok(db) => {
                let agents = AgentStore::new(db).list().await.map(|a| a.len());
                match agents {
                    Ok(n) => println!("  Database:         OK ({}, {n} agents)", db_path.display()),
                    Err(e) => println!("  Database:         ERROR ({e})"),
                }
            }
            Err(e) => println!("  Database:         ERROR ({e})"),
        }
    } else {
        println!(
            "  Database:         NOT INITIALIZED ({})",
            db_path.display()
        );
    }

    match config.llm_config() {
        Some(llm) => println!(
            "  Upstream API:     CONFIGURED ({}, {})",
            llm.base_url, llm.default_model
        ),
        None => println!("  Upstream API:     NOT SET (CEREBRAS_API_KEY)"),
    }
    println!("  Cache TTL:        {}s", config.cache.ttl_secs);
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database.path.clone();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = Database::open_and_migrate(path.clone())
        .await
        .with_context(|| format!("failed to open database {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(db)
}

fn public_base(config: &AppConfig) -> String {
    match config.server.public_url.as_deref() {
        Some(url) => url.trim_end_matches('/').to_owned(),
        None => format!("http://{}:{}", config.server.bind, config.server.port),
    }
}

fn embed_url(config: &AppConfig, agent_id: &str) -> String {
    format!("{}{}?agentId={agent_id}", public_base(config), agentembed_web::EMBED_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_url_uses_public_origin() {
        let mut config = AppConfig::default();
        assert_eq!(
            embed_url(&config, "a1"),
            "http://127.0.0.1:3000/embed?agentId=a1"
        );

        config.server.public_url = Some("https://chat.example.com/".into());
        assert_eq!(
            embed_url(&config, "a1"),
            "https://chat.example.com/embed?agentId=a1"
        );
    }

    #[tokio::test]
    async fn agent_commands_against_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("nested").join("agents.db");

        let mut new = NewAgent::new("Helper");
        new.objective = "Answer questions".into();
        agent_create(&config, new).await.unwrap();

        let db = open_database(&config).await.unwrap();
        let store = AgentStore::new(db);
        let agents = store.list().await.unwrap();
        assert_eq!(agents.len(), 1);
        let id = agents[0].id.clone();
        assert!(!agents[0].is_public);

        agent_publish(&config, &id, true).await.unwrap();
        assert!(store.get(&id).await.unwrap().unwrap().is_public);

        agent_context(&config, &id, ContextContent::Text("Open 9 to 5.".into()))
            .await
            .unwrap();
        assert_eq!(store.context_fragments(&id).await.unwrap().len(), 1);

        assert!(agent_publish(&config, "missing", true).await.is_err());
        agent_list(&config).await.unwrap();
        status(&config, None).await.unwrap();
    }
}

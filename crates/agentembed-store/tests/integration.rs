//! Integration tests for the agentembed-store crate.
//!
//! These tests exercise the full database lifecycle (migrations, agents,
//! context fragments and guest conversations) against a real SQLite
//! database on disk (via tempfile), going through the same trait seams the
//! embed server uses.

use std::sync::Arc;

use agentembed_store::{
    AgentSource, AgentStore, ContextContent, ConversationLog, ConversationStore, Database,
    MessageRole, NewAgent, Personality,
};

// ═══════════════════════════════════════════════════════════════════════
//  Database lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn database_open_and_migrate_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let db = Database::open_and_migrate(db_path.clone()).await.unwrap();
    db.ping().await.unwrap();

    let tables: Vec<String> = db
        .execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(names)
        })
        .await
        .unwrap();

    for table in ["agents", "agent_contexts", "conversations", "messages"] {
        assert!(tables.contains(&table.to_owned()), "missing table {table}");
    }
    assert!(db_path.exists());
}

#[tokio::test]
async fn reopening_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("reopen.db");

    let id = {
        let db = Database::open_and_migrate(db_path.clone()).await.unwrap();
        AgentStore::new(db).create(NewAgent::new("Helper")).await.unwrap().id
    };

    let db = Database::open_and_migrate(db_path).await.unwrap();
    let agent = AgentStore::new(db).get(&id).await.unwrap();
    assert_eq!(agent.map(|a| a.name).as_deref(), Some("Helper"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Trait seams
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn agent_source_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("agents.db"))
        .await
        .unwrap();
    let store = AgentStore::new(db);

    let mut new = NewAgent::new("Helper");
    new.personality = Personality::Expert;
    new.objective = "answer FAQs".into();
    new.is_public = true;
    let agent = store.create(new).await.unwrap();
    store
        .add_context(&agent.id, ContextContent::Text("We ship worldwide.".into()))
        .await
        .unwrap();

    let source: Arc<dyn AgentSource> = Arc::new(store);
    let full = source.agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(full.personality, Personality::Expert);

    let profile = source.agent_profile(&agent.id).await.unwrap().unwrap();
    assert!(profile.is_public);
    assert_eq!(profile.objective, "answer FAQs");

    source.record_view(&agent.id).await.unwrap();
    assert_eq!(source.agent(&agent.id).await.unwrap().unwrap().views, 1);

    let fragments = source.context_fragments(&agent.id).await.unwrap();
    assert_eq!(fragments.len(), 1);
}

#[tokio::test]
async fn conversation_log_appends_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("conv.db"))
        .await
        .unwrap();
    let agent = AgentStore::new(db.clone())
        .create(NewAgent::new("Helper"))
        .await
        .unwrap();
    let log: Arc<dyn ConversationLog> = Arc::new(ConversationStore::new(db));

    assert!(log.find_guest(&agent.id, "s1").await.unwrap().is_none());
    let conversation = log.create_guest(&agent.id, "s1").await.unwrap();
    assert_eq!(
        log.find_guest(&agent.id, "s1").await.unwrap().as_ref(),
        Some(&conversation)
    );

    for i in 0..3 {
        log.append_turn(&conversation.id, &format!("q{i}"), &format!("a{i}"))
            .await
            .unwrap();
    }

    let transcript = log.transcript(&conversation.id).await.unwrap();
    assert_eq!(transcript.len(), 6);
    for (i, pair) in transcript.chunks(2).enumerate() {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[0].content, format!("q{i}"));
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[1].content, format!("a{i}"));
    }

    let fetched = log.conversation(&conversation.id).await.unwrap().unwrap();
    assert_eq!(fetched.session_id, "s1");
}

#[tokio::test]
async fn find_or_create_guest_is_stable_through_the_trait() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("bind.db"))
        .await
        .unwrap();
    let agent = AgentStore::new(db.clone())
        .create(NewAgent::new("Helper"))
        .await
        .unwrap();
    let log: Arc<dyn ConversationLog> = Arc::new(ConversationStore::new(db));

    let first = log.find_or_create_guest(&agent.id, "s1").await.unwrap();
    let again = log.find_or_create_guest(&agent.id, "s1").await.unwrap();
    assert_eq!(first.id, again.id);
    assert!(first.is_guest);

    let other = log.find_or_create_guest(&agent.id, "s2").await.unwrap();
    assert_ne!(first.id, other.id);
}

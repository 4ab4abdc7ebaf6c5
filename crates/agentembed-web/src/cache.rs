//! The four response caches and their key construction.

use std::sync::Arc;
use std::time::Duration;

use agentembed_store::{Agent, AgentProfile, Clock, SystemClock, TtlCache};
use serde_json::{Value, json};

use crate::render::RenderParams;
use crate::wire::{ChatReply, ConversationTurn};

/// Caches shared by every request. All four use the same TTL and clock.
#[derive(Clone)]
pub struct EmbedCaches {
    /// Display subset used by `GET`.
    pub profiles: TtlCache<AgentProfile>,
    /// Full records used for prompt building on `POST`.
    pub agents: TtlCache<Agent>,
    /// Rendered documents keyed by agent and presentation options.
    pub documents: TtlCache<String>,
    /// Chat replies keyed by agent, message and history.
    pub replies: TtlCache<ChatReply>,
}

impl EmbedCaches {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles: TtlCache::builder("profiles")
                .ttl(ttl)
                .clock(Arc::clone(&clock))
                .build(),
            agents: TtlCache::builder("agents")
                .ttl(ttl)
                .clock(Arc::clone(&clock))
                .build(),
            documents: TtlCache::builder("documents")
                .ttl(ttl)
                .clock(Arc::clone(&clock))
                .build(),
            replies: TtlCache::builder("replies").ttl(ttl).clock(clock).build(),
        }
    }

    /// Wall-clock caches.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// Sizes and hit counters, for the health endpoint.
    pub fn snapshot(&self) -> Value {
        fn entry<T: Clone>(cache: &TtlCache<T>) -> Value {
            let stats = cache.stats();
            json!({
                "entries": cache.len(),
                "hits": stats.hits(),
                "misses": stats.misses(),
                "expired": stats.expired(),
            })
        }
        json!({
            "ttl_secs": self.replies.ttl().as_secs(),
            "profiles": entry(&self.profiles),
            "agents": entry(&self.agents),
            "documents": entry(&self.documents),
            "replies": entry(&self.replies),
        })
    }
}

/// Key for a rendered document. The endpoint is part of the key because it
/// is baked into the generated script.
pub fn document_cache_key(agent_id: &str, params: &RenderParams, endpoint: &str) -> String {
    format!("doc:{agent_id}:{}:{endpoint}", params.fingerprint())
}

/// Key for a chat reply: the agent, the raw message and the full prior
/// history. Any difference in history is a miss.
pub fn reply_cache_key(agent_id: &str, message: &str, history: &[ConversationTurn]) -> String {
    format!("chat:{}", json!([agent_id, message, history]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Theme;
    use crate::wire::TurnRole;
    use agentembed_store::ManualClock;

    fn turn(role: TurnRole, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.into(),
        }
    }

    #[test]
    fn reply_key_depends_on_every_part() {
        let history = vec![turn(TurnRole::User, "hi"), turn(TurnRole::Assistant, "hello")];
        let base = reply_cache_key("a1", "What?", &history);
        assert_eq!(base, reply_cache_key("a1", "What?", &history));
        assert_ne!(base, reply_cache_key("a2", "What?", &history));
        assert_ne!(base, reply_cache_key("a1", "What ?", &history));
        assert_ne!(base, reply_cache_key("a1", "What?", &history[..1]));
        assert_ne!(base, reply_cache_key("a1", "What?", &[]));
    }

    #[test]
    fn reply_key_has_no_separator_collisions() {
        assert_ne!(
            reply_cache_key("a:b", "c", &[]),
            reply_cache_key("a", "b:c", &[])
        );
    }

    #[test]
    fn document_key_varies_with_params() {
        let light = RenderParams::default();
        let dark = RenderParams {
            theme: Theme::Dark,
            ..RenderParams::default()
        };
        assert_ne!(
            document_cache_key("a1", &light, "http://x"),
            document_cache_key("a1", &dark, "http://x")
        );
        assert_ne!(
            document_cache_key("a1", &light, "http://x"),
            document_cache_key("a1", &light, "http://y")
        );
    }

    #[test]
    fn caches_share_the_clock() {
        let clock = Arc::new(ManualClock::default());
        let caches = EmbedCaches::new(Duration::from_secs(60), clock.clone());
        caches.documents.insert("k", "<html>".to_owned());
        caches.replies.insert(
            "k",
            ChatReply {
                reply: "r".into(),
                usage: json!({}),
                conversation_id: None,
            },
        );
        assert!(caches.documents.get("k").is_some());

        clock.advance(Duration::from_secs(61));
        assert!(caches.documents.get("k").is_none());
        assert!(caches.replies.get("k").is_none());
    }

    #[test]
    fn snapshot_reports_sizes() {
        let caches = EmbedCaches::with_ttl(Duration::from_secs(5));
        caches.documents.insert("k", String::new());
        let snap = caches.snapshot();
        assert_eq!(snap["documents"]["entries"], 1);
        assert_eq!(snap["ttl_secs"], 5);
    }
}

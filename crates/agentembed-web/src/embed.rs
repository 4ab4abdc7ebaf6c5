//! Request handlers for the embed routes.

use std::sync::Arc;

use agentembed_agent::{ChatRequest, Message, assemble_messages, build_system_prompt};
use agentembed_store::{Agent, AgentProfile, Conversation};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::WebConfig;
use crate::cache::{document_cache_key, reply_cache_key};
use crate::error::ApiError;
use crate::render::{ClientConfig, EmbedQuery, RenderParams, render_document};
use crate::server::CHAT_PATH;
use crate::state::AppState;
use crate::wire::{ChatBody, ChatReply, ConversationTurn, non_blank};

/// Lets any site frame the document.
pub const FRAME_ANCESTORS: &str = "frame-ancestors 'self' *";

/// `GET /embed`: the self-contained chat document for a public agent.
pub async fn document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let pairs = pairs.map(|Query(pairs)| pairs).unwrap_or_default();
    let query = EmbedQuery::from_pairs(pairs);
    let agent_id = non_blank(query.agent_id.clone()).ok_or(ApiError::AgentIdNotSpecified)?;

    let profile = resolve_profile(&state, &agent_id).await?;

    let params = RenderParams::from_query(&query);
    let endpoint = chat_endpoint(&state.config, &headers);
    let key = document_cache_key(&agent_id, &params, &endpoint);

    let html = match state.caches.documents.get(&key) {
        Some(html) => html,
        None => {
            let html = render_document(&profile, &params, &ClientConfig { endpoint });
            state.caches.documents.insert(key, html.clone());
            html
        }
    };

    Ok((
        [(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(FRAME_ANCESTORS),
        )],
        Html(html),
    ))
}

/// `POST /embed`: one chat turn.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
    let agent_id = non_blank(body.agent_id).ok_or(ApiError::AgentIdRequired)?;
    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or(ApiError::MessageRequired)?;
    let session_id = non_blank(body.session_id);
    let conversation_id = non_blank(body.conversation_id);

    let agent = resolve_agent(&state, &agent_id).await?;
    let fragments = state.agents.context_fragments(&agent_id).await?;
    let system_prompt = build_system_prompt(&agent, &fragments);

    let bound = match (conversation_id.as_deref(), session_id.as_deref()) {
        (Some(id), Some(session)) => bound_conversation(&state, &agent_id, session, id).await,
        _ => None,
    };
    let bound_id = bound.as_ref().map(|c| c.id.clone());

    let history = match (body.conversation, bound.as_ref()) {
        (Some(turns), _) => turns,
        (None, Some(conversation)) => load_thread(&state, conversation).await,
        (None, None) => Vec::new(),
    };

    let key = reply_cache_key(&agent_id, &message, &history);
    if let Some(cached) = state.caches.replies.get(&key) {
        debug!(agent_id = %agent_id, "reply served from cache");
        return Ok(Json(ChatReply {
            conversation_id: bound_id,
            ..cached
        }));
    }

    let backend = state.llm.as_ref().ok_or(ApiError::ApiKeyNotConfigured)?;
    let prior: Vec<Message> = history.iter().map(ConversationTurn::to_message).collect();
    let request = ChatRequest::chat_turn(assemble_messages(&system_prompt, &prior, &message));
    let completion = backend.complete(&request).await?;

    info!(
        agent_id = %agent_id,
        history = history.len(),
        reply_len = completion.text.len(),
        "chat turn completed"
    );

    state.caches.replies.insert(
        key,
        ChatReply {
            reply: completion.text.clone(),
            usage: completion.usage.clone(),
            conversation_id: None,
        },
    );

    let persisted = if body.embedded.unwrap_or(false)
        && let Some(session_id) = session_id.as_deref()
    {
        persist_turn(&state, &agent_id, session_id, &message, &completion.text).await
    } else {
        None
    };

    Ok(Json(ChatReply {
        reply: completion.text,
        usage: completion.usage,
        conversation_id: persisted.or(bound_id),
    }))
}

/// `OPTIONS`: CORS preflight. Headers come from the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "upstream_configured": state.llm.is_some(),
            "caches": state.caches.snapshot(),
        })),
    )
}

/// Display subset through the profile cache. Only public agents are cached,
/// and a store fetch bumps the view counter in the background.
async fn resolve_profile(state: &AppState, agent_id: &str) -> Result<AgentProfile, ApiError> {
    let profile = match state.caches.profiles.get(agent_id) {
        Some(profile) => profile,
        None => {
            let profile = state
                .agents
                .agent_profile(agent_id)
                .await?
                .ok_or_else(|| not_found(agent_id))?;
            if profile.is_public {
                state.caches.profiles.insert(agent_id, profile.clone());
                spawn_view(state, agent_id);
            }
            profile
        }
    };
    ensure_public(agent_id, profile.is_public)?;
    Ok(profile)
}

/// Full record through the agent cache, same visibility rule as `GET`.
async fn resolve_agent(state: &AppState, agent_id: &str) -> Result<Agent, ApiError> {
    let agent = match state.caches.agents.get(agent_id) {
        Some(agent) => agent,
        None => {
            let agent = state
                .agents
                .agent(agent_id)
                .await?
                .ok_or_else(|| not_found(agent_id))?;
            if agent.is_public {
                state.caches.agents.insert(agent_id, agent.clone());
            }
            agent
        }
    };
    ensure_public(agent_id, agent.is_public)?;
    Ok(agent)
}

fn not_found(agent_id: &str) -> ApiError {
    info!(agent_id = %agent_id, "agent not found");
    ApiError::AgentUnavailable
}

fn ensure_public(agent_id: &str, is_public: bool) -> Result<(), ApiError> {
    if is_public {
        Ok(())
    } else {
        info!(agent_id = %agent_id, "agent is private");
        Err(ApiError::AgentUnavailable)
    }
}

fn spawn_view(state: &AppState, agent_id: &str) {
    let agents = Arc::clone(&state.agents);
    let agent_id = agent_id.to_owned();
    tokio::spawn(async move {
        if let Err(err) = agents.record_view(&agent_id).await {
            debug!(agent_id = %agent_id, error = %err, "view counter not updated");
        }
    });
}

/// The conversation named by `conversation_id`, provided it is a guest
/// thread of this agent bound to this browser session.
async fn bound_conversation(
    state: &AppState,
    agent_id: &str,
    session_id: &str,
    conversation_id: &str,
) -> Option<Conversation> {
    match state.conversations.conversation(conversation_id).await {
        Ok(Some(c)) if c.is_guest && c.agent_id == agent_id && c.session_id == session_id => {
            Some(c)
        }
        Ok(_) => {
            debug!(conversation_id, "conversation not bound to this session");
            None
        }
        Err(err) => {
            warn!(conversation_id, error = %err, "conversation lookup failed");
            None
        }
    }
}

/// Stored transcript as history. A failed load yields an empty history.
async fn load_thread(state: &AppState, conversation: &Conversation) -> Vec<ConversationTurn> {
    match state.conversations.transcript(&conversation.id).await {
        Ok(messages) => messages.into_iter().map(ConversationTurn::from).collect(),
        Err(err) => {
            warn!(conversation_id = %conversation.id, error = %err, "transcript load failed");
            Vec::new()
        }
    }
}

/// Record the turn under the session's guest conversation. Failures are
/// logged and never fail the request.
async fn persist_turn(
    state: &AppState,
    agent_id: &str,
    session_id: &str,
    user_text: &str,
    assistant_text: &str,
) -> Option<String> {
    let log = &state.conversations;
    let conversation = match log.find_or_create_guest(agent_id, session_id).await {
        Ok(conversation) => conversation,
        Err(err) => {
            warn!(agent_id = %agent_id, error = %err, "could not open guest conversation");
            return None;
        }
    };

    if let Err(err) = log
        .append_turn(&conversation.id, user_text, assistant_text)
        .await
    {
        warn!(conversation_id = %conversation.id, error = %err, "could not persist chat turn");
    }
    Some(conversation.id)
}

/// Absolute URL the generated client posts to.
pub fn chat_endpoint(config: &WebConfig, headers: &HeaderMap) -> String {
    if let Some(base) = config.public_base_url.as_deref() {
        return format!("{}{CHAT_PATH}", base.trim_end_matches('/'));
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_plain_host(h))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{}:{}", config.bind_addr, config.port));
    let scheme = match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some(p) if p.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    format!("{scheme}://{host}{CHAT_PATH}")
}

fn is_plain_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

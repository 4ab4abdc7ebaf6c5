//! System prompt synthesis and message assembly for a chat turn.
//!
//! An agent's stored prompt is used verbatim when present. Otherwise one is
//! synthesized from its personality tag and objective. Context fragments
//! are appended after a fixed preamble: inline text verbatim, URL fragments
//! only as an attribution line (their content is never fetched).

use agentembed_store::{Agent, ContextContent, ContextFragment, Personality};

use crate::llm::Message;

/// Separates the persona prompt from the agent's context fragments.
pub const CONTEXT_PREAMBLE: &str = "Here is additional information you should know:";

/// Build the system prompt for `agent`.
pub fn build_system_prompt(agent: &Agent, fragments: &[ContextFragment]) -> String {
    let mut prompt = match agent.system_prompt.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_owned(),
        _ => persona_prompt(&agent.name, &agent.personality, &agent.objective),
    };

    if !fragments.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(CONTEXT_PREAMBLE);
        for fragment in fragments {
            prompt.push_str("\n\n");
            match &fragment.content {
                ContextContent::Text(text) => prompt.push_str(text),
                ContextContent::Url(url) => {
                    prompt.push_str("Reference: ");
                    prompt.push_str(url);
                }
            }
        }
    }

    prompt
}

/// Synthesize a prompt from the persona template for `personality`.
pub fn persona_prompt(name: &str, personality: &Personality, objective: &str) -> String {
    let persona = match personality {
        Personality::Expert => {
            "an expert in your field. You give precise, well-reasoned and detailed answers"
        }
        Personality::Friendly => "with a warm and casual personality",
        Personality::Concise => {
            "a concise assistant. You answer briefly and directly, without unnecessary detail"
        }
        Personality::Empathetic => {
            "an empathetic and caring assistant. You listen attentively and respond with kindness"
        }
        Personality::Other(_) => "a helpful assistant",
    };

    let objective = objective.trim();
    if objective.is_empty() {
        format!("You are {name}, {persona}.")
    } else {
        format!("You are {name}, {persona}. Your objective is {objective}.")
    }
}

/// System prompt first, then prior turns in order, then the new user message.
pub fn assemble_messages(
    system_prompt: &str,
    history: &[Message],
    user_message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn agent(personality: Personality, system_prompt: Option<&str>) -> Agent {
        Agent {
            id: "a1".into(),
            name: "Helper".into(),
            avatar_style: "bottts".into(),
            is_public: true,
            slug: None,
            objective: "answer FAQs".into(),
            system_prompt: system_prompt.map(str::to_owned),
            personality,
            is_paid: false,
            price_cents: None,
            views: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn fragment(content: ContextContent) -> ContextFragment {
        ContextFragment {
            id: 1,
            agent_id: "a1".into(),
            content,
        }
    }

    #[test]
    fn friendly_template() {
        let prompt = build_system_prompt(&agent(Personality::Friendly, None), &[]);
        assert_eq!(
            prompt,
            "You are Helper, with a warm and casual personality. Your objective is answer FAQs."
        );
    }

    #[test]
    fn every_personality_names_agent_and_objective() {
        for p in [
            Personality::Expert,
            Personality::Friendly,
            Personality::Concise,
            Personality::Empathetic,
            Personality::Other("pirate".into()),
        ] {
            let prompt = build_system_prompt(&agent(p.clone(), None), &[]);
            assert!(prompt.starts_with("You are Helper, "), "{p}: {prompt}");
            assert!(prompt.ends_with("Your objective is answer FAQs."), "{p}: {prompt}");
        }
    }

    #[test]
    fn unknown_personality_uses_neutral_template() {
        let prompt = persona_prompt("Helper", &Personality::Other("pirate".into()), "");
        assert_eq!(prompt, "You are Helper, a helpful assistant.");
    }

    #[test]
    fn explicit_prompt_wins() {
        let expert = agent(Personality::Expert, Some("Talk like a sommelier."));
        let prompt = build_system_prompt(&expert, &[]);
        assert_eq!(prompt, "Talk like a sommelier.");
    }

    #[test]
    fn blank_explicit_prompt_falls_back() {
        let prompt = build_system_prompt(&agent(Personality::Friendly, Some("   ")), &[]);
        assert!(prompt.contains("warm and casual"));
    }

    #[test]
    fn context_fragments_appended_in_order() {
        let fragments = [
            fragment(ContextContent::Text("We open at 9.".into())),
            fragment(ContextContent::Url("https://example.com/faq".into())),
        ];
        let prompt = build_system_prompt(&agent(Personality::Friendly, None), &fragments);

        let preamble_at = prompt.find(CONTEXT_PREAMBLE).unwrap();
        let text_at = prompt.find("We open at 9.").unwrap();
        let url_at = prompt.find("Reference: https://example.com/faq").unwrap();
        assert!(preamble_at < text_at && text_at < url_at);
    }

    #[test]
    fn no_preamble_without_fragments() {
        let prompt = build_system_prompt(&agent(Personality::Friendly, None), &[]);
        assert!(!prompt.contains(CONTEXT_PREAMBLE));
    }

    #[test]
    fn assemble_orders_system_history_user() {
        let history = vec![Message::user("Hi"), Message::assistant("Hello!")];
        let messages = assemble_messages("sys", &history, "How are you?");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[3].content, "How are you?");
    }
}

//! Self-contained chat document: inline stylesheet, widget markup and the
//! client runtime, no external scripts.

use agentembed_store::AgentProfile;
use serde_json::json;

use super::markdown::{self, escape_html};
use super::params::{EmbedType, RenderParams, Theme};

/// Shown in place of a reply whenever a turn fails on the client.
pub const ERROR_MESSAGE: &str = "Sorry, an error occurred, please try again";

/// Delay before an auto-sent `startMessage`.
pub const START_DELAY_MS: u64 = 600;

const STYLESHEET: &str = include_str!("widget.css");
const CLIENT_SCRIPT: &str = include_str!("client.js");
const AVATAR_BASE: &str = "https://api.dicebear.com/7.x";
const CREDIT_URL: &str = "https://github.com/agentembed/agentembed";

/// Server-side facts the generated client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute URL of the chat endpoint the widget posts to.
    pub endpoint: String,
}

/// localStorage key holding the browser session id for one agent.
pub fn session_storage_key(agent_id: &str) -> String {
    format!("agentembed_session_{agent_id}")
}

/// Render the full HTML document for `profile`.
pub fn render_document(
    profile: &AgentProfile,
    params: &RenderParams,
    client: &ClientConfig,
) -> String {
    let title = escape_html(&profile.name);
    let widget = widget_markup(profile, params);
    let body = if params.preview && params.embed_type != EmbedType::Iframe {
        preview_harness(&widget, params.embed_type)
    } else {
        widget
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
{vars}
{STYLESHEET}
</style>
</head>
<body class="{body_class}">
{body}
<script type="application/json" id="agentembed-config">{config}</script>
<script>
{CLIENT_SCRIPT}
</script>
</body>
</html>
"##,
        vars = root_vars(params),
        body_class = body_class(params),
        config = config_json(profile, params, client),
    )
}

fn root_vars(params: &RenderParams) -> String {
    let palette = params.palette();
    let (bg, surface, text, muted, border, code) = match params.theme {
        Theme::Light => ("#ffffff", "#f3f4f6", "#111827", "#6b7280", "#e5e7eb", "#e5e7eb"),
        Theme::Dark => ("#111827", "#1f2937", "#f9fafb", "#9ca3af", "#374151", "#0b1220"),
    };
    format!(
        ":root {{ --ae-accent: {}; --ae-accent-tint: {}; --ae-accent-dark: {}; \
         --ae-bg: {bg}; --ae-surface: {surface}; --ae-text: {text}; --ae-muted: {muted}; \
         --ae-border: {border}; --ae-code: {code}; }}",
        palette.solid, palette.tint, palette.dark,
    )
}

fn body_class(params: &RenderParams) -> String {
    let mut class = format!("ae-theme-{}", params.theme.as_str());
    if params.preview && params.embed_type != EmbedType::Iframe {
        class.push_str(" ae-preview ae-preview-");
        class.push_str(params.embed_type.as_str());
    }
    class
}

fn widget_markup(profile: &AgentProfile, params: &RenderParams) -> String {
    let name = escape_html(&profile.name);
    let avatar = escape_html(&avatar_url(profile));
    let greeting = greeting_html(profile);
    let credit = if params.hide_credit {
        String::new()
    } else {
        format!(
            r#"<div class="ae-credit">Powered by <a href="{CREDIT_URL}" target="_blank" rel="noopener noreferrer">AgentEmbed</a></div>"#
        )
    };

    format!(
        r#"<div id="agentembed-widget">
<header class="ae-header"><img src="{avatar}" alt=""><h1>{name}</h1></header>
<div id="ae-messages" aria-live="polite"><div class="ae-msg ae-assistant">{greeting}</div></div>
<form id="ae-form" autocomplete="off">
<textarea id="ae-input" rows="1" placeholder="Type your message..." aria-label="Message"></textarea>
<button id="ae-send" type="submit">Send</button>
</form>
{credit}
</div>"#
    )
}

fn greeting_html(profile: &AgentProfile) -> String {
    let objective = profile.objective.trim();
    if objective.is_empty() {
        markdown::render(&format!(
            "Hi! I'm {}. How can I help you today?",
            profile.name.trim()
        ))
    } else {
        markdown::render(objective)
    }
}

fn avatar_url(profile: &AgentProfile) -> String {
    let clean = |raw: &str| -> String {
        raw.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect()
    };
    let mut style = clean(&profile.avatar_style.to_ascii_lowercase());
    if style.is_empty() {
        style = "bottts".to_owned();
    }
    format!("{AVATAR_BASE}/{style}/svg?seed={}", clean(&profile.id))
}

fn preview_harness(widget: &str, embed_type: EmbedType) -> String {
    let (label, launcher) = match embed_type {
        EmbedType::Popup => (
            "Popup button embed",
            r#"<button id="ae-launcher" type="button" aria-label="Open chat">&#128172;</button>"#,
        ),
        _ => ("Script tag embed", ""),
    };
    format!(
        r#"<main class="ae-host">
<h2>Your website</h2>
<p>Preview: {label}</p>
<div class="ae-bar" style="width: 90%"></div>
<div class="ae-bar" style="width: 75%"></div>
<div class="ae-bar" style="width: 82%"></div>
<div class="ae-bar" style="width: 60%"></div>
</main>
{widget}
{launcher}"#
    )
}

/// Client settings as JSON safe to inline inside a `<script>` element.
fn config_json(profile: &AgentProfile, params: &RenderParams, client: &ClientConfig) -> String {
    let config = json!({
        "agentId": profile.id,
        "endpoint": client.endpoint,
        "storageKey": session_storage_key(&profile.id),
        "startMessage": params.start_message,
        "startDelayMs": START_DELAY_MS,
        "errorMessage": ERROR_MESSAGE,
        "markdown": markdown::rules_json(),
    });
    escape_script_json(&config.to_string())
}

fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> AgentProfile {
        AgentProfile {
            id: "a1".into(),
            name: "Helper".into(),
            avatar_style: "bottts".into(),
            is_public: true,
            slug: None,
            objective: "Answer **product** questions".into(),
        }
    }

    fn client() -> ClientConfig {
        ClientConfig {
            endpoint: "http://localhost:3000/functions/v1/cerebras-chat".into(),
        }
    }

    #[test]
    fn document_contains_widget_and_runtime() {
        let html = render_document(&profile(), &RenderParams::default(), &client());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Helper</title>"));
        assert!(html.contains("<strong>product</strong>"));
        assert!(html.contains("--ae-accent: #6366f1"));
        assert!(html.contains(ERROR_MESSAGE));
        assert!(html.contains("agentembed_session_a1"));
        assert!(html.contains("finally"));
        assert!(html.contains("Powered by"));
    }

    #[test]
    fn hide_credit_removes_footer() {
        let params = RenderParams {
            hide_credit: true,
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &params, &client());
        assert!(!html.contains("Powered by"));
    }

    #[test]
    fn dark_theme_and_accent() {
        let params = RenderParams {
            theme: Theme::Dark,
            accent_color: "#10b981".into(),
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &params, &client());
        assert!(html.contains("ae-theme-dark"));
        assert!(html.contains("--ae-accent: #10b981; --ae-accent-tint: #10b98133"));
        assert!(html.contains("--ae-bg: #111827"));
    }

    #[test]
    fn agent_strings_are_escaped() {
        let mut p = profile();
        p.name = "<img src=x onerror=alert(1)>".into();
        p.objective = "</script><script>alert(1)</script>".into();
        let html = render_document(&p, &RenderParams::default(), &client());
        assert!(!html.contains("<img src=x"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn start_message_is_json_escaped() {
        let params = RenderParams {
            start_message: Some("</script>\"hi\"".into()),
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &params, &client());
        assert!(html.contains(r#""startMessage":"\u003c/script\u003e\"hi\"""#));
    }

    #[test]
    fn empty_objective_gets_default_greeting() {
        let mut p = profile();
        p.objective = "  ".into();
        let html = render_document(&p, &RenderParams::default(), &client());
        assert!(html.contains("Hi! I&#39;m Helper. How can I help you today?"));
    }

    #[test]
    fn preview_harness_only_for_script_and_popup() {
        let iframe = RenderParams {
            preview: true,
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &iframe, &client());
        assert!(!html.contains("ae-host"));

        let popup = RenderParams {
            preview: true,
            embed_type: EmbedType::Popup,
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &popup, &client());
        assert!(html.contains("ae-preview ae-preview-popup"));
        assert!(html.contains(r#"id="ae-launcher""#));

        let script = RenderParams {
            preview: true,
            embed_type: EmbedType::Script,
            ..RenderParams::default()
        };
        let html = render_document(&profile(), &script, &client());
        assert!(html.contains("Script tag embed"));
        assert!(!html.contains(r#"id="ae-launcher""#));
    }

    #[test]
    fn avatar_style_is_sanitized() {
        let mut p = profile();
        p.avatar_style = "pixel-art\"><x".into();
        assert_eq!(
            avatar_url(&p),
            "https://api.dicebear.com/7.x/pixel-artx/svg?seed=a1"
        );
    }
}

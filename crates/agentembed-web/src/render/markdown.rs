//! Minimal Markdown-subset formatter.
//!
//! Input is HTML-escaped first, then pushed through an ordered table of
//! regex substitutions. Substitution is total, so malformed or half-typed
//! Markdown never fails; unmatched markup is simply left as text.
//!
//! The same [`RULES`] table is serialized into the embed document and
//! replayed by the browser with `String.prototype.replace`, so every
//! pattern sticks to the syntax both engines share (no look-around, no
//! back-references) and every replacement only uses `$n` followed by a
//! non-word character.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

/// One substitution step.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    /// `^`/`$` match at line boundaries.
    pub multiline: bool,
    pub replacement: &'static str,
}

const fn rule(pattern: &'static str, replacement: &'static str) -> Rule {
    Rule {
        pattern,
        multiline: false,
        replacement,
    }
}

const fn line_rule(pattern: &'static str, replacement: &'static str) -> Rule {
    Rule {
        pattern,
        multiline: true,
        replacement,
    }
}

/// Substitutions in application order.
pub const RULES: &[Rule] = &[
    // Fenced code blocks, language tag dropped.
    rule(r"```[A-Za-z0-9_+-]*\n?([\s\S]*?)```", "<pre><code>$1</code></pre>"),
    rule(r"`([^`\n]+)`", "<code>$1</code>"),
    // Lists. Ordered items use a scratch tag until they are wrapped.
    line_rule(r"^[-*] +(.+)$", "<li>$1</li>"),
    line_rule(r"^\d+\. +(.+)$", "<oli>$1</oli>"),
    rule(r"</li>\n<li>", "</li><li>"),
    rule(r"</oli>\n<oli>", "</oli><oli>"),
    rule(r"((?:<li>.*?</li>)+)", "<ul>$1</ul>"),
    rule(r"((?:<oli>.*?</oli>)+)", "<ol>$1</ol>"),
    rule(r"<oli>", "<li>"),
    rule(r"</oli>", "</li>"),
    rule(r"\*\*([^*\n]+)\*\*", "<strong>$1</strong>"),
    rule(r"\*([^*\n]+)\*", "<em>$1</em>"),
    rule(
        r"\[([^\]\n]+)\]\((https?://[^\s)]+)\)",
        r#"<a href="$2" target="_blank" rel="noopener noreferrer">$1</a>"#,
    ),
    // Block elements swallow their surrounding newlines.
    rule(r"\n+(<(?:ul|ol|pre)>)", "$1"),
    rule(r"(</(?:ul|ol|pre)>)\n+", "$1"),
    rule(r"\n{2,}", "</p><p>"),
    rule(r"\n", "<br>"),
];

static COMPILED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|rule| {
            let source = if rule.multiline {
                format!("(?m){}", rule.pattern)
            } else {
                rule.pattern.to_owned()
            };
            match Regex::new(&source) {
                Ok(re) => Some((re, rule.replacement)),
                Err(err) => {
                    tracing::error!(pattern = rule.pattern, %err, "invalid markdown rule skipped");
                    None
                }
            }
        })
        .collect()
});

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render `text` to an HTML fragment wrapped in a paragraph.
pub fn render(text: &str) -> String {
    let mut html = escape_html(&text.replace("\r\n", "\n"));
    for (re, replacement) in COMPILED.iter() {
        html = re.replace_all(&html, *replacement).into_owned();
    }
    format!("<p>{html}</p>")
}

/// The rule table as `[[source, flags, replacement], ...]` for the browser.
pub fn rules_json() -> Value {
    Value::Array(
        RULES
            .iter()
            .map(|rule| {
                let flags = if rule.multiline { "gm" } else { "g" };
                json!([rule.pattern, flags, rule.replacement])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_compile() {
        assert_eq!(COMPILED.len(), RULES.len());
    }

    #[test]
    fn plain_text_is_one_paragraph() {
        assert_eq!(render("Hello there"), "<p>Hello there</p>");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(
            render("**bold** and *soft*"),
            "<p><strong>bold</strong> and <em>soft</em></p>"
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(render("run `cargo`"), "<p>run <code>cargo</code></p>");
    }

    #[test]
    fn fenced_code_block() {
        let html = render("Try:\n```rust\nlet x = 1;\n```\nDone");
        assert!(html.contains("<pre><code>let x = 1;"), "{html}");
        assert!(!html.contains("rust"), "{html}");
        assert!(html.ends_with("Done</p>"), "{html}");
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            render("- one\n- two"),
            "<p><ul><li>one</li><li>two</li></ul></p>"
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(
            render("1. first\n2. second"),
            "<p><ol><li>first</li><li>second</li></ol></p>"
        );
    }

    #[test]
    fn star_bullets_are_not_italic() {
        let html = render("* apples\n* pears");
        assert!(html.contains("<ul><li>apples</li><li>pears</li></ul>"), "{html}");
        assert!(!html.contains("<em>"), "{html}");
    }

    #[test]
    fn links_only_for_http() {
        let html = render("[docs](https://example.com/a?b=1&c=2)");
        assert!(
            html.contains(r#"<a href="https://example.com/a?b=1&amp;c=2" target="_blank""#),
            "{html}"
        );

        let html = render("[x](javascript:alert(1))");
        assert!(!html.contains("<a "), "{html}");
    }

    #[test]
    fn paragraphs_and_breaks() {
        assert_eq!(render("a\nb\n\nc"), "<p>a<br>b</p><p>c</p>");
    }

    #[test]
    fn html_is_escaped() {
        let html = render("<script>alert('x')</script>");
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("&lt;script&gt;"), "{html}");
    }

    #[test]
    fn malformed_markdown_is_left_alone() {
        assert_eq!(render("**unclosed"), "<p>**unclosed</p>");
        assert_eq!(render("```\nno end"), "<p>```<br>no end</p>");
        assert_eq!(render("[half](link"), "<p>[half](link</p>");
    }

    #[test]
    fn rules_json_shape() {
        let v = rules_json();
        let rules = v.as_array().unwrap();
        assert_eq!(rules.len(), RULES.len());
        assert_eq!(rules[2][1], "gm");
        assert_eq!(rules[0][1], "g");
    }
}

//! Presentation options carried on the embed URL.

/// Accent used when the caller's colour is missing or unparseable.
pub const DEFAULT_ACCENT: &str = "#6366f1";

/// Raw query string of `GET /embed`.
///
/// Every field is optional text so odd values degrade to defaults instead
/// of rejecting the request.
#[derive(Debug, Clone, Default)]
pub struct EmbedQuery {
    pub agent_id: Option<String>,
    pub theme: Option<String>,
    pub accent_color: Option<String>,
    pub hide_credit: Option<String>,
    pub start_message: Option<String>,
    pub preview: Option<String>,
    pub embed_type: Option<String>,
}

impl EmbedQuery {
    /// Build from decoded query pairs. The first occurrence of a key wins
    /// and unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "agentId" => &mut query.agent_id,
                "theme" => &mut query.theme,
                "accentColor" => &mut query.accent_color,
                "hideCredit" => &mut query.hide_credit,
                "startMessage" => &mut query.start_message,
                "preview" => &mut query.preview,
                "embedType" => &mut query.embed_type,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("dark") => Self::Dark,
            _ => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// How the host page is expected to embed the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedType {
    #[default]
    Iframe,
    Script,
    Popup,
}

impl EmbedType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("script") => Self::Script,
            Some("popup") => Self::Popup,
            _ => Self::Iframe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iframe => "iframe",
            Self::Script => "script",
            Self::Popup => "popup",
        }
    }
}

/// Normalized presentation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderParams {
    pub theme: Theme,
    /// Always `#rrggbb`, lowercase.
    pub accent_color: String,
    pub hide_credit: bool,
    pub start_message: Option<String>,
    pub preview: bool,
    pub embed_type: EmbedType,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            accent_color: DEFAULT_ACCENT.to_owned(),
            hide_credit: false,
            start_message: None,
            preview: false,
            embed_type: EmbedType::Iframe,
        }
    }
}

impl RenderParams {
    pub fn from_query(query: &EmbedQuery) -> Self {
        Self {
            theme: Theme::parse(query.theme.as_deref()),
            accent_color: normalize_accent(query.accent_color.as_deref()),
            hide_credit: parse_flag(query.hide_credit.as_deref()),
            start_message: query
                .start_message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_owned),
            preview: parse_flag(query.preview.as_deref()),
            embed_type: EmbedType::parse(query.embed_type.as_deref()),
        }
    }

    /// Stable textual form used in document cache keys.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.theme.as_str(),
            self.accent_color,
            self.hide_credit,
            self.preview,
            self.embed_type.as_str(),
            self.start_message.as_deref().unwrap_or_default(),
        )
    }

    pub fn palette(&self) -> Palette {
        Palette::derive(&self.accent_color)
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

/// Accept `#rgb`, `#rrggbb` or either without the hash.
pub fn normalize_accent(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim) else {
        return DEFAULT_ACCENT.to_owned();
    };
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return DEFAULT_ACCENT.to_owned();
    }
    match hex.len() {
        6 => format!("#{}", hex.to_ascii_lowercase()),
        3 => {
            let doubled: String = hex
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_lowercase();
            format!("#{doubled}")
        }
        _ => DEFAULT_ACCENT.to_owned(),
    }
}

/// Accent colour variants derived from one base colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub solid: String,
    /// The base colour at 20% opacity (`#rrggbb33`).
    pub tint: String,
    /// Each channel scaled to 80%.
    pub dark: String,
}

impl Palette {
    pub fn derive(accent: &str) -> Self {
        let solid = normalize_accent(Some(accent));
        let channel = |i: usize| {
            solid
                .get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .unwrap_or(0)
        };
        let (r, g, b) = (channel(1), channel(3), channel(5));
        let darken = |c: u8| (f32::from(c) * 0.8) as u8;
        Self {
            tint: format!("{solid}33"),
            dark: format!("#{:02x}{:02x}{:02x}", darken(r), darken(g), darken(b)),
            solid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> EmbedQuery {
        EmbedQuery::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let q = query(&[
            ("agentId", "a1"),
            ("theme", "dark"),
            ("theme", "light"),
            ("agentId", "a2"),
            ("utm_source", "mail"),
        ]);
        assert_eq!(q.agent_id.as_deref(), Some("a1"));
        assert_eq!(q.theme.as_deref(), Some("dark"));
        assert_eq!(RenderParams::from_query(&q).theme, Theme::Dark);
    }

    #[test]
    fn defaults_when_empty() {
        assert_eq!(RenderParams::from_query(&EmbedQuery::default()), RenderParams::default());
    }

    #[test]
    fn parses_known_values() {
        let p = RenderParams::from_query(&query(&[
            ("theme", "dark"),
            ("accentColor", "#FF0000"),
            ("hideCredit", "true"),
            ("startMessage", "  hi  "),
            ("preview", "1"),
            ("embedType", "popup"),
        ]));
        assert_eq!(p.theme, Theme::Dark);
        assert_eq!(p.accent_color, "#ff0000");
        assert!(p.hide_credit);
        assert_eq!(p.start_message.as_deref(), Some("hi"));
        assert!(p.preview);
        assert_eq!(p.embed_type, EmbedType::Popup);
    }

    #[test]
    fn unknown_values_fall_back() {
        let p = RenderParams::from_query(&query(&[
            ("theme", "solarized"),
            ("accentColor", "red"),
            ("hideCredit", "maybe"),
            ("startMessage", "   "),
            ("embedType", "banner"),
        ]));
        assert_eq!(p, RenderParams::default());
    }

    #[test]
    fn accent_forms() {
        assert_eq!(normalize_accent(Some("abc")), "#aabbcc");
        assert_eq!(normalize_accent(Some("#10B981")), "#10b981");
        assert_eq!(normalize_accent(Some("#12345")), DEFAULT_ACCENT);
        assert_eq!(normalize_accent(Some("\"><script>")), DEFAULT_ACCENT);
        assert_eq!(normalize_accent(None), DEFAULT_ACCENT);
    }

    #[test]
    fn palette_variants() {
        let p = Palette::derive("#6366f1");
        assert_eq!(p.solid, "#6366f1");
        assert_eq!(p.tint, "#6366f133");
        // 0x63 * 0.8 = 79.2, 0x66 * 0.8 = 81.6, 0xf1 * 0.8 = 192.8
        assert_eq!(p.dark, "#4f51c0");
    }

    #[test]
    fn fingerprint_differs_per_option() {
        let a = RenderParams::default();
        let b = RenderParams {
            theme: Theme::Dark,
            ..RenderParams::default()
        };
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}

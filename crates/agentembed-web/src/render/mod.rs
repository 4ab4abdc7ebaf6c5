//! HTML document synthesis for the embeddable widget.
//!
//! Rendering is a pure function of the agent profile, the presentation
//! options and the client endpoint, which keeps it cacheable.

pub mod document;
pub mod markdown;
pub mod params;

pub use document::{ClientConfig, ERROR_MESSAGE, render_document, session_storage_key};
pub use params::{DEFAULT_ACCENT, EmbedQuery, EmbedType, Palette, RenderParams, Theme};

// src/acquire/providers/mod.rs
pub mod mirror_html;
pub mod status_json;
pub mod translation;

pub use mirror_html::{MirrorPostProvider, MirrorThreadProvider};
pub use status_json::StatusJsonProvider;
pub use translation::TranslationMirror;

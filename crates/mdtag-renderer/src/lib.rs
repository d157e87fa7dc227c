//! Event-driven markdown renderer.
//!
//! A markdown [`Engine`] reports enter/leave/text events; a [`Dispatcher`]
//! routes them to the per-tag handlers of a [`Renderer`]:
//! - [`TreeRenderer`]: builds an [`Element`] tree that serializes to HTML
//! - [`TerminalRenderer`]: builds styled text for a terminal
//!
//! [`PulldownEngine`] adapts `pulldown-cmark` to the event model.
//! Renderers declare the parser [`Flags`] they need through
//! [`Capability`] lists; the dispatcher adds them to the caller's flags.
//!
//! # Example
//!
//! ```
//! let html = mdtag_renderer::render_html("# Hello\n\n**Bold** text").unwrap();
//! assert_eq!(
//!     html,
//!     "<body><h1>Hello</h1><p><strong>Bold</strong> text</p></body>"
//! );
//! ```

mod detail;
mod dispatcher;
mod element;
mod encoding;
mod engine;
mod error;
mod event;
mod flags;
mod options;
mod style;
mod terminal;
mod tree;
mod util;

pub use detail::{
    Attribute, CodeDetail, Detail, HeadingDetail, ImageDetail, LiDetail, LinkDetail, OlDetail,
    SubstrKind, TableCellDetail, UlDetail, WikiLinkDetail,
};
pub use dispatcher::{Dispatcher, Renderer};
pub use element::{Element, Node};
pub use encoding::{decode, encode};
pub use engine::{Engine, EventSink, PulldownEngine, Recorder, Replay, record};
pub use error::RenderError;
pub use event::{
    Align, BlockTag, Event, HandlerKey, SpanTag, Tag, TagFamily, TextKind, UnknownTag,
};
pub use flags::{Capability, Flags, configure};
pub use options::{RenderOptions, TerminalOptions, load_options};
pub use style::{
    AnsiStyles, PlainStyles, StylePair, StyleProvider, StyleTable, TextStyle, provider_for,
};
pub use terminal::{ConsoleWidth, FixedWidth, TerminalRenderer, TerminalWidth};
pub use tree::TreeRenderer;
pub use util::escape_html;

/// Render markdown to HTML with default options.
///
/// # Errors
///
/// Fails only when the event stream is malformed, which the bundled engine
/// never produces.
pub fn render_html(markdown: &str) -> Result<String, RenderError> {
    let root = Dispatcher::tree(&PulldownEngine, &RenderOptions::default()).render(markdown)?;
    Ok(root.to_html())
}

/// Render markdown to terminal text with default parser options.
///
/// # Errors
///
/// Fails when the configured style set is missing a style.
pub fn render_terminal(markdown: &str, terminal: &TerminalOptions) -> Result<String, RenderError> {
    Dispatcher::terminal(&PulldownEngine, &RenderOptions::default(), terminal)?.render(markdown)
}

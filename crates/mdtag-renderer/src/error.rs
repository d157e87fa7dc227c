//! Error types for rendering.

use mdtag_config::{Charset, ConfigError};

use crate::style::TextStyle;

/// Error raised while configuring a renderer or running a render pass.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The styling capability has no open/close pair for a style the
    /// terminal renderer needs.
    #[error("style provider has no marker pair for {0:?}")]
    MissingStyle(TextStyle),

    /// Text could not be encoded or decoded with the configured charset.
    #[error("text is not valid {} at byte {offset}", .charset.label())]
    Encoding {
        /// Charset of the event stream.
        charset: Charset,
        /// Byte offset of the first unrepresentable character in the text run.
        offset: usize,
    },

    /// The result was requested before every entered tag was left.
    #[error("render pass ended with unclosed tags")]
    Incomplete,

    /// A leave event arrived with no open tag.
    #[error("leave event without a matching enter")]
    Unbalanced,

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

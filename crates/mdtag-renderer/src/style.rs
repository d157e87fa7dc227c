//! Terminal styling vocabulary.

use std::borrow::Cow;

use mdtag_config::StyleChoice;

use crate::error::RenderError;

/// Visual styles the terminal renderer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Bold,
    Italic,
    Strike,
    Underline,
    Inverse,
}

impl TextStyle {
    pub const ALL: [Self; 5] = [
        Self::Bold,
        Self::Italic,
        Self::Strike,
        Self::Underline,
        Self::Inverse,
    ];
}

/// Markers written before and after styled content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylePair {
    pub open: Cow<'static, str>,
    pub close: Cow<'static, str>,
}

impl StylePair {
    #[must_use]
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self {
            open: Cow::Borrowed(open),
            close: Cow::Borrowed(close),
        }
    }
}

/// Source of open/close markers for each [`TextStyle`].
pub trait StyleProvider {
    /// Marker pair for `style`, or `None` when the provider cannot express it.
    fn pair(&self, style: TextStyle) -> Option<StylePair>;
}

/// SGR escape sequences. Each style is closed by its own reset, so nested
/// styles survive the inner close.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiStyles;

impl StyleProvider for AnsiStyles {
    fn pair(&self, style: TextStyle) -> Option<StylePair> {
        Some(match style {
            TextStyle::Bold => StylePair::new("\x1b[1m", "\x1b[22m"),
            TextStyle::Italic => StylePair::new("\x1b[3m", "\x1b[23m"),
            TextStyle::Strike => StylePair::new("\x1b[9m", "\x1b[29m"),
            TextStyle::Underline => StylePair::new("\x1b[4m", "\x1b[24m"),
            TextStyle::Inverse => StylePair::new("\x1b[7m", "\x1b[27m"),
        })
    }
}

/// Empty markers for output without escape sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStyles;

impl StyleProvider for PlainStyles {
    fn pair(&self, _style: TextStyle) -> Option<StylePair> {
        Some(StylePair::default())
    }
}

/// Style provider for a configured choice.
///
/// `Auto` picks ANSI styles when `console` reports color support on stdout.
#[must_use]
pub fn provider_for(choice: StyleChoice) -> Box<dyn StyleProvider> {
    match choice {
        StyleChoice::Ansi => Box::new(AnsiStyles),
        StyleChoice::Plain => Box::new(PlainStyles),
        StyleChoice::Auto if console::colors_enabled() => Box::new(AnsiStyles),
        StyleChoice::Auto => Box::new(PlainStyles),
    }
}

/// Marker pairs for every style, resolved up front.
#[derive(Debug, Clone)]
pub struct StyleTable {
    pairs: Vec<StylePair>,
}

impl StyleTable {
    /// Resolve every style from `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingStyle`] for the first style the
    /// provider has no pair for.
    pub fn resolve(provider: &dyn StyleProvider) -> Result<Self, RenderError> {
        let pairs = TextStyle::ALL
            .iter()
            .map(|&style| provider.pair(style).ok_or(RenderError::MissingStyle(style)))
            .collect::<Result<_, _>>()?;
        Ok(Self { pairs })
    }

    #[must_use]
    pub fn get(&self, style: TextStyle) -> &StylePair {
        &self.pairs[style as usize]
    }
}

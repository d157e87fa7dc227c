//! Event vocabulary shared by engines and renderers.
//!
//! Tags come in two families (blocks and spans) and text runs carry a
//! [`TextKind`]. Ordinals follow declaration order, matching the numbering
//! used by md4c-style engines.

use std::fmt;
use std::str::FromStr;

use crate::detail::Detail;

/// Block-level tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Doc,
    Quote,
    Ul,
    Ol,
    Li,
    Hr,
    H,
    Code,
    Html,
    P,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
}

impl BlockTag {
    /// Every block tag in ordinal order.
    pub const ALL: [Self; 16] = [
        Self::Doc,
        Self::Quote,
        Self::Ul,
        Self::Ol,
        Self::Li,
        Self::Hr,
        Self::H,
        Self::Code,
        Self::Html,
        Self::P,
        Self::Table,
        Self::Thead,
        Self::Tbody,
        Self::Tr,
        Self::Th,
        Self::Td,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Quote => "quote",
            Self::Ul => "ul",
            Self::Ol => "ol",
            Self::Li => "li",
            Self::Hr => "hr",
            Self::H => "h",
            Self::Code => "code",
            Self::Html => "html",
            Self::P => "p",
            Self::Table => "table",
            Self::Thead => "thead",
            Self::Tbody => "tbody",
            Self::Tr => "tr",
            Self::Th => "th",
            Self::Td => "td",
        }
    }
}

/// Inline (span) tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanTag {
    Em,
    Strong,
    A,
    Img,
    Code,
    Del,
    LatexMath,
    LatexMathDisplay,
    WikiLink,
    U,
}

impl SpanTag {
    /// Every span tag in ordinal order.
    pub const ALL: [Self; 10] = [
        Self::Em,
        Self::Strong,
        Self::A,
        Self::Img,
        Self::Code,
        Self::Del,
        Self::LatexMath,
        Self::LatexMathDisplay,
        Self::WikiLink,
        Self::U,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Em => "em",
            Self::Strong => "strong",
            Self::A => "a",
            Self::Img => "img",
            Self::Code => "code",
            Self::Del => "del",
            Self::LatexMath => "latex_math",
            Self::LatexMathDisplay => "latex_math_display",
            Self::WikiLink => "wiki_link",
            Self::U => "u",
        }
    }
}

/// Kind of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// Ordinary text.
    Normal,
    /// A NUL character from the source.
    NullChar,
    /// Hard line break.
    Br,
    /// Soft line break.
    SoftBr,
    /// An entity, kept in its source form (e.g. `&amp;`).
    Entity,
    /// Text inside a code span or code block.
    Code,
    /// Raw HTML.
    Html,
    /// Text inside a math span.
    LatexMath,
}

impl TextKind {
    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::NullChar => "nullchar",
            Self::Br => "br",
            Self::SoftBr => "soft_br",
            Self::Entity => "entity",
            Self::Code => "code",
            Self::Html => "html",
            Self::LatexMath => "latex_math",
        }
    }
}

/// Table cell alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Align {
    #[default]
    Default,
    Left,
    Center,
    Right,
}

/// Which family a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFamily {
    Block,
    Span,
}

/// A block or span tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Block(BlockTag),
    Span(SpanTag),
}

impl Tag {
    /// Family of this tag.
    #[must_use]
    pub fn family(self) -> TagFamily {
        match self {
            Self::Block(_) => TagFamily::Block,
            Self::Span(_) => TagFamily::Span,
        }
    }

    /// Position of the tag within its family.
    #[must_use]
    pub fn ordinal(self) -> u32 {
        match self {
            Self::Block(tag) => tag as u32,
            Self::Span(tag) => tag as u32,
        }
    }

    /// Canonical lowercase name. Block and span `code` share a name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Block(tag) => tag.name(),
            Self::Span(tag) => tag.name(),
        }
    }

    /// Handler this tag is routed to.
    #[must_use]
    pub fn handler(self) -> HandlerKey {
        match self {
            Self::Block(tag) => match tag {
                BlockTag::Doc => HandlerKey::Doc,
                BlockTag::Quote => HandlerKey::Quote,
                BlockTag::Ul => HandlerKey::Ul,
                BlockTag::Ol => HandlerKey::Ol,
                BlockTag::Li => HandlerKey::Li,
                BlockTag::Hr => HandlerKey::Hr,
                BlockTag::H => HandlerKey::H,
                BlockTag::Code => HandlerKey::Code,
                BlockTag::Html => HandlerKey::Html,
                BlockTag::P => HandlerKey::P,
                BlockTag::Table => HandlerKey::Table,
                BlockTag::Thead => HandlerKey::Thead,
                BlockTag::Tbody => HandlerKey::Tbody,
                BlockTag::Tr => HandlerKey::Tr,
                BlockTag::Th => HandlerKey::Th,
                BlockTag::Td => HandlerKey::Td,
            },
            Self::Span(tag) => match tag {
                SpanTag::Em => HandlerKey::Em,
                SpanTag::Strong => HandlerKey::Strong,
                SpanTag::A => HandlerKey::A,
                SpanTag::Img => HandlerKey::Img,
                SpanTag::Code => HandlerKey::Code,
                SpanTag::Del => HandlerKey::Del,
                SpanTag::LatexMath => HandlerKey::LatexMath,
                SpanTag::LatexMathDisplay => HandlerKey::LatexMathDisplay,
                SpanTag::WikiLink => HandlerKey::WikiLink,
                SpanTag::U => HandlerKey::U,
            },
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-tag handler slot a renderer can specialise.
///
/// Block `code` and span `code` share the [`HandlerKey::Code`] slot; the
/// handler tells them apart by the presence of a detail payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    Doc,
    Quote,
    Ul,
    Ol,
    Li,
    Hr,
    H,
    Code,
    Html,
    P,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
    Em,
    Strong,
    A,
    Img,
    Del,
    LatexMath,
    LatexMathDisplay,
    WikiLink,
    U,
}

/// Error returned when a name does not resolve to any handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag name: {0:?}")]
pub struct UnknownTag(pub String);

impl FromStr for HandlerKey {
    type Err = UnknownTag;

    /// Resolve a handler by tag name.
    ///
    /// Matching ignores case and underscores, so `"del_"`, `"DEL"` and
    /// `"LatexMath"` resolve like `"del"` and `"latex_math"`.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let key = match normalized.as_str() {
            "doc" => Self::Doc,
            "quote" => Self::Quote,
            "ul" => Self::Ul,
            "ol" => Self::Ol,
            "li" => Self::Li,
            "hr" => Self::Hr,
            "h" => Self::H,
            "code" => Self::Code,
            "html" => Self::Html,
            "p" => Self::P,
            "table" => Self::Table,
            "thead" => Self::Thead,
            "tbody" => Self::Tbody,
            "tr" => Self::Tr,
            "th" => Self::Th,
            "td" => Self::Td,
            "em" => Self::Em,
            "strong" => Self::Strong,
            "a" => Self::A,
            "img" => Self::Img,
            "del" => Self::Del,
            "latexmath" => Self::LatexMath,
            "latexmathdisplay" => Self::LatexMathDisplay,
            "wikilink" => Self::WikiLink,
            "u" => Self::U,
            _ => return Err(UnknownTag(name.to_owned())),
        };
        Ok(key)
    }
}

/// An owned event, as recorded from or replayed into an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A tag was entered, with its optional detail payload.
    Enter(Tag, Option<Detail>),
    /// A tag was left.
    Leave(Tag),
    /// A text run.
    Text(TextKind, Vec<u8>),
}

impl Event {
    /// Enter a block tag without detail.
    #[must_use]
    pub fn block(tag: BlockTag) -> Self {
        Self::Enter(Tag::Block(tag), None)
    }

    /// Enter a span tag without detail.
    #[must_use]
    pub fn span(tag: SpanTag) -> Self {
        Self::Enter(Tag::Span(tag), None)
    }

    /// A normal text run.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(TextKind::Normal, text.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_name_resolves_to_its_handler() {
        let tags = BlockTag::ALL
            .iter()
            .map(|&t| Tag::Block(t))
            .chain(SpanTag::ALL.iter().map(|&t| Tag::Span(t)));
        for tag in tags {
            assert_eq!(tag.name().parse::<HandlerKey>(), Ok(tag.handler()), "{tag}");
        }
    }

    #[test]
    fn test_handler_name_normalization() {
        assert_eq!("del_".parse::<HandlerKey>(), Ok(HandlerKey::Del));
        assert_eq!("DEL".parse::<HandlerKey>(), Ok(HandlerKey::Del));
        assert_eq!("LatexMath".parse::<HandlerKey>(), Ok(HandlerKey::LatexMath));
        assert_eq!(
            "latex_math_display".parse::<HandlerKey>(),
            Ok(HandlerKey::LatexMathDisplay)
        );
        assert_eq!("Wiki_Link".parse::<HandlerKey>(), Ok(HandlerKey::WikiLink));
    }

    #[test]
    fn test_unknown_handler_name() {
        let err = "footnote".parse::<HandlerKey>().unwrap_err();
        assert_eq!(err, UnknownTag("footnote".to_owned()));
    }

    #[test]
    fn test_block_and_span_code_share_handler() {
        assert_eq!(Tag::Block(BlockTag::Code).handler(), HandlerKey::Code);
        assert_eq!(Tag::Span(SpanTag::Code).handler(), HandlerKey::Code);
        assert_ne!(Tag::Block(BlockTag::Code), Tag::Span(SpanTag::Code));
    }

    #[test]
    fn test_ordinals_follow_declaration_order() {
        assert_eq!(Tag::Block(BlockTag::Doc).ordinal(), 0);
        assert_eq!(Tag::Block(BlockTag::Td).ordinal(), 15);
        assert_eq!(Tag::Span(SpanTag::Code).ordinal(), 4);
        assert_eq!(Tag::Span(SpanTag::U).ordinal(), 9);
        for (index, tag) in BlockTag::ALL.iter().enumerate() {
            assert_eq!(Tag::Block(*tag).ordinal() as usize, index);
        }
    }

    #[test]
    fn test_tag_family() {
        assert_eq!(Tag::Block(BlockTag::P).family(), TagFamily::Block);
        assert_eq!(Tag::Span(SpanTag::Em).family(), TagFamily::Span);
    }
}

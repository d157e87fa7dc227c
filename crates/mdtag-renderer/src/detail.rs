//! Detail payloads carried by enter events.

use std::borrow::Cow;

use mdtag_config::Charset;

use crate::encoding::decode;
use crate::error::RenderError;
use crate::event::{Align, BlockTag, SpanTag, Tag};

/// Kind of a substring within an [`Attribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstrKind {
    Normal,
    Entity,
    NullChar,
}

/// Text that lives outside the normal text flow (link targets, titles,
/// code languages) but may still be made of differently typed pieces.
///
/// Stored as raw bytes plus `(kind, end offset)` pairs that segment them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    text: Vec<u8>,
    substrings: Vec<(SubstrKind, usize)>,
}

impl Attribute {
    /// A single normal substring covering all of `text`.
    pub fn new(text: impl Into<Vec<u8>>) -> Self {
        let text = text.into();
        let substrings = if text.is_empty() {
            Vec::new()
        } else {
            vec![(SubstrKind::Normal, text.len())]
        };
        Self { text, substrings }
    }

    /// An attribute with explicit segmentation.
    ///
    /// Offsets are end positions. Each one is clamped between the previous
    /// offset and `text.len()`.
    pub fn with_substrings(text: impl Into<Vec<u8>>, substrings: Vec<(SubstrKind, usize)>) -> Self {
        let text = text.into();
        let mut floor = 0;
        let substrings = substrings
            .into_iter()
            .map(|(kind, end)| {
                floor = end.clamp(floor, text.len());
                (kind, floor)
            })
            .collect();
        Self { text, substrings }
    }

    /// Raw bytes of the flattened text.
    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Typed pieces of the text, in order.
    pub fn substrings(&self) -> impl Iterator<Item = (SubstrKind, &[u8])> + '_ {
        let mut start = 0;
        self.substrings.iter().map(move |&(kind, end)| {
            let piece = &self.text[start..end];
            start = end;
            (kind, piece)
        })
    }

    /// Flattened text decoded with `charset`.
    pub fn decode(&self, charset: Charset) -> Result<Cow<'_, str>, RenderError> {
        decode(charset, &self.text)
    }
}

impl From<&str> for Attribute {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Unordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlDetail {
    /// Items are rendered without paragraph spacing.
    pub is_tight: bool,
    /// Bullet character used in the source (`-`, `+` or `*`).
    pub mark: char,
}

impl Default for UlDetail {
    fn default() -> Self {
        Self {
            is_tight: true,
            mark: '-',
        }
    }
}

/// Ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlDetail {
    /// Number of the first item.
    pub start: u64,
    pub is_tight: bool,
    /// Character after the item number in the source (`.` or `)`).
    pub mark_delimiter: char,
}

impl Default for OlDetail {
    fn default() -> Self {
        Self {
            start: 1,
            is_tight: true,
            mark_delimiter: '.',
        }
    }
}

/// List item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiDetail {
    pub is_task: bool,
    /// `x`, `X` or a space for task items.
    pub task_mark: Option<char>,
    /// Source offset of the character between the task brackets.
    pub task_mark_offset: Option<usize>,
}

/// Heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingDetail {
    /// 1 to 6.
    pub level: u8,
}

impl Default for HeadingDetail {
    fn default() -> Self {
        Self { level: 1 }
    }
}

/// Fenced or indented code block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDetail {
    /// Full info string after the opening fence.
    pub info: Attribute,
    /// Language: the first word of the info string.
    pub lang: Attribute,
    /// Fence character, `None` for indented blocks.
    pub fence_char: Option<char>,
}

/// Table data cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCellDetail {
    pub align: Align,
}

/// Link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDetail {
    pub href: Attribute,
    pub title: Attribute,
}

/// Image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDetail {
    pub src: Attribute,
    pub title: Attribute,
}

/// Wiki link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikiLinkDetail {
    pub target: Attribute,
}

/// Tag-specific payload of an enter event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    Ul(UlDetail),
    Ol(OlDetail),
    Li(LiDetail),
    Heading(HeadingDetail),
    Code(CodeDetail),
    TableCell(TableCellDetail),
    Link(LinkDetail),
    Image(ImageDetail),
    WikiLink(WikiLinkDetail),
}

impl Detail {
    /// Whether this payload is the one `tag` carries.
    #[must_use]
    pub fn belongs_to(&self, tag: Tag) -> bool {
        matches!(
            (self, tag),
            (Self::Ul(_), Tag::Block(BlockTag::Ul))
                | (Self::Ol(_), Tag::Block(BlockTag::Ol))
                | (Self::Li(_), Tag::Block(BlockTag::Li))
                | (Self::Heading(_), Tag::Block(BlockTag::H))
                | (Self::Code(_), Tag::Block(BlockTag::Code))
                | (Self::TableCell(_), Tag::Block(BlockTag::Td))
                | (Self::Link(_), Tag::Span(SpanTag::A))
                | (Self::Image(_), Tag::Span(SpanTag::Img))
                | (Self::WikiLink(_), Tag::Span(SpanTag::WikiLink))
        )
    }

    pub fn as_ul(&self) -> Option<&UlDetail> {
        match self {
            Self::Ul(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_ol(&self) -> Option<&OlDetail> {
        match self {
            Self::Ol(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_li(&self) -> Option<&LiDetail> {
        match self {
            Self::Li(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_heading(&self) -> Option<&HeadingDetail> {
        match self {
            Self::Heading(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeDetail> {
        match self {
            Self::Code(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_table_cell(&self) -> Option<&TableCellDetail> {
        match self {
            Self::TableCell(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkDetail> {
        match self {
            Self::Link(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageDetail> {
        match self {
            Self::Image(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_wiki_link(&self) -> Option<&WikiLinkDetail> {
        match self {
            Self::WikiLink(d) => Some(d),
            _ => None,
        }
    }
}

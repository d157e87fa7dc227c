//! Parser feature flags and renderer capabilities.

use bitflags::bitflags;
use mdtag_config::{Dialect, Extension, ParserConfig};

bitflags! {
    /// Optional parser behaviours. Values match md4c's `MD_FLAG_*` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        const COLLAPSE_WHITESPACE = 0x0001;
        const PERMISSIVE_ATX_HEADERS = 0x0002;
        const PERMISSIVE_URL_AUTOLINKS = 0x0004;
        const PERMISSIVE_EMAIL_AUTOLINKS = 0x0008;
        const NO_INDENTED_CODE_BLOCKS = 0x0010;
        const NO_HTML_BLOCKS = 0x0020;
        const NO_HTML_SPANS = 0x0040;
        const TABLES = 0x0100;
        const STRIKETHROUGH = 0x0200;
        const PERMISSIVE_WWW_AUTOLINKS = 0x0400;
        const TASK_LISTS = 0x0800;
        const LATEX_MATH_SPANS = 0x1000;
        const WIKI_LINKS = 0x2000;
        const UNDERLINE = 0x4000;

        const PERMISSIVE_AUTOLINKS = Self::PERMISSIVE_EMAIL_AUTOLINKS.bits()
            | Self::PERMISSIVE_URL_AUTOLINKS.bits()
            | Self::PERMISSIVE_WWW_AUTOLINKS.bits();
        const NO_HTML = Self::NO_HTML_BLOCKS.bits() | Self::NO_HTML_SPANS.bits();
    }
}

impl Flags {
    /// Flags of the `CommonMark` dialect (none).
    pub const DIALECT_COMMONMARK: Self = Self::empty();

    /// Flags of the GitHub dialect.
    pub const DIALECT_GITHUB: Self = Self::PERMISSIVE_AUTOLINKS
        .union(Self::TABLES)
        .union(Self::STRIKETHROUGH)
        .union(Self::TASK_LISTS);

    /// Flags a dialect stands for.
    #[must_use]
    pub fn from_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::CommonMark => Self::DIALECT_COMMONMARK,
            Dialect::Github => Self::DIALECT_GITHUB,
        }
    }

    /// Flag (or flag group) an extension name stands for.
    #[must_use]
    pub fn from_extension(extension: Extension) -> Self {
        match extension {
            Extension::CollapseWhitespace => Self::COLLAPSE_WHITESPACE,
            Extension::PermissiveAtxHeaders => Self::PERMISSIVE_ATX_HEADERS,
            Extension::PermissiveUrlAutolinks => Self::PERMISSIVE_URL_AUTOLINKS,
            Extension::PermissiveEmailAutolinks => Self::PERMISSIVE_EMAIL_AUTOLINKS,
            Extension::PermissiveWwwAutolinks => Self::PERMISSIVE_WWW_AUTOLINKS,
            Extension::PermissiveAutolinks => Self::PERMISSIVE_AUTOLINKS,
            Extension::NoIndentedCodeBlocks => Self::NO_INDENTED_CODE_BLOCKS,
            Extension::NoHtmlBlocks => Self::NO_HTML_BLOCKS,
            Extension::NoHtmlSpans => Self::NO_HTML_SPANS,
            Extension::NoHtml => Self::NO_HTML,
            Extension::Tables => Self::TABLES,
            Extension::Strikethrough => Self::STRIKETHROUGH,
            Extension::TaskLists => Self::TASK_LISTS,
            Extension::LatexMathSpans => Self::LATEX_MATH_SPANS,
            Extension::WikiLinks => Self::WIKI_LINKS,
            Extension::Underline => Self::UNDERLINE,
        }
    }

    /// Dialect flags plus every configured extension.
    #[must_use]
    pub fn from_parser_config(config: &ParserConfig) -> Self {
        config
            .extensions
            .iter()
            .fold(Self::from_dialect(config.dialect), |flags, ext| {
                flags | Self::from_extension(*ext)
            })
    }
}

/// A named set of flags a renderer needs to receive the tags it handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub required: Flags,
}

impl Capability {
    /// Shared by every renderer: inline strike and underline styling.
    pub const BASE: Self = Self {
        name: "base",
        required: Flags::STRIKETHROUGH.union(Flags::UNDERLINE),
    };

    /// Element trees render tables.
    pub const TREE: Self = Self {
        name: "tree",
        required: Flags::TABLES,
    };

    /// Terminal output has no use for raw HTML.
    pub const TERMINAL: Self = Self {
        name: "terminal",
        required: Flags::NO_HTML,
    };
}

/// Caller flags plus every flag required by `capabilities`.
#[must_use]
pub fn configure(flags: Flags, capabilities: &[Capability]) -> Flags {
    capabilities
        .iter()
        .fold(flags, |acc, capability| acc | capability.required)
}

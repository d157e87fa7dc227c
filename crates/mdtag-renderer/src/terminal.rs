//! Terminal text renderer.
//!
//! Output is a flat buffer of fragments. Each handler appends its open
//! fragment right away and pushes exactly one pending close fragment,
//! which the matching `finish` appends. List tags also push a list context
//! used to indent and mark their items.

use std::borrow::Cow;

use mdtag_config::{Charset, HeadingMarks, ListMarks};

use crate::detail::{
    CodeDetail, HeadingDetail, ImageDetail, LiDetail, LinkDetail, OlDetail, TableCellDetail,
    UlDetail, WikiLinkDetail,
};
use crate::dispatcher::{Dispatcher, Renderer};
use crate::engine::Engine;
use crate::error::RenderError;
use crate::event::{Tag, TextKind};
use crate::flags::Capability;
use crate::options::{RenderOptions, TerminalOptions};
use crate::style::{StyleProvider, StyleTable, TextStyle};

/// Columns used when the terminal size cannot be queried.
const FALLBACK_COLUMNS: usize = 80;

/// Source of the display width used for horizontal rules.
pub trait TerminalWidth {
    fn columns(&self) -> usize;
}

/// Width of the terminal attached to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleWidth;

impl TerminalWidth for ConsoleWidth {
    fn columns(&self) -> usize {
        console::Term::stdout()
            .size_checked()
            .map_or(FALLBACK_COLUMNS, |(_rows, columns)| usize::from(columns))
    }
}

/// A fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidth(pub usize);

impl TerminalWidth for FixedWidth {
    fn columns(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Close {
    marker: Cow<'static, str>,
    /// Closing this frame also ends the innermost list.
    ends_list: bool,
}

/// An open list. Ordered lists count their items in `start`.
#[derive(Debug)]
enum ListContext {
    Unordered(UlDetail),
    Ordered(OlDetail),
}

/// Renderer producing styled terminal text.
pub struct TerminalRenderer {
    charset: Charset,
    styles: StyleTable,
    width: Box<dyn TerminalWidth + Send>,
    list_marks: ListMarks,
    heading_marks: HeadingMarks,
    rule_char: char,
    buffer: Vec<Cow<'static, str>>,
    closes: Vec<Close>,
    listing: Vec<ListContext>,
}

impl TerminalRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingStyle`] if `styles` cannot provide a
    /// marker pair for every [`TextStyle`].
    pub fn new(
        charset: Charset,
        styles: &dyn StyleProvider,
        width: Box<dyn TerminalWidth + Send>,
        options: &TerminalOptions,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            charset,
            styles: StyleTable::resolve(styles)?,
            width,
            list_marks: options.list_marks,
            heading_marks: options.heading_marks,
            rule_char: options.rule_char,
            buffer: Vec::new(),
            closes: Vec::new(),
            listing: Vec::new(),
        })
    }

    #[allow(clippy::unnecessary_wraps)]
    fn pair(
        &mut self,
        open: impl Into<Cow<'static, str>>,
        close: impl Into<Cow<'static, str>>,
    ) -> Result<(), RenderError> {
        self.buffer.push(open.into());
        self.closes.push(Close {
            marker: close.into(),
            ends_list: false,
        });
        Ok(())
    }

    fn empty(&mut self) -> Result<(), RenderError> {
        self.pair("", "")
    }

    fn styled(&mut self, style: TextStyle) -> Result<(), RenderError> {
        let pair = self.styles.get(style).clone();
        self.pair(pair.open, pair.close)
    }

    #[allow(clippy::unnecessary_wraps)]
    fn open_list(&mut self, context: ListContext) -> Result<(), RenderError> {
        self.listing.push(context);
        self.closes.push(Close {
            marker: Cow::Borrowed(""),
            ends_list: true,
        });
        Ok(())
    }

    /// Marker of the next item in the innermost list.
    fn item_mark(&mut self) -> String {
        let source = self.list_marks == ListMarks::Source;
        match self.listing.last_mut() {
            Some(ListContext::Ordered(ol)) => {
                let number = ol.start;
                ol.start = ol.start.saturating_add(1);
                if source {
                    format!("{number}{}", ol.mark_delimiter)
                } else {
                    "-".to_owned()
                }
            }
            Some(ListContext::Unordered(ul)) if source => ul.mark.to_string(),
            Some(ListContext::Unordered(_)) | None => "-".to_owned(),
        }
    }
}

impl Renderer for TerminalRenderer {
    type Output = String;
    const CAPABILITIES: &'static [Capability] = &[Capability::BASE, Capability::TERMINAL];

    fn passthrough(&mut self, _tag: Tag) -> Result<(), RenderError> {
        self.empty()
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        let close = self.closes.pop().ok_or(RenderError::Unbalanced)?;
        if close.ends_list {
            self.listing.pop();
        }
        self.buffer.push(close.marker);
        Ok(())
    }

    fn track(&mut self, kind: TextKind, text: &str) -> Result<(), RenderError> {
        let fragment = match kind {
            TextKind::NullChar => Cow::Borrowed("\u{FFFD}"),
            _ => Cow::Owned(text.to_owned()),
        };
        self.buffer.push(fragment);
        Ok(())
    }

    fn get_result(&mut self) -> Result<String, RenderError> {
        if !self.closes.is_empty() {
            self.reset();
            return Err(RenderError::Incomplete);
        }
        let output = self.buffer.concat().trim_start().to_owned();
        self.reset();
        Ok(output)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.closes.clear();
        self.listing.clear();
    }

    fn depth(&self) -> usize {
        self.closes.len()
    }

    fn handle_quote(&mut self) -> Result<(), RenderError> {
        self.styled(TextStyle::Inverse)
    }

    fn handle_ul(&mut self, detail: &UlDetail) -> Result<(), RenderError> {
        self.open_list(ListContext::Unordered(detail.clone()))
    }

    fn handle_ol(&mut self, detail: &OlDetail) -> Result<(), RenderError> {
        self.open_list(ListContext::Ordered(detail.clone()))
    }

    fn handle_li(&mut self, detail: &LiDetail) -> Result<(), RenderError> {
        let indent = "  ".repeat(self.listing.len().saturating_sub(1));
        let mark = self.item_mark();
        let task = match detail.task_mark {
            _ if !detail.is_task => "",
            Some('x' | 'X') => "[x] ",
            _ => "[ ] ",
        };
        self.pair(format!("\n{indent}{mark} {task}"), "")
    }

    fn handle_hr(&mut self) -> Result<(), RenderError> {
        let rule = self.rule_char.to_string().repeat(self.width.columns());
        self.pair(rule, "\n")
    }

    fn handle_h(&mut self, detail: &HeadingDetail) -> Result<(), RenderError> {
        match self.heading_marks {
            HeadingMarks::Uniform => self.pair("\n# ", " #\n"),
            HeadingMarks::Level => {
                let marks = "#".repeat(usize::from(detail.level.clamp(1, 6)));
                self.pair(format!("\n{marks} "), format!(" {marks}\n"))
            }
        }
    }

    fn handle_code(&mut self, _detail: Option<&CodeDetail>) -> Result<(), RenderError> {
        self.styled(TextStyle::Inverse)
    }

    fn handle_p(&mut self) -> Result<(), RenderError> {
        self.pair("", "\n")
    }

    fn handle_td(&mut self, _detail: &TableCellDetail) -> Result<(), RenderError> {
        self.empty()
    }

    fn handle_em(&mut self) -> Result<(), RenderError> {
        self.styled(TextStyle::Italic)
    }

    fn handle_strong(&mut self) -> Result<(), RenderError> {
        self.styled(TextStyle::Bold)
    }

    fn handle_a(&mut self, _detail: Option<&LinkDetail>) -> Result<(), RenderError> {
        self.empty()
    }

    fn handle_img(&mut self, detail: &ImageDetail) -> Result<(), RenderError> {
        let src = detail.src.decode(self.charset)?;
        self.pair(format!("\n{src}\n"), "")
    }

    fn handle_del(&mut self) -> Result<(), RenderError> {
        self.styled(TextStyle::Strike)
    }

    fn handle_wiki_link(&mut self, _detail: &WikiLinkDetail) -> Result<(), RenderError> {
        self.empty()
    }

    fn handle_u(&mut self) -> Result<(), RenderError> {
        self.styled(TextStyle::Underline)
    }
}

impl<'e> Dispatcher<'e, TerminalRenderer> {
    /// Dispatcher driving a [`TerminalRenderer`] built from `terminal`.
    ///
    /// # Errors
    ///
    /// Fails when the configured style set is missing a style.
    pub fn terminal(
        engine: &'e dyn Engine,
        options: &RenderOptions,
        terminal: &TerminalOptions,
    ) -> Result<Self, RenderError> {
        let renderer = TerminalRenderer::new(
            options.charset,
            terminal.style_provider().as_ref(),
            terminal.width_provider(),
            terminal,
        )?;
        Ok(Self::new(engine, renderer, options))
    }
}

#[cfg(test)]
mod tests {
    use mdtag_config::StyleChoice;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::detail::Detail;
    use crate::engine::{PulldownEngine, Replay};
    use crate::event::{BlockTag, Event, SpanTag};
    use crate::flags::Flags;
    use crate::style::{AnsiStyles, PlainStyles, StylePair};

    fn renderer(options: &TerminalOptions) -> TerminalRenderer {
        TerminalRenderer::new(Charset::Utf8, &PlainStyles, Box::new(FixedWidth(10)), options)
            .unwrap()
    }

    fn replay<'e>(
        engine: &'e Replay,
        options: &TerminalOptions,
    ) -> Dispatcher<'e, TerminalRenderer> {
        Dispatcher::new(engine, renderer(options), &RenderOptions::default())
    }

    fn plain(options: &TerminalOptions) -> TerminalOptions {
        TerminalOptions {
            styles: StyleChoice::Plain,
            width: Some(10),
            ..options.clone()
        }
    }

    fn render_with(markdown: &str, flags: Flags, terminal: &TerminalOptions) -> String {
        let options = RenderOptions {
            flags,
            ..RenderOptions::default()
        };
        Dispatcher::terminal(&PulldownEngine, &options, terminal)
            .unwrap()
            .render(markdown)
            .unwrap()
    }

    fn render(markdown: &str) -> String {
        render_with(markdown, Flags::empty(), &plain(&TerminalOptions::default()))
    }

    fn ansi(markdown: &str) -> String {
        let terminal = TerminalOptions {
            styles: StyleChoice::Ansi,
            ..plain(&TerminalOptions::default())
        };
        render_with(markdown, Flags::empty(), &terminal)
    }

    fn leave(tag: BlockTag) -> Event {
        Event::Leave(Tag::Block(tag))
    }

    fn heading_events() -> Vec<Event> {
        vec![
            Event::block(BlockTag::Doc),
            Event::Enter(
                Tag::Block(BlockTag::H),
                Some(Detail::Heading(HeadingDetail { level: 2 })),
            ),
            Event::text("Title"),
            leave(BlockTag::H),
            leave(BlockTag::Doc),
        ]
    }

    #[test]
    fn test_heading_round_trip() {
        let engine = Replay::new(heading_events());
        let mut dispatcher = replay(&engine, &TerminalOptions::default());
        assert_eq!(dispatcher.render("").unwrap(), "# Title #\n");
    }

    #[test]
    fn test_heading_level_marks() {
        let options = TerminalOptions {
            heading_marks: HeadingMarks::Level,
            ..TerminalOptions::default()
        };
        let engine = Replay::new(heading_events());
        let mut dispatcher = replay(&engine, &options);
        assert_eq!(dispatcher.render("").unwrap(), "## Title ##\n");
    }

    #[test]
    fn test_rule_uses_reported_width() {
        let mut renderer = renderer(&TerminalOptions::default());
        renderer.handle_hr().unwrap();
        renderer.finish().unwrap();
        assert_eq!(renderer.get_result().unwrap(), format!("{}\n", "-".repeat(10)));
    }

    #[test]
    fn test_rule_char_from_options() {
        let terminal = TerminalOptions {
            rule_char: '=',
            ..plain(&TerminalOptions::default())
        };
        assert_eq!(render_with("---\n", Flags::empty(), &terminal), "==========\n");
    }

    #[test]
    fn test_rule_ends_its_line() {
        assert_eq!(render("a\n\n---\n\nb\n"), "a\n----------\nb\n");
    }

    #[test]
    fn test_nested_list_indentation() {
        assert_eq!(render("- a\n- b\n  - c\n"), "- a\n- b\n  - c");
    }

    #[test]
    fn test_dash_marks_for_ordered_lists() {
        assert_eq!(render("3. a\n4. b\n"), "- a\n- b");
    }

    #[test]
    fn test_source_marks() {
        let terminal = TerminalOptions {
            list_marks: ListMarks::Source,
            ..plain(&TerminalOptions::default())
        };
        assert_eq!(
            render_with("3) a\n4) b\n\n* c\n", Flags::empty(), &terminal),
            "3) a\n4) b\n* c"
        );
    }

    #[test]
    fn test_list_context_ends_with_list() {
        let terminal = TerminalOptions {
            list_marks: ListMarks::Source,
            ..plain(&TerminalOptions::default())
        };
        assert_eq!(
            render_with("1. a\n   - b\n2. c\n", Flags::empty(), &terminal),
            "1. a\n  - b\n2. c"
        );
    }

    #[test]
    fn test_task_items() {
        let engine = Replay::new(vec![
            Event::Enter(Tag::Block(BlockTag::Ul), Some(Detail::Ul(UlDetail::default()))),
            Event::Enter(
                Tag::Block(BlockTag::Li),
                Some(Detail::Li(LiDetail {
                    is_task: true,
                    task_mark: Some('X'),
                    task_mark_offset: Some(3),
                })),
            ),
            Event::text("done"),
            leave(BlockTag::Li),
            Event::Enter(
                Tag::Block(BlockTag::Li),
                Some(Detail::Li(LiDetail {
                    is_task: true,
                    task_mark: Some(' '),
                    task_mark_offset: Some(14),
                })),
            ),
            Event::text("todo"),
            leave(BlockTag::Li),
            leave(BlockTag::Ul),
        ]);
        let mut dispatcher = replay(&engine, &TerminalOptions::default());
        assert_eq!(dispatcher.render("").unwrap(), "- [x] done\n- [ ] todo");
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(render("a\n\nb\n"), "a\nb\n");
    }

    #[test]
    fn test_image_source_on_its_own_line() {
        assert_eq!(render("![alt](a.png)"), "a.png\nalt\n");
    }

    #[test]
    fn test_ansi_styles_nest_lifo() {
        assert_eq!(
            ansi("*a **b** c*"),
            "\x1b[3ma \x1b[1mb\x1b[22m c\x1b[23m\n"
        );
    }

    #[test]
    fn test_quote_and_code_are_inverse() {
        let out = ansi("> q `c`");
        assert_eq!(out, "\x1b[7mq \x1b[7mc\x1b[27m\n\x1b[27m");
        assert_eq!(console::strip_ansi_codes(&out), "q c\n");
    }

    #[test]
    fn test_strike_from_capabilities() {
        assert_eq!(ansi("~~x~~"), "\x1b[9mx\x1b[29m\n");
    }

    #[test]
    fn test_html_rendered_as_text() {
        assert_eq!(render("a <b>c</b>"), "a <b>c</b>\n");
    }

    #[test]
    fn test_missing_style_fails_construction() {
        struct Partial;
        impl StyleProvider for Partial {
            fn pair(&self, style: TextStyle) -> Option<StylePair> {
                (style != TextStyle::Underline).then(|| AnsiStyles.pair(style)).flatten()
            }
        }
        let result = TerminalRenderer::new(
            Charset::Utf8,
            &Partial,
            Box::new(FixedWidth(10)),
            &TerminalOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RenderError::MissingStyle(TextStyle::Underline))
        ));
    }

    #[test]
    fn test_closes_balance_with_enters() {
        let mut renderer = renderer(&TerminalOptions::default());
        renderer.handle_doc().unwrap();
        renderer.handle_ul(&UlDetail::default()).unwrap();
        renderer.handle_li(&LiDetail::default()).unwrap();
        renderer.handle_table().unwrap();
        assert_eq!(renderer.depth(), 4);
        for _ in 0..4 {
            renderer.finish().unwrap();
        }
        assert_eq!(renderer.depth(), 0);
        assert!(matches!(renderer.finish(), Err(RenderError::Unbalanced)));
    }

    #[test]
    fn test_incomplete_pass_resets() {
        let engine = Replay::new(vec![
            Event::block(BlockTag::Doc),
            Event::span(SpanTag::Em),
        ]);
        let mut dispatcher = replay(&engine, &TerminalOptions::default());
        assert!(matches!(dispatcher.render(""), Err(RenderError::Incomplete)));
        assert_eq!(dispatcher.renderer().depth(), 0);
    }

    #[test]
    fn test_render_twice_is_idempotent() {
        let terminal = plain(&TerminalOptions::default());
        let mut dispatcher =
            Dispatcher::terminal(&PulldownEngine, &RenderOptions::default(), &terminal).unwrap();
        let markdown = "# A\n\n1. x\n2. y\n\n---\n";
        let first = dispatcher.render(markdown).unwrap();
        let second = dispatcher.render(markdown).unwrap();
        assert_eq!(first, second);
    }
}

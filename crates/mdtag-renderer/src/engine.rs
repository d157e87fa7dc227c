//! Event sources.
//!
//! An [`Engine`] parses markdown and reports enter/leave/text events to an
//! [`EventSink`], in document order, with every enter matched by a leave.
//! [`PulldownEngine`] adapts `pulldown-cmark` to this model; [`Recorder`] and
//! [`Replay`] capture and re-emit owned event streams.

use std::ops::Range;

use mdtag_config::Charset;
use pulldown_cmark::{
    Alignment, CodeBlockKind, Event as MdEvent, LinkType, Options, Parser, Tag as MdTag, TagEnd,
};

use crate::detail::{
    Attribute, CodeDetail, Detail, HeadingDetail, ImageDetail, LiDetail, LinkDetail, OlDetail,
    TableCellDetail, UlDetail, WikiLinkDetail,
};
use crate::encoding::encode;
use crate::error::RenderError;
use crate::event::{Align, BlockTag, Event, SpanTag, Tag, TextKind};
use crate::flags::Flags;
use crate::util::{collapse_whitespace, heading_level_to_num};

/// Receiver of parse events.
pub trait EventSink {
    /// A tag was entered.
    fn enter(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError>;

    /// A tag was left. `detail` repeats the payload of the matching enter.
    fn leave(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError>;

    /// A text run.
    fn text(&mut self, kind: TextKind, text: &[u8]) -> Result<(), RenderError>;

    /// Charset the sink expects text runs and attributes in.
    fn charset(&self) -> Charset {
        Charset::Utf8
    }
}

/// Markdown parser producing events.
pub trait Engine {
    /// Parse `source` with `flags`, reporting events to `sink`.
    ///
    /// Stops at the first error returned by the sink.
    fn parse(&self, source: &str, flags: Flags, sink: &mut dyn EventSink)
    -> Result<(), RenderError>;
}

/// Parse `source` and collect the events.
pub fn record(engine: &dyn Engine, source: &str, flags: Flags) -> Result<Vec<Event>, RenderError> {
    let mut recorder = Recorder::default();
    engine.parse(source, flags, &mut recorder)?;
    Ok(recorder.into_events())
}

/// Sink that stores every event it receives.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Vec<Event>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventSink for Recorder {
    fn enter(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError> {
        self.events.push(Event::Enter(tag, detail.cloned()));
        Ok(())
    }

    fn leave(&mut self, tag: Tag, _detail: Option<&Detail>) -> Result<(), RenderError> {
        self.events.push(Event::Leave(tag));
        Ok(())
    }

    fn text(&mut self, kind: TextKind, text: &[u8]) -> Result<(), RenderError> {
        self.events.push(Event::Text(kind, text.to_vec()));
        Ok(())
    }
}

/// Engine that ignores its input and re-emits a fixed event stream.
///
/// Leave events are replayed with the detail of their matching enter.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    events: Vec<Event>,
}

impl Replay {
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl Engine for Replay {
    fn parse(
        &self,
        _source: &str,
        _flags: Flags,
        sink: &mut dyn EventSink,
    ) -> Result<(), RenderError> {
        let mut open: Vec<Option<&Detail>> = Vec::new();
        for event in &self.events {
            match event {
                Event::Enter(tag, detail) => {
                    sink.enter(*tag, detail.as_ref())?;
                    open.push(detail.as_ref());
                }
                Event::Leave(tag) => sink.leave(*tag, open.pop().flatten())?,
                Event::Text(kind, text) => sink.text(*kind, text)?,
            }
        }
        Ok(())
    }
}

/// Adapter from `pulldown-cmark` to the enter/leave/text model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownEngine;

impl PulldownEngine {
    /// Flags `pulldown-cmark` has no equivalent for.
    pub const UNSUPPORTED: Flags = Flags::PERMISSIVE_ATX_HEADERS
        .union(Flags::PERMISSIVE_AUTOLINKS)
        .union(Flags::NO_INDENTED_CODE_BLOCKS)
        .union(Flags::UNDERLINE);

    /// Parser options for `flags`.
    #[must_use]
    pub fn options(flags: Flags) -> Options {
        let mut options = Options::empty();
        if flags.contains(Flags::TABLES) {
            options.insert(Options::ENABLE_TABLES);
        }
        if flags.contains(Flags::STRIKETHROUGH) {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if flags.contains(Flags::TASK_LISTS) {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if flags.contains(Flags::LATEX_MATH_SPANS) {
            options.insert(Options::ENABLE_MATH);
        }
        if flags.contains(Flags::WIKI_LINKS) {
            options.insert(Options::ENABLE_WIKILINKS);
        }
        options
    }
}

impl Engine for PulldownEngine {
    fn parse(
        &self,
        source: &str,
        flags: Flags,
        sink: &mut dyn EventSink,
    ) -> Result<(), RenderError> {
        let ignored = flags & Self::UNSUPPORTED;
        if !ignored.is_empty() {
            tracing::debug!(flags = ?ignored, "Parser flags have no effect with pulldown-cmark");
        }

        // Lists and items need lookahead (tightness, task markers).
        let events: Vec<_> = Parser::new_ext(source, Self::options(flags))
            .into_offset_iter()
            .collect();

        let mut translator = Translator {
            source,
            flags,
            charset: sink.charset(),
            sink,
            open: Vec::new(),
            table: TableCursor::default(),
        };
        translator.run(&events)
    }
}

type SourceEvent<'a> = (MdEvent<'a>, Range<usize>);

/// Open tag with its detail, or `None` for a pulldown tag with no
/// counterpart.
type Frame = Option<(Tag, Option<Detail>)>;

struct Translator<'a, 's> {
    source: &'a str,
    flags: Flags,
    charset: Charset,
    sink: &'s mut dyn EventSink,
    open: Vec<Frame>,
    table: TableCursor,
}

impl Translator<'_, '_> {
    fn run(&mut self, events: &[SourceEvent<'_>]) -> Result<(), RenderError> {
        let doc = Tag::Block(BlockTag::Doc);
        self.sink.enter(doc, None)?;
        for (index, (event, range)) in events.iter().enumerate() {
            match event {
                MdEvent::Start(tag) => self.start(events, index, tag, range)?,
                MdEvent::End(tag) => self.end(tag)?,
                MdEvent::Text(text) => {
                    let kind = if self.in_code_block() {
                        TextKind::Code
                    } else {
                        TextKind::Normal
                    };
                    self.text(kind, text)?;
                }
                MdEvent::Code(code) => self.wrapped(SpanTag::Code, TextKind::Code, code)?,
                MdEvent::InlineMath(math) => {
                    self.wrapped(SpanTag::LatexMath, TextKind::LatexMath, math)?;
                }
                MdEvent::DisplayMath(math) => {
                    self.wrapped(SpanTag::LatexMathDisplay, TextKind::LatexMath, math)?;
                }
                MdEvent::Html(html) => {
                    let kind = self.html_kind(Flags::NO_HTML_BLOCKS);
                    self.text(kind, html)?;
                }
                MdEvent::InlineHtml(html) => {
                    let kind = self.html_kind(Flags::NO_HTML_SPANS);
                    self.text(kind, html)?;
                }
                MdEvent::SoftBreak => self.sink.text(TextKind::SoftBr, b"\n")?,
                MdEvent::HardBreak => self.sink.text(TextKind::Br, b"\n")?,
                MdEvent::Rule => {
                    let hr = Tag::Block(BlockTag::Hr);
                    self.sink.enter(hr, None)?;
                    self.sink.leave(hr, None)?;
                }
                // Task markers are reported on the enclosing item.
                _ => {}
            }
        }
        self.sink.leave(doc, None)
    }

    fn start(
        &mut self,
        events: &[SourceEvent<'_>],
        index: usize,
        tag: &MdTag<'_>,
        range: &Range<usize>,
    ) -> Result<(), RenderError> {
        let frame = match tag {
            MdTag::Paragraph => block(BlockTag::P, None),
            MdTag::Heading { level, .. } => block(
                BlockTag::H,
                Some(Detail::Heading(HeadingDetail {
                    level: heading_level_to_num(*level),
                })),
            ),
            MdTag::BlockQuote(_) => block(BlockTag::Quote, None),
            MdTag::CodeBlock(kind) => block(
                BlockTag::Code,
                Some(Detail::Code(self.code_detail(kind, range)?)),
            ),
            MdTag::HtmlBlock if self.flags.contains(Flags::NO_HTML_BLOCKS) => {
                block(BlockTag::P, None)
            }
            MdTag::HtmlBlock => block(BlockTag::Html, None),
            MdTag::List(Some(start)) => block(
                BlockTag::Ol,
                Some(Detail::Ol(OlDetail {
                    start: *start,
                    is_tight: is_tight(events, index),
                    mark_delimiter: self.ordered_delimiter(range),
                })),
            ),
            MdTag::List(None) => block(
                BlockTag::Ul,
                Some(Detail::Ul(UlDetail {
                    is_tight: is_tight(events, index),
                    mark: self.bullet_mark(range),
                })),
            ),
            MdTag::Item => block(
                BlockTag::Li,
                Some(Detail::Li(task_marker(events, index, self.source))),
            ),
            MdTag::Table(alignments) => {
                self.table.start(alignments);
                block(BlockTag::Table, None)
            }
            MdTag::TableHead => {
                self.table.start_head();
                self.open_frame(block(BlockTag::Thead, None))?;
                block(BlockTag::Tr, None)
            }
            MdTag::TableRow => {
                if !self.table.body_open {
                    self.table.body_open = true;
                    self.open_frame(block(BlockTag::Tbody, None))?;
                }
                self.table.start_row();
                block(BlockTag::Tr, None)
            }
            MdTag::TableCell if self.table.in_head => block(BlockTag::Th, None),
            MdTag::TableCell => block(
                BlockTag::Td,
                Some(Detail::TableCell(TableCellDetail {
                    align: self.table.current_align(),
                })),
            ),
            MdTag::Emphasis => span(SpanTag::Em, None),
            MdTag::Strong => span(SpanTag::Strong, None),
            MdTag::Strikethrough => span(SpanTag::Del, None),
            MdTag::Link {
                link_type: LinkType::WikiLink { .. },
                dest_url,
                ..
            } => span(
                SpanTag::WikiLink,
                Some(Detail::WikiLink(WikiLinkDetail {
                    target: self.attribute(dest_url)?,
                })),
            ),
            MdTag::Link {
                dest_url, title, ..
            } => span(
                SpanTag::A,
                Some(Detail::Link(LinkDetail {
                    href: self.attribute(dest_url)?,
                    title: self.attribute(title)?,
                })),
            ),
            MdTag::Image {
                dest_url, title, ..
            } => span(
                SpanTag::Img,
                Some(Detail::Image(ImageDetail {
                    src: self.attribute(dest_url)?,
                    title: self.attribute(title)?,
                })),
            ),
            _ => None,
        };
        self.open_frame(frame)
    }

    fn end(&mut self, tag: &TagEnd) -> Result<(), RenderError> {
        match tag {
            TagEnd::TableHead => {
                // The head row was opened alongside the head itself.
                self.close_frame()?;
                self.table.end_head();
            }
            TagEnd::TableCell => self.table.next_cell(),
            TagEnd::Table => {
                if self.table.body_open {
                    self.close_frame()?;
                }
                self.table = TableCursor::default();
            }
            _ => {}
        }
        self.close_frame()
    }

    fn open_frame(&mut self, frame: Frame) -> Result<(), RenderError> {
        if let Some((tag, detail)) = &frame {
            self.sink.enter(*tag, detail.as_ref())?;
        }
        self.open.push(frame);
        Ok(())
    }

    fn close_frame(&mut self) -> Result<(), RenderError> {
        match self.open.pop() {
            Some(Some((tag, detail))) => self.sink.leave(tag, detail.as_ref()),
            _ => Ok(()),
        }
    }

    /// A span holding a single text run.
    fn wrapped(&mut self, tag: SpanTag, kind: TextKind, text: &str) -> Result<(), RenderError> {
        let tag = Tag::Span(tag);
        self.sink.enter(tag, None)?;
        self.text(kind, text)?;
        self.sink.leave(tag, None)
    }

    fn text(&mut self, kind: TextKind, text: &str) -> Result<(), RenderError> {
        if kind == TextKind::Normal && self.flags.contains(Flags::COLLAPSE_WHITESPACE) {
            let collapsed = collapse_whitespace(text);
            return self.sink.text(kind, &encode(self.charset, &collapsed)?);
        }
        self.sink.text(kind, &encode(self.charset, text)?)
    }

    fn attribute(&self, text: &str) -> Result<Attribute, RenderError> {
        Ok(Attribute::new(encode(self.charset, text)?))
    }

    fn html_kind(&self, suppressed_by: Flags) -> TextKind {
        if self.flags.intersects(suppressed_by) {
            TextKind::Normal
        } else {
            TextKind::Html
        }
    }

    fn in_code_block(&self) -> bool {
        matches!(self.open.last(), Some(Some((Tag::Block(BlockTag::Code), _))))
    }

    fn code_detail(
        &self,
        kind: &CodeBlockKind<'_>,
        range: &Range<usize>,
    ) -> Result<CodeDetail, RenderError> {
        let detail = match kind {
            CodeBlockKind::Fenced(info) => {
                let lang = info.split_whitespace().next().unwrap_or_default();
                let fence_char = self
                    .marker(range)
                    .chars()
                    .next()
                    .filter(|c| matches!(c, '`' | '~'));
                CodeDetail {
                    info: self.attribute(info)?,
                    lang: self.attribute(lang)?,
                    fence_char,
                }
            }
            CodeBlockKind::Indented => CodeDetail::default(),
        };
        Ok(detail)
    }

    fn bullet_mark(&self, range: &Range<usize>) -> char {
        self.marker(range)
            .chars()
            .next()
            .filter(|c| matches!(c, '-' | '+' | '*'))
            .unwrap_or('-')
    }

    fn ordered_delimiter(&self, range: &Range<usize>) -> char {
        self.marker(range)
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .chars()
            .next()
            .filter(|c| matches!(c, '.' | ')'))
            .unwrap_or('.')
    }

    /// Source text of a block, from its first non-blank character.
    fn marker(&self, range: &Range<usize>) -> &str {
        self.source
            .get(range.clone())
            .map_or("", str::trim_start)
    }
}

fn block(tag: BlockTag, detail: Option<Detail>) -> Frame {
    Some((Tag::Block(tag), detail))
}

fn span(tag: SpanTag, detail: Option<Detail>) -> Frame {
    Some((Tag::Span(tag), detail))
}

/// A list is tight when none of its items holds a paragraph.
fn is_tight(events: &[SourceEvent<'_>], list: usize) -> bool {
    let mut depth = 0usize;
    for (event, _) in &events[list..] {
        match event {
            // Depth 2 is directly inside one of this list's items.
            MdEvent::Start(MdTag::Paragraph) if depth == 2 => return false,
            MdEvent::Start(_) => depth += 1,
            MdEvent::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    true
}

/// Task marker of the item starting at `item`, if any.
fn task_marker(events: &[SourceEvent<'_>], item: usize, source: &str) -> LiDetail {
    for (event, range) in events.iter().skip(item + 1) {
        match event {
            MdEvent::Start(MdTag::Paragraph) => {}
            MdEvent::TaskListMarker(checked) => {
                let offset = range.start + 1;
                let task_mark = source
                    .as_bytes()
                    .get(offset)
                    .map(|&b| char::from(b))
                    .filter(|c| matches!(c, 'x' | 'X' | ' '))
                    .unwrap_or(if *checked { 'x' } else { ' ' });
                return LiDetail {
                    is_task: true,
                    task_mark: Some(task_mark),
                    task_mark_offset: Some(offset),
                };
            }
            _ => break,
        }
    }
    LiDetail::default()
}

/// Position within the table being translated.
#[derive(Debug, Default)]
struct TableCursor {
    alignments: Vec<Alignment>,
    in_head: bool,
    body_open: bool,
    cell_index: usize,
}

impl TableCursor {
    fn start(&mut self, alignments: &[Alignment]) {
        self.alignments = alignments.to_vec();
        self.in_head = false;
        self.body_open = false;
        self.cell_index = 0;
    }

    fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    fn end_head(&mut self) {
        self.in_head = false;
    }

    fn start_row(&mut self) {
        self.cell_index = 0;
    }

    fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    fn current_align(&self) -> Align {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => Align::Left,
            Some(Alignment::Center) => Align::Center,
            Some(Alignment::Right) => Align::Right,
            Some(Alignment::None) | None => Align::Default,
        }
    }
}

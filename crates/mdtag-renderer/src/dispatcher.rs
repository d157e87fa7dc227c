//! Routing of engine events to renderer handlers.

use std::borrow::Cow;

use mdtag_config::Charset;

use crate::detail::{
    CodeDetail, Detail, HeadingDetail, ImageDetail, LiDetail, LinkDetail, OlDetail,
    TableCellDetail, UlDetail, WikiLinkDetail,
};
use crate::encoding::decode;
use crate::engine::{Engine, EventSink};
use crate::error::RenderError;
use crate::event::{BlockTag, HandlerKey, SpanTag, Tag, TextKind};
use crate::flags::{Capability, Flags, configure};
use crate::options::RenderOptions;

/// Output builder driven by a [`Dispatcher`].
///
/// Every `handle_*` call must register exactly one frame, so that the
/// matching [`finish`](Self::finish) has something to pop. Handlers a
/// renderer does not override fall back to [`passthrough`](Self::passthrough).
pub trait Renderer {
    /// Result of a completed pass.
    type Output;

    /// Capabilities whose flags this renderer needs from the engine.
    const CAPABILITIES: &'static [Capability];

    /// Register an invisible frame for a tag without a dedicated handler.
    fn passthrough(&mut self, tag: Tag) -> Result<(), RenderError>;

    /// Close the innermost open frame.
    fn finish(&mut self) -> Result<(), RenderError>;

    /// Append decoded text to the innermost open frame.
    fn track(&mut self, kind: TextKind, text: &str) -> Result<(), RenderError>;

    /// Take the output of a completed pass and reset for the next one.
    ///
    /// Fails with [`RenderError::Incomplete`] when frames are still open;
    /// the renderer is reset either way.
    fn get_result(&mut self) -> Result<Self::Output, RenderError>;

    /// Drop all state of the current pass.
    fn reset(&mut self);

    /// Number of open frames.
    fn depth(&self) -> usize;

    fn handle_doc(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Doc))
    }

    fn handle_quote(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Quote))
    }

    fn handle_ul(&mut self, _detail: &UlDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Ul))
    }

    fn handle_ol(&mut self, _detail: &OlDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Ol))
    }

    fn handle_li(&mut self, _detail: &LiDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Li))
    }

    fn handle_hr(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Hr))
    }

    fn handle_h(&mut self, _detail: &HeadingDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::H))
    }

    /// Code block when `detail` is present, code span otherwise.
    fn handle_code(&mut self, detail: Option<&CodeDetail>) -> Result<(), RenderError> {
        match detail {
            Some(_) => self.passthrough(Tag::Block(BlockTag::Code)),
            None => self.passthrough(Tag::Span(SpanTag::Code)),
        }
    }

    fn handle_html(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Html))
    }

    fn handle_p(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::P))
    }

    fn handle_table(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Table))
    }

    fn handle_thead(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Thead))
    }

    fn handle_tbody(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Tbody))
    }

    fn handle_tr(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Tr))
    }

    fn handle_th(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Th))
    }

    fn handle_td(&mut self, _detail: &TableCellDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Block(BlockTag::Td))
    }

    fn handle_em(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::Em))
    }

    fn handle_strong(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::Strong))
    }

    /// Link; `detail` is absent only for malformed streams.
    fn handle_a(&mut self, _detail: Option<&LinkDetail>) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::A))
    }

    fn handle_img(&mut self, _detail: &ImageDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::Img))
    }

    fn handle_del(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::Del))
    }

    fn handle_latex_math(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::LatexMath))
    }

    fn handle_latex_math_display(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::LatexMathDisplay))
    }

    fn handle_wiki_link(&mut self, _detail: &WikiLinkDetail) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::WikiLink))
    }

    fn handle_u(&mut self) -> Result<(), RenderError> {
        self.passthrough(Tag::Span(SpanTag::U))
    }
}

/// Drives one renderer with events from a borrowed engine.
///
/// The effective flags are the caller's flags plus those required by the
/// renderer's capabilities, resolved once at construction.
pub struct Dispatcher<'e, R> {
    engine: &'e dyn Engine,
    renderer: R,
    flags: Flags,
    charset: Charset,
}

impl<'e, R: Renderer> Dispatcher<'e, R> {
    #[must_use]
    pub fn new(engine: &'e dyn Engine, renderer: R, options: &RenderOptions) -> Self {
        let flags = configure(options.flags, R::CAPABILITIES);
        tracing::debug!(
            flags = ?flags,
            charset = options.charset.label(),
            capabilities = ?R::CAPABILITIES.iter().map(|c| c.name).collect::<Vec<_>>(),
            "Configured dispatcher"
        );
        Self {
            engine,
            renderer,
            flags,
            charset: options.charset,
        }
    }

    /// Flags passed to the engine.
    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Render `source` in one full pass.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the engine or the renderer. The
    /// renderer is reset and no partial output is returned.
    pub fn render(&mut self, source: &str) -> Result<R::Output, RenderError> {
        let engine = self.engine;
        let flags = self.flags;
        let result = engine
            .parse(source, flags, self)
            .and_then(|()| self.renderer.get_result());
        match result {
            Ok(output) => {
                tracing::debug!(bytes = source.len(), "Rendered document");
                Ok(output)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Render pass failed");
                self.renderer.reset();
                Err(e)
            }
        }
    }

    /// Route an enter event to the handler of `tag`.
    ///
    /// A payload that does not belong to `tag` is replaced by the tag's
    /// default payload.
    pub fn on_enter(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError> {
        debug_assert!(
            detail.is_none_or(|d| d.belongs_to(tag)),
            "{tag} entered with a foreign detail payload"
        );
        let r = &mut self.renderer;
        match tag.handler() {
            HandlerKey::Doc => r.handle_doc(),
            HandlerKey::Quote => r.handle_quote(),
            HandlerKey::Ul => r.handle_ul(&typed(detail.and_then(Detail::as_ul))),
            HandlerKey::Ol => r.handle_ol(&typed(detail.and_then(Detail::as_ol))),
            HandlerKey::Li => r.handle_li(&typed(detail.and_then(Detail::as_li))),
            HandlerKey::Hr => r.handle_hr(),
            HandlerKey::H => r.handle_h(&typed(detail.and_then(Detail::as_heading))),
            HandlerKey::Code => match tag {
                Tag::Block(_) => r.handle_code(Some(&*typed(detail.and_then(Detail::as_code)))),
                Tag::Span(_) => r.handle_code(None),
            },
            HandlerKey::Html => r.handle_html(),
            HandlerKey::P => r.handle_p(),
            HandlerKey::Table => r.handle_table(),
            HandlerKey::Thead => r.handle_thead(),
            HandlerKey::Tbody => r.handle_tbody(),
            HandlerKey::Tr => r.handle_tr(),
            HandlerKey::Th => r.handle_th(),
            HandlerKey::Td => r.handle_td(&typed(detail.and_then(Detail::as_table_cell))),
            HandlerKey::Em => r.handle_em(),
            HandlerKey::Strong => r.handle_strong(),
            HandlerKey::A => r.handle_a(detail.and_then(Detail::as_link)),
            HandlerKey::Img => r.handle_img(&typed(detail.and_then(Detail::as_image))),
            HandlerKey::Del => r.handle_del(),
            HandlerKey::LatexMath => r.handle_latex_math(),
            HandlerKey::LatexMathDisplay => r.handle_latex_math_display(),
            HandlerKey::WikiLink => {
                r.handle_wiki_link(&typed(detail.and_then(Detail::as_wiki_link)))
            }
            HandlerKey::U => r.handle_u(),
        }
    }

    /// Every leave event closes the innermost frame.
    pub fn on_leave(&mut self, _tag: Tag, _detail: Option<&Detail>) -> Result<(), RenderError> {
        self.renderer.finish()
    }

    /// Decode a text run and hand it to the renderer.
    pub fn on_text(&mut self, kind: TextKind, bytes: &[u8]) -> Result<(), RenderError> {
        let text = decode(self.charset, bytes)?;
        self.renderer.track(kind, &text)
    }
}

impl<R: Renderer> EventSink for Dispatcher<'_, R> {
    fn enter(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError> {
        self.on_enter(tag, detail)
    }

    fn leave(&mut self, tag: Tag, detail: Option<&Detail>) -> Result<(), RenderError> {
        self.on_leave(tag, detail)
    }

    fn text(&mut self, kind: TextKind, text: &[u8]) -> Result<(), RenderError> {
        self.on_text(kind, text)
    }

    fn charset(&self) -> Charset {
        self.charset
    }
}

fn typed<T: Clone + Default>(detail: Option<&T>) -> Cow<'_, T> {
    detail.map_or_else(|| Cow::Owned(T::default()), Cow::Borrowed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::engine::Replay;
    use crate::event::Event;

    /// Logs every call it receives.
    #[derive(Debug, Default)]
    struct Probe {
        log: Vec<String>,
        depth: usize,
    }

    impl Renderer for Probe {
        type Output = Vec<String>;
        const CAPABILITIES: &'static [Capability] = &[Capability::BASE, Capability::TREE];

        fn passthrough(&mut self, tag: Tag) -> Result<(), RenderError> {
            self.log.push(format!("pass {tag}"));
            self.depth += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<(), RenderError> {
            self.depth = self.depth.checked_sub(1).ok_or(RenderError::Unbalanced)?;
            self.log.push("finish".to_owned());
            Ok(())
        }

        fn track(&mut self, kind: TextKind, text: &str) -> Result<(), RenderError> {
            self.log.push(format!("{} {text}", kind.name()));
            Ok(())
        }

        fn get_result(&mut self) -> Result<Vec<String>, RenderError> {
            if self.depth != 0 {
                self.reset();
                return Err(RenderError::Incomplete);
            }
            Ok(std::mem::take(&mut self.log))
        }

        fn reset(&mut self) {
            self.log.clear();
            self.depth = 0;
        }

        fn depth(&self) -> usize {
            self.depth
        }

        fn handle_ol(&mut self, detail: &OlDetail) -> Result<(), RenderError> {
            self.log.push(format!("ol {}", detail.start));
            self.depth += 1;
            Ok(())
        }
    }

    fn leave(tag: BlockTag) -> Event {
        Event::Leave(Tag::Block(tag))
    }

    fn options(flags: Flags, charset: Charset) -> RenderOptions {
        RenderOptions { flags, charset }
    }

    #[test]
    fn test_flags_include_capabilities() {
        let engine = Replay::default();
        let dispatcher = Dispatcher::new(
            &engine,
            Probe::default(),
            &options(Flags::WIKI_LINKS, Charset::Utf8),
        );
        assert_eq!(
            dispatcher.flags(),
            Flags::WIKI_LINKS | Flags::STRIKETHROUGH | Flags::UNDERLINE | Flags::TABLES
        );
    }

    #[test]
    fn test_unspecialised_tags_pass_through() {
        let engine = Replay::new(vec![
            Event::block(BlockTag::Doc),
            Event::Enter(
                Tag::Block(BlockTag::Ol),
                Some(Detail::Ol(OlDetail {
                    start: 5,
                    ..OlDetail::default()
                })),
            ),
            Event::text("x"),
            leave(BlockTag::Ol),
            leave(BlockTag::Doc),
        ]);
        let mut dispatcher =
            Dispatcher::new(&engine, Probe::default(), &RenderOptions::default());
        assert_eq!(
            dispatcher.render("").unwrap(),
            vec!["pass doc", "ol 5", "normal x", "finish", "finish"]
        );
    }

    #[test]
    fn test_missing_detail_uses_default_payload() {
        let engine = Replay::new(vec![
            Event::block(BlockTag::Ol),
            leave(BlockTag::Ol),
        ]);
        let mut dispatcher =
            Dispatcher::new(&engine, Probe::default(), &RenderOptions::default());
        assert_eq!(dispatcher.render("").unwrap(), vec!["ol 1", "finish"]);
    }

    #[test]
    fn test_span_and_block_code_share_handler() {
        let engine = Replay::new(vec![
            Event::Enter(Tag::Block(BlockTag::Code), None),
            leave(BlockTag::Code),
            Event::span(SpanTag::Code),
            Event::Leave(Tag::Span(SpanTag::Code)),
        ]);
        let mut dispatcher =
            Dispatcher::new(&engine, Probe::default(), &RenderOptions::default());
        let log = dispatcher.render("").unwrap();
        assert_eq!(log[0], "pass code");
        assert_eq!(log[2], "pass code");
    }

    #[test]
    fn test_encoding_error_returns_no_partial_output() {
        let engine = Replay::new(vec![
            Event::block(BlockTag::Doc),
            Event::text("naïve"),
            leave(BlockTag::Doc),
        ]);
        let mut dispatcher = Dispatcher::new(
            &engine,
            Probe::default(),
            &options(Flags::empty(), Charset::Ascii),
        );
        let err = dispatcher.render("").unwrap_err();
        assert!(matches!(err, RenderError::Encoding { offset: 2, .. }));
        assert_eq!(dispatcher.renderer().depth(), 0);
        assert!(dispatcher.renderer().log.is_empty());
    }

    #[test]
    fn test_unbalanced_stream_is_incomplete() {
        let engine = Replay::new(vec![Event::block(BlockTag::Doc)]);
        let mut dispatcher =
            Dispatcher::new(&engine, Probe::default(), &RenderOptions::default());
        assert!(matches!(
            dispatcher.render(""),
            Err(RenderError::Incomplete)
        ));
        assert_eq!(dispatcher.renderer().depth(), 0);
    }

    #[test]
    fn test_render_twice_is_idempotent() {
        let engine = Replay::new(vec![
            Event::block(BlockTag::Doc),
            Event::text("a"),
            leave(BlockTag::Doc),
        ]);
        let mut dispatcher =
            Dispatcher::new(&engine, Probe::default(), &RenderOptions::default());
        let first = dispatcher.render("").unwrap();
        let second = dispatcher.render("").unwrap();
        assert_eq!(first, second);
    }
}

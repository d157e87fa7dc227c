//! Element tree renderer.
//!
//! Builds one [`Element`] tree per pass with an explicit stack of open
//! frames. Void elements (`hr`, `img`) are frames too, so every enter has a
//! frame for its leave to pop, but they never receive children: text
//! anywhere inside an image becomes its `alt` attribute, even below a
//! nested span, and text inside a rule is dropped.

use mdtag_config::Charset;

use crate::detail::{
    Attribute, CodeDetail, HeadingDetail, ImageDetail, LiDetail, LinkDetail, OlDetail,
    TableCellDetail, UlDetail, WikiLinkDetail,
};
use crate::dispatcher::{Dispatcher, Renderer};
use crate::element::{Element, Node};
use crate::engine::Engine;
use crate::error::RenderError;
use crate::event::{Align, Tag, TextKind};
use crate::flags::Capability;
use crate::options::RenderOptions;

#[derive(Debug)]
enum Frame {
    Element(Element),
    /// A tag with no element of its own; its content goes to the
    /// nearest enclosing element.
    Transparent,
}

impl Frame {
    fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Transparent => None,
        }
    }
}

/// Renderer producing an [`Element`] tree rooted at `body`.
#[derive(Debug)]
pub struct TreeRenderer {
    charset: Charset,
    stack: Vec<Frame>,
    result: Option<Element>,
}

impl TreeRenderer {
    /// Create a renderer decoding attributes with `charset`.
    #[must_use]
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            stack: Vec::new(),
            result: None,
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    fn open(&mut self, element: Element) -> Result<(), RenderError> {
        self.stack.push(Frame::Element(element));
        Ok(())
    }

    fn container(&mut self) -> Option<&mut Element> {
        self.stack.iter_mut().rev().find_map(Frame::as_element_mut)
    }

    /// Innermost open void element. Anything above it on the stack is
    /// part of its content.
    fn enclosing_void(&mut self) -> Option<&mut Element> {
        self.stack
            .iter_mut()
            .rev()
            .filter_map(Frame::as_element_mut)
            .find(|element| element.is_void())
    }

    fn decode(&self, attribute: &Attribute) -> Result<String, RenderError> {
        Ok(attribute.decode(self.charset)?.into_owned())
    }
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self::new(Charset::Utf8)
    }
}

impl Renderer for TreeRenderer {
    type Output = Element;
    const CAPABILITIES: &'static [Capability] = &[Capability::BASE, Capability::TREE];

    fn passthrough(&mut self, _tag: Tag) -> Result<(), RenderError> {
        self.stack.push(Frame::Transparent);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        let frame = self.stack.pop().ok_or(RenderError::Unbalanced)?;
        if let Frame::Element(element) = frame {
            match self.container() {
                Some(parent) => parent.push(Node::Element(element)),
                None => self.result = Some(element),
            }
        }
        Ok(())
    }

    fn track(&mut self, kind: TextKind, text: &str) -> Result<(), RenderError> {
        if let Some(void) = self.enclosing_void() {
            if void.name() == "img" {
                let alt = format!("{}{text}", void.attr("alt").unwrap_or_default());
                void.set_attr("alt", alt);
            }
            return Ok(());
        }

        let Some(container) = self.container() else {
            tracing::trace!(kind = kind.name(), "Dropping text outside any element");
            return Ok(());
        };
        match kind {
            TextKind::Html | TextKind::Entity => container.push(Node::Raw(text.to_owned())),
            TextKind::Br => container.push(Node::Element(Element::void("br"))),
            TextKind::NullChar => container.push_text("\u{FFFD}"),
            TextKind::Normal | TextKind::SoftBr | TextKind::Code | TextKind::LatexMath => {
                container.push_text(text);
            }
        }
        Ok(())
    }

    fn get_result(&mut self) -> Result<Element, RenderError> {
        let complete = self.stack.is_empty();
        let result = self.result.take();
        self.reset();
        match result {
            Some(root) if complete => Ok(root),
            _ => Err(RenderError::Incomplete),
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.result = None;
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn handle_doc(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("body"))
    }

    fn handle_quote(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("blockquote"))
    }

    fn handle_ul(&mut self, _detail: &UlDetail) -> Result<(), RenderError> {
        self.open(Element::new("ul"))
    }

    fn handle_ol(&mut self, detail: &OlDetail) -> Result<(), RenderError> {
        self.open(Element::new("ol").with_attr("start", detail.start.to_string()))
    }

    fn handle_li(&mut self, _detail: &LiDetail) -> Result<(), RenderError> {
        self.open(Element::new("li"))
    }

    fn handle_hr(&mut self) -> Result<(), RenderError> {
        self.open(Element::void("hr"))
    }

    fn handle_h(&mut self, detail: &HeadingDetail) -> Result<(), RenderError> {
        self.open(Element::new(format!("h{}", detail.level.clamp(1, 6))))
    }

    fn handle_code(&mut self, detail: Option<&CodeDetail>) -> Result<(), RenderError> {
        let Some(detail) = detail else {
            return self.open(Element::new("code"));
        };
        let mut code = Element::new("code");
        let lang = self.decode(&detail.lang)?;
        if !lang.is_empty() {
            code.set_attr("class", format!("language-{lang}"));
        }
        let mut pre = Element::new("pre");
        pre.push(Node::Element(code));
        self.open(pre)
    }

    fn handle_html(&mut self) -> Result<(), RenderError> {
        self.stack.push(Frame::Transparent);
        Ok(())
    }

    fn handle_p(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("p"))
    }

    fn handle_table(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("table"))
    }

    fn handle_thead(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("thead"))
    }

    fn handle_tbody(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("tbody"))
    }

    fn handle_tr(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("tr"))
    }

    fn handle_th(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("th"))
    }

    fn handle_td(&mut self, detail: &TableCellDetail) -> Result<(), RenderError> {
        let mut td = Element::new("td");
        let align = match detail.align {
            Align::Default => None,
            Align::Left => Some("left"),
            Align::Center => Some("center"),
            Align::Right => Some("right"),
        };
        if let Some(align) = align {
            td.set_attr("style", format!("text-align:{align}"));
        }
        self.open(td)
    }

    fn handle_em(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("em"))
    }

    fn handle_strong(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("strong"))
    }

    fn handle_a(&mut self, detail: Option<&LinkDetail>) -> Result<(), RenderError> {
        let mut a = Element::new("a");
        if let Some(detail) = detail {
            a.set_attr("href", self.decode(&detail.href)?);
            if !detail.title.is_empty() {
                a.set_attr("title", self.decode(&detail.title)?);
            }
        }
        self.open(a)
    }

    fn handle_img(&mut self, detail: &ImageDetail) -> Result<(), RenderError> {
        let mut img = Element::void("img").with_attr("src", self.decode(&detail.src)?);
        if !detail.title.is_empty() {
            img.set_attr("title", self.decode(&detail.title)?);
        }
        self.open(img)
    }

    fn handle_del(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("del"))
    }

    fn handle_latex_math(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("x-equation"))
    }

    fn handle_latex_math_display(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("x-equation").with_attr("type", "display"))
    }

    fn handle_wiki_link(&mut self, detail: &WikiLinkDetail) -> Result<(), RenderError> {
        let target = self.decode(&detail.target)?;
        self.open(Element::new("x-wikilink").with_attr("data-target", target))
    }

    fn handle_u(&mut self) -> Result<(), RenderError> {
        self.open(Element::new("u"))
    }
}

impl<'e> Dispatcher<'e, TreeRenderer> {
    /// Dispatcher driving a fresh [`TreeRenderer`].
    #[must_use]
    pub fn tree(engine: &'e dyn Engine, options: &RenderOptions) -> Self {
        Self::new(engine, TreeRenderer::new(options.charset), options)
    }
}

//! Article extraction from a rendered DOM.
//!
//! The extractor looks for the first `<article>` element and treats it as the
//! publishable content. Without one nothing else is attempted and every field
//! of the [`Extraction`] stays empty.
//!
//! Title and publication date are resolved by ordered strategy tables:
//!
//! | Field | Strategies, in order |
//! |-------|----------------------|
//! | title | `<title>` then `<h1>` (reversed when h1 is preferred) |
//! | date  | first `<time>` element, then first `<p>` whose text is a date |
//!
//! The first strategy that locates a candidate wins. For dates this means a
//! page with a `<time>` element never falls through to the paragraph scan,
//! even when the element's text cannot be parsed.

use crate::dates::DateParser;
use crate::models::Extraction;
use chrono::NaiveDateTime;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use tracing::{debug, warn};

static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));

/// Elements that start a new line in the plain-text rendering.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "ul",
];

/// Elements whose content is never reader-visible text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Where a title may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStrategy {
    /// The document `<title>`.
    TitleTag,
    /// The first `<h1>` in the document.
    Heading,
}

impl TitleStrategy {
    /// Strategy order for the given preference.
    pub fn order(prefer_h1: bool) -> [TitleStrategy; 2] {
        if prefer_h1 {
            [TitleStrategy::Heading, TitleStrategy::TitleTag]
        } else {
            [TitleStrategy::TitleTag, TitleStrategy::Heading]
        }
    }

    fn selector(self) -> &'static Selector {
        match self {
            TitleStrategy::TitleTag => &TITLE,
            TitleStrategy::Heading => &H1,
        }
    }

    /// Text of the first matching element, if the element exists.
    fn locate(self, dom: &Html) -> Option<String> {
        dom.select(self.selector()).next().map(inline_text)
    }
}

impl fmt::Display for TitleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TitleStrategy::TitleTag => "title",
            TitleStrategy::Heading => "h1",
        })
    }
}

/// Where a publication date may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// The first `<time>` element; its text is parsed.
    TimeElement,
    /// The first `<p>` in document order whose text parses as a date.
    FirstDatedParagraph,
}

/// Date strategies in the order they are tried.
pub const DATE_STRATEGIES: [DateStrategy; 2] =
    [DateStrategy::TimeElement, DateStrategy::FirstDatedParagraph];

/// A located date source. `date` is `None` when the source was found but its
/// text did not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCandidate {
    pub strategy: DateStrategy,
    pub date: Option<NaiveDateTime>,
}

impl DateStrategy {
    fn locate(self, dom: &Html, parser: &DateParser) -> Option<DateCandidate> {
        match self {
            DateStrategy::TimeElement => dom.select(&TIME).next().map(|time| DateCandidate {
                strategy: self,
                date: parser.parse(&inline_text(time)),
            }),
            DateStrategy::FirstDatedParagraph => dom
                .select(&PARAGRAPH)
                .find_map(|p| parser.parse(&inline_text(p)))
                .map(|date| DateCandidate {
                    strategy: self,
                    date: Some(date),
                }),
        }
    }
}

/// Stateless article extractor; holds only the date parser it uses.
///
/// `Extractor::default()` anchors relative dates at the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    dates: DateParser,
}

impl Extractor {
    pub fn new(dates: DateParser) -> Self {
        Self { dates }
    }

    /// Extract title, content and publication date from `dom`.
    pub fn extract(&self, dom: &Html, prefer_h1: bool) -> Extraction {
        let Some(container) = dom.select(&ARTICLE).next() else {
            debug!("No article container found");
            return Extraction::default();
        };

        let extraction = Extraction {
            title: resolve_title(dom, prefer_h1),
            html_content: Some(container.html()),
            plain_text: Some(plain_text(container)),
            publish_date: self.resolve_date(dom),
        };
        debug!(
            title = ?extraction.title,
            publish_date = ?extraction.publish_date,
            "Extracted article"
        );
        extraction
    }

    fn resolve_date(&self, dom: &Html) -> Option<NaiveDateTime> {
        let candidate = DATE_STRATEGIES
            .iter()
            .find_map(|strategy| strategy.locate(dom, &self.dates))?;
        if candidate.date.is_none() {
            warn!(strategy = ?candidate.strategy, "Date element found but its text is not a date");
        }
        candidate.date
    }
}

fn resolve_title(dom: &Html, prefer_h1: bool) -> Option<String> {
    let order = TitleStrategy::order(prefer_h1);
    let (used, title) = order
        .iter()
        .find_map(|strategy| strategy.locate(dom).map(|title| (*strategy, title)))?;

    if used != order[0] {
        warn!(preferred = %order[0], used = %used, "{} tag not found, using {} tag instead", order[0], used);
    }
    // An empty element still ends the cascade; it just yields no title.
    Some(title).filter(|t| !t.is_empty())
}

/// Element text with whitespace collapsed to single spaces.
fn inline_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).join(" ")
}

/// Reader-order text of `container`, one line per block element.
pub fn plain_text(container: ElementRef<'_>) -> String {
    let mut collector = TextCollector::default();
    collector.walk(container);
    collector.finish()
}

#[derive(Default)]
struct TextCollector {
    lines: Vec<String>,
    current: String,
}

impl TextCollector {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(el) => {
                    let name = el.name();
                    if SKIPPED_ELEMENTS.contains(&name) {
                        continue;
                    }
                    let block = BLOCK_ELEMENTS.contains(&name);
                    if block {
                        self.break_line();
                    }
                    if let Some(nested) = ElementRef::wrap(child) {
                        self.walk(nested);
                    }
                    if block {
                        self.break_line();
                    }
                }
                _ => {}
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                if !self.current.is_empty() && !self.current.ends_with(' ') {
                    self.current.push(' ');
                }
            } else {
                self.current.push(c);
            }
        }
    }

    fn break_line(&mut self) {
        let line = self.current.trim_end();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

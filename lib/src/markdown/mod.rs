//! Markdown-to-HTML rendering with per-invocation heading capture.
//!
//! The renderer is a chain of event adapters over pulldown-cmark:
//! heading-id assignment, publish-mode URL rewriting, and syntax
//! highlighting. Headings are accumulated per call and returned in the
//! result value; no state survives between invocations, so calls may
//! run concurrently.

mod headings;
mod links;
mod highlight;

use std::fs;
use std::path::Path;

use pulldown_cmark::{Options, Parser};
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::url::UrlBuf;

pub use headings::HeadingIds;
pub use links::RewriteUrls;
pub use highlight::{Highlighter, SyntaxHighlight};

/// Renderer-level options for one build.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Prefix for internal link and image destinations.
    pub base_url: UrlBuf,
    /// Rewriting is active only for publish-mode builds.
    pub publish: bool,
}

/// One document heading, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    /// Slug of the tag-free heading text; doubles as the element id.
    pub slug: String,
    pub text: String,
}

/// The result of rendering one markdown document.
#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub headings: Vec<Heading>,
}

fn parser_options() -> Options {
    Options::all().difference(Options::ENABLE_SMART_PUNCTUATION)
}

/// Reads and renders the markdown file at `path`.
pub fn render_file(path: &Path, options: &RenderOptions) -> Result<Rendered> {
    let source = fs::read_to_string(path)
        .chain_with(|| error!(format!("error trying to read the file {}", path.display())))?;

    render(&source, options)
        .chain_with(|| error!(format!("error rendering the markdown in {}", path.display())))
}

/// Renders a markdown string to HTML plus its ordered headings.
pub fn render(source: &str, options: &RenderOptions) -> Result<Rendered> {
    let mut headings = vec![];
    let parser = Parser::new_ext(source, parser_options());
    let events = HeadingIds::new(parser, &mut headings);
    let events = RewriteUrls::new(events, options);
    let events = Highlighter::new(events);

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, events);
    Ok(Rendered { html, headings })
}

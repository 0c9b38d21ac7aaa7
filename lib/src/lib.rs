//! A documentation site generator.
//!
//! # Overview
//!
//! Vireo turns a YAML config and a set of markdown files into a static
//! HTML site. A site is described by a [`SiteConfig`]: a title, a
//! theme directory, a base URL, and an ordered list of pages grouped
//! into sections. Each page renders to an `index.html` under a URL
//! derived from its section and title, so every page is reachable at a
//! directory-style path ending in `/`.
//!
//! Building a site runs the following pipeline:
//!
//! 1. Every page's markdown is rendered to HTML. Headings get stable
//!    slug ids, and fenced code blocks are syntax highlighted. Page
//!    renders run in parallel.
//! 2. Cross-page context is assembled: a section-grouped menu, per-page
//!    previous/next pagination, and heading anchors.
//! 3. Each page is rendered through the theme's template and written
//!    into the output directory alongside the theme's assets.
//!
//! The [`watch`] module re-runs this pipeline when a watched file
//! changes, coalescing bursts of changes into single rebuilds.
//!
//! The template receives already-rendered HTML in `page.content`;
//! emit it with `{{ page.content | safe }}` to avoid double escaping.

#[macro_use]
pub mod error;
pub mod util;
pub mod url;
pub mod config;
pub mod markdown;
pub mod context;
pub mod templating;
pub mod build;
pub mod watch;

pub use build::Builder;
pub use config::SiteConfig;
pub use error::{Chainable, Error, Result};
pub use url::UrlBuf;

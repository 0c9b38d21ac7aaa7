//! Per-page and cross-page template context assembly.
//!
//! A build first fans out one [`PageRecord`] per configured page, in
//! declaration order, then assembles the cross-page context (menu and
//! pagination) for each page from the full ordered record list.

use serde::Serialize;
use serde_yaml::Mapping;

use crate::config::{PageSpec, SiteConfig};
use crate::error::Result;
use crate::markdown::{self, RenderOptions};
use crate::url::UrlBuf;

/// A heading with its fully qualified anchor URL, valid from any page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHeading {
    pub level: u8,
    pub slug: String,
    pub text: String,
    /// Always the owning page's URL plus `#` and the heading's slug.
    pub anchor: UrlBuf,
}

/// One fully rendered page, before templating. Records live for a
/// single build and are rebuilt from scratch on every rebuild.
#[derive(Debug, Serialize)]
pub struct PageRecord {
    pub title: String,
    pub section: String,
    pub url: UrlBuf,
    /// Rendered markdown HTML.
    pub content: String,
    pub headings: Vec<PageHeading>,
}

/// The URL assigned to the page at `index`. The first page in the
/// ordered sequence is the site homepage and gets `/` regardless of its
/// declared section and title.
pub fn page_url(spec: &PageSpec, index: usize) -> UrlBuf {
    match index {
        0 => UrlBuf::from("/"),
        _ => UrlBuf::for_page(&spec.section, &spec.title),
    }
}

/// Renders one page's markdown and assembles its record. Fails when the
/// source is unreadable or the renderer reports an error; both abort
/// the whole build.
pub fn build_page(spec: &PageSpec, index: usize, options: &RenderOptions) -> Result<PageRecord> {
    let url = page_url(spec, index);
    let rendered = markdown::render_file(&spec.markdown, options)?;

    let headings = rendered.headings.into_iter()
        .map(|h| PageHeading {
            anchor: url.with_fragment(&h.slug),
            level: h.level,
            slug: h.slug,
            text: h.text,
        })
        .collect();

    Ok(PageRecord {
        title: spec.title.clone(),
        section: spec.section.clone(),
        url,
        content: rendered.html,
        headings,
    })
}

/// One menu entry. Headings are exposed for every page; the theme
/// decides whether to show them only for the active page.
#[derive(Debug, Serialize)]
pub struct MenuPage<'r> {
    pub title: &'r str,
    pub url: &'r UrlBuf,
    pub is_active: bool,
    pub headings: &'r [PageHeading],
}

/// A contiguous run of pages sharing a section name. Grouping is by
/// adjacency in declaration order, not by name globally: `[A, A, B, A]`
/// yields three sections. The config flattening rule makes non-adjacent
/// same-named sections impossible today, but the algorithm is part of
/// the contract and must not be silently replaced by global grouping.
#[derive(Debug, Serialize)]
pub struct MenuSection<'r> {
    pub title: &'r str,
    pub pages: Vec<MenuPage<'r>>,
}

#[derive(Debug, Serialize)]
pub struct PageLink<'r> {
    pub title: &'r str,
    pub url: &'r UrlBuf,
}

/// Previous/next links by position in the ordered page list. Pagination
/// crosses section boundaries.
#[derive(Debug, Default, Serialize)]
pub struct Pagination<'r> {
    pub previous: Option<PageLink<'r>>,
    pub next: Option<PageLink<'r>>,
}

/// Everything one template invocation sees.
#[derive(Debug, Serialize)]
pub struct PageContext<'r> {
    pub title: &'r str,
    pub menu: Vec<MenuSection<'r>>,
    pub page: &'r PageRecord,
    pub pagination: Pagination<'r>,
    pub site: &'r Mapping,
}

/// Builds the template context for every page from the complete,
/// ordered record list. Pure; an empty record list yields no contexts.
pub fn assemble<'r>(records: &'r [PageRecord], config: &'r SiteConfig) -> Vec<PageContext<'r>> {
    records.iter()
        .enumerate()
        .map(|(index, record)| PageContext {
            title: &config.title,
            menu: menu(records, record),
            page: record,
            pagination: pagination(records, index),
            site: &config.site,
        })
        .collect()
}

fn menu<'r>(records: &'r [PageRecord], current: &PageRecord) -> Vec<MenuSection<'r>> {
    let mut sections: Vec<MenuSection<'r>> = vec![];
    for record in records {
        if sections.last().is_none_or(|s| s.title != record.section) {
            sections.push(MenuSection { title: &record.section, pages: vec![] });
        }

        let section = sections.last_mut().expect("pushed above");
        section.pages.push(MenuPage {
            title: &record.title,
            url: &record.url,
            is_active: record.url == current.url,
            headings: &record.headings,
        });
    }

    sections
}

fn pagination(records: &[PageRecord], index: usize) -> Pagination<'_> {
    fn link(record: &PageRecord) -> PageLink<'_> {
        PageLink { title: &record.title, url: &record.url }
    }

    Pagination {
        previous: index.checked_sub(1).and_then(|i| records.get(i)).map(link),
        next: records.get(index + 1).map(link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(title: &str, section: &str, index: usize) -> PageRecord {
        let spec = PageSpec {
            title: title.into(),
            section: section.into(),
            markdown: "unused.md".into(),
        };

        PageRecord {
            url: page_url(&spec, index),
            title: spec.title,
            section: spec.section,
            content: format!("<p>{title}</p>"),
            headings: vec![],
        }
    }

    fn records(specs: &[(&str, &str)]) -> Vec<PageRecord> {
        specs.iter()
            .enumerate()
            .map(|(i, (title, section))| record(title, section, i))
            .collect()
    }

    fn test_config() -> SiteConfig {
        SiteConfig {
            title: "Docs".into(),
            theme: "theme".into(),
            base_url: UrlBuf::from("/"),
            pages: vec![],
            site: Mapping::new(),
            include: vec![],
            source: "config.yml".into(),
        }
    }

    #[test]
    fn first_page_is_the_homepage() {
        let records = records(&[("Install", "Guide"), ("Usage", "Guide")]);
        assert_eq!(records[0].url.as_str(), "/");
        assert_eq!(records[1].url.as_str(), "/guide/usage/");
    }

    #[test]
    fn urls_are_unique() {
        let records = records(&[
            ("Home", ""), ("Install", "Guide"), ("Usage", "Guide"), ("FAQ", ""),
        ]);

        for (i, a) in records.iter().enumerate() {
            for b in &records[i + 1..] {
                assert_ne!(a.url, b.url);
            }
        }
    }

    #[test]
    fn menu_groups_by_adjacency_not_by_name() {
        let config = test_config();
        let records = records(&[("1", "A"), ("2", "A"), ("3", "B"), ("4", "A")]);
        let contexts = assemble(&records, &config);

        let groups: Vec<_> = contexts[0].menu.iter().map(|s| s.title).collect();
        assert_eq!(groups, vec!["A", "B", "A"]);
        assert_eq!(contexts[0].menu[0].pages.len(), 2);
        assert_eq!(contexts[0].menu[1].pages.len(), 1);
        assert_eq!(contexts[0].menu[2].pages.len(), 1);
    }

    #[test]
    fn menu_flags_exactly_the_current_page() {
        let config = test_config();
        let records = records(&[("Home", ""), ("Install", "Guide")]);
        let contexts = assemble(&records, &config);

        let active = |ctx: &PageContext<'_>| -> Vec<bool> {
            ctx.menu.iter().flat_map(|s| s.pages.iter().map(|p| p.is_active)).collect()
        };

        assert_eq!(active(&contexts[0]), vec![true, false]);
        assert_eq!(active(&contexts[1]), vec![false, true]);
    }

    #[test]
    fn pagination_crosses_section_boundaries() {
        let config = test_config();
        let records = records(&[("Home", ""), ("Install", "Guide"), ("Usage", "Guide")]);
        let contexts = assemble(&records, &config);

        assert!(contexts[0].pagination.previous.is_none());
        assert_eq!(contexts[0].pagination.next.as_ref().unwrap().title, "Install");

        let install = &contexts[1].pagination;
        assert_eq!(install.previous.as_ref().unwrap().title, "Home");
        assert_eq!(install.next.as_ref().unwrap().title, "Usage");

        assert_eq!(contexts[2].pagination.previous.as_ref().unwrap().title, "Install");
        assert!(contexts[2].pagination.next.is_none());
    }

    #[test]
    fn empty_input_is_valid() {
        let config = test_config();
        assert!(assemble(&[], &config).is_empty());
    }

    #[test]
    fn anchors_qualify_heading_slugs_with_the_page_url() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("install.md");
        std::fs::write(&md, "# Setup\n\n## Linux\n").unwrap();

        let spec = PageSpec {
            title: "Install".into(),
            section: "Guide".into(),
            markdown: md,
        };

        let options = RenderOptions { base_url: UrlBuf::from("/"), publish: false };
        let page = build_page(&spec, 3, &options).unwrap();
        assert_eq!(page.url.as_str(), "/guide/install/");
        assert_eq!(page.headings[0].anchor.as_str(), "/guide/install/#setup");
        assert_eq!(page.headings[1].anchor.as_str(), "/guide/install/#linux");

        for heading in &page.headings {
            let expected = format!("{}#{}", page.url, heading.slug);
            assert_eq!(heading.anchor.as_str(), expected);
        }
    }
}

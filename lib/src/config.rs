use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{Chainable, Result};
use crate::url::UrlBuf;

/// The reserved template filename inside a theme directory. Every other
/// entry in the theme is treated as a static asset.
pub const TEMPLATE_FILE_NAME: &str = "template.html";

/// One leaf page, flattened out of the two-level page declaration.
/// Declaration order is preserved and semantically significant: it
/// drives homepage selection, menu grouping, and pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub title: String,
    /// Empty for top-level pages; otherwise the parent group's title.
    pub section: String,
    pub markdown: PathBuf,
}

/// A validated site specification, immutable for the duration of one
/// build. Re-derived from the config file on every rebuild trigger.
#[derive(Debug)]
pub struct SiteConfig {
    pub title: String,
    pub theme: PathBuf,
    /// Normalized with no trailing slash; `/` when unset.
    pub base_url: UrlBuf,
    pub pages: Vec<PageSpec>,
    /// Arbitrary pass-through keys, handed to every template context.
    pub site: Mapping,
    /// User-declared files or directories copied verbatim into the output.
    pub include: Vec<PathBuf>,
    /// Where this config was loaded from.
    pub source: PathBuf,
}

impl SiteConfig {
    /// Loads and validates the YAML config at `path`.
    pub fn load(path: &Path) -> Result<SiteConfig> {
        let raw = fs::read_to_string(path)
            .chain_with(|| error!(
                format!("couldn't read the config file at {}", path.display())
            ))?;

        let mapping: Mapping = serde_yaml::from_str(&raw)
            .chain_with(|| error!(
                format!("error parsing the config in {}", path.display())
            ))?;

        let config = SiteConfig {
            title: title(&mapping, path)?,
            theme: theme(&mapping, path)?,
            base_url: base_url(&mapping, path)?,
            pages: pages(&mapping, path)?,
            include: include(&mapping, path)?,
            site: site(&mapping),
            source: path.to_path_buf(),
        };

        tracing::debug!(pages = config.pages.len(), title = %config.title, "config loaded");
        Ok(config)
    }

    /// The set of paths whose changes invalidate the current output:
    /// every page's markdown source, the theme directory, and the config
    /// file itself. Recomputed after every build so page additions and
    /// removals update the watch set.
    pub fn watch_set(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.pages.iter()
            .map(|page| page.markdown.clone())
            .collect();

        paths.push(self.theme.clone());
        paths.push(self.source.clone());
        paths
    }
}

fn title(mapping: &Mapping, location: &Path) -> Result<String> {
    match mapping.get("title").and_then(Value::as_str) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => err!(
            "in your config, \"title\" must be a string of at least 1 character",
            "expected a non-empty string for key" => "title",
            "config file" => location.display(),
        ),
    }
}

fn theme(mapping: &Mapping, location: &Path) -> Result<PathBuf> {
    let theme = match mapping.get("theme").and_then(Value::as_str) {
        Some(theme) if !theme.is_empty() => PathBuf::from(theme),
        _ => return err!(
            "in your config, \"theme\" must name the directory containing your theme",
            "expected a non-empty string for key" => "theme",
            "config file" => location.display(),
        ),
    };

    // A theme without the reserved template file can't render anything.
    fs::read_to_string(theme.join(TEMPLATE_FILE_NAME))
        .chain_with(|| error!(
            format!("your theme doesn't include a readable {TEMPLATE_FILE_NAME}"),
            "theme directory" => theme.display(),
        ))?;

    Ok(theme)
}

fn base_url(mapping: &Mapping, location: &Path) -> Result<UrlBuf> {
    match mapping.get("base_url") {
        None => Ok(UrlBuf::from("/")),
        Some(Value::String(url)) => Ok(UrlBuf::from(url.as_str()).without_trailing_slash()),
        Some(_) => err!(
            "you have incorrectly defined \"base_url\" in your config",
            "expected a string for key" => "base_url",
            "config file" => location.display(),
        ),
    }
}

/// Flattens the two-level page declaration into ordered leaf pages. A
/// top-level entry maps a title to either a markdown path (a page) or a
/// list of sub-entries (a group whose title becomes each child's
/// section). Titles must be unique per level, case-insensitively.
fn pages(mapping: &Mapping, location: &Path) -> Result<Vec<PageSpec>> {
    let declared = match mapping.get("pages") {
        Some(Value::Sequence(seq)) => seq,
        Some(_) => return err!(
            "the pages defined in your config have to be a list",
            "expected a list for key" => "pages",
            "config file" => location.display(),
        ),
        None => return err!(
            "you must specify a list of pages that defines your docs content & structure",
            "missing key" => "pages",
            "config file" => location.display(),
        ),
    };

    let mut pages = vec![];
    let mut seen = vec![];
    for entry in declared {
        let (title, value) = single_entry(entry, location)?;
        if seen.iter().any(|t: &String| t.eq_ignore_ascii_case(&title)) {
            return err!(
                format!("two top-level pages are both called \"{title}\""),
                "page names at each level must be unique" => title,
            );
        }

        seen.push(title.clone());
        match value {
            Value::String(markdown) => {
                pages.push(leaf_page(title, String::new(), markdown)?);
            }
            Value::Sequence(children) => {
                let mut sub_seen: Vec<String> = vec![];
                for child in &children {
                    let (sub_title, sub_value) = single_entry(child, location)?;
                    if sub_seen.iter().any(|t| t.eq_ignore_ascii_case(&sub_title)) {
                        return err!(
                            format!("two subpages of \"{title}\" are both called \"{sub_title}\""),
                            "page names at each level must be unique" => sub_title,
                        );
                    }

                    sub_seen.push(sub_title.clone());
                    match sub_value {
                        Value::String(markdown) => {
                            pages.push(leaf_page(sub_title, title.clone(), markdown)?);
                        }
                        _ => return err!(
                            format!("you have defined the subpage \"{sub_title}\" incorrectly"),
                            "each subpage must name a markdown file" => sub_title,
                            "config file" => location.display(),
                        ),
                    }
                }
            }
            _ => return err!(
                format!("you have defined the page \"{title}\" incorrectly"),
                "each page must name a markdown file or a list of subpages" => title,
                "config file" => location.display(),
            ),
        }
    }

    Ok(pages)
}

/// Destructures a `- Title: value` list entry.
fn single_entry(entry: &Value, location: &Path) -> Result<(String, Value)> {
    let mapping = match entry.as_mapping() {
        Some(mapping) if mapping.len() == 1 => mapping,
        _ => return err!(
            "each entry in \"pages\" must map one page name to its contents",
            "config file" => location.display(),
        ),
    };

    let (key, value) = mapping.iter().next().expect("len == 1");
    match key.as_str() {
        Some(title) => Ok((title.to_string(), value.clone())),
        None => err!(
            "the name of each page has to be a string",
            "config file" => location.display(),
        ),
    }
}

fn leaf_page(title: String, section: String, markdown: String) -> Result<PageSpec> {
    let markdown = PathBuf::from(markdown);

    // Catch missing sources at load time, in the validation stage, so the
    // build proper never starts against an unreadable page list.
    fs::metadata(&markdown)
        .chain_with(|| error!(
            format!("couldn't read the markdown file for the page titled \"{title}\""),
            "markdown file" => markdown.display(),
        ))?;

    Ok(PageSpec { title, section, markdown })
}

fn include(mapping: &Mapping, location: &Path) -> Result<Vec<PathBuf>> {
    match mapping.get("include") {
        None => Ok(vec![]),
        Some(Value::Sequence(seq)) => seq.iter()
            .map(|value| match value.as_str() {
                Some(path) => Ok(PathBuf::from(path)),
                None => err!(
                    "every entry under \"include\" must be a path string",
                    "config file" => location.display(),
                ),
            })
            .collect(),
        Some(_) => err!(
            "you have incorrectly defined \"include\" in your config",
            "expected a list for key" => "include",
            "config file" => location.display(),
        ),
    }
}

/// Every other key passes through untouched for themes to consume.
fn site(mapping: &Mapping) -> Mapping {
    const RESERVED: &[&str] = &["title", "theme", "base_url", "pages", "include"];

    mapping.iter()
        .filter(|(key, _)| !key.as_str().is_some_and(|k| RESERVED.contains(&k)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use pretty_assertions::assert_eq;

    fn write_site_fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let theme = dir.join("theme");
        fs::create_dir_all(&theme).unwrap();
        fs::write(theme.join(TEMPLATE_FILE_NAME), "{{ page.content }}").unwrap();

        for name in ["home.md", "install.md", "usage.md"] {
            fs::write(dir.join(name), "# Hi\n").unwrap();
        }

        (theme, dir.to_path_buf())
    }

    fn load(yaml: &str) -> Result<SiteConfig> {
        let dir = tempfile::tempdir().unwrap();
        let (theme, root) = write_site_fixture(dir.path());
        let yaml = yaml
            .replace("$theme", theme.to_str().unwrap())
            .replace("$dir", root.to_str().unwrap());

        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, yaml).unwrap();
        SiteConfig::load(&config_path)
    }

    #[test]
    fn flattens_groups_into_sections() {
        let config = load(r#"
title: Docs
theme: $theme
pages:
  - Home: $dir/home.md
  - Guide:
      - Install: $dir/install.md
      - Usage: $dir/usage.md
"#).unwrap();

        let titles: Vec<_> = config.pages.iter().map(|p| p.title.as_str()).collect();
        let sections: Vec<_> = config.pages.iter().map(|p| p.section.as_str()).collect();
        assert_eq!(titles, vec!["Home", "Install", "Usage"]);
        assert_eq!(sections, vec!["", "Guide", "Guide"]);
    }

    #[test]
    fn base_url_defaults_to_root_and_strips_trailing_slash() {
        let config = load("title: D\ntheme: $theme\npages:\n  - Home: $dir/home.md\n").unwrap();
        assert_eq!(config.base_url.as_str(), "/");

        let config = load(
            "title: D\ntheme: $theme\nbase_url: /docs/\npages:\n  - Home: $dir/home.md\n"
        ).unwrap();
        assert_eq!(config.base_url.as_str(), "/docs");
    }

    #[test]
    fn rejects_duplicate_titles_case_insensitively() {
        let result = load(r#"
title: Docs
theme: $theme
pages:
  - Home: $dir/home.md
  - HOME: $dir/usage.md
"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_markdown_file() {
        let result = load(r#"
title: Docs
theme: $theme
pages:
  - Home: $dir/not-there.md
"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_title_and_pages() {
        assert!(load("theme: $theme\npages:\n  - Home: $dir/home.md\n").is_err());
        assert!(load("title: Docs\ntheme: $theme\n").is_err());
    }

    #[test]
    fn passes_through_unreserved_keys() {
        let config = load(r#"
title: Docs
theme: $theme
github: https://github.com/example/docs
pages:
  - Home: $dir/home.md
"#).unwrap();

        assert_eq!(config.site.len(), 1);
        assert!(config.site.contains_key("github"));
    }

    #[test]
    fn watch_set_covers_sources_theme_and_config() {
        let config = load("title: D\ntheme: $theme\npages:\n  - Home: $dir/home.md\n").unwrap();
        let set = config.watch_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&config.theme));
        assert!(set.contains(&config.source));
        assert!(set.contains(&config.pages[0].markdown));
    }
}

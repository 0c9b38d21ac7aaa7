//! The build pipeline: fan out page rendering, assemble cross-page
//! context, render templates, and write the output tree.

use std::io;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;

use crate::config::{SiteConfig, TEMPLATE_FILE_NAME};
use crate::context::{self, PageRecord};
use crate::error::{Chainable, Result};
use crate::markdown::RenderOptions;
use crate::templating::Engine;
use crate::url::UrlBuf;
use crate::util::copy_recursively;

/// One page ready to be written to disk.
#[derive(Debug)]
pub struct RenderedPage {
    pub url: UrlBuf,
    pub html: String,
}

/// Drives one or more builds into a fixed output directory. Everything
/// derived from the config is rebuilt from scratch per build; only the
/// output location and the publish flag persist across rebuilds.
#[derive(Debug)]
pub struct Builder {
    pub output: PathBuf,
    pub publish: bool,
}

impl Builder {
    pub fn new(output: PathBuf, publish: bool) -> Builder {
        Builder { output, publish }
    }

    /// Runs the full pipeline once. Any stage failure aborts the whole
    /// build; there is no partial-page recovery.
    pub fn build(&self, config: &SiteConfig) -> Result<()> {
        let cwd = env::current_dir()
            .chain_with(|| error!("couldn't determine the current working directory"))?;

        self.build_in(config, &cwd)
    }

    fn build_in(&self, config: &SiteConfig, cwd: &Path) -> Result<()> {
        let options = RenderOptions {
            base_url: config.base_url.clone(),
            publish: self.publish,
        };

        // Fan-out: page renders run concurrently, but the collected
        // records match input order, which menu grouping and pagination
        // depend on. Fan-in completes before any cross-page work.
        let records: Vec<PageRecord> = config.pages.par_iter()
            .enumerate()
            .map(|(index, spec)| context::build_page(spec, index, &options))
            .collect::<Result<_>>()?;

        let engine = Engine::new(&config.theme, &config.base_url, self.publish)?;
        let contexts = context::assemble(&records, config);
        let pages: Vec<RenderedPage> = contexts.par_iter()
            .map(|ctx| Ok(RenderedPage {
                url: ctx.page.url.clone(),
                html: engine.render(ctx)?,
            }))
            .collect::<Result<_>>()?;

        // Writing starts only after every page has rendered.
        self.write_site(config, &pages, cwd)?;
        tracing::info!(pages = pages.len(), output = %self.output.display(), "site built");
        Ok(())
    }

    /// Clears and repopulates the output directory: theme assets,
    /// user-declared includes, then one `index.html` per page. The
    /// safety check runs before anything is deleted; a failure after
    /// step one leaves a partially rebuilt tree, by contract.
    fn write_site(&self, config: &SiteConfig, pages: &[RenderedPage], cwd: &Path) -> Result<()> {
        let output = cwd.join(&self.output);
        check_output_dir(&output, cwd)?;

        clear_dir(&output)
            .chain_with(|| error!(
                format!("couldn't clear the output directory {}", output.display())
            ))?;
        tracing::debug!(dir = %output.display(), "output directory cleared");

        copy_theme(&config.theme, &output)?;
        copy_includes(&config.include, &output, cwd)?;

        for page in pages {
            let dir = output.join(page.url.trim_matches('/'));
            fs::create_dir_all(&dir)
                .and_then(|_| fs::write(dir.join("index.html"), &page.html))
                .chain_with(|| error!(
                    format!("error writing page to {}", dir.join("index.html").display())
                ))?;

            tracing::debug!(url = %page.url, "page written");
        }

        Ok(())
    }
}

/// Refuses to touch an output directory whose real (symlink-free) path
/// is not a strict descendant of the working directory's real path.
/// This runs before any destructive action so no deletion ever happens
/// on an unsafe path.
fn check_output_dir(output: &Path, cwd: &Path) -> Result<()> {
    let real_cwd = fs::canonicalize(cwd)
        .chain_with(|| error!("couldn't resolve the current working directory"))?;
    let real_output = real_path(output)
        .chain_with(|| error!(
            format!("couldn't resolve the output directory {}", output.display())
        ))?;

    if real_output == real_cwd || !real_output.starts_with(&real_cwd) {
        return err!(
            "refusing to clear an output directory outside the current working directory",
            "output directory" => real_output.display(),
            "working directory" => real_cwd.display(),
        );
    }

    Ok(())
}

/// `fs::canonicalize` for a path that may not exist yet: the deepest
/// existing ancestor is canonicalized and the remainder re-appended.
fn real_path(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut rest = vec![];

    loop {
        match fs::canonicalize(&current) {
            Ok(mut real) => {
                for component in rest.iter().rev() {
                    real.push(component);
                }

                return Ok(real);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (current.file_name(), current.parent()) {
                    (Some(name), Some(parent)) => {
                        rest.push(name.to_os_string());
                        current = parent.to_path_buf();
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn clear_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    fs::create_dir_all(dir)
}

/// Copies every entry directly under the theme directory, except the
/// reserved template file, into the output root.
fn copy_theme(theme: &Path, output: &Path) -> Result<()> {
    let entries = fs::read_dir(theme)
        .chain_with(|| error!(
            format!("couldn't read the theme directory {}", theme.display())
        ))?;

    for entry in entries {
        let entry = entry.chain_with(|| error!("couldn't list the theme directory"))?;
        if entry.file_name() == TEMPLATE_FILE_NAME {
            continue;
        }

        let dest = output.join(entry.file_name());
        copy_recursively(&entry.path(), &dest)
            .chain_with(|| error!(
                "couldn't copy a theme asset",
                "source" => entry.path().display(),
                "destination" => dest.display(),
            ))?;

        tracing::debug!(asset = %entry.path().display(), "theme asset copied");
    }

    Ok(())
}

/// Copies user-declared include paths into the output at the same
/// relative location, overwriting whatever the theme put there. A path
/// from outside the working directory lands at the output root under
/// its file name, so no include can ever resolve outside the output.
fn copy_includes(include: &[PathBuf], output: &Path, cwd: &Path) -> Result<()> {
    for path in include {
        let relative = path.strip_prefix(cwd).unwrap_or(path);
        let contained = relative.components()
            .all(|c| matches!(c, Component::Normal(_)));

        let dest = match contained {
            true => output.join(relative),
            false => match path.file_name() {
                Some(name) => output.join(name),
                None => return err!(
                    "couldn't determine where an included path lands in the output",
                    "path" => path.display(),
                ),
            },
        };

        copy_recursively(path, &dest)
            .chain_with(|| error!(
                "couldn't copy an included path",
                "source" => path.display(),
                "destination" => dest.display(),
            ))?;

        tracing::debug!(path = %path.display(), "include copied");
    }

    Ok(())
}

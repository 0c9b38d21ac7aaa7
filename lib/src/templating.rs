use std::fs;
use std::path::Path;

use minijinja::{Environment, ErrorKind};

use crate::config::TEMPLATE_FILE_NAME;
use crate::context::PageContext;
use crate::error::{Chainable, Result};
use crate::url::UrlBuf;

/// The theme's template, compiled once per build. The `url()` template
/// function closes over the build's base URL and publish flag at
/// construction time; templates never observe global state.
#[derive(Debug)]
pub struct Engine {
    env: Environment<'static>,
}

impl Engine {
    pub fn new(theme: &Path, base_url: &UrlBuf, publish: bool) -> Result<Engine> {
        let template_path = theme.join(TEMPLATE_FILE_NAME);
        let source = fs::read_to_string(&template_path)
            .chain_with(|| error!(
                format!("couldn't read the theme template at {}", template_path.display())
            ))?;

        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_FILE_NAME.to_string(), source)
            .chain_with(|| error!(
                format!("the theme template at {} is invalid", template_path.display())
            ))?;

        let base_url = base_url.clone();
        env.add_function("url", move |path: String| {
            if path.is_empty() {
                return Err(minijinja::Error::new(
                    ErrorKind::MissingArgument,
                    "`url` requires a non-empty path",
                ));
            }

            let mut url = UrlBuf::from(path);
            if publish && !url.is_external() {
                url.prepend(&base_url);
            }

            // The template is auto-escaped as HTML; the URL must come
            // through literally, not entity-encoded.
            Ok(minijinja::Value::from_safe_string(String::from(url)))
        });

        Ok(Engine { env })
    }

    /// Renders one page's merged context through the theme template.
    pub fn render(&self, context: &PageContext<'_>) -> Result<String> {
        let template = self.env.get_template(TEMPLATE_FILE_NAME)?;
        template.render(context)
            .chain_with(|| error!(
                "failed to render the theme template",
                "page" => context.page.title,
                "url" => context.page.url,
            ))
    }
}

use pulldown_cmark::{CowStr, Event, Tag};

use super::RenderOptions;
use crate::url::UrlBuf;

/// Rewrites link and image destinations for publish builds: internal
/// (scheme-less) destinations are prefixed with the site's base URL so
/// the output works when hosted under a subpath. Local builds pass
/// events through untouched.
pub struct RewriteUrls<'o, 'a, I: Iterator<Item = Event<'a>>> {
    options: &'o RenderOptions,
    inner: I,
}

impl<'o, 'a, I: Iterator<Item = Event<'a>>> RewriteUrls<'o, 'a, I> {
    pub fn new(inner: I, options: &'o RenderOptions) -> Self {
        RewriteUrls { options, inner }
    }

    fn rewrite(&self, dest_url: CowStr<'a>) -> CowStr<'a> {
        if !self.options.publish {
            return dest_url;
        }

        let mut url = UrlBuf::from(&*dest_url);
        if url.is_external() {
            return dest_url;
        }

        url.prepend(&self.options.base_url);
        String::from(url).into()
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for RewriteUrls<'_, 'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = match self.inner.next()? {
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
                let dest_url = self.rewrite(dest_url);
                Event::Start(Tag::Link { link_type, dest_url, title, id })
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                let dest_url = self.rewrite(dest_url);
                Event::Start(Tag::Image { link_type, dest_url, title, id })
            }
            event => event,
        };

        Some(event)
    }
}

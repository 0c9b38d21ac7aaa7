use std::collections::VecDeque;
use std::fmt::Write;

use pulldown_cmark::{Event, Tag, TagEnd};
use rustc_hash::FxHashMap;

use super::Heading;
use crate::util::slugify;

/// Assigns an id to every heading without one, slugified from the
/// tag-free heading text, and records each heading in source order into
/// a caller-supplied accumulator. Duplicate slugs within one document
/// get a `-N` suffix so ids stay unique.
pub struct HeadingIds<'h, 'a, I: Iterator<Item = Event<'a>>> {
    stack: VecDeque<Event<'a>>,
    seen: FxHashMap<String, usize>,
    headings: &'h mut Vec<Heading>,
    inner: I,
}

impl<'h, 'a, I: Iterator<Item = Event<'a>>> HeadingIds<'h, 'a, I> {
    pub fn new(inner: I, headings: &'h mut Vec<Heading>) -> Self {
        HeadingIds {
            stack: VecDeque::with_capacity(4),
            seen: FxHashMap::default(),
            headings,
            inner,
        }
    }

    fn unique(&mut self, slug: String) -> String {
        let n = self.seen.entry(slug.clone()).or_insert(0);
        *n += 1;
        match *n {
            1 => slug,
            n => {
                let mut unique = slug;
                let _ = write!(&mut unique, "-{}", n - 1);
                unique
            }
        }
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIds<'_, 'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.stack.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading { level, id, classes, attrs }) => {
                // Buffer the heading's body to derive its text and slug.
                let mut text = String::new();
                loop {
                    let event = self.inner.next()?;
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    } else if let Event::End(TagEnd::Heading(..)) = event {
                        break;
                    }

                    self.stack.push_back(event);
                }

                let slug = match id {
                    Some(ref id) => id.to_string(),
                    None => self.unique(slugify(&text)),
                };

                self.headings.push(Heading { level: level as u8, slug: slug.clone(), text });

                let tag = Tag::Heading { level, id: Some(slug.into()), classes, attrs };
                self.stack.push_back(Event::End(TagEnd::Heading(level)));
                Some(Event::Start(tag))
            }
            event => Some(event),
        }
    }
}

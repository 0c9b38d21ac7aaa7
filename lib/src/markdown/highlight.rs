use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::{SyntaxReference, SyntaxSet};

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static DEFAULT_SYNTAX: Lazy<&'static SyntaxReference>
    = Lazy::new(|| SYNTAX_SET.find_syntax_plain_text());

#[derive(Default, Clone)]
pub struct SyntaxHighlight;

impl SyntaxHighlight {
    /// Loading the syntax set dominates first-render latency; force it
    /// on a worker thread while the rest of the build starts up.
    #[inline]
    pub fn warm_up() {
        rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
    }
}

/// Replaces fenced code blocks with classed, pre-highlighted HTML.
pub struct Highlighter<I> {
    generator: Option<ClassedHTMLGenerator<'static>>,
    inner: I,
}

impl<I> Highlighter<I> {
    pub fn new(inner: I) -> Self {
        Highlighter { generator: None, inner }
    }
}

fn html_generator(syntax: &SyntaxReference) -> ClassedHTMLGenerator<'_> {
    ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced)
}

fn code_div(code: String) -> String {
    format!("<div class=\"highlight\"><pre class=\"code\">{code}</pre></div>")
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Highlighter<I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label))) => {
                    let lang = label.split_once(',')
                        .map(|(prefix, _)| prefix)
                        .unwrap_or(&label);

                    let syntax = SYNTAX_SET.find_syntax_by_token(lang)
                        .unwrap_or_else(|| *DEFAULT_SYNTAX);

                    self.generator = Some(html_generator(syntax));
                }
                Event::Text(text) if self.generator.is_some() => {
                    let generator = self.generator.as_mut().unwrap();
                    let _ = generator.parse_html_for_line_which_includes_newline(&text);
                }
                Event::End(TagEnd::CodeBlock) if self.generator.is_some() => {
                    let generator = self.generator.take().unwrap();
                    return Some(Event::Html(code_div(generator.finalize()).into()));
                }
                ev => return Some(ev),
            }
        }
    }
}

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::util::slugify;

/// An owned, growable URL string with site-relative semantics: page URLs
/// always begin and end with `/`, and joining respects existing slashes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlBuf(String);

impl UrlBuf {
    pub fn new() -> UrlBuf {
        UrlBuf(String::new())
    }

    /// The URL of the page derived from a section and title, per the
    /// site URL rule: `/<section-slug>/<title-slug>/`, with empty slugs
    /// dropped. The site homepage is special-cased by the caller.
    ///
    /// ```rust
    /// use vireo::url::UrlBuf;
    ///
    /// assert_eq!(UrlBuf::for_page("Guide", "Install").as_str(), "/guide/install/");
    /// assert_eq!(UrlBuf::for_page("", "About Us").as_str(), "/about-us/");
    /// ```
    pub fn for_page(section: &str, title: &str) -> UrlBuf {
        let mut url = UrlBuf::from("/");
        for slug in [slugify(section), slugify(title)] {
            if !slug.is_empty() {
                url.append(&slug);
            }
        }

        url.append("/");
        url
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URL's scheme, if any.
    ///
    /// ```rust
    /// use vireo::url::UrlBuf;
    ///
    /// assert_eq!(UrlBuf::from("http://rocket.rs").scheme(), Some("http"));
    /// assert_eq!(UrlBuf::from("mailto:foo@bar.com").scheme(), Some("mailto"));
    /// assert_eq!(UrlBuf::from("foo#bar:baz").scheme(), None);
    /// assert_eq!(UrlBuf::from("/docs/intro/").scheme(), None);
    /// ```
    pub fn scheme(&self) -> Option<&str> {
        let colon = self.0.find(':')?;
        let candidate = &self.0[..colon];
        let valid = candidate.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && candidate.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c));

        valid.then_some(candidate)
    }

    /// Whether the URL points outside the site: it has a scheme or is
    /// protocol-relative. External URLs are never base-URL prefixed.
    pub fn is_external(&self) -> bool {
        self.scheme().is_some() || self.0.starts_with("//")
    }

    /// Appends `url`, inserting or collapsing a `/` at the seam.
    ///
    /// ```rust
    /// use vireo::url::UrlBuf;
    ///
    /// let mut url = UrlBuf::from("/foo/bar");
    /// url.append("baz");
    /// assert_eq!(url.as_str(), "/foo/bar/baz");
    ///
    /// url.append("/");
    /// assert_eq!(url.as_str(), "/foo/bar/baz/");
    /// ```
    pub fn append(&mut self, url: &str) -> &mut Self {
        match (self.0.ends_with('/'), url.starts_with('/')) {
            (true, true) => self.0.push_str(&url[1..]),
            (true, false) | (false, true) => self.0.push_str(url),
            (false, false) => {
                self.0.push('/');
                self.0.push_str(url);
            }
        }

        self
    }

    /// Prefixes the URL with `base` unless it is external.
    ///
    /// ```rust
    /// use vireo::url::UrlBuf;
    ///
    /// let mut url = UrlBuf::from("/guide/install/");
    /// url.prepend("/docs");
    /// assert_eq!(url.as_str(), "/docs/guide/install/");
    ///
    /// let mut url = UrlBuf::from("https://rocket.rs/guide");
    /// url.prepend("/docs");
    /// assert_eq!(url.as_str(), "https://rocket.rs/guide");
    /// ```
    pub fn prepend(&mut self, base: &str) -> &mut Self {
        if self.is_external() {
            return self;
        }

        let mut prefixed = UrlBuf::from(base);
        prefixed.append(&self.0);
        *self = prefixed;
        self
    }

    /// A copy of the URL with `fragment` attached after `#`.
    ///
    /// ```rust
    /// use vireo::url::UrlBuf;
    ///
    /// let url = UrlBuf::from("/guide/install/");
    /// assert_eq!(url.with_fragment("setup").as_str(), "/guide/install/#setup");
    /// ```
    pub fn with_fragment(&self, fragment: &str) -> UrlBuf {
        UrlBuf(format!("{}#{}", self.0, fragment))
    }

    /// Strips one trailing `/`, the normal form for a configured base URL.
    pub fn without_trailing_slash(mut self) -> UrlBuf {
        if self.0.len() > 1 && self.0.ends_with('/') {
            self.0.pop();
        }

        self
    }
}

impl From<String> for UrlBuf {
    fn from(value: String) -> Self {
        UrlBuf(value)
    }
}

impl From<&str> for UrlBuf {
    fn from(value: &str) -> Self {
        UrlBuf(value.to_string())
    }
}

impl Deref for UrlBuf {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for UrlBuf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<UrlBuf> for String {
    fn from(value: UrlBuf) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::UrlBuf;

    #[test]
    fn prepend_skips_protocol_relative() {
        let mut url = UrlBuf::from("//cdn.example.com/x.png");
        url.prepend("/docs");
        assert_eq!(url.as_str(), "//cdn.example.com/x.png");
    }

    #[test]
    fn for_page_slugifies_both_parts() {
        assert_eq!(UrlBuf::for_page("User Guide", "Getting Started!").as_str(),
                   "/user-guide/getting-started/");
    }

    #[test]
    fn trailing_slash_normalization_keeps_root() {
        assert_eq!(UrlBuf::from("/").without_trailing_slash().as_str(), "/");
        assert_eq!(UrlBuf::from("/docs/").without_trailing_slash().as_str(), "/docs");
    }
}

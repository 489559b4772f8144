// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Which links get a click-time session check.
//!
//! Every anchor that navigates within the site is protected. Skipped:
//! anchors without `href`, anchors that already carry their own click
//! handler, fragment-only links, logout links and anything whose resolved
//! origin differs from the site origin (other hosts, `mailto:`,
//! `javascript:`...).

use anyhow::Result;
use url::{Origin, Url};

use crate::config::GateConfig;

/// The parts of an `<a>` element the classifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: Option<String>,
    pub has_click_handler: bool,
}

impl Anchor {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            has_click_handler: false,
        }
    }

    pub fn without_href() -> Self {
        Self {
            href: None,
            has_click_handler: false,
        }
    }

    pub fn with_click_handler(mut self) -> Self {
        self.has_click_handler = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Same-site navigation, checked on click
    Protected,
    NoHref,
    OwnHandler,
    Fragment,
    Logout,
    External,
}

impl LinkKind {
    pub fn is_protected(&self) -> bool {
        matches!(self, LinkKind::Protected)
    }
}

#[derive(Debug, Clone)]
pub struct LinkPolicy {
    site: Url,
    origin: Origin,
}

impl LinkPolicy {
    pub fn new(site: Url) -> Self {
        let origin = site.origin();
        Self { site, origin }
    }

    pub fn from_config(config: &GateConfig) -> Result<Self> {
        Ok(Self::new(config.site_base()?))
    }

    /// Resolve `href` the way a browser would from `page_url`.
    ///
    /// Falls back to the site URL as base when the page URL does not parse.
    pub fn resolve(&self, href: &str, page_url: &str) -> Option<Url> {
        let base = Url::parse(page_url).unwrap_or_else(|_| self.site.clone());
        base.join(href.trim()).ok()
    }

    pub fn classify(&self, anchor: &Anchor, page_url: &str) -> LinkKind {
        let Some(href) = anchor.href.as_deref() else {
            return LinkKind::NoHref;
        };
        if anchor.has_click_handler {
            return LinkKind::OwnHandler;
        }
        let href = href.trim();
        if href.starts_with('#') {
            return LinkKind::Fragment;
        }
        if href.to_ascii_lowercase().contains("logout") {
            return LinkKind::Logout;
        }
        match self.resolve(href, page_url) {
            Some(url) if url.origin() == self.origin => LinkKind::Protected,
            _ => LinkKind::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.org/site/courses/index.html";

    fn policy() -> LinkPolicy {
        LinkPolicy::new(Url::parse("https://example.org/site/").unwrap())
    }

    fn kind(href: &str) -> LinkKind {
        policy().classify(&Anchor::new(href), PAGE)
    }

    #[test]
    fn test_relative_links_are_protected() {
        assert_eq!(kind("lesson1.html"), LinkKind::Protected);
        assert_eq!(kind("../index.html"), LinkKind::Protected);
        assert_eq!(kind("/other/section.html"), LinkKind::Protected);
    }

    #[test]
    fn test_absolute_same_origin_is_protected() {
        // Outside the site path but same origin
        assert_eq!(kind("https://example.org/elsewhere.html"), LinkKind::Protected);
    }

    #[test]
    fn test_external_links_skipped() {
        assert_eq!(kind("https://other.test/"), LinkKind::External);
        assert_eq!(kind("//cdn.other.test/lib.js"), LinkKind::External);
        assert_eq!(kind("http://example.org/site/"), LinkKind::External);
        assert_eq!(kind("mailto:office@example.org"), LinkKind::External);
        assert_eq!(kind("javascript:void(0)"), LinkKind::External);
    }

    #[test]
    fn test_lookalike_domain_is_external() {
        // A substring match on the site host would wrongly protect this one
        assert_eq!(
            kind("https://example.org.evil.test/site/index.html"),
            LinkKind::External
        );
    }

    #[test]
    fn test_skip_rules() {
        assert_eq!(kind("#"), LinkKind::Fragment);
        assert_eq!(kind("#top"), LinkKind::Fragment);
        assert_eq!(kind("logout.html"), LinkKind::Logout);
        assert_eq!(kind("/auth/LogOut"), LinkKind::Logout);
        assert_eq!(policy().classify(&Anchor::without_href(), PAGE), LinkKind::NoHref);
        assert_eq!(
            policy().classify(&Anchor::new("lesson1.html").with_click_handler(), PAGE),
            LinkKind::OwnHandler
        );
    }

    #[test]
    fn test_unparsable_page_url_uses_site_base() {
        let resolved = policy().resolve("lesson1.html", "not a url").unwrap();
        assert_eq!(resolved.as_str(), "https://example.org/site/lesson1.html");
    }
}

mod generic;
mod handshake;
mod linkedin;

use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::panic::{self, AssertUnwindSafe};

use crate::models::{Platform, RawFields, RemoteType};

pub use generic::GenericExtractor;
pub use handshake::{parse_text, HandshakeExtractor};
pub use linkedin::LinkedInExtractor;

pub trait FieldExtractor {
    fn extract(&self, markup: &str, url: &str) -> RawFields;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    LinkedIn,
    Handshake,
    Generic,
}

impl ExtractorKind {
    /// With `platform_parsers` off every page goes through the generic heuristics.
    pub fn for_platform(platform: Platform, platform_parsers: bool) -> Self {
        if !platform_parsers {
            return ExtractorKind::Generic;
        }
        match platform {
            Platform::LinkedIn => ExtractorKind::LinkedIn,
            Platform::Handshake => ExtractorKind::Handshake,
            Platform::Indeed | Platform::Other => ExtractorKind::Generic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::LinkedIn => "linkedin",
            ExtractorKind::Handshake => "handshake",
            ExtractorKind::Generic => "generic",
        }
    }
}

impl FieldExtractor for ExtractorKind {
    fn extract(&self, markup: &str, url: &str) -> RawFields {
        match self {
            ExtractorKind::LinkedIn => LinkedInExtractor.extract(markup, url),
            ExtractorKind::Handshake => HandshakeExtractor.extract(markup, url),
            ExtractorKind::Generic => GenericExtractor.extract(markup, url),
        }
    }
}

// --- Failure boundary ---

/// Run one field lookup. Errors and panics are recorded in `fields.notes`
/// and yield `None`; other fields are unaffected.
pub(crate) fn attempt<T, F>(fields: &mut RawFields, field: &str, lookup: F) -> Option<T>
where
    F: FnOnce() -> Result<Option<T>>,
{
    match panic::catch_unwind(AssertUnwindSafe(lookup)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::warn!(field, url = %fields.url, error = %e, "field extraction failed");
            fields.append_note(&format!("{}: {}", field, e));
            None
        }
        Err(_) => {
            tracing::warn!(field, url = %fields.url, "field extraction panicked");
            fields.append_note(&format!("{}: extraction aborted", field));
            None
        }
    }
}

/// Same as [`attempt`] for text fields: whitespace is collapsed and an empty
/// result counts as a miss.
pub(crate) fn attempt_text<F>(fields: &mut RawFields, field: &str, lookup: F) -> Option<String>
where
    F: FnOnce() -> Result<Option<String>>,
{
    let value = attempt(fields, field, lookup).map(|v| collapse_whitespace(&v))?;
    if value.is_empty() {
        return None;
    }
    tracing::debug!(field, value = %value, "extracted");
    Some(value)
}

pub(crate) fn finish(fields: &mut RawFields) {
    if fields.is_blank() {
        fields.append_note("no fields recognized");
    }
}

// --- Parsed page ---

pub(crate) struct Page {
    doc: Html,
    text: String,
}

impl Page {
    pub(crate) fn parse(markup: &str) -> Self {
        let doc = Html::parse_document(markup);
        let text = visible_text(&doc);
        Self { doc, text }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn meta(&self, key: &str) -> Result<Option<String>> {
        let css = format!("meta[property='{key}'], meta[name='{key}']");
        let selector = parse_selector(&css)?;
        Ok(self
            .doc
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|c| !c.is_empty()))
    }

    /// Text of the first element matching any selector, tried in order.
    pub(crate) fn first_text(&self, selectors: &[&str]) -> Result<Option<String>> {
        for css in selectors {
            let selector = parse_selector(css)?;
            let hit = self
                .doc
                .select(&selector)
                .map(|el| element_text(&el))
                .find(|t| !t.is_empty());
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    pub(crate) fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.doc.select(selector)
    }

    /// Remote type from the given hint first, then the page text. A page with
    /// text but no remote/hybrid wording is treated as on-site.
    pub(crate) fn remote_type(&self, hint: &str) -> RemoteType {
        match RemoteType::detect(hint) {
            RemoteType::Unspecified if self.text.is_empty() => RemoteType::Unspecified,
            RemoteType::Unspecified => match RemoteType::detect(&self.text) {
                RemoteType::Unspecified => RemoteType::OnSite,
                found => found,
            },
            found => found,
        }
    }
}

fn visible_text(doc: &Html) -> String {
    let mut parts = Vec::new();
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"));
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join("\n")
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("bad selector '{}': {}", css, e))
}

pub(crate) fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Text heuristics shared by all platforms ---

// Spaces only, so a match never runs across lines
const LOCATION_PATTERN: &str = r"\b([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*,[ \t]*[A-Z]{2})\b";

const SALARY_PATTERN: &str = r"(?i)\$\s*[\d,]+(?:\.\d+)?(?:\s*k\b)?(?:\s*(?:/\s*hr\b|/\s*hour\b|per hour\b|an hour\b|/\s*yr\b|/\s*year\b|per year\b|a year\b|/\s*mo\b|/\s*month\b|per month\b|a month\b))?(?:\s*(?:[-–]|to)\s*\$?\s*[\d,]+(?:\.\d+)?(?:\s*k\b)?)?(?:\s*(?:/\s*hr\b|/\s*hour\b|per hour\b|an hour\b|/\s*yr\b|/\s*year\b|per year\b|a year\b|/\s*mo\b|/\s*month\b|per month\b|a month\b))?";

const UNIT_MARKER_PATTERN: &str = r"(?i)(?:/\s*(?:yr|year|mo|month|hr|hour)|per\s+(?:year|month|hour)|\b(?:yr|month|mo|hr))\b";

pub(crate) fn find_location(text: &str) -> Result<Option<String>> {
    let re = Regex::new(LOCATION_PATTERN)?;
    Ok(re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
}

pub(crate) fn find_salary(text: &str) -> Result<Option<String>> {
    let re = Regex::new(SALARY_PATTERN)?;
    Ok(re
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit())))
}

/// Like [`find_salary`] but the amount must carry a time unit.
pub(crate) fn find_salary_with_unit(text: &str) -> Result<Option<String>> {
    let unit = Regex::new(UNIT_MARKER_PATTERN)?;
    let amount = Regex::new(SALARY_PATTERN)?;
    Ok(amount
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|s| unit.is_match(s) && s.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;

    const GARBAGE_INPUTS: [&str; 6] = [
        "",
        "   \n\t  ",
        "<<<>>><html><body",
        "\u{0}\u{1}\u{2}\u{fffd}\u{fffd}PNG\r\n\u{1a}\n",
        "<div><span>unclosed <b>tags <i>everywhere",
        "<meta property=\"og:title\" content=\"\"><h1></h1>",
    ];

    #[test]
    fn test_no_extractor_panics_on_garbage() {
        let kinds = [ExtractorKind::LinkedIn, ExtractorKind::Handshake, ExtractorKind::Generic];
        for kind in kinds {
            for input in GARBAGE_INPUTS {
                let fields = kind.extract(input, "https://example.com/jobs/1");
                assert_eq!(fields.url, "https://example.com/jobs/1", "{:?} {:?}", kind, input);
                assert_eq!(fields.status, "Not applied");
                if input.trim().is_empty() {
                    assert_eq!(fields.notes, "empty page content", "{:?}", kind);
                }
            }
        }
    }

    #[test]
    fn test_pasted_text_parser_survives_garbage() {
        for input in GARBAGE_INPUTS {
            let fields = parse_text(input, "");
            assert_eq!(fields.platform, Platform::Handshake);
            assert_eq!(fields.url, "");
        }
    }

    #[test]
    fn test_empty_markup_gives_fully_shaped_record() {
        let fields = ExtractorKind::Generic.extract("", "https://example.com/j");
        assert_eq!(fields.title, "");
        assert_eq!(fields.company, "");
        assert_eq!(fields.location, "");
        assert_eq!(fields.salary_raw, "");
        assert_eq!(fields.job_type, JobType::Unspecified);
        assert_eq!(fields.remote, RemoteType::Unspecified);
        assert_eq!(fields.notes, "empty page content");
    }

    #[test]
    fn test_attempt_records_errors_and_continues() {
        let mut fields = RawFields::empty(Platform::Other, "https://example.com");
        let title: Option<String> = attempt(&mut fields, "title", || Err(anyhow!("selector exploded")));
        let company = attempt_text(&mut fields, "company", || Ok(Some("  Acme   Corp ".to_string())));
        assert_eq!(title, None);
        assert_eq!(company, Some("Acme Corp".to_string()));
        assert_eq!(fields.notes, "title: selector exploded");
    }

    #[test]
    fn test_attempt_absorbs_panics() {
        let mut fields = RawFields::empty(Platform::Other, "https://example.com");
        let value: Option<String> = attempt(&mut fields, "location", || {
            let s = "abc";
            let end = s.len() + 10;
            Ok(Some(s[..end].to_string()))
        });
        assert_eq!(value, None);
        assert_eq!(fields.notes, "location: extraction aborted");
    }

    #[test]
    fn test_extractor_selection() {
        assert_eq!(ExtractorKind::for_platform(Platform::LinkedIn, true), ExtractorKind::LinkedIn);
        assert_eq!(ExtractorKind::for_platform(Platform::Handshake, true), ExtractorKind::Handshake);
        assert_eq!(ExtractorKind::for_platform(Platform::Indeed, true), ExtractorKind::Generic);
        assert_eq!(ExtractorKind::for_platform(Platform::Other, true), ExtractorKind::Generic);
        assert_eq!(ExtractorKind::for_platform(Platform::LinkedIn, false), ExtractorKind::Generic);
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let page = Page::parse(
            "<html><head><script>var remote = true;</script><style>.x{}</style></head>\
             <body><p>Hello</p><p>World</p></body></html>",
        );
        assert_eq!(page.text(), "Hello\nWorld");
    }

    #[test]
    fn test_find_location() {
        assert_eq!(
            find_location("Join us in San Francisco, CA today").unwrap(),
            Some("San Francisco, CA".to_string())
        );
        assert_eq!(find_location("Seattle, WASHINGTON").unwrap(), None);
        assert_eq!(find_location("nowhere").unwrap(), None);
        assert_eq!(
            find_location("Initech\nSoftware Developer\nAustin, TX").unwrap(),
            Some("Austin, TX".to_string())
        );
    }

    #[test]
    fn test_find_salary() {
        assert_eq!(find_salary("Pay: $25/hr plus tips").unwrap(), Some("$25/hr".to_string()));
        assert_eq!(
            find_salary("Range $120k - $150k per year").unwrap(),
            Some("$120k - $150k per year".to_string())
        );
        assert_eq!(
            find_salary("Pay $150,000/yr - $190,000/yr plus equity").unwrap(),
            Some("$150,000/yr - $190,000/yr".to_string())
        );
        assert_eq!(
            find_salary_with_unit("Rate: $25/hr - $30/hr DOE").unwrap(),
            Some("$25/hr - $30/hr".to_string())
        );
        assert_eq!(find_salary("no money here").unwrap(), None);
    }

    #[test]
    fn test_find_salary_with_unit_skips_bare_amounts() {
        let text = "Raised $5,000,000 in funding. Pay is $30/hr.";
        assert_eq!(find_salary_with_unit(text).unwrap(), Some("$30/hr".to_string()));
        assert_eq!(find_salary_with_unit("We raised $5,000,000").unwrap(), None);
    }
}

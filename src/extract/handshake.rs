use anyhow::Result;
use regex::{Regex, RegexSet};

use super::{attempt, attempt_text, find_location, find_salary, find_salary_with_unit, finish, FieldExtractor, Page};
use crate::models::{JobType, Platform, RawFields, RemoteType};

/// Handshake pages fetched as HTML. Most Handshake postings sit behind a
/// login, so the usual path is [`parse_text`] on copied page text.
pub struct HandshakeExtractor;

impl FieldExtractor for HandshakeExtractor {
    fn extract(&self, markup: &str, url: &str) -> RawFields {
        let mut fields = RawFields::empty(Platform::Handshake, url);
        if markup.trim().is_empty() {
            fields.append_note("empty page content");
            return fields;
        }

        let page = Page::parse(markup);

        if let Some(title) = attempt_text(&mut fields, "title", || match page.meta("og:title")? {
            Some(title) => Ok(Some(title)),
            None => page.first_text(&["h1"]),
        }) {
            fields.title = title;
        }

        if let Some(company) = attempt_text(&mut fields, "company", || page.meta("og:site_name")) {
            fields.company = company;
        }

        if let Some(location) = attempt_text(&mut fields, "location", || find_location(page.text())) {
            fields.location = location;
        }

        if let Some(salary) = attempt_text(&mut fields, "salary", || find_salary(page.text())) {
            fields.salary_raw = salary;
        }

        fields.job_type = JobType::detect(page.text());
        fields.remote = page.remote_type("");

        finish(&mut fields);
        tracing::info!(title = %fields.title, company = %fields.company, "parsed Handshake job");
        fields
    }
}

// --- Pasted text ---

const LABELS: [&str; 8] = [
    "position",
    "company",
    "location",
    "salary",
    "jobtype",
    "job type",
    "employment type",
    "remote",
];

const NOISE_PATTERNS: [&str; 18] = [
    r"^\d+\s+profile\s+views?$",
    r"^skip to",
    r"^menu$",
    r"^navigation$",
    r"^home$",
    r"^jobs$",
    r"^sign in$",
    r"^log in$",
    r"^search$",
    r"^get the app$",
    r"^save$",
    r"^share$",
    r"^apply$",
    r"^follow$",
    r"in the past \d+ days?$",
    r"^posted",
    r"^apply by",
    r"^={3,}$",
];

const TITLE_KEYWORDS: [&str; 9] = [
    "engineer",
    "developer",
    "manager",
    "analyst",
    "scientist",
    "designer",
    "architect",
    "specialist",
    "intern",
];

const CITY_STATE_LINE: &str = r"^[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*,\s*[A-Z]{2}$";

/// Parse text copied from a Handshake job page. `url` may be empty.
pub fn parse_text(text: &str, url: &str) -> RawFields {
    let mut fields = RawFields::empty(Platform::Handshake, url);

    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        fields.append_note("empty page content");
        return fields;
    }
    let joined = lines.join("\n");

    let labels = Labels::scan(&lines);
    let scanner = attempt(&mut fields, "line filters", || LineScanner::new().map(Some));

    if let Some(company) = attempt_text(&mut fields, "company", || match labels.get("company") {
        Some(company) => Ok(Some(company.to_string())),
        None => scanner.as_ref().map_or(Ok(None), |s| s.logo_company(&lines)),
    }) {
        fields.company = company;
    }

    let company = fields.company.clone();
    if let Some(title) = attempt_text(&mut fields, "title", || match labels.get("position") {
        Some(title) => Ok(Some(title.to_string())),
        None => Ok(scanner.as_ref().and_then(|s| s.title(&lines, &company))),
    }) {
        fields.title = title;
    }

    // Second meaningful line is usually the employer when there was no logo line
    if fields.company.is_empty() {
        let title = fields.title.clone();
        if let Some(company) = attempt_text(&mut fields, "company", || {
            Ok(scanner.as_ref().and_then(|s| {
                s.meaningful_lines(&lines)
                    .into_iter()
                    .find(|l| *l != title)
                    .map(str::to_string)
            }))
        }) {
            fields.company = company;
        }
    }

    if let Some(location) = attempt_text(&mut fields, "location", || {
        if let Some(labeled) = labels.get("location") {
            return Ok(find_location(labeled)?.or_else(|| Some(labeled.to_string())));
        }
        find_location(&joined)
    }) {
        fields.location = location;
    }

    if let Some(salary) = attempt_text(&mut fields, "salary", || match labels.get("salary") {
        Some(salary) => Ok(Some(salary.to_string())),
        None => find_salary_with_unit(&joined),
    }) {
        fields.salary_raw = salary;
    }

    fields.job_type = labels
        .job_type()
        .map(JobType::detect)
        .filter(|jt| !jt.is_unspecified())
        .unwrap_or_else(|| JobType::detect(&joined));

    // Pasted text has no "on-site" default; absence stays unknown
    fields.remote = labels
        .get("remote")
        .map(RemoteType::detect)
        .filter(|r| !r.is_unspecified())
        .unwrap_or_else(|| RemoteType::detect(&joined));

    finish(&mut fields);
    tracing::info!(title = %fields.title, company = %fields.company, "parsed Handshake text");
    fields
}

/// Explicit `Label` / value pairs, either on consecutive lines or as `Label: value`.
#[derive(Debug, Default)]
struct Labels<'a> {
    pairs: Vec<(&'static str, &'a str)>,
}

impl<'a> Labels<'a> {
    fn scan(lines: &[&'a str]) -> Self {
        let mut pairs = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let lower = line.to_lowercase();

            if let Some(label) = LABELS.iter().find(|l| **l == lower) {
                if let Some(value) = lines.get(i + 1) {
                    pairs.push((*label, *value));
                }
                i += 2;
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                if let Some(label) = LABELS.iter().find(|l| **l == key) {
                    if !value.is_empty() {
                        pairs.push((*label, value));
                    }
                }
            }
            i += 1;
        }
        Self { pairs }
    }

    fn get(&self, label: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(l, _)| *l == label).map(|(_, v)| *v)
    }

    fn job_type(&self) -> Option<&'a str> {
        self.get("jobtype")
            .or_else(|| self.get("job type"))
            .or_else(|| self.get("employment type"))
    }
}

struct LineScanner {
    noise: RegexSet,
    logo: Regex,
    city_state: Regex,
    posted: Regex,
    job_type_only: Regex,
}

impl LineScanner {
    fn new() -> Result<Self> {
        Ok(Self {
            noise: RegexSet::new(NOISE_PATTERNS.iter().map(|p| format!("(?i){}", p)))?,
            logo: Regex::new(r"(?i)^(.+?)\s+logo\s*$")?,
            city_state: Regex::new(CITY_STATE_LINE)?,
            posted: Regex::new(r"(?i)^posted|\d+\s+days?\s+ago|apply by")?,
            job_type_only: Regex::new(r"(?i)^(?:internship|full[-\s]?time|part[-\s]?time|contract)$")?,
        })
    }

    fn is_noise(&self, line: &str) -> bool {
        let lower = line.trim().to_lowercase();
        if lower.is_empty() || lower.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        if lower.ends_with("logo") {
            return true;
        }
        self.noise.is_match(&lower)
    }

    /// "<Company> logo" is the first line of a Handshake posting.
    fn logo_company(&self, lines: &[&str]) -> Result<Option<String>> {
        let Some(line) = lines.iter().find(|l| l.to_lowercase().contains("logo")) else {
            return Ok(None);
        };
        Ok(self
            .logo
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|c| c.len() > 2 && !self.is_noise(c))
            .map(str::to_string))
    }

    fn title(&self, lines: &[&str], company: &str) -> Option<String> {
        self.title_after_logo(lines, company)
            .or_else(|| self.title_from_keywords(lines))
    }

    /// First meaningful line after the logo line, stopping at the posting metadata.
    fn title_after_logo(&self, lines: &[&str], company: &str) -> Option<String> {
        let logo_idx = lines.iter().position(|l| l.to_lowercase().contains("logo"))?;

        for line in lines.iter().skip(logo_idx + 1).take(8) {
            if self.posted.is_match(line) {
                break;
            }
            if !company.is_empty() && line.eq_ignore_ascii_case(company) {
                continue;
            }
            if self.is_noise(line) || line.len() <= 3 || is_all_caps(line) || self.city_state.is_match(line) {
                continue;
            }
            return Some(line.to_string());
        }
        None
    }

    fn title_from_keywords(&self, lines: &[&str]) -> Option<String> {
        let meaningful = self.meaningful_lines(lines);
        meaningful
            .iter()
            .find(|l| {
                let lower = l.to_lowercase();
                TITLE_KEYWORDS.iter().any(|k| lower.contains(k)) && !self.job_type_only.is_match(l)
            })
            .or_else(|| meaningful.first())
            .map(|l| l.to_string())
    }

    fn meaningful_lines<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
        lines
            .iter()
            .copied()
            .filter(|l| {
                let lower = l.to_lowercase();
                !self.is_noise(l)
                    && !LABELS.contains(&lower.as_str())
                    && l.len() > 5
                    && !["profile", "view", "follow"].iter().any(|kw| lower.contains(kw))
                    && !self.city_state.is_match(l)
                    && !lower.contains("logo")
                    && !l.contains('$')
            })
            .collect()
    }
}

fn is_all_caps(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

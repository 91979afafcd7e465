use anyhow::Result;
use url::Url;

use super::{attempt, attempt_text, find_location, find_salary, finish, FieldExtractor, Page};
use crate::classify::classify;
use crate::models::{JobType, RawFields};

// Subdomains that say nothing about the employer
const HOST_NOISE: [&str; 6] = ["www", "jobs", "careers", "apply", "boards", "m"];

/// Fallback for company career pages and anything unrecognized. Expect
/// partial records.
pub struct GenericExtractor;

impl FieldExtractor for GenericExtractor {
    fn extract(&self, markup: &str, url: &str) -> RawFields {
        let mut fields = RawFields::empty(classify(Some(url)), url);
        if markup.trim().is_empty() {
            fields.append_note("empty page content");
            return fields;
        }

        let page = Page::parse(markup);

        if let Some(title) = attempt_text(&mut fields, "title", || {
            if let Some(title) = page.meta("og:title")? {
                return Ok(Some(title));
            }
            if let Some(title) = page.first_text(&["h1"])? {
                return Ok(Some(title));
            }
            // <title> usually carries a " | Site" suffix
            Ok(page
                .first_text(&["title"])?
                .map(|t| t.split(" | ").next().unwrap_or_default().to_string()))
        }) {
            fields.title = title;
        }

        if let Some(company) = attempt_text(&mut fields, "company", || match page.meta("og:site_name")? {
            Some(site) => Ok(Some(site)),
            None => company_from_url(url),
        }) {
            fields.company = company;
        }

        if let Some(location) = attempt_text(&mut fields, "location", || find_location(page.text())) {
            fields.location = location;
        }

        if let Some(salary) = attempt_text(&mut fields, "salary", || find_salary(page.text())) {
            fields.salary_raw = salary;
        }

        if let Some(job_type) = attempt(&mut fields, "job type", || Ok(Some(JobType::detect(page.text())))) {
            fields.job_type = job_type;
        }
        fields.remote = page.remote_type("");

        finish(&mut fields);
        tracing::info!(
            title = %fields.title,
            company = %fields.company,
            platform = %fields.platform,
            "parsed generic job"
        );
        fields
    }
}

/// Guess the employer from the host, e.g. `careers.acme.com` -> `Acme`.
fn company_from_url(url: &str) -> Result<Option<String>> {
    let Ok(parsed) = Url::parse(url) else {
        return Ok(None);
    };
    let Some(host) = parsed.host_str() else {
        return Ok(None);
    };

    let labels: Vec<&str> = host
        .split('.')
        .filter(|l| !l.is_empty() && !HOST_NOISE.contains(l))
        .collect();
    if labels.len() < 2 {
        return Ok(None);
    }

    let name = labels[labels.len() - 2];
    let mut chars = name.chars();
    Ok(chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect()))
}

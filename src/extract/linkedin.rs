use anyhow::Result;
use regex::Regex;

use super::{attempt, attempt_text, element_text, find_location, find_salary, finish, parse_selector, FieldExtractor, Page};
use crate::models::{JobType, Platform, RawFields};

const TITLE_SELECTORS: [&str; 4] = [
    "h1.top-card-layout__title",
    "h1.topcard__title",
    ".job-details-jobs-unified-top-card__job-title",
    "h1",
];

const COMPANY_SELECTORS: [&str; 3] = [
    "a.topcard__org-name-link",
    ".job-details-jobs-unified-top-card__company-name",
    "span.topcard__flavor",
];

const LOCATION_SELECTORS: [&str; 2] = [
    "span.topcard__flavor--bullet",
    ".job-details-jobs-unified-top-card__bullet",
];

const SALARY_SELECTORS: [&str; 2] = [".compensation__salary", ".salary"];

/// Public LinkedIn job view pages (`/jobs/view/...`).
pub struct LinkedInExtractor;

impl FieldExtractor for LinkedInExtractor {
    fn extract(&self, markup: &str, url: &str) -> RawFields {
        let mut fields = RawFields::empty(Platform::LinkedIn, url);
        if markup.trim().is_empty() {
            fields.append_note("empty page content");
            return fields;
        }

        let page = Page::parse(markup);

        let og = attempt(&mut fields, "og:title", || {
            Ok(page.meta("og:title")?.map(|t| split_og_title(&t)))
        })
        .unwrap_or_default();

        if let Some(title) = og.title.clone().filter(|t| !t.is_empty()) {
            fields.title = title;
        } else if let Some(title) = attempt_text(&mut fields, "title", || page.first_text(&TITLE_SELECTORS)) {
            fields.title = title;
        }

        if let Some(company) = og.company.clone().filter(|c| !c.is_empty()) {
            fields.company = company;
        } else if let Some(company) = attempt_text(&mut fields, "company", || page.first_text(&COMPANY_SELECTORS)) {
            fields.company = company;
        }

        let location = match og.location.clone().filter(|l| !l.is_empty()) {
            Some(location) => Some(location),
            None => attempt_text(&mut fields, "location", || {
                match page.first_text(&LOCATION_SELECTORS)? {
                    Some(location) => Ok(Some(location)),
                    None => find_location(page.text()),
                }
            }),
        };
        if let Some(location) = location {
            fields.location = location;
        }

        if let Some(salary) = attempt_text(&mut fields, "salary", || {
            match page.first_text(&SALARY_SELECTORS)? {
                Some(salary) => Ok(Some(salary)),
                None => find_salary(page.text()),
            }
        }) {
            fields.salary_raw = salary;
        }

        if let Some(job_type) = attempt(&mut fields, "job type", || {
            let detected = match job_criteria(&page, "employment type")? {
                Some(criteria) => JobType::detect(&criteria),
                None => JobType::Unspecified,
            };
            if detected.is_unspecified() {
                Ok(Some(JobType::detect(page.text())))
            } else {
                Ok(Some(detected))
            }
        }) {
            fields.job_type = job_type;
        }

        // LinkedIn puts "(Remote)" / "(Hybrid)" in the location line
        fields.remote = page.remote_type(&fields.location);

        finish(&mut fields);
        tracing::info!(title = %fields.title, company = %fields.company, "parsed LinkedIn job");
        fields
    }
}

#[derive(Debug, Default, PartialEq)]
struct OgTitle {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
}

/// LinkedIn's og:title comes in two shapes:
///   "Acme hiring Software Engineer in Seattle, WA | LinkedIn"
///   "Software Engineer - Acme | LinkedIn"
fn split_og_title(raw: &str) -> OgTitle {
    let text = raw.trim();
    let text = text.strip_suffix("| LinkedIn").unwrap_or(text).trim();

    if let Some((company, rest)) = text.split_once(" hiring ") {
        let (title, location) = match rest.rsplit_once(" in ") {
            Some((title, location)) => (title, Some(location.trim().to_string())),
            None => (rest, None),
        };
        return OgTitle {
            title: Some(title.trim().to_string()),
            company: Some(company.trim().to_string()),
            location,
        };
    }

    if let Some((title, rest)) = text.split_once(" - ") {
        let company = rest.split(" | ").next().unwrap_or(rest);
        return OgTitle {
            title: Some(title.trim().to_string()),
            company: Some(company.trim().to_string()),
            location: None,
        };
    }

    OgTitle {
        title: text.split(" | ").next().map(|t| t.trim().to_string()),
        company: None,
        location: None,
    }
}

/// Value of a job-criteria entry, e.g. "Employment type" -> "Full-time".
fn job_criteria(page: &Page, header: &str) -> Result<Option<String>> {
    let item = parse_selector("li.description__job-criteria-item")?;
    let subheader = parse_selector(".description__job-criteria-subheader")?;
    let value = parse_selector(".description__job-criteria-text")?;
    let header_re = Regex::new(&format!("(?i)^{}$", regex::escape(header)))?;

    for entry in page.select(&item) {
        let matches_header = entry
            .select(&subheader)
            .next()
            .is_some_and(|h| header_re.is_match(&element_text(&h)));
        if matches_header {
            return Ok(entry.select(&value).next().map(|v| element_text(&v)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteType;

    const JOB_PAGE: &str = r#"
        <html>
        <head>
          <meta property="og:title" content="Acme Robotics hiring Senior Platform Engineer in Seattle, WA | LinkedIn">
        </head>
        <body>
          <h1 class="top-card-layout__title">Senior Platform Engineer</h1>
          <a class="topcard__org-name-link">Acme Robotics</a>
          <span class="topcard__flavor--bullet">Seattle, WA (Hybrid)</span>
          <div class="compensation__salary">$150,000/yr - $190,000/yr</div>
          <ul>
            <li class="description__job-criteria-item">
              <h3 class="description__job-criteria-subheader">Seniority level</h3>
              <span class="description__job-criteria-text">Mid-Senior level</span>
            </li>
            <li class="description__job-criteria-item">
              <h3 class="description__job-criteria-subheader">Employment type</h3>
              <span class="description__job-criteria-text">Contract</span>
            </li>
          </ul>
          <p>This full-time role supports our remote fleet.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_split_og_title_hiring_format() {
        let og = split_og_title("Acme hiring Software Engineer in New York, NY | LinkedIn");
        assert_eq!(og.title.as_deref(), Some("Software Engineer"));
        assert_eq!(og.company.as_deref(), Some("Acme"));
        assert_eq!(og.location.as_deref(), Some("New York, NY"));
    }

    #[test]
    fn test_split_og_title_dash_format() {
        let og = split_og_title("Data Analyst - DataCo | LinkedIn");
        assert_eq!(og.title.as_deref(), Some("Data Analyst"));
        assert_eq!(og.company.as_deref(), Some("DataCo"));
        assert_eq!(og.location, None);
    }

    #[test]
    fn test_split_og_title_plain() {
        let og = split_og_title("Staff Engineer | LinkedIn");
        assert_eq!(og.title.as_deref(), Some("Staff Engineer"));
        assert_eq!(og.company, None);
    }

    #[test]
    fn test_extract_full_page() {
        let fields = LinkedInExtractor.extract(JOB_PAGE, "https://www.linkedin.com/jobs/view/4012345678");
        assert_eq!(fields.platform, Platform::LinkedIn);
        assert_eq!(fields.title, "Senior Platform Engineer");
        assert_eq!(fields.company, "Acme Robotics");
        assert_eq!(fields.location, "Seattle, WA");
        assert_eq!(fields.salary_raw, "$150,000/yr - $190,000/yr");
        assert_eq!(crate::salary::normalize(&fields.salary_raw).annual_amount, Some(170000.0));
        // The criteria list beats the body text
        assert_eq!(fields.job_type, JobType::Contract);
        assert_eq!(fields.remote, RemoteType::Remote);
        assert_eq!(fields.notes, "");
    }

    #[test]
    fn test_extract_falls_back_to_selectors() {
        let html = r#"
            <html><body>
              <h1 class="top-card-layout__title">Backend Developer</h1>
              <a class="topcard__org-name-link"> Initech </a>
              <span class="topcard__flavor--bullet">Austin, TX</span>
              <p>Full-time. Pay: $60/hr</p>
            </body></html>
        "#;
        let fields = LinkedInExtractor.extract(html, "https://www.linkedin.com/jobs/view/1");
        assert_eq!(fields.title, "Backend Developer");
        assert_eq!(fields.company, "Initech");
        assert_eq!(fields.location, "Austin, TX");
        assert_eq!(fields.salary_raw, "$60/hr");
        assert_eq!(fields.job_type, JobType::FullTime);
        assert_eq!(fields.remote, RemoteType::OnSite);
    }

    #[test]
    fn test_extract_page_without_job_data() {
        let fields = LinkedInExtractor.extract("<html><body></body></html>", "https://www.linkedin.com/jobs/view/2");
        assert_eq!(fields.title, "");
        assert_eq!(fields.url, "https://www.linkedin.com/jobs/view/2");
        assert_eq!(fields.notes, "no fields recognized");
    }
}

use url::Url;

use crate::models::Platform;

// First match wins.
const PLATFORM_MARKERS: [(&str, Platform); 4] = [
    ("linkedin.com", Platform::LinkedIn),
    ("indeed.com", Platform::Indeed),
    ("joinhandshake.com", Platform::Handshake),
    ("handshake.com", Platform::Handshake),
];

/// Platform whose postings can only be pasted in as text.
pub const TEXT_ONLY_PLATFORM: Platform = Platform::Handshake;

/// Pick the platform for a job URL. `None` means the posting was pasted as
/// text, which only happens for platforms that block fetching.
pub fn classify(url: Option<&str>) -> Platform {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return TEXT_ONLY_PLATFORM;
    };

    // Match against the host when we can find one, otherwise the raw string
    let haystack = match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_lowercase())
            .unwrap_or_else(|| url.to_lowercase()),
        Err(_) => url.to_lowercase(),
    };

    PLATFORM_MARKERS
        .iter()
        .find(|(marker, _)| haystack.contains(marker))
        .map(|(_, platform)| *platform)
        .unwrap_or(Platform::Other)
}

/// Check that a URL is something we can fetch.
pub fn validate_job_url(url: &str) -> Result<Url, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL format: {}", e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("URL must use http or https protocol".to_string());
    }

    if parsed.host_str().is_none_or(|h| h.is_empty()) {
        return Err("URL must include a domain name".to_string());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_hosts() {
        assert_eq!(classify(Some("https://www.linkedin.com/jobs/view/123")), Platform::LinkedIn);
        assert_eq!(classify(Some("https://WWW.LINKEDIN.COM/jobs/view/123")), Platform::LinkedIn);
        assert_eq!(classify(Some("https://www.indeed.com/viewjob?jk=abc")), Platform::Indeed);
        assert_eq!(classify(Some("https://app.joinhandshake.com/jobs/42")), Platform::Handshake);
        assert_eq!(classify(Some("https://school.handshake.com/jobs/42")), Platform::Handshake);
    }

    #[test]
    fn test_classify_matches_host_not_path() {
        // A marker in the query string must not change the platform
        assert_eq!(
            classify(Some("https://careers.acme.com/apply?ref=linkedin.com")),
            Platform::Other
        );
    }

    #[test]
    fn test_classify_unparseable_falls_back_to_raw_string() {
        assert_eq!(classify(Some("linkedin.com/jobs/view/1")), Platform::LinkedIn);
        assert_eq!(classify(Some("not a url at all")), Platform::Other);
        assert_eq!(classify(Some("\u{0}\u{1}garbage")), Platform::Other);
    }

    #[test]
    fn test_classify_pasted_text_mode() {
        assert_eq!(classify(None), Platform::Handshake);
        assert_eq!(classify(Some("   ")), Platform::Handshake);
    }

    #[test]
    fn test_validate_job_url() {
        assert!(validate_job_url("https://example.com/jobs/1").is_ok());
        assert_eq!(validate_job_url("  ").unwrap_err(), "URL cannot be empty");
        assert_eq!(
            validate_job_url("ftp://example.com/file").unwrap_err(),
            "URL must use http or https protocol"
        );
        assert!(validate_job_url("example.com/jobs").is_err());
    }
}

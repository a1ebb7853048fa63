//! URL and domain helpers

use url::Url;

/// Lowercased host of `url` with a leading `www.` removed.
/// Returns None when the URL has no scheme or host.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// True when `host` is `pattern` or one of its subdomains.
/// A bare suffix such as "edu" matches any host under that TLD.
pub fn domain_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().trim_start_matches('.').to_ascii_lowercase();
    if pattern.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    host == pattern || host.ends_with(&format!(".{pattern}"))
}

/// Best-effort registrable domain: the last two labels of the host.
pub fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }
    labels[labels.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_strips_www_and_case() {
        assert_eq!(
            host_of("https://WWW.Nature.com/articles/1").as_deref(),
            Some("nature.com")
        );
        assert_eq!(host_of("not a url"), None);
        assert_eq!(host_of("mailto:someone@example.org"), None);
    }

    #[test]
    fn subdomains_and_tld_suffixes_match() {
        assert!(domain_matches("nature.com", "nature.com"));
        assert!(domain_matches("news.nature.com", "nature.com"));
        assert!(domain_matches("mit.edu", "edu"));
        assert!(domain_matches("cs.stanford.edu", ".edu"));
        assert!(!domain_matches("notnature.com", "nature.com"));
        assert!(!domain_matches("nature.com.evil.io", "nature.com"));
    }

    #[test]
    fn registrable_domain_keeps_last_two_labels() {
        assert_eq!(registrable_domain("news.bbc.com"), "bbc.com");
        assert_eq!(registrable_domain("reuters.com"), "reuters.com");
    }
}

//! Fixed vocabularies used by the content detectors.

/// Terms whose presence in visible text marks a page as spam-adjacent.
///
/// Entries are lowercase; multi-word entries match as phrases. Matching is a
/// plain substring test against lowercased body text, so inflections such as
/// `casinos` also hit.
pub(crate) const POISON_TERMS: &[&str] = &[
    // Gambling
    "casino",
    "lottery",
    // Pharmaceuticals
    "viagra",
    "cialis",
    // Predatory lending
    "payday loan",
    // Crypto spam
    "buy crypto",
];

/// Hosts counted as outbound social-profile links.
pub(crate) const SOCIAL_HOSTS: &[&str] = &[
    "linkedin.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
];

/// Returns every poison term found in `text_lower`, in [`POISON_TERMS`] order.
#[must_use]
pub fn find_poison_terms(text_lower: &str) -> Vec<&'static str> {
    POISON_TERMS
        .iter()
        .copied()
        .filter(|term| text_lower.contains(term))
        .collect()
}

/// Returns `true` when `href` is an absolute link to one of [`SOCIAL_HOSTS`]
/// (or a subdomain of one).
#[must_use]
pub fn is_social_href(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    let Some((_, rest)) = lower.split_once("//") else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();

    SOCIAL_HOSTS
        .iter()
        .any(|social| host == *social || host.ends_with(&format!(".{social}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_poison() {
        assert!(find_poison_terms("").is_empty());
    }

    #[test]
    fn finds_single_term() {
        assert_eq!(find_poison_terms("best online casino bonus"), vec!["casino"]);
    }

    #[test]
    fn finds_multi_word_phrase() {
        assert_eq!(find_poison_terms("get a payday loan today"), vec!["payday loan"]);
    }

    #[test]
    fn returns_terms_in_lexicon_order() {
        assert_eq!(
            find_poison_terms("viagra and casino and lottery"),
            vec!["casino", "lottery", "viagra"]
        );
    }

    #[test]
    fn social_href_matches_known_hosts() {
        assert!(is_social_href("https://www.linkedin.com/company/acme"));
        assert!(is_social_href("https://x.com/acme"));
        assert!(is_social_href("//facebook.com/acme"));
    }

    #[test]
    fn social_href_ignores_lookalike_hosts() {
        assert!(!is_social_href("https://netflix.com/title/1"));
        assert!(!is_social_href("https://example.com/?ref=twitter.com"));
    }

    #[test]
    fn social_href_ignores_relative_links() {
        assert!(!is_social_href("/about/instagram.com"));
    }
}

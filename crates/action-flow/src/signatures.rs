//! Page-state signatures: login pages, open mailboxes and access blocks

use action_locator::ProviderProfile;
use once_cell::sync::Lazy;

static CHALLENGE_PATTERNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "verify you're a human",
        "verify you are a human",
        "unusual traffic from your computer network",
    ]
});

fn first_match<'a>(haystack: &str, markers: &'a [String]) -> Option<&'a str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| !marker.is_empty() && haystack.contains(&marker.to_ascii_lowercase()))
}

/// True when the URL or page text looks like the provider's login page.
pub fn needs_login(profile: &ProviderProfile, url: &str, content: &str) -> bool {
    let url = url.to_ascii_lowercase();
    let content = content.to_ascii_lowercase();
    first_match(&url, &profile.login_url_markers).is_some()
        || first_match(&content, &profile.login_content_markers).is_some()
}

/// True when the URL is inside the mailbox. Login URLs often carry the
/// mailbox address as a continuation parameter, so a login marker wins.
pub fn is_authenticated(profile: &ProviderProfile, url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    first_match(&url, &profile.authenticated_url_markers).is_some()
        && first_match(&url, &profile.login_url_markers).is_none()
}

/// Short reason when the page refuses automated access.
pub fn detect_block_reason(profile: &ProviderProfile, content: &str) -> Option<String> {
    let content = content.to_ascii_lowercase();
    if let Some(marker) = first_match(&content, &profile.blocked_content_markers) {
        return Some(format!("{} page reports \"{}\"", profile.display_name(), marker));
    }
    CHALLENGE_PATTERNS
        .iter()
        .find(|pattern| content.contains(*pattern))
        .map(|pattern| format!("challenge page detected (\"{}\")", pattern))
}

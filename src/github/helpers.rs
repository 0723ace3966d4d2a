use base64::{Engine as _, engine::general_purpose::STANDARD};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::HeaderMap;

use super::GitHubError;

/// Characters to percent-encode in a single URL path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b';')
    .add(b'=');

pub(super) fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

fn is_valid_github_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && s != ".."
        && s != "."
}

/// Validate a GitHub login before it is interpolated into a request path.
pub fn validate_username(username: &str) -> Result<(), GitHubError> {
    if is_valid_github_name(username) {
        Ok(())
    } else {
        Err(GitHubError::InvalidUsername(username.to_string()))
    }
}

/// Decode base64-encoded content from the GitHub Contents API.
pub fn decode_content(encoded: &str) -> Result<String, GitHubError> {
    let clean: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(&clean)
        .map_err(|e| GitHubError::Decode(e.to_string()))?;
    String::from_utf8(bytes)
        .map_err(|_| GitHubError::Decode("content is not valid UTF-8".into()))
}

/// First `max` characters of `s`, counted in chars rather than bytes.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(super) fn rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;
use url::Url;

const REMAINING: &str = "X-RateLimit-Remaining";
const LIMIT: &str = "X-RateLimit-Limit";
const RESET: &str = "X-RateLimit-Reset";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn header_num<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    header_str(headers, name).and_then(|s| s.parse().ok())
}

/// Decides whether a failed response is a rate-limit signal and, if so, how
/// long to wait before retrying the same request.
///
/// Secondary limits send `Retry-After` in seconds; a value that does not parse
/// means "retry now". Primary limits send `X-RateLimit-Remaining: 0` and a
/// reset timestamp, which is waited out plus one second. Any other 403 is a
/// plain failure and returns `None`.
pub fn retry_after(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    if let Some(value) = header_str(headers, RETRY_AFTER.as_str()) {
        let secs = value.parse::<u64>().unwrap_or(0);
        return Some(Duration::from_secs(secs));
    }

    if header_num::<u64>(headers, REMAINING) == Some(0) {
        let wait = match header_num::<i64>(headers, RESET) {
            Some(reset) if reset > now => (reset - now) as u64 + 1,
            _ => 0,
        };
        return Some(Duration::from_secs(wait));
    }

    None
}

/// Remaining request quota reported alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub remaining: u32,
    pub limit: u32,
}

impl Quota {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Quota {
            remaining: header_num(headers, REMAINING)?,
            limit: header_num(headers, LIMIT)?,
        })
    }
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remaining, self.limit)
    }
}

/// Page number of the `rel="next"` entry in a `Link` header, if any.
///
/// Relative targets are resolved against `request_url`. A next link without a
/// usable `page` parameter is logged and treated as the last page.
pub fn next_page(headers: &HeaderMap, request_url: &Url) -> Option<u32> {
    let link = header_str(headers, LINK.as_str())?;

    let target = link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        is_next.then_some(target)
    })?;

    let page = target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .and_then(|t| request_url.join(t).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
        });

    if page.is_none() {
        warn!("Ignoring unusable next page link: {}", target);
    }
    page
}

/// Domain extraction for Tab Warden
use url::Url;

/// Extract the tracking domain from a tab URL.
///
/// Only http(s) pages are tracked: `chrome://`, `about:`, `file:` and
/// friends return `None` and the caller skips the tab entirely. The
/// hostname is kept exactly as parsed (`www.` prefixes included), so site
/// limits and category lists must name the full host string.
///
/// Examples:
/// - https://www.youtube.com/watch?v=x → www.youtube.com
/// - https://github.com/rust-lang/rust → github.com
/// - chrome://extensions → None
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !is_web_scheme(parsed.scheme()) {
        return None;
    }
    parsed.host_str().map(str::to_string)
}

fn is_web_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

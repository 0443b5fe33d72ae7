use url::{ParseError, Url};

/// Host of a parsed URL including any explicit port, e.g. `example.com:8080`.
///
/// Returns an empty string for URLs without a host (`mailto:`, `data:`).
pub fn host_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        (None, _) => String::new(),
    }
}

/// Stand-in base for resolving scheme-relative references. Only the host of
/// the joined URL is read, and `//` references replace this one.
const PLACEHOLDER_BASE: &str = "http://placeholder.invalid/";

/// Resolve the host of an href as found in markup.
///
/// Absolute URLs yield their host. Scheme-relative references
/// (`//example.com/x`) yield the host they name. Other relative references
/// (`/about`, `#top`) are valid but carry no host, so they yield an empty
/// string. Anything else that fails to parse yields `None`.
pub fn href_host(href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(url) => Some(host_of(&url)),
        Err(ParseError::RelativeUrlWithoutBase) => {
            if !href.trim_start().starts_with("//") {
                return Some(String::new());
            }
            let base = Url::parse(PLACEHOLDER_BASE).ok()?;
            base.join(href).ok().map(|url| host_of(&url))
        }
        Err(_) => None,
    }
}

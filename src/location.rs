//! The page URL and the bits of `history` the highlighter needs.

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// `scheme://host[:port]`, empty for origin-relative URLs.
    pub origin: String,
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl Location {
    pub fn parse(url: &str) -> Location {
        let (origin, rest) = match scheme_end(url) {
            Some(scheme_end) => {
                let after = &url[scheme_end + 3..];
                let host_end = after.find(['/', '?', '#']).unwrap_or(after.len());
                let split = scheme_end + 3 + host_end;
                (url[..split].to_string(), &url[split..])
            }
            None => (String::new(), url),
        };

        let (rest, hash) = match rest.find('#') {
            Some(i) => (&rest[..i], rest[i..].to_string()),
            None => (rest, String::new()),
        };
        let (path, search) = match rest.find('?') {
            Some(i) => (&rest[..i], rest[i..].to_string()),
            None => (rest, String::new()),
        };

        Location {
            origin,
            pathname: if path.is_empty() { "/".to_string() } else { path.to_string() },
            search: if search == "?" { String::new() } else { search },
            hash: if hash == "#" { String::new() } else { hash },
        }
    }

    pub fn href(&self) -> String {
        self.to_string()
    }

    /// First value of a query parameter, decoded like `URLSearchParams`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.search
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .find_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key) == name).then(|| decode_component(value))
            })
    }

    /// Resolve `href` against this location, like `new URL(href, base)`.
    pub fn resolve(&self, href: &str) -> Location {
        if scheme_end(href).is_some() {
            return Location::parse(href);
        }
        if let Some(rest) = href.strip_prefix("//") {
            let scheme = self.origin.split("://").next().unwrap_or("https");
            return Location::parse(&format!("{scheme}://{rest}"));
        }
        if href.starts_with('#') {
            let mut target = self.clone();
            target.hash = if href == "#" { String::new() } else { href.to_string() };
            return target;
        }
        if href.starts_with('?') {
            let mut target = Location::parse(href);
            target.origin = self.origin.clone();
            target.pathname = self.pathname.clone();
            return target;
        }

        let joined = if href.starts_with('/') {
            href.to_string()
        } else {
            let dir_end = self.pathname.rfind('/').map(|i| i + 1).unwrap_or(0);
            format!("{}{}", &self.pathname[..dir_end], href)
        };
        let mut target = Location::parse(&joined);
        target.origin = self.origin.clone();
        target.pathname = normalize_path(&target.pathname);
        target
    }

    /// `history.replaceState(.., url)` with a same-origin path.
    pub fn replace_state(&mut self, url: &str) {
        let next = self.resolve(url);
        self.pathname = next.pathname;
        self.search = next.search;
        self.hash = next.hash;
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.origin, self.pathname, self.search, self.hash)
    }
}

/// Offset of `://` when `url` opens with a scheme (`[A-Za-z][A-Za-z0-9+.-]*`).
fn scheme_end(url: &str) -> Option<usize> {
    let end = url.find("://")?;
    let scheme = &url[..end];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
    valid.then_some(end)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Percent-encode a single URL component, like `encodeURIComponent`.
pub fn encode_component(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Percent-encode each segment of a `/`-separated path.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut normalized = format!("/{}", segments.join("/"));
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let loc = Location::parse("https://blog.example:8080/posts/a%20b.html?highlight=cat&matchNum=2#top");
        assert_eq!(loc.origin, "https://blog.example:8080");
        assert_eq!(loc.pathname, "/posts/a%20b.html");
        assert_eq!(loc.search, "?highlight=cat&matchNum=2");
        assert_eq!(loc.hash, "#top");
        assert_eq!(
            loc.href(),
            "https://blog.example:8080/posts/a%20b.html?highlight=cat&matchNum=2#top"
        );
    }

    #[test]
    fn test_query_param_decoding() {
        let loc = Location::parse("/posts/x.html?highlight=f%28x%29+and%20y&matchNum=3&highlight=second");
        assert_eq!(loc.query_param("highlight").as_deref(), Some("f(x) and y"));
        assert_eq!(loc.query_param("matchNum").as_deref(), Some("3"));
        assert_eq!(loc.query_param("missing"), None);

        let bare = Location::parse("/posts/x.html?flag");
        assert_eq!(bare.query_param("flag").as_deref(), Some(""));
    }

    #[test]
    fn test_resolve_relative_forms() {
        let base = Location::parse("https://blog.example/posts/notes/rust.html?x=1#old");

        let frag = base.resolve("#ownership");
        assert_eq!(frag.pathname, "/posts/notes/rust.html");
        assert_eq!(frag.search, "?x=1");
        assert_eq!(frag.hash, "#ownership");

        let sibling = base.resolve("go.html#intro");
        assert_eq!(sibling.pathname, "/posts/notes/go.html");
        assert_eq!(sibling.hash, "#intro");
        assert_eq!(sibling.origin, "https://blog.example");

        assert_eq!(base.resolve("../about.html").pathname, "/posts/about.html");
        assert_eq!(base.resolve("/index.html").pathname, "/index.html");
        assert_eq!(base.resolve("?q=2").pathname, "/posts/notes/rust.html");
        assert_eq!(base.resolve("https://other.example/a").origin, "https://other.example");
    }

    #[test]
    fn test_scheme_only_at_start() {
        let loc = Location::parse("/posts/a.html?highlight=http://x&matchNum=2");
        assert_eq!(loc.origin, "");
        assert_eq!(loc.pathname, "/posts/a.html");
        assert_eq!(loc.search, "?highlight=http://x&matchNum=2");
        assert_eq!(loc.query_param("highlight").as_deref(), Some("http://x"));

        let base = Location::parse("https://blog.example/posts/a.html");
        let next = base.resolve("b.html?next=https://x");
        assert_eq!(next.origin, "https://blog.example");
        assert_eq!(next.pathname, "/posts/b.html");
        assert_eq!(next.search, "?next=https://x");

        assert_eq!(Location::parse("git+ssh://host/repo").origin, "git+ssh://host");
        assert_eq!(Location::parse("1x://host/a").origin, "");
    }

    #[test]
    fn test_replace_state_clears_params() {
        let mut loc = Location::parse("https://blog.example/posts/a.html?highlight=cat&matchNum=5");
        let path = loc.pathname.clone();
        loc.replace_state(&path);
        assert_eq!(loc.href(), "https://blog.example/posts/a.html");
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("notes/hello world"), "notes/hello%20world");
        assert_eq!(encode_component("a&b c"), "a%26b%20c");
    }
}

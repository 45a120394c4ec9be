//! Source pattern matching module
//!
//! Compiles configured source patterns into matchable form and tests them
//! against normalized request paths. A source matches when either its
//! capture-segment expression or its glob form fits the canonical path.

use regex::Regex;

/// Successful match of a source pattern against a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMatch {
    /// Capture names in pattern order; unnamed wildcard groups get
    /// numeric names ("0", "1", ...)
    pub keys: Vec<String>,
    /// Captured substrings, present only when the compiled segment
    /// expression itself matched
    pub captures: Option<Vec<String>>,
}

impl SourceMatch {
    /// Look up a capture by key name
    pub fn capture(&self, key: &str) -> Option<&str> {
        let captures = self.captures.as_ref()?;
        self.keys
            .iter()
            .position(|k| k == key)
            .and_then(|i| captures.get(i))
            .map(String::as_str)
    }
}

/// Test a source pattern against a request path.
///
/// The request path is resolved to a slash-rooted canonical form and the
/// source is slash-normalized before comparison. With `allow_segments`,
/// the first `*` becomes a capturing group and `:name` segments become
/// named captures; captures surface only when that compiled expression
/// matches. Returns `None` when neither the segment expression nor the
/// glob form matches.
pub fn match_source(source: &str, request_path: &str, allow_segments: bool) -> Option<SourceMatch> {
    let slashed = slash_normalize(source);
    let resolved = resolve_request_path(request_path);

    let mut keys = Vec::new();
    let mut captures: Option<Vec<String>> = None;

    if allow_segments {
        let (expression, segment_keys) = compile_segments(&slashed.replacen('*', "(.*)", 1));
        if let Some(found) = expression.captures(&resolved) {
            keys = segment_keys;
            captures = Some(
                (1..found.len())
                    .map(|i| {
                        found
                            .get(i)
                            .map_or_else(String::new, |m| m.as_str().to_string())
                    })
                    .collect(),
            );
        }
        // A failed segment match surfaces no keys, even when the glob
        // test below still succeeds.
    }

    if captures.is_some() || glob_match(&slashed, &resolved) {
        return Some(SourceMatch { keys, captures });
    }

    None
}

/// Root a source pattern at `/`, collapsing `.` and `..` segments.
/// A leading `!` negation marker is preserved around the normalized
/// remainder; interpreting it is the caller's concern.
pub fn slash_normalize(value: &str) -> String {
    value.strip_prefix('!').map_or_else(
        || rooted_normalize(value, true),
        |negated| format!("!{}", rooted_normalize(negated, true)),
    )
}

/// Resolve a request path to its absolute, slash-rooted canonical form
pub fn resolve_request_path(path: &str) -> String {
    rooted_normalize(path, false)
}

fn rooted_normalize(value: &str, keep_trailing_slash: bool) -> String {
    let trailing = keep_trailing_slash && value.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in value.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // never resolve above the root
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if trailing && out.len() > 1 {
        out.push('/');
    }
    out
}

/// Compile a source pattern (with its first `*` already rewritten to a
/// `(.*)` group) into a path-parameter expression plus its capture keys.
fn compile_segments(pattern: &str) -> (Regex, Vec<String>) {
    let mut expr = String::from("^");
    let mut keys = Vec::new();
    let mut unnamed = 0usize;

    let mut chars = pattern.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if pattern[i..].starts_with("(.*)") {
            expr.push_str("(.*)");
            keys.push(unnamed.to_string());
            unnamed += 1;
            chars.next();
            chars.next();
            chars.next();
            // A `**` source leaves a second `*` right after the injected
            // group; the group already spans separators, so the repeat
            // marker folds into it instead of becoming a literal.
            if let Some(&(_, '*')) = chars.peek() {
                chars.next();
            }
            continue;
        }

        if c == ':' {
            let mut name = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                expr.push(':');
            } else {
                keys.push(name);
                expr.push_str("([^/]+?)");
            }
            continue;
        }

        let mut buf = [0u8; 4];
        expr.push_str(&regex::escape(c.encode_utf8(&mut buf)));
    }

    expr.push_str("/?$");
    // All free text is escaped and the only raw groups are the ones
    // emitted above, so compilation cannot fail.
    let expression = Regex::new(&expr).expect("segment expression is valid");
    (expression, keys)
}

/// Evaluate a pattern as a glob against a canonical path.
/// `*` matches within a segment, `**` matches across separators and a
/// leading `!` inverts the result.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    if let Some(negated) = pattern.strip_prefix('!') {
        return !glob_match(negated, path);
    }

    let expr = glob_to_regex(pattern);
    Regex::new(&expr).map_or(false, |re| re.is_match(path))
}

fn glob_to_regex(pattern: &str) -> String {
    let mut expr = String::from("^");

    for segment in pattern.split('/').skip(1) {
        if segment == "**" {
            // globstar: zero or more whole path segments
            expr.push_str("(?:/[^/]+)*");
            continue;
        }

        expr.push('/');
        for c in segment.chars() {
            match c {
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => {
                    let mut buf = [0u8; 4];
                    expr.push_str(&regex::escape(other.encode_utf8(&mut buf)));
                }
            }
        }
    }

    expr.push_str("/?$");
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_normalize() {
        assert_eq!(slash_normalize("foo/bar"), "/foo/bar");
        assert_eq!(slash_normalize("/foo/./bar"), "/foo/bar");
        assert_eq!(slash_normalize("foo/../bar"), "/bar");
        assert_eq!(slash_normalize("!admin/**"), "!/admin/**");
        assert_eq!(slash_normalize(""), "/");
    }

    #[test]
    fn test_resolve_request_path() {
        assert_eq!(resolve_request_path("/a/b/../c"), "/a/c");
        assert_eq!(resolve_request_path("a//b/"), "/a/b");
        assert_eq!(resolve_request_path("/../.."), "/");
    }

    #[test]
    fn test_glob_single_star_stays_in_segment() {
        assert!(match_source("/foo/*.js", "/foo/app.js", false).is_some());
        assert!(match_source("/foo/*.js", "/foo/sub/app.js", false).is_none());
    }

    #[test]
    fn test_glob_double_star_crosses_segments() {
        assert!(match_source("/assets/**", "/assets/css/site.css", false).is_some());
        assert!(match_source("/assets/**", "/assets", false).is_some());
        assert!(match_source("/assets/**", "/public/site.css", false).is_none());
    }

    #[test]
    fn test_source_gains_leading_slash() {
        assert!(match_source("foo/bar", "/foo/bar", false).is_some());
    }

    #[test]
    fn test_request_path_is_resolved_before_matching() {
        assert!(match_source("/foo/bar", "/foo/baz/../bar", false).is_some());
        assert!(match_source("/foo/bar", "/foo/./bar", false).is_some());
    }

    #[test]
    fn test_negated_pattern_inverts_glob() {
        assert!(match_source("!/admin/**", "/public/app.js", false).is_some());
        assert!(match_source("!/admin/**", "/admin/panel", false).is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(match_source("/exact", "/other", false).is_none());
    }

    #[test]
    fn test_single_star_captures_wildcard_slot() {
        let m = match_source("/old/*", "/old/docs/intro", true).expect("should match");
        assert_eq!(m.keys, vec!["0"]);
        assert_eq!(m.captures, Some(vec!["docs/intro".to_string()]));
        assert_eq!(m.capture("0"), Some("docs/intro"));
    }

    #[test]
    fn test_named_segments_capture() {
        let m = match_source("/api/:version/users/:id", "/api/v2/users/17", true)
            .expect("should match");
        assert_eq!(m.keys, vec!["version", "id"]);
        assert_eq!(m.capture("version"), Some("v2"));
        assert_eq!(m.capture("id"), Some("17"));
    }

    #[test]
    fn test_globstar_captures_the_whole_tail() {
        let m = match_source("/old/**", "/old/docs/intro", true).expect("should match");
        assert_eq!(m.keys, vec!["0"]);
        assert_eq!(m.capture("0"), Some("docs/intro"));

        let catch_all = match_source("**", "/any/path", true).expect("should match");
        assert_eq!(catch_all.capture("0"), Some("any/path"));
    }

    #[test]
    fn test_failed_segment_match_discards_keys() {
        // The negation marker is literal to the segment expression, so
        // only the glob form matches; no capture keys may leak through.
        let m = match_source("!/admin/*", "/public/app.js", true).expect("glob should match");
        assert!(m.keys.is_empty());
        assert!(m.captures.is_none());
    }

    #[test]
    fn test_segments_disabled_never_capture() {
        let m = match_source("/old/*", "/old/page", false).expect("glob should match");
        assert!(m.keys.is_empty());
        assert!(m.captures.is_none());
    }
}

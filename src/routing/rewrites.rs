//! Rewrite and redirect resolution module
//!
//! Rules are evaluated in configuration order and the first matching
//! source wins. Destinations may reference captured segments by key
//! (`:name`, or `:0` for an unnamed wildcard group).

use crate::config::RouteRule;
use crate::routing::matcher::{self, SourceMatch};

/// Find the rewritten target for a request path, if any rule matches
pub fn resolve_rewrite(rules: &[RouteRule], path: &str) -> Option<String> {
    first_match(rules, path).map(|(rule, found)| to_target(&rule.destination, &found))
}

/// Find the redirect target for a request path, if any rule matches
pub fn resolve_redirect(rules: &[RouteRule], path: &str) -> Option<String> {
    first_match(rules, path).map(|(rule, found)| to_target(&rule.destination, &found))
}

fn first_match<'a>(rules: &'a [RouteRule], path: &str) -> Option<(&'a RouteRule, SourceMatch)> {
    rules
        .iter()
        .find_map(|rule| matcher::match_source(&rule.source, path, true).map(|m| (rule, m)))
}

/// Interpolate `:key` placeholders in a destination with the captures of
/// a successful match; placeholders without a matching key stay literal.
fn to_target(destination: &str, found: &SourceMatch) -> String {
    let mut out = String::with_capacity(destination.len());
    let mut chars = destination.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != ':' {
            out.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        match found.capture(&name) {
            Some(value) => out.push_str(value),
            None => {
                out.push(':');
                out.push_str(&name);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(source: &str, destination: &str) -> RouteRule {
        RouteRule {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule("/docs/**", "/manual.html"),
            rule("/**", "/index.html"),
        ];
        assert_eq!(
            resolve_rewrite(&rules, "/docs/intro"),
            Some("/manual.html".to_string())
        );
        assert_eq!(
            resolve_rewrite(&rules, "/anything/else"),
            Some("/index.html".to_string())
        );
    }

    #[test]
    fn test_no_rule_matches() {
        let rules = vec![rule("/old/**", "/new.html")];
        assert_eq!(resolve_rewrite(&rules, "/current/page"), None);
    }

    #[test]
    fn test_named_segment_interpolation() {
        let rules = vec![rule("/archive/:year/:slug", "/posts/:year-:slug.html")];
        assert_eq!(
            resolve_redirect(&rules, "/archive/2019/launch"),
            Some("/posts/2019-launch.html".to_string())
        );
    }

    #[test]
    fn test_wildcard_capture_interpolation() {
        let rules = vec![rule("/old/*", "/new/:0")];
        assert_eq!(
            resolve_redirect(&rules, "/old/docs/intro"),
            Some("/new/docs/intro".to_string())
        );
    }

    #[test]
    fn test_globstar_capture_interpolation() {
        let rules = vec![rule("/old/**", "/new/:0")];
        assert_eq!(
            resolve_rewrite(&rules, "/old/docs/intro"),
            Some("/new/docs/intro".to_string())
        );
    }

    #[test]
    fn test_unknown_placeholder_stays_literal() {
        let rules = vec![rule("/a/:x", "/b/:x/:missing")];
        assert_eq!(
            resolve_rewrite(&rules, "/a/1"),
            Some("/b/1/:missing".to_string())
        );
    }
}

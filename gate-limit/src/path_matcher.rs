//! Exclusion pattern matching for request paths.
//!
//! A pattern is a `/` separated list of literal segments and `*` wildcards. The
//! rules are intentionally narrow:
//!
//! * `*` stands for exactly one path segment, never a subtree. `/a/*/*` only matches
//!   paths with exactly three segments.
//! * A pattern ending in `/*` matches the prefix followed by exactly one more segment.
//! * A pattern ending in `/` is compared against everything before the path's last
//!   `/`, so `/network/` matches `/network/routes` but not `/network/routes/123`.
//! * Otherwise, anything from the path's last `?` onwards is ignored.
//!
//! Patterns are tried in order and the first match wins.

/// Returns `true` if `path` matches any of `patterns`.
///
/// ```rust
/// use gate_limit::path_matcher::matches;
///
/// let patterns = ["/servers/*/status", "/network/"];
///
/// assert!(matches("/servers/1337/status?simple=true", &patterns));
/// assert!(matches("/network/routes", &patterns));
/// assert!(!matches("/network/routes/123", &patterns));
/// ```
pub fn matches<P: AsRef<str>>(path: &str, patterns: &[P]) -> bool {
    let path = path.as_bytes();

    for pattern in patterns {
        let pattern = pattern.as_ref().as_bytes();
        let Some(&last) = pattern.last() else {
            continue;
        };

        let (path_len, pattern_len) = if last == b'/' {
            match path.iter().rposition(|&b| b == b'/') {
                Some(boundary) => (boundary, pattern.len() - 1),
                None => continue,
            }
        } else {
            let query = path.iter().rposition(|&b| b == b'?');
            (query.unwrap_or(path.len()), pattern.len())
        };

        if path_len < pattern_len {
            continue;
        }

        if walk(&path[..path_len], &pattern[..pattern_len]) {
            return true;
        }
    }

    false
}

/// Compares a truncated path against a single pattern.
fn walk(path: &[u8], pattern: &[u8]) -> bool {
    let mut i = 0;
    let mut j = 0;

    while i < path.len() && j < pattern.len() {
        if path[i] != pattern[j] {
            if pattern[j] != b'*' {
                return false;
            }
            // Skip one segment. The separator that follows is consumed together
            // with the pattern character after the wildcard.
            while i < path.len() && path[i] != b'/' {
                i += 1;
            }
            if i == path.len() && j == pattern.len() - 1 {
                return true;
            }
            j += 1;
        } else if i == path.len() - 1 && j == pattern.len() - 1 {
            return true;
        }
        i += 1;
        j += 1;
    }

    false
}

//! URI decomposition and the escape-aware pair walkers.

/// Path and query of a request URI; the fragment is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriParts {
    pub path: String,
    pub query: String,
}

/// Splits `?` for the query and `#` for the fragment.
pub fn split_uri(uri: &str) -> UriParts {
    let no_fragment = match uri.split_once('#') {
        Some((before, _)) => before,
        None => uri,
    };
    match no_fragment.split_once('?') {
        Some((path, query)) => UriParts {
            path: path.to_string(),
            query: query.to_string(),
        },
        None => UriParts {
            path: no_fragment.to_string(),
            query: String::new(),
        },
    }
}

/// Percent-decodes one URI component; invalid escapes decode lossily.
pub fn unescape(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Splits a query on `&` into decoded `(key, value)` pairs. A bare key
/// with no `=` means an empty value; empty chunks are skipped.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| match chunk.split_once('=') {
            Some((k, v)) => (unescape(k), unescape(v)),
            None => (unescape(chunk), String::new()),
        })
        .collect()
}

//! Canonical request construction and hashing for JWT request signing.
//!
//! Atlassian Connect tokens bind each token to one request through the `qsh`
//! claim: a SHA-256 hash of a canonical encoding of the request's method,
//! path, and query string. The encoding must be byte-for-byte identical to
//! what the server computes, so every normalization step here is load-bearing.
//!
//! Jira docs: https://developer.atlassian.com/cloud/jira/platform/understanding-jwt

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

/// The query parameter carrying the token itself, excluded from the hash.
const TOKEN_PARAM: &str = "jwt";

/// Build the canonical string for a request.
///
/// The result is `METHOD&path&sorted-query`:
/// - the method uppercased;
/// - the path trimmed of leading/trailing slashes and re-prefixed with a
///   single `/`, with literal `&` encoded as `%26`;
/// - each query parameter except `jwt` percent-encoded as `key=value`
///   (values of a repeated key concatenated, spaces as `%20`), the pairs
///   sorted lexicographically and joined with `&`.
///
/// A request with no query parameters still ends with a trailing `&`.
pub fn canonicalize_request(method: &Method, url: &Url) -> String {
    // The canonical path is the decoded path; only the literal ampersand
    // gets re-encoded, so that it cannot collide with the field separator.
    let decoded_path = percent_decode_str(url.path()).decode_utf8_lossy();
    let path = format!("/{}", decoded_path.trim_matches('/').replace('&', "%26"));

    // Concatenate the values of repeated keys in their original order;
    // the final sort is over the encoded key=value pairs.
    let mut merged: HashMap<String, String> = HashMap::new();
    for (key, value) in url.query_pairs() {
        if key == TOKEN_PARAM {
            continue;
        }
        merged.entry(key.into_owned()).or_default().push_str(&value);
    }

    let mut canonical_query: Vec<String> = merged
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    canonical_query.sort();

    format!(
        "{}&{}&{}",
        method.as_str().to_uppercase(),
        path,
        canonical_query.join("&")
    )
}

/// Compute the `qsh` claim: the hex-encoded SHA-256 of the canonical string.
pub fn query_string_hash(method: &Method, url: &Url) -> String {
    let canonical = canonicalize_request(method, url);
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

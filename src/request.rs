//! Request cloning and caller-supplied request options.

use reqwest::header::HeaderMap;
use reqwest::Request;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// A caller-supplied mutation applied to a request after it is built.
///
/// Options run in order; the first one that fails short-circuits request
/// construction.
pub type RequestOption = Box<dyn Fn(&mut Request) -> Result<()> + Send + Sync>;

/// Produce an independent copy of a request.
///
/// All fields are copied shallowly and the header map is rebuilt entry by
/// entry, so mutating the clone's headers never affects the original and vice
/// versa. Every transport in a chain clones before mutating, keeping the
/// caller's request intact for inspection or retry.
///
/// # Errors
///
/// Returns [`Error::RequestClone`] if the body is a stream rather than a
/// buffer. Requests built by [`Client`](crate::Client) always carry buffered
/// bodies.
pub fn clone_request(request: &Request) -> Result<Request> {
    let mut clone = Request::new(request.method().clone(), request.url().clone());
    *clone.version_mut() = request.version();
    *clone.timeout_mut() = request.timeout().copied();

    if let Some(body) = request.body() {
        let bytes = body
            .as_bytes()
            .ok_or_else(|| Error::RequestClone("request body is a stream".to_string()))?;
        *clone.body_mut() = Some(bytes.to_vec().into());
    }

    let mut headers = HeaderMap::with_capacity(request.headers().len());
    for (name, value) in request.headers() {
        headers.append(name.clone(), value.clone());
    }
    *clone.headers_mut() = headers;

    Ok(clone)
}

/// Append the fields of a serializable struct as query parameters on a URL.
///
/// Top-level fields become `key=value` pairs; `None` fields are skipped.
/// Non-string scalars are rendered with their JSON representation.
pub fn add_options<T: Serialize>(url: &mut Url, options: &T) -> Result<()> {
    let value = serde_json::to_value(options).map_err(Error::Encoding)?;
    if let serde_json::Value::Object(map) = value {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    pairs.append_pair(key, s);
                }
                other => {
                    pairs.append_pair(key, &other.to_string());
                }
            }
        }
    }
    Ok(())
}

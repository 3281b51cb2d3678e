//! Forwarded Header Filtering
//!
//! Strips headers that describe the inbound hop before a request is
//! replayed against an instance.

use http::header::{
    HeaderMap, HeaderName, ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};

static HOP_BY_HOP_NAMES: &[HeaderName] = &[
    CONNECTION,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

/// Copy of `headers` safe to send upstream.
///
/// Removes the standard hop-by-hop headers, anything named in the
/// `Connection` header, `keep-alive`, and the headers the HTTP client
/// recomputes for the new target (`Host`, `Content-Length`).
///
/// `Accept-Encoding` is dropped as well: relayed bodies are handed back
/// as text without their `Content-Encoding`, so the instance must answer
/// uncompressed.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();

    let mut extra_drops = Vec::new();
    if let Some(connection) = headers.get(CONNECTION).and_then(|v| v.to_str().ok()) {
        for token in connection.split(',').map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
                extra_drops.push(name);
            }
        }
    }

    for name in HOP_BY_HOP_NAMES {
        forwarded.remove(name);
    }
    for name in extra_drops {
        forwarded.remove(&name);
    }
    forwarded.remove(HeaderName::from_static("keep-alive"));
    forwarded.remove(HOST);
    forwarded.remove(CONTENT_LENGTH);
    forwarded.remove(ACCEPT_ENCODING);

    forwarded
}

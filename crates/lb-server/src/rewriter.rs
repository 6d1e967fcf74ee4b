// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Instrumentation injection for proxied HTML pages

use axum::body::Bytes;
use axum::http::{
    header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING},
    HeaderMap, HeaderValue, Response,
};
use flate2::read::GzDecoder;
use std::io::Read;

/// Bodies shorter than this cannot hold a document worth instrumenting
const MIN_HTML_LEN: usize = 10;

/// Marks the start of the injected block
pub const INJECTION_MARKER: &str = "<!-- livebridge: instrumentation -->";

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The body claimed to be gzip but did not decode. `original` is the
    /// response exactly as it was received.
    #[error("Failed to decompress response body: {source}")]
    Decompress {
        source: std::io::Error,
        original: Box<Response<Bytes>>,
    },
}

pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"))
}

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"))
}

/// Tags injected into every HTML page, rooted at `base`
pub fn injection(base: &str) -> String {
    format!(
        "\n{INJECTION_MARKER}\n\
         <script src=\"{base}/tailwind.min.js\"></script>\n\
         <link rel=\"stylesheet\" href=\"{base}/inject.css\">\n\
         <script src=\"{base}/inject-utils.js\"></script>\n\
         <script defer src=\"{base}/inject.js\"></script>\n\
         <script defer src=\"{base}/alpine.min.js\"></script>\n"
    )
}

/// Inject the instrumentation into an HTML response.
///
/// Responses that are not `text/html` are returned untouched. HTML bodies are
/// gunzipped when needed, spliced once (before `</body>`, else before
/// `</html>`, else at the end) and returned with an exact `Content-Length`
/// and without `Content-Encoding` or `Transfer-Encoding`.
pub fn rewrite(response: Response<Bytes>, base: &str) -> Result<Response<Bytes>, RewriteError> {
    if !is_html(response.headers()) {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let decoded = if is_gzip(&parts.headers) {
        match gunzip(&body) {
            Ok(decoded) => decoded,
            Err(source) => {
                return Err(RewriteError::Decompress {
                    source,
                    original: Box::new(Response::from_parts(parts, body)),
                })
            }
        }
    } else {
        body.to_vec()
    };

    parts.headers.remove(CONTENT_ENCODING);
    parts.headers.remove(TRANSFER_ENCODING);

    let rewritten = if decoded.len() < MIN_HTML_LEN {
        decoded
    } else {
        splice(decoded, injection(base).as_bytes())
    };

    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
    Ok(Response::from_parts(parts, Bytes::from(rewritten)))
}

fn gunzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::with_capacity(body.len() * 4);
    GzDecoder::new(body).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Insert `payload` at the first `</body>`, else the first `</html>`, else
/// at the end.
fn splice(mut body: Vec<u8>, payload: &[u8]) -> Vec<u8> {
    let at = find(&body, b"</body>")
        .or_else(|| find(&body, b"</html>"))
        .unwrap_or(body.len());
    body.splice(at..at, payload.iter().copied());
    body
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const BASE: &str = "/__livebridge";

    fn html(body: impl Into<Bytes>) -> Response<Bytes> {
        Response::builder()
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(body.into())
            .unwrap()
    }

    fn gzip(body: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn text(response: &Response<Bytes>) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    fn content_length(response: &Response<Bytes>) -> usize {
        response.headers()[CONTENT_LENGTH].to_str().unwrap().parse().unwrap()
    }

    #[test]
    fn injects_before_closing_body() {
        let out = rewrite(html("<html><body><p>hi</p></body></html>"), BASE).unwrap();
        let body = text(&out);

        let marker = body.find(INJECTION_MARKER).unwrap();
        assert!(marker < body.find("</body>").unwrap());
        assert!(body.starts_with("<html><body><p>hi</p>"));
        assert_eq!(content_length(&out), out.body().len());
    }

    #[test]
    fn payload_order_is_fixed() {
        let out = rewrite(html("<html><body></body></html>"), BASE).unwrap();
        let body = text(&out);
        let positions: Vec<usize> = [
            "tailwind.min.js",
            "inject.css",
            "inject-utils.js",
            "defer src=\"/__livebridge/inject.js\"",
            "alpine.min.js",
        ]
        .iter()
        .map(|needle| body.find(needle).unwrap())
        .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn only_first_closing_tag_is_used() {
        let out = rewrite(
            html("<body><pre>&lt;/body&gt;</pre></body><!-- </body> -->"),
            BASE,
        )
        .unwrap();
        let body = text(&out);
        assert_eq!(body.matches(INJECTION_MARKER).count(), 1);
        assert!(body.ends_with("</body><!-- </body> -->"));
    }

    #[test]
    fn falls_back_to_closing_html_then_end() {
        let out = rewrite(html("<html><div>no body tag</div></html>"), BASE).unwrap();
        assert!(text(&out).ends_with("</script>\n</html>"));

        let out = rewrite(html("<div>fragment only</div>"), BASE).unwrap();
        let body = text(&out);
        assert!(body.starts_with("<div>fragment only</div>"));
        assert!(body.ends_with(&injection(BASE)));
        assert_eq!(content_length(&out), body.len());
    }

    #[test]
    fn gzip_bodies_are_decoded_and_headers_stripped() {
        let mut response = html(gzip("<html><body>zipped</body></html>"));
        response.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        response.headers_mut().insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let out = rewrite(response, BASE).unwrap();
        assert!(out.headers().get(CONTENT_ENCODING).is_none());
        assert!(out.headers().get(TRANSFER_ENCODING).is_none());
        assert!(text(&out).contains("zipped"));
        assert!(text(&out).contains(INJECTION_MARKER));
        assert_eq!(content_length(&out), out.body().len());
    }

    #[test]
    fn tiny_bodies_pass_through_with_headers_stripped() {
        let mut response = html(gzip("<p>x</p>"));
        response.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let out = rewrite(response, BASE).unwrap();
        assert_eq!(text(&out), "<p>x</p>");
        assert!(out.headers().get(CONTENT_ENCODING).is_none());
        assert_eq!(content_length(&out), 8);
    }

    #[test]
    fn non_html_is_untouched() {
        let response = Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip")
            .header(CONTENT_LENGTH, "4")
            .body(Bytes::from_static(b"\x1f\x8b??"))
            .unwrap();
        let out = rewrite(response, BASE).unwrap();
        assert_eq!(out.body().as_ref(), b"\x1f\x8b??");
        assert_eq!(out.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(out.headers()[CONTENT_LENGTH], "4");
    }

    #[test]
    fn corrupt_gzip_returns_original_response() {
        let mut response = html(Bytes::from_static(b"definitely not gzip data"));
        response.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let Err(RewriteError::Decompress { original, .. }) = rewrite(response, BASE) else {
            panic!("expected decompression failure");
        };
        assert_eq!(original.body().as_ref(), b"definitely not gzip data");
        assert_eq!(original.headers()[CONTENT_ENCODING], "gzip");
    }

    #[test]
    fn custom_base_is_used() {
        let out = rewrite(html("<body></body>"), "/bridge").unwrap();
        assert!(text(&out).contains("<script src=\"/bridge/inject-utils.js\"></script>"));
    }
}

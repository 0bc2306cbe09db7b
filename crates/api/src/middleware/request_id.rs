//! Client-supplied request id screening.
//!
//! The request id ends up in `audit_logs.request_id`, log spans and error
//! bodies. A client value is kept only when it fits that column and is
//! printable ASCII; anything else is dropped here so `SetRequestIdLayer`
//! assigns a fresh UUID.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

use crate::REQUEST_ID_HEADER;

/// Longest client request id that is kept (the audit column width).
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Whether a client request id can be used as is.
#[must_use]
pub fn is_usable_request_id(value: &HeaderValue) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty() && bytes.len() <= MAX_REQUEST_ID_LEN && bytes.iter().all(u8::is_ascii_graphic)
}

/// Removes an unusable `x-request-id` before one is assigned.
pub async fn screen_request_id(mut request: Request, next: Next) -> Response {
    let rejected = request
        .headers()
        .get_all(REQUEST_ID_HEADER)
        .iter()
        .any(|value| !is_usable_request_id(value));

    if rejected {
        tracing::debug!("discarding unusable client request id");
        request.headers_mut().remove(REQUEST_ID_HEADER);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("req-from-client", true)]
    #[case("0199f6c2-8a4e-7c1b-9d3e-2f5a6b7c8d9e", true)]
    #[case("has space", false)]
    #[case("", false)]
    fn test_request_id_screening(#[case] raw: &str, #[case] usable: bool) {
        let value = HeaderValue::from_str(raw).unwrap();
        assert_eq!(is_usable_request_id(&value), usable);
    }

    #[test]
    fn test_request_id_length_limit() {
        let at_limit = HeaderValue::from_str(&"a".repeat(MAX_REQUEST_ID_LEN)).unwrap();
        let over = HeaderValue::from_str(&"a".repeat(MAX_REQUEST_ID_LEN + 1)).unwrap();

        assert!(is_usable_request_id(&at_limit));
        assert!(!is_usable_request_id(&over));
    }
}

//! Zhipu AI's JWT authentication scheme, recovered from
//! `original_source/core/llm.py::generate_zhipu_jwt`.
//!
//! Header `{"alg":"HS256","sign_type":"SIGN"}` and payload
//! `{"api_key": id, "exp": now+3600, "timestamp": now}`, both
//! base64url-no-pad, HMAC-SHA256 signed with the secret half of the
//! composite `id.secret` API key, signature also base64url-no-pad,
//! joined with `.`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    sign_type: &'a str,
}

#[derive(Serialize)]
struct Payload<'a> {
    api_key: &'a str,
    exp: i64,
    timestamp: i64,
}

/// `now` is the current Unix timestamp in seconds, passed in so the
/// function stays pure and testable without mocking the clock.
pub fn generate_jwt(api_id: &str, api_secret: &str, now: i64, exp_seconds: i64) -> String {
    let header = Header {
        alg: "HS256",
        sign_type: "SIGN",
    };
    let payload = Payload {
        api_key: api_id,
        exp: now + exp_seconds,
        timestamp: now,
    };

    let header_encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let payload_encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

    let signing_input = format!("{header_encoded}.{payload_encoded}");
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(signing_input.as_bytes());
    let signature_encoded = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{signing_input}.{signature_encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_three_dot_separated_segments() {
        let token = generate_jwt("id123", "secret456", 1_700_000_000, 3600);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn is_deterministic_for_the_same_inputs() {
        let a = generate_jwt("id123", "secret456", 1_700_000_000, 3600);
        let b = generate_jwt("id123", "secret456", 1_700_000_000, 3600);
        assert_eq!(a, b);
    }

    #[test]
    fn differs_when_the_secret_differs() {
        let a = generate_jwt("id123", "secret456", 1_700_000_000, 3600);
        let b = generate_jwt("id123", "other-secret", 1_700_000_000, 3600);
        assert_ne!(a, b);
    }

    #[test]
    fn segments_are_unpadded_base64url() {
        let token = generate_jwt("id123", "secret456", 1_700_000_000, 3600);
        for segment in token.split('.') {
            assert!(!segment.contains('='));
            assert!(!segment.contains('+'));
            assert!(!segment.contains('/'));
        }
    }
}

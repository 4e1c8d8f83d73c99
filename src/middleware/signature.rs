use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ed25519_dalek::{Signature, VerifyingKey};
use tracing::warn;

use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Interaction payloads are small; anything bigger is not from the platform.
const MAX_INTERACTION_BYTES: usize = 256 * 1024;

fn parse_key(hex_key: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(hex_key.trim()).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

fn parse_signature(headers: &HeaderMap) -> Option<(Signature, String)> {
    let signature = headers.get(SIGNATURE_HEADER)?.to_str().ok()?;
    let timestamp = headers.get(TIMESTAMP_HEADER)?.to_str().ok()?;
    let bytes: [u8; 64] = hex::decode(signature).ok()?.try_into().ok()?;
    Some((Signature::from_bytes(&bytes), timestamp.to_string()))
}

/// True iff `signature` signs `timestamp || body` under `hex_key`.
pub fn is_signed(hex_key: &str, headers: &HeaderMap, body: &[u8]) -> bool {
    let Some(key) = parse_key(hex_key) else {
        warn!("APPLICATION_PUBLIC_KEY is missing or malformed; refusing interaction");
        return false;
    };
    let Some((signature, timestamp)) = parse_signature(headers) else {
        return false;
    };
    let mut message = timestamp.into_bytes();
    message.extend_from_slice(body);
    key.verify_strict(&message, &signature).is_ok()
}

fn unauthorized() -> Response {
    let body = serde_json::json!({ "error": "invalid request signature" });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Rejects interaction requests that the platform did not sign, before the body is parsed.
pub async fn verify_interaction(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_INTERACTION_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    if !is_signed(
        &state.config.discord.application_public_key,
        &parts.headers,
        &bytes,
    ) {
        warn!("Interaction with missing or invalid signature refused");
        return Ok(unauthorized());
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use ed25519_dalek::{Signer, SigningKey};

    fn signed_headers(key: &SigningKey, timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        let signature = key.sign(&message);
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&hex::encode(signature.to_bytes())).unwrap(),
        );
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers
    }

    #[test]
    fn accepts_only_the_signed_body() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let public = hex::encode(key.verifying_key().to_bytes());
        let body = br#"{"type":1}"#;
        let headers = signed_headers(&key, "1700000000", body);

        assert!(is_signed(&public, &headers, body));
        assert!(!is_signed(&public, &headers, br#"{"type":3}"#));
        assert!(!is_signed(&public, &HeaderMap::new(), body));
    }

    #[test]
    fn wrong_or_missing_key_refuses() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let other = SigningKey::from_bytes(&[8u8; 32]);
        let body = b"{}";
        let headers = signed_headers(&key, "1", body);

        assert!(!is_signed(&hex::encode(other.verifying_key().to_bytes()), &headers, body));
        assert!(!is_signed("", &headers, body));
        assert!(!is_signed("not-hex", &headers, body));
    }
}

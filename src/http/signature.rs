//! HMAC-SHA256 signing for internal calls and player session tickets
//!
//! Internal requests carry `X-Combat-Signature: t=<unix secs>,v1=<hex>` where
//! the MAC covers `"<t>.<raw body>"`. Session tickets are the hex MAC of
//! `"<match_id>:<player_id>"` and are issued by the strategy layer.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-combat-signature";

/// Oldest accepted signature timestamp, in seconds
pub const MAX_SIGNATURE_AGE_SECS: i64 = 300;

/// Signature verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing signature")]
    Missing,

    #[error("Malformed signature header")]
    Malformed,

    #[error("Signature mismatch")]
    Mismatch,

    #[error("Signature timestamp outside the accepted window")]
    Expired,
}

fn mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key of any size is valid"),
    }
}

/// Hex MAC over `"<timestamp>.<payload>"`
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = mac(secret);
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Full header value for a payload signed at `timestamp`
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={},v1={}", timestamp, sign_payload(secret, timestamp, payload))
}

/// Verify a signature header against the raw payload
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                _ => {}
            }
        }
    }

    let timestamp: i64 = timestamp
        .ok_or(SignatureError::Malformed)?
        .parse()
        .map_err(|_| SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    if (now_secs - timestamp).abs() > MAX_SIGNATURE_AGE_SECS {
        return Err(SignatureError::Expired);
    }

    let valid = signatures.iter().any(|sig| {
        let Ok(provided) = hex::decode(sig) else {
            return false;
        };
        let mut mac = mac(secret);
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&provided).is_ok()
    });

    if valid {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Ticket a player presents when opening a combat socket
pub fn session_ticket(secret: &str, match_id: &str, player_id: &str) -> String {
    let mut mac = mac(secret);
    mac.update(format!("{}:{}", match_id, player_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_ticket(
    secret: &str,
    match_id: &str,
    player_id: &str,
    ticket: &str,
) -> Result<(), SignatureError> {
    if ticket.is_empty() {
        return Err(SignatureError::Missing);
    }
    let provided = hex::decode(ticket).map_err(|_| SignatureError::Malformed)?;
    let mut mac = mac(secret);
    mac.update(format!("{}:{}", match_id, player_id).as_bytes());
    mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
}

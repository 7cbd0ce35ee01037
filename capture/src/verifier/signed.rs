use crate::error::PayloadError;
use crate::traits::verifier::PayloadVerifier;
use crate::types::QrPayload;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks `signature` as hex HMAC-SHA256 over `"{stationId}|{expiredAt}"`,
/// where `expiredAt` is the raw value from the code (strings unquoted).
pub struct HmacSha256Verifier {
    secret: Vec<u8>,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, station_id: &str, expired_at: &str) -> Result<HmacSha256, PayloadError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| PayloadError::SignatureRejected(format!("bad key: {e}")))?;
        mac.update(station_id.as_bytes());
        mac.update(b"|");
        mac.update(expired_at.as_bytes());
        Ok(mac)
    }

    /// Produces the signature a station would print for these values.
    pub fn sign(&self, station_id: &str, expired_at: &str) -> Result<String, PayloadError> {
        Ok(hex::encode(
            self.mac(station_id, expired_at)?.finalize().into_bytes(),
        ))
    }
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl PayloadVerifier for HmacSha256Verifier {
    fn verify(&self, payload: &QrPayload) -> Result<(), PayloadError> {
        let expected = hex::decode(payload.signature())
            .map_err(|_| PayloadError::SignatureRejected("signature is not hex".into()))?;
        self.mac(payload.station_id(), &raw_text(payload.raw_expired_at()))?
            .verify_slice(&expected)
            .map_err(|_| PayloadError::SignatureRejected("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_at;
    use chrono::{TimeZone, Utc};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
    }

    #[test]
    fn accepts_matching_signature() {
        let verifier = HmacSha256Verifier::new("station-secret");
        let sig = verifier.sign("STA-1", "2025-09-08T10:00:30Z").unwrap();
        let text = format!(
            r#"{{"stationId":"STA-1","expiredAt":"2025-09-08T10:00:30Z","signature":"{sig}"}}"#
        );
        let payload = validate_at(&text, now()).unwrap();
        assert!(verifier.verify(&payload).is_ok());
    }

    #[test]
    fn rejects_tampered_station() {
        let verifier = HmacSha256Verifier::new("station-secret");
        let sig = verifier.sign("STA-1", "2025-09-08T10:00:30Z").unwrap();
        let text = format!(
            r#"{{"stationId":"STA-2","expiredAt":"2025-09-08T10:00:30Z","signature":"{sig}"}}"#
        );
        let payload = validate_at(&text, now()).unwrap();
        assert_eq!(
            verifier.verify(&payload),
            Err(PayloadError::SignatureRejected("signature mismatch".into()))
        );
    }

    #[test]
    fn rejects_non_hex_signature() {
        let verifier = HmacSha256Verifier::new("station-secret");
        let text = r#"{"stationId":"STA-1","expiredAt":"2025-09-08T10:00:30Z","signature":"abc"}"#;
        let payload = validate_at(text, now()).unwrap();
        assert!(matches!(
            verifier.verify(&payload),
            Err(PayloadError::SignatureRejected(_))
        ));
    }
}

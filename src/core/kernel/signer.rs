use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on keyed and signed requests.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Result type for signing operations: (headers, signed payload)
pub type SignatureResult = Result<(HashMap<String, String>, String), ExchangeError>;

/// Signer trait for request authentication
///
/// The signed payload returned by [`Signer::sign_request`] is final: it is
/// sent as-is, never re-parsed or re-encoded.
pub trait Signer: Send + Sync {
    /// Headers identifying the caller, without a signature.
    fn api_key_headers(&self) -> HashMap<String, String>;

    /// Sign a serialized parameter string.
    ///
    /// # Arguments
    /// * `payload` - The url-encoded parameters exactly as they will be sent
    /// * `timestamp` - Request timestamp in milliseconds
    ///
    /// # Returns
    /// Headers to attach and the payload with `timestamp` and `signature` appended
    fn sign_request(&self, payload: &str, timestamp: u64) -> SignatureResult;
}

/// HMAC-SHA256 signer producing lowercase hex signatures.
pub struct HmacSigner {
    api_key: String,
    secret_key: Secret<String>,
    recv_window: Option<u64>,
}

impl HmacSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: Secret::new(secret_key),
            recv_window: None,
        }
    }

    /// Append `recvWindow` to every signed payload.
    #[must_use]
    pub const fn with_recv_window(mut self, recv_window_ms: Option<u64>) -> Self {
        self.recv_window = recv_window_ms;
        self
    }

    /// Sign a message and return the hex-encoded signature.
    pub fn sign(&self, message: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Configuration(format!("Invalid secret key: {}", e)))?;

        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl Signer for HmacSigner {
    fn api_key_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(API_KEY_HEADER.to_string(), self.api_key.clone());
        headers
    }

    fn sign_request(&self, payload: &str, timestamp: u64) -> SignatureResult {
        let mut signed = String::with_capacity(payload.len() + 96);
        signed.push_str(payload);

        if let Some(recv_window) = self.recv_window {
            if !signed.is_empty() {
                signed.push('&');
            }
            signed.push_str(&format!("recvWindow={}", recv_window));
        }

        if !signed.is_empty() {
            signed.push('&');
        }
        signed.push_str(&format!("timestamp={}", timestamp));

        let signature = self.sign(&signed)?;
        signed.push_str("&signature=");
        signed.push_str(&signature);

        Ok((self.api_key_headers(), signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_known_vector() {
        // https://binance-docs.github.io/apidocs/spot/en/#signed-trade-and-user_data-endpoint-security
        let signer = HmacSigner::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".into(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into(),
        );

        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            signer.sign(query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn signed_payload_matches_known_vector() {
        let signer = HmacSigner::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".into(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into(),
        )
        .with_recv_window(Some(5000));

        let (headers, payload) = signer
            .sign_request(
                "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1",
                1_499_827_319_559,
            )
            .unwrap();

        assert_eq!(
            payload,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559&signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
        assert_eq!(
            headers.get(API_KEY_HEADER).map(String::as_str),
            Some("vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A")
        );
    }

    #[test]
    fn signature_is_deterministic() {
        let signer = HmacSigner::new("key".into(), "secret".into());
        let (_, first) = signer.sign_request("symbol=BTCUSDT&reduceOnly=true", 1000).unwrap();
        let (_, second) = signer.sign_request("symbol=BTCUSDT&reduceOnly=true", 1000).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("symbol=BTCUSDT&reduceOnly=true&timestamp=1000&signature="));
    }

    #[test]
    fn empty_payload_starts_with_timestamp() {
        let signer = HmacSigner::new("key".into(), "secret".into());
        let (_, payload) = signer.sign_request("", 42).unwrap();
        assert!(payload.starts_with("timestamp=42&signature="));
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = HmacSigner::new("my_api_key".into(), "super_secret_key".into());
        let debug_str = format!("{:?}", signer);
        assert!(debug_str.contains("my_api_key"));
        assert!(!debug_str.contains("super_secret_key"));
    }
}

use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// True if `signature` is the raw HMAC-SHA256 of `data` under `secret`. The comparison runs in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &[u8]) -> bool {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(data);
            mac.verify_slice(signature).is_ok()
        },
        Err(e) => {
            warn!("🔐️ Could not initialise HMAC. {e}");
            false
        },
    }
}

//! # cm-auth-simple
//!
//! HMAC-SHA256 implementation of `AuthProvider`. Session tokens are
//! `"{user_id}.{tag}"` where the tag authenticates the id under a
//! server-side secret; there is nothing to store and nothing to expire
//! server-side. Rotating the secret invalidates every outstanding token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use cm_core::AuthProvider;

type HmacSha256 = Hmac<Sha256>;

pub struct SimpleAuthProvider {
    secret: Vec<u8>,
}

impl SimpleAuthProvider {
    /// Accepts the signing secret (e.g., from configuration).
    pub fn new(secret: &str) -> Self {
        Self { secret: secret.as_bytes().to_vec() }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.secret).expect("hmac key")
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn issue_token(&self, user_id: Uuid) -> String {
        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{user_id}.{tag}")
    }

    fn resolve_token(&self, token: &str) -> Option<Uuid> {
        let (id_part, tag_part) = token.split_once('.')?;
        let user_id = Uuid::parse_str(id_part).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(tag_part).ok()?;

        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        // Constant-time comparison lives in the hmac crate.
        mac.verify_slice(&tag).ok()?;
        Some(user_id)
    }
}

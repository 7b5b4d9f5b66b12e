use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::auth::{claims::Claims, Identity};

/// Client-held credential. The signature is the server's business; the
/// client only reads the claims to know whether the token is still usable.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    pub fn logged_in(&self) -> bool {
        self.claims().is_some()
    }

    /// The stored token, if it has not expired.
    pub fn token(&self) -> Option<&str> {
        self.claims()?;
        self.token.as_deref()
    }

    pub fn profile(&self) -> Option<Identity> {
        self.claims().map(|c| c.data)
    }

    fn claims(&self) -> Option<Claims> {
        let token = self.token.as_deref()?;
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_aud = false;
        // the server allows no clock skew either
        validation.leeway = 0;
        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{
    auth::claims::{Claims, Identity, Viewer},
    config::JwtConfig,
    state::AppState,
};

/// Source of "now" for issuing and expiring tokens.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to a single instant.
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Signs and verifies bearer tokens. Built once from configuration and shared.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenService {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            clock,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(cfg, Arc::new(SystemClock))
    }

    pub fn issue(&self, identity: &Identity) -> anyhow::Result<String> {
        let now = self.clock.now();
        let exp = now + self.ttl;
        let claims = Claims {
            data: identity.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %identity.id, "jwt signed");
        Ok(token)
    }

    /// Checks signature, issuer, audience and expiry of a bare token.
    pub fn decode(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        // expiry is checked against the injected clock below
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        let now = self.clock.now().unix_timestamp();
        if (data.claims.exp as i64) <= now {
            anyhow::bail!("token expired");
        }
        debug!(user_id = %data.claims.data.id, "jwt verified");
        Ok(data.claims)
    }

    /// Resolves an `Authorization` header value (or bare token) to a viewer.
    /// Every failure degrades to `Viewer::Anonymous`.
    pub fn verify(&self, raw: &str) -> Viewer {
        let token = strip_scheme(raw);
        if token.is_empty() {
            return Viewer::Anonymous;
        }
        match self.decode(token) {
            Ok(claims) => Viewer::Authenticated(claims.data),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Viewer::Anonymous
            }
        }
    }
}

fn strip_scheme(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => raw,
    }
}

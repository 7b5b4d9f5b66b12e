use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user claims carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
    #[serde(rename = "_id")]
    pub id: Uuid,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub data: Identity,
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Authentication state of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated(Identity),
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(identity) => Some(identity),
        }
    }
}

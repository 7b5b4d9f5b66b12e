//! In-process server for tests: memory store, pinned clock, schema executed
//! directly with the viewer the request context builder would produce.

use std::sync::Arc;

use async_graphql::{Request, Variables};
use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    auth::{FixedClock, Identity, TokenService, Viewer},
    client::{BookApi, ClientError},
    config::JwtConfig,
    graphql::{build_schema, BookSchema},
    users::{MemoryUserStore, UserStore},
};

pub(crate) fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 120,
    }
}

pub(crate) struct Harness {
    pub now: OffsetDateTime,
    pub store: Arc<MemoryUserStore>,
    pub tokens: TokenService,
    pub schema: BookSchema,
}

impl Harness {
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        let store = Arc::new(MemoryUserStore::new());
        let tokens = TokenService::new(&jwt_config(), Arc::new(FixedClock(now)));
        let schema = build_schema(store.clone() as Arc<dyn UserStore>, tokens.clone());
        Self {
            now,
            store,
            tokens,
            schema,
        }
    }

    /// Token service with the same keys whose clock reads `at`.
    pub fn tokens_at(&self, at: OffsetDateTime) -> TokenService {
        TokenService::new(&jwt_config(), Arc::new(FixedClock(at)))
    }

    pub fn identity_of(&self, token: &str) -> Identity {
        match self.tokens.verify(token) {
            Viewer::Authenticated(identity) => identity,
            Viewer::Anonymous => panic!("token does not verify"),
        }
    }

    /// Runs one operation and returns the serialized GraphQL response.
    pub async fn exec(&self, token: Option<&str>, query: &str, variables: Value) -> Value {
        let viewer = match token {
            Some(token) => self.tokens.verify(&format!("Bearer {token}")),
            None => Viewer::Anonymous,
        };
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(viewer);
        let response = self.schema.execute(request).await;
        serde_json::to_value(&response).expect("serialize response")
    }
}

#[async_trait]
impl BookApi for Harness {
    async fn execute(
        &self,
        token: Option<&str>,
        query: &str,
        variables: Value,
    ) -> Result<Value, ClientError> {
        Ok(self.exec(token, query, variables).await)
    }
}

pub(crate) fn error_code(resp: &Value) -> Option<&str> {
    resp["errors"][0]["extensions"]["code"].as_str()
}

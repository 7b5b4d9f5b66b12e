use std::sync::Arc;

use async_graphql::{http::GraphiQLSource, EmptySubscription, Schema};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{RequestViewer, TokenService},
    state::AppState,
    users::UserStore,
};

pub mod error;
pub mod resolvers;
pub mod types;

pub use error::ApiError;
pub use resolvers::{MutationRoot, QueryRoot};

pub type BookSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub const GRAPHQL_PATH: &str = "/graphql";

pub fn build_schema(store: Arc<dyn UserStore>, tokens: TokenService) -> BookSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(tokens)
        .finish()
}

pub fn graphql_routes() -> Router<AppState> {
    Router::new().route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
}

/// Every call is authenticated on its own from the `Authorization` header.
#[instrument(skip_all)]
pub async fn graphql_handler(
    State(state): State<AppState>,
    RequestViewer(viewer): RequestViewer,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(state.schema.execute(request.data(viewer)).await)
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

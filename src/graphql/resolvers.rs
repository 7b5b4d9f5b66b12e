use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Object};
use tracing::{info, warn};

use crate::{
    auth::{password, Identity, TokenService, Viewer},
    users::{StoreError, UserStore},
};

use super::{
    error::ApiError,
    types::{Auth, BookInput, UserView},
};

fn require_identity(ctx: &Context<'_>) -> Result<Identity, ApiError> {
    match ctx.data_opt::<Viewer>() {
        Some(Viewer::Authenticated(identity)) => Ok(identity.clone()),
        _ => Err(ApiError::login_required()),
    }
}

fn store<'a>(ctx: &'a Context<'_>) -> Result<&'a Arc<dyn UserStore>, ApiError> {
    ctx.data::<Arc<dyn UserStore>>()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.message)))
}

fn tokens<'a>(ctx: &'a Context<'_>) -> Result<&'a TokenService, ApiError> {
    ctx.data::<TokenService>()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.message)))
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The logged-in user with saved books.
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserView> {
        me(ctx).await.map_err(|e| e.extend())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Registers a user and returns a token for it.
    async fn add_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        email: String,
        password: String,
    ) -> async_graphql::Result<Auth> {
        add_user(ctx, &username, &email, &password)
            .await
            .map_err(|e| e.extend())
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<Auth> {
        login(ctx, &email, &password).await.map_err(|e| e.extend())
    }

    async fn save_book(&self, ctx: &Context<'_>, book: BookInput) -> async_graphql::Result<UserView> {
        save_book(ctx, book).await.map_err(|e| e.extend())
    }

    async fn remove_book(
        &self,
        ctx: &Context<'_>,
        book_id: String,
    ) -> async_graphql::Result<UserView> {
        remove_book(ctx, &book_id).await.map_err(|e| e.extend())
    }
}

async fn me(ctx: &Context<'_>) -> Result<UserView, ApiError> {
    let identity = require_identity(ctx)?;
    let user = store(ctx)?
        .find_by_id(identity.id)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(UserView(user))
}

async fn add_user(
    ctx: &Context<'_>,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Auth, ApiError> {
    let user = store(ctx)?.create(username, email, password).await?;
    let token = tokens(ctx)?.issue(&user.identity())?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Auth {
        token,
        user: UserView(user),
    })
}

async fn login(ctx: &Context<'_>, email: &str, password: &str) -> Result<Auth, ApiError> {
    let store = store(ctx)?;
    let Some(user) = store.find_by_email(email).await? else {
        password::verify_against_dummy(password);
        warn!("login unknown email");
        return Err(ApiError::invalid_credentials());
    };

    if !store.verify_password(&user, password)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::invalid_credentials());
    }

    let token = tokens(ctx)?.issue(&user.identity())?;
    info!(user_id = %user.id, "user logged in");
    Ok(Auth {
        token,
        user: UserView(user),
    })
}

async fn save_book(ctx: &Context<'_>, book: BookInput) -> Result<UserView, ApiError> {
    let identity = require_identity(ctx)?;
    let user = store(ctx)?.add_saved_book(identity.id, book.into()).await?;
    Ok(UserView(user))
}

async fn remove_book(ctx: &Context<'_>, book_id: &str) -> Result<UserView, ApiError> {
    let identity = require_identity(ctx)?;
    match store(ctx)?.remove_saved_book(identity.id, book_id).await {
        Ok(user) => Ok(UserView(user)),
        // the token outlived its account
        Err(StoreError::NotFound) => Err(ApiError::Authentication(
            "Couldn't find user with this id!".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod graphql;
pub mod state;
pub mod users;

#[cfg(test)]
mod testkit;

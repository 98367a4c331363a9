//! HTTP gateway: routes, shared state, and orchestration of the upload and
//! chat flows against the Gemini File Search API.

mod admin;
mod chat;
mod error;
mod files;
mod server;
mod state;
mod stores;
mod upload;

pub use {
    error::GatewayError,
    server::{build_app, start_gateway},
    state::GatewayState,
};

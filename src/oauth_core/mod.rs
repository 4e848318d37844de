//! OAuth2 authorization code primitives for the Dropbox handler.

pub mod callbacks;
pub mod config;
pub mod context;
pub mod form;
pub mod handler;
pub mod http_client;
pub mod types;

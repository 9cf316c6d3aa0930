//! Identity provider adapters.

mod rest;

pub use rest::{
    AccessTokenSource, IdentityToolkitClient, DEFAULT_IDENTITY_BASE_URL, DEFAULT_TOKEN_BASE_URL,
};

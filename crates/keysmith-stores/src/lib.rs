//! Keysmith Stores - clients for the systems credentials live in
//!
//! - [`GraphqlRemoteStore`]: the remote credential store, over its GraphQL API
//! - [`AppStoreConnectPortal`]: the Apple Developer Portal, over the App Store
//!   Connect API with an API key
//! - [`UnconfiguredPortal`]: stand-in when no API key is configured

pub mod apple;
pub mod error;
pub mod graphql;
mod unconfigured;

pub use apple::AppStoreConnectPortal;
pub use error::{Result, StoreError};
pub use graphql::{GraphqlClient, GraphqlRemoteStore};
pub use unconfigured::UnconfiguredPortal;

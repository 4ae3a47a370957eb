//! GraphQL client for the remote credential store

mod client;
mod documents;
mod store;
mod wire;

pub use client::GraphqlClient;
pub use store::GraphqlRemoteStore;

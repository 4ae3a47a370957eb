//! Apple Developer Portal access through the App Store Connect API

mod connect;
mod pkcs12;
mod portal;
mod resources;

pub use connect::{ApiKey, ConnectClient};
pub use portal::{AppStoreConnectPortal, SigningRequest};

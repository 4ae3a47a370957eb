//! Keysmith Credentials - code signing credential reconciliation
//!
//! Keeps a project's signing credentials consistent across three places:
//! - the remote credential store, the project's system of record
//! - the Apple Developer Portal, which decides what is actually valid
//! - a local `credentials.json` file for builds outside the service
//!
//! Workflows are expressed as [`Action`]s and executed by an [`ActionRunner`]
//! against a [`Context`].

pub mod action;
pub mod cache;
pub mod context;
pub mod credentials_file;
pub mod error;
pub mod keystore;
pub mod portal;
pub mod prompt;
pub mod provisioning;
pub mod remote;
pub mod resolver;
pub mod runner;
pub mod sync;
pub mod types;
pub mod validators;

#[cfg(test)]
mod testing;

pub use action::{Action, ActionOutcome, SyncTarget};
pub use cache::{AccountSnapshot, CredentialCache};
pub use context::{Actor, Context, NoVcs, Vcs};
pub use credentials_file::CredentialsFile;
pub use error::{CredentialsError, Result};
pub use portal::{DeveloperPortal, PortalError, PortalResult, PortalSession};
pub use prompt::{NonInteractivePrompter, PromptError, PromptResult, Prompter};
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use resolver::{resolve_build_credentials, resolve_keystore};
pub use runner::{ActionRunner, RunOutcome};
pub use sync::TargetSync;
pub use types::{
    AppLookupParams, BuildTarget, DistributionCertificate, DistributionType, Keystore,
    ProvisioningProfile, ResolvedBuildCredentials,
};
pub use validators::Validity;

//! Project loading and run context assembly

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use keysmith_core::config::{API_TOKEN_ENV, API_URL_ENV};
use keysmith_core::{load_config_from_dir, ProjectConfig};
use keysmith_credentials::{
    Actor, AppLookupParams, BuildTarget, Context, DeveloperPortal, RemoteStore,
};
use keysmith_git::GitRepo;
use keysmith_stores::{AppStoreConnectPortal, GraphqlClient, GraphqlRemoteStore, UnconfiguredPortal};
use tracing::{debug, info};

use super::prompt::DialoguerPrompter;
use super::Cli;

/// Loaded project configuration and its root directory
#[derive(Debug)]
pub struct Project {
    pub config: ProjectConfig,
    pub root: PathBuf,
}

impl Project {
    /// Find and load the configuration from the working directory upward
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, root) = load_config_from_dir(&cwd)?;
        info!(project = %config.full_name(), root = %root.display(), "loaded project");
        Ok(Self { config, root })
    }

    pub fn account(&self) -> &str {
        &self.config.account
    }

    fn app(&self, bundle_identifier: &str) -> AppLookupParams {
        AppLookupParams::new(&self.config.account, &self.config.slug, bundle_identifier)
    }

    /// Declared iOS build targets, in declaration order
    pub fn ios_targets(&self) -> Vec<BuildTarget> {
        self.config
            .ios_targets()
            .into_iter()
            .map(|target| {
                let mut app = self.app(&target.bundle_identifier);
                if let Some(parent) = target.parent_bundle_identifier {
                    app = app.with_parent(parent);
                }
                BuildTarget::new(target.name, app)
            })
            .collect()
    }

    pub fn android_app(&self) -> Option<AppLookupParams> {
        self.config.android.as_ref().map(|android| self.app(&android.package))
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(&self.config.credentials_file)
    }

    /// Assemble the context of one run
    pub fn context(&self, cli: &Cli) -> anyhow::Result<Context> {
        let endpoint =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| self.config.api.endpoint.clone());
        let token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        debug!(endpoint = %endpoint, has_token = token.is_some(), "remote credential store");
        let remote: Arc<dyn RemoteStore> =
            Arc::new(GraphqlRemoteStore::new(GraphqlClient::new(endpoint, token)));

        let portal: Arc<dyn DeveloperPortal> = match &self.config.apple {
            Some(apple) => Arc::new(
                AppStoreConnectPortal::from_config(apple, &self.root)
                    .context("failed to set up the App Store Connect client")?,
            ),
            None => Arc::new(UnconfiguredPortal),
        };

        let interactive = cli.is_interactive();
        let prompter = Box::new(DialoguerPrompter::new(interactive));

        let ctx = Context::new(current_actor(), &self.root, remote, portal, prompter)
            .non_interactive(!interactive);

        Ok(match GitRepo::discover(&self.root) {
            Ok(repo) => ctx.with_vcs(Box::new(repo)),
            Err(e) => {
                debug!(error = %e, "project is not in a git repository");
                ctx
            }
        })
    }
}

fn current_actor() -> Actor {
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "keysmith".to_string());
    Actor::new(username)
}

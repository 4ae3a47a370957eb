//! Per-run session context

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::CredentialCache;
use crate::error::Result;
use crate::portal::{DeveloperPortal, PortalError, PortalSession};
use crate::prompt::Prompter;
use crate::remote::RemoteStore;

/// Version-control queries needed when writing secrets to disk
pub trait Vcs: Send + Sync {
    /// Whether `path` is ignored by version control
    fn is_ignored(&self, path: &Path) -> bool;
}

/// Used outside of any repository: nothing can be committed by accident
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVcs;

impl Vcs for NoVcs {
    fn is_ignored(&self, _path: &Path) -> bool {
        true
    }
}

/// The user running the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
}

impl Actor {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum SessionState {
    NotAttempted,
    Established(PortalSession),
    Failed(String),
}

/// Everything a run needs: collaborators, interaction mode, the credential
/// cache and the developer portal session.
pub struct Context {
    pub actor: Actor,
    pub project_dir: PathBuf,
    /// Credential cache, owned by this run
    pub cache: CredentialCache,
    portal: Arc<dyn DeveloperPortal>,
    prompter: Box<dyn Prompter>,
    vcs: Box<dyn Vcs>,
    non_interactive: bool,
    session: SessionState,
}

impl Context {
    pub fn new(
        actor: Actor,
        project_dir: impl Into<PathBuf>,
        remote: Arc<dyn RemoteStore>,
        portal: Arc<dyn DeveloperPortal>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            actor,
            project_dir: project_dir.into(),
            cache: CredentialCache::new(remote),
            portal,
            prompter,
            vcs: Box::new(NoVcs),
            non_interactive: false,
            session: SessionState::NotAttempted,
        }
    }

    /// Disable prompts and credential generation
    pub fn non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }

    pub fn with_vcs(mut self, vcs: Box<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn is_interactive(&self) -> bool {
        !self.non_interactive
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    pub fn portal(&self) -> Arc<dyn DeveloperPortal> {
        Arc::clone(&self.portal)
    }

    /// The developer portal session, authenticating on first use.
    ///
    /// Authentication is attempted at most once per run; a failure is
    /// remembered and returned again.
    pub async fn portal_session(&mut self) -> Result<PortalSession> {
        match &self.session {
            SessionState::Established(session) => return Ok(session.clone()),
            SessionState::Failed(reason) => {
                return Err(PortalError::NotAuthenticated(reason.clone()).into())
            }
            SessionState::NotAttempted => {}
        }

        debug!(interactive = self.is_interactive(), "authenticating with developer portal");
        match self.portal.authenticate(self.is_interactive()).await {
            Ok(session) => {
                info!(team = %session.team.team_identifier, "authenticated with developer portal");
                self.session = SessionState::Established(session.clone());
                Ok(session)
            }
            Err(e) => {
                self.session = SessionState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Like [`portal_session`](Self::portal_session), but a failed
    /// authentication yields `None`
    pub async fn try_portal_session(&mut self) -> Option<PortalSession> {
        match self.portal_session().await {
            Ok(session) => Some(session),
            Err(e) => {
                debug!(error = %e, "continuing without developer portal session");
                None
            }
        }
    }
}

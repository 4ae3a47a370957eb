//! Stack-based action runner

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};

use crate::action::{self, Action, ActionOutcome};
use crate::context::Context;
use crate::error::Result;
use crate::types::DistributionType;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every action completed
    Completed,
    /// An action was cancelled; the remaining actions were dropped
    Cancelled,
}

/// Runs actions last-in first-out. Actions may push follow-up actions,
/// which run before anything already queued.
pub struct ActionRunner {
    stack: Vec<Action>,
}

impl ActionRunner {
    pub fn new(action: Action) -> Self {
        Self {
            stack: vec![action],
        }
    }

    /// Queue an action to run next
    pub fn push_next(&mut self, action: Action) {
        self.stack.push(action);
    }

    /// Run until the stack is empty, an action is cancelled, or one fails.
    /// A failure drops the remaining actions and is returned as the error.
    pub async fn run(&mut self, ctx: &mut Context) -> Result<RunOutcome> {
        while let Some(action) = self.stack.pop() {
            let name = action.name();
            debug!(action = name, pending = self.stack.len(), "running action");

            match self.dispatch(action, ctx).await {
                ActionOutcome::Completed => {}
                ActionOutcome::Cancelled => {
                    info!(action = name, "cancelled");
                    self.stack.clear();
                    return Ok(RunOutcome::Cancelled);
                }
                ActionOutcome::Failed(e) => {
                    warn!(action = name, error = %e, "action failed");
                    self.stack.clear();
                    return Err(e);
                }
            }
        }
        Ok(RunOutcome::Completed)
    }

    /// Run an action to completion on a fresh stack
    pub fn run_nested<'a>(
        action: Action,
        ctx: &'a mut Context,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutcome>> + 'a>> {
        Box::pin(async move { ActionRunner::new(action).run(ctx).await })
    }

    async fn dispatch(&mut self, action: Action, ctx: &mut Context) -> ActionOutcome {
        let result = match action {
            Action::SetupBuildCredentials {
                targets,
                distribution,
            } => action::setup_build_credentials(self, targets, distribution),
            Action::SetupAppStoreCredentials { app } => {
                action::setup_ios(ctx, app, DistributionType::AppStore).await
            }
            Action::SetupAdHocCredentials { app } => {
                action::setup_ios(ctx, app, DistributionType::AdHoc).await
            }
            Action::SetupEnterpriseCredentials { app } => {
                action::setup_ios(ctx, app, DistributionType::Enterprise).await
            }
            Action::SetupDevelopmentCredentials { app } => {
                action::setup_ios(ctx, app, DistributionType::Development).await
            }
            Action::SetupAndroidKeystore { app } => action::setup_android_keystore(ctx, app).await,
            Action::CreateDistributionCertificate { account } => {
                action::create_distribution_certificate(ctx, account).await
            }
            Action::RemoveDistributionCertificate {
                account,
                certificate_id,
            } => action::remove_distribution_certificate(ctx, account, certificate_id).await,
            Action::RemoveProvisioningProfile { app, distribution } => {
                action::remove_provisioning_profile(ctx, app, distribution).await
            }
            Action::CreatePushKey { account } => action::create_push_key(ctx, account).await,
            Action::RemovePushKey {
                account,
                push_key_id,
            } => action::remove_push_key(ctx, account, push_key_id).await,
            Action::RemoveKeystore { app } => action::remove_keystore(ctx, app).await,
            Action::SyncFromFile {
                target,
                credentials_path,
            } => action::sync_from_file(ctx, target, credentials_path).await,
            Action::SyncToFile {
                target,
                credentials_path,
            } => action::sync_to_file(ctx, target, credentials_path).await,
            Action::DisplayCredentials { account } => {
                action::display_credentials(ctx, account).await
            }
            menu @ Action::ManageCredentials { .. } => {
                action::manage_credentials(self, ctx, menu).await
            }
        };
        ActionOutcome::from(result)
    }
}

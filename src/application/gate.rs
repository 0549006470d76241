//! Permission and cooldown checks in front of command actions.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::catalog::Catalog;
use crate::application::ledger::UserLedger;
use crate::domain::{
    CommandId, CommandSpec, CooldownState, PermissionError, TenantId, UserId, ValidationError,
};
use crate::error::{Error, Result};
use crate::port::Storage;

/// One user's attempt to run a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tenant: TenantId,
    pub user_id: UserId,
    pub command_id: CommandId,
    pub is_admin: bool,
}

impl Invocation {
    pub fn new(
        tenant: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        command_id: impl Into<CommandId>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            user_id: user_id.into(),
            command_id: command_id.into(),
            is_admin: false,
        }
    }

    #[must_use]
    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Runs command actions only when the caller may run them now.
pub struct CooldownGate<S: Storage> {
    ledger: Arc<UserLedger<S>>,
    catalog: Arc<Catalog<S>>,
}

impl<S: Storage> CooldownGate<S> {
    pub fn new(ledger: Arc<UserLedger<S>>, catalog: Arc<Catalog<S>>) -> Self {
        Self { ledger, catalog }
    }

    /// Current gate state of (user, command).
    pub async fn state(&self, user_id: &UserId, command_id: &CommandId) -> Result<CooldownState> {
        let remaining = self.ledger.remaining_cooldown(user_id, command_id).await?;
        Ok(CooldownState::from_remaining(remaining))
    }

    /// Resolve the command and reject the invocation if it may not run.
    pub async fn check(&self, invocation: &Invocation) -> Result<CommandSpec> {
        let command = self
            .catalog
            .command(&invocation.command_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownCommand {
                command_id: invocation.command_id.clone(),
            })?;

        if command.is_admin && !invocation.is_admin {
            return Err(PermissionError {
                command_id: command.id,
            }
            .into());
        }

        if command.has_cooldown() {
            let state = self.state(&invocation.user_id, &command.id).await?;
            if let CooldownState::Cooling { remaining } = state {
                return Err(Error::OnCooldown {
                    command_id: command.id,
                    remaining,
                });
            }
        }
        Ok(command)
    }

    /// Run `action` if the invocation passes [`check`](Self::check).
    ///
    /// A cooldown starts only when the action succeeds. Failing to record it
    /// is logged but does not turn a successful action into an error.
    pub async fn run<T, F, Fut>(&self, invocation: &Invocation, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let command = match self.check(invocation).await {
            Ok(command) => command,
            Err(e) => {
                debug!(
                    tenant = %invocation.tenant,
                    user = %invocation.user_id,
                    command = %invocation.command_id,
                    reason = %e,
                    "Invocation rejected"
                );
                return Err(e);
            }
        };

        let output = action().await?;

        if command.has_cooldown() {
            if let Err(e) = self
                .ledger
                .create_cooldown(&invocation.user_id, &command.id)
                .await
            {
                warn!(
                    tenant = %invocation.tenant,
                    user = %invocation.user_id,
                    command = %command.id,
                    error = %e,
                    "Failed to record cooldown"
                );
            }
        }
        Ok(output)
    }
}

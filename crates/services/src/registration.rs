use std::sync::Arc;

use invitely_db::models::{Invitation, User};
use tracing::{error, info};

use crate::error::{InvitationError, InvitationResult};
use crate::invitation::InvitationService;
use crate::ledger::LedgerService;
use crate::store::UserStore;

/// Account details supplied at sign-up. The email is chosen by the caller
/// (or forced to the invited address).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub display_name: String,
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct RegistrationService {
    users: Arc<dyn UserStore>,
    ledger: LedgerService,
    invitations: InvitationService,
}

impl RegistrationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: LedgerService,
        invitations: InvitationService,
    ) -> Self {
        Self {
            users,
            ledger,
            invitations,
        }
    }

    /// Stores the user and opens their ledger with the initial quota.
    pub async fn create_user(&self, email: &str, account: NewAccount) -> InvitationResult<User> {
        let user = User::new(
            email.to_string(),
            account.username,
            account.display_name,
            account.password_hash,
        );
        let user = self.users.insert(user).await?;
        let user_id = user.id.ok_or(InvitationError::NotFound)?;
        self.ledger.open(user_id).await?;
        info!(%user_id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Self-registration without an invitation, only allowed in open mode.
    pub async fn register(&self, email: &str, account: NewAccount) -> InvitationResult<User> {
        if self.ledger.invite_only() {
            return Err(InvitationError::RegistrationClosed);
        }
        self.create_user(email, account).await
    }

    /// Registers the invitee of `key` under the invited email address and
    /// accepts the invitation.
    ///
    /// The invitation is claimed before the account is created, so
    /// concurrent sign-ups with one key yield a single account.
    pub async fn register_with_invitation(
        &self,
        key: &str,
        account: NewAccount,
    ) -> InvitationResult<(User, Invitation)> {
        let invitation = self.invitations.find(key).await?;
        self.invitations.claim(&invitation).await?;

        let user = match self.create_user(&invitation.email, account).await {
            Ok(user) => user,
            Err(err) => {
                self.invitations.release(&invitation).await;
                return Err(err);
            }
        };
        let user_id = user.id.ok_or(InvitationError::NotFound)?;

        if let Err(err) = self.invitations.settle(&invitation, user_id).await {
            error!(
                sender_id = %invitation.user_id,
                %user_id,
                error = %err,
                "Failed to accept invitation"
            );
            return Err(err);
        }
        Ok((user, invitation))
    }
}

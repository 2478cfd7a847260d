use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use invitely_config::{InvitationSettings, MailSettings};
use invitely_db::models::{Invitation, User, invitation::expiry_cutoff};
use sha1::{Digest, Sha1};
use tracing::{debug, error, warn};

use crate::dao::base::DaoError;
use crate::error::{InvitationError, InvitationResult};
use crate::events::{EventBus, InvitationEvent};
use crate::ledger::LedgerService;
use crate::mail::{
    BODY_TEMPLATE, DefaultTemplates, EmailContext, InvitationTemplates, MailMessage, Mailer,
    SUBJECT_TEMPLATE, SiteContext, strip_newlines,
};
use crate::store::InvitationStore;

/// Fresh keys are retried this many times on a unique-index collision.
const KEY_ATTEMPTS: usize = 3;

/// Invitation lifecycle: issue, look up, accept and mail invitations.
#[derive(Clone)]
pub struct InvitationService {
    invitations: Arc<dyn InvitationStore>,
    ledger: LedgerService,
    mailer: Arc<dyn Mailer>,
    templates: Arc<dyn InvitationTemplates>,
    events: EventBus,
    settings: InvitationSettings,
    mail: MailSettings,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        ledger: LedgerService,
        mailer: Arc<dyn Mailer>,
        events: EventBus,
        settings: InvitationSettings,
        mail: MailSettings,
    ) -> Self {
        Self {
            invitations,
            ledger,
            mailer,
            templates: Arc::new(DefaultTemplates),
            events,
            settings,
            mail,
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn InvitationTemplates>) -> Self {
        self.templates = templates;
        self
    }

    pub fn is_valid(&self, invitation: &Invitation) -> bool {
        invitation.is_valid(self.settings.expire_days)
    }

    pub fn expiration_date(&self, invitation: &Invitation) -> NaiveDate {
        invitation.expiration_date(self.settings.expire_days)
    }

    /// Returns the valid invitation from `sender` to `email`, issuing a new
    /// one (and spending one of the sender's invitations) when none exists.
    ///
    /// Does not send any mail, see [`InvitationService::send_email`].
    pub async fn invite(&self, sender: &User, email: &str) -> InvitationResult<Invitation> {
        let sender_id = sender.id.ok_or(InvitationError::NotFound)?;

        // Older, expired invitations to the same address stay in place
        // until they are purged or looked up.
        if let Some(existing) = self.invitations.find_latest(sender_id, email).await? {
            if self.is_valid(&existing) {
                debug!(%sender_id, email, "Reusing valid invitation");
                return Ok(existing);
            }
        }

        self.ledger.debit_on_send(sender_id, 1).await?;
        match self.insert_new(sender_id, &sender.email, email).await {
            Ok(invitation) => {
                debug!(%sender_id, email, "Invitation issued");
                Ok(invitation)
            }
            Err(err) => {
                if let Err(refund_err) = self.ledger.refund_send(sender_id, 1).await {
                    error!(%sender_id, error = %refund_err, "Failed to refund invitation");
                }
                Err(err)
            }
        }
    }

    async fn insert_new(
        &self,
        sender_id: ObjectId,
        sender_email: &str,
        email: &str,
    ) -> InvitationResult<Invitation> {
        let mut attempt = 1;
        loop {
            let key = self.generate_key(sender_email, email);
            let invitation = Invitation::new(sender_id, email.to_string(), key);
            match self.invitations.insert(invitation).await {
                Ok(invitation) => return Ok(invitation),
                Err(DaoError::DuplicateKey(msg)) if attempt < KEY_ATTEMPTS => {
                    warn!(attempt, %msg, "Invitation key collision, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn generate_key(&self, sender_email: &str, email: &str) -> String {
        let salt: u64 = rand::random();
        let mut hasher = Sha1::new();
        hasher.update(self.settings.secret_key.as_bytes());
        hasher.update(salt.to_le_bytes());
        hasher.update(sender_email.as_bytes());
        hasher.update(email.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Resolves `key` to a valid invitation. An expired invitation is
    /// deleted on the way and reported as not found.
    pub async fn find(&self, key: &str) -> InvitationResult<Invitation> {
        let invitation = self
            .invitations
            .find_by_key(key)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if !self.is_valid(&invitation) {
            if let Some(id) = invitation.id {
                self.invitations.delete(id).await?;
                debug!(%id, "Deleted expired invitation");
            }
            return Err(InvitationError::NotFound);
        }
        Ok(invitation)
    }

    /// Deletes the invitation and credits its sender. A key can only be
    /// accepted once: the delete is the claim, and a second acceptance of
    /// the same invitation fails with [`InvitationError::NotFound`].
    pub async fn accept(
        &self,
        invitation: &Invitation,
        new_user_id: ObjectId,
    ) -> InvitationResult<()> {
        self.claim(invitation).await?;
        self.settle(invitation, new_user_id).await
    }

    /// Removes the invitation so nobody else can use its key.
    pub(crate) async fn claim(&self, invitation: &Invitation) -> InvitationResult<()> {
        let id = invitation.id.ok_or(InvitationError::NotFound)?;
        if !self.invitations.delete(id).await? {
            debug!(%id, "Invitation already claimed");
            return Err(InvitationError::NotFound);
        }
        Ok(())
    }

    /// Puts a claimed invitation back after a failure further down.
    pub(crate) async fn release(&self, invitation: &Invitation) {
        if let Err(err) = self.invitations.insert(invitation.clone()).await {
            error!(key = %invitation.key, error = %err, "Failed to restore invitation");
        }
    }

    /// Credits the sender of a claimed invitation.
    pub(crate) async fn settle(
        &self,
        invitation: &Invitation,
        new_user_id: ObjectId,
    ) -> InvitationResult<()> {
        if let Err(err) = self.ledger.credit_on_accept(invitation.user_id, 1).await {
            self.release(invitation).await;
            return Err(err);
        }
        self.events.publish(InvitationEvent::InvitationAccepted {
            sender_id: invitation.user_id,
            new_user_id,
        });
        Ok(())
    }

    /// Mails the invitation to `email`, or to the invited address when
    /// `None`, on behalf of `site` or the configured site.
    pub async fn send_email(
        &self,
        invitation: &Invitation,
        email: Option<&str>,
        site: Option<&SiteContext>,
    ) -> InvitationResult<()> {
        let default_site;
        let site = match site {
            Some(site) => site,
            None => {
                default_site = SiteContext::from(&self.mail);
                &default_site
            }
        };
        let context = EmailContext {
            invitation,
            site,
            expiration_days: self.settings.expire_days,
        };
        let subject = strip_newlines(&self.templates.render(SUBJECT_TEMPLATE, &context)?);
        let body = self.templates.render(BODY_TEMPLATE, &context)?;

        let message = MailMessage {
            subject,
            body,
            from_email: self.mail.default_from_email.clone(),
            to: vec![email.unwrap_or(&invitation.email).to_string()],
        };
        self.mailer.send(&message).await?;

        self.events.publish(InvitationEvent::InvitationSent {
            invitation: invitation.clone(),
        });
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> InvitationResult<Vec<Invitation>> {
        Ok(self.invitations.list_by_user(user_id).await?)
    }

    /// Deletes every expired invitation, returning how many were removed.
    pub async fn purge_expired(&self) -> InvitationResult<u64> {
        let cutoff = expiry_cutoff(Utc::now(), self.settings.expire_days);
        Ok(self
            .invitations
            .delete_issued_before(bson::DateTime::from_chrono(cutoff))
            .await?)
    }
}

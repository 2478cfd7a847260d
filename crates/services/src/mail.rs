//! Outgoing mail: the transport seam plus the invitation email templates.

use async_trait::async_trait;
use invitely_config::MailSettings;
use invitely_db::models::Invitation;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub const SUBJECT_TEMPLATE: &str = "invitation/invitation_email_subject.txt";
pub const BODY_TEMPLATE: &str = "invitation/invitation_email.txt";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Message has no recipients")]
    NoRecipients,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub from_email: String,
    pub to: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        info!(
            from = %message.from_email,
            to = ?message.to,
            subject = %message.subject,
            "Sending mail"
        );
        Ok(())
    }
}

/// Keeps every sent message in memory.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    outbox: Mutex<Vec<MailMessage>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Vec<MailMessage> {
        self.outbox.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        self.outbox.lock().push(message.clone());
        Ok(())
    }
}

/// The site an invitation is sent on behalf of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteContext {
    pub name: String,
    pub domain: String,
}

impl From<&MailSettings> for SiteContext {
    fn from(settings: &MailSettings) -> Self {
        Self {
            name: settings.site_name.clone(),
            domain: settings.site_domain.clone(),
        }
    }
}

pub struct EmailContext<'a> {
    pub invitation: &'a Invitation,
    pub site: &'a SiteContext,
    pub expiration_days: i64,
}

/// Renders the named invitation templates.
pub trait InvitationTemplates: Send + Sync {
    fn render(&self, name: &str, context: &EmailContext<'_>) -> Result<String, MailError>;
}

#[derive(Debug, Default)]
pub struct DefaultTemplates;

impl InvitationTemplates for DefaultTemplates {
    fn render(&self, name: &str, context: &EmailContext<'_>) -> Result<String, MailError> {
        let site = context.site;
        match name {
            SUBJECT_TEMPLATE => Ok(format!("You have been invited to join {}\n", site.name)),
            BODY_TEMPLATE => Ok(format!(
                "Hello,\n\n\
                 You have been invited to join {name}.\n\n\
                 To accept the invitation, register at:\n\
                 http://{domain}/register/{key}/\n\n\
                 The invitation expires in {days} days.\n",
                name = site.name,
                domain = site.domain,
                key = context.invitation.key,
                days = context.expiration_days,
            )),
            other => Err(MailError::TemplateNotFound(other.to_string())),
        }
    }
}

/// Mail subjects must be a single line.
pub fn strip_newlines(subject: &str) -> String {
    subject.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

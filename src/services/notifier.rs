//! Status notifications sent to visitors and invited guests
//!
//! Delivery is best-effort: failures are logged and reported as `false`,
//! never propagated to the status transition that triggered them.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MailAttachment, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use reqwest::Client;
use std::{str::FromStr, sync::Arc};

use crate::{
    config::{EmailConfig, VisitsConfig},
    error::{AppError, AppResult},
    models::{
        invite::Invite,
        status::{InviteStatus, VisitorStatus},
        visitor::Visitor,
    },
};

use super::storage::content_type_for;

const SIGNATURE: &str = "Regards,\nVisitor Management Team";

/// Binary file attached to a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Outbound mail transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()>;
}

/// SMTP mailer; logs instead of sending when email is disabled
#[derive(Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Visitor Management Team");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Notification(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Notification(format!("Invalid to address: {}", e)))?;

        let text = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject);

        let message = match attachment {
            Some(file) => {
                let content_type = ContentType::parse(&file.content_type)
                    .or_else(|_| ContentType::parse("application/octet-stream"))
                    .map_err(|e| AppError::Notification(format!("Invalid attachment type: {}", e)))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(text)
                        .singlepart(MailAttachment::new(file.filename).body(file.data, content_type)),
                )
            }
            None => builder.singlepart(text),
        };

        message.map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Notification(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!("Email disabled, not sending '{}' to {}", subject, to);
            return Ok(());
        }

        let email = self.build_message(to, subject, body, attachment)?;
        let transport = self.transport()?;

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| AppError::Notification(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// Subject and body of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

/// Message for a visitor's current status; `None` when the status is silent
pub fn visitor_notice(visitor: &Visitor) -> Option<Notice> {
    let (subject, line) = match visitor.status {
        VisitorStatus::Pending => (
            "Visitor Registration Pending",
            "Your registration is pending approval.",
        ),
        VisitorStatus::Approved => (
            "Visitor Registration Approved",
            "Your registration has been approved. Please visit reception to collect your pass.",
        ),
        VisitorStatus::Rejected => (
            "Visitor Registration Rejected",
            "Unfortunately, your registration has been rejected.",
        ),
        VisitorStatus::CheckedIn if visitor.pass_image.is_some() => (
            "Visitor Checked In - Pass Attached",
            "You have successfully checked in. Your visitor pass is attached.",
        ),
        VisitorStatus::CheckedIn => (
            "Visitor Checked In",
            "You have successfully checked in. Please collect your visitor pass at reception.",
        ),
        VisitorStatus::CheckedOut => (
            "Visitor Checked Out",
            "You have successfully checked out. Thank you for visiting.",
        ),
        VisitorStatus::Created | VisitorStatus::Revisit => return None,
    };

    Some(Notice {
        subject: subject.to_string(),
        body: format!("Dear {},\n\n{}\n\n{}", visitor.name, line, SIGNATURE),
    })
}

/// Link the guest follows to complete verification
pub fn invite_link(frontend_url: &str, invite_code: &str) -> String {
    format!("{}/invite/{}/", frontend_url.trim_end_matches('/'), invite_code)
}

/// Message for an invite's current status
pub fn invite_notice(invite: &Invite, frontend_url: &str, organization: &str) -> Notice {
    let (subject, line) = match invite.status {
        InviteStatus::Created | InviteStatus::Reinvited => {
            return Notice {
                subject: format!("You're invited to {}", organization),
                body: format!(
                    "Dear {},\n\n\
                     You are being invited to {}.\n\n\
                     Your invite code is: {}.\n\n\
                     To proceed, complete your verification using the link below.\n\
                     You will need to capture your live image and submit the form.\n\n\
                     Verification link: {}\n\n{}",
                    invite.visitor_name,
                    organization,
                    invite.invite_code,
                    invite_link(frontend_url, &invite.invite_code),
                    SIGNATURE
                ),
            };
        }
        InviteStatus::Pending => ("Invite Pending Verification", "Your invite is pending verification."),
        InviteStatus::Approved => ("Invite Approved", "Your invite has been approved."),
        InviteStatus::Rejected => ("Invite Rejected", "Unfortunately, your invite has been rejected."),
        InviteStatus::CheckedIn => (
            "Invite Checked In - Pass Attached",
            "You have successfully checked in. Your pass is attached.",
        ),
        InviteStatus::CheckedOut => (
            "Invite Checked Out",
            "You have successfully checked out. Thank you for visiting.",
        ),
    };

    Notice {
        subject: subject.to_string(),
        body: format!("Dear {},\n\n{}\n\n{}", invite.visitor_name, line, SIGNATURE),
    }
}

/// Sends status notifications through a [`Mailer`]
#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    http: Client,
    frontend_url: String,
    organization: String,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, visits: &VisitsConfig) -> Self {
        Self {
            mailer,
            http: Client::new(),
            frontend_url: visits.frontend_url.clone(),
            organization: visits.organization.clone(),
        }
    }

    /// Notify a visitor of their current status. A checked-in visitor
    /// receives the pass issued at capture as an attachment.
    pub async fn notify_visitor(&self, visitor: &Visitor) -> bool {
        let Some(notice) = visitor_notice(visitor) else {
            return false;
        };

        let attachment = match (&visitor.status, visitor.pass_image.as_deref()) {
            (VisitorStatus::CheckedIn, Some(url)) => self.fetch_attachment(url).await,
            _ => None,
        };

        self.deliver(&visitor.email, notice, attachment).await
    }

    /// Notify an invited guest of the invite's current status. A checked-in
    /// guest receives the pass image as an attachment when one was issued.
    pub async fn notify_invite(&self, invite: &Invite) -> bool {
        let notice = invite_notice(invite, &self.frontend_url, &self.organization);

        let attachment = match (&invite.status, invite.pass_image.as_deref()) {
            (InviteStatus::CheckedIn, Some(url)) => self.fetch_attachment(url).await,
            _ => None,
        };

        self.deliver(&invite.visitor_email, notice, attachment).await
    }

    async fn deliver(&self, to: &str, notice: Notice, attachment: Option<Attachment>) -> bool {
        if to.trim().is_empty() {
            return false;
        }
        match self
            .mailer
            .send(to, &notice.subject, &notice.body, attachment)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send '{}' to {}: {}", notice.subject, to, e);
                false
            }
        }
    }

    async fn fetch_attachment(&self, url: &str) -> Option<Attachment> {
        let response = match self.http.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!("Pass image {} returned {}", url, r.status());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch pass image {}: {}", url, e);
                return None;
            }
        };

        let data = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::warn!("Failed to read pass image {}: {}", url, e);
                return None;
            }
        };

        let filename = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("pass.png")
            .to_string();

        Some(Attachment {
            content_type: content_type_for(&filename).to_string(),
            filename,
            data,
        })
    }
}

//! Outbound email. SMTP is an external collaborator behind the [`Mailer`]
//! trait so handlers and the deletion cascade can be exercised against a
//! test double.

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("smtp relay config")?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        let from = cfg
            .from
            .parse::<Mailbox>()
            .context("parse sender address")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .context("build email")?;
        self.transport.send(message).await.context("smtp send")?;
        info!(%to, subject = subject, "email sent");
        Ok(())
    }
}

const BRAND: &str = "ALPHA Podcast Platform";

fn layout(inner: &str) -> String {
    format!(
        r#"<div style="font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; background-color: #f9f9f9; padding: 40px 0;">
  <div style="max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 16px; border: 1px solid #eaeaea; overflow: hidden;">
    <div style="background: linear-gradient(135deg, #FF4B2B 0%, #FF416C 100%); padding: 32px 0; text-align: center;">
      <h1 style="color: #ffffff; margin: 0; font-size: 28px;">ALPHA</h1>
      <p style="color: rgba(255,255,255,0.9); margin: 5px 0 0; font-size: 14px;">PODCAST PLATFORM</p>
    </div>
    <div style="padding: 40px 30px;">{inner}</div>
  </div>
</div>"#
    )
}

fn code_box(code: &str) -> String {
    format!(
        r#"<div style="background-color: #f8f9fa; border-radius: 12px; padding: 20px; margin: 30px 0; text-align: center; border: 2px dashed #e0e0e0;">
  <h1 style="color: #FF416C; font-size: 42px; letter-spacing: 8px; margin: 0;">{code}</h1>
</div>"#
    )
}

pub fn verification_code_html(code: &str) -> String {
    layout(&format!(
        "<h2 style=\"text-align: center;\">Welcome to the Future of Audio!</h2>\
         <p style=\"text-align: center;\">Thank you for joining <strong>{BRAND}</strong>. \
         Please enter the code below to verify your email address:</p>{}\
         <p style=\"color: #888888; font-size: 14px; text-align: center;\">\
         This code will expire in <strong>10 minutes</strong>. \
         If you didn't request this, please ignore this email.</p>",
        code_box(code)
    ))
}

pub fn deletion_code_html(code: &str) -> String {
    layout(&format!(
        "<p style=\"text-align: center;\">You have requested to delete your account. \
         This action is irreversible.<br>\
         Please enter the code below to confirm this action:</p>{}",
        code_box(code)
    ))
}

pub fn account_deleted_html(
    username: &str,
    email: &str,
    phone: Option<&str>,
    reason: &str,
) -> String {
    layout(&format!(
        "<h2 style=\"color: #d32f2f; margin-top: 0;\">User Account Deleted</h2>\
         <p><strong>Username:</strong> {username}</p>\
         <p><strong>Email:</strong> {email}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <hr style=\"border: 0; border-top: 1px solid #eee; margin: 20px 0;\">\
         <p><strong>Reason for Deletion:</strong></p>\
         <p style=\"background-color: #f8f9fa; padding: 15px; border-radius: 8px;\">{reason}</p>",
        phone.unwrap_or("N/A")
    ))
}

pub fn new_subscriber_html(subscriber_name: &str) -> String {
    layout(&format!(
        "<h2 style=\"text-align: center;\">New Subscriber!</h2>\
         <p style=\"text-align: center;\">User <strong>{subscriber_name}</strong> \
         has subscribed to your channel!</p>"
    ))
}

pub fn newsletter_welcome_html() -> String {
    layout(
        "<h2 style=\"text-align: center;\">You're on the list!</h2>\
         <p style=\"text-align: center;\">Thanks for subscribing to our newsletter! \
         You'll now be the first to know about new episodes from top creators, \
         exclusive content and interviews, and special community perks.</p>",
    )
}

pub fn contact_html(name: &str, email: &str, subject: &str, message: &str) -> String {
    layout(&format!(
        "<h3 style=\"margin: 0 0 10px 0;\">Sender Details</h3>\
         <p style=\"margin: 5px 0;\"><strong>Name:</strong> {name}</p>\
         <p style=\"margin: 5px 0;\"><strong>Email:</strong> {email}</p>\
         <p style=\"margin: 5px 0;\"><strong>Subject:</strong> {subject}</p>\
         <h3 style=\"margin: 20px 0 15px 0;\">Message</h3>\
         <div style=\"background-color: #f8f9fa; border-radius: 8px; padding: 20px; border-left: 4px solid #FF416C;\">{}</div>",
        message.replace('\n', "<br>")
    ))
}

/// Registration / password-reset verification code. Dispatch failure
/// propagates to the caller: the triggering request must fail loudly.
pub async fn send_verification_code(mailer: &dyn Mailer, to: &str, code: &str) -> anyhow::Result<()> {
    mailer
        .send(
            to,
            &format!("Your Verification Code - {BRAND}"),
            verification_code_html(code),
        )
        .await
}

/// Account-deletion confirmation code. Propagates like the above.
pub async fn send_deletion_code(mailer: &dyn Mailer, to: &str, code: &str) -> anyhow::Result<()> {
    mailer
        .send(
            to,
            &format!("Account Deletion Verification Code - {BRAND}"),
            deletion_code_html(code),
        )
        .await
}

/// Contact-form relay to the admin inbox. Propagates.
pub async fn send_contact_message(
    mailer: &dyn Mailer,
    admin: &str,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> anyhow::Result<()> {
    mailer
        .send(
            admin,
            &format!("Contact Form: {subject} - {name}"),
            contact_html(name, email, subject, message),
        )
        .await
}

/// Admin notice after an account cascade. Best-effort: a dispatch failure
/// is logged and never surfaced to the deletion flow.
pub async fn notify_account_deleted(
    mailer: &dyn Mailer,
    admin: &str,
    username: &str,
    email: &str,
    phone: Option<&str>,
    reason: &str,
) {
    if let Err(e) = mailer
        .send(
            admin,
            &format!("Account Deleted: {username}"),
            account_deleted_html(username, email, phone, reason),
        )
        .await
    {
        warn!(error = %e, "account-deleted notification failed");
    }
}

/// "New subscriber" notice to a channel owner. Best-effort.
pub async fn notify_new_subscriber(mailer: &dyn Mailer, to: &str, subscriber_name: &str) {
    if let Err(e) = mailer
        .send(
            to,
            "New Subscriber!",
            new_subscriber_html(subscriber_name),
        )
        .await
    {
        warn!(error = %e, "new-subscriber notification failed");
    }
}

/// Newsletter welcome. Best-effort.
pub async fn send_newsletter_welcome(mailer: &dyn Mailer, to: &str) {
    if let Err(e) = mailer
        .send(
            to,
            &format!("Welcome to {BRAND}!"),
            newsletter_welcome_html(),
        )
        .await
    {
        warn!(error = %e, "newsletter welcome failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_emails_embed_the_code() {
        let html = verification_code_html("482913");
        assert!(html.contains("482913"));
        assert!(html.contains("10 minutes"));

        let html = deletion_code_html("271828");
        assert!(html.contains("271828"));
        assert!(html.contains("irreversible"));
    }

    #[test]
    fn admin_notice_carries_identity_and_reason() {
        let html = account_deleted_html("asha", "asha@example.com", None, "no longer needed");
        assert!(html.contains("asha"));
        assert!(html.contains("asha@example.com"));
        assert!(html.contains("N/A"));
        assert!(html.contains("no longer needed"));
    }

    #[test]
    fn contact_body_converts_newlines() {
        let html = contact_html("dev", "d@example.com", "hi", "line one\nline two");
        assert!(html.contains("line one<br>line two"));
    }
}

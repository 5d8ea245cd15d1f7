use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use time::{format_description::FormatItem, macros::format_description, Date};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Logs the mail instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            attachment = mail.attachment.as_ref().map(|a| a.filename.as_str()),
            "mail simulated (no smtp configured)"
        );
        Ok(())
    }
}

/// SMTP delivery through lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .context("smtp relay")?
            .port(cfg.port);
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let message = build_message(&self.from, mail)?;
        self.transport
            .send(message)
            .await
            .context("smtp send")?;
        info!(to = %mail.to, subject = %mail.subject, "mail sent");
        Ok(())
    }
}

fn build_message(from: &str, mail: &OutgoingMail) -> anyhow::Result<Message> {
    let body = MultiPart::alternative_plain_html(mail.text.clone(), mail.html.clone());
    let body = match &mail.attachment {
        Some(att) => MultiPart::mixed().multipart(body).singlepart(attachment_part(att)?),
        None => body,
    };

    Message::builder()
        .from(from.parse().context("invalid from address")?)
        .to(mail.to.parse().context("invalid to address")?)
        .subject(mail.subject.clone())
        .multipart(body)
        .context("build mail")
}

fn attachment_part(att: &MailAttachment) -> anyhow::Result<SinglePart> {
    let content_type = ContentType::parse(&att.content_type).context("attachment content type")?;
    Ok(Attachment::new(att.filename.clone()).body(att.body.clone(), content_type))
}

const LONG_DATE: &[FormatItem<'static>] =
    format_description!("[weekday], [month repr:long] [day padding:none], [year]");

/// Compose the booking confirmation sent to an attendee.
pub fn booking_confirmation(
    to: &str,
    attendee_name: &str,
    speaker_name: &str,
    date: Date,
    hour: i16,
    qr_png: Option<Vec<u8>>,
) -> OutgoingMail {
    let when = date
        .format(LONG_DATE)
        .unwrap_or_else(|_| date.to_string());
    let subject = format!("Booking Confirmation: Session with {speaker_name}");
    let text = format!(
        "Hello {attendee_name},\n\n\
         Your session with {speaker_name} has been confirmed for {when} at {hour}:00.\n\n\
         Your QR code ticket is attached. Show it at the venue to check in.\n"
    );
    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h2>Booking Confirmation</h2>\
         <p>Hello {attendee_name},</p>\
         <p>Your session with <strong>{speaker_name}</strong> has been confirmed for:</p>\
         <p><strong>Date:</strong> {when}<br><strong>Time:</strong> {hour}:00</p>\
         <p>Your QR code ticket is attached. Show it at the venue to check in.</p>\
         </div>"
    );
    OutgoingMail {
        to: to.to_string(),
        subject,
        text,
        html,
        attachment: qr_png.map(|body| MailAttachment {
            filename: "qr-code.png".into(),
            content_type: "image/png".into(),
            body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn confirmation_mentions_speaker_date_and_hour() {
        let mail = booking_confirmation(
            "a@x.com",
            "Ada",
            "Grace",
            date!(2030 - 05 - 01),
            10,
            Some(vec![0x89, b'P', b'N', b'G']),
        );
        assert_eq!(mail.subject, "Booking Confirmation: Session with Grace");
        assert!(mail.text.contains("Wednesday, May 1, 2030"));
        assert!(mail.text.contains("10:00"));
        assert!(mail.html.contains("<strong>Grace</strong>"));
        let att = mail.attachment.expect("qr attached");
        assert_eq!(att.filename, "qr-code.png");
        assert_eq!(att.content_type, "image/png");
    }

    #[test]
    fn message_builds_with_and_without_attachment() {
        let mut mail = booking_confirmation("a@x.com", "Ada", "Grace", date!(2030 - 05 - 01), 9, None);
        assert!(build_message("Bookings <noreply@example.com>", &mail).is_ok());

        mail.attachment = Some(MailAttachment {
            filename: "qr-code.png".into(),
            content_type: "image/png".into(),
            body: vec![1, 2, 3],
        });
        assert!(build_message("noreply@example.com", &mail).is_ok());
    }

    #[test]
    fn message_rejects_bad_recipient() {
        let mut mail = booking_confirmation("a@x.com", "Ada", "Grace", date!(2030 - 05 - 01), 9, None);
        mail.to = "not an address".into();
        assert!(build_message("noreply@example.com", &mail).is_err());
    }

    #[tokio::test]
    async fn log_mailer_succeeds() {
        let mail = booking_confirmation("a@x.com", "Ada", "Grace", date!(2030 - 05 - 01), 9, None);
        LogMailer.send(&mail).await.unwrap();
    }
}

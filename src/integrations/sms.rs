use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::config::SmsConfig;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogSms;

#[async_trait]
impl SmsSender for LogSms {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, chars = body.len(), "sms simulated (no provider configured)");
        Ok(())
    }
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioSms {
    client: reqwest::Client,
    cfg: SmsConfig,
    base_url: String,
}

impl TwilioSms {
    pub fn new(cfg: SmsConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build sms http client")?;
        Ok(Self {
            client,
            cfg,
            base_url: "https://api.twilio.com".into(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.cfg.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.cfg.account_sid, Some(&self.cfg.auth_token))
            .form(&[("To", to), ("From", self.cfg.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .context("twilio request")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("twilio responded {status}: {text}");
        }
        info!(%to, "sms sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sms_always_succeeds() {
        LogSms.send("+15550100", "Your verification code is: 123456")
            .await
            .expect("log sender never fails");
    }

    #[test]
    fn twilio_url_contains_account() {
        let sms = TwilioSms::new(SmsConfig {
            account_sid: "AC123".into(),
            auth_token: "tok".into(),
            from_number: "+15550000".into(),
        })
        .unwrap();
        assert_eq!(
            sms.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}

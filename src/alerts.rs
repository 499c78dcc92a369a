//! Alert evaluation and notification dispatch.
//!
//! The evaluator decides whether a cycle's risk class warrants notifying
//! subscribers, and dispatches over two independent channels. Each channel
//! sits behind its own capability trait so a failure on one never affects
//! the other, and so tests can count attempts without a network. Dispatch
//! failures are logged and suppressed; nothing here propagates to the
//! control loop. There is no batching and no deduplication across cycles —
//! a sustained high-risk period resends every cycle.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{Config, SmtpConfig, TwilioConfig};
use crate::db::TwinDb;
use crate::error::TwinError;
use crate::types::RiskAssessment;

/// Email dispatch capability.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TwinError>;
}

/// SMS dispatch capability.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), TwinError>;
}

// ---------------------------------------------------------------------------
// Production senders
// ---------------------------------------------------------------------------

/// SMTP email sender. Opens a STARTTLS relay per message, as the deployment
/// expects low alert volume. An incomplete SMTP configuration surfaces as a
/// dispatch error, which the evaluator logs and suppresses.
pub struct SmtpEmailSender {
    config: SmtpConfig,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TwinError> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or_else(|| TwinError::Configuration("SMTP_HOST not set".into()))?;
        let user = self
            .config
            .user
            .as_deref()
            .ok_or_else(|| TwinError::Configuration("SMTP_USER not set".into()))?;
        let pass = self
            .config
            .pass
            .as_deref()
            .ok_or_else(|| TwinError::Configuration("SMTP_PASS not set".into()))?;

        let message = Message::builder()
            .from(user
                .parse()
                .map_err(|e| TwinError::Dispatch(format!("invalid from address: {}", e)))?)
            .to(to
                .parse()
                .map_err(|e| TwinError::Dispatch(format!("invalid to address: {}", e)))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| TwinError::Dispatch(format!("failed to build email: {}", e)))?;

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| TwinError::Dispatch(format!("SMTP relay setup failed: {}", e)))?
                .port(self.config.port)
                .credentials(Credentials::new(user.to_string(), pass.to_string()))
                .build();

        mailer
            .send(message)
            .await
            .map_err(|e| TwinError::Dispatch(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }
}

/// Twilio SMS sender. An absent provider configuration is a silent no-op,
/// not a failure.
pub struct TwilioSmsSender {
    client: reqwest::Client,
    config: Option<TwilioConfig>,
}

impl TwilioSmsSender {
    pub fn new(config: Option<TwilioConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), TwinError> {
        let Some(config) = &self.config else {
            return Ok(());
        };

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            config.sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&config.sid, Some(&config.token))
            .form(&[("To", to), ("From", config.from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| TwinError::Dispatch(format!("SMS request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TwinError::Dispatch(format!(
                "SMS provider error {}: {}",
                status, text
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

const ALERT_SUBJECT: &str = "Rockfall Alert";

/// Decides whether to notify and fans out to every subscriber.
pub struct AlertEvaluator {
    email: Box<dyn EmailSender>,
    sms: Box<dyn SmsSender>,
}

impl AlertEvaluator {
    pub fn new(email: Box<dyn EmailSender>, sms: Box<dyn SmsSender>) -> Self {
        Self { email, sms }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(SmtpEmailSender::new(config.smtp.clone())),
            Box::new(TwilioSmsSender::new(config.twilio.clone())),
        )
    }

    fn format_message(assessment: &RiskAssessment) -> String {
        format!(
            "[Rockfall Alert] Risk={} ({}%). Take safety measures.",
            assessment.label.as_str().to_uppercase(),
            (assessment.score * 100.0).round() as i64
        )
    }

    /// Evaluate one cycle's assessment. Dispatches only for Medium/High;
    /// every send attempt is independent and failures never surface to the
    /// caller.
    pub async fn evaluate(&self, db: &TwinDb, assessment: &RiskAssessment) {
        if !assessment.label.is_alertable() {
            return;
        }

        let subs = match db.list_subscriptions() {
            Ok(subs) => subs,
            Err(e) => {
                log::warn!("Alert evaluation: failed to load subscriptions: {}", e);
                return;
            }
        };
        if subs.is_empty() {
            return;
        }

        let message = Self::format_message(assessment);
        let mut emails = 0u32;
        let mut texts = 0u32;

        for sub in &subs {
            if let Some(email) = &sub.email {
                match self.email.send(email, ALERT_SUBJECT, &message).await {
                    Ok(()) => emails += 1,
                    Err(e) => log::warn!("Alert email to {} failed: {}", email, e),
                }
            }
            if let Some(phone) = &sub.phone {
                match self.sms.send(phone, &message).await {
                    Ok(()) => texts += 1,
                    Err(e) => log::warn!("Alert SMS to {} failed: {}", phone, e),
                }
            }
        }

        log::info!(
            "Alert dispatch: {} class, {} subscriber(s), {} email(s), {} SMS",
            assessment.label.as_str(),
            subs.len(),
            emails,
            texts
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::db::test_util::open_temp_db;
    use crate::types::RiskLabel;

    #[derive(Default, Clone)]
    struct Recorder {
        emails: Arc<Mutex<Vec<(String, String)>>>,
        texts: Arc<Mutex<Vec<(String, String)>>>,
    }

    struct RecordingEmail(Recorder);
    struct RecordingSms(Recorder);
    struct FailingEmail(Recorder);

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), TwinError> {
            self.0
                .emails
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSender for FailingEmail {
        async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), TwinError> {
            self.0
                .emails
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Err(TwinError::Dispatch("smtp down".into()))
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSms {
        async fn send(&self, to: &str, body: &str) -> Result<(), TwinError> {
            self.0
                .texts
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn high() -> RiskAssessment {
        RiskAssessment {
            score: 0.83,
            label: RiskLabel::High,
        }
    }

    #[tokio::test]
    async fn test_high_dispatches_both_channels_once() {
        let (_dir, db) = open_temp_db();
        db.insert_subscription(Some("ops@example.com"), Some("+15550100"))
            .unwrap();

        let rec = Recorder::default();
        let evaluator = AlertEvaluator::new(
            Box::new(RecordingEmail(rec.clone())),
            Box::new(RecordingSms(rec.clone())),
        );
        evaluator.evaluate(&db, &high()).await;

        let emails = rec.emails.lock().unwrap();
        let texts = rec.texts.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(texts.len(), 1);
        assert_eq!(
            emails[0].1,
            "[Rockfall Alert] Risk=HIGH (83%). Take safety measures."
        );
        assert_eq!(texts[0].0, "+15550100");
    }

    #[tokio::test]
    async fn test_email_failure_does_not_block_sms() {
        let (_dir, db) = open_temp_db();
        db.insert_subscription(Some("ops@example.com"), Some("+15550100"))
            .unwrap();

        let rec = Recorder::default();
        let evaluator = AlertEvaluator::new(
            Box::new(FailingEmail(rec.clone())),
            Box::new(RecordingSms(rec.clone())),
        );
        evaluator.evaluate(&db, &high()).await;

        // Exactly one attempt on each channel, failure suppressed
        assert_eq!(rec.emails.lock().unwrap().len(), 1);
        assert_eq!(rec.texts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_never_dispatches() {
        let (_dir, db) = open_temp_db();
        db.insert_subscription(Some("ops@example.com"), Some("+15550100"))
            .unwrap();

        let rec = Recorder::default();
        let evaluator = AlertEvaluator::new(
            Box::new(RecordingEmail(rec.clone())),
            Box::new(RecordingSms(rec.clone())),
        );
        evaluator
            .evaluate(
                &db,
                &RiskAssessment {
                    score: 0.2,
                    label: RiskLabel::Low,
                },
            )
            .await;

        assert!(rec.emails.lock().unwrap().is_empty());
        assert!(rec.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_medium_dispatches() {
        let (_dir, db) = open_temp_db();
        db.insert_subscription(Some("ops@example.com"), None).unwrap();

        let rec = Recorder::default();
        let evaluator = AlertEvaluator::new(
            Box::new(RecordingEmail(rec.clone())),
            Box::new(RecordingSms(rec.clone())),
        );
        evaluator
            .evaluate(
                &db,
                &RiskAssessment {
                    score: 0.5,
                    label: RiskLabel::Medium,
                },
            )
            .await;

        let emails = rec.emails.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(
            emails[0].1,
            "[Rockfall Alert] Risk=MEDIUM (50%). Take safety measures."
        );
    }

    #[tokio::test]
    async fn test_contactless_subscriber_gets_nothing() {
        let (_dir, db) = open_temp_db();
        db.insert_subscription(None, None).unwrap();

        let rec = Recorder::default();
        let evaluator = AlertEvaluator::new(
            Box::new(RecordingEmail(rec.clone())),
            Box::new(RecordingSms(rec.clone())),
        );
        evaluator.evaluate(&db, &high()).await;

        assert!(rec.emails.lock().unwrap().is_empty());
        assert!(rec.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_twilio_is_noop() {
        let sender = TwilioSmsSender::new(None);
        assert!(sender.send("+15550100", "body").await.is_ok());
    }
}

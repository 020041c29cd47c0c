//! Notification formatting, preferences, and dispatch.
//!
//! The core owns the data shapes and the fan-out decision; the transports
//! themselves (an HTTP POST, an SMTP session) are external collaborators
//! behind traits that reduce every delivery to a success/failure boolean.
//! Dispatch is best-effort and partial: a failed target is skipped and the
//! remaining targets still receive their copies — there is no all-or-nothing
//! transaction and no retry here.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StoreError;
use crate::store::{DocWrite, DocumentStore, PutResult};
use crate::types::{NOTIFICATION_CONFIG_ID, NOTIFICATION_PREFS_PREFIX};

/// Event kinds a notification can describe. Users opt into kinds
/// individually via [`UserPrefs::enabled_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    AnnotationCreated,
    AnnotationReply,
    Mention,
    FileChanged,
}

/// A notification ready for formatting: plain data, no transport detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub title: String,
    pub body: String,
    /// Username that caused the event. Never notified about their own action.
    pub actor: String,
    /// Usernames to deliver to.
    pub targets: Vec<String>,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Payload dialects spoken by the supported webhook consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPlatform {
    Slack,
    Discord,
    Teams,
    Generic,
}

/// One configured webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub platform: WebhookPlatform,
    pub enabled: bool,
}

/// SMTP relay settings for email delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub enabled: bool,
}

/// The team-wide notification configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhooks: Vec<WebhookConfig>,
    pub smtp: SmtpConfig,
}

/// Per-channel opt-ins inside a user's preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPrefs {
    pub webhook: bool,
    pub email: bool,
}

/// One user's notification preferences document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub enabled_events: Vec<NotificationEvent>,
    pub channels: ChannelPrefs,
}

/// Formats the webhook payload for one platform.
///
/// Each consumer expects a different shape: a chat-style summary object for
/// Slack, an embed object for Discord, a MessageCard for Teams, and a
/// generic passthrough of the notification record otherwise.
pub fn webhook_payload(platform: WebhookPlatform, n: &Notification) -> serde_json::Value {
    match platform {
        WebhookPlatform::Slack => json!({
            "text": format!("*{}*\n{}", n.title, n.body),
            "username": "NoteSync Team",
        }),
        WebhookPlatform::Discord => json!({
            "embeds": [{
                "title": n.title,
                "description": n.body,
                "color": 0x7c3aed,
                "timestamp": rfc3339(n.timestamp),
                "footer": { "text": format!("by {}", n.actor) },
            }],
        }),
        WebhookPlatform::Teams => json!({
            "@type": "MessageCard",
            "@context": "https://schema.org/extensions",
            "summary": n.title,
            "themeColor": "7c3aed",
            "title": n.title,
            "sections": [{
                "activityTitle": n.actor,
                "text": n.body,
            }],
        }),
        WebhookPlatform::Generic => json!({
            "type": n.event,
            "title": n.title,
            "body": n.body,
            "actor": n.actor,
            "targets": n.targets,
            "timestamp": n.timestamp,
            "metadata": n.metadata,
        }),
    }
}

/// Formats the subject and plain-text body for an email delivery.
pub fn email_subject_body(n: &Notification) -> (String, String) {
    let subject = format!("[NoteSync] {}", n.title);
    let body = format!("{}\r\n\r\n— {}, {}", n.body, n.actor, rfc3339(n.timestamp));
    (subject, body)
}

/// Assembles a complete RFC 5322 message for SMTP submission.
pub fn build_email(from: &str, to: &str, subject: &str, body: &str) -> String {
    let date = Utc::now().to_rfc2822();
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nDate: {date}\r\n\
         MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    )
}

fn rfc3339(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Delivers a formatted payload to one webhook endpoint.
///
/// Implementations catch their own transport failures and reduce them to
/// `false`; dispatch never sees an error from a transport.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn deliver(&self, config: &WebhookConfig, payload: &serde_json::Value) -> bool;
}

/// Submits a complete mail message to one recipient via the configured relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, config: &SmtpConfig, to: &str, message: &str) -> bool;
}

/// Store facade for the notification config and per-user preference docs.
pub struct NotificationStore<S> {
    store: S,
}

impl<S: DocumentStore> NotificationStore<S> {
    pub fn new(store: S) -> Self {
        NotificationStore { store }
    }

    fn prefs_id(username: &str) -> String {
        format!("{NOTIFICATION_PREFS_PREFIX}{username}")
    }

    pub async fn get_config(&self) -> Result<Option<NotificationConfig>, StoreError> {
        let Some(doc) = self.store.fetch(NOTIFICATION_CONFIG_ID, None).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&doc.body) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                tracing::warn!(error = %e, "malformed notification config; treating as absent");
                Ok(None)
            }
        }
    }

    pub async fn save_config(&self, config: &NotificationConfig) -> Result<bool, StoreError> {
        let existing_rev = self
            .store
            .fetch(NOTIFICATION_CONFIG_ID, None)
            .await?
            .map(|doc| doc.rev);
        let write = DocWrite {
            id: NOTIFICATION_CONFIG_ID.to_owned(),
            expected_rev: existing_rev,
            body: serde_json::to_string(config)?,
            modified_by: String::new(),
        };
        Ok(matches!(self.store.put(write).await?, PutResult::Stored { .. }))
    }

    pub async fn get_prefs(&self, username: &str) -> Result<Option<UserPrefs>, StoreError> {
        let Some(doc) = self.store.fetch(&Self::prefs_id(username), None).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&doc.body) {
            Ok(prefs) => Ok(Some(prefs)),
            Err(e) => {
                tracing::warn!(username, error = %e, "malformed notification prefs; treating as absent");
                Ok(None)
            }
        }
    }

    pub async fn save_prefs(&self, username: &str, prefs: &UserPrefs) -> Result<bool, StoreError> {
        let id = Self::prefs_id(username);
        let existing_rev = self.store.fetch(&id, None).await?.map(|doc| doc.rev);
        let write = DocWrite {
            id,
            expected_rev: existing_rev,
            body: serde_json::to_string(prefs)?,
            modified_by: username.to_owned(),
        };
        Ok(matches!(self.store.put(write).await?, PutResult::Stored { .. }))
    }

    pub async fn all_prefs(&self) -> Result<Vec<(String, UserPrefs)>, StoreError> {
        let docs = self.store.list_by_prefix(NOTIFICATION_PREFS_PREFIX).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let username = doc.id.strip_prefix(NOTIFICATION_PREFS_PREFIX)?.to_owned();
                match serde_json::from_str(&doc.body) {
                    Ok(prefs) => Some((username, prefs)),
                    Err(e) => {
                        tracing::warn!(id = %doc.id, error = %e, "skipping malformed prefs record");
                        None
                    }
                }
            })
            .collect())
    }
}

/// Delivery counters returned by one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans one notification out to its targets through the configured channels.
pub struct NotificationService<S, W, M> {
    store: NotificationStore<S>,
    webhook: W,
    mail: M,
}

impl<S, W, M> NotificationService<S, W, M>
where
    S: DocumentStore,
    W: WebhookTransport,
    M: MailTransport,
{
    pub fn new(store: NotificationStore<S>, webhook: W, mail: M) -> Self {
        NotificationService { store, webhook, mail }
    }

    /// Delivers `notification` to every eligible target.
    ///
    /// Per target: the actor is skipped, absent preferences mean no
    /// delivery, and the event kind must be in the target's enabled set.
    /// Webhook deliveries go to every enabled endpoint; email goes to the
    /// target's address when both sides have it enabled. A failed delivery
    /// increments `failed` and dispatch continues with the rest.
    pub async fn dispatch(
        &self,
        notification: &Notification,
    ) -> Result<DispatchOutcome, StoreError> {
        let mut outcome = DispatchOutcome::default();
        let Some(config) = self.store.get_config().await? else { return Ok(outcome) };

        for target in &notification.targets {
            if *target == notification.actor {
                continue;
            }
            let Some(prefs) = self.store.get_prefs(target).await? else { continue };
            if !prefs.enabled_events.contains(&notification.event) {
                continue;
            }

            if prefs.channels.webhook {
                for webhook in &config.webhooks {
                    if !webhook.enabled {
                        continue;
                    }
                    let payload = webhook_payload(webhook.platform, notification);
                    if self.webhook.deliver(webhook, &payload).await {
                        outcome.delivered += 1;
                    } else {
                        outcome.failed += 1;
                        tracing::warn!(url = %webhook.url, "webhook delivery failed; continuing");
                    }
                }
            }

            if prefs.channels.email && config.smtp.enabled {
                if let Some(address) = &prefs.email {
                    let (subject, body) = email_subject_body(notification);
                    let message =
                        build_email(&config.smtp.from_address, address, &subject, &body);
                    if self.mail.deliver(&config.smtp, address, &message).await {
                        outcome.delivered += 1;
                    } else {
                        outcome.failed += 1;
                        tracing::warn!(target = %target, "email delivery failed; continuing");
                    }
                }
            }
        }

        Ok(outcome)
    }
}

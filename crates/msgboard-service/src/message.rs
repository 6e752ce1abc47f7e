//! The `Message` record and the payloads that create and patch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message on the board.
///
/// `id` and `created_at` are fixed at creation. `updated_at` stays `None`
/// until the first update and is always set by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "attachmentURL", default)]
    pub attachment_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for a new message. Missing fields default to "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMessage {
    pub title: String,
    pub body: String,
    #[serde(rename = "attachmentURL")]
    pub attachment_url: String,
}

/// Partial update. Absent fields keep their stored value.
///
/// Only the editable fields exist here, so `id`, `createdAt`, and
/// `updatedAt` in an incoming payload are dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "attachmentURL", default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

impl NewMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into(), attachment_url: String::new() }
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = url.into();
        self
    }
}

impl MessagePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    pub fn body(body: impl Into<String>) -> Self {
        Self { body: Some(body.into()), ..Self::default() }
    }

    pub fn attachment_url(url: impl Into<String>) -> Self {
        Self { attachment_url: Some(url.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.attachment_url.is_none()
    }
}

impl Message {
    /// Build a fresh record from caller fields plus server-assigned ones.
    pub fn create(id: String, fields: NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            body: fields.body,
            attachment_url: fields.attachment_url,
            created_at,
            updated_at: None,
        }
    }

    /// Merge `patch` field by field and stamp `updated_at`.
    ///
    /// The stamp is never earlier than `created_at` or the previous
    /// `updated_at`, even if `now` is.
    pub fn apply(&mut self, patch: MessagePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(url) = patch.attachment_url {
            self.attachment_url = url;
        }

        let floor = self.updated_at.unwrap_or(self.created_at);
        self.updated_at = Some(now.max(floor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample() -> Message {
        Message::create(
            "id-1".into(),
            NewMessage::new("Board update", "Meeting at noon").with_attachment("https://x/y.png"),
            t(0),
        )
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "id-1");
        assert_eq!(json["attachmentURL"], "https://x/y.png");
        assert!(json["createdAt"].is_string());
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_new_message_defaults() {
        let fields: NewMessage = serde_json::from_str(r#"{"title":"only title"}"#).unwrap();
        assert_eq!(fields.title, "only title");
        assert_eq!(fields.body, "");
        assert_eq!(fields.attachment_url, "");
    }

    #[test]
    fn test_patch_ignores_server_fields() {
        let patch: MessagePatch = serde_json::from_str(
            r#"{"id":"evil","createdAt":"2001-01-01T00:00:00Z","updatedAt":"2001-01-01T00:00:00Z","body":"x"}"#,
        ).unwrap();
        assert_eq!(patch, MessagePatch::body("x"));
    }

    #[test]
    fn test_apply_merges_present_fields_only() {
        let mut msg = sample();
        msg.apply(MessagePatch::body("Meeting at 1pm"), t(60));

        assert_eq!(msg.title, "Board update");
        assert_eq!(msg.body, "Meeting at 1pm");
        assert_eq!(msg.attachment_url, "https://x/y.png");
        assert_eq!(msg.created_at, t(0));
        assert_eq!(msg.updated_at, Some(t(60)));
    }

    #[test]
    fn test_apply_empty_patch_still_stamps() {
        let mut msg = sample();
        msg.apply(MessagePatch::default(), t(5));
        assert_eq!(msg.updated_at, Some(t(5)));
    }

    #[test]
    fn test_updated_at_never_moves_backwards() {
        let mut msg = sample();
        msg.apply(MessagePatch::title("a"), t(100));
        msg.apply(MessagePatch::title("b"), t(100) - Duration::seconds(30));
        assert_eq!(msg.updated_at, Some(t(100)));

        let mut fresh = sample();
        fresh.apply(MessagePatch::title("c"), t(-10));
        assert_eq!(fresh.updated_at, Some(t(0)));
    }

    #[test]
    fn test_record_json_roundtrip_is_exact() {
        let mut msg = sample();
        msg.apply(MessagePatch::title("x"), Utc::now());
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, msg);
    }
}

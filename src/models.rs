use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named class of data source with its own authorization requirement.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Contacts,
    Messages,
    CallHistory,
    Media,
    Documents,
}

impl Category {
    /// All categories in collection order
    pub const ALL: [Category; 5] = [
        Category::Contacts,
        Category::Messages,
        Category::CallHistory,
        Category::Media,
        Category::Documents,
    ];

    /// Categories that may be replaced by sample data in sample mode
    pub fn supports_fallback(&self) -> bool {
        matches!(self, Category::Contacts | Category::Messages | Category::CallHistory)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Contacts => write!(f, "contacts"),
            Category::Messages => write!(f, "messages"),
            Category::CallHistory => write!(f, "call_history"),
            Category::Media => write!(f, "media"),
            Category::Documents => write!(f, "documents"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Direction/category label of a text message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Received,
    Sent,
    Draft,
    Outbox,
    Other,
}

impl MessageKind {
    /// Map the provider's numeric message type column
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MessageKind::Received,
            2 => MessageKind::Sent,
            3 => MessageKind::Draft,
            4 => MessageKind::Outbox,
            _ => MessageKind::Other,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub address: String,
    pub body: String,
    #[serde(rename = "date")]
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Call-type label of a call history entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Incoming,
    Outgoing,
    Missed,
    Voicemail,
    Rejected,
    Blocked,
    Other,
}

impl CallKind {
    /// Map the provider's numeric call type column
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CallKind::Incoming,
            2 => CallKind::Outgoing,
            3 => CallKind::Missed,
            4 => CallKind::Voicemail,
            5 => CallKind::Rejected,
            6 => CallKind::Blocked,
            _ => CallKind::Other,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub number: String,
    /// Cached caller name; never `Some("")`. Private so every value goes
    /// through `new` or deserialization, which both normalize it.
    #[serde(with = "empty_as_none")]
    name: Option<String>,
    #[serde(rename = "date")]
    pub timestamp: i64,
    pub duration: u64,
    #[serde(rename = "type")]
    pub kind: CallKind,
}

impl CallRecord {
    pub fn new(number: String, name: Option<String>, timestamp: i64, duration: u64, kind: CallKind) -> Self {
        Self {
            number,
            name: name.filter(|n| !n.is_empty()),
            timestamp,
            duration,
            kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The three independent media streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Audio];

    /// MIME type recorded when the index has none
    pub fn default_mime(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/*",
            MediaKind::Video => "video/*",
            MediaKind::Audio => "audio/*",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFileRecord {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub date_added: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
    pub sdk_version: u32,
}

/// Aggregate of one collection run. Field order is the wire order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub contacts: Vec<ContactRecord>,
    #[serde(rename = "sms")]
    pub messages: Vec<MessageRecord>,
    #[serde(rename = "callLogs")]
    pub calls: Vec<CallRecord>,
    #[serde(rename = "mediaFiles")]
    pub media_files: Vec<MediaFileRecord>,
    pub documents: Vec<DocumentRecord>,
    #[serde(rename = "deviceInfo")]
    pub device: DeviceInfo,
}

impl Snapshot {
    /// A snapshot with every collection empty
    pub fn empty(device: DeviceInfo) -> Self {
        Self {
            device,
            ..Default::default()
        }
    }

    /// Number of records in a category
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Contacts => self.contacts.len(),
            Category::Messages => self.messages.len(),
            Category::CallHistory => self.calls.len(),
            Category::Media => self.media_files.len(),
            Category::Documents => self.documents.len(),
        }
    }
}

/// Serializes `None` as `""` and reads `""` back as `None`.
mod empty_as_none {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

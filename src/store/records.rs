use crate::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// The accumulated transcript of one webinar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Row identifier; the managed store may hand out numeric or UUID keys
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    pub webinar_id: String,

    /// Every fragment received so far, space-separated
    pub transcript: String,

    pub created_at: DateTime<Utc>,

    /// Doubles as the version token for conditional writes
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// A scheduled live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webinar {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub host_name: String,
    /// Video room this webinar binds to; unique across webinars
    pub room_name: String,
}

/// Payload for scheduling a webinar
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWebinar {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub room_name: Option<String>,
}

impl NewWebinar {
    /// Validate the form and assign an id and room name.
    pub fn into_webinar(self) -> Result<Webinar> {
        let title = self.title.trim();
        let description = self.description.trim();
        let host_name = self.host_name.trim();

        for (field, value) in [
            ("title", title),
            ("description", description),
            ("hostName", host_name),
        ] {
            if value.is_empty() {
                return Err(AgentError::validation(format!("{} is required", field)));
            }
        }

        let id = Uuid::new_v4();
        let room_name = match self.room_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let suffix = id.simple().to_string();
                let slug = slugify(title);
                if slug.is_empty() {
                    format!("webinar-{}", &suffix[..8])
                } else {
                    format!("{}-{}", slug, &suffix[..8])
                }
            }
        };

        Ok(Webinar {
            id,
            title: title.to_string(),
            description: description.to_string(),
            start_time: self.start_time,
            host_name: host_name.to_string(),
            room_name,
        })
    }
}

/// Lowercase ASCII slug; runs of anything else collapse to a single `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type ChapterId = u64;
pub type StoryId = u64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
}

/// One chapter as the content store holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterPost {
    pub id: ChapterId,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "lenient_word_count")]
    pub word_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Read-only story input: the authoritative chapter order plus per-story display flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryContext {
    pub id: StoryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chapter_ids: Vec<ChapterId>,
    #[serde(default)]
    pub hide_icons: bool,
    #[serde(default)]
    pub disable_groups: bool,
    #[serde(default)]
    pub disable_folding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryFile {
    pub story: StoryContext,
    #[serde(default)]
    pub chapters: Vec<ChapterPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub fragment: String,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// Word counts come from free-form meta; anything that is not a non-negative
// integer reads as zero.
fn lenient_word_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(word_count_from_value(&value))
}

fn word_count_from_value(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => {
            let digits = s.trim().replace(',', "");
            digits.parse::<u64>().unwrap_or(0)
        }
        _ => 0,
    }
}

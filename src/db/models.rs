use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

pub const TITLE_MAX_CHARS: usize = 200;
pub const AUTHOR_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub published_date: DateTime<Utc>,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub text: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_date: DateTime<Utc>,
    pub flagged: bool,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comment by {}", self.author_name)
    }
}

/// Row of the moderation queue: a flagged comment plus the title of its post.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlaggedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub post_title: String,
}

/// Storage and wire form for timestamps: RFC3339, microseconds, `+00:00`.
/// Fixed width keeps lexical order equal to chronological order in SQLite.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

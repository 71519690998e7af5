//! Front-matter parsing for markdown post files

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::post::{DocumentId, Media, Meta, PostDocument, Relation, Status};

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter of a markdown post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// Defaults to the file stem
    pub slug: Option<String>,
    /// Publish date
    pub date: Option<String>,
    pub updated: Option<String>,
    pub draft: bool,
    pub hero_image: Option<String>,
    pub hero_alt: Option<String>,
    pub description: Option<String>,
    pub meta_title: Option<String>,
    /// Slugs of related posts
    #[serde(deserialize_with = "string_or_vec")]
    pub related: Vec<String>,
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let trimmed = content.trim_start();

        let Some(rest) = trimmed.strip_prefix("---") else {
            return Ok((FrontMatter::default(), content));
        };
        let rest = rest.trim_start_matches(['\n', '\r']);

        let Some(end_pos) = rest.find("\n---") else {
            return Err(anyhow!("Unterminated front-matter block"));
        };

        let yaml = &rest[..end_pos];
        let body = rest[end_pos + 4..].trim_start_matches(['\n', '\r']);

        if yaml.trim().is_empty() {
            return Ok((FrontMatter::default(), body));
        }

        let fm: FrontMatter = serde_yaml::from_str(yaml)
            .map_err(|e| anyhow!("Failed to parse YAML front-matter: {}", e))?;
        Ok((fm, body))
    }

    pub fn parse_date(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_date_string)
    }

    pub fn parse_updated(&self) -> Option<DateTime<Utc>> {
        self.updated.as_deref().and_then(parse_date_string)
    }

    /// Build a store document from this front-matter and the markdown body.
    /// Related slugs stay unresolved until the store links them.
    pub fn into_document(self, file_stem: &str, body: &str) -> PostDocument {
        let slug = self
            .slug
            .clone()
            .unwrap_or_else(|| slug::slugify(file_stem));
        let published_at = self.parse_date();
        let updated_at = self.parse_updated();

        let hero_image = self.hero_image.map(|url| {
            Relation::Resolved(Media {
                url: Some(url),
                alt: self.hero_alt,
                ..Media::default()
            })
        });

        let meta = Meta {
            title: self.meta_title,
            description: self.description,
            image: hero_image.clone(),
        };

        PostDocument {
            id: DocumentId::new(slug.clone()),
            title: self.title.unwrap_or_else(|| file_stem.to_string()),
            slug: Some(slug),
            hero_image,
            content: None,
            markdown_content: Some(body.to_string()),
            related_posts: Some(
                self.related
                    .into_iter()
                    .map(|s| Relation::Unresolved(DocumentId::new(s)))
                    .collect(),
            ),
            comments: None,
            meta: Some(meta),
            published_at,
            created_at: published_at,
            updated_at,
            status: Some(if self.draft {
                Status::Draft
            } else {
                Status::Published
            }),
        }
    }
}

/// Parse a date string in the formats people actually type into front-matter
fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

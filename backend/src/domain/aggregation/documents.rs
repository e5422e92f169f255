//! Stored document shapes and their conversion to domain types.
//!
//! Field names follow the backend's existing documents (`coverImageUrl`,
//! `social_ig`, `savedZines`, ...). Empty strings written as placeholders
//! read back as `None`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;
use url::Url;

use crate::domain::ports::{DocumentSnapshot, DocumentStoreError, DocumentWrite, timestamp_value};
use crate::domain::{
    DEFAULT_ZINE_KIND, Flower, FlowerAsset, FlowerId, NewZine, ProfileSeed, Tag, TagCategory,
    TagId, UserId, UserProfile, Zine, ZineId,
};

pub(crate) const ARTIST_ID: &str = "artistId";
pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const SAVED_ZINES: &str = "savedZines";
pub(crate) const TO_ZINE_ID: &str = "toZineId";
pub(crate) const TO_USER_ID: &str = "toUserId";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn parse_id<T, E>(
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, DocumentStoreError>
where
    E: std::fmt::Display,
{
    parse(raw).map_err(|err| DocumentStoreError::decode(format!("document id {raw:?}: {err}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZineDocument {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cover_image_url: String,
    artist_id: UserId,
    created_at: Option<DateTime<Utc>>,
    pages: Option<u32>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
    link: Option<String>,
}

pub(crate) fn decode_zine(snapshot: &DocumentSnapshot) -> Result<Zine, DocumentStoreError> {
    let id = parse_id(&snapshot.id, |raw| ZineId::new(raw))?;
    let document: ZineDocument = snapshot.decode()?;
    Ok(Zine {
        id,
        title: document.title,
        description: document.description,
        cover_image_url: document.cover_image_url,
        artist_id: document.artist_id,
        created_at: document.created_at,
        pages: document.pages,
        published_at: document.published_at,
        tags: stored_tags(&snapshot.id, &document.tags),
        kind: non_empty(document.kind),
        link: non_empty(document.link),
    })
}

/// Canonical tag ids of a stored zine.
///
/// Older documents carry display names such as `Comics`; those are
/// canonicalised. Entries that cannot be are dropped.
fn stored_tags(zine_id: &str, values: &[Value]) -> BTreeSet<TagId> {
    values
        .iter()
        .filter_map(|value| {
            let tag = value.as_str().and_then(|raw| TagId::canonicalise(raw).ok());
            if tag.is_none() {
                warn!(zine_id, tag = %value, "dropping malformed zine tag");
            }
            tag
        })
        .collect()
}

/// Owner of a stored zine, read without decoding the other fields.
pub(crate) fn zine_artist(snapshot: &DocumentSnapshot) -> Result<UserId, DocumentStoreError> {
    let raw = snapshot
        .field(ARTIST_ID)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DocumentStoreError::decode(format!("zine {:?} has no artistId", snapshot.id))
        })?;
    parse_id(raw, |raw| UserId::new(raw))
}

/// Fields of a freshly created zine; `createdAt` is left to the server.
pub(crate) fn zine_creation_write(
    artist: &UserId,
    fields: &NewZine,
    cover_url: &Url,
) -> DocumentWrite {
    let tags: Vec<Value> = fields
        .tags
        .iter()
        .map(|tag| Value::from(tag.as_str()))
        .collect();
    let mut write = DocumentWrite::new()
        .value("title", fields.title.trim())
        .value("description", fields.description.as_str())
        .value("coverImageUrl", cover_url.as_str())
        .value(ARTIST_ID, artist.as_str())
        .server_timestamp(CREATED_AT)
        .value("tags", tags)
        .value("type", DEFAULT_ZINE_KIND)
        .value("link", "");
    if let Some(pages) = fields.pages {
        write = write.value("pages", pages);
    }
    if let Some(published_at) = fields.published_at {
        write = write.value("publishedAt", timestamp_value(published_at));
    }
    write
}

/// Zine as written, for when the stored copy cannot be read back.
pub(crate) fn zine_from_creation(
    id: ZineId,
    artist: &UserId,
    fields: NewZine,
    cover_url: &Url,
) -> Zine {
    Zine {
        id,
        title: fields.title.trim().to_owned(),
        description: fields.description,
        cover_image_url: cover_url.to_string(),
        artist_id: artist.clone(),
        created_at: None,
        pages: fields.pages,
        published_at: fields.published_at,
        tags: fields.tags,
        kind: Some(DEFAULT_ZINE_KIND.to_owned()),
        link: None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDocument {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    about_me: String,
    avatar: Option<String>,
    #[serde(rename = "social_ig")]
    social_ig: Option<String>,
    #[serde(rename = "social_twi")]
    social_twi: Option<String>,
    #[serde(rename = "social_web")]
    social_web: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

pub(crate) fn decode_profile(
    snapshot: &DocumentSnapshot,
) -> Result<UserProfile, DocumentStoreError> {
    let id = parse_id(&snapshot.id, |raw| UserId::new(raw))?;
    let document: ProfileDocument = snapshot.decode()?;
    Ok(UserProfile {
        id,
        display_name: document.display_name,
        about_me: document.about_me,
        avatar: non_empty(document.avatar),
        social_ig: non_empty(document.social_ig),
        social_twi: non_empty(document.social_twi),
        social_web: non_empty(document.social_web),
        created_at: document.created_at,
    })
}

/// Empty-default profile written on first sign-in.
pub(crate) fn profile_creation_write(seed: &ProfileSeed) -> DocumentWrite {
    DocumentWrite::new()
        .value("displayName", seed.display_name.clone().unwrap_or_default())
        .value("email", seed.email.clone().unwrap_or_default())
        .value("avatar", "")
        .value("aboutMe", "")
        .value("social_ig", "")
        .value("social_twi", "")
        .value("social_web", "")
        .value(SAVED_ZINES, json!([]))
        .value("publishedZines", json!([]))
        .server_timestamp(CREATED_AT)
}

/// Zine ids stored on a profile document.
///
/// Malformed entries are dropped rather than failing the whole read.
pub(crate) fn saved_zine_ids(snapshot: &DocumentSnapshot) -> Vec<ZineId> {
    let Some(Value::Array(values)) = snapshot.field(SAVED_ZINES) else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    values
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|raw| ZineId::new(raw).ok())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowerDocument {
    from_user_id: UserId,
    to_zine_id: ZineId,
    to_user_id: UserId,
    #[serde(default)]
    assets_type: FlowerAsset,
    #[serde(default)]
    message: String,
    created_at: Option<DateTime<Utc>>,
}

pub(crate) fn decode_flower(snapshot: &DocumentSnapshot) -> Result<Flower, DocumentStoreError> {
    let id = parse_id(&snapshot.id, |raw| FlowerId::new(raw))?;
    let document: FlowerDocument = snapshot.decode()?;
    Ok(Flower {
        id,
        from_user_id: document.from_user_id,
        to_zine_id: document.to_zine_id,
        to_user_id: document.to_user_id,
        assets_type: document.assets_type,
        message: document.message,
        created_at: document.created_at,
    })
}

pub(crate) fn flower_creation_write(
    sender: &UserId,
    zine_id: &ZineId,
    recipient: &UserId,
    assets_type: FlowerAsset,
    message: &str,
) -> DocumentWrite {
    DocumentWrite::new()
        .value("fromUserId", sender.as_str())
        .value(TO_ZINE_ID, zine_id.as_str())
        .value(TO_USER_ID, recipient.as_str())
        .value("assetsType", assets_type.get())
        .value("message", message)
        .server_timestamp(CREATED_AT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagDocument {
    display_name: String,
    category: TagCategory,
    created_at: Option<DateTime<Utc>>,
}

pub(crate) fn decode_tag(snapshot: &DocumentSnapshot) -> Result<Tag, DocumentStoreError> {
    let id = parse_id(&snapshot.id, |raw| TagId::new(raw))?;
    let document: TagDocument = snapshot.decode()?;
    Ok(Tag {
        id,
        display_name: document.display_name,
        category: document.category,
        created_at: document.created_at,
    })
}

use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::constants::{HTTP_TIMEOUT_SECS, VK_API_BASE, VK_API_VERSION, VK_MIN_THUMB_HEIGHT};
use crate::util::env::{EnvErr, Var};
use crate::var;

static CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("reqwest client construction")
});

pub struct Vk;

impl Vk {
    #[instrument(skip(query))]
    /// Run a `video.search` call against the VK API and map the response
    /// items into the simplified video shape.
    ///
    /// VK reports failures inside a 200 response, as an `error` object next
    /// to the usual `response` envelope; those surface as [`VkErr::Api`].
    pub async fn search(query: &str, count: i64) -> VkResult<Vec<VkVideo>> {
        let token = var!(Var::VkServiceToken).await?;
        let count = count.to_string();

        let res = CLIENT
            .get(format!("{VK_API_BASE}/video.search"))
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("adult", "0"),
                ("access_token", token),
                ("v", VK_API_VERSION),
            ])
            .send()
            .await?;

        let envelope = res.json::<VkEnvelope>().await?;
        if let Some(error) = envelope.error {
            tracing::error!(code = ?error.error_code, "error envelope in vk response");
            return Err(VkErr::Api(
                error.error_msg.unwrap_or_else(|| String::from("VK API error")),
            ));
        }

        let items = envelope.response.map(|r| r.items).unwrap_or_default();
        tracing::debug!(item_count = items.len(), "fetched vk search results");

        Ok(items.into_iter().map(VkVideo::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct VkEnvelope {
    response: Option<VkItemList>,
    error: Option<VkApiError>,
}

#[derive(Debug, Deserialize)]
struct VkItemList {
    #[serde(default)]
    items: Vec<VkItem>,
}

#[derive(Debug, Deserialize)]
struct VkApiError {
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VkItem {
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub id: i64,
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub date: i64,
    pub image: Option<Vec<VkImageSize>>,
    pub first_frame: Option<Vec<VkImageSize>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VkImageSize {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub height: i64,
}

/// The reshaped video entry returned to our own callers.
#[derive(Debug, Clone, Serialize)]
pub struct VkVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: i64,
    pub views: i64,
    pub thumbnail: String,
    pub player: String,
    pub date: i64,
}

impl From<VkItem> for VkVideo {
    fn from(item: VkItem) -> Self {
        let thumbnail = pick_thumbnail(&item);

        Self {
            // VK videos are globally addressed as "{owner_id}_{video_id}"
            id: format!("{}_{}", item.owner_id, item.id),
            title: item.title.unwrap_or_else(|| String::from("Untitled")),
            description: item.description,
            duration: item.duration,
            views: item.views,
            thumbnail,
            player: item.player,
            date: item.date,
        }
    }
}

/// First preview at least 240 px tall, preferring `image` over
/// `first_frame`; empty string when neither carries a usable size.
fn pick_thumbnail(item: &VkItem) -> String {
    [&item.image, &item.first_frame]
        .into_iter()
        .flatten()
        .find_map(|sizes| {
            sizes
                .iter()
                .find(|size| size.height >= VK_MIN_THUMB_HEIGHT)
                .map(|size| size.url.clone())
        })
        .unwrap_or_default()
}

pub type VkResult<T> = core::result::Result<T, VkErr>;

#[derive(Debug, Error)]
pub enum VkErr {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Env(#[from] EnvErr),

    #[error("{0}")]
    Api(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_item() -> VkItem {
        serde_json::from_value(serde_json::json!({
            "owner_id": -1234,
            "id": 5678,
            "title": "a stream vod",
            "description": "desc",
            "duration": 95,
            "views": 1000,
            "player": "https://vk.com/video_ext.php?oid=-1234&id=5678",
            "date": 1700000000,
            "image": [
                { "url": "https://img.vk.com/small.jpg", "height": 120 },
                { "url": "https://img.vk.com/medium.jpg", "height": 240 },
                { "url": "https://img.vk.com/large.jpg", "height": 480 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_video_id_combines_owner_and_id() {
        let video = VkVideo::from(sample_item());
        assert_eq!(video.id, "-1234_5678");
        assert_eq!(video.title, "a stream vod");
        assert_eq!(video.views, 1000);
    }

    #[test]
    fn test_thumbnail_skips_small_sizes() {
        let video = VkVideo::from(sample_item());
        assert_eq!(video.thumbnail, "https://img.vk.com/medium.jpg");
    }

    #[test]
    fn test_thumbnail_falls_back_to_first_frame() {
        let mut item = sample_item();
        item.image = Some(vec![VkImageSize {
            url: String::from("https://img.vk.com/tiny.jpg"),
            height: 100,
        }]);
        item.first_frame = Some(vec![VkImageSize {
            url: String::from("https://img.vk.com/frame.jpg"),
            height: 320,
        }]);

        assert_eq!(pick_thumbnail(&item), "https://img.vk.com/frame.jpg");
    }

    #[test]
    fn test_thumbnail_empty_when_nothing_usable() {
        let mut item = sample_item();
        item.image = None;
        item.first_frame = None;
        assert_eq!(pick_thumbnail(&item), "");
    }

    #[test]
    fn test_untitled_default() {
        let mut item = sample_item();
        item.title = None;
        assert_eq!(VkVideo::from(item).title, "Untitled");
    }

    #[test]
    fn test_error_envelope_deserializes() {
        let envelope: VkEnvelope = serde_json::from_str(
            r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#,
        )
        .unwrap();

        let error = envelope.error.unwrap();
        assert_eq!(error.error_code, Some(5));
        assert_eq!(error.error_msg.as_deref(), Some("User authorization failed"));
        assert!(envelope.response.is_none());
    }
}

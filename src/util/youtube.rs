use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::constants::{HTTP_TIMEOUT_SECS, YOUTUBE_API_BASE};
use crate::util::env::{EnvErr, Var};
use crate::var;

static CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("reqwest client construction")
});

pub struct Youtube;

impl Youtube {
    #[instrument(skip(query))]
    /// Run a `search.list` call against the YouTube Data API and map each
    /// returned item into the simplified video shape.
    ///
    /// A non-2xx vendor response is carried back verbatim (status + body) so
    /// the route layer can pass it through.
    pub async fn search(query: &str, max_results: i64) -> YoutubeResult<Vec<YoutubeVideo>> {
        let key = var!(Var::YoutubeApiKey).await?;
        let max_results = max_results.to_string();

        let res = CLIENT
            .get(format!("{YOUTUBE_API_BASE}/search"))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", key),
                ("videoEmbeddable", "true"),
                ("safeSearch", "moderate"),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            tracing::error!(code = %status, "non-2xx response from youtube");
            return Err(YoutubeErr::Vendor {
                status: status.as_u16(),
                body,
            });
        }

        let listing = res.json::<YoutubeListing>().await?;
        tracing::debug!(item_count = listing.items.len(), "fetched youtube search results");

        // search results without a videoId (channels, playlists) carry
        // nothing playable and are dropped
        Ok(listing
            .items
            .into_iter()
            .filter_map(YoutubeVideo::from_item)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct YoutubeListing {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YoutubeItem {
    #[serde(default)]
    pub id: YoutubeItemId,
    #[serde(default)]
    pub snippet: YoutubeSnippet,
}

#[derive(Debug, Default, Deserialize)]
pub struct YoutubeItemId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YoutubeSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: YoutubeThumbnails,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "publishedAt", default)]
    pub published_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct YoutubeThumbnails {
    #[serde(default)]
    pub medium: YoutubeThumbnail,
}

#[derive(Debug, Default, Deserialize)]
pub struct YoutubeThumbnail {
    #[serde(default)]
    pub url: String,
}

/// The reshaped video entry returned to our own callers.
#[derive(Debug, Clone, Serialize)]
pub struct YoutubeVideo {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub description: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
}

impl YoutubeVideo {
    fn from_item(item: YoutubeItem) -> Option<Self> {
        let id = item.id.video_id?;
        let snippet = item.snippet;

        Some(Self {
            id,
            title: snippet.title,
            channel: snippet.channel_title,
            thumbnail: snippet.thumbnails.medium.url,
            description: snippet.description,
            published_at: snippet.published_at,
        })
    }
}

pub type YoutubeResult<T> = core::result::Result<T, YoutubeErr>;

#[derive(Debug, Error)]
pub enum YoutubeErr {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Env(#[from] EnvErr),

    #[error("youtube api error ({status}): {body}")]
    Vendor { status: u16, body: String },
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_listing() -> YoutubeListing {
        serde_json::from_value(serde_json::json!({
            "kind": "youtube#searchListResponse",
            "items": [
                {
                    "id": { "kind": "youtube#video", "videoId": "dQw4w9WgXcQ" },
                    "snippet": {
                        "title": "a video",
                        "channelTitle": "a channel",
                        "description": "words",
                        "publishedAt": "2024-05-01T00:00:00Z",
                        "thumbnails": {
                            "default": { "url": "https://i.ytimg.com/default.jpg" },
                            "medium": { "url": "https://i.ytimg.com/medium.jpg" }
                        }
                    }
                },
                {
                    "id": { "kind": "youtube#channel", "channelId": "UCabc" },
                    "snippet": { "title": "just a channel" }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_items_without_video_id_are_dropped() {
        let videos: Vec<_> = sample_listing()
            .items
            .into_iter()
            .filter_map(YoutubeVideo::from_item)
            .collect();

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_snippet_mapping() {
        let videos: Vec<_> = sample_listing()
            .items
            .into_iter()
            .filter_map(YoutubeVideo::from_item)
            .collect();

        let video = &videos[0];
        assert_eq!(video.title, "a video");
        assert_eq!(video.channel, "a channel");
        assert_eq!(video.thumbnail, "https://i.ytimg.com/medium.jpg");
        assert_eq!(video.published_at, "2024-05-01T00:00:00Z");
    }

    #[test]
    fn test_published_at_serializes_camel_case() {
        let video = YoutubeVideo {
            id: String::from("x"),
            title: String::new(),
            channel: String::new(),
            thumbnail: String::new(),
            description: String::new(),
            published_at: String::from("2024-05-01T00:00:00Z"),
        };

        let value = serde_json::to_value(&video).unwrap();
        assert!(value.get("publishedAt").is_some());
        assert!(value.get("published_at").is_none());
    }
}

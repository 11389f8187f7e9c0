//! YouTube Data API v3 client.
//!
//! Two resources are consumed: `channels` (to find an account's related
//! playlists) and `playlistItems` (one page of up to 50 entries). Responses are
//! decoded into typed shapes here, at the boundary, before anything reaches the
//! reconciler.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::{AccountRef, CatalogSource, PlaylistPage, PlaylistSet, RemoteItem};
use crate::config::YouTubeConfig;
use crate::error::{SyncError, SyncResult};

/// Fixed page size for `playlistItems`
pub const PAGE_SIZE: u32 = 50;

const CHANNELS: &str = "channels";
const PLAYLIST_ITEMS: &str = "playlistItems";

// API Response models

/// JSON object decoded with its keys kept in document order
#[derive(Debug, Clone, PartialEq)]
struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    #[serde(default)]
    related_playlists: OrderedMap<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    page_info: Option<PageInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    total_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    id: String,
    content_details: PlaylistItemContentDetails,
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: OrderedMap<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl From<PlaylistItemResource> for RemoteItem {
    fn from(item: PlaylistItemResource) -> Self {
        let thumbnail_url = best_thumbnail(&item.snippet.thumbnails)
            .unwrap_or_default()
            .to_string();
        Self {
            playlist_entry_id: item.id,
            video_id: item.content_details.video_id,
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail_url,
        }
    }
}

/// The API lists thumbnails from lowest to highest resolution; take the last.
fn best_thumbnail(thumbnails: &OrderedMap<Thumbnail>) -> Option<&str> {
    thumbnails.0.last().map(|(_, t)| t.url.as_str())
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> SyncResult<T> {
    serde_json::from_str(body).map_err(|e| SyncError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a `channels` response into the account's related playlists
fn parse_channel_list(body: &str, account: &AccountRef) -> SyncResult<PlaylistSet> {
    let response: ChannelListResponse = decode(CHANNELS, body)?;

    let channel = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::EmptyResult(format!("no channel found for {}", account)))?;

    let mut playlists = PlaylistSet::new();
    for (name, id) in channel.content_details.related_playlists.0 {
        if id.trim().is_empty() {
            tracing::debug!("Skipping playlist '{}' with empty id", name);
            continue;
        }
        playlists.insert(name, id);
    }

    if playlists.is_empty() {
        return Err(SyncError::EmptyResult(format!(
            "{} has no related playlists",
            account
        )));
    }
    Ok(playlists)
}

/// Decode a `playlistItems` response into one page of items
fn parse_playlist_items(body: &str, playlist_id: &str) -> SyncResult<PlaylistPage> {
    let response: PlaylistItemListResponse = decode(PLAYLIST_ITEMS, body)?;

    let total = response.page_info.as_ref().map(|p| p.total_results).unwrap_or(0);
    if response.items.is_empty() || total == 0 {
        return Err(SyncError::EmptyResult(format!(
            "playlist {} has no items",
            playlist_id
        )));
    }

    let truncated = response.next_page_token.is_some() || total as usize > response.items.len();
    let items = response.items.into_iter().map(RemoteItem::from).collect();

    Ok(PlaylistPage { items, truncated })
}

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    /// Create a new client.
    ///
    /// The API key is validated here, once; a blank key fails before any
    /// request is made.
    pub fn new(config: &YouTubeConfig) -> SyncResult<Self> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(SyncError::Configuration(
                "Please specify a valid YouTube API key".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = config.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            base_url,
        })
    }

    /// GET a resource and return the raw body of a 2xx response
    async fn get_body(&self, resource: &str, params: &[(&str, &str)]) -> SyncResult<String> {
        let url = format!("{}{}", self.base_url, resource);
        let unavailable = |reason: String| SyncError::RemoteUnavailable {
            endpoint: resource.to_string(),
            reason,
        };

        // without_url() keeps the API key out of error messages
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("status {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| unavailable(e.without_url().to_string()))
    }
}

#[async_trait]
impl CatalogSource for YouTubeClient {
    fn source_name(&self) -> &str {
        "youtube"
    }

    async fn list_playlists(&self, account: &AccountRef) -> SyncResult<PlaylistSet> {
        let selector = match account {
            AccountRef::User(name) => ("forUsername", name.as_str()),
            AccountRef::Channel(id) => ("id", id.as_str()),
        };

        let body = self
            .get_body(CHANNELS, &[("part", "contentDetails"), selector])
            .await?;
        let playlists = parse_channel_list(&body, account)?;

        tracing::debug!("{} has {} related playlists", account, playlists.len());
        Ok(playlists)
    }

    async fn list_playlist_items(&self, playlist_id: &str) -> SyncResult<PlaylistPage> {
        let page_size = PAGE_SIZE.to_string();
        let body = self
            .get_body(
                PLAYLIST_ITEMS,
                &[
                    ("part", "contentDetails,snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", page_size.as_str()),
                ],
            )
            .await?;

        parse_playlist_items(&body, playlist_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const CHANNEL_JSON: &str = r#"{
        "kind": "youtube#channelListResponse",
        "pageInfo": {"totalResults": 1, "resultsPerPage": 5},
        "items": [{
            "kind": "youtube#channel",
            "id": "UC123",
            "contentDetails": {
                "relatedPlaylists": {
                    "likes": "LL123",
                    "uploads": "UU123",
                    "favorites": ""
                }
            }
        }]
    }"#;

    fn playlist_items_json(total: u32, next_page: bool) -> String {
        let next = if next_page { r#""nextPageToken": "CDIQAA","# } else { "" };
        format!(
            r#"{{
            "kind": "youtube#playlistItemListResponse",
            {next}
            "pageInfo": {{"totalResults": {total}, "resultsPerPage": 50}},
            "items": [{{
                "id": "UExentry1",
                "snippet": {{
                    "title": "First video",
                    "description": "About the first video",
                    "thumbnails": {{
                        "default": {{"url": "https://i.ytimg.com/vi/vid1/default.jpg", "width": 120, "height": 90}},
                        "medium": {{"url": "https://i.ytimg.com/vi/vid1/mqdefault.jpg", "width": 320, "height": 180}},
                        "high": {{"url": "https://i.ytimg.com/vi/vid1/hqdefault.jpg", "width": 480, "height": 360}}
                    }}
                }},
                "contentDetails": {{"videoId": "vid1"}}
            }}]
        }}"#
        )
    }

    #[test]
    fn test_parse_channel_list_keeps_order_and_skips_blank_ids() {
        let account = AccountRef::User("someone".to_string());
        let playlists = parse_channel_list(CHANNEL_JSON, &account).unwrap();

        assert_eq!(playlists.names(), vec!["likes", "uploads"]);
        assert_eq!(playlists.get("uploads"), Some("UU123"));
    }

    #[test]
    fn test_parse_channel_list_without_items_is_empty_result() {
        let account = AccountRef::Channel("UCnope".to_string());
        let body = r#"{"kind": "youtube#channelListResponse", "pageInfo": {"totalResults": 0}}"#;

        let err = parse_channel_list(body, &account).unwrap_err();
        assert!(matches!(err, SyncError::EmptyResult(ref m) if m.contains("UCnope")));
    }

    #[test]
    fn test_parse_channel_list_rejects_malformed_body() {
        let account = AccountRef::User("x".to_string());
        let err = parse_channel_list(r#"{"items": [{"id": 5}]}"#, &account).unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }));
    }

    #[test]
    fn test_parse_playlist_items_picks_last_thumbnail() {
        let page = parse_playlist_items(&playlist_items_json(1, false), "UU123").unwrap();

        assert!(!page.truncated);
        assert_eq!(page.items.len(), 1);
        let item = &page.items[0];
        assert_eq!(item.playlist_entry_id, "UExentry1");
        assert_eq!(item.video_id, "vid1");
        assert_eq!(item.title, "First video");
        assert_eq!(item.description, "About the first video");
        assert_eq!(item.thumbnail_url, "https://i.ytimg.com/vi/vid1/hqdefault.jpg");
    }

    #[test]
    fn test_parse_playlist_items_flags_truncation() {
        let page = parse_playlist_items(&playlist_items_json(120, true), "UU123").unwrap();
        assert!(page.truncated);

        // totalResults alone is enough to notice missing items
        let page = parse_playlist_items(&playlist_items_json(2, false), "UU123").unwrap();
        assert!(page.truncated);
    }

    #[test]
    fn test_parse_playlist_items_zero_total_is_empty_result() {
        let body = r#"{"pageInfo": {"totalResults": 0, "resultsPerPage": 50}, "items": []}"#;
        let err = parse_playlist_items(body, "PLempty").unwrap_err();
        assert!(matches!(err, SyncError::EmptyResult(_)));
    }

    #[test]
    fn test_item_without_thumbnails_gets_empty_url() {
        let body = r#"{
            "pageInfo": {"totalResults": 1},
            "items": [{
                "id": "e1",
                "snippet": {"title": "Private video", "description": "", "thumbnails": {}},
                "contentDetails": {"videoId": "v1"}
            }]
        }"#;
        let page = parse_playlist_items(body, "PL1").unwrap();
        assert_eq!(page.items[0].thumbnail_url, "");
    }

    #[test]
    fn test_new_rejects_blank_api_key() {
        let config = YouTubeConfig {
            api_key: "  ".to_string(),
            ..Default::default()
        };
        let err = YouTubeClient::new(&config).err().unwrap();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let config = YouTubeConfig {
            api_key: "key".to_string(),
            base_url: "http://localhost:8080/youtube/v3".to_string(),
            ..Default::default()
        };
        let client = YouTubeClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/youtube/v3/");
        assert_eq!(client.source_name(), "youtube");
    }

    /// Accept one connection, answer with `status` and `body`, return the request line
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/youtube/v3/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (base_url, handle)
    }

    fn client_for(base_url: &str) -> YouTubeClient {
        YouTubeClient::new(&YouTubeConfig {
            api_key: "k".to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_playlists_by_user_sends_for_username() {
        let (base_url, server) = serve_once("200 OK", CHANNEL_JSON.to_string()).await;

        let playlists = client_for(&base_url)
            .list_playlists(&AccountRef::User("bob".to_string()))
            .await
            .unwrap();

        assert_eq!(
            server.await.unwrap(),
            "GET /youtube/v3/channels?part=contentDetails&forUsername=bob&key=k HTTP/1.1"
        );
        assert_eq!(playlists.get("uploads"), Some("UU123"));
    }

    #[tokio::test]
    async fn test_list_playlists_by_channel_sends_id() {
        let (base_url, server) = serve_once("200 OK", CHANNEL_JSON.to_string()).await;

        client_for(&base_url)
            .list_playlists(&AccountRef::Channel("UC9".to_string()))
            .await
            .unwrap();

        assert_eq!(
            server.await.unwrap(),
            "GET /youtube/v3/channels?part=contentDetails&id=UC9&key=k HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_list_playlist_items_requests_one_full_page() {
        let (base_url, server) = serve_once("200 OK", playlist_items_json(1, false)).await;

        let page = client_for(&base_url).list_playlist_items("PL1").await.unwrap();

        assert_eq!(
            server.await.unwrap(),
            "GET /youtube/v3/playlistItems?part=contentDetails%2Csnippet&playlistId=PL1&maxResults=50&key=k HTTP/1.1"
        );
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.items[0].thumbnail_url,
            "https://i.ytimg.com/vi/vid1/hqdefault.jpg"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_unavailable() {
        let (base_url, server) =
            serve_once("503 Service Unavailable", r#"{"error": {}}"#.to_string()).await;

        let err = client_for(&base_url).list_playlist_items("PL1").await.unwrap_err();
        server.await.unwrap();

        match err {
            SyncError::RemoteUnavailable { endpoint, reason } => {
                assert_eq!(endpoint, PLAYLIST_ITEMS);
                assert!(reason.contains("503"), "unexpected reason: {}", reason);
            }
            other => panic!("expected RemoteUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_unavailable() {
        let config = YouTubeConfig {
            api_key: "secret-key".to_string(),
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = YouTubeClient::new(&config).unwrap();

        let err = client.list_playlist_items("PL1").await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
        assert!(!err.to_string().contains("secret-key"));
    }
}

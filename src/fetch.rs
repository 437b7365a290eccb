//!
//! src/fetch.rs  Oct 19th, 2026
//!
//! Spotify Web API client. Builds requests, handles retries and token
//! refresh, and decodes responses into the typed shapes of `types`.
//!

use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::{header, redirect, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::catalog::CatalogClient;
use crate::config::{HttpConfig, RetryConfig, SpotifyConfig};
use crate::errors::ReleaseError;
use crate::types::{Album, ArtistRef, Cursor, Page, PlaylistSummary, SavedTrack, Track, WirePage};

/// Largest page the catalog hands out for the collections used here
const PAGE_LIMIT: &str = "50";

/// Tokens are refreshed this long before they actually expire
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, ReleaseError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_helper(http)
        .default_headers(h)
        .build()
        .map_err(|e| ReleaseError::Http(format!("build client: {e}")))
}

/// Simple function to generate random wait for http_with_retry
fn generate_backoff(ms: u64, attempt: usize, rng: &mut SmallRng) -> Duration {
    let exp = (1_u64 << attempt.min(6)) * ms;
    let jitter = rng.gen_range(50..=200) as u64;
    Duration::from_millis(exp + jitter)
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Sends `request`, retrying 429 and 5xx answers as well as transport
/// errors. Success bodies are parsed as json, an empty body as `Null`.
async fn http_with_retry(
    request: RequestBuilder,
    retry: &RetryConfig
) -> Result<Value, ReleaseError> {
    let mut rng = SmallRng::from_entropy();
    let mut attempt = 0_usize;
    loop {
        let response = request.try_clone()
            .ok_or_else(|| ReleaseError::Http("non-cloneable request".to_string()))?
            .send()
            .await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    let body = resp.text().await?;
                    if body.trim().is_empty() {
                        return Ok(Value::Null);
                    }
                    return Ok(serde_json::from_str(&body)?);
                }

                let waited = retry_after(&resp);
                let body = resp.text().await.unwrap_or_default();
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if !retryable || attempt >= retry.max_retries {
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(ReleaseError::RateLimited(
                            format!("gave up after {attempt} retries, retry-after {waited:?}")
                        ));
                    }
                    return Err(ReleaseError::Status { status: status.as_u16(), body });
                }
                let backoff = generate_backoff(retry.base_backoff.as_millis() as u64, attempt, &mut rng);
                let backoff = waited.map_or(backoff, |w| w.max(backoff));
                warn!(status = %status, backoff = ?backoff.as_millis(), "http.retry");
                sleep(backoff).await;
                attempt += 1;
            },
            Err(e) => {
                if attempt >= retry.max_retries {
                    return Err(e.into());
                }
                let backoff = generate_backoff(retry.base_backoff.as_millis() as u64, attempt, &mut rng);
                warn!(error = %e, backoff = ?backoff.as_millis(), "http.retry.error");
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Unwraps the paging object (optionally nested under `envelope`)
fn decode_page<T: DeserializeOwned>(
    mut value: Value,
    envelope: Option<&'static str>
) -> Result<Page<T>, ReleaseError> {
    let inner = match envelope {
        Some(key) => value.get_mut(key)
            .map(Value::take)
            .ok_or_else(|| ReleaseError::Parse(format!("response missing '{key}'")))?,
        None => value
    };
    let wire: WirePage<T> = serde_json::from_value(inner)?;
    Ok(wire.into_page(envelope))
}

#[derive(Debug)]
pub struct SpotifyClient {
    http: Client,
    cfg: SpotifyConfig,
    retry: RetryConfig,
    token: tokio::sync::Mutex<Option<(String, Instant)>>
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) -> Result<Self, ReleaseError> {
        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone(),
            retry: http_config.retry.clone(),
            token: tokio::sync::Mutex::new(None)
        })
    }

    fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.cfg.refresh_token.as_str())
            ])
    }

    async fn refresh_token(&self) -> Result<(String, Instant), ReleaseError> {
        let response = http_with_retry(self.token_request(), &self.retry).await?;
        let token_str = response["access_token"].as_str()
            .ok_or_else(|| ReleaseError::Http("no access_token in response".into()))?
            .to_string();
        let expires_in = Duration::from_secs(response["expires_in"].as_u64().unwrap_or(3600));
        let expire_time = Instant::now() + expires_in.saturating_sub(TOKEN_MARGIN);
        Ok((token_str, expire_time))
    }

    /// Current bearer token, refreshed when missing or about to expire
    pub async fn bearer(&self) -> Result<String, ReleaseError> {
        let mut token = self.token.lock().await;
        if let Some((bearer, expiry)) = token.as_ref() {
            if Instant::now() < *expiry {
                return Ok(bearer.clone());
            }
        }
        let (bearer, expiry) = self.refresh_token().await?;
        debug!(expires_in = ?expiry.saturating_duration_since(Instant::now()), "spotify.token");
        *token = Some((bearer.clone(), expiry));
        Ok(bearer)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ReleaseError> {
        self.cfg.api_base.join(path)
            .map_err(|e| ReleaseError::Config(format!("bad endpoint {path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ReleaseError> {
        let bearer = self.bearer().await?;
        http_with_retry(request.bearer_auth(bearer), &self.retry).await
    }

    async fn get(&self, url: Url) -> Result<Value, ReleaseError> {
        self.send(self.http.get(url)).await
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        envelope: Option<&'static str>
    ) -> Result<Page<T>, ReleaseError> {
        decode_page(self.get(url).await?, envelope)
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    /// GET /v1/me/following?type=artist&limit=50
    async fn followed_artists(&self) -> Result<Page<ArtistRef>, ReleaseError> {
        let mut url = self.endpoint("me/following")?;
        url.query_pairs_mut()
            .append_pair("type", "artist")
            .append_pair("limit", PAGE_LIMIT);
        self.get_page(url, Some("artists")).await
    }

    /// GET /v1/me/tracks?limit=50
    async fn saved_tracks(&self) -> Result<Page<SavedTrack>, ReleaseError> {
        let mut url = self.endpoint("me/tracks")?;
        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);
        self.get_page(url, None).await
    }

    /// GET /v1/artists/{id}/albums?include_groups=..&market=..&limit=50
    async fn artist_albums(
        &self,
        artist_id: &str,
        album_types: &[String],
        market: &str
    ) -> Result<Page<Album>, ReleaseError> {
        let mut url = self.endpoint(&format!("artists/{artist_id}/albums"))?;
        url.query_pairs_mut()
            .append_pair("include_groups", &album_types.join(","))
            .append_pair("market", market)
            .append_pair("limit", PAGE_LIMIT);
        self.get_page(url, None).await
    }

    /// GET /v1/search?type=album&limit=50&q=...
    async fn search_albums(&self, query: &str) -> Result<Page<Album>, ReleaseError> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("type", "album")
            .append_pair("limit", PAGE_LIMIT)
            .append_pair("q", query);
        self.get_page(url, Some("albums")).await
    }

    /// GET /v1/albums/{id}
    async fn album(&self, album_id: &str) -> Result<Album, ReleaseError> {
        let url = self.endpoint(&format!("albums/{album_id}"))?;
        Ok(serde_json::from_value(self.get(url).await?)?)
    }

    /// GET /v1/albums/{id}/tracks?limit=50
    async fn album_tracks(&self, album_id: &str) -> Result<Page<Track>, ReleaseError> {
        let mut url = self.endpoint(&format!("albums/{album_id}/tracks"))?;
        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);
        self.get_page(url, None).await
    }

    async fn next_page<T>(&self, cursor: &Cursor) -> Result<Page<T>, ReleaseError>
    where
        T: DeserializeOwned + Send + 'static
    {
        let url = Url::parse(&cursor.url)
            .map_err(|e| ReleaseError::Parse(format!("bad next url {}: {e}", cursor.url)))?;
        self.get_page(url, cursor.envelope).await
    }

    /// GET /v1/me
    async fn current_user_id(&self) -> Result<String, ReleaseError> {
        let me = self.get(self.endpoint("me")?).await?;
        me["id"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::Parse("current user has no id".into()))
    }

    /// GET /v1/me/playlists?limit=50
    async fn current_user_playlists(&self) -> Result<Page<PlaylistSummary>, ReleaseError> {
        let mut url = self.endpoint("me/playlists")?;
        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);
        self.get_page(url, None).await
    }

    /// POST /v1/users/{id}/playlists
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str
    ) -> Result<PlaylistSummary, ReleaseError> {
        let url = self.endpoint(&format!("users/{user_id}/playlists"))?;
        let body = json!({ "name": name, "description": description, "public": false });
        let created = self.send(self.http.post(url).json(&body)).await?;
        Ok(serde_json::from_value(created)?)
    }

    /// PUT /v1/playlists/{id}/tracks
    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        self.send(self.http.put(url).json(&json!({ "uris": uris }))).await?;
        Ok(())
    }

    /// DELETE /v1/playlists/{id}/tracks
    async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        let tracks: Vec<Value> = uris.iter().map(|uri| json!({ "uri": uri })).collect();
        self.send(self.http.delete(url).json(&json!({ "tracks": tracks }))).await?;
        Ok(())
    }

    /// POST /v1/playlists/{id}/tracks
    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String]
    ) -> Result<(), ReleaseError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        self.send(self.http.post(url).json(&json!({ "uris": uris }))).await?;
        Ok(())
    }
}

//!
//! src/config.rs  Oct 19th, 2026
//!
//! Typed configuration loaded once at startup from the environment
//! (and a `.env` file if present). Strings are coerced to booleans,
//! integers and lists here, never at the use site.
//!

use std::path::PathBuf;
use std::time;

use url::Url;

use crate::denylist::Denylist;
use crate::errors::ReleaseError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: usize = 3;
pub const RETRY_BASE_BACKOFF: u64 = 500;

/// Label search past this many days can no longer use the "new" tag
pub const LABEL_NEW_TAG_DAYS: u32 = 14;

/// Source of raw configuration values, keyed by variable name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_value(lookup: Lookup, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required value, an invalid enviroment var error otherwise
fn env_check(lookup: Lookup, key: &str) -> Result<String, ReleaseError> {
    env_value(lookup, key)
        .ok_or_else(|| ReleaseError::Config(format!("{key} was not set")))
}

fn env_or(lookup: Lookup, key: &str, default: &str) -> String {
    env_value(lookup, key).unwrap_or_else(|| default.to_string())
}

fn env_bool(lookup: Lookup, key: &str, default: bool) -> Result<bool, ReleaseError> {
    let Some(raw) = env_value(lookup, key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ReleaseError::Config(format!("{key} is not a boolean: {raw}")))
    }
}

fn env_u32(lookup: Lookup, key: &str, default: u32) -> Result<u32, ReleaseError> {
    match env_value(lookup, key) {
        Some(raw) => raw.parse::<u32>()
            .map_err(|_| ReleaseError::Config(format!("{key} is not an integer: {raw}"))),
        None => Ok(default)
    }
}

fn env_list(lookup: Lookup, key: &str, default: &str) -> Vec<String> {
    env_or(lookup, key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Artists,
    Labels
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Artists => "artists",
            RunMode::Labels  => "labels"
        }
    }
    pub fn parse(s: &str) -> Option<RunMode> {
        match s {
            "artists" | "artist" => Some(RunMode::Artists),
            "labels" | "label"   => Some(RunMode::Labels),
            _ => None
        }
    }
    /// Word substituted for `{mode}` in the playlist name
    pub fn title(self) -> &'static str {
        match self {
            RunMode::Artists => "Artists",
            RunMode::Labels  => "Labels"
        }
    }
}

///
/// What to look for and where to publish it
///
#[derive(Debug, Clone)]
pub struct GeneralConfig {
    pub region: String,
    pub days: u32,
    pub album_types: Vec<String>,
    pub playlist_uri_artists: Option<String>,
    pub playlist_uri_labels: Option<String>,
    pub playlist_name: String,         // may contain {mode}
    pub playlist_description: String,
    pub use_artists_file: bool,
    pub artists_file: PathBuf,
    pub labels_file: PathBuf,
    pub modes: Vec<RunMode>
}

impl GeneralConfig {
    pub fn playlist_uri(&self, mode: RunMode) -> Option<&str> {
        match mode {
            RunMode::Artists => self.playlist_uri_artists.as_deref(),
            RunMode::Labels  => self.playlist_uri_labels.as_deref()
        }
    }

    pub fn playlist_name_for(&self, mode: RunMode) -> String {
        self.playlist_name.replace("{mode}", mode.title())
    }
}

fn build_general(lookup: Lookup) -> Result<GeneralConfig, ReleaseError> {
    let modes = env_list(lookup, "RUN_MODES", "artists")
        .iter()
        .map(|m| RunMode::parse(&m.to_ascii_lowercase())
            .ok_or_else(|| ReleaseError::Config(format!("unknown run mode {m}"))))
        .collect::<Result<Vec<_>, _>>()?;

    let album_types = env_list(lookup, "ALBUM_TYPES", "album,single");
    if album_types.is_empty() {
        return Err(ReleaseError::Config("ALBUM_TYPES is empty".into()));
    }

    Ok( GeneralConfig {
        region: env_or(lookup, "REGION", "US").to_ascii_uppercase(),
        days: env_u32(lookup, "DAYS", 7)?,
        album_types,
        playlist_uri_artists: env_value(lookup, "PLAYLIST_URI_ARTISTS"),
        playlist_uri_labels: env_value(lookup, "PLAYLIST_URI_LABELS"),
        playlist_name: env_or(lookup, "PLAYLIST_NAME", "New releases: {mode}"),
        playlist_description: env_or(lookup, "PLAYLIST_DESCRIPTION",
            "Recently released tracks, refreshed automatically"),
        use_artists_file: env_bool(lookup, "USE_ARTISTS_FILE", false)?,
        artists_file: PathBuf::from(env_or(lookup, "ARTISTS_FILE", "artists.txt")),
        labels_file: PathBuf::from(env_or(lookup, "LABELS_FILE", "labels.txt")),
        modes
    })
}

///
/// Per-filter switches and the substring denylists
///
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub radio_shows: Denylist,
    pub extended_mixes: Denylist,
    pub ignore_duplicates: bool,
    pub ignore_liked: bool,
    pub ignore_followed_in_labels: bool,
    pub ignore_rereleases: bool
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            radio_shows: Denylist::default(),
            extended_mixes: Denylist::default(),
            ignore_duplicates: true,
            ignore_liked: true,
            ignore_followed_in_labels: true,
            ignore_rereleases: true
        }
    }
}

fn build_filters(lookup: Lookup) -> Result<FilterConfig, ReleaseError> {
    let filter_albums = env_bool(lookup, "FILTER_ALBUMS", false)?;
    let filter_tracks = env_bool(lookup, "FILTER_TRACKS", false)?;
    let albums_file = PathBuf::from(env_or(lookup, "FILTER_ALBUMS_FILE", "radioshows.txt"));
    let tracks_file = PathBuf::from(env_or(lookup, "FILTER_TRACKS_FILE", "extended.txt"));

    Ok( FilterConfig {
        radio_shows: Denylist::from_file(filter_albums, &albums_file),
        extended_mixes: Denylist::from_file(filter_tracks, &tracks_file),
        ignore_duplicates: env_bool(lookup, "IGNORE_DUPLICATES", true)?,
        ignore_liked: env_bool(lookup, "IGNORE_ALREADY_LIKED", true)?,
        ignore_followed_in_labels: env_bool(lookup, "IGNORE_LABEL_IF_ARTIST_FOLLOWED", true)?,
        ignore_rereleases: env_bool(lookup, "IGNORE_RERELEASES", true)?
    })
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: Url,
    pub api_base: Url
}

fn build_spotify(lookup: Lookup) -> Result<SpotifyConfig, ReleaseError> {
    let client_id     = env_check(lookup, "SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check(lookup, "SPOTIFY_CLIENT_SECRET")?;
    let refresh_token = env_check(lookup, "SPOTIFY_REFRESH_TOKEN")?;

    // form urls
    let token_url = env_or(lookup, "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token");
    let api_base  = env_or(lookup, "SPOTIFY_API_BASE", "https://api.spotify.com/v1/");

    let token_url = Url::parse(&token_url)
        .map_err(|e| ReleaseError::Config(format!("SPOTIFY_TOKEN_URL invalid {e}")))?;
    let mut api_base = Url::parse(&api_base)
        .map_err(|e| ReleaseError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(ReleaseError::Config)?;
    ensure_https(&api_base).map_err(ReleaseError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(ReleaseError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(ReleaseError::Config)?;
    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { client_id, client_secret, refresh_token, token_url, api_base } )
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_backoff: time::Duration
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub cache_file: PathBuf
}

fn build_persistence(lookup: Lookup) -> PersistenceConfig {
    PersistenceConfig {
        cache_file: PathBuf::from(env_or(lookup, "CACHE_FILE", "./data/album_cache.db"))
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,release_crawler=debug,sqlx=warn,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: false
        }
    }
}

pub fn build_logging(lookup: Lookup) -> Result<LoggingConfig, ReleaseError> {
    let mut cfg = LoggingConfig::default();
    if let Some(format) = env_value(lookup, "LOG_FORMAT") {
        cfg.format = match format.to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(ReleaseError::Config(format!("unknown LOG_FORMAT {other}")))
        };
    }
    // json lines go to collectors, keep them free of escape codes
    cfg.with_ansi = cfg.format == LogFormat::Pretty && env_bool(lookup, "LOG_ANSI", true)?;
    cfg.include_file_line = env_bool(lookup, "LOG_FILE_LINE", false)?;
    Ok(cfg)
}

///
/// AppConfig which holds everything the runs need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub filters: FilterConfig,
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig
}

pub fn load_config_from(lookup: Lookup) -> Result<AppConfig, ReleaseError> {
    let general     = build_general(lookup)?;
    let filters     = build_filters(lookup)?;
    let spotify     = build_spotify(lookup)?;
    let http        = HttpConfig::default();
    let persistence = build_persistence(lookup);
    let logging     = build_logging(lookup)?;

    Ok( AppConfig { general, filters, spotify, http, persistence, logging } )
}

///
/// Return the full configuration from the process environment.
///
pub fn load_config() -> Result<AppConfig, ReleaseError> {
    dotenvy::dotenv().ok();
    load_config_from(&|key: &str| std::env::var(key).ok())
}

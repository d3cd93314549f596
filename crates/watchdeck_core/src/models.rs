use std::fmt;

use serde::{Deserialize, Serialize};

pub const MAX_PROFILES: usize = 5;
pub const MAX_PROFILE_NAME_CHARS: usize = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// A named viewing context. `is_active` is derived from the active-profile
/// pointer whenever a profile is read; it is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_active: bool,
}

/// The minimal slice of a metadata record the watch-state collections keep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "poster_path")]
    pub poster_path: Option<String>,
}

impl ContentSummary {
    /// Movies carry `title`, shows carry `name`.
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .filter(|value| !value.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    pub added_at: i64,
}

impl WatchlistItem {
    pub fn matches(&self, id: u64, media_type: MediaType) -> bool {
        self.id == id && self.media_type == media_type
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWatchingItem {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    pub last_watched_at: i64,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<usize>,
}

impl ContinueWatchingItem {
    pub fn matches(&self, id: u64, media_type: MediaType) -> bool {
        self.id == id && self.media_type == media_type
    }

    /// Where playback should pick up. Episode coordinates are only kept for
    /// shows that recorded both of them.
    pub fn resume_target(&self) -> ResumeTarget {
        let episode = match (self.media_type, self.season_number, self.episode_number) {
            (MediaType::Tv, Some(season), Some(episode)) => Some((season, episode)),
            _ => None,
        };

        ResumeTarget {
            media_type: self.media_type,
            id: self.id,
            season_number: episode.map(|(season, _)| season),
            episode_number: episode.map(|(_, episode)| episode),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTarget {
    pub media_type: MediaType,
    pub id: u64,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

/// Playback state captured when an item is (re)started.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressUpdate {
    pub progress: f64,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub server_id: Option<usize>,
}

impl ProgressUpdate {
    pub fn clamped_progress(&self) -> f64 {
        if self.progress.is_finite() {
            self.progress.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileInput {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIdInput {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentKeyInput {
    pub id: u64,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInput {
    pub content: ContentSummary,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressInput {
    pub content: ContentSummary,
    pub media_type: MediaType,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub server_id: Option<usize>,
}

impl RecordProgressInput {
    pub fn update(&self) -> ProgressUpdate {
        ProgressUpdate {
            progress: self.progress,
            season_number: self.season_number,
            episode_number: self.episode_number,
            server_id: self.server_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetServerInput {
    pub id: u64,
    pub media_type: MediaType,
    pub server_id: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedUrlInput {
    pub id: u64,
    pub media_type: MediaType,
    #[serde(default)]
    pub server_id: Option<usize>,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedUrlResult {
    pub server_id: usize,
    pub server_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInput {
    pub id: u64,
    pub season_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrlInput {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_image_size")]
    pub size: String,
}

fn default_image_size() -> String {
    "w500".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeLabelInput {
    #[serde(default)]
    pub minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapState {
    pub active_profile: Option<Profile>,
    pub profiles: Vec<Profile>,
    pub watchlist: Vec<WatchlistItem>,
    pub continue_watching: Vec<ContinueWatchingItem>,
    pub servers: Vec<crate::servers::ServerInfo>,
    pub metadata_available: bool,
    pub profile_limit: usize,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ContinueWatchingItem, MediaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlStyle {
    /// `{base}/{type}/{id}` with `/{season}/{episode}` for shows.
    PathSegments,
    /// `{base}/{type}?tmdb={id}` with `&season=..&episode=..` for shows.
    TmdbQuery,
}

/// A third-party site that serves playable video in an iframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedServer {
    pub name: &'static str,
    base_url: &'static str,
    style: UrlStyle,
}

impl EmbedServer {
    pub fn embed_url(
        &self,
        media_type: MediaType,
        id: u64,
        season_number: Option<u32>,
        episode_number: Option<u32>,
    ) -> String {
        let season = season_number.unwrap_or(1);
        let episode = episode_number.unwrap_or(1);

        match (self.style, media_type) {
            (UrlStyle::PathSegments, MediaType::Movie) => {
                format!("{}/{media_type}/{id}", self.base_url)
            }
            (UrlStyle::PathSegments, MediaType::Tv) => {
                format!("{}/{media_type}/{id}/{season}/{episode}", self.base_url)
            }
            (UrlStyle::TmdbQuery, MediaType::Movie) => {
                format!("{}/{media_type}?tmdb={id}", self.base_url)
            }
            (UrlStyle::TmdbQuery, MediaType::Tv) => format!(
                "{}/{media_type}?tmdb={id}&season={season}&episode={episode}",
                self.base_url
            ),
        }
    }
}

/// Ordered catalogue; a server's position is the `serverId` persisted on
/// continue-watching entries, so entries must never be reordered.
pub const SERVERS: [EmbedServer; 4] = [
    EmbedServer {
        name: "Server 1",
        base_url: "https://embed.su/embed",
        style: UrlStyle::PathSegments,
    },
    EmbedServer {
        name: "Server 2",
        base_url: "https://vidbinge.dev/embed",
        style: UrlStyle::PathSegments,
    },
    EmbedServer {
        name: "Server 3",
        base_url: "https://vidsrc.cc/v2/embed",
        style: UrlStyle::PathSegments,
    },
    EmbedServer {
        name: "Server 4",
        base_url: "https://vidsrc.in/embed",
        style: UrlStyle::TmdbQuery,
    },
];

pub const DEFAULT_SERVER_ID: usize = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: usize,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("unknown embed server {0}; {count} are available", count = SERVERS.len())]
    UnknownServer(usize),
}

pub fn list_servers() -> Vec<ServerInfo> {
    SERVERS
        .iter()
        .enumerate()
        .map(|(id, server)| ServerInfo {
            id,
            name: server.name.to_string(),
        })
        .collect()
}

pub fn server(server_id: usize) -> Result<&'static EmbedServer, ServerError> {
    SERVERS
        .get(server_id)
        .ok_or(ServerError::UnknownServer(server_id))
}

pub fn embed_url(
    server_id: usize,
    media_type: MediaType,
    id: u64,
    season_number: Option<u32>,
    episode_number: Option<u32>,
) -> Result<String, ServerError> {
    Ok(server(server_id)?.embed_url(media_type, id, season_number, episode_number))
}

/// The server remembered for an entry, when it still exists.
pub fn preferred_server(last_watched: Option<&ContinueWatchingItem>) -> usize {
    last_watched
        .and_then(|item| item.server_id)
        .filter(|server_id| *server_id < SERVERS.len())
        .unwrap_or(DEFAULT_SERVER_ID)
}

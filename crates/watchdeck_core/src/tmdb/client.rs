use anyhow::{Context, Result};
use log::debug;
use reqwest::Url;
use serde::de::DeserializeOwned;

use super::{
    types::{Episode, MovieDetails, MovieResponse, SeasonResponse},
    MetadataFuture, MetadataProvider,
};
use crate::models::MediaType;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "en-US";

const DETAIL_APPENDS: &str = "videos,credits,similar,recommendations";

#[derive(Clone)]
pub struct TmdbClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbClient {
    pub fn with_config(
        http_client: reqwest::Client,
        api_key: String,
        base_url: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key,
            base_url: base_url.into(),
            language: language.into(),
        }
    }

    pub(crate) fn request_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let endpoint = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut query = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        query.extend_from_slice(params);

        Url::parse_with_params(&endpoint, &query)
            .with_context(|| format!("invalid TMDB endpoint {endpoint}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}{}", url.origin().ascii_serialization(), url.path());
        let response = self
            .http_client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .context("failed to call TMDB API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("TMDB request failed with {status}: {body}"));
        }

        response
            .json()
            .await
            .context("failed to parse TMDB response")
    }
}

impl MetadataProvider for TmdbClient {
    fn fetch_list<'a>(
        &'a self,
        path: &'a str,
        params: &'a [(&'a str, &'a str)],
    ) -> MetadataFuture<'a, MovieResponse> {
        Box::pin(async move {
            let url = self.request_url(path, params)?;
            self.get_json(url).await
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> MetadataFuture<'a, MovieResponse> {
        Box::pin(async move {
            let url = self.request_url("search/multi", &[("query", query)])?;
            self.get_json(url).await
        })
    }

    fn details<'a>(&'a self, media_type: MediaType, id: u64) -> MetadataFuture<'a, MovieDetails> {
        Box::pin(async move {
            let path = format!("{media_type}/{id}");
            let url = self.request_url(&path, &[("append_to_response", DETAIL_APPENDS)])?;
            self.get_json(url).await
        })
    }

    fn season<'a>(&'a self, tv_id: u64, season_number: u32) -> MetadataFuture<'a, Vec<Episode>> {
        Box::pin(async move {
            let path = format!("tv/{tv_id}/season/{season_number}");
            let url = self.request_url(&path, &[])?;
            let season: SeasonResponse = self.get_json(url).await?;
            Ok(season.episodes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TmdbClient {
        TmdbClient::with_config(
            reqwest::Client::new(),
            "secret".to_string(),
            "https://api.themoviedb.org/3/",
            DEFAULT_LANGUAGE,
        )
    }

    #[test]
    fn request_url_carries_key_language_and_params() {
        let url = client()
            .request_url("/discover/movie", &[("with_genres", "28")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.themoviedb.org/3/discover/movie?api_key=secret&language=en-US&with_genres=28"
        );
    }

    #[test]
    fn request_url_encodes_search_queries() {
        let url = client()
            .request_url("search/multi", &[("query", "the office & co")])
            .unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("query".to_string(), "the office & co".to_string())));
        assert_eq!(url.path(), "/3/search/multi");
    }
}

use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Result;
use serde::Serialize;

pub mod client;
pub mod types;

use types::{Episode, MovieDetails, MovieResponse};

use crate::models::MediaType;

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

pub type MetadataFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait MetadataProvider: Send + Sync {
    fn fetch_list<'a>(
        &'a self,
        path: &'a str,
        params: &'a [(&'a str, &'a str)],
    ) -> MetadataFuture<'a, MovieResponse>;

    fn search<'a>(&'a self, query: &'a str) -> MetadataFuture<'a, MovieResponse>;

    fn details<'a>(&'a self, media_type: MediaType, id: u64) -> MetadataFuture<'a, MovieDetails>;

    fn season<'a>(&'a self, tv_id: u64, season_number: u32) -> MetadataFuture<'a, Vec<Episode>>;
}

/// One browsable row on the home screen.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: &'static str,
    pub title: &'static str,
    #[serde(skip)]
    pub path: &'static str,
    #[serde(skip)]
    pub params: &'static [(&'static str, &'static str)],
    pub is_large: bool,
}

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "netflix-originals",
        title: "Netflix Originals",
        path: "discover/tv",
        params: &[("with_networks", "213")],
        is_large: true,
    },
    Category {
        id: "trending",
        title: "Trending Now",
        path: "trending/all/week",
        params: &[],
        is_large: false,
    },
    Category {
        id: "top-rated",
        title: "Top Rated",
        path: "movie/top_rated",
        params: &[],
        is_large: false,
    },
    Category {
        id: "action",
        title: "Action Movies",
        path: "discover/movie",
        params: &[("with_genres", "28")],
        is_large: false,
    },
    Category {
        id: "comedy",
        title: "Comedy Movies",
        path: "discover/movie",
        params: &[("with_genres", "35")],
        is_large: false,
    },
    Category {
        id: "horror",
        title: "Horror Movies",
        path: "discover/movie",
        params: &[("with_genres", "27")],
        is_large: false,
    },
    Category {
        id: "romance",
        title: "Romance Movies",
        path: "discover/movie",
        params: &[("with_genres", "10749")],
        is_large: false,
    },
    Category {
        id: "documentaries",
        title: "Documentaries",
        path: "discover/movie",
        params: &[("with_genres", "99")],
        is_large: false,
    },
    Category {
        id: "tv-shows",
        title: "TV Shows",
        path: "tv/popular",
        params: &[],
        is_large: false,
    },
];

pub fn find_category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.id == id)
}

#[derive(Clone)]
pub struct MetadataService {
    provider: Arc<dyn MetadataProvider>,
    image_base_url: String,
}

impl MetadataService {
    pub fn new(provider: Arc<dyn MetadataProvider>, image_base_url: impl Into<String>) -> Self {
        Self {
            provider,
            image_base_url: image_base_url.into(),
        }
    }

    pub fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    pub async fn fetch_category(&self, category_id: &str) -> Result<MovieResponse> {
        let category = find_category(category_id)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {category_id}"))?;
        self.provider
            .fetch_list(category.path, category.params)
            .await
    }

    /// Blank queries short-circuit to an empty page. Results without any
    /// artwork are dropped since they cannot be rendered as cards.
    pub async fn search(&self, query: &str) -> Result<MovieResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(MovieResponse::default());
        }

        let mut response = self.provider.search(query).await?;
        response.results.retain(|item| item.has_artwork());
        Ok(response)
    }

    pub async fn details(&self, media_type: MediaType, id: u64) -> Result<MovieDetails> {
        self.provider.details(media_type, id).await
    }

    pub async fn season(&self, tv_id: u64, season_number: u32) -> Result<Vec<Episode>> {
        self.provider.season(tv_id, season_number).await
    }

    pub fn image_url(&self, path: Option<&str>, size: &str) -> String {
        match path.filter(|value| !value.is_empty()) {
            Some(path) => format!(
                "{}/{size}{path}",
                self.image_base_url.trim_end_matches('/')
            ),
            None => PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

pub fn format_runtime(minutes: Option<u32>) -> String {
    match minutes {
        None | Some(0) => "N/A".to_string(),
        Some(minutes) if minutes >= 60 => format!("{}h {}m", minutes / 60, minutes % 60),
        Some(minutes) => format!("{minutes}m"),
    }
}

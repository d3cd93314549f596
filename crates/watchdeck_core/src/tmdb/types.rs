use serde::{Deserialize, Serialize};

use crate::models::ContentSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Movie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl Movie {
    pub fn has_artwork(&self) -> bool {
        self.poster_path.is_some() || self.backdrop_path.is_some()
    }
}

impl From<&Movie> for ContentSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            name: movie.name.clone(),
            poster_path: movie.poster_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MovieResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cast {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Crew {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<Cast>,
    #[serde(default)]
    pub crew: Vec<Crew>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MovieList {
    #[serde(default)]
    pub results: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Season {
    pub id: u64,
    pub name: String,
    pub season_number: u32,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub episode_number: u32,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SeasonResponse {
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// Detail record with `videos,credits,similar,recommendations` appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub summary: Movie,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub created_by: Vec<NamedEntity>,
    #[serde(default)]
    pub production_companies: Vec<NamedEntity>,
    #[serde(default)]
    pub videos: VideoList,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub similar: MovieList,
    #[serde(default)]
    pub recommendations: MovieList,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl MovieDetails {
    /// Movies report `runtime`; shows report a list of typical episode
    /// lengths.
    pub fn runtime_minutes(&self) -> Option<u32> {
        self.runtime
            .filter(|minutes| *minutes > 0)
            .or_else(|| self.episode_run_time.first().copied())
    }

    pub fn trailer(&self) -> Option<&Video> {
        self.videos
            .results
            .iter()
            .find(|video| video.site == "YouTube" && video.kind == "Trailer")
    }

    /// Seasons a viewer can pick; season 0 holds specials.
    pub fn playable_seasons(&self) -> Vec<&Season> {
        self.seasons
            .iter()
            .filter(|season| season.season_number > 0)
            .collect()
    }
}

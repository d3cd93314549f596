use std::{fs, sync::Arc};

use serde_json::{json, Value};
use tempfile::tempdir;
use watchdeck_core::{
    models::{ContentSummary, MediaType, ProgressUpdate},
    storage::{
        continue_watching::CONTINUE_WATCHING_CAP,
        json_file::{JsonFileStore, STATE_FILE_NAME},
        schema::CURRENT_SCHEMA_VERSION,
        KeyValueStore, LocalStore,
    },
    tmdb::{
        types::{Episode, Movie, MovieDetails, MovieResponse},
        MetadataFuture, MetadataProvider, MetadataService, DEFAULT_IMAGE_BASE_URL,
    },
    Runtime,
};

fn runtime_at(dir: &std::path::Path) -> Runtime {
    let config = json!({ "dataDir": dir.to_string_lossy() }).to_string();
    Runtime::new(&config).expect("runtime")
}

fn invoke(runtime: &Runtime, command: &str, payload: Value) -> Value {
    let request = json!({ "command": command, "payload": payload }).to_string();
    serde_json::from_str(&runtime.invoke_json(&request)).expect("response json")
}

fn summary(id: u64, title: &str) -> ContentSummary {
    ContentSummary {
        id,
        title: Some(title.to_string()),
        ..ContentSummary::default()
    }
}

#[test]
fn watch_state_survives_a_restart() {
    let dir = tempdir().expect("tempdir");

    {
        let runtime = runtime_at(dir.path());
        let profile = invoke(&runtime, "create_profile", json!({ "name": "Alex" }));
        assert_eq!(profile["ok"], true);
        invoke(&runtime, "create_profile", json!({ "name": "Sam" }));
        invoke(
            &runtime,
            "add_to_watchlist",
            json!({ "content": { "id": 603, "title": "The Matrix" }, "mediaType": "movie" }),
        );
        invoke(
            &runtime,
            "record_progress",
            json!({
                "content": { "id": 1668, "name": "Friends" },
                "mediaType": "tv",
                "progress": 40,
                "seasonNumber": 4,
                "episodeNumber": 12,
                "serverId": 2
            }),
        );
    }

    assert!(dir.path().join(STATE_FILE_NAME).exists());

    let runtime = runtime_at(dir.path());
    let state = invoke(&runtime, "get_bootstrap_state", Value::Null)["data"].clone();
    assert_eq!(state["profiles"].as_array().unwrap().len(), 2);
    assert_eq!(state["activeProfile"]["name"], "Alex");
    assert_eq!(state["watchlist"][0]["title"], "The Matrix");
    assert_eq!(state["continueWatching"][0]["episodeNumber"], 12);

    let url = invoke(&runtime, "get_embed_url", json!({ "id": 1668, "mediaType": "tv" }));
    assert_eq!(
        url["data"]["url"],
        "https://vidsrc.cc/v2/embed/tv/1668/4/12"
    );
}

#[test]
fn active_profile_switches_and_dangles_after_delete() {
    let store = LocalStore::in_memory("props");
    let first = store.create_profile("Alex", None).unwrap();
    let second = store.create_profile("Sam", None).unwrap();
    assert!(first.is_active);
    assert!(!second.is_active);

    store.set_active_profile(&second.id).unwrap();
    let active: Vec<_> = store
        .list_profiles()
        .into_iter()
        .filter(|profile| profile.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    store.delete_profile(&second.id).unwrap();
    assert!(store.get_active_profile().is_none());
    assert!(store.list_profiles().iter().all(|profile| !profile.is_active));
}

#[test]
fn continue_watching_is_capped_and_ordered_by_recency() {
    let store = LocalStore::in_memory("props");
    for id in 1..=(CONTINUE_WATCHING_CAP as u64 + 3) {
        store
            .record_progress(&summary(id, "Movie"), MediaType::Movie, ProgressUpdate::default())
            .unwrap();
    }

    store
        .record_progress(&summary(10, "Movie"), MediaType::Movie, ProgressUpdate::default())
        .unwrap();

    let items = store.list_continue_watching();
    assert_eq!(items.len(), CONTINUE_WATCHING_CAP);
    assert_eq!(items[0].id, 10);
    assert_eq!(items.iter().filter(|item| item.id == 10).count(), 1);
    assert!(items.iter().all(|item| item.id > 3));
    assert!(items
        .windows(2)
        .all(|pair| pair[0].last_watched_at >= pair[1].last_watched_at));
}

#[test]
fn movie_and_show_with_same_id_are_distinct() {
    let store = LocalStore::in_memory("props");
    store.add_to_watchlist(&summary(42, "Movie"), MediaType::Movie).unwrap();
    store.add_to_watchlist(&summary(42, "Show"), MediaType::Tv).unwrap();
    store.add_to_watchlist(&summary(42, "Movie again"), MediaType::Movie).unwrap();

    assert_eq!(store.list_watchlist().len(), 2);
    store.remove_from_watchlist(42, MediaType::Tv).unwrap();
    assert!(store.is_in_watchlist(42, MediaType::Movie));
    assert!(!store.is_in_watchlist(42, MediaType::Tv));
}

#[test]
fn legacy_bare_arrays_are_upgraded_on_open() {
    let dir = tempdir().expect("tempdir");
    let backend = JsonFileStore::new(dir.path().to_path_buf());
    backend
        .set(
            "friends-clone-watchlist",
            r#"[{"id":1,"mediaType":"movie","title":"Old","addedAt":1},{"garbage":true}]"#,
        )
        .unwrap();

    let runtime = runtime_at(dir.path());
    let watchlist = invoke(&runtime, "list_watchlist", Value::Null);
    assert_eq!(watchlist["data"].as_array().unwrap().len(), 1);
    assert_eq!(watchlist["data"][0]["title"], "Old");

    let raw = backend.get("friends-clone-watchlist").unwrap().unwrap();
    let envelope: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope["schemaVersion"], CURRENT_SCHEMA_VERSION);
}

#[test]
fn corrupt_state_file_reads_as_empty_and_recovers_on_write() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join(STATE_FILE_NAME), "{ not json").unwrap();

    let store = LocalStore::new(
        Arc::new(JsonFileStore::new(dir.path().to_path_buf())),
        "friends-clone",
    );
    assert!(store.list_profiles().is_empty());

    store.create_profile("Alex", None).unwrap();
    assert_eq!(store.list_profiles().len(), 1);
    assert!(dir.path().join("watchdeck-state.corrupt").exists());
}

struct CannedProvider;

impl MetadataProvider for CannedProvider {
    fn fetch_list<'a>(
        &'a self,
        _path: &'a str,
        _params: &'a [(&'a str, &'a str)],
    ) -> MetadataFuture<'a, MovieResponse> {
        Box::pin(async { Ok(MovieResponse::default()) })
    }

    fn search<'a>(&'a self, query: &'a str) -> MetadataFuture<'a, MovieResponse> {
        Box::pin(async move {
            Ok(MovieResponse {
                page: 1,
                results: vec![Movie {
                    id: 1668,
                    name: Some(query.to_string()),
                    poster_path: Some("/friends.jpg".to_string()),
                    ..Movie::default()
                }],
                total_pages: 1,
                total_results: 1,
            })
        })
    }

    fn details<'a>(&'a self, _media_type: MediaType, _id: u64) -> MetadataFuture<'a, MovieDetails> {
        Box::pin(async { Err(anyhow::anyhow!("details offline")) })
    }

    fn season<'a>(&'a self, _tv_id: u64, _season_number: u32) -> MetadataFuture<'a, Vec<Episode>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

#[tokio::test]
async fn metadata_commands_go_through_the_provider() {
    let metadata = MetadataService::new(Arc::new(CannedProvider), DEFAULT_IMAGE_BASE_URL);
    let runtime = Runtime::with_services(LocalStore::in_memory("meta"), Some(metadata));

    let request = json!({ "command": "search", "payload": { "query": "Friends" } }).to_string();
    let response: Value = serde_json::from_str(&runtime.invoke_json_async(&request).await).unwrap();
    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["results"][0]["name"], "Friends");

    let request = json!({
        "command": "get_details",
        "payload": { "id": 1668, "mediaType": "tv" }
    })
    .to_string();
    let response: Value = serde_json::from_str(&runtime.invoke_json_async(&request).await).unwrap();
    assert_eq!(response["error"]["code"], "metadata_failure");
}

#[test]
fn image_urls_use_the_configured_base() {
    let metadata = MetadataService::new(Arc::new(CannedProvider), "https://img.example/t/p/");
    let runtime = Runtime::with_services(LocalStore::in_memory("meta"), Some(metadata));

    let poster = invoke(
        &runtime,
        "get_image_url",
        json!({ "path": "/friends.jpg", "size": "w300" }),
    );
    assert_eq!(poster["data"]["url"], "https://img.example/t/p/w300/friends.jpg");

    let placeholder = invoke(&runtime, "get_image_url", json!({}));
    assert_eq!(placeholder["data"]["url"], "/placeholder.svg");
}

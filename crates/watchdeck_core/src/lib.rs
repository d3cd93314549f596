use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

pub mod config;
pub mod events;
pub mod logging;
pub mod models;
pub mod servers;
pub mod storage;
pub mod tmdb;

use config::{MetadataSettings, RuntimeConfig};
use models::{
    BootstrapState, CategoryInput, ContentInput, ContentKeyInput, CreateProfileInput,
    EmbedUrlInput, EmbedUrlResult, ImageUrlInput, ProfileIdInput, RecordProgressInput,
    RuntimeLabelInput, SearchInput, SeasonInput, SetServerInput, MAX_PROFILES,
    MAX_PROFILE_NAME_CHARS,
};
use storage::{LocalStore, StoreError};
use tmdb::{client::TmdbClient, MetadataService};

type SharedCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

const ASYNC_COMMANDS: &[&str] = &["fetch_category", "search", "get_details", "get_season"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvokeError {
    pub code: String,
    pub message: String,
}

impl InvokeError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InvokeError>,
}

/// Entry point for a UI host: owns the watch-state store and the optional
/// metadata service, and answers JSON commands.
pub struct Runtime {
    store: LocalStore,
    metadata: Option<MetadataService>,
    callback: Mutex<Option<SharedCallback>>,
}

impl Runtime {
    pub fn new(config_json: &str) -> anyhow::Result<Self> {
        let config = RuntimeConfig::from_json(config_json)?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        let store = if config.in_memory {
            LocalStore::in_memory(config.namespace())
        } else {
            let data_dir = config.resolve_data_dir();
            info!("watch state stored under {}", data_dir.display());
            LocalStore::open(data_dir, config.namespace())
        };

        match store.migrate_if_needed() {
            Ok(report) if report.discarded > 0 => warn!(
                "storage migration dropped {} unreadable record(s)",
                report.discarded
            ),
            Ok(_) => {}
            Err(error) => warn!("storage migration failed: {error}"),
        }

        Self::with_services(store, build_metadata_service(&config.metadata))
    }

    pub fn with_services(store: LocalStore, metadata: Option<MetadataService>) -> Self {
        Self {
            store,
            metadata,
            callback: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn set_event_callback<F>(&self, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::new(callback));
    }

    pub fn clear_event_callback(&self) {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Answers every command that does not need the network.
    pub fn invoke_json(&self, request_json: &str) -> String {
        let response = parse_request(request_json).and_then(|request| self.dispatch(request));
        render_response(response)
    }

    /// Like `invoke_json`, and additionally serves the metadata commands.
    pub async fn invoke_json_async(&self, request_json: &str) -> String {
        let response = match parse_request(request_json) {
            Ok(request) => self.dispatch_async(request).await,
            Err(error) => Err(error),
        };
        render_response(response)
    }

    fn dispatch(&self, request: InvokeRequest) -> Result<Value, InvokeError> {
        match request.command.as_str() {
            "get_bootstrap_state" => to_data(self.bootstrap_state()),
            "list_profiles" => to_data(self.store.list_profiles()),
            "create_profile" => self.create_profile(request.payload),
            "delete_profile" => self.delete_profile(request.payload),
            "get_active_profile" => to_data(self.store.get_active_profile()),
            "set_active_profile" => self.set_active_profile(request.payload),
            "list_watchlist" => to_data(self.store.list_watchlist()),
            "add_to_watchlist" => self.add_to_watchlist(request.payload),
            "remove_from_watchlist" => self.remove_from_watchlist(request.payload),
            "is_in_watchlist" => {
                let input = parse_payload::<ContentKeyInput>(request.payload)?;
                Ok(json!({
                    "inWatchlist": self.store.is_in_watchlist(input.id, input.media_type)
                }))
            }
            "toggle_watchlist" => self.toggle_watchlist(request.payload),
            "list_continue_watching" => to_data(self.store.list_continue_watching()),
            "record_progress" => self.record_progress(request.payload),
            "set_continue_watching_server" => self.set_continue_watching_server(request.payload),
            "remove_from_continue_watching" => {
                self.remove_from_continue_watching(request.payload)
            }
            "get_last_watched" => {
                let input = parse_payload::<ContentKeyInput>(request.payload)?;
                to_data(self.store.get_last_watched(input.id, input.media_type))
            }
            "list_servers" => to_data(servers::list_servers()),
            "get_embed_url" => self.get_embed_url(request.payload),
            "list_categories" => to_data(tmdb::CATEGORIES),
            "get_image_url" => {
                let input = parse_payload::<ImageUrlInput>(request.payload)?;
                let url = self.metadata()?.image_url(input.path.as_deref(), &input.size);
                Ok(json!({ "url": url }))
            }
            "format_runtime" => {
                let input = parse_payload::<RuntimeLabelInput>(request.payload)?;
                Ok(json!({ "label": tmdb::format_runtime(input.minutes) }))
            }
            command if ASYNC_COMMANDS.contains(&command) => Err(InvokeError::new(
                "async_command",
                format!("{command} needs the network; send it through invoke_json_async"),
            )),
            _ => Err(InvokeError::new(
                "unknown_command",
                format!("unsupported command: {}", request.command),
            )),
        }
    }

    async fn dispatch_async(&self, request: InvokeRequest) -> Result<Value, InvokeError> {
        match request.command.as_str() {
            "fetch_category" => {
                let input = parse_payload::<CategoryInput>(request.payload)?;
                let page = self
                    .metadata()?
                    .fetch_category(&input.id)
                    .await
                    .map_err(metadata_failure)?;
                to_data(page)
            }
            "search" => {
                let input = parse_payload::<SearchInput>(request.payload)?;
                let page = self
                    .metadata()?
                    .search(&input.query)
                    .await
                    .map_err(metadata_failure)?;
                to_data(page)
            }
            "get_details" => {
                let input = parse_payload::<ContentKeyInput>(request.payload)?;
                let details = self
                    .metadata()?
                    .details(input.media_type, input.id)
                    .await
                    .map_err(metadata_failure)?;
                to_data(details)
            }
            "get_season" => {
                let input = parse_payload::<SeasonInput>(request.payload)?;
                let episodes = self
                    .metadata()?
                    .season(input.id, input.season_number)
                    .await
                    .map_err(metadata_failure)?;
                to_data(episodes)
            }
            _ => self.dispatch(request),
        }
    }

    fn metadata(&self) -> Result<&MetadataService, InvokeError> {
        self.metadata.as_ref().ok_or_else(|| {
            InvokeError::new(
                "metadata_unavailable",
                "no TMDB api key configured; set metadata.apiKey or TMDB_API_KEY",
            )
        })
    }

    fn bootstrap_state(&self) -> BootstrapState {
        BootstrapState {
            active_profile: self.store.get_active_profile(),
            profiles: self.store.list_profiles(),
            watchlist: self.store.list_watchlist(),
            continue_watching: self.store.list_continue_watching(),
            servers: servers::list_servers(),
            metadata_available: self.metadata.is_some(),
            profile_limit: MAX_PROFILES,
        }
    }

    fn create_profile(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<CreateProfileInput>(payload)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(InvokeError::new(
                "validation_failed",
                "profile name cannot be empty",
            ));
        }
        if name.chars().count() > MAX_PROFILE_NAME_CHARS {
            return Err(InvokeError::new(
                "validation_failed",
                format!("profile name cannot exceed {MAX_PROFILE_NAME_CHARS} characters"),
            ));
        }
        let avatar = input
            .avatar
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let profile = self
            .store
            .create_profile_capped(name, avatar, MAX_PROFILES)
            .map_err(storage_failure)?;
        self.emit_profiles_changed();
        to_data(profile)
    }

    fn delete_profile(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ProfileIdInput>(payload)?;
        self.store
            .delete_profile(&input.id)
            .map_err(storage_failure)?;
        self.emit_profiles_changed();
        Ok(json!({ "deleted": true }))
    }

    fn set_active_profile(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ProfileIdInput>(payload)?;
        self.store
            .set_active_profile(&input.id)
            .map_err(storage_failure)?;
        self.emit_profiles_changed();
        to_data(self.store.get_active_profile())
    }

    fn add_to_watchlist(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ContentInput>(payload)?;
        self.store
            .add_to_watchlist(&input.content, input.media_type)
            .map_err(storage_failure)?;
        self.emit_watchlist_changed();
        Ok(json!({ "inWatchlist": true }))
    }

    fn remove_from_watchlist(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ContentKeyInput>(payload)?;
        self.store
            .remove_from_watchlist(input.id, input.media_type)
            .map_err(storage_failure)?;
        self.emit_watchlist_changed();
        Ok(json!({ "inWatchlist": false }))
    }

    fn toggle_watchlist(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ContentInput>(payload)?;
        let in_watchlist = self
            .store
            .toggle_watchlist(&input.content, input.media_type)
            .map_err(storage_failure)?;
        self.emit_watchlist_changed();
        Ok(json!({ "inWatchlist": in_watchlist }))
    }

    fn record_progress(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<RecordProgressInput>(payload)?;
        if let Some(server_id) = input.server_id {
            servers::server(server_id).map_err(unknown_server)?;
        }

        let entry = self
            .store
            .record_progress(&input.content, input.media_type, input.update())
            .map_err(storage_failure)?;
        self.emit_continue_watching_changed();
        to_data(entry)
    }

    fn set_continue_watching_server(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<SetServerInput>(payload)?;
        servers::server(input.server_id).map_err(unknown_server)?;

        let updated = self
            .store
            .set_continue_watching_server(input.id, input.media_type, input.server_id)
            .map_err(storage_failure)?;
        if updated {
            self.emit_continue_watching_changed();
        }
        Ok(json!({ "updated": updated }))
    }

    fn remove_from_continue_watching(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<ContentKeyInput>(payload)?;
        self.store
            .remove_from_continue_watching(input.id, input.media_type)
            .map_err(storage_failure)?;
        self.emit_continue_watching_changed();
        Ok(json!({ "removed": true }))
    }

    /// Without an explicit server or episode, resumes from what the
    /// continue-watching entry remembers.
    fn get_embed_url(&self, payload: Value) -> Result<Value, InvokeError> {
        let input = parse_payload::<EmbedUrlInput>(payload)?;
        let last_watched = self.store.get_last_watched(input.id, input.media_type);

        let server_id = input
            .server_id
            .unwrap_or_else(|| servers::preferred_server(last_watched.as_ref()));
        let server = servers::server(server_id).map_err(unknown_server)?;

        let (season_number, episode_number) = match (input.season_number, input.episode_number)
        {
            (None, None) => last_watched
                .map(|item| item.resume_target())
                .map(|target| (target.season_number, target.episode_number))
                .unwrap_or((None, None)),
            coordinates => coordinates,
        };

        to_data(EmbedUrlResult {
            server_id,
            server_name: server.name.to_string(),
            url: server.embed_url(input.media_type, input.id, season_number, episode_number),
        })
    }

    fn emit_profiles_changed(&self) {
        if let Ok(payload) = serde_json::to_value(self.store.list_profiles()) {
            self.emit_event(events::EVENT_PROFILES_CHANGED, &payload);
        }
    }

    fn emit_watchlist_changed(&self) {
        if let Ok(payload) = serde_json::to_value(self.store.list_watchlist()) {
            self.emit_event(events::EVENT_WATCHLIST_CHANGED, &payload);
        }
    }

    fn emit_continue_watching_changed(&self) {
        if let Ok(payload) = serde_json::to_value(self.store.list_continue_watching()) {
            self.emit_event(events::EVENT_CONTINUE_WATCHING_CHANGED, &payload);
        }
    }

    fn emit_event(&self, event: &str, payload: &Value) {
        let callback = {
            let guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
            guard.clone()
        };
        if let Some(callback) = callback {
            let event_payload = json!({
                "event": event,
                "payload": payload
            });
            callback(event, &event_payload);
        }
    }
}

fn build_metadata_service(settings: &MetadataSettings) -> Option<MetadataService> {
    let Some(api_key) = settings.resolved_api_key() else {
        info!("no TMDB api key configured; metadata commands are disabled");
        return None;
    };

    let client = TmdbClient::with_config(
        reqwest::Client::new(),
        api_key,
        settings.base_url.clone(),
        settings.language.clone(),
    );
    Some(MetadataService::new(
        Arc::new(client),
        settings.image_base_url.clone(),
    ))
}

fn parse_request(request_json: &str) -> Result<InvokeRequest, InvokeError> {
    serde_json::from_str::<InvokeRequest>(request_json).map_err(|error| {
        InvokeError::new("invalid_request", format!("invalid request JSON: {error}"))
    })
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, InvokeError> {
    serde_json::from_value(payload)
        .map_err(|error| InvokeError::new("invalid_payload", error.to_string()))
}

fn to_data<T: Serialize>(value: T) -> Result<Value, InvokeError> {
    serde_json::to_value(value)
        .map_err(|error| InvokeError::new("serialization_failure", error.to_string()))
}

fn render_response(response: Result<Value, InvokeError>) -> String {
    let payload = match response {
        Ok(data) => InvokeResponse {
            ok: true,
            data: Some(data),
            error: None,
        },
        Err(error) => InvokeResponse {
            ok: false,
            data: None,
            error: Some(error),
        },
    };

    serde_json::to_string(&payload).unwrap_or_else(|_| {
        r#"{"ok":false,"error":{"code":"serialization_failure","message":"failed to serialize response"}}"#
            .to_string()
    })
}

fn storage_failure(error: StoreError) -> InvokeError {
    if let StoreError::ProfileLimit { .. } = error {
        return InvokeError::new("profile_limit_reached", error.to_string());
    }
    warn!("storage write failed: {error}");
    InvokeError::new("storage_failure", error.to_string())
}

fn unknown_server(error: servers::ServerError) -> InvokeError {
    InvokeError::new("unknown_server", error.to_string())
}

fn metadata_failure(error: anyhow::Error) -> InvokeError {
    warn!("metadata request failed: {error:#}");
    InvokeError::new("metadata_failure", format!("{error:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Runtime::with_services(LocalStore::in_memory("test"), None)
    }

    fn invoke(runtime: &Runtime, command: &str, payload: Value) -> InvokeResponse {
        let request = json!({ "command": command, "payload": payload }).to_string();
        serde_json::from_str(&runtime.invoke_json(&request)).unwrap()
    }

    fn error_code(response: &InvokeResponse) -> &str {
        response.error.as_ref().map(|error| error.code.as_str()).unwrap_or("")
    }

    #[test]
    fn create_profile_validates_names() {
        let runtime = runtime();

        let blank = invoke(&runtime, "create_profile", json!({ "name": "   " }));
        assert!(!blank.ok);
        assert_eq!(error_code(&blank), "validation_failed");

        let long = invoke(&runtime, "create_profile", json!({ "name": "x".repeat(26) }));
        assert_eq!(error_code(&long), "validation_failed");

        let ok = invoke(&runtime, "create_profile", json!({ "name": "  Alex " }));
        assert!(ok.ok);
        let data = ok.data.unwrap();
        assert_eq!(data["name"], "Alex");
        assert_eq!(data["isActive"], true);
    }

    #[test]
    fn create_profile_enforces_the_limit() {
        let runtime = runtime();
        for index in 0..MAX_PROFILES {
            let payload = json!({ "name": format!("P{index}") });
            let response = invoke(&runtime, "create_profile", payload);
            assert!(response.ok);
        }

        let extra = invoke(&runtime, "create_profile", json!({ "name": "One too many" }));
        assert_eq!(error_code(&extra), "profile_limit_reached");
        assert_eq!(runtime.store().list_profiles().len(), MAX_PROFILES);
    }

    #[test]
    fn concurrent_creates_never_pass_the_limit() {
        let runtime = Arc::new(runtime());
        let barrier = Arc::new(std::sync::Barrier::new(12));

        let handles: Vec<_> = (0..12)
            .map(|index| {
                let runtime = Arc::clone(&runtime);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    invoke(&runtime, "create_profile", json!({ "name": format!("P{index}") }))
                })
            })
            .collect();

        let responses: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(responses.iter().filter(|response| response.ok).count(), MAX_PROFILES);
        assert!(responses
            .iter()
            .filter(|response| !response.ok)
            .all(|response| error_code(response) == "profile_limit_reached"));
        assert_eq!(runtime.store().list_profiles().len(), MAX_PROFILES);
    }

    #[test]
    fn display_helpers_are_reachable_as_commands() {
        let runtime = runtime();

        let label = invoke(&runtime, "format_runtime", json!({ "minutes": 125 }));
        assert_eq!(label.data.unwrap()["label"], "2h 5m");
        let missing = invoke(&runtime, "format_runtime", json!({}));
        assert_eq!(missing.data.unwrap()["label"], "N/A");

        let image = invoke(&runtime, "get_image_url", json!({ "path": "/a.jpg" }));
        assert_eq!(error_code(&image), "metadata_unavailable");
    }

    #[test]
    fn embed_url_resumes_remembered_server_and_episode() {
        let runtime = runtime();
        let recorded = invoke(
            &runtime,
            "record_progress",
            json!({
                "content": { "id": 1668, "name": "Friends", "poster_path": "/f.jpg" },
                "mediaType": "tv",
                "seasonNumber": 2,
                "episodeNumber": 3
            }),
        );
        assert!(recorded.ok);

        let updated = invoke(
            &runtime,
            "set_continue_watching_server",
            json!({ "id": 1668, "mediaType": "tv", "serverId": 3 }),
        );
        assert_eq!(updated.data.unwrap()["updated"], true);

        let url = invoke(&runtime, "get_embed_url", json!({ "id": 1668, "mediaType": "tv" }));
        let data = url.data.unwrap();
        assert_eq!(data["serverId"], 3);
        assert_eq!(
            data["url"],
            "https://vidsrc.in/embed/tv?tmdb=1668&season=2&episode=3"
        );

        let explicit = invoke(
            &runtime,
            "get_embed_url",
            json!({
                "id": 1668,
                "mediaType": "tv",
                "serverId": 0,
                "seasonNumber": 5,
                "episodeNumber": 1
            }),
        );
        assert_eq!(
            explicit.data.unwrap()["url"],
            "https://embed.su/embed/tv/1668/5/1"
        );
    }

    #[test]
    fn unknown_servers_are_rejected() {
        let runtime = runtime();
        let response = invoke(
            &runtime,
            "set_continue_watching_server",
            json!({ "id": 1, "mediaType": "movie", "serverId": 9 }),
        );
        assert_eq!(error_code(&response), "unknown_server");

        let url = invoke(
            &runtime,
            "get_embed_url",
            json!({ "id": 1, "mediaType": "movie", "serverId": 9 }),
        );
        assert_eq!(error_code(&url), "unknown_server");
    }

    #[test]
    fn toggle_and_membership_round_trip() {
        let runtime = runtime();
        let content = json!({
            "content": { "id": 550, "title": "Fight Club" },
            "mediaType": "movie"
        });

        let toggled = invoke(&runtime, "toggle_watchlist", content.clone());
        assert_eq!(toggled.data.unwrap()["inWatchlist"], true);

        let key = json!({ "id": 550, "mediaType": "movie" });
        let member = invoke(&runtime, "is_in_watchlist", key);
        assert_eq!(member.data.unwrap()["inWatchlist"], true);

        let toggled = invoke(&runtime, "toggle_watchlist", content);
        assert_eq!(toggled.data.unwrap()["inWatchlist"], false);
    }

    #[test]
    fn mutations_emit_events() {
        let runtime = runtime();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        runtime.set_event_callback(move |event, payload| {
            assert_eq!(payload["event"], event);
            sink.lock().unwrap().push(event.to_string());
        });

        invoke(&runtime, "create_profile", json!({ "name": "Alex" }));
        invoke(
            &runtime,
            "add_to_watchlist",
            json!({ "content": { "id": 1 }, "mediaType": "movie" }),
        );
        invoke(
            &runtime,
            "record_progress",
            json!({ "content": { "id": 1 }, "mediaType": "movie", "progress": 12.5 }),
        );
        invoke(&runtime, "list_watchlist", Value::Null);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[
                events::EVENT_PROFILES_CHANGED.to_string(),
                events::EVENT_WATCHLIST_CHANGED.to_string(),
                events::EVENT_CONTINUE_WATCHING_CHANGED.to_string(),
            ]
        );

        runtime.clear_event_callback();
        invoke(&runtime, "create_profile", json!({ "name": "Sam" }));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn malformed_requests_and_payloads_are_reported() {
        let runtime = runtime();

        let raw: InvokeResponse = serde_json::from_str(&runtime.invoke_json("not json")).unwrap();
        assert_eq!(error_code(&raw), "invalid_request");

        let payload = invoke(&runtime, "add_to_watchlist", json!({ "mediaType": "anime" }));
        assert_eq!(error_code(&payload), "invalid_payload");

        let unknown = invoke(&runtime, "launch_rockets", Value::Null);
        assert_eq!(error_code(&unknown), "unknown_command");

        let network = invoke(&runtime, "search", json!({ "query": "friends" }));
        assert_eq!(error_code(&network), "async_command");
    }

    #[test]
    fn bootstrap_reports_state_and_catalogues() {
        let runtime = runtime();
        invoke(&runtime, "create_profile", json!({ "name": "Alex" }));

        let data = invoke(&runtime, "get_bootstrap_state", Value::Null).data.unwrap();
        assert_eq!(data["activeProfile"]["name"], "Alex");
        assert_eq!(data["servers"].as_array().unwrap().len(), servers::SERVERS.len());
        assert_eq!(data["metadataAvailable"], false);
        assert_eq!(data["profileLimit"], MAX_PROFILES);

        let categories = invoke(&runtime, "list_categories", Value::Null).data.unwrap();
        assert_eq!(categories[0]["id"], "netflix-originals");
        assert_eq!(categories[0]["isLarge"], true);
        assert!(categories[0].get("path").is_none());
    }

    #[tokio::test]
    async fn metadata_commands_need_a_configured_service() {
        let runtime = runtime();
        let request = json!({ "command": "search", "payload": { "query": "friends" } }).to_string();
        let response: InvokeResponse =
            serde_json::from_str(&runtime.invoke_json_async(&request).await).unwrap();
        assert_eq!(error_code(&response), "metadata_unavailable");

        let local = json!({ "command": "list_servers" }).to_string();
        let response: InvokeResponse =
            serde_json::from_str(&runtime.invoke_json_async(&local).await).unwrap();
        assert!(response.ok);
    }
}

use log::debug;

use super::{now_millis, LocalStore, StoreError};
use crate::models::{ContentSummary, ContinueWatchingItem, MediaType, ProgressUpdate};

pub const CONTINUE_WATCHING_CAP: usize = 15;

impl LocalStore {
    /// Most recently watched first.
    pub fn list_continue_watching(&self) -> Vec<ContinueWatchingItem> {
        self.read_collection(&self.keys.continue_watching)
    }

    /// Replaces any entry for `(content.id, media_type)` with a fresh one at
    /// the front, then drops whatever falls past the cap.
    pub fn record_progress(
        &self,
        content: &ContentSummary,
        media_type: MediaType,
        update: ProgressUpdate,
    ) -> Result<ContinueWatchingItem, StoreError> {
        let _guard = self.lock();
        let mut items = self.list_continue_watching();
        items.retain(|item| !item.matches(content.id, media_type));

        let entry = ContinueWatchingItem {
            id: content.id,
            media_type,
            title: content.display_title(),
            poster_path: content.poster_path.clone(),
            last_watched_at: now_millis(),
            progress: update.clamped_progress(),
            season_number: update.season_number,
            episode_number: update.episode_number,
            server_id: update.server_id,
        };
        items.insert(0, entry.clone());
        items.truncate(CONTINUE_WATCHING_CAP);

        self.write_collection(&self.keys.continue_watching, &items)?;
        debug!(
            "recorded progress {:.0}% for {media_type}/{}",
            entry.progress, entry.id
        );
        Ok(entry)
    }

    /// Remembers the embed server for an entry without touching its
    /// position or timestamp. Unknown entries are left alone.
    pub fn set_continue_watching_server(
        &self,
        id: u64,
        media_type: MediaType,
        server_id: usize,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut items = self.list_continue_watching();

        let Some(entry) = items.iter_mut().find(|item| item.matches(id, media_type)) else {
            return Ok(false);
        };
        entry.server_id = Some(server_id);

        self.write_collection(&self.keys.continue_watching, &items)?;
        debug!("server {server_id} remembered for {media_type}/{id}");
        Ok(true)
    }

    pub fn remove_from_continue_watching(
        &self,
        id: u64,
        media_type: MediaType,
    ) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut items = self.list_continue_watching();
        let before = items.len();
        items.retain(|item| !item.matches(id, media_type));

        if items.len() == before {
            return Ok(());
        }

        self.write_collection(&self.keys.continue_watching, &items)?;
        debug!("removed {media_type}/{id} from continue watching");
        Ok(())
    }

    pub fn get_last_watched(&self, id: u64, media_type: MediaType) -> Option<ContinueWatchingItem> {
        self.list_continue_watching()
            .into_iter()
            .find(|item| item.matches(id, media_type))
    }
}

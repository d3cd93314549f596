use log::debug;

use super::{now_millis, LocalStore, StoreError};
use crate::models::{ContentSummary, MediaType, WatchlistItem};

impl LocalStore {
    pub fn list_watchlist(&self) -> Vec<WatchlistItem> {
        self.read_collection(&self.keys.watchlist)
    }

    /// Appends the item unless `(id, media_type)` is already saved.
    pub fn add_to_watchlist(
        &self,
        content: &ContentSummary,
        media_type: MediaType,
    ) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut watchlist = self.list_watchlist();
        self.append_if_absent(&mut watchlist, content, media_type)
    }

    pub fn remove_from_watchlist(&self, id: u64, media_type: MediaType) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut watchlist = self.list_watchlist();
        self.remove_matching(&mut watchlist, id, media_type)
    }

    pub fn is_in_watchlist(&self, id: u64, media_type: MediaType) -> bool {
        self.list_watchlist()
            .iter()
            .any(|item| item.matches(id, media_type))
    }

    /// Flips membership and reports whether the item is saved afterwards.
    pub fn toggle_watchlist(
        &self,
        content: &ContentSummary,
        media_type: MediaType,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut watchlist = self.list_watchlist();

        if watchlist
            .iter()
            .any(|item| item.matches(content.id, media_type))
        {
            self.remove_matching(&mut watchlist, content.id, media_type)?;
            Ok(false)
        } else {
            self.append_if_absent(&mut watchlist, content, media_type)?;
            Ok(true)
        }
    }

    fn append_if_absent(
        &self,
        watchlist: &mut Vec<WatchlistItem>,
        content: &ContentSummary,
        media_type: MediaType,
    ) -> Result<(), StoreError> {
        if watchlist
            .iter()
            .any(|item| item.matches(content.id, media_type))
        {
            return Ok(());
        }

        watchlist.push(WatchlistItem {
            id: content.id,
            media_type,
            title: content.display_title(),
            poster_path: content.poster_path.clone(),
            added_at: now_millis(),
        });
        self.write_collection(&self.keys.watchlist, watchlist)?;
        debug!("added {media_type}/{} to watchlist", content.id);
        Ok(())
    }

    fn remove_matching(
        &self,
        watchlist: &mut Vec<WatchlistItem>,
        id: u64,
        media_type: MediaType,
    ) -> Result<(), StoreError> {
        let before = watchlist.len();
        watchlist.retain(|item| !item.matches(id, media_type));
        if watchlist.len() == before {
            return Ok(());
        }

        self.write_collection(&self.keys.watchlist, watchlist)?;
        debug!("removed {media_type}/{id} from watchlist");
        Ok(())
    }
}

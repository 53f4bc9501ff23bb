//! Playlists for the signage player.
//!
//! A playlist is an ordered item list; the rotation only ever addresses
//! the non-ticker subsequence. `rss-ticker` items are excluded from the
//! cycle and surface through [`PlaylistBoard::current_ticker`] instead.
//!
//! Mutations persist the whole document and roll back on a failed save,
//! mirroring the roster store.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::StoreError;
use crate::store::PlaylistPersistence;
use crate::types::{ItemKind, PlayerState, PlaylistDocument, PlaylistItem, DEFAULT_PLAYLIST};
use crate::util::now_millis;

/// Hosted ticker/marquee embeds are always overlays, whatever kind the
/// caller picked in the form.
fn ticker_embed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"rss\.app/embed/v1/(ticker|marquee)/").expect("valid regex"))
}

pub fn is_ticker_embed(url: &str) -> bool {
    ticker_embed_re().is_match(url)
}

pub struct PlaylistBoard {
    store: Box<dyn PlaylistPersistence>,
    doc: PlaylistDocument,
    /// Index into the non-ticker subsequence of the current playlist.
    index: usize,
    playing: bool,
    last_item_id: u64,
}

impl PlaylistBoard {
    pub fn load(store: Box<dyn PlaylistPersistence>) -> Result<Self, StoreError> {
        let doc = store.load().map_err(StoreError::Persistence)?;
        let doc = doc.unwrap_or_default();
        Ok(Self::with_document(store, doc))
    }

    /// Build around an explicit document, skipping the initial load.
    pub fn with_document(store: Box<dyn PlaylistPersistence>, mut doc: PlaylistDocument) -> Self {
        doc.playlists
            .entry(DEFAULT_PLAYLIST.to_string())
            .or_default();
        if !doc.playlists.contains_key(&doc.current) {
            doc.current = DEFAULT_PLAYLIST.to_string();
        }
        let last_item_id = doc
            .playlists
            .values()
            .flatten()
            .map(|item| item.id)
            .max()
            .unwrap_or(0);

        PlaylistBoard {
            store,
            doc,
            index: 0,
            playing: false,
            last_item_id,
        }
    }

    pub fn document(&self) -> &PlaylistDocument {
        &self.doc
    }

    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            playlist: self.doc.current.clone(),
            index: self.index,
            playing: self.playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Names of every playlist with its item count, default first.
    pub fn playlist_summaries(&self) -> Vec<(String, usize)> {
        let mut names: Vec<&String> = self.doc.playlists.keys().collect();
        names.sort_by(|a, b| {
            (a.as_str() != DEFAULT_PLAYLIST)
                .cmp(&(b.as_str() != DEFAULT_PLAYLIST))
                .then_with(|| a.cmp(b))
        });
        names
            .into_iter()
            .map(|name| (name.clone(), self.doc.playlists[name].len()))
            .collect()
    }

    /// All items of the current playlist, tickers included.
    pub fn items(&self) -> &[PlaylistItem] {
        self.doc
            .playlists
            .get(&self.doc.current)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn non_ticker(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.items()
            .iter()
            .filter(|item| item.kind != ItemKind::RssTicker)
    }

    pub fn non_ticker_len(&self) -> usize {
        self.non_ticker().count()
    }

    /// The item the rotation currently points at, or none when the
    /// non-ticker subsequence is empty. Pure projection.
    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.non_ticker().nth(self.index)
    }

    /// First ticker item of the full playlist, or none. Unaffected by
    /// the rotation index. Pure projection.
    pub fn current_ticker(&self) -> Option<&PlaylistItem> {
        self.items()
            .iter()
            .find(|item| item.kind == ItemKind::RssTicker)
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    /// Step to the next non-ticker item, wrapping at the end. No-op when
    /// the subsequence is empty.
    pub fn advance(&mut self) {
        let len = self.non_ticker_len();
        if len == 0 {
            return;
        }
        self.index = (self.index + 1) % len;
    }

    /// Flip play/pause. Never moves the index; the caller owns starting
    /// and cancelling the advance timer.
    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Append an item to a playlist. A recognized ticker-embed URL forces
    /// the kind to `rss-ticker` regardless of what the caller picked.
    pub fn add_item(
        &mut self,
        playlist: &str,
        kind: ItemKind,
        url: &str,
        duration_ms: u64,
        title: Option<String>,
    ) -> Result<u64, StoreError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StoreError::Validation("a URL is required".to_string()));
        }
        if duration_ms == 0 {
            return Err(StoreError::Validation(
                "duration must be positive".to_string(),
            ));
        }
        if !self.doc.playlists.contains_key(playlist) {
            return Err(StoreError::NotFound(playlist.to_string()));
        }

        let kind = if is_ticker_embed(url) {
            ItemKind::RssTicker
        } else {
            kind
        };
        let id = self.next_item_id();
        let title = title.filter(|t| !t.trim().is_empty());

        let snapshot = (self.doc.clone(), self.index);
        self.doc
            .playlists
            .get_mut(playlist)
            .expect("checked above")
            .push(PlaylistItem {
                id,
                kind,
                url: url.to_string(),
                duration_ms,
                title,
            });
        self.persist_or_rollback(snapshot)?;
        Ok(id)
    }

    /// Remove an item by id. When it comes out of the current playlist
    /// the rotation index is adjusted so it stays valid: removing an
    /// earlier item shifts it left, removing the item it points at wraps
    /// past-the-end to 0.
    pub fn remove_item(&mut self, playlist: &str, id: u64) -> Result<(), StoreError> {
        let items = self
            .doc
            .playlists
            .get(playlist)
            .ok_or_else(|| StoreError::NotFound(playlist.to_string()))?;
        let position = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("item {}", id)))?;
        let removed_is_ticker = items[position].kind == ItemKind::RssTicker;
        let removed_rotation_pos = items[..position]
            .iter()
            .filter(|item| item.kind != ItemKind::RssTicker)
            .count();
        let from_current = playlist == self.doc.current;

        let snapshot = (self.doc.clone(), self.index);
        self.doc
            .playlists
            .get_mut(playlist)
            .expect("checked above")
            .remove(position);

        if from_current {
            if !removed_is_ticker && removed_rotation_pos < self.index {
                self.index -= 1;
            }
            let len = self.non_ticker_len();
            if len == 0 || self.index >= len {
                self.index = 0;
            }
        }

        self.persist_or_rollback(snapshot)
    }

    /// Empty the current playlist and reset the rotation.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let snapshot = (self.doc.clone(), self.index);
        let current = self.doc.current.clone();
        self.doc
            .playlists
            .get_mut(&current)
            .expect("current playlist always exists")
            .clear();
        self.index = 0;
        self.persist_or_rollback(snapshot)
    }

    /// Create an empty playlist and make it current.
    pub fn create_playlist(&mut self, name: &str) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation(
                "a playlist name is required".to_string(),
            ));
        }
        if self.doc.playlists.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        let snapshot = (self.doc.clone(), self.index);
        self.doc.playlists.insert(name.to_string(), Vec::new());
        self.doc.current = name.to_string();
        self.index = 0;
        self.persist_or_rollback(snapshot)
    }

    /// Delete a playlist. "default" is protected; deleting the current
    /// playlist falls back to it.
    pub fn delete_playlist(&mut self, name: &str) -> Result<(), StoreError> {
        if name == DEFAULT_PLAYLIST {
            return Err(StoreError::Protected(name.to_string()));
        }
        if !self.doc.playlists.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let snapshot = (self.doc.clone(), self.index);
        self.doc.playlists.remove(name);
        if self.doc.current == name {
            self.doc.current = DEFAULT_PLAYLIST.to_string();
            self.index = 0;
        }
        self.persist_or_rollback(snapshot)
    }

    pub fn switch_playlist(&mut self, name: &str) -> Result<(), StoreError> {
        if !self.doc.playlists.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let snapshot = (self.doc.clone(), self.index);
        self.doc.current = name.to_string();
        self.index = 0;
        self.persist_or_rollback(snapshot)
    }

    /// Epoch-millis id, bumped past the last issued one so rapid adds in
    /// the same millisecond stay unique and ordered.
    fn next_item_id(&mut self) -> u64 {
        let id = now_millis().max(self.last_item_id + 1);
        self.last_item_id = id;
        id
    }

    fn persist_or_rollback(
        &mut self,
        snapshot: (PlaylistDocument, usize),
    ) -> Result<(), StoreError> {
        match self.store.save(&self.doc) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.doc = snapshot.0;
                self.index = snapshot.1;
                Err(StoreError::Persistence(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::MemoryStore;

    fn board() -> PlaylistBoard {
        PlaylistBoard::load(Box::new(MemoryStore::new())).unwrap()
    }

    fn add(board: &mut PlaylistBoard, kind: ItemKind, url: &str, duration_ms: u64) -> u64 {
        let playlist = board.document().current.clone();
        board.add_item(&playlist, kind, url, duration_ms, None).unwrap()
    }

    #[test]
    fn test_default_playlist_always_exists() {
        let board = board();
        assert!(board.document().playlists.contains_key(DEFAULT_PLAYLIST));
        assert_eq!(board.document().current, DEFAULT_PLAYLIST);
    }

    #[test]
    fn test_create_default_always_duplicate() {
        let mut board = board();
        assert!(matches!(
            board.create_playlist("default"),
            Err(StoreError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_delete_default_always_protected() {
        let mut board = board();
        assert!(matches!(
            board.delete_playlist("default"),
            Err(StoreError::Protected(_))
        ));
    }

    #[test]
    fn test_create_rejects_blank_names() {
        let mut board = board();
        assert!(matches!(
            board.create_playlist("   "),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_advance_is_a_cycle_and_ticker_is_unaffected() {
        let mut board = board();
        add(&mut board, ItemKind::Image, "https://x/a.png", 2000);
        add(&mut board, ItemKind::Website, "https://x/b", 3000);
        add(&mut board, ItemKind::Slide, "https://x/c.pdf", 1000);
        add(
            &mut board,
            ItemKind::RssTicker,
            "https://rss.app/embed/v1/ticker/abc",
            10_000,
        );

        assert_eq!(board.non_ticker_len(), 3);
        let start = board.player_state().index;
        for _ in 0..3 {
            assert!(board.current_ticker().is_some());
            board.advance();
        }
        assert_eq!(board.player_state().index, start);
        assert!(board.current_ticker().is_some());
    }

    #[test]
    fn test_advance_on_empty_subsequence_is_noop() {
        let mut board = board();
        add(
            &mut board,
            ItemKind::Website,
            "https://rss.app/embed/v1/marquee/xyz",
            5000,
        );
        assert_eq!(board.non_ticker_len(), 0);
        board.advance();
        assert_eq!(board.player_state().index, 0);
        assert!(board.current_item().is_none());
    }

    #[test]
    fn test_ticker_embed_url_forces_kind() {
        let mut board = board();
        let id = add(
            &mut board,
            ItemKind::Website,
            "https://rss.app/embed/v1/ticker/abc",
            5000,
        );
        let item = board.items().iter().find(|i| i.id == id).unwrap();
        assert_eq!(item.kind, ItemKind::RssTicker);

        // Ordinary URLs keep the caller's kind.
        let id = add(&mut board, ItemKind::Website, "https://example.com", 5000);
        let item = board.items().iter().find(|i| i.id == id).unwrap();
        assert_eq!(item.kind, ItemKind::Website);
    }

    #[test]
    fn test_add_item_validation() {
        let mut board = board();
        assert!(matches!(
            board.add_item("default", ItemKind::Image, "  ", 5000, None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            board.add_item("default", ItemKind::Image, "https://x", 0, None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            board.add_item("nope", ItemKind::Image, "https://x", 5000, None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_item_ids_are_monotonic() {
        let mut board = board();
        let a = add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        let b = add(&mut board, ItemKind::Image, "https://x/b.png", 1000);
        assert!(b > a);
    }

    #[test]
    fn test_remove_item_keeps_index_valid() {
        let mut board = board();
        let a = add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        let b = add(&mut board, ItemKind::Image, "https://x/b.png", 1000);
        let c = add(&mut board, ItemKind::Image, "https://x/c.png", 1000);

        // Point at c, then remove an earlier item: the same item stays
        // current.
        board.advance();
        board.advance();
        assert_eq!(board.current_item().unwrap().id, c);
        board.remove_item("default", a).unwrap();
        assert_eq!(board.current_item().unwrap().id, c);
        assert_eq!(board.player_state().index, 1);

        // Removing the current tail wraps to the front.
        board.remove_item("default", c).unwrap();
        assert_eq!(board.player_state().index, 0);
        assert_eq!(board.current_item().unwrap().id, b);

        // Removing the last item empties the rotation.
        board.remove_item("default", b).unwrap();
        assert!(board.current_item().is_none());
        assert_eq!(board.player_state().index, 0);

        assert!(matches!(
            board.remove_item("default", 99),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_current_falls_back_to_default() {
        let mut board = board();
        board.create_playlist("lobby").unwrap();
        assert_eq!(board.document().current, "lobby");
        add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        board.advance();

        board.delete_playlist("lobby").unwrap();
        let state = board.player_state();
        assert_eq!(state.playlist, DEFAULT_PLAYLIST);
        assert_eq!(state.index, 0);
    }

    #[test]
    fn test_switch_resets_index() {
        let mut board = board();
        add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        add(&mut board, ItemKind::Image, "https://x/b.png", 1000);
        board.advance();
        assert_eq!(board.player_state().index, 1);

        board.create_playlist("lobby").unwrap();
        board.switch_playlist(DEFAULT_PLAYLIST).unwrap();
        assert_eq!(board.player_state().index, 0);

        assert!(matches!(
            board.switch_playlist("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_toggle_play_never_moves_index() {
        let mut board = board();
        add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        add(&mut board, ItemKind::Image, "https://x/b.png", 1000);
        board.advance();

        assert!(board.toggle_play());
        assert_eq!(board.player_state().index, 1);
        assert!(!board.toggle_play());
        assert_eq!(board.player_state().index, 1);
    }

    #[test]
    fn test_clear_empties_current_playlist_only() {
        let mut board = board();
        add(&mut board, ItemKind::Image, "https://x/a.png", 1000);
        board.create_playlist("lobby").unwrap();
        add(&mut board, ItemKind::Image, "https://x/b.png", 1000);

        board.clear().unwrap();
        assert!(board.items().is_empty());
        assert_eq!(board.document().playlists[DEFAULT_PLAYLIST].len(), 1);
    }

    #[test]
    fn test_failed_save_rolls_back_document_and_index() {
        let store = MemoryStore::new();
        let mut board = PlaylistBoard::load(Box::new(store.handle())).unwrap();
        add(&mut board, ItemKind::Image, "https://x/a.png", 1000);

        store.set_failing(true);
        assert!(matches!(
            board.add_item("default", ItemKind::Image, "https://x/b.png", 1000, None),
            Err(StoreError::Persistence(_))
        ));
        assert_eq!(board.items().len(), 1);

        assert!(matches!(
            board.create_playlist("lobby"),
            Err(StoreError::Persistence(_))
        ));
        assert_eq!(board.document().current, DEFAULT_PLAYLIST);
        assert!(!board.document().playlists.contains_key("lobby"));
    }

    #[test]
    fn test_unknown_current_falls_back_on_load() {
        let store = MemoryStore::new();
        let mut doc = crate::types::PlaylistDocument::default();
        doc.current = "gone".to_string();
        *store.playlists.lock().unwrap() = Some(doc);

        let board = PlaylistBoard::load(Box::new(store)).unwrap();
        assert_eq!(board.document().current, DEFAULT_PLAYLIST);
    }
}

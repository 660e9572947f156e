//! Virtualized window of mounted rows

use std::collections::{HashMap, HashSet};

use super::albums::ListEntry;
use crate::item::{
    AlbumItem, AlbumSubtitle, CandidateItem, ItemContext, ItemLifecycle, ItemProps, ItemView,
    Layout, ScrollMonitor, Theme, ViewportMonitor,
};

/// Keeps lifecycles for the rows on screen plus an overscan margin
///
/// Rows leaving the margin are unmounted; rows inside the margin but off
/// screen stay mounted and dormant.
pub struct RowCache {
    ctx: ItemContext,
    layout: Layout,
    theme: Theme,
    overscan: usize,
    album_subtitle: AlbumSubtitle,
    monitor: ScrollMonitor,
    rows: HashMap<String, ItemLifecycle>,
}

impl RowCache {
    pub fn new(ctx: ItemContext, layout: Layout, overscan: usize) -> Self {
        Self {
            ctx,
            layout,
            theme: Theme::Dark,
            overscan,
            album_subtitle: AlbumSubtitle::Counters,
            monitor: ScrollMonitor::new(),
            rows: HashMap::new(),
        }
    }

    pub fn with_album_subtitle(mut self, subtitle: AlbumSubtitle) -> Self {
        self.album_subtitle = subtitle;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Reconcile mounted rows with the visible range `first..first + visible`
    pub fn update(
        &mut self,
        entries: &[ListEntry],
        first: usize,
        visible: usize,
        active: Option<&str>,
    ) {
        let start = first.saturating_sub(self.overscan);
        let end = (first + visible + self.overscan).min(entries.len());
        let window = entries.get(start..end).unwrap_or(&[]);
        let window_keys: HashSet<String> = window.iter().map(ListEntry::key).collect();

        let stale: Vec<String> = self
            .rows
            .keys()
            .filter(|k| !window_keys.contains(*k))
            .cloned()
            .collect();
        for key in stale {
            if let Some(mut row) = self.rows.remove(&key) {
                row.unmount();
            }
        }

        let on_screen_end = (first + visible).min(entries.len());
        let on_screen = entries
            .get(first.min(on_screen_end)..on_screen_end)
            .unwrap_or(&[])
            .iter()
            .map(ListEntry::key);
        for (key, event) in self.monitor.update(on_screen) {
            if let Some(row) = self.rows.get_mut(&key) {
                row.on_viewport(event);
            }
        }

        for entry in window {
            let key = entry.key();
            if !self.rows.contains_key(&key)
                && let Some(mut row) = self.build(entry)
            {
                row.mount(Some(self.monitor.create(&key)));
                self.rows.insert(key.clone(), row);
            }
            if let Some(row) = self.rows.get_mut(&key) {
                row.set_active(active == Some(key.as_str()));
            }
        }
    }

    fn build(&self, entry: &ListEntry) -> Option<ItemLifecycle> {
        let (item, id): (Box<dyn crate::item::LibraryItem>, String) = match entry {
            ListEntry::Album(uri) => (
                Box::new(AlbumItem::new(self.ctx.clone(), self.album_subtitle.clone())),
                uri.clone(),
            ),
            ListEntry::Candidate(album) => (
                Box::new(CandidateItem::new(album.clone())),
                CandidateItem::key(album),
            ),
            ListEntry::SearchPrompt | ListEntry::Searching => return None,
        };
        let mut props = ItemProps::new(id, self.layout);
        props.theme = self.theme;
        props.clickable = matches!(entry, ListEntry::Album(_));
        Some(ItemLifecycle::new(item, props))
    }

    /// Apply pending deliveries to every mounted row
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for row in self.rows.values_mut() {
            changed |= row.poll();
        }
        changed
    }

    pub fn view(&self, key: &str) -> Option<ItemView> {
        self.rows.get(key).map(ItemLifecycle::render)
    }

    pub fn row(&self, key: &str) -> Option<&ItemLifecycle> {
        self.rows.get(key)
    }

    pub fn mounted(&self) -> usize {
        self.rows.len()
    }

    /// Unmount everything
    pub fn clear(&mut self) {
        for (_, mut row) in self.rows.drain() {
            row.unmount();
        }
    }
}

impl Drop for RowCache {
    fn drop(&mut self) {
        self.clear();
    }
}

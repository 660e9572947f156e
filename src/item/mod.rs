//! Catalog rows and their load/unload lifecycle
//!
//! Every row kind implements [`LibraryItem`]. An [`ItemLifecycle`] owns one
//! row and decides when it is worth loading: immediately on mount when no
//! viewport watcher is attached, otherwise only while the row is on screen.

pub mod album;
pub mod artist;
pub mod candidate;
pub mod image;
pub mod layout;
mod pending;
#[cfg(test)]
pub(crate) mod tests_support;
pub mod viewport;

pub use album::{AlbumItem, AlbumSubtitle};
pub use artist::{ArtistItem, ArtistSubtitle};
pub use candidate::CandidateItem;
pub use image::{ImageContent, ImageSlot, LoadTicket};
pub use layout::{Layout, Theme};
pub use viewport::{ScrollMonitor, ViewportEvent, ViewportMonitor, ViewportWatcher};

use std::sync::Arc;
use tracing::debug;

use crate::library::{ArtworkSource, BlobRegistry, LibraryProvider};

/// Text of a header or subtitle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Empty,
    /// Placeholder shaped like the real text, shown until data arrives
    Skeleton(String),
    Text(String),
}

impl Content {
    pub fn as_str(&self) -> &str {
        match self {
            Content::Empty => "",
            Content::Skeleton(s) | Content::Text(s) => s,
        }
    }

    pub fn is_skeleton(&self) -> bool {
        matches!(self, Content::Skeleton(_))
    }
}

/// Capabilities of one kind of catalog row
pub trait LibraryItem {
    /// Subscribe to the record behind `id`
    fn load_item(&mut self, id: &str);

    /// Release every subscription and image handle taken by `load_item`/`load_image`
    fn unload_item(&mut self);

    /// Begin loading artwork for `id` into `target`
    fn load_image(&mut self, id: &str, target: &ImageSlot);

    fn render_header(&self) -> Content;

    fn render_subtitle(&self) -> Content;

    fn class_names(&self) -> Vec<&'static str>;

    /// Apply deliveries that arrived since the last call; true if anything changed
    fn poll(&mut self) -> bool {
        false
    }
}

/// Services shared by every row
#[derive(Clone)]
pub struct ItemContext {
    pub provider: LibraryProvider,
    pub artwork: Arc<dyn ArtworkSource>,
    pub blobs: BlobRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProps {
    pub id: String,
    pub layout: Layout,
    pub theme: Theme,
    pub active: bool,
    pub clickable: bool,
    pub class_name: Option<String>,
}

impl ItemProps {
    pub fn new(id: impl Into<String>, layout: Layout) -> Self {
        Self {
            id: id.into(),
            layout,
            theme: Theme::default(),
            active: false,
            clickable: false,
            class_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Unmounted,
    /// Mounted but off screen; nothing loaded
    Dormant,
    /// Loaded and receiving updates
    Active,
    Terminated,
}

/// Everything needed to draw one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub class_names: Vec<String>,
    pub image: ImageContent,
    pub image_size: u32,
    pub header: Content,
    pub subtitle: Content,
}

impl ItemView {
    pub fn has_class(&self, name: &str) -> bool {
        self.class_names.iter().any(|c| c == name)
    }
}

/// Drives one row through mount, viewport changes, identity changes and unmount
pub struct ItemLifecycle {
    item: Box<dyn LibraryItem>,
    props: ItemProps,
    image: ImageSlot,
    watcher: Option<Box<dyn ViewportWatcher>>,
    state: ItemState,
}

impl ItemLifecycle {
    pub fn new(item: Box<dyn LibraryItem>, props: ItemProps) -> Self {
        let image = ImageSlot::new(props.layout.image_size(), props.layout.image_sizing());
        Self {
            item,
            props,
            image,
            watcher: None,
            state: ItemState::Unmounted,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn props(&self) -> &ItemProps {
        &self.props
    }

    pub fn id(&self) -> &str {
        &self.props.id
    }

    fn in_viewport(&self) -> bool {
        self.watcher.as_ref().is_none_or(|w| w.is_in_viewport())
    }

    fn activate(&mut self) {
        debug!("Loading {}", self.props.id);
        self.item.load_item(&self.props.id);
        self.item.load_image(&self.props.id, &self.image);
        self.state = ItemState::Active;
    }

    fn deactivate(&mut self) {
        debug!("Unloading {}", self.props.id);
        self.item.unload_item();
        self.state = ItemState::Dormant;
    }

    /// Attach the row; loads right away unless a watcher says it is off screen
    pub fn mount(&mut self, watcher: Option<Box<dyn ViewportWatcher>>) {
        if self.state != ItemState::Unmounted {
            return;
        }
        self.watcher = watcher;
        self.state = ItemState::Dormant;
        if !self.props.id.is_empty() && self.in_viewport() {
            self.activate();
        }
    }

    pub fn on_viewport(&mut self, event: ViewportEvent) {
        match (event, self.state) {
            (ViewportEvent::Enter, ItemState::Dormant) if !self.props.id.is_empty() => {
                self.activate()
            }
            (ViewportEvent::Exit, ItemState::Active) => self.deactivate(),
            _ => {}
        }
    }

    /// Point the row at another record
    ///
    /// A loaded row releases the old record before subscribing to the new
    /// one, within this call.
    pub fn set_id(&mut self, id: &str) {
        if id == self.props.id || self.state == ItemState::Terminated {
            return;
        }
        let was_active = self.state == ItemState::Active;
        if was_active {
            self.item.unload_item();
            self.state = ItemState::Dormant;
        }
        self.props.id = id.to_string();
        let relevant = was_active || (self.state == ItemState::Dormant && self.in_viewport());
        if relevant && !id.is_empty() {
            self.activate();
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.props.active = active;
    }

    pub fn set_clickable(&mut self, clickable: bool) {
        self.props.clickable = clickable;
    }

    pub fn unmount(&mut self) {
        if self.state == ItemState::Active {
            self.item.unload_item();
        }
        self.state = ItemState::Terminated;
    }

    pub fn poll(&mut self) -> bool {
        match self.state {
            ItemState::Active | ItemState::Dormant => self.item.poll(),
            _ => false,
        }
    }

    pub fn render(&self) -> ItemView {
        let mut class_names = Vec::new();
        if let Some(extra) = &self.props.class_name {
            class_names.push(extra.clone());
        }
        class_names.push("item-component".to_string());
        class_names.push(format!("{}-theme", self.props.theme.as_str()));
        class_names.push(format!("{}-layout", self.props.layout.as_str()));
        class_names.extend(self.item.class_names().into_iter().map(str::to_string));
        if self.props.active {
            class_names.push("active".to_string());
        }
        if self.props.clickable {
            class_names.push("clickable".to_string());
        }

        ItemView {
            class_names,
            image: self.image.content(),
            image_size: self.image.size(),
            header: self.item.render_header(),
            subtitle: self.item.render_subtitle(),
        }
    }
}

impl Drop for ItemLifecycle {
    fn drop(&mut self) {
        if self.state == ItemState::Active {
            self.item.unload_item();
        }
    }
}

/// Fetch embedded artwork for a library record into `target`
///
/// Returns false when the record has no embedded artwork to show: the id is
/// not under `library/`, or the layout shows no image. Failures leave the
/// placeholder in place.
pub(crate) fn load_embedded_artwork(ctx: &ItemContext, id: &str, target: &ImageSlot) -> bool {
    let Some(sizing) = target.sizing() else {
        return false;
    };
    if !id.starts_with("library/") {
        return false;
    }

    let ticket = target.begin();
    let artwork = Arc::clone(&ctx.artwork);
    let blobs = ctx.blobs.clone();
    let slot = target.clone();
    let id = id.to_string();
    tokio::spawn(async move {
        match artwork.artwork(&id, sizing).await {
            Ok(data) => {
                let url = blobs.create(data);
                if let Err(ImageContent::Blob(late)) =
                    slot.fulfil(ticket, ImageContent::Blob(url))
                {
                    blobs.revoke(&late);
                }
            }
            Err(e) => debug!("No artwork for {}: {}", id, e),
        }
    });
    true
}

/// Put `target` back to its placeholder, revoking the blob it displayed
pub(crate) fn release_artwork(ctx: &ItemContext, target: &ImageSlot) {
    if let Some(url) = target.reset() {
        ctx.blobs.revoke(&url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        loads: Vec<String>,
        images: Vec<String>,
        unloads: usize,
    }

    struct CountingItem {
        calls: Rc<RefCell<Calls>>,
    }

    impl LibraryItem for CountingItem {
        fn load_item(&mut self, id: &str) {
            self.calls.borrow_mut().loads.push(id.to_string());
        }

        fn unload_item(&mut self) {
            self.calls.borrow_mut().unloads += 1;
        }

        fn load_image(&mut self, id: &str, _target: &ImageSlot) {
            self.calls.borrow_mut().images.push(id.to_string());
        }

        fn render_header(&self) -> Content {
            Content::Skeleton("Name".to_string())
        }

        fn render_subtitle(&self) -> Content {
            Content::Empty
        }

        fn class_names(&self) -> Vec<&'static str> {
            vec!["counting-component"]
        }
    }

    fn counting(id: &str) -> (ItemLifecycle, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let item = CountingItem {
            calls: Rc::clone(&calls),
        };
        let lifecycle = ItemLifecycle::new(Box::new(item), ItemProps::new(id, Layout::Compact));
        (lifecycle, calls)
    }

    #[test]
    fn test_mount_without_watcher_loads_once() {
        let (mut item, calls) = counting("library/radiohead");
        item.mount(None);
        assert_eq!(item.state(), ItemState::Active);

        item.render();
        item.render();
        item.set_id("library/radiohead");
        item.mount(None);

        assert_eq!(calls.borrow().loads, vec!["library/radiohead"]);
        assert_eq!(calls.borrow().images, vec!["library/radiohead"]);

        item.unmount();
        item.unmount();
        assert_eq!(calls.borrow().unloads, 1);
        assert_eq!(item.state(), ItemState::Terminated);
    }

    #[test]
    fn test_identity_change_swaps_subscription() {
        let (mut item, calls) = counting("library/radiohead");
        item.mount(None);
        item.set_id("library/muse");

        let calls = calls.borrow();
        assert_eq!(calls.loads, vec!["library/radiohead", "library/muse"]);
        assert_eq!(calls.images, vec!["library/radiohead", "library/muse"]);
        assert_eq!(calls.unloads, 1);
        assert_eq!(item.id(), "library/muse");
    }

    #[test]
    fn test_watcher_gates_loading() {
        let monitor = ScrollMonitor::new();
        let (mut item, calls) = counting("library/radiohead");
        item.mount(Some(monitor.create("row-1")));
        assert_eq!(item.state(), ItemState::Dormant);
        assert!(calls.borrow().loads.is_empty());

        monitor.update(["row-1"]);
        item.on_viewport(ViewportEvent::Enter);
        item.on_viewport(ViewportEvent::Enter);
        assert_eq!(item.state(), ItemState::Active);
        assert_eq!(calls.borrow().loads.len(), 1);

        monitor.update(Vec::<String>::new());
        item.on_viewport(ViewportEvent::Exit);
        assert_eq!(item.state(), ItemState::Dormant);
        assert_eq!(calls.borrow().unloads, 1);

        item.unmount();
        assert_eq!(calls.borrow().unloads, 1);
    }

    #[test]
    fn test_visible_on_mount_loads() {
        let monitor = ScrollMonitor::new();
        monitor.update(["row-1"]);
        let (mut item, calls) = counting("library/radiohead");
        item.mount(Some(monitor.create("row-1")));
        assert_eq!(item.state(), ItemState::Active);
        assert_eq!(calls.borrow().loads.len(), 1);
    }

    #[test]
    fn test_identity_change_while_dormant_defers() {
        let monitor = ScrollMonitor::new();
        let (mut item, calls) = counting("library/radiohead");
        item.mount(Some(monitor.create("row-1")));
        item.set_id("library/muse");
        assert!(calls.borrow().loads.is_empty());
        assert_eq!(calls.borrow().unloads, 0);

        monitor.update(["row-1"]);
        item.on_viewport(ViewportEvent::Enter);
        assert_eq!(calls.borrow().loads, vec!["library/muse"]);
    }

    #[test]
    fn test_drop_releases_active_item() {
        let (mut item, calls) = counting("library/radiohead");
        item.mount(None);
        drop(item);
        assert_eq!(calls.borrow().unloads, 1);
    }

    #[test]
    fn test_render_class_names() {
        let (mut item, _calls) = counting("library/radiohead");
        item.mount(None);
        item.set_active(true);
        item.set_clickable(true);

        let view = item.render();
        assert_eq!(
            view.class_names,
            vec![
                "item-component",
                "light-theme",
                "compact-layout",
                "counting-component",
                "active",
                "clickable"
            ]
        );
        assert_eq!(view.image_size, 32);
        assert!(view.header.is_skeleton());
        assert_eq!(view.image, ImageContent::Placeholder);
    }
}

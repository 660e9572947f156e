//! Artwork rendering target of one row

use std::sync::{Arc, Mutex};

use crate::library::{ImageSizing, ObjectUrl, lock};

/// What the image square currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageContent {
    #[default]
    Placeholder,
    /// Embedded artwork held by a blob registry
    Blob(ObjectUrl),
    /// Remote artwork shown by URL
    Remote(String),
}

/// Handle of one artwork load, valid until the slot starts another or resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Default)]
struct SlotState {
    generation: u64,
    request: Option<u64>,
    content: ImageContent,
}

/// Image square that asynchronous artwork loads are written into
///
/// Every load gets a ticket from a generation counter. Once the slot has
/// started another load, or was reset, results carrying an older ticket are
/// handed back to the caller instead of being shown, even when they were
/// issued for the same id.
#[derive(Clone)]
pub struct ImageSlot {
    size: u32,
    sizing: Option<ImageSizing>,
    state: Arc<Mutex<SlotState>>,
}

impl ImageSlot {
    pub fn new(size: u32, sizing: Option<ImageSizing>) -> Self {
        Self {
            size,
            sizing,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sizing(&self) -> Option<ImageSizing> {
        self.sizing
    }

    /// Start a load, superseding any load still in flight
    pub fn begin(&self) -> LoadTicket {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.request = Some(state.generation);
        LoadTicket(state.generation)
    }

    /// Show a loaded image, or give it back if `ticket` was superseded
    ///
    /// A ticket is accepted at most once.
    pub fn fulfil(&self, ticket: LoadTicket, content: ImageContent) -> Result<(), ImageContent> {
        let mut state = lock(&self.state);
        if state.request != Some(ticket.0) {
            return Err(content);
        }
        state.request = None;
        state.content = content;
        Ok(())
    }

    pub fn content(&self) -> ImageContent {
        lock(&self.state).content.clone()
    }

    /// Back to the placeholder; returns the blob that was on display
    pub fn reset(&self) -> Option<ObjectUrl> {
        let mut state = lock(&self.state);
        state.request = None;
        match std::mem::take(&mut state.content) {
            ImageContent::Blob(url) => Some(url),
            _ => None,
        }
    }
}

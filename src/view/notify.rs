//! Non-blocking user notifications

use chrono::{DateTime, Local};
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long a notice stays on the status line
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
    pub at: DateTime<Local>,
}

pub trait Notifier {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Single-line status area that shows the latest notice for a few seconds
#[derive(Default)]
pub struct StatusLine {
    current: RefCell<Option<(Notice, Instant)>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    fn show(&self, level: Level, message: &str) {
        let notice = Notice {
            level,
            text: message.to_string(),
            at: Local::now(),
        };
        *self.current.borrow_mut() = Some((notice, Instant::now()));
    }

    /// The notice on display, if it has not timed out
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.borrow_mut();
        if current
            .as_ref()
            .is_some_and(|(_, shown)| shown.elapsed() >= NOTICE_TIMEOUT)
        {
            *current = None;
        }
        current.as_ref().map(|(notice, _)| notice.clone())
    }
}

impl Notifier for StatusLine {
    fn info(&self, message: &str) {
        info!("{}", message);
        self.show(Level::Info, message);
    }

    fn error(&self, message: &str) {
        warn!("{}", message);
        self.show(Level::Error, message);
    }
}

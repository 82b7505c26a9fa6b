//! User-visible notifications.
//!
//! Every failure the user needs to hear about (rejected import, clipboard or
//! export errors) ends up here instead of aborting anything.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    fn default_duration(self) -> Duration {
        match self {
            NoticeKind::Info => Duration::from_secs(3),
            NoticeKind::Success => Duration::from_secs(2),
            NoticeKind::Warning => Duration::from_secs(5),
            NoticeKind::Error => Duration::from_secs(7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub created_at: Instant,
    pub auto_clear: Option<Duration>,
}

impl Notice {
    pub fn new(text: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: Instant::now(),
            auto_clear: Some(kind.default_duration()),
        }
    }

    pub fn permanent(text: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            auto_clear: None,
            ..Self::new(text, kind)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.auto_clear
            .map(|duration| self.created_at.elapsed() > duration)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusManager {
    current: Option<Notice>,
    history: VecDeque<Notice>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Warning => log::warn!("{}", notice.text),
            NoticeKind::Error => log::error!("{}", notice.text),
            NoticeKind::Info | NoticeKind::Success => log::info!("{}", notice.text),
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(notice.clone());
        self.current = Some(notice);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Notice::new(text, NoticeKind::Info));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Notice::new(text, NoticeKind::Success));
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Notice::new(text, NoticeKind::Warning));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Notice::new(text, NoticeKind::Error));
    }

    /// Drop the current notice once it has expired.
    pub fn update(&mut self) {
        if self.current.as_ref().is_some_and(Notice::is_expired) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    /// Recent notices, oldest first, including cleared ones.
    pub fn history(&self) -> impl Iterator<Item = &Notice> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_push_sets_current() {
        let mut status = StatusManager::new();
        assert!(status.current().is_none());

        status.warning("Only .md and .txt files can be opened");
        let notice = status.current().unwrap();
        assert_eq!(notice.kind, NoticeKind::Warning);
        assert!(notice.text.contains(".md"));
    }

    #[test]
    fn test_kinds_have_durations() {
        let mut status = StatusManager::new();
        status.success("ok");
        assert_eq!(status.current().unwrap().auto_clear, Some(Duration::from_secs(2)));
        status.error("bad");
        assert_eq!(status.current().unwrap().auto_clear, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_permanent_notice_never_expires() {
        let notice = Notice::permanent("stay", NoticeKind::Info);
        assert!(notice.auto_clear.is_none());
        assert!(!notice.is_expired());
    }

    #[test]
    fn test_update_drops_expired_notice() {
        let mut status = StatusManager::new();
        status.push(Notice {
            auto_clear: Some(Duration::from_millis(1)),
            ..Notice::new("short", NoticeKind::Info)
        });

        thread::sleep(Duration::from_millis(10));
        status.update();
        assert!(status.current().is_none());
        assert_eq!(status.history().count(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut status = StatusManager::new();
        for i in 0..(HISTORY_LIMIT + 5) {
            status.info(format!("notice {i}"));
        }
        assert_eq!(status.history().count(), HISTORY_LIMIT);
        assert_eq!(status.history().next().unwrap().text, "notice 5");
    }

    #[test]
    fn test_clear() {
        let mut status = StatusManager::new();
        status.info("hello");
        status.clear();
        assert!(status.current().is_none());
    }
}

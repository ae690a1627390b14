//! Host application interface
//!
//! The host owns the reader state. The session reads page and mode fields
//! from it and writes zoom, fullscreen and error fields back as partial
//! updates.

use serde::{Deserialize, Serialize};

use crate::engine::PageSource;
use crate::layout::LayoutMode;
use crate::zoom::ZoomReport;

/// Reader state as held by the host
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderState {
    pub current_page: usize,
    pub total_pages: usize,
    pub book_mode: bool,
    pub manga_mode: bool,
    pub render_error: bool,
    /// Normalized zoom percentage
    pub current_zoom: u32,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
    pub fullscreen: bool,
}

impl ReaderState {
    #[must_use]
    pub fn layout_mode(&self) -> LayoutMode {
        LayoutMode {
            book_mode: self.book_mode,
            manga_mode: self.manga_mode,
        }
    }

    /// Merge a partial update into this state
    pub fn apply(&mut self, update: &StateUpdate) {
        if let Some(render_error) = update.render_error {
            self.render_error = render_error;
        }
        if let Some(fullscreen) = update.fullscreen {
            self.fullscreen = fullscreen;
        }
        if let Some(current_zoom) = update.current_zoom {
            self.current_zoom = current_zoom;
        }
        if let Some(can_zoom_in) = update.can_zoom_in {
            self.can_zoom_in = can_zoom_in;
        }
        if let Some(can_zoom_out) = update.can_zoom_out {
            self.can_zoom_out = can_zoom_out;
        }
    }
}

/// Subset of [`ReaderState`] fields written by the session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_zoom: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_zoom_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_zoom_out: Option<bool>,
}

impl StateUpdate {
    #[must_use]
    pub fn render_error(render_error: bool) -> Self {
        Self {
            render_error: Some(render_error),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fullscreen(fullscreen: bool) -> Self {
        Self {
            fullscreen: Some(fullscreen),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn zoom(report: ZoomReport) -> Self {
        Self {
            current_zoom: Some(report.current_zoom),
            can_zoom_in: Some(report.can_zoom_in),
            can_zoom_out: Some(report.can_zoom_out),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_zoom_report(&self) -> bool {
        self.current_zoom.is_some()
    }
}

/// Handle for a registered fullscreen-change listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Host application as seen by a viewer session
pub trait Host {
    fn reader_state(&self) -> &ReaderState;

    /// Sources to open when `index` becomes the current page
    fn page_sources(&self, index: usize) -> Vec<PageSource>;

    fn update_state(&mut self, update: StateUpdate);

    fn add_fullscreen_listener(&mut self) -> ListenerId;

    fn remove_fullscreen_listener(&mut self, id: ListenerId);

    fn is_fullscreen(&self) -> bool;
}

impl<T: Host + ?Sized> Host for &mut T {
    fn reader_state(&self) -> &ReaderState {
        (**self).reader_state()
    }

    fn page_sources(&self, index: usize) -> Vec<PageSource> {
        (**self).page_sources(index)
    }

    fn update_state(&mut self, update: StateUpdate) {
        (**self).update_state(update)
    }

    fn add_fullscreen_listener(&mut self) -> ListenerId {
        (**self).add_fullscreen_listener()
    }

    fn remove_fullscreen_listener(&mut self, id: ListenerId) {
        (**self).remove_fullscreen_listener(id)
    }

    fn is_fullscreen(&self) -> bool {
        (**self).is_fullscreen()
    }
}

//! Interface to the tiled image engine that renders pages
//!
//! The engine owns page items, the world they live in and the viewport
//! looking into it. The orchestration code only queries geometry, moves and
//! resizes items, drives the viewport zoom and listens to engine events.

use std::fmt;

use crate::geometry::{Point, Rect};
use crate::zoom::ZoomLimits;

/// Reference to the content of one page image, resolved by the engine
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageSource {
    pub uri: String,
}

impl PageSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Engine event names a handler can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewerEventKind {
    Open,
    OpenFailed,
    Resize,
    Zoom,
    CanvasScroll,
}

impl ViewerEventKind {
    pub const ALL: [ViewerEventKind; 5] = [
        ViewerEventKind::Open,
        ViewerEventKind::OpenFailed,
        ViewerEventKind::Resize,
        ViewerEventKind::Zoom,
        ViewerEventKind::CanvasScroll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerEventKind::Open => "open",
            ViewerEventKind::OpenFailed => "open-failed",
            ViewerEventKind::Resize => "resize",
            ViewerEventKind::Zoom => "zoom",
            ViewerEventKind::CanvasScroll => "canvas-scroll",
        }
    }
}

/// Events emitted by the engine
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// Content finished opening and items are in the world
    Open,
    /// Content could not be opened (missing or corrupt image)
    OpenFailed {
        source: Option<PageSource>,
        message: String,
    },
    /// Rendering surface changed size, in pixels
    Resize { width: f64, height: f64 },
    /// Viewport zoom changed
    Zoom { zoom: f64 },
    /// Wheel or pan gesture over the canvas
    CanvasScroll,
}

impl ViewerEvent {
    pub fn kind(&self) -> ViewerEventKind {
        match self {
            ViewerEvent::Open => ViewerEventKind::Open,
            ViewerEvent::OpenFailed { .. } => ViewerEventKind::OpenFailed,
            ViewerEvent::Resize { .. } => ViewerEventKind::Resize,
            ViewerEvent::Zoom { .. } => ViewerEventKind::Zoom,
            ViewerEvent::CanvasScroll => ViewerEventKind::CanvasScroll,
        }
    }
}

/// Handle returned by [`Viewer::add_handler`], required to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// The set of loaded page items in world coordinates
pub trait World {
    fn item_count(&self) -> usize;

    fn item_bounds(&self, index: usize) -> Option<Rect>;

    fn set_item_position(&mut self, index: usize, position: Point);

    /// Resize an item to `height`, keeping its aspect ratio
    fn set_item_height(&mut self, index: usize, height: f64);

    /// Convert a zoom in image pixels into a viewport zoom for this item
    fn image_to_viewport_zoom(&self, index: usize, image_zoom: f64) -> Option<f64>;

    /// Bounds of all items
    fn home_bounds(&self) -> Rect;
}

/// Visible window into the world
pub trait Viewport {
    fn zoom(&self) -> f64;

    fn zoom_to(&mut self, zoom: f64);

    /// Visible area in world coordinates
    fn bounds(&self) -> Rect;

    fn zoom_limits(&self) -> ZoomLimits;

    fn set_zoom_limits(&mut self, limits: ZoomLimits);

    /// Fit `bounds` entirely, honoring the current zoom limits
    fn fit_bounds(&mut self, bounds: Rect);

    fn fit_vertically(&mut self, bounds: Rect);

    fn fit_horizontally(&mut self, bounds: Rect);

    /// Apply zoom limits and pan back so `content` stays in view
    fn ensure_visible(&mut self, content: Rect);
}

/// A viewer engine instance bound to one rendering surface
pub trait Viewer {
    type World: World;
    type Viewport: Viewport;

    /// Replace the current content with `sources`
    fn open(&mut self, sources: &[PageSource]);

    fn close(&mut self);

    /// Release the engine; no event is emitted afterwards
    fn destroy(&mut self);

    fn add_handler(&mut self, kind: ViewerEventKind) -> HandlerId;

    fn remove_handler(&mut self, id: HandlerId);

    /// Next queued event for subscribed handlers, if any
    fn poll_event(&mut self) -> Option<ViewerEvent>;

    fn world(&self) -> &Self::World;

    fn world_mut(&mut self) -> &mut Self::World;

    fn viewport(&self) -> &Self::Viewport;

    fn viewport_mut(&mut self) -> &mut Self::Viewport;
}

impl<T: Viewer + ?Sized> Viewer for &mut T {
    type World = T::World;
    type Viewport = T::Viewport;

    fn open(&mut self, sources: &[PageSource]) {
        (**self).open(sources)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }

    fn add_handler(&mut self, kind: ViewerEventKind) -> HandlerId {
        (**self).add_handler(kind)
    }

    fn remove_handler(&mut self, id: HandlerId) {
        (**self).remove_handler(id)
    }

    fn poll_event(&mut self) -> Option<ViewerEvent> {
        (**self).poll_event()
    }

    fn world(&self) -> &Self::World {
        (**self).world()
    }

    fn world_mut(&mut self) -> &mut Self::World {
        (**self).world_mut()
    }

    fn viewport(&self) -> &Self::Viewport {
        (**self).viewport()
    }

    fn viewport_mut(&mut self) -> &mut Self::Viewport {
        (**self).viewport_mut()
    }
}

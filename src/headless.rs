//! In-memory engine and host
//!
//! [`HeadlessViewer`] follows the geometry conventions of tiled image
//! engines: every item opens at the origin one world unit wide, viewport
//! zoom 1 shows one world unit across the surface, and item image zoom
//! depends on the item's world width and the surface width. It renders
//! nothing. [`RecordingHost`] keeps a [`ReaderState`] and every update it
//! received.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::engine::{
    HandlerId, PageSource, Viewer, ViewerEvent, ViewerEventKind, Viewport, World,
};
use crate::geometry::{Point, Rect};
use crate::host::{Host, ListenerId, ReaderState, StateUpdate};
use crate::zoom::ZoomLimits;

/// One loaded page image
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessPage {
    pub source: PageSource,
    pub image_width: f64,
    pub image_height: f64,
    pub bounds: Rect,
}

#[derive(Clone, Debug, Default)]
pub struct HeadlessWorld {
    pages: Vec<HeadlessPage>,
    container_width: f64,
}

impl HeadlessWorld {
    pub fn new(container_width: f64) -> Self {
        Self {
            pages: Vec::new(),
            container_width,
        }
    }

    /// Add a page at the origin, one world unit wide
    pub fn push_page(&mut self, source: PageSource, image_width: u32, image_height: u32) {
        let image_width = f64::from(image_width);
        let image_height = f64::from(image_height);
        self.pages.push(HeadlessPage {
            source,
            image_width,
            image_height,
            bounds: Rect::new(0.0, 0.0, 1.0, image_height / image_width),
        });
    }

    pub fn pages(&self) -> &[HeadlessPage] {
        &self.pages
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

impl World for HeadlessWorld {
    fn item_count(&self) -> usize {
        self.pages.len()
    }

    fn item_bounds(&self, index: usize) -> Option<Rect> {
        self.pages.get(index).map(|page| page.bounds)
    }

    fn set_item_position(&mut self, index: usize, position: Point) {
        if let Some(page) = self.pages.get_mut(index) {
            page.bounds.x = position.x;
            page.bounds.y = position.y;
        }
    }

    fn set_item_height(&mut self, index: usize, height: f64) {
        if let Some(page) = self.pages.get_mut(index) {
            page.bounds.width = height * page.image_width / page.image_height;
            page.bounds.height = height;
        }
    }

    fn image_to_viewport_zoom(&self, index: usize, image_zoom: f64) -> Option<f64> {
        let page = self.pages.get(index)?;
        let ratio = page.bounds.width * self.container_width / page.image_width;
        Some(image_zoom / ratio)
    }

    fn home_bounds(&self) -> Rect {
        let mut bounds = self.pages.iter().map(|page| page.bounds);
        match bounds.next() {
            Some(first) => bounds.fold(first, |acc, b| acc.union(&b)),
            None => Rect::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HeadlessViewport {
    container_width: f64,
    container_height: f64,
    zoom: f64,
    center: Point,
    limits: ZoomLimits,
    zoom_notices: Vec<f64>,
}

impl HeadlessViewport {
    pub fn new(container_width: f64, container_height: f64) -> Self {
        Self {
            container_width,
            container_height,
            zoom: 1.0,
            center: Point::new(0.5, 0.5),
            limits: ZoomLimits::UNBOUNDED,
            zoom_notices: Vec::new(),
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Surface width over height, if the surface has area
    fn container_aspect(&self) -> Option<f64> {
        Rect::new(0.0, 0.0, self.container_width, self.container_height).aspect_ratio()
    }

    fn set_zoom(&mut self, zoom: f64) {
        if zoom != self.zoom {
            self.zoom = zoom;
            self.zoom_notices.push(zoom);
        }
    }

    fn fit(&mut self, zoom: f64, bounds: Rect) {
        self.center = bounds.center();
        let zoom = self.limits.clamp(zoom);
        self.set_zoom(zoom);
    }
}

impl Viewport for HeadlessViewport {
    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn zoom_to(&mut self, zoom: f64) {
        self.set_zoom(zoom);
    }

    fn bounds(&self) -> Rect {
        let width = 1.0 / self.zoom;
        let height = if self.container_width > 0.0 {
            width * self.container_height / self.container_width
        } else {
            0.0
        };
        Rect::new(
            self.center.x - width / 2.0,
            self.center.y - height / 2.0,
            width,
            height,
        )
    }

    fn zoom_limits(&self) -> ZoomLimits {
        self.limits
    }

    fn set_zoom_limits(&mut self, limits: ZoomLimits) {
        self.limits = limits;
    }

    fn fit_bounds(&mut self, bounds: Rect) {
        let (Some(content), Some(surface)) = (bounds.aspect_ratio(), self.container_aspect())
        else {
            return;
        };
        let zoom = if content >= surface {
            1.0 / bounds.width
        } else {
            1.0 / (bounds.height * surface)
        };
        self.fit(zoom, bounds);
    }

    fn fit_vertically(&mut self, bounds: Rect) {
        let Some(surface) = self.container_aspect() else {
            return;
        };
        if bounds.has_area() {
            self.fit(1.0 / (bounds.height * surface), bounds);
        }
    }

    fn fit_horizontally(&mut self, bounds: Rect) {
        if bounds.has_area() {
            self.fit(1.0 / bounds.width, bounds);
        }
    }

    fn ensure_visible(&mut self, content: Rect) {
        let zoom = self.limits.clamp(self.zoom);
        self.set_zoom(zoom);
        if content.has_area() && !self.bounds().intersects(&content) {
            self.center = content.center();
        }
    }
}

/// Engine stand-in that resolves page sources from registered image sizes
#[derive(Debug)]
pub struct HeadlessViewer {
    catalog: HashMap<String, (u32, u32)>,
    world: HeadlessWorld,
    viewport: HeadlessViewport,
    handlers: HashMap<HandlerId, ViewerEventKind>,
    next_handler: u64,
    queue: VecDeque<ViewerEvent>,
    opened: Vec<Vec<PageSource>>,
    destroyed: bool,
}

impl HeadlessViewer {
    pub fn new(container_width: f64, container_height: f64) -> Self {
        Self {
            catalog: HashMap::new(),
            world: HeadlessWorld::new(container_width),
            viewport: HeadlessViewport::new(container_width, container_height),
            handlers: HashMap::new(),
            next_handler: 0,
            queue: VecDeque::new(),
            opened: Vec::new(),
            destroyed: false,
        }
    }

    /// Make `uri` openable with the given pixel size
    pub fn register_image(&mut self, uri: &str, width: u32, height: u32) {
        self.catalog.insert(uri.to_string(), (width, height));
    }

    /// Change the surface size and emit a resize event
    pub fn resize_container(&mut self, width: f64, height: f64) {
        self.world.container_width = width;
        self.viewport.container_width = width;
        self.viewport.container_height = height;
        self.emit(ViewerEvent::Resize { width, height });
    }

    /// Wheel gesture over the canvas: a scroll event, then a zoom by
    /// `factor` within the current limits
    pub fn scroll_zoom(&mut self, factor: f64) {
        self.emit(ViewerEvent::CanvasScroll);
        let zoom = self.viewport.limits.clamp(self.viewport.zoom * factor);
        self.viewport.set_zoom(zoom);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Every source list passed to `open`, oldest first
    pub fn open_history(&self) -> &[Vec<PageSource>] {
        &self.opened
    }

    fn is_subscribed(&self, kind: ViewerEventKind) -> bool {
        !self.destroyed && self.handlers.values().any(|k| *k == kind)
    }

    fn emit(&mut self, event: ViewerEvent) {
        if self.is_subscribed(event.kind()) {
            self.queue.push_back(event);
        } else {
            debug!("Dropping '{}' event without handlers", event.kind().as_str());
        }
    }

    fn flush_zoom_notices(&mut self) {
        let notices = std::mem::take(&mut self.viewport.zoom_notices);
        for zoom in notices {
            self.emit(ViewerEvent::Zoom { zoom });
        }
    }
}

impl Viewer for HeadlessViewer {
    type World = HeadlessWorld;
    type Viewport = HeadlessViewport;

    fn open(&mut self, sources: &[PageSource]) {
        self.opened.push(sources.to_vec());
        self.world.clear();

        for source in sources {
            match self.catalog.get(&source.uri) {
                Some(&(width, height)) if width > 0 && height > 0 => {
                    self.world.push_page(source.clone(), width, height);
                }
                Some(_) => {
                    self.world.clear();
                    self.emit(ViewerEvent::OpenFailed {
                        source: Some(source.clone()),
                        message: "image has no pixels".to_string(),
                    });
                    return;
                }
                None => {
                    self.world.clear();
                    self.emit(ViewerEvent::OpenFailed {
                        source: Some(source.clone()),
                        message: "unknown image".to_string(),
                    });
                    return;
                }
            }
        }
        self.emit(ViewerEvent::Open);
    }

    fn close(&mut self) {
        self.world.clear();
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.world.clear();
        self.queue.clear();
        self.viewport.zoom_notices.clear();
    }

    fn add_handler(&mut self, kind: ViewerEventKind) -> HandlerId {
        self.next_handler += 1;
        let id = HandlerId(self.next_handler);
        self.handlers.insert(id, kind);
        id
    }

    fn remove_handler(&mut self, id: HandlerId) {
        self.handlers.remove(&id);
    }

    fn poll_event(&mut self) -> Option<ViewerEvent> {
        self.flush_zoom_notices();
        self.queue.pop_front()
    }

    fn world(&self) -> &HeadlessWorld {
        &self.world
    }

    fn world_mut(&mut self) -> &mut HeadlessWorld {
        &mut self.world
    }

    fn viewport(&self) -> &HeadlessViewport {
        &self.viewport
    }

    fn viewport_mut(&mut self) -> &mut HeadlessViewport {
        &mut self.viewport
    }
}

/// Host that records every state update
#[derive(Debug, Default)]
pub struct RecordingHost {
    state: ReaderState,
    pages: Vec<PageSource>,
    updates: Vec<StateUpdate>,
    listeners: Vec<ListenerId>,
    next_listener: u64,
    fullscreen: bool,
}

impl RecordingHost {
    pub fn new(pages: Vec<PageSource>) -> Self {
        Self {
            state: ReaderState {
                total_pages: pages.len(),
                ..ReaderState::default()
            },
            pages,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, book_mode: bool, manga_mode: bool) -> Self {
        self.state.book_mode = book_mode;
        self.state.manga_mode = manga_mode;
        self
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ReaderState {
        &mut self.state
    }

    pub fn updates(&self) -> &[StateUpdate] {
        &self.updates
    }

    /// Updates that carried a zoom report
    pub fn zoom_reports(&self) -> Vec<&StateUpdate> {
        self.updates.iter().filter(|u| u.is_zoom_report()).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn set_current_page(&mut self, index: usize) {
        self.state.current_page = index;
    }
}

impl Host for RecordingHost {
    fn reader_state(&self) -> &ReaderState {
        &self.state
    }

    /// One page, or the page and its successor in book mode
    fn page_sources(&self, index: usize) -> Vec<PageSource> {
        let len = if self.state.book_mode { 2 } else { 1 };
        self.pages.iter().skip(index).take(len).cloned().collect()
    }

    fn update_state(&mut self, update: StateUpdate) {
        self.state.apply(&update);
        self.updates.push(update);
    }

    fn add_fullscreen_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(id);
        id
    }

    fn remove_fullscreen_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|listener| *listener != id);
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

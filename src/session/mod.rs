//! Viewer session: binds one engine instance to the host
//!
//! A [`Session`] owns the engine handler registrations, the host fullscreen
//! listener and the timers. Engine events and host notifications are turned
//! into [`Command`]s for [`SessionState`], and the resulting [`Effect`]s are
//! carried out here against the engine and the host.
//!
//! Teardown runs exactly once, either from [`Session::unmount`] or on drop,
//! and always in the same order: timers cancelled, engine handlers removed,
//! fullscreen listener removed, engine destroyed.

mod state;

use std::time::Instant;

use log::{debug, error, info, warn};

pub use state::{Command, Effect, Phase, SessionState, ZoomSample};

use crate::engine::{HandlerId, Viewer, ViewerEvent, ViewerEventKind, Viewport};
use crate::host::{Host, ListenerId, StateUpdate};
use crate::layout::layout;
use crate::settings::ReaderConfig;
use crate::zoom::{ZoomController, ZoomStep};

pub struct Session<V: Viewer, H: Host> {
    viewer: V,
    host: H,
    zoom: ZoomController,
    state: SessionState,
    config: ReaderConfig,
    handlers: Vec<(ViewerEventKind, HandlerId)>,
    fullscreen_listener: Option<ListenerId>,
}

impl<V: Viewer, H: Host> Session<V, H> {
    /// Subscribe to the engine and the host, then open the host's current page
    pub fn mount(mut viewer: V, mut host: H, config: ReaderConfig, now: Instant) -> Self {
        let handlers = ViewerEventKind::ALL
            .iter()
            .map(|&kind| (kind, viewer.add_handler(kind)))
            .collect();
        let fullscreen_listener = Some(host.add_fullscreen_listener());

        let mut session = Self {
            viewer,
            host,
            zoom: ZoomController::new(config.fill_ratio, config.zoom_step, config.percent_cache_size),
            state: SessionState::new(config.zoom_report_delay, config.scroll_settle_delay),
            config,
            handlers,
            fullscreen_listener,
        };

        let reader = session.host.reader_state();
        let (index, total_pages) = (reader.current_page, reader.total_pages);
        info!("Mounting viewer session at page {index} of {total_pages}");
        session.execute(Command::PageRequested { index, total_pages }, now);
        session
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_scrolling(&self) -> bool {
        self.state.is_scrolling()
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Earliest time [`tick`](Self::tick) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.next_deadline()
    }

    /// Handle one engine event
    pub fn dispatch(&mut self, event: ViewerEvent, now: Instant) {
        let kind = event.kind();
        if !self.handlers.iter().any(|(subscribed, _)| *subscribed == kind) {
            warn!("No handler registered for '{}' event", kind.as_str());
            return;
        }

        let cmd = match event {
            ViewerEvent::Open => Command::Opened,
            ViewerEvent::OpenFailed { source, message } => {
                match source {
                    Some(source) => error!("Failed to open {source}: {message}"),
                    None => error!("Failed to open page: {message}"),
                }
                Command::OpenFailed
            }
            ViewerEvent::Resize { width, height } => {
                debug!("Surface resized to {width}x{height}");
                Command::Resized
            }
            ViewerEvent::Zoom { zoom } => Command::ZoomChanged(zoom),
            ViewerEvent::CanvasScroll => Command::CanvasScrolled,
        };
        self.execute(cmd, now);
    }

    /// Drain and handle every event queued by the engine
    pub fn pump(&mut self, now: Instant) {
        while let Some(event) = self.viewer.poll_event() {
            self.dispatch(event, now);
        }
    }

    /// Fire due timers
    pub fn tick(&mut self, now: Instant) {
        self.execute(Command::Tick, now);
    }

    /// The host moved to another page
    pub fn page_changed(&mut self, index: usize, now: Instant) {
        let total_pages = self.host.reader_state().total_pages;
        self.execute(Command::PageRequested { index, total_pages }, now);
    }

    /// The host toggled book or manga mode
    pub fn layout_mode_changed(&mut self, now: Instant) {
        self.execute(Command::LayoutModeChanged, now);
    }

    /// The host entered or left fullscreen
    pub fn fullscreen_changed(&mut self, now: Instant) {
        if self.fullscreen_listener.is_none() {
            warn!("Fullscreen change without a registered listener");
            return;
        }
        self.execute(Command::FullscreenChanged, now);
    }

    pub fn zoom_in(&mut self) {
        self.step_zoom(ZoomStep::In);
    }

    pub fn zoom_out(&mut self) {
        self.step_zoom(ZoomStep::Out);
    }

    /// Zoom to `percent` of the native zoom
    pub fn update_zoom(&mut self, percent: f64) {
        if self.content_open() {
            self.zoom.zoom_to_percent(&mut self.viewer, percent);
        }
    }

    /// Show pages at one image pixel per screen pixel
    pub fn zoom_to_native(&mut self) {
        if self.content_open() {
            self.zoom.zoom_to_native(&mut self.viewer);
        }
    }

    /// Tear the session down and release the engine
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn step_zoom(&mut self, step: ZoomStep) {
        if self.content_open() {
            self.zoom.step_zoom(&mut self.viewer, step);
        }
    }

    fn content_open(&self) -> bool {
        let open = self.state.phase() == Phase::Open;
        if !open {
            debug!("Zoom request ignored in phase {:?}", self.state.phase());
        }
        open
    }

    fn teardown(&mut self) {
        if self.state.phase() == Phase::Unmounted {
            return;
        }
        self.execute(Command::Unmount, Instant::now());
    }

    fn execute(&mut self, cmd: Command, now: Instant) {
        for effect in self.state.apply(cmd, now) {
            self.run(effect);
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::LayoutPages => {
                let mode = self.host.reader_state().layout_mode();
                match layout(self.viewer.world_mut(), mode) {
                    Some(spread) => debug!("Laid out {spread:?}"),
                    None => debug!("No pages to lay out"),
                }
            }

            Effect::FitToBounds => {
                self.zoom.fit_to_bounds(&mut self.viewer, self.config.fit_mode);
            }

            Effect::UpdateZoomLimits => {
                self.zoom.update_zoom_limits(&mut self.viewer);
            }

            Effect::ClearRenderError => {
                if self.host.reader_state().render_error {
                    self.host.update_state(StateUpdate::render_error(false));
                }
            }

            Effect::RaiseRenderError => {
                self.host.update_state(StateUpdate::render_error(true));
            }

            Effect::CloseContent => self.viewer.close(),

            Effect::OpenPage(index) => {
                let sources = self.host.page_sources(index);
                if sources.is_empty() {
                    warn!("Host has no content for page {index}");
                } else {
                    debug!("Opening page {index}: {sources:?}");
                    self.viewer.open(&sources);
                }
            }

            Effect::ReportZoom { zoom } => {
                let zoom = zoom.unwrap_or_else(|| self.viewer.viewport().zoom());
                let report = self.zoom.report(&self.viewer, zoom);
                debug!("Reporting zoom {report:?}");
                self.host.update_state(StateUpdate::zoom(report));
            }

            Effect::ReportFullscreen => {
                let fullscreen = self.host.is_fullscreen();
                self.host.update_state(StateUpdate::fullscreen(fullscreen));
            }

            Effect::Release => {
                for (_, id) in self.handlers.drain(..) {
                    self.viewer.remove_handler(id);
                }
                if let Some(listener) = self.fullscreen_listener.take() {
                    self.host.remove_fullscreen_listener(listener);
                }
                self.viewer.destroy();
                info!("Viewer session released");
            }
        }
    }
}

impl<V: Viewer, H: Host> Drop for Session<V, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

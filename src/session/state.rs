//! Session state machine
//!
//! Pure bookkeeping for one viewer session: phase, scroll flag and the two
//! timers. Every input is a [`Command`]; the output is the list of
//! [`Effect`]s the session must carry out against the engine and the host.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::timer::{Debouncer, Timer};

/// Lifecycle phase of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Content requested, not opened yet
    Initializing,
    /// Content open and laid out
    Open,
    /// Last open failed
    Error,
    /// Torn down; accepts nothing
    Unmounted,
}

/// Pending zoom report
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomSample {
    /// Zoom carried by the event, or `None` to read the live zoom
    pub zoom: Option<f64>,
    /// Report even while scrolling
    pub forced: bool,
}

/// Inputs to the state machine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Opened,
    OpenFailed,
    Resized,
    ZoomChanged(f64),
    CanvasScrolled,
    PageRequested { index: usize, total_pages: usize },
    LayoutModeChanged,
    FullscreenChanged,
    Tick,
    Unmount,
}

/// Work produced by state changes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Position pages for the host's layout mode
    LayoutPages,
    /// Fit pages, refresh limits, apply default zoom
    FitToBounds,
    UpdateZoomLimits,
    /// Clear the host render-error flag if it is set
    ClearRenderError,
    RaiseRenderError,
    CloseContent,
    OpenPage(usize),
    ReportZoom { zoom: Option<f64> },
    ReportFullscreen,
    /// Unregister handlers and listeners, then destroy the engine
    Release,
}

/// Mutable session fields, each changed only through [`SessionState::apply`]
#[derive(Debug)]
pub struct SessionState {
    phase: Phase,
    scrolling: bool,
    zoom_report: Debouncer<ZoomSample>,
    scroll_settle: Timer,
    scroll_settle_delay: Duration,
}

impl SessionState {
    #[must_use]
    pub fn new(zoom_report_delay: Duration, scroll_settle_delay: Duration) -> Self {
        Self {
            phase: Phase::Initializing,
            scrolling: false,
            zoom_report: Debouncer::new(zoom_report_delay),
            scroll_settle: Timer::default(),
            scroll_settle_delay,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_scrolling(&self) -> bool {
        self.scrolling
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.zoom_report.deadline(), self.scroll_settle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command, now: Instant) -> Vec<Effect> {
        if self.phase == Phase::Unmounted {
            warn!("Session already torn down, dropping {cmd:?}");
            return vec![];
        }

        match cmd {
            Command::Opened => {
                self.transition(Phase::Open);
                vec![Effect::LayoutPages, Effect::FitToBounds, Effect::ClearRenderError]
            }

            Command::OpenFailed => {
                self.transition(Phase::Error);
                vec![Effect::CloseContent, Effect::RaiseRenderError]
            }

            Command::Resized => {
                if self.phase == Phase::Open {
                    vec![Effect::UpdateZoomLimits]
                } else {
                    vec![]
                }
            }

            Command::ZoomChanged(zoom) => {
                if self.phase == Phase::Open {
                    let sample = ZoomSample {
                        zoom: Some(zoom),
                        forced: false,
                    };
                    self.zoom_report.call(sample, now);
                }
                vec![]
            }

            Command::CanvasScrolled => {
                self.scrolling = true;
                self.scroll_settle.schedule(now, self.scroll_settle_delay);
                vec![]
            }

            Command::PageRequested { index, total_pages } => {
                if index < total_pages {
                    self.transition(Phase::Initializing);
                    vec![Effect::OpenPage(index)]
                } else {
                    debug!("Page {index} out of range ({total_pages} pages)");
                    vec![]
                }
            }

            Command::LayoutModeChanged => {
                if self.phase == Phase::Open {
                    vec![Effect::LayoutPages, Effect::FitToBounds]
                } else {
                    vec![]
                }
            }

            Command::FullscreenChanged => {
                vec![Effect::ReportFullscreen, Effect::UpdateZoomLimits]
            }

            Command::Tick => self.tick(now),

            Command::Unmount => {
                self.zoom_report.cancel();
                self.scroll_settle.cancel();
                self.scrolling = false;
                self.transition(Phase::Unmounted);
                vec![Effect::Release]
            }
        }
    }

    fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if self.scroll_settle.fire(now) {
            self.scrolling = false;
            // The final report after a gesture ignores the scroll flag
            let sample = ZoomSample {
                zoom: None,
                forced: true,
            };
            self.zoom_report.call(sample, now);
        }

        match self.zoom_report.poll(now) {
            Some(sample) if sample.forced || !self.scrolling => {
                vec![Effect::ReportZoom { zoom: sample.zoom }]
            }
            Some(sample) => {
                // TODO: decide whether zoom changes dropped mid-scroll should
                // be merged into the settle report instead of discarded
                debug!("Zoom report suppressed while scrolling: {sample:?}");
                vec![]
            }
            None => vec![],
        }
    }

    fn transition(&mut self, phase: Phase) {
        if self.phase != phase {
            info!("Viewer session {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

//! Spread layout and zoom orchestration for paginated image readers.
//!
//! The crate positions one or two page images in a shared world space
//! (single page, book spread, or mirrored manga spread), derives zoom limits
//! from the surface and content aspect ratios, and coordinates the events of
//! a tiled image engine into state updates for a host application.

pub mod engine;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod layout;
pub mod panic_handler;
pub mod session;
pub mod settings;
pub mod timer;
pub mod zoom;

pub use engine::{HandlerId, PageSource, Viewer, ViewerEvent, ViewerEventKind, Viewport, World};
pub use error::{GeometryError, SettingsError};
pub use geometry::{Point, Rect};
pub use host::{Host, ListenerId, ReaderState, StateUpdate};
pub use layout::{LayoutMode, Spread, layout};
pub use session::{Phase, Session};
pub use settings::{ReaderConfig, Settings};
pub use zoom::{FitMode, ZoomController, ZoomLimits, ZoomReport, ZoomStep};

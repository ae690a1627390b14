use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use serde::Serialize;
use simplelog::{Config, WriteLogger};

use spreadview::headless::{HeadlessViewer, RecordingHost};
use spreadview::panic_handler::initialize_panic_handler;
use spreadview::settings::load_settings;
use spreadview::{
    Host, PageSource, ReaderConfig, ReaderState, Session, StateUpdate, Viewer, Viewport,
};

type HeadlessSession<'a> = Session<&'a mut HeadlessViewer, &'a mut RecordingHost>;

/// Lay out page images as a reader would and replay zoom gestures
#[derive(Parser, Debug)]
#[command(name = "spreadview", version)]
struct Args {
    /// Page images in reading order
    #[arg(required = true)]
    pages: Vec<PathBuf>,

    /// Show two pages side by side
    #[arg(long)]
    book: bool,

    /// Right-to-left reading order (with --book)
    #[arg(long)]
    manga: bool,

    /// Page to open first
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Surface width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Surface height in pixels
    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "spreadview.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Comma-separated actions: in, out, native, zoom=<pct>, scroll[=<factor>],
    /// resize=<w>x<h>, page=<n>, book, manga, fullscreen, wait=<ms>
    #[arg(long, value_delimiter = ',')]
    script: Vec<Action>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Action {
    ZoomIn,
    ZoomOut,
    Native,
    Zoom(f64),
    Scroll(f64),
    Resize(f64, f64),
    Page(usize),
    ToggleBook,
    ToggleManga,
    Fullscreen,
    Wait(u64),
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.trim().split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (s.trim(), None),
        };

        match name {
            "in" => Ok(Action::ZoomIn),
            "out" => Ok(Action::ZoomOut),
            "native" => Ok(Action::Native),
            "zoom" => Ok(Action::Zoom(parse_value(name, value)?)),
            "scroll" => match value {
                Some(_) => Ok(Action::Scroll(parse_value(name, value)?)),
                None => Ok(Action::Scroll(1.2)),
            },
            "resize" => {
                let (w, h) = value
                    .and_then(|v| v.split_once('x'))
                    .ok_or_else(|| "resize expects <width>x<height>".to_string())?;
                let w = w.parse().map_err(|e| format!("bad width: {e}"))?;
                let h = h.parse().map_err(|e| format!("bad height: {e}"))?;
                Ok(Action::Resize(w, h))
            }
            "page" => Ok(Action::Page(parse_value(name, value)?)),
            "book" => Ok(Action::ToggleBook),
            "manga" => Ok(Action::ToggleManga),
            "fullscreen" => Ok(Action::Fullscreen),
            "wait" => Ok(Action::Wait(parse_value(name, value)?)),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

fn parse_value<T>(name: &str, value: Option<&str>) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.ok_or_else(|| format!("'{name}' needs a value"))?;
    value
        .parse::<T>()
        .map_err(|e| format!("bad value '{value}' for '{name}': {e}"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PagePlacement {
    source: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    state: ReaderState,
    updates: Vec<StateUpdate>,
    zoom: f64,
    pages: Vec<PagePlacement>,
}

fn main() -> Result<()> {
    initialize_panic_handler();
    let args = Args::parse();

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("Failed to create log file {:?}", args.log_file))?;
    WriteLogger::init(args.log_level, Config::default(), log_file)?;
    info!("Starting spreadview with {} pages", args.pages.len());

    let settings = load_settings(args.config.as_deref()).context("Failed to load settings")?;
    let report = run(&args, settings.reader_config())?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Shutting down spreadview");
    Ok(())
}

fn run(args: &Args, config: ReaderConfig) -> Result<RunReport> {
    let mut viewer = HeadlessViewer::new(args.width, args.height);
    let mut sources = Vec::with_capacity(args.pages.len());
    for path in &args.pages {
        let size = imagesize::size(path)
            .with_context(|| format!("Failed to read image size of {path:?}"))?;
        let uri = path.display().to_string();
        viewer.register_image(
            &uri,
            u32::try_from(size.width).context("image too wide")?,
            u32::try_from(size.height).context("image too tall")?,
        );
        sources.push(PageSource::new(uri));
    }

    let mut host = RecordingHost::new(sources).with_mode(args.book, args.manga);
    host.set_current_page(args.page);

    let mut clock = Instant::now();
    let mut session = Session::mount(&mut viewer, &mut host, config, clock);
    session.pump(clock);

    for action in &args.script {
        info!("Script action {action:?}");
        run_action(&mut session, *action, &mut clock);
    }
    settle(&mut session, &mut clock);

    let zoom = session.viewer().viewport().zoom();
    let pages = placements(session.viewer());
    session.unmount();

    Ok(RunReport {
        state: host.state().clone(),
        updates: host.updates().to_vec(),
        zoom,
        pages,
    })
}

fn run_action(session: &mut HeadlessSession<'_>, action: Action, clock: &mut Instant) {
    match action {
        Action::ZoomIn => session.zoom_in(),
        Action::ZoomOut => session.zoom_out(),
        Action::Native => session.zoom_to_native(),
        Action::Zoom(percent) => session.update_zoom(percent),
        Action::Scroll(factor) => session.viewer_mut().scroll_zoom(factor),
        Action::Resize(width, height) => session.viewer_mut().resize_container(width, height),
        Action::Page(index) => {
            if index < session.host().reader_state().total_pages {
                session.host_mut().set_current_page(index);
            }
            session.page_changed(index, *clock);
        }
        Action::ToggleBook => {
            let state = session.host_mut().state_mut();
            state.book_mode = !state.book_mode;
            let page = state.current_page;
            // A spread needs different sources, so reopen
            session.page_changed(page, *clock);
        }
        Action::ToggleManga => {
            let state = session.host_mut().state_mut();
            state.manga_mode = !state.manga_mode;
            session.layout_mode_changed(*clock);
        }
        Action::Fullscreen => {
            let fullscreen = !session.host().is_fullscreen();
            session.host_mut().set_fullscreen(fullscreen);
            session.fullscreen_changed(*clock);
        }
        Action::Wait(millis) => advance(session, clock, Duration::from_millis(millis)),
    }
    session.pump(*clock);
}

/// Move the clock forward, firing timers at their deadlines
fn advance(session: &mut HeadlessSession<'_>, clock: &mut Instant, by: Duration) {
    let target = *clock + by;
    while let Some(deadline) = session.next_deadline().filter(|d| *d <= target) {
        *clock = deadline.max(*clock);
        session.tick(*clock);
        session.pump(*clock);
    }
    *clock = target;
    session.tick(*clock);
}

/// Run until no timer is pending
fn settle(session: &mut HeadlessSession<'_>, clock: &mut Instant) {
    while let Some(deadline) = session.next_deadline() {
        *clock = deadline.max(*clock);
        session.tick(*clock);
        session.pump(*clock);
    }
}

fn placements(viewer: &HeadlessViewer) -> Vec<PagePlacement> {
    viewer
        .world()
        .pages()
        .iter()
        .map(|page| PagePlacement {
            source: page.source.uri.clone(),
            x: page.bounds.x,
            y: page.bounds.y,
            width: page.bounds.width,
            height: page.bounds.height,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_actions() {
        assert_eq!("in".parse::<Action>(), Ok(Action::ZoomIn));
        assert_eq!("zoom=55".parse::<Action>(), Ok(Action::Zoom(55.0)));
        assert_eq!("scroll".parse::<Action>(), Ok(Action::Scroll(1.2)));
        assert_eq!("scroll=0.8".parse::<Action>(), Ok(Action::Scroll(0.8)));
        assert_eq!(
            "resize=640x480".parse::<Action>(),
            Ok(Action::Resize(640.0, 480.0))
        );
        assert_eq!("wait=450".parse::<Action>(), Ok(Action::Wait(450)));
        assert_eq!("page=3".parse::<Action>(), Ok(Action::Page(3)));
    }

    #[test]
    fn rejects_unknown_actions() {
        assert!("spin".parse::<Action>().is_err());
        assert!("zoom".parse::<Action>().is_err());
        assert!("resize=640".parse::<Action>().is_err());
        assert!("page=-1".parse::<Action>().is_err());
        assert!("page=1.7".parse::<Action>().is_err());
        assert!("wait=2.5".parse::<Action>().is_err());
        assert!("page".parse::<Action>().is_err());
    }
}

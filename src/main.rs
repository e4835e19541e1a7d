//! Area Core driver
//!
//! Runs the window core headless (or against an X11 display with `--x11`),
//! reading one JSON command per line on stdin and printing every window
//! event as a JSON line on stdout. A tokio interval drives the timers.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use area_core::compositor::renderer::NullRenderer;
use area_core::shared::{Geometry, Point, Size};
use area_core::wm::client_flags::{MaximizeMode, QuickTiles};
use area_core::wm::events::WindowEvent;
use area_core::wm::hints::SizeMode;
use area_core::wm::management::ManagementRequest;
use area_core::wm::moveresize::{KeyPress, MouseCommand};
use area_core::wm::session::Session;
use area_core::wm::{ManageRequest, NullBackend, ProtocolBackend, WindowId, X11Backend};
use area_core::{Compositor, Config};

/// Timer resolution of the driver loop
const TICK: Duration = Duration::from_millis(10);

/// One line of driver input
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command {
    Manage(ManageRequest),
    Release { id: WindowId },
    Activate { id: WindowId },
    Move { id: WindowId, x: i32, y: i32 },
    Resize { id: WindowId, width: i32, height: i32 },
    Maximize { id: WindowId, mode: MaximizeMode },
    QuickTile { id: WindowId, mode: QuickTiles },
    Fullscreen { id: WindowId, set: bool },
    KeepAbove { id: WindowId, set: bool },
    KeepBelow { id: WindowId, set: bool },
    Minimize { id: WindowId },
    Unminimize { id: WindowId },
    MouseCommand { id: WindowId, command: MouseCommand, x: i32, y: i32 },
    /// Button press on a window's decoration
    Press { id: WindowId, x: i32, y: i32 },
    Pointer {
        x: i32,
        y: i32,
        #[serde(default)]
        release: bool,
    },
    Key(KeyPress),
    Desktop { desktop: u32 },
    Management { id: WindowId, request: ManagementRequest },
    SaveSession,
    Dump,
}

/// One line of driver output
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Output<'a> {
    Event(&'a WindowEvent),
    Managed { managed: WindowId },
    Snapshot(Snapshot),
    Error { error: String },
}

#[derive(Debug, Serialize)]
struct Snapshot {
    current_desktop: u32,
    active: Option<WindowId>,
    stacking: Vec<WindowId>,
    windows: Vec<WindowState>,
}

#[derive(Debug, Serialize)]
struct WindowState {
    id: WindowId,
    caption: String,
    frame: Geometry,
    desktops: Vec<u32>,
    max_mode: MaximizeMode,
    quick_tile: QuickTiles,
    minimized: bool,
    fullscreen: bool,
    keep_above: bool,
    keep_below: bool,
    remnant: bool,
}

fn snapshot(comp: &Compositor) -> Snapshot {
    let windows = comp
        .windows()
        .into_iter()
        .map(|w| WindowState {
            id: w.id,
            caption: w.caption.clone(),
            frame: w.frame_geometry,
            desktops: w.desktops.clone(),
            max_mode: w.max_mode(),
            quick_tile: comp.quick_tile_mode(w.id),
            minimized: w.is_minimized(),
            fullscreen: w.is_fullscreen(),
            keep_above: w.keep_above(),
            keep_below: w.keep_below(),
            remnant: w.is_remnant(),
        })
        .collect();
    Snapshot {
        current_desktop: comp.current_desktop(),
        active: comp.active_window(),
        stacking: comp.stacking_order(),
        windows,
    }
}

fn print(output: &Output) {
    match serde_json::to_string(output) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize output: {}", e),
    }
}

struct Driver {
    comp: Compositor,
    events: Rc<RefCell<Vec<WindowEvent>>>,
    /// Records from the previous session not yet handed out
    session: Session,
}

impl Driver {
    fn new(config: Config, x11: bool) -> Result<Self> {
        let path = config.session.path.clone().map(Ok).unwrap_or_else(Session::default_path);
        let session = match path {
            Ok(path) if path.exists() => Session::load(&path).unwrap_or_else(|e| {
                warn!("Ignoring unreadable session: {:#}", e);
                Session::default()
            }),
            Ok(_) => Session::default(),
            Err(e) => {
                warn!("No session path: {:#}", e);
                Session::default()
            }
        };

        let mut outputs = None;
        let backend: Box<dyn ProtocolBackend> = if x11 {
            let backend = X11Backend::connect(None)?;
            match backend.outputs() {
                Ok(found) if !found.is_empty() => outputs = Some(found),
                Ok(_) => warn!("RandR reported no monitors, using configured outputs"),
                Err(e) => warn!("RandR query failed, using configured outputs: {:#}", e),
            }
            Box::new(backend)
        } else {
            Box::new(NullBackend::new())
        };

        let mut comp = Compositor::new(config, backend, Box::new(NullRenderer));
        if let Some(outputs) = outputs {
            comp.set_outputs(outputs);
        }
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        comp.connect(move |event| sink.borrow_mut().push(event.clone()));
        info!("Driver ready with {} session records", session.len());
        Ok(Self {
            comp,
            events,
            session,
        })
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                if let Err(e) = self.execute(command) {
                    print(&Output::Error {
                        error: format!("{:#}", e),
                    });
                }
            }
            Err(e) => {
                debug!("Bad command {:?}: {}", line, e);
                print(&Output::Error {
                    error: format!("invalid command: {}", e),
                });
            }
        }
        self.flush_events();
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        let comp = &mut self.comp;
        match command {
            Command::Manage(mut request) => {
                if request.session.is_none() {
                    request.session =
                        self.session
                            .take(&request.app_id, &request.caption, request.window_type);
                }
                let id = comp.take_control(request);
                print(&Output::Managed { managed: id });
            }
            Command::Release { id } => comp.release_window(id),
            Command::Activate { id } => comp.activate_window(id, true),
            Command::Move { id, x, y } => comp.move_window(id, Point::new(x, y)),
            Command::Resize { id, width, height } => {
                comp.resize_with_checks(id, Size::new(width, height), SizeMode::Any)
            }
            Command::Maximize { id, mode } => comp.maximize(id, mode),
            Command::QuickTile { id, mode } => comp.set_quick_tile_mode(id, mode, true),
            Command::Fullscreen { id, set } => comp.set_fullscreen(id, set, true),
            Command::KeepAbove { id, set } => comp.set_keep_above(id, set),
            Command::KeepBelow { id, set } => comp.set_keep_below(id, set),
            Command::Minimize { id } => comp.minimize(id, false),
            Command::Unminimize { id } => comp.unminimize(id, false),
            Command::MouseCommand { id, command, x, y } => {
                comp.perform_mouse_command(id, command, Point::new(x, y));
            }
            Command::Press { id, x, y } => {
                comp.decoration_press(id, Point::new(x, y));
            }
            Command::Pointer { x, y, release } => {
                comp.pointer_motion(Point::new(x, y));
                if release {
                    comp.pointer_release();
                }
            }
            Command::Key(press) => {
                comp.key_press_event(press);
            }
            Command::Desktop { desktop } => comp.set_current_desktop(desktop),
            Command::Management { id, request } => comp.handle_management_request(id, request),
            Command::SaveSession => {
                let path = comp.save_session().context("Failed to save session")?;
                info!("Session saved to {:?}", path);
            }
            Command::Dump => print(&Output::Snapshot(snapshot(comp))),
        }
        Ok(())
    }

    fn tick(&mut self) {
        self.comp.dispatch(Instant::now());
        self.flush_events();
    }

    fn flush_events(&mut self) {
        let events: Vec<WindowEvent> = self.events.borrow_mut().drain(..).collect();
        for event in &events {
            print(&Output::Event(event));
        }
    }
}

struct Args {
    config: Option<PathBuf>,
    x11: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        x11: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--x11" => args.x11 = true,
            "--config" | "-c" => args.config = iter.next().map(PathBuf::from),
            other => warn!("Ignoring unknown argument {:?}", other),
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr; stdout carries the event stream
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Area Core driver");
    let args = parse_args();
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut driver = Driver::new(config, args.x11)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => driver.handle_line(&line),
                Ok(None) => {
                    info!("Input closed, shutting down");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => driver.tick(),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    driver.tick();
    Ok(())
}

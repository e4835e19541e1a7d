//! Window-management mirror
//!
//! Projection of a window's state exposed to shell and taskbar clients, plus
//! the requests those clients send back. The registry owns the mirrors; the
//! control block only holds a weak handle, so a released window's mirror is
//! marked unmapped and dropped from the registry.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::Compositor;
use crate::shared::Geometry;
use crate::wm::client_flags::{MaximizeMode, ShadeMode};
use crate::wm::moveresize::MouseCommand;
use crate::wm::window::WindowId;

/// Shell-visible window state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagementWindow {
    pub id: Option<WindowId>,
    pub title: String,
    pub app_id: String,
    pub icon: Option<String>,
    pub active: bool,
    pub fullscreen: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub maximized: bool,
    pub minimized: bool,
    pub on_all_desktops: bool,
    pub demands_attention: bool,
    pub closeable: bool,
    pub maximizable: bool,
    pub minimizable: bool,
    pub fullscreenable: bool,
    pub resizable: bool,
    pub movable: bool,
    pub shadeable: bool,
    pub shaded: bool,
    pub skip_taskbar: bool,
    pub skip_switcher: bool,
    pub parent: Option<WindowId>,
    pub geometry: Geometry,
    pub virtual_desktops: Vec<u32>,
    /// Window is gone; the shell should drop it
    pub unmapped: bool,
    #[serde(skip)]
    pub requests: VecDeque<ManagementRequest>,
}

impl ManagementWindow {
    /// Queue a request from the shell
    pub fn request(&mut self, request: ManagementRequest) {
        self.requests.push_back(request);
    }
}

/// Requests a shell client can make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", content = "value", rename_all = "snake_case")]
pub enum ManagementRequest {
    Close,
    Move,
    Resize,
    SetFullscreen(bool),
    SetMinimized(bool),
    SetMaximized(bool),
    SetKeepAbove(bool),
    SetKeepBelow(bool),
    SetDemandsAttention(bool),
    Activate,
    SetShaded(bool),
    SetSkipTaskbar(bool),
    SetSkipSwitcher(bool),
    EnterDesktop(u32),
    LeaveDesktop(u32),
}

/// Strong owner of every mirror
#[derive(Debug, Default)]
pub struct ManagementRegistry {
    windows: HashMap<WindowId, Rc<RefCell<ManagementWindow>>>,
}

impl ManagementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&mut self, id: WindowId) -> Weak<RefCell<ManagementWindow>> {
        let mirror = Rc::new(RefCell::new(ManagementWindow {
            id: Some(id),
            ..Default::default()
        }));
        let weak = Rc::downgrade(&mirror);
        self.windows.insert(id, mirror);
        weak
    }

    fn destroy(&mut self, id: WindowId) {
        if let Some(mirror) = self.windows.remove(&id) {
            mirror.borrow_mut().unmapped = true;
        }
    }

    /// Handle for a shell client
    pub fn get(&self, id: WindowId) -> Option<Rc<RefCell<ManagementWindow>>> {
        self.windows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Compositor {
    /// Create the mirror for a freshly managed window
    pub(crate) fn setup_management(&mut self, id: WindowId) {
        let weak = self.management.create(id);
        if let Some(control) = self.windows.get_mut(&id).and_then(|w| w.control.as_mut()) {
            control.management = weak;
        }
        self.sync_management(id);
    }

    pub(crate) fn destroy_management(&mut self, id: WindowId) {
        self.management.destroy(id);
    }

    /// Shell handle of a window's mirror
    pub fn management_window(&self, id: WindowId) -> Option<Rc<RefCell<ManagementWindow>>> {
        self.management.get(id)
    }

    /// Copy live state into the mirror
    pub(crate) fn sync_management(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let Some(mirror) = control.management.upgrade() else {
            return;
        };
        let mut m = mirror.borrow_mut();
        m.title = w.caption.clone();
        m.app_id = w.app_id.clone();
        m.icon = control.icon.clone();
        m.active = control.active;
        m.fullscreen = control.fullscreen;
        m.keep_above = control.keep_above;
        m.keep_below = control.keep_below;
        m.maximized = w.max_mode() == MaximizeMode::FULL;
        m.minimized = control.minimized;
        m.on_all_desktops = w.on_all_desktops();
        m.demands_attention = control.demands_attention;
        m.closeable = w.is_closeable();
        m.maximizable = w.is_maximizable();
        m.minimizable = w.is_minimizable();
        m.fullscreenable = self.can_fullscreen(id);
        m.resizable = w.is_resizable();
        m.movable = w.is_movable();
        m.shadeable = w.is_shadeable();
        m.shaded = w.is_shaded();
        m.skip_taskbar = control.skip_taskbar;
        m.skip_switcher = control.skip_switcher;
        m.parent = w.transient.leads.first().copied();
        m.geometry = w.frame_geometry;
        m.virtual_desktops = w.desktops.clone();
    }

    /// Drain and apply queued shell requests, one setter per request
    pub fn process_management_requests(&mut self) {
        let mut work = Vec::new();
        for (id, mirror) in &self.management.windows {
            let mut m = mirror.borrow_mut();
            while let Some(request) = m.requests.pop_front() {
                work.push((*id, request));
            }
        }
        work.sort_by_key(|(id, _)| *id);
        for (id, request) in work {
            self.handle_management_request(id, request);
        }
    }

    pub fn handle_management_request(&mut self, id: WindowId, request: ManagementRequest) {
        debug!("Management request {:?} for {}", request, id);
        match request {
            ManagementRequest::Close => self.close_window(id),
            ManagementRequest::Move => {
                let pos = self.cursor.pos;
                self.perform_mouse_command(id, MouseCommand::Move, pos);
            }
            ManagementRequest::Resize => {
                let pos = self.cursor.pos;
                self.perform_mouse_command(id, MouseCommand::Resize, pos);
            }
            ManagementRequest::SetFullscreen(set) => self.set_fullscreen(id, set, true),
            ManagementRequest::SetMinimized(true) => self.minimize(id, false),
            ManagementRequest::SetMinimized(false) => self.unminimize(id, false),
            ManagementRequest::SetMaximized(set) => {
                let mode = if set { MaximizeMode::FULL } else { MaximizeMode::RESTORE };
                self.maximize(id, mode);
            }
            ManagementRequest::SetKeepAbove(set) => self.set_keep_above(id, set),
            ManagementRequest::SetKeepBelow(set) => self.set_keep_below(id, set),
            ManagementRequest::SetDemandsAttention(set) => self.demand_attention(id, set),
            ManagementRequest::Activate => self.activate_window(id, true),
            ManagementRequest::SetShaded(set) => {
                let mode = if set { ShadeMode::Normal } else { ShadeMode::None };
                self.set_shade(id, mode);
            }
            ManagementRequest::SetSkipTaskbar(set) => self.set_skip_taskbar(id, set),
            ManagementRequest::SetSkipSwitcher(set) => self.set_skip_switcher(id, set),
            ManagementRequest::EnterDesktop(d) => self.enter_desktop(id, d),
            ManagementRequest::LeaveDesktop(d) => self.leave_desktop(id, d),
        }
    }
}

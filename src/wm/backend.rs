//! Protocol backends
//!
//! The small set of protocol-specific side effects the window core needs.
//! Hooks run after the core has committed its own state; they never veto it.
//! Wire errors are logged by the backend and otherwise ignored.

use std::cell::RefCell;
use std::rc::Rc;

use crate::shared::Geometry;
use crate::wm::client_flags::NetState;
use crate::wm::window::{Window, WindowId};

/// Protocol-specific hook points
pub trait ProtocolBackend {
    fn do_set_active(&mut self, _win: &Window) {}

    fn do_minimize(&mut self, _win: &Window) {}

    fn do_set_keep_above(&mut self, _win: &Window) {}

    fn do_set_keep_below(&mut self, _win: &Window) {}

    fn do_set_desktop(&mut self, _win: &Window) {}

    fn do_set_fullscreen(&mut self, _win: &Window) {}

    fn do_set_shade(&mut self, _win: &Window) {}

    /// Push the window's NET state to the wire
    fn sync_net_state(&mut self, _win: &Window) {}

    /// Tell the client about its committed geometry
    fn configure(&mut self, _win: &Window) {}

    /// New stacking order, bottom to top
    fn restack(&mut self, _order: &[&Window]) {}

    fn set_active_window(&mut self, _win: Option<&Window>) {}

    /// Politely ask the client to close
    fn close(&mut self, _win: &Window) {}

    fn update_mouse_grab(&mut self, _win: &Window) {}

    /// Grab input for an interactive operation; false aborts the operation
    fn start_move_resize(&mut self, _win: &Window) -> bool {
        true
    }

    fn leave_move_resize(&mut self, _win: &Window) {}
}

/// A hook invocation seen by a recording backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    SetActive(WindowId, bool),
    Minimize(WindowId, bool),
    KeepAbove(WindowId, bool),
    KeepBelow(WindowId, bool),
    Desktop(WindowId, Vec<u32>),
    Fullscreen(WindowId, bool),
    Shade(WindowId),
    NetState(WindowId, NetState),
    Configure(WindowId, Geometry),
    Restack(Vec<WindowId>),
    ActiveWindow(Option<WindowId>),
    Close(WindowId),
    MouseGrab(WindowId),
    StartMoveResize(WindowId),
    LeaveMoveResize(WindowId),
}

/// Backend without a display connection. Optionally records every hook.
#[derive(Debug, Default, Clone)]
pub struct NullBackend {
    log: Option<Rc<RefCell<Vec<BackendCall>>>>,
    /// Refuse interactive grabs
    pub refuse_grabs: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend plus the shared log it records into
    pub fn recording() -> (Self, Rc<RefCell<Vec<BackendCall>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                log: Some(log.clone()),
                refuse_grabs: false,
            },
            log,
        )
    }

    fn record(&self, call: BackendCall) {
        if let Some(log) = &self.log {
            log.borrow_mut().push(call);
        }
    }
}

impl ProtocolBackend for NullBackend {
    fn do_set_active(&mut self, win: &Window) {
        self.record(BackendCall::SetActive(win.id, win.is_active()));
    }

    fn do_minimize(&mut self, win: &Window) {
        self.record(BackendCall::Minimize(win.id, win.is_minimized()));
    }

    fn do_set_keep_above(&mut self, win: &Window) {
        self.record(BackendCall::KeepAbove(win.id, win.keep_above()));
    }

    fn do_set_keep_below(&mut self, win: &Window) {
        self.record(BackendCall::KeepBelow(win.id, win.keep_below()));
    }

    fn do_set_desktop(&mut self, win: &Window) {
        self.record(BackendCall::Desktop(win.id, win.desktops.clone()));
    }

    fn do_set_fullscreen(&mut self, win: &Window) {
        self.record(BackendCall::Fullscreen(win.id, win.is_fullscreen()));
    }

    fn do_set_shade(&mut self, win: &Window) {
        self.record(BackendCall::Shade(win.id));
    }

    fn sync_net_state(&mut self, win: &Window) {
        if let Some(net) = win.net {
            self.record(BackendCall::NetState(win.id, net.state));
        }
    }

    fn configure(&mut self, win: &Window) {
        self.record(BackendCall::Configure(win.id, win.frame_geometry));
    }

    fn restack(&mut self, order: &[&Window]) {
        self.record(BackendCall::Restack(order.iter().map(|w| w.id).collect()));
    }

    fn set_active_window(&mut self, win: Option<&Window>) {
        self.record(BackendCall::ActiveWindow(win.map(|w| w.id)));
    }

    fn close(&mut self, win: &Window) {
        self.record(BackendCall::Close(win.id));
    }

    fn update_mouse_grab(&mut self, win: &Window) {
        self.record(BackendCall::MouseGrab(win.id));
    }

    fn start_move_resize(&mut self, win: &Window) -> bool {
        self.record(BackendCall::StartMoveResize(win.id));
        !self.refuse_grabs
    }

    fn leave_move_resize(&mut self, win: &Window) {
        self.record(BackendCall::LeaveMoveResize(win.id));
    }
}

//! EWMH (Extended Window Manager Hints) backend
//!
//! Mirrors the core's committed window state onto an X11 display: NET state,
//! desktop, active window, stacking list, frame extents, configures and
//! polite close requests. Wire errors are logged and otherwise ignored.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageEvent, ConfigureWindowAux, ConnectionExt as _, EventMask,
    GrabMode, GrabStatus, PropMode, StackMode,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::shared::Geometry;
use crate::wm::backend::ProtocolBackend;
use crate::wm::client_flags::NetState;
use crate::wm::window::Window;

/// `_NET_WM_DESKTOP` value of windows on all desktops
const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// ICCCM WM_STATE values
const WM_STATE_NORMAL: u32 = 1;
const WM_STATE_ICONIC: u32 = 3;

/// Interned atoms the backend writes
#[derive(Debug, Clone)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_client_list_stacking: Atom,
    pub net_active_window: Atom,
    pub net_wm_desktop: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_demands_attention: Atom,
    pub net_wm_state_focused: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_state: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_modal: intern("_NET_WM_STATE_MODAL")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_shaded: intern("_NET_WM_STATE_SHADED")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern("_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern("_NET_WM_STATE_BELOW")?,
            net_wm_state_demands_attention: intern("_NET_WM_STATE_DEMANDS_ATTENTION")?,
            net_wm_state_focused: intern("_NET_WM_STATE_FOCUSED")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_state: intern("WM_STATE")?,
        })
    }

    /// `_NET_WM_STATE` atoms for a NET state. Skip-switcher has no EWMH atom.
    pub fn state_atoms(&self, state: NetState) -> Vec<Atom> {
        let table = [
            (NetState::MODAL, self.net_wm_state_modal),
            (NetState::STICKY, self.net_wm_state_sticky),
            (NetState::MAX_VERT, self.net_wm_state_maximized_vert),
            (NetState::MAX_HORIZ, self.net_wm_state_maximized_horz),
            (NetState::SHADED, self.net_wm_state_shaded),
            (NetState::SKIP_TASKBAR, self.net_wm_state_skip_taskbar),
            (NetState::SKIP_PAGER, self.net_wm_state_skip_pager),
            (NetState::HIDDEN, self.net_wm_state_hidden),
            (NetState::FULLSCREEN, self.net_wm_state_fullscreen),
            (NetState::KEEP_ABOVE, self.net_wm_state_above),
            (NetState::KEEP_BELOW, self.net_wm_state_below),
            (NetState::DEMANDS_ATTENTION, self.net_wm_state_demands_attention),
            (NetState::FOCUSED, self.net_wm_state_focused),
        ];
        table
            .iter()
            .filter(|(flag, _)| state.contains(*flag))
            .map(|(_, atom)| *atom)
            .collect()
    }

    fn supported(&self) -> Vec<Atom> {
        let mut atoms = vec![
            self.net_client_list_stacking,
            self.net_active_window,
            self.net_wm_desktop,
            self.net_frame_extents,
            self.net_wm_state,
        ];
        atoms.extend(self.state_atoms(NetState::all()));
        atoms
    }
}

/// `_NET_WM_DESKTOP` value for a window
pub fn net_desktop(win: &Window) -> u32 {
    if win.on_all_desktops() {
        ALL_DESKTOPS
    } else {
        win.desktop().saturating_sub(1)
    }
}

/// Protocol backend writing to an X11 display
pub struct X11Backend<C: Connection> {
    conn: C,
    root: u32,
    atoms: Atoms,
}

impl X11Backend<RustConnection> {
    /// Connect to `display`, or `$DISPLAY` when `None`
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(display).context("Failed to connect to X11 display")?;
        Self::new(conn, screen_num)
    }
}

impl<C: Connection> X11Backend<C> {
    pub fn new(conn: C, screen_num: usize) -> Result<Self> {
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .context("X11 screen out of range")?;
        let atoms = Atoms::new(&conn).context("Failed to intern atoms")?;
        conn.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_supported,
            AtomEnum::ATOM,
            &atoms.supported(),
        )?;
        conn.flush()?;
        info!("X11 backend ready on screen {} (root 0x{:x})", screen_num, root);
        Ok(Self { conn, root, atoms })
    }

    /// Active monitors as named output rectangles
    pub fn outputs(&self) -> Result<Vec<(String, Geometry)>> {
        let reply = self
            .conn
            .randr_get_monitors(self.root, true)?
            .reply()
            .context("RandR monitor query failed")?;
        let mut outputs = Vec::new();
        for monitor in reply.monitors {
            let name = self
                .conn
                .get_atom_name(monitor.name)?
                .reply()
                .map(|r| String::from_utf8_lossy(&r.name).into_owned())
                .unwrap_or_else(|_| format!("monitor-{}", outputs.len()));
            let geometry = Geometry::new(
                monitor.x as i32,
                monitor.y as i32,
                monitor.width as i32,
                monitor.height as i32,
            );
            debug!("RandR monitor {} at {:?}", name, geometry);
            outputs.push((name, geometry));
        }
        Ok(outputs)
    }

    fn write_net_state(&self, xid: u32, state: NetState) -> Result<()> {
        let atoms = self.atoms.state_atoms(state);
        self.conn.change_property32(
            PropMode::REPLACE,
            xid,
            self.atoms.net_wm_state,
            AtomEnum::ATOM,
            &atoms,
        )?;
        Ok(())
    }

    fn write_desktop(&self, xid: u32, desktop: u32) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            xid,
            self.atoms.net_wm_desktop,
            AtomEnum::CARDINAL,
            &[desktop],
        )?;
        Ok(())
    }

    fn write_wm_state(&self, xid: u32, iconic: bool) -> Result<()> {
        let state = if iconic { WM_STATE_ICONIC } else { WM_STATE_NORMAL };
        self.conn.change_property32(
            PropMode::REPLACE,
            xid,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state, NONE],
        )?;
        Ok(())
    }

    fn write_geometry(&self, win: &Window, xid: u32) -> Result<()> {
        let client = win.client_geometry();
        let aux = ConfigureWindowAux::new()
            .x(client.x)
            .y(client.y)
            .width(client.width.max(1) as u32)
            .height(client.height.max(1) as u32);
        self.conn.configure_window(xid, &aux)?;
        let m = win.frame_margins();
        self.conn.change_property32(
            PropMode::REPLACE,
            xid,
            self.atoms.net_frame_extents,
            AtomEnum::CARDINAL,
            &[m.left as u32, m.right as u32, m.top as u32, m.bottom as u32],
        )?;
        Ok(())
    }

    fn write_stacking(&self, order: &[&Window]) -> Result<()> {
        let xids: Vec<u32> = order.iter().filter_map(|w| w.xid).collect();
        for xid in &xids {
            self.conn
                .configure_window(*xid, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        }
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_client_list_stacking,
            AtomEnum::WINDOW,
            &xids,
        )?;
        Ok(())
    }

    fn send_delete_window(&self, xid: u32) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            xid,
            self.atoms.wm_protocols,
            [self.atoms.wm_delete_window, CURRENT_TIME, 0, 0, 0],
        );
        self.conn.send_event(false, xid, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn grab_pointer(&self) -> Result<bool> {
        let mask = EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    /// Log a failed request and flush the rest
    fn finish(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!("X11 {} failed: {:#}", what, e);
        }
        if let Err(e) = self.conn.flush() {
            warn!("X11 flush failed: {}", e);
        }
    }
}

impl<C: Connection> ProtocolBackend for X11Backend<C> {
    fn do_minimize(&mut self, win: &Window) {
        let Some(xid) = win.xid else {
            return;
        };
        self.finish("WM_STATE", self.write_wm_state(xid, win.is_minimized()));
    }

    fn do_set_desktop(&mut self, win: &Window) {
        let Some(xid) = win.xid else {
            return;
        };
        self.finish("_NET_WM_DESKTOP", self.write_desktop(xid, net_desktop(win)));
    }

    fn sync_net_state(&mut self, win: &Window) {
        let (Some(xid), Some(net)) = (win.xid, win.net) else {
            return;
        };
        self.finish("_NET_WM_STATE", self.write_net_state(xid, net.state));
    }

    fn configure(&mut self, win: &Window) {
        let Some(xid) = win.xid else {
            return;
        };
        self.finish("configure", self.write_geometry(win, xid));
    }

    fn restack(&mut self, order: &[&Window]) {
        self.finish("restack", self.write_stacking(order));
    }

    fn set_active_window(&mut self, win: Option<&Window>) {
        let xid = win.and_then(|w| w.xid).unwrap_or(NONE);
        let result = self
            .conn
            .change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms.net_active_window,
                AtomEnum::WINDOW,
                &[xid],
            )
            .map(|_| ())
            .map_err(Into::into);
        self.finish("_NET_ACTIVE_WINDOW", result);
    }

    fn close(&mut self, win: &Window) {
        let Some(xid) = win.xid else {
            return;
        };
        debug!("Sending WM_DELETE_WINDOW to 0x{:x}", xid);
        self.finish("WM_DELETE_WINDOW", self.send_delete_window(xid));
    }

    fn start_move_resize(&mut self, win: &Window) -> bool {
        match self.grab_pointer() {
            Ok(true) => true,
            Ok(false) => {
                debug!("Pointer grab refused for {}", win.id);
                false
            }
            Err(e) => {
                warn!("Pointer grab for {} failed: {:#}", win.id, e);
                false
            }
        }
    }

    fn leave_move_resize(&mut self, _win: &Window) {
        let result = self.conn.ungrab_pointer(CURRENT_TIME).map(|_| ()).map_err(Into::into);
        self.finish("ungrab", result);
    }
}

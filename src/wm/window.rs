//! Window
//!
//! One managed (or remnant) surface: geometry bookkeeping, type predicates,
//! transient/group links and the optional control block. Windows live in the
//! compositor's arena keyed by `WindowId`; ids are never reused.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::{Geometry, Margins, Point, Size};
use crate::wm::client_flags::{
    Actions, Layer, MaximizeMode, NetState, ProtocolKind, ShadeMode, WindowType,
};
use crate::wm::control::Control;
use crate::wm::group::GroupId;
use crate::wm::hints::SizeHints;
use crate::wm::remnant::Remnant;
use crate::wm::transients::Transient;

/// Stable arena handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pending state of a blocked geometry update. Ordered so merging keeps the
/// strongest request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingGeometry {
    #[default]
    None,
    Normal,
    Forced,
}

/// Geometry-update blocking state
#[derive(Debug, Clone, Default)]
pub struct GeometryUpdate {
    /// Nesting count of `block_geometry_updates(true)`
    pub block: u32,
    pub pending: PendingGeometry,
    /// Last requested frame geometry, unshaded. Equals the committed frame
    /// unless updates are blocked or the window is shaded.
    pub frame: Geometry,
    /// Committed frame when the block started
    pub original_frame: Geometry,
    pub max_mode: MaximizeMode,
}

/// Remembered geometries to return to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreGeometries {
    /// Pre-maximize (and pre-quick-tile) frame
    pub maximize: Geometry,
    /// Pre-fullscreen frame
    pub fullscreen: Geometry,
}

/// Server-side decoration attached to a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub borders: Margins,
}

/// Parsed NET state of an X11 window, mirrored to the wire by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetInfo {
    pub state: NetState,
    pub desktop: u32,
}

/// Managed window
#[derive(Debug)]
pub struct Window {
    pub id: WindowId,
    pub protocol: ProtocolKind,
    /// X11 client window id, if any
    pub xid: Option<u32>,
    pub window_type: WindowType,
    pub caption: String,
    pub app_id: String,

    /// Committed outer rectangle including decoration
    pub frame_geometry: Geometry,
    pub geometry_update: GeometryUpdate,
    pub restore_geometries: RestoreGeometries,

    pub decoration: Option<Decoration>,
    /// Decoration suppressed by the user, rules or borderless maximize
    pub no_border: bool,
    pub size_hints: SizeHints,

    /// Virtual desktops; empty means all desktops
    pub desktops: Vec<u32>,
    pub screen: usize,
    /// Cached layer, `Unknown` until computed
    pub layer: Layer,
    pub opacity: f64,
    pub actions: Actions,
    pub shade: ShadeMode,

    pub transient: Transient,
    pub group: Option<GroupId>,
    pub net: Option<NetInfo>,
    /// Space reserved along screen edges (docks)
    pub strut: Option<Margins>,
    /// Position requested by the client
    pub position_hint: Option<Point>,
    /// Placement relative to the lead requested by a transient (popups)
    pub placement_hint: Option<Point>,
    /// Stacking index recorded by the session this window was restored from
    pub session_stacking: Option<u32>,

    pub control: Option<Control>,
    pub remnant: Option<Remnant>,
}

impl Window {
    pub fn new(id: WindowId, protocol: ProtocolKind, window_type: WindowType) -> Self {
        Self {
            id,
            protocol,
            xid: None,
            window_type,
            caption: String::new(),
            app_id: String::new(),
            frame_geometry: Geometry::default(),
            geometry_update: GeometryUpdate::default(),
            restore_geometries: RestoreGeometries::default(),
            decoration: None,
            no_border: false,
            size_hints: SizeHints::default(),
            desktops: Vec::new(),
            screen: 0,
            layer: Layer::Unknown,
            opacity: 1.0,
            actions: Actions::default(),
            shade: ShadeMode::None,
            transient: Transient::default(),
            group: None,
            net: if protocol == ProtocolKind::X11 {
                Some(NetInfo::default())
            } else {
                None
            },
            strut: None,
            position_hint: None,
            placement_hint: None,
            session_stacking: None,
            control: None,
            remnant: None,
        }
    }

    pub fn is_remnant(&self) -> bool {
        self.remnant.is_some()
    }

    pub fn is_desktop(&self) -> bool {
        self.window_type == WindowType::Desktop
    }

    pub fn is_dock(&self) -> bool {
        self.window_type == WindowType::Dock
    }

    pub fn is_dialog(&self) -> bool {
        self.window_type == WindowType::Dialog
    }

    pub fn is_splash(&self) -> bool {
        self.window_type == WindowType::Splash
    }

    pub fn is_toolbar(&self) -> bool {
        self.window_type == WindowType::Toolbar
    }

    pub fn is_utility(&self) -> bool {
        self.window_type == WindowType::Utility
    }

    pub fn is_notification(&self) -> bool {
        self.window_type == WindowType::Notification
    }

    pub fn is_critical_notification(&self) -> bool {
        self.window_type == WindowType::CriticalNotification
    }

    pub fn is_on_screen_display(&self) -> bool {
        self.window_type == WindowType::OnScreenDisplay
    }

    pub fn is_popup(&self) -> bool {
        matches!(
            self.window_type,
            WindowType::DropdownMenu
                | WindowType::PopupMenu
                | WindowType::Tooltip
                | WindowType::ComboBox
                | WindowType::Dnd
        )
    }

    /// Desktop, dock, splash, toolbar and shell overlays
    pub fn is_special(&self) -> bool {
        self.is_desktop()
            || self.is_dock()
            || self.is_splash()
            || self.is_toolbar()
            || self.is_notification()
            || self.is_critical_notification()
            || self.is_on_screen_display()
    }

    /// Window type that gets a server-side decoration
    pub fn wants_decoration(&self) -> bool {
        matches!(
            self.window_type,
            WindowType::Normal | WindowType::Dialog | WindowType::Utility | WindowType::Menu
        )
    }

    pub fn is_transient(&self) -> bool {
        !self.transient.leads.is_empty() || self.transient.group_transient
    }

    pub fn is_modal(&self) -> bool {
        self.transient.modal
    }

    pub fn is_active(&self) -> bool {
        self.control.as_ref().is_some_and(|c| c.active)
    }

    pub fn is_minimized(&self) -> bool {
        self.control.as_ref().is_some_and(|c| c.minimized)
    }

    pub fn is_fullscreen(&self) -> bool {
        match (&self.control, &self.remnant) {
            (Some(c), _) => c.fullscreen,
            (None, Some(r)) => r.fullscreen,
            _ => false,
        }
    }

    pub fn keep_above(&self) -> bool {
        match (&self.control, &self.remnant) {
            (Some(c), _) => c.keep_above,
            (None, Some(r)) => r.keep_above,
            _ => false,
        }
    }

    pub fn keep_below(&self) -> bool {
        match (&self.control, &self.remnant) {
            (Some(c), _) => c.keep_below,
            (None, Some(r)) => r.keep_below,
            _ => false,
        }
    }

    pub fn max_mode(&self) -> MaximizeMode {
        self.geometry_update.max_mode
    }

    pub fn is_shaded(&self) -> bool {
        self.shade.is_shaded()
    }

    pub fn is_movable(&self) -> bool {
        self.control.is_some() && self.actions.contains(Actions::MOVE) && !self.is_fullscreen()
    }

    pub fn is_resizable(&self) -> bool {
        self.control.is_some()
            && self.actions.contains(Actions::RESIZE)
            && !self.is_fullscreen()
            && !self.size_hints.is_fixed_size()
            && !self.is_special()
    }

    pub fn is_minimizable(&self) -> bool {
        self.control.is_some()
            && self.actions.contains(Actions::MINIMIZE)
            && !self.is_special()
            && !(self.is_transient() && self.is_modal())
    }

    pub fn is_maximizable(&self) -> bool {
        self.is_resizable() && self.actions.contains(Actions::MAXIMIZE)
    }

    pub fn is_closeable(&self) -> bool {
        self.control.is_some()
            && self.actions.contains(Actions::CLOSE)
            && !self.is_desktop()
            && !self.is_dock()
    }

    pub fn is_shadeable(&self) -> bool {
        self.decoration.is_some() && self.actions.contains(Actions::SHADE) && !self.is_special()
    }

    pub fn wants_input(&self) -> bool {
        self.actions.contains(Actions::ACCEPT_FOCUS)
    }

    /// Decoration borders, zero when fullscreen or undecorated
    pub fn frame_margins(&self) -> Margins {
        if let Some(remnant) = &self.remnant {
            return remnant.frame_margins;
        }
        if self.is_fullscreen() {
            return Margins::default();
        }
        self.decoration.map(|d| d.borders).unwrap_or_default()
    }

    /// Client rectangle for a frame rectangle
    pub fn frame_to_client(&self, frame: Geometry) -> Geometry {
        frame.shrunk_by(self.frame_margins())
    }

    /// Frame rectangle for a client rectangle
    pub fn client_to_frame(&self, client: Geometry) -> Geometry {
        client.grown_by(self.frame_margins())
    }

    pub fn frame_to_client_size(&self, size: Size) -> Size {
        let m = self.frame_margins();
        Size::new(size.width - m.horizontal(), size.height - m.vertical())
    }

    pub fn client_to_frame_size(&self, size: Size) -> Size {
        let m = self.frame_margins();
        Size::new(size.width + m.horizontal(), size.height + m.vertical())
    }

    pub fn frame_to_client_pos(&self, pos: Point) -> Point {
        let m = self.frame_margins();
        Point::new(pos.x + m.left, pos.y + m.top)
    }

    pub fn client_to_frame_pos(&self, pos: Point) -> Point {
        let m = self.frame_margins();
        Point::new(pos.x - m.left, pos.y - m.top)
    }

    /// Client area of the committed frame. Collapses to zero height when
    /// shaded.
    pub fn client_geometry(&self) -> Geometry {
        let mut client = self.frame_to_client(self.frame_geometry);
        if self.is_shaded() {
            client.height = 0;
        }
        client
    }

    /// Buffer rectangle; server-side decorations live outside the buffer
    pub fn buffer_geometry(&self) -> Geometry {
        self.client_geometry()
    }

    /// Frame geometry as it will be once pending updates are flushed
    pub fn pending_frame(&self) -> Geometry {
        self.geometry_update.frame
    }

    /// On-all-desktops for the purpose of presence
    pub fn on_all_desktops(&self) -> bool {
        self.desktops.is_empty()
    }

    pub fn on_desktop(&self, desktop: u32) -> bool {
        self.on_all_desktops() || self.desktops.contains(&desktop)
    }

    /// Legacy single-desktop view: the last desktop, 0 for all desktops
    pub fn desktop(&self) -> u32 {
        self.desktops.last().copied().unwrap_or(0)
    }
}

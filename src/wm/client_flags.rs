//! Window Flags
//!
//! Bitfield flags and small state enums shared by the control block, the
//! stacking engine and the maximize/tiling state machine.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Maximize mode. The empty set is "restore"; vertical and horizontal
    /// together make "full".
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MaximizeMode: u8 {
        const VERTICAL   = 1 << 0;
        const HORIZONTAL = 1 << 1;
        const FULL       = Self::VERTICAL.bits() | Self::HORIZONTAL.bits();
    }
}

impl MaximizeMode {
    pub const RESTORE: MaximizeMode = MaximizeMode::empty();

    pub fn is_restore(&self) -> bool {
        self.is_empty()
    }

    pub fn is_full(&self) -> bool {
        *self == MaximizeMode::FULL
    }
}

bitflags! {
    /// Quick-tile mode. Empty is "none"; all four edges together are
    /// "maximize".
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct QuickTiles: u8 {
        const LEFT       = 1 << 0;
        const RIGHT      = 1 << 1;
        const TOP        = 1 << 2;
        const BOTTOM     = 1 << 3;
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        const VERTICAL   = Self::TOP.bits() | Self::BOTTOM.bits();
        const MAXIMIZE   = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl QuickTiles {
    pub const NONE: QuickTiles = QuickTiles::empty();

    pub fn is_none(&self) -> bool {
        self.is_empty()
    }

    /// Collapse degenerate combinations: both horizontal edges drop the
    /// horizontal component, both vertical edges drop the vertical one.
    /// `MAXIMIZE` is kept as is since it is its own mode.
    pub fn normalized(self) -> QuickTiles {
        if self == QuickTiles::MAXIMIZE {
            return self;
        }
        let mut mode = self;
        if mode.contains(QuickTiles::HORIZONTAL) {
            mode.remove(QuickTiles::HORIZONTAL);
        }
        if mode.contains(QuickTiles::VERTICAL) {
            mode.remove(QuickTiles::VERTICAL);
        }
        mode
    }
}

bitflags! {
    /// NET wire state mirrored to the protocol layer (_NET_WM_STATE)
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NetState: u32 {
        const MODAL             = 1 << 0;
        const STICKY            = 1 << 1;
        const MAX_VERT          = 1 << 2;
        const MAX_HORIZ         = 1 << 3;
        const SHADED            = 1 << 4;
        const SKIP_TASKBAR      = 1 << 5;
        const KEEP_ABOVE        = 1 << 6;
        const SKIP_PAGER        = 1 << 7;
        const HIDDEN            = 1 << 8;
        const FULLSCREEN        = 1 << 9;
        const KEEP_BELOW        = 1 << 10;
        const DEMANDS_ATTENTION = 1 << 11;
        const SKIP_SWITCHER     = 1 << 12;
        const FOCUSED           = 1 << 13;
        const MAX               = Self::MAX_VERT.bits() | Self::MAX_HORIZ.bits();
    }
}

bitflags! {
    /// What the user and clients are allowed to do with a window
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Actions: u16 {
        const MOVE           = 1 << 0;
        const RESIZE         = 1 << 1;
        const MINIMIZE       = 1 << 2;
        const MAXIMIZE       = 1 << 3;
        const FULLSCREEN     = 1 << 4;
        const CLOSE          = 1 << 5;
        const SHADE          = 1 << 6;
        const CHANGE_DESKTOP = 1 << 7;
        const ACCEPT_FOCUS   = 1 << 8;
    }
}

impl Default for Actions {
    fn default() -> Self {
        Self::all()
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE plus shell roles)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Normal,
    Desktop,
    Dock,
    Dialog,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Notification,
    CriticalNotification,
    OnScreenDisplay,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    ComboBox,
    Dnd,
}

/// Coarse stacking band, ordered bottom to top. `Unknown` is the lazy value
/// meaning "recompute on next query".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    Desktop,
    Below,
    Normal,
    Dock,
    Above,
    Notification,
    Active,
    CriticalNotification,
    OnScreenDisplay,
    #[default]
    Unknown,
}

impl Layer {
    /// Layers that take part in stacking, bottom to top
    pub const STACKED: [Layer; 9] = [
        Layer::Desktop,
        Layer::Below,
        Layer::Normal,
        Layer::Dock,
        Layer::Above,
        Layer::Notification,
        Layer::Active,
        Layer::CriticalNotification,
        Layer::OnScreenDisplay,
    ];
}

/// Shade state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadeMode {
    #[default]
    None,
    /// Shaded by the user or a client request
    Normal,
    /// Shaded, but temporarily unshaded while hovered
    Hover,
    /// Shaded, but temporarily unshaded while active
    Activated,
}

impl ShadeMode {
    /// Client area collapsed
    pub fn is_shaded(&self) -> bool {
        matches!(self, ShadeMode::Normal)
    }
}

/// Which display protocol a window speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    #[default]
    X11,
    Wayland,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_horizontal_edges_collapse_to_none() {
        assert_eq!((QuickTiles::LEFT | QuickTiles::RIGHT).normalized(), QuickTiles::NONE);
        assert!((QuickTiles::LEFT | QuickTiles::RIGHT).normalized().is_none());
    }

    #[test]
    fn normalizing_keeps_single_edges_and_quadrants() {
        assert_eq!(QuickTiles::LEFT.normalized(), QuickTiles::LEFT);
        let quadrant = QuickTiles::LEFT | QuickTiles::TOP;
        assert_eq!(quadrant.normalized(), quadrant);
        assert_eq!(
            (QuickTiles::HORIZONTAL | QuickTiles::TOP).normalized(),
            QuickTiles::TOP
        );
        assert_eq!(QuickTiles::MAXIMIZE.normalized(), QuickTiles::MAXIMIZE);
    }

    #[test]
    fn maximize_full_is_both_axes() {
        assert!(MaximizeMode::FULL.contains(MaximizeMode::VERTICAL));
        assert!(MaximizeMode::FULL.contains(MaximizeMode::HORIZONTAL));
        assert!(MaximizeMode::RESTORE.is_restore());
        assert!(!MaximizeMode::VERTICAL.is_full());
    }

    #[test]
    fn layers_order_bottom_to_top() {
        assert!(Layer::Desktop < Layer::Below);
        assert!(Layer::Normal < Layer::Dock);
        assert!(Layer::Above < Layer::Active);
        assert!(Layer::OnScreenDisplay < Layer::Unknown);
    }
}

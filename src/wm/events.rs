//! Events Module
//!
//! Change notifications emitted by the window core. Observers are called
//! synchronously, in registration order, at the end of the setter that
//! produced the change.

use serde::Serialize;

use crate::shared::Geometry;
use crate::wm::client_flags::{MaximizeMode, QuickTiles, ShadeMode};
use crate::wm::window::WindowId;

/// Something observable changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WindowEvent {
    Added { id: WindowId },
    Removed { id: WindowId },
    RemnantCreated { id: WindowId },
    RemnantDestroyed { id: WindowId },
    ActiveChanged { id: WindowId, active: bool },
    ActiveWindowChanged { id: Option<WindowId> },
    KeepAboveChanged { id: WindowId, set: bool },
    KeepBelowChanged { id: WindowId, set: bool },
    MinimizedChanged { id: WindowId, minimized: bool, animate: bool },
    FullscreenChanged { id: WindowId, set: bool },
    SkipTaskbarChanged { id: WindowId, set: bool },
    SkipPagerChanged { id: WindowId, set: bool },
    SkipSwitcherChanged { id: WindowId, set: bool },
    DemandsAttentionChanged { id: WindowId, set: bool },
    UnresponsiveChanged { id: WindowId, set: bool },
    ShadeChanged { id: WindowId, mode: ShadeMode },
    OpacityChanged { id: WindowId, old: f64 },
    ShortcutChanged { id: WindowId },
    IconChanged { id: WindowId },
    CaptionChanged { id: WindowId },
    PaletteChanged { id: WindowId },
    DesktopChanged { id: WindowId },
    DesktopPresenceChanged { id: WindowId, previous: u32 },
    CurrentDesktopChanged { previous: u32, current: u32 },
    ScreenChanged { id: WindowId },
    FrameGeometryChanged { id: WindowId, old: Geometry },
    MaximizeModeChanged { id: WindowId, mode: MaximizeMode },
    QuickTileModeChanged { id: WindowId, mode: QuickTiles },
    ElectricBorderMaximizingChanged { id: WindowId, set: bool },
    MoveResizeStarted { id: WindowId },
    MoveResizeStepped { id: WindowId, geometry: Geometry },
    MoveResizeFinished { id: WindowId, cancelled: bool },
    TransientChanged { id: WindowId },
    StackingOrderChanged,
}

impl WindowEvent {
    /// The window the event is about, if any
    pub fn window(&self) -> Option<WindowId> {
        use WindowEvent::*;
        match self {
            Added { id }
            | Removed { id }
            | RemnantCreated { id }
            | RemnantDestroyed { id }
            | ActiveChanged { id, .. }
            | KeepAboveChanged { id, .. }
            | KeepBelowChanged { id, .. }
            | MinimizedChanged { id, .. }
            | FullscreenChanged { id, .. }
            | SkipTaskbarChanged { id, .. }
            | SkipPagerChanged { id, .. }
            | SkipSwitcherChanged { id, .. }
            | DemandsAttentionChanged { id, .. }
            | UnresponsiveChanged { id, .. }
            | ShadeChanged { id, .. }
            | OpacityChanged { id, .. }
            | ShortcutChanged { id }
            | IconChanged { id }
            | CaptionChanged { id }
            | PaletteChanged { id }
            | DesktopChanged { id }
            | DesktopPresenceChanged { id, .. }
            | ScreenChanged { id }
            | FrameGeometryChanged { id, .. }
            | MaximizeModeChanged { id, .. }
            | QuickTileModeChanged { id, .. }
            | ElectricBorderMaximizingChanged { id, .. }
            | MoveResizeStarted { id }
            | MoveResizeStepped { id, .. }
            | MoveResizeFinished { id, .. }
            | TransientChanged { id } => Some(*id),
            ActiveWindowChanged { .. } | CurrentDesktopChanged { .. } | StackingOrderChanged => {
                None
            }
        }
    }
}

/// Handle returned by `Signals::connect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type Observer = Box<dyn FnMut(&WindowEvent)>;

/// Observer list
#[derive(Default)]
pub struct Signals {
    observers: Vec<(ObserverId, Observer)>,
    next_id: u64,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn emit(&mut self, event: &WindowEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for Signals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signals")
            .field("observers", &self.observers.len())
            .finish()
    }
}

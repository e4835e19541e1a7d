//! MoveResize Module
//!
//! Interactive move and resize: mouse commands on a window, the delayed
//! titlebar drag, pointer-driven geometry updates with snapping and the
//! keyboard variant.
//!
//! An operation goes `idle -> pressed -> active -> idle`. A titlebar press
//! arms a `DelayedMoveResize` timer; the drag starts when it fires or when
//! the pointer travels far enough, whichever comes first.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::compositor::Compositor;
use crate::compositor::cursor::CursorShape;
use crate::shared::{Geometry, Point, Size};
use crate::wm::client_flags::{MaximizeMode, NetState, QuickTiles};
use crate::wm::events::WindowEvent;
use crate::wm::hints::SizeMode;
use crate::wm::screen::ClientAreaOption;
use crate::wm::timers::TimerKind;
use crate::wm::window::WindowId;

/// Pointer travel that turns a pending titlebar press into a drag
const START_DRAG_DISTANCE: i32 = 10;

/// Width of the titlebar a restricted move keeps on screen
const VISIBLE_TITLEBAR: i32 = 100;

const OPACITY_STEP: f64 = 0.1;
const MIN_OPACITY: f64 = 0.1;

/// Part of the frame an operation holds on to. `Center` is a move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Center,
    Left,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
}

impl Position {
    /// Edge or corner under a pointer `offset` inside a frame of `size`:
    /// the outer thirds pick the top and bottom edges with their corners,
    /// the middle band splits into left and right halves
    pub fn from_offset(offset: Point, size: Size) -> Self {
        let left = offset.x < size.width / 3;
        let right = offset.x >= size.width * 2 / 3;
        if offset.y < size.height / 3 {
            if left {
                Position::TopLeft
            } else if right {
                Position::TopRight
            } else {
                Position::Top
            }
        } else if offset.y >= size.height * 2 / 3 {
            if left {
                Position::BottomLeft
            } else if right {
                Position::BottomRight
            } else {
                Position::Bottom
            }
        } else if offset.x < size.width / 2 {
            Position::Left
        } else {
            Position::Right
        }
    }

    fn touches_left(self) -> bool {
        matches!(self, Position::Left | Position::TopLeft | Position::BottomLeft)
    }

    fn touches_right(self) -> bool {
        matches!(self, Position::Right | Position::TopRight | Position::BottomRight)
    }

    fn touches_top(self) -> bool {
        matches!(self, Position::Top | Position::TopLeft | Position::TopRight)
    }

    fn touches_bottom(self) -> bool {
        matches!(self, Position::Bottom | Position::BottomLeft | Position::BottomRight)
    }

    fn size_mode(self) -> SizeMode {
        match self {
            Position::Left | Position::Right => SizeMode::FixedHeight,
            Position::Top | Position::Bottom => SizeMode::FixedWidth,
            _ => SizeMode::Any,
        }
    }

    fn cursor_shape(self) -> CursorShape {
        match self {
            Position::Center => CursorShape::SizeAll,
            Position::Left => CursorShape::SizeWest,
            Position::TopLeft => CursorShape::SizeNorthWest,
            Position::Top => CursorShape::SizeNorth,
            Position::TopRight => CursorShape::SizeNorthEast,
            Position::Right => CursorShape::SizeEast,
            Position::BottomRight => CursorShape::SizeSouthEast,
            Position::Bottom => CursorShape::SizeSouth,
            Position::BottomLeft => CursorShape::SizeSouthWest,
        }
    }
}

/// Per-window interactive operation state
#[derive(Debug, Clone, Default)]
pub struct MoveResizeOp {
    /// An operation is running
    pub enabled: bool,
    /// The titlebar may leave the movement area
    pub unrestricted: bool,
    /// A button is held on the window, possibly before the drag started
    pub button_down: bool,
    pub pointer: Position,
    /// Pointer position relative to the frame's top-left corner
    pub offset: Point,
    /// Pointer position relative to the frame's bottom-right corner
    pub inverted_offset: Point,
    /// Frame when the operation started, restored on cancel
    pub initial_geometry: Geometry,
    /// Frame the operation currently asks for
    pub geometry: Geometry,
    pub start_screen: usize,
}

impl MoveResizeOp {
    pub fn is_move(&self) -> bool {
        self.enabled && self.pointer == Position::Center
    }

    pub fn is_resize(&self) -> bool {
        self.enabled && self.pointer != Position::Center
    }
}

/// What a pointer button does to a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseCommand {
    Raise,
    Lower,
    OperationsMenu,
    ToggleRaiseAndLower,
    ActivateAndRaise,
    ActivateAndLower,
    Activate,
    ActivateRaiseAndPassClick,
    ActivateAndPassClick,
    ActivateRaiseAndMove,
    ActivateRaiseAndUnrestrictedMove,
    Move,
    UnrestrictedMove,
    Resize,
    UnrestrictedResize,
    Maximize,
    Restore,
    Minimize,
    Above,
    Below,
    PreviousDesktop,
    NextDesktop,
    OpacityMore,
    OpacityLess,
    Close,
    Nothing,
}

/// Keys that steer an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Return,
    Enter,
    Escape,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
        }
    }

    /// Pointer step for arrow keys
    fn step(&self) -> i32 {
        if self.ctrl {
            1
        } else if self.alt {
            32
        } else {
            8
        }
    }
}

/// Closest snap candidate along one axis
#[derive(Default)]
struct Snap {
    delta: Option<i32>,
}

impl Snap {
    fn offer(&mut self, edge: i32, target: i32, zone: i32) {
        let delta = target - edge;
        if delta.abs() < zone && self.delta.is_none_or(|d| delta.abs() < d.abs()) {
            self.delta = Some(delta);
        }
    }

    fn apply(&self, value: i32) -> i32 {
        value + self.delta.unwrap_or(0)
    }
}

impl Compositor {
    pub fn is_move_resize(&self, id: WindowId) -> bool {
        self.control(id).is_some_and(|c| c.move_resize.enabled)
    }

    /// Run a mouse binding on a window. Returns whether the click should
    /// be replayed to the client.
    pub fn perform_mouse_command(
        &mut self,
        id: WindowId,
        command: MouseCommand,
        pos: Point,
    ) -> bool {
        let Some(w) = self.windows.get(&id) else {
            return false;
        };
        let Some(control) = &w.control else {
            return false;
        };
        let active = control.active;
        let keep_above = control.keep_above;
        let keep_below = control.keep_below;
        let is_desktop = w.is_desktop();
        let movable_desktop = !w.is_desktop() && !w.is_dock();
        let opacity = w.opacity;
        debug!("Window {} mouse command {:?}", id, command);

        let mut replay = false;
        match command {
            MouseCommand::Raise => self.raise_window(id),
            MouseCommand::Lower => {
                self.lower_window(id);
                if active && self.config.behavior.focus_policy.is_reasonable() {
                    let desktop = self.desktops.current();
                    if let Some(next) = self.top_window_at(pos, desktop)
                        && next != id
                    {
                        self.request_focus(next, false, false);
                    }
                }
            }
            MouseCommand::OperationsMenu => {
                if active && self.config.behavior.click_raise {
                    self.auto_raise(id);
                }
            }
            MouseCommand::ToggleRaiseAndLower => self.raise_or_lower_window(id),
            MouseCommand::ActivateAndRaise => {
                replay = active || !self.accepts_focus(id);
                self.request_focus(id, true, false);
                self.set_current_screen_at(pos);
            }
            MouseCommand::ActivateAndLower => {
                replay = active || !self.accepts_focus(id);
                self.request_focus(id, false, false);
                self.lower_window(id);
                self.set_current_screen_at(pos);
            }
            MouseCommand::Activate => {
                replay = active || !self.accepts_focus(id);
                self.request_focus(id, false, false);
                self.set_current_screen_at(pos);
            }
            MouseCommand::ActivateRaiseAndPassClick => {
                self.request_focus(id, true, false);
                self.set_current_screen_at(pos);
                replay = true;
            }
            MouseCommand::ActivateAndPassClick => {
                self.request_focus(id, false, false);
                self.set_current_screen_at(pos);
                replay = true;
            }
            MouseCommand::Maximize => self.maximize(id, MaximizeMode::FULL),
            MouseCommand::Restore => self.maximize(id, MaximizeMode::RESTORE),
            MouseCommand::Minimize => self.minimize(id, false),
            MouseCommand::Above => {
                if keep_below {
                    self.set_keep_below(id, false);
                } else {
                    self.set_keep_above(id, true);
                }
            }
            MouseCommand::Below => {
                if keep_above {
                    self.set_keep_above(id, false);
                } else {
                    self.set_keep_below(id, true);
                }
            }
            MouseCommand::PreviousDesktop | MouseCommand::NextDesktop => {
                let current = self.desktops.current();
                let target = if command == MouseCommand::NextDesktop {
                    self.desktops.next(current)
                } else {
                    self.desktops.previous(current)
                };
                if movable_desktop {
                    self.set_desktop(id, target);
                }
                self.set_current_desktop(target);
            }
            MouseCommand::OpacityMore => {
                if !is_desktop {
                    self.set_opacity(id, (opacity + OPACITY_STEP).min(1.0));
                }
            }
            MouseCommand::OpacityLess => {
                if !is_desktop {
                    self.set_opacity(id, (opacity - OPACITY_STEP).max(MIN_OPACITY));
                }
            }
            MouseCommand::Close => self.close_window(id),
            MouseCommand::ActivateRaiseAndMove | MouseCommand::ActivateRaiseAndUnrestrictedMove => {
                self.raise_window(id);
                self.request_focus(id, false, false);
                self.set_current_screen_at(pos);
                let unrestricted = command == MouseCommand::ActivateRaiseAndUnrestrictedMove;
                self.begin_pointer_operation(id, pos, false, unrestricted);
            }
            MouseCommand::Move | MouseCommand::UnrestrictedMove => {
                let unrestricted = command == MouseCommand::UnrestrictedMove;
                self.begin_pointer_operation(id, pos, false, unrestricted);
            }
            MouseCommand::Resize | MouseCommand::UnrestrictedResize => {
                let unrestricted = command == MouseCommand::UnrestrictedResize;
                self.begin_pointer_operation(id, pos, true, unrestricted);
            }
            MouseCommand::Nothing => replay = true,
        }
        replay
    }

    fn accepts_focus(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| {
            w.wants_input()
                && w.control
                    .as_ref()
                    .is_some_and(|c| c.rules.check_accept_focus(true, false))
        })
    }

    fn set_current_screen_at(&mut self, pos: Point) {
        let screen = self.screens.nearest(pos);
        self.screens.set_current(screen);
    }

    /// Topmost shown window under a point on a desktop
    fn top_window_at(&self, pos: Point, desktop: u32) -> Option<WindowId> {
        self.stacking.order().iter().rev().copied().find(|id| {
            self.windows.get(id).is_some_and(|w| {
                w.control.is_some()
                    && w.on_desktop(desktop)
                    && self.is_shown(*id)
                    && w.frame_geometry.contains_point(pos)
            })
        })
    }

    /// Grab the window at `pos` and start moving or resizing it right away
    fn begin_pointer_operation(
        &mut self,
        id: WindowId,
        pos: Point,
        resize: bool,
        unrestricted: bool,
    ) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if resize && (!w.is_resizable() || w.is_shaded()) {
            return;
        }
        if !resize && !w.is_movable() {
            return;
        }
        if let Some(current) = self.move_resize_window {
            self.finish_move_resize(current, false);
        }
        let frame = self.pending_frame_of(id);
        let offset = pos - frame.pos();
        let Some(control) = self.control_mut(id) else {
            return;
        };
        let op = &mut control.move_resize;
        op.pointer = if resize {
            Position::from_offset(offset, frame.size())
        } else {
            Position::Center
        };
        op.button_down = true;
        op.offset = offset;
        op.inverted_offset = Point::new(frame.width - 1, frame.height - 1) - offset;
        op.unrestricted = unrestricted;
        if !self.start_move_resize(id)
            && let Some(control) = self.control_mut(id)
        {
            control.move_resize.button_down = false;
        }
        self.update_cursor(id);
    }

    /// Button press on the decoration: activate and raise, then arm a
    /// delayed drag of the titlebar or a border resize. Returns whether the
    /// click should be replayed.
    pub fn decoration_press(&mut self, id: WindowId, pos: Point) -> bool {
        let replay = self.perform_mouse_command(id, MouseCommand::ActivateAndRaise, pos);
        let Some(w) = self.windows.get(&id) else {
            return replay;
        };
        let frame = w.pending_frame();
        let margins = w.frame_margins();
        let offset = pos - frame.pos();
        let in_titlebar = offset.y < margins.top
            && offset.x >= margins.left
            && offset.x < frame.width - margins.right;
        let pointer = if in_titlebar {
            Position::Center
        } else {
            Position::from_offset(offset, frame.size())
        };
        let allowed = if pointer == Position::Center {
            w.is_movable()
        } else {
            w.is_resizable() && !w.is_shaded()
        };
        if !allowed || self.move_resize_window.is_some() {
            return replay;
        }

        let Some(control) = self.control_mut(id) else {
            return replay;
        };
        let op = &mut control.move_resize;
        op.pointer = pointer;
        op.button_down = true;
        op.offset = offset;
        op.inverted_offset = Point::new(frame.width - 1, frame.height - 1) - offset;
        op.unrestricted = false;
        let delay = Duration::from_millis(self.config.move_resize.start_drag_time_ms);
        let now = self.now;
        self.timers.start(id, TimerKind::DelayedMoveResize, now, delay);
        self.update_cursor(id);
        replay
    }

    /// The press was held long enough to become a drag
    pub(crate) fn delayed_move_resize_elapsed(&mut self, id: WindowId) {
        let Some(control) = self.control(id) else {
            return;
        };
        let op = &control.move_resize;
        if !op.button_down || op.enabled {
            return;
        }
        if !self.start_move_resize(id)
            && let Some(control) = self.control_mut(id)
        {
            control.move_resize.button_down = false;
        }
        self.update_cursor(id);
    }

    /// Enter the active state. Fails while another window is being moved,
    /// for fullscreen windows outside a single-screen move, and when the
    /// backend cannot grab input.
    pub fn start_move_resize(&mut self, id: WindowId) -> bool {
        if self.move_resize_window.is_some() {
            return false;
        }
        let Some(w) = self.windows.get(&id) else {
            return false;
        };
        let Some(control) = &w.control else {
            return false;
        };
        let is_move = control.move_resize.pointer == Position::Center;
        if w.is_fullscreen() && (self.screens.count() > 1 || !is_move) {
            return false;
        }
        if !self.backend.start_move_resize(w) {
            debug!("Backend refused move/resize of {}", id);
            return false;
        }
        let tiled = !control.quicktiling.is_none();
        let maximized = !w.max_mode().is_restore();
        let frame = w.pending_frame();
        let screen = w.screen;
        let unrestricted = self.config.move_resize.unrestricted_move_resize;

        self.move_resize_window = Some(id);
        if let Some(control) = self.control_mut(id) {
            let op = &mut control.move_resize;
            op.enabled = true;
            op.unrestricted |= unrestricted;
            op.initial_geometry = frame;
            op.geometry = frame;
            op.start_screen = screen;
        }
        if !is_move && (tiled || maximized) {
            self.leave_maximize_for_resize(id, frame);
        }
        debug!("Window {} starts {}", id, if is_move { "move" } else { "resize" });
        self.emit(WindowEvent::MoveResizeStarted { id });
        true
    }

    /// Resizing a tiled or maximized window keeps its geometry but drops
    /// the state
    fn leave_maximize_for_resize(&mut self, id: WindowId, frame: Geometry) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let old_mode = w.max_mode();
        w.geometry_update.max_mode = MaximizeMode::RESTORE;
        w.restore_geometries.maximize = frame;
        let old_tile = self.quick_tile_mode(id);
        if let Some(control) = self.control_mut(id) {
            control.quicktiling = QuickTiles::NONE;
        }
        self.set_net_state(id, NetState::MAX, false);
        if !old_mode.is_restore() {
            self.emit(WindowEvent::MaximizeModeChanged {
                id,
                mode: MaximizeMode::RESTORE,
            });
        }
        if !old_tile.is_none() {
            self.emit(WindowEvent::QuickTileModeChanged {
                id,
                mode: QuickTiles::NONE,
            });
        }
    }

    /// Pointer moved to `pos` in global coordinates
    pub fn pointer_motion(&mut self, pos: Point) {
        self.cursor.update_position(pos);
        if let Some(id) = self.move_resize_window.or_else(|| self.pressed_window()) {
            self.handle_move_resize(id, pos);
        }
    }

    /// Button released: finish the drag or drop a pending press
    pub fn pointer_release(&mut self) {
        if let Some(id) = self.move_resize_window {
            self.finish_move_resize(id, false);
            return;
        }
        let Some(id) = self.pressed_window() else {
            return;
        };
        self.timers.cancel(id, TimerKind::DelayedMoveResize);
        if let Some(control) = self.control_mut(id) {
            control.move_resize.button_down = false;
        }
        self.update_cursor(id);
    }

    fn pressed_window(&self) -> Option<WindowId> {
        self.windows
            .values()
            .find(|w| w.control.as_ref().is_some_and(|c| c.move_resize.button_down))
            .map(|w| w.id)
    }

    fn handle_move_resize(&mut self, id: WindowId, pos: Point) {
        let Some(control) = self.control(id) else {
            return;
        };
        let op = control.move_resize.clone();
        if !op.enabled {
            if !op.button_down || !self.timers.is_active(id, TimerKind::DelayedMoveResize) {
                return;
            }
            let press = self.pending_frame_of(id).pos() + op.offset;
            let travel = (pos.x - press.x).abs() + (pos.y - press.y).abs();
            if travel < START_DRAG_DISTANCE {
                return;
            }
            self.timers.cancel(id, TimerKind::DelayedMoveResize);
            let started = self.start_move_resize(id);
            if !started && let Some(control) = self.control_mut(id) {
                control.move_resize.button_down = false;
            }
            self.update_cursor(id);
            if !started {
                return;
            }
        }

        let Some(mut op) = self.control(id).map(|c| c.move_resize.clone()) else {
            return;
        };
        let old = op.geometry;
        if op.is_move() {
            if pos - op.offset != op.geometry.pos() {
                self.leave_maximize_for_move(id, &mut op);
            }
            let mut geometry = op.geometry.moved_to(pos - op.offset);
            geometry = geometry.moved_to(self.snap_position(id, geometry));
            if !op.unrestricted {
                geometry = self.restrict_move(id, geometry);
            }
            op.geometry = geometry;
        } else {
            op.geometry = self.resize_step(id, &op, pos);
        }
        let geometry = op.geometry;
        let is_move = op.is_move();
        if let Some(control) = self.control_mut(id) {
            control.move_resize = op;
        }
        self.set_frame_geometry(id, geometry, false);
        if is_move {
            self.check_quick_tiling_maximization_zones(id, pos);
        }
        if geometry != old {
            trace!("Window {} move/resize step {:?}", id, geometry);
            self.emit(WindowEvent::MoveResizeStepped { id, geometry });
        }
    }

    /// Dragging a maximized or tiled window out restores it. The pointer
    /// keeps its relative place on the restored frame.
    fn leave_maximize_for_move(&mut self, id: WindowId, op: &mut MoveResizeOp) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let maximized = !w.max_mode().is_restore();
        let tiled = !self.quick_tile_mode(id).is_none();
        if !maximized && !tiled {
            return;
        }
        let old = op.geometry;
        if maximized {
            self.maximize(id, MaximizeMode::RESTORE);
        } else {
            self.set_quick_tile_mode(id, QuickTiles::NONE, false);
        }
        let restored = self.pending_frame_of(id);
        if restored.size() == old.size() || old.width <= 0 || old.height <= 0 {
            op.geometry = restored;
            return;
        }
        let offset = Point::new(
            (op.offset.x as f64 / old.width as f64 * restored.width as f64) as i32,
            (op.offset.y as f64 / old.height as f64 * restored.height as f64) as i32,
        );
        op.offset = offset;
        op.inverted_offset = Point::new(restored.width - 1, restored.height - 1) - offset;
        op.geometry = restored;
    }

    /// Snap a moved frame to screen borders, other windows and the screen
    /// center within the configured zones
    fn snap_position(&self, id: WindowId, geometry: Geometry) -> Point {
        let zones = &self.config.move_resize;
        let Some(w) = self.windows.get(&id) else {
            return geometry.pos();
        };
        let desktop = if w.on_all_desktops() {
            self.desktops.current()
        } else {
            w.desktop()
        };
        let screen = self.screens.nearest(geometry.center());
        let area = self.client_area(ClientAreaOption::Maximize, screen, desktop);
        let mut snap_x = Snap::default();
        let mut snap_y = Snap::default();

        if zones.border_snap_zone > 0 {
            let zone = zones.border_snap_zone;
            snap_x.offer(geometry.x, area.x, zone);
            snap_x.offer(geometry.right(), area.right(), zone);
            snap_y.offer(geometry.y, area.y, zone);
            snap_y.offer(geometry.bottom(), area.bottom(), zone);
        }

        if zones.window_snap_zone > 0 {
            let zone = zones.window_snap_zone;
            for other in self.stacking.order() {
                if *other == id || !self.is_shown(*other) {
                    continue;
                }
                let Some(o) = self.windows.get(other) else {
                    continue;
                };
                if !o.on_desktop(desktop) || o.is_desktop() || o.is_splash() {
                    continue;
                }
                let g = o.frame_geometry;
                if geometry.y < g.bottom() && g.y < geometry.bottom() {
                    snap_x.offer(geometry.x, g.right(), zone);
                    snap_x.offer(geometry.right(), g.x, zone);
                }
                if geometry.x < g.right() && g.x < geometry.right() {
                    snap_y.offer(geometry.y, g.bottom(), zone);
                    snap_y.offer(geometry.bottom(), g.y, zone);
                }
            }
        }

        if zones.center_snap_zone > 0 {
            let zone = zones.center_snap_zone;
            let center = geometry.center();
            snap_x.offer(center.x, area.center().x, zone);
            snap_y.offer(center.y, area.center().y, zone);
        }

        Point::new(snap_x.apply(geometry.x), snap_y.apply(geometry.y))
    }

    /// Keep the titlebar reachable inside the movement area
    fn restrict_move(&self, id: WindowId, geometry: Geometry) -> Geometry {
        let Some(w) = self.windows.get(&id) else {
            return geometry;
        };
        let area = self.client_area(ClientAreaOption::Full, 0, self.desktops.current());
        let titlebar = w.frame_margins().top.max(1);
        let visible = VISIBLE_TITLEBAR.min(geometry.width);
        let x = geometry
            .x
            .max(area.x - geometry.width + visible)
            .min(area.right() - visible);
        let y = geometry.y.max(area.y).min(area.bottom() - titlebar);
        geometry.moved_to(Point::new(x, y))
    }

    /// Candidate frame for a resize step: the grabbed edges follow the
    /// pointer, the size goes through the hints, the opposite edges stay
    fn resize_step(&self, id: WindowId, op: &MoveResizeOp, pos: Point) -> Geometry {
        let current = op.geometry;
        let top_left = pos - op.offset;
        let bottom_right = pos + op.inverted_offset;
        let mut left = current.x;
        let mut top = current.y;
        let mut right = current.right();
        let mut bottom = current.bottom();
        if op.pointer.touches_left() {
            left = top_left.x;
        }
        if op.pointer.touches_right() {
            right = bottom_right.x + 1;
        }
        if op.pointer.touches_top() {
            top = top_left.y;
        }
        if op.pointer.touches_bottom() {
            bottom = bottom_right.y + 1;
        }

        let zone = self.config.move_resize.border_snap_zone;
        if zone > 0 {
            let screen = self.screens.nearest(pos);
            let desktop = self
                .windows
                .get(&id)
                .map(|w| w.desktop())
                .filter(|d| *d != 0)
                .unwrap_or(self.desktops.current());
            let area = self.client_area(ClientAreaOption::Maximize, screen, desktop);
            let snap = |value: i32, target: i32| {
                if (target - value).abs() < zone { target } else { value }
            };
            if op.pointer.touches_left() {
                left = snap(left, area.x);
            }
            if op.pointer.touches_right() {
                right = snap(right, area.right());
            }
            if op.pointer.touches_top() {
                top = snap(top, area.y);
            }
            if op.pointer.touches_bottom() {
                bottom = snap(bottom, area.bottom());
            }
        }

        if !op.unrestricted && op.pointer.touches_top() {
            let area = self.client_area(ClientAreaOption::Full, 0, self.desktops.current());
            top = top.max(area.y);
        }

        let requested = Size::new(right - left, bottom - top);
        let size = self.adjusted_frame_size(id, requested, op.pointer.size_mode());
        let x = if op.pointer.touches_left() {
            right - size.width
        } else {
            left
        };
        let y = if op.pointer.touches_top() {
            bottom - size.height
        } else {
            top
        };
        Geometry::from_parts(Point::new(x, y), size)
    }

    /// Leave the active state. A cancelled operation returns to where it
    /// started; otherwise a pending electric border preview is committed.
    pub fn finish_move_resize(&mut self, id: WindowId, cancel: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let op = control.move_resize.clone();
        let electric = control.electric;
        let electric_maximizing = control.electric_maximizing;
        self.timers.cancel(id, TimerKind::DelayedMoveResize);
        self.timers.cancel(id, TimerKind::ElectricMaximizing);
        if let Some(control) = self.control_mut(id) {
            control.move_resize.enabled = false;
            control.move_resize.button_down = false;
        }
        if !op.enabled {
            self.update_cursor(id);
            return;
        }
        debug!("Window {} move/resize finished, cancelled: {}", id, cancel);
        if self.move_resize_window == Some(id) {
            self.move_resize_window = None;
        }
        if let Some(w) = self.windows.get(&id) {
            self.backend.leave_move_resize(w);
        }

        if cancel {
            self.set_frame_geometry(id, op.initial_geometry, false);
        } else if electric_maximizing {
            self.set_quick_tile_mode(id, electric, false);
        } else {
            self.remember_moved_axes(id);
        }
        if electric_maximizing {
            self.set_electric_border_maximizing(id, false);
        }
        self.set_electric_border_mode(id, QuickTiles::NONE);
        self.update_cursor(id);
        self.emit(WindowEvent::MoveResizeFinished {
            id,
            cancelled: cancel,
        });
    }

    /// The restore geometry follows the frame on axes that are not maximized
    fn remember_moved_axes(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let mode = w.max_mode();
        let frame = w.pending_frame();
        let mut restore = w.restore_geometries.maximize;
        if !mode.contains(MaximizeMode::HORIZONTAL) {
            restore.x = frame.x;
            restore.width = frame.width;
        }
        if !mode.contains(MaximizeMode::VERTICAL) {
            restore.y = frame.y;
            restore.height = frame.height;
        }
        self.set_restore_geometry(id, restore);
    }

    /// Keyboard steering of the running operation. Returns whether the key
    /// was consumed.
    pub fn key_press_event(&mut self, press: KeyPress) -> bool {
        let Some(id) = self.move_resize_window else {
            return false;
        };
        let step = press.step();
        let mut pos = self.cursor.pos;
        match press.key {
            Key::Left => pos.x -= step,
            Key::Right => pos.x += step,
            Key::Up => pos.y -= step,
            Key::Down => pos.y += step,
            Key::Space | Key::Return | Key::Enter => {
                self.finish_move_resize(id, false);
                return true;
            }
            Key::Escape => {
                self.finish_move_resize(id, true);
                return true;
            }
            Key::Other => return false,
        }
        self.pointer_motion(pos);
        true
    }

    /// Cursor shape for the window's operation state
    pub(crate) fn update_cursor(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let op = &control.move_resize;
        let mut pointer = op.pointer;
        if !w.is_resizable() || w.is_shaded() {
            pointer = Position::Center;
        }
        let shape = match pointer {
            Position::Center if op.enabled => CursorShape::SizeAll,
            Position::Center => CursorShape::Arrow,
            _ if op.enabled || op.button_down => pointer.cursor_shape(),
            _ => CursorShape::Arrow,
        };
        self.cursor.shape = shape;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::wm::client_flags::WindowType;
    use crate::wm::hints::SizeHints;
    use crate::wm::manage::ManageRequest;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frame(comp: &Compositor, id: WindowId) -> Geometry {
        comp.window(id).unwrap().frame_geometry
    }

    fn record(comp: &mut Compositor) -> Rc<RefCell<Vec<WindowEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        comp.connect(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn grabbed_edge_follows_offset_thirds() {
        let size = Size::new(300, 300);
        assert_eq!(Position::from_offset(Point::new(10, 10), size), Position::TopLeft);
        assert_eq!(Position::from_offset(Point::new(150, 10), size), Position::Top);
        assert_eq!(Position::from_offset(Point::new(290, 10), size), Position::TopRight);
        assert_eq!(Position::from_offset(Point::new(10, 150), size), Position::Left);
        assert_eq!(Position::from_offset(Point::new(200, 150), size), Position::Right);
        assert_eq!(Position::from_offset(Point::new(150, 290), size), Position::Bottom);
        assert_eq!(Position::from_offset(Point::new(290, 290), size), Position::BottomRight);
    }

    mod moving {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn frame_follows_the_pointer() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            let events = record(&mut comp);

            let replay = comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            assert!(!replay);
            assert_eq!(comp.move_resize_window, Some(id));
            assert_eq!(comp.cursor_shape(), CursorShape::SizeAll);

            comp.pointer_motion(Point::new(450, 420));
            assert_eq!(frame(&comp, id), Geometry::new(400, 400, 300, 200));

            comp.pointer_release();
            assert_eq!(comp.move_resize_window, None);
            assert_eq!(frame(&comp, id), Geometry::new(400, 400, 300, 200));
            assert_eq!(comp.cursor_shape(), CursorShape::Arrow);

            let events = events.borrow();
            assert!(events.contains(&WindowEvent::MoveResizeStarted { id }));
            assert!(events.contains(&WindowEvent::MoveResizeStepped {
                id,
                geometry: Geometry::new(400, 400, 300, 200)
            }));
            assert!(events.contains(&WindowEvent::MoveResizeFinished {
                id,
                cancelled: false
            }));
        }

        #[test]
        fn escape_reverts_to_the_initial_frame() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(650, 520));
            assert_eq!(frame(&comp, id).pos(), Point::new(600, 500));

            assert!(comp.key_press_event(KeyPress::new(Key::Escape)));
            assert_eq!(frame(&comp, id), Geometry::new(100, 100, 300, 200));
            assert!(!comp.is_move_resize(id));
            assert_eq!(comp.cursor_shape(), CursorShape::Arrow);
        }

        #[test]
        fn arrow_keys_step_the_pointer() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.pointer_motion(Point::new(150, 120));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));

            comp.key_press_event(KeyPress {
                key: Key::Right,
                ctrl: false,
                alt: true,
            });
            assert_eq!(frame(&comp, id).pos(), Point::new(132, 100));
            comp.key_press_event(KeyPress {
                key: Key::Down,
                ctrl: true,
                alt: false,
            });
            assert_eq!(frame(&comp, id).pos(), Point::new(132, 101));
            comp.key_press_event(KeyPress::new(Key::Left));
            assert_eq!(frame(&comp, id).pos(), Point::new(124, 101));

            assert!(comp.key_press_event(KeyPress::new(Key::Return)));
            assert!(!comp.is_move_resize(id));
            assert_eq!(frame(&comp, id).pos(), Point::new(124, 101));
            assert!(!comp.key_press_event(KeyPress::new(Key::Left)));
        }

        #[test]
        fn snaps_to_screen_border() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(56, 120));
            assert_eq!(frame(&comp, id).pos(), Point::new(0, 100));
        }

        #[test]
        fn snaps_to_neighbouring_window() {
            let mut comp = compositor();
            manage_at(&mut comp, Geometry::new(500, 100, 200, 200));
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(245, 150));
            assert_eq!(frame(&comp, id).pos(), Point::new(200, 130));
        }

        #[test]
        fn restricted_move_keeps_titlebar_reachable() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(2500, -300));
            assert_eq!(frame(&comp, id).pos(), Point::new(1820, 0));
        }

        #[test]
        fn unrestricted_move_goes_anywhere() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::UnrestrictedMove, Point::new(150, 120));
            comp.pointer_motion(Point::new(2500, -300));
            assert_eq!(frame(&comp, id).pos(), Point::new(2450, -320));
        }

        #[test]
        fn dragging_a_maximized_window_restores_it_under_the_pointer() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
            comp.maximize(id, MaximizeMode::FULL);
            assert_eq!(frame(&comp, id), Geometry::new(0, 0, 1920, 1080));

            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(960, 10));
            comp.pointer_motion(Point::new(1000, 300));
            let w = comp.window(id).unwrap();
            assert_eq!(w.max_mode(), MaximizeMode::RESTORE);
            assert_eq!(w.frame_geometry, Geometry::new(800, 298, 400, 300));

            comp.pointer_release();
            assert_eq!(comp.restore_geometry(id), Geometry::new(800, 298, 400, 300));
        }

        #[test]
        fn drop_on_top_edge_maximizes() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(960, 0));
            let control = comp.control(id).unwrap();
            assert_eq!(control.electric, QuickTiles::MAXIMIZE);
            assert!(control.electric_maximizing);

            comp.pointer_release();
            let w = comp.window(id).unwrap();
            assert_eq!(w.max_mode(), MaximizeMode::FULL);
            assert_eq!(w.frame_geometry, Geometry::new(0, 0, 1920, 1080));
            let control = comp.control(id).unwrap();
            assert!(!control.electric_maximizing);
            assert_eq!(control.electric, QuickTiles::NONE);
        }

        fn two_outputs(comp: &mut Compositor) {
            comp.set_outputs(vec![
                ("left".into(), Geometry::new(0, 0, 1920, 1080)),
                ("right".into(), Geometry::new(1920, 0, 1920, 1080)),
            ]);
        }

        #[test]
        fn side_zones_tile_left_and_right() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));

            comp.pointer_motion(Point::new(5, 540));
            let control = comp.control(id).unwrap();
            assert_eq!(control.electric, QuickTiles::LEFT);
            assert!(control.electric_maximizing);

            comp.pointer_motion(Point::new(1915, 540));
            assert_eq!(comp.control(id).unwrap().electric, QuickTiles::RIGHT);

            comp.pointer_release();
            assert_eq!(comp.quick_tile_mode(id), QuickTiles::RIGHT);
            assert_eq!(frame(&comp, id), Geometry::new(960, 0, 960, 1080));
        }

        #[test]
        fn corner_ratio_picks_top_and_bottom_quarters() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));

            comp.pointer_motion(Point::new(5, 10));
            assert_eq!(comp.control(id).unwrap().electric, QuickTiles::LEFT | QuickTiles::TOP);
            comp.pointer_motion(Point::new(5, 1070));
            assert_eq!(
                comp.control(id).unwrap().electric,
                QuickTiles::LEFT | QuickTiles::BOTTOM
            );
            comp.pointer_motion(Point::new(1915, 1070));
            assert_eq!(
                comp.control(id).unwrap().electric,
                QuickTiles::RIGHT | QuickTiles::BOTTOM
            );

            comp.pointer_release();
            assert_eq!(frame(&comp, id), Geometry::new(960, 540, 960, 540));
        }

        #[test]
        fn inner_screen_edge_waits_before_previewing() {
            let mut comp = compositor();
            two_outputs(&mut comp);
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));

            comp.pointer_motion(Point::new(1915, 540));
            let control = comp.control(id).unwrap();
            assert_eq!(control.electric, QuickTiles::RIGHT);
            assert!(!control.electric_maximizing);
            assert!(comp.timers.is_active(id, TimerKind::ElectricMaximizing));

            comp.advance(Duration::from_millis(260));
            assert!(comp.control(id).unwrap().electric_maximizing);

            comp.pointer_motion(Point::new(5, 10));
            let control = comp.control(id).unwrap();
            assert_eq!(control.electric, QuickTiles::LEFT | QuickTiles::TOP);
            assert!(control.electric_maximizing);

            comp.pointer_release();
            assert_eq!(frame(&comp, id), Geometry::new(0, 0, 960, 540));
        }

        #[test]
        fn release_before_the_inner_edge_delay_does_not_tile() {
            let mut comp = compositor();
            two_outputs(&mut comp);
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            comp.pointer_motion(Point::new(1915, 540));
            comp.pointer_release();

            assert!(!comp.timers.is_active(id, TimerKind::ElectricMaximizing));
            assert_eq!(comp.quick_tile_mode(id), QuickTiles::NONE);
            assert_eq!(comp.window(id).unwrap().max_mode(), MaximizeMode::RESTORE);
            comp.advance(Duration::from_millis(260));
            assert!(!comp.control(id).unwrap().electric_maximizing);
        }

        #[test]
        fn immovable_window_ignores_move() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            let w = comp.windows.get_mut(&id).unwrap();
            w.actions.remove(crate::wm::client_flags::Actions::MOVE);
            comp.perform_mouse_command(id, MouseCommand::Move, Point::new(150, 120));
            assert_eq!(comp.move_resize_window, None);
            assert!(!comp.control(id).unwrap().move_resize.button_down);
        }
    }

    mod resizing {
        use super::*;
        use pretty_assertions::assert_eq;

        fn manage_with_min(comp: &mut Compositor, geometry: Geometry, min: Size) -> WindowId {
            let mut request = ManageRequest::new(WindowType::Normal, geometry);
            request.no_border = true;
            request.size_hints = SizeHints {
                min_size: Some(min),
                user_position: true,
                ..Default::default()
            };
            comp.take_control(request)
        }

        #[test]
        fn corner_drag_honors_min_size() {
            let mut comp = compositor();
            let start = Geometry::new(100, 100, 300, 200);
            let id = manage_with_min(&mut comp, start, Size::new(200, 150));
            comp.perform_mouse_command(id, MouseCommand::Resize, Point::new(395, 295));
            assert_eq!(comp.control(id).unwrap().move_resize.pointer, Position::BottomRight);
            assert_eq!(comp.cursor_shape(), CursorShape::SizeSouthEast);

            comp.pointer_motion(Point::new(495, 345));
            assert_eq!(frame(&comp, id), Geometry::new(100, 100, 400, 250));

            comp.pointer_motion(Point::new(150, 150));
            assert_eq!(frame(&comp, id), Geometry::new(100, 100, 200, 150));
        }

        #[test]
        fn left_edge_keeps_right_edge_fixed() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Resize, Point::new(105, 200));
            assert_eq!(comp.control(id).unwrap().move_resize.pointer, Position::Left);
            assert_eq!(comp.cursor_shape(), CursorShape::SizeWest);

            comp.pointer_motion(Point::new(55, 200));
            assert_eq!(frame(&comp, id), Geometry::new(50, 100, 350, 200));
        }

        #[test]
        fn edge_snaps_to_screen_border() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 300, 200));
            comp.perform_mouse_command(id, MouseCommand::Resize, Point::new(395, 200));
            comp.pointer_motion(Point::new(1910, 200));
            assert_eq!(frame(&comp, id), Geometry::new(100, 100, 1820, 200));
        }

        #[test]
        fn resizing_a_maximized_window_drops_the_state() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
            comp.maximize(id, MaximizeMode::FULL);
            comp.perform_mouse_command(id, MouseCommand::Resize, Point::new(1910, 540));
            assert_eq!(comp.window(id).unwrap().max_mode(), MaximizeMode::RESTORE);

            comp.pointer_motion(Point::new(1500, 540));
            assert_eq!(frame(&comp, id), Geometry::new(0, 0, 1510, 1080));
        }
    }

    mod delayed {
        use super::*;
        use pretty_assertions::assert_eq;

        fn decorated(comp: &mut Compositor) -> WindowId {
            let mut request =
                ManageRequest::new(WindowType::Normal, Geometry::new(100, 100, 300, 200));
            request.size_hints.user_position = true;
            comp.take_control(request)
        }

        #[test]
        fn held_titlebar_press_starts_a_move() {
            let mut comp = compositor();
            let id = decorated(&mut comp);
            let pos = frame(&comp, id).pos() + Point::new(50, 10);
            comp.pointer_motion(pos);
            comp.decoration_press(id, pos);
            assert!(comp.control(id).unwrap().active);
            assert!(!comp.is_move_resize(id));

            comp.advance(Duration::from_millis(200));
            assert!(!comp.is_move_resize(id));
            comp.advance(Duration::from_millis(400));
            assert!(comp.is_move_resize(id));
            assert_eq!(comp.cursor_shape(), CursorShape::SizeAll);

            let before = frame(&comp, id);
            comp.pointer_motion(pos + Point::new(100, 50));
            assert_eq!(frame(&comp, id).pos(), before.pos() + Point::new(100, 50));
        }

        #[test]
        fn pointer_travel_starts_the_drag_early() {
            let mut comp = compositor();
            let id = decorated(&mut comp);
            let pos = frame(&comp, id).pos() + Point::new(50, 10);
            comp.decoration_press(id, pos);
            comp.pointer_motion(pos + Point::new(3, 0));
            assert!(!comp.is_move_resize(id));
            comp.pointer_motion(pos + Point::new(30, 0));
            assert!(comp.is_move_resize(id));
            assert!(!comp.timers.is_active(id, TimerKind::DelayedMoveResize));
        }

        #[test]
        fn click_without_drag_does_nothing() {
            let mut comp = compositor();
            let id = decorated(&mut comp);
            let before = frame(&comp, id);
            let pos = before.pos() + Point::new(50, 10);
            comp.decoration_press(id, pos);
            comp.pointer_release();
            comp.advance(Duration::from_secs(1));
            assert!(!comp.is_move_resize(id));
            assert!(!comp.control(id).unwrap().move_resize.button_down);
            assert_eq!(frame(&comp, id), before);
        }
    }

    mod commands {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn above_and_below_undo_each_other_first() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.set_keep_below(id, true);
            comp.perform_mouse_command(id, MouseCommand::Above, Point::default());
            let control = comp.control(id).unwrap();
            assert!(!control.keep_below);
            assert!(!control.keep_above);
            comp.perform_mouse_command(id, MouseCommand::Above, Point::default());
            assert!(comp.control(id).unwrap().keep_above);
            comp.perform_mouse_command(id, MouseCommand::Below, Point::default());
            assert!(!comp.control(id).unwrap().keep_above);
        }

        #[test]
        fn opacity_steps_are_bounded() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.perform_mouse_command(id, MouseCommand::OpacityMore, Point::default());
            assert_eq!(comp.window(id).unwrap().opacity, 1.0);
            comp.set_opacity(id, 0.15);
            comp.perform_mouse_command(id, MouseCommand::OpacityLess, Point::default());
            assert!((comp.window(id).unwrap().opacity - MIN_OPACITY).abs() < 1e-9);
        }

        #[test]
        fn activation_commands_report_replay() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            let other = manage_at(&mut comp, Geometry::new(200, 0, 100, 100));
            comp.activate_window(other, true);

            assert!(!comp.perform_mouse_command(id, MouseCommand::Activate, Point::new(10, 10)));
            assert!(comp.control(id).unwrap().active);
            assert!(comp.perform_mouse_command(id, MouseCommand::Activate, Point::new(10, 10)));
            let pos = Point::new(210, 10);
            assert!(comp.perform_mouse_command(other, MouseCommand::ActivateAndPassClick, pos));
            assert!(comp.control(other).unwrap().active);
            assert!(comp.perform_mouse_command(id, MouseCommand::Nothing, Point::default()));
        }

        #[test]
        fn next_desktop_carries_the_window() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.perform_mouse_command(id, MouseCommand::NextDesktop, Point::default());
            assert_eq!(comp.current_desktop(), 2);
            assert_eq!(comp.window(id).unwrap().desktops, vec![2]);
        }
    }
}

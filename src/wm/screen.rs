//! Screen Module
//!
//! Outputs, the areas windows may occupy on them and moving windows between
//! them. Dock struts are subtracted from an output to get its placement and
//! maximize area.

use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::shared::{Geometry, Point};
use crate::wm::client_flags::{MaximizeMode, QuickTiles};
use crate::wm::geometry::GeometryUpdatesBlocker;
use crate::wm::window::WindowId;

/// Monitor/output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub geometry: Geometry,
}

/// Which area of a screen a caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAreaOption {
    /// Where new windows are placed: output minus struts
    Placement,
    /// Where windows maximize: output minus struts
    Maximize,
    /// Maximize ignoring struts
    MaximizeFull,
    /// Fullscreen: the whole output
    FullScreen,
    /// Where windows may be moved: the whole output
    Movement,
    /// The whole output
    Screen,
    /// All outputs minus struts, as one rectangle
    Work,
    /// Bounding rectangle of all outputs
    Full,
}

/// Output layout
#[derive(Debug, Clone, Default)]
pub struct Screens {
    outputs: Vec<Output>,
    current: usize,
}

impl Screens {
    pub fn new(outputs: Vec<(String, Geometry)>) -> Self {
        Self {
            outputs: outputs
                .into_iter()
                .map(|(name, geometry)| Output { name, geometry })
                .collect(),
            current: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.outputs.len()
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn geometry(&self, screen: usize) -> Geometry {
        self.outputs
            .get(screen)
            .map(|o| o.geometry)
            .unwrap_or_else(|| self.bounding())
    }

    pub fn name(&self, screen: usize) -> Option<&str> {
        self.outputs.get(screen).map(|o| o.name.as_str())
    }

    /// Bounding rectangle of all outputs
    pub fn bounding(&self) -> Geometry {
        self.outputs
            .iter()
            .map(|o| o.geometry)
            .reduce(|a, b| a.united(&b))
            .unwrap_or_default()
    }

    /// Output containing a point
    pub fn screen_at(&self, pos: Point) -> Option<usize> {
        self.outputs.iter().position(|o| o.geometry.contains_point(pos))
    }

    /// Output containing a point, else the nearest one
    pub fn nearest(&self, pos: Point) -> usize {
        if let Some(s) = self.screen_at(pos) {
            return s;
        }
        self.outputs
            .iter()
            .enumerate()
            .min_by_key(|(_, o)| {
                let g = o.geometry;
                let dx = (g.x - pos.x).max(0).max(pos.x - (g.right() - 1));
                let dy = (g.y - pos.y).max(0).max(pos.y - (g.bottom() - 1));
                dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, screen: usize) {
        if screen < self.outputs.len() {
            self.current = screen;
        }
    }
}

impl Compositor {
    /// Area of a screen on a desktop, struts subtracted where the option asks
    pub fn client_area(&self, option: ClientAreaOption, screen: usize, desktop: u32) -> Geometry {
        let output = self.screens.geometry(screen);
        match option {
            ClientAreaOption::Placement | ClientAreaOption::Maximize => {
                self.strut_area(screen, desktop)
            }
            ClientAreaOption::MaximizeFull
            | ClientAreaOption::FullScreen
            | ClientAreaOption::Movement
            | ClientAreaOption::Screen => output,
            ClientAreaOption::Work => (0..self.screens.count())
                .map(|s| self.strut_area(s, desktop))
                .reduce(|a, b| a.united(&b))
                .unwrap_or(output),
            ClientAreaOption::Full => self.screens.bounding(),
        }
    }

    /// Area for a window: its screen (from its pending geometry) and desktop
    pub fn client_area_for(&self, option: ClientAreaOption, id: WindowId) -> Geometry {
        let Some(w) = self.windows.get(&id) else {
            return self.screens.bounding();
        };
        let desktop = if w.on_all_desktops() {
            self.desktops.current()
        } else {
            w.desktop()
        };
        self.client_area(option, self.window_screen(id), desktop)
    }

    /// Screen of the window's pending frame center
    pub fn window_screen(&self, id: WindowId) -> usize {
        let Some(w) = self.windows.get(&id) else {
            return 0;
        };
        self.screens
            .screen_at(w.pending_frame().center())
            .unwrap_or(w.screen)
    }

    fn strut_area(&self, screen: usize, desktop: u32) -> Geometry {
        let mut area = self.screens.geometry(screen);
        for w in self.windows.values() {
            let Some(strut) = w.strut else {
                continue;
            };
            if w.control.is_none() || !w.on_desktop(desktop) || w.is_minimized() {
                continue;
            }
            if self.screens.screen_at(w.frame_geometry.center()) != Some(screen) {
                continue;
            }
            area = area.shrunk_by(strut);
        }
        area
    }

    /// Replace the output layout and re-fit every window
    pub fn set_outputs(&mut self, outputs: Vec<(String, Geometry)>) {
        info!("Output layout changed: {} outputs", outputs.len());
        self.screens = Screens::new(outputs);
        for id in self.managed_windows() {
            let Some(w) = self.windows.get(&id) else {
                continue;
            };
            let old = w.frame_geometry;
            let screen = self.screens.nearest(old.center());
            if let Some(w) = self.windows.get_mut(&id) {
                w.screen = screen;
            }
            self.check_workspace_position(id, old);
            self.update_layer(id);
        }
    }

    /// Move a window to another output, keeping its position relative to the
    /// output center and re-applying maximize and quick-tile state
    pub fn send_to_screen(&mut self, id: WindowId, screen: usize) {
        let Some(control) = self.control(id) else {
            return;
        };
        let screen = control.rules.check_screen(screen, false);
        if screen >= self.screens.count() {
            return;
        }
        if control.active {
            self.screens.set_current(screen);
            let fullscreens: Vec<_> = self
                .windows
                .values()
                .filter(|w| w.is_fullscreen() && w.screen == screen)
                .map(|w| w.id)
                .collect();
            for fs in fullscreens {
                self.update_layer(fs);
            }
        }
        if self.window_screen(id) == screen {
            return;
        }
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let max_mode = w.max_mode();
        let tile_mode = self.quick_tile_mode(id);
        let desktop = w.desktop();
        debug!("Sending window {} to screen {}", id, screen);

        let mut comp = GeometryUpdatesBlocker::new(self, id);
        if max_mode != MaximizeMode::RESTORE {
            comp.maximize(id, MaximizeMode::RESTORE);
        }
        if tile_mode != QuickTiles::NONE {
            comp.set_quick_tile_mode(id, QuickTiles::NONE, true);
        }
        let old_area = comp.client_area_for(ClientAreaOption::Maximize, id);
        let new_area = comp.client_area(ClientAreaOption::Maximize, screen, desktop);
        if tile_mode != QuickTiles::NONE {
            comp.keep_in_area(id, old_area, false);
        }
        let old = comp.pending_frame_of(id);
        let rel = old.center() - old_area.center();
        let center = Point::new(
            rel.x * new_area.width / old_area.width.max(1),
            rel.y * new_area.height / old_area.height.max(1),
        ) + new_area.center();
        comp.set_frame_geometry(id, old.with_center(center), false);
        if old_area.contains(&old) {
            comp.keep_in_area(id, new_area, false);
        }
        let placed = comp.pending_frame_of(id);
        comp.set_restore_geometry(id, placed);
        comp.check_workspace_position(id, old);
        let fitted = comp.pending_frame_of(id);
        comp.set_restore_geometry(id, fitted);
        if max_mode != MaximizeMode::RESTORE {
            comp.maximize(id, max_mode);
        }
        if tile_mode != QuickTiles::NONE && tile_mode != comp.quick_tile_mode(id) {
            comp.set_quick_tile_mode(id, tile_mode, true);
        }
        let children = comp
            .windows
            .get(&id)
            .map(|w| w.transient.children.clone())
            .unwrap_or_default();
        for child in comp.ensure_stacking_order(&children) {
            comp.send_to_screen(child, screen);
        }
    }

    pub(crate) fn pending_frame_of(&self, id: WindowId) -> Geometry {
        self.windows
            .get(&id)
            .map(|w| w.pending_frame())
            .unwrap_or_default()
    }

    /// Re-fit a window after its area changed (output or strut changes)
    pub fn check_workspace_position(&mut self, id: WindowId, old: Geometry) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.control.is_none() || w.is_dock() || w.is_desktop() {
            return;
        }
        if w.max_mode() != MaximizeMode::RESTORE {
            let mode = w.max_mode();
            self.update_maximized(id, mode, true);
            let screen = self.client_area_for(ClientAreaOption::Screen, id);
            let mut frame = self.pending_frame_of(id);
            check_offscreen_position(&mut frame, screen);
            self.set_frame_geometry(id, frame, false);
            return;
        }
        if self.quick_tile_mode(id) != QuickTiles::NONE {
            let mode = self.quick_tile_mode(id);
            let frame = self.quick_tile_geometry(id, mode, self.pending_frame_of(id).center());
            self.set_frame_geometry(id, frame, false);
            return;
        }
        if w.is_fullscreen() {
            let area = self.client_area_for(ClientAreaOption::FullScreen, id);
            if self.pending_frame_of(id) != area {
                self.set_frame_geometry(id, area, false);
            }
            return;
        }
        let area = self.client_area_for(ClientAreaOption::Placement, id);
        let screen_area = self.client_area_for(ClientAreaOption::Screen, id);
        let frame = self.pending_frame_of(id);
        if !area.contains(&frame) {
            // Fully visible windows stay fully visible; others only partially.
            let partial = !self.screens.bounding().contains(&old);
            self.keep_in_area(id, area, partial);
        }
        let mut frame = self.pending_frame_of(id);
        check_offscreen_position(&mut frame, screen_area);
        self.set_frame_geometry(id, frame, false);
    }
}

/// Pull a rectangle that ended up entirely outside the screen back in
pub fn check_offscreen_position(frame: &mut Geometry, screen: Geometry) {
    if frame.x > screen.right() - 1 {
        frame.x = (screen.right() - screen.width / 4).max(screen.x);
    } else if frame.right() < screen.x {
        frame.x = (screen.x + screen.width / 4 - frame.width).min(screen.x);
    }
    if frame.y > screen.bottom() - 1 {
        frame.y = (screen.bottom() - screen.height / 4).max(screen.y);
    } else if frame.bottom() < screen.y {
        frame.y = (screen.y + screen.height / 4 - frame.height).min(screen.y);
    }
}

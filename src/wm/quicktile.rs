//! Quick-tile Module
//!
//! Tiling a window to half or a quarter of its screen, and the electric
//! borders that offer tiling while a window is dragged against a screen edge.

use std::time::Duration;

use tracing::debug;

use crate::compositor::Compositor;
use crate::shared::{Geometry, Point};
use crate::wm::client_flags::{MaximizeMode, QuickTiles};
use crate::wm::events::WindowEvent;
use crate::wm::geometry::GeometryUpdatesBlocker;
use crate::wm::screen::ClientAreaOption;
use crate::wm::timers::TimerKind;
use crate::wm::window::WindowId;

/// Distance from a screen edge that counts as touching it
const ELECTRIC_SIDE_ZONE: i32 = 20;
/// Distance from the top edge that offers maximizing
const ELECTRIC_TOP_ZONE: i32 = 5;

impl Compositor {
    /// Geometry a tile mode gives on the screen containing `pos`
    pub fn quick_tile_geometry(&self, id: WindowId, mode: QuickTiles, pos: Point) -> Geometry {
        let Some(w) = self.windows.get(&id) else {
            return Geometry::default();
        };
        let desktop = match w.desktop() {
            0 => self.desktops.current(),
            d => d,
        };
        let screen = self.screens.nearest(pos);
        if mode == QuickTiles::MAXIMIZE {
            if w.max_mode().is_full() {
                return w.restore_geometries.maximize;
            }
            return self.client_area(ClientAreaOption::Maximize, screen, desktop);
        }
        let area = self.client_area(ClientAreaOption::Maximize, screen, desktop);
        let mut tile = area;
        if mode.contains(QuickTiles::LEFT) {
            tile.width = area.width / 2;
        } else if mode.contains(QuickTiles::RIGHT) {
            tile.x = area.x + area.width / 2;
            tile.width = area.width - area.width / 2;
        }
        if mode.contains(QuickTiles::TOP) {
            tile.height = area.height / 2;
        } else if mode.contains(QuickTiles::BOTTOM) {
            tile.y = area.y + area.height / 2;
            tile.height = area.height - area.height / 2;
        }
        tile
    }

    /// Tile a window. Tiling again to the same side moves it to the next
    /// screen in that direction, or untiles it when there is none.
    /// `keyboard` tiles on the window's own screen instead of the one under
    /// the pointer.
    pub fn set_quick_tile_mode(&mut self, id: WindowId, mode: QuickTiles, keyboard: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if !w.is_resizable() {
            return;
        }
        if mode == QuickTiles::MAXIMIZE {
            let old_mode = self.quick_tile_mode(id);
            let target = if w.max_mode().is_full() {
                MaximizeMode::RESTORE
            } else {
                MaximizeMode::FULL
            };
            let mut comp = GeometryUpdatesBlocker::new(self, id);
            if !old_mode.is_none() && target.is_full() {
                // Leave the tile first so the restore geometry is the
                // untiled one.
                comp.set_quick_tile_mode(id, QuickTiles::NONE, keyboard);
            }
            comp.maximize(id, target);
            return;
        }

        let mut mode = mode.normalized();
        let old_mode = self.quick_tile_mode(id);
        if mode.is_none() && old_mode.is_none() {
            return;
        }
        debug!("Window {} quick tile {:?} -> {:?}", id, old_mode, mode);
        let mut comp = GeometryUpdatesBlocker::new(self, id);

        let mut which = if keyboard {
            comp.pending_frame_of(id).center()
        } else {
            comp.cursor.pos
        };

        if !mode.is_none() && comp.windows.get(&id).is_some_and(|w| !w.max_mode().is_restore()) {
            // Untile via restore, then tile from the unmaximized geometry.
            let restore = comp.restore_geometry(id);
            comp.maximize(id, MaximizeMode::RESTORE);
            if let Some(control) = comp.control_mut(id) {
                control.quicktiling = QuickTiles::NONE;
            }
            if let Some(w) = comp.windows.get_mut(&id) {
                w.restore_geometries.maximize = restore;
            }
        }

        let current = comp.quick_tile_mode(id);
        if !mode.is_none() && mode == current {
            let from = comp.window_screen(id);
            match comp.next_tile_screen(from, mode) {
                Some(next) => {
                    let offset =
                        comp.screens.geometry(next).pos() - comp.screens.geometry(from).pos();
                    let restore = comp.restore_geometry(id).translated(offset.x, offset.y);
                    comp.set_frame_geometry(id, restore, false);
                    which = comp.screens.geometry(next).center();
                    if mode.intersects(QuickTiles::HORIZONTAL) {
                        mode = (mode & QuickTiles::VERTICAL) | (!mode & QuickTiles::HORIZONTAL);
                    }
                }
                None => mode = QuickTiles::NONE,
            }
        } else if current.is_none() {
            let frame = comp.pending_frame_of(id);
            if let Some(w) = comp.windows.get_mut(&id) {
                w.restore_geometries.maximize = frame;
            }
        }

        if let Some(control) = comp.control_mut(id) {
            control.quicktiling = mode;
        }
        if mode.is_none() {
            let restore = comp.restore_geometry(id);
            if restore.is_valid() {
                comp.set_frame_geometry(id, restore, false);
            }
        } else {
            let tile = comp.quick_tile_geometry(id, mode, which);
            comp.set_frame_geometry(id, tile, false);
        }
        drop(comp);

        if mode != old_mode {
            self.emit(WindowEvent::QuickTileModeChanged { id, mode });
        }
    }

    /// Screen in the tile direction on the same horizontal line, the
    /// closest one first
    fn next_tile_screen(&self, from: usize, mode: QuickTiles) -> Option<usize> {
        let current = self.screens.geometry(from);
        let mut next: Option<usize> = None;
        for i in 0..self.screens.count() {
            if i == from {
                continue;
            }
            let g = self.screens.geometry(i);
            if g.bottom() <= current.y || g.y >= current.bottom() {
                continue;
            }
            let x = g.center().x;
            let best = next.map(|n| self.screens.geometry(n).center().x);
            let horizontal = mode & QuickTiles::HORIZONTAL;
            if horizontal == QuickTiles::LEFT {
                if x >= current.center().x || best.is_some_and(|b| x <= b) {
                    continue;
                }
            } else if horizontal == QuickTiles::RIGHT
                && (x <= current.center().x || best.is_some_and(|b| x >= b))
            {
                continue;
            }
            next = Some(i);
        }
        next
    }

    /// Candidate tile mode while a move passes over a screen edge
    pub(crate) fn check_quick_tiling_maximization_zones(&mut self, id: WindowId, pos: Point) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let maximizable = w.is_maximizable();
        let desktop = match w.desktop() {
            0 => self.desktops.current(),
            d => d,
        };
        let electric = &self.config.electric_border;
        let mut mode = QuickTiles::NONE;
        let mut inner_border = false;
        for screen in 0..self.screens.count() {
            if !self.screens.geometry(screen).contains_point(pos) {
                continue;
            }
            let area = self.client_area(ClientAreaOption::Maximize, screen, desktop);
            let is_in_screen = |p: Point| {
                (0..self.screens.count())
                    .any(|s| s != screen && self.screens.geometry(s).contains_point(p))
            };
            if electric.tiling {
                if pos.x < area.x + ELECTRIC_SIDE_ZONE {
                    mode |= QuickTiles::LEFT;
                    inner_border = is_in_screen(Point::new(area.x - 1, pos.y));
                } else if pos.x > area.right() - 1 - ELECTRIC_SIDE_ZONE {
                    mode |= QuickTiles::RIGHT;
                    inner_border = is_in_screen(Point::new(area.right(), pos.y));
                }
            }
            if !mode.is_none() {
                let corner = (area.height as f64 * electric.corner_ratio) as i32;
                if pos.y < area.y + corner {
                    mode |= QuickTiles::TOP;
                } else if pos.y > area.bottom() - 1 - corner {
                    mode |= QuickTiles::BOTTOM;
                }
            } else if electric.maximize && pos.y <= area.y + ELECTRIC_TOP_ZONE && maximizable {
                mode = QuickTiles::MAXIMIZE;
                inner_border = is_in_screen(Point::new(pos.x, area.y - 1));
            }
            break;
        }
        let current = self.control(id).map(|c| c.electric).unwrap_or_default();
        if mode == current {
            return;
        }
        self.set_electric_border_mode(id, mode);
        if inner_border {
            let delay = Duration::from_millis(self.config.electric_border.delay_ms);
            let now = self.now;
            self.timers.start(id, TimerKind::ElectricMaximizing, now, delay);
            self.set_electric_border_maximizing(id, false);
        } else {
            self.set_electric_border_maximizing(id, !mode.is_none());
        }
    }

    pub(crate) fn set_electric_border_mode(&mut self, id: WindowId, mode: QuickTiles) {
        let mode = if mode == QuickTiles::MAXIMIZE {
            mode
        } else {
            mode.normalized()
        };
        if let Some(control) = self.control_mut(id) {
            control.electric = mode;
        }
    }

    /// Show or hide the tile preview for the current electric mode
    pub(crate) fn set_electric_border_maximizing(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control_mut(id) else {
            return;
        };
        let changed = control.electric_maximizing != set;
        control.electric_maximizing = set;
        let electric = control.electric;
        if set {
            let outline = self.quick_tile_geometry(id, electric, self.cursor.pos);
            self.renderer.show_outline(outline);
        } else {
            self.renderer.hide_outline();
        }
        if changed {
            self.emit(WindowEvent::ElectricBorderMaximizingChanged { id, set });
        }
    }

    /// Debounce over an inner screen edge ran out: commit the preview if
    /// the window is still being moved
    pub(crate) fn electric_maximizing_delay_elapsed(&mut self, id: WindowId) {
        let Some(control) = self.control(id) else {
            return;
        };
        if !control.move_resize.is_move() {
            return;
        }
        let set = !control.electric.is_none();
        self.set_electric_border_maximizing(id, set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use pretty_assertions::assert_eq;

    fn two_outputs() -> Vec<(String, Geometry)> {
        vec![
            ("left".into(), Geometry::new(0, 0, 1920, 1080)),
            ("right".into(), Geometry::new(1920, 0, 1920, 1080)),
        ]
    }

    #[test]
    fn tile_geometries_split_the_area() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
        let at = Point::new(10, 10);
        assert_eq!(
            comp.quick_tile_geometry(id, QuickTiles::LEFT, at),
            Geometry::new(0, 0, 960, 1080)
        );
        assert_eq!(
            comp.quick_tile_geometry(id, QuickTiles::RIGHT | QuickTiles::BOTTOM, at),
            Geometry::new(960, 540, 960, 540)
        );
        assert_eq!(
            comp.quick_tile_geometry(id, QuickTiles::MAXIMIZE, at),
            Geometry::new(0, 0, 1920, 1080)
        );
    }

    #[test]
    fn tiling_twice_untiles_on_a_single_screen() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.set_quick_tile_mode(id, QuickTiles::LEFT, true);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::LEFT);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(0, 0, 960, 1080));

        comp.set_quick_tile_mode(id, QuickTiles::LEFT, true);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::NONE);
        assert_eq!(comp.window(id).unwrap().frame_geometry, start);
    }

    #[test]
    fn degenerate_request_untiles() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.set_quick_tile_mode(id, QuickTiles::RIGHT, true);
        comp.set_quick_tile_mode(id, QuickTiles::LEFT | QuickTiles::RIGHT, true);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::NONE);
        assert_eq!(comp.window(id).unwrap().frame_geometry, start);
    }

    #[test]
    fn tiling_again_moves_to_the_next_screen() {
        let mut comp = compositor();
        comp.set_outputs(two_outputs());
        let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
        comp.set_quick_tile_mode(id, QuickTiles::RIGHT, true);
        comp.set_quick_tile_mode(id, QuickTiles::RIGHT, true);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::LEFT);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(1920, 0, 960, 1080));
    }

    #[test]
    fn maximize_tile_toggles_full_maximize() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.set_quick_tile_mode(id, QuickTiles::LEFT, true);
        comp.set_quick_tile_mode(id, QuickTiles::MAXIMIZE, true);
        assert_eq!(comp.window(id).unwrap().max_mode(), MaximizeMode::FULL);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::MAXIMIZE);
        comp.set_quick_tile_mode(id, QuickTiles::MAXIMIZE, true);
        assert_eq!(comp.window(id).unwrap().frame_geometry, start);
    }

    #[test]
    fn tiling_a_maximized_window_keeps_the_restore_geometry() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.maximize(id, MaximizeMode::FULL);
        comp.set_quick_tile_mode(id, QuickTiles::LEFT, true);
        assert_eq!(comp.window(id).unwrap().max_mode(), MaximizeMode::RESTORE);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(0, 0, 960, 1080));
        comp.set_quick_tile_mode(id, QuickTiles::NONE, true);
        assert_eq!(comp.window(id).unwrap().frame_geometry, start);
    }
}

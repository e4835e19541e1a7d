//! Placement Module
//!
//! Initial window placement: the policy dispatch by window type, the
//! placement algorithms (smart, cascade, centered, under mouse...), keeping
//! a frame inside an area, and the pseudo-maximize heuristic for windows
//! that open at least as large as their screen.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::Compositor;
use crate::shared::{Geometry, Point, Size};
use crate::wm::client_flags::MaximizeMode;
use crate::wm::hints::SizeMode;
use crate::wm::window::WindowId;

/// Cascade and random placement step in pixels
const PLACEMENT_STEP: i32 = 24;

/// Placement policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Whatever the configuration says
    #[default]
    Default,
    /// Leave the window where it asked to be
    NoPlacement,
    Random,
    /// Minimize overlap with other windows
    Smart,
    /// Diagonal steps per desktop
    Cascade,
    Centered,
    /// Top-left corner of the area
    ZeroCornered,
    /// Centered on the pointer
    UnderMouse,
    /// Centered over the main window
    OnMainWindow,
    /// Maximized when possible
    Maximizing,
}

/// Placement state carried between windows
#[derive(Debug, Default)]
pub struct Placement {
    /// Next cascade position per desktop
    cascade: HashMap<u32, Point>,
    /// Moving origin of random placement
    random: Point,
}

impl Placement {
    pub fn new() -> Self {
        Self {
            cascade: HashMap::new(),
            random: Point::new(PLACEMENT_STEP, 2 * PLACEMENT_STEP),
        }
    }
}

impl Compositor {
    /// Place a new window inside `area`. A placement rule wins; otherwise
    /// the window type picks the algorithm before the configured policy.
    pub fn place(&mut self, id: WindowId, area: Geometry) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let ruled = control.rules.check_placement(PlacementPolicy::Default, false);
        if ruled != PlacementPolicy::Default {
            self.place_with(id, area, ruled, PlacementPolicy::Centered);
            return;
        }
        let configured = self.config.behavior.placement;
        if w.is_dialog() {
            self.place_with(id, area, PlacementPolicy::OnMainWindow, configured);
        } else if w.is_splash() {
            self.place_with(id, area, PlacementPolicy::OnMainWindow, PlacementPolicy::Centered);
        } else if w.is_on_screen_display() || w.is_notification() || w.is_critical_notification() {
            self.place_on_screen_display(id, area);
        } else if w.is_popup() && w.is_transient() && w.placement_hint.is_some() {
            self.place_transient(id, area);
        } else {
            self.place_with(id, area, configured, PlacementPolicy::Smart);
        }
    }

    fn place_with(
        &mut self,
        id: WindowId,
        area: Geometry,
        policy: PlacementPolicy,
        fallback: PlacementPolicy,
    ) {
        debug!("Placing window {} with {:?}", id, policy);
        let size = self.pending_frame_of(id).size();
        match policy {
            PlacementPolicy::NoPlacement => {}
            PlacementPolicy::Default | PlacementPolicy::Smart => {
                let pos = self.smart_position(id, size, area);
                self.move_window(id, pos);
            }
            PlacementPolicy::Random => self.place_at_random(id, area),
            PlacementPolicy::Cascade => self.place_cascaded(id, area),
            PlacementPolicy::Centered => {
                let pos = Point::new(
                    area.x + (area.width - size.width) / 2,
                    area.y + (area.height - size.height) / 2,
                );
                self.move_window(id, pos);
            }
            PlacementPolicy::ZeroCornered => self.move_window(id, area.pos()),
            PlacementPolicy::UnderMouse => {
                let frame = self.pending_frame_of(id).with_center(self.cursor.pos);
                self.move_window(id, frame.pos());
                self.keep_in_area(id, area, false);
            }
            PlacementPolicy::OnMainWindow => self.place_on_main_window(id, area, fallback),
            PlacementPolicy::Maximizing => {
                if self.windows.get(&id).is_some_and(|w| w.is_maximizable()) {
                    self.maximize(id, MaximizeMode::FULL);
                } else {
                    let pos = self.smart_position(id, size, area);
                    self.move_window(id, pos);
                }
            }
        }
    }

    /// Position with the least overlap with other visible windows,
    /// scanning candidates row by row from the top-left
    pub(crate) fn smart_position(&self, id: WindowId, size: Size, area: Geometry) -> Point {
        let desktop = match self.windows.get(&id).map(|w| w.desktop()) {
            Some(0) | None => self.desktops.current(),
            Some(d) => d,
        };
        let others: Vec<Geometry> = self
            .windows
            .values()
            .filter(|o| {
                o.id != id
                    && !o.is_desktop()
                    && o.on_desktop(desktop)
                    && self.is_shown(o.id)
            })
            .map(|o| o.pending_frame())
            .collect();

        let mut xs = vec![area.x, area.right() - size.width];
        let mut ys = vec![area.y, area.bottom() - size.height];
        for o in &others {
            xs.extend([o.right(), o.x - size.width]);
            ys.extend([o.bottom(), o.y - size.height]);
        }
        xs.retain(|x| *x >= area.x && *x + size.width <= area.right());
        ys.retain(|y| *y >= area.y && *y + size.height <= area.bottom());
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();

        let mut best = (area.pos(), i64::MAX);
        for &y in &ys {
            for &x in &xs {
                let candidate = Geometry::new(x, y, size.width, size.height);
                let overlap: i64 = others
                    .iter()
                    .map(|o| {
                        let i = candidate.intersected(o);
                        i.width as i64 * i.height as i64
                    })
                    .sum();
                if overlap == 0 {
                    return candidate.pos();
                }
                if overlap < best.1 {
                    best = (candidate.pos(), overlap);
                }
            }
        }
        best.0
    }

    fn place_at_random(&mut self, id: WindowId, area: Geometry) {
        let size = self.pending_frame_of(id).size();
        let origin = &mut self.placement.random;
        origin.x = origin.x.max(area.x) + PLACEMENT_STEP;
        origin.y = origin.y.max(area.y) + 2 * PLACEMENT_STEP;
        if origin.x > area.x + area.width / 2 {
            origin.x = area.x + PLACEMENT_STEP;
        }
        if origin.y > area.y + area.height / 2 {
            origin.y = area.y + PLACEMENT_STEP;
        }
        let mut pos = *origin;
        if pos.x + size.width > area.right() {
            pos.x = (area.right() - size.width).max(area.x);
            origin.x = area.x;
        }
        if pos.y + size.height > area.bottom() {
            pos.y = (area.bottom() - size.height).max(area.y);
            origin.y = area.y;
        }
        self.move_window(id, pos);
    }

    fn place_cascaded(&mut self, id: WindowId, area: Geometry) {
        let size = self.pending_frame_of(id).size();
        let desktop = match self.windows.get(&id).map(|w| w.desktop()) {
            Some(0) | None => self.desktops.current(),
            Some(d) => d,
        };
        let next = self.placement.cascade.entry(desktop).or_insert(area.pos());
        if next.x < area.x || next.y < area.y {
            *next = area.pos();
        }
        let mut pos = *next;
        if pos.y + size.height > area.bottom() {
            pos.y = area.y;
        }
        if pos.x + size.width > area.right() {
            pos.x = area.x;
        }
        if pos.x + size.width > area.right() || pos.y + size.height > area.bottom() {
            let pos = self.smart_position(id, size, area);
            self.move_window(id, pos);
            return;
        }
        *next = Point::new(pos.x + PLACEMENT_STEP, pos.y + PLACEMENT_STEP);
        self.move_window(id, pos);
    }

    fn place_on_main_window(&mut self, id: WindowId, area: Geometry, fallback: PlacementPolicy) {
        let fallback = match fallback {
            PlacementPolicy::OnMainWindow | PlacementPolicy::Default => PlacementPolicy::Centered,
            other => other,
        };
        let desktop = self.desktops.current();
        let mains: Vec<WindowId> = self
            .main_windows(id)
            .into_iter()
            .filter(|m| {
                self.is_shown(*m) && self.windows.get(m).is_some_and(|w| w.on_desktop(desktop))
            })
            .collect();
        let place_on = match self.focus.active {
            Some(active) if mains.contains(&active) => Some(active),
            _ => mains.first().copied(),
        };
        let Some(main) = place_on else {
            self.place_with(id, area, fallback, PlacementPolicy::Smart);
            return;
        };
        let center = self.pending_frame_of(main).center();
        let frame = self.pending_frame_of(id).with_center(center);
        self.move_window(id, frame.pos());
        let area = self.client_area_for(crate::wm::screen::ClientAreaOption::Placement, id);
        self.keep_in_area(id, area, false);
    }

    /// Horizontally centered, two thirds down the area
    fn place_on_screen_display(&mut self, id: WindowId, area: Geometry) {
        let size = self.pending_frame_of(id).size();
        let pos = Point::new(
            area.x + (area.width - size.width) / 2,
            area.y + 2 * (area.height - size.height) / 3,
        );
        self.move_window(id, pos);
    }

    /// Popups sit at their hint relative to the lead's client area
    fn place_transient(&mut self, id: WindowId, area: Geometry) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let (Some(hint), Some(lead)) = (w.placement_hint, w.transient.leads.first().copied()) else {
            return;
        };
        let Some(lead) = self.windows.get(&lead) else {
            return;
        };
        let origin = lead.frame_to_client_pos(lead.pending_frame().pos());
        self.move_window(id, origin + hint);
        self.keep_in_area(id, area, false);
    }

    /// Pull the frame inside `area`. `partial` only keeps 100 pixels
    /// visible; otherwise an oversized frame is shrunk first.
    pub fn keep_in_area(&mut self, id: WindowId, area: Geometry, partial: bool) {
        let mut area = area;
        let frame = self.pending_frame_of(id);
        if partial {
            let left = area.x.min(area.x - frame.width + 100);
            let top = area.y.min(area.y - frame.height + 100);
            let right = area.right().max(area.right() + frame.width - 100);
            let bottom = area.bottom().max(area.bottom() + frame.height - 100);
            area = Geometry::new(left, top, right - left, bottom - top);
        } else if area.width < frame.width || area.height < frame.height {
            let size = frame.size().bounded_to(area.size());
            self.resize_with_checks(id, size, SizeMode::Any);
        }

        let frame = self.pending_frame_of(id);
        let mut pos = frame.pos();
        if frame.right() > area.right() && frame.width <= area.width {
            pos.x = area.right() - frame.width;
        }
        if frame.bottom() > area.bottom() && frame.height <= area.height {
            pos.y = area.bottom() - frame.height;
        }
        if !area.contains_point(pos) {
            pos.x = pos.x.max(area.x);
            pos.y = pos.y.max(area.y);
        }
        if pos != frame.pos() {
            self.move_window(id, pos);
        }
    }

    /// Windows opening at least as large as the area become maximized
    /// along those axes. Windows spanning several screens but not the whole
    /// layout stay unmaximized and are kept in the full area.
    pub(crate) fn place_max_fs(&mut self, id: WindowId, area: Geometry, keep: bool, partial: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let frame = w.pending_frame();
        if !w.is_maximizable() || frame.width < area.width || frame.height < area.height {
            if keep {
                self.keep_in_area(id, area, partial);
            }
            return;
        }
        let screen = self.screens.geometry(self.screens.nearest(area.center()));
        let full = self.screens.bounding();
        let client = w.frame_to_client_size(frame.size());
        let old_mode = w.max_mode();

        let mut mode = old_mode | MaximizeMode::FULL;
        let mut keep_in_full = false;
        if client.width > screen.width + 1 && client.width < full.width + 1 {
            mode.remove(MaximizeMode::HORIZONTAL);
            keep_in_full = true;
        }
        if client.height > screen.height + 1 && client.height < full.height + 1 {
            mode.remove(MaximizeMode::VERTICAL);
            keep_in_full = true;
        }
        if mode != old_mode {
            debug!("Window {} pseudo-maximized {:?}", id, mode);
            self.maximize(id, mode);
            let restore = if mode.is_full() {
                Geometry::default()
            } else {
                Geometry::new(0, 0, screen.width * 2 / 3, screen.height * 2 / 3)
                    .with_center(screen.center())
            };
            if let Some(w) = self.windows.get_mut(&id) {
                w.restore_geometries.maximize = restore;
            }
        }
        if keep_in_full {
            self.keep_in_area(id, full, partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at, manage_typed};
    use crate::wm::client_flags::WindowType;
    use crate::wm::manage::ManageRequest;
    use pretty_assertions::assert_eq;

    const SCREEN: Geometry = Geometry::new(0, 0, 1920, 1080);

    fn unplaced(comp: &mut Compositor, window_type: WindowType, size: Size) -> WindowId {
        let mut request =
            ManageRequest::new(window_type, Geometry::from_parts(Point::default(), size));
        request.no_border = true;
        comp.take_control(request)
    }

    #[test]
    fn smart_placement_avoids_overlap() {
        let mut comp = compositor();
        manage_at(&mut comp, Geometry::new(0, 0, 400, 300));
        let id = unplaced(&mut comp, WindowType::Normal, Size::new(400, 300));
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(400, 0, 400, 300));
    }

    #[test]
    fn smart_placement_minimizes_overlap_when_full() {
        let mut comp = compositor();
        manage_at(&mut comp, Geometry::new(0, 0, 1920, 1000));
        let id = unplaced(&mut comp, WindowType::Normal, Size::new(400, 300));
        assert_eq!(comp.window(id).unwrap().frame_geometry.pos(), Point::new(0, 780));
    }

    #[test]
    fn cascade_steps_diagonally() {
        let mut comp = compositor();
        comp.config.behavior.placement = PlacementPolicy::Cascade;
        let a = unplaced(&mut comp, WindowType::Normal, Size::new(400, 300));
        let b = unplaced(&mut comp, WindowType::Normal, Size::new(400, 300));
        assert_eq!(comp.window(a).unwrap().frame_geometry.pos(), Point::new(0, 0));
        assert_eq!(comp.window(b).unwrap().frame_geometry.pos(), Point::new(24, 24));
    }

    #[test]
    fn on_screen_displays_sit_low_and_centered() {
        let mut comp = compositor();
        let id = unplaced(&mut comp, WindowType::OnScreenDisplay, Size::new(200, 60));
        assert_eq!(comp.window(id).unwrap().frame_geometry.pos(), Point::new(860, 680));
    }

    #[test]
    fn dialogs_center_over_their_main_window() {
        let mut comp = compositor();
        let main = manage_at(&mut comp, Geometry::new(100, 100, 600, 400));
        let mut request = ManageRequest::new(WindowType::Dialog, Geometry::new(0, 0, 200, 100));
        request.no_border = true;
        request.lead = Some(main);
        let dialog = comp.take_control(request);
        assert_eq!(
            comp.window(dialog).unwrap().frame_geometry,
            Geometry::new(300, 250, 200, 100)
        );
    }

    #[test]
    fn keep_in_area_pushes_and_shrinks() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(1800, 1000, 400, 300));
        comp.keep_in_area(id, SCREEN, false);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(1520, 780, 400, 300));

        let big = manage_at(&mut comp, Geometry::new(-50, -50, 2500, 1200));
        comp.keep_in_area(big, SCREEN, false);
        assert_eq!(comp.window(big).unwrap().frame_geometry, SCREEN);
    }

    #[test]
    fn partial_keep_leaves_some_of_the_window_visible() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(1800, 100, 400, 300));
        comp.keep_in_area(id, SCREEN, true);
        assert_eq!(comp.window(id).unwrap().frame_geometry.x, 1800);

        comp.move_window(id, Point::new(3000, 100));
        comp.keep_in_area(id, SCREEN, true);
        assert_eq!(comp.window(id).unwrap().frame_geometry.x, 1820);
    }

    #[test]
    fn screen_sized_windows_open_maximized() {
        let mut comp = compositor();
        let id = manage_typed(&mut comp, WindowType::Normal, SCREEN);
        let w = comp.window(id).unwrap();
        assert_eq!(w.max_mode(), MaximizeMode::FULL);
        assert!(!comp.restore_geometry(id).is_valid());

        comp.maximize(id, MaximizeMode::RESTORE);
        let frame = comp.window(id).unwrap().frame_geometry;
        assert_eq!(frame.size(), Size::new(1280, 720));
    }
}

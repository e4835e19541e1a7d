//! Maximize Module
//!
//! Per-axis maximize, the restore geometry it returns to, and fullscreen
//! with its own restore slot. Every request goes through the window rules
//! first; a forbidden request is a silent no-op.

use tracing::debug;

use crate::compositor::Compositor;
use crate::shared::{Geometry, Size};
use crate::wm::client_flags::{MaximizeMode, NetState, QuickTiles, ShadeMode};
use crate::wm::events::WindowEvent;
use crate::wm::geometry::GeometryUpdatesBlocker;
use crate::wm::hints::SizeMode;
use crate::wm::rules::RuleKind;
use crate::wm::screen::ClientAreaOption;
use crate::wm::stacking::StackingUpdatesBlocker;
use crate::wm::window::WindowId;

impl Compositor {
    /// Maximize along the axes in `mode`; `RESTORE` returns to the
    /// remembered geometry
    pub fn maximize(&mut self, id: WindowId, mode: MaximizeMode) {
        self.update_maximized(id, mode, false);
    }

    pub fn restore_geometry(&self, id: WindowId) -> Geometry {
        self.windows
            .get(&id)
            .map(|w| w.restore_geometries.maximize)
            .unwrap_or_default()
    }

    /// Remember the geometry maximize and quick-tile return to. Kept as is
    /// while fullscreen, quick-tiled or moved interactively.
    pub fn set_restore_geometry(&mut self, id: WindowId, geometry: Geometry) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        if control.fullscreen || !control.quicktiling.is_none() || control.move_resize.is_move() {
            return;
        }
        w.restore_geometries.maximize = geometry;
    }

    pub fn quick_tile_mode(&self, id: WindowId) -> QuickTiles {
        self.control(id).map(|c| c.quicktiling).unwrap_or_default()
    }

    /// Area a maximize fills: the one under the pointer while an electric
    /// border previews, the window's own otherwise
    pub(crate) fn maximizing_area(&self, id: WindowId) -> Geometry {
        let Some(w) = self.windows.get(&id) else {
            return self.screens.bounding();
        };
        if w.control.as_ref().is_some_and(|c| c.electric_maximizing) {
            let desktop = match w.desktop() {
                0 => self.desktops.current(),
                d => d,
            };
            let screen = self.screens.nearest(self.cursor.pos);
            return self.client_area(ClientAreaOption::Maximize, screen, desktop);
        }
        self.client_area_for(ClientAreaOption::Maximize, id)
    }

    /// A usable restore geometry: invalid dimensions become two thirds of
    /// the maximizing area, placed like a new window
    pub(crate) fn rectify_restore_geometry(&self, id: WindowId, restore: Geometry) -> Geometry {
        if restore.is_valid() {
            return restore;
        }
        let area = self.maximizing_area(id);
        let mut size = Size::new(area.width * 2 / 3, area.height * 2 / 3);
        if restore.width > 0 {
            size.width = restore.width;
        }
        if restore.height > 0 {
            size.height = restore.height;
        }
        let pos = self.smart_position(id, size, area);
        Geometry::from_parts(pos, size)
    }

    /// Apply a maximize mode. `force` re-fits the geometry even when the
    /// mode is unchanged, as needed after the area changed.
    pub(crate) fn update_maximized(&mut self, id: WindowId, mode: MaximizeMode, force: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        if !w.is_resizable() || w.is_toolbar() {
            return;
        }
        let mode = control.rules.check_maximize(mode, false);
        let old_mode = w.max_mode();
        if mode == old_mode && !force {
            return;
        }
        let old_frame = w.pending_frame();
        let old_quicktiling = control.quicktiling;
        debug!("Window {} maximize {:?} -> {:?}", id, old_mode, mode);

        {
            let mut comp = GeometryUpdatesBlocker::new(self, id);
            if mode == old_mode {
                comp.apply_maximize_axes(id, mode);
            } else {
                if old_mode.is_restore() {
                    comp.set_restore_geometry(id, old_frame);
                } else {
                    comp.maximize_restore(id, old_mode, !mode.is_restore());
                }
                if !mode.is_restore() {
                    comp.apply_maximize_axes(id, mode);
                }
            }
            let quicktiling = if mode.is_full() {
                QuickTiles::MAXIMIZE
            } else {
                QuickTiles::NONE
            };
            if let Some(control) = comp.control_mut(id) {
                control.quicktiling = quicktiling;
            }
        }

        if mode != old_mode {
            self.update_window_rules(id, RuleKind::MaximizeVert);
            self.update_window_rules(id, RuleKind::MaximizeHoriz);
            self.emit(WindowEvent::MaximizeModeChanged { id, mode });
        }
        let quicktiling = self.quick_tile_mode(id);
        if quicktiling != old_quicktiling {
            self.emit(WindowEvent::QuickTileModeChanged {
                id,
                mode: quicktiling,
            });
        }
    }

    /// Return from `old_mode` to the remembered geometry. The restore
    /// geometry survives when another maximize mode follows.
    fn maximize_restore(&mut self, id: WindowId, old_mode: MaximizeMode, keep_restore: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let frame = w.pending_frame();
        let mut target = w.restore_geometries.maximize;
        if !old_mode.contains(MaximizeMode::VERTICAL) {
            target.y = frame.y;
            target.height = frame.height;
        }
        if !old_mode.contains(MaximizeMode::HORIZONTAL) {
            target.x = frame.x;
            target.width = frame.width;
        }
        w.geometry_update.max_mode = MaximizeMode::RESTORE;
        self.set_net_state(id, NetState::MAX, false);
        self.update_no_border_for_maximize(id);
        let target = self.rectify_restore_geometry(id, target);
        self.set_frame_geometry(id, target, false);
        if !keep_restore && let Some(w) = self.windows.get_mut(&id) {
            w.restore_geometries.maximize = Geometry::default();
        }
    }

    /// Stretch the frame over the maximizing area along the axes in `mode`
    fn apply_maximize_axes(&mut self, id: WindowId, mode: MaximizeMode) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        w.geometry_update.max_mode = mode;
        self.set_net_state(id, NetState::MAX_VERT, mode.contains(MaximizeMode::VERTICAL));
        self.set_net_state(id, NetState::MAX_HORIZ, mode.contains(MaximizeMode::HORIZONTAL));
        self.update_no_border_for_maximize(id);

        let area = self.maximizing_area(id);
        let frame = self.pending_frame_of(id);
        let mut target = frame;
        let size_mode = if mode.is_full() {
            SizeMode::Any
        } else if mode.contains(MaximizeMode::VERTICAL) {
            target.y = area.y;
            target.height = area.height;
            SizeMode::FixedHeight
        } else {
            target.x = area.x;
            target.width = area.width;
            SizeMode::FixedWidth
        };
        if mode.is_full() {
            target = area;
        }
        let size = self.adjusted_frame_size(id, target.size(), size_mode);
        let pos = self
            .control(id)
            .map(|c| c.rules.check_position(target.pos(), false))
            .unwrap_or(target.pos());
        self.set_frame_geometry(id, Geometry::from_parts(pos, size), false);
    }

    /// Fullscreen is allowed by rules, the size hints fit the screen and
    /// the window is an ordinary one
    pub fn can_fullscreen(&self, id: WindowId) -> bool {
        let Some(w) = self.windows.get(&id) else {
            return false;
        };
        let Some(control) = &w.control else {
            return false;
        };
        if !control.rules.check_fullscreen(true, false) || w.is_special() {
            return false;
        }
        if control.rules.check_strict_geometry(true, false) {
            let area = self.client_area_for(ClientAreaOption::FullScreen, id);
            let fitted = self.size_for_client_size(id, area.size(), SizeMode::Any, true);
            if fitted != area.size() {
                return false;
            }
        }
        true
    }

    /// Enter or leave fullscreen. `user` requests are refused for windows
    /// that cannot go fullscreen.
    pub fn set_fullscreen(&mut self, id: WindowId, set: bool, user: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_fullscreen(set, false);
        let was = control.fullscreen;
        if was == set {
            return;
        }
        if user && !self.can_fullscreen(id) {
            return;
        }
        debug!("Window {} fullscreen {}", id, set);
        self.set_shade(id, ShadeMode::None);
        if set {
            if let Some(w) = self.windows.get_mut(&id) {
                w.restore_geometries.fullscreen = w.pending_frame();
            }
            self.raise_window(id);
        }
        let old_screen = self.window_screen(id);

        {
            let mut stacking = StackingUpdatesBlocker::new(self);
            let mut comp = GeometryUpdatesBlocker::new(&mut stacking, id);
            if let Some(control) = comp.control_mut(id) {
                control.fullscreen = set;
            }
            comp.update_layer(id);
            comp.set_net_state(id, NetState::FULLSCREEN, set);
            if set {
                let area = comp.client_area_for(ClientAreaOption::FullScreen, id);
                comp.set_frame_geometry(id, area, false);
            } else {
                let restore = comp
                    .windows
                    .get(&id)
                    .map(|w| w.restore_geometries.fullscreen)
                    .unwrap_or_default();
                let restore = if restore.is_valid() {
                    restore
                } else {
                    let area = comp.client_area_for(ClientAreaOption::Placement, id);
                    let size = Size::new(area.width * 2 / 3, area.height * 2 / 3);
                    Geometry::from_parts(area.pos(), size).with_center(area.center())
                };
                let size = comp.adjusted_frame_size(id, restore.size(), SizeMode::Any);
                comp.set_frame_geometry(id, Geometry::from_parts(restore.pos(), size), false);
                if comp.window_screen(id) != old_screen {
                    comp.send_to_screen(id, old_screen);
                }
            }
        }

        self.update_window_rules(id, RuleKind::Fullscreen);
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_fullscreen(w);
        }
        self.emit(WindowEvent::FullscreenChanged { id, set });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::wm::client_flags::WindowType;
    use crate::wm::manage::ManageRequest;
    use crate::wm::rules::{Rule, RulePolicy, Rules, WindowRules};
    use pretty_assertions::assert_eq;

    const SCREEN: Geometry = Geometry::new(0, 0, 1920, 1080);

    #[test]
    fn maximize_then_restore_returns_to_start() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.maximize(id, MaximizeMode::FULL);
        let w = comp.window(id).unwrap();
        assert_eq!(w.frame_geometry, SCREEN);
        assert_eq!(w.net.unwrap().state & NetState::MAX, NetState::MAX);
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::MAXIMIZE);

        comp.maximize(id, MaximizeMode::RESTORE);
        let w = comp.window(id).unwrap();
        assert_eq!(w.frame_geometry, start);
        assert_eq!(w.max_mode(), MaximizeMode::RESTORE);
        assert!(!w.net.unwrap().state.intersects(NetState::MAX));
        assert_eq!(comp.quick_tile_mode(id), QuickTiles::NONE);
    }

    #[test]
    fn restoring_discards_the_restore_geometry() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
        comp.maximize(id, MaximizeMode::FULL);
        assert_eq!(comp.restore_geometry(id), Geometry::new(100, 100, 400, 300));

        comp.maximize(id, MaximizeMode::RESTORE);
        assert!(!comp.restore_geometry(id).is_valid());
        let session = comp.capture_session();
        assert!(session.windows.iter().all(|r| !r.restore.is_valid()));
    }

    #[test]
    fn partial_maximize_keeps_the_other_axis() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.maximize(id, MaximizeMode::VERTICAL);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(100, 0, 400, 1080));

        comp.maximize(id, MaximizeMode::HORIZONTAL);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(0, 100, 1920, 300));
        assert_eq!(comp.restore_geometry(id), start);

        comp.maximize(id, MaximizeMode::RESTORE);
        assert_eq!(comp.window(id).unwrap().frame_geometry, start);
    }

    #[test]
    fn forbidden_maximize_is_a_no_op() {
        let mut comp = compositor();
        let start = Geometry::new(100, 100, 400, 300);
        let id = manage_at(&mut comp, start);
        comp.control_mut(id).unwrap().rules = WindowRules::new(vec![Rules {
            maximize_vert: Rule::new(RulePolicy::Force, false),
            maximize_horiz: Rule::new(RulePolicy::Force, false),
            ..Default::default()
        }]);
        comp.maximize(id, MaximizeMode::FULL);
        let w = comp.window(id).unwrap();
        assert_eq!(w.max_mode(), MaximizeMode::RESTORE);
        assert_eq!(w.frame_geometry, start);
    }

    #[test]
    fn fixed_size_windows_do_not_maximize() {
        let mut comp = compositor();
        let mut request = ManageRequest::new(WindowType::Normal, Geometry::new(10, 10, 200, 100));
        request.no_border = true;
        request.size_hints.user_position = true;
        request.size_hints.min_size = Some(Size::new(200, 100));
        request.size_hints.max_size = Some(Size::new(200, 100));
        let id = comp.take_control(request);
        comp.maximize(id, MaximizeMode::FULL);
        assert_eq!(comp.window(id).unwrap().max_mode(), MaximizeMode::RESTORE);
    }

    #[test]
    fn fullscreen_restores_its_own_slot() {
        let mut comp = compositor();
        let mut request = ManageRequest::new(WindowType::Normal, Geometry::new(100, 100, 300, 200));
        request.size_hints.user_position = true;
        let id = comp.take_control(request);
        let decorated = comp.window(id).unwrap().frame_geometry;
        assert_eq!(decorated, Geometry::new(98, 68, 304, 234));

        comp.set_fullscreen(id, true, true);
        let w = comp.window(id).unwrap();
        assert!(w.is_fullscreen());
        assert_eq!(w.frame_geometry, SCREEN);
        assert_eq!(w.client_geometry(), SCREEN);

        comp.set_fullscreen(id, false, true);
        let w = comp.window(id).unwrap();
        assert!(!w.is_fullscreen());
        assert_eq!(w.frame_geometry, decorated);
    }

    #[test]
    fn fullscreen_keeps_maximize_underneath() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
        comp.maximize(id, MaximizeMode::FULL);
        comp.set_fullscreen(id, true, false);
        comp.set_fullscreen(id, false, false);
        let w = comp.window(id).unwrap();
        assert_eq!(w.max_mode(), MaximizeMode::FULL);
        assert_eq!(w.frame_geometry, SCREEN);
        assert_eq!(comp.restore_geometry(id), Geometry::new(100, 100, 400, 300));
    }

    #[test]
    fn rule_forbidding_fullscreen_blocks_requests() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(100, 100, 400, 300));
        comp.control_mut(id).unwrap().rules = WindowRules::new(vec![Rules {
            fullscreen: Rule::new(RulePolicy::Force, false),
            ..Default::default()
        }]);
        assert!(!comp.can_fullscreen(id));
        comp.set_fullscreen(id, true, false);
        assert!(!comp.window(id).unwrap().is_fullscreen());
    }
}

//! Geometry updates
//!
//! Committing frame geometry and the reference-counted blocker that batches
//! mutations into a single flush. While blocked, moves and resizes only
//! record the requested rectangle; the last one is committed exactly once
//! when the count returns to zero.

use std::ops::{Deref, DerefMut};

use tracing::{trace, warn};

use crate::compositor::Compositor;
use crate::shared::{Geometry, Point, Size};
use crate::wm::events::WindowEvent;
use crate::wm::hints::SizeMode;
use crate::wm::rules::RuleKind;
use crate::wm::window::{PendingGeometry, WindowId};

/// Scoped geometry-update block on one window. Derefs to the compositor so
/// work can continue through the guard.
pub struct GeometryUpdatesBlocker<'a> {
    comp: &'a mut Compositor,
    id: WindowId,
}

impl<'a> GeometryUpdatesBlocker<'a> {
    pub fn new(comp: &'a mut Compositor, id: WindowId) -> Self {
        comp.block_geometry_updates(id, true);
        Self { comp, id }
    }
}

impl Deref for GeometryUpdatesBlocker<'_> {
    type Target = Compositor;

    fn deref(&self) -> &Compositor {
        self.comp
    }
}

impl DerefMut for GeometryUpdatesBlocker<'_> {
    fn deref_mut(&mut self) -> &mut Compositor {
        self.comp
    }
}

impl Drop for GeometryUpdatesBlocker<'_> {
    fn drop(&mut self) {
        self.comp.block_geometry_updates(self.id, false);
    }
}

impl Compositor {
    /// Increment (`true`) or decrement (`false`) the block count. Reaching
    /// zero flushes a pending update with one commit.
    pub fn block_geometry_updates(&mut self, id: WindowId, block: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let update = &mut w.geometry_update;
        if block {
            if update.block == 0 {
                update.pending = PendingGeometry::None;
                update.original_frame = w.frame_geometry;
            }
            update.block += 1;
            return;
        }
        if update.block == 0 {
            warn!("Unbalanced geometry unblock on {}", id);
            return;
        }
        update.block -= 1;
        if update.block == 0 && update.pending != PendingGeometry::None {
            let forced = update.pending == PendingGeometry::Forced;
            update.pending = PendingGeometry::None;
            self.commit_frame_geometry(id, forced);
        }
    }

    pub fn geometry_updates_blocked(&self, id: WindowId) -> bool {
        self.windows
            .get(&id)
            .is_some_and(|w| w.geometry_update.block > 0)
    }

    /// Request a new frame rectangle. `force` commits even when unchanged.
    pub fn set_frame_geometry(&mut self, id: WindowId, frame: Geometry, force: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        w.geometry_update.frame = frame;
        if w.geometry_update.block > 0 {
            let request = if force {
                PendingGeometry::Forced
            } else {
                PendingGeometry::Normal
            };
            w.geometry_update.pending = w.geometry_update.pending.max(request);
            trace!("Window {} geometry pending {:?}", id, frame);
            return;
        }
        self.commit_frame_geometry(id, force);
    }

    /// Move the frame's top-left corner
    pub fn move_window(&mut self, id: WindowId, pos: Point) {
        let Some(frame) = self.windows.get(&id).map(|w| w.pending_frame()) else {
            return;
        };
        self.set_frame_geometry(id, frame.moved_to(pos), false);
    }

    /// Set the frame size as is
    pub fn resize_window(&mut self, id: WindowId, size: Size) {
        let Some(frame) = self.windows.get(&id).map(|w| w.pending_frame()) else {
            return;
        };
        self.set_frame_geometry(id, frame.with_size(size), false);
    }

    /// Resize honoring size hints and size rules
    pub fn resize_with_checks(&mut self, id: WindowId, size: Size, mode: SizeMode) {
        let size = self.adjusted_frame_size(id, size, mode);
        self.resize_window(id, size);
    }

    /// Adjusted frame size for a desired client size. With `no_frame` the
    /// client size itself is returned.
    pub fn size_for_client_size(
        &self,
        id: WindowId,
        client: Size,
        mode: SizeMode,
        no_frame: bool,
    ) -> Size {
        let Some(w) = self.windows.get(&id) else {
            return client;
        };
        let mut hints = w.size_hints;
        if let Some(control) = &w.control {
            hints.min_size = Some(control.rules.check_min_size(hints.min_size()));
            hints.max_size = Some(control.rules.check_max_size(hints.max_size()));
        }
        let size = hints.constrain(client, mode);
        if no_frame {
            size
        } else {
            w.client_to_frame_size(size)
        }
    }

    /// Frame size after applying constraints to the client part
    pub fn adjusted_frame_size(&self, id: WindowId, frame: Size, mode: SizeMode) -> Size {
        let Some(w) = self.windows.get(&id) else {
            return frame;
        };
        let client = w.frame_to_client_size(frame);
        self.size_for_client_size(id, client, mode, false)
    }

    fn commit_frame_geometry(&mut self, id: WindowId, force: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let mut target = w.geometry_update.frame;
        if w.is_shaded() {
            target.height = w.frame_margins().vertical();
        }
        if !force && target == w.frame_geometry {
            return;
        }
        let old = w.frame_geometry;
        w.frame_geometry = target;
        let new_screen = self.screens.screen_at(target.center()).unwrap_or(w.screen);
        let screen_changed = new_screen != w.screen;
        w.screen = new_screen;
        self.backend.configure(w);
        trace!("Window {} frame {:?} -> {:?}", id, old, target);

        if old.pos() != target.pos() {
            self.update_window_rules(id, RuleKind::Position);
        }
        if old.size() != target.size() {
            self.update_window_rules(id, RuleKind::Size);
        }
        self.schedule_repaint(old);
        self.schedule_repaint(target);
        if let Some(w) = self.windows.get_mut(&id) {
            w.geometry_update.original_frame = target;
        }
        if screen_changed {
            self.update_layer(id);
            self.emit(WindowEvent::ScreenChanged { id });
        }
        self.update_stacking_order(false);
        self.emit(WindowEvent::FrameGeometryChanged { id, old });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::compositor::tests::{compositor, manage_at};

    fn count_geometry_events(comp: &mut Compositor) -> Rc<RefCell<Vec<Geometry>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        comp.connect(move |e| {
            if let WindowEvent::FrameGeometryChanged { .. } = e {
                sink.borrow_mut().push(Geometry::default());
            }
        });
        log
    }

    #[test]
    fn blocked_updates_flush_once_with_last_rect() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let flushes = count_geometry_events(&mut comp);

        comp.block_geometry_updates(id, true);
        comp.move_window(id, Point::new(10, 10));
        comp.resize_window(id, Size::new(300, 200));
        comp.move_window(id, Point::new(50, 60));
        assert!(flushes.borrow().is_empty());
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(0, 0, 100, 100));
        comp.block_geometry_updates(id, false);

        assert_eq!(flushes.borrow().len(), 1);
        assert_eq!(comp.window(id).unwrap().frame_geometry, Geometry::new(50, 60, 300, 200));
    }

    #[test]
    fn nested_blockers_flush_at_outermost() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let flushes = count_geometry_events(&mut comp);
        {
            let mut outer = GeometryUpdatesBlocker::new(&mut comp, id);
            {
                let mut inner = GeometryUpdatesBlocker::new(&mut outer, id);
                inner.move_window(id, Point::new(5, 5));
            }
            assert!(outer.geometry_updates_blocked(id));
            outer.move_window(id, Point::new(7, 7));
        }
        assert_eq!(flushes.borrow().len(), 1);
        assert!(!comp.geometry_updates_blocked(id));
    }

    #[test]
    fn forced_pending_wins_over_normal() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let flushes = count_geometry_events(&mut comp);
        comp.block_geometry_updates(id, true);
        comp.set_frame_geometry(id, Geometry::new(0, 0, 100, 100), true);
        comp.set_frame_geometry(id, Geometry::new(0, 0, 100, 100), false);
        assert_eq!(
            comp.window(id).unwrap().geometry_update.pending,
            PendingGeometry::Forced
        );
        comp.block_geometry_updates(id, false);
        // Unchanged rect, but forced: still one commit.
        assert_eq!(flushes.borrow().len(), 1);
    }

    #[test]
    fn unchanged_geometry_is_not_committed() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let flushes = count_geometry_events(&mut comp);
        comp.move_window(id, Point::new(0, 0));
        assert!(flushes.borrow().is_empty());
    }

    #[test]
    fn size_for_client_size_adds_borders_and_clamps() {
        let mut comp = compositor();
        let mut request = crate::wm::manage::ManageRequest::new(
            crate::wm::client_flags::WindowType::Normal,
            Geometry::new(100, 100, 300, 200),
        );
        request.size_hints.min_size = Some(Size::new(200, 150));
        request.size_hints.user_position = true;
        let id = comp.take_control(request);

        assert_eq!(
            comp.size_for_client_size(id, Size::new(10, 10), SizeMode::Any, true),
            Size::new(200, 150)
        );
        assert_eq!(
            comp.size_for_client_size(id, Size::new(300, 200), SizeMode::Any, false),
            Size::new(304, 234)
        );
    }
}

//! Stacking Module
//!
//! Window z-order. The unconstrained order records raise/lower requests; the
//! visible order is derived from it by bucketing windows into layers and
//! moving every transient directly above its lead. Both orders run bottom to
//! top.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use tracing::{debug, trace};

use crate::compositor::Compositor;
use crate::wm::client_flags::Layer;
use crate::wm::events::WindowEvent;
use crate::wm::window::{Window, WindowId};

/// Stacking state owned by the compositor
#[derive(Debug, Default)]
pub struct StackingOrder {
    /// Order as requested by raise/lower, bottom to top
    unconstrained: Vec<WindowId>,
    /// Last computed constrained order, bottom to top
    order: Vec<WindowId>,
    /// Nesting count of stacking blockers
    block: u32,
    blocked_propagating_new: bool,
    force_restacking: bool,
    most_recently_raised: Option<WindowId>,
}

impl StackingOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new window on top of the unconstrained order
    pub(crate) fn add(&mut self, id: WindowId) {
        if !self.unconstrained.contains(&id) {
            self.unconstrained.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: WindowId) {
        self.unconstrained.retain(|w| *w != id);
        self.order.retain(|w| *w != id);
        if self.most_recently_raised == Some(id) {
            self.most_recently_raised = None;
        }
    }

    /// Bottom-to-top constrained order
    pub fn order(&self) -> &[WindowId] {
        &self.order
    }

    pub fn unconstrained(&self) -> &[WindowId] {
        &self.unconstrained
    }

    pub fn is_blocked(&self) -> bool {
        self.block > 0
    }

    fn index_of(&self, id: WindowId) -> Option<usize> {
        self.order.iter().position(|w| *w == id)
    }
}

/// Coalesces stacking recomputes: the outermost guard's drop performs the
/// single recompute and notification
pub struct StackingUpdatesBlocker<'a> {
    comp: &'a mut Compositor,
}

impl<'a> StackingUpdatesBlocker<'a> {
    pub fn new(comp: &'a mut Compositor) -> Self {
        comp.block_stacking_updates(true);
        Self { comp }
    }
}

impl Deref for StackingUpdatesBlocker<'_> {
    type Target = Compositor;

    fn deref(&self) -> &Compositor {
        self.comp
    }
}

impl DerefMut for StackingUpdatesBlocker<'_> {
    fn deref_mut(&mut self) -> &mut Compositor {
        self.comp
    }
}

impl Drop for StackingUpdatesBlocker<'_> {
    fn drop(&mut self) {
        self.comp.block_stacking_updates(false);
    }
}

impl Compositor {
    pub fn block_stacking_updates(&mut self, block: bool) {
        if block {
            self.stacking.block += 1;
            return;
        }
        if self.stacking.block == 0 {
            return;
        }
        self.stacking.block -= 1;
        if self.stacking.block == 0 {
            let propagate = std::mem::take(&mut self.stacking.blocked_propagating_new);
            self.update_stacking_order(propagate);
        }
    }

    /// Recompute the constrained order; notifies the backend and observers
    /// when it changed or new windows must be announced
    pub fn update_stacking_order(&mut self, propagate_new: bool) {
        if self.stacking.block > 0 {
            if propagate_new {
                self.stacking.blocked_propagating_new = true;
            }
            return;
        }
        let order = self.constrained_stacking_order();
        let changed = self.stacking.force_restacking || order != self.stacking.order;
        self.stacking.force_restacking = false;
        self.stacking.order = order;
        if changed || propagate_new {
            trace!(order = ?self.stacking.order, "Stacking order changed");
            self.propagate_stacking();
            self.emit(WindowEvent::StackingOrderChanged);
        }
    }

    /// Force a backend restack even if the order looks unchanged
    pub fn force_restacking(&mut self) {
        self.stacking.force_restacking = true;
        self.update_stacking_order(false);
    }

    fn propagate_stacking(&mut self) {
        let windows: Vec<&Window> = self
            .stacking
            .order
            .iter()
            .filter_map(|id| self.windows.get(id))
            .filter(|w| !w.is_remnant())
            .collect();
        self.backend.restack(&windows);
    }

    /// Visible order, bottom to top, remnants included
    pub fn stacking_order(&self) -> Vec<WindowId> {
        self.stacking.order.clone()
    }

    /// Layer a window belongs to, computed lazily and cached
    pub fn layer(&mut self, id: WindowId) -> Layer {
        let Some(w) = self.windows.get(&id) else {
            return Layer::Unknown;
        };
        if w.layer != Layer::Unknown {
            return w.layer;
        }
        let layer = self.belongs_to_layer(id);
        if let Some(w) = self.windows.get_mut(&id) {
            w.layer = layer;
        }
        layer
    }

    /// Layer from the current window state, ignoring the cache
    pub fn belongs_to_layer(&self, id: WindowId) -> Layer {
        let Some(w) = self.windows.get(&id) else {
            return Layer::Unknown;
        };
        if let Some(remnant) = &w.remnant {
            return remnant.layer;
        }
        if w.is_desktop() {
            return if self.showing_desktop {
                Layer::Above
            } else {
                Layer::Desktop
            };
        }
        if w.is_splash() {
            return Layer::Normal;
        }
        if w.is_dock() {
            if self.showing_desktop {
                return Layer::Notification;
            }
            return layer_for_dock(w);
        }
        if w.is_popup() {
            return Layer::Above;
        }
        if w.is_on_screen_display() {
            return Layer::OnScreenDisplay;
        }
        if w.is_notification() {
            return Layer::Notification;
        }
        if w.is_critical_notification() {
            return Layer::CriticalNotification;
        }
        if w.keep_below() {
            return Layer::Below;
        }
        if self.is_active_fullscreen(id) {
            return Layer::Active;
        }
        if w.keep_above() {
            return Layer::Above;
        }
        Layer::Normal
    }

    /// Fullscreen and either most recently activated, on another screen than
    /// the activated window, or the main window of it
    fn is_active_fullscreen(&self, id: WindowId) -> bool {
        let Some(w) = self.windows.get(&id) else {
            return false;
        };
        if !w.is_fullscreen() {
            return false;
        }
        let Some(active) = self.focus.most_recently_activated else {
            return false;
        };
        if active == id {
            return true;
        }
        let Some(aw) = self.windows.get(&active) else {
            return false;
        };
        aw.screen != w.screen || self.main_windows(active).contains(&id)
    }

    /// Invalidate the cached layer when the state changed and cascade to
    /// transients
    pub fn update_layer(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.is_remnant() {
            return;
        }
        let current = w.layer;
        let wanted = self.belongs_to_layer(id);
        if current == wanted {
            return;
        }
        debug!("Window {} layer {:?} -> {:?}", id, current, wanted);
        let children = w.transient.children.clone();
        let mut comp = StackingUpdatesBlocker::new(self);
        if let Some(w) = comp.windows.get_mut(&id) {
            w.layer = Layer::Unknown;
        }
        for child in children {
            comp.update_layer(child);
        }
    }

    fn constrained_stacking_order(&mut self) -> Vec<WindowId> {
        let ids = self.stacking.unconstrained.clone();
        let mut buckets: BTreeMap<Layer, Vec<WindowId>> = BTreeMap::new();
        for id in ids {
            let layer = self.layer(id);
            if layer == Layer::Unknown {
                continue;
            }
            buckets.entry(layer).or_default().push(id);
        }
        let mut order: Vec<WindowId> = buckets.into_values().flatten().collect();

        // Keep transients directly above their leads. A moved window with
        // transients of its own restarts the scan from its new position.
        let mut i = order.len();
        while i > 0 {
            let current = order[i - 1];
            let Some(anchor) = self.transient_anchor(&order, current) else {
                i -= 1;
                continue;
            };
            order.remove(i - 1);
            // The anchor sat above `current`, so it shifted down by one.
            let insert_at = anchor;
            order.insert(insert_at, current);
            let has_transients = self
                .windows
                .get(&current)
                .is_some_and(|w| !w.transient.children.is_empty());
            if has_transients {
                i = insert_at + 1;
            } else {
                i -= 1;
            }
        }
        order
    }

    /// Index of the topmost lead `id` must be kept above, when that lead is
    /// currently stacked higher
    fn transient_anchor(&self, order: &[WindowId], id: WindowId) -> Option<usize> {
        let w = self.windows.get(&id)?;
        if !w.is_transient() {
            return None;
        }
        for (j, other) in order.iter().enumerate().rev() {
            if *other == id {
                return None;
            }
            if self.has_transient(*other, id, true) && self.keep_transient_above(*other, id) {
                return Some(j);
            }
        }
        None
    }

    /// Whether `transient` must be stacked above `lead`
    pub fn keep_transient_above(&self, lead: WindowId, transient: WindowId) -> bool {
        let (Some(l), Some(t)) = (self.windows.get(&lead), self.windows.get(&transient)) else {
            return false;
        };
        if t.is_splash() && l.is_dialog() {
            return false;
        }
        if let Some(remnant) = &t.remnant {
            if remnant.was_x11() {
                // An active group transient was above its group when it closed.
                if remnant.was_group_transient && remnant.was_active {
                    return true;
                }
                if remnant.was_group_transient && t.is_dialog() && !remnant.modal {
                    return false;
                }
                if l.is_dock() {
                    return false;
                }
            }
            return true;
        }
        // Non-modal group-transient dialogs are not forced above the group.
        if t.is_dialog() && !t.is_modal() && t.transient.group_transient {
            return false;
        }
        if l.is_dock() && t.placement_hint.is_none() {
            return false;
        }
        true
    }

    /// Raise to the top of its layer; leads of a transient are raised too
    pub fn raise_window(&mut self, id: WindowId) {
        self.raise_window_inner(id, false);
    }

    fn raise_window_inner(&mut self, id: WindowId, no_group: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.is_remnant() {
            return;
        }
        let special = w.is_special();
        let transient = w.is_transient();
        debug!("Raising window {}", id);
        let mut comp = StackingUpdatesBlocker::new(self);
        if !no_group && transient {
            let mut leads = comp.leads_recursive(id);
            leads.reverse();
            for lead in leads {
                comp.raise_window_inner(lead, true);
            }
        }
        comp.stacking.unconstrained.retain(|w| *w != id);
        comp.stacking.unconstrained.push(id);
        if !special {
            comp.stacking.most_recently_raised = Some(id);
        }
    }

    /// Lower to the bottom of its layer; a transient takes its group along
    pub fn lower_window(&mut self, id: WindowId) {
        self.lower_window_inner(id, false);
    }

    fn lower_window_inner(&mut self, id: WindowId, no_group: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.is_remnant() {
            return;
        }
        let transient = w.is_transient();
        let grouped = w.group.is_some();
        debug!("Lowering window {}", id);
        let mut comp = StackingUpdatesBlocker::new(self);
        comp.stacking.unconstrained.retain(|w| *w != id);
        comp.stacking.unconstrained.insert(0, id);
        if !no_group && transient {
            let mut related = comp.leads_recursive(id);
            if grouped {
                related.extend(comp.group_members(id));
            }
            related.retain(|w| *w != id);
            related.dedup();
            let related = comp.ensure_stacking_order(&related);
            for other in related.into_iter().rev() {
                comp.lower_window_inner(other, true);
            }
        }
        if comp.stacking.most_recently_raised == Some(id) {
            comp.stacking.most_recently_raised = None;
        }
    }

    /// Lower if it is already the topmost window of its desktop, else raise
    pub fn raise_or_lower_window(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let on_current = w.on_desktop(self.desktops.current());
        let recent = self.stacking.most_recently_raised.filter(|r| {
            self.stacking.order.contains(r) && self.is_shown(*r) && on_current
        });
        let topmost = match recent {
            Some(r) => Some(r),
            None => {
                let desktop = if w.on_all_desktops() {
                    self.desktops.current()
                } else {
                    w.desktop()
                };
                let screen = self.config.behavior.separate_screen_focus.then_some(w.screen);
                self.top_window_on_desktop(desktop, screen)
            }
        };
        if topmost == Some(id) {
            self.lower_window(id);
        } else {
            self.raise_window(id);
        }
    }

    /// Stack `id` directly below `under` in the unconstrained order
    pub fn restack(&mut self, id: WindowId, under: WindowId) {
        if id == under || !self.windows.contains_key(&id) || !self.windows.contains_key(&under) {
            return;
        }
        let mut comp = StackingUpdatesBlocker::new(self);
        comp.stacking.unconstrained.retain(|w| *w != id);
        let at = comp
            .stacking
            .unconstrained
            .iter()
            .position(|w| *w == under)
            .unwrap_or(0);
        comp.stacking.unconstrained.insert(at, id);
    }

    /// Move `id` to an absolute position of the unconstrained order
    pub(crate) fn restack_to_index(&mut self, id: WindowId, index: usize) {
        let mut comp = StackingUpdatesBlocker::new(self);
        comp.stacking.unconstrained.retain(|w| *w != id);
        let index = index.min(comp.stacking.unconstrained.len());
        comp.stacking.unconstrained.insert(index, id);
    }

    /// Topmost ordinary window shown on a desktop, optionally on one screen
    pub fn top_window_on_desktop(&self, desktop: u32, screen: Option<usize>) -> Option<WindowId> {
        self.stacking.order.iter().rev().copied().find(|id| {
            self.windows.get(id).is_some_and(|w| {
                w.control.is_some()
                    && w.on_desktop(desktop)
                    && !w.is_special()
                    && self.is_shown(*id)
                    && screen.is_none_or(|s| s == w.screen)
            })
        })
    }

    /// Sort a list of windows by their current stacking position
    pub fn ensure_stacking_order(&self, list: &[WindowId]) -> Vec<WindowId> {
        let mut sorted: Vec<WindowId> = list.to_vec();
        sorted.sort_by_key(|id| self.stacking.index_of(*id).unwrap_or(usize::MAX));
        sorted
    }

    /// Index in the visible order
    pub fn stacking_index(&self, id: WindowId) -> Option<usize> {
        self.stacking.index_of(id)
    }

    pub fn most_recently_raised(&self) -> Option<WindowId> {
        self.stacking.most_recently_raised
    }

    /// Managed, not minimized and not hidden by a shade
    pub fn is_shown(&self, id: WindowId) -> bool {
        self.windows
            .get(&id)
            .is_some_and(|w| w.control.is_some() && !w.is_minimized())
    }
}

/// Dock layer: keep-below docks share the normal layer so either can cover
/// the other, keep-above docks (autohiding panels) go above
fn layer_for_dock(w: &Window) -> Layer {
    if w.keep_below() {
        Layer::Normal
    } else if w.keep_above() {
        Layer::Above
    } else {
        Layer::Dock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at, manage_typed};
    use crate::shared::Geometry;
    use crate::wm::client_flags::WindowType;
    use pretty_assertions::assert_eq;

    fn square(size: i32) -> Geometry {
        Geometry::new(0, 0, size, size)
    }

    mod transients {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn activation_moves_lead_and_transient_as_a_unit() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(256));
            let b = manage_at(&mut comp, square(128));
            comp.add_transient(a, b);
            assert_eq!(comp.stacking_order(), vec![a, b]);

            comp.activate_window(a, true);
            assert_eq!(comp.stacking_order(), vec![a, b]);

            let c = manage_at(&mut comp, square(256));
            assert_eq!(comp.stacking_order(), vec![a, b, c]);

            comp.activate_window(a, true);
            assert_eq!(comp.stacking_order(), vec![c, a, b]);
        }

        #[test]
        fn transient_stays_above_lead_after_lowering_it() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(256));
            let b = manage_at(&mut comp, square(128));
            let c = manage_at(&mut comp, square(256));
            comp.add_transient(a, b);
            comp.lower_window(b);
            let order = comp.stacking_order();
            let pos = |id| order.iter().position(|w| *w == id).unwrap();
            assert!(pos(b) > pos(a));
            assert!(order.contains(&c));
        }

        #[test]
        fn chains_of_transients_are_kept_in_order() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(256));
            let b = manage_at(&mut comp, square(200));
            let c = manage_at(&mut comp, square(100));
            let d = manage_at(&mut comp, square(100));
            comp.add_transient(a, b);
            comp.add_transient(b, c);
            comp.raise_window(a);
            comp.raise_window(d);
            comp.raise_window(a);
            assert_eq!(comp.stacking_order(), vec![d, a, b, c]);
        }

        #[test]
        fn sibling_transients_keep_their_relative_order() {
            let mut comp = compositor();
            let b = manage_at(&mut comp, square(100));
            let c = manage_at(&mut comp, square(100));
            let a = manage_at(&mut comp, square(256));
            comp.add_transient(a, b);
            comp.add_transient(a, c);
            assert_eq!(comp.stacking_order(), vec![a, b, c]);
        }

        #[test]
        fn dialog_of_dock_is_not_forced_above_it() {
            let mut comp = compositor();
            let dock = manage_typed(&mut comp, WindowType::Dock, Geometry::new(0, 0, 1920, 40));
            let dialog = manage_typed(&mut comp, WindowType::Dialog, square(100));
            comp.add_transient(dock, dialog);
            assert_eq!(comp.stacking_order(), vec![dialog, dock]);
        }
    }

    mod group_transients {
        use super::*;
        use crate::wm::group::GroupId;
        use pretty_assertions::assert_eq;

        #[test]
        fn modal_group_transient_goes_above_every_member() {
            let mut comp = compositor();
            let m1 = manage_at(&mut comp, square(200));
            let m2 = manage_at(&mut comp, square(200));
            let dialog = manage_typed(&mut comp, WindowType::Dialog, square(100));
            comp.set_group(m1, Some(GroupId(7)));
            comp.set_group(m2, Some(GroupId(7)));
            comp.set_group(dialog, Some(GroupId(7)));
            comp.set_modal(dialog, true);
            comp.set_group_transient(dialog, true);
            comp.raise_window(m1);
            comp.raise_window(m2);
            assert_eq!(comp.stacking_order().last(), Some(&dialog));
        }

        #[test]
        fn non_modal_group_transient_dialog_is_not_forced_above() {
            let mut comp = compositor();
            let m1 = manage_at(&mut comp, square(200));
            let dialog = manage_typed(&mut comp, WindowType::Dialog, square(100));
            comp.set_group(m1, Some(GroupId(7)));
            comp.set_group(dialog, Some(GroupId(7)));
            comp.set_group_transient(dialog, true);
            comp.raise_window(m1);
            assert_eq!(comp.stacking_order(), vec![dialog, m1]);
        }

        #[test]
        fn lowering_a_transient_takes_its_group_down() {
            let mut comp = compositor();
            let m1 = manage_at(&mut comp, square(200));
            let m2 = manage_at(&mut comp, square(200));
            let other = manage_at(&mut comp, square(200));
            let t = manage_at(&mut comp, square(100));
            comp.set_group(m1, Some(GroupId(9)));
            comp.set_group(m2, Some(GroupId(9)));
            comp.set_group(t, Some(GroupId(9)));
            comp.add_transient(m1, t);
            assert_eq!(comp.stacking_order(), vec![m1, m2, other, t]);

            comp.lower_window(t);
            assert_eq!(comp.stacking_order(), vec![m1, m2, t, other]);
        }
    }

    mod layers {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn dock_layer_follows_keep_above_and_below() {
            let mut comp = compositor();
            let dock = manage_typed(&mut comp, WindowType::Dock, Geometry::new(0, 0, 1920, 40));
            assert_eq!(comp.layer(dock), Layer::Dock);
            comp.set_keep_below(dock, true);
            assert_eq!(comp.layer(dock), Layer::Normal);
            comp.set_keep_above(dock, true);
            assert_eq!(comp.layer(dock), Layer::Above);
            comp.set_keep_above(dock, false);
            assert_eq!(comp.layer(dock), Layer::Dock);
        }

        #[test]
        fn keep_below_window_sits_under_normal_windows() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(100));
            let b = manage_at(&mut comp, square(100));
            comp.set_keep_below(b, true);
            assert_eq!(comp.stacking_order(), vec![b, a]);
            comp.set_keep_above(b, true);
            assert_eq!(comp.stacking_order(), vec![a, b]);
        }

        #[test]
        fn active_fullscreen_window_covers_docks() {
            let mut comp = compositor();
            let dock = manage_typed(&mut comp, WindowType::Dock, Geometry::new(0, 0, 1920, 40));
            let w = manage_at(&mut comp, square(100));
            comp.activate_window(w, true);
            comp.set_fullscreen(w, true, true);
            assert_eq!(comp.layer(w), Layer::Active);
            assert_eq!(comp.stacking_order(), vec![dock, w]);

            let other = manage_at(&mut comp, square(100));
            comp.activate_window(other, true);
            assert_eq!(comp.layer(w), Layer::Normal);
            assert_eq!(comp.stacking_order().last(), Some(&dock));
        }

        #[test]
        fn showing_desktop_lifts_the_desktop_window() {
            let mut comp = compositor();
            let desktop = manage_typed(&mut comp, WindowType::Desktop, square(1920));
            let a = manage_at(&mut comp, square(100));
            assert_eq!(comp.stacking_order(), vec![desktop, a]);
            comp.set_showing_desktop(true);
            assert_eq!(comp.stacking_order(), vec![a, desktop]);
        }
    }

    mod blocker {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::cell::Cell;
        use std::rc::Rc;

        #[test]
        fn nested_blockers_notify_once() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(100));
            let b = manage_at(&mut comp, square(100));
            let c = manage_at(&mut comp, square(100));
            let count = Rc::new(Cell::new(0));
            let sink = count.clone();
            comp.connect(move |e| {
                if *e == WindowEvent::StackingOrderChanged {
                    sink.set(sink.get() + 1);
                }
            });
            {
                let mut outer = StackingUpdatesBlocker::new(&mut comp);
                outer.raise_window(a);
                {
                    let mut inner = StackingUpdatesBlocker::new(&mut outer);
                    inner.lower_window(c);
                }
                outer.raise_window(b);
                assert_eq!(count.get(), 0);
            }
            assert_eq!(count.get(), 1);
            assert_eq!(comp.stacking_order(), vec![c, a, b]);
        }
    }

    mod raise_or_lower {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn toggles_topmost_window() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, square(100));
            let b = manage_at(&mut comp, square(100));
            comp.raise_or_lower_window(a);
            assert_eq!(comp.stacking_order(), vec![b, a]);
            comp.raise_or_lower_window(a);
            assert_eq!(comp.stacking_order(), vec![a, b]);
        }
    }
}

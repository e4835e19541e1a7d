//! Focus Module
//!
//! Active window, most-recently-used focus chain and the attention chain.
//! Activation itself lives in the control block (`set_active`); this module
//! keeps the workspace-wide references consistent with it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::Compositor;
use crate::wm::events::WindowEvent;
use crate::wm::stacking::StackingUpdatesBlocker;
use crate::wm::window::WindowId;

/// Focus policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPolicy {
    /// Click to focus
    #[default]
    ClickToFocus,
    /// Focus follows mouse, nothing loses focus on leaving a window
    FocusFollowsMouse,
    /// Focus under the mouse, the desktop included
    UnderMouse,
    /// Only the window under the mouse keeps focus
    StrictlyUnderMouse,
}

impl FocusPolicy {
    /// Policies where the compositor may move focus on its own
    pub fn is_reasonable(&self) -> bool {
        matches!(self, Self::ClickToFocus | Self::FocusFollowsMouse)
    }
}

/// Workspace focus state
#[derive(Debug, Default)]
pub struct FocusChain {
    /// Most recently used first
    chain: VecDeque<WindowId>,
    pub(crate) active: Option<WindowId>,
    pub(crate) most_recently_activated: Option<WindowId>,
    /// Windows demanding attention, most recent first
    attention: VecDeque<WindowId>,
}

impl FocusChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a window to the front
    pub fn make_first(&mut self, id: WindowId) {
        self.chain.retain(|w| *w != id);
        self.chain.push_front(id);
    }

    /// Move a window to the back
    pub fn make_last(&mut self, id: WindowId) {
        self.chain.retain(|w| *w != id);
        self.chain.push_back(id);
    }

    /// Add or drop a window depending on whether it takes part in focus
    /// cycling; a present window keeps its place
    pub fn update(&mut self, id: WindowId, wanted: bool) {
        if !wanted {
            self.chain.retain(|w| *w != id);
        } else if !self.chain.contains(&id) {
            self.chain.push_back(id);
        }
    }

    pub fn update_attention(&mut self, id: WindowId, set: bool) {
        self.attention.retain(|w| *w != id);
        if set {
            self.attention.push_front(id);
        }
    }

    pub(crate) fn remove(&mut self, id: WindowId) {
        self.chain.retain(|w| *w != id);
        self.attention.retain(|w| *w != id);
        if self.active == Some(id) {
            self.active = None;
        }
        if self.most_recently_activated == Some(id) {
            self.most_recently_activated = None;
        }
    }

    pub fn chain(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.chain.iter().copied()
    }

    pub fn attention(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.attention.iter().copied()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.chain.contains(&id)
    }
}

impl Compositor {
    pub fn active_window(&self) -> Option<WindowId> {
        self.focus.active
    }

    pub fn most_recently_activated(&self) -> Option<WindowId> {
        self.focus.most_recently_activated
    }

    /// Replace the workspace's active-window reference. Called from
    /// `set_active`; the previous window is deactivated first.
    pub(crate) fn set_active_window(&mut self, id: Option<WindowId>) {
        if self.focus.active == id {
            return;
        }
        let mut comp = StackingUpdatesBlocker::new(&mut *self);
        if id.is_some() {
            comp.focus.most_recently_activated = id;
        }
        // Cleared before deactivating so `set_active(false)` does not come
        // back here.
        if let Some(old) = comp.focus.active.take() {
            comp.set_active(old, false);
        }
        comp.focus.active = id;
        if let Some(new) = id {
            comp.focus.make_first(new);
            comp.demand_attention(new, false);
            // Another fullscreen window may lose the active layer.
            let stale: Vec<WindowId> = comp
                .windows
                .values()
                .filter(|w| w.id != new && w.layer == crate::wm::client_flags::Layer::Active)
                .map(|w| w.id)
                .collect();
            for other in stale {
                comp.update_layer(other);
            }
        }
        comp.update_stacking_order(false);
        drop(comp);

        let active = id.and_then(|id| self.windows.get(&id));
        self.backend.set_active_window(active);
        debug!("Active window {:?}", id);
        self.emit(WindowEvent::ActiveWindowChanged { id });
    }

    /// User-level activation: raise, switch to the window's desktop,
    /// unminimize and give it focus
    pub fn activate_window(&mut self, id: WindowId, force: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.control.is_none() {
            return;
        }
        let on_current = w.on_desktop(self.desktops.current());
        let desktop = w.desktop();
        let minimized = w.is_minimized();
        self.raise_window(id);
        if !on_current && desktop != 0 {
            self.set_current_desktop(desktop);
        }
        if minimized {
            self.unminimize(id, false);
        }
        if self.config.behavior.focus_policy.is_reasonable() || force {
            self.request_focus(id, false, force);
        }
    }

    /// Give focus to a window, redirecting to its modal dialog if it has one
    pub fn request_focus(&mut self, id: WindowId, raise: bool, force: bool) {
        let mut target = id;
        if let Some(modal) = self.find_modal(id)
            && modal != id
        {
            let desktop = self.windows.get(&id).map(|w| w.desktop()).unwrap_or(0);
            if desktop != 0 && !self.windows.get(&modal).is_some_and(|m| m.on_desktop(desktop)) {
                self.set_desktop(modal, desktop);
            }
            if raise {
                self.raise_window(id);
            }
            target = modal;
        }
        let Some(w) = self.windows.get(&target) else {
            return;
        };
        if !self.is_shown(target) {
            return;
        }
        let mut take_focus = true;
        if !force && (w.is_dock() || w.is_splash()) {
            take_focus = false;
        }
        let accepts = w.wants_input()
            && w
                .control
                .as_ref()
                .is_some_and(|c| c.rules.check_accept_focus(true, false));
        if !accepts {
            take_focus = false;
        }
        if w.is_shaded() && accepts {
            // A shaded window cannot take input but still becomes active.
            self.set_active(target, true);
            take_focus = false;
        }
        if take_focus {
            self.set_active(target, true);
        }
        if raise {
            self.raise_window(target);
        }
    }

    /// Pass focus on after `id` lost it (closed, hidden). Returns whether
    /// anything was done.
    pub fn activate_next_window(&mut self, id: Option<WindowId>) -> bool {
        if let Some(id) = id {
            if self.focus.active != Some(id) {
                return false;
            }
            self.set_active_window(None);
        }
        if !self.config.behavior.focus_policy.is_reasonable() {
            return false;
        }
        let desktop = self.desktops.current();
        let mut next = None;
        if self.showing_desktop {
            next = self.find_desktop_window(desktop);
        }
        if next.is_none()
            && let Some(id) = id
            && self.windows.get(&id).is_some_and(|w| w.is_transient())
        {
            let mains = self.main_windows(id);
            if mains.len() == 1 && self.is_usable_focus_candidate(mains[0], Some(id)) {
                next = Some(mains[0]);
                self.raise_window(mains[0]);
            }
        }
        if next.is_none() {
            next = self.next_for_desktop(id, desktop);
        }
        if next.is_none() {
            next = self.find_desktop_window(desktop);
        }
        if let Some(next) = next {
            self.request_focus(next, false, false);
        }
        true
    }

    fn is_usable_focus_candidate(&self, id: WindowId, previous: Option<WindowId>) -> bool {
        if Some(id) == previous {
            return false;
        }
        let Some(w) = self.windows.get(&id) else {
            return false;
        };
        let same_screen = !self.config.behavior.separate_screen_focus
            || previous
                .and_then(|p| self.windows.get(&p))
                .is_none_or(|p| p.screen == w.screen);
        self.is_shown(id) && w.on_desktop(self.desktops.current()) && same_screen
    }

    /// Most recently used window on a desktop that could take focus
    pub fn next_for_desktop(&self, reference: Option<WindowId>, desktop: u32) -> Option<WindowId> {
        self.focus.chain().find(|id| {
            Some(*id) != reference
                && self.windows.get(id).is_some_and(|w| w.on_desktop(desktop))
                && self.is_usable_focus_candidate(*id, reference)
        })
    }

    fn find_desktop_window(&self, desktop: u32) -> Option<WindowId> {
        self.stacking
            .order()
            .iter()
            .rev()
            .copied()
            .find(|id| {
                self.windows
                    .get(id)
                    .is_some_and(|w| w.is_desktop() && w.on_desktop(desktop) && w.control.is_some())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::shared::Geometry;

    fn square() -> Geometry {
        Geometry::new(0, 0, 100, 100)
    }

    #[test]
    fn activation_deactivates_previous() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, square());
        let b = manage_at(&mut comp, square());
        comp.activate_window(a, true);
        comp.activate_window(b, true);
        assert!(!comp.control(a).unwrap().active);
        assert!(comp.control(b).unwrap().active);
        assert_eq!(comp.active_window(), Some(b));
        assert_eq!(comp.focus.chain().collect::<Vec<_>>()[..2], [b, a]);
    }

    #[test]
    fn activating_a_lead_focuses_its_modal() {
        let mut comp = compositor();
        let lead = manage_at(&mut comp, square());
        let modal = manage_at(&mut comp, square());
        comp.add_transient(lead, modal);
        comp.set_modal(modal, true);
        comp.activate_window(lead, true);
        assert_eq!(comp.active_window(), Some(modal));
    }

    #[test]
    fn next_window_prefers_single_main_window() {
        let mut comp = compositor();
        let main = manage_at(&mut comp, square());
        let other = manage_at(&mut comp, square());
        let dialog = manage_at(&mut comp, square());
        comp.add_transient(main, dialog);
        comp.activate_window(other, true);
        comp.activate_window(dialog, true);
        assert!(comp.activate_next_window(Some(dialog)));
        assert_eq!(comp.active_window(), Some(main));
    }

    #[test]
    fn next_window_falls_back_to_focus_chain() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, square());
        let b = manage_at(&mut comp, square());
        comp.activate_window(a, true);
        comp.activate_window(b, true);
        assert!(comp.activate_next_window(Some(b)));
        assert_eq!(comp.active_window(), Some(a));
        assert!(!comp.activate_next_window(Some(b)));
    }

    #[test]
    fn attention_chain_tracks_requests() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, square());
        let b = manage_at(&mut comp, square());
        comp.demand_attention(a, true);
        comp.demand_attention(b, true);
        assert_eq!(comp.focus.attention().collect::<Vec<_>>(), vec![b, a]);
        comp.demand_attention(b, false);
        assert_eq!(comp.focus.attention().collect::<Vec<_>>(), vec![a]);
    }
}

//! Control block
//!
//! Per-window state that is not raw geometry: activation, minimize,
//! keep-above/below, skip flags, attention, shade, opacity, shortcut and the
//! management mirror handle. Every setter filters its candidate through the
//! window rules, no-ops when nothing changes, calls the protocol hook,
//! remembers rule values and emits a change event.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::compositor::Compositor;
use crate::wm::client_flags::{NetState, QuickTiles, ShadeMode};
use crate::wm::decorations::DecorationPalette;
use crate::wm::events::WindowEvent;
use crate::wm::management::ManagementWindow;
use crate::wm::moveresize::MoveResizeOp;
use crate::wm::rules::{RememberedState, RuleKind, WindowRules};
use crate::wm::stacking::StackingUpdatesBlocker;
use crate::wm::timers::TimerKind;
use crate::wm::window::WindowId;

/// Mutable per-window state of a managed window
#[derive(Debug, Default)]
pub struct Control {
    pub active: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub minimized: bool,
    pub fullscreen: bool,
    pub skip_taskbar: bool,
    /// Skip-taskbar as requested by the client, before rules
    pub original_skip_taskbar: bool,
    pub skip_pager: bool,
    pub skip_switcher: bool,
    pub demands_attention: bool,
    pub unresponsive: bool,
    pub shortcut: Option<char>,
    pub icon: Option<String>,
    pub palette: Option<Rc<DecorationPalette>>,
    pub management: Weak<RefCell<ManagementWindow>>,
    pub quicktiling: QuickTiles,
    /// Candidate quick-tile mode while dragging over an electric border
    pub electric: QuickTiles,
    pub electric_maximizing: bool,
    pub rules: WindowRules,
    pub move_resize: MoveResizeOp,
}

impl Control {
    pub fn new(rules: WindowRules) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }
}

impl Compositor {
    pub fn control(&self, id: WindowId) -> Option<&Control> {
        self.windows.get(&id).and_then(|w| w.control.as_ref())
    }

    pub(crate) fn control_mut(&mut self, id: WindowId) -> Option<&mut Control> {
        self.windows.get_mut(&id).and_then(|w| w.control.as_mut())
    }

    /// Set or clear NET state bits and push them to the wire
    pub(crate) fn set_net_state(&mut self, id: WindowId, flags: NetState, on: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let Some(net) = &mut w.net else {
            return;
        };
        let mut state = net.state;
        state.set(flags, on);
        if state == net.state {
            return;
        }
        net.state = state;
        self.backend.sync_net_state(w);
    }

    fn net_state_has(&self, id: WindowId, flags: NetState) -> Option<bool> {
        self.windows
            .get(&id)
            .and_then(|w| w.net)
            .map(|n| n.state.contains(flags))
    }

    /// Store live values into Remember rules
    pub(crate) fn update_window_rules(&mut self, id: WindowId, kind: RuleKind) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        if control.rules.is_empty() {
            return;
        }
        let state = RememberedState {
            position: w.pending_frame().pos(),
            size: w.pending_frame().size(),
            desktop: w.desktop(),
            screen: w.screen,
            max_mode: w.max_mode(),
            minimized: control.minimized,
            shaded: w.is_shaded(),
            skip_taskbar: control.skip_taskbar,
            skip_pager: control.skip_pager,
            skip_switcher: control.skip_switcher,
            keep_above: control.keep_above,
            keep_below: control.keep_below,
            fullscreen: control.fullscreen,
            no_border: w.no_border,
            shortcut: control.shortcut,
        };
        if let Some(control) = self.control_mut(id) {
            control.rules.update(kind, &state);
        }
    }

    pub fn set_keep_above(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_keep_above(set, false);
        if set && !control.rules.check_keep_below(false, false) {
            self.set_keep_below(id, false);
        }
        let Some(control) = self.control(id) else {
            return;
        };
        if set == control.keep_above {
            // Re-assert the wire state if the client changed it behind our back.
            if self.net_state_has(id, NetState::KEEP_ABOVE).is_some_and(|s| s != set) {
                self.set_net_state(id, NetState::KEEP_ABOVE, set);
            }
            return;
        }
        if let Some(control) = self.control_mut(id) {
            control.keep_above = set;
        }
        debug!("Window {} keep above {}", id, set);
        self.set_net_state(id, NetState::KEEP_ABOVE, set);
        self.update_layer(id);
        self.update_window_rules(id, RuleKind::Above);
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_keep_above(w);
        }
        self.emit(WindowEvent::KeepAboveChanged { id, set });
    }

    pub fn set_keep_below(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_keep_below(set, false);
        if set && !control.rules.check_keep_above(false, false) {
            self.set_keep_above(id, false);
        }
        let Some(control) = self.control(id) else {
            return;
        };
        if set == control.keep_below {
            if self.net_state_has(id, NetState::KEEP_BELOW).is_some_and(|s| s != set) {
                self.set_net_state(id, NetState::KEEP_BELOW, set);
            }
            return;
        }
        if let Some(control) = self.control_mut(id) {
            control.keep_below = set;
        }
        debug!("Window {} keep below {}", id, set);
        self.set_net_state(id, NetState::KEEP_BELOW, set);
        self.update_layer(id);
        self.update_window_rules(id, RuleKind::Below);
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_keep_below(w);
        }
        self.emit(WindowEvent::KeepBelowChanged { id, set });
    }

    /// Activate or deactivate. Deactivates the previously active window,
    /// moves the window to the front of the focus chain, recomputes the
    /// layer of the window and of fullscreen main windows.
    pub fn set_active(&mut self, id: WindowId, act: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        if control.active == act {
            return;
        }
        if let Some(control) = self.control_mut(id) {
            control.active = act;
        }
        debug!("Window {} active {}", id, act);

        self.apply_opacity_rules(id);

        if act {
            self.demand_attention(id, false);
            self.set_active_window(Some(id));
        } else if self.focus.active == Some(id) {
            self.set_active_window(None);
        }

        if !act {
            self.cancel_auto_raise(id);
            if self.windows.get(&id).is_some_and(|w| w.shade == ShadeMode::Activated) {
                self.set_shade(id, ShadeMode::Normal);
            }
        }

        {
            let mut comp = StackingUpdatesBlocker::new(self);
            comp.update_layer(id);
            for main in comp.main_windows(id) {
                if comp.windows.get(&main).is_some_and(|w| w.is_fullscreen()) {
                    comp.update_layer(main);
                }
            }
        }

        self.set_net_state(id, NetState::FOCUSED, act);
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_active(w);
        }
        self.emit(WindowEvent::ActiveChanged { id, active: act });
        if let Some(w) = self.windows.get(&id) {
            self.backend.update_mouse_grab(w);
        }
    }

    /// Request attention; meaningless (and forced off) for the active window
    pub fn demand_attention(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = set && !control.active;
        if control.demands_attention == set {
            return;
        }
        if let Some(control) = self.control_mut(id) {
            control.demands_attention = set;
        }
        self.set_net_state(id, NetState::DEMANDS_ATTENTION, set);
        self.focus.update_attention(id, set);
        self.emit(WindowEvent::DemandsAttentionChanged { id, set });
    }

    pub fn minimize(&mut self, id: WindowId, avoid_animation: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if !w.is_minimizable() || w.is_minimized() {
            return;
        }
        // ICCCM: an iconic shaded window reports Hidden, not Shaded.
        if w.is_shaded() {
            self.set_net_state(id, NetState::SHADED, false);
        }
        if let Some(control) = self.control_mut(id) {
            control.minimized = true;
        }
        debug!("Window {} minimized", id);
        self.set_net_state(id, NetState::HIDDEN, true);
        if self.control(id).is_some_and(|c| c.active) {
            self.set_active(id, false);
        }
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_minimize(w);
        }
        self.update_window_rules(id, RuleKind::Minimize);
        if let Some(frame) = self.windows.get(&id).map(|w| w.frame_geometry) {
            self.schedule_repaint(frame);
        }
        self.emit(WindowEvent::MinimizedChanged {
            id,
            minimized: true,
            animate: !avoid_animation,
        });
    }

    pub fn unminimize(&mut self, id: WindowId, avoid_animation: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        if !control.minimized {
            return;
        }
        if control.rules.check_minimize(false, false) {
            // A rule keeps it minimized.
            return;
        }
        if self.windows.get(&id).is_some_and(|w| w.is_shaded()) {
            self.set_net_state(id, NetState::SHADED, true);
        }
        if let Some(control) = self.control_mut(id) {
            control.minimized = false;
        }
        debug!("Window {} unminimized", id);
        self.set_net_state(id, NetState::HIDDEN, false);
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_minimize(w);
        }
        self.update_window_rules(id, RuleKind::Minimize);
        if let Some(frame) = self.windows.get(&id).map(|w| w.frame_geometry) {
            self.schedule_repaint(frame);
        }
        self.emit(WindowEvent::MinimizedChanged {
            id,
            minimized: false,
            animate: !avoid_animation,
        });
    }

    pub fn set_skip_taskbar(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_skip_taskbar(set, false);
        if control.skip_taskbar == set {
            return;
        }
        let was_wanted = self.wants_tab_focus(id);
        if let Some(control) = self.control_mut(id) {
            control.skip_taskbar = set;
        }
        self.set_net_state(id, NetState::SKIP_TASKBAR, set);
        self.update_window_rules(id, RuleKind::SkipTaskbar);
        if was_wanted != self.wants_tab_focus(id) {
            self.focus.update(id, self.wants_tab_focus(id));
        }
        self.emit(WindowEvent::SkipTaskbarChanged { id, set });
    }

    /// Skip-taskbar as the client asked for it; rules may still override
    pub fn set_original_skip_taskbar(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control_mut(id) else {
            return;
        };
        let set = control.rules.check_skip_taskbar(set, false);
        control.original_skip_taskbar = set;
        self.set_skip_taskbar(id, set);
    }

    pub fn set_skip_pager(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_skip_pager(set, false);
        if control.skip_pager == set {
            return;
        }
        if let Some(control) = self.control_mut(id) {
            control.skip_pager = set;
        }
        self.set_net_state(id, NetState::SKIP_PAGER, set);
        self.update_window_rules(id, RuleKind::SkipPager);
        self.emit(WindowEvent::SkipPagerChanged { id, set });
    }

    pub fn set_skip_switcher(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control(id) else {
            return;
        };
        let set = control.rules.check_skip_switcher(set, false);
        if control.skip_switcher == set {
            return;
        }
        let was_wanted = self.wants_tab_focus(id);
        if let Some(control) = self.control_mut(id) {
            control.skip_switcher = set;
        }
        self.set_net_state(id, NetState::SKIP_SWITCHER, set);
        self.update_window_rules(id, RuleKind::SkipSwitcher);
        if was_wanted != self.wants_tab_focus(id) {
            self.focus.update(id, self.wants_tab_focus(id));
        }
        self.emit(WindowEvent::SkipSwitcherChanged { id, set });
    }

    /// Window takes part in focus cycling
    pub fn wants_tab_focus(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| {
            w.control.as_ref().is_some_and(|c| !c.skip_switcher && !c.skip_taskbar)
                && w.wants_input()
                && !w.is_special()
        })
    }

    pub fn set_shortcut(&mut self, id: WindowId, shortcut: Option<char>) {
        let Some(control) = self.control_mut(id) else {
            return;
        };
        let shortcut = control.rules.check_shortcut(shortcut, false);
        if control.shortcut == shortcut {
            return;
        }
        control.shortcut = shortcut;
        self.update_window_rules(id, RuleKind::Shortcut);
        self.emit(WindowEvent::ShortcutChanged { id });
    }

    pub fn set_icon(&mut self, id: WindowId, icon: Option<String>) {
        let Some(control) = self.control_mut(id) else {
            return;
        };
        if control.icon == icon {
            return;
        }
        control.icon = icon;
        self.emit(WindowEvent::IconChanged { id });
    }

    pub fn set_caption(&mut self, id: WindowId, caption: &str) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        if w.caption == caption || w.control.is_none() {
            return;
        }
        w.caption = caption.to_string();
        self.emit(WindowEvent::CaptionChanged { id });
    }

    pub fn set_unresponsive(&mut self, id: WindowId, set: bool) {
        let Some(control) = self.control_mut(id) else {
            return;
        };
        if control.unresponsive == set {
            return;
        }
        control.unresponsive = set;
        self.emit(WindowEvent::UnresponsiveChanged { id, set });
    }

    pub fn set_opacity(&mut self, id: WindowId, opacity: f64) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let opacity = opacity.clamp(0.0, 1.0);
        if w.control.is_none() || (w.opacity - opacity).abs() < f64::EPSILON {
            return;
        }
        let old = w.opacity;
        w.opacity = opacity;
        let frame = w.frame_geometry;
        self.schedule_repaint(frame);
        self.emit(WindowEvent::OpacityChanged { id, old });
    }

    fn apply_opacity_rules(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let opacity = if control.active {
            control.rules.check_opacity_active(w.opacity, false)
        } else {
            control.rules.check_opacity_inactive(w.opacity, false)
        };
        self.set_opacity(id, opacity);
    }

    /// Shade, unshade, or switch between the temporary shade modes
    pub fn set_shade(&mut self, id: WindowId, mode: ShadeMode) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        if mode != ShadeMode::None && !w.is_shadeable() {
            return;
        }
        let mode = match (control.rules.check_shade(mode != ShadeMode::None, false), mode) {
            (false, _) => ShadeMode::None,
            (true, ShadeMode::None) => ShadeMode::Normal,
            (true, m) => m,
        };
        if w.shade == mode {
            return;
        }
        let was_shaded = w.is_shaded();
        if let Some(w) = self.windows.get_mut(&id) {
            w.shade = mode;
        }
        let shaded = mode.is_shaded();
        if was_shaded != shaded {
            let frame = self.windows.get(&id).map(|w| w.pending_frame()).unwrap_or_default();
            self.set_frame_geometry(id, frame, true);
            self.set_net_state(id, NetState::SHADED, shaded);
            self.update_window_rules(id, RuleKind::Shade);
        }
        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_shade(w);
        }
        debug!("Window {} shade {:?}", id, mode);
        self.emit(WindowEvent::ShadeChanged { id, mode });
    }

    /// Arm the auto-raise timer, replacing a pending one
    pub fn start_auto_raise(&mut self, id: WindowId) {
        if self.control(id).is_none() {
            return;
        }
        let interval = Duration::from_millis(self.config.behavior.auto_raise_interval_ms);
        self.timers.start(id, TimerKind::AutoRaise, self.now, interval);
    }

    pub fn cancel_auto_raise(&mut self, id: WindowId) {
        self.timers.cancel(id, TimerKind::AutoRaise);
    }

    pub(crate) fn auto_raise(&mut self, id: WindowId) {
        self.raise_window(id);
        self.cancel_auto_raise(id);
    }

    /// Ask the client to close
    pub fn close_window(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let closeable = w.is_closeable()
            && w.control
                .as_ref()
                .is_some_and(|c| c.rules.check_closeable(true, false));
        if !closeable {
            return;
        }
        debug!("Closing window {}", id);
        self.backend.close(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::shared::Geometry;
    use crate::wm::rules::{Rule, RulePolicy, Rules};

    mod keep_above_below {
        use super::*;

        #[test]
        fn above_clears_below_and_back() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));

            comp.set_keep_below(id, true);
            comp.set_keep_above(id, true);
            assert!(comp.control(id).unwrap().keep_above);
            assert!(!comp.control(id).unwrap().keep_below);

            comp.set_keep_below(id, true);
            assert!(comp.control(id).unwrap().keep_below);
            assert!(!comp.control(id).unwrap().keep_above);
        }

        #[test]
        fn forced_rule_wins_over_request() {
            let mut comp = compositor();
            comp.rule_book.push(Rules {
                above: Rule::new(RulePolicy::Force, false),
                ..Default::default()
            });
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.set_keep_above(id, true);
            assert!(!comp.control(id).unwrap().keep_above);
        }

        #[test]
        fn drifted_wire_state_is_reasserted() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.set_keep_above(id, true);
            if let Some(net) = comp.windows.get_mut(&id).and_then(|w| w.net.as_mut()) {
                net.state.remove(NetState::KEEP_ABOVE);
            }
            comp.set_keep_above(id, true);
            let state = comp.window(id).unwrap().net.unwrap().state;
            assert!(state.contains(NetState::KEEP_ABOVE));
        }
    }

    mod attention {
        use super::*;

        #[test]
        fn active_window_never_demands_attention() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            let b = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.activate_window(a, true);
            comp.demand_attention(a, true);
            assert!(!comp.control(a).unwrap().demands_attention);
            comp.demand_attention(b, true);
            assert!(comp.control(b).unwrap().demands_attention);
            comp.activate_window(b, true);
            assert!(!comp.control(b).unwrap().demands_attention);
        }
    }

    mod minimize {
        use super::*;

        #[test]
        fn minimizing_active_window_clears_active_reference() {
            let mut comp = compositor();
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.activate_window(id, true);
            assert_eq!(comp.active_window(), Some(id));

            comp.minimize(id, false);
            assert!(comp.control(id).unwrap().minimized);
            assert!(!comp.control(id).unwrap().active);
            assert_eq!(comp.active_window(), None);
        }

        #[test]
        fn rule_can_keep_window_minimized() {
            let mut comp = compositor();
            comp.rule_book.push(Rules {
                minimize: Rule::new(RulePolicy::Force, true),
                ..Default::default()
            });
            let id = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.minimize(id, true);
            comp.unminimize(id, true);
            assert!(comp.control(id).unwrap().minimized);
        }

        #[test]
        fn hidden_and_shaded_follow_icccm() {
            let mut comp = compositor();
            let mut request = crate::wm::manage::ManageRequest::new(
                crate::wm::client_flags::WindowType::Normal,
                Geometry::new(10, 40, 300, 200),
            );
            request.size_hints.user_position = true;
            let id = comp.take_control(request);
            comp.set_shade(id, ShadeMode::Normal);
            let state = comp.window(id).unwrap().net.unwrap().state;
            assert!(state.contains(NetState::SHADED));

            comp.minimize(id, true);
            let state = comp.window(id).unwrap().net.unwrap().state;
            assert!(state.contains(NetState::HIDDEN));
            assert!(!state.contains(NetState::SHADED));

            comp.unminimize(id, true);
            let state = comp.window(id).unwrap().net.unwrap().state;
            assert!(state.contains(NetState::SHADED));
            assert!(!state.contains(NetState::HIDDEN));
        }
    }

    mod shade {
        use super::*;

        #[test]
        fn shading_collapses_and_restores_frame() {
            let mut comp = compositor();
            let mut request = crate::wm::manage::ManageRequest::new(
                crate::wm::client_flags::WindowType::Normal,
                Geometry::new(10, 40, 300, 200),
            );
            request.size_hints.user_position = true;
            let id = comp.take_control(request);
            let full = comp.window(id).unwrap().frame_geometry;

            comp.set_shade(id, ShadeMode::Normal);
            let w = comp.window(id).unwrap();
            assert_eq!(w.frame_geometry.height, w.frame_margins().vertical());
            assert_eq!(w.client_geometry().height, 0);

            comp.set_shade(id, ShadeMode::None);
            assert_eq!(comp.window(id).unwrap().frame_geometry, full);
        }
    }

    mod auto_raise {
        use super::*;

        #[test]
        fn timer_raises_once_and_restarts_cancel_previous() {
            let mut comp = compositor();
            let a = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            let b = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            assert_eq!(comp.stacking_order(), vec![a, b]);

            comp.start_auto_raise(a);
            comp.advance(Duration::from_millis(500));
            comp.start_auto_raise(a);
            comp.advance(Duration::from_millis(500));
            assert_eq!(comp.stacking_order(), vec![a, b]);
            comp.advance(Duration::from_millis(300));
            assert_eq!(comp.stacking_order(), vec![b, a]);
            assert!(!comp.timers.is_active(a, TimerKind::AutoRaise));
        }
    }

    mod opacity {
        use super::*;

        #[test]
        fn rules_drive_active_and_inactive_opacity() {
            let mut comp = compositor();
            comp.rule_book.push(Rules {
                opacity_active: Rule::new(RulePolicy::Force, 1.0),
                opacity_inactive: Rule::new(RulePolicy::Force, 0.5),
                ..Default::default()
            });
            let a = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            let b = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
            comp.activate_window(a, true);
            comp.activate_window(b, true);
            assert_eq!(comp.window(a).unwrap().opacity, 0.5);
            assert_eq!(comp.window(b).unwrap().opacity, 1.0);
        }
    }
}

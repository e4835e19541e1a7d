//! Workspace Module
//!
//! Virtual desktops and window membership. Desktop ids run from 1 to
//! `count`; an empty membership set means the window is on all desktops.

use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::config::DesktopConfig;
use crate::wm::client_flags::{NetState, ProtocolKind};
use crate::wm::events::WindowEvent;
use crate::wm::rules::RuleKind;
use crate::wm::stacking::StackingUpdatesBlocker;
use crate::wm::window::WindowId;

/// Virtual desktop layout
#[derive(Debug, Clone)]
pub struct VirtualDesktops {
    count: u32,
    current: u32,
    names: Vec<String>,
    rows: u32,
}

impl VirtualDesktops {
    pub fn new(config: &DesktopConfig) -> Self {
        let count = config.count.max(1);
        let names = (1..=count)
            .map(|d| {
                config
                    .names
                    .get(d as usize - 1)
                    .cloned()
                    .unwrap_or_else(|| format!("Desktop {}", d))
            })
            .collect();
        Self {
            count,
            current: 1,
            names,
            rows: config.rows.clamp(1, count),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn name(&self, desktop: u32) -> Option<&str> {
        self.names.get(desktop.checked_sub(1)? as usize).map(String::as_str)
    }

    pub fn contains(&self, desktop: u32) -> bool {
        (1..=self.count).contains(&desktop)
    }

    /// Following desktop, wrapping around
    pub fn next(&self, desktop: u32) -> u32 {
        if desktop >= self.count { 1 } else { desktop + 1 }
    }

    /// Preceding desktop, wrapping around
    pub fn previous(&self, desktop: u32) -> u32 {
        if desktop <= 1 { self.count } else { desktop - 1 }
    }
}

impl Compositor {
    /// Replace a window's desktop set. X11 windows keep only the last one.
    /// Transients follow; a modal transient drags its leads along.
    pub fn set_desktops(&mut self, id: WindowId, desktops: Vec<u32>) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let mut desktops: Vec<u32> = desktops
            .into_iter()
            .filter(|d| self.desktops.contains(*d))
            .collect();
        desktops.dedup();
        if w.protocol == ProtocolKind::X11 && desktops.len() > 1 {
            desktops = desktops.split_off(desktops.len() - 1);
        }
        let legacy = desktops.last().copied().unwrap_or(0);
        let checked = control.rules.check_desktop(legacy, false);
        if checked != legacy {
            desktops = if checked == 0 { Vec::new() } else { vec![checked] };
        }
        if desktops == w.desktops {
            return;
        }
        let current = self.desktops.current();
        let was_desktop = w.desktop();
        let was_on_current = w.on_desktop(current);
        let is_modal = w.is_modal();
        debug!("Window {} desktops {:?}", id, desktops);

        if let Some(w) = self.windows.get_mut(&id) {
            w.desktops = desktops.clone();
            let legacy = w.desktop();
            if let Some(net) = &mut w.net {
                net.desktop = legacy;
                net.state.set(NetState::STICKY, w.desktops.is_empty());
            }
        }
        if let Some(w) = self.windows.get(&id) {
            self.backend.sync_net_state(w);
        }

        let children = self
            .windows
            .get(&id)
            .map(|w| w.transient.children.clone())
            .unwrap_or_default();
        for child in self.ensure_stacking_order(&children) {
            self.set_desktops(child, desktops.clone());
        }
        if is_modal {
            for lead in self.main_windows(id) {
                self.set_desktops(lead, desktops.clone());
            }
        }

        if let Some(w) = self.windows.get(&id) {
            self.backend.do_set_desktop(w);
        }
        self.focus.make_first(id);
        self.update_window_rules(id, RuleKind::Desktop);
        if let Some(frame) = self.windows.get(&id).map(|w| w.frame_geometry) {
            self.schedule_repaint(frame);
        }
        self.emit(WindowEvent::DesktopChanged { id });
        let on_current = self.windows.get(&id).is_some_and(|w| w.on_desktop(current));
        if was_on_current != on_current {
            self.emit(WindowEvent::DesktopPresenceChanged {
                id,
                previous: was_desktop,
            });
            if !on_current && self.focus.active == Some(id) {
                self.activate_next_window(Some(id));
            }
        }
    }

    /// Put a window on one desktop, 0 meaning all desktops
    pub fn set_desktop(&mut self, id: WindowId, desktop: u32) {
        if desktop == 0 {
            self.set_desktops(id, Vec::new());
        } else if self.desktops.contains(desktop) {
            self.set_desktops(id, vec![desktop]);
        } else {
            warn!("Invalid desktop {} for window {}", desktop, id);
        }
    }

    pub fn set_on_all_desktops(&mut self, id: WindowId, set: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.on_all_desktops() == set {
            return;
        }
        if set {
            self.set_desktops(id, Vec::new());
        } else {
            let current = self.desktops.current();
            self.set_desktops(id, vec![current]);
        }
    }

    /// Add one desktop to the window's set
    pub fn enter_desktop(&mut self, id: WindowId, desktop: u32) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.on_all_desktops() || w.desktops.contains(&desktop) {
            return;
        }
        let mut desktops = w.desktops.clone();
        desktops.push(desktop);
        self.set_desktops(id, desktops);
    }

    /// Remove one desktop from the window's set; on-all-desktops windows
    /// expand to every other desktop first
    pub fn leave_desktop(&mut self, id: WindowId, desktop: u32) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let current: Vec<u32> = if w.on_all_desktops() {
            (1..=self.desktops.count()).collect()
        } else {
            w.desktops.clone()
        };
        if !current.contains(&desktop) {
            return;
        }
        let desktops = current.into_iter().filter(|d| *d != desktop).collect();
        self.set_desktops(id, desktops);
    }

    pub fn is_on_current_desktop(&self, id: WindowId) -> bool {
        self.windows
            .get(&id)
            .is_some_and(|w| w.on_desktop(self.desktops.current()))
    }

    /// Switch desktops. The window being moved comes along; focus passes to
    /// the most recently used window on the new desktop.
    pub fn set_current_desktop(&mut self, desktop: u32) {
        if !self.desktops.contains(desktop) || desktop == self.desktops.current() {
            return;
        }
        let previous = self.desktops.current();
        info!("Switching from desktop {} to {}", previous, desktop);
        let mut comp = StackingUpdatesBlocker::new(self);
        comp.desktops.current = desktop;

        if let Some(moving) = comp.move_resize_window
            && comp.windows.get(&moving).is_some_and(|w| !w.on_all_desktops())
        {
            comp.set_desktop(moving, desktop);
        }

        let bounding = comp.screens.bounding();
        comp.schedule_repaint(bounding);

        let active_stays = comp
            .focus
            .active
            .is_some_and(|a| comp.windows.get(&a).is_some_and(|w| w.on_desktop(desktop)));
        if !active_stays {
            let next = comp.next_for_desktop(None, desktop);
            match next {
                Some(next) => comp.request_focus(next, false, false),
                None => comp.set_active_window(None),
            }
        }
        drop(comp);
        self.emit(WindowEvent::CurrentDesktopChanged {
            previous,
            current: desktop,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::shared::Geometry;
    use crate::wm::manage::ManageRequest;
    use crate::wm::client_flags::WindowType;

    fn square() -> Geometry {
        Geometry::new(0, 0, 100, 100)
    }

    fn manage_wayland(comp: &mut Compositor) -> WindowId {
        let mut request = ManageRequest::new(WindowType::Normal, square());
        request.protocol = ProtocolKind::Wayland;
        request.no_border = true;
        request.size_hints.user_position = true;
        comp.take_control(request)
    }

    #[test]
    fn desktop_names_default_and_wrap() {
        let desktops = VirtualDesktops::new(&DesktopConfig {
            count: 3,
            names: vec!["Mail".into()],
            rows: 1,
        });
        assert_eq!(desktops.name(1), Some("Mail"));
        assert_eq!(desktops.name(3), Some("Desktop 3"));
        assert_eq!(desktops.name(0), None);
        assert_eq!(desktops.next(3), 1);
        assert_eq!(desktops.previous(1), 3);
    }

    #[test]
    fn x11_windows_keep_only_the_last_desktop() {
        let mut comp = compositor();
        let id = manage_at(&mut comp, square());
        comp.set_desktops(id, vec![2, 3]);
        assert_eq!(comp.window(id).unwrap().desktops, vec![3]);
        assert_eq!(comp.window(id).unwrap().net.unwrap().desktop, 3);
    }

    #[test]
    fn wayland_windows_keep_several_desktops() {
        let mut comp = compositor();
        let id = manage_wayland(&mut comp);
        comp.set_desktops(id, vec![1, 2]);
        comp.enter_desktop(id, 4);
        assert_eq!(comp.window(id).unwrap().desktops, vec![1, 2, 4]);
        comp.leave_desktop(id, 2);
        assert_eq!(comp.window(id).unwrap().desktops, vec![1, 4]);
    }

    #[test]
    fn leaving_from_all_desktops_expands_first() {
        let mut comp = compositor();
        let id = manage_wayland(&mut comp);
        comp.set_on_all_desktops(id, true);
        comp.leave_desktop(id, 1);
        assert_eq!(comp.window(id).unwrap().desktops, vec![2, 3, 4]);
    }

    #[test]
    fn transients_follow_and_modals_drag_leads() {
        let mut comp = compositor();
        let lead = manage_at(&mut comp, square());
        let child = manage_at(&mut comp, square());
        comp.add_transient(lead, child);
        comp.set_desktop(lead, 2);
        assert_eq!(comp.window(child).unwrap().desktops, vec![2]);

        comp.set_modal(child, true);
        comp.set_desktop(child, 3);
        assert_eq!(comp.window(lead).unwrap().desktops, vec![3]);
    }

    #[test]
    fn switching_desktop_moves_focus() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, square());
        let b = manage_at(&mut comp, square());
        comp.set_desktop(b, 2);
        comp.activate_window(b, true);
        assert_eq!(comp.current_desktop(), 2);
        comp.set_current_desktop(1);
        assert_eq!(comp.active_window(), Some(a));
    }
}

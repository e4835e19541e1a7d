//! Compositor Module
//!
//! The explicit context object every window operation runs against: the
//! window arena, stacking order, focus chain, screens, desktops, rules,
//! timers and the protocol/renderer collaborators. All mutation happens on
//! one thread through `&mut Compositor`.

pub mod cursor;
pub mod renderer;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{info, trace};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::backend::{NullBackend, ProtocolBackend};
use crate::wm::decorations::PaletteCache;
use crate::wm::events::{ObserverId, Signals, WindowEvent};
use crate::wm::focus::FocusChain;
use crate::wm::group::Groups;
use crate::wm::management::ManagementRegistry;
use crate::wm::placement::Placement;
use crate::wm::rules::Rules;
use crate::wm::screen::Screens;
use crate::wm::stacking::StackingOrder;
use crate::wm::timers::{TimerKind, Timers};
use crate::wm::window::{Window, WindowId};
use crate::wm::workspace::VirtualDesktops;
use cursor::Cursor;
use renderer::{NullRenderer, Renderer};

pub struct Compositor {
    pub(crate) config: Config,
    pub(crate) windows: HashMap<WindowId, Window>,
    next_id: u64,
    pub(crate) stacking: StackingOrder,
    pub(crate) focus: FocusChain,
    pub(crate) screens: Screens,
    pub(crate) desktops: VirtualDesktops,
    pub(crate) groups: Groups,
    pub(crate) rule_book: Vec<Rules>,
    pub(crate) palettes: PaletteCache,
    pub(crate) management: ManagementRegistry,
    pub(crate) timers: Timers,
    pub(crate) cursor: Cursor,
    pub(crate) placement: Placement,
    pub(crate) signals: Signals,
    pub(crate) backend: Box<dyn ProtocolBackend>,
    pub(crate) renderer: Box<dyn Renderer>,
    pub(crate) now: Instant,
    pub(crate) showing_desktop: bool,
    /// Remnants whose count reached zero, reclaimed on the next dispatch
    pub(crate) pending_deletes: Vec<WindowId>,
    /// Window with an interactive move/resize in progress
    pub(crate) move_resize_window: Option<WindowId>,
}

impl Compositor {
    /// Create a new compositor context
    pub fn new(
        config: Config,
        backend: Box<dyn ProtocolBackend>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        info!("Initializing window core");
        let screens = Screens::new(config.output_geometries());
        let desktops = VirtualDesktops::new(&config.desktops);
        let palettes = PaletteCache::new(&config.decorations.palette, config.palettes.clone());
        let rule_book = config.rules.clone();
        Self {
            config,
            windows: HashMap::new(),
            next_id: 1,
            stacking: StackingOrder::new(),
            focus: FocusChain::new(),
            screens,
            desktops,
            groups: Groups::new(),
            rule_book,
            palettes,
            management: ManagementRegistry::new(),
            timers: Timers::new(),
            cursor: Cursor::new(),
            placement: Placement::new(),
            signals: Signals::new(),
            backend,
            renderer,
            now: Instant::now(),
            showing_desktop: false,
            pending_deletes: Vec::new(),
            move_resize_window: None,
        }
    }

    /// Context with no display connection and no scene
    pub fn headless(config: Config) -> Self {
        Self::new(config, Box::new(NullBackend::new()), Box::new(NullRenderer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Every window in the arena, managed and remnant, in id order
    pub fn windows(&self) -> Vec<&Window> {
        let mut all: Vec<_> = self.windows.values().collect();
        all.sort_by_key(|w| w.id);
        all
    }

    /// Managed windows with a control block, in id order
    pub fn managed_windows(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.control.is_some())
            .map(|w| w.id)
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn allocate_id(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn connect(&mut self, observer: impl FnMut(&WindowEvent) + 'static) -> ObserverId {
        self.signals.connect(Box::new(observer))
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.signals.disconnect(id)
    }

    /// Notify observers; the management mirror is refreshed first so shell
    /// clients see the state the event describes
    pub(crate) fn emit(&mut self, event: WindowEvent) {
        if let Some(id) = event.window() {
            self.sync_management(id);
        }
        trace!(?event, "emit");
        self.signals.emit(&event);
    }

    pub(crate) fn schedule_repaint(&mut self, region: Geometry) {
        if region.is_valid() {
            self.renderer.schedule_repaint(region);
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Update the clock without running timers
    pub fn set_time(&mut self, now: Instant) {
        self.now = now;
    }

    /// Advance the clock and run whatever became due
    pub fn advance(&mut self, by: Duration) {
        let now = self.now + by;
        self.dispatch(now);
    }

    /// One event-loop turn: deferred deletions, due timers, shell requests
    pub fn dispatch(&mut self, now: Instant) {
        self.now = now;
        self.process_pending_deletes();
        for (id, kind) in self.timers.take_due(now) {
            match kind {
                TimerKind::AutoRaise => self.auto_raise(id),
                TimerKind::ElectricMaximizing => self.electric_maximizing_delay_elapsed(id),
                TimerKind::DelayedMoveResize => self.delayed_move_resize_elapsed(id),
                TimerKind::AnnexedTimeout => self.remnant_annexed_timeout(id),
            }
        }
        self.process_pending_deletes();
        self.process_management_requests();
    }

    pub fn cursor_pos(&self) -> crate::shared::Point {
        self.cursor.pos
    }

    pub fn cursor_shape(&self) -> cursor::CursorShape {
        self.cursor.shape
    }

    pub fn current_desktop(&self) -> u32 {
        self.desktops.current()
    }

    pub fn desktop_count(&self) -> u32 {
        self.desktops.count()
    }

    pub fn screens(&self) -> &Screens {
        &self.screens
    }

    pub fn showing_desktop(&self) -> bool {
        self.showing_desktop
    }

    /// Show-desktop mode lifts the desktop window above everything
    pub fn set_showing_desktop(&mut self, showing: bool) {
        if self.showing_desktop == showing {
            return;
        }
        self.showing_desktop = showing;
        let desktops: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.is_desktop())
            .map(|w| w.id)
            .collect();
        let mut comp = crate::wm::stacking::StackingUpdatesBlocker::new(self);
        for id in desktops {
            comp.update_layer(id);
        }
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("windows", &self.windows.len())
            .field("stacking", &self.stacking)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::wm::client_flags::WindowType;
    use crate::wm::manage::ManageRequest;

    pub(crate) fn compositor() -> Compositor {
        Compositor::headless(Config::default())
    }

    /// Manage an undecorated normal window whose frame is exactly `geometry`
    pub(crate) fn manage_at(comp: &mut Compositor, geometry: Geometry) -> WindowId {
        manage_typed(comp, WindowType::Normal, geometry)
    }

    pub(crate) fn manage_typed(
        comp: &mut Compositor,
        window_type: WindowType,
        geometry: Geometry,
    ) -> WindowId {
        let mut request = ManageRequest::new(window_type, geometry);
        request.no_border = true;
        request.size_hints.user_position = true;
        comp.take_control(request)
    }

    #[test]
    fn ids_are_never_reused() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        comp.release_window(a);
        comp.advance(Duration::from_secs(1));
        let b = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn observers_see_added_windows() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut comp = compositor();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        comp.connect(move |e| {
            if let WindowEvent::Added { id } = e {
                sink.borrow_mut().push(*id);
            }
        });
        let a = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        assert_eq!(*seen.borrow(), vec![a]);
    }
}

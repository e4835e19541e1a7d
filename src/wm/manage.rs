//! Manage Module
//!
//! Taking control of a newly mapped window and releasing it again. Taking
//! control runs the whole initial setup under one stacking blocker: rules,
//! desktops, decoration, initial geometry and placement, initial states,
//! stacking insertion and the management mirror. Releasing tears the same
//! state down and leaves a remnant behind when effects want one.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::shared::{Geometry, Margins, Point};
use crate::wm::client_flags::{Actions, MaximizeMode, NetState, ProtocolKind, WindowType};
use crate::wm::control::Control;
use crate::wm::events::WindowEvent;
use crate::wm::geometry::GeometryUpdatesBlocker;
use crate::wm::group::GroupId;
use crate::wm::hints::{SizeHints, SizeMode};
use crate::wm::rules::WindowRules;
use crate::wm::screen::{ClientAreaOption, check_offscreen_position};
use crate::wm::session::SessionInfo;
use crate::wm::stacking::StackingUpdatesBlocker;
use crate::wm::window::{Window, WindowId};

/// Everything the protocol layer parsed about a window that is about to be
/// managed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManageRequest {
    pub protocol: ProtocolKind,
    pub window_type: WindowType,
    /// Client rectangle as requested
    pub geometry: Geometry,
    pub xid: Option<u32>,
    pub caption: String,
    pub app_id: String,
    pub no_border: bool,
    pub size_hints: SizeHints,
    pub actions: Actions,
    /// Initial NET state read from the window
    pub net_state: NetState,
    /// Requested desktops; `Some(vec![])` asks for all desktops
    pub desktops: Option<Vec<u32>>,
    /// Window was already mapped when the manager started
    pub mapped: bool,
    /// Iconic initial mapping state
    pub minimized: bool,
    pub lead: Option<WindowId>,
    pub group: Option<GroupId>,
    pub group_transient: bool,
    pub strut: Option<Margins>,
    /// Position relative to the lead, for popups
    pub placement_hint: Option<Point>,
    /// Client position to honor, overriding the geometry's position
    pub position_hint: Option<Point>,
    pub palette: Option<String>,
    pub session: Option<SessionInfo>,
    pub activate: bool,
}

impl Default for ManageRequest {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::X11,
            window_type: WindowType::Normal,
            geometry: Geometry::default(),
            xid: None,
            caption: String::new(),
            app_id: String::new(),
            no_border: false,
            size_hints: SizeHints::default(),
            actions: Actions::default(),
            net_state: NetState::empty(),
            desktops: None,
            mapped: false,
            minimized: false,
            lead: None,
            group: None,
            group_transient: false,
            strut: None,
            placement_hint: None,
            position_hint: None,
            palette: None,
            session: None,
            activate: false,
        }
    }
}

impl ManageRequest {
    pub fn new(window_type: WindowType, geometry: Geometry) -> Self {
        Self {
            window_type,
            geometry,
            ..Default::default()
        }
    }

    fn has_position(&self) -> bool {
        self.position_hint.is_some()
            || self.size_hints.user_position
            || self.size_hints.program_position
    }
}

impl Compositor {
    /// Manage a new window. Always succeeds; returns the new arena id.
    pub fn take_control(&mut self, request: ManageRequest) -> WindowId {
        let id = self.allocate_id();
        let mut w = Window::new(id, request.protocol, request.window_type);
        w.xid = request.xid;
        w.caption = request.caption.clone();
        w.app_id = request.app_id.clone();
        w.size_hints = request.size_hints;
        w.actions = request.actions;
        w.strut = request.strut;
        w.placement_hint = request.placement_hint;
        w.position_hint = request.position_hint;
        w.no_border = request.no_border;
        let rules = WindowRules::matching(
            &self.rule_book,
            &request.app_id,
            &request.caption,
            request.window_type,
        );
        w.control = Some(Control::new(rules));
        self.windows.insert(id, w);
        info!(
            "Managing window {} ({:?}, {:?})",
            id, request.window_type, request.app_id
        );

        let mut comp = StackingUpdatesBlocker::new(self);
        let session = request.session.clone();
        let init = !request.mapped;

        if let Some(lead) = request.lead {
            comp.add_transient(lead, id);
        }
        if let Some(group) = request.group {
            comp.set_group(id, Some(group));
        }
        if request.group_transient {
            comp.set_group_transient(id, true);
        }
        if request.net_state.contains(NetState::MODAL) {
            comp.set_modal(id, true);
        }

        let mut init_minimize = request.minimized || request.net_state.contains(NetState::HIDDEN);
        if let Some(info) = &session {
            init_minimize = info.minimized;
            if let Some(w) = comp.windows.get_mut(&id) {
                w.no_border = info.no_border;
            }
        }
        let shortcut = session.as_ref().and_then(|s| s.shortcut);
        let (shortcut, init_minimize, no_border) = {
            let Some(control) = comp.control(id) else {
                return id;
            };
            let no_border = comp.windows.get(&id).is_some_and(|w| w.no_border);
            (
                control.rules.check_shortcut(shortcut, true),
                control.rules.check_minimize(init_minimize, init),
                control.rules.check_no_border(no_border, init),
            )
        };
        comp.set_shortcut(id, shortcut);
        if let Some(w) = comp.windows.get_mut(&id) {
            w.no_border = no_border;
        }

        comp.init_desktops(id, &request, session.as_ref());

        let palette = request.palette.clone().unwrap_or_default();
        comp.set_palette(id, &palette);

        let area = {
            let mut comp = GeometryUpdatesBlocker::new(&mut comp, id);
            comp.update_decoration(id);
            let frame = match &session {
                Some(info) => info.geometry,
                None => comp.initial_frame(id, &request),
            };
            comp.set_frame_geometry(id, frame, false);
            if session.is_some() {
                comp.place_session(id)
            } else if request.mapped {
                comp.place_mapped(id)
            } else {
                comp.place_unmapped(id, &request)
            }
        };

        // A transient of a visible lead is never minimized initially; one
        // whose leads are all hidden follows them.
        let mut init_minimize = init_minimize;
        let leads = comp.leads(id);
        if init_minimize && leads.iter().any(|l| comp.is_shown(*l)) {
            init_minimize = false;
        }
        if !init_minimize && !leads.is_empty() && !leads.iter().any(|l| comp.is_shown(*l)) {
            init_minimize = true;
            comp.demand_attention(id, true);
        }
        if init_minimize {
            comp.minimize(id, true);
        }

        match &session {
            Some(info) => comp.apply_session_states(id, info, area),
            None => comp.apply_initial_states(id, &request, init),
        }

        comp.stacking.add(id);
        if let Some(index) = session.as_ref().and_then(|s| s.stacking_order) {
            comp.restore_session_stacking_order(id, index);
        }
        let wanted = comp.wants_tab_focus(id);
        comp.focus.update(id, wanted);
        let c: &mut Compositor = &mut comp;
        if let Some(w) = c.windows.get(&id) {
            c.backend.update_mouse_grab(w);
        }
        drop(comp);

        self.setup_management(id);
        self.emit(WindowEvent::Added { id });

        let activate = match &session {
            Some(info) => info.active,
            None => request.activate,
        };
        if activate {
            let special = self.windows.get(&id).is_none_or(|w| w.is_special());
            if self.is_on_current_desktop(id) {
                if !special {
                    self.activate_window(id, false);
                }
            } else if !special {
                self.demand_attention(id, true);
            }
        }
        if request.strut.is_some() {
            self.check_workspace_positions(Some(id));
        }
        id
    }

    /// Initial desktops: the session's, the request's, or the lead's for
    /// transients. Desktop windows are everywhere by default.
    fn init_desktops(
        &mut self,
        id: WindowId,
        request: &ManageRequest,
        session: Option<&SessionInfo>,
    ) {
        let current = self.desktops.current();
        let mut desktops: Vec<u32> = match (session, &request.desktops) {
            (Some(info), _) if info.desktop == 0 => Vec::new(),
            (Some(info), _) => vec![info.desktop],
            (None, _) if !self.leads(id).is_empty() => {
                let leads = self.leads(id);
                if leads
                    .iter()
                    .any(|l| self.windows.get(l).is_some_and(|w| w.on_all_desktops()))
                {
                    Vec::new()
                } else if leads.iter().any(|l| self.is_on_current_desktop(*l)) {
                    vec![current]
                } else {
                    leads
                        .last()
                        .and_then(|l| self.windows.get(l))
                        .map(|w| w.desktops.clone())
                        .unwrap_or_else(|| vec![current])
                }
            }
            (None, Some(requested)) => requested.clone(),
            (None, None) => vec![current],
        };
        if session.is_none()
            && request.desktops.is_none()
            && self.windows.get(&id).is_some_and(|w| w.is_desktop())
        {
            desktops.clear();
        }
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let legacy = desktops.last().copied().unwrap_or(0);
        let checked = control.rules.check_desktop(legacy, !request.mapped);
        if checked != legacy {
            desktops = if checked == 0 { Vec::new() } else { vec![checked] };
        }
        let count = self.desktops.count();
        desktops = desktops.into_iter().map(|d| d.clamp(1, count)).collect();
        desktops.dedup();
        if w.protocol == ProtocolKind::X11 && desktops.len() > 1 {
            desktops = desktops.split_off(desktops.len() - 1);
        }
        debug!("Window {} starts on desktops {:?}", id, desktops);
        if let Some(w) = self.windows.get_mut(&id) {
            w.desktops = desktops;
            let legacy = w.desktop();
            let all = w.desktops.is_empty();
            if let Some(net) = &mut w.net {
                net.desktop = legacy;
                net.state.set(NetState::STICKY, all);
            }
        }
    }

    /// Frame for the requested client rectangle, size hints applied
    fn initial_frame(&self, id: WindowId, request: &ManageRequest) -> Geometry {
        let Some(w) = self.windows.get(&id) else {
            return request.geometry;
        };
        let mut client = request.geometry;
        if let Some(pos) = request.position_hint {
            client = client.moved_to(pos);
        }
        let pos = w.client_to_frame_pos(client.pos());
        let size = self.size_for_client_size(id, client.size(), SizeMode::Any, false);
        Geometry::from_parts(pos, size)
    }

    /// Splash screens ignore their position unless a rule says otherwise
    fn ignores_position_by_default(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.is_splash())
    }

    /// Apply the size rule and the size hints to the pending frame
    fn resize_on_taking_control(&mut self, id: WindowId, init: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let frame = w.pending_frame();
        let adjusted = self.adjusted_frame_size(id, frame.size(), SizeMode::Any);
        let size = match self.control(id) {
            Some(control) => control.rules.check_size(adjusted, init),
            None => adjusted,
        };
        self.set_frame_geometry(id, frame.with_size(size), false);
    }

    /// Move to a rule-forced position. Returns the full area the window is
    /// then allowed to occupy.
    fn move_with_force_rule(&mut self, id: WindowId, init: bool) -> Option<Geometry> {
        let control = self.control(id)?;
        if !control.rules.has_forced_position() {
            return None;
        }
        let current = self.pending_frame_of(id).pos();
        let pos = control.rules.check_position(current, init);
        self.move_window(id, pos);
        let desktop = self.windows.get(&id).map(|w| w.desktop()).unwrap_or(0);
        let screen = self.screens.nearest(self.pending_frame_of(id).center());
        Some(self.client_area(ClientAreaOption::Full, screen, desktop))
    }

    fn desktop_or_current(&self, id: WindowId) -> u32 {
        match self.windows.get(&id).map(|w| w.desktop()) {
            Some(0) | None => self.desktops.current(),
            Some(desktop) => desktop,
        }
    }

    fn placement_area_at(&self, pos: Point, id: WindowId) -> Geometry {
        let screen = self.screens.nearest(pos);
        self.client_area(ClientAreaOption::Placement, screen, self.desktop_or_current(id))
    }

    /// Frame far below or right of the full area must be placed again
    fn must_correct_position(&self, id: WindowId, area: Geometry) -> bool {
        let frame = self.pending_frame_of(id);
        self.windows.get(&id).is_some_and(|w| w.is_movable())
            && (frame.x >= area.right() || frame.y >= area.bottom())
    }

    /// Session path: the saved geometry, kept partially inside the area
    fn place_session(&mut self, id: WindowId) -> Geometry {
        let full = self.screens.bounding();
        let mut frame = self.pending_frame_of(id);
        check_offscreen_position(&mut frame, full);
        self.set_frame_geometry(id, frame, false);
        let must_place = self.must_correct_position(id, full);
        self.resize_on_taking_control(id, false);
        if let Some(area) = self.move_with_force_rule(id, true) {
            self.keep_in_placement_area(id, area, true);
            return area;
        }
        if must_place {
            let area = self.placement_area_at(frame.center(), id);
            self.place(id, area);
        }
        let area = self.client_area_for(ClientAreaOption::Placement, id);
        self.keep_in_placement_area(id, area, true);
        area
    }

    /// Already mapped windows stay where they are unless offscreen
    fn place_mapped(&mut self, id: WindowId) -> Geometry {
        let full = self.screens.bounding();
        let mut frame = self.pending_frame_of(id);
        check_offscreen_position(&mut frame, full);
        self.set_frame_geometry(id, frame, false);
        let must_place = self.must_correct_position(id, full);
        self.resize_on_taking_control(id, false);
        if let Some(area) = self.move_with_force_rule(id, false) {
            self.place_max_fs(id, area, true, true);
            return area;
        }
        if !must_place {
            let area = self.client_area_for(ClientAreaOption::Placement, id);
            self.place_max_fs(id, area, true, true);
            return area;
        }
        let area = self.placement_area_at(frame.center(), id);
        self.place(id, area);
        let area = self.client_area_for(ClientAreaOption::Placement, id);
        self.place_max_fs(id, area, true, true);
        area
    }

    /// New windows: honor a position hint, otherwise run the placement
    /// policy on the current screen
    fn place_unmapped(&mut self, id: WindowId, request: &ManageRequest) -> Geometry {
        let desktop = self.desktop_or_current(id);
        let screen = match self.control(id) {
            Some(control) => control.rules.check_screen(self.screens.current(), true),
            None => self.screens.current(),
        }
        .min(self.screens.count().saturating_sub(1));
        let mut area = self.client_area(ClientAreaOption::Placement, screen, desktop);

        let is_desktop = self.windows.get(&id).is_some_and(|w| w.is_desktop());
        let ignore_default = self.ignores_position_by_default(id);
        let ignore = self
            .control(id)
            .is_some_and(|c| c.rules.check_ignore_geometry(ignore_default, true));
        let via_hint = !ignore && request.has_position();
        if via_hint {
            area = self.placement_area_at(self.pending_frame_of(id).center(), id);
        }
        let must_place = !is_desktop && !via_hint;

        self.resize_on_taking_control(id, true);
        if let Some(full) = self.move_with_force_rule(id, true) {
            self.place_max_fs(id, full, true, false);
            return full;
        }
        if must_place {
            self.place(id, area);
            area = self.client_area_for(ClientAreaOption::Placement, id);
        }
        self.place_max_fs(id, area, must_place, false);
        area
    }

    /// Keep movable ordinary windows inside the placement area
    fn keep_in_placement_area(&mut self, id: WindowId, area: Geometry, partial: bool) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.is_special() || !w.is_movable() {
            return;
        }
        self.keep_in_area(id, area, partial);
    }

    /// States saved in a session record. Only forcing rules apply since a
    /// restored window is not new.
    fn apply_session_states(&mut self, id: WindowId, info: &SessionInfo, area: Geometry) {
        self.set_keep_above(id, info.keep_above);
        self.set_keep_below(id, info.keep_below);
        self.set_original_skip_taskbar(id, info.skip_taskbar);
        self.set_skip_pager(id, info.skip_pager);
        self.set_skip_switcher(id, info.skip_switcher);
        self.set_opacity(id, info.opacity);
        if let Some(w) = self.windows.get_mut(&id) {
            w.session_stacking = info.stacking_order;
        }
        if info.max_mode != MaximizeMode::RESTORE {
            self.maximize(id, info.max_mode);
            if let Some(w) = self.windows.get_mut(&id) {
                w.restore_geometries.maximize = info.restore;
            }
        }
        if info.fullscreen {
            self.set_fullscreen(id, true, false);
            if let Some(w) = self.windows.get_mut(&id) {
                w.restore_geometries.fullscreen = info.fs_restore;
            }
        }
        if let Some(w) = self.windows.get_mut(&id) {
            let restore = &mut w.restore_geometries.maximize;
            if restore.is_valid() {
                check_offscreen_position(restore, area);
            }
        }
    }

    /// NET states requested by the client, filtered through the rules
    fn apply_initial_states(&mut self, id: WindowId, request: &ManageRequest, init: bool) {
        let net = request.net_state;
        let Some(control) = self.control(id) else {
            return;
        };
        let mut requested = MaximizeMode::RESTORE;
        requested.set(MaximizeMode::VERTICAL, net.contains(NetState::MAX_VERT));
        requested.set(MaximizeMode::HORIZONTAL, net.contains(NetState::MAX_HORIZ));
        let forced = control.rules.check_maximize(requested, init);
        let keep_above = control.rules.check_keep_above(net.contains(NetState::KEEP_ABOVE), init);
        let keep_below = control.rules.check_keep_below(net.contains(NetState::KEEP_BELOW), init);
        let skip_taskbar = control
            .rules
            .check_skip_taskbar(net.contains(NetState::SKIP_TASKBAR), init);
        let skip_pager = control.rules.check_skip_pager(net.contains(NetState::SKIP_PAGER), init);
        let skip_switcher = control
            .rules
            .check_skip_switcher(net.contains(NetState::SKIP_SWITCHER), init);
        let fullscreen = control.rules.check_fullscreen(net.contains(NetState::FULLSCREEN), init);

        if forced != MaximizeMode::RESTORE || requested != MaximizeMode::RESTORE {
            self.maximize(id, forced);
        }
        self.set_keep_above(id, keep_above);
        self.set_keep_below(id, keep_below);
        self.set_original_skip_taskbar(id, skip_taskbar);
        self.set_skip_pager(id, skip_pager);
        self.set_skip_switcher(id, skip_switcher);
        if net.contains(NetState::DEMANDS_ATTENTION) {
            self.demand_attention(id, true);
        }
        if fullscreen {
            self.set_fullscreen(id, true, false);
        }
    }

    /// Slot a restored window among the other restored windows by the
    /// stacking index their session recorded
    fn restore_session_stacking_order(&mut self, id: WindowId, index: u32) {
        let unconstrained = self.stacking.unconstrained().to_vec();
        let at = unconstrained.iter().position(|other| {
            *other != id
                && self
                    .windows
                    .get(other)
                    .and_then(|w| w.session_stacking)
                    .is_some_and(|i| i > index)
        });
        if let Some(at) = at {
            self.restack_to_index(id, at);
        }
    }

    /// Release a window: its surface is gone. With remnants enabled the
    /// slot stays as a remnant in the stacking order until unreferenced.
    pub fn release_window(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        if w.control.is_none() {
            return;
        }
        debug_assert!(
            !self.geometry_updates_blocked(id),
            "window released while geometry updates are blocked"
        );
        info!("Releasing window {}", id);
        let had_strut = w.strut.is_some();
        let (app_id, caption, window_type) = (w.app_id.clone(), w.caption.clone(), w.window_type);

        if self.move_resize_window == Some(id) {
            self.finish_move_resize(id, true);
        }

        let mut comp = StackingUpdatesBlocker::new(self);
        comp.timers.cancel_all(id);
        let remnant = comp.config.effects.remnants && comp.create_remnant(id);
        comp.activate_next_window(Some(id));
        for rules in comp
            .rule_book
            .iter_mut()
            .filter(|r| r.matches(&app_id, &caption, window_type))
        {
            rules.discard_temporary();
        }
        comp.destroy_management(id);
        comp.focus.remove(id);
        if let Some(w) = comp.windows.get_mut(&id) {
            w.decoration = None;
        }
        if remnant {
            if let Some(w) = comp.windows.get_mut(&id) {
                w.control = None;
            }
        } else {
            comp.clear_transient_relations(id);
            if let Some(gid) = comp.windows.get(&id).and_then(|w| w.group) {
                comp.leave_group(id, gid);
            }
            comp.stacking.remove(id);
            if let Some(w) = comp.windows.remove(&id) {
                comp.schedule_repaint(w.frame_geometry);
            }
        }
        comp.update_stacking_order(false);
        drop(comp);

        self.emit(WindowEvent::Removed { id });
        if remnant && !self.renderer.animate_close(id) {
            self.unref_remnant(id);
        }
        if had_strut {
            self.check_workspace_positions(None);
        }
    }

    /// Reserve screen edges for a dock; other windows are re-fitted
    pub fn set_strut(&mut self, id: WindowId, strut: Option<Margins>) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        if w.strut == strut {
            return;
        }
        debug!("Window {} strut {:?}", id, strut);
        w.strut = strut;
        self.check_workspace_positions(Some(id));
    }

    /// Re-fit every managed window but `except` to its current work area
    pub(crate) fn check_workspace_positions(&mut self, except: Option<WindowId>) {
        let mut comp = StackingUpdatesBlocker::new(self);
        for other in comp.managed_windows() {
            if Some(other) == except {
                continue;
            }
            let old = comp.pending_frame_of(other);
            comp.check_workspace_position(other, old);
        }
    }
}

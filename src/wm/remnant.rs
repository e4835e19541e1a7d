//! Remnants
//!
//! A closed window frozen into a read-only snapshot that stays in its arena
//! slot (and its stacking position) while closing animations or live leads
//! still hold references. The slot is reclaimed once the count drops to zero.

use std::time::Duration;

use tracing::{debug, trace};

use crate::compositor::Compositor;
use crate::shared::Margins;
use crate::wm::client_flags::{Layer, ProtocolKind, WindowType};
use crate::wm::events::WindowEvent;
use crate::wm::timers::TimerKind;
use crate::wm::window::WindowId;

/// Frozen state of a closed window
#[derive(Debug, Clone, PartialEq)]
pub struct Remnant {
    pub refcount: u32,
    pub frame_margins: Margins,
    pub desktops: Vec<u32>,
    pub opacity: f64,
    pub window_type: WindowType,
    pub layer: Layer,
    pub no_border: bool,
    pub minimized: bool,
    pub fullscreen: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub caption: String,
    pub was_active: bool,
    pub was_group_transient: bool,
    pub annexed: bool,
    pub modal: bool,
    pub was_protocol: ProtocolKind,
    /// Live leads referencing this remnant until the annexed timeout
    pub lead_refs: Vec<WindowId>,
}

impl Remnant {
    pub fn was_x11(&self) -> bool {
        self.was_protocol == ProtocolKind::X11
    }
}

impl Compositor {
    /// Freeze a window that is being released into a remnant. Returns false
    /// when the window has no control block to snapshot.
    pub(crate) fn create_remnant(&mut self, id: WindowId) -> bool {
        let layer = self.layer(id);
        let Some(w) = self.windows.get_mut(&id) else {
            return false;
        };
        let Some(control) = w.control.as_ref() else {
            return false;
        };
        let remnant = Remnant {
            refcount: 1,
            frame_margins: w.frame_margins(),
            desktops: w.desktops.clone(),
            opacity: w.opacity,
            window_type: w.window_type,
            layer,
            no_border: w.no_border,
            minimized: control.minimized,
            fullscreen: control.fullscreen,
            keep_above: control.keep_above,
            keep_below: control.keep_below,
            caption: w.caption.clone(),
            was_active: control.active,
            was_group_transient: w.transient.group_transient,
            annexed: w.transient.annexed,
            modal: w.transient.modal,
            was_protocol: w.protocol,
            lead_refs: Vec::new(),
        };
        w.remnant = Some(remnant);
        w.layer = layer;

        let annexed = w.transient.annexed;
        let leads = w.transient.leads.clone();
        let mut live_leads = Vec::new();
        for lead in leads {
            if self.windows.get(&lead).is_some_and(|l| !l.is_remnant()) {
                live_leads.push(lead);
            }
        }
        if annexed && !live_leads.is_empty() {
            if let Some(r) = self.windows.get_mut(&id).and_then(|w| w.remnant.as_mut()) {
                r.refcount += live_leads.len() as u32;
                r.lead_refs = live_leads;
            }
            let timeout = Duration::from_millis(self.config.effects.annexed_timeout_ms);
            self.timers.start(id, TimerKind::AnnexedTimeout, self.now, timeout);
        }
        debug!("Window {} became a remnant", id);
        self.emit(WindowEvent::RemnantCreated { id });
        true
    }

    /// Keep a remnant alive (e.g. for a closing animation)
    pub fn ref_remnant(&mut self, id: WindowId) -> bool {
        match self.windows.get_mut(&id).and_then(|w| w.remnant.as_mut()) {
            Some(r) => {
                r.refcount += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference; at zero the slot is reclaimed on the next dispatch
    pub fn unref_remnant(&mut self, id: WindowId) {
        let Some(r) = self.windows.get_mut(&id).and_then(|w| w.remnant.as_mut()) else {
            return;
        };
        r.refcount = r.refcount.saturating_sub(1);
        trace!("Remnant {} refcount {}", id, r.refcount);
        if r.refcount == 0 && !self.pending_deletes.contains(&id) {
            self.pending_deletes.push(id);
        }
    }

    /// Reclaim a remnant immediately regardless of references
    pub fn discard_remnant(&mut self, id: WindowId) {
        if let Some(r) = self.windows.get_mut(&id).and_then(|w| w.remnant.as_mut()) {
            r.refcount = 0;
            self.destroy_remnant(id);
        }
    }

    pub(crate) fn remnant_annexed_timeout(&mut self, id: WindowId) {
        let leads = match self.windows.get_mut(&id).and_then(|w| w.remnant.as_mut()) {
            Some(r) => std::mem::take(&mut r.lead_refs),
            None => return,
        };
        for _ in leads {
            self.unref_remnant(id);
        }
    }

    /// Run deferred deletions of remnants whose count reached zero
    pub(crate) fn process_pending_deletes(&mut self) {
        let pending = std::mem::take(&mut self.pending_deletes);
        for id in pending {
            let still_dead = self
                .windows
                .get(&id)
                .and_then(|w| w.remnant.as_ref())
                .is_some_and(|r| r.refcount == 0);
            if still_dead {
                self.destroy_remnant(id);
            }
        }
    }

    fn destroy_remnant(&mut self, id: WindowId) {
        debug_assert!(
            self.windows
                .get(&id)
                .and_then(|w| w.remnant.as_ref())
                .is_none_or(|r| r.refcount == 0),
            "remnant destroyed while referenced"
        );
        debug_assert!(
            self.windows.get(&id).is_none_or(|w| w.decoration.is_none()),
            "remnant destroyed with decoration attached"
        );
        self.timers.cancel_all(id);
        self.clear_transient_relations(id);
        if let Some(gid) = self.windows.get(&id).and_then(|w| w.group) {
            self.leave_group(id, gid);
        }
        self.stacking.remove(id);
        self.focus.remove(id);
        let Some(w) = self.windows.remove(&id) else {
            return;
        };
        self.renderer.schedule_repaint(w.frame_geometry);
        debug!("Remnant {} destroyed", id);
        self.emit(WindowEvent::RemnantDestroyed { id });
        self.update_stacking_order(false);
    }

    /// Ids of live remnants
    pub fn remnants(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.is_remnant())
            .map(|w| w.id)
            .collect();
        ids.sort();
        ids
    }
}

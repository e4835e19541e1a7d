//! Transients Module
//!
//! Lead/child relations between windows: dialogs of a main window, popups
//! annexed to their parent, and group transients owned by a whole window
//! group.

use tracing::debug;

use crate::compositor::Compositor;
use crate::wm::events::WindowEvent;
use crate::wm::window::WindowId;

/// Transient relation of one window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transient {
    /// Windows this one is transient for
    pub leads: Vec<WindowId>,
    /// Windows transient for this one
    pub children: Vec<WindowId>,
    /// Moves and closes together with its lead (popups)
    pub annexed: bool,
    pub modal: bool,
    /// Transient for the whole window group rather than one window
    pub group_transient: bool,
}

impl Transient {
    pub fn has_child(&self, id: WindowId) -> bool {
        self.children.contains(&id)
    }

    fn add_child(&mut self, id: WindowId) {
        if !self.children.contains(&id) {
            self.children.push(id);
        }
    }

    fn add_lead(&mut self, id: WindowId) {
        if !self.leads.contains(&id) {
            self.leads.push(id);
        }
    }
}

impl Compositor {
    /// Make `child` a transient of `lead`
    pub fn add_transient(&mut self, lead: WindowId, child: WindowId) {
        if lead == child
            || !self.windows.contains_key(&lead)
            || !self.windows.contains_key(&child)
            || self.has_transient(child, lead, true)
        {
            return;
        }
        if let Some(w) = self.windows.get_mut(&lead) {
            w.transient.add_child(child);
        }
        if let Some(w) = self.windows.get_mut(&child) {
            w.transient.add_lead(lead);
        }
        debug!("Window {} is transient for {}", child, lead);
        self.emit(WindowEvent::TransientChanged { id: child });
        self.update_stacking_order(false);
    }

    /// Cut the relation between `lead` and `child`
    pub fn remove_transient(&mut self, lead: WindowId, child: WindowId) {
        let mut changed = false;
        if let Some(w) = self.windows.get_mut(&lead) {
            let before = w.transient.children.len();
            w.transient.children.retain(|c| *c != child);
            changed |= before != w.transient.children.len();
        }
        if let Some(w) = self.windows.get_mut(&child) {
            let before = w.transient.leads.len();
            w.transient.leads.retain(|l| *l != lead);
            changed |= before != w.transient.leads.len();
        }
        if changed {
            debug!("Window {} no longer transient for {}", child, lead);
            if self.windows.contains_key(&child) {
                self.emit(WindowEvent::TransientChanged { id: child });
            }
        }
    }

    /// Whether `child` is a transient of `lead`, directly or through a chain
    /// when `indirect`
    pub fn has_transient(&self, lead: WindowId, child: WindowId, indirect: bool) -> bool {
        let mut seen = Vec::new();
        self.has_transient_inner(lead, child, indirect, &mut seen)
    }

    fn has_transient_inner(
        &self,
        lead: WindowId,
        child: WindowId,
        indirect: bool,
        seen: &mut Vec<WindowId>,
    ) -> bool {
        let Some(w) = self.windows.get(&lead) else {
            return false;
        };
        if w.transient.has_child(child) {
            return true;
        }
        if !indirect || seen.contains(&lead) {
            return false;
        }
        seen.push(lead);
        w.transient
            .children
            .iter()
            .any(|c| self.has_transient_inner(*c, child, true, seen))
    }

    /// Direct leads of a window
    pub fn leads(&self, id: WindowId) -> Vec<WindowId> {
        self.windows
            .get(&id)
            .map(|w| w.transient.leads.clone())
            .unwrap_or_default()
    }

    /// All leads up the chain, nearest first
    pub fn leads_recursive(&self, id: WindowId) -> Vec<WindowId> {
        let mut out: Vec<WindowId> = Vec::new();
        let mut queue = self.leads(id);
        while let Some(lead) = queue.pop() {
            if lead == id || out.contains(&lead) {
                continue;
            }
            out.push(lead);
            queue.extend(self.leads(lead));
        }
        out
    }

    /// Non-transient windows at the top of the lead chains
    pub fn main_windows(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        for lead in self.leads_recursive(id) {
            if let Some(w) = self.windows.get(&lead)
                && !w.is_transient()
                && !out.contains(&lead)
            {
                out.push(lead);
            }
        }
        out
    }

    /// Mark a window modal or not
    pub fn set_modal(&mut self, id: WindowId, modal: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        if w.transient.modal == modal {
            return;
        }
        w.transient.modal = modal;
        if let Some(net) = &mut w.net {
            net.state.set(crate::wm::client_flags::NetState::MODAL, modal);
        }
        self.emit(WindowEvent::TransientChanged { id });
    }

    /// The modal transient blocking a window, searching down the children
    pub fn find_modal(&self, id: WindowId) -> Option<WindowId> {
        let w = self.windows.get(&id)?;
        for child in &w.transient.children {
            if let Some(found) = self.find_modal(*child) {
                return Some(found);
            }
            if self.windows.get(child).is_some_and(|c| c.is_modal() && c.control.is_some()) {
                return Some(*child);
            }
        }
        None
    }

    /// Drop every relation a window takes part in
    pub(crate) fn clear_transient_relations(&mut self, id: WindowId) {
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let leads = w.transient.leads.clone();
        let children = w.transient.children.clone();
        for lead in leads {
            self.remove_transient(lead, id);
        }
        for child in children {
            self.remove_transient(id, child);
        }
    }
}

//! Window groups
//!
//! X11 windows sharing a WM_CLIENT_LEADER / window-group leader. Group
//! transients are transient for every non-transient member of their group.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::Compositor;
use crate::wm::window::WindowId;

/// Group handle: the X11 id of the group leader window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct Group {
    /// Managed leader window, if the leader itself is managed
    pub leader: Option<WindowId>,
    pub members: Vec<WindowId>,
    /// External references keeping an empty group alive
    pub refcount: u32,
}

impl Group {
    fn is_dead(&self) -> bool {
        self.refcount == 0 && self.members.is_empty()
    }
}

/// All live groups
#[derive(Debug, Default)]
pub struct Groups {
    groups: HashMap<GroupId, Group>,
}

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn ref_group(&mut self, id: GroupId) {
        self.groups.entry(id).or_default().refcount += 1;
    }

    /// Drop a reference; the group goes away once unreferenced and empty
    pub fn deref_group(&mut self, id: GroupId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.refcount = group.refcount.saturating_sub(1);
            if group.is_dead() {
                self.groups.remove(&id);
            }
        }
    }

    fn add_member(&mut self, id: GroupId, member: WindowId) {
        let group = self.groups.entry(id).or_default();
        if !group.members.contains(&member) {
            group.members.push(member);
        }
    }

    fn remove_member(&mut self, id: GroupId, member: WindowId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.members.retain(|m| *m != member);
            if group.leader == Some(member) {
                group.leader = None;
            }
            if group.is_dead() {
                self.groups.remove(&id);
            }
        }
    }

    /// The managed leader window went away
    pub fn lost_leader(&mut self, id: GroupId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.leader = None;
        }
    }
}

impl Compositor {
    /// Put a window into a group, or take it out with `None`
    pub fn set_group(&mut self, id: WindowId, group: Option<GroupId>) {
        let Some(old) = self.windows.get(&id).map(|w| w.group) else {
            return;
        };
        if old == group {
            return;
        }
        if let Some(old) = old {
            self.leave_group(id, old);
        }
        if let Some(w) = self.windows.get_mut(&id) {
            w.group = group;
        }
        if let Some(gid) = group {
            self.groups.add_member(gid, id);
            let is_leader = self.windows.get(&id).and_then(|w| w.xid) == Some(gid.0);
            if is_leader && let Some(g) = self.groups.groups.get_mut(&gid) {
                g.leader = Some(id);
            }
            debug!("Window {} joined group {:?}", id, gid);
            self.update_group_transients(gid);
        }
    }

    /// Mark a window as transient for its whole group
    pub fn set_group_transient(&mut self, id: WindowId, group_transient: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        if w.transient.group_transient == group_transient {
            return;
        }
        w.transient.group_transient = group_transient;
        let group = w.group;
        if !group_transient {
            for lead in self.leads(id) {
                self.remove_transient(lead, id);
            }
        }
        if let Some(gid) = group {
            self.update_group_transients(gid);
        }
    }

    /// Members of the window's group, the window included
    pub fn group_members(&self, id: WindowId) -> Vec<WindowId> {
        self.windows
            .get(&id)
            .and_then(|w| w.group)
            .and_then(|gid| self.groups.get(gid))
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    pub fn in_same_group(&self, a: WindowId, b: WindowId) -> bool {
        let ga = self.windows.get(&a).and_then(|w| w.group);
        ga.is_some() && ga == self.windows.get(&b).and_then(|w| w.group)
    }

    /// Re-link every group transient to the group's main windows
    fn update_group_transients(&mut self, gid: GroupId) {
        let members = self.groups.get(gid).map(|g| g.members.clone()).unwrap_or_default();
        let (transients, mains): (Vec<WindowId>, Vec<WindowId>) =
            members.into_iter().partition(|m| {
                self.windows
                    .get(m)
                    .is_some_and(|w| w.transient.group_transient)
            });
        for &t in &transients {
            for &m in &mains {
                let is_plain_transient = self.windows.get(&m).is_some_and(|w| w.is_transient());
                if !is_plain_transient && !self.has_transient(t, m, true) {
                    self.add_transient(m, t);
                }
            }
        }
    }

    pub(crate) fn leave_group(&mut self, id: WindowId, gid: GroupId) {
        let group_transient = self
            .windows
            .get(&id)
            .is_some_and(|w| w.transient.group_transient);
        let members = self.groups.get(gid).map(|g| g.members.clone()).unwrap_or_default();
        for m in members {
            if m == id {
                continue;
            }
            if group_transient {
                self.remove_transient(m, id);
            } else if self.windows.get(&m).is_some_and(|w| w.transient.group_transient) {
                self.remove_transient(id, m);
            }
        }
        self.groups.remove_member(gid, id);
        if let Some(w) = self.windows.get_mut(&id) {
            w.group = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at};
    use crate::shared::Geometry;

    #[test]
    fn group_transient_gets_every_main_member_as_lead() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, Geometry::new(0, 0, 200, 200));
        let b = manage_at(&mut comp, Geometry::new(0, 0, 200, 200));
        let t = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let gid = GroupId(42);
        comp.set_group(a, Some(gid));
        comp.set_group(b, Some(gid));
        comp.set_group_transient(t, true);
        comp.set_group(t, Some(gid));

        let mut leads = comp.leads(t);
        leads.sort();
        assert_eq!(leads, vec![a, b]);
        assert!(comp.in_same_group(a, t));
    }

    #[test]
    fn group_dies_when_unreferenced_and_empty() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, Geometry::new(0, 0, 200, 200));
        let gid = GroupId(7);
        comp.groups.ref_group(gid);
        comp.set_group(a, Some(gid));
        comp.set_group(a, None);
        assert!(comp.groups.get(gid).is_some());
        comp.groups.deref_group(gid);
        assert!(comp.groups.get(gid).is_none());
    }

    #[test]
    fn leaving_drops_group_transient_links() {
        let mut comp = compositor();
        let a = manage_at(&mut comp, Geometry::new(0, 0, 200, 200));
        let t = manage_at(&mut comp, Geometry::new(0, 0, 100, 100));
        let gid = GroupId(9);
        comp.set_group(a, Some(gid));
        comp.set_group_transient(t, true);
        comp.set_group(t, Some(gid));
        assert_eq!(comp.leads(t), vec![a]);
        comp.set_group(a, None);
        assert!(comp.leads(t).is_empty());
    }
}

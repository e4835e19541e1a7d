//! Window decorations
//!
//! Tracks whether a window carries a server-side decoration, its border
//! metrics, and the color palette it is drawn with. Pixels are painted
//! elsewhere. Palettes are shared through a weak cache keyed by scheme name:
//! an entry lives as long as some window holds it.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::compositor::Compositor;
use crate::config::{DecorationConfig, PaletteConfig, WindowColors};
use crate::shared::Margins;
use crate::wm::client_flags::MaximizeMode;
use crate::wm::events::WindowEvent;
use crate::wm::window::{Decoration, WindowId};

/// Resolved color scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationPalette {
    pub name: Rc<str>,
    pub colors: WindowColors,
}

/// Weak palette cache
#[derive(Debug, Default)]
pub struct PaletteCache {
    default_name: Rc<str>,
    schemes: Vec<PaletteConfig>,
    entries: HashMap<Rc<str>, Weak<DecorationPalette>>,
}

impl PaletteCache {
    pub fn new(default_name: &str, schemes: Vec<PaletteConfig>) -> Self {
        Self {
            default_name: Rc::from(default_name),
            schemes,
            entries: HashMap::new(),
        }
    }

    /// Shared palette for a scheme name. Empty or unknown names resolve to
    /// the default scheme.
    pub fn get(&mut self, name: &str) -> Rc<DecorationPalette> {
        let key: Rc<str> = match self.schemes.iter().find(|s| s.name == name) {
            Some(_) => Rc::from(name),
            None => self.default_name.clone(),
        };
        if let Some(palette) = self.entries.get(&key).and_then(Weak::upgrade) {
            return palette;
        }
        let colors = self
            .schemes
            .iter()
            .find(|s| *s.name == *key)
            .map(|s| s.colors)
            .unwrap_or_default();
        let palette = Rc::new(DecorationPalette {
            name: key.clone(),
            colors,
        });
        self.entries.insert(key, Rc::downgrade(&palette));
        palette
    }

    /// Drop entries no window holds anymore
    pub fn purge(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of palettes still held by some window
    pub fn live(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }
}

/// Border metrics for a decorated window
pub fn border_margins(config: &DecorationConfig) -> Margins {
    Margins::new(
        config.border_width,
        config.titlebar_height,
        config.border_width,
        config.border_width,
    )
}

impl Compositor {
    /// Attach or detach the decoration to match type, no-border and
    /// fullscreen state. The client area stays where it is.
    pub fn update_decoration(&mut self, id: WindowId) {
        let borders = border_margins(&self.config.decorations);
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        if w.is_remnant() {
            return;
        }
        let wanted = w.wants_decoration() && !w.no_border;
        if wanted == w.decoration.is_some() {
            return;
        }
        let client = w.frame_to_client(w.pending_frame());
        w.decoration = wanted.then_some(Decoration { borders });
        let frame = w.client_to_frame(client);
        debug!("Window {} decoration {}", id, if wanted { "attached" } else { "detached" });
        self.set_frame_geometry(id, frame, false);
    }

    /// Request borderless or decorated, filtered through rules
    pub fn set_no_border(&mut self, id: WindowId, set: bool) {
        let Some(w) = self.windows.get_mut(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let set = control.rules.check_no_border(set, false);
        if w.no_border == set {
            return;
        }
        w.no_border = set;
        self.update_window_rules(id, crate::wm::rules::RuleKind::NoBorder);
        self.update_decoration(id);
    }

    /// Borderless maximized windows drop their decoration when fully maximized
    pub(crate) fn update_no_border_for_maximize(&mut self, id: WindowId) {
        if !self.config.behavior.borderless_maximized_windows {
            return;
        }
        let Some(w) = self.windows.get(&id) else {
            return;
        };
        let Some(control) = &w.control else {
            return;
        };
        let full = w.geometry_update.max_mode == MaximizeMode::FULL;
        let no_border = control.rules.check_no_border(full, false);
        if let Some(w) = self.windows.get_mut(&id) {
            w.no_border = no_border;
        }
        self.update_decoration(id);
    }

    /// Switch the window's color scheme
    pub fn set_palette(&mut self, id: WindowId, name: &str) {
        let palette = self.palettes.get(name);
        let Some(control) = self.windows.get_mut(&id).and_then(|w| w.control.as_mut()) else {
            return;
        };
        if control
            .palette
            .as_ref()
            .is_some_and(|p| Rc::ptr_eq(p, &palette))
        {
            return;
        }
        control.palette = Some(palette);
        self.palettes.purge();
        self.emit(WindowEvent::PaletteChanged { id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemes() -> Vec<PaletteConfig> {
        vec![
            PaletteConfig {
                name: "default".into(),
                colors: WindowColors::default(),
            },
            PaletteConfig {
                name: "dark".into(),
                colors: WindowColors {
                    active_titlebar: 0x000000,
                    ..Default::default()
                },
            },
        ]
    }

    #[test]
    fn same_name_shares_one_palette() {
        let mut cache = PaletteCache::new("default", schemes());
        let a = cache.get("dark");
        let b = cache.get("dark");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.colors.active_titlebar, 0x000000);
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        let mut cache = PaletteCache::new("default", schemes());
        let a = cache.get("no-such-scheme");
        let b = cache.get("");
        assert_eq!(&*a.name, "default");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn entries_die_with_last_holder() {
        let mut cache = PaletteCache::new("default", schemes());
        let a = cache.get("dark");
        assert_eq!(cache.live(), 1);
        drop(a);
        assert_eq!(cache.live(), 0);
        cache.purge();
        assert!(cache.entries.is_empty());
    }
}

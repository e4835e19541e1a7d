//! Session Module
//!
//! Per-window state saved when the session ends and handed back to
//! `take_control` when the same application maps its window again.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::shared::Geometry;
use crate::wm::client_flags::{MaximizeMode, WindowType};

/// Saved state of one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub app_id: String,
    pub caption: String,
    pub window_type: WindowType,
    /// Desktop, 0 meaning all desktops
    pub desktop: u32,
    pub activities: Vec<String>,
    /// Frame geometry
    pub geometry: Geometry,
    pub max_mode: MaximizeMode,
    pub restore: Geometry,
    pub fullscreen: bool,
    pub fs_restore: Geometry,
    pub keep_above: bool,
    pub keep_below: bool,
    pub skip_taskbar: bool,
    pub skip_pager: bool,
    pub skip_switcher: bool,
    pub minimized: bool,
    pub no_border: bool,
    pub shortcut: Option<char>,
    pub opacity: f64,
    /// Position in the stacking order, bottom first
    pub stacking_order: Option<u32>,
    pub active: bool,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            caption: String::new(),
            window_type: WindowType::Normal,
            desktop: 0,
            activities: Vec::new(),
            geometry: Geometry::default(),
            max_mode: MaximizeMode::RESTORE,
            restore: Geometry::default(),
            fullscreen: false,
            fs_restore: Geometry::default(),
            keep_above: false,
            keep_below: false,
            skip_taskbar: false,
            skip_pager: false,
            skip_switcher: false,
            minimized: false,
            no_border: false,
            shortcut: None,
            opacity: 1.0,
            stacking_order: None,
            active: false,
        }
    }
}

/// Saved windows of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub windows: Vec<SessionInfo>,
}

impl Session {
    /// Default session file under the user data directory
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join("area-core");

        Ok(data_dir.join("session.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {:?}", path))?;
        let session: Session =
            serde_json::from_str(&content).context("Failed to parse session file")?;
        info!("Loaded {} session records from {:?}", session.windows.len(), path);
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(path, json).context("Failed to write session file")?;
        info!("Saved {} session records to {:?}", self.windows.len(), path);
        Ok(())
    }

    /// Hand out the record for a window. An exact caption match is
    /// preferred over the first record of the same application; each record
    /// is used once.
    pub fn take(
        &mut self,
        app_id: &str,
        caption: &str,
        window_type: WindowType,
    ) -> Option<SessionInfo> {
        let same_app =
            |info: &SessionInfo| info.app_id == app_id && info.window_type == window_type;
        let index = self
            .windows
            .iter()
            .position(|info| same_app(info) && info.caption == caption)
            .or_else(|| self.windows.iter().position(same_app))?;
        debug!("Session record found for {:?}", app_id);
        Some(self.windows.remove(index))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Compositor {
    /// Snapshot every ordinary managed window, bottom of the stack first
    pub fn capture_session(&self) -> Session {
        let mut windows = Vec::new();
        for (index, id) in self.stacking.order().iter().enumerate() {
            let Some(w) = self.windows.get(id) else {
                continue;
            };
            let Some(control) = &w.control else {
                continue;
            };
            if w.is_desktop() || w.is_dock() || w.is_popup() {
                continue;
            }
            windows.push(SessionInfo {
                app_id: w.app_id.clone(),
                caption: w.caption.clone(),
                window_type: w.window_type,
                desktop: w.desktop(),
                activities: Vec::new(),
                geometry: w.pending_frame(),
                max_mode: w.max_mode(),
                restore: w.restore_geometries.maximize,
                fullscreen: control.fullscreen,
                fs_restore: w.restore_geometries.fullscreen,
                keep_above: control.keep_above,
                keep_below: control.keep_below,
                skip_taskbar: control.original_skip_taskbar,
                skip_pager: control.skip_pager,
                skip_switcher: control.skip_switcher,
                minimized: control.minimized,
                no_border: w.no_border,
                shortcut: control.shortcut,
                opacity: w.opacity,
                stacking_order: Some(index as u32),
                active: control.active,
            });
        }
        Session { windows }
    }

    /// Configured session file, or the default one
    pub fn session_path(&self) -> Result<PathBuf> {
        match &self.config.session.path {
            Some(path) => Ok(path.clone()),
            None => Session::default_path(),
        }
    }

    pub fn save_session(&self) -> Result<PathBuf> {
        let path = self.session_path()?;
        self.capture_session().save(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{compositor, manage_at, manage_typed};
    use crate::wm::manage::ManageRequest;
    use pretty_assertions::assert_eq;

    fn record(app_id: &str, caption: &str) -> SessionInfo {
        SessionInfo {
            app_id: app_id.into(),
            caption: caption.into(),
            ..Default::default()
        }
    }

    #[test]
    fn take_prefers_exact_caption_and_consumes() {
        let mut session = Session {
            windows: vec![record("editor", "a.txt"), record("editor", "b.txt")],
        };
        let taken = session.take("editor", "b.txt", WindowType::Normal).unwrap();
        assert_eq!(taken.caption, "b.txt");
        let taken = session.take("editor", "c.txt", WindowType::Normal).unwrap();
        assert_eq!(taken.caption, "a.txt");
        assert!(session.take("editor", "a.txt", WindowType::Normal).is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn capture_skips_docks_and_keeps_stacking() {
        let mut comp = compositor();
        manage_typed(&mut comp, WindowType::Dock, Geometry::new(0, 0, 1920, 40));
        let a = manage_at(&mut comp, Geometry::new(10, 50, 300, 200));
        let b = manage_at(&mut comp, Geometry::new(400, 50, 300, 200));
        comp.set_keep_above(a, true);
        comp.activate_window(b, true);

        let session = comp.capture_session();
        assert_eq!(session.len(), 2);
        let a_info = session.windows.iter().find(|i| i.geometry.x == 10).unwrap();
        let b_info = session.windows.iter().find(|i| i.geometry.x == 400).unwrap();
        assert!(a_info.keep_above);
        assert!(b_info.active);
        assert!(a_info.stacking_order > b_info.stacking_order);
        assert_eq!(a_info.desktop, 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut info = record("term", "shell");
        info.max_mode = MaximizeMode::VERTICAL;
        info.restore = Geometry::new(5, 5, 640, 480);
        let session = Session {
            windows: vec![info],
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), session);
    }

    #[test]
    fn restored_window_gets_saved_state() {
        let mut comp = compositor();
        let mut request = ManageRequest::new(WindowType::Normal, Geometry::new(0, 0, 50, 50));
        request.no_border = true;
        request.session = Some(SessionInfo {
            desktop: 3,
            geometry: Geometry::new(200, 150, 640, 480),
            keep_below: true,
            skip_pager: true,
            max_mode: MaximizeMode::FULL,
            restore: Geometry::new(200, 150, 640, 480),
            ..record("viewer", "photo")
        });
        let id = comp.take_control(request);

        let w = comp.window(id).unwrap();
        assert_eq!(w.desktops, vec![3]);
        assert_eq!(w.max_mode(), MaximizeMode::FULL);
        assert_eq!(w.frame_geometry, Geometry::new(0, 0, 1920, 1080));
        assert_eq!(comp.restore_geometry(id), Geometry::new(200, 150, 640, 480));
        let control = comp.control(id).unwrap();
        assert!(control.keep_below);
        assert!(control.skip_pager);

        comp.maximize(id, MaximizeMode::RESTORE);
        assert_eq!(
            comp.window(id).unwrap().frame_geometry,
            Geometry::new(200, 150, 640, 480)
        );
    }
}

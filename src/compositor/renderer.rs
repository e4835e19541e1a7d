//! Renderer hooks
//!
//! The scene renderer is an external collaborator. The window core only asks
//! it to repaint regions and to show or hide the electric-border outline.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::shared::Geometry;
use crate::wm::window::WindowId;

/// Operations the window core needs from the scene
pub trait Renderer {
    /// Schedule a repaint of a region in global coordinates
    fn schedule_repaint(&mut self, region: Geometry);

    /// Show the maximize/tile preview outline
    fn show_outline(&mut self, _geometry: Geometry) {}

    fn hide_outline(&mut self) {}

    /// A window closed and left a remnant. Returning true takes over the
    /// remnant's initial reference; the scene calls `unref_remnant` once
    /// its closing animation is done.
    fn animate_close(&mut self, _id: WindowId) -> bool {
        false
    }
}

/// Renderer that drops every request
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn schedule_repaint(&mut self, region: Geometry) {
        trace!(?region, "repaint");
    }
}

/// What a `RecordingRenderer` saw
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderLog {
    pub repaints: Vec<Geometry>,
    pub outline: Option<Geometry>,
    /// Remnants the scene holds for a closing animation
    pub closing: Vec<WindowId>,
}

/// Renderer that records requests into a shared log
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub log: Rc<RefCell<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    fn schedule_repaint(&mut self, region: Geometry) {
        self.log.borrow_mut().repaints.push(region);
    }

    fn show_outline(&mut self, geometry: Geometry) {
        self.log.borrow_mut().outline = Some(geometry);
    }

    fn hide_outline(&mut self) {
        self.log.borrow_mut().outline = None;
    }

    fn animate_close(&mut self, id: WindowId) -> bool {
        self.log.borrow_mut().closing.push(id);
        true
    }
}

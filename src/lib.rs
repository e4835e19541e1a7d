//! Area Core
//!
//! Window state and geometry core of a compositing window manager: the
//! per-window control block, stacking, maximize/quick-tile/fullscreen,
//! placement, interactive move/resize, remnants, groups, rules and
//! session records. Everything runs against one explicit `Compositor`
//! context on one thread.

pub mod compositor;
pub mod config;
pub mod shared;
pub mod wm;

pub use compositor::Compositor;
pub use config::Config;

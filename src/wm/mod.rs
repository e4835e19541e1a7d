//! Window Manager Module
//!
//! Window state and geometry core: the per-window control block, stacking,
//! maximize and quick-tile, placement, interactive move/resize, and the
//! protocol backends that mirror it all onto the wire.

pub mod backend;
pub mod client_flags;
pub mod control;
pub mod decorations;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod geometry;
pub mod group;
pub mod hints;
pub mod manage;
pub mod management;
pub mod maximize;
pub mod moveresize;
pub mod placement;
pub mod quicktile;
pub mod remnant;
pub mod rules;
pub mod screen;
pub mod session;
pub mod stacking;
pub mod timers;
pub mod transients;
pub mod window;
pub mod workspace;

pub use backend::{NullBackend, ProtocolBackend};
pub use ewmh::{Atoms, X11Backend};
pub use manage::ManageRequest;
pub use window::{Window, WindowId};

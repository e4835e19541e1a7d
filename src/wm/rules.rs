//! Window Rules
//!
//! Per-attribute overrides matched against windows. Every control-block
//! setter filters its candidate value through the matching `check_*` call
//! and uses the returned value.

use serde::{Deserialize, Serialize};

use crate::shared::{Point, Size};
use crate::wm::client_flags::{MaximizeMode, WindowType};
use crate::wm::placement::PlacementPolicy;

/// How a rule affects its attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePolicy {
    #[default]
    DontAffect,
    /// Always enforce the value
    Force,
    /// Apply once when the window is set up
    Apply,
    /// Apply on setup and remember later changes
    Remember,
    /// Enforce until the window is released
    ForceTemporarily,
    /// Apply immediately once
    ApplyNow,
}

/// One rule for one attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule<T> {
    #[serde(default)]
    pub policy: RulePolicy,
    pub value: T,
}

impl<T: Copy> Rule<T> {
    pub fn new(policy: RulePolicy, value: T) -> Self {
        Self { policy, value }
    }

    pub fn is_active(&self) -> bool {
        self.policy != RulePolicy::DontAffect
    }

    /// Whether the rule decides the value for a check at this point
    pub fn applies(&self, init: bool) -> bool {
        match self.policy {
            RulePolicy::DontAffect => false,
            RulePolicy::Force | RulePolicy::ForceTemporarily => true,
            RulePolicy::Apply | RulePolicy::Remember | RulePolicy::ApplyNow => init,
        }
    }

    pub fn check(&self, candidate: T, init: bool) -> T {
        if self.applies(init) { self.value } else { candidate }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self.policy, RulePolicy::Force | RulePolicy::ForceTemporarily)
    }

    /// Store the live value into a Remember rule
    fn remember(&mut self, value: T) -> bool {
        if self.policy == RulePolicy::Remember {
            self.value = value;
            return true;
        }
        false
    }
}

/// Which attribute changed, for `WindowRules::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Position,
    Size,
    Desktop,
    Screen,
    MaximizeVert,
    MaximizeHoriz,
    Minimize,
    Shade,
    SkipTaskbar,
    SkipPager,
    SkipSwitcher,
    Above,
    Below,
    Fullscreen,
    NoBorder,
    Shortcut,
}

/// A set of rules with the conditions selecting the windows it applies to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub description: String,
    /// Exact application id match
    pub app_id: Option<String>,
    /// Substring of the caption
    pub title: Option<String>,
    /// Restrict to these window types; empty matches every type
    pub types: Vec<WindowType>,

    pub position: Rule<Point>,
    pub size: Rule<Size>,
    pub min_size: Rule<Size>,
    pub max_size: Rule<Size>,
    pub ignore_geometry: Rule<bool>,
    pub desktop: Rule<u32>,
    pub screen: Rule<usize>,
    pub placement: Rule<PlacementPolicy>,
    pub maximize_vert: Rule<bool>,
    pub maximize_horiz: Rule<bool>,
    pub minimize: Rule<bool>,
    pub shade: Rule<bool>,
    pub skip_taskbar: Rule<bool>,
    pub skip_pager: Rule<bool>,
    pub skip_switcher: Rule<bool>,
    pub above: Rule<bool>,
    pub below: Rule<bool>,
    pub fullscreen: Rule<bool>,
    pub no_border: Rule<bool>,
    pub opacity_active: Rule<f64>,
    pub opacity_inactive: Rule<f64>,
    pub strict_geometry: Rule<bool>,
    pub shortcut: Rule<Option<char>>,
    pub closeable: Rule<bool>,
    pub accept_focus: Rule<bool>,
}

impl Rules {
    pub fn matches(&self, app_id: &str, title: &str, window_type: WindowType) -> bool {
        if let Some(wanted) = &self.app_id
            && wanted != app_id
        {
            return false;
        }
        if let Some(part) = &self.title
            && !title.contains(part.as_str())
        {
            return false;
        }
        self.types.is_empty() || self.types.contains(&window_type)
    }

    /// Drop ForceTemporarily policies, done when a matching window is released
    pub fn discard_temporary(&mut self) {
        macro_rules! drop_temporary {
            ($($field:ident),*) => {
                $(if self.$field.policy == RulePolicy::ForceTemporarily {
                    self.$field.policy = RulePolicy::DontAffect;
                })*
            };
        }
        drop_temporary!(
            position, size, min_size, max_size, ignore_geometry, desktop, screen, placement,
            maximize_vert, maximize_horiz, minimize, shade, skip_taskbar, skip_pager,
            skip_switcher, above, below, fullscreen, no_border, opacity_active,
            opacity_inactive, strict_geometry, shortcut, closeable, accept_focus
        );
    }
}

/// Snapshot of the live values `WindowRules::update` can remember
#[derive(Debug, Clone, Copy, Default)]
pub struct RememberedState {
    pub position: Point,
    pub size: Size,
    pub desktop: u32,
    pub screen: usize,
    pub max_mode: MaximizeMode,
    pub minimized: bool,
    pub shaded: bool,
    pub skip_taskbar: bool,
    pub skip_pager: bool,
    pub skip_switcher: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub fullscreen: bool,
    pub no_border: bool,
    pub shortcut: Option<char>,
}

/// The rule sets matching one window, consulted first to last
#[derive(Debug, Clone, Default)]
pub struct WindowRules {
    rules: Vec<Rules>,
}

macro_rules! check_first {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(&self, candidate: $ty, init: bool) -> $ty {
            self.rules
                .iter()
                .find(|r| r.$field.applies(init))
                .map_or(candidate, |r| r.$field.value)
        }
    };
}

impl WindowRules {
    pub fn new(rules: Vec<Rules>) -> Self {
        Self { rules }
    }

    /// Collect the sets matching a window from a rule book
    pub fn matching(book: &[Rules], app_id: &str, title: &str, window_type: WindowType) -> Self {
        Self::new(
            book.iter()
                .filter(|r| r.matches(app_id, title, window_type))
                .cloned()
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    check_first!(check_position, position, Point);
    check_first!(check_size, size, Size);
    check_first!(check_ignore_geometry, ignore_geometry, bool);
    check_first!(check_desktop, desktop, u32);
    check_first!(check_screen, screen, usize);
    check_first!(check_placement, placement, PlacementPolicy);
    check_first!(check_minimize, minimize, bool);
    check_first!(check_shade, shade, bool);
    check_first!(check_skip_taskbar, skip_taskbar, bool);
    check_first!(check_skip_pager, skip_pager, bool);
    check_first!(check_skip_switcher, skip_switcher, bool);
    check_first!(check_keep_above, above, bool);
    check_first!(check_keep_below, below, bool);
    check_first!(check_fullscreen, fullscreen, bool);
    check_first!(check_no_border, no_border, bool);
    check_first!(check_opacity_active, opacity_active, f64);
    check_first!(check_opacity_inactive, opacity_inactive, f64);
    check_first!(check_strict_geometry, strict_geometry, bool);
    check_first!(check_shortcut, shortcut, Option<char>);
    check_first!(check_closeable, closeable, bool);
    check_first!(check_accept_focus, accept_focus, bool);

    pub fn check_min_size(&self, candidate: Size) -> Size {
        self.rules
            .iter()
            .find(|r| r.min_size.is_forced())
            .map_or(candidate, |r| r.min_size.value)
    }

    pub fn check_max_size(&self, candidate: Size) -> Size {
        self.rules
            .iter()
            .find(|r| r.max_size.is_forced())
            .map_or(candidate, |r| r.max_size.value)
    }

    /// Maximize rules are kept per axis
    pub fn check_maximize(&self, mode: MaximizeMode, init: bool) -> MaximizeMode {
        let vert = self
            .rules
            .iter()
            .find(|r| r.maximize_vert.applies(init))
            .map_or(mode.contains(MaximizeMode::VERTICAL), |r| r.maximize_vert.value);
        let horiz = self
            .rules
            .iter()
            .find(|r| r.maximize_horiz.applies(init))
            .map_or(mode.contains(MaximizeMode::HORIZONTAL), |r| r.maximize_horiz.value);
        let mut out = MaximizeMode::RESTORE;
        out.set(MaximizeMode::VERTICAL, vert);
        out.set(MaximizeMode::HORIZONTAL, horiz);
        out
    }

    /// Whether a rule pins the position
    pub fn has_forced_position(&self) -> bool {
        self.rules.iter().any(|r| r.position.is_forced())
    }

    /// Store live values into the first Remember rule of the given kind
    pub fn update(&mut self, kind: RuleKind, state: &RememberedState) -> bool {
        let mut updated = false;
        for r in &mut self.rules {
            let done = match kind {
                RuleKind::Position => r.position.remember(state.position),
                RuleKind::Size => r.size.remember(state.size),
                RuleKind::Desktop => r.desktop.remember(state.desktop),
                RuleKind::Screen => r.screen.remember(state.screen),
                RuleKind::MaximizeVert => r
                    .maximize_vert
                    .remember(state.max_mode.contains(MaximizeMode::VERTICAL)),
                RuleKind::MaximizeHoriz => r
                    .maximize_horiz
                    .remember(state.max_mode.contains(MaximizeMode::HORIZONTAL)),
                RuleKind::Minimize => r.minimize.remember(state.minimized),
                RuleKind::Shade => r.shade.remember(state.shaded),
                RuleKind::SkipTaskbar => r.skip_taskbar.remember(state.skip_taskbar),
                RuleKind::SkipPager => r.skip_pager.remember(state.skip_pager),
                RuleKind::SkipSwitcher => r.skip_switcher.remember(state.skip_switcher),
                RuleKind::Above => r.above.remember(state.keep_above),
                RuleKind::Below => r.below.remember(state.keep_below),
                RuleKind::Fullscreen => r.fullscreen.remember(state.fullscreen),
                RuleKind::NoBorder => r.no_border.remember(state.no_border),
                RuleKind::Shortcut => r.shortcut.remember(state.shortcut),
            };
            if done {
                updated = true;
                break;
            }
        }
        updated
    }

    /// Drop ForceTemporarily rules, done when the window is released
    pub fn discard_temporary(&mut self) {
        for r in &mut self.rules {
            r.discard_temporary();
        }
    }
}

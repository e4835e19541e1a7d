//! Hints Module
//!
//! Client size constraints (ICCCM WM_NORMAL_HINTS / xdg-toplevel min/max)
//! and their application to requested client sizes.

use serde::{Deserialize, Serialize};

use crate::shared::Size;

/// Which dimension an interactive resize keeps fixed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeMode {
    /// Both dimensions may change
    #[default]
    Any,
    /// Width is fixed, height adapts (horizontal maximize)
    FixedWidth,
    /// Height is fixed, width adapts (vertical maximize)
    FixedHeight,
}

/// Parsed size hints. Absent fields impose no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeHints {
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
    pub base_size: Option<Size>,
    /// Resize increments
    pub increments: Option<Size>,
    /// Minimum aspect as width/height numerator and denominator
    pub min_aspect: Option<Size>,
    pub max_aspect: Option<Size>,
    /// Client asked for its position to be honored (USPosition/PPosition)
    pub user_position: bool,
    pub program_position: bool,
}

/// Sizes below this are never produced
pub const MIN_CLIENT_SIZE: Size = Size::new(1, 1);

impl SizeHints {
    pub fn min_size(&self) -> Size {
        self.min_size.unwrap_or(MIN_CLIENT_SIZE).expanded_to(MIN_CLIENT_SIZE)
    }

    pub fn max_size(&self) -> Size {
        self.max_size
            .filter(|s| s.is_valid())
            .unwrap_or(Size::new(i32::MAX, i32::MAX))
            .expanded_to(self.min_size())
    }

    /// Width and height fixed by the client
    pub fn is_fixed_size(&self) -> bool {
        self.min_size.is_some() && self.min_size == self.max_size
    }

    /// Adjust a requested client size to the constraints. Always satisfiable:
    /// the result is clamped into `[min_size, max_size]`.
    pub fn constrain(&self, requested: Size, mode: SizeMode) -> Size {
        let min = self.min_size();
        let max = self.max_size();
        let mut w = requested.width.clamp(min.width, max.width);
        let mut h = requested.height.clamp(min.height, max.height);

        if let (Some(min_aspect), Some(max_aspect)) = (self.min_aspect, self.max_aspect)
            && min_aspect.is_valid()
            && max_aspect.is_valid()
        {
            let base = self.base_size.unwrap_or_default();
            let aw = (w - base.width).max(1) as f64;
            let ah = (h - base.height).max(1) as f64;
            let min_ratio = min_aspect.width as f64 / min_aspect.height as f64;
            let max_ratio = max_aspect.width as f64 / max_aspect.height as f64;
            if aw / ah < min_ratio {
                // Too tall for its width.
                match mode {
                    SizeMode::FixedHeight => w = base.width + (ah * min_ratio).round() as i32,
                    SizeMode::Any | SizeMode::FixedWidth => {
                        h = base.height + (aw / min_ratio).round() as i32
                    }
                }
            } else if aw / ah > max_ratio {
                match mode {
                    SizeMode::FixedWidth => h = base.height + (aw / max_ratio).round() as i32,
                    SizeMode::Any | SizeMode::FixedHeight => {
                        w = base.width + (ah * max_ratio).round() as i32
                    }
                }
            }
            w = w.clamp(min.width, max.width);
            h = h.clamp(min.height, max.height);
        }

        if let Some(inc) = self.increments.filter(|i| i.is_valid()) {
            let base = self.base_size.unwrap_or_default();
            if inc.width > 1 && w > base.width {
                w = base.width + (w - base.width) / inc.width * inc.width;
            }
            if inc.height > 1 && h > base.height {
                h = base.height + (h - base.height) / inc.height * inc.height;
            }
            w = w.max(min.width);
            h = h.max(min.height);
        }

        Size::new(w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> SizeHints {
        SizeHints {
            min_size: Some(Size::new(100, 50)),
            max_size: Some(Size::new(800, 600)),
            ..Default::default()
        }
    }

    #[test]
    fn clamps_into_min_and_max() {
        let h = hints();
        assert_eq!(h.constrain(Size::new(10, 10), SizeMode::Any), Size::new(100, 50));
        assert_eq!(h.constrain(Size::new(5000, 5000), SizeMode::Any), Size::new(800, 600));
        assert_eq!(h.constrain(Size::new(300, 200), SizeMode::Any), Size::new(300, 200));
    }

    #[test]
    fn increments_round_down_from_base() {
        let h = SizeHints {
            base_size: Some(Size::new(4, 4)),
            increments: Some(Size::new(10, 20)),
            ..Default::default()
        };
        assert_eq!(h.constrain(Size::new(129, 95), SizeMode::Any), Size::new(124, 84));
    }

    #[test]
    fn aspect_adapts_the_free_dimension() {
        let h = SizeHints {
            min_aspect: Some(Size::new(1, 1)),
            max_aspect: Some(Size::new(1, 1)),
            ..Default::default()
        };
        assert_eq!(h.constrain(Size::new(200, 100), SizeMode::Any), Size::new(100, 100));
        assert_eq!(h.constrain(Size::new(200, 100), SizeMode::FixedWidth), Size::new(200, 200));
        assert_eq!(h.constrain(Size::new(100, 300), SizeMode::FixedHeight), Size::new(300, 300));
    }

    #[test]
    fn fixed_size_detection() {
        let h = SizeHints {
            min_size: Some(Size::new(200, 200)),
            max_size: Some(Size::new(200, 200)),
            ..Default::default()
        };
        assert!(h.is_fixed_size());
        assert!(!hints().is_fixed_size());
    }
}

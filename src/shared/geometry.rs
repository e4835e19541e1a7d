//! Geometry primitives
//!
//! Rectangles, points, sizes and border margins shared by the window core,
//! placement and the renderer hooks. Rectangles use exclusive right/bottom
//! edges: `right() == x + width`.

use serde::{Deserialize, Serialize};

/// A point in global compositor coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are strictly positive
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn bounded_to(&self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    pub fn expanded_to(&self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

/// Window geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(pos: Point, size: Size) -> Self {
        Self::new(pos.x, pos.y, size.width, size.height)
    }

    pub fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// A geometry with a positive area. The empty default is not valid and
    /// stands for "nothing remembered" in restore slots.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn contains(&self, other: &Geometry) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersected(&self, other: &Geometry) -> Geometry {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Geometry::default();
        }
        Geometry::new(x, y, right - x, bottom - y)
    }

    /// Bounding rectangle of both; an invalid operand is ignored
    pub fn united(&self, other: &Geometry) -> Geometry {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Geometry::new(x, y, right - x, bottom - y)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Geometry {
        Geometry::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn moved_to(&self, pos: Point) -> Geometry {
        Geometry::new(pos.x, pos.y, self.width, self.height)
    }

    pub fn with_size(&self, size: Size) -> Geometry {
        Geometry::new(self.x, self.y, size.width, size.height)
    }

    pub fn with_center(&self, center: Point) -> Geometry {
        Geometry::new(
            center.x - self.width / 2,
            center.y - self.height / 2,
            self.width,
            self.height,
        )
    }

    /// Grow each edge outwards by the margins
    pub fn grown_by(&self, m: Margins) -> Geometry {
        Geometry::new(
            self.x - m.left,
            self.y - m.top,
            self.width + m.left + m.right,
            self.height + m.top + m.bottom,
        )
    }

    /// Shrink each edge inwards by the margins
    pub fn shrunk_by(&self, m: Margins) -> Geometry {
        Geometry::new(
            self.x + m.left,
            self.y + m.top,
            self.width - m.left - m.right,
            self.height - m.top - m.bottom,
        )
    }
}

/// Decoration border extents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Margins {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }

    pub fn is_zero(&self) -> bool {
        *self == Margins::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_exclusive() {
        let g = Geometry::new(10, 20, 100, 50);
        assert_eq!(g.right(), 110);
        assert_eq!(g.bottom(), 70);
        assert!(g.contains_point(Point::new(109, 69)));
        assert!(!g.contains_point(Point::new(110, 69)));
    }

    #[test]
    fn intersection_and_union() {
        let a = Geometry::new(0, 0, 100, 100);
        let b = Geometry::new(50, 50, 100, 100);
        assert_eq!(a.intersected(&b), Geometry::new(50, 50, 50, 50));
        assert_eq!(a.united(&b), Geometry::new(0, 0, 150, 150));
        assert!(!a.intersects(&Geometry::new(100, 0, 10, 10)));
        assert_eq!(a.united(&Geometry::default()), a);
    }

    #[test]
    fn margins_round_trip_through_grow_and_shrink() {
        let m = Margins::new(2, 32, 2, 2);
        let client = Geometry::new(100, 100, 300, 200);
        let frame = client.grown_by(m);
        assert_eq!(frame, Geometry::new(98, 68, 304, 234));
        assert_eq!(frame.shrunk_by(m), client);
    }

    #[test]
    fn center_moves_keep_size() {
        let g = Geometry::new(0, 0, 200, 100).with_center(Point::new(500, 500));
        assert_eq!(g, Geometry::new(400, 450, 200, 100));
    }
}

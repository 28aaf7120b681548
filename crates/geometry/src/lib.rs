use std::ops::{Add, Sub};

pub use euclid::{Point2D as Point, Size2D as Extent, Vector2D as Offset};

/// Unit tag for coordinates in a window's client area.
#[derive(Clone, Copy)]
pub struct ScreenPx();

/// Unit tag for coordinates within an off-screen pixel surface.
#[derive(Clone, Copy)]
pub struct SurfacePx();

/// An axis-aligned rectangle described by its origin and extent.
#[derive(Clone, Copy)]
pub struct Rect<T, U>(euclid::Box2D<T, U>);

impl<T, U> Rect<T, U> {
    pub fn new(origin: Point<T, U>, extent: Extent<T, U>) -> Self
    where
        T: Copy + Add<T, Output = T>,
    {
        Self(euclid::Box2D::from_origin_and_size(origin, extent))
    }

    pub fn origin(&self) -> Point<T, U>
    where
        T: Copy,
    {
        self.0.min
    }

    pub fn extent(&self) -> Extent<T, U>
    where
        T: Copy + Sub<T, Output = T>,
    {
        self.0.size()
    }

    pub fn width(&self) -> T
    where
        T: Copy + Sub<T, Output = T>,
    {
        self.0.width()
    }

    pub fn height(&self) -> T
    where
        T: Copy + Sub<T, Output = T>,
    {
        self.0.height()
    }

    pub fn intersection(&self, rhs: &Rect<T, U>) -> Option<Rect<T, U>>
    where
        T: Copy + PartialOrd,
    {
        self.0.intersection(&rhs.0).map(Rect)
    }
}

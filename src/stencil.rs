//! Finite-difference stencils for discretization orders 2, 4 and 8.
//!
//! Pure functions over the previous generation of a [`GridStorage`]; the
//! coefficients and reach are fixed constants per order. Callers must keep
//! the evaluated cell at least `radius` cells away from the storage edge.

use static_assertions::const_assert;

use crate::grid::storage::{Generation, GridStorage};
use crate::params::Order;

// Each formula may not reach further than the halo its order provisions.
const_assert!(Order::Second.radius() >= 1);
const_assert!(Order::Fourth.radius() >= 2);
const_assert!(Order::Eighth.radius() >= 4);

/// Signature shared by the three stencil formulas.
pub type StencilFn = fn(&GridStorage, Generation, usize, usize, f64, f64) -> f64;

/// The formula for a given discretization order.
pub fn for_order(order: Order) -> StencilFn {
    match order {
        Order::Second => stencil2,
        Order::Fourth => stencil4,
        Order::Eighth => stencil8,
    }
}

/// 2nd-order central difference, radius 1.
#[inline]
pub fn stencil2(
    g: &GridStorage,
    prev: Generation,
    x: usize,
    y: usize,
    xcfl: f64,
    ycfl: f64,
) -> f64 {
    g.at(prev, x, y)
        + xcfl * (g.at(prev, x + 1, y) + g.at(prev, x - 1, y) - 2.0 * g.at(prev, x, y))
        + ycfl * (g.at(prev, x, y + 1) + g.at(prev, x, y - 1) - 2.0 * g.at(prev, x, y))
}

/// 4th-order central difference, radius 2.
#[inline]
pub fn stencil4(
    g: &GridStorage,
    prev: Generation,
    x: usize,
    y: usize,
    xcfl: f64,
    ycfl: f64,
) -> f64 {
    g.at(prev, x, y)
        + xcfl
            * (-g.at(prev, x + 2, y) + 16.0 * g.at(prev, x + 1, y) - 30.0 * g.at(prev, x, y)
                + 16.0 * g.at(prev, x - 1, y)
                - g.at(prev, x - 2, y))
        + ycfl
            * (-g.at(prev, x, y + 2) + 16.0 * g.at(prev, x, y + 1) - 30.0 * g.at(prev, x, y)
                + 16.0 * g.at(prev, x, y - 1)
                - g.at(prev, x, y - 2))
}

/// 8th-order central difference, radius 4.
#[inline]
pub fn stencil8(
    g: &GridStorage,
    prev: Generation,
    x: usize,
    y: usize,
    xcfl: f64,
    ycfl: f64,
) -> f64 {
    g.at(prev, x, y)
        + xcfl
            * (-9.0 * g.at(prev, x + 4, y) + 128.0 * g.at(prev, x + 3, y)
                - 1008.0 * g.at(prev, x + 2, y)
                + 8064.0 * g.at(prev, x + 1, y)
                - 14350.0 * g.at(prev, x, y)
                + 8064.0 * g.at(prev, x - 1, y)
                - 1008.0 * g.at(prev, x - 2, y)
                + 128.0 * g.at(prev, x - 3, y)
                - 9.0 * g.at(prev, x - 4, y))
        + ycfl
            * (-9.0 * g.at(prev, x, y + 4) + 128.0 * g.at(prev, x, y + 3)
                - 1008.0 * g.at(prev, x, y + 2)
                + 8064.0 * g.at(prev, x, y + 1)
                - 14350.0 * g.at(prev, x, y)
                + 8064.0 * g.at(prev, x, y - 1)
                - 1008.0 * g.at(prev, x, y - 2)
                + 128.0 * g.at(prev, x, y - 3)
                - 9.0 * g.at(prev, x, y - 4))
}

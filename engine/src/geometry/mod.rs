//! Deterministic layout geometry.
//!
//! Pure placement functions for the three stage shapes: the flat roster
//! grid, the idle/armed sphere, and the winner reveal sub-layout. Only the
//! non-repeating slot picker touches randomness.

mod grid;
mod slot_picker;
mod sphere;
mod winner_layout;

pub use grid::grid_slots;
pub use slot_picker::{pick_free_slot, pick_free_slot_with, SlotPickError};
pub use sphere::{sphere_points, SPHERE_RADIUS};
pub use winner_layout::{layout_rule, winner_placements, LayoutError, LayoutRule};

use serde::{Deserialize, Serialize};

/// Card dimensions in presentation units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardSize {
    pub width: f64,
    pub height: f64,
}

/// Window dimensions in presentation units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

/// One slot of the flat roster grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSlot {
    /// Index into the roster (tiled when the roster is smaller than the grid).
    pub participant: usize,
    /// 1-based column within the row.
    pub column: u32,
    /// 1-based row.
    pub row: u32,
}

/// One card target on the sphere.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpherePoint {
    pub position: [f64; 3],
    /// Point the card faces, away from the sphere's center.
    pub look_at: [f64; 3],
}

/// One revealed winner's card target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WinnerPlacement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    /// 0-based row in the sub-layout.
    pub row: usize,
    /// 0-based position within the row.
    pub index_in_row: usize,
}

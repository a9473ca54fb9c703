/// Rows in the full participant grid. Grid capacity is `row_width * GRID_ROWS`.
pub const GRID_ROWS: usize = 7;

/// Maximum winners drawn in a single spin, regardless of remaining quota.
pub const SINGLE_DRAW_CAP: usize = 10;

/// Largest winner count the reveal sub-layout ruleset covers.
pub const WINNER_LAYOUT_MAX: usize = 30;

/// Maximum display-name length accepted when validating participant records.
pub const MAX_NAME_LENGTH: usize = 64;

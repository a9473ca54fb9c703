use stagedraw_types::GRID_ROWS;

use super::GridSlot;

/// Row-major grid placement for a roster of any size.
///
/// The grid always holds `row_width * GRID_ROWS` cards: a short roster is
/// tiled end-to-end until the grid is full, a long roster is truncated. Slot
/// `i` lands at column `i % row_width + 1`, row `i / row_width + 1`.
///
/// Returns an empty layout when the roster or the row width is empty.
pub fn grid_slots(roster_len: usize, row_width: usize) -> Vec<GridSlot> {
    if roster_len == 0 || row_width == 0 {
        return Vec::new();
    }
    let capacity = row_width * GRID_ROWS;
    (0..capacity)
        .map(|i| GridSlot {
            participant: i % roster_len,
            column: (i % row_width) as u32 + 1,
            row: (i / row_width) as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fills_exactly_row_width_times_rows() {
        for row_width in [1usize, 3, 7, 17] {
            for roster_len in [1usize, 5, 119, 200] {
                let slots = grid_slots(roster_len, row_width);
                assert_eq!(slots.len(), row_width * GRID_ROWS);
            }
        }
    }

    #[test]
    fn coordinates_are_unique_and_in_bounds() {
        let row_width = 17;
        let slots = grid_slots(50, row_width);
        let mut seen = HashSet::new();
        for slot in &slots {
            assert!((1..=row_width as u32).contains(&slot.column));
            assert!((1..=GRID_ROWS as u32).contains(&slot.row));
            assert!(seen.insert((slot.column, slot.row)), "duplicate coordinate");
        }
    }

    #[test]
    fn short_roster_tiles_cyclically() {
        let slots = grid_slots(3, 7);
        assert_eq!(slots.len(), 49);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.participant, i % 3);
        }
    }

    #[test]
    fn long_roster_truncates_to_capacity() {
        let slots = grid_slots(1000, 7);
        assert_eq!(slots.len(), 49);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.participant, i);
        }
    }

    #[test]
    fn empty_inputs_yield_empty_layout() {
        assert!(grid_slots(0, 7).is_empty());
        assert!(grid_slots(10, 0).is_empty());
    }
}

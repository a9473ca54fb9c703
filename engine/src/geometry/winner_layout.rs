use thiserror::Error;

use super::{CardSize, WindowSize, WinnerPlacement};

/// Scale and row split for one reveal size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutRule {
    pub scale: f64,
    pub rows: &'static [usize],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no reveal layout for {0} winners")]
    UnsupportedCount(usize),
}

/// Hand-tuned reveal table, one entry per winner count 1..=30.
///
/// Small draws blow the cards up, large draws shrink them and spread over up
/// to three rows. Row splits keep the stage visually balanced (the widest
/// row is at the bottom).
const RULES: [LayoutRule; 30] = [
    LayoutRule { scale: 2.0, rows: &[1] },
    LayoutRule { scale: 2.0, rows: &[2] },
    LayoutRule { scale: 2.0, rows: &[3] },
    LayoutRule { scale: 2.0, rows: &[4] },
    LayoutRule { scale: 2.0, rows: &[5] },
    LayoutRule { scale: 2.0, rows: &[3, 3] },
    LayoutRule { scale: 2.0, rows: &[3, 4] },
    LayoutRule { scale: 2.0, rows: &[3, 5] },
    LayoutRule { scale: 2.0, rows: &[4, 5] },
    LayoutRule { scale: 2.0, rows: &[5, 5] },
    LayoutRule { scale: 1.8, rows: &[5, 6] },
    LayoutRule { scale: 1.8, rows: &[6, 6] },
    LayoutRule { scale: 1.6, rows: &[6, 7] },
    LayoutRule { scale: 1.6, rows: &[7, 7] },
    LayoutRule { scale: 1.5, rows: &[7, 8] },
    LayoutRule { scale: 1.5, rows: &[8, 8] },
    LayoutRule { scale: 1.8, rows: &[5, 6, 6] },
    LayoutRule { scale: 1.8, rows: &[6, 6, 6] },
    LayoutRule { scale: 1.6, rows: &[6, 6, 7] },
    LayoutRule { scale: 1.6, rows: &[6, 7, 7] },
    LayoutRule { scale: 1.6, rows: &[7, 7, 7] },
    LayoutRule { scale: 1.5, rows: &[7, 7, 8] },
    LayoutRule { scale: 1.5, rows: &[7, 8, 8] },
    LayoutRule { scale: 1.5, rows: &[8, 8, 8] },
    LayoutRule { scale: 1.3, rows: &[8, 8, 9] },
    LayoutRule { scale: 1.3, rows: &[8, 9, 9] },
    LayoutRule { scale: 1.3, rows: &[9, 9, 9] },
    LayoutRule { scale: 1.2, rows: &[9, 9, 10] },
    LayoutRule { scale: 1.2, rows: &[9, 10, 10] },
    LayoutRule { scale: 1.2, rows: &[10, 10, 10] },
];

/// Reveal rule for `winners` cards, if the count is supported.
pub fn layout_rule(winners: usize) -> Result<LayoutRule, LayoutError> {
    if winners == 0 || winners > RULES.len() {
        return Err(LayoutError::UnsupportedCount(winners));
    }
    Ok(RULES[winners - 1])
}

/// Compute centered reveal placements for `winners` cards.
///
/// Cards sit in the rows the rule dictates, each row horizontally centered
/// on x = 0, the whole block vertically centered in the window. Spacing is
/// 1.2 card widths across and 1.1 card heights down at the rule's scale.
pub fn winner_placements(
    winners: usize,
    card: CardSize,
    window: WindowSize,
) -> Result<Vec<WinnerPlacement>, LayoutError> {
    let rule = layout_rule(winners)?;

    let scaled_width = card.width * rule.scale;
    let scaled_height = card.height * rule.scale;
    let horizontal_spacing = scaled_width * 1.2;
    let vertical_spacing = scaled_height * 1.1;
    let total_height = (rule.rows.len() - 1) as f64 * vertical_spacing + scaled_height;
    let center_y = window.height / 2.0 - total_height / 2.0;

    let mut placements = Vec::with_capacity(winners);
    for (row, &cards_in_row) in rule.rows.iter().enumerate() {
        let offset_x = -((cards_in_row - 1) as f64) * horizontal_spacing / 2.0;
        let y = center_y + row as f64 * vertical_spacing - total_height / 2.0
            + scaled_height / 2.0;
        for index_in_row in 0..cards_in_row {
            placements.push(WinnerPlacement {
                x: offset_x + index_in_row as f64 * horizontal_spacing,
                y,
                scale: rule.scale,
                row,
                index_in_row,
            });
        }
    }
    Ok(placements)
}

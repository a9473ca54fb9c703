use serde::{Deserialize, Serialize};

/// Phase of a draw session.
///
/// The machine cycles `Idle -> Armed -> Running -> Revealed`, then either
/// back to `Armed` (commit and re-arm) or to `Idle` (discard). There is no
/// terminal phase; the machine runs for the lifetime of the event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawPhase {
    /// Cards flat on the grid, nothing staged.
    #[default]
    Idle,
    /// Sphere staged, waiting for the operator to start a spin.
    Armed,
    /// Spin in progress, pending winner set selected.
    Running,
    /// Winners revealed on the sub-layout, awaiting commit or discard.
    Revealed,
}

impl DrawPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawPhase::Idle => "idle",
            DrawPhase::Armed => "armed",
            DrawPhase::Running => "running",
            DrawPhase::Revealed => "revealed",
        }
    }
}

impl std::fmt::Display for DrawPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Transition constraints.
//!
//! For consecutive rows `a -> b`:
//! - clock: `b.clk - a.clk - 1`
//! - depth: `b.depth - a.depth - delta(b.opcode)`
//!
//! A transition evaluates to the random linear combination of the two with the
//! transcript coefficients; a valid trace evaluates to zero everywhere.

use crate::engine::reference::assembly::OpCode;
use crate::engine::reference::field::Felt;
use crate::engine::reference::processor::{
    CLK_COLUMN, DEPTH_COLUMN, OPCODE_COLUMN, TRACE_WIDTH,
};
use crate::work::ConstraintWorkItem;
use thiserror::Error;

pub const NUM_CONSTRAINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("expected two coefficients, got {0}")]
    Coefficients(usize),

    #[error("row {row} has width {width}, expected {}", TRACE_WIDTH)]
    RowWidth { row: usize, width: usize },

    #[error("row {row} carries unknown opcode {opcode}")]
    UnknownOpcode { row: usize, opcode: u64 },
}

fn coefficients(raw: &[u64]) -> Result<[Felt; NUM_CONSTRAINTS], ConstraintError> {
    match raw {
        [clock, depth] => Ok([Felt::new(*clock), Felt::new(*depth)]),
        other => Err(ConstraintError::Coefficients(other.len())),
    }
}

fn depth_delta(opcode: OpCode) -> Felt {
    match opcode.depth_delta() {
        d if d >= 0 => Felt::new(d as u64),
        d => -Felt::new(d.unsigned_abs()),
    }
}

/// Evaluate every transition between consecutive `rows`. `first_row` is the trace
/// index of `rows[0]` and only labels errors.
pub fn evaluate_rows(
    rows: &[Vec<u64>],
    first_row: usize,
    raw_coefficients: &[u64],
) -> Result<Vec<u64>, ConstraintError> {
    let [alpha, beta] = coefficients(raw_coefficients)?;

    for (offset, row) in rows.iter().enumerate() {
        if row.len() != TRACE_WIDTH {
            return Err(ConstraintError::RowWidth {
                row: first_row + offset,
                width: row.len(),
            });
        }
    }

    rows.windows(2)
        .enumerate()
        .map(|(offset, pair)| {
            let (current, next) = (&pair[0], &pair[1]);
            let opcode = OpCode::from_u64(next[OPCODE_COLUMN]).ok_or(
                ConstraintError::UnknownOpcode {
                    row: first_row + offset + 1,
                    opcode: next[OPCODE_COLUMN],
                },
            )?;

            let clock =
                Felt::new(next[CLK_COLUMN]) - Felt::new(current[CLK_COLUMN]) - Felt::ONE;
            let depth = Felt::new(next[DEPTH_COLUMN])
                - Felt::new(current[DEPTH_COLUMN])
                - depth_delta(opcode);

            Ok((alpha * clock + beta * depth).as_u64())
        })
        .collect()
}

/// Split the transitions of `trace` into at most `num_fragments` contiguous
/// fragments. Adjacent fragments share their boundary row.
pub fn fragment_trace(
    trace: &[Vec<u64>],
    num_fragments: usize,
    coefficients: &[u64],
) -> Vec<ConstraintWorkItem> {
    let transitions = trace.len().saturating_sub(1);
    if transitions == 0 {
        return Vec::new();
    }
    let per_fragment = transitions.div_ceil(num_fragments.max(1));
    let count = transitions.div_ceil(per_fragment);

    (0..count)
        .map(|fragment_offset| {
            let first_row = fragment_offset * per_fragment;
            let last_row = (first_row + per_fragment).min(transitions);
            ConstraintWorkItem {
                fragment_offset,
                num_fragments: count,
                first_row,
                rows: trace[first_row..=last_row].to_vec(),
                coefficients: coefficients.to_vec(),
            }
        })
        .collect()
}

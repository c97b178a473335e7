//! Geometry validation.
//!
//! [`validate_tables`] runs on every geometry before it is constructed, so a
//! [`Geometry`] value always satisfies the structural invariants the engine
//! indexes by. [`validate_channels`] is checked separately when the channel
//! count of the input stream is known.

use crate::geometry::{Geometry, GeometryHeader, GeometryTables, MAX_SENSORS};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Geometry has no dense points.
    #[error("dense grid is empty")]
    EmptyGrid,

    /// Dense grid larger than supported.
    #[error("dense grid of {size} points exceeds the maximum of {max}")]
    GridTooLarge {
        /// Dense grid size.
        size: usize,
        /// Supported maximum.
        max: usize,
    },

    /// A table does not have the dimensions the header implies.
    #[error("table '{table}' has {found} entries, expected {expected}")]
    ShapeMismatch {
        /// Table name.
        table: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        found: usize,
    },

    /// A dense point has zero neighbours or more than the table holds.
    #[error("dense point {point} has {count} neighbours, allowed 1..={max}")]
    NeighborCount {
        /// Dense point index.
        point: usize,
        /// Declared neighbour count.
        count: usize,
        /// Neighbour table width.
        max: usize,
    },

    /// A 1-based index stored as zero.
    #[error("zero index in '{table}' at entry {position} (indices are 1-based)")]
    ZeroIndex {
        /// Table name.
        table: &'static str,
        /// Flat entry position.
        position: usize,
    },

    /// Reverse flag other than -1, 0 or 1.
    #[error("combination pointer {entry} has reverse flag {flag}, expected -1, 0 or 1")]
    InvalidReverseFlag {
        /// Pointer entry.
        entry: usize,
        /// Stored flag.
        flag: i8,
    },

    /// Pointer count differs from the sum of non-reference neighbours.
    #[error("{found} combination pointers, neighbour tables require {expected}")]
    CombinationCount {
        /// Required count.
        expected: usize,
        /// Stored count.
        found: usize,
    },

    /// A pointer names a combination slot that does not exist.
    #[error("combination pointer {entry} names slot {slot}, only {len} combinations exist")]
    SlotOutOfRange {
        /// Pointer entry.
        entry: usize,
        /// Referenced slot (0-based).
        slot: usize,
        /// Combination count.
        len: usize,
    },

    /// A per-neighbour shift bound exceeds the overall bound.
    #[error("dense point {point} neighbour {neighbor}: max shift {shift} exceeds overall {overall}")]
    MaxShiftExceeded {
        /// Dense point.
        point: usize,
        /// Neighbour slot.
        neighbor: usize,
        /// Per-neighbour bound.
        shift: usize,
        /// Overall bound.
        overall: usize,
    },

    /// A referenced sparse channel is not present in the input.
    #[error("sparse channel {channel} referenced but only {channels} input channels available")]
    ChannelOutOfRange {
        /// Referenced channel (0-based).
        channel: usize,
        /// Available channels.
        channels: usize,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn collapse(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn check_shape(
    errors: &mut Vec<ValidationError>,
    table: &'static str,
    rows: usize,
    cols: usize,
    expected_rows: usize,
    expected_cols: usize,
) -> bool {
    if rows == expected_rows && cols == expected_cols {
        true
    } else {
        errors.push(ValidationError::ShapeMismatch {
            table,
            expected: expected_rows * expected_cols,
            found: rows * cols,
        });
        false
    }
}

/// Checks structural invariants of geometry tables.
///
/// Shape errors stop further checks, since later checks index by shape.
/// Everything else is collected and reported together.
pub fn validate_tables(header: &GeometryHeader, tables: &GeometryTables) -> ValidationResult<()> {
    let dense = tables.num_neighbors.len();
    if dense == 0 {
        return Err(ValidationError::EmptyGrid);
    }
    if dense > MAX_SENSORS {
        return Err(ValidationError::GridTooLarge {
            size: dense,
            max: MAX_SENSORS,
        });
    }

    let list_len = tables.neighbor_indices.cols();
    let mut errors = Vec::new();
    let mut shapes_ok = check_shape(
        &mut errors,
        "neighbor_indices",
        tables.neighbor_indices.rows(),
        list_len,
        dense,
        list_len.max(1),
    );
    shapes_ok &= check_shape(
        &mut errors,
        "neighbor_weights",
        tables.neighbor_weights.rows(),
        tables.neighbor_weights.cols(),
        dense,
        list_len,
    );
    shapes_ok &= check_shape(
        &mut errors,
        "max_shift",
        tables.max_shift.rows(),
        tables.max_shift.cols(),
        dense,
        list_len.saturating_sub(1),
    );
    shapes_ok &= check_shape(
        &mut errors,
        "dense_grid",
        tables.directions.len(),
        1,
        dense,
        1,
    );
    if !shapes_ok {
        return collapse(errors);
    }

    let mut expected_refs = 0;
    for (point, &count) in tables.num_neighbors.iter().enumerate() {
        if count == 0 || count > list_len {
            errors.push(ValidationError::NeighborCount {
                point,
                count,
                max: list_len,
            });
            continue;
        }
        expected_refs += count - 1;

        for j in 1..count {
            let shift = *tables.max_shift.get(point, j - 1);
            if shift > header.max_shift_overall {
                errors.push(ValidationError::MaxShiftExceeded {
                    point,
                    neighbor: j,
                    shift,
                    overall: header.max_shift_overall,
                });
            }
        }
    }

    if errors.is_empty() && expected_refs != tables.combination_refs.len() {
        errors.push(ValidationError::CombinationCount {
            expected: expected_refs,
            found: tables.combination_refs.len(),
        });
    }

    let len = tables.combinations.len();
    for (entry, r) in tables.combination_refs.iter().enumerate() {
        if r.slot >= len {
            errors.push(ValidationError::SlotOutOfRange {
                entry,
                slot: r.slot,
                len,
            });
        }
    }

    collapse(errors)
}

/// Checks that every sparse channel `geometry` references exists among
/// `channels` inputs.
pub fn validate_channels(geometry: &Geometry, channels: usize) -> ValidationResult<()> {
    let required = geometry.sparse_channels();
    if required > channels {
        return Err(ValidationError::ChannelOutOfRange {
            channel: required - 1,
            channels,
        });
    }
    Ok(())
}

/// Logs a warning when a lookup's stored pair is not the (reference,
/// neighbour) pair it serves. Such files load, but the delay estimate for
/// that neighbour is measured against the wrong sensors.
pub(crate) fn warn_on_pair_mismatch(geometry: &Geometry) {
    let mut mismatches = 0usize;
    for d in 0..geometry.dense_grid_size() {
        let neighbors = geometry.neighbors(d);
        for j in 1..neighbors.len() {
            let r = geometry.combination(d, j);
            let stored = geometry.combinations()[r.slot];
            let expected = if r.reversed {
                (neighbors[j], neighbors[0])
            } else {
                (neighbors[0], neighbors[j])
            };
            if stored != expected {
                mismatches += 1;
            }
        }
    }
    if mismatches > 0 {
        tracing::warn!(
            mismatches,
            "combination pointers do not match their neighbour pairs"
        );
    }
}

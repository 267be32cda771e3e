use std::collections::TryReserveError;

use thiserror::Error as ThisError;

use crate::RowId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("tuple must contain at least one value")]
    EmptyTuple,

    #[error("tuple has {got} values but the tree has depth {expected}")]
    DepthMismatch { expected: usize, got: usize },

    #[error("row id space exhausted after row {0}")]
    RowIdOverflow(RowId),

    #[error("row {row} is below the base row {base}")]
    RowBelowBase { row: RowId, base: RowId },

    #[error("node arena is full ({0} nodes)")]
    NodeIdOverflow(usize),

    #[error("failed to grow storage: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("expected {expected} nodata values, got {got}")]
    NodataCount { expected: usize, got: usize },

    #[error("layer {layer} has {got} pixels, expected {expected}")]
    LayerLength {
        layer: usize,
        expected: usize,
        got: usize,
    },
}

//! Tuning knobs for a [`RatTree`](crate::RatTree).

use crate::error::{Error, Result};
use crate::{RowId, NODATA_ROW};

/// Initial size of the row table and the number of rows it grows by (~500k).
pub const DEFAULT_GROW_SIZE: usize = 1 << 19;

/// Row id handed to the first distinct tuple.
pub const DEFAULT_BASE_ROW: RowId = 1;

/// Configuration for a [`RatTree`](crate::RatTree).
///
/// Neither field affects which tuples share a row; `grow_size` only changes
/// how often the row table reallocates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of rows the table is allocated in, and grown by when full.
    pub grow_size: usize,
    /// Row id assigned to the first distinct tuple. Must be above
    /// [`NODATA_ROW`].
    pub base_row: RowId,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grow_size: DEFAULT_GROW_SIZE,
            base_row: DEFAULT_BASE_ROW,
        }
    }
}

impl Config {
    pub fn with_grow_size(mut self, grow_size: usize) -> Self {
        self.grow_size = grow_size;
        self
    }

    pub fn with_base_row(mut self, base_row: RowId) -> Self {
        self.base_row = base_row;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.grow_size == 0 {
            return Err(Error::InvalidConfig("grow_size must be non-zero".into()));
        }
        if self.base_row <= NODATA_ROW {
            return Err(Error::InvalidConfig(format!(
                "base_row must be greater than the nodata row ({NODATA_ROW})"
            )));
        }
        Ok(())
    }
}

//! Row storage for the tree.
//!
//! [`RowTable`] is the buffer the tree writes into while it runs: rows are
//! filled in the moment a new leaf is created, so the final size is unknown
//! up front and capacity is added in chunks of `grow_size` rows.
//! [`RatTable`] is the finalized, exactly-sized copy handed to callers.

use std::ops::Index;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::stats::HistogramStats;
use crate::{LayerValue, RowId};

/// Growable row-major table addressed by row id.
#[derive(Clone, Debug)]
pub struct RowTable<T> {
    ncols: usize,
    base: RowId,
    grow_size: usize,
    /// `capacity_rows() * ncols` values; only the first `len` rows are meaningful.
    data: Vec<T>,
    /// Occurrence count per row, same capacity as `data`.
    counts: Vec<u64>,
    len: usize,
}

impl<T: LayerValue> RowTable<T> {
    /// Creates an empty table. Nothing is allocated until the first
    /// [`ensure_capacity_for`](Self::ensure_capacity_for).
    ///
    /// `base` and `grow_size` must pass [`Config::validate`].
    pub fn new(ncols: usize, base: RowId, grow_size: usize) -> Result<Self> {
        Config {
            grow_size,
            base_row: base,
        }
        .validate()?;
        Ok(Self {
            ncols,
            base,
            grow_size,
            data: Vec::new(),
            counts: Vec::new(),
            len: 0,
        })
    }

    #[inline]
    fn slot(&self, row: RowId) -> Result<usize> {
        match row.checked_sub(self.base) {
            Some(slot) => Ok(slot as usize),
            None => Err(Error::RowBelowBase {
                row,
                base: self.base,
            }),
        }
    }

    #[inline]
    fn slot_or_panic(&self, row: RowId) -> usize {
        assert!(row >= self.base, "row {row} below base {}", self.base);
        (row - self.base) as usize
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn base_row(&self) -> RowId {
        self.base
    }

    /// Number of rows written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows that fit before the next growth.
    #[inline]
    pub fn capacity_rows(&self) -> usize {
        self.counts.len()
    }

    /// Grows the table by whole chunks until `row` fits.
    ///
    /// Fails for a row below the base row. On allocation failure the table
    /// is left exactly as it was.
    pub fn ensure_capacity_for(&mut self, row: RowId) -> Result<()> {
        let needed = self.slot(row)? + 1;
        let cap = self.capacity_rows();
        if needed <= cap {
            return Ok(());
        }

        let chunks = (needed - cap).div_ceil(self.grow_size);
        let extra = chunks.saturating_mul(self.grow_size);
        let new_cap = cap.saturating_add(extra);

        self.data.try_reserve_exact(extra.saturating_mul(self.ncols))?;
        self.counts.try_reserve_exact(extra)?;
        self.data.resize(new_cap * self.ncols, T::default());
        self.counts.resize(new_cap, 0);

        debug!(
            rows = self.len,
            old_capacity = cap,
            new_capacity = new_cap,
            "grew row table"
        );
        Ok(())
    }

    /// Writes `tuple` as the contents of `row`.
    ///
    /// # Panics
    /// Panics if `row` is below the base row or beyond the current capacity,
    /// or if the tuple width differs from the table's.
    pub fn write_row(&mut self, row: RowId, tuple: &[T]) {
        assert_eq!(tuple.len(), self.ncols, "tuple width must match table");
        let slot = self.slot_or_panic(row);
        let start = slot * self.ncols;
        self.data[start..start + self.ncols].copy_from_slice(tuple);
        self.len = self.len.max(slot + 1);
    }

    /// Counts one more occurrence of `row`.
    ///
    /// # Panics
    /// Panics if `row` is below the base row or beyond the current capacity.
    #[inline]
    pub fn record_hit(&mut self, row: RowId) {
        let slot = self.slot_or_panic(row);
        self.counts[slot] += 1;
    }

    pub fn row(&self, row: RowId) -> Option<&[T]> {
        let slot = self.slot(row).ok()?;
        if slot >= self.len {
            return None;
        }
        let start = slot * self.ncols;
        Some(&self.data[start..start + self.ncols])
    }

    pub fn count(&self, row: RowId) -> Option<u64> {
        let slot = self.slot(row).ok()?;
        (slot < self.len).then(|| self.counts[slot])
    }

    /// Copies the written rows into a [`RatTable`]. Unused capacity is never
    /// exposed, and calling this repeatedly without new rows yields equal tables.
    pub fn finalize(&self) -> RatTable<T> {
        RatTable {
            ncols: self.ncols,
            base: self.base,
            data: self.data[..self.len * self.ncols].to_vec(),
            counts: self.counts[..self.len].to_vec(),
        }
    }

    /// Like [`finalize`](Self::finalize) but truncates the buffers in place.
    pub fn into_finalized(mut self) -> RatTable<T> {
        self.data.truncate(self.len * self.ncols);
        self.counts.truncate(self.len);
        self.data.shrink_to_fit();
        self.counts.shrink_to_fit();
        RatTable {
            ncols: self.ncols,
            base: self.base,
            data: self.data,
            counts: self.counts,
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.data.capacity() * std::mem::size_of::<T>() + self.counts.capacity() * 8
    }

    /// Drops spare capacity. The next new row will grow the table again.
    pub fn shrink_to_fit(&mut self) {
        self.data.truncate(self.len * self.ncols);
        self.counts.truncate(self.len);
        self.data.shrink_to_fit();
        self.counts.shrink_to_fit();
    }
}

/// A finalized attribute table: one row per distinct tuple, one column per
/// input layer, plus the number of times each row was hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatTable<T> {
    ncols: usize,
    base: RowId,
    data: Vec<T>,
    counts: Vec<u64>,
}

impl<T: LayerValue> RatTable<T> {
    pub(crate) fn empty(base: RowId) -> Self {
        Self {
            ncols: 0,
            base,
            data: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Number of distinct tuples.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn base_row(&self) -> RowId {
        self.base
    }

    /// Last row id present, if any.
    pub fn last_row(&self) -> Option<RowId> {
        (!self.is_empty()).then(|| self.base + (self.len() - 1) as RowId)
    }

    pub fn row(&self, row: RowId) -> Option<&[T]> {
        let slot = row.checked_sub(self.base)? as usize;
        if slot >= self.len() {
            return None;
        }
        let start = slot * self.ncols;
        Some(&self.data[start..start + self.ncols])
    }

    pub fn count(&self, row: RowId) -> Option<u64> {
        let slot = row.checked_sub(self.base)? as usize;
        self.counts.get(slot).copied()
    }

    /// Rows in id order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &[T])> + '_ {
        let base = self.base;
        self.data
            .chunks_exact(self.ncols.max(1))
            .enumerate()
            .map(move |(i, row)| (base + i as RowId, row))
    }

    /// Occurrence counts in row order, starting at the base row.
    #[inline]
    pub fn histogram(&self) -> &[u64] {
        &self.counts
    }

    /// Values of layer `col` for every row, indexed by pixel value: entries
    /// `0..base_row` hold `T::default()` placeholders, so the result grows
    /// with `base_row` as well as with the row count.
    pub fn column(&self, col: usize) -> Option<Vec<T>> {
        if col >= self.ncols {
            return None;
        }
        let mut out = Vec::with_capacity(self.base as usize + self.len());
        out.resize(self.base as usize, T::default());
        out.extend(self.rows().map(|(_, row)| row[col]));
        Some(out)
    }

    /// Pixel counts indexed by pixel value, zero below the base row.
    pub fn histogram_column(&self) -> Vec<u64> {
        let mut out = vec![0; self.base as usize];
        out.extend_from_slice(&self.counts);
        out
    }

    /// Band statistics of the derived raster, estimated from the histogram.
    /// Reads the counts in place; no padded copy is built.
    pub fn statistics(&self) -> Option<HistogramStats> {
        HistogramStats::from_offset_histogram(&self.counts, self.base)
    }
}

impl<T: LayerValue> Index<RowId> for RatTable<T> {
    type Output = [T];

    fn index(&self, row: RowId) -> &[T] {
        match self.row(row) {
            Some(values) => values,
            None => panic!("row {row} is not in the table"),
        }
    }
}

//! # rattree
//!
//! Assigns a compact row id to every distinct combination of values drawn
//! from N aligned thematic layers, and builds the matching raster attribute
//! table (one row per combination, one column per layer) as it goes.
//!
//! The index is a trie with one level per layer. Each level is a singly
//! linked sibling list of the values seen after a given prefix, so looking up
//! a tuple walks exactly N levels. A new leaf immediately writes its tuple
//! into a chunk-grown [`RowTable`], which avoids a second traversal to build
//! the table at the end.
//!
//! ## Example
//!
//! ```rust
//! use rattree::RatTree;
//!
//! let mut tree: RatTree<u32> = RatTree::new();
//! assert_eq!(tree.insert_or_lookup(&[5, 3, 9])?, 1);
//! assert_eq!(tree.insert_or_lookup(&[5, 4, 8])?, 2);
//! assert_eq!(tree.insert_or_lookup(&[5, 3, 9])?, 1);
//!
//! let table = tree.finalize();
//! assert_eq!(table.len(), 2);
//! assert_eq!(&table[2], &[5, 4, 8]);
//! # Ok::<(), rattree::Error>(())
//! ```

use std::fmt;

use tracing::{debug, trace};

mod block;
pub mod config;
mod error;
pub mod stats;
pub mod table;

pub use config::Config;
pub use error::{Error, Result};
pub use stats::HistogramStats;
pub use table::{RatTable, RowTable};

/// Identifier of a distinct tuple; also the pixel value of the derived raster.
pub type RowId = u32;

/// Pixel value written for pixels where any layer holds its nodata value.
/// Never assigned to a tuple.
pub const NODATA_ROW: RowId = 0;

/// A discrete layer value (thematic class code). The tree only compares
/// values for equality; sentinel codes are ordinary values to it.
pub trait LayerValue: Copy + Eq + Default + fmt::Debug {}

impl<T> LayerValue for T where T: Copy + Eq + Default + fmt::Debug {}

// =============================================================================
// Node arena
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(u32);

/// What a node leads to: the next level's sibling list, or (at the final
/// level) the row assigned to the path ending here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Child(Option<NodeId>),
    Row(RowId),
}

#[derive(Clone, Debug)]
struct Node<T> {
    value: T,
    sibling: Option<NodeId>,
    link: Link,
}

#[derive(Clone, Debug)]
struct NodeArena<T> {
    nodes: Vec<Node<T>>,
}

impl<T: LayerValue> NodeArena<T> {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn capacity(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node<T>>()
    }

    fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Makes room for `additional` pushes so they cannot fail.
    fn reserve(&mut self, additional: usize) -> Result<()> {
        if self.nodes.len() + additional > u32::MAX as usize {
            return Err(Error::NodeIdOverflow(self.nodes.len()));
        }
        self.nodes.try_reserve(additional)?;
        Ok(())
    }

    #[inline]
    fn push(&mut self, value: T, link: Link) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            value,
            sibling: None,
            link,
        });
        id
    }

    #[inline]
    fn get(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0 as usize]
    }

    fn siblings(&self, first: Option<NodeId>) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(first, move |&id| self.get(id).sibling)
    }

    /// Linear scan of one sibling list. Siblings never share a value.
    #[inline]
    fn find(&self, first: Option<NodeId>, value: T) -> Option<NodeId> {
        self.siblings(first).find(|&id| self.get(id).value == value)
    }

    /// The sibling list one level below `id` (empty at the final level).
    #[inline]
    fn children(&self, id: NodeId) -> Option<NodeId> {
        match self.get(id).link {
            Link::Child(child) => child,
            Link::Row(_) => None,
        }
    }
}

// =============================================================================
// RatTree
// =============================================================================

/// Where a lookup stopped.
enum Descent {
    Found(RowId),
    /// No node at `level` matched. `first` is that level's sibling list and
    /// `parent` the node it hangs off (`None` at level 0).
    Diverged {
        level: usize,
        parent: Option<NodeId>,
        first: Option<NodeId>,
    },
}

/// Trie over value tuples that hands out one row id per distinct tuple and
/// records each new tuple in a row table.
///
/// The tuple length (depth) is fixed by the first insertion.
#[derive(Clone)]
pub struct RatTree<T> {
    nodes: NodeArena<T>,
    /// First node of the level-0 sibling list.
    head: Option<NodeId>,
    /// Created on the first insertion.
    table: Option<RowTable<T>>,
    next_row: RowId,
    config: Config,
}

impl<T: LayerValue> RatTree<T> {
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: Config) -> Self {
        Self {
            nodes: NodeArena::new(),
            head: None,
            table: None,
            next_row: config.base_row,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of distinct tuples seen.
    #[inline]
    pub fn len(&self) -> usize {
        (self.next_row - self.config.base_row) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next_row == self.config.base_row
    }

    /// Tuple length, once the first tuple has been inserted.
    #[inline]
    pub fn depth(&self) -> Option<usize> {
        self.table.as_ref().map(RowTable::ncols)
    }

    /// Row id the next new tuple will receive.
    #[inline]
    pub fn next_row(&self) -> RowId {
        self.next_row
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes at each level, top level first.
    pub fn level_widths(&self) -> Vec<usize> {
        let mut widths = Vec::new();
        let mut level: Vec<NodeId> = self.nodes.siblings(self.head).collect();
        while !level.is_empty() {
            widths.push(level.len());
            level = level
                .iter()
                .flat_map(|&id| self.nodes.siblings(self.nodes.children(id)))
                .collect();
        }
        widths
    }

    fn check_depth(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::EmptyTuple);
        }
        match self.depth() {
            Some(expected) if expected != len => Err(Error::DepthMismatch { expected, got: len }),
            _ => Ok(()),
        }
    }

    fn descend(&self, tuple: &[T]) -> Descent {
        let mut parent = None;
        let mut first = self.head;
        for (level, &value) in tuple.iter().enumerate() {
            let Some(id) = self.nodes.find(first, value) else {
                return Descent::Diverged {
                    level,
                    parent,
                    first,
                };
            };
            match self.nodes.get(id).link {
                Link::Row(row) => return Descent::Found(row),
                Link::Child(child) => {
                    parent = Some(id);
                    first = child;
                }
            }
        }
        unreachable!("final-level node without a row")
    }

    fn table_for<'a>(
        table: &'a mut Option<RowTable<T>>,
        config: &Config,
        depth: usize,
    ) -> Result<&'a mut RowTable<T>> {
        if table.is_none() {
            let mut fresh = RowTable::new(depth, config.base_row, config.grow_size)?;
            fresh.ensure_capacity_for(config.base_row)?;
            debug!(depth, grow_size = config.grow_size, "created row table");
            *table = Some(fresh);
        }
        match table {
            Some(table) => Ok(table),
            None => unreachable!("row table was just created"),
        }
    }

    /// Returns the row id of `tuple`, assigning the next id and writing the
    /// tuple into the table if it has not been seen before.
    ///
    /// Every call also counts one occurrence of the returned row.
    pub fn insert_or_lookup(&mut self, tuple: &[T]) -> Result<RowId> {
        self.check_depth(tuple.len())?;
        let row = match self.descend(tuple) {
            Descent::Found(row) => row,
            Descent::Diverged {
                level,
                parent,
                first,
            } => self.graft(tuple, level, parent, first)?,
        };
        Self::table_for(&mut self.table, &self.config, tuple.len())?.record_hit(row);
        Ok(row)
    }

    /// Row id of `tuple` if it has been inserted. Never modifies the tree.
    pub fn lookup(&self, tuple: &[T]) -> Option<RowId> {
        if self.check_depth(tuple.len()).is_err() {
            return None;
        }
        match self.descend(tuple) {
            Descent::Found(row) => Some(row),
            Descent::Diverged { .. } => None,
        }
    }

    /// Adds the chain of nodes for `tuple[level..]` and assigns it a new row.
    ///
    /// Every fallible step runs before the tree is touched, so an error
    /// leaves both the tree and the table as they were.
    fn graft(
        &mut self,
        tuple: &[T],
        level: usize,
        parent: Option<NodeId>,
        first: Option<NodeId>,
    ) -> Result<RowId> {
        let row = self.next_row;
        let next_row = row.checked_add(1).ok_or(Error::RowIdOverflow(row))?;
        let last = tuple.len() - 1;

        self.nodes.reserve(tuple.len() - level)?;
        let table = Self::table_for(&mut self.table, &self.config, tuple.len())?;
        table.ensure_capacity_for(row)?;

        // Past the divergence point nothing can match, so build a straight
        // chain bottom-up without scanning.
        let mut top = self.nodes.push(tuple[last], Link::Row(row));
        for &value in tuple[level..last].iter().rev() {
            top = self.nodes.push(value, Link::Child(Some(top)));
        }

        match (first, parent) {
            // Splice in right after the first sibling.
            (Some(first), _) => {
                let after = self.nodes.get(first).sibling;
                self.nodes.get_mut(top).sibling = after;
                self.nodes.get_mut(first).sibling = Some(top);
            }
            (None, Some(parent)) => self.nodes.get_mut(parent).link = Link::Child(Some(top)),
            (None, None) => self.head = Some(top),
        }

        table.write_row(row, tuple);
        self.next_row = next_row;
        trace!(row, level, "new branch");
        Ok(row)
    }

    /// The deduplicated table, truncated to the rows assigned so far.
    ///
    /// Cheap to call repeatedly; equal results until the next new tuple.
    pub fn finalize(&self) -> RatTable<T> {
        let table = match &self.table {
            Some(table) => table.finalize(),
            None => RatTable::empty(self.config.base_row),
        };
        debug!(rows = table.len(), "finalized row table");
        table
    }

    /// Consumes the tree and truncates the table in place.
    pub fn into_table(self) -> RatTable<T> {
        match self.table {
            Some(table) => table.into_finalized(),
            None => RatTable::empty(self.config.base_row),
        }
    }

    /// Rows written so far, without copying. Unwritten capacity is not exposed.
    pub fn row(&self, row: RowId) -> Option<&[T]> {
        self.table.as_ref()?.row(row)
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity() + self.table.as_ref().map_or(0, RowTable::memory_usage)
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        if let Some(table) = &mut self.table {
            table.shrink_to_fit();
        }
    }

    /// Every stored tuple with its row, depth first in sibling-list order.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut stack: Vec<(NodeId, usize)> =
            self.nodes.siblings(self.head).map(|id| (id, 0)).collect();
        stack.reverse();
        Iter {
            tree: self,
            stack,
            path: Vec::new(),
        }
    }
}

impl<T: LayerValue> Default for RatTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LayerValue> fmt::Debug for RatTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    tree: &'a RatTree<T>,
    stack: Vec<(NodeId, usize)>,
    path: Vec<T>,
}

impl<'a, T: LayerValue> Iterator for Iter<'a, T> {
    type Item = (Vec<T>, RowId);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, level)) = self.stack.pop() {
            let node = self.tree.nodes.get(id);
            self.path.truncate(level);
            self.path.push(node.value);

            match node.link {
                Link::Row(row) => return Some((self.path.clone(), row)),
                Link::Child(child) => {
                    let start = self.stack.len();
                    self.stack
                        .extend(self.tree.nodes.siblings(child).map(|c| (c, level + 1)));
                    self.stack[start..].reverse();
                }
            }
        }
        None
    }
}


#[cfg(test)]
mod proptests;

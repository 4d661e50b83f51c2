//! Dependency tracking for formula calculation
//!
//! The graph stores every edge twice: `precedents[B]` holds the cells B's
//! formula reads, `dependents[A]` the cells whose formulas read A. The two
//! maps always mirror each other, and empty sets are pruned.

use crate::error::{FormulaError, FormulaResult};
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::CellAddress;
use std::fmt;
use std::str::FromStr;

/// Unique key for a cell
///
/// Displays as relative A1 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// The relative address of this cell
    pub fn to_address(self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl From<CellAddress> for CellKey {
    fn from(addr: CellAddress) -> Self {
        Self::new(addr.row, addr.col)
    }
}

impl From<&CellAddress> for CellKey {
    fn from(addr: &CellAddress) -> Self {
        Self::new(addr.row, addr.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

impl FromStr for CellKey {
    type Err = sheetcalc_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellAddress::parse(s).map(CellKey::from)
    }
}

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells,
/// enabling efficient recalculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellKey, AHashSet<CellKey>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellKey, AHashSet<CellKey>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of cells `cell` reads.
    ///
    /// Idempotent; an empty set removes all of the cell's outgoing edges.
    /// A set containing `cell` itself is rejected and nothing changes. Other
    /// cycles are not detected here: call
    /// [`check_for_circular_reference`](Self::check_for_circular_reference)
    /// first.
    pub fn update_dependencies<I>(&mut self, cell: CellKey, precedents: I) -> FormulaResult<()>
    where
        I: IntoIterator<Item = CellKey>,
    {
        let new: AHashSet<CellKey> = precedents.into_iter().collect();
        if new.contains(&cell) {
            return Err(FormulaError::CircularReference {
                path: format_path(&[cell, cell]),
            });
        }

        self.replace_precedents(cell, new);
        Ok(())
    }

    /// Remove all outgoing edges of `cell`.
    ///
    /// Cells that read `cell` keep their edges to it.
    pub fn clear(&mut self, cell: CellKey) {
        self.replace_precedents(cell, AHashSet::new());
    }

    fn replace_precedents(&mut self, cell: CellKey, new: AHashSet<CellKey>) {
        let old = self.precedents.remove(&cell).unwrap_or_default();

        // Unlink removed precedents
        for removed in old.difference(&new) {
            if let Some(deps) = self.dependents.get_mut(removed) {
                deps.remove(&cell);
                if deps.is_empty() {
                    self.dependents.remove(removed);
                }
            }
        }

        // Link added precedents
        for &added in new.difference(&old) {
            self.dependents.entry(added).or_default().insert(cell);
        }

        tracing::trace!(cell = %cell, precedents = new.len(), "dependencies updated");

        if !new.is_empty() {
            self.precedents.insert(cell, new);
        }
    }

    /// Would giving `cell` the precedents `proposed` create a cycle?
    ///
    /// Only existing edges are searched; the graph is not modified.
    pub fn check_for_circular_reference(&self, cell: CellKey, proposed: &[CellKey]) -> bool {
        self.find_circular_path(cell, proposed).is_some()
    }

    /// Like [`check_for_circular_reference`](Self::check_for_circular_reference),
    /// returning the cycle as `cell → proposed precedent → … → cell`, where
    /// each cell reads the next.
    pub fn find_circular_path(&self, cell: CellKey, proposed: &[CellKey]) -> Option<Vec<CellKey>> {
        if proposed.contains(&cell) {
            return Some(vec![cell, cell]);
        }

        // A cycle exists when some proposed precedent already reads `cell`,
        // directly or transitively. Walk the existing edges backwards
        // (precedent sets) from each candidate, sharing one visited set.
        let mut visited: AHashSet<CellKey> = AHashSet::new();
        let mut parent: AHashMap<CellKey, CellKey> = AHashMap::new();

        for &start in proposed {
            if !visited.insert(start) {
                continue;
            }

            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                let Some(reads) = self.precedents.get(&current) else {
                    continue;
                };

                for &next in reads {
                    if next == cell {
                        let mut chain = vec![current];
                        let mut node = current;
                        while let Some(&p) = parent.get(&node) {
                            chain.push(p);
                            node = p;
                        }
                        chain.reverse();

                        let mut path = Vec::with_capacity(chain.len() + 2);
                        path.push(cell);
                        path.extend(chain);
                        path.push(cell);
                        return Some(path);
                    }
                    if visited.insert(next) {
                        parent.insert(next, current);
                        stack.push(next);
                    }
                }
            }
        }

        None
    }

    /// Cells to recompute after `changed` gets a new value, in an order where
    /// every cell follows all of its precedents in the list.
    ///
    /// `changed` itself is not included; the list is empty when nothing reads it.
    pub fn get_recalculation_order(&self, changed: CellKey) -> Vec<CellKey> {
        let mut visited = AHashSet::new();
        visited.insert(changed);

        let mut order = Vec::new();
        self.post_order(self.sorted_dependents(changed).into_iter().rev(), &mut visited, &mut order);
        order.reverse();
        order
    }

    /// Every cell in the graph in dependency order
    pub fn get_full_order(&self) -> Vec<CellKey> {
        let mut roots: Vec<CellKey> = self
            .dependents
            .keys()
            .chain(self.precedents.keys())
            .copied()
            .collect::<AHashSet<_>>()
            .into_iter()
            .collect();
        roots.sort_unstable_by(|a, b| b.cmp(a));

        let mut visited = AHashSet::new();
        let mut order = Vec::new();
        self.post_order(roots, &mut visited, &mut order);
        order.reverse();
        order
    }

    /// Depth-first post-order over `dependents`, with an explicit stack.
    ///
    /// Siblings are visited largest first so that the reversed post-order
    /// lists independent cells in ascending order.
    fn post_order(
        &self,
        roots: impl IntoIterator<Item = CellKey>,
        visited: &mut AHashSet<CellKey>,
        order: &mut Vec<CellKey>,
    ) {
        for root in roots {
            if !visited.insert(root) {
                continue;
            }

            let mut stack = vec![(root, self.sorted_dependents(root))];
            while let Some((node, children)) = stack.last_mut() {
                match children.pop() {
                    Some(child) => {
                        if visited.insert(child) {
                            let grandchildren = self.sorted_dependents(child);
                            stack.push((child, grandchildren));
                        }
                    }
                    None => {
                        let node = *node;
                        stack.pop();
                        order.push(node);
                    }
                }
            }
        }
    }

    /// Dependents in ascending order, so popping yields the largest first
    fn sorted_dependents(&self, cell: CellKey) -> Vec<CellKey> {
        let mut deps: Vec<CellKey> = self
            .dependents
            .get(&cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        deps.sort_unstable();
        deps
    }

    /// Get cells that depend on the given cell
    pub fn dependents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get cells that the given cell depends on
    pub fn precedents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Number of cells with at least one precedent
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// Clear the entire graph
    pub fn reset(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}

/// Render a cycle as `A1 -> B1 -> A1`
pub fn format_path(path: &[CellKey]) -> String {
    path.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

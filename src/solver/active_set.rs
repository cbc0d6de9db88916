//! Active/inactive partition of the rows seen by the Newton solvers

/// Ordered row indices split into an active prefix and an inactive suffix
///
/// Active rows are stored in ascending order at `[0, active)`; inactive rows
/// are filled back-to-front, so `[active, len)` holds them in descending
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubset {
    indices: Vec<usize>,
    active: usize,
}

impl ActiveSubset {
    /// Every row in `[0, m)` active
    pub fn all(m: usize) -> Self {
        Self {
            indices: (0..m).collect(),
            active: m,
        }
    }

    /// Partition `[0, m)` with the given predicate
    pub fn partition<F>(m: usize, is_active: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        let mut subset = Self {
            indices: vec![0; m],
            active: 0,
        };
        subset.repartition(is_active);
        subset
    }

    /// Rebuild the partition in place over the same rows
    pub fn repartition<F>(&mut self, mut is_active: F)
    where
        F: FnMut(usize) -> bool,
    {
        let m = self.indices.len();
        let mut active = 0;
        let mut inactive = m;
        for i in 0..m {
            if is_active(i) {
                self.indices[active] = i;
                active += 1;
            } else {
                inactive -= 1;
                self.indices[inactive] = i;
            }
        }
        debug_assert_eq!(active, inactive);
        self.active = active;
    }

    /// Active row indices
    pub fn active(&self) -> &[usize] {
        &self.indices[..self.active]
    }

    /// Inactive row indices
    pub fn inactive(&self) -> &[usize] {
        &self.indices[self.active..]
    }

    /// Number of active rows
    pub fn active_len(&self) -> usize {
        self.active
    }

    /// Total number of rows covered
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

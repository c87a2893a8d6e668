//! Binding tables and compatibility joins
//!
//! A binding table is an ordered sequence of rows over an
//! insertion-ordered set of columns (variable names). A cell holds a term
//! or the unbound marker. Two rows are compatible when they agree on every
//! column bound in both; merging unions their columns with bound cells
//! winning over unbound ones. The inner, left (OPTIONAL) and anti (MINUS)
//! joins built on that relation are the central primitives of query
//! evaluation.

use mirella_model::Term;
use rustc_hash::FxHashSet;

/// A single row of a binding table, borrowed from its table
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [Option<Term>],
}

impl<'a> RowView<'a> {
    /// Get the binding for a variable, `None` when unbound or unknown
    pub fn get(&self, variable: &str) -> Option<&'a Term> {
        self.columns
            .iter()
            .position(|c| c == variable)
            .and_then(|i| self.cells[i].as_ref())
    }

    /// Check if a variable is bound in this row
    pub fn is_bound(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    /// The column names of the underlying table
    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    /// The raw cells of this row
    pub fn cells(&self) -> &'a [Option<Term>] {
        self.cells
    }
}

/// An ordered sequence of rows over an insertion-ordered column set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Term>>>,
}

impl BindingTable {
    /// Create an empty table: no columns, no rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the join identity: no columns, one empty row
    pub fn unit() -> Self {
        Self {
            columns: Vec::new(),
            rows: vec![Vec::new()],
        }
    }

    /// Create a table with the given columns and no rows
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names in insertion order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Index of a column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Ensure a column exists, padding existing rows with unbound cells;
    /// returns its index
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row given as raw cells; must match the column count
    pub fn push_row(&mut self, cells: Vec<Option<Term>>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(cells);
    }

    /// Append a row given as (variable, term) bindings
    ///
    /// Missing columns are created; unmentioned columns stay unbound.
    pub fn push_bindings(&mut self, bindings: &[(String, Term)]) {
        for (name, _) in bindings {
            self.add_column(name);
        }
        let mut cells = vec![None; self.columns.len()];
        for (name, term) in bindings {
            let idx = self.column_index(name).expect("column just added");
            cells[idx] = Some(term.clone());
        }
        self.rows.push(cells);
    }

    /// Borrow one row
    pub fn row(&self, index: usize) -> RowView<'_> {
        RowView {
            columns: &self.columns,
            cells: &self.rows[index],
        }
    }

    /// Iterate over the rows
    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    /// Shared column indices: pairs of (self index, other index)
    fn shared_columns(&self, other: &BindingTable) -> Vec<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(i, name)| other.column_index(name).map(|j| (i, j)))
            .collect()
    }

    /// Check compatibility of two raw rows on precomputed shared columns
    fn rows_compatible(
        left: &[Option<Term>],
        right: &[Option<Term>],
        shared: &[(usize, usize)],
    ) -> bool {
        shared.iter().all(|&(i, j)| match (&left[i], &right[j]) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        })
    }

    /// The column layout of a join result: self's columns then other's
    /// extra columns, with a mapping from other's columns into the result
    fn joined_layout(&self, other: &BindingTable) -> (Vec<String>, Vec<usize>) {
        let mut columns = self.columns.clone();
        let mut other_map = Vec::with_capacity(other.columns.len());
        for name in &other.columns {
            match columns.iter().position(|c| c == name) {
                Some(idx) => other_map.push(idx),
                None => {
                    columns.push(name.clone());
                    other_map.push(columns.len() - 1);
                }
            }
        }
        (columns, other_map)
    }

    fn merge_rows(
        &self,
        left: &[Option<Term>],
        right: &[Option<Term>],
        other_map: &[usize],
        width: usize,
    ) -> Vec<Option<Term>> {
        let mut cells = vec![None; width];
        cells[..left.len()].clone_from_slice(left);
        for (j, &target) in other_map.iter().enumerate() {
            if cells[target].is_none() {
                cells[target] = right[j].clone();
            }
        }
        cells
    }

    /// Inner compatibility join
    pub fn join(&self, other: &BindingTable) -> BindingTable {
        let shared = self.shared_columns(other);
        let (columns, other_map) = self.joined_layout(other);
        let width = columns.len();

        let mut result = BindingTable {
            columns,
            rows: Vec::new(),
        };
        for left in &self.rows {
            for right in &other.rows {
                if Self::rows_compatible(left, right, &shared) {
                    result
                        .rows
                        .push(self.merge_rows(left, right, &other_map, width));
                }
            }
        }
        result
    }

    /// Left compatibility join (OPTIONAL)
    ///
    /// Every left row appears at least once; rows without a compatible
    /// partner are padded with unbound cells for the right-only columns.
    pub fn left_join(&self, other: &BindingTable) -> BindingTable {
        let shared = self.shared_columns(other);
        let (columns, other_map) = self.joined_layout(other);
        let width = columns.len();

        let mut result = BindingTable {
            columns,
            rows: Vec::new(),
        };
        for left in &self.rows {
            let mut matched = false;
            for right in &other.rows {
                if Self::rows_compatible(left, right, &shared) {
                    result
                        .rows
                        .push(self.merge_rows(left, right, &other_map, width));
                    matched = true;
                }
            }
            if !matched {
                let mut cells = vec![None; width];
                cells[..left.len()].clone_from_slice(left);
                result.rows.push(cells);
            }
        }
        result
    }

    /// Anti join (MINUS)
    ///
    /// Keeps the left rows that have no compatible right row sharing at
    /// least one bound variable. Columns are unchanged.
    pub fn minus(&self, other: &BindingTable) -> BindingTable {
        let shared = self.shared_columns(other);

        let mut result = BindingTable {
            columns: self.columns.clone(),
            rows: Vec::new(),
        };
        for left in &self.rows {
            let excluded = other.rows.iter().any(|right| {
                Self::rows_compatible(left, right, &shared)
                    && shared
                        .iter()
                        .any(|&(i, j)| left[i].is_some() && right[j].is_some())
            });
            if !excluded {
                result.rows.push(left.clone());
            }
        }
        result
    }

    /// Column-union row concatenation (UNION)
    ///
    /// Columns only present on one side become unbound on the other.
    pub fn union_with(&mut self, other: BindingTable) {
        let mut other_map = Vec::with_capacity(other.columns.len());
        for name in &other.columns {
            other_map.push(self.add_column(name));
        }
        let width = self.columns.len();
        for right in other.rows {
            let mut cells = vec![None; width];
            for (j, cell) in right.into_iter().enumerate() {
                cells[other_map[j]] = cell;
            }
            self.rows.push(cells);
        }
    }

    /// Check whether some row of this table is compatible with `row`
    pub fn has_compatible_row(&self, row: &RowView<'_>) -> bool {
        let shared: Vec<(usize, usize)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                row.columns()
                    .iter()
                    .position(|c| c == name)
                    .map(|j| (i, j))
            })
            .collect();
        self.rows
            .iter()
            .any(|own| Self::rows_compatible(own, row.cells(), &shared))
    }

    /// Keep only the rows satisfying the predicate
    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&RowView<'_>) -> bool,
    {
        let columns = std::mem::take(&mut self.columns);
        self.rows.retain(|cells| {
            predicate(&RowView {
                columns: &columns,
                cells,
            })
        });
        self.columns = columns;
    }

    /// Sort the rows with a comparator over row views
    pub fn sort_rows_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&RowView<'_>, &RowView<'_>) -> std::cmp::Ordering,
    {
        let columns = std::mem::take(&mut self.columns);
        self.rows.sort_by(|a, b| {
            compare(
                &RowView {
                    columns: &columns,
                    cells: a,
                },
                &RowView {
                    columns: &columns,
                    cells: b,
                },
            )
        });
        self.columns = columns;
    }

    /// Remove duplicate rows, keeping first occurrences (DISTINCT)
    pub fn distinct(&mut self) {
        let mut seen: FxHashSet<Vec<Option<Term>>> = FxHashSet::default();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Keep at most the first `n` rows (LIMIT)
    pub fn limit(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Drop the first `n` rows (OFFSET)
    pub fn offset(&mut self, n: usize) {
        if n < self.rows.len() {
            self.rows.drain(0..n);
        } else {
            self.rows.clear();
        }
    }

    /// Select columns by name, in the given order
    ///
    /// Unknown names become all-unbound columns so projection never fails
    /// mid-evaluation; normalisation rejects them up front.
    pub fn select_columns(&self, names: &[String]) -> BindingTable {
        let indices: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].clone()))
                    .collect()
            })
            .collect();
        BindingTable {
            columns: names.to_vec(),
            rows,
        }
    }

    /// Set one cell; the row and column must exist
    pub fn set_cell(&mut self, row: usize, column: usize, value: Option<Term>) {
        self.rows[row][column] = value;
    }
}

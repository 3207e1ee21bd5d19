/// Compressed row connectivity table.
/// Row `i` holds the entries `columns[offsets[i]..offsets[i + 1]]`, kept in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    offsets: Vec<usize>,
    columns: Vec<usize>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            columns: vec![],
        }
    }
}

impl Table {
    /// Build a table from a list of rows
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::Table;
    /// let table = Table::from_rows(vec![vec![0, 1], vec![], vec![2, 1, 0]]);
    /// assert_eq!(table.num_rows(), 3);
    /// assert_eq!(table.row(2), &[2, 1, 0]);
    /// assert_eq!(table.num_connections(), 5);
    /// ```
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        let mut columns = vec![];
        for row in rows {
            columns.extend(row);
            offsets.push(columns.len());
        }
        Self { offsets, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_connections(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.columns[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn row_len(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        (0..self.num_rows()).map(move |i| self.row(i))
    }

    /// All entries of every row, in storage order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [usize] {
        &mut self.columns
    }

    /// Largest column index plus one
    pub fn width(&self) -> usize {
        self.columns.iter().max().map_or(0, |m| m + 1)
    }

    /// Transposed table with `num_columns` rows.
    /// Within each transposed row entries appear in increasing row order of `self`.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::Table;
    /// let table = Table::from_rows(vec![vec![0, 1], vec![1, 2]]);
    /// let t = table.transpose(3);
    /// assert_eq!(t.row(0), &[0]);
    /// assert_eq!(t.row(1), &[0, 1]);
    /// assert_eq!(t.row(2), &[1]);
    /// ```
    pub fn transpose(&self, num_columns: usize) -> Self {
        let num_columns = num_columns.max(self.width());
        let mut counts = vec![0; num_columns + 1];
        for &c in self.columns.iter() {
            counts[c + 1] += 1;
        }
        for i in 0..num_columns {
            counts[i + 1] += counts[i];
        }
        let offsets = counts.clone();
        let mut cursor = counts;
        let mut columns = vec![0; self.columns.len()];
        for (r, row) in self.rows().enumerate() {
            for &c in row {
                columns[cursor[c]] = r;
                cursor[c] += 1;
            }
        }
        Self { offsets, columns }
    }
}

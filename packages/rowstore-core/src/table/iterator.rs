//! Row iteration in storage order.

use super::table::Table;
use crate::tuple::TupleRef;

/// Resumable read position within a table.
///
/// Unlike [`TableIterator`] a cursor holds no borrow, so a caller can keep
/// it across calls and hand the table back in each time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableCursor {
    next_slot: usize,
}

impl TableCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.next_slot = 0;
    }
}

impl Table {
    /// Advances `cursor` to the next active row.
    pub fn next_from(&self, cursor: &mut TableCursor) -> Option<TupleRef<'_>> {
        let row = self.storage.next_active(cursor.next_slot)?;
        cursor.next_slot = row.index() + 1;
        self.tuple(row)
    }

    /// Iterates active rows in storage order.
    pub fn iter(&self) -> TableIterator<'_> {
        TableIterator {
            table: self,
            cursor: TableCursor::new(),
        }
    }
}

/// Borrowing iterator over a table's active rows.
pub struct TableIterator<'a> {
    table: &'a Table,
    cursor: TableCursor,
}

impl<'a> Iterator for TableIterator<'a> {
    type Item = TupleRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.next_from(&mut self.cursor)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = TupleRef<'a>;
    type IntoIter = TableIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

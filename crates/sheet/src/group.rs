use serde::{Deserialize, Serialize};
use std::fmt;

/// A run of grouped rows (an outline level in spreadsheet terms).
///
/// Both indices are 0-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    start_index: u32,
    end_index: u32,
}

impl Group {
    pub(crate) fn new(start_index: u32, end_index: u32) -> Self {
        debug_assert!(start_index <= end_index);
        Group {
            start_index,
            end_index,
        }
    }

    /// First row of the group
    #[must_use]
    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    /// Last row of the group
    #[must_use]
    pub fn end_index(&self) -> u32 {
        self.end_index
    }

    /// Check whether a row lies inside this group
    #[must_use]
    pub fn contains(&self, row_index: u32) -> bool {
        self.start_index <= row_index && row_index <= self.end_index
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{};{}]", self.start_index, self.end_index)
    }
}

/// Derives [`Group`]s from the outline levels of consecutive rows.
///
/// Feed one level per row with [`push`](Self::push), then call
/// [`finish`](Self::finish). Groups come out in the order they are closed, so
/// an inner group that ends before its parent is listed first.
#[derive(Debug, Default)]
pub struct GroupExtractor {
    group_level: u8,
    open_starts: Vec<u32>,
    /// Index of the last processed row, `None` before the first one.
    previous_row: Option<u32>,
    groups: Vec<Group>,
}

impl GroupExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the extraction over a complete sequence of levels.
    pub fn extract<I: IntoIterator<Item = u8>>(levels: I) -> Vec<Group> {
        let mut extractor = Self::new();
        let mut rows = 0;
        for level in levels {
            extractor.push(level);
            rows += 1;
        }
        extractor.finish(rows)
    }

    /// Process the next row.
    pub fn push(&mut self, level: u8) {
        let next_row = self.previous_row.map_or(0, |row| row + 1);

        while level > self.group_level {
            // Current row is a child of the row before
            self.open_starts.push(next_row);
            self.group_level += 1;
        }
        while level < self.group_level {
            // Closed by the current row, so the group ends on the previous one
            if let (Some(start), Some(end)) = (self.open_starts.pop(), self.previous_row) {
                self.groups.push(Group::new(start, end));
            }
            self.group_level -= 1;
        }

        self.previous_row = Some(next_row);
    }

    /// Close every group still open at the end of the sheet.
    ///
    /// `retained_rows` is the number of rows the caller kept; open groups are
    /// clamped so they never end past the last retained row.
    pub fn finish(mut self, retained_rows: u32) -> Vec<Group> {
        let last_row = match (self.previous_row, retained_rows.checked_sub(1)) {
            (Some(previous), Some(last_retained)) => Some(previous.min(last_retained)),
            _ => None,
        };

        while let Some(start) = self.open_starts.pop() {
            match last_row {
                Some(end) if start <= end => self.groups.push(Group::new(start, end)),
                _ => tracing::debug!(start, "dropping row group without retained rows"),
            }
        }

        self.groups
    }
}

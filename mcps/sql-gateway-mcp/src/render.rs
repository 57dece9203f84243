//! Size-bounded vertical rendering of result rows

use crate::value::{format_value, SqlValue};

/// Rendered result text and how many rows made it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    /// Rows fully emitted into `text`
    pub displayed_rows: usize,
    /// One block per displayed row
    pub text: String,
    /// True when rendering stopped before the last row
    pub truncated: bool,
}

/// Render rows as `N. row` blocks until `max_chars` would be exceeded.
///
/// Sizes are counted in characters over all blocks built so far, including
/// the current one. The block that crosses the budget is dropped whole and
/// rendering stops there.
pub fn render_rows<'a, I>(columns: &[String], rows: I, max_chars: usize) -> RenderedResult
where
    I: IntoIterator<Item = &'a [SqlValue]>,
{
    let mut text = String::new();
    let mut size = 0;
    let mut displayed_rows = 0;
    let mut truncated = false;

    for (i, row) in rows.into_iter().enumerate() {
        let block = row_block(i + 1, columns, row);
        size += block.chars().count();

        if size > max_chars {
            truncated = true;
            break;
        }

        text.push_str(&block);
        displayed_rows = i + 1;
    }

    RenderedResult {
        displayed_rows,
        text,
        truncated,
    }
}

fn row_block(number: usize, columns: &[String], row: &[SqlValue]) -> String {
    let mut block = format!("{}. row\n", number);
    for (column, value) in columns.iter().zip(row) {
        block.push_str(column);
        block.push_str(": ");
        block.push_str(&format_value(value));
        block.push('\n');
    }
    block.push('\n');
    block
}

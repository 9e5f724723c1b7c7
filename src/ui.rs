//! Terminal UI utilities.
//!
//! A small box-drawn table that shrinks its widest columns to fit the
//! terminal. Used for `gob types` and the per-target build summary.
//!
//! ```rust
//! let mut table = gobuild::ui::Table::new(&["Target", "Result"]);
//! table.add_row(vec!["server".to_string(), "ok".to_string()]);
//! table.print();
//! ```

use colored::*;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    /// Column widths, shrunk from the widest column down to fit `max_width`.
    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = console::measure_text_width(&flatten(cell));
                widths[i] = widths[i].max(len);
            }
        }

        // "  │" plus " x │" per column
        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > budget {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= 8 {
                break;
            }
            widths[idx] -= 1;
        }
        widths
    }

    pub fn render(&self, max_width: usize) -> Vec<String> {
        if self.headers.is_empty() {
            return Vec::new();
        }
        let widths = self.column_widths(max_width);

        let border = |left: &str, mid: &str, right: &str| -> String {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, segments.join(mid), right)
        };
        let row_line = |cells: Vec<String>| -> String {
            let mut line = String::from("  │");
            for (cell, width) in cells.iter().zip(&widths) {
                let fitted = console::truncate_str(cell, *width, "...");
                let pad = width.saturating_sub(console::measure_text_width(&fitted));
                line.push_str(&format!(" {}{} │", fitted, " ".repeat(pad)));
            }
            line
        };

        let mut out = vec![border("┌", "┬", "┐")];
        out.push(row_line(
            self.headers.iter().map(|h| h.bold().to_string()).collect(),
        ));
        out.push(border("├", "┼", "┤"));
        for row in &self.rows {
            out.push(row_line(row.iter().map(|c| flatten(c)).collect()));
        }
        out.push(border("└", "┴", "┘"));
        out
    }

    pub fn print(&self) {
        let (_rows, cols) = console::Term::stdout().size();
        for line in self.render(cols as usize) {
            println!("{}", line);
        }
    }
}

/// Tables are single-line per row.
fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

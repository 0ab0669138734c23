use crate::cell::CellValue;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref CELL_REGEX: Regex = Regex::new(r"^([A-Za-z]+)([0-9]+)$").unwrap();
}

/// A 1-based cell coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

/// An in-process grid with the same read/write surface as a hosted sheet
///
/// Rows are ragged: a row only stores cells up to its last written column.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Spreadsheet {
    pub cells: Vec<Vec<CellValue>>,
}

impl Spreadsheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn col_to_letter(col: u32) -> String {
        let mut col = col;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    pub fn letter_to_col(letters: &str) -> u32 {
        letters
            .chars()
            .map(|c| c.to_ascii_uppercase())
            .fold(0, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1))
    }

    pub fn get_cell_name(row: u32, col: u32) -> String {
        format!("{}{}", Self::col_to_letter(col), row)
    }

    /// Parse an A1 reference such as `B10`
    pub fn parse_cell_name(cell_name: &str) -> Option<CellRef> {
        let caps = CELL_REGEX.captures(cell_name.trim())?;
        let col = Self::letter_to_col(&caps[1]);
        let row = caps[2].parse::<u32>().ok()?;
        if row == 0 || col == 0 {
            return None;
        }
        Some(CellRef { row, col })
    }

    /// Parse `A4:B4` or a single cell `A4` into an inclusive rectangle
    pub fn parse_range(range: &str) -> Option<(CellRef, CellRef)> {
        match range.split_once(':') {
            Some((start, end)) => {
                let start = Self::parse_cell_name(start)?;
                let end = Self::parse_cell_name(end)?;
                if end.row < start.row || end.col < start.col {
                    return None;
                }
                Some((start, end))
            }
            None => {
                let cell = Self::parse_cell_name(range)?;
                Some((cell, cell))
            }
        }
    }

    pub fn set_cell(&mut self, at: CellRef, value: CellValue) {
        let r = (at.row - 1) as usize;
        let c = (at.col - 1) as usize;
        if self.cells.len() <= r {
            self.cells.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.cells[r];
        if row.len() <= c {
            row.resize_with(c + 1, CellValue::default);
        }
        row[c] = value;
    }

    pub fn get_cell(&self, at: CellRef) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.cells
            .get((at.row - 1) as usize)
            .and_then(|row| row.get((at.col - 1) as usize))
            .unwrap_or(EMPTY)
    }

    /// Write a block of values with its top-left corner at `anchor`
    pub fn update(&mut self, anchor: CellRef, values: &[Vec<CellValue>]) {
        for (dr, row) in values.iter().enumerate() {
            for (dc, value) in row.iter().enumerate() {
                let at = CellRef {
                    row: anchor.row + dr as u32,
                    col: anchor.col + dc as u32,
                };
                self.set_cell(at, value.clone());
            }
        }
    }

    /// 1-based index of the last row holding any non-empty cell, 0 for a blank sheet
    pub fn last_used_row(&self) -> u32 {
        self.cells
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map_or(0, |idx| idx as u32 + 1)
    }

    /// Append a row directly below the last used row
    pub fn append_row(&mut self, values: &[Vec<CellValue>]) -> u32 {
        let target = self.last_used_row() + 1;
        self.update(CellRef { row: target, col: 1 }, values);
        target
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Every value as display text, trailing blank rows dropped and rows padded
    /// to a common width
    pub fn get_all_values(&self) -> Vec<Vec<String>> {
        let height = self.last_used_row() as usize;
        let rows: Vec<Vec<String>> = self.cells[..height]
            .iter()
            .map(|row| {
                let width = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..width].iter().map(|c| c.to_string()).collect()
            })
            .collect();
        pad_rows(rows)
    }

    /// Values inside a rectangle; trailing blanks in each row are trimmed
    pub fn get_range(&self, start: CellRef, end: CellRef) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for r in start.row..=end.row {
            let mut line: Vec<String> = (start.col..=end.col)
                .map(|c| self.get_cell(CellRef { row: r, col: c }).to_string())
                .collect();
            while line.last().is_some_and(|s| s.is_empty()) {
                line.pop();
            }
            out.push(line);
        }
        while out.last().is_some_and(|l| l.is_empty()) {
            out.pop();
        }
        out
    }
}

/// Pad ragged rows with empty strings so every row has the same width
pub fn pad_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::row;

    #[test]
    fn column_letters_round_trip() {
        assert_eq!(Spreadsheet::col_to_letter(1), "A");
        assert_eq!(Spreadsheet::col_to_letter(26), "Z");
        assert_eq!(Spreadsheet::col_to_letter(27), "AA");
        assert_eq!(Spreadsheet::col_to_letter(52), "AZ");
        assert_eq!(Spreadsheet::letter_to_col("AA"), 27);
        assert_eq!(Spreadsheet::get_cell_name(10, 2), "B10");
    }

    #[test]
    fn parses_cells_and_ranges() {
        assert_eq!(
            Spreadsheet::parse_cell_name("B10"),
            Some(CellRef { row: 10, col: 2 })
        );
        assert_eq!(Spreadsheet::parse_cell_name("A0"), None);
        assert_eq!(Spreadsheet::parse_cell_name("1A"), None);

        let (start, end) = Spreadsheet::parse_range("A4:B4").unwrap();
        assert_eq!(start, CellRef { row: 4, col: 1 });
        assert_eq!(end, CellRef { row: 4, col: 2 });
        assert!(Spreadsheet::parse_range("B4:A4").is_none());
    }

    #[test]
    fn append_goes_below_last_used_row() {
        let mut sheet = Spreadsheet::new();
        sheet.update(CellRef { row: 3, col: 1 }, &[row(["header"])]);
        assert_eq!(sheet.append_row(&[row(["x", "y"])]), 4);
        assert_eq!(sheet.append_row(&[row(["z"])]), 5);

        let all = sheet.get_all_values();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], vec!["", ""]);
        assert_eq!(all[3], vec!["x", "y"]);
        assert_eq!(all[4], vec!["z", ""]);
    }

    #[test]
    fn range_reads_trim_trailing_blanks() {
        let mut sheet = Spreadsheet::new();
        sheet.update(
            CellRef { row: 4, col: 1 },
            &[vec![CellValue::from(3u32), CellValue::from(4.5)]],
        );
        let (start, end) = Spreadsheet::parse_range("A4:C5").unwrap();
        assert_eq!(sheet.get_range(start, end), vec![vec!["3", "4.5"]]);
    }
}

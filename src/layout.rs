//! Fixed cell layout of the feedback sheet.
//!
//! Rows 1-20 hold the window times, the summary blocks and the data header;
//! feedback rows start at [`DATA_START_ROW`].

use log::info;

use crate::cell::{CellValue, row};
use crate::feedback::{Issue, Meal, Rating};
use crate::store::{SheetStore, StoreError};

/// Number of reserved rows above the feedback data
pub const RESERVED_ROWS: usize = 20;
pub const DATA_START_ROW: u32 = 21;

pub const WINDOW_CELL: &str = "A2";
pub const WINDOW_END_CELL: &str = "B2";
pub const TOTALS_CELL: &str = "A4";
pub const TOTALS_RANGE: &str = "A4:B4";
pub const RATING_COUNTS_CELL: &str = "A7";
/// First count cell of each meal row, in [`Meal::ALL`] order
pub const MEAL_COUNT_CELLS: [&str; 3] = ["B10", "B11", "B12"];
/// Count cell of each issue, in [`Issue::ALL`] order
pub const ISSUE_COUNT_CELLS: [&str; 4] = ["B15", "B16", "B17", "B18"];

pub const NOT_STARTED: &str = "Not Started";
pub const NOT_ENDED: &str = "Not Ended";
pub const NOT_ENDED_YET: &str = "Not Ended Yet";

pub const DATA_HEADER: [&str; 4] = ["Meal", "Rating", "Issues", "Timestamp"];

/// The 20 reserved rows of a freshly initialized sheet
pub fn initial_layout() -> Vec<Vec<CellValue>> {
    let zeros = |n: usize| vec![CellValue::from(0u32); n];
    let blank = Vec::new;

    let mut rows = vec![
        row(["Feedback Start Time", "Feedback End Time"]),
        row([NOT_STARTED, NOT_ENDED]),
        row(["Total Feedback", "Average Rating"]),
        zeros(2),
        blank(),
        row(Rating::ALL.map(Rating::label)),
        zeros(5),
        blank(),
    ];

    let mut meal_header = row(["Meal"]);
    meal_header.extend(row(Rating::ALL.map(Rating::label)));
    rows.push(meal_header);
    for meal in Meal::ALL {
        let mut line = row([meal.label()]);
        line.extend(zeros(5));
        rows.push(line);
    }
    rows.push(blank());

    rows.push(row(["Issue Type", "Count"]));
    for issue in Issue::ALL {
        let mut line = row([issue.label()]);
        line.push(CellValue::from(0u32));
        rows.push(line);
    }
    rows.push(blank());

    rows.push(row(DATA_HEADER));
    rows
}

/// Wipe the sheet and lay out the header and summary blocks again
///
/// # Arguments
/// * `store` - The sheet to initialize
///
/// # Returns
/// * `Result<(), StoreError>` - Success or a sheet error
pub async fn initialize_sheet(store: &dyn SheetStore) -> Result<(), StoreError> {
    store.clear().await?;
    store.update("A1", initial_layout()).await?;
    info!("sheet initialized with the blank summary layout");
    Ok(())
}

/// True when the data header sits where the layout expects it
pub fn has_layout(all_values: &[Vec<String>]) -> bool {
    all_values
        .get(RESERVED_ROWS - 1)
        .is_some_and(|header| header.iter().take(4).eq(DATA_HEADER.iter()))
}

/// Rows below the reserved block
pub fn data_rows(all_values: &[Vec<String>]) -> &[Vec<String>] {
    all_values.get(RESERVED_ROWS..).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::{CellRef, Spreadsheet};

    fn laid_out() -> Vec<Vec<String>> {
        let mut sheet = Spreadsheet::new();
        sheet.update(CellRef { row: 1, col: 1 }, &initial_layout());
        sheet.get_all_values()
    }

    #[test]
    fn layout_matches_reserved_rows() {
        let all = laid_out();
        assert_eq!(all.len(), RESERVED_ROWS);
        assert_eq!(all[1][..2], ["Not Started", "Not Ended"]);
        assert_eq!(all[3][..2], ["0", "0"]);
        assert_eq!(all[5][..5], ["Very Bad", "Bad", "Average", "Good", "Very Good"]);
        assert_eq!(all[10][..6], ["Lunch", "0", "0", "0", "0", "0"]);
        assert_eq!(all[16][..2], ["Less Side Dishes", "0"]);
        assert!(all[18].iter().all(String::is_empty));
        assert!(has_layout(&all));
        assert!(data_rows(&all).is_empty());
    }

    #[test]
    fn blank_sheet_has_no_layout() {
        assert!(!has_layout(&[]));
    }
}

use log::debug;
use serde::Serialize;

use crate::cell::{CellValue, row};
use crate::feedback::{Issue, Meal, Rating};
use crate::layout::{self, ISSUE_COUNT_CELLS, MEAL_COUNT_CELLS, RATING_COUNTS_CELL, TOTALS_CELL};
use crate::store::{SheetStore, StoreError};

/// Aggregate statistics derived from the feedback rows
///
/// Always rebuilt from scratch; nothing here is updated incrementally.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_feedback: u32,
    pub average_rating: f64,
    /// Indexed by [`Rating::index`]
    pub rating_counts: [u32; 5],
    /// Indexed by [`Meal::index`], then [`Rating::index`]
    pub meal_rating_counts: [[u32; 5]; 3],
    /// Indexed by [`Issue::index`]
    pub issue_counts: [u32; 4],
}

impl Summary {
    /// Tally data rows (everything below the reserved layout block)
    ///
    /// Rows with fewer than three cells, or whose meal or rating is not one of
    /// the known values, are skipped without comment.
    pub fn from_rows(data_rows: &[Vec<String>]) -> Self {
        let mut summary = Summary::default();
        let mut total_score = 0u32;

        for line in data_rows {
            if line.len() < 3 {
                continue;
            }
            let Some(meal) = Meal::from_label(line[0].trim()) else {
                continue;
            };
            let Some(rating) = Rating::from_label(line[1].trim()) else {
                continue;
            };
            let issues = &line[2];

            summary.total_feedback += 1;
            summary.rating_counts[rating.index()] += 1;
            summary.meal_rating_counts[meal.index()][rating.index()] += 1;
            total_score += rating.score();

            for issue in Issue::ALL {
                if issues.contains(issue.label()) {
                    summary.issue_counts[issue.index()] += 1;
                }
            }
        }

        summary.average_rating = average(total_score, summary.total_feedback);
        summary
    }

    /// Tally a full sheet dump, skipping the reserved rows first
    pub fn from_sheet(all_values: &[Vec<String>]) -> Self {
        Self::from_rows(layout::data_rows(all_values))
    }

    /// Every summary block as `(anchor, values)` writes
    pub fn cell_updates(&self) -> Vec<(&'static str, Vec<Vec<CellValue>>)> {
        let mut updates = vec![
            (
                TOTALS_CELL,
                vec![vec![
                    CellValue::from(self.total_feedback),
                    CellValue::from(self.average_rating),
                ]],
            ),
            (RATING_COUNTS_CELL, vec![row(self.rating_counts)]),
        ];

        for meal in Meal::ALL {
            updates.push((
                MEAL_COUNT_CELLS[meal.index()],
                vec![row(self.meal_rating_counts[meal.index()])],
            ));
        }
        for issue in Issue::ALL {
            updates.push((
                ISSUE_COUNT_CELLS[issue.index()],
                vec![row([self.issue_counts[issue.index()]])],
            ));
        }
        updates
    }

    pub fn meal_total(&self, meal: Meal) -> u32 {
        self.meal_rating_counts[meal.index()].iter().sum()
    }
}

/// Mean score rounded to two decimals, 0 when nothing was counted
///
/// Rounding works on the exact binary value and sends ties to the even digit,
/// so `17 / 8` gives `2.12`.
pub fn average(total_score: u32, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mean = total_score as f64 / count as f64;
    format!("{:.2}", mean).parse().unwrap_or(mean)
}

/// Re-read every row and overwrite all summary cells
///
/// # Arguments
/// * `store` - The feedback sheet
///
/// # Returns
/// * `Result<Summary, StoreError>` - The recomputed summary, or an error
pub async fn update_summary(store: &dyn SheetStore) -> Result<Summary, StoreError> {
    let all_values = store.get_all_values().await?;
    let summary = Summary::from_sheet(&all_values);

    store.batch_update(summary.cell_updates()).await?;
    debug!(
        "summary rewritten: total={} average={}",
        summary.total_feedback, summary.average_rating
    );
    Ok(summary)
}

/// Headline numbers as stored in `A4:B4`, for the student page
pub async fn read_totals(store: &dyn SheetStore) -> Result<(String, String), StoreError> {
    let values = store.get_range(layout::TOTALS_RANGE).await?;
    let first = values.into_iter().next().unwrap_or_default();
    let mut cells = first.into_iter();
    let total = cells.next().unwrap_or_else(|| "0".to_string());
    let average = cells.next().unwrap_or_else(|| "0".to_string());
    Ok((total, average))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_table_averages_zero() {
        let summary = Summary::from_rows(&[]);
        assert_eq!(summary.total_feedback, 0);
        assert_eq!(summary.average_rating, 0.0);
    }

    #[test]
    fn invalid_rows_are_skipped() {
        let rows = vec![
            line(&["Lunch", "Good", "None", "t"]),
            line(&["Brunch", "Good", "None", "t"]),
            line(&["Dinner", "Superb", "None", "t"]),
            line(&["Dinner", ""]),
            line(&["", "", "", ""]),
            line(&[" Breakfast ", "Very Bad ", "Too Spicy", "t"]),
        ];
        let summary = Summary::from_rows(&rows);
        assert_eq!(summary.total_feedback, 2);
        assert_eq!(summary.rating_counts, [1, 0, 0, 1, 0]);
        assert_eq!(summary.meal_rating_counts[Meal::Breakfast.index()], [1, 0, 0, 0, 0]);
        assert_eq!(summary.issue_counts, [1, 0, 0, 0]);
        assert_eq!(summary.average_rating, 2.5);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let rows = vec![
            line(&["Lunch", "Very Good", "None"]),
            line(&["Lunch", "Very Good", "None"]),
            line(&["Dinner", "Good", "None"]),
        ];
        let summary = Summary::from_rows(&rows);
        assert_eq!(summary.average_rating, 4.67);
        assert_eq!(average(1, 3), 0.33);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(average(17, 8), 2.12);
        assert_eq!(average(21, 8), 2.62);
        assert_eq!(average(19, 8), 2.38);
        assert_eq!(average(23, 7), 3.29);
    }

    #[test]
    fn counts_add_up_to_total() {
        let rows = vec![
            line(&["Breakfast", "Bad", "Not Cooked Well, Less Side Dishes"]),
            line(&["Lunch", "Average", "None"]),
            line(&["Dinner", "Very Good", "Not Cleaned Well"]),
            line(&["Dinner", "Bad", "Too Spicy, Not Cleaned Well"]),
        ];
        let summary = Summary::from_rows(&rows);
        assert_eq!(summary.rating_counts.iter().sum::<u32>(), summary.total_feedback);
        let by_meal: u32 = Meal::ALL.iter().map(|m| summary.meal_total(*m)).sum();
        assert_eq!(by_meal, summary.total_feedback);
        assert_eq!(summary.issue_counts, [1, 1, 1, 2]);
    }

    #[test]
    fn cell_updates_cover_every_block() {
        let anchors: Vec<&str> = Summary::default()
            .cell_updates()
            .into_iter()
            .map(|(a, _)| a)
            .collect();
        assert_eq!(
            anchors,
            ["A4", "A7", "B10", "B11", "B12", "B15", "B16", "B17", "B18"]
        );
    }
}

use chrono::{Local, NaiveDateTime};
use log::info;
use serde::{Deserialize, Deserializer};

use crate::cell::{CellValue, row};
use crate::store::{SheetStore, StoreError};
use crate::summary::{Summary, update_summary};

/// Format of every timestamp written to the sheet
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Written in the issues column when no tag was ticked
pub const NO_ISSUES: &str = "None";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    pub fn label(self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Five-step rating scale, ordered from worst to best
///
/// Forms carry the numeric score, see [`rating_from_number`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rating {
    VeryBad,
    Bad,
    Average,
    Good,
    VeryGood,
}

impl Rating {
    pub const ALL: [Rating; 5] = [
        Rating::VeryBad,
        Rating::Bad,
        Rating::Average,
        Rating::Good,
        Rating::VeryGood,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Rating::VeryBad => "Very Bad",
            Rating::Bad => "Bad",
            Rating::Average => "Average",
            Rating::Good => "Good",
            Rating::VeryGood => "Very Good",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label)
    }

    /// Numeric score, 1 for "Very Bad" up to 5 for "Very Good"
    pub fn score(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_score(score: u32) -> Option<Self> {
        Self::ALL.get((score as usize).checked_sub(1)?).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Accepts the form's `"1"`..`"5"` rating buttons
pub fn rating_from_number<'de, D>(deserializer: D) -> Result<Rating, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse::<u32>()
        .ok()
        .and_then(Rating::from_score)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown rating {raw:?}")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Issue {
    #[serde(rename = "Too Spicy")]
    TooSpicy,
    #[serde(rename = "Not Cooked Well")]
    NotCookedWell,
    #[serde(rename = "Less Side Dishes")]
    LessSideDishes,
    #[serde(rename = "Not Cleaned Well")]
    NotCleanedWell,
}

impl Issue {
    pub const ALL: [Issue; 4] = [
        Issue::TooSpicy,
        Issue::NotCookedWell,
        Issue::LessSideDishes,
        Issue::NotCleanedWell,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Issue::TooSpicy => "Too Spicy",
            Issue::NotCookedWell => "Not Cooked Well",
            Issue::LessSideDishes => "Less Side Dishes",
            Issue::NotCleanedWell => "Not Cleaned Well",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Body of `POST /submit`
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub meal: Meal,
    #[serde(deserialize_with = "rating_from_number")]
    pub rating: Rating,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// One submitted record as it is laid out in a sheet row
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackRow {
    pub meal: Meal,
    pub rating: Rating,
    pub issues: Vec<Issue>,
    pub timestamp: NaiveDateTime,
}

impl FeedbackRow {
    pub fn from_form(form: FeedbackForm, timestamp: NaiveDateTime) -> Self {
        FeedbackRow {
            meal: form.meal,
            rating: form.rating,
            issues: form.issues,
            timestamp,
        }
    }

    /// Stamp a submission with the local wall clock
    pub fn now(form: FeedbackForm) -> Self {
        Self::from_form(form, Local::now().naive_local())
    }

    pub fn issues_text(&self) -> String {
        if self.issues.is_empty() {
            return NO_ISSUES.to_string();
        }
        self.issues
            .iter()
            .map(|i| i.label())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_cells(&self) -> Vec<CellValue> {
        row([
            self.meal.label().to_string(),
            self.rating.label().to_string(),
            self.issues_text(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ])
    }
}

/// Record one submission
///
/// Appends the row, then recomputes the summary exactly once.
///
/// # Arguments
/// * `store` - The feedback sheet
/// * `feedback` - The validated submission
///
/// # Returns
/// * `Result<Summary, StoreError>` - The summary now in the sheet, or an error
pub async fn record_feedback(
    store: &dyn SheetStore,
    feedback: &FeedbackRow,
) -> Result<Summary, StoreError> {
    store.append_row(feedback.to_cells()).await?;
    info!(
        "feedback recorded: {} / {} / {}",
        feedback.meal.label(),
        feedback.rating.label(),
        feedback.issues_text()
    );
    update_summary(store).await
}

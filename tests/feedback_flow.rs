mod common;

use axum::http::StatusCode;
use common::{Harness, body_text, cookie, location};
use mess_feedback::layout::DATA_START_ROW;

#[tokio::test]
async fn closed_window_rejects_submissions() {
    let harness = Harness::new().await;

    let page = body_text(harness.get("/", "").await).await;
    assert!(page.contains("Feedback is currently closed."));

    let response = harness.submit("meal=Lunch&rating=4").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("currently closed"));
    assert_eq!(harness.store.appends(), 0);
    assert_eq!(harness.sheet().await.len(), 20);
}

#[tokio::test]
async fn open_window_appends_one_row_and_recomputes_once() {
    let harness = Harness::new().await;
    harness.open_window().await;
    harness.store.reset_counters();

    let response = harness
        .submit("meal=Lunch&rating=4&issues=Too+Spicy&issues=Not+Cleaned+Well")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(harness.store.appends(), 1);
    assert_eq!(harness.store.full_reads(), 1);
    // every summary block goes out in a single batch
    assert_eq!(harness.store.writes(), 1);

    let sheet = harness.sheet().await;
    assert_eq!(sheet.len(), DATA_START_ROW as usize);
    let row = &sheet[DATA_START_ROW as usize - 1];
    assert_eq!(row[..3], ["Lunch", "Good", "Too Spicy, Not Cleaned Well"]);
    assert_eq!(row[3].len(), "2024-01-01 00:00:00".len());

    // Totals, overall counts, the Lunch row and both issue counters
    assert_eq!(sheet[3][..2], ["1", "4"]);
    assert_eq!(sheet[6][..5], ["0", "0", "0", "1", "0"]);
    assert_eq!(sheet[10][..6], ["Lunch", "0", "0", "0", "1", "0"]);
    assert_eq!(sheet[14][..2], ["Too Spicy", "1"]);
    assert_eq!(sheet[15][..2], ["Not Cooked Well", "0"]);
    assert_eq!(sheet[17][..2], ["Not Cleaned Well", "1"]);
}

#[tokio::test]
async fn no_issues_are_written_as_none() {
    let harness = Harness::new().await;
    harness.open_window().await;

    harness.submit("meal=Breakfast&rating=1").await;
    let sheet = harness.sheet().await;
    assert_eq!(sheet[20][..3], ["Breakfast", "Very Bad", "None"]);
}

#[tokio::test]
async fn malformed_forms_fail_before_touching_the_sheet() {
    let harness = Harness::new().await;
    harness.open_window().await;
    harness.store.reset_counters();

    for body in [
        "meal=Lunch",
        "rating=3",
        "meal=Brunch&rating=3",
        "meal=Lunch&rating=6",
        "meal=Lunch&rating=0",
        "meal=Lunch&rating=good",
        "meal=Lunch&rating=3&issues=Too+Salty",
    ] {
        let response = harness.submit(body).await;
        assert!(
            response.status().is_client_error(),
            "{body} answered {}",
            response.status()
        );
    }
    assert_eq!(harness.store.appends(), 0);
}

#[tokio::test]
async fn student_page_shows_totals_and_flash() {
    let harness = Harness::new().await;
    harness.open_window().await;

    harness.submit("meal=Dinner&rating=5").await;
    let response = harness.submit("meal=Dinner&rating=2").await;
    let flash = cookie(&response, "flash").unwrap();

    let page = body_text(harness.get("/", &flash).await).await;
    assert!(page.contains("Feedback Noted Successfully!"));
    assert!(page.contains("Total feedback: <strong>2</strong>"));
    assert!(page.contains("Average rating: <strong>3.5</strong>"));
    assert!(page.contains("value=\"Not Cooked Well\""));
}

#[tokio::test]
async fn totals_track_every_valid_submission() {
    let harness = Harness::new().await;
    let session = harness.open_window().await;

    let submissions = [
        ("Breakfast", 5),
        ("Breakfast", 4),
        ("Lunch", 1),
        ("Lunch", 3),
        ("Dinner", 3),
        ("Dinner", 2),
        ("Dinner", 5),
    ];
    for (meal, rating) in submissions {
        let response = harness.submit(&format!("meal={meal}&rating={rating}")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = harness.get("/api/summary", &session).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let summary = &json["summary"];

    assert_eq!(summary["total_feedback"], 7);
    // 23 / 7 = 3.2857...
    assert_eq!(summary["average_rating"], 3.29);

    let rating_sum: u64 = summary["rating_counts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(rating_sum, 7);

    let meal_sum: u64 = summary["meal_rating_counts"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|m| m.as_array().unwrap())
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(meal_sum, 7);
    assert_eq!(json["window"]["active"], true);
}

#[tokio::test]
async fn hand_edited_rows_are_skipped_by_the_summary() {
    use mess_feedback::cell::row;
    use mess_feedback::store::SheetStore;
    use mess_feedback::summary::update_summary;

    let harness = Harness::new().await;
    let store = harness.store.as_ref();
    store.append_row(row(["Lunch", "Good", "None", "t"])).await.unwrap();
    store.append_row(row(["Supper", "Good", "None", "t"])).await.unwrap();
    store.append_row(row(["Dinner", "Great", "None", "t"])).await.unwrap();
    store.append_row(row(["Dinner"])).await.unwrap();

    let summary = update_summary(store).await.unwrap();
    assert_eq!(summary.total_feedback, 1);
    assert_eq!(summary.average_rating, 4.0);
    assert_eq!(harness.sheet().await[3][..2], ["1", "4"]);
}

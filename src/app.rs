#![cfg(feature = "web")]

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path as AxumPath, State, rejection::FormRejection as PanelRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, Form as MultiForm, FormRejection};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;

use crate::backup::{backup_and_reset, is_backup_name, list_backups, to_csv};
use crate::config::{Backend, Config};
use crate::error::AppError;
use crate::feedback::{FeedbackForm, FeedbackRow, Issue, Meal, Rating, record_feedback};
use crate::flash::{set_flash, take_flash};
use crate::layout::{has_layout, initialize_sheet};
use crate::login::{self, AdminCredentials, current_admin};
use crate::remote::{GoogleSheetStore, SheetLocation};
use crate::store::{LocalSheetStore, SheetStore, StoreError};
use crate::summary::{Summary, read_totals, update_summary};
use crate::templates::{CLOSED_PAGE, Templates};
use crate::window::{FeedbackWindow, WindowAction, WindowStore, mirror_window};

const SUBMITTED: &str = "🎉 Feedback Noted Successfully!";
const RESET_DONE: &str = "Backup saved & Sheet Reset Successfully";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct AppState {
    pub store: Arc<dyn SheetStore>,
    pub templates: Templates,
    pub admin: AdminCredentials,
    pub backup_dir: PathBuf,
    window: RwLock<FeedbackWindow>,
    window_store: WindowStore,
}

impl AppState {
    /// Wire up the shared state, restoring the window from `window_store`
    pub fn new(
        store: Arc<dyn SheetStore>,
        window_store: WindowStore,
        admin: AdminCredentials,
        backup_dir: impl Into<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let window = window_store.load();
        if window.active {
            info!("restored an open feedback window started {}", window.start_label());
        }

        Ok(AppState {
            store,
            templates: Templates::new()?,
            admin,
            backup_dir: backup_dir.into(),
            window: RwLock::new(window),
            window_store,
        })
    }

    /// Snapshot of the current window
    pub fn window(&self) -> FeedbackWindow {
        self.window.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `action`, persist the result and return it
    ///
    /// The shared window only changes once the new state is on disk.
    fn change_window(&self, action: WindowAction) -> std::io::Result<FeedbackWindow> {
        let mut window = self.window.write().unwrap_or_else(|e| e.into_inner());
        let mut next = window.clone();
        action.apply(&mut next);
        self.window_store.save(&next)?;
        *window = next.clone();
        Ok(next)
    }
}

#[derive(Deserialize)]
struct PanelForm {
    action: WindowAction,
}

/// Build the backend selected by the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn SheetStore>, StoreError> {
    let store: Arc<dyn SheetStore> = match &config.backend {
        Backend::Local { sheet_file } => {
            info!("using local sheet at {}", sheet_file.display());
            Arc::new(LocalSheetStore::open(sheet_file)?)
        }
        Backend::Google(google) => {
            let location = SheetLocation {
                spreadsheet_id: google.spreadsheet_id.clone(),
                worksheet: google.worksheet.clone(),
            };
            Arc::new(GoogleSheetStore::new(location, &google.credentials)?)
        }
    };
    Ok(store)
}

/// Lay out a blank sheet, or refresh the summary of one already in use
///
/// # Arguments
/// * `store` - The feedback sheet
///
/// # Returns
/// * `Result<(), StoreError>` - Success or a sheet error
pub async fn prepare_sheet(store: &dyn SheetStore) -> Result<(), StoreError> {
    let all_values = store.get_all_values().await?;
    if has_layout(&all_values) {
        let summary = update_summary(store).await?;
        info!("existing sheet holds {} feedback rows", summary.total_feedback);
        Ok(())
    } else {
        initialize_sheet(store).await
    }
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/submit", post(submit))
        .route("/admin", get(login::serve_login_page).post(login::handle_login))
        .route("/admin-panel", get(admin_panel).post(admin_action))
        .route("/admin-panel/export.csv", get(export_csv))
        .route("/admin-panel/backups/:name", get(download_backup))
        .route("/logout", get(login::handle_logout))
        .route("/reset", post(reset))
        .route("/api/summary", get(api_summary))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Start the web server
///
/// Opens the sheet, restores the feedback window and serves until Ctrl+C or
/// SIGTERM.
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or an error
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config)?;
    prepare_sheet(store.as_ref()).await?;

    let admin = AdminCredentials::new(&config.admin_username, &config.admin_password)?;
    let state = Arc::new(AppState::new(
        store,
        WindowStore::new(&config.state_file),
        admin,
        &config.backup_dir,
    )?);

    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn emoji(rating: Rating) -> &'static str {
    match rating {
        Rating::VeryBad => "😡",
        Rating::Bad => "🙁",
        Rating::Average => "😐",
        Rating::Good => "🙂",
        Rating::VeryGood => "😍",
    }
}

async fn index(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response, AppError> {
    if !state.window().active {
        return Ok(Html(CLOSED_PAGE).into_response());
    }

    let (total, average) = read_totals(state.store.as_ref()).await?;
    let (jar, flash) = take_flash(jar);

    let ratings: Vec<_> = Rating::ALL
        .iter()
        .map(|r| json!({ "score": r.score(), "label": r.label(), "emoji": emoji(*r) }))
        .collect();
    let body = state.templates.render(
        "index",
        &json!({
            "flash": flash,
            "total": total,
            "average": average,
            "meals": Meal::ALL.map(Meal::label),
            "ratings": ratings,
            "issues": Issue::ALL.map(Issue::label),
        }),
    )?;

    Ok((jar, Html(body)).into_response())
}

async fn submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    form: Result<MultiForm<FeedbackForm>, FormRejection>,
) -> Result<Response, AppError> {
    if !state.window().active {
        return Ok((StatusCode::FORBIDDEN, Html(CLOSED_PAGE)).into_response());
    }
    let MultiForm(form) = form.map_err(|rejection| {
        warn!("rejected feedback form: {}", rejection);
        AppError::MalformedPayload
    })?;

    let feedback = FeedbackRow::now(form);
    record_feedback(state.store.as_ref(), &feedback).await?;

    Ok((set_flash(jar, SUBMITTED), Redirect::to("/")).into_response())
}

async fn admin_panel(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(username) = current_admin(&jar) else {
        return Ok(Redirect::to("/admin").into_response());
    };

    let window = state.window();
    let summary = Summary::from_sheet(&state.store.get_all_values().await?);
    let (jar, flash) = take_flash(jar);

    let rating_counts: Vec<_> = Rating::ALL
        .iter()
        .map(|r| json!({ "label": r.label(), "count": summary.rating_counts[r.index()] }))
        .collect();
    let meal_rows: Vec<_> = Meal::ALL
        .iter()
        .map(|m| {
            json!({
                "meal": m.label(),
                "counts": summary.meal_rating_counts[m.index()],
                "total": summary.meal_total(*m),
            })
        })
        .collect();
    let issue_counts: Vec<_> = Issue::ALL
        .iter()
        .map(|i| json!({ "label": i.label(), "count": summary.issue_counts[i.index()] }))
        .collect();

    let body = state.templates.render(
        "admin",
        &json!({
            "username": username,
            "flash": flash,
            "active": window.active,
            "start": window.start_label(),
            "end": window.end_label(),
            "summary": summary,
            "rating_counts": rating_counts,
            "meal_rows": meal_rows,
            "issue_counts": issue_counts,
            "backups": list_backups(&state.backup_dir),
        }),
    )?;

    Ok((jar, Html(body)).into_response())
}

async fn admin_action(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    form: Result<Form<PanelForm>, PanelRejection>,
) -> Result<Response, AppError> {
    let Some(username) = current_admin(&jar) else {
        return Ok(Redirect::to("/admin").into_response());
    };
    let Form(form) = form.map_err(|rejection| {
        warn!("rejected panel action: {}", rejection);
        AppError::MalformedPayload
    })?;

    let window = state.change_window(form.action)?;
    mirror_window(state.store.as_ref(), &window, form.action).await?;
    info!(
        "{} by {}: active={} start={} end={}",
        form.action.flash_message(),
        username,
        window.active,
        window.start_label(),
        window.end_label()
    );

    Ok((
        set_flash(jar, form.action.flash_message()),
        Redirect::to("/admin-panel"),
    )
        .into_response())
}

async fn reset(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response, AppError> {
    let Some(username) = current_admin(&jar) else {
        return Ok(Redirect::to("/admin").into_response());
    };

    let path = backup_and_reset(state.store.as_ref(), &state.backup_dir).await?;
    info!("sheet reset by {}, backup at {}", username, path.display());

    Ok((set_flash(jar, RESET_DONE), Redirect::to("/admin-panel")).into_response())
}

async fn api_summary(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current_admin(&jar).is_none() {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    let summary = Summary::from_sheet(&state.store.get_all_values().await?);
    Ok(Json(json!({ "summary": summary, "window": state.window() })).into_response())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current_admin(&jar).is_none() {
        return Ok(Redirect::to("/admin").into_response());
    }

    let csv = to_csv(&state.store.get_all_values().await?);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"feedback.csv\""),
        ],
        csv,
    )
        .into_response())
}

async fn download_backup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AxumPath(name): AxumPath<String>,
) -> Result<Response, AppError> {
    if current_admin(&jar).is_none() {
        return Ok(Redirect::to("/admin").into_response());
    }
    if !is_backup_name(&name) {
        return Err(AppError::NotFound);
    }

    let bytes = match tokio::fs::read(state.backup_dir.join(&name)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let disposition = format!("attachment; filename=\"{}\"", name);
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_MIME)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?)
}

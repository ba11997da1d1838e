//! HTTP routes: upload form, file acceptance, column selection and charts.

use crate::aggregate::{cross_tabulate, value_counts};
use crate::config::Config;
use crate::data::Table;
use crate::error::{Error, Result};
use crate::flash;
use crate::render::{render_crosstab, render_value_counts};
use crate::upload::{accept_upload, secure_filename, UploadStore};
use crate::views::{self, DataView};
use crate::RenderOptions;
use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub store: UploadStore,
    pub allowed_extensions: Arc<Vec<String>>,
    pub render_options: Arc<RenderOptions>,
    pub key: Key,
    pub upload_limit_bytes: usize,
}

impl AppState {
    pub fn new(
        store: UploadStore,
        allowed_extensions: Vec<String>,
        render_options: RenderOptions,
        secret: &str,
        upload_limit_bytes: usize,
    ) -> Self {
        Self {
            store,
            allowed_extensions: Arc::new(allowed_extensions),
            render_options: Arc::new(render_options),
            key: flash::signing_key(secret),
            upload_limit_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            UploadStore::new(config.upload_dir.clone()),
            config.allowed_extensions(),
            config.render_options(),
            &config.secret_key,
            config.upload_limit_bytes(),
        )
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Column choices submitted from the data page. Empty selections count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PlotForm {
    #[serde(default)]
    pub column_name_1: Option<String>,
    #[serde(default)]
    pub column_name_2: Option<String>,
}

impl PlotForm {
    fn columns(&self) -> (Option<String>, Option<String>) {
        let pick = |c: &Option<String>| c.as_ref().filter(|s| !s.is_empty()).cloned();
        (pick(&self.column_name_1), pick(&self.column_name_2))
    }
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.upload_limit_bytes;

    Router::new()
        .route(
            "/",
            get(upload_form).post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/data/:filename", get(view_data).post(plot_data))
        .route("/healthz", get(health))
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ColumnNotFound { .. } | Error::Upload(_) => StatusCode::BAD_REQUEST,
            Error::Parse { .. } | Error::EmptyAggregation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Io { .. } | Error::Render(_) | Error::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.is_client_error() {
            warn!(error = %self, "request rejected");
        } else {
            error!(error = %self, "request failed");
        }

        let message = if status.is_server_error() {
            "Something went wrong while processing the file.".to_string()
        } else {
            self.to_string()
        };

        (status, Html(views::error_page(status.as_u16(), &message))).into_response()
    }
}

/// GET / - upload form
async fn upload_form(jar: SignedCookieJar) -> impl IntoResponse {
    let (jar, messages) = flash::take(jar);
    (jar, Html(views::upload_page(&messages)))
}

/// POST / - accept a multipart upload in field `file`
async fn upload_file(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Upload(format!("failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Upload(format!("failed to read file data: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let filename = match accept_upload(
        upload.as_ref().map(|(name, _)| name.as_str()),
        &state.allowed_extensions,
    ) {
        Ok(filename) => filename,
        Err(rejection) => {
            warn!(?rejection, "upload rejected");
            return Ok(flash_redirect(jar, rejection.message(), "/"));
        }
    };

    let bytes = upload.map(|(_, bytes)| bytes).unwrap_or_default();
    let store = state.store.clone();
    let name = filename.clone();
    run_blocking(move || store.save(&name, &bytes)).await?;

    info!(%filename, "upload accepted");
    Ok(Redirect::to(&format!("/data/{}", filename)).into_response())
}

/// GET /data/:filename - column selection
async fn view_data(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response> {
    let filename = secure_filename(&filename);
    if filename.is_empty() {
        return Ok(flash_redirect(jar, "File not found", "/"));
    }

    let path = state.store.path_for(&filename);
    let loaded = run_blocking(move || Table::from_path(&path).map(|t| t.headers)).await;

    let columns = match loaded {
        Ok(columns) => columns,
        Err(Error::NotFound { path }) => {
            warn!(path = %path.display(), "requested file is missing");
            return Ok(flash_redirect(jar, "File not found", "/"));
        }
        Err(e) => return Err(e),
    };

    let (jar, messages) = flash::take(jar);
    let view = DataView {
        filename,
        columns,
        ..DataView::default()
    };
    Ok((jar, Html(views::data_page(&view, &messages))).into_response())
}

/// POST /data/:filename - aggregate the selected columns and chart them
async fn plot_data(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    jar: SignedCookieJar,
    Form(form): Form<PlotForm>,
) -> Result<Response> {
    let filename = secure_filename(&filename);
    if filename.is_empty() {
        return Ok(flash_redirect(jar, "File not found", "/"));
    }

    let (column_1, column_2) = form.columns();
    let Some(column_1) = column_1 else {
        return Ok(flash_redirect(
            jar,
            "Select a column to plot",
            &format!("/data/{}", filename),
        ));
    };

    let path = state.store.path_for(&filename);
    let options = state.render_options.clone();
    let selected_2 = column_2.clone();
    let selected_1 = column_1.clone();

    let result = run_blocking(move || {
        let table = Table::from_path(&path)?;
        build_view(&table, &selected_1, selected_2.as_deref(), &options)
    })
    .await;

    let mut view = match result {
        Ok(view) => view,
        Err(Error::NotFound { path }) => {
            warn!(path = %path.display(), "requested file is missing");
            return Ok(flash_redirect(jar, "File not found", "/"));
        }
        Err(e) => return Err(e),
    };
    view.filename = filename;

    info!(
        filename = %view.filename,
        column_1 = %column_1,
        column_2 = column_2.as_deref().unwrap_or(""),
        charts = view.charts.len(),
        "rendered data view"
    );

    let (jar, messages) = flash::take(jar);
    Ok((jar, Html(views::data_page(&view, &messages))).into_response())
}

/// Aggregate and render for one request.
///
/// With two columns the page gets the stacked chart, the single-column chart of
/// `column_1`, and the grouped table; with one column only the single-column chart.
pub fn build_view(
    table: &Table,
    column_1: &str,
    column_2: Option<&str>,
    options: &RenderOptions,
) -> Result<DataView> {
    tracing::debug!(
        rows = table.num_rows(),
        column_1,
        column_2 = column_2.unwrap_or(""),
        "aggregating"
    );

    let counts = value_counts(table, column_1)?;
    let mut view = DataView {
        columns: table.headers.clone(),
        selected: (Some(column_1.to_string()), column_2.map(str::to_string)),
        ..DataView::default()
    };

    match column_2 {
        Some(column_2) => {
            let crosstab = cross_tabulate(table, column_1, column_2)?;
            view.charts.push(render_crosstab(&crosstab, options)?);
            view.charts.push(render_value_counts(&counts, options)?);
            view.grouped = Some(crosstab);
        }
        None => {
            view.charts.push(render_value_counts(&counts, options)?);
        }
    }

    Ok(view)
}

async fn health() -> &'static str {
    "ok"
}

fn flash_redirect(jar: SignedCookieJar, message: &str, to: &str) -> Response {
    let jar = flash::push(jar, message);
    (jar, Redirect::to(to)).into_response()
}

/// Run file and CPU work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

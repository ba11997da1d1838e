use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use csvchart::server::{router, AppState};
use csvchart::upload::UploadStore;
use csvchart::RenderOptions;
use std::fs;
use std::path::Path;
use tower::util::ServiceExt;

const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Build the app over a fresh upload directory
fn create_test_app(dir: &Path) -> Router {
    let store = UploadStore::new(dir);
    store.ensure_dir().expect("Failed to create upload dir");
    let options = RenderOptions {
        width: 400,
        height: 300,
        ..RenderOptions::default()
    };
    router(AppState::new(
        store,
        vec!["csv".to_string()],
        options,
        "integration-test-secret",
        1024 * 1024,
    ))
}

/// Helper to create a multipart body with a single field
fn create_multipart_body(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary1234567890";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (boundary.to_string(), body)
}

async fn upload(app: &Router, field: &str, filename: &str, content: &[u8]) -> Response {
    let (boundary, body) = create_multipart_body(field, filename, content);
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, form: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Cookies set by a response, formatted for a follow-up request
fn cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Decode every inline PNG in a page
fn inline_images(html: &str) -> Vec<Vec<u8>> {
    let marker = "data:image/png;base64,";
    html.match_indices(marker)
        .map(|(idx, _)| {
            let rest = &html[idx + marker.len()..];
            let end = rest.find('"').unwrap();
            BASE64_STANDARD.decode(&rest[..end]).unwrap()
        })
        .collect()
}

/// Follow a flash redirect and return the page it lands on
async fn follow(app: &Router, response: Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = cookies(&response);
    let to = location(&response).to_string();
    let page = get(app, &to, Some(&cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    body_text(page).await
}

#[tokio::test]
async fn test_upload_form() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = get(&app, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"name="file""#));
}

#[tokio::test]
async fn test_upload_redirects_to_data_view() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let csv = fs::read("test/survey.csv").expect("Failed to read test CSV");

    let response = upload(&app, "file", "survey.csv", &csv).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/data/survey.csv");
    assert_eq!(fs::read(dir.path().join("survey.csv")).unwrap(), csv);
}

#[tokio::test]
async fn test_upload_extension_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = upload(&app, "file", "DATA.CSV", b"a\n1\n").await;
    assert_eq!(location(&response), "/data/DATA.CSV");
}

#[tokio::test]
async fn test_upload_filename_is_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = upload(&app, "file", "../../my data.csv", b"a\n1\n").await;
    assert_eq!(location(&response), "/data/my_data.csv");
    assert!(dir.path().join("my_data.csv").exists());
}

#[tokio::test]
async fn test_upload_rejects_non_csv() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let content = fs::read("test/notes.txt").expect("Failed to read test file");

    let response = upload(&app, "file", "notes.txt", &content).await;
    assert_eq!(location(&response), "/");
    let html = follow(&app, response).await;
    assert!(html.contains("Invalid file"));
    assert!(!dir.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_upload_rejects_empty_filename() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = upload(&app, "file", "", b"").await;
    let html = follow(&app, response).await;
    assert!(html.contains("Invalid file"));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = upload(&app, "attachment", "data.csv", b"a\n1\n").await;
    let html = follow(&app, response).await;
    assert!(html.contains("No file part"));
}

#[tokio::test]
async fn test_flash_is_shown_once() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = upload(&app, "file", "notes.txt", b"x").await;
    let cookie = cookies(&response);

    let first = get(&app, "/", Some(&cookie)).await;
    let cleared = cookies(&first);
    assert!(body_text(first).await.contains("Invalid file"));

    // The browser now holds the cleared cookie.
    let second = get(&app, "/", Some(&cleared)).await;
    assert!(!body_text(second).await.contains("Invalid file"));
}

#[tokio::test]
async fn test_data_view_lists_header_columns_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let csv = fs::read("test/survey.csv").expect("Failed to read test CSV");
    upload(&app, "file", "survey.csv", &csv).await;

    let response = get(&app, "/data/survey.csv", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let positions: Vec<usize> = ["respondent", "region", "answer", "age_group"]
        .iter()
        .map(|c| html.find(&format!(r#"<option value="{}">"#, c)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(!html.contains("data:image/png"));
}

#[tokio::test]
async fn test_missing_file_redirects_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = get(&app, "/data/nope.csv", None).await;
    assert_eq!(location(&response), "/");
    let html = follow(&app, response).await;
    assert!(html.contains("File not found"));

    let response = post_form(&app, "/data/nope.csv", "column_name_1=a&column_name_2=b").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_plot_two_columns() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let csv = fs::read("test/survey.csv").expect("Failed to read test CSV");
    upload(&app, "file", "survey.csv", &csv).await;

    let response = post_form(
        &app,
        "/data/survey.csv",
        "column_name_1=answer&column_name_2=region",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let images = inline_images(&html);
    assert_eq!(images.len(), 2);
    for png in &images {
        assert_eq!(png[0..8], PNG_MAGIC);
    }
    assert!(html.contains(r#"alt="Distribution based on region and answer""#));
    assert!(html.contains(r#"alt="Distribution of answer""#));

    assert!(html.contains("<th>region</th><th>answer</th><th>counts</th>"));
    assert!(html.contains("<tr><td>North</td><td>yes</td><td>2</td></tr>"));
    assert!(html.contains("<tr><td>South</td><td>no</td><td>1</td></tr>"));
    assert!(html.contains("<tr><td>East</td><td>no</td><td>1</td></tr>"));
}

#[tokio::test]
async fn test_plot_single_column() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let csv = fs::read("test/survey.csv").expect("Failed to read test CSV");
    upload(&app, "file", "survey.csv", &csv).await;

    let response = post_form(&app, "/data/survey.csv", "column_name_1=age_group&column_name_2=").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert_eq!(inline_images(&html).len(), 1);
    assert!(html.contains(r#"alt="Distribution of age_group""#));
    assert!(!html.contains("<table"));
}

#[tokio::test]
async fn test_plot_without_column_redirects_back() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    upload(&app, "file", "data.csv", b"a,b\n1,2\n").await;

    let response = post_form(&app, "/data/data.csv", "").await;
    assert_eq!(location(&response), "/data/data.csv");
    let html = follow(&app, response).await;
    assert!(html.contains("Select a column to plot"));
}

#[tokio::test]
async fn test_plot_unknown_column_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    upload(&app, "file", "data.csv", b"a,b\n1,2\n").await;

    let response = post_form(&app, "/data/data.csv", "column_name_1=a&column_name_2=zzz").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("zzz"));
}

#[tokio::test]
async fn test_plot_malformed_csv_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    let csv = fs::read("test/ragged.csv").expect("Failed to read test CSV");
    upload(&app, "file", "ragged.csv", &csv).await;

    let response = post_form(&app, "/data/ragged.csv", "column_name_1=a").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_plot_short_rows_treats_trailing_cells_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    upload(&app, "file", "short.csv", b"a,b\n1,2\n3\n").await;

    let response = post_form(&app, "/data/short.csv", "column_name_1=b&column_name_2=a").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert_eq!(inline_images(&html).len(), 2);
    assert!(html.contains("<tr><td>1</td><td>2</td><td>1</td></tr>"));
    assert!(!html.contains("<tr><td>3</td>"));
}

#[tokio::test]
async fn test_reupload_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());
    upload(&app, "file", "data.csv", b"old\n1\n").await;
    upload(&app, "file", "data.csv", b"new\n1\n").await;

    let html = body_text(get(&app, "/data/data.csv", None).await).await;
    assert!(html.contains(r#"<option value="new">"#));
    assert!(!html.contains(r#"<option value="old">"#));
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(dir.path());

    let response = get(&app, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

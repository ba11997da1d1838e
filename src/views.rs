//! HTML pages. All interpolated text goes through [`escape`].

use crate::aggregate::CrossTab;
use crate::render::ChartImage;
use std::fmt::Write;

/// Everything the data page shows after a chart request.
#[derive(Debug, Clone, Default)]
pub struct DataView {
    pub filename: String,
    pub columns: Vec<String>,
    pub selected: (Option<String>, Option<String>),
    pub charts: Vec<ChartImage>,
    pub grouped: Option<CrossTab>,
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, messages: &[String], body: &str) -> String {
    let mut flashes = String::new();
    for message in messages {
        let _ = write!(
            flashes,
            r#"<div class="alert alert-warning" role="alert">{}</div>"#,
            escape(message)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.alert {{ padding: .5rem 1rem; margin-bottom: 1rem; background: #fff3cd; border: 1px solid #ffe69c; }}
.table {{ border-collapse: collapse; }}
.table th, .table td {{ padding: .25rem .75rem; border: 1px solid #dee2e6; }}
.table-striped tbody tr:nth-of-type(odd) {{ background: #f2f2f2; }}
img.chart {{ max-width: 100%; display: block; margin: 1rem 0; }}
</style>
</head>
<body>
{flashes}
{body}
</body>
</html>
"#,
        title = escape(title),
        flashes = flashes,
        body = body,
    )
}

/// The upload form.
pub fn upload_page(messages: &[String]) -> String {
    let body = r#"<h1>Upload a CSV file</h1>
<form method="post" action="/" enctype="multipart/form-data">
<input type="file" name="file" accept=".csv">
<button type="submit">Upload</button>
</form>"#;
    layout("Upload CSV", messages, body)
}

/// Column selection form, plus charts and the grouped table when present.
pub fn data_page(view: &DataView, messages: &[String]) -> String {
    let mut body = String::new();
    let file = escape(&view.filename);

    let _ = write!(
        body,
        r#"<h1>{file}</h1>
<p><a href="/">Upload another file</a></p>
<form method="post" action="/data/{file}">
<label>Column 1 {select_1}</label>
<label>Column 2 {select_2}</label>
<button type="submit">Plot</button>
</form>
"#,
        file = file,
        select_1 = column_select("column_name_1", &view.columns, view.selected.0.as_deref(), false),
        select_2 = column_select("column_name_2", &view.columns, view.selected.1.as_deref(), true),
    );

    for chart in &view.charts {
        let _ = write!(
            body,
            r#"<img class="chart" alt="{alt}" width="{w}" height="{h}" src="data:image/png;base64,{data}">
"#,
            alt = escape(&chart.title),
            w = chart.width,
            h = chart.height,
            data = chart.to_base64(),
        );
    }

    if let Some(grouped) = &view.grouped {
        body.push_str(&grouped_table(grouped));
    }

    layout(&view.filename, messages, &body)
}

fn column_select(name: &str, columns: &[String], selected: Option<&str>, optional: bool) -> String {
    let mut html = format!(r#"<select name="{}">"#, name);
    if optional {
        html.push_str(r#"<option value="">(none)</option>"#);
    }
    for column in columns {
        let mark = if selected == Some(column.as_str()) { " selected" } else { "" };
        let _ = write!(
            html,
            r#"<option value="{v}"{mark}>{v}</option>"#,
            v = escape(column),
            mark = mark
        );
    }
    html.push_str("</select>");
    html
}

/// Grouped counts as a table with columns `group`, `series`, `counts`.
pub fn grouped_table(tab: &CrossTab) -> String {
    let mut html = String::from(r#"<table class="table table-striped">"#);
    let _ = write!(
        html,
        "<thead><tr><th>{}</th><th>{}</th><th>counts</th></tr></thead><tbody>",
        escape(&tab.group_column),
        escape(&tab.series_column)
    );
    for (group, series, count) in tab.rows() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(group),
            escape(series),
            count
        );
    }
    html.push_str("</tbody></table>\n");
    html
}

pub fn error_page(status: u16, message: &str) -> String {
    let body = format!(
        r#"<h1>Error {status}</h1>
<p>{message}</p>
<p><a href="/">Back to upload</a></p>"#,
        status = status,
        message = escape(message)
    );
    layout("Error", &[], &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::cross_tabulate;
    use crate::data::Table;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_upload_page_shows_messages() {
        let html = upload_page(&["File not found".to_string()]);
        assert!(html.contains("File not found"));
        assert!(html.contains(r#"name="file""#));
        assert!(html.contains("multipart/form-data"));
    }

    #[test]
    fn test_data_page_lists_columns_in_order() {
        let view = DataView {
            filename: "data.csv".to_string(),
            columns: vec!["b".to_string(), "<a>".to_string()],
            ..DataView::default()
        };
        let html = data_page(&view, &[]);
        let b = html.find(r#"<option value="b">"#).unwrap();
        let a = html.find(r#"<option value="&lt;a&gt;">"#).unwrap();
        assert!(b < a);
        assert!(html.contains(r#"action="/data/data.csv""#));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn test_grouped_table() {
        let table = Table::from_reader("A,B\nx,p\nx,p\ny,q\n".as_bytes()).unwrap();
        let tab = cross_tabulate(&table, "A", "B").unwrap();
        let html = grouped_table(&tab);
        assert!(html.contains("<th>B</th><th>A</th><th>counts</th>"));
        assert!(html.contains("<tr><td>p</td><td>x</td><td>2</td></tr>"));
        assert!(html.contains("<tr><td>q</td><td>y</td><td>1</td></tr>"));
    }

    #[test]
    fn test_error_page_escapes() {
        let html = error_page(400, "column '<b>' not found");
        assert!(html.contains("Error 400"));
        assert!(html.contains("&lt;b&gt;"));
    }
}

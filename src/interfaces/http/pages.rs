// ============================================================
// HTML PAGES
// ============================================================
// Server-rendered upload/predict form and result pages

use crate::domain::price_model::TrainedModel;
use crate::domain::schema::PriceSchema;

/// One-shot message carried on the redirect after an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Flash {
    Info(String),
    Error(String),
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 44rem; margin: 2rem auto; padding: 0 1rem; }}
fieldset {{ margin-bottom: 1.5rem; }}
label {{ display: block; margin: 0.5rem 0 0.2rem; }}
.flash-info {{ background: #e7f5e9; padding: 0.6rem; }}
.flash-error {{ background: #fbe9e9; padding: 0.6rem; }}
.muted {{ color: #666; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

pub fn index_page(schema: &PriceSchema, model: Option<&TrainedModel>, flash: Option<&Flash>) -> String {
    let mut body = String::from("<h1>Price predictor</h1>\n");

    match flash {
        Some(Flash::Info(msg)) => {
            body.push_str(&format!("<p class=\"flash-info\">{}</p>\n", escape_html(msg)))
        }
        Some(Flash::Error(msg)) => {
            body.push_str(&format!("<p class=\"flash-error\">{}</p>\n", escape_html(msg)))
        }
        None => {}
    }

    match model {
        Some(trained) => body.push_str(&format!(
            "<p class=\"muted\">Model trained on {} rows at {}.</p>\n",
            trained.manifest.training_rows,
            trained.manifest.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => body.push_str(
            "<p class=\"muted\">No model yet. Upload a CSV to train one.</p>\n",
        ),
    }

    body.push_str(&format!(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">
<fieldset>
<legend>Train from CSV</legend>
<p class="muted">Required columns: {columns}. <a href="/sample.csv">Download a sample</a>.</p>
<input type="file" name="file" accept=".csv,text/csv" required>
<button type="submit">Upload and train</button>
</fieldset>
</form>
"#,
        columns = escape_html(&schema.required_columns().join(", "))
    ));

    body.push_str("<form method=\"post\" action=\"/predict\">\n<fieldset>\n<legend>Predict a price</legend>\n");
    for field in &schema.categorical {
        let field_html = escape_html(field);
        body.push_str(&format!(
            "<label for=\"{f}\">{f}</label>\n<input id=\"{f}\" name=\"{f}\" list=\"{f}-values\">\n",
            f = field_html
        ));
        let known = model
            .and_then(|t| t.model.encoder().vocabulary(field))
            .map(|v| v.values.as_slice())
            .unwrap_or_default();
        body.push_str(&format!("<datalist id=\"{}-values\">", field_html));
        for value in known {
            body.push_str(&format!("<option value=\"{}\">", escape_html(value)));
        }
        body.push_str("</datalist>\n");
    }
    for field in &schema.numeric {
        body.push_str(&format!(
            "<label for=\"{f}\">{f}</label>\n<input id=\"{f}\" name=\"{f}\" type=\"number\" step=\"any\" required>\n",
            f = escape_html(field)
        ));
    }
    body.push_str("<p><button type=\"submit\">Predict</button></p>\n</fieldset>\n</form>\n");

    layout("Price predictor", &body)
}

pub fn result_page(inputs: &[(String, String)], price: f64) -> String {
    let mut body = String::from("<h1>Suggested price</h1>\n");
    body.push_str(&format!("<p><strong>{:.2}</strong></p>\n<ul>\n", round_price(price)));
    for (field, value) in inputs {
        body.push_str(&format!(
            "<li>{}: {}</li>\n",
            escape_html(field),
            escape_html(value)
        ));
    }
    body.push_str("</ul>\n<p><a href=\"/\">Back</a></p>\n");
    layout("Suggested price", &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        "<h1>Something went wrong</h1>\n<p class=\"flash-error\">{}</p>\n<p><a href=\"/\">Back</a></p>\n",
        escape_html(message)
    );
    layout("Error", &body)
}

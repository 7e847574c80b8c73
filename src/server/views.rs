//! HTML rendering for the landing page, the prediction form and errors

use axum::http::StatusCode;

use crate::config::FeatureSchema;
use crate::predict::{CustomData, FormSchema};

const STYLE: &str = r#"<style>
body{font-family:system-ui,sans-serif;background:#111827;color:#f3f4f6;margin:0}
main{max-width:40rem;margin:3rem auto;padding:0 1.5rem}
h1{font-size:1.6rem}
label{display:block;margin:.8rem 0 .3rem;font-size:.9rem;color:#d1d5db}
input,select{width:100%;padding:.5rem;border-radius:.375rem;border:1px solid #4b5563;background:#1f2937;color:#f3f4f6}
button{margin-top:1.2rem;padding:.6rem 1.2rem;border:0;border-radius:.375rem;background:#3b82f6;color:white;cursor:pointer}
.result{margin-top:1.5rem;padding:1rem;border-radius:.375rem;background:#064e3b}
.error{padding:1rem;border-radius:.375rem;background:#7f1d1d}
a{color:#93c5fd}
</style>"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{}</title>\n{}\n</head>\n<body>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

/// Escape text for use in element content and quoted attributes
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

/// "parental_level_of_education" -> "Parental level of education"
fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_index() -> String {
    page(
        "Score Predictor",
        "<h1>Score Predictor</h1>\n\
         <p>Predict the target score from the other attributes of a record.</p>\n\
         <p><a href=\"/predictdata\">Open the prediction form</a></p>",
    )
}

/// Prediction form; fields keep `values` and the result is shown when present
pub fn render_form(form: &FormSchema, values: &CustomData, prediction: Option<f64>) -> String {
    let schema: &FeatureSchema = &form.schema;
    let mut body = String::new();
    body.push_str("<h1>Score Predictor</h1>\n<form method=\"post\" action=\"/predictdata\">\n");

    for name in &schema.numeric_columns {
        let id = escape_html(name);
        body.push_str(&format!(
            "<label for=\"{id}\">{label}</label>\n\
             <input id=\"{id}\" name=\"{id}\" type=\"number\" step=\"any\" value=\"{value}\" required>\n",
            id = id,
            label = escape_html(&field_label(name)),
            value = escape_html(values.get(name).unwrap_or("")),
        ));
    }

    for name in &schema.categorical_columns {
        let id = escape_html(name);
        let label = escape_html(&field_label(name));
        let current = values.get(name).unwrap_or("");
        match form.vocabulary(name) {
            Some(options) if !options.is_empty() => {
                body.push_str(&select_field(&id, &label, options, current));
            }
            _ => {
                body.push_str(&format!(
                    "<label for=\"{id}\">{label}</label>\n\
                     <input id=\"{id}\" name=\"{id}\" type=\"text\" value=\"{value}\" required>\n",
                    id = id,
                    label = label,
                    value = escape_html(current),
                ));
            }
        }
    }

    body.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    if let Some(value) = prediction {
        body.push_str(&format!(
            "<div class=\"result\">Predicted {}: <strong id=\"prediction\">{:.4}</strong></div>\n",
            escape_html(&field_label(&schema.target_column).to_lowercase()),
            value
        ));
    }

    page("Score Predictor", &body)
}

/// `<select>` over a fitted vocabulary with `current` preselected
fn select_field(id: &str, label: &str, options: &[String], current: &str) -> String {
    let placeholder = if current.is_empty() { " selected" } else { "" };
    let mut html = format!(
        "<label for=\"{id}\">{label}</label>\n<select id=\"{id}\" name=\"{id}\" required>\n\
         <option value=\"\" disabled{placeholder}>Select {label}</option>\n",
        id = id,
        label = label,
        placeholder = placeholder,
    );
    for option in options {
        let selected = if option == current { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{v}\"{s}>{v}</option>\n",
            v = escape_html(option),
            s = selected
        ));
    }
    html.push_str("</select>\n");
    html
}

pub fn render_error(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<h1>{} {}</h1>\n<div class=\"error\">{}</div>\n<p><a href=\"/predictdata\">Back to the form</a></p>",
        status.as_u16(),
        escape_html(reason),
        escape_html(message)
    );
    page(reason, &body)
}

//! Server-side HTML for the classification page. Charts are inline SVG so
//! the page works without client-side scripts.

use std::f64::consts::TAU;
use std::fmt::Write;

use crate::session::Theme;
use crate::types::{HistoryEntry, Label, Prediction};
use crate::view::{EMPTY_MESSAGE_WARNING, HISTORY_CLEARED, Outcome, Page};

const STYLE: &str = r#"
body{font-family:system-ui,-apple-system,'Segoe UI',sans-serif;margin:0;padding:0}
body.theme-light{background:#f9fafb;color:#111827}
body.theme-dark{background:#0e1117;color:#fafafa}
main{max-width:720px;margin:0 auto;padding:24px}
.title{text-align:center;font-size:40px;font-weight:bold}
.subtitle{text-align:center;color:gray;font-size:16px}
textarea{width:100%;height:150px;box-sizing:border-box;font:inherit;padding:8px}
button{width:100%;padding:8px;margin-top:8px;font:inherit;cursor:pointer}
.alert{padding:12px 16px;border-radius:6px;margin:16px 0}
.alert.warning{background:#fffbeb;color:#92400e}
.alert.error{background:#fef2f2;color:#991b1b}
.alert.success{background:#ecfdf5;color:#065f46}
.metrics{display:flex;gap:16px}
.metric{flex:1}
.metric .value{font-size:32px}
.charts svg{display:block;margin:16px auto}
.theme-dark svg text{fill:#fafafa}
.bar-ham{fill:#1f77b4}.bar-spam{fill:#ff7f0e}
table{width:100%;border-collapse:collapse}
th,td{text-align:left;padding:4px 8px;border-bottom:1px solid #e5e7eb}
.theme-form{text-align:right}
.theme-form select,.theme-form button{width:auto}
footer{color:gray;font-size:12px;margin-top:24px}
"#;

pub fn render_page(page: &Page) -> String {
    let base = format!("/sessions/{}", page.session_id);
    let mut html = String::new();

    let theme_class = match page.theme {
        Theme::Light => "theme-light",
        Theme::Dark => "theme-dark",
    };

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Spam Message Detector</title>\n<style>{STYLE}</style>\n</head>\n\
         <body class=\"{theme_class}\">\n<main>\n"
    );

    if page.variant.theme_enabled() {
        html.push_str(&theme_form(&base, page.theme));
    }

    html.push_str(
        "<div class=\"title\">📩 Spam Message Classifier</div>\n\
         <div class=\"subtitle\">Check whether a message is Spam or Ham using ML</div>\n<hr>\n",
    );

    let _ = write!(
        html,
        "<h3>✍️ Enter Message</h3>\n<form method=\"post\" action=\"{base}/predict\">\n\
         <label for=\"message\">Type your message below:</label>\n\
         <textarea id=\"message\" name=\"message\" \
         placeholder=\"Congratulations! You won a free prize...\">{}</textarea>\n\
         <button type=\"submit\">🔍 Predict</button>\n</form>\n",
        escape(&page.message)
    );

    match &page.outcome {
        Outcome::Idle => {}
        Outcome::Invalid => {
            let _ = write!(
                html,
                "<div class=\"alert warning\">⚠️ {EMPTY_MESSAGE_WARNING}</div>\n"
            );
        }
        Outcome::Failed(error) => {
            let _ = write!(
                html,
                "<div class=\"alert error\">Classification failed: {}</div>\n",
                escape(error)
            );
        }
        Outcome::HistoryCleared => {
            let _ = write!(html, "<div class=\"alert success\">{HISTORY_CLEARED}</div>\n");
        }
        Outcome::Scored(prediction) => {
            html.push_str("<hr>\n");
            html.push_str(&verdict(prediction));
            html.push_str(&metrics(prediction));
            html.push_str("<div class=\"charts\">\n<h3>📊 Prediction Confidence</h3>\n");
            html.push_str(&bar_chart(prediction));
            if page.variant.pie_chart_enabled() {
                html.push_str(&pie_chart(prediction));
            }
            html.push_str("</div>\n");
        }
    }

    if let Some(history) = &page.history {
        html.push_str(&history_table(&base, history));
    }

    let _ = write!(
        html,
        "<hr>\n<footer>\n<form method=\"post\" action=\"{base}/end\">\
         <button type=\"submit\">End session</button></form>\n\
         <p>🚀 Built with Rust &amp; Machine Learning</p>\n\
         <p>© 2024 Spam Message Detector</p>\n</footer>\n</main>\n</body>\n</html>\n"
    );

    html
}

fn theme_form(base: &str, current: Theme) -> String {
    let option = |theme: Theme, value: &str, name: &str| {
        let selected = if theme == current { " selected" } else { "" };
        format!("<option value=\"{value}\"{selected}>{name}</option>")
    };
    format!(
        "<form class=\"theme-form\" method=\"post\" action=\"{base}/theme\">\
         <label for=\"theme\">🎨 Theme</label> <select id=\"theme\" name=\"theme\">{}{}</select> \
         <button type=\"submit\">Apply</button></form>\n",
        option(Theme::Light, "light", "Light"),
        option(Theme::Dark, "dark", "Dark"),
    )
}

fn verdict(prediction: &Prediction) -> String {
    match prediction.label {
        Label::Spam => {
            "<div class=\"alert error verdict-spam\">🚨 <strong>SPAM DETECTED</strong></div>\n"
                .to_string()
        }
        Label::Ham => {
            "<div class=\"alert success verdict-ham\">✅ <strong>HAM (Not Spam)</strong></div>\n"
                .to_string()
        }
    }
}

fn metrics(prediction: &Prediction) -> String {
    format!(
        "<div class=\"metrics\">\n\
         <div class=\"metric\"><div>📌 Spam Probability</div><div class=\"value\">{:.2}%</div></div>\n\
         <div class=\"metric\"><div>📌 Ham Probability</div><div class=\"value\">{:.2}%</div></div>\n\
         </div>\n",
        prediction.spam_probability, prediction.ham_probability
    )
}

const BAR_WIDTH: f64 = 400.0;
const BAR_HEIGHT: f64 = 300.0;
const PLOT_LEFT: f64 = 60.0;
const PLOT_RIGHT: f64 = 380.0;
const PLOT_TOP: f64 = 40.0;
const PLOT_BOTTOM: f64 = 260.0;

/// Bar height in pixels for a percentage on the fixed 0-100 axis.
fn bar_extent(percent: f64) -> f64 {
    (percent.clamp(0.0, 100.0) / 100.0) * (PLOT_BOTTOM - PLOT_TOP)
}

fn bar_chart(prediction: &Prediction) -> String {
    let mut svg = format!(
        "<svg class=\"bar-chart\" width=\"{BAR_WIDTH}\" height=\"{BAR_HEIGHT}\" \
         viewBox=\"0 0 {BAR_WIDTH} {BAR_HEIGHT}\" role=\"img\" aria-label=\"Model Confidence\">\n\
         <text x=\"{}\" y=\"20\" text-anchor=\"middle\" font-weight=\"bold\">Model Confidence</text>\n\
         <text x=\"15\" y=\"{}\" text-anchor=\"middle\" transform=\"rotate(-90 15 {})\">Probability (%)</text>\n",
        (PLOT_LEFT + PLOT_RIGHT) / 2.0,
        (PLOT_TOP + PLOT_BOTTOM) / 2.0,
        (PLOT_TOP + PLOT_BOTTOM) / 2.0,
    );

    for tick in (0..=100).step_by(20) {
        let y = PLOT_BOTTOM - bar_extent(tick as f64);
        let _ = writeln!(
            svg,
            "<line x1=\"{PLOT_LEFT}\" y1=\"{y}\" x2=\"{PLOT_RIGHT}\" y2=\"{y}\" stroke=\"#d1d5db\"/>\
             <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"11\">{tick}</text>",
            PLOT_LEFT - 6.0,
            y + 4.0
        );
    }

    let slot = (PLOT_RIGHT - PLOT_LEFT) / 2.0;
    let bars = [
        ("Ham", "bar-ham", prediction.ham_probability),
        ("Spam", "bar-spam", prediction.spam_probability),
    ];
    for (i, (name, class, value)) in bars.into_iter().enumerate() {
        let height = bar_extent(value);
        let x = PLOT_LEFT + slot * i as f64 + slot * 0.2;
        let width = slot * 0.6;
        let _ = writeln!(
            svg,
            "<rect class=\"{class}\" x=\"{x:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" \
             data-value=\"{value:.2}\"/><text x=\"{:.2}\" y=\"{}\" text-anchor=\"middle\">{name}</text>",
            PLOT_BOTTOM - height,
            x + width / 2.0,
            PLOT_BOTTOM + 18.0
        );
    }

    svg.push_str("</svg>\n");
    svg
}

const PIE_CENTER: f64 = 150.0;
const PIE_RADIUS: f64 = 100.0;

fn point_at(fraction: f64, radius: f64) -> (f64, f64) {
    let angle = fraction * TAU;
    (
        PIE_CENTER + radius * angle.sin(),
        PIE_CENTER - radius * angle.cos(),
    )
}

fn pie_chart(prediction: &Prediction) -> String {
    let total = prediction.spam_probability + prediction.ham_probability;
    let spam = if total > 0.0 {
        prediction.spam_probability / total
    } else {
        0.0
    };

    let mut svg = String::from(
        "<svg class=\"pie-chart\" width=\"300\" height=\"300\" viewBox=\"0 0 300 300\" \
         role=\"img\" aria-label=\"Prediction Distribution\">\n",
    );

    if spam <= 0.0 || spam >= 1.0 {
        let class = if spam >= 1.0 { "bar-spam" } else { "bar-ham" };
        let _ = writeln!(
            svg,
            "<circle class=\"{class}\" cx=\"{PIE_CENTER}\" cy=\"{PIE_CENTER}\" r=\"{PIE_RADIUS}\"/>"
        );
    } else {
        let (ex, ey) = point_at(spam, PIE_RADIUS);
        let top = PIE_CENTER - PIE_RADIUS;
        let spam_large = u8::from(spam > 0.5);
        let ham_large = u8::from(spam < 0.5);
        let _ = writeln!(
            svg,
            "<path class=\"bar-spam\" d=\"M {PIE_CENTER} {PIE_CENTER} L {PIE_CENTER} {top} \
             A {PIE_RADIUS} {PIE_RADIUS} 0 {spam_large} 1 {ex:.2} {ey:.2} Z\"/>\n\
             <path class=\"bar-ham\" d=\"M {PIE_CENTER} {PIE_CENTER} L {ex:.2} {ey:.2} \
             A {PIE_RADIUS} {PIE_RADIUS} 0 {ham_large} 1 {PIE_CENTER} {top} Z\"/>"
        );
    }

    let annotations = [
        ("Spam", prediction.spam_probability, spam / 2.0),
        ("Ham", prediction.ham_probability, spam + (1.0 - spam) / 2.0),
    ];
    for (name, value, mid) in annotations {
        if value <= 0.0 {
            continue;
        }
        let (x, y) = point_at(mid, PIE_RADIUS * 0.6);
        let _ = writeln!(
            svg,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\">{name} {value:.2}%</text>"
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn history_table(base: &str, history: &[HistoryEntry]) -> String {
    let mut html = String::from("<hr>\n<h3>🕘 Prediction History</h3>\n");

    if history.is_empty() {
        html.push_str("<p class=\"history-empty\">No predictions yet.</p>\n");
    } else {
        html.push_str(
            "<table class=\"history\">\n<thead><tr><th>#</th><th>Message</th><th>Prediction</th>\
             <th>Spam %</th><th>Ham %</th></tr></thead>\n<tbody>\n",
        );
        for (i, entry) in history.iter().enumerate() {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                i + 1,
                escape(&entry.message),
                escape(&entry.label),
                entry.spam_probability,
                entry.ham_probability
            );
        }
        html.push_str("</tbody>\n</table>\n");
    }

    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"{base}/history/clear\">\
         <button type=\"submit\">🗑️ Clear History</button></form>"
    );
    html
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

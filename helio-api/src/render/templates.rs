//! Built-in report templates.
//!
//! Markup is line oriented: every block element sits on its own line so the
//! PDF compiler can lay it out without a full HTML parser.

use std::fmt::Write;

use helio_core::{FieldMap, RenderModel, ReportFormat};
use serde_json::Value;

use super::{RenderError, TemplateRenderer};

/// Detailed and summary templates implemented in Rust.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for BuiltinTemplates {
    fn has_template(&self, name: &str) -> bool {
        ReportFormat::ALL.iter().any(|f| f.template_name() == name)
    }

    fn render(&self, model: &RenderModel, template: &str) -> Result<String, RenderError> {
        let mut out = Markup::default();
        if template == ReportFormat::Detailed.template_name() {
            detailed(model, &mut out);
        } else if template == ReportFormat::Summary.template_name() {
            summary(model, &mut out);
        } else {
            return Err(RenderError::TemplateNotFound(template.to_string()));
        }
        out.finish()
    }
}

fn detailed(model: &RenderModel, out: &mut Markup) {
    header(model, "Solar Assessment Report", out);

    out.heading2("Site");
    out.row("Latitude", &format!("{:.6}", model.location.lat));
    out.row("Longitude", &format!("{:.6}", model.location.lon));

    out.heading2("System Performance");
    out.row("Annual production", &kwh(model.annual_kwh));
    out.row("Shading loss", &percent(model.shading_loss_pct));
    out.row("Net annual production", &kwh(model.net_annual_kwh));

    out.heading2("Costs");
    out.row("System cost", &usd(model.cost_usd));
    out.row("Cost per kWh (first year)", &format!("${:.4}", model.cost_per_kwh));

    if model.include_financial && !model.financial_data.is_empty() {
        out.heading2("Financial Analysis");
        fields(&model.financial_data, out);
    }

    if !model.metadata.is_empty() {
        out.heading2("Project Details");
        fields(&model.metadata, out);
    }

    footer(model, out);
}

fn summary(model: &RenderModel, out: &mut Markup) {
    header(model, "Solar Report Summary", out);
    out.row("Net annual production", &kwh(model.net_annual_kwh));
    out.row("System cost", &usd(model.cost_usd));
    out.row("Cost per kWh (first year)", &format!("${:.4}", model.cost_per_kwh));
    footer(model, out);
}

fn header(model: &RenderModel, title: &str, out: &mut Markup) {
    out.heading1(title);
    out.row("Project", &model.project_name);
    out.row("Project ID", &model.project_id.to_string());
    out.row("Status", model.status.as_str());
}

fn footer(model: &RenderModel, out: &mut Markup) {
    out.rule();
    out.paragraph(&format!(
        "Generated {}",
        model.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
}

fn fields(map: &FieldMap, out: &mut Markup) {
    for (key, value) in map.iter() {
        out.row(&label(key), &display_value(value));
    }
}

fn label(key: &str) -> String {
    let mut label = key.replace('_', " ");
    if let Some(first) = label.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    label
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        other => other.to_string(),
    }
}

fn kwh(value: f64) -> String {
    format!("{:.0} kWh", value)
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn usd(value: f64) -> String {
    format!("${:.2}", value)
}

/// Escape text for inclusion in markup.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            // Line breaks inside a value would split its block element.
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Default)]
struct Markup {
    body: String,
    failed: bool,
}

impl Markup {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if self.body.write_fmt(args).is_err() || self.body.write_char('\n').is_err() {
            self.failed = true;
        }
    }

    fn heading1(&mut self, text: &str) {
        self.line(format_args!("<h1>{}</h1>", escape(text)));
    }

    fn heading2(&mut self, text: &str) {
        self.line(format_args!("<h2>{}</h2>", escape(text)));
    }

    fn row(&mut self, key: &str, value: &str) {
        self.line(format_args!(
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(key),
            escape(value)
        ));
    }

    fn paragraph(&mut self, text: &str) {
        self.line(format_args!("<p>{}</p>", escape(text)));
    }

    fn rule(&mut self) {
        self.line(format_args!("<hr>"));
    }

    fn finish(self) -> Result<String, RenderError> {
        if self.failed {
            return Err(RenderError::Template("failed to write markup".into()));
        }
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<body>\n{}</body>\n</html>\n",
            self.body
        ))
    }
}

use crate::common::Result;
use crate::service::protocol::SessionReport;
use minijinja::{context, Environment};
use serde::Serialize;

const LAYOUT: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Image Optimizer</title>
  <style>
    body { font-family: sans-serif; margin: 2rem auto; max-width: 72rem; padding: 0 1rem; }
    img { max-width: 100%; display: block; }
    figure { margin: 0 0 1.5rem 0; }
    figcaption { color: #666; font-size: 0.9rem; }
    .warning { background: #fff4d6; padding: 0.75rem 1rem; border-radius: 0.3rem; }
    .success { background: #dff5e1; padding: 0.75rem 1rem; border-radius: 0.3rem; }
    .button { display: inline-block; padding: 0.5rem 1rem; border: 1px solid #999; border-radius: 0.3rem; text-decoration: none; color: inherit; }
  </style>
</head>
<body>
  <h1>Image Optimizer</h1>
  <p>Upload an image to optimize its size.</p>
  {% block content %}{% endblock %}
</body>
</html>
"#;

const INDEX: &str = r#"{% extends "layout.html" %}
{% block content %}
<form method="post" action="/sessions" enctype="multipart/form-data">
  <label>Upload an image <input type="file" name="file" accept=".jpg,.jpeg,.png" required></label>
  <button type="submit">Upload</button>
</form>
{% endblock %}
"#;

const SESSION: &str = r#"{% extends "layout.html" %}
{% block content %}
<form method="post" action="/sessions/{{ page.id }}/upload" enctype="multipart/form-data">
  <label>Upload an image <input type="file" name="file" accept=".jpg,.jpeg,.png" required></label>
  <button type="submit">Upload</button>
</form>
{% if page.filename %}
<p>Original image size: {{ page.original_size }} MB</p>
<figure>
  <img src="/sessions/{{ page.id }}/original" alt="{{ page.filename }}">
  <figcaption>Original Image</figcaption>
</figure>
{% if page.needs_optimization %}
<p class="warning">Image is larger than {{ page.threshold }}MB. Let's optimize it.</p>
{% for variant in page.variants %}
<p><strong>{{ variant.quality }}% Quality Preview (Simulated Size: {{ variant.size }} MB)</strong></p>
<figure>
  <img src="/sessions/{{ page.id }}/original" alt="{{ variant.quality }}% Quality">
  <figcaption>{{ variant.quality }}% Quality</figcaption>
</figure>
{% endfor %}
<form method="post" action="/sessions/{{ page.id }}/select">
  <p>Choose a quality level to download:</p>
  {% for variant in page.variants %}
  <label><input type="radio" name="quality" value="{{ variant.quality }}"{% if variant.checked %} checked{% endif %}> {{ variant.quality }}</label>
  {% endfor %}
  <button type="submit">Select</button>
</form>
{% if page.selected %}
<p>Selected {{ page.selected.quality }}% Quality - Simulated Size: {{ page.selected.size }} MB</p>
<a class="button" href="{{ page.selected.download_url }}">Download {{ page.selected.quality }}% Quality Image</a>
{% endif %}
{% elif page.no_action %}
<p class="success">Image size is under {{ page.threshold }}MB. No optimization needed.</p>
{% endif %}
{% endif %}
{% endblock %}
"#;

#[derive(Serialize, Debug, Clone)]
struct VariantView {
    quality: u8,
    size: String,
    download_url: String,
    checked: bool,
}

#[derive(Serialize, Debug)]
struct SessionView<'a> {
    id: &'a str,
    filename: Option<&'a str>,
    original_size: Option<String>,
    threshold: String,
    needs_optimization: bool,
    no_action: bool,
    variants: Vec<VariantView>,
    selected: Option<VariantView>,
}

impl<'a> SessionView<'a> {
    fn from_report(report: &'a SessionReport) -> Self {
        let variants: Vec<VariantView> = report
            .variants
            .iter()
            .map(|variant| VariantView {
                quality: variant.quality,
                size: format!("{:.2}", variant.simulated_size_mb),
                download_url: variant.download_url.clone(),
                checked: report.selected_quality == Some(variant.quality),
            })
            .collect();
        let selected = variants.iter().find(|variant| variant.checked).cloned();

        Self {
            id: &report.id,
            filename: report.filename.as_deref(),
            original_size: report.original_size_mb.map(|size| format!("{:.2}", size)),
            threshold: report.threshold_mb.to_string(),
            needs_optimization: report.needs_optimization,
            no_action: report.original_size_mb.is_some() && !report.needs_optimization,
            variants,
            selected,
        }
    }
}

/// Renders the upload page and the per-session page.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("layout.html", LAYOUT)?;
        env.add_template("index.html", INDEX)?;
        env.add_template("session.html", SESSION)?;
        Ok(Self { env })
    }

    pub fn render_index(&self) -> Result<String> {
        let template = self.env.get_template("index.html")?;
        Ok(template.render(context! {})?)
    }

    pub fn render_session(&self, report: &SessionReport) -> Result<String> {
        let template = self.env.get_template("session.html")?;
        let page = SessionView::from_report(report);
        Ok(template.render(context! { page => page })?)
    }
}

//! Pre-built template cache.
//!
//! Every page under `pages/` is composed with the base layout and the whole
//! set of partials into its own [`Tera`] instance, keyed by the page's file
//! name (`home.html`). The cache is built once at startup; any parse error or
//! a missing base layout aborts the build, so the process never serves from a
//! half-built cache. Afterwards it is read-only and shared without locking.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tera::{Context, Tera, Value};
use walkdir::WalkDir;

use crate::error::Error;
use crate::models::{Snippet, User};

const BASE: &str = "base.html";

/// Everything a page template may reference.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: String,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub user: Option<User>,
    pub form: Value,
}

impl TemplateData {
    /// Attaches a form, with its validation errors, for re-rendering.
    pub fn with_form(mut self, form: &impl Serialize) -> Result<Self, Error> {
        self.form = serde_json::to_value(form)?;
        Ok(self)
    }
}

/// Page name → composed, ready-to-render template set.
pub struct TemplateCache {
    pages: HashMap<String, Tera>,
}

impl TemplateCache {
    /// Builds the cache from `root` (`base.html`, `partials/*.html`,
    /// `pages/*.html`).
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref();
        let base = fs::read_to_string(root.join(BASE))?;
        let partials = html_files(&root.join("partials"))?
            .into_iter()
            .map(|(name, source)| (format!("partials/{name}"), source))
            .collect::<Vec<_>>();

        let mut pages = HashMap::new();
        for (name, source) in html_files(&root.join("pages"))? {
            let mut tera = Tera::default();
            tera.register_filter("human_date", human_date_filter);
            tera.register_function("human_date", human_date_function);

            let mut templates = Vec::with_capacity(partials.len() + 2);
            templates.push((BASE.to_owned(), base.clone()));
            templates.extend(partials.iter().cloned());
            templates.push((name.clone(), source));
            tera.add_raw_templates(templates)?;

            pages.insert(name, tera);
        }
        Ok(Self { pages })
    }

    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    /// Renders `page` to a complete string. A name outside the build set is
    /// [`Error::TemplateNotFound`], a server error rather than a 404.
    pub fn render(&self, page: &str, data: &TemplateData) -> Result<String, Error> {
        let tera = self.pages
            .get(page)
            .ok_or_else(|| Error::TemplateNotFound(page.to_owned()))?;
        let context = Context::from_serialize(data)?;
        Ok(tera.render(page, &context)?)
    }
}

/// `(file name, contents)` of every `*.html` directly inside `dir`.
fn html_files(dir: &Path) -> Result<Vec<(String, String)>, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push((name, fs::read_to_string(path)?));
    }
    Ok(files)
}

/// `17 Mar 2024 at 10:15`, always in UTC.
pub fn human_date<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    t.with_timezone(&Utc).format("%d %b %Y at %H:%M").to_string()
}

fn human_date_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    human_date_value(value)
}

/// `{{ human_date(t=snippet.created) }}`
fn human_date_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    human_date_value(args.get("t").unwrap_or(&Value::Null))
}

fn human_date_value(value: &Value) -> tera::Result<Value> {
    match value {
        Value::Null => Ok(Value::String(String::new())),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Value::String(human_date(&t)))
            .map_err(|e| tera::Error::msg(format!("human_date: `{s}` is not a timestamp: {e}"))),
        other => Err(tera::Error::msg(format!("human_date: expected a timestamp, got {other}"))),
    }
}

use std::fmt::Write as _;

use axum::response::Html;
use chrono::{DateTime, Utc};
use minijinja::{Environment, HtmlEscape, Value};
use rust_embed::Embed;
use serde::Serialize;

use crate::billing::user::UserSession;

#[derive(Embed)]
#[folder = "templates/"]
struct TemplateAssets;

/// Name and privilege of the signed-in caller, for the page chrome.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub admin: bool,
    pub name: String,
    pub logout_url: String,
}

/// Wrapper every template is rendered with.
#[derive(Debug, Serialize)]
pub struct Page<'a, T: Serialize> {
    pub title: &'a str,
    pub path: &'a str,
    pub user: Option<UserInfo>,
    pub session: Option<&'a UserSession>,
    pub content: T,
}

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn load() -> Self {
        let mut env = Environment::new();
        env.set_loader(|name| {
            Ok(TemplateAssets::get(name)
                .map(|file| String::from_utf8_lossy(&file.data).into_owned()))
        });
        env.add_filter("money", money);
        env.add_filter("date", date);
        env.add_filter("time", time);
        env.add_function("sidebar_link", sidebar_link);
        Self { env }
    }

    pub fn render<T: Serialize>(
        &self,
        name: &str,
        page: &Page<'_, T>,
    ) -> Result<Html<String>, minijinja::Error> {
        let tmpl = self.env.get_template(name)?;
        Ok(Html(tmpl.render(page)?))
    }
}

/// Minor currency units as `units.cents`.
fn money(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn date(value: Option<String>) -> String {
    parse_timestamp(value.as_deref())
        .map(|dt| dt.format("%m/%d/%y").to_string())
        .unwrap_or_default()
}

fn time(value: Option<String>) -> String {
    parse_timestamp(value.as_deref())
        .map(|dt| dt.format("%m/%d/%y %I:%M:%S%P").to_string())
        .unwrap_or_default()
}

/// Sidebar `<li>`, marked active when `path` is the page being viewed.
fn sidebar_link(path: &str, name: &str, current_path: &str, count: Option<i64>) -> Value {
    let class = if path == current_path {
        " class=\"active\""
    } else {
        ""
    };
    let mut html = format!(
        "<li{class}><a href=\"{}\"> {}",
        HtmlEscape(path),
        HtmlEscape(name)
    );
    if let Some(n) = count {
        let _ = write!(html, " ({n})");
    }
    html.push_str(" </a></li>");
    Value::from_safe_string(html)
}

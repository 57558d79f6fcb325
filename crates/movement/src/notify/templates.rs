//! Named HTML email templates with `{{path}}` (escaped) and `{{{path}}}` (raw) placeholders.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::info;

pub const APPLICATION_CONFIRMATION: &str = "application-confirmation";
pub const WELCOME: &str = "welcome-email";
pub const RECOVERY: &str = "recovery-email";
pub const MEMBER_UPDATE_CONFIRMATION: &str = "member-update-confirmation";
pub const CUSTOM: &str = "custom-email";

const BUILT_IN: &[(&str, &str)] = &[
    (
        APPLICATION_CONFIRMATION,
        include_str!("../../templates/application-confirmation.html"),
    ),
    (WELCOME, include_str!("../../templates/welcome-email.html")),
    (RECOVERY, include_str!("../../templates/recovery-email.html")),
    (
        MEMBER_UPDATE_CONFIRMATION,
        include_str!("../../templates/member-update-confirmation.html"),
    ),
    (CUSTOM, include_str!("../../templates/custom-email.html")),
];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("email template '{0}' is not registered")]
    Unknown(String),
    #[error("email template '{name}' has an unclosed placeholder")]
    Unclosed { name: String },
    #[error("failed to load email templates: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, String>,
}

impl TemplateRegistry {
    /// Registry holding every template the workflows send.
    pub fn with_defaults() -> Self {
        let templates = BUILT_IN
            .iter()
            .map(|(name, source)| (name.to_string(), source.to_string()))
            .collect();
        Self { templates }
    }

    /// Overrides or extends the registry with every `*.html` file in `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            self.templates.insert(name.to_string(), source);
            loaded += 1;
        }
        info!(dir = %dir.display(), loaded, "email templates loaded");
        Ok(loaded)
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.templates
            .iter()
            .map(|(name, source)| (name.clone(), source.clone()))
            .collect()
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        render_source(source, data).ok_or_else(|| TemplateError::Unclosed {
            name: name.to_string(),
        })
    }
}

fn render_source(source: &str, data: &Value) -> Option<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let (raw, open, close) = if after.starts_with("{{{") {
            (true, 3, "}}}")
        } else {
            (false, 2, "}}")
        };
        let end = after[open..].find(close)?;
        let path = after[open..open + end].trim();
        let value = lookup(data, path).map(display_value).unwrap_or_default();
        if raw {
            out.push_str(&value);
        } else {
            out.push_str(&escape_html(&value));
        }
        rest = &after[open + end + close.len()..];
    }
    out.push_str(rest);
    Some(out)
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_escaped_raw_and_nested_values() {
        let mut registry = TemplateRegistry::default();
        registry.insert(
            "probe",
            "<p>Hi {{ name }}, id {{application.id}}</p>{{{html}}}{{missing}}",
        );
        let rendered = registry
            .render(
                "probe",
                &json!({
                    "name": "Ada <Lovelace>",
                    "application": { "id": 42 },
                    "html": "<b>bold</b>",
                }),
            )
            .expect("template renders");
        assert_eq!(
            rendered,
            "<p>Hi Ada &lt;Lovelace&gt;, id 42</p><b>bold</b>"
        );
    }

    #[test]
    fn unknown_and_unclosed_templates_fail() {
        let mut registry = TemplateRegistry::with_defaults();
        assert!(matches!(
            registry.render("nope", &json!({})),
            Err(TemplateError::Unknown(_))
        ));
        registry.insert("broken", "Hello {{name");
        assert!(matches!(
            registry.render("broken", &json!({ "name": "x" })),
            Err(TemplateError::Unclosed { .. })
        ));
    }

    #[test]
    fn defaults_cover_every_workflow_template() {
        let registry = TemplateRegistry::with_defaults();
        for name in [
            APPLICATION_CONFIRMATION,
            WELCOME,
            RECOVERY,
            MEMBER_UPDATE_CONFIRMATION,
            CUSTOM,
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
        let html = registry
            .render(RECOVERY, &json!({ "recoveryLink": "https://x.test/update?token=t" }))
            .expect("renders");
        assert!(html.contains("https://x.test/update?token=t"));
    }
}

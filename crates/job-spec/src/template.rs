use serde_json::Value;

use crate::answers::Answers;

/// Answer key naming the template to render.
pub const TEMPLATE_KEY: &str = "template";
/// Answer key, usually seeded from the application config, naming the fallback template.
pub const DEFAULT_TEMPLATE_KEY: &str = "default_template";
pub const FALLBACK_TEMPLATE: &str = "job_template.hbs";

/// Pick the output template: an explicit choice, then the `template` answer,
/// then `default_template`, then [`FALLBACK_TEMPLATE`]. Empty values count as absent.
pub fn select_template(explicit: Option<&str>, answers: &Answers) -> String {
    explicit
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| named(answers, TEMPLATE_KEY))
        .or_else(|| named(answers, DEFAULT_TEMPLATE_KEY))
        .unwrap_or_else(|| FALLBACK_TEMPLATE.to_string())
}

fn named(answers: &Answers, key: &str) -> Option<String> {
    match answers.get(key) {
        Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> Answers {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn explicit_template_wins() {
        let data = answers(json!({ "template": "a.hbs", "default_template": "b.hbs" }));
        assert_eq!(select_template(Some("/tmp/x.hbs"), &data), "/tmp/x.hbs");
        assert_eq!(select_template(None, &data), "a.hbs");
    }

    #[test]
    fn falls_back_through_default_template() {
        let data = answers(json!({ "template": "", "default_template": "b.hbs" }));
        assert_eq!(select_template(Some(""), &data), "b.hbs");
        assert_eq!(select_template(None, &Answers::new()), FALLBACK_TEMPLATE);
    }
}

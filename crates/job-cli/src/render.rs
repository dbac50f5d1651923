use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use job_spec::Answers;
use serde_json::json;
use tracing::debug;

use crate::CliResult;
use crate::config::{AppDir, list_templates};

const STDOUT: &str = "-";

/// Render `template` with `{"data": answers}`.
///
/// An explicit template is a path of its own; otherwise the name is looked up
/// in the application's `templates/` directory. Sibling templates are
/// registered as partials.
pub fn render(app: &AppDir, template: &str, explicit: bool, answers: &Answers) -> CliResult<String> {
    let (dir, name) = if explicit {
        let path = Path::new(template);
        let name = path
            .file_name()
            .ok_or_else(|| format!("template path '{}' has no file name", template))?
            .to_string_lossy()
            .into_owned();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, name)
    } else {
        (app.template_dir(), template.to_string())
    };

    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    for partial in list_templates(&dir)? {
        if partial != name {
            let source = fs::read_to_string(dir.join(&partial))?;
            registry.register_partial(partial.trim_end_matches(".hbs"), source)?;
        }
    }

    let path = dir.join(&name);
    let source = fs::read_to_string(&path)
        .map_err(|err| format!("cannot read template {}: {}", path.display(), err))?;
    registry.register_template_string(&name, source)?;
    debug!(template = %path.display(), "rendering");
    Ok(registry.render(&name, &json!({ "data": answers }))?)
}

/// Write rendered output to `target`, or stdout when it is `-`.
pub fn write_output(target: &Path, rendered: &str) -> CliResult<()> {
    if target.as_os_str() == STDOUT {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(target, rendered)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn answers(value: Value) -> Answers {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn renders_from_app_templates_without_escaping() {
        let dir = tempdir().expect("tempdir");
        let templates = dir.path().join("templates");
        fs::create_dir_all(&templates).expect("mkdir");
        fs::write(
            templates.join("job.hbs"),
            "#SBATCH -J {{data.jobname}}\n{{> header}}",
        )
        .expect("write");
        fs::write(templates.join("header.hbs"), "mem={{data.memory}}").expect("write");
        let app = AppDir {
            name: "simple".into(),
            path: dir.path().to_path_buf(),
        };

        let output = render(
            &app,
            "job.hbs",
            false,
            &answers(json!({ "jobname": "a&b", "memory": 10 })),
        )
        .expect("render");
        assert_eq!(output, "#SBATCH -J a&b\nmem=10");
    }

    #[test]
    fn explicit_template_is_a_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("custom.hbs");
        fs::write(&path, "{{data.jobname}}").expect("write");
        let app = AppDir {
            name: "simple".into(),
            path: dir.path().join("unused"),
        };
        let output = render(
            &app,
            &path.display().to_string(),
            true,
            &answers(json!({ "jobname": "x" })),
        )
        .expect("render");
        assert_eq!(output, "x");
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempdir().expect("tempdir");
        let app = AppDir {
            name: "simple".into(),
            path: dir.path().to_path_buf(),
        };
        let err = render(&app, "nope.hbs", false, &Answers::new()).expect_err("missing");
        assert!(err.to_string().contains("nope.hbs"));
    }
}

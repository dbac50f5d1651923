use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::Glob;
use job_spec::{Answers, ApplicationSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::CliResult;

pub const CONFIG_FILE: &str = "jobbergate.yaml";
pub const PATH_ENV: &str = "JOBBERGATE_PATH";
const DEFAULT_APPS_DIR: &str = "./apps";
const DEFINITION_FILES: [&str; 3] = ["views.yaml", "views.yml", "views.json"];
const TEMPLATE_PATTERN: &str = "*.hbs";

/// Global configuration read from `jobbergate.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub apps: AppsConfig,
    /// Everything else in the file; handed to templates as `jobbergateconfig`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsConfig {
    #[serde(default = "default_apps_path")]
    pub path: PathBuf,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            path: default_apps_path(),
        }
    }
}

fn default_apps_path() -> PathBuf {
    PathBuf::from(DEFAULT_APPS_DIR)
}

impl Config {
    /// Load from `$JOBBERGATE_PATH`, falling back to the working directory.
    pub fn load() -> CliResult<Self> {
        let dir = env::var_os(PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./"));
        Self::load_from(&dir)
    }

    pub fn load_from(dir: &Path) -> CliResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&raw)?;
        debug!(path = %path.display(), apps = %config.apps.path.display(), "loaded config");
        Ok(config)
    }

    pub fn to_value(&self) -> CliResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Application directories under the apps path, sorted by name.
    pub fn apps(&self) -> CliResult<Vec<AppDir>> {
        let entries = match fs::read_dir(&self.apps.path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut apps = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let app = AppDir {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
            };
            if app.definition_path().is_some() {
                apps.push(app);
            } else {
                debug!(dir = %app.path.display(), "skipping directory without definition");
            }
        }
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    pub fn find_app(&self, name: &str) -> CliResult<AppDir> {
        self.apps()?
            .into_iter()
            .find(|app| app.name == name)
            .ok_or_else(|| {
                format!(
                    "application '{}' not found in {}",
                    name,
                    self.apps.path.display()
                )
                .into()
            })
    }

    /// Answers every run starts from: the global config plus the app's `config.yaml`.
    pub fn seed(&self, app: &AppDir) -> CliResult<Answers> {
        let mut seed = Answers::new();
        seed.insert("jobbergateconfig".into(), self.to_value()?);
        job_spec::merge(&mut seed, app.config_data()?);
        Ok(seed)
    }
}

/// One application directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDir {
    pub name: String,
    pub path: PathBuf,
}

impl AppDir {
    pub fn definition_path(&self) -> Option<PathBuf> {
        DEFINITION_FILES
            .iter()
            .map(|file| self.path.join(file))
            .find(|path| path.is_file())
    }

    pub fn load_spec(&self) -> CliResult<ApplicationSpec> {
        let path = self
            .definition_path()
            .ok_or_else(|| format!("{} has no application definition", self.path.display()))?;
        let raw = fs::read_to_string(&path)?;
        let spec = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw)?
        } else {
            serde_yaml::from_str(&raw)?
        };
        Ok(spec)
    }

    pub fn config_data(&self) -> CliResult<Answers> {
        let raw = match fs::read_to_string(self.path.join("config.yaml")) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Answers::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Answers::new());
        }
        match serde_yaml::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Answers::new()),
            _ => Err(format!("{}/config.yaml must be a mapping", self.path.display()).into()),
        }
    }

    /// First line of the README, used as one-line help.
    pub fn summary(&self) -> Option<String> {
        let readme = fs::read_to_string(self.path.join("README")).ok()?;
        readme
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }

    /// Help text describing the accepted `--prefill` keys.
    pub fn parameters(&self) -> Option<String> {
        fs::read_to_string(self.path.join("parameters"))
            .ok()
            .map(|text| text.trim_end().to_string())
            .filter(|text| !text.is_empty())
    }

    pub fn template_dir(&self) -> PathBuf {
        self.path.join("templates")
    }

    /// Template file names, sorted.
    pub fn templates(&self) -> CliResult<Vec<String>> {
        list_templates(&self.template_dir())
    }
}

pub(crate) fn list_templates(dir: &Path) -> CliResult<Vec<String>> {
    let matcher = Glob::new(TEMPLATE_PATTERN)?.compile_matcher();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file() && matcher.is_match(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = Config::load_from(dir.path()).expect("config");
        assert_eq!(config.apps.path, PathBuf::from(DEFAULT_APPS_DIR));
        assert!(config.extra.is_empty());
    }

    #[test]
    fn config_keeps_extra_keys() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "apps:\n  path: /srv/apps\nsite: hpc-one\n",
        )
        .expect("write");
        let config = Config::load_from(dir.path()).expect("config");
        assert_eq!(config.apps.path, PathBuf::from("/srv/apps"));
        assert_eq!(config.extra["site"], "hpc-one");
        assert_eq!(config.to_value().expect("value")["apps"]["path"], "/srv/apps");
    }

    #[test]
    fn discovers_apps_with_definitions_only() {
        let dir = tempdir().expect("tempdir");
        let apps = dir.path().join("apps");
        fs::create_dir_all(apps.join("simple/templates")).expect("mkdir");
        fs::create_dir_all(apps.join("notes")).expect("mkdir");
        fs::write(apps.join("simple/views.yaml"), "id: simple\n").expect("write");
        fs::write(apps.join("simple/README"), "\nSimple job\nmore text\n").expect("write");
        fs::write(apps.join("simple/config.yaml"), "default_template: a.hbs\n").expect("write");
        fs::write(apps.join("simple/templates/a.hbs"), "").expect("write");
        fs::write(apps.join("simple/templates/notes.txt"), "").expect("write");

        let config = Config {
            apps: AppsConfig { path: apps },
            extra: Map::new(),
        };
        let found = config.apps().expect("apps");
        assert_eq!(found.len(), 1);
        let app = &found[0];
        assert_eq!(app.name, "simple");
        assert_eq!(app.summary().as_deref(), Some("Simple job"));
        assert_eq!(app.templates().expect("templates"), ["a.hbs"]);
        assert_eq!(app.load_spec().expect("spec").id, "simple");

        let seed = config.seed(app).expect("seed");
        assert_eq!(seed["default_template"], "a.hbs");
        assert!(seed["jobbergateconfig"].is_object());
        assert!(config.find_app("notes").is_err());
    }
}

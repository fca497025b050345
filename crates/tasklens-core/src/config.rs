use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

/// Flat key=value configuration loaded from the rc file, with overrides
/// applied on top. Unknown keys are kept; commands look up what they need.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(rcfile_override))]
    pub fn load(rcfile_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map.insert("data.location".to_string(), "~/.tasklens".to_string());
        cfg.map.insert("default.command".to_string(), "list".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());
        cfg.map.insert("user.id".to_string(), "1".to_string());
        cfg.map.insert("view.sort".to_string(), "priority".to_string());
        cfg.map.insert("view.show_completed".to_string(), "off".to_string());
        cfg.map.insert("focus.high".to_string(), "on".to_string());
        cfg.map.insert("focus.today".to_string(), "on".to_string());
        cfg.map.insert("focus.medium".to_string(), "off".to_string());
        cfg.map.insert("focus.duration".to_string(), "60".to_string());

        let rcfile = resolve_rcfile_path(rcfile_override)?;
        if let Some(path) = rcfile {
            info!(rcfile = %path.display(), "loading rc file");
            cfg.load_file(&path)?;
        } else {
            warn!("no rc file found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );

                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_rcfile_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var("TASKLENSRC") {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".tasklensrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".tasklens"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let raw = PathBuf::from(include);
    let expanded = expand_tilde(&raw);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Config, parse_bool, resolve_data_dir};

    fn config_from_file(contents: &str) -> Config {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("tasklensrc");
        fs::write(&rc, contents).expect("write rc");
        Config::load(Some(&rc)).expect("load config")
    }

    #[test]
    fn defaults_are_present_without_an_rc_file() {
        let cfg = config_from_file("");
        assert_eq!(cfg.get("default.command").as_deref(), Some("list"));
        assert_eq!(cfg.get_bool("focus.high"), Some(true));
        assert_eq!(cfg.get_bool("focus.medium"), Some(false));
        assert_eq!(cfg.get_u64("focus.duration"), Some(60));
    }

    #[test]
    fn rc_file_entries_override_defaults_and_ignore_comments() {
        let cfg = config_from_file(
            "# personal settings\nview.sort = due\nfocus.medium = on # include mediums\n",
        );
        assert_eq!(cfg.get("view.sort").as_deref(), Some("due"));
        assert_eq!(cfg.get_bool("focus.medium"), Some(true));
    }

    #[test]
    fn includes_pull_in_sibling_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extra = dir.path().join("extra.rc");
        fs::write(&extra, "view.show_completed = on\n").expect("write extra");
        let rc = dir.path().join("tasklensrc");
        fs::write(&rc, "include extra.rc\n").expect("write rc");

        let cfg = Config::load(Some(&rc)).expect("load config");
        assert_eq!(cfg.get_bool("view.show_completed"), Some(true));
        assert_eq!(cfg.loaded_files.len(), 2);
    }

    #[test]
    fn overrides_strip_the_rc_prefix() {
        let mut cfg = config_from_file("");
        cfg.apply_overrides(vec![("rc.color".to_string(), "off".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(false));
    }

    #[test]
    fn data_dir_comes_from_config_and_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested").join("data");
        let mut cfg = config_from_file("");
        cfg.apply_overrides(vec![(
            "data.location".to_string(),
            target.to_string_lossy().to_string(),
        )]);

        let resolved = resolve_data_dir(&cfg, None).expect("resolve");
        assert_eq!(resolved, target);
        assert!(resolved.exists());
    }

    #[test]
    fn bool_parsing_accepts_the_usual_spellings() {
        for yes in ["1", "y", "yes", "on", "true", " TRUE "] {
            assert!(parse_bool(yes), "{yes} should parse as true");
        }
        for no in ["0", "off", "false", "nope", ""] {
            assert!(!parse_bool(no), "{no} should parse as false");
        }
    }
}

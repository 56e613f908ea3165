use std::path::PathBuf;

use crate::ai::DEFAULT_INFERENCE_URL;

const DB_ENV: &str = "CAREER_ASSISTANT_DB";
const DB_FILE: &str = "career_assistant.db";
const INFERENCE_URL_ENV: &str = "HF_INFERENCE_URL";

/// Runtime settings resolved from flags, then environment, then defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub inference_url: String,
}

impl Config {
    pub fn load(db_flag: Option<PathBuf>) -> Self {
        Config {
            db_path: db_flag
                .or_else(|| std::env::var_os(DB_ENV).map(PathBuf::from))
                .unwrap_or_else(default_db_path),
            inference_url: std::env::var(INFERENCE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_INFERENCE_URL.to_string()),
        }
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "career-assistant") {
        proj_dirs.data_dir().join(DB_FILE)
    } else {
        PathBuf::from(DB_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Both variables are read by every load, so one test covers them to
    // keep parallel tests from seeing each other's values.
    #[test]
    fn test_environment_overrides() {
        let original_db = env::var_os(DB_ENV);
        let original_url = env::var_os(INFERENCE_URL_ENV);
        unsafe {
            env::set_var(DB_ENV, "/tmp/from-env.db");
            env::set_var(INFERENCE_URL_ENV, "http://localhost:8080/models");
        }

        let from_env = Config::load(None);
        let flagged = Config::load(Some(PathBuf::from("/tmp/from-flag.db")));

        unsafe {
            env::remove_var(DB_ENV);
            env::remove_var(INFERENCE_URL_ENV);
        }
        let defaults = Config::load(None);

        unsafe {
            if let Some(val) = original_db {
                env::set_var(DB_ENV, val);
            }
            if let Some(val) = original_url {
                env::set_var(INFERENCE_URL_ENV, val);
            }
        }

        assert_eq!(from_env.db_path, PathBuf::from("/tmp/from-env.db"));
        assert_eq!(from_env.inference_url, "http://localhost:8080/models");
        assert_eq!(flagged.db_path, PathBuf::from("/tmp/from-flag.db"));
        assert_eq!(defaults.db_path, default_db_path());
        assert_eq!(defaults.inference_url, DEFAULT_INFERENCE_URL);
    }

    #[test]
    fn test_flag_wins() {
        let config = Config::load(Some(PathBuf::from("/tmp/answers.db")));
        assert_eq!(config.db_path, PathBuf::from("/tmp/answers.db"));
    }

    #[test]
    fn test_default_path_names_db_file() {
        assert!(default_db_path().ends_with(DB_FILE));
    }
}

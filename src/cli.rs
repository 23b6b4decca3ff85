// src/cli.rs
//! Command-line arguments for the binary.

use clap::Parser;
use std::path::PathBuf;

use crate::config;

#[derive(Parser, Debug)]
#[command(name = "feedback-pulse")]
#[command(about = "Fetch reviews, analyze new ones and report the run")]
#[command(version)]
pub struct Args {
    /// Config file (TOML, or JSON by `.json` extension)
    #[arg(short, long, env = config::ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Flag, then env, then the default files.
    pub fn config_path(&self) -> PathBuf {
        config::resolve_path(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_long_and_equals_forms() {
        for argv in [
            vec!["feedback-pulse", "-c", "a.toml"],
            vec!["feedback-pulse", "--config", "a.toml"],
            vec!["feedback-pulse", "--config=a.toml"],
        ] {
            let args = Args::try_parse_from(argv).unwrap();
            assert_eq!(args.config, Some(PathBuf::from("a.toml")));
            assert_eq!(args.config_path(), PathBuf::from("a.toml"));
        }
    }

    #[test]
    fn unknown_flags_and_missing_values_are_rejected() {
        assert!(Args::try_parse_from(["feedback-pulse", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["feedback-pulse", "--config"]).is_err());
    }
}

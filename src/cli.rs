use std::{path::PathBuf, sync::OnceLock};

use clap::Parser;

/// Restart docker containers whose health check is failing.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a dotenv file loaded before reading the environment.
    /// Variables already set in the environment take precedence.
    #[arg(short, long)]
    pub env_file: Option<PathBuf>,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}

/// Load the dotenv file given on the command line, or `.env` in the
/// working directory when none was given.
///
/// Runs before the logger is initialised so `RUST_LOG` can come from the
/// file. The caller logs the result.
pub fn load_env_file() -> Result<PathBuf, dotenv::Error> {
    match &get_cli_args().env_file {
        Some(path) => dotenv::from_path(path).map(|_| path.clone()),
        None => dotenv::dotenv(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_flag() {
        let args = Args::parse_from(["autoheal", "--env-file", "/etc/autoheal.env"]);
        assert_eq!(args.env_file, Some(PathBuf::from("/etc/autoheal.env")));

        let args = Args::parse_from(["autoheal"]);
        assert!(args.env_file.is_none());
    }
}

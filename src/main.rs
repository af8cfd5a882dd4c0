mod cli;

use clap::Parser;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use cli::{Args, Command};

/// Load .env file
///
/// Loads environment variables from .env file in the working directory.
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Set up the Ctrl+C handler.
///
/// Cancels `cancel`, which ends the running command.
fn setup_ctrlc_handler(cancel: CancellationToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, cancelling...");
        cancel.cancel();
    })
}

fn run(command: Command, config_path: Option<&Path>, api_keys: &[String]) -> Result<(), String> {
    let studio = cli::build_studio(config_path, api_keys)?;

    let cancel = CancellationToken::new();
    if let Err(e) = setup_ctrlc_handler(cancel.clone()) {
        log::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(cli::run_cancellable(&studio, command, &cancel))
}

fn main() {
    // Load .env file before anything else
    load_env();

    let args = Args::parse();

    let result = match args.command {
        Command::Config { action } => cli::handle_config_action(action, args.config.as_deref()),
        command => run(command, args.config.as_deref(), &args.api_keys),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_env_var_accessible_after_dotenv() {
        std::env::set_var("STORYFORGE_TEST_DOTENV_EXISTING", "original");
        // Existing variables are not overridden
        let _ = dotenv::dotenv();
        assert_eq!(
            std::env::var("STORYFORGE_TEST_DOTENV_EXISTING").unwrap(),
            "original"
        );
        std::env::remove_var("STORYFORGE_TEST_DOTENV_EXISTING");
    }
}

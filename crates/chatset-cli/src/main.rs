use clap::Parser;

mod cli;
mod convert_cmd;
mod hub_cmd;

use chatset_config::{Config, ConfigLoader, ConvertConfig, HubConfig};
use chatset_util::{init_tracing, LogLevel};
use cli::*;
use convert_cmd::{run_convert, run_inspect, ConvertFlags};
use hub_cmd::{run_push, run_usage, PushFlags};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let current_dir = std::env::current_dir()?;
    let mut loader = ConfigLoader::new();
    let mut config = loader.load_all(&current_dir, cli.config.as_deref())?;
    config.merge(flag_overrides(&cli.command));

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config
            .log_level
            .as_deref()
            .map(LogLevel::parse)
            .unwrap_or_default()
    };
    let _log_guard = init_tracing(level, cli.log_file.as_deref())?;
    for path in loader.config_paths() {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Commands::Convert {
            system_role,
            dry_run,
            ..
        } => run_convert(
            &config.convert(),
            &ConvertFlags {
                system_role,
                dry_run,
            },
        )?,
        Commands::Inspect { input, .. } => run_inspect(&config.convert(), input.as_deref())?,
        Commands::Push {
            token, no_readme, ..
        } => run_push(&config.hub(), &PushFlags { token, no_readme }).await?,
        Commands::Usage { .. } => run_usage(&config.hub())?,
    }

    Ok(())
}

/// Flags that mirror config keys, as the top config layer. Switches that are
/// off stay unset so they do not mask a config value.
fn flag_overrides(command: &Commands) -> Config {
    let mut overlay = Config::default();
    match command {
        Commands::Convert {
            input,
            output,
            target,
            in_place,
            detect,
            alpaca_pick,
            fallback,
            strict,
            ..
        } => {
            overlay.convert = Some(ConvertConfig {
                target: target.map(Into::into),
                input: input.clone(),
                output: output.clone(),
                detect: detect.map(Into::into),
                roles: None,
                alpaca_pick: alpaca_pick.map(Into::into),
                fallback: fallback.map(Into::into),
                strict: strict.then_some(true),
                in_place: in_place.then_some(true),
            });
        }
        Commands::Inspect { detect, .. } => {
            overlay.convert = Some(ConvertConfig {
                detect: detect.map(Into::into),
                ..Default::default()
            });
        }
        Commands::Push {
            adapter_dir,
            repo_id,
            private,
            base_model,
            lora_rank,
            message,
            ..
        } => {
            overlay.hub = Some(HubConfig {
                adapter_dir: adapter_dir.clone(),
                repo_id: repo_id.clone(),
                private: private.then_some(true),
                base_model: base_model.clone(),
                lora_rank: *lora_rank,
                commit_message: message.clone(),
                ..Default::default()
            });
        }
        Commands::Usage {
            base_model,
            repo_id,
        } => {
            overlay.hub = Some(HubConfig {
                base_model: base_model.clone(),
                repo_id: repo_id.clone(),
                ..Default::default()
            });
        }
    }
    overlay
}

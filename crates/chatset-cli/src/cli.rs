use chatset_types::{AlpacaPick, DetectOrder, FallbackPolicy, TargetFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatset")]
#[command(about = "Chatset - normalize chat datasets and publish LoRA adapters", long_about = None)]
pub(crate) struct Cli {
    /// Extra config file, merged over global and project config.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub(crate) verbose: bool,
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    pub(crate) log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    #[command(about = "Convert a dataset to ShareGPT, Alpaca or OpenAI records")]
    Convert {
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        #[arg(short = 't', long)]
        target: Option<TargetArg>,
        /// Replace INPUT with the result, keeping INPUT.bak.
        #[arg(long = "in-place", default_value_t = false, conflicts_with = "output")]
        in_place: bool,
        #[arg(long)]
        detect: Option<DetectArg>,
        /// ShareGPT `from` value for OpenAI `system` messages.
        #[arg(long = "system-role", value_name = "ROLE")]
        system_role: Option<String>,
        #[arg(long = "alpaca-pick")]
        alpaca_pick: Option<PickArg>,
        #[arg(long)]
        fallback: Option<FallbackArg>,
        #[arg(long, default_value_t = false)]
        strict: bool,
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,
    },
    #[command(about = "Count record shapes in a dataset")]
    Inspect {
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
        #[arg(long)]
        detect: Option<DetectArg>,
    },
    #[command(about = "Upload a LoRA adapter folder to the hub")]
    Push {
        #[arg(long = "adapter-dir", value_name = "DIR")]
        adapter_dir: Option<PathBuf>,
        #[arg(long = "repo-id", value_name = "ID")]
        repo_id: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = false)]
        private: bool,
        #[arg(long = "base-model")]
        base_model: Option<String>,
        #[arg(long = "lora-rank")]
        lora_rank: Option<u32>,
        /// Upload the folder as is, without writing README.md.
        #[arg(long = "no-readme", default_value_t = false)]
        no_readme: bool,
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    #[command(about = "Print the Python snippet that loads the adapter")]
    Usage {
        #[arg(long = "base-model")]
        base_model: Option<String>,
        #[arg(long = "repo-id", value_name = "ID")]
        repo_id: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum TargetArg {
    Sharegpt,
    Alpaca,
    Openai,
}

impl From<TargetArg> for TargetFormat {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Sharegpt => TargetFormat::ShareGpt,
            TargetArg::Alpaca => TargetFormat::Alpaca,
            TargetArg::Openai => TargetFormat::OpenAi,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum DetectArg {
    ConversationsFirst,
    MessagesFirst,
}

impl From<DetectArg> for DetectOrder {
    fn from(value: DetectArg) -> Self {
        match value {
            DetectArg::ConversationsFirst => DetectOrder::ConversationsFirst,
            DetectArg::MessagesFirst => DetectOrder::MessagesFirst,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum PickArg {
    First,
    Last,
}

impl From<PickArg> for AlpacaPick {
    fn from(value: PickArg) -> Self {
        match value {
            PickArg::First => AlpacaPick::First,
            PickArg::Last => AlpacaPick::Last,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum FallbackArg {
    Error,
    Samples,
    Empty,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(value: FallbackArg) -> Self {
        match value {
            FallbackArg::Error => FallbackPolicy::Error,
            FallbackArg::Samples => FallbackPolicy::Samples,
            FallbackArg::Empty => FallbackPolicy::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_flags() {
        let cli = Cli::try_parse_from([
            "chatset",
            "-v",
            "convert",
            "data.json",
            "--target",
            "alpaca",
            "--detect",
            "messages-first",
            "--alpaca-pick",
            "last",
            "--fallback",
            "samples",
            "--system-role",
            "gpt",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Convert {
            input,
            target,
            detect,
            alpaca_pick,
            fallback,
            system_role,
            ..
        } = cli.command
        else {
            panic!("expected convert");
        };
        assert_eq!(input, Some(PathBuf::from("data.json")));
        assert_eq!(TargetFormat::from(target.unwrap()), TargetFormat::Alpaca);
        assert_eq!(DetectOrder::from(detect.unwrap()), DetectOrder::MessagesFirst);
        assert_eq!(AlpacaPick::from(alpaca_pick.unwrap()), AlpacaPick::Last);
        assert_eq!(FallbackPolicy::from(fallback.unwrap()), FallbackPolicy::Samples);
        assert_eq!(system_role.as_deref(), Some("gpt"));
    }

    #[test]
    fn in_place_conflicts_with_output() {
        let result = Cli::try_parse_from(["chatset", "convert", "--in-place", "-o", "x.json"]);
        assert!(result.is_err());
    }
}

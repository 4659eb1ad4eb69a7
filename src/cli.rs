use crate::config::{parse_mode, CliOverrides, Config};
use crate::digest_path::ColonPolicy;
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcdump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dump the files embedded in a MachineConfig")]
#[command(
    long_about = "mcdump reads a MachineConfig (or a bare Ignition config) and prints one of \
                  its embedded files, or writes all of them under a directory that mirrors \
                  their absolute paths."
)]
#[command(after_help = "EXAMPLES:\n  \
    mcdump dump 99-worker-ssh.json /etc/ssh/sshd_config\n  \
    mcdump dump rendered-worker.json --to-dir ./worker-files\n  \
    mcdump list rendered-worker.json\n  \
    oc get mc 00-worker -o json | mcdump dump - /etc/kubernetes/kubelet.conf")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file path
    #[arg(short, long, global = true, help = "Path to TOML settings file")]
    pub config: Option<PathBuf>,

    /// Output format for messages and summaries
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one file from a config, or write several under a directory
    Dump {
        /// MachineConfig or Ignition JSON file ('-' for stdin)
        input: PathBuf,

        /// Absolute paths of the files to dump
        files: Vec<String>,

        /// Write the files under this directory, mirroring their paths
        #[arg(long)]
        to_dir: Option<PathBuf>,

        /// With --to-dir, write only the listed files
        #[arg(long)]
        only_requested: bool,

        /// Permission mode for created directories (octal)
        #[arg(long, value_parser = parse_mode)]
        dir_mode: Option<u32>,

        /// Permission mode for written files (octal)
        #[arg(long, value_parser = parse_mode)]
        file_mode: Option<u32>,
    },

    /// List the paths of every file declared in a config
    List {
        /// MachineConfig or Ignition JSON file ('-' for stdin)
        input: PathBuf,
    },

    /// Map a content digest onto a filesystem path
    DigestPath {
        /// Content address, e.g. sha256:0123abcd
        address: String,

        /// Base directory
        #[arg(long)]
        root: PathBuf,

        /// Namespace directory under the root
        #[arg(long)]
        namespace: String,

        /// Whether ':' may appear in the resulting path
        #[arg(long, value_enum)]
        colon: Option<ColonPolicy>,
    },

    /// Write a sample settings file
    GenerateConfig {
        /// Destination (defaults to mcdump.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        match &self.command {
            Command::Dump {
                only_requested,
                dir_mode,
                file_mode,
                ..
            } => CliOverrides::new()
                .with_dir_mode(*dir_mode)
                .with_file_mode(*file_mode)
                .with_only_requested(*only_requested),
            Command::DigestPath { colon, .. } => CliOverrides::new().with_colon_policy(*colon),
            Command::List { .. } | Command::GenerateConfig { .. } => CliOverrides::new(),
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

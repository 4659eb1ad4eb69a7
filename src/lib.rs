pub mod cli;
pub mod config;
pub mod digest_path;
pub mod error;
pub mod extractor;
pub mod machineconfig;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config, ExtractConfig, PathConfig};
pub use error::{McDumpError, Result, UserFriendlyError};

// Core functionality re-exports
pub use digest_path::{build_digest_path, ColonPolicy, TargetFilesystem};
pub use extractor::{
    ConfigFileExtractor, DataUrl, DataUrlError, ExtractionMode, ExtractionOutcome,
    ExtractionProgress, ExtractionRequest,
};
pub use machineconfig::{ConfigParser, DeclaredFile, IgnitionParser, ParsedConfig};
pub use ui::{OutputFormatter, OutputMode};

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Main library interface for mcdump functionality
pub struct McDump {
    config: Config,
    parser: Box<dyn ConfigParser>,
    output_formatter: OutputFormatter,
}

impl McDump {
    /// Create a new McDump instance with the provided settings
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            parser: Box::new(IgnitionParser::new()),
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
        }
    }

    /// Swap the config parser, e.g. for a different config dialect
    pub fn with_parser<P: ConfigParser + 'static>(mut self, parser: P) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Create McDump instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = OutputMode::from(&cli_args.output_format);

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet))
    }

    /// Read and parse a config from a file, or stdin when the path is `-`
    pub fn load_machine_config(&self, input: &Path) -> Result<ParsedConfig> {
        let raw = read_input(input)?;
        self.output_formatter
            .debug(&format!("Read {} bytes from {}", raw.len(), input.display()));

        let parsed = self.parser.parse(&raw)?;
        self.output_formatter.debug(&format!(
            "Config declares {} files (ignition {})",
            parsed.files.len(),
            parsed.version.as_deref().unwrap_or("none")
        ));

        Ok(parsed)
    }

    /// Dump files from a config according to `request`.
    ///
    /// Single-file contents go to `sink` untouched; mirror mode reports each
    /// written file through the output formatter.
    pub fn dump_files(
        &self,
        parsed: &ParsedConfig,
        request: &ExtractionRequest,
        sink: &mut dyn Write,
    ) -> Result<ExtractionOutcome> {
        // Reject bad requests before any work happens.
        if let ExtractionMode::Mirror(dest_root) = request.mode()? {
            self.output_formatter.info(&format!("Writing files under {}", dest_root.display()));
        }

        let extractor = ConfigFileExtractor::new()
            .with_dir_mode(self.config.extract.dir_mode)
            .with_file_mode(self.config.extract.file_mode)
            .with_only_requested(self.config.extract.only_requested);

        let progress_callback = |progress: &ExtractionProgress| {
            if let Some(ref path) = progress.current_file {
                self.output_formatter.print_file_written(path);
            }
        };

        let outcome = extractor.extract(parsed, request, sink, Some(&progress_callback))?;

        match &outcome {
            ExtractionOutcome::Mirrored(progress) => {
                self.output_formatter.print_extraction_summary(progress);
            }
            ExtractionOutcome::NotFound { path } => {
                self.output_formatter
                    .warning(&format!("No file {} is declared in this config", path));
            }
            ExtractionOutcome::NoInlineContent { path } => {
                self.output_formatter
                    .warning(&format!("{} is declared without inline contents", path));
            }
            ExtractionOutcome::Emitted { matches, bytes, .. } => {
                self.output_formatter
                    .debug(&format!("Emitted {} bytes from {} declaration(s)", bytes, matches));
            }
        }

        Ok(outcome)
    }

    /// Declared paths of a config, in order
    pub fn list_files<'a>(&self, parsed: &'a ParsedConfig) -> Vec<&'a str> {
        parsed.list_paths()
    }

    /// Digest path using the configured colon policy
    pub fn digest_path<P: AsRef<Path>>(&self, address: &str, root: P, namespace: &str) -> PathBuf {
        build_digest_path(address, root, namespace, self.config.paths.colon_policy.target())
    }

    /// Generate sample settings file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    /// Get settings reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &McDumpError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    if input == Path::new("-") {
        std::io::stdin().read_to_end(&mut raw)?;
    } else {
        raw = std::fs::read(input).map_err(|e| McDumpError::Config {
            message: format!("Failed to read {}: {}", input.display(), e),
        })?;
    }
    Ok(raw)
}

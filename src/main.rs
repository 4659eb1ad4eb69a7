use clap::Parser;
use mcdump::{
    Cli, Command, ExtractionOutcome, ExtractionRequest, McDump, McDumpError, OutputFormatter,
    OutputMode,
};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    if let Command::GenerateConfig { path } = &cli.command {
        let formatter = OutputFormatter::new((&cli.output_format).into(), cli.verbose, cli.quiet);
        return handle_generate_config(path.as_deref(), &formatter);
    }

    let app = match McDump::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let result = match &cli.command {
        Command::Dump { input, files, to_dir, .. } => {
            handle_dump(&app, input, files, to_dir.clone())
        }
        Command::List { input } => handle_list(&app, input),
        Command::DigestPath { address, root, namespace, .. } => {
            let path = app.digest_path(address, root, namespace);
            app.output_formatter().print_digest_path(address, &path);
            Ok(0)
        }
        Command::GenerateConfig { .. } => Ok(0),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn handle_dump(
    app: &McDump,
    input: &Path,
    files: &[String],
    to_dir: Option<PathBuf>,
) -> mcdump::Result<i32> {
    let request = ExtractionRequest::new(files.iter().cloned(), to_dir);

    // Bad flag combinations fail before the input is even read.
    request.mode()?;

    let parsed = app.load_machine_config(input)?;

    let stdout = std::io::stdout();
    let mut sink = stdout.lock();
    let outcome = app.dump_files(&parsed, &request, &mut sink)?;

    Ok(match outcome {
        ExtractionOutcome::NotFound { .. } | ExtractionOutcome::NoInlineContent { .. } => 2,
        ExtractionOutcome::Emitted { .. } | ExtractionOutcome::Mirrored(_) => 0,
    })
}

fn handle_list(app: &McDump, input: &Path) -> mcdump::Result<i32> {
    let parsed = app.load_machine_config(input)?;
    app.output_formatter().print_path_list(&app.list_files(&parsed));
    Ok(0)
}

fn handle_generate_config(path: Option<&Path>, formatter: &OutputFormatter) -> i32 {
    let config_path = path.unwrap_or_else(|| Path::new("mcdump.toml"));

    match McDump::generate_sample_config(config_path) {
        Ok(()) => {
            formatter.success(&format!(
                "Generated sample settings file: {}",
                config_path.display()
            ));
            formatter.info(&format!(
                "Use it with: mcdump --config {} dump <machineconfig.json> --to-dir <dir>",
                config_path.display()
            ));
            0
        }
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &McDumpError) -> i32 {
    match error {
        McDumpError::Config { .. } | McDumpError::MissingDestination { .. } => 3,
        McDumpError::Parse { .. } => 4,
        McDumpError::Decode { .. } => 5,
        McDumpError::CreateDir { .. }
        | McDumpError::WriteFile { .. }
        | McDumpError::InvalidPath { .. } => 6,
        _ => 1,
    }
}

fn print_startup_error(error: &McDumpError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "mcdump=warn",
        1 => "mcdump=info",
        _ => "mcdump=debug",
    };

    // RUST_LOG takes precedence over -v
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

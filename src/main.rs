use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sheet_vlookup::io::excel_read::SheetPolicy;
use sheet_vlookup::{JoinConfig, Result, ToolError, config, pipeline, samples};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    match run(cli) {
        Ok(true) => {}
        // A failed lookup has already been logged by the pipeline.
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Run(args) => Ok(pipeline::run(&args.into_config()?)),
        Command::InitConfig(args) => {
            config::write_template(&args.path, args.force)?;
            info!(path = %args.path.display(), "configuration template written");
            Ok(true)
        }
        Command::Samples(args) => {
            let files = samples::create_sample_files(&args.dir)?;
            let config_path = args.dir.join("vlookup_config.json");
            files.config.to_json_file(&config_path)?;
            info!(
                config = %config_path.display(),
                "run `sheet-vlookup run --config` with this file to try the lookup"
            );
            Ok(true)
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Append master-sheet columns to a search sheet, VLOOKUP style."
)]
struct Cli {
    /// Enable debug logging when RUST_LOG is not set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join two sheets and write the result workbook.
    Run(RunArgs),
    /// Write an example JSON configuration file.
    InitConfig(InitConfigArgs),
    /// Create demo workbooks plus a matching configuration.
    Samples(SamplesArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// JSON configuration file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workbook holding the rows to enrich.
    #[arg(long)]
    search_file: Option<PathBuf>,

    /// Sheet of the search workbook.
    #[arg(long)]
    search_sheet: Option<String>,

    /// Workbook holding the lookup table.
    #[arg(long)]
    master_file: Option<PathBuf>,

    /// Sheet of the master workbook.
    #[arg(long)]
    master_sheet: Option<String>,

    /// Key column in the search sheet.
    #[arg(long)]
    search_col: Option<String>,

    /// Key column in the master sheet. Defaults to the search column.
    #[arg(long)]
    lookup_col: Option<String>,

    /// Master column to append. Repeat or separate with commas.
    #[arg(long = "return-col", value_delimiter = ',')]
    return_cols: Vec<String>,

    /// Write only the result sheet to this path instead of generating one next
    /// to the search file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fail instead of falling back to the first sheet.
    #[arg(long)]
    strict_sheets: bool,

    /// Skip the summary and source sample sheets.
    #[arg(long)]
    no_summary: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<JoinConfig> {
        let mut config = match &self.config {
            Some(path) => JoinConfig::from_json_file(path)?,
            None => JoinConfig::new(
                required(self.search_file.clone(), "--search-file")?,
                required(self.search_sheet.clone(), "--search-sheet")?,
                required(self.master_file.clone(), "--master-file")?,
                required(self.master_sheet.clone(), "--master-sheet")?,
                required(self.search_col.clone(), "--search-col")?,
                self.lookup_col
                    .clone()
                    .or_else(|| self.search_col.clone())
                    .unwrap_or_default(),
                Vec::new(),
            ),
        };

        if let Some(path) = self.search_file {
            config.excel1_path = path;
        }
        if let Some(sheet) = self.search_sheet {
            config.excel1_sheet = sheet;
        }
        if let Some(path) = self.master_file {
            config.excel2_path = path;
        }
        if let Some(sheet) = self.master_sheet {
            config.excel2_sheet = sheet;
        }
        if let Some(column) = self.search_col {
            config.search_col = column;
        }
        if let Some(column) = self.lookup_col {
            config.lookup_col = column;
        }
        if !self.return_cols.is_empty() {
            config.return_cols = self
                .return_cols
                .into_iter()
                .map(|column| column.trim().to_string())
                .collect();
        }
        if let Some(path) = self.output {
            config.auto_save_same_dir = false;
            config.output_path = Some(path);
        }
        if self.strict_sheets {
            config.sheet_policy = SheetPolicy::Strict;
        }
        if self.no_summary {
            config.include_summary = false;
        }

        Ok(config)
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| ToolError::InvalidConfig(format!("{flag} is required without --config")))
}

#[derive(clap::Args)]
struct InitConfigArgs {
    /// Where to write the template.
    #[arg(long, default_value = "vlookup_config.json")]
    path: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

#[derive(clap::Args)]
struct SamplesArgs {
    /// Directory receiving the sample workbooks.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

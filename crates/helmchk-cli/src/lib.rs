pub mod chart;
mod error;
pub mod logging;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, ValueEnum};
use helmchk_diff::{Exceptions, Report, diff};
use helmchk_ir::{ExtractorOptions, PathExtractor, ScopedPathExtractor};
use vfs::VfsPath;

pub use error::{CliError, CliResult};

const EXAMPLES: &str = "\
Examples:
  $ helm pull jetstack/cert-manager --untar
  $ helmchk ./cert-manager/
  value missing from values.yaml: .$.acmesolver.image.tag
  value missing from values.yaml: .$.automountServiceAccountToken
  ...

  # Learn what the allowed exceptions are
  $ helmchk ./my-chart/ > exceptions.txt

  # Run helmchk and ignore the exceptions
  $ helmchk ./my-chart/ --exceptions exceptions.txt";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "helmchk",
    version,
    about = "Verify that the Helm chart values.yaml and template variables are in sync",
    long_about = "helmchk extracts all the variables used in the templates of a Helm chart and \
                  compares them with the default values configured in the values.yaml file.",
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Path to the local Helm chart
    #[arg(value_name = "CHART_DIR")]
    pub chart_dir: PathBuf,

    /// Path to the values.yaml file, relative to the chart directory
    #[arg(long, default_value = "values.yaml")]
    pub values: PathBuf,

    /// Path to the templates directory, relative to the chart directory
    #[arg(long, default_value = "templates")]
    pub templates: PathBuf,

    /// Path to the file containing the list of exceptions
    #[arg(long)]
    pub exceptions: Option<PathBuf>,

    /// Also analyze the chart tests in templates/tests/
    #[arg(long)]
    pub include_tests: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<tracing::metadata::Level>,

    #[arg(long, value_enum)]
    pub log_format: Option<logging::LogFormat>,

    #[arg(long, value_enum, default_value_t = logging::ColorArg::Auto)]
    pub color: logging::ColorArg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One mismatch per line
    #[default]
    Text,
    /// A single JSON document
    Json,
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub chart_dir: VfsPath,
    /// Relative to `chart_dir`.
    pub values_file: String,
    /// Relative to `chart_dir`.
    pub templates_dir: String,
    pub exceptions: Option<VfsPath>,
    pub include_tests: bool,
    pub extractor: ExtractorOptions,
}

fn physical_file(path: &Path) -> CliResult<VfsPath> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(VfsPath::new(vfs::PhysicalFS::new(dir)).join(file_name)?)
}

impl Cli {
    /// Check the chart layout on disk and build the options for [`check`].
    ///
    /// # Errors
    ///
    /// Returns an error naming the first of the chart directory, values file
    /// and templates directory that does not exist.
    pub fn check_options(&self) -> CliResult<CheckOptions> {
        if !self.chart_dir.exists() {
            return Err(CliError::InvalidChartDir {
                path: self.chart_dir.clone(),
            });
        }
        let values_path = self.chart_dir.join(&self.values);
        if !values_path.is_file() {
            return Err(CliError::MissingValuesFile { path: values_path });
        }
        let templates_path = self.chart_dir.join(&self.templates);
        if !templates_path.is_dir() {
            return Err(CliError::MissingTemplatesDir {
                path: templates_path,
            });
        }

        let exceptions = self.exceptions.as_deref().map(physical_file).transpose()?;
        Ok(CheckOptions {
            chart_dir: VfsPath::new(vfs::PhysicalFS::new(&self.chart_dir)),
            values_file: self.values.to_string_lossy().to_string(),
            templates_dir: self.templates.to_string_lossy().to_string(),
            exceptions,
            include_tests: self.include_tests,
            extractor: ExtractorOptions::default(),
        })
    }
}

/// Compare the values document of a chart with the values its templates read.
///
/// # Errors
///
/// Returns an error if a file cannot be read, the values document or a
/// template cannot be parsed, or a template uses an undefined variable.
pub fn check(opts: &CheckOptions) -> CliResult<Report> {
    let values_path = opts.chart_dir.join(&opts.values_file)?;
    let values = helmchk_values::load_values_paths(&values_path)?;

    let templates_dir = opts.chart_dir.join(&opts.templates_dir)?;
    let templates = chart::load_template_set(&opts.chart_dir, &templates_dir, opts.include_tests)?;
    let extractor = ScopedPathExtractor::new(opts.extractor.clone());
    let template_paths = extractor.extract(&templates)?;

    let exceptions = match &opts.exceptions {
        Some(path) => Exceptions::load(path)?,
        None => Exceptions::new(),
    };

    tracing::info!(
        values = values.len(),
        templates = templates.len(),
        template_paths = template_paths.len(),
        exceptions = exceptions.len(),
        "comparing"
    );
    Ok(diff(&values, &template_paths, &exceptions))
}

/// Write `report` to `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report(report: &Report, format: OutputFormat, mut out: impl Write) -> CliResult<()> {
    match format {
        OutputFormat::Text => {
            for mismatch in &report.mismatches {
                writeln!(out, "{mismatch}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Run the CLI, printing the report to stdout.
///
/// # Errors
///
/// Returns [`CliError::NotInSync`] if there are unsuppressed mismatches, or
/// any error of [`Cli::check_options`] and [`check`].
pub fn run(cli: &Cli) -> CliResult<Report> {
    let opts = cli.check_options()?;
    let report = check(&opts)?;

    for exception in &report.unused_exceptions {
        tracing::warn!(%exception, "exception does not match any mismatch");
    }
    write_report(&report, cli.format, std::io::stdout().lock())?;

    if report.is_in_sync() {
        Ok(report)
    } else {
        Err(CliError::NotInSync)
    }
}

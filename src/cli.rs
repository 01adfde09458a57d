use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use openclean::config::OpencleanConfig;
use openclean::data::stream::{CsvFile, RowSource as _};
use openclean::data::{Table, Value, column_refs};
use openclean::operator::Profile;
use openclean::pipeline::executor::parse_delimiter;
use openclean::pipeline::{DataPipeline, PipelineSpec, run_pipeline, validate_pipeline};
use openclean::profiling::ColumnProfile;
use std::io::Write as _;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "openclean", version, about = "Profile, filter and clean CSV files")]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the first rows of a file
    Head {
        file: PathBuf,

        /// Number of rows (defaults to the configured head_rows)
        #[arg(short = 'n', long)]
        rows: Option<usize>,
    },
    /// Count the data rows of a file
    Count { file: PathBuf },
    /// Count distinct values of one or more columns
    Distinct {
        file: PathBuf,

        /// Columns to count; several columns count value combinations
        #[arg(short, long, required = true, num_args = 1..)]
        columns: Vec<String>,

        /// Only print the most frequent values
        #[arg(long)]
        top: Option<usize>,
    },
    /// Profile columns of a file
    Profile {
        file: PathBuf,

        /// Columns to profile (all when omitted)
        #[arg(short, long, num_args = 1..)]
        columns: Vec<String>,

        /// Print profiles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute a pipeline spec
    Run {
        spec: PathBuf,

        /// Input file (overrides input.path in the spec)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (overrides output.path in the spec)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a pipeline spec against the header of an input file
    Validate {
        spec: PathBuf,

        /// Input file (overrides input.path in the spec)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

pub fn run_command(command: Commands, config: &OpencleanConfig) -> Result<()> {
    match command {
        Commands::Head { file, rows } => {
            let table = pipeline(&file, config)?.head(rows.unwrap_or(config.head_rows))?;
            print_table(&table)
        }
        Commands::Count { file } => {
            let count = pipeline(&file, config)?.count()?;
            println!("{count}");
            Ok(())
        }
        Commands::Distinct { file, columns, top } => {
            let counts = pipeline(&file, config)?.distinct_columns(&columns)?;
            let ranked = counts.most_common(top.unwrap_or(counts.len()));
            let mut out = std::io::stdout().lock();
            for (value, count) in ranked {
                writeln!(out, "{count}\t{}", display_key(value))?;
            }
            Ok(())
        }
        Commands::Profile {
            file,
            columns,
            json,
        } => {
            let selected = (!columns.is_empty())
                .then(|| column_refs(&columns));
            let profiles = pipeline(&file, config)?
                .stream(&Profile::new(selected).with_top_k(config.profile_top_k))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                for profile in &profiles {
                    print_profile(profile);
                }
            }
            Ok(())
        }
        Commands::Run {
            spec,
            input,
            output,
        } => {
            let spec = PipelineSpec::from_file(&spec)?;
            let report = run_pipeline(&spec, input.as_deref(), output.as_deref())?;
            println!("{}", report.summary());
            Ok(())
        }
        Commands::Validate { spec, input } => handle_validate(&spec, input.as_deref()),
    }
}

fn handle_validate(spec_path: &Path, input: Option<&Path>) -> Result<()> {
    let spec = PipelineSpec::from_file(spec_path)?;
    let input = input
        .map(Path::to_path_buf)
        .or_else(|| spec.input.path.as_ref().map(PathBuf::from))
        .context("No input path specified (pass --input or set input.path in spec)")?;
    let schema = CsvFile::new(&input)
        .columns()
        .with_context(|| format!("Failed to read header of {}", input.display()))?;

    let errors = validate_pipeline(&spec, &schema)?;
    if errors.is_empty() {
        println!("✓ '{}' is valid ({} steps)", spec.name, spec.steps.len());
        return Ok(());
    }
    for error in &errors {
        println!("✗ {error}");
    }
    anyhow::bail!("{} validation error(s)", errors.len())
}

fn pipeline(file: &Path, config: &OpencleanConfig) -> Result<DataPipeline> {
    let mut source = CsvFile::new(file);
    if let Some(delimiter) = &config.csv_delimiter {
        source = source.with_delimiter(parse_delimiter(delimiter)?);
    }
    Ok(DataPipeline::new(source))
}

fn print_table(table: &Table) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(std::io::stdout().lock());
    writer.write_record(table.schema().iter())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::to_text))?;
    }
    writer.flush()?;
    Ok(())
}

fn display_key(value: &Value) -> String {
    match value {
        Value::List(values) => values
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join("\t"),
        other => other.to_text(),
    }
}

fn print_profile(profile: &ColumnProfile) {
    println!("{}", profile.column);
    println!(
        "  values: {} ({} empty, {:.1}%), distinct: {}",
        profile.total_count,
        profile.empty_count,
        profile.empty_pct(),
        profile.distinct_count
    );
    for (label, count) in profile.datatypes.iter() {
        match profile.min_max.get(label) {
            Some(range) => println!(
                "  {label}: {count} [{} .. {}]",
                range.minimum, range.maximum
            ),
            None => println!("  {label}: {count}"),
        }
    }
    let top: Vec<String> = profile
        .top_values
        .iter()
        .map(|(value, count)| format!("{value} ({count})"))
        .collect();
    if !top.is_empty() {
        println!("  top: {}", top.join(", "));
    }
}

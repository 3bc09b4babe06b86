use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use badger_cli::BadgerCli;
use badger_cli::OutputFormat;
use badger_core::AssemblyStatus;
use badger_core::BadgerConfig;
use badger_core::BadgerResult;
use badger_core::BatchOptions;
use badger_core::BatchReport;
use badger_core::CommandAssembler;
use badger_core::CommandConverter;
use badger_core::ExportFormat;
use badger_core::PageOutcome;
use badger_core::RowWarning;
use badger_core::Strategy;
use badger_core::run_batch;
use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Style;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

/// Render `text` in `style`, or plain when color is disabled.
fn paint(text: &str, style: Style) -> String {
	if USE_COLOR.load(Ordering::Relaxed) {
		text.style(style).to_string()
	} else {
		text.to_string()
	}
}

fn main() {
	let args = BadgerCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(&args, use_color);

	match run(&args) {
		Ok(report) => {
			print_report(&report, args.format);
			process::exit(i32::from(!report.is_ok()));
		}
		Err(e) => {
			let report: miette::Report = e.into();
			eprintln!("{report:?}");
			process::exit(2);
		}
	}
}

/// Logs go to stderr so the summary on stdout stays machine readable.
fn init_tracing(args: &BadgerCli, use_color: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.verbosity.as_filter()));

	tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_writer(std::io::stderr)
				.with_ansi(use_color)
				.with_target(false),
		)
		.try_init()
		.ok();
}

fn load_config(args: &BadgerCli) -> BadgerResult<BadgerConfig> {
	if let Some(path) = &args.config {
		return BadgerConfig::load_file(path);
	}

	let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
	Ok(BadgerConfig::load(&root)?.unwrap_or_default())
}

fn run(args: &BadgerCli) -> BadgerResult<BatchReport> {
	let mut config = load_config(args)?;
	if let Some(timeout) = args.timeout {
		config.timeout_secs = timeout;
	}

	let format = match args.export_type {
		Some(export_type) => ExportFormat::from(export_type),
		None => ExportFormat::from_path(&args.export_filename)?,
	};

	let options = BatchOptions {
		data_file: args.csv_in.clone(),
		col_mode: args.col_mode.map_or(config.col_mode, Into::into),
		templates: args.graphics_files.clone(),
		output: args.export_filename.clone(),
		format,
		dpi: args.export_dpi.unwrap_or(config.dpi),
		subst_mode: args.subst_mode.map_or(config.subst_mode, Into::into),
		strategy: if args.flat {
			Strategy::Flat
		} else {
			config.substitution
		},
	};

	let converter = CommandConverter::new(&config);
	let assembler = CommandAssembler::new(&config);
	run_batch(&options, &converter, &assembler)
}

fn print_report(report: &BatchReport, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			let output = serde_json::json!({
				"ok": report.is_ok(),
				"format": report.format,
				"rows": report.rows,
			});
			println!("{output}");
		}
		OutputFormat::Text => print_text_report(report),
	}
}

fn print_text_report(report: &BatchReport) {
	for row in &report.rows {
		let status = if row.is_ok() {
			paint("ok", Style::new().green())
		} else {
			paint("failed", Style::new().red())
		};
		println!("{status} row {}: {}", row.index + 1, row.output.display());

		for (page, outcome) in row.pages.iter().enumerate() {
			match outcome {
				PageOutcome::Skipped { reason } => {
					let label = paint("skipped", Style::new().yellow());
					println!("  page {}: {label} {reason}", page + 1);
				}
				PageOutcome::Failed { reason } => {
					let label = paint("failed", Style::new().red());
					println!("  page {}: {label} {reason}", page + 1);
				}
				PageOutcome::Written { .. }
				| PageOutcome::Converted { .. }
				| PageOutcome::Staged { .. } => {}
			}
		}

		match &row.assembly {
			Some(AssemblyStatus::Partial { missing, .. }) => {
				let missing: Vec<String> = missing.iter().map(|page| (page + 1).to_string()).collect();
				println!(
					"  {} merged without page(s) {}",
					paint("partial", Style::new().yellow()),
					missing.join(", ")
				);
			}
			Some(AssemblyStatus::Failed { reason }) => {
				println!("  {} {reason}", paint("merge failed:", Style::new().red()));
			}
			Some(AssemblyStatus::Empty) => {
				println!("  {} no page could be exported", paint("empty:", Style::new().red()));
			}
			Some(AssemblyStatus::Complete { .. }) | None => {}
		}

		for warning in &row.warnings {
			let label = paint("warning:", Style::new().yellow());
			println!("  {label} {}", describe_warning(warning));
		}
	}

	let failed = report.failed_rows().count();
	let summary = format!(
		"{} row(s) exported as {}, {failed} failed, {} warning(s).",
		report.rows.len() - failed,
		report.format,
		report.warning_count()
	);
	println!();
	println!("{}", paint(&summary, Style::new().bold()));
}

fn describe_warning(warning: &RowWarning) -> String {
	match warning {
		RowWarning::MissingValue { field } => format!("no value for key `{field}`"),
		RowWarning::NoReplacement { field } => format!("no replacement for key `{field}`"),
		RowWarning::UnresolvedToken { token } => {
			format!("unresolved placeholder `{token}` in export filename")
		}
		RowWarning::RaggedRow { expected, found } => {
			format!("record has {found} field(s), header has {expected}")
		}
		RowWarning::OutputCollision { path, first_row } => {
			format!(
				"`{}` was already written by row {}; row skipped",
				path.display(),
				first_row + 1
			)
		}
	}
}

use anyhow::Result;
use clap::Parser;
use costscope::cli::{Cli, OutputFormat};
use costscope::config::AnalysisConfig;
use costscope::csv_output::CsvOutput;
use costscope::filter::SymbolFilter;
use costscope::json_output::{JsonCaptureInfo, JsonOutput};
use costscope::pipeline::{self, Analysis, CaptureAnalysis};
use costscope::report::TextReport;
use costscope::tree::StructuralTree;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration file values overridden by command-line flags
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(project) = &args.project {
        config.project_root = Some(project.clone());
    }
    if let Some(top) = args.top {
        config.top = Some(top);
    }
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn print_output(args: &Cli, analysis: &Analysis, results: &[CaptureAnalysis]) -> Result<()> {
    let selection = analysis.selection();
    match args.format {
        OutputFormat::Text => {
            for (i, result) in results.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                let path = result.path.display().to_string();
                print!(
                    "{}",
                    TextReport {
                        path: &path,
                        capture: &result.capture,
                        report: &result.report,
                        selection,
                        node_costs: result.node_costs.as_deref(),
                    }
                );
            }
            let areas = analysis.measurement_areas(results);
            if !areas.is_empty() {
                println!();
                println!("measurement areas:");
                for area in areas {
                    println!(
                        "  {}: {} .. {}",
                        area.group,
                        area.start,
                        area.stop.as_deref().unwrap_or("(open)")
                    );
                }
            }
        }
        OutputFormat::Json => {
            let mut output = JsonOutput::new();
            for result in results {
                let path = result.path.display().to_string();
                output.add_capture(
                    JsonCaptureInfo::from_capture(&path, &result.capture),
                    &result.report,
                    &selection,
                    result.node_costs.clone(),
                );
            }
            for area in analysis.measurement_areas(results) {
                output.add_measurement_area(area);
            }
            println!("{}", output.to_json()?);
        }
        OutputFormat::Csv => {
            let mut output = CsvOutput::new();
            for result in results {
                output.add_report(&result.path.display().to_string(), &result.report, &selection);
            }
            print!("{}", output.to_csv());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;

    let filter = match &args.filter {
        Some(pattern) => SymbolFilter::from_pattern(pattern)?,
        None => SymbolFilter::all(),
    };

    let tree = match &args.tree {
        Some(path) => Some(StructuralTree::from_json_file(path)?),
        None => None,
    };

    let mut analysis = Analysis::new(config, filter, args.category.selection(), tree)?;

    let mut failures = 0;
    let mut results = Vec::new();
    for (path, decoded) in pipeline::decode_all(&args.captures)? {
        match decoded {
            Ok(capture) => results.push(analysis.analyze(&path, capture)),
            Err(e) => {
                eprintln!("costscope: {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    print_output(&args, &analysis, &results)?;

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

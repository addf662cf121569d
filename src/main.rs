use anyhow::{Context, Result};
use clap::Parser;
use phosphor::cli::{Cli, OutputFormat};
use phosphor::config::TraceConfig;
use phosphor::load::{run_load, LoadPlan, LoadReport};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(args: &Cli) -> Result<TraceConfig> {
    let config = match &args.config {
        Some(path) => TraceConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TraceConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn print_text_report(report: &LoadReport) {
    println!("=== Phosphor Load Report ===");
    println!("Expected frames:   {}", report.expected);
    println!("Appended frames:   {}", report.appended);
    println!("Unique frames:     {}", report.unique);
    println!("Failed appends:    {}", report.failed_appends);
    println!("Failed producers:  {}", report.failed_producers);
    let order = if report.ordered_per_producer {
        "preserved"
    } else {
        "VIOLATED"
    };
    println!("Producer order:    {}", order);
    println!(
        "Elapsed:           {:.3}ms",
        report.elapsed.as_secs_f64() * 1000.0
    );
    println!("─────────────────────────────────────────");
    for (frame_type, count) in &report.per_type {
        println!("{:<12} {}", frame_type, count);
    }
    println!("─────────────────────────────────────────");
    let verdict = if report.is_lossless() {
        "LOSSLESS"
    } else {
        "FRAMES LOST"
    };
    println!("Result: {}", verdict);
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.producers == 0 {
        anyhow::bail!("Invalid value for --producers: 0 (must be >= 1)");
    }

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let plan = LoadPlan {
        producers: args.producers,
        frames_per_producer: args.frames,
        trace_id: args.trace_id.clone(),
    };

    let report = run_load(&plan, &config);

    match args.format {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    report.verdict()?;

    Ok(())
}

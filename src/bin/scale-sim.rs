use scale_sim::bottleneck::BottleneckCatalog;
use scale_sim::cli::{self, resolve_jitter, CliCommand, ComputeArgs, FormatArg, RunArgs};
use scale_sim::config;
use scale_sim::error::Result;
use scale_sim::output::{self, Formatter, LiveObserver, SummaryFormatter};
use scale_sim::runtime;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = cli::parse_args()?;
    match cli.command {
        CliCommand::Run(args) => run_simulation(args),
        CliCommand::ShowConfig(args) => {
            let settings = config::build_settings(&args)?;
            print!("{}", output::format_settings(&settings));
            Ok(())
        }
        CliCommand::Compute(args) => compute(args),
        CliCommand::Bottlenecks(args) => {
            let catalog = config::load_catalog(args.config.as_deref())?;
            print!("{}", output::format_catalog(&catalog, args.users));
            Ok(())
        }
        CliCommand::Multipliers => {
            print!("{}", output::format_multipliers());
            Ok(())
        }
    }
}

fn run_simulation(args: RunArgs) -> Result<()> {
    let settings = config::build_settings(&args.sim)?;

    if args.realtime {
        let live = Box::new(LiveObserver::new(args.format));
        let report = runtime::run_interactive(&settings, live, false)?;
        match args.format {
            FormatArg::Json => println!("{}", output::report_event_line(&report)?),
            FormatArg::Human | FormatArg::Summary => {
                print!("{}", SummaryFormatter.write(&report)?);
            }
        }
        return Ok(());
    }

    let store_samples = args.format != FormatArg::Summary;
    let report = runtime::run_virtual(&settings, runtime::wall_clock_ms(), store_samples)?;
    print!("{}", output::formatter_for(args.format).write(&report)?);
    Ok(())
}

fn compute(args: ComputeArgs) -> Result<()> {
    let jitter = resolve_jitter(args.jitter, args.seed).unwrap_or_default();
    let report =
        runtime::compute_once(args.users, jitter, args.seed, &BottleneckCatalog::default())?;
    print!("{}", output::format_metrics_report(&report, args.format)?);
    Ok(())
}

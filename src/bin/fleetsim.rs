use clap::{App, Arg, ArgMatches};
use colored::*;
use fleetsim::simulation::SimulationReport;
use fleetsim::telemetry::{FileSink, NullSink, TelemetrySink};
use fleetsim::{SimError, Simulation, SimulationConfig};
use std::fs;
use tracing::{info, Level};

const DEFAULT_TELEMETRY_PATH: &str = "fleetsim_telemetry.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("fleetsim")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("✈️  eVTOL Fleet Simulator - shared charger arbitration with fault injection")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file; flags override its values")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("aircraft")
                .short("n")
                .long("aircraft")
                .value_name("COUNT")
                .help("Fleet size (at least one aircraft per company)")
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Fleet size must be a whole number".into()),
                }),
        )
        .arg(
            Arg::with_name("hours")
                .short("H")
                .long("hours")
                .value_name("HOURS")
                .help("Simulated horizon in hours")
                .takes_value(true)
                .validator(|v| match v.parse::<f64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Horizon must be a number".into()),
                }),
        )
        .arg(
            Arg::with_name("time-scale")
                .long("time-scale")
                .value_name("FACTOR")
                .help("Simulated milliseconds per wall millisecond")
                .takes_value(true)
                .validator(|v| match v.parse::<f64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Time scale must be a number".into()),
                }),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .value_name("SEED")
                .help("Random seed for a reproducible fleet and fault schedule")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Seed must be an unsigned integer".into()),
                }),
        )
        .arg(
            Arg::with_name("telemetry")
                .short("t")
                .long("telemetry")
                .value_name("FILE")
                .help("Telemetry output file (appended)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-telemetry")
                .long("no-telemetry")
                .help("Discard telemetry output")
                .conflicts_with("telemetry"),
        )
        .arg(
            Arg::with_name("summary-json")
                .long("summary-json")
                .value_name("FILE")
                .help("Also write the end-of-run report as JSON")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("fast")
                .long("fast")
                .help("Step the simulation deterministically instead of pacing it to the wall clock"),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Summary output format")
                .takes_value(true)
                .possible_values(&["table", "json"])
                .default_value("table"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let verbose = matches.is_present("verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config = build_config(&matches)?;
    let format = matches.value_of("format").unwrap_or("table");

    if verbose {
        println!("{}", "✈️  fleetsim - eVTOL Fleet Simulator".bright_blue().bold());
        println!(
            "{} {} aircraft, {} h, time scale {}",
            "Configuration:".dimmed(),
            config.fleet_size,
            config.horizon_hours,
            config.time_scale
        );
    }

    let sink = open_sink(&config, matches.is_present("no-telemetry"))?;
    let mut simulation = Simulation::new(config, sink)?;
    info!(seed = simulation.seed(), "seed selected");

    let report = if matches.is_present("fast") {
        let step_ms = simulation.config().intervals.charger_ms;
        simulation.run_stepped(step_ms)
    } else {
        simulation.run().await?
    };

    if let Some(path) = matches.value_of("summary-json") {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    Ok(())
}

fn build_config(matches: &ArgMatches) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => SimulationConfig::load_from_file(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(n) = matches.value_of("aircraft") {
        config.fleet_size = n.parse()?;
    }
    if let Some(hours) = matches.value_of("hours") {
        config.horizon_hours = hours.parse()?;
    }
    if let Some(scale) = matches.value_of("time-scale") {
        config.time_scale = scale.parse()?;
    }
    if let Some(seed) = matches.value_of("seed") {
        config.seed = Some(seed.parse()?);
    }
    if let Some(path) = matches.value_of("telemetry") {
        config.telemetry_path = Some(path.into());
    }

    config.validate()?;
    Ok(config)
}

fn open_sink(config: &SimulationConfig, discard: bool) -> Result<Box<dyn TelemetrySink>, SimError> {
    if discard {
        return Ok(Box::new(NullSink));
    }
    let path = config
        .telemetry_path
        .clone()
        .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.into());
    let sink = FileSink::open(&path)?;
    info!(path = %path.display(), "telemetry file opened");
    Ok(Box::new(sink))
}

fn print_report(report: &SimulationReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "┌────────────────────────────────────────────────────────────────────────────────────────────┐".bright_white());
    println!("{}", "│                                 ✈️  FLEET SIMULATION SUMMARY                                │".bright_blue().bold());
    println!("{}", "├────────────────────────────────────────────────────────────────────────────────────────────┤".bright_white());
    println!(
        "{}",
        "│ Company │ Aircraft │ Flights │ Avg flight h │ Avg miles │ Avg charge h │ Faults │ Pax-miles │".bright_white()
    );
    println!("{}", "├────────────────────────────────────────────────────────────────────────────────────────────┤".bright_white());

    for company in &summary.companies {
        let faults = if company.total_faults == 0 {
            format!("{:>6}", company.total_faults).green()
        } else {
            format!("{:>6}", company.total_faults).yellow()
        };
        println!(
            "│ {} │ {:>8} │ {:>7} │ {:>12.3} │ {:>9.1} │ {:>12.3} │ {} │ {:>9.0} │",
            format!("{:<7}", company.company.to_string()).bright_cyan(),
            company.aircraft,
            company.flights,
            company.avg_flight_time_hours,
            company.avg_distance_miles,
            company.avg_charge_time_hours,
            faults,
            company.passenger_miles,
        );
    }
    println!("{}", "└────────────────────────────────────────────────────────────────────────────────────────────┘".bright_white());

    println!("\n{}", "🔌 Chargers".bright_white().bold());
    for charger in &summary.chargers {
        println!(
            "  Charger {}: {} sessions, {:.2} h in use",
            charger.charger.to_string().bright_cyan(),
            charger.sessions,
            charger.cumulative_use_hours
        );
    }

    println!("\n{}", "📊 Statistics".bright_white().bold());
    println!("  Simulated time:   {:.2} h", summary.elapsed_hours);
    println!("  Seed:             {}", report.seed.to_string().bright_cyan());
    println!(
        "  Faults delivered: {} of {} scheduled",
        summary.faults_delivered.to_string().bright_yellow(),
        report.schedule.total_scheduled
    );
    println!(
        "  Charge requests:  {} queued, {} stale, peak depth {}",
        summary.queue.total_enqueued, summary.queue.stale_discarded, summary.queue.peak_depth
    );
    let telemetry = if report.telemetry.write_errors == 0 {
        format!("{} frames", report.telemetry.frames_written).green()
    } else {
        format!(
            "{} frames, {} write errors",
            report.telemetry.frames_written, report.telemetry.write_errors
        )
        .red()
    };
    println!("  Telemetry:        {}", telemetry);
}

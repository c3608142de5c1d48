//! SimSession CLI Entry Point
//!
//! Launches a workflow on the built-in engine, binds restraint modules,
//! runs until completion or cooperative stop, and reports the session.
//!
//! # Usage
//!
//! ```bash
//! # Run the MD node of a workflow
//! simsession simulation.yaml
//!
//! # Override step and thread counts
//! simsession simulation.yaml --steps 5000 --threads 4
//!
//! # Add a harmonic restraint that votes to stop once converged
//! simsession simulation.yaml --restraint pull:0:1:1.5:200:0.001
//!
//! # Write a JSON run report
//! simsession simulation.yaml --report run.json
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};

use simsession::restraint::{HarmonicRestraint, RestraintModule};
use simsession::workflow::MD_NODE_KEY;
use simsession::{load_workflow, Context, NodeSpecification, Status, Workflow};
use simsession::{APP_NAME, VERSION};

/// Default workflow file used when none is specified.
const DEFAULT_WORKFLOW: &str = "workflow.yaml";

/// A restraint requested on the command line.
#[derive(Debug, Clone, PartialEq)]
struct RestraintSpec {
    name: String,
    sites: [usize; 2],
    r0: f64,
    k: f64,
    tolerance: Option<f64>,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    workflow_path: String,
    steps: Option<u64>,
    threads: Option<usize>,
    restraints: Vec<RestraintSpec>,
    report_path: Option<String>,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow_path: DEFAULT_WORKFLOW.to_string(),
            steps: None,
            threads: None,
            restraints: Vec::new(),
            report_path: None,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Simulation Session Runner");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: simsession [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>       Path to workflow YAML file");
    println!();
    println!("Options:");
    println!("  --steps N             Override the number of steps");
    println!("  --threads N           Override the number of force worker threads");
    println!("  --restraint SPEC      Add a harmonic restraint (repeatable)");
    println!("                        SPEC = NAME:SITE1:SITE2:R0:K[:TOLERANCE]");
    println!("  --report PATH         Write a JSON run report");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  simsession simulation.yaml");
    println!("  simsession simulation.yaml --steps 5000 --threads 4");
    println!("  simsession simulation.yaml --restraint pull:0:1:1.5:200:0.001");
}

/// Parses a `NAME:SITE1:SITE2:R0:K[:TOLERANCE]` restraint description.
fn parse_restraint(raw: &str) -> Result<RestraintSpec, String> {
    let fields: Vec<&str> = raw.split(':').map(str::trim).collect();
    if fields.len() != 5 && fields.len() != 6 {
        return Err(format!(
            "Restraint '{}' must look like NAME:SITE1:SITE2:R0:K[:TOLERANCE]",
            raw
        ));
    }

    let name = fields[0].to_string();
    if name.is_empty() {
        return Err(format!("Restraint '{}' has an empty name", raw));
    }

    let site = |field: &str| {
        field
            .parse::<usize>()
            .map_err(|_| format!("Invalid site index '{}' in restraint '{}'", field, raw))
    };
    let number = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|_| format!("Invalid number '{}' in restraint '{}'", field, raw))
    };

    let sites = [site(fields[1])?, site(fields[2])?];
    if sites[0] == sites[1] {
        return Err(format!("Restraint '{}' must join two different sites", raw));
    }

    let r0 = number(fields[3])?;
    let k = number(fields[4])?;
    if r0 < 0.0 || k < 0.0 {
        return Err(format!(
            "Restraint '{}' needs a non-negative distance and spring constant",
            raw
        ));
    }

    let tolerance = fields.get(5).map(|field| number(*field)).transpose()?;

    Ok(RestraintSpec {
        name,
        sites,
        r0,
        k,
        tolerance,
    })
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--steps" => {
                i += 1;
                if i >= args.len() {
                    return Err("--steps requires a number argument".to_string());
                }
                config.steps = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid steps value: {}", args[i]))?,
                );
            }
            "--threads" => {
                i += 1;
                if i >= args.len() {
                    return Err("--threads requires a number argument".to_string());
                }
                let threads: usize = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid threads value: {}", args[i]))?;
                if threads == 0 {
                    return Err("--threads must be at least 1".to_string());
                }
                config.threads = Some(threads);
            }
            "--restraint" => {
                i += 1;
                if i >= args.len() {
                    return Err("--restraint requires a specification argument".to_string());
                }
                config.restraints.push(parse_restraint(&args[i])?);
            }
            "--report" => {
                i += 1;
                if i >= args.len() {
                    return Err("--report requires a path argument".to_string());
                }
                config.report_path = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.workflow_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Applies command-line overrides to the workflow's MD node.
///
/// Every other node is kept as loaded.
fn apply_overrides(workflow: Workflow, config: &Config) -> Result<Workflow, String> {
    if config.steps.is_none() && config.threads.is_none() {
        return Ok(workflow);
    }

    let node = workflow
        .get_node(MD_NODE_KEY)
        .ok_or_else(|| format!("Workflow has no '{}' node to run", MD_NODE_KEY))?;

    let mut descriptor = node.descriptor().clone();
    if let Some(steps) = config.steps {
        descriptor.steps = steps;
    }
    if let Some(threads) = config.threads {
        descriptor.threads = Some(threads);
    }

    let md = NodeSpecification::new(MD_NODE_KEY, descriptor).map_err(|e| e.to_string())?;
    let others = workflow.iter().filter(|node| node.key() != MD_NODE_KEY).cloned();
    Ok(Workflow::from_nodes(others.chain(std::iter::once(md))))
}

/// Main application entry point.
fn run() -> Result<Status, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    // Load workflow
    info!("Loading workflow: {}", config.workflow_path);
    let workflow = load_workflow(&config.workflow_path).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!(
            "Could not load workflow from '{}': {}",
            config.workflow_path, e
        )
    })?;
    let workflow = apply_overrides(workflow, &config)?;

    info!("Workflow loaded: {} node(s)", workflow.len());

    // Launch session
    let mut context = Context::default_context();
    let mut session = context
        .launch(&workflow)
        .ok_or("Could not launch a session for this workflow")?;

    // Bind restraints
    for spec in &config.restraints {
        let mut restraint = HarmonicRestraint::new(spec.sites, spec.r0, spec.k);
        if let Some(tolerance) = spec.tolerance {
            restraint = restraint.with_stop_tolerance(tolerance);
        }

        let output = format!("{}.converged_distance", spec.name);
        let name = spec.name.clone();
        session.outputs().on_double(output, move |distance| {
            info!("Restraint '{}' reached distance {:.6}", name, distance);
        });

        let module = RestraintModule::new(spec.name.clone(), Arc::new(restraint));
        if !session.set_restraint(Arc::new(module))?.is_success() {
            return Err(format!("Could not bind restraint '{}'", spec.name).into());
        }
    }

    if session.restraint_count() > 0
        && config.restraints.iter().all(|spec| spec.tolerance.is_none())
    {
        warn!("No restraint has a stop tolerance; the run will use every step");
    }

    // Execute
    let run_status = session.run()?;
    let steps = session.completed_steps().unwrap_or_default();
    let stopped = session
        .simulation_signals()
        .map_or(false, |signals| signals.stop_requested());

    let close_status = session.close().unwrap_or_default();

    println!("{}", session.timeline().summary());
    println!(
        "Completed {} step(s){}",
        steps,
        if stopped { " (stopped by consensus)" } else { "" }
    );

    if let Some(path) = &config.report_path {
        session.timeline().write_report(path)?;
        info!("Report written to {}", path);
    }

    Ok(Status::new(run_status.is_success() && close_status.is_success()))
}

fn main() -> ExitCode {
    match run() {
        Ok(status) if status.is_success() => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!();
            eprintln!("Error: simulation did not finish successfully");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

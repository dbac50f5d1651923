mod config;
mod prompt;
mod render;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use job_spec::{
    AnswerFile, ApplicationSpec, JobError, RunOptions, check, parse_prefill, run,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppDir, Config};
use prompt::TerminalPrompter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Generate job scripts by answering an application's questions",
    long_about = "Discovers applications under the configured apps directory, asks their questions and renders the answers into a job script template"
)]
struct Cli {
    /// Log resolution and workflow decisions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available applications.
    List,
    /// Show an application's workflows, templates and prefill parameters.
    Describe {
        /// Application directory name.
        app: String,
    },
    /// Ask the application's questions and render the job script.
    Run(RunArgs),
    /// Check an application definition for mistakes.
    Check {
        /// Application directory name.
        app: String,
    },
    /// Print the JSON Schema for application definitions.
    Schema,
}

#[derive(Args)]
struct RunArgs {
    /// Application directory name.
    app: String,
    /// Where to write the rendered script; `-` writes to stdout.
    #[arg(default_value = "-")]
    output: PathBuf,
    /// Template file to render instead of the application's choice.
    #[arg(long, short, value_name = "TEMPLATE")]
    template: Option<PathBuf>,
    /// JSON file with answers to use instead of asking.
    #[arg(long, short = 'a', value_name = "ANSWERFILE")]
    answerfile: Option<PathBuf>,
    /// Save the answers given in this run as JSON, usable with --answerfile.
    #[arg(long, short = 's', value_name = "SAVEANSWERS")]
    saveanswers: Option<PathBuf>,
    /// Use default answers where available instead of asking.
    #[arg(long, short = 'f')]
    fast: bool,
    /// Pre-fill an answer; may be repeated.
    #[arg(long, short = 'p', value_name = "KEY=VALUE")]
    prefill: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn dispatch(command: Command) -> CliResult<ExitCode> {
    let config = Config::load()?;
    match command {
        Command::List => list_apps(&config)?,
        Command::Describe { app } => describe_app(&config.find_app(&app)?)?,
        Command::Run(args) => run_app(&config, args)?,
        Command::Check { app } => return check_app(&config.find_app(&app)?),
        Command::Schema => {
            let schema = schemars::schema_for!(ApplicationSpec);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn list_apps(config: &Config) -> CliResult<()> {
    let apps = config.apps()?;
    if apps.is_empty() {
        eprintln!("No applications found in {}", config.apps.path.display());
        return Ok(());
    }
    let width = apps.iter().map(|app| app.name.len()).max().unwrap_or(0);
    for app in apps {
        match app.summary() {
            Some(summary) => println!("{:width$}  {}", app.name, summary, width = width),
            None => println!("{}", app.name),
        }
    }
    Ok(())
}

fn describe_app(app: &AppDir) -> CliResult<()> {
    let spec = app.load_spec()?;
    println!("{}", spec.display_title());
    if let Some(description) = &spec.description {
        println!("{}", description);
    }
    if let Some(summary) = app.summary() {
        println!("{}", summary);
    }
    if !spec.workflows.is_empty() {
        println!("\nWorkflows:");
        for workflow in &spec.workflows {
            match &workflow.description {
                Some(description) => println!("  {}: {}", workflow.name, description),
                None => println!("  {}", workflow.name),
            }
        }
    }
    if !spec.flows.is_empty() {
        println!("\nFlows:");
        for flow in &spec.flows {
            println!("  {}", flow.name);
        }
    }
    let templates = app.templates()?;
    if !templates.is_empty() {
        println!("\nTemplates:");
        for template in templates {
            println!("  {}", template);
        }
    }
    if let Some(parameters) = app.parameters() {
        println!("\nParameters (--prefill KEY=VALUE):\n{}", parameters);
    }
    Ok(())
}

fn check_app(app: &AppDir) -> CliResult<ExitCode> {
    let spec = app.load_spec()?;
    let report = check(&spec);
    if report.valid {
        println!("{}: ok", app.name);
        return Ok(ExitCode::SUCCESS);
    }
    for issue in &report.issues {
        match &issue.variable {
            Some(variable) => println!(
                "{} {}.{}: {} [{}]",
                app.name, issue.location, variable, issue.message, issue.code
            ),
            None => println!(
                "{} {}: {} [{}]",
                app.name, issue.location, issue.message, issue.code
            ),
        }
    }
    Ok(ExitCode::FAILURE)
}

fn run_app(config: &Config, args: RunArgs) -> CliResult<()> {
    let app = config.find_app(&args.app)?;
    let spec = app.load_spec()?;

    let answer_file = match &args.answerfile {
        Some(path) => AnswerFile::from_json_str(&fs::read_to_string(path)?)?,
        None => AnswerFile::default(),
    }
    .with_prefill(parse_prefill(&args.prefill)?);

    let template = args.template.as_ref().map(|path| path.display().to_string());
    let options = RunOptions {
        fast_forward: args.fast,
        answer_file,
        seed: config.seed(&app)?,
        template: template.clone(),
        ..RunOptions::default()
    };

    let stdin = io::stdin();
    let mut prompter = TerminalPrompter::new(stdin.lock(), io::stderr());
    let outcome = match run(&spec, options, &mut prompter) {
        Ok(outcome) => outcome,
        Err(JobError::Cancelled) => {
            eprintln!("Aborted.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let visited: Vec<&str> = outcome.stages.iter().map(|stage| stage.stage.name()).collect();
    info!(app = %app.name, stages = ?visited, template = %outcome.template, "answers complete");

    if let Some(path) = &args.saveanswers {
        fs::write(path, serde_json::to_string_pretty(&outcome.saved)?)?;
    }

    let rendered = render::render(&app, &outcome.template, template.is_some(), &outcome.answers)?;
    render::write_output(&args.output, &rendered)
}

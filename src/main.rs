use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jetkit::build_description::BuildDescription;
use jetkit::config::{self, Config};
use jetkit::launch;
use jetkit::process::{CancelToken, SystemRunner, signals};
use jetkit::provision::{self, ProvisionInput};

#[derive(Parser)]
#[command(name = "jetkit")]
#[command(about = "Provision a Jetson device and launch its web app")]
#[command(version)]
struct Cli {
    /// Config file (defaults to .jetkit.yaml in the work dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the toolkit checkout and build directory
    #[arg(short = 'C', long, global = true)]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the container toolkit and build the derived image
    Provision,
    /// Start the app container and open a browser at it
    Launch,
    /// Print the effective configuration
    Config,
    /// Print the generated build description
    Render,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            let code = e
                .downcast_ref::<jetkit::FlowError>()
                .map_or(1, jetkit::FlowError::exit_code);
            eprintln!("Error: {e:#}");
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let cfg = config::load(&work_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Provision => provision_cmd(cfg, work_dir),
        Commands::Launch => launch_cmd(&cfg),
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&cfg)?);
            Ok(())
        }
        Commands::Render => {
            print!("{}", BuildDescription::from_config(&cfg.image).render());
            Ok(())
        }
    }
}

fn provision_cmd(cfg: Config, work_dir: PathBuf) -> Result<()> {
    let cancel = CancelToken::new();
    signals::install(&cancel).context("failed to install signal handlers")?;

    let input = ProvisionInput {
        config: cfg,
        work_dir,
    };
    let report = provision::run_provision(&input, &SystemRunner, &cancel)?;

    println!("Provisioning complete.");
    print!("{}", report.summary());
    Ok(())
}

fn launch_cmd(cfg: &Config) -> Result<()> {
    let session = launch::run_launch(cfg, &SystemRunner)?;

    println!("App running from {} at {}", session.image, session.url);
    println!("Browser started (pid {}).", session.browser_pid);
    println!();
    println!("The app keeps running after this command exits. To stop it:");
    print!(
        "{}",
        launch::teardown_instructions(&cfg.engine, &session.image, session.app.pid())
    );
    Ok(())
}

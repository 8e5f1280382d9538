use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use slurm_topology::cli::{
    format_node_table, format_topology_summary, format_validation_report, load_topology,
    node_address_command, node_spec_command, resolve_command, write_artifacts, Cli, Commands,
    CommandResult, DefaultArtifact,
};
use slurm_topology::topology::{hostname_for_address, validate_topology};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(command: Commands) -> CommandResult<()> {
    match command {
        Commands::Resolve(args) => {
            let topology = resolve_command(&args).await?;
            write_artifacts(&topology, &args.output, DefaultArtifact::Config)?;
        }
        Commands::Render(args) => {
            let topology = load_topology(&args.config.config)?;
            write_artifacts(&topology, &args.output, DefaultArtifact::SlurmConfig)?;
        }
        Commands::NodeAddress(args) => {
            let topology = load_topology(&args.config.config)?;
            println!("{}", node_address_command(&topology, &args.node_name)?);
        }
        Commands::NodeSpec(args) => {
            let topology = load_topology(&args.config.config)?;
            let spec = node_spec_command(&topology, &args.node_name)?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Commands::Hostname { address } => {
            println!("{}", hostname_for_address(address));
        }
        Commands::Validate(args) => {
            let topology = load_topology(&args.config)?;
            let result = validate_topology(&topology);
            print!(
                "{}",
                format_validation_report(&result, &args.config.display().to_string())
            );
            if result.has_errors() {
                process::exit(1);
            }
        }
        Commands::Show(args) => {
            let topology = load_topology(&args.config.config)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&topology)?);
            } else {
                print!("{}", format_topology_summary(&topology));
                println!();
                print!("{}", format_node_table(&topology));
            }
        }
    }

    Ok(())
}

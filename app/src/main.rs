mod features;
mod services;

use std::path::PathBuf;
use std::process;

use attrdi::{Configuration, ServiceCollection, ServiceProvider};
use clap::{Parser, Subcommand};

use features::Features;
use services::{Customer, Greeter, Order, Repository};

#[derive(Parser)]
#[command(name = "app")]
#[command(about = "Attribute-driven registration demo", long_about = None)]
struct Cli {
    /// Directory holding appsettings and .env files
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Extra feature flags to activate (e.g. BETA, AUDIT)
    #[arg(long = "feature", short = 'f')]
    features: Vec<String>,

    /// Module filters to register from (exact path or `*`/`?` pattern)
    #[arg(long = "filter", default_value = "app")]
    filters: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Greet someone with every registered greeter
    Greet {
        /// Who to greet
        #[arg(default_value = "world")]
        name: String,

        /// Only use the greeter registered under this key
        #[arg(long)]
        key: Option<String>,
    },
    /// List rows from the repositories
    List,
    /// Print the registration graph as JSON
    Graph,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (configuration, environment) = Configuration::load(&cli.root)?;
    tracing::info!(%environment, "Starting");

    let provider = build(&configuration, &cli.features, &cli.filters)?;

    match cli.command {
        Commands::Greet { name, key } => {
            let greeters = match key.as_deref() {
                Some(key) => vec![provider.get_required_keyed::<dyn Greeter>(key)?],
                None => provider.get_all::<dyn Greeter>()?,
            };
            for greeter in greeters {
                println!("{}", greeter.greet(&name));
            }
        }
        Commands::List => {
            let orders = provider.get_required::<dyn Repository<Order>>()?.all();
            let customers = provider.get_required::<dyn Repository<Customer>>()?.all();
            println!("{}", serde_json::to_string_pretty(&orders)?);
            println!("{}", serde_json::to_string_pretty(&customers)?);
        }
        Commands::Graph => {
            println!("{}", serde_json::to_string_pretty(provider.graph())?);
        }
    }
    Ok(())
}

fn build(configuration: &Configuration, extra: &[String], filters: &[String]) -> attrdi::Result<ServiceProvider> {
    let filters: Vec<&str> = filters.iter().map(String::as_str).collect();
    let extra = extra
        .iter()
        .filter_map(|name| Features::from_name(&name.to_ascii_uppercase()))
        .fold(Features::empty(), |all, flag| all | flag);

    let summary = ServiceCollection::new().add_attribute_based_di(
        configuration,
        |options| {
            options.features_from_config::<Features>().add_feature(extra);
        },
        &filters,
    )?;

    tracing::info!(registrations = summary.services().len(), "Services registered");
    Ok(summary.build())
}

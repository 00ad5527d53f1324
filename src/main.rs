use anyhow::{anyhow, Result};
use caltopo_mission::app::{self, AppConfig};
use caltopo_mission::caltopo::{parse_coordinate, LonLat};
use caltopo_mission::server::MissionServer;
use clap::{Parser, Subcommand};
use tracing::{debug, trace};

/// Create CalTopo mission maps from a template
#[derive(Parser)]
#[command(name = "caltopo-mission")]
#[command(about = "Create CalTopo mission maps from a template", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default command)
    Serve {
        /// Address to listen on (overrides CALTOPO_MISSION_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Fetch the template map and report how many features it has
    CheckTemplate,
    /// Create a mission map directly from the command line
    Create {
        /// Mission title
        #[arg(long)]
        title: String,

        /// Last Known Point, e.g. "61.10478, -149.79553"
        #[arg(long)]
        lkp: Option<String>,

        /// Incident Command Post, same formats as --lkp
        #[arg(long)]
        icp: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = AppConfig::new(cli.verbose).merge_env_vars();

    app::initialize_app(&config);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Some(Commands::Serve { bind }) => run_serve(config.clone(), bind).await,
        Some(Commands::CheckTemplate) => run_check_template().await,
        Some(Commands::Create { title, lkp, icp }) => run_create(&title, lkp, icp).await,
        None => run_serve(config.clone(), None).await,
    };

    if let Err(e) = result {
        app::handle_fatal_error(e, config.verbose);
    }
}

async fn run_serve(config: AppConfig, bind: Option<String>) -> Result<()> {
    let config = match bind {
        Some(bind) => config.with_bind(bind),
        None => config,
    };
    debug!("Server configuration: {:?}", config);

    let state = app::build_state(&config)?;
    MissionServer::new(state, config.bind).start().await
}

async fn run_check_template() -> Result<()> {
    let composer = app::build_composer(reqwest::Client::new())?;
    let templates = composer.templates();

    match templates.template_map_id() {
        None => println!("No template map configured (CALTOPO_TEMPLATE_MAP_ID unset)"),
        Some(id) => {
            let state = templates.try_fetch().await?;
            println!("Template {} has {} features", id, state.len());
        }
    }
    Ok(())
}

async fn run_create(title: &str, lkp: Option<String>, icp: Option<String>) -> Result<()> {
    let lkp = parse_cli_coordinate("--lkp", lkp)?;
    let icp = parse_cli_coordinate("--icp", icp)?;

    let composer = app::build_composer(reqwest::Client::new())?;
    let result = composer.create_mission_map(title, lkp, icp).await?;

    println!("Map ID: {}", result.map_id);
    println!("URL: {}", result.map_url);
    Ok(())
}

fn parse_cli_coordinate(flag: &str, value: Option<String>) -> Result<Option<LonLat>> {
    value
        .map(|text| {
            parse_coordinate(&text)
                .map(|p| p.to_lon_lat())
                .ok_or_else(|| anyhow!("{flag}: not a recognised coordinate: {text}"))
        })
        .transpose()
}

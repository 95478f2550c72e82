use azure_net_provision::api::{self, AppState};
use azure_net_provision::azure::{auth, AzureResourceClient};
use azure_net_provision::config::Config;
use azure_net_provision::models::{Envelope, Provisioned, ResourceIdentity};
use azure_net_provision::reconcile::{ResourceGroupReconciler, VirtualNetworkReconciler};
use azure_net_provision::tracking;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::error::Error;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "azure-net-provision", version, about = "Provision Azure resource groups and virtual networks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a resource group exists.
    CheckRg {
        resource_group: String,
        location: String,
    },
    /// Create a resource group and wait for it to converge.
    CreateRg {
        resource_group: String,
        location: String,
    },
    /// Check whether a virtual network exists.
    CheckVnet {
        resource_group: String,
        location: String,
        vnet_name: String,
    },
    /// Create a virtual network and wait for it to converge.
    CreateVnet {
        resource_group: String,
        location: String,
        vnet_name: String,
    },
    /// Run the HTTP surface.
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default()).expect("Error initializing log4rs");
    dotenv::dotenv().ok();
    log::info!("#Start main()");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = AzureResourceClient::new(&config, auth::default_credential());

    match cli.command {
        Command::CheckRg {
            resource_group,
            location,
        } => {
            let identity = ResourceIdentity::group(&config.subscription_id, &resource_group, &location);
            let reconciler = ResourceGroupReconciler::new(
                &client,
                identity,
                config.create_poll,
                tracking::new_tracking_id(),
            );
            print_envelope(&reconciler.check().await)?;
        }
        Command::CreateRg {
            resource_group,
            location,
        } => {
            let identity = ResourceIdentity::group(&config.subscription_id, &resource_group, &location);
            let reconciler = ResourceGroupReconciler::new(
                &client,
                identity,
                config.create_poll,
                tracking::new_tracking_id(),
            );
            print_envelope(&reconciler.create().await)?;
        }
        Command::CheckVnet {
            resource_group,
            location,
            vnet_name,
        } => {
            let identity = ResourceIdentity::virtual_network(
                &config.subscription_id,
                &resource_group,
                &vnet_name,
                &location,
            );
            let reconciler = VirtualNetworkReconciler::new(
                &client,
                identity,
                config.create_poll,
                tracking::new_tracking_id(),
            );
            print_envelope(&reconciler.check().await)?;
        }
        Command::CreateVnet {
            resource_group,
            location,
            vnet_name,
        } => {
            let identity = ResourceIdentity::virtual_network(
                &config.subscription_id,
                &resource_group,
                &vnet_name,
                &location,
            );
            let reconciler = VirtualNetworkReconciler::new(
                &client,
                identity,
                config.create_poll,
                tracking::new_tracking_id(),
            );
            print_envelope(&reconciler.create().await)?;
        }
        Command::Serve { port } => {
            let state = Arc::new(AppState { client, config });
            api::serve(state, port).await?;
        }
    }

    Ok(())
}

fn print_envelope(envelope: &Envelope) -> Result<(), Box<dyn Error>> {
    let verdict = match envelope.is_provisioned {
        Provisioned::Yes => "Yes".green(),
        Provisioned::No => "No".yellow(),
        Provisioned::Unknown => "Unknown".red(),
    };
    eprintln!("{name}: provisioned={verdict}", name = envelope.name);
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

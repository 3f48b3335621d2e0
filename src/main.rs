/// aks - Azure Kubernetes Service command line client
///
/// Manage AKS clusters and query VM sizes, locations and Kubernetes versions
/// using a service principal.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use aks_client::azure::aks::MANAGED_CLUSTERS_RESOURCE_TYPE;
use aks_client::config::AksConfig;

#[derive(Parser)]
#[command(name = "aks")]
#[command(about = "Manage Azure Kubernetes Service clusters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "aks.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Cluster selection, defaulting to the `cluster` section of the config
#[derive(Args)]
struct ClusterTarget {
    /// Resource group of the cluster
    #[arg(short, long)]
    resource_group: Option<String>,

    /// Cluster name
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init,

    /// List all managed clusters in the subscription
    List,

    /// Show a managed cluster
    Get {
        #[command(flatten)]
        target: ClusterTarget,
    },

    /// Create or update the configured cluster
    Create {
        /// Wait until provisioning finishes
        #[arg(long)]
        wait: bool,

        /// Wait timeout in seconds
        #[arg(long, default_value_t = 1800)]
        timeout: u64,
    },

    /// Delete a managed cluster
    Delete {
        #[command(flatten)]
        target: ClusterTarget,
    },

    /// Wait for a cluster to finish provisioning
    Wait {
        #[command(flatten)]
        target: ClusterTarget,

        /// Timeout in seconds
        #[arg(long, default_value_t = 1800)]
        timeout: u64,
    },

    /// Show the access profile of a cluster role
    AccessProfile {
        #[command(flatten)]
        target: ClusterTarget,

        /// Role name (clusterUser or clusterAdmin)
        #[arg(long, default_value = "clusterUser")]
        role: String,
    },

    /// Write the kubeconfig of a cluster role to a file
    Kubeconfig {
        #[command(flatten)]
        target: ClusterTarget,

        /// Role name (clusterUser or clusterAdmin)
        #[arg(long, default_value = "clusterUser")]
        role: String,

        /// Output file
        #[arg(short, long, default_value = "kubeconfig")]
        output: PathBuf,
    },

    /// List VM sizes available in a location
    VmSizes {
        /// Azure location, defaults to the configured cluster location
        #[arg(short, long)]
        location: Option<String>,
    },

    /// List locations available to the subscription
    Locations,

    /// List supported Kubernetes versions in a location
    Versions {
        /// Azure location, defaults to the configured cluster location
        #[arg(short, long)]
        location: Option<String>,

        /// Resource type to list versions for
        #[arg(long, default_value = MANAGED_CLUSTERS_RESOURCE_TYPE)]
        resource_type: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    let fmt_layer = match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("aks={0},aks_client={0}", log_level).into()),
        )
        .with(fmt_layer)
        .init();

    // Execute command
    let result = match &cli.command {
        Commands::Init => init_config(&cli).await,
        Commands::List => list_clusters(&cli).await,
        Commands::Get { target } => get_cluster(&cli, target).await,
        Commands::Create { wait, timeout } => create_cluster(&cli, *wait, *timeout).await,
        Commands::Delete { target } => delete_cluster(&cli, target).await,
        Commands::Wait { target, timeout } => wait_cluster(&cli, target, *timeout).await,
        Commands::AccessProfile { target, role } => show_access_profile(&cli, target, role).await,
        Commands::Kubeconfig {
            target,
            role,
            output,
        } => write_kubeconfig(&cli, target, role, output).await,
        Commands::VmSizes { location } => list_vm_sizes(&cli, location.as_deref()).await,
        Commands::Locations => list_locations(&cli).await,
        Commands::Versions {
            location,
            resource_type,
        } => list_versions(&cli, location.as_deref(), resource_type).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AksConfig> {
    AksConfig::from_file(&cli.config).context("Failed to load configuration")
}

/// Resolve resource group and cluster name from flags or config
fn resolve_target(config: &AksConfig, target: &ClusterTarget) -> Result<(String, String)> {
    let resource_group = match &target.resource_group {
        Some(rg) => rg.clone(),
        None => config.cluster()?.resource_group.clone(),
    };
    let name = match &target.name {
        Some(name) => name.clone(),
        None => config.cluster()?.name.clone(),
    };
    Ok((resource_group, name))
}

fn resolve_location(config: &AksConfig, location: Option<&str>) -> Result<String> {
    match location {
        Some(location) => Ok(location.to_string()),
        None => Ok(config
            .cluster()
            .context("Pass --location or configure a cluster")?
            .location
            .clone()),
    }
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let yaml = serde_yaml::to_string(&AksConfig::example())?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your requirements");
    info!("  2. Set your service principal credentials:");
    info!("     export AZURE_CLIENT_ID=... AZURE_CLIENT_SECRET=...");
    info!("     export AZURE_SUBSCRIPTION_ID=... AZURE_TENANT_ID=...");
    info!("  3. Create the cluster:");
    info!("     aks create --wait");

    Ok(())
}

/// List managed clusters
async fn list_clusters(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let client = config.client()?;

    let clusters = client.list().await.context("Failed to list clusters")?;
    if clusters.is_empty() {
        info!("No managed clusters found");
        return Ok(());
    }

    info!("Managed clusters:");
    for cluster in &clusters {
        info!(
            "  - {} (Location: {}, State: {}, Version: {})",
            cluster.name.as_deref().unwrap_or("N/A"),
            cluster.location,
            cluster.provisioning_state().unwrap_or("N/A"),
            cluster
                .properties
                .as_ref()
                .and_then(|p| p.kubernetes_version.as_deref())
                .unwrap_or("N/A")
        );
    }

    Ok(())
}

/// Show a managed cluster
async fn get_cluster(cli: &Cli, target: &ClusterTarget) -> Result<()> {
    let config = load_config(cli)?;
    let (resource_group, name) = resolve_target(&config, target)?;
    let client = config.client()?;

    let cluster = client
        .get(&resource_group, &name)
        .await
        .with_context(|| format!("Failed to get cluster {}", name))?;

    info!("{}", serde_json::to_string_pretty(&cluster)?);

    Ok(())
}

/// Create or update the configured cluster
async fn create_cluster(cli: &Cli, wait: bool, timeout: u64) -> Result<()> {
    info!("Starting cluster creation...");

    let config = load_config(cli)?;
    let request = config.cluster()?;
    let client = config.client()?;

    let response = client
        .create_cluster(request)
        .await
        .context("Failed to create cluster")?;

    info!(
        "Cluster {} accepted (status code {}, state {})",
        request.name,
        response.status_code,
        response.value.provisioning_state().unwrap_or("N/A")
    );

    if wait {
        let cluster = client
            .wait_for_provisioning(
                &request.resource_group,
                &request.name,
                Duration::from_secs(timeout),
                Duration::from_secs(15),
            )
            .await?;

        info!("✓ Cluster creation completed successfully!");
        if let Some(fqdn) = cluster.properties.as_ref().and_then(|p| p.fqdn.as_deref()) {
            info!("  API server: {}", fqdn);
        }
        info!("");
        info!("To access your cluster:");
        info!("  aks kubeconfig --output kubeconfig");
        info!("  export KUBECONFIG=kubeconfig");
    }

    Ok(())
}

/// Delete a managed cluster
async fn delete_cluster(cli: &Cli, target: &ClusterTarget) -> Result<()> {
    let config = load_config(cli)?;
    let (resource_group, name) = resolve_target(&config, target)?;
    let client = config.client()?;

    info!("Deleting cluster {} in {}...", name, resource_group);
    let status = client
        .delete(&resource_group, &name)
        .await
        .context("Failed to delete cluster")?;

    info!("✓ Delete request accepted (status code {})", status);

    Ok(())
}

/// Wait for provisioning to finish
async fn wait_cluster(cli: &Cli, target: &ClusterTarget, timeout: u64) -> Result<()> {
    let config = load_config(cli)?;
    let (resource_group, name) = resolve_target(&config, target)?;
    let client = config.client()?;

    client
        .wait_for_provisioning(
            &resource_group,
            &name,
            Duration::from_secs(timeout),
            Duration::from_secs(15),
        )
        .await?;

    Ok(())
}

/// Show the access profile of a cluster role
async fn show_access_profile(cli: &Cli, target: &ClusterTarget, role: &str) -> Result<()> {
    let config = load_config(cli)?;
    let (resource_group, name) = resolve_target(&config, target)?;
    let client = config.client()?;

    let profile = client
        .get_access_profiles(&resource_group, &name, role)
        .await
        .context("Failed to get access profile")?;

    info!("{}", serde_json::to_string_pretty(&profile)?);

    Ok(())
}

/// Write the kubeconfig of a cluster role
async fn write_kubeconfig(
    cli: &Cli,
    target: &ClusterTarget,
    role: &str,
    output: &Path,
) -> Result<()> {
    let config = load_config(cli)?;
    let (resource_group, name) = resolve_target(&config, target)?;
    let client = config.client()?;

    let kubeconfig = client
        .kubeconfig(&resource_group, &name, role)
        .await
        .context("Failed to get kubeconfig")?;

    tokio::fs::write(output, kubeconfig)
        .await
        .context("Failed to write kubeconfig")?;

    info!("Kubeconfig written to {}", output.display());

    Ok(())
}

/// List VM sizes in a location
async fn list_vm_sizes(cli: &Cli, location: Option<&str>) -> Result<()> {
    let config = load_config(cli)?;
    let location = resolve_location(&config, location)?;
    let client = config.client()?;

    let sizes = client
        .list_vm_sizes(&location)
        .await
        .context("Failed to list VM sizes")?;

    info!("VM sizes in {}:", location);
    for size in &sizes.value {
        info!(
            "  - {} ({} cores, {} MB memory, {} data disks)",
            size.name, size.number_of_cores, size.memory_in_mb, size.max_data_disk_count
        );
    }

    Ok(())
}

/// List locations
async fn list_locations(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let client = config.client()?;

    let locations = client
        .list_locations()
        .await
        .context("Failed to list locations")?;

    info!("Locations:");
    for location in &locations.value {
        info!("  - {} ({})", location.name, location.display_name);
    }

    Ok(())
}

/// List Kubernetes versions in a location
async fn list_versions(cli: &Cli, location: Option<&str>, resource_type: &str) -> Result<()> {
    let config = load_config(cli)?;
    let location = resolve_location(&config, location)?;
    let client = config.client()?;

    let versions = client
        .list_versions(&location, resource_type)
        .await
        .context("Failed to list Kubernetes versions")?;

    info!("Kubernetes versions in {}:", location);
    for profile in &versions.properties.orchestrators {
        let upgrades: Vec<&str> = profile
            .upgrades
            .iter()
            .map(|u| u.orchestrator_version.as_str())
            .collect();
        info!(
            "  - {}{} (upgrades: {})",
            profile.orchestrator_version,
            if profile.is_default { " [default]" } else { "" },
            if upgrades.is_empty() {
                "none".to_string()
            } else {
                upgrades.join(", ")
            }
        );
    }

    Ok(())
}

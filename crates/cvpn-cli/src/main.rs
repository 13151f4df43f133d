//! cvpn - client VPN certificate and profile provisioning
//!
//! Feeds lifecycle events to the provisioning orchestrators, wired to
//! in-memory backends, and prints the structured results.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cvpn_provisioner::{
    EndpointDescriptor, InMemoryBackends, LifecycleEvent, LifecycleKind, LifecycleResult,
    ProvisionerConfig, Protocol,
};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Endpoint id used by the `demo` command.
const DEMO_ENDPOINT_ID: &str = "cvpn-endpoint-demo";

#[derive(Parser)]
#[command(name = "cvpn")]
#[command(about = "Client VPN certificate authority and profile provisioning")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true, env = "CVPN_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the authority-issuance operation for one lifecycle event
    Authority {
        /// Event file, or `-` for stdin
        #[arg(long)]
        event: String,
    },

    /// Issue an authority and assemble a client profile back to back
    Demo {
        /// DNS name of the endpoint
        #[arg(long)]
        endpoint_dns: String,

        /// Endpoint port
        #[arg(long, default_value_t = 443)]
        port: u16,

        /// Transport protocol (tcp or udp)
        #[arg(long, default_value = "udp")]
        protocol: Protocol,

        /// Route all traffic through the tunnel
        #[arg(long)]
        full_tunnel: bool,

        /// Where to write the profile (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "cvpn.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env()
        .add_directive("cvpn=info".parse()?)
        .add_directive("cvpn_provisioner=info".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!cli.json_logs).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Authority { event } => {
            run_authority(&config, &event).await?;
        }

        Commands::Demo {
            endpoint_dns,
            port,
            protocol,
            full_tunnel,
            output,
        } => {
            run_demo(&config, &endpoint_dns, port, protocol, full_tunnel, output).await?;
        }

        Commands::InitConfig { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProvisionerConfig> {
    match path {
        Some(path) => {
            info!(config = %path.display(), "loading configuration");
            Ok(ProvisionerConfig::from_file(path)?)
        }
        None => Ok(ProvisionerConfig::default()),
    }
}

fn read_event(source: &str) -> anyhow::Result<LifecycleEvent> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read event file '{source}'"))?
    };

    serde_json::from_str(&content).context("invalid lifecycle event")
}

fn print_result<D: serde::Serialize>(result: &LifecycleResult<D>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

async fn run_authority(config: &ProvisionerConfig, source: &str) -> anyhow::Result<()> {
    let event = read_event(source)?;
    let backends = InMemoryBackends::new();

    let result = backends.authority(config).handle(event).await;
    print_result(&result)?;

    if !result.is_success() {
        bail!(
            "authority operation failed: {}",
            result.reason.as_deref().unwrap_or("Unknown error")
        );
    }
    Ok(())
}

fn demo_authority_event() -> LifecycleEvent {
    LifecycleEvent::new(
        LifecycleKind::Create,
        json!({
            "config": {
                "organizationName": "VPN Organization",
                "organizationalUnit": "IT Department",
                "country": "US",
                "state": "California",
                "city": "San Francisco",
                "keySize": 2048,
                "validityPeriodDays": 365
            }
        }),
    )
}

fn demo_profile_event(authority_id: &str, port: u16, protocol: Protocol, full_tunnel: bool) -> LifecycleEvent {
    LifecycleEvent::new(
        LifecycleKind::Create,
        json!({
            "endpointId": DEMO_ENDPOINT_ID,
            "authorityResourceId": authority_id,
            "config": {
                "clientCidr": "10.100.0.0/16",
                "serverPort": port,
                "protocol": protocol,
                "splitTunnel": !full_tunnel
            }
        }),
    )
}

async fn run_demo(
    config: &ProvisionerConfig,
    endpoint_dns: &str,
    port: u16,
    protocol: Protocol,
    full_tunnel: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let backends = InMemoryBackends::new();
    backends.endpoints.register(EndpointDescriptor::new(
        DEMO_ENDPOINT_ID,
        endpoint_dns,
        config.available_status.clone(),
    ));

    let issued = backends.authority(config).handle(demo_authority_event()).await;
    if !issued.is_success() {
        print_result(&issued)?;
        bail!("authority issuance failed");
    }
    info!(physical_id = %issued.physical_id, "authority issued");

    let assembled = backends
        .profile(config)
        .handle(demo_profile_event(&issued.physical_id, port, protocol, full_tunnel))
        .await;

    let Some(data) = assembled.data else {
        warn!(reason = ?assembled.reason, "profile assembly failed");
        bail!(
            "profile assembly failed: {}",
            assembled.reason.as_deref().unwrap_or("Unknown error")
        );
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &data.profile_text)
                .with_context(|| format!("failed to write profile to '{}'", path.display()))?;
            info!(
                path = %path.display(),
                secret = %data.profile_secret_ref,
                "profile written"
            );
        }
        None => println!("{}", data.profile_text),
    }

    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    ProvisionerConfig::default().save(output)?;

    println!("Config written to {}", output.display());
    println!();
    println!("Run a demo with:");
    println!("  cvpn --config {} demo --endpoint-dns vpn.example.com", output.display());

    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use azure_vm_provisioner::{
    api,
    azure::AzureCompute,
    config::{Cli, Settings},
    service::Provisioner,
};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Settings::try_from(Cli::parse()).context("load configuration")?;

    // One client serves as both catalog and gateway
    let compute = Arc::new(AzureCompute::from_settings(&settings)?);
    let provisioner = Arc::new(Provisioner::new(
        compute.clone(),
        compute,
        settings.provisioner_options(),
    ));

    let app = api::build_router(provisioner);
    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("bind {}", settings.listen))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %settings.listen,
        subscription = %settings.subscription_id,
        resource_group = %settings.resource_group,
        location = %settings.location,
        "azure-vm-provisioner listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve HTTP")?;

    Ok(())
}

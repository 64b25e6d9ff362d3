mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use rdc_bus::{InMemoryBus, JobQueue};
use rdc_config::ResourceDriverConfig;
use rdc_core::{DispatchMode, ExecutionMonitor, LifecycleMessaging, RequestQueueConsumer, ResourceDriverService};
use rdc_driver::{Handler, LocalHandler};
use rdc_workspace::DriverFilesWorkspace;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => serve().await,
    }
}

async fn serve() -> Result<()> {
    let config = ResourceDriverConfig::from_env().context("loading configuration")?;

    let bus = Arc::new(InMemoryBus::new());
    let workspace = Arc::new(
        DriverFilesWorkspace::new(config.scripts_workspace.clone())
            .context("preparing scripts workspace")?,
    );
    let handler: Arc<dyn Handler> = Arc::new(LocalHandler::new());

    let messaging = Arc::new(
        LifecycleMessaging::new(bus.clone(), config.completion_topic_name.clone())
            .context("configuring completion messaging")?,
    );
    let monitor_job_queue = Arc::new(JobQueue::new(bus.clone(), "lifecycle_execution_monitor"));
    let monitor = Arc::new(
        ExecutionMonitor::new(monitor_job_queue, handler.clone(), messaging.clone())
            .await
            .context("registering execution monitor")?,
    );

    let request_queue = if config.lifecycle_request_queue.enabled {
        Some(Arc::new(RequestQueueConsumer::new(
            bus.clone(),
            config.lifecycle_request_queue.topic_name.clone(),
            config.lifecycle_request_queue.failed_topic_name.clone(),
            workspace.clone(),
            handler.clone(),
            messaging.clone(),
            monitor.clone(),
        )))
    } else {
        None
    };

    let service = Arc::new(
        ResourceDriverService::new(
            DispatchMode {
                async_requests_enabled: config.lifecycle_request_queue.enabled,
                async_enabled: config.async_messaging_enabled,
            },
            workspace,
            handler,
            monitor.clone(),
            request_queue.clone(),
        )
        .context("assembling resource driver service")?,
    );

    let state = rdc_api::AppState {
        service,
        auth_token: config.auth_token.clone(),
    };
    let app = rdc_api::build_app(state);

    {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            if let Err(err) = monitor.run().await {
                tracing::error!(error = %err, "execution monitor loop exited");
            }
        });
    }
    if let Some(request_queue) = request_queue {
        tokio::spawn(async move {
            if let Err(err) = request_queue.run().await {
                tracing::error!(error = %err, "request queue consumer loop exited");
            }
        });
    }

    info!(addr = %config.bind_addr, "starting resource driver core");
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("binding HTTP listener")?;
    axum::serve(listener, app)
        .await
        .context("serving HTTP API")?;

    Ok(())
}

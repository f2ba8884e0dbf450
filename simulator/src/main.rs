use ac_simulator::backlog::BacklogStore;
use ac_simulator::client::DeviceApiClient;
use ac_simulator::config::Config;
use ac_simulator::dead_letter::DeadLetterSink;
use ac_simulator::device;
use ac_simulator::generator::{MeasurementGenerator, SystemClock};
use ac_simulator::prompt;
use ac_simulator::scheduler::Scheduler;
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting AC unit simulator");
    info!(
        "API: {}, backlog: {}, batch size: {}, interval: {}s",
        config.api_url,
        config.backlog_path.display(),
        config.batch_size,
        config.interval_secs
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let client = DeviceApiClient::new(config.client_config()).context("building HTTP client")?;

    // Register a single mocked device
    let device = device::mock_device(&mut rng, Utc::now(), &config.firmware_version);
    let registered = match client.register(&device).await {
        Ok(registered) => registered,
        Err(e) => {
            error!("Service offline, registration failed: {}", e);
            return Err(e).context("registering device");
        }
    };
    info!("Registered device {}", registered.serial_number);
    println!("{}", prompt::render_device(&registered)?);

    if !config.yes {
        let proceed = tokio::task::spawn_blocking(|| {
            prompt::confirm_start(std::io::stdin().lock(), std::io::stdout())
        })
        .await
        .context("waiting for start confirmation")??;

        if !proceed {
            info!("Metering not started");
            return Ok(());
        }
    }

    let generator = MeasurementGenerator::new(rng, SystemClock)
        .with_legacy_co_mirror(config.legacy_co_mirror);
    let mut scheduler = Scheduler::new(
        client,
        registered,
        generator,
        BacklogStore::new(&config.backlog_path),
        config.scheduler_config(),
    );
    if let Some(path) = &config.dead_letter_path {
        scheduler = scheduler.with_dead_letter(DeadLetterSink::new(path));
    }

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Shutting down");
    Ok(())
}

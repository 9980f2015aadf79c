// Air Watch server
// Usage: air_watch [config.json]

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use air_watch::core::{setup_logging, ConfigManager};
use air_watch::layer1::SyntheticSource;
use air_watch::layer2::{spawn_scheduler, Pipeline, TickEvent};
use air_watch::layer4::{create_router, serve, ApiState, BroadcastHub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1);
    let config = ConfigManager::new(config_path.as_deref())?;

    let monitoring = config.monitoring();
    setup_logging(Some(&monitoring.log_level), Some(monitoring.json_format));

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    let summary = config.get_summary();
    info!(
        entities = summary.entity_count,
        tick_interval_ms = summary.tick_interval_ms,
        window_size = summary.window_size,
        alert_tiers = summary.alert_tiers,
        bind_addr = %summary.bind_addr,
        "Starting Air Watch"
    );

    let pipeline_config = config.pipeline();
    let stream_config = config.stream();
    let server_config = config.server();

    let hub: BroadcastHub<Arc<TickEvent>> = BroadcastHub::new(stream_config.mailbox_capacity);
    let source = SyntheticSource::new(pipeline_config.valid_min, pipeline_config.valid_max);
    let period = Duration::from_millis(pipeline_config.tick_interval_ms);

    let pipeline = Pipeline::new(pipeline_config, config.entities(), Box::new(source), hub);
    let view = pipeline.view();
    let mut scheduler = spawn_scheduler(pipeline, period);

    let router = create_router(ApiState {
        view,
        heartbeat: Duration::from_millis(stream_config.heartbeat_interval_ms),
    });

    tokio::select! {
        result = serve(router, &server_config.bind_addr) => {
            scheduler.abort();
            result?;
            Ok(())
        }
        joined = &mut scheduler => {
            let reason = match joined {
                Ok(()) => "scheduler exited".to_string(),
                Err(e) => format!("scheduler task failed: {}", e),
            };
            error!(reason = %reason, "Pipeline stopped, shutting down");
            Err(reason.into())
        }
    }
}

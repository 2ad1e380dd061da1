use anyhow::{Context, Result};
use log::{error, info};
use securityspy::{SecuritySpyServer, ServerConfig};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

const POLL_INTERVAL_SECS: u64 = 10;

fn config_from_env() -> Result<ServerConfig> {
    let host = env::var("SECURITYSPY_HOST").context("SECURITYSPY_HOST is not set")?;
    let port = env::var("SECURITYSPY_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .context("SECURITYSPY_PORT is not a port number")?;
    let user = env::var("SECURITYSPY_USER").unwrap_or_default();
    let pass = env::var("SECURITYSPY_PASSWORD").unwrap_or_default();
    let use_tls = matches!(
        env::var("SECURITYSPY_TLS").as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    );

    Ok(ServerConfig::new(&host, port, &user, &pass, use_tls))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = config_from_env()?;
    info!("Connecting to SecuritySpy at {}:{}", config.host, config.port);

    let server = SecuritySpyServer::connect(&config)
        .await
        .context("Failed to load camera list")?;

    println!("{}", serde_json::to_string_pretty(&server.list_devices())?);

    let mut motion: HashMap<String, bool> = HashMap::new();
    let mut poll = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                break;
            }
            _ = poll.tick() => {
                if let Err(e) = server.update().await {
                    error!("Inventory refresh failed: {}", e);
                }
                if !server.is_event_listener_running().await {
                    info!("Event listener is down, restarting");
                    server.start_event_listener().await;
                }
                for camera in server.list_devices() {
                    let previous = motion.insert(camera.id.clone(), camera.motion_on);
                    if previous != Some(camera.motion_on) {
                        info!(
                            "{} ({}): motion {} [{}], recording {}",
                            camera.name,
                            camera.id,
                            if camera.motion_on { "on" } else { "off" },
                            camera
                                .motion_trigger_type
                                .map(|t| t.label())
                                .unwrap_or("-"),
                            camera.recording_mode
                        );
                    }
                }
            }
        }
    }

    server.stop_event_listener().await;
    Ok(())
}

//! Virtual call demo
//!
//! Runs one call against the virtual platform: connect, wait out the grace
//! period, mute and unmute, swap devices through the settings picker, pull
//! the microphone out, end.
//!
//! Usage: `virtual-call [config.json]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use media_session_core::{
    CallSession, CallSnapshot, CaptureError, MediaKind, SessionConfiguration, SessionDelegate,
    SessionSurfaces,
};
use media_session_virtual::{MeterDisplay, VirtualPlatform};

struct ConsoleDelegate;

impl SessionDelegate for ConsoleDelegate {
    fn on_state_changed(&self, snapshot: &CallSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => log::debug!("state: {}", json),
            Err(e) => log::warn!("Could not serialize snapshot: {}", e),
        }
    }

    fn on_device_error(&self, kind: MediaKind, error: &CaptureError) {
        log::warn!("{} degraded: {}", kind, error);
    }

    fn on_call_ended(&self) {
        log::info!("Call ended, leaving the call screen");
    }
}

fn load_config() -> Result<SessionConfiguration> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json =
                std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            Ok(SessionConfiguration::from_json(&json)?)
        }
        None => Ok(SessionConfiguration {
            grace_period_ms: 1000,
            ..SessionConfiguration::default()
        }),
    }
}

fn print_snapshot(label: &str, snapshot: &CallSnapshot) -> Result<()> {
    println!("{}: {}", label, serde_json::to_string_pretty(snapshot)?);
    if let Some(banner) = snapshot.banner {
        println!("banner: {}", banner.message());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let platform = VirtualPlatform::new();
    platform.set_open_delay(Duration::from_millis(40));

    println!("\n=== Virtual Devices ===");
    for device in media_session_virtual::default_devices() {
        println!("  {} [{}] {}", device.id, device.kind, device.label);
    }
    println!();

    let local = platform.surface("local");
    let meter = Arc::new(MeterDisplay::new());
    let session = CallSession::new(
        Arc::new(platform.clone()),
        config.clone(),
        SessionSurfaces {
            video: Some(local.clone()),
            level: Some(meter.clone()),
        },
        Some(Arc::new(ConsoleDelegate)),
    )?;

    print_snapshot("connecting", &session.connect().await)?;
    tokio::time::sleep(config.grace_period() + Duration::from_millis(200)).await;
    print_snapshot("active", &session.snapshot())?;

    if let Some(frame) = local.render() {
        println!("local video: frame {} {}x{}", frame.sequence, frame.width, frame.height);
    }
    println!("mic level:   [{}] {}", meter.bar(30), meter.color().to_hex());

    session.toggle_mute();
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("muted level: [{}]", meter.bar(30));
    session.toggle_mute();

    let picker_meter = Arc::new(MeterDisplay::new());
    let choices = session
        .open_settings(SessionSurfaces {
            video: Some(platform.surface("picker")),
            level: Some(picker_meter.clone()),
        })
        .await?;
    println!(
        "picker: {} cameras, {} microphones",
        choices.video_devices.len(),
        choices.audio_devices.len()
    );
    if let Some(settings) = session.settings() {
        settings.select_device(MediaKind::Video, "cam-b").await?;
        settings.select_device(MediaKind::Audio, "mic-b").await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("picker level: [{}]", picker_meter.bar(30));
    }
    let applied = session.confirm_settings().await?;
    log::info!("Applied {:?} / {:?}", applied.video, applied.audio);
    tokio::time::sleep(Duration::from_millis(200)).await;
    print_snapshot("switched", &session.snapshot())?;

    platform.unplug("mic-b");
    tokio::time::sleep(Duration::from_millis(400)).await;
    print_snapshot("microphone unplugged", &session.snapshot())?;

    session.end_call();
    println!(
        "ended: {:?}, live tracks: {}",
        session.state(),
        platform.live_track_count(None)
    );
    Ok(())
}

//! Headless Grove visitor
//!
//! Usage: `grove-visitor [url] [ticks]`. Connects to a relay, plants a
//! flower at a random spot and hums a synthetic tone at it until `ticks`
//! frames have passed.

use std::time::Duration;

use grove_client::{AudioSource, GardenClient, Permission, PipelineConfig, RelayLink, WaveformSource};
use grove_protocol::{Point, ServerEvent};
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";
const DEFAULT_TICKS: u64 = 3_000;
const FRAME: Duration = Duration::from_millis(16);
const ASSIGN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove_visitor=info,grove_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let ticks = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_TICKS);

    let mut link = RelayLink::connect(&url).await?;
    let config = PipelineConfig::default();
    let mut client = GardenClient::new(config.clone());

    tokio::time::timeout(ASSIGN_TIMEOUT, async {
        while !client.context().is_assigned() {
            match link.recv().await? {
                Some(event) => client.apply(event),
                None => return Err("relay closed before assigning an identity".into()),
            }
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })
    .await
    .map_err(|_| "timed out waiting for an identity")??;

    client.request_audio(Permission::Granted)?;
    let spot = {
        let mut rng = rand::thread_rng();
        Point::new(
            rng.gen_range(0.0..config.canvas_width),
            rng.gen_range(0.0..config.canvas_height),
        )
    };
    client.gesture(spot)?;

    let (mut tx, mut rx) = link.split();
    for event in client.drain_outbound() {
        tx.send(&event).await?;
    }

    let mut source = WaveformSource::new();
    let mut interval = tokio::time::interval(FRAME);
    let mut remote_marks = 0usize;

    while client.ticks() < ticks {
        tokio::select! {
            _ = interval.tick() => {
                let swell = (client.ticks() as f32 * 0.02).sin().abs();
                source.push_sine((swell * 40.0) as u8, 4.0);
                client.tick(source.current_level());
                for event in client.drain_outbound() {
                    tx.send(&event).await?;
                }
            }
            event = rx.recv() => match event? {
                Some(event) => {
                    if matches!(event, ServerEvent::PixelBroadcast(_)) {
                        remote_marks += 1;
                    }
                    client.apply(event);
                }
                None => {
                    warn!("Relay closed the connection");
                    break;
                }
            },
        }
    }

    let store = client.store();
    info!(
        session = client.session_id().unwrap_or_default(),
        ticks = client.ticks(),
        own_marks = client.context().budget.used(),
        remote_marks,
        avatars = store.all_avatars().len(),
        "Visit finished"
    );

    tx.close().await?;
    Ok(())
}

mod logging;
mod ui;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use accatalog::Catalog;
use acconfig::{Config, PlayerBackendKind, get_config};
use acplayer::{MediaBackend, PlaybackController, SimulatedBackend};
use anyhow::{Context, Result};
use crossbeam_channel::{select, unbounded};
use tracing::{info, warn};

use crate::ui::{Flow, Ui};

fn main() -> Result<()> {
    let config = get_config();
    logging::init_logging(&config);

    // ========== Catalog ==========
    let manifest = config.get_catalog_manifest()?;
    let catalog =
        Catalog::load(manifest.as_deref()).context("Cannot load the audiobook catalog")?;
    info!(books = catalog.len(), "📚 Catalog loaded");

    // ========== Player ==========
    let backend = build_backend(&config, &catalog)?;
    let poll_interval = Duration::from_millis(config.get_poll_interval_ms()?);
    let controller = PlaybackController::with_poll_interval(backend, poll_interval);
    info!(backend = controller.backend_name(), "✅ AudioCloud is ready");

    // ========== UI ==========
    run(&catalog, &controller)?;

    controller.dispose();
    Ok(())
}

fn build_backend(config: &Config, catalog: &Catalog) -> Result<Arc<dyn MediaBackend>> {
    match config.get_player_backend()? {
        PlayerBackendKind::Simulated => Ok(Arc::new(SimulatedBackend::new().with_catalog(catalog))),
        PlayerBackendKind::Rodio => rodio_backend(config),
    }
}

#[cfg(feature = "rodio")]
fn rodio_backend(config: &Config) -> Result<Arc<dyn MediaBackend>> {
    let media_dir = config.get_media_dir()?;
    let backend = acplayer::RodioBackend::new(media_dir).context("Cannot open audio output")?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "rodio"))]
fn rodio_backend(_config: &Config) -> Result<Arc<dyn MediaBackend>> {
    anyhow::bail!("player.backend is 'rodio' but AudioCloud was built without the 'rodio' feature")
}

/// Reads commands from stdin until `quit` or end of input.
fn run(catalog: &Catalog, controller: &PlaybackController) -> Result<()> {
    let (line_tx, line_rx) = unbounded::<String>();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Cannot read from stdin");
                        break;
                    }
                }
            }
        })
        .context("Cannot spawn the stdin reader")?;

    let playing = controller.is_playing().subscribe();
    let mut ui = Ui::new(catalog, controller, io::stdout().lock());
    ui.render()?;

    loop {
        select! {
            recv(line_rx) -> line => {
                let Ok(line) = line else {
                    // stdin closed
                    break;
                };
                match ui.handle_line(&line) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => ui.report(&err)?,
                }
                // Changes made by the command itself have just been drawn
                while playing.try_recv().is_ok() {}
            }
            recv(playing) -> changed => {
                if let Ok(false) = changed {
                    ui.notify_stopped()?;
                }
            }
        }
    }

    info!("👋 Bye");
    Ok(())
}

/*
 *  main.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::Context;
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind}; // Import specific Unix signals

use picframe::{config, http};
use picframe::{Catalog, CommandRenderer, DisplayState, Normalizer, PictureFrame, RotationScheduler};

const BUILD_DATE: &str = env!("PICFRAME_BUILD_DATE");

/// Waits for SIGINT, SIGTERM, or SIGHUP and logs which one arrived.
#[cfg(unix)]
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // configuration problems are the one fatal path
    let Some(settings) = config::load()? else {
        return Ok(());
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str())).init();

    info!("═══════════════════════════════════════════════════");
    info!("  picframe v{} (built {})", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("═══════════════════════════════════════════════════");
    info!("  Pictures: {}", settings.pictures_dir.display());
    info!("  Panel: {}x{}", settings.panel_width, settings.panel_height);
    info!("  Renderer: {} {:?}", settings.renderer_program, settings.renderer_args);
    info!("═══════════════════════════════════════════════════");

    let catalog = Arc::new(
        Catalog::open(&settings.pictures_dir)
            .with_context(|| format!("opening picture store {}", settings.pictures_dir.display()))?,
    );
    info!("Catalog holds {} pictures", catalog.len());

    // restore before the scheduler's first wake
    let state = Arc::new(DisplayState::load(Arc::clone(&catalog), &settings.state_file));
    if let Some(current) = state.current() {
        info!("Resuming at picture {} ({})", current.index, current.identifier);
    }

    let renderer = Arc::new(CommandRenderer::new(
        settings.renderer_program.clone(),
        settings.renderer_args.clone(),
    ));
    let frame = PictureFrame::new(
        Arc::clone(&state),
        renderer,
        Normalizer::new(settings.panel_width, settings.panel_height),
    );

    let scheduler = if settings.rotation_enabled {
        let scheduler = RotationScheduler::new(
            Arc::clone(&state),
            Arc::clone(frame.gateway()),
            settings.window,
            settings.poll,
        );
        Some(scheduler.spawn())
    } else {
        info!("Automatic rotation disabled");
        None
    };

    let app = http::router(frame, &settings.static_dir, settings.upload_limit_bytes);
    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!("Serving on http://{}", settings.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal_handler().await {
                error!("Signal handler failed, running until killed: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Main application exiting. Stopping rotation scheduler.");
    if let Some(handle) = scheduler {
        handle.stop().await;
    }

    Ok(())
}

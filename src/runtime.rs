//! Display loop.
//!
//! One task owns the engine, the timer and the surface. Key presses, timer
//! ticks, asset updates and shutdown are taken from a single `select!`, so
//! transitions run strictly one at a time in arrival order.

use crate::catalog::ImageRef;
use crate::display::{DisplaySurface, SurfaceError};
use crate::engine::{Engine, Frame};
use crate::input::{Dispatcher, KeyInput};
use crate::rotation::RotationTimer;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub struct Runtime<S: DisplaySurface> {
    engine: Engine,
    dispatcher: Dispatcher,
    timer: RotationTimer,
    surface: S,
    assets: Option<broadcast::Receiver<ImageRef>>,
}

impl<S: DisplaySurface> Runtime<S> {
    pub fn new(engine: Engine, dispatcher: Dispatcher, interval: Duration, surface: S) -> Self {
        Self {
            engine,
            dispatcher,
            timer: RotationTimer::new(interval),
            surface,
            assets: None,
        }
    }

    /// Redraw the displayed image when `updates` reports it loaded
    pub fn watch_assets(&mut self, updates: broadcast::Receiver<ImageRef>) {
        self.assets = Some(updates);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Run until a quit key, a closed key channel, or shutdown.
    ///
    /// Only terminal errors end the loop early; image load failures are
    /// handled by showing a placeholder.
    pub async fn run(
        &mut self,
        mut keys: mpsc::Receiver<KeyInput>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), SurfaceError> {
        tracing::info!("Display loop started");

        let result = self.event_loop(&mut keys, &mut shutdown).await;

        self.timer.disarm();
        tracing::info!("Display loop stopped");
        result
    }

    async fn event_loop(
        &mut self,
        keys: &mut mpsc::Receiver<KeyInput>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), SurfaceError> {
        self.present(self.engine.frame())?;

        loop {
            self.timer.sync(self.engine.timer_demand());

            tokio::select! {
                _ = self.timer.tick() => {
                    let frame = self.engine.tick();
                    self.present(frame)?;
                }
                key = keys.recv() => match key {
                    Some(KeyInput::Key(id)) => {
                        let Some(command) = self.dispatcher.dispatch(&id) else {
                            tracing::debug!("Ignoring key {:?}", id);
                            continue;
                        };
                        let frame = self.engine.apply(command);
                        self.present(frame)?;
                    }
                    Some(KeyInput::Quit) | None => {
                        tracing::info!("Quit requested");
                        return Ok(());
                    }
                },
                update = asset_update(&mut self.assets) => {
                    let frame = self.engine.frame();
                    let stale = match (&update, &frame) {
                        (Some(reference), Some(frame)) => *reference != frame.image,
                        // Lagged: whatever we missed may include the current image
                        (None, _) => false,
                        (_, None) => true,
                    };
                    if !stale {
                        tracing::debug!("Redrawing after load of {:?}", update);
                        self.present(frame)?;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Display loop shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Hand a frame to the surface, falling back to a placeholder once
    fn present(&mut self, frame: Option<Frame>) -> Result<(), SurfaceError> {
        let Some(frame) = frame else {
            return Ok(());
        };
        let status = self.engine.status();

        match self.surface.show(&frame, &status) {
            Err(SurfaceError::AssetLoad { reference, reason }) => {
                tracing::warn!("Image failed to load: {}", reason);
                let Some(placeholder) = self.engine.asset_failed(&reference) else {
                    return Ok(());
                };
                match self.surface.show(&placeholder, &status) {
                    Err(SurfaceError::AssetLoad { reason, .. }) => {
                        tracing::error!("Placeholder failed to load: {}", reason);
                        Ok(())
                    }
                    other => other,
                }
            }
            other => other,
        }
    }
}

/// Next loaded reference, `None` after missed updates. Pending forever when
/// nothing is watched or the cache is gone.
async fn asset_update(updates: &mut Option<broadcast::Receiver<ImageRef>>) -> Option<ImageRef> {
    let Some(rx) = updates.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(reference) => Some(reference),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            tracing::debug!("Missed {} asset updates", missed);
            None
        }
        Err(broadcast::error::RecvError::Closed) => {
            *updates = None;
            std::future::pending().await
        }
    }
}

//! Full-screen terminal surface.
//!
//! Takes over the terminal (alternate screen, raw mode, hidden cursor) for
//! as long as it lives and hands it back on drop, whichever way the display
//! loop ends. A remote image that is not cached yet is drawn as "loading..."
//! and handed to the fetcher; the runtime redraws it once it arrives.

use super::{DisplaySurface, SurfaceError};
use crate::assets::{AssetCache, AssetStatus};
use crate::catalog::ImageRef;
use crate::engine::{Frame, Status};
use crate::logging::ConsoleClaim;
use crossterm::{cursor, execute, queue, style, terminal};
use std::io::{self, Stdout, Write};
use tokio::sync::mpsc;

/// Size assumed when not attached to a real terminal
const FALLBACK_SIZE: (u16, u16) = (80, 24);

pub struct TerminalSurface<W: Write> {
    out: W,
    cache: AssetCache,
    owns_terminal: bool,
    /// Generation currently on screen
    generation: Option<u64>,
    fetcher: Option<mpsc::UnboundedSender<ImageRef>>,
    /// Released after the terminal is restored
    _console: Option<ConsoleClaim>,
}

impl TerminalSurface<Stdout> {
    /// Take over stdout
    pub fn open(cache: AssetCache) -> Result<Self, SurfaceError> {
        let console = ConsoleClaim::acquire();
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        Ok(Self {
            out,
            cache,
            owns_terminal: true,
            generation: None,
            fetcher: None,
            _console: Some(console),
        })
    }
}

impl<W: Write> TerminalSurface<W> {
    /// Send uncached remote references to `fetcher`
    pub fn with_fetcher(mut self, fetcher: mpsc::UnboundedSender<ImageRef>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Draw into an arbitrary writer without touching terminal modes
    #[cfg(test)]
    pub fn with_writer(out: W, cache: AssetCache) -> Self {
        Self {
            out,
            cache,
            owns_terminal: false,
            generation: None,
            fetcher: None,
            _console: None,
        }
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn size(&self) -> (u16, u16) {
        if self.owns_terminal {
            terminal::size().unwrap_or(FALLBACK_SIZE)
        } else {
            FALLBACK_SIZE
        }
    }

    fn draw(&mut self, frame: &Frame, asset: Option<&AssetStatus>, status: &Status) -> io::Result<()> {
        let (cols, rows) = self.size();

        // New generation replays the entry transition: start from a blank screen
        if self.generation != Some(frame.generation) {
            queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
        }

        let detail = match asset {
            Some(AssetStatus::Ready { width, height }) => format!("{}x{}", width, height),
            Some(AssetStatus::Failed(reason)) => reason.clone(),
            None => "loading...".to_string(),
        };

        let middle = rows / 2;
        for (row, text) in [(middle.saturating_sub(1), frame.image.as_str()), (middle, detail.as_str())] {
            let col = cols.saturating_sub(text.chars().count() as u16) / 2;
            queue!(
                self.out,
                cursor::MoveTo(0, row),
                terminal::Clear(terminal::ClearType::CurrentLine),
                cursor::MoveTo(col, row),
                style::Print(text),
            )?;
        }

        let (position, len) = status.position;
        let state = if status.auto_advancing {
            format!("⟳ Rotating ({}/{})", position, len)
        } else {
            format!("⏸ Paused ({}/{})", position, len)
        };

        let overlay = [
            status.title.as_str(),
            status.subtitle.as_str(),
            state.as_str(),
        ];
        let top = rows.saturating_sub(overlay.len() as u16 + 1);
        for (i, text) in overlay.iter().enumerate() {
            let row = top + i as u16;
            let col = cols.saturating_sub(text.chars().count() as u16 + 2);
            queue!(
                self.out,
                cursor::MoveTo(0, row),
                terminal::Clear(terminal::ClearType::CurrentLine),
                cursor::MoveTo(col, row),
            )?;
            if i == 0 {
                queue!(self.out, style::PrintStyledContent(style::Stylize::bold(*text)))?;
            } else {
                queue!(self.out, style::Print(text))?;
            }
        }

        self.out.flush()
    }
}

impl<W: Write> DisplaySurface for TerminalSurface<W> {
    fn show(&mut self, frame: &Frame, status: &Status) -> Result<(), SurfaceError> {
        let asset = self.cache.lookup(&frame.image);

        match &asset {
            Some(AssetStatus::Failed(reason)) => {
                return Err(SurfaceError::AssetLoad {
                    reference: frame.image.clone(),
                    reason: reason.clone(),
                });
            }
            None => {
                let sent = self.fetcher.as_ref().map(|f| f.send(frame.image.clone()));
                if let Some(Err(_)) = sent {
                    tracing::warn!("Fetcher gone, {} stays unloaded", frame.image);
                }
            }
            Some(AssetStatus::Ready { .. }) => {}
        }

        self.draw(frame, asset.as_ref(), status)?;
        self.generation = Some(frame.generation);
        Ok(())
    }
}

impl<W: Write> Drop for TerminalSurface<W> {
    fn drop(&mut self) {
        if self.owns_terminal {
            let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
}

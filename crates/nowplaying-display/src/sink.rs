//! Display sinks: where finished frames go.
//!
//! The render loop calls `present()` once per tick and treats any error as
//! fatal.  `close()` releases the device; sinks also release on drop so an
//! early return or panic leaves the terminal usable.

use std::fs::{File, OpenOptions};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nowplaying_proto::config::{DisplayConfig, SinkKind};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use ratatui::DefaultTerminal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::frame::Frame;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("terminal error: {0}")]
    Terminal(std::io::Error),
    #[error("failed to write frame to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait DisplaySink: Send {
    fn present(&mut self, frame: &Frame) -> Result<(), SinkError>;

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

pub fn open(config: &DisplayConfig) -> Result<Box<dyn DisplaySink>, SinkError> {
    let sink: Box<dyn DisplaySink> = match config.sink {
        SinkKind::Preview => Box::new(PreviewSink::open()?),
        SinkKind::File => Box::new(FileSink::open(&config.sink_path, config.rotate == 2)?),
        SinkKind::Null => Box::new(NullSink::default()),
    };
    info!("sink: {:?} ready for {}x{}", config.sink, config.width, config.height);
    Ok(sink)
}

// ── preview ───────────────────────────────────────────────────────────────────

/// Renders the frame in the terminal, two pixel rows per text row.
pub struct PreviewSink {
    terminal: Option<DefaultTerminal>,
}

impl PreviewSink {
    pub fn open() -> Result<Self, SinkError> {
        let terminal = ratatui::try_init().map_err(SinkError::Terminal)?;
        Ok(Self {
            terminal: Some(terminal),
        })
    }

    fn restore(&mut self) -> Result<(), SinkError> {
        if self.terminal.take().is_some() {
            ratatui::try_restore().map_err(SinkError::Terminal)?;
            debug!("sink: terminal restored");
        }
        Ok(())
    }
}

impl DisplaySink for PreviewSink {
    fn present(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let lines = half_block_lines(frame);
        let title = format!(" nowplaying {}x{} · q to quit ", frame.width(), frame.height());
        terminal
            .draw(|f| {
                let preview = Paragraph::new(lines).block(Block::bordered().title(title));
                f.render_widget(preview, f.area());
            })
            .map_err(SinkError::Terminal)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.restore()
    }
}

impl Drop for PreviewSink {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// `▀`, `▄`, `█` or space for every pair of pixel rows.
pub fn half_block_lines(frame: &Frame) -> Vec<Line<'static>> {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    (0..h)
        .step_by(2)
        .map(|y| {
            let row: String = (0..w)
                .map(|x| match (frame.pixel(x, y), frame.pixel(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            Line::from(row)
        })
        .collect()
}

/// Raw mode swallows SIGINT, so quit keys are read here and turned into a
/// cancellation.  Returns once `cancel` fires.
pub fn spawn_quit_keys(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(_) => break,
            }
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            let quit = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => true,
                KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
                _ => false,
            };
            if quit {
                info!("preview: quit key pressed");
                cancel.cancel();
            }
        }
    })
}

// ── file ──────────────────────────────────────────────────────────────────────

/// Writes the page buffer to a file, framebuffer node or FIFO every frame.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    /// Regular files and device nodes are rewritten in place; pipes are
    /// streamed.
    rewind: bool,
    upside_down: bool,
}

impl FileSink {
    pub fn open(path: &Path, upside_down: bool) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let rewind = file.rewind().is_ok();
        info!(
            "sink: writing frames to {:?} (rewind={}, upside_down={})",
            path, rewind, upside_down
        );
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            rewind,
            upside_down,
        })
    }

    fn write_err(&self, source: std::io::Error) -> SinkError {
        SinkError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl DisplaySink for FileSink {
    fn present(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let result = if self.upside_down {
            write_frame(file, frame.rotated_180().pages(), self.rewind)
        } else {
            write_frame(file, frame.pages(), self.rewind)
        };
        result.map_err(|e| self.write_err(e))
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(file) = self.file.take() {
            file.sync_all().or_else(|e| {
                // pipes and some device nodes cannot fsync
                if e.kind() == std::io::ErrorKind::InvalidInput {
                    Ok(())
                } else {
                    Err(self.write_err(e))
                }
            })?;
            debug!("sink: closed {:?}", self.path);
        }
        Ok(())
    }
}

fn write_frame(file: &mut File, bytes: &[u8], rewind: bool) -> std::io::Result<()> {
    if rewind {
        file.rewind()?;
    }
    file.write_all(bytes)?;
    file.flush()
}

// ── null ──────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct NullSink {
    frames: u64,
}

impl NullSink {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DisplaySink for NullSink {
    fn present(&mut self, _frame: &Frame) -> Result<(), SinkError> {
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        info!("sink: discarded {} frames", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_blocks() {
        let mut frame = Frame::new(4, 4);
        frame.set_pixel(0, 0, true);
        frame.set_pixel(1, 1, true);
        frame.set_pixel(2, 0, true);
        frame.set_pixel(2, 1, true);
        frame.set_pixel(3, 3, true);

        let lines = half_block_lines(&frame);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].to_string(), "▀▄█ ");
        assert_eq!(lines[1].to_string(), "   ▄");
    }

    #[test]
    fn test_file_sink_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames").join("frame.bin");

        let mut sink = FileSink::open(&path, false).unwrap();
        let mut frame = Frame::new(16, 8);
        sink.present(&frame).unwrap();
        frame.set_pixel(0, 0, true);
        sink.present(&frame).unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 1);
    }

    #[test]
    fn test_file_sink_upside_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");

        let mut sink = FileSink::open(&path, true).unwrap();
        let mut frame = Frame::new(16, 8);
        frame.set_pixel(0, 0, true);
        sink.present(&frame).unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[15], 0b1000_0000);
    }

    #[test]
    fn test_null_sink_counts() {
        let mut sink = NullSink::default();
        let frame = Frame::new(8, 8);
        sink.present(&frame).unwrap();
        sink.present(&frame).unwrap();
        assert_eq!(sink.frames(), 2);
        assert!(sink.close().is_ok());
    }
}

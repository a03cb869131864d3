//! Terminal pond view: a downsampled blit of the per-cell color at each
//! refresh boundary, with minimal input handling (quit, scheme cycling).
//!
//! The view is an ordinary observer; drawing failures degrade to log
//! warnings so a wedged terminal can never take the simulation down.

use anyhow::Result;
use core_engine::{Control, Observer};
use core_pond::{Census, Pond};
use core_render::{ColorScheme, cell_color};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor},
    terminal,
};
use std::io::{Stdout, Write, stdout};
use std::time::Duration;
use tracing::{info, warn};

pub struct TerminalView {
    out: Stdout,
    scheme: ColorScheme,
}

impl TerminalView {
    pub fn new(scheme: ColorScheme) -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        info!(target: "view", scheme = scheme.name(), "terminal_view_enabled");
        Ok(Self { out, scheme })
    }

    fn poll_input(&mut self) -> Result<Control> {
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(Control::Stop),
                    KeyCode::Char('c') => {
                        self.scheme = self.scheme.next();
                        info!(target: "view", scheme = self.scheme.name(), "color_scheme_switched");
                    }
                    _ => {}
                }
            }
        }
        Ok(Control::Continue)
    }

    fn draw(&mut self, clock: u64, pond: &Pond, census: &Census) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let cols = (cols.max(1)) as usize;
        // Reserve the last line for the status bar.
        let rows = (rows.max(2) - 1) as usize;
        let step_x = pond.width().div_ceil(cols).max(1);
        let step_y = pond.height().div_ceil(rows).max(1);

        for (row, y) in (0..pond.height()).step_by(step_y).enumerate() {
            queue!(self.out, cursor::MoveTo(0, row as u16))?;
            for x in (0..pond.width()).step_by(step_x) {
                let color = cell_color(pond.cell(x, y), self.scheme, census);
                queue!(
                    self.out,
                    SetBackgroundColor(Color::AnsiValue(color)),
                    Print(' ')
                )?;
            }
            queue!(self.out, ResetColor)?;
        }
        queue!(
            self.out,
            cursor::MoveTo(0, rows as u16),
            terminal::Clear(terminal::ClearType::CurrentLine),
            Print(format!(
                "tick {clock}  scheme {}  [q] quit  [c] cycle",
                self.scheme.name()
            ))
        )?;
        self.out.flush()?;
        Ok(())
    }
}

impl Observer for TerminalView {
    fn on_refresh(&mut self, clock: u64, pond: &Pond, census: &Census) -> Control {
        if let Err(error) = self.draw(clock, pond, census) {
            warn!(target: "view", %error, "draw_failed");
        }
        match self.poll_input() {
            Ok(control) => control,
            Err(error) => {
                warn!(target: "view", %error, "input_poll_failed");
                Control::Continue
            }
        }
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

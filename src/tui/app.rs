//! Debugger application state and logic.

use crate::{Machine, Word};
use crate::asm::disasm::disassemble_instruction;
use crate::logic::Address;
use std::collections::HashSet;

/// Instructions executed per UI frame while running.
const TICKS_PER_FRAME: usize = 1_000;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Breakpoints (by ROM address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// RAM view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<Word>) -> Self {
        let (machine, status) = match Machine::with_program(&program) {
            Ok(m) => (m, "Ready. Press 's' to step, 'r' to run, 'q' to quit.".to_string()),
            Err(e) => (Machine::new(), format!("Failed to load program: {}", e)),
        };

        Self {
            machine,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status,
            mem_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        match self.machine.step() {
            Ok(info) => {
                self.status = format!("PC={:05}: {}", info.pc.value(), info.instruction);
                if self.machine.is_halted() {
                    self.status.push_str("  (halted)");
                    self.running = false;
                }
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or pause.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one frame's worth of continuous execution.
    pub fn tick(&mut self) {
        for _ in 0..TICKS_PER_FRAME {
            if !self.running {
                return;
            }

            if !self.machine.is_running() {
                self.running = false;
                self.status = format!("Halted after {} cycles", self.machine.cpu.cycles);
                return;
            }

            // Check for breakpoint
            let pc = self.machine.cpu.pc().value();
            if self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at PC={}", pc);
                return;
            }

            self.step();
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.cpu.pc().value();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reset machine to initial state, keeping the program.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Get disassembly around current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.machine.cpu.pc().value() as usize;
        let start = pc.saturating_sub(lines / 2);

        (start..start + lines)
            .filter(|&addr| addr <= Address::MAX as usize)
            .map(|addr| {
                let addr = Address::new(addr as u16);
                let text = disassemble_instruction(self.machine.rom.read(addr));
                (addr.value(), text, addr.index() == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<Word>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.mem_scroll < Address::MAX as usize {
                                app.mem_scroll += 1;
                            }
                        }
                        KeyCode::PageUp => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(16);
                        }
                        KeyCode::PageDown => {
                            app.mem_scroll = (app.mem_scroll + 16).min(Address::MAX as usize);
                        }
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

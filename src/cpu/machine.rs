//! The complete Hack computer: CPU, ROM and RAM on one clock.
//!
//! Each tick fetches `rom[pc]`, presents `ram[A]` as the CPU's memory input,
//! runs one CPU cycle and performs the requested RAM write.

use crate::cpu::execute::{Cpu, CpuOutput};
use crate::cpu::instruction::{self, Dest, Instruction};
use crate::cpu::memory::{MemoryError, Ram, Rom, KBD};
use crate::cpu::registers::Registers;
use crate::logic::{Address, Word};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Clock is running normally.
    Running,
    /// The program entered a loop that can never change state
    /// (`(END) @END 0;JMP`).
    Halted,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Address the instruction was fetched from.
    pub pc: Address,
    /// The instruction that ran.
    pub instruction: Instruction,
    /// CPU outputs for this tick.
    pub output: CpuOutput,
}

/// Serializable summary of the machine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub state: MachineState,
    pub cycles: u64,
    pub registers: Registers,
}

/// The Hack computer.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// The CPU.
    pub cpu: Cpu,
    /// Instruction memory.
    pub rom: Rom,
    /// Data memory.
    pub ram: Ram,
    /// Current execution state.
    pub state: MachineState,
}

impl Machine {
    /// Create a machine with an empty ROM and zeroed RAM.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            rom: Rom::default(),
            ram: Ram::new(),
            state: MachineState::Running,
        }
    }

    /// Create a machine with a program already in ROM.
    pub fn with_program(program: &[Word]) -> Result<Self, MachineError> {
        let mut machine = Self::new();
        machine.load_program(program)?;
        Ok(machine)
    }

    /// Replace the ROM contents and reset.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), MachineError> {
        self.rom = Rom::load(program)?;
        self.reset();
        log::debug!("loaded {} words into ROM", program.len());
        Ok(())
    }

    /// Reset the CPU and RAM to the power-on state. ROM is kept.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.ram.clear();
        self.state = MachineState::Running;
    }

    /// Run one clock tick with the given reset line, ignoring the halt state.
    ///
    /// A reset tick puts a halted machine back into the running state.
    pub fn tick(&mut self, reset: bool) -> CpuOutput {
        let pc = self.cpu.pc();
        let word = self.rom.read(pc);
        let memory_in = self.ram.read(Address::truncate(self.cpu.registers().a));

        let out = self.cpu.step(word, memory_in, reset);
        if out.memory_write {
            self.ram.write(out.memory_address, out.memory_out);
        }

        log::trace!(
            "{:05}: {:<16} A={:<6} D={:<6}{}",
            pc.value(),
            instruction::decode(word).to_string(),
            self.cpu.registers().a.to_i16(),
            self.cpu.registers().d.to_i16(),
            if out.memory_write {
                format!(" M[{}]={}", out.memory_address, out.memory_out.to_i16())
            } else {
                String::new()
            }
        );

        if reset {
            self.state = MachineState::Running;
        } else if self.is_self_loop(pc, word, out.pc) {
            log::debug!("halt loop at pc={} after {} cycles", pc, self.cpu.cycles);
            self.state = MachineState::Halted;
        }
        out
    }

    /// Execute a single instruction.
    ///
    /// Returns what ran, or an error if the machine has halted.
    pub fn step(&mut self) -> Result<StepInfo, MachineError> {
        if self.state != MachineState::Running {
            return Err(MachineError::NotRunning(self.state));
        }
        let pc = self.cpu.pc();
        let instruction = instruction::decode(self.rom.read(pc));
        let output = self.tick(false);
        Ok(StepInfo { pc, instruction, output })
    }

    /// Run until halt.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, MachineError> {
        let start_cycles = self.cpu.cycles;
        while self.state == MachineState::Running {
            self.step()?;
        }
        Ok(self.cpu.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, MachineError> {
        let start_cycles = self.cpu.cycles;
        let limit = self.cpu.cycles + max_cycles;
        while self.state == MachineState::Running && self.cpu.cycles < limit {
            self.step()?;
        }
        Ok(self.cpu.cycles - start_cycles)
    }

    /// Set the keyboard register (0 when no key is pressed).
    pub fn set_key(&mut self, key: Word) {
        self.ram.write(KBD, key);
    }

    /// Committed register values.
    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    /// Serializable summary.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            state: self.state,
            cycles: self.cpu.cycles,
            registers: self.cpu.registers(),
        }
    }

    /// Check if the machine has halted.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    /// A taken jump with no destination that lands on itself, or on an
    /// `@target` right before it. Neither loop can ever leave.
    fn is_self_loop(&self, pc: Address, word: Word, target: Address) -> bool {
        let jumped = self.cpu.last_signals().map_or(false, |s| s.jump);
        let writes_nothing = matches!(
            instruction::decode(word),
            Instruction::Compute { dest: Dest::NONE, .. }
        );
        if !jumped || !writes_nothing {
            return false;
        }
        if target == pc {
            return true;
        }
        target.value().wrapping_add(1) == pc.value()
            && instruction::decode(self.rom.read(target)) == Instruction::Address(target)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("cpu", &self.cpu)
            .field("rom", &self.rom)
            .finish()
    }
}

/// Errors that can occur while running the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("machine not running: {0:?}")]
    NotRunning(MachineState),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn machine(source: &str) -> Machine {
        Machine::with_program(&assemble(source).unwrap()).unwrap()
    }

    #[test]
    fn test_halts_on_end_loop() {
        let mut m = machine("
            @7
            D=A
            (END)
            @END
            0;JMP
        ");
        let executed = m.run_limited(100).unwrap();
        assert!(m.is_halted());
        assert_eq!(executed, 4);
        assert_eq!(m.registers().d.to_i16(), 7);
        assert!(matches!(m.step(), Err(MachineError::NotRunning(MachineState::Halted))));
    }

    #[test]
    fn test_add_two_numbers() {
        // RAM[2] = RAM[0] + RAM[1]
        let mut m = machine("
            @R0
            D=M
            @R1
            D=D+M
            @R2
            M=D
            (END)
            @END
            0;JMP
        ");
        m.ram.write(Address::new(0), Word::new(1234));
        m.ram.write(Address::new(1), Word::from_i16(-34));
        m.run_limited(100).unwrap();
        assert!(m.is_halted());
        assert_eq!(m.ram.read(Address::new(2)).to_i16(), 1200);
    }

    #[test]
    fn test_sum_loop() {
        // RAM[1] = 1 + 2 + ... + RAM[0]
        let mut m = machine("
                @i
                M=1
                @sum
                M=0
            (LOOP)
                @i
                D=M
                @R0
                D=D-M
                @STOP
                D;JGT
                @i
                D=M
                @sum
                M=D+M
                @i
                M=M+1
                @LOOP
                0;JMP
            (STOP)
                @sum
                D=M
                @R1
                M=D
            (END)
                @END
                0;JMP
        ");
        m.ram.write(Address::new(0), Word::new(100));
        m.run_limited(10_000).unwrap();
        assert!(m.is_halted());
        assert_eq!(m.ram.read(Address::new(1)).bits(), 5050);
    }

    #[test]
    fn test_run_limited_stops_at_limit() {
        let mut m = machine("
            (LOOP)
            @i
            M=M+1
            @LOOP
            0;JMP
        ");
        let executed = m.run_limited(40).unwrap();
        assert_eq!(executed, 40);
        assert!(m.is_running());
        assert_eq!(m.ram.read(Address::new(16)).bits(), 10);
    }

    #[test]
    fn test_countdown_loop_runs_to_completion() {
        // The loop body jumps back to an `@L` right before it, but D changes
        // on every pass, so it must not be taken for a halt.
        let mut m = machine("
            @5
            D=A
            (L)
            @L
            D=D-1;JGT
            @R0
            M=1
            (END)
            @END
            0;JMP
        ");
        m.run_limited(1000).unwrap();
        assert!(m.is_halted());
        assert_eq!(m.registers().d.to_i16(), 0);
        assert_eq!(m.ram.read(Address::new(0)).bits(), 1);
    }

    #[test]
    fn test_self_jumps_with_stores_keep_running() {
        let mut m = machine("
            (L)
            @L
            M=M+1;JMP
        ");
        m.run_limited(10).unwrap();
        assert!(m.is_running());
        assert_eq!(m.ram.read(Address::new(0)).bits(), 5);

        let mut m = machine("
            @1
            D=D+1;JMP
        ");
        m.run_limited(10).unwrap();
        assert!(m.is_running());
        assert_eq!(m.registers().d.bits(), 9);
    }

    #[test]
    fn test_run_until_halt() {
        let mut m = machine("
            @3
            D=A
            @R1
            M=D
            (END)
            @END
            0;JMP
        ");
        let executed = m.run().unwrap();
        assert_eq!(executed, 6);
        assert!(m.is_halted());
        assert_eq!(m.ram.read(Address::new(1)).bits(), 3);
    }

    #[test]
    fn test_oversized_program_rejected() {
        let program = vec![Word::ZERO; crate::cpu::memory::MEMORY_SIZE + 1];
        assert!(matches!(
            Machine::with_program(&program),
            Err(MachineError::MemoryError(MemoryError::ProgramTooLarge { .. }))
        ));
    }

    #[test]
    fn test_reset_tick_resumes_halted_machine() {
        let mut m = machine("
            @7
            D=A
            (END)
            @END
            0;JMP
        ");
        m.run_limited(100).unwrap();
        assert!(m.is_halted());

        let out = m.tick(true);
        assert_eq!(out.pc, Address::ZERO);
        assert!(m.is_running());
        let info = m.step().unwrap();
        assert_eq!(info.pc, Address::ZERO);
    }

    #[test]
    fn test_conditional_self_jump_not_taken_keeps_running() {
        // An END-shaped loop whose jump is not taken falls through.
        let mut m = machine("
            @5
            D=A
            @2
            D;JEQ
            (END)
            @END
            0;JMP
        ");
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        assert!(m.is_running());
        m.run_limited(10).unwrap();
        assert!(m.is_halted());
    }

    #[test]
    fn test_reset_tick_restarts_program() {
        let mut m = machine("
            @1
            @2
            @3
        ");
        m.tick(false);
        m.tick(false);
        let out = m.tick(true);
        assert_eq!(out.pc, Address::ZERO);
        assert_eq!(m.cpu.pc(), Address::ZERO);
        assert!(m.is_running());
    }

    #[test]
    fn test_keyboard_and_reset() {
        let mut m = machine("
            @KBD
            D=M
            @R0
            M=D
        ");
        m.set_key(Word::new(65));
        m.run_limited(4).unwrap();
        assert_eq!(m.ram.read(Address::new(0)).bits(), 65);

        m.reset();
        assert_eq!(m.registers(), Registers::new());
        assert_eq!(m.ram.read(Address::new(0)), Word::ZERO);
        assert_eq!(m.rom.len(), 4);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut m = machine("@42\nD=A");
        m.run_limited(2).unwrap();
        let json = serde_json::to_string(&m.snapshot()).unwrap();
        assert!(json.contains("\"cycles\":2"));
        assert!(json.contains("\"d\":42"));
        let back: MachineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m.snapshot());
    }
}

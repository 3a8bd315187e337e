//! Instruction decode and wiring network.
//!
//! One clock tick is two strictly ordered phases:
//! 1. [`evaluate`] - combinational. A pure function of the committed
//!    [`Registers`] snapshot and this cycle's [`Inputs`]. It reads raw
//!    instruction bits, drives the ALU and the branch evaluator, and yields
//!    every derived wire as [`Signals`].
//! 2. [`commit`] - clocked. All storage elements take their next value at
//!    once; nothing observes a new value before every next value is known.
//!
//! Signals are computed in dependency order inside `evaluate`, so the
//! network cannot contain a combinational loop.

use crate::cpu::branch::{self, JumpCondition};
use crate::cpu::registers::{ProgramCounter, Register, Registers};
use crate::logic::{alu, gates, Address, AluOutput, ControlBits, Word};
use serde::{Serialize, Deserialize};

/// Instruction bit positions used by the decode network.
mod bit {
    pub const TYPE: usize = 15;
    pub const A_OR_M: usize = 12;
    pub const CTRL_LO: usize = 6;
    pub const DEST_A: usize = 5;
    pub const DEST_D: usize = 4;
    pub const DEST_M: usize = 3;
    pub const JUMP_LO: usize = 0;
}

/// Per-cycle inputs supplied by the surrounding machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inputs {
    /// The instruction fetched from `rom[pc]`.
    pub instruction: Word,
    /// The memory word addressed by A (`M`).
    pub memory_in: Word,
    /// Force the program counter to 0 at the next edge.
    pub reset: bool,
}

/// Every wire derived during the combinational phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    /// Type bit: compute instruction rather than address-load.
    pub is_compute: bool,
    /// ALU result and flags.
    pub alu: AluOutput,
    /// Register A latches `a_next` at the edge.
    pub load_a: bool,
    /// Value driven into A: ALU result or the 15-bit literal.
    pub a_next: Word,
    /// Register D latches `alu.out` at the edge.
    pub load_d: bool,
    /// Memory write enable.
    pub memory_write: bool,
    /// Value to write. Don't-care unless `memory_write` is set.
    pub memory_out: Word,
    /// The committed A value, as an address.
    pub memory_address: Address,
    /// Branch decision.
    pub jump: bool,
    /// Program counter after the edge.
    pub pc_next: Address,
}

/// The CPU's outputs to memory and instruction fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuOutput {
    /// Value to write to memory. Only meaningful when `memory_write` is set;
    /// otherwise it carries whatever the ALU computed.
    pub memory_out: Word,
    /// Memory write enable for this cycle.
    pub memory_write: bool,
    /// Address of the memory access (the A value before this tick).
    pub memory_address: Address,
    /// Address of the next instruction to fetch.
    pub pc: Address,
}

impl From<&Signals> for CpuOutput {
    fn from(signals: &Signals) -> Self {
        Self {
            memory_out: signals.memory_out,
            memory_write: signals.memory_write,
            memory_address: signals.memory_address,
            pc: signals.pc_next,
        }
    }
}

/// Combinational phase. Never mutates `state`.
pub fn evaluate(state: &Registers, inputs: &Inputs) -> Signals {
    let instr = inputs.instruction;

    // Classify
    let is_compute = instr.bit(bit::TYPE);

    // ALU operands: x is always D, y is A or M
    let y = gates::mux16(state.a, inputs.memory_in, instr.bit(bit::A_OR_M));
    let ctrl = ControlBits::new(instr.field(bit::CTRL_LO, 6) as u8);
    let alu = alu::compute(state.d, y, ctrl);

    // Destinations, all gated on the type bit
    let load_a_from_alu = gates::and(is_compute, instr.bit(bit::DEST_A));
    let load_d = gates::and(is_compute, instr.bit(bit::DEST_D));
    let memory_write = gates::and(is_compute, instr.bit(bit::DEST_M));

    // Register A: literal on address-load, ALU result on compute
    let load_a = gates::or(gates::not(is_compute), load_a_from_alu);
    let literal = Address::truncate(instr).to_word();
    let a_next = gates::mux16(literal, alu.out, is_compute);

    // Memory bus
    let memory_out = gates::buffer16(alu.out);
    let memory_address = Address::truncate(gates::buffer16(state.a));

    // Branch and next pc
    let cond = JumpCondition::new(instr.field(bit::JUMP_LO, 3) as u8);
    let jump = branch::should_jump(is_compute, cond, alu.zr, alu.ng);
    let pc_next = ProgramCounter::next(
        state.pc,
        Address::truncate(state.a),
        jump,
        true,
        inputs.reset,
    );

    Signals {
        is_compute,
        alu,
        load_a,
        a_next,
        load_d,
        memory_write,
        memory_out,
        memory_address,
        jump,
        pc_next,
    }
}

/// Clocked phase: the state after the edge.
pub fn commit(state: &Registers, signals: &Signals) -> Registers {
    Registers {
        a: gates::mux16(state.a, signals.a_next, signals.load_a),
        d: gates::mux16(state.d, signals.alu.out, signals.load_d),
        pc: signals.pc_next,
    }
}

/// One full tick as a pure function of the prior state.
pub fn step(state: &Registers, inputs: &Inputs) -> (CpuOutput, Registers) {
    let signals = evaluate(state, inputs);
    (CpuOutput::from(&signals), commit(state, &signals))
}

/// The Hack CPU: the decode network plus its three storage elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cpu {
    a: Register,
    d: Register,
    pc: ProgramCounter,
    /// Clock edges seen so far.
    pub cycles: u64,
    /// Wires of the most recent tick (for debugging).
    last_signals: Option<Signals>,
}

impl Cpu {
    /// Create a CPU with all registers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CPU starting from caller-supplied register values.
    pub fn with_registers(regs: Registers) -> Self {
        Self {
            a: Register::new(regs.a),
            d: Register::new(regs.d),
            pc: ProgramCounter::new(regs.pc),
            cycles: 0,
            last_signals: None,
        }
    }

    /// Snapshot of the committed state.
    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a.out(),
            d: self.d.out(),
            pc: self.pc.out(),
        }
    }

    /// Current program counter.
    #[inline]
    pub fn pc(&self) -> Address {
        self.pc.out()
    }

    /// Run one clock tick.
    pub fn step(&mut self, instruction: Word, memory_in: Word, reset: bool) -> CpuOutput {
        let snapshot = self.registers();
        let inputs = Inputs { instruction, memory_in, reset };
        let signals = evaluate(&snapshot, &inputs);

        self.a.tick(signals.a_next, signals.load_a);
        self.d.tick(signals.alu.out, signals.load_d);
        self.pc.tick(Address::truncate(snapshot.a), signals.jump, true, reset);
        debug_assert_eq!(self.pc.out(), signals.pc_next);

        self.cycles += 1;
        self.last_signals = Some(signals);
        CpuOutput::from(&signals)
    }

    /// Wires of the most recent tick.
    pub fn last_signals(&self) -> Option<Signals> {
        self.last_signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::instruction::{encode, Computation, Dest, Instruction};
    use proptest::prelude::*;

    fn at(value: u16) -> Word {
        encode(&Instruction::Address(Address::new(value)))
    }

    fn compute(dest: Dest, comp: &str, jump: JumpCondition) -> Word {
        encode(&Instruction::Compute {
            comp: Computation::from_mnemonic(comp).unwrap(),
            dest,
            jump,
        })
    }

    fn regs(a: i16, d: i16, pc: u16) -> Registers {
        Registers { a: Word::from_i16(a), d: Word::from_i16(d), pc: Address::new(pc) }
    }

    fn inputs(instruction: Word) -> Inputs {
        Inputs { instruction, memory_in: Word::ZERO, reset: false }
    }

    #[test]
    fn test_address_load_sets_a() {
        let before = regs(-1, 77, 5);
        let (out, after) = step(&before, &inputs(at(0x7ABC)));

        assert_eq!(after.a.bits(), 0x7ABC);
        assert!(!after.a.is_negative());
        assert_eq!(after.d, before.d);
        assert_eq!(after.pc, Address::new(6));
        assert!(!out.memory_write);
    }

    #[test]
    fn test_address_load_never_writes_or_jumps() {
        // Bits 0..5 set in the literal must not leak into dest/jump.
        let before = regs(100, 0, 5);
        let signals = evaluate(&before, &inputs(at(0b0111_1111_1111_1111)));
        assert!(!signals.is_compute);
        assert!(signals.load_a);
        assert!(!signals.load_d);
        assert!(!signals.memory_write);
        assert!(!signals.jump);
        assert_eq!(signals.pc_next, Address::new(6));
    }

    #[test]
    fn test_compute_into_d_only() {
        let before = regs(3, 5, 10);
        let (out, after) = step(&before, &inputs(compute(Dest::D, "D+A", JumpCondition::NONE)));

        assert_eq!(after.d.to_i16(), 8);
        assert_eq!(after.a, before.a);
        assert!(!out.memory_write);
        assert_eq!(after.pc, Address::new(11));
    }

    #[test]
    fn test_compute_into_memory() {
        let before = regs(3, 5, 0);
        let (out, after) = step(&before, &inputs(compute(Dest::M, "D-A", JumpCondition::NONE)));

        assert_eq!(out.memory_out.to_i16(), 2);
        assert!(out.memory_write);
        assert_eq!(out.memory_address, Address::new(3));
        assert_eq!(after.a, before.a);
        assert_eq!(after.d, before.d);
    }

    #[test]
    fn test_memory_address_is_pre_tick_a() {
        // AM=M+1 changes A, but this cycle's access still uses the old A.
        let before = regs(42, 0, 0);
        let input = Inputs {
            instruction: compute(Dest::A.union(Dest::M), "M+1", JumpCondition::NONE),
            memory_in: Word::new(9),
            reset: false,
        };
        let (out, after) = step(&before, &input);
        assert_eq!(out.memory_address, Address::new(42));
        assert_eq!(out.memory_out.bits(), 10);
        assert_eq!(after.a.bits(), 10);
    }

    #[test]
    fn test_a_bit_selects_memory_operand() {
        let before = regs(1000, 0, 0);
        let input = Inputs {
            instruction: compute(Dest::D, "M", JumpCondition::NONE),
            memory_in: Word::new(31),
            reset: false,
        };
        let (_, after) = step(&before, &input);
        assert_eq!(after.d.bits(), 31);

        let input = Inputs { instruction: compute(Dest::D, "A", JumpCondition::NONE), ..input };
        let (_, after) = step(&before, &input);
        assert_eq!(after.d.bits(), 1000);
    }

    #[test]
    fn test_unconditional_jump() {
        for d in [-5i16, 0, 5] {
            let before = regs(100, d, 7);
            let (out, after) = step(&before, &inputs(compute(Dest::NONE, "D", JumpCondition::JMP)));
            assert_eq!(out.pc, Address::new(100));
            assert_eq!(after.pc, Address::new(100));
        }
    }

    #[test]
    fn test_conditional_jump_on_flags() {
        let jgt = compute(Dest::NONE, "D", JumpCondition::JGT);
        assert_eq!(step(&regs(50, 1, 7), &inputs(jgt)).1.pc, Address::new(50));
        assert_eq!(step(&regs(50, 0, 7), &inputs(jgt)).1.pc, Address::new(8));
        assert_eq!(step(&regs(50, -1, 7), &inputs(jgt)).1.pc, Address::new(8));

        let jle = compute(Dest::NONE, "D", JumpCondition::JLE);
        assert_eq!(step(&regs(50, 0, 7), &inputs(jle)).1.pc, Address::new(50));
        assert_eq!(step(&regs(50, -1, 7), &inputs(jle)).1.pc, Address::new(50));
        assert_eq!(step(&regs(50, 1, 7), &inputs(jle)).1.pc, Address::new(8));
    }

    #[test]
    fn test_jump_target_drops_sign_bit() {
        let before = regs(-1, 0, 0);
        let (_, after) = step(&before, &inputs(compute(Dest::NONE, "0", JumpCondition::JMP)));
        assert_eq!(after.pc, Address::new(Address::MAX));
    }

    #[test]
    fn test_reset_dominates() {
        let jmp = compute(Dest::NONE, "0", JumpCondition::JMP);
        for instruction in [jmp, at(123), compute(Dest::D, "D+1", JumpCondition::NONE)] {
            let before = regs(100, 3, 4000);
            let input = Inputs { instruction, memory_in: Word::ZERO, reset: true };
            let (out, after) = step(&before, &input);
            assert_eq!(out.pc, Address::ZERO);
            assert_eq!(after.pc, Address::ZERO);
        }
    }

    #[test]
    fn test_reset_still_commits_registers() {
        let before = regs(0, 0, 9);
        let input = Inputs { instruction: at(55), memory_in: Word::ZERO, reset: true };
        let (_, after) = step(&before, &input);
        assert_eq!(after.a.bits(), 55);
    }

    #[test]
    fn test_all_destinations() {
        // AMD=-A
        let before = regs(9876, 0, 1);
        let all = Dest::A.union(Dest::M).union(Dest::D);
        let (out, after) = step(&before, &inputs(compute(all, "-A", JumpCondition::NONE)));
        assert_eq!(after.a.to_i16(), -9876);
        assert_eq!(after.d.to_i16(), -9876);
        assert!(out.memory_write);
        assert_eq!(out.memory_out.to_i16(), -9876);
        assert_eq!(out.memory_address, Address::new(9876));
        assert_eq!(after.pc, Address::new(2));
    }

    #[test]
    fn test_cpu_matches_pure_step() {
        let program = [
            at(10),
            compute(Dest::D, "A", JumpCondition::NONE),
            at(3),
            compute(Dest::D, "D-A", JumpCondition::NONE),
            compute(Dest::M, "D", JumpCondition::JGT),
        ];
        let mut cpu = Cpu::new();
        let mut state = Registers::new();
        for &instruction in &program {
            let expected = step(&state, &inputs(instruction));
            let out = cpu.step(instruction, Word::ZERO, false);
            assert_eq!(out, expected.0);
            assert_eq!(cpu.registers(), expected.1);
            state = expected.1;
        }
        assert_eq!(cpu.cycles, program.len() as u64);
        assert_eq!(cpu.registers().d.to_i16(), 7);
        assert_eq!(cpu.pc(), Address::new(3));
        assert!(cpu.last_signals().unwrap().jump);
    }

    proptest! {
        #[test]
        fn prop_step_is_deterministic(
            instruction in any::<u16>(),
            memory_in in any::<u16>(),
            reset in any::<bool>(),
            a in any::<u16>(),
            d in any::<u16>(),
            pc in 0u16..=Address::MAX,
        ) {
            let state = Registers { a: Word::new(a), d: Word::new(d), pc: Address::new(pc) };
            let input = Inputs {
                instruction: Word::new(instruction),
                memory_in: Word::new(memory_in),
                reset,
            };
            let first = step(&state, &input);
            let second = step(&state, &input);
            prop_assert_eq!(first, second);

            let mut cpu = Cpu::with_registers(state);
            let out = cpu.step(input.instruction, input.memory_in, reset);
            prop_assert_eq!(out, first.0);
            prop_assert_eq!(cpu.registers(), first.1);
        }

        #[test]
        fn prop_control_signals_gated_by_type_bit(
            instruction in 0u16..0x8000,
            a in any::<u16>(),
            d in any::<u16>(),
        ) {
            let state = Registers { a: Word::new(a), d: Word::new(d), pc: Address::ZERO };
            let signals = evaluate(&state, &inputs(Word::new(instruction)));
            prop_assert!(signals.load_a);
            prop_assert!(!signals.load_d);
            prop_assert!(!signals.memory_write);
            prop_assert!(!signals.jump);
            prop_assert_eq!(signals.a_next.bits(), instruction);
        }
    }
}

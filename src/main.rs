//! Hack Emulator - CLI Entry Point
//!
//! Commands:
//! - `hack-emu run <program>` - Run a `.hack`, `.asm` or `.vm` file
//! - `hack-emu debug <program>` - Interactive debugger
//! - `hack-emu asm <source>` - Assemble to `.hack`
//! - `hack-emu vm <path>` - Translate a `.vm` file or directory to `.asm`
//! - `hack-emu disasm <program>` - Disassemble `.hack`

use clap::{Parser, Subcommand};
use hack::Word;

#[derive(Parser)]
#[command(name = "hack-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A cycle-accurate emulator of the 16-bit Hack computer")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .hack, .asm or .vm file to execute
        program: String,
        /// Maximum number of cycles to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
        /// Dump a RAM range after the run, as START:COUNT
        #[arg(long, value_parser = parse_ram_range)]
        ram_dump: Option<(usize, usize)>,
    },
    /// Interactive debugger
    Debug {
        /// Path to the .hack, .asm or .vm file to debug
        program: String,
    },
    /// Assemble source to .hack
    Asm {
        /// Path to the source file
        source: String,
        /// Output .hack file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Translate VM code to assembly
    Vm {
        /// A .vm file, or a directory of .vm files
        input: String,
        /// Output .asm file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble .hack to readable text
    Disasm {
        /// Path to the .hack file
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json, ram_dump }) => {
            run_program(&program, max_cycles, trace, json, ram_dump);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Vm { input, output }) => {
            translate_path(&input, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Hack Emulator v0.1.0");
            println!("A cycle-accurate 16-bit Hack computer emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_primitives();
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("⚠️  Failed to initialize logging: {}", e);
    }
}

fn parse_ram_range(s: &str) -> Result<(usize, usize), String> {
    let (start, count) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:COUNT, got {:?}", s))?;
    let start = start.trim().parse().map_err(|e| format!("bad start: {}", e))?;
    let count = count.trim().parse().map_err(|e| format!("bad count: {}", e))?;
    Ok((start, count))
}

/// Load a program, assembling `.asm` and translating `.vm` sources on the fly.
fn load_program(path: &str) -> Vec<Word> {
    use hack::{assemble, load_hack};

    let instructions = if path.ends_with(".asm") || path.ends_with(".vm") {
        let source = if path.ends_with(".vm") {
            translate_vm(path).1
        } else {
            match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("❌ Failed to read file: {}", e);
                    std::process::exit(1);
                }
            }
        };

        match assemble(&source) {
            Ok(instrs) => {
                println!("📝 Assembled {} instructions", instrs.len());
                instrs
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_hack(path) {
            Ok(file) => {
                println!("📂 Loaded {} instructions", file.len());
                file.instructions
            }
            Err(e) => {
                eprintln!("❌ Failed to load .hack file: {}", e);
                std::process::exit(1);
            }
        }
    };

    if instructions.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }
    instructions
}

fn run_program(path: &str, max_cycles: u64, trace: bool, json: bool, ram_dump: Option<(usize, usize)>) {
    use hack::Machine;

    println!("🔧 Running: {}", path);
    let instructions = load_program(path);

    let mut machine = match Machine::with_program(&instructions) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("━━━ Execution ━━━");

    let mut cycles = 0u64;
    while machine.is_running() && cycles < max_cycles {
        let pc = machine.cpu.pc();

        match machine.step() {
            Ok(info) => {
                if trace {
                    let regs = machine.registers();
                    print!("{:05}: {:<16} A={:<6} D={:<6}",
                        pc.value(), info.instruction.to_string(), regs.a.to_i16(), regs.d.to_i16());
                    if info.output.memory_write {
                        print!(" M[{}]={}", info.output.memory_address, info.output.memory_out.to_i16());
                    }
                    println!();
                }
                cycles += 1;
            }
            Err(e) => {
                eprintln!("❌ Machine error at PC={}: {}", pc, e);
                std::process::exit(1);
            }
        }
    }

    let regs = machine.registers();
    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    println!("State: {:?}", machine.state);
    println!("A:  {} ({})", regs.a, regs.a.to_i16());
    println!("D:  {} ({})", regs.d, regs.d.to_i16());
    println!("PC: {}", regs.pc);

    if let Some((start, count)) = ram_dump {
        println!();
        println!("━━━ RAM[{}..{}] ━━━", start, start.saturating_add(count));
        for (addr, value) in machine.ram.dump(start, count) {
            println!("{:05}: {} = {}", addr.value(), value, value.to_i16());
        }
    }

    if json {
        match serde_json::to_string_pretty(&machine.snapshot()) {
            Ok(text) => {
                println!();
                println!("{}", text);
            }
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }

    if machine.is_running() && cycles >= max_cycles {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use hack::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let instructions = load_program(path);

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(instructions) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("❌ Debugger not available: built without the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use hack::{assemble, save_hack, HackFile};

    let out_path = output.unwrap_or_else(|| {
        match source_path.strip_suffix(".asm") {
            Some(stem) => format!("{}.hack", stem),
            None => format!("{}.hack", source_path),
        }
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let instructions = match assemble(&source) {
        Ok(instrs) => instrs,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} instructions", instructions.len());

    if let Err(e) = save_hack(&out_path, &HackFile::from_words(&instructions)) {
        eprintln!("❌ Failed to save .hack file: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

/// Translate a `.vm` file, or every `.vm` file in a directory.
///
/// Returns the default output path and the assembly text.
fn translate_vm(path: &str) -> (std::path::PathBuf, String) {
    use hack::asm::vm::{parse_unit, translate};
    use std::path::Path;

    let input = Path::new(path);
    let (files, out_path) = if input.is_dir() {
        let entries = match std::fs::read_dir(input) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("❌ Failed to read directory: {}", e);
                std::process::exit(1);
            }
        };
        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "vm"))
            .collect();
        files.sort();
        let dir_name = input.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let out_path = input.join(format!("{}.asm", dir_name));
        (files, out_path)
    } else {
        (vec![input.to_path_buf()], input.with_extension("asm"))
    };

    if files.is_empty() {
        eprintln!("❌ No .vm files in {}", path);
        std::process::exit(1);
    }

    let mut units = Vec::new();
    for file in &files {
        let source = match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read {}: {}", file.display(), e);
                std::process::exit(1);
            }
        };
        let name = file.file_stem().unwrap_or_default().to_string_lossy();
        match parse_unit(&name, &source) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                eprintln!("❌ VM error in {}: {}", file.display(), e);
                std::process::exit(1);
            }
        }
    }

    println!("🔁 Translated {} VM file(s)", units.len());
    (out_path, translate(&units))
}

fn translate_path(path: &str, output: Option<String>) {
    let (default_out, asm) = translate_vm(path);
    let out_path = output.map(std::path::PathBuf::from).unwrap_or(default_out);

    if let Err(e) = std::fs::write(&out_path, asm) {
        eprintln!("❌ Failed to write {}: {}", out_path.display(), e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

fn disassemble_file(path: &str) {
    use hack::{disassemble, load_hack};

    println!("📖 Disassembling: {}", path);
    println!();

    let file = match load_hack(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("❌ Failed to load .hack file: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&file.instructions));
}

fn demo_primitives() {
    use hack::add16_with_carry;
    use hack::cpu::Computation;
    use hack::logic::alu;

    println!("━━━ Hack Primitives Demo ━━━");
    println!();

    println!("16-bit adder (two chained 8-bit halves):");
    for (x, y) in [(0x00FFu16, 0x0001u16), (0x7FFF, 0x0001), (0xFFFF, 0x0001)] {
        let (sum, carry) = add16_with_carry(Word::new(x), Word::new(y), false);
        println!("  {:#06x} + {:#06x} = {:#06x}  carry={}", x, y, sum.bits(), carry as u8);
    }
    println!();

    let x = Word::from_i16(17);
    let y = Word::from_i16(5);
    println!("ALU with D={} and A={}:", x.to_i16(), y.to_i16());
    for name in ["D+A", "D-A", "A-D", "D&A", "D|A", "!D", "-A", "D+1"] {
        if let Some(comp) = Computation::from_mnemonic(name) {
            let out = alu::compute(x, y, comp.ctrl);
            println!("  {:<4} = {:>6}  zr={} ng={}", name, out.out.to_i16(), out.zr as u8, out.ng as u8);
        }
    }
    println!();

    println!("✓ Core primitives working!");
}

fn run_self_test() {
    use hack::{add16_with_carry, assemble, Address, Machine};
    use hack::cpu::{decode, encode, Computation, Registers, Inputs, step};
    use hack::logic::alu;

    println!("━━━ Hack Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    // Test 1: Adder against integer addition
    print!("16-bit adder matches integer addition... ");
    let mut ok = true;
    for (x, y) in [(0u16, 0u16), (1, 1), (0x00FF, 1), (0x7FFF, 1), (0xFFFF, 1), (0xABCD, 0x1234)] {
        let (sum, carry) = add16_with_carry(Word::new(x), Word::new(y), false);
        let wide = x as u32 + y as u32;
        if sum.bits() as u32 != wide & 0xFFFF || carry != (wide > 0xFFFF) {
            ok = false;
            break;
        }
    }
    if ok { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 2: ALU computation table
    print!("ALU computation table... ");
    ok = true;
    let (x, y) = (Word::from_i16(-7), Word::from_i16(3));
    let expected: [(&str, i16); 6] = [("0", 0), ("-1", -1), ("D+A", -4), ("D-A", -10), ("A-D", 10), ("!A", -4)];
    for (name, want) in expected {
        match Computation::from_mnemonic(name) {
            Some(comp) if alu::compute(x, y, comp.ctrl).out.to_i16() == want => {}
            _ => {
                ok = false;
                break;
            }
        }
    }
    if ok { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 3: Decode/encode agreement
    print!("Instruction decode/encode agreement... ");
    ok = true;
    for bits in [0x0000u16, 0x7FFF, 0xEC10, 0xEA87, 0xFDE0] {
        if encode(&decode(Word::new(bits))).bits() != bits {
            ok = false;
            break;
        }
    }
    if ok { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 4: Reset dominates jumps
    print!("Reset forces PC to zero... ");
    let state = Registers { a: Word::new(9), d: Word::ZERO, pc: Address::new(4) };
    let jmp = Word::new(0xEA87); // 0;JMP
    let (out, next) = step(&state, &Inputs { instruction: jmp, memory_in: Word::ZERO, reset: true });
    if out.pc == Address::ZERO && next.pc == Address::ZERO {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (got pc={})", next.pc);
        failed += 1;
    }

    // Test 5: Program execution
    print!("Machine adds RAM[0] + RAM[1]... ");
    let program = assemble("@R0\nD=M\n@R1\nD=D+M\n@R2\nM=D\n(END)\n@END\n0;JMP");
    let result = program
        .map_err(|e| e.to_string())
        .and_then(|words| Machine::with_program(&words).map_err(|e| e.to_string()))
        .and_then(|mut m| {
            m.ram.write(Address::new(0), Word::new(1234));
            m.ram.write(Address::new(1), Word::new(4321));
            m.run_limited(100).map_err(|e| e.to_string())?;
            Ok(m)
        });
    match result {
        Ok(m) if m.is_halted() && m.ram.read(Address::new(2)).bits() == 5555 => {
            println!("✓");
            passed += 1;
        }
        Ok(m) => {
            println!("✗ (got {}, expected 5555)", m.ram.read(Address::new(2)).bits());
            failed += 1;
        }
        Err(e) => {
            println!("✗ ({})", e);
            failed += 1;
        }
    }

    // Test 6: VM code through the assembler
    print!("VM add runs on the machine... ");
    let result = hack::asm::translate_source("Main", "push constant 7\npush constant 8\nadd")
        .map_err(|e| e.to_string())
        .and_then(|asm| assemble(&asm).map_err(|e| e.to_string()))
        .and_then(|words| Machine::with_program(&words).map_err(|e| e.to_string()))
        .and_then(|mut m| {
            m.run_limited(1000).map_err(|e| e.to_string())?;
            Ok(m)
        });
    match result {
        Ok(m) if m.is_halted() && m.ram.read(Address::new(256)).bits() == 15 => {
            println!("✓");
            passed += 1;
        }
        Ok(m) => {
            println!("✗ (got {}, expected 15)", m.ram.read(Address::new(256)).bits());
            failed += 1;
        }
        Err(e) => {
            println!("✗ ({})", e);
            failed += 1;
        }
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

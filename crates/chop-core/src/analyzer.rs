//! # Bytecode Analyzer
//!
//! Single-pass disassembly into instructions and basic blocks. Blocks are
//! derived purely from the byte sequence; gas and stack figures are static
//! annotations (dynamic costs excluded). The UI consumes blocks, never the
//! raw PC stream.

use chop_evm::{Opcode, OPCODE_GAS};
use chop_types::Bytes;
use std::collections::BTreeSet;

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the opcode.
    pub pc: u16,
    /// Raw opcode byte.
    pub opcode: u8,
    /// Assembly mnemonic; unknown bytes render as `UNKNOWN(0x..)`.
    pub mnemonic: String,
    /// Immediate bytes (PUSH1..PUSH32 only; zero-padded when the code is
    /// truncated mid-immediate).
    pub immediate_bytes: Bytes,
    /// True if this instruction is a JUMPDEST.
    pub is_jumpdest: bool,
}

/// A maximal straight-line instruction sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// PC of the first instruction.
    pub begin_pc: u16,
    /// PC of the last instruction.
    pub end_pc: u16,
    /// Sum of static base costs for the block's opcodes.
    pub gas_cost: u64,
    /// Stack items the block needs on entry.
    pub stack_req: u16,
    /// Maximum net stack growth at any point in the block.
    pub stack_max_growth: u16,
    /// Index range into the flat instruction list.
    pub first_instruction: usize,
    /// Number of instructions in the block.
    pub instruction_count: usize,
}

/// Full analysis of one byte sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeAnalysis {
    /// The analyzed code.
    pub code: Bytes,
    /// Original byte count.
    pub code_len: usize,
    /// PCs of every JUMPDEST opcode (PUSH immediates excluded).
    pub jump_dests: BTreeSet<u16>,
    /// Instruction index to source PC.
    pub inst_to_pc: Vec<u16>,
    /// Decoded instructions, in PC order.
    pub instructions: Vec<Instruction>,
    /// Basic blocks over the instructions.
    pub basic_blocks: Vec<BasicBlock>,
}

/// Result handed to the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisassemblyResult {
    /// The analysis.
    pub analysis: CodeAnalysis,
}

/// Disassemble a byte sequence into instructions and basic blocks.
#[must_use]
pub fn disassemble(code: &[u8]) -> DisassemblyResult {
    let mut instructions = Vec::new();
    let mut inst_to_pc = Vec::new();
    let mut jump_dests = BTreeSet::new();

    let mut pc = 0usize;
    while pc < code.len() {
        let byte = code[pc];
        let opcode = Opcode::from_byte(byte);

        let (mnemonic, immediate_len, is_jumpdest) = match opcode {
            Some(op) => (
                op.mnemonic().to_string(),
                op.immediate_len(),
                op == Opcode::JumpDest,
            ),
            None => (format!("UNKNOWN(0x{byte:02X})"), 0, false),
        };

        if is_jumpdest {
            jump_dests.insert(pc as u16);
        }

        // Truncated immediates are zero-padded; the instruction still
        // decodes and code_len keeps the original count.
        let mut immediate = vec![0u8; immediate_len];
        let available = code.len().saturating_sub(pc + 1).min(immediate_len);
        immediate[..available].copy_from_slice(&code[pc + 1..pc + 1 + available]);

        inst_to_pc.push(pc as u16);
        instructions.push(Instruction {
            pc: pc as u16,
            opcode: byte,
            mnemonic,
            immediate_bytes: Bytes::from_vec(immediate),
            is_jumpdest,
        });

        pc += 1 + immediate_len;
    }

    let basic_blocks = partition_blocks(&instructions);

    DisassemblyResult {
        analysis: CodeAnalysis {
            code: Bytes::from_slice(code),
            code_len: code.len(),
            jump_dests,
            inst_to_pc,
            instructions,
            basic_blocks,
        },
    }
}

/// Split instructions into basic blocks: a block starts at pc 0, at every
/// JUMPDEST, and right after any control-flow-ending opcode.
fn partition_blocks(instructions: &[Instruction]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut start = 0usize;

    for (i, inst) in instructions.iter().enumerate() {
        let opcode = Opcode::from_byte(inst.opcode);
        let ends_here = opcode.is_some_and(|op| op.ends_basic_block());
        let next_starts_block = instructions
            .get(i + 1)
            .is_some_and(|next| next.is_jumpdest);

        if ends_here || next_starts_block || i + 1 == instructions.len() {
            blocks.push(annotate_block(instructions, start, i));
            start = i + 1;
        }
    }

    blocks
}

fn annotate_block(instructions: &[Instruction], first: usize, last: usize) -> BasicBlock {
    let slice = &instructions[first..=last];

    let mut gas_cost = 0u64;
    let mut net: i64 = 0;
    let mut req: i64 = 0;
    let mut max_growth: i64 = 0;

    for inst in slice {
        gas_cost += OPCODE_GAS[inst.opcode as usize];
        if let Some(op) = Opcode::from_byte(inst.opcode) {
            let pops = op.stack_pops() as i64;
            let pushes = op.stack_pushes() as i64;
            req = req.max(pops - net);
            net += pushes - pops;
            max_growth = max_growth.max(net);
        }
    }

    BasicBlock {
        begin_pc: slice[0].pc,
        end_pc: slice[slice.len() - 1].pc,
        gas_cost,
        stack_req: req.max(0) as u16,
        stack_max_growth: max_growth.max(0) as u16,
        first_instruction: first,
        instruction_count: slice.len(),
    }
}

// =============================================================================
// NAVIGATION HELPERS
// =============================================================================

/// The instructions of one block.
#[must_use]
pub fn instructions_for_block(result: &DisassemblyResult, block_index: usize) -> &[Instruction] {
    match result.analysis.basic_blocks.get(block_index) {
        Some(block) => {
            let end = block.first_instruction + block.instruction_count;
            &result.analysis.instructions[block.first_instruction..end]
        }
        None => &[],
    }
}

/// If the instruction under the cursor is a JUMP/JUMPI immediately preceded
/// by a PUSH, the pushed immediate is the jump target.
#[must_use]
pub fn jump_destination(instructions: &[Instruction], cursor: usize) -> Option<u16> {
    let inst = instructions.get(cursor)?;
    let op = Opcode::from_byte(inst.opcode)?;
    if !matches!(op, Opcode::Jump | Opcode::JumpI) {
        return None;
    }

    let prev = instructions.get(cursor.checked_sub(1)?)?;
    let prev_op = Opcode::from_byte(prev.opcode)?;
    if !prev_op.is_push() || prev.immediate_bytes.is_empty() {
        return None;
    }
    // Immediates longer than two bytes cannot address 16-bit PCs.
    let bytes = prev.immediate_bytes.as_slice();
    let mut target: u32 = 0;
    for &byte in bytes {
        target = (target << 8) | u32::from(byte);
        if target > u32::from(u16::MAX) {
            return None;
        }
    }
    Some(target as u16)
}

/// Index of the block whose PC range contains `pc`, if any.
#[must_use]
pub fn block_containing_pc(analysis: &CodeAnalysis, pc: u16) -> Option<usize> {
    analysis
        .basic_blocks
        .iter()
        .position(|block| block.begin_pc <= pc && pc <= block.end_pc)
}

/// Index of the instruction whose pc matches exactly, if any.
#[must_use]
pub fn instruction_index_by_pc(instructions: &[Instruction], pc: u16) -> Option<usize> {
    instructions.iter().position(|inst| inst.pc == pc)
}

// =============================================================================
// TESTS
// =============================================================================

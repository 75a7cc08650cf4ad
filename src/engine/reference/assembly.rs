//! Stack program assembler.
//!
//! Source is whitespace separated: `begin <block> end`, where a block is any mix of
//! operations and `repeat.N <block> end`. `#` starts a comment that runs to the end
//! of the line.

use crate::engine::reference::field::MODULUS;
use crate::engine::reference::merkle::Blake2sDigest;
use blake2::{Blake2s256, Digest};
use std::collections::HashMap;
use thiserror::Error;

/// Deepest element `dup.K` may copy
pub const MAX_DUP_INDEX: u64 = 7;
pub const MAX_REPEAT: u64 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Noop = 0,
    Push = 1,
    Drop = 2,
    Dup = 3,
    Swap = 4,
    Add = 5,
    Sub = 6,
    Mul = 7,
    AdvPush = 8,
}

impl OpCode {
    const ALL: [OpCode; 9] = [
        OpCode::Noop,
        OpCode::Push,
        OpCode::Drop,
        OpCode::Dup,
        OpCode::Swap,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::AdvPush,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Noop => "noop",
            OpCode::Push => "push",
            OpCode::Drop => "drop",
            OpCode::Dup => "dup",
            OpCode::Swap => "swap",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::AdvPush => "adv.push",
        }
    }

    /// Change in stack depth caused by the operation
    pub fn depth_delta(self) -> i64 {
        match self {
            OpCode::Noop | OpCode::Swap => 0,
            OpCode::Push | OpCode::Dup | OpCode::AdvPush => 1,
            OpCode::Drop | OpCode::Add | OpCode::Sub | OpCode::Mul => -1,
        }
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u64 == value)
    }

    fn takes_immediate(self) -> bool {
        matches!(self, OpCode::Push | OpCode::Dup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    pub code: OpCode,
    /// Pushed value for `push`, stack index for `dup`
    pub immediate: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Op(Op),
    Repeat { count: u64, body: Vec<Instruction> },
}

/// An assembled program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    body: Vec<Instruction>,
    hash: Blake2sDigest,
}

impl Program {
    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    /// BLAKE2s-256 over the canonical instruction encoding
    pub fn hash(&self) -> Blake2sDigest {
        self.hash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("program must start with 'begin'")]
    MissingBegin,

    #[error("unexpected end of program: {0} block(s) not closed")]
    UnterminatedBlock(usize),

    #[error("unknown instruction '{token}' at token {position}")]
    UnknownInstruction { token: String, position: usize },

    #[error("invalid immediate in '{token}' at token {position}: {reason}")]
    InvalidImmediate {
        token: String,
        position: usize,
        reason: String,
    },

    #[error("empty repeat block at token {position}")]
    EmptyBlock { position: usize },

    #[error("unexpected '{token}' after the end of the program")]
    TrailingTokens { token: String },
}

/// Mnemonic table built once per process
#[derive(Debug, Clone)]
pub struct InstructionSet {
    mnemonics: HashMap<&'static str, OpCode>,
}

impl InstructionSet {
    pub fn standard() -> Self {
        let mnemonics = OpCode::ALL
            .iter()
            .map(|op| (op.mnemonic(), *op))
            .collect();
        Self { mnemonics }
    }

    pub fn len(&self) -> usize {
        self.mnemonics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mnemonics.is_empty()
    }

    pub fn assemble(&self, source: &str) -> Result<Program, AssemblyError> {
        let tokens: Vec<&str> = source
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(str::split_whitespace)
            .collect();

        let mut cursor = 0;
        match tokens.first() {
            Some(&"begin") => cursor += 1,
            _ => return Err(AssemblyError::MissingBegin),
        }

        let body = self.parse_block(&tokens, &mut cursor, 1)?;
        if let Some(token) = tokens.get(cursor) {
            return Err(AssemblyError::TrailingTokens {
                token: token.to_string(),
            });
        }

        let hash = program_hash(&body);
        Ok(Program { body, hash })
    }

    /// Parse until the matching `end`, consuming it.
    fn parse_block(
        &self,
        tokens: &[&str],
        cursor: &mut usize,
        depth: usize,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let mut block = Vec::new();
        loop {
            let position = *cursor;
            let token = match tokens.get(position) {
                Some(token) => *token,
                None => return Err(AssemblyError::UnterminatedBlock(depth)),
            };
            *cursor += 1;

            if token == "end" {
                return Ok(block);
            }

            if let Some(count) = token.strip_prefix("repeat.") {
                let count = parse_immediate(token, count, position)?;
                if count == 0 || count > MAX_REPEAT {
                    return Err(AssemblyError::InvalidImmediate {
                        token: token.to_string(),
                        position,
                        reason: format!("repeat count must be between 1 and {}", MAX_REPEAT),
                    });
                }
                let body = self.parse_block(tokens, cursor, depth + 1)?;
                // An empty body would loop without ever reaching the cycle limit.
                if body.is_empty() {
                    return Err(AssemblyError::EmptyBlock { position });
                }
                block.push(Instruction::Repeat { count, body });
                continue;
            }

            block.push(Instruction::Op(self.parse_op(token, position)?));
        }
    }

    fn parse_op(&self, token: &str, position: usize) -> Result<Op, AssemblyError> {
        if let Some(&code) = self.mnemonics.get(token) {
            return match code {
                OpCode::Push => Err(AssemblyError::InvalidImmediate {
                    token: token.to_string(),
                    position,
                    reason: "push needs a value, e.g. push.1".to_string(),
                }),
                _ => Ok(Op { code, immediate: 0 }),
            };
        }

        let (name, immediate) = token.split_once('.').ok_or_else(|| unknown(token, position))?;
        let code = match self.mnemonics.get(name) {
            Some(&code) if code.takes_immediate() => code,
            _ => return Err(unknown(token, position)),
        };
        let immediate = parse_immediate(token, immediate, position)?;

        let limit = match code {
            OpCode::Dup => MAX_DUP_INDEX,
            _ => MODULUS - 1,
        };
        if immediate > limit {
            return Err(AssemblyError::InvalidImmediate {
                token: token.to_string(),
                position,
                reason: format!("value must be at most {}", limit),
            });
        }

        Ok(Op { code, immediate })
    }
}

fn unknown(token: &str, position: usize) -> AssemblyError {
    AssemblyError::UnknownInstruction {
        token: token.to_string(),
        position,
    }
}

fn parse_immediate(token: &str, value: &str, position: usize) -> Result<u64, AssemblyError> {
    value
        .parse::<u64>()
        .map_err(|e| AssemblyError::InvalidImmediate {
            token: token.to_string(),
            position,
            reason: e.to_string(),
        })
}

const REPEAT_OPEN: u8 = 0xFF;
const REPEAT_CLOSE: u8 = 0xFE;

fn program_hash(body: &[Instruction]) -> Blake2sDigest {
    fn encode(body: &[Instruction], hasher: &mut Blake2s256) {
        for instruction in body {
            match instruction {
                Instruction::Op(op) => {
                    hasher.update([op.code as u8]);
                    hasher.update(op.immediate.to_le_bytes());
                }
                Instruction::Repeat { count, body } => {
                    hasher.update([REPEAT_OPEN]);
                    hasher.update(count.to_le_bytes());
                    encode(body, hasher);
                    hasher.update([REPEAT_CLOSE]);
                }
            }
        }
    }

    let mut hasher = Blake2s256::new();
    hasher.update(b"starkline-program");
    encode(body, &mut hasher);
    hasher.finalize().into()
}

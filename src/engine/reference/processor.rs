//! Program execution and trace construction.
//!
//! The operand stack is a `Vec` with the top at the end. `stack_init` is loaded as
//! given, so its last element starts on top.
//!
//! Trace rows are `[clk, opcode, depth, s0..s7]` with `s0` the top of the stack and
//! missing positions zero. Row 0 records the initial state under a `noop`; every
//! executed operation appends the state after it. The trace is then padded with
//! `noop` rows to a power of two.

use crate::engine::reference::assembly::{Instruction, Op, OpCode, Program};
use crate::engine::reference::field::Felt;
use thiserror::Error;

pub const STACK_COLUMNS: usize = 8;
pub const TRACE_WIDTH: usize = 3 + STACK_COLUMNS;
pub const MIN_TRACE_LENGTH: usize = 8;
pub const MAX_CYCLES: usize = 1 << 20;

pub const CLK_COLUMN: usize = 0;
pub const OPCODE_COLUMN: usize = 1;
pub const DEPTH_COLUMN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("stack underflow at cycle {cycle}: {op} needs {needed} element(s), found {depth}")]
    StackUnderflow {
        cycle: usize,
        op: &'static str,
        needed: usize,
        depth: usize,
    },

    #[error("advice tape exhausted at cycle {cycle}")]
    AdviceExhausted { cycle: usize },

    #[error("{what} value {value} is not a field element")]
    NonCanonicalInput { what: &'static str, value: u64 },

    #[error("execution exceeded {} cycles", MAX_CYCLES)]
    CycleLimit,
}

/// Result of running a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Padded trace
    pub trace: Vec<Vec<u64>>,
    /// Final stack, top first
    pub stack: Vec<u64>,
    /// Executed operations, excluding the initial row and padding
    pub cycles: usize,
}

struct Processor<'a> {
    stack: Vec<Felt>,
    advice: std::slice::Iter<'a, u64>,
    trace: Vec<Vec<u64>>,
}

pub fn execute(
    program: &Program,
    stack_init: &[u64],
    advice_tape: &[u64],
) -> Result<Execution, ExecutionError> {
    let stack = canonical(stack_init, "stack input")?;
    canonical(advice_tape, "advice")?;

    let mut processor = Processor {
        stack,
        advice: advice_tape.iter(),
        trace: Vec::new(),
    };
    processor.record(OpCode::Noop);
    processor.run(program.body())?;

    let cycles = processor.trace.len() - 1;
    let Processor {
        stack, mut trace, ..
    } = processor;

    let padded = trace.len().next_power_of_two().max(MIN_TRACE_LENGTH);
    let mut last = trace[trace.len() - 1].clone();
    last[OPCODE_COLUMN] = OpCode::Noop as u64;
    while trace.len() < padded {
        last[CLK_COLUMN] = trace.len() as u64;
        trace.push(last.clone());
    }

    Ok(Execution {
        trace,
        stack: stack.iter().rev().map(|felt| felt.as_u64()).collect(),
        cycles,
    })
}

fn canonical(values: &[u64], what: &'static str) -> Result<Vec<Felt>, ExecutionError> {
    values
        .iter()
        .map(|&value| {
            Felt::try_canonical(value).ok_or(ExecutionError::NonCanonicalInput { what, value })
        })
        .collect()
}

impl<'a> Processor<'a> {
    fn run(&mut self, body: &[Instruction]) -> Result<(), ExecutionError> {
        for instruction in body {
            match instruction {
                Instruction::Op(op) => self.step(*op)?,
                Instruction::Repeat { count, body } => {
                    for _ in 0..*count {
                        self.run(body)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn cycle(&self) -> usize {
        self.trace.len()
    }

    fn require(&self, op: OpCode, needed: usize) -> Result<(), ExecutionError> {
        if self.stack.len() < needed {
            return Err(ExecutionError::StackUnderflow {
                cycle: self.cycle(),
                op: op.mnemonic(),
                needed,
                depth: self.stack.len(),
            });
        }
        Ok(())
    }

    fn pop2(&mut self) -> (Felt, Felt) {
        // Callers check depth first.
        let b = self.stack.pop().unwrap_or_default();
        let a = self.stack.pop().unwrap_or_default();
        (a, b)
    }

    fn step(&mut self, op: Op) -> Result<(), ExecutionError> {
        if self.cycle() > MAX_CYCLES {
            return Err(ExecutionError::CycleLimit);
        }

        match op.code {
            OpCode::Noop => {}
            OpCode::Push => self.stack.push(Felt::new(op.immediate)),
            OpCode::Drop => {
                self.require(op.code, 1)?;
                self.stack.pop();
            }
            OpCode::Dup => {
                let index = op.immediate as usize;
                self.require(op.code, index + 1)?;
                let value = self.stack[self.stack.len() - 1 - index];
                self.stack.push(value);
            }
            OpCode::Swap => {
                self.require(op.code, 2)?;
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul => {
                self.require(op.code, 2)?;
                let (a, b) = self.pop2();
                let result = match op.code {
                    OpCode::Add => a + b,
                    OpCode::Sub => a - b,
                    _ => a * b,
                };
                self.stack.push(result);
            }
            OpCode::AdvPush => {
                let value = self
                    .advice
                    .next()
                    .ok_or(ExecutionError::AdviceExhausted {
                        cycle: self.cycle(),
                    })?;
                self.stack.push(Felt::new(*value));
            }
        }

        self.record(op.code);
        Ok(())
    }

    fn record(&mut self, op: OpCode) {
        let mut row = Vec::with_capacity(TRACE_WIDTH);
        row.push(self.cycle() as u64);
        row.push(op as u64);
        row.push(self.stack.len() as u64);
        row.extend(
            self.stack
                .iter()
                .rev()
                .map(|felt| felt.as_u64())
                .chain(std::iter::repeat(0))
                .take(STACK_COLUMNS),
        );
        self.trace.push(row);
    }
}

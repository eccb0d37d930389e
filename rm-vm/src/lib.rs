//! Reference simulator for the rm-codegen target machine.
//!
//! Eight registers of unbounded non-negative integers, a cell memory
//! addressed through register `A`, a read-once input stream, and an output
//! log.  `SUB` and `DEC` saturate at zero, `HALF` floors.  Uninitialized
//! memory cells read as zero.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rm_codegen::backend::abi::Register;
use rm_codegen::backend::instruction::{AsmItem, MachineInstr};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("jump to unknown label `{0}`")]
    UnknownLabel(String),

    #[error("GET with exhausted input")]
    InputExhausted,

    #[error("step budget of {0} instructions exhausted")]
    StepLimit(u64),
}

pub struct Machine {
    regs: [BigUint; 8],
    mem: BTreeMap<BigUint, BigUint>,
    input: VecDeque<BigUint>,
    pub output: Vec<BigUint>,
    step_limit: u64,
}

impl Machine {
    pub fn new(input: Vec<BigUint>) -> Self {
        Machine {
            regs: Default::default(),
            mem: BTreeMap::new(),
            input: input.into(),
            output: Vec::new(),
            step_limit: 10_000_000,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn reg(&self, r: Register) -> &BigUint {
        &self.regs[r.index()]
    }

    pub fn cell(&self, addr: u64) -> BigUint {
        self.mem.get(&BigUint::from(addr)).cloned().unwrap_or_default()
    }

    /// Execute an assembly stream from its first instruction until `HALT`
    /// or until control falls off the end.
    pub fn run(&mut self, items: &[AsmItem]) -> Result<(), MachineError> {
        let mut prog: Vec<&MachineInstr> = Vec::new();
        let mut labels: HashMap<&str, usize> = HashMap::new();
        for item in items {
            match item {
                AsmItem::Label(name) => {
                    labels.insert(name.as_str(), prog.len());
                }
                AsmItem::Instr { instr, .. } => prog.push(instr),
                AsmItem::Comment(_) => {}
            }
        }

        let resolve = |label: &str| -> Result<usize, MachineError> {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| MachineError::UnknownLabel(label.to_string()))
        };

        let mut pc = 0usize;
        let mut steps = 0u64;
        while pc < prog.len() {
            steps += 1;
            if steps > self.step_limit {
                return Err(MachineError::StepLimit(self.step_limit));
            }
            match prog[pc] {
                MachineInstr::Get(r) => {
                    let v = self.input.pop_front().ok_or(MachineError::InputExhausted)?;
                    self.regs[r.index()] = v;
                }
                MachineInstr::Put(r) => {
                    self.output.push(self.regs[r.index()].clone());
                }
                MachineInstr::Load(r) => {
                    let addr = self.regs[Register::A.index()].clone();
                    self.regs[r.index()] = self.mem.get(&addr).cloned().unwrap_or_default();
                }
                MachineInstr::Store(r) => {
                    let addr = self.regs[Register::A.index()].clone();
                    self.mem.insert(addr, self.regs[r.index()].clone());
                }
                MachineInstr::Copy { d, s } => {
                    self.regs[d.index()] = self.regs[s.index()].clone();
                }
                MachineInstr::Add { d, s } => {
                    let v = self.regs[s.index()].clone();
                    self.regs[d.index()] += v;
                }
                MachineInstr::Sub { d, s } => {
                    let v = self.regs[s.index()].clone();
                    let dst = &mut self.regs[d.index()];
                    *dst = if *dst >= v { &*dst - &v } else { BigUint::zero() };
                }
                MachineInstr::Inc(r) => {
                    self.regs[r.index()] += BigUint::one();
                }
                MachineInstr::Dec(r) => {
                    let reg = &mut self.regs[r.index()];
                    if !reg.is_zero() {
                        *reg -= BigUint::one();
                    }
                }
                MachineInstr::Half(r) => {
                    self.regs[r.index()] >>= 1;
                }
                MachineInstr::Jump(label) => {
                    pc = resolve(label)?;
                    continue;
                }
                MachineInstr::Jzero(r, label) => {
                    if self.regs[r.index()].is_zero() {
                        pc = resolve(label)?;
                        continue;
                    }
                }
                MachineInstr::Jodd(r, label) => {
                    if self.regs[r.index()].bit(0) {
                        pc = resolve(label)?;
                        continue;
                    }
                }
                MachineInstr::Halt => return Ok(()),
            }
            pc += 1;
        }
        Ok(())
    }
}

/// Run an assembly stream against a numeric input, returning the output.
pub fn run_program(items: &[AsmItem], input: &[u64]) -> Result<Vec<BigUint>, MachineError> {
    let mut machine = Machine::new(input.iter().map(|&n| BigUint::from(n)).collect());
    machine.run(items)?;
    Ok(machine.output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(i: MachineInstr) -> AsmItem {
        AsmItem::Instr { instr: i, comment: None }
    }

    #[test]
    fn sub_saturates_at_zero() {
        let items = vec![
            instr(MachineInstr::Get(Register::B)),
            instr(MachineInstr::Get(Register::C)),
            instr(MachineInstr::Sub { d: Register::B, s: Register::C }),
            instr(MachineInstr::Put(Register::B)),
            instr(MachineInstr::Halt),
        ];
        assert_eq!(run_program(&items, &[3, 5]).unwrap(), vec![BigUint::zero()]);
        assert_eq!(
            run_program(&items, &[5, 3]).unwrap(),
            vec![BigUint::from(2u32)]
        );
    }

    #[test]
    fn load_and_store_go_through_a() {
        let items = vec![
            instr(MachineInstr::Get(Register::B)),
            // A = 2
            instr(MachineInstr::Sub { d: Register::A, s: Register::A }),
            instr(MachineInstr::Inc(Register::A)),
            instr(MachineInstr::Inc(Register::A)),
            instr(MachineInstr::Store(Register::B)),
            instr(MachineInstr::Load(Register::C)),
            instr(MachineInstr::Put(Register::C)),
            instr(MachineInstr::Halt),
        ];
        assert_eq!(
            run_program(&items, &[42]).unwrap(),
            vec![BigUint::from(42u32)]
        );
    }

    #[test]
    fn jodd_tests_the_low_bit() {
        let items = vec![
            instr(MachineInstr::Get(Register::B)),
            instr(MachineInstr::Jodd(Register::B, "odd".into())),
            instr(MachineInstr::Sub { d: Register::B, s: Register::B }),
            AsmItem::Label("odd".into()),
            instr(MachineInstr::Put(Register::B)),
            instr(MachineInstr::Halt),
        ];
        assert_eq!(
            run_program(&items, &[7]).unwrap(),
            vec![BigUint::from(7u32)]
        );
        assert_eq!(run_program(&items, &[8]).unwrap(), vec![BigUint::zero()]);
    }

    #[test]
    fn runaway_loops_hit_the_step_limit() {
        let items = vec![
            AsmItem::Label("spin".into()),
            instr(MachineInstr::Jump("spin".into())),
        ];
        let mut machine = Machine::new(Vec::new()).with_step_limit(1000);
        assert_eq!(machine.run(&items), Err(MachineError::StepLimit(1000)));
    }

    #[test]
    fn unknown_label_is_an_error() {
        let items = vec![instr(MachineInstr::Jump("nowhere".into()))];
        let mut machine = Machine::new(Vec::new());
        assert_eq!(
            machine.run(&items),
            Err(MachineError::UnknownLabel("nowhere".to_string()))
        );
    }
}

//! Block-level liveness and dominator analyses.
//!
//! Computes per-block live-out sets by iterative backward dataflow and
//! per-block dominator sets by the standard forward intersection fixpoint.
//! The emitter consumes the results as read-only maps; only live-out is
//! needed today, dominators are computed alongside for later refinement.

use crate::ir::{IrInstr, Place, Program};
use std::collections::{HashMap, HashSet};

/// The precomputed analysis maps the code generator takes as input.
#[derive(Debug, Clone, Default)]
pub struct Analyses {
    /// For each block, the places some successor may still read.
    pub live_out: HashMap<String, HashSet<Place>>,
    /// For each block, the blocks on every entry path to it (including
    /// itself).
    pub dominators: HashMap<String, HashSet<String>>,
}

impl Analyses {
    pub fn compute(program: &Program) -> Self {
        Analyses {
            live_out: compute_live_out(program),
            dominators: compute_dominators(program),
        }
    }
}

// ── Instruction-level use/def extraction ────────────────────────────────

/// Places read by an instruction.
fn uses(instr: &IrInstr) -> Vec<Place> {
    let mut out = Vec::new();
    let mut add = |op: &crate::ir::Operand| {
        if let Some(p) = op.place() {
            out.push(p);
        }
    };
    match instr {
        IrInstr::Get { .. } | IrInstr::Jump { .. } | IrInstr::Halt => {}
        IrInstr::Put { src } => add(src),
        IrInstr::Move { src, .. } => add(src),
        IrInstr::IndexedLoad { index, .. } => add(index),
        IrInstr::IndexedStore { src, index, .. } => {
            add(src);
            add(index);
        }
        IrInstr::Add { left, right, .. }
        | IrInstr::Sub { left, right, .. }
        | IrInstr::Mul { left, right, .. }
        | IrInstr::Div { left, right, .. }
        | IrInstr::Rem { left, right, .. }
        | IrInstr::JumpIf { left, right, .. } => {
            add(left);
            add(right);
        }
    }
    out
}

/// The place written by an instruction, if any.
fn def(instr: &IrInstr) -> Option<Place> {
    match instr {
        IrInstr::Get { dst }
        | IrInstr::Move { dst, .. }
        | IrInstr::IndexedLoad { dst, .. }
        | IrInstr::Add { dst, .. }
        | IrInstr::Sub { dst, .. }
        | IrInstr::Mul { dst, .. }
        | IrInstr::Div { dst, .. }
        | IrInstr::Rem { dst, .. } => dst.place(),
        _ => None,
    }
}

fn successors(instrs: &[IrInstr]) -> Vec<&str> {
    instrs
        .iter()
        .flat_map(|i| i.branch_targets())
        .collect()
}

// ── Liveness ────────────────────────────────────────────────────────────

pub fn compute_live_out(program: &Program) -> HashMap<String, HashSet<Place>> {
    let n = program.blocks.len();

    // gen = read before any write in the block, kill = written.
    let mut gen_sets: Vec<HashSet<Place>> = vec![HashSet::new(); n];
    let mut kill_sets: Vec<HashSet<Place>> = vec![HashSet::new(); n];
    for (bi, block) in program.blocks.iter().enumerate() {
        for instr in &block.instrs {
            for p in uses(instr) {
                if !kill_sets[bi].contains(&p) {
                    gen_sets[bi].insert(p);
                }
            }
            if let Some(p) = def(instr) {
                kill_sets[bi].insert(p);
            }
        }
    }

    let index_of: HashMap<&str, usize> = program
        .blocks
        .iter()
        .enumerate()
        .map(|(bi, b)| (b.name.as_str(), bi))
        .collect();
    let succs: Vec<Vec<usize>> = program
        .blocks
        .iter()
        .map(|b| {
            successors(&b.instrs)
                .into_iter()
                .filter_map(|name| index_of.get(name).copied())
                .collect()
        })
        .collect();

    let mut live_in: Vec<HashSet<Place>> = vec![HashSet::new(); n];
    let mut live_out: Vec<HashSet<Place>> = vec![HashSet::new(); n];
    let mut changed = true;
    while changed {
        changed = false;
        for bi in (0..n).rev() {
            let mut new_out: HashSet<Place> = HashSet::new();
            for &s in &succs[bi] {
                new_out.extend(live_in[s].iter().cloned());
            }
            let mut new_in = gen_sets[bi].clone();
            for p in &new_out {
                if !kill_sets[bi].contains(p) {
                    new_in.insert(p.clone());
                }
            }
            if new_in != live_in[bi] || new_out != live_out[bi] {
                changed = true;
                live_in[bi] = new_in;
                live_out[bi] = new_out;
            }
        }
    }

    program
        .blocks
        .iter()
        .enumerate()
        .map(|(bi, b)| (b.name.clone(), live_out[bi].clone()))
        .collect()
}

// ── Dominators ──────────────────────────────────────────────────────────

pub fn compute_dominators(program: &Program) -> HashMap<String, HashSet<String>> {
    let n = program.blocks.len();
    if n == 0 {
        return HashMap::new();
    }

    let index_of: HashMap<&str, usize> = program
        .blocks
        .iter()
        .enumerate()
        .map(|(bi, b)| (b.name.as_str(), bi))
        .collect();
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (bi, block) in program.blocks.iter().enumerate() {
        for name in successors(&block.instrs) {
            if let Some(&s) = index_of.get(name) {
                preds[s].push(bi);
            }
        }
    }

    let all: HashSet<usize> = (0..n).collect();
    let mut dom: Vec<HashSet<usize>> = vec![all; n];
    dom[0] = HashSet::from([0]);

    let mut changed = true;
    while changed {
        changed = false;
        for bi in 1..n {
            let mut new_dom: Option<HashSet<usize>> = None;
            for &p in &preds[bi] {
                new_dom = Some(match new_dom {
                    None => dom[p].clone(),
                    Some(acc) => acc.intersection(&dom[p]).copied().collect(),
                });
            }
            let mut new_dom = new_dom.unwrap_or_default();
            new_dom.insert(bi);
            if new_dom != dom[bi] {
                changed = true;
                dom[bi] = new_dom;
            }
        }
    }

    program
        .blocks
        .iter()
        .enumerate()
        .map(|(bi, b)| {
            let names = dom[bi]
                .iter()
                .map(|&d| program.blocks[d].name.clone())
                .collect();
            (b.name.clone(), names)
        })
        .collect()
}

#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ripple_cpu_core::{interp, CpuState};
use ripple_jit_ppc::exec::{run, HostState};
use ripple_jit_ppc::{translate, JitOptions};
use ripple_ppc::Instruction;

/// Run `words` through translate-and-execute and through the interpreter;
/// the final guest states must agree bit for bit.
pub fn assert_block_matches(words: &[u32], opts: JitOptions, init: &CpuState) {
    let block: Vec<Instruction> = words.iter().copied().map(Instruction).collect();
    let prog = translate(&block, opts).expect("block must translate");
    let mut jit = init.clone();
    let mut host = HostState::new(opts.host_denormals_native);
    run(&prog, &mut host, &mut jit).expect("translated block must execute");

    let mut reference = init.clone();
    for &inst in &block {
        interp::execute(&mut reference, inst).expect("reference must cover the block");
    }
    assert_eq!(jit, reference, "block {words:08X?}");
}

pub fn assert_matches(words: &[u32], init: &CpuState) {
    assert_block_matches(words, JitOptions::default(), init);
}

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

const EDGES: [u32; 8] = [
    0,
    1,
    2,
    0x7FFF_FFFF,
    0x8000_0000,
    0x8000_0001,
    0xFFFF_FFFE,
    0xFFFF_FFFF,
];

pub fn edge_or_random(rng: &mut ChaCha8Rng) -> u32 {
    if rng.gen_bool(0.3) {
        EDGES[rng.gen_range(0..EDGES.len())]
    } else {
        rng.gen()
    }
}

/// Integer register file seeded with boundary values sprinkled in.
pub fn random_int_state(rng: &mut ChaCha8Rng) -> CpuState {
    let mut state = CpuState::new();
    for r in state.gpr.iter_mut() {
        *r = edge_or_random(rng);
    }
    state.xer_ca = rng.gen();
    state
}

/// Both lanes of `fr` set to the same double.
pub fn set_double(state: &mut CpuState, fr: usize, value: f64) {
    state.fpr[fr] = [value.to_bits(), value.to_bits()];
}

/// Lanes of `fr` set to two singles, stored widened as the guest does.
pub fn set_singles(state: &mut CpuState, fr: usize, ps0: f32, ps1: f32) {
    state.fpr[fr] = [(ps0 as f64).to_bits(), (ps1 as f64).to_bits()];
}

/// A double whose mantissa is short enough that narrowing it to single
/// is exact, so single-precision fused multiply-adds cannot double-round.
pub fn exact_single(rng: &mut ChaCha8Rng) -> f64 {
    let mantissa = rng.gen_range(-4096i32..4096);
    let exp = rng.gen_range(-8i32..8);
    mantissa as f64 * (exp as f64).exp2()
}

/// An arbitrary finite double, biased toward values that exercise the
/// single-precision range boundaries when narrowed.
pub fn finite_double(rng: &mut ChaCha8Rng) -> f64 {
    loop {
        let v = f64::from_bits(rng.gen());
        if v.is_finite() {
            return v;
        }
    }
}

//! The block transition circuit.
//!
//! Every 32-byte value enters the circuit as eight range-checked big-endian
//! `u32` limbs, and 64/256-bit integers as little-endian `u32` limbs. The
//! circuit enforces `block_number == prev_block_number + 1` and exposes
//!
//! | index    | public input                          |
//! |----------|---------------------------------------|
//! | 0        | previous block number                 |
//! | 1        | block number                          |
//! | 2..10    | previous state root                   |
//! | 10..18   | new state root                        |
//! | 18..26   | block commitment                      |
//! | 26..30   | Poseidon digest of every witness limb |
use plonky2::field::types::Field;
use plonky2::hash::poseidon::PoseidonHash;
use plonky2::iop::target::Target;
use plonky2::iop::witness::{PartialWitness, WitnessWrite};
use plonky2::plonk::circuit_builder::CircuitBuilder;
use plonky2::plonk::circuit_data::{CircuitConfig, CircuitData};
use plonky2::plonk::config::{GenericConfig, PoseidonGoldilocksConfig};

use crate::witness::{hash_limbs, u64_limbs, BlockWitness};

/// Bumped whenever the constraint system changes, so stale keys are easy to
/// tell apart in logs.
pub const CIRCUIT_NAME: &str = "block-transition-v1";

pub const D: usize = 2;
pub type C = PoseidonGoldilocksConfig;
pub type F = <C as GenericConfig<D>>::F;

const LIMB_BITS: usize = 32;
const HASH_LIMBS: usize = 8;

pub const BLOCK_NUMBER_INDEX: usize = 1;
pub const NUM_PUBLIC_INPUTS: usize = 2 + 3 * HASH_LIMBS + 4;

/// Targets of the block transition circuit, in allocation order.
#[derive(Debug)]
pub struct BlockCircuit {
    prev_block_number: Target,
    block_number: Target,
    prev_state_root: [Target; HASH_LIMBS],
    prev_commitment: [Target; HASH_LIMBS],
    new_state_root: [Target; HASH_LIMBS],
    commitment: [Target; HASH_LIMBS],
    pending_onchain_operations_hash: [Target; HASH_LIMBS],
    public_data_hash: [Target; HASH_LIMBS],
    priority_operations: [Target; 2],
    timestamp: [Target; 8],
}

fn limbs<const N: usize>(builder: &mut CircuitBuilder<F, D>) -> [Target; N] {
    std::array::from_fn(|_| {
        let t = builder.add_virtual_target();
        builder.range_check(t, LIMB_BITS);
        t
    })
}

fn set_limbs(
    pw: &mut PartialWitness<F>,
    targets: &[Target],
    values: &[u32],
) -> anyhow::Result<()> {
    debug_assert_eq!(targets.len(), values.len());
    for (&t, &v) in targets.iter().zip(values) {
        pw.set_target(t, F::from_canonical_u32(v))?;
    }
    Ok(())
}

fn timestamp_limbs(witness: &BlockWitness) -> [u32; 8] {
    let mut out = [0u32; 8];
    for (pair, limb) in out
        .chunks_exact_mut(2)
        .zip(witness.header.timestamp.as_limbs())
    {
        pair.copy_from_slice(&u64_limbs(*limb));
    }
    out
}

impl BlockCircuit {
    /// Compiles the circuit. Deterministic: two builds yield the same
    /// circuit digest.
    pub fn build() -> (CircuitData<F, C, D>, Self) {
        let mut builder =
            CircuitBuilder::<F, D>::new(CircuitConfig::standard_recursion_config());

        let [prev_block_number, block_number] = limbs::<2>(&mut builder);
        let circuit = Self {
            prev_block_number,
            block_number,
            prev_state_root: limbs(&mut builder),
            prev_commitment: limbs(&mut builder),
            new_state_root: limbs(&mut builder),
            commitment: limbs(&mut builder),
            pending_onchain_operations_hash: limbs(&mut builder),
            public_data_hash: limbs(&mut builder),
            priority_operations: limbs(&mut builder),
            timestamp: limbs(&mut builder),
        };

        let one = builder.one();
        let successor = builder.add(circuit.prev_block_number, one);
        builder.connect(successor, circuit.block_number);

        builder.register_public_input(circuit.prev_block_number);
        builder.register_public_input(circuit.block_number);
        builder.register_public_inputs(&circuit.prev_state_root);
        builder.register_public_inputs(&circuit.new_state_root);
        builder.register_public_inputs(&circuit.commitment);

        let digest = builder.hash_n_to_hash_no_pad::<PoseidonHash>(circuit.all_targets());
        builder.register_public_inputs(&digest.elements);

        (builder.build::<C>(), circuit)
    }

    fn all_targets(&self) -> Vec<Target> {
        [self.prev_block_number, self.block_number]
            .into_iter()
            .chain(self.prev_state_root)
            .chain(self.prev_commitment)
            .chain(self.new_state_root)
            .chain(self.commitment)
            .chain(self.pending_onchain_operations_hash)
            .chain(self.public_data_hash)
            .chain(self.priority_operations)
            .chain(self.timestamp)
            .collect()
    }

    /// Assigns `witness` to the circuit's targets.
    ///
    /// Fails if `pw` already holds a different value for one of them.
    pub fn set_witness(
        &self,
        pw: &mut PartialWitness<F>,
        witness: &BlockWitness,
    ) -> anyhow::Result<()> {
        set_limbs(
            pw,
            &[self.prev_block_number, self.block_number],
            &[witness.previous.block_number, witness.header.block_number],
        )?;
        set_limbs(pw, &self.prev_state_root, &hash_limbs(&witness.previous.state_root))?;
        set_limbs(pw, &self.prev_commitment, &hash_limbs(&witness.previous.commitment))?;
        set_limbs(pw, &self.new_state_root, &hash_limbs(&witness.header.state_root))?;
        set_limbs(pw, &self.commitment, &hash_limbs(&witness.header.commitment))?;
        set_limbs(
            pw,
            &self.pending_onchain_operations_hash,
            &hash_limbs(&witness.header.pending_onchain_operations_hash),
        )?;
        set_limbs(pw, &self.public_data_hash, &hash_limbs(&witness.public_data_hash()))?;
        set_limbs(
            pw,
            &self.priority_operations,
            &u64_limbs(witness.header.priority_operations),
        )?;
        set_limbs(pw, &self.timestamp, &timestamp_limbs(witness))
    }
}

/// The public inputs a proof of `witness` must carry, digest excluded.
pub fn expected_public_inputs(witness: &BlockWitness) -> Vec<F> {
    [witness.previous.block_number, witness.header.block_number]
        .into_iter()
        .chain(hash_limbs(&witness.previous.state_root))
        .chain(hash_limbs(&witness.header.state_root))
        .chain(hash_limbs(&witness.header.commitment))
        .map(F::from_canonical_u32)
        .collect()
}

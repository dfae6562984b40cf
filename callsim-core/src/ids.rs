use uuid::Uuid;

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministically derive a UUID from a seed, domain, and counter.
///
/// Component keys are built from this so two simulations created with the
/// same [`crate::SimulationConfig`] hand out identical keys.
pub fn deterministic_uuid(seed: u64, domain: u64, counter: u64) -> Uuid {
    let x0 = seed ^ domain ^ counter;
    let lo = splitmix64(x0);
    let hi = splitmix64(x0.wrapping_add(0xD1B5_4A32_D192_ED03));
    Uuid::from_u128(((hi as u128) << 64) | (lo as u128))
}

/// Derive the seed of replication `index` from a base seed.
///
/// Plain offsetting keeps seeds readable in reports (`base + index`).
pub fn replication_seed(base: u64, index: u64) -> u64 {
    base.wrapping_add(index)
}

pub const UUID_DOMAIN_COMPONENT: u64 = 0x434F_4D50_4F4E_454E; // "COMPONEN" (tag)

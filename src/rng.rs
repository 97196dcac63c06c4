use rand::Rng;
use rand::rngs::ThreadRng;

const SEED_BASIS: u32 = 1_779_033_703;
const SEED_MUL: u32 = 3_432_918_353;
const FINAL_MUL_A: u32 = 2_246_822_507;
const FINAL_MUL_B: u32 = 3_266_489_909;
const COUNTER_STEP: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Source of uniform draws in `[0, 1)` used by every sampler in the crate.
pub trait UnitRng {
    fn next_unit(&mut self) -> f64;
}

impl<R: UnitRng + ?Sized> UnitRng for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Reproducible 32-bit counter generator.
///
/// The whole state is one `u32`, so two generators built from the same key
/// produce the same stream on every platform. Queries never share an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn from_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn from_key(key: &str) -> Self {
        Self::from_seed(seed_from_key(key))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(COUNTER_STEP);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }
}

impl UnitRng for SeededRng {
    fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

/// Builds the generator for a query key (player, stat, threshold, fitted params).
pub fn make_seeded_rng(key: &str) -> SeededRng {
    SeededRng::from_key(key)
}

/// Hashes a key into a 32-bit seed.
///
/// Characters are consumed as UTF-16 code units so keys containing non-ASCII
/// player names hash the same way the web client hashes them.
pub fn seed_from_key(key: &str) -> u32 {
    let units: Vec<u16> = key.encode_utf16().collect();
    let mut h = SEED_BASIS ^ units.len() as u32;
    for unit in units {
        h = (h ^ u32::from(unit)).wrapping_mul(SEED_MUL);
        h = h.rotate_left(13);
    }
    h = (h ^ (h >> 16)).wrapping_mul(FINAL_MUL_A);
    h = (h ^ (h >> 13)).wrapping_mul(FINAL_MUL_B);
    h ^ (h >> 16)
}

/// Non-reproducible draws backed by the thread-local OS-seeded generator.
pub struct EntropyRng(ThreadRng);

impl EntropyRng {
    pub fn new() -> Self {
        Self(rand::thread_rng())
    }
}

impl Default for EntropyRng {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRng for EntropyRng {
    fn next_unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// Adapts a plain closure (e.g. a scripted sequence in a test) into a [`UnitRng`].
pub struct FnRng<F>(pub F);

impl<F: FnMut() -> f64> UnitRng for FnRng<F> {
    fn next_unit(&mut self) -> f64 {
        (self.0)()
    }
}

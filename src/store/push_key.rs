//! Push-key minting for `append`.
//!
//! Keys are 20 characters: an 8-character millisecond timestamp prefix plus
//! a 12-character random tail, over a 64-character alphabet whose ASCII
//! order matches its index order. Keys therefore sort lexicographically in
//! mint order, and a mutex-guarded generator makes them collision-free even
//! under concurrent minting: same-millisecond mints increment the previous
//! tail instead of re-rolling it.

use rand::Rng;

/// Index order == ASCII order, so string comparison preserves mint order.
const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TAIL_LEN: usize = 12;
const PREFIX_LEN: usize = 8;

pub(crate) struct PushKeyGen {
    last_millis: u64,
    /// Alphabet indices (0..64) of the most recently minted tail.
    last_tail: [u8; TAIL_LEN],
}

impl PushKeyGen {
    pub(crate) fn new() -> Self {
        Self {
            last_millis: 0,
            last_tail: [0; TAIL_LEN],
        }
    }

    #[cfg(test)]
    fn with_state(last_millis: u64, last_tail: [u8; TAIL_LEN]) -> Self {
        Self {
            last_millis,
            last_tail,
        }
    }

    /// Mints the next key. `now_millis` is clamped so a clock step backwards
    /// cannot break the strictly-increasing guarantee.
    pub(crate) fn mint(&mut self, now_millis: u64) -> String {
        let mut millis = now_millis.max(self.last_millis);

        if millis == self.last_millis {
            if !increment(&mut self.last_tail) {
                // Tail exhausted within one millisecond; move to the next.
                millis += 1;
                self.reseed();
            }
        } else {
            self.reseed();
        }
        self.last_millis = millis;

        let mut key = String::with_capacity(PREFIX_LEN + TAIL_LEN);
        let mut rest = millis;
        let mut prefix = [0u8; PREFIX_LEN];
        for slot in prefix.iter_mut().rev() {
            *slot = (rest % 64) as u8;
            rest /= 64;
        }
        for idx in prefix {
            key.push(ALPHABET[idx as usize] as char);
        }
        for idx in self.last_tail {
            key.push(ALPHABET[idx as usize] as char);
        }
        key
    }

    fn reseed(&mut self) {
        let mut rng = rand::thread_rng();
        for slot in &mut self.last_tail {
            *slot = rng.gen_range(0..64);
        }
    }
}

/// Base-64 increment, most-significant carry last. Returns false on wrap.
fn increment(tail: &mut [u8; TAIL_LEN]) -> bool {
    for slot in tail.iter_mut().rev() {
        if *slot < 63 {
            *slot += 1;
            return true;
        }
        *slot = 0;
    }
    false
}

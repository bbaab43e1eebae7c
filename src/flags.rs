//! Lock-free control flag register.
//!
//! The four [`Flags`] bits live in one `AtomicU32`. Every mutation is a
//! read/compute/compare-exchange loop, so a control thread toggling one bit
//! can never clobber a concurrent write to another bit, and neither side
//! ever blocks.

use crate::types::Flags;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct FlagRegister {
    bits: AtomicU32,
}

impl FlagRegister {
    /// Register in its startup state: centering requested, both enable bits
    /// set, zero override off.
    pub fn new() -> Self {
        let reg = Self {
            bits: AtomicU32::new(0),
        };
        reg.set(Flags::CENTER, true);
        reg.set(Flags::ENABLED_USER, true);
        reg.set(Flags::ENABLED_HOTKEY, true);
        reg.set(Flags::ZERO, false);
        reg
    }

    /// Set or clear `flag`.
    pub fn set(&self, flag: Flags, value: bool) {
        let mask = flag.bits();
        let mut current = self.bits.load(Ordering::SeqCst);
        loop {
            let next = (current & !mask) | if value { mask } else { 0 };
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Flip `flag`.
    pub fn negate(&self, flag: Flags) {
        let mask = flag.bits();
        let mut current = self.bits.load(Ordering::SeqCst);
        loop {
            match self.bits.compare_exchange_weak(
                current,
                current ^ mask,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn get(&self, flag: Flags) -> bool {
        self.bits.load(Ordering::SeqCst) & flag.bits() != 0
    }

    /// All bits at once.
    pub fn load(&self) -> Flags {
        Flags::from_bits_truncate(self.bits.load(Ordering::SeqCst))
    }
}

impl Default for FlagRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlagRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FlagRegister").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        let reg = FlagRegister::new();
        assert!(reg.get(Flags::CENTER));
        assert!(reg.get(Flags::ENABLED_USER));
        assert!(reg.get(Flags::ENABLED_HOTKEY));
        assert!(!reg.get(Flags::ZERO));
    }

    #[test]
    fn test_set_then_clear() {
        let reg = FlagRegister::new();
        reg.set(Flags::ZERO, true);
        assert!(reg.get(Flags::ZERO));
        reg.set(Flags::ZERO, false);
        assert!(!reg.get(Flags::ZERO));
        // untouched bits survive
        assert!(reg.get(Flags::CENTER));
    }

    #[test]
    fn test_negate() {
        let reg = FlagRegister::new();
        reg.negate(Flags::ENABLED_USER);
        assert!(!reg.get(Flags::ENABLED_USER));
        reg.negate(Flags::ENABLED_USER);
        assert!(reg.get(Flags::ENABLED_USER));
    }

    #[test]
    fn test_concurrent_negate_loses_nothing() {
        let reg = Arc::new(FlagRegister::new());
        let flags = [Flags::CENTER, Flags::ENABLED_HOTKEY, Flags::ENABLED_USER, Flags::ZERO];
        let before = reg.load();

        // Each thread flips its own bit an even number of times while also
        // hammering set() on that bit; every bit must end where it started.
        let threads: Vec<_> = flags
            .iter()
            .map(|&flag| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        reg.negate(flag);
                        reg.negate(flag);
                        let v = reg.get(flag);
                        reg.set(flag, v);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(reg.load(), before);
    }

    #[test]
    fn test_concurrent_set_independent_bits() {
        let reg = Arc::new(FlagRegister::new());
        reg.set(Flags::CENTER, false);
        reg.set(Flags::ZERO, false);

        let a = {
            let reg = reg.clone();
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    reg.set(Flags::CENTER, i % 2 == 0);
                }
            })
        };
        let b = {
            let reg = reg.clone();
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    reg.set(Flags::ZERO, i % 2 == 0);
                }
            })
        };
        a.join().unwrap();
        b.join().unwrap();

        // last iteration (i = 9999) wrote false for both
        assert!(!reg.get(Flags::CENTER));
        assert!(!reg.get(Flags::ZERO));
        assert!(reg.get(Flags::ENABLED_USER));
        assert!(reg.get(Flags::ENABLED_HOTKEY));
    }
}

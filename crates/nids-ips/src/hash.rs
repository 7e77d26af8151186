//! Option identity hashing
//!
//! Bob Jenkins' lookup3 mix/final behind [`std::hash::Hasher`], so any
//! `#[derive(Hash)]` option gets a stable 32-bit bucket key.

use std::hash::Hasher;

#[rustfmt::skip]
#[inline(always)]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(4);  *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(6);  *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(8);  *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(16); *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(19); *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(4);  *b = b.wrapping_add(*a);
}

#[rustfmt::skip]
#[inline(always)]
fn finalize(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(24));
}

/// Streaming lookup3 hasher
#[derive(Clone, Debug, Default)]
pub struct Lookup3Hasher {
    state: [u32; 3],
    /// Words waiting for the next mix
    words: [u32; 3],
    nwords: usize,
    /// Bytes of the word being assembled
    word: u32,
    nbytes: u32,
}

impl Lookup3Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_word(&mut self, w: u32) {
        self.words[self.nwords] = w;
        self.nwords += 1;
        if self.nwords == 3 {
            self.absorb();
        }
    }

    fn absorb(&mut self) {
        let [a, b, c] = &mut self.state;
        *a = a.wrapping_add(self.words[0]);
        *b = b.wrapping_add(self.words[1]);
        *c = c.wrapping_add(self.words[2]);
        mix(a, b, c);
        self.words = [0; 3];
        self.nwords = 0;
    }

    /// Final 32-bit hash
    pub fn finish32(&self) -> u32 {
        let mut h = self.clone();
        if h.nbytes > 0 {
            let w = h.word;
            h.word = 0;
            h.nbytes = 0;
            h.push_word(w);
        }
        let [mut a, mut b, mut c] = h.state;
        a = a.wrapping_add(h.words[0]);
        b = b.wrapping_add(h.words[1]);
        c = c.wrapping_add(h.words[2]);
        finalize(&mut a, &mut b, &mut c);
        c
    }
}

impl Hasher for Lookup3Hasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.word |= (byte as u32) << (8 * self.nbytes);
            self.nbytes += 1;
            if self.nbytes == 4 {
                let w = self.word;
                self.word = 0;
                self.nbytes = 0;
                self.push_word(w);
            }
        }
    }

    fn finish(&self) -> u64 {
        self.finish32() as u64
    }
}

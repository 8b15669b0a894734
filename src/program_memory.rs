//! Program memory: a fixed-capacity, read-only-during-execution array
//! of 64-bit instruction words, addressed by instruction index.

use crate::error::Fault;

/// Default instruction capacity: 4096 instructions (matches the
/// reference's 512 × 64-bit × 8-page layout; the paging itself is a
/// host bus concern and is not modeled here).
pub const DEFAULT_CAPACITY: usize = 4096;

/// On-disk byte order of a loaded program image.
///
/// The core's internal word layout (see [`crate::instruction`]) is
/// always little-endian; this selects the byte-swap applied while
/// loading a flat program image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    BigEndianOnDisk,
    LittleEndianOnDisk,
}

/// An ordered sequence of instruction words, allocated at construction
/// and fixed for the lifetime of the VM.
#[derive(Debug, Clone)]
pub struct ProgramMemory {
    words: Vec<u64>,
}

impl ProgramMemory {
    /// Allocate an all-zero program memory with the given instruction
    /// capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0u64; capacity],
        }
    }

    /// Number of instruction slots.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Read-only view of the full instruction array, for host-side
    /// inspection (debug tooling, not paged).
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Load a flat byte image as a sequence of instruction words,
    /// applying the byte-swap `endianness` selects. `image` must be a
    /// multiple of 8 bytes and fit within this memory's capacity;
    /// remaining words (if `image` is shorter than capacity) stay zero.
    pub fn load_image(&mut self, image: &[u8], endianness: Endianness) -> Result<(), Fault> {
        if image.len() % 8 != 0 {
            return Err(Fault::MisalignedProgramImage { len: image.len() });
        }
        if image.len() / 8 > self.words.len() {
            return Err(Fault::ImageTooLarge {
                len: image.len(),
                capacity: self.words.len() * 8,
            });
        }
        for (slot, chunk) in self.words.iter_mut().zip(image.chunks_exact(8)) {
            let bytes: [u8; 8] = chunk.try_into().expect("chunks_exact(8) yields 8 bytes");
            *slot = match endianness {
                Endianness::BigEndianOnDisk => u64::from_be_bytes(bytes),
                Endianness::LittleEndianOnDisk => u64::from_le_bytes(bytes),
            };
        }
        Ok(())
    }

    /// Load already-decoded little-endian instruction words directly,
    /// e.g. from test helpers in [`crate::encode`].
    pub fn load_words(&mut self, words: &[u64]) {
        assert!(
            words.len() <= self.words.len(),
            "program exceeds program memory capacity"
        );
        self.words[..words.len()].copy_from_slice(words);
    }

    /// Fetch the instruction word at `ip`, faulting with
    /// [`Fault::ProgramBounds`] if `ip` is outside `0..len()`.
    pub fn fetch(&self, ip: u32) -> Result<u64, Fault> {
        self.words
            .get(ip as usize)
            .copied()
            .ok_or(Fault::ProgramBounds { ip })
    }
}

impl Default for ProgramMemory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

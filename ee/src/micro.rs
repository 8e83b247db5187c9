use vu::InstructionMemory;

/// VU0 microprogram memory size in bytes
pub const VU0_MICRO_SIZE: u32 = 0x1000;
/// VU1 microprogram memory size in bytes
pub const VU1_MICRO_SIZE: u32 = 0x4000;

/// Word-backed VU microprogram memory.
///
/// Addresses wrap at the top of the image like the hardware's, so every
/// fetch is valid for a fixed program image.
pub struct MicroMemory {
    words: Box<[u32]>,
    mask: u32,
}

impl MicroMemory {
    pub fn new(size: u32) -> MicroMemory {
        assert!(size.is_power_of_two() && size >= 8);
        MicroMemory {
            words: vec![0; (size / 4) as usize].into_boxed_slice(),
            mask: size - 1,
        }
    }

    pub fn size(&self) -> u32 {
        (self.words.len() * 4) as u32
    }

    /// Load a little-endian image at `offset`, wrapping at the top of
    /// memory. A trailing partial word is zero-padded.
    pub fn load(&mut self, offset: u32, image: &[u8]) {
        for (i, chunk) in image.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let address = offset.wrapping_add((i * 4) as u32) & self.mask;
            self.words[(address / 4) as usize] = u32::from_le_bytes(word);
        }
    }

    pub fn write_word(&mut self, address: u32, word: u32) {
        self.words[((address & self.mask) / 4) as usize] = word;
    }
}

impl InstructionMemory for MicroMemory {
    fn get_instruction(&self, address: u32) -> u32 {
        self.words[((address & self.mask) / 4) as usize]
    }
}

use thiserror::Error;

use crate::mapper::*;
use crate::{Region, SystemControl};

// The size of each PRG-ROM bank
pub const PRG_BANK_SIZE: usize = 0x4000;

// The size of each CHR-ROM bank
pub const CHR_BANK_SIZE: usize = 0x2000;

const INES_HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;

/// A12 rising edges closer than this (in PPU dots) to the previous rising
/// edge do not clock the MMC3 counter. 9 dots = 3 CPU cycles.
const A12_FILTER_DOTS: u64 = 9;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    HORIZONTAL,
    VERTICAL,
    ONESCREEN_LO,
    ONESCREEN_HI,
    FOUR_SCREEN,
}

#[derive(Debug, Error)]
pub enum RomError {
    #[error("not an iNES file (bad magic)")]
    BadMagic,

    #[error("ROM truncated: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("unsupported iNES mapper {0}")]
    UnsupportedMapper(u8),
}

pub struct CartridgeNes {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    battery_backed: bool,
    mirroring: Mirroring,
    region: Region,
    mapper: Box<dyn Mapper + Send>,

    // A12 edge detector state for the MMC3 IRQ counter
    ppu_dot_stamp: u64,
    a12_high: bool,
    a12_last_rise: u64,
}

impl SystemControl for CartridgeNes {
    fn reset(&mut self) {
        self.mapper.reset();
        self.ppu_dot_stamp = 0;
        self.a12_high = false;
        self.a12_last_rise = 0;
    }
}

impl CartridgeNes {
    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < INES_HEADER_SIZE {
            return Err(RomError::Truncated {
                expected: INES_HEADER_SIZE,
                found: data.len(),
            });
        }

        // First three bytes must be "NES" in ASCII, followed by 0x1A
        if &data[0..=3] != &[0x4E, 0x45, 0x53, 0x1A] {
            return Err(RomError::BadMagic);
        }

        let prg_rom_banks = data[4] as usize;
        let chr_rom_banks = data[5] as usize;

        let flags6 = data[6];
        let flags7 = data[7];

        let mut mirroring = if flags6 & 0x01 == 0 {
            Mirroring::HORIZONTAL
        } else {
            Mirroring::VERTICAL
        };

        if flags6 & 0b00001000 != 0 {
            mirroring = Mirroring::FOUR_SCREEN;
        }

        let battery_backed = flags6 & 0x02 != 0;
        let has_trainer = flags6 & 0x04 != 0;

        let region = if data.len() > 9 && data[9] & 0x01 != 0 {
            Region::Pal
        } else {
            Region::Ntsc
        };

        let prg_start = INES_HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let prg_len = prg_rom_banks * PRG_BANK_SIZE;
        if prg_len == 0 {
            return Err(RomError::Truncated {
                expected: prg_start + PRG_BANK_SIZE,
                found: data.len(),
            });
        }
        let chr_len = chr_rom_banks * CHR_BANK_SIZE;

        let expected = prg_start + prg_len + chr_len;
        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                found: data.len(),
            });
        }

        let prg_rom = data[prg_start..prg_start + prg_len].to_vec();

        let chr_is_ram = chr_rom_banks == 0;
        let chr = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            data[prg_start + prg_len..prg_start + prg_len + chr_len].to_vec()
        };

        let mapper_num = (flags7 & 0b11110000) | (flags6 >> 4);

        let mapper: Box<dyn Mapper + Send> = match mapper_num {
            0 => Box::new(Mapper0::new(prg_rom_banks)),
            1 => Box::new(Mapper1::new(prg_rom_banks, chr_is_ram)),
            4 => Box::new(Mapper4::new(prg_rom_banks)),
            _ => return Err(RomError::UnsupportedMapper(mapper_num)),
        };

        log::info!(
            "loaded cartridge: mapper {} PRG {}K CHR {}K {:?} {:?} battery: {}",
            mapper_num,
            prg_rom_banks * 16,
            chr_rom_banks * 8,
            mirroring,
            region,
            battery_backed,
        );

        Ok(Self {
            prg_rom,
            chr,
            chr_is_ram,
            battery_backed,
            mirroring,
            region,
            mapper,

            ppu_dot_stamp: 0,
            a12_high: false,
            a12_last_rise: 0,
        })
    }

    pub fn cpu_read(&mut self, addr: usize) -> Option<u8> {
        self.mapper.mapped_cpu_read(&self.prg_rom, addr)
    }

    pub fn cpu_write(&mut self, addr: usize, byte: u8) -> bool {
        self.mapper.mapped_cpu_write(&self.prg_rom, addr, byte)
    }

    pub fn ppu_read(&mut self, addr: usize) -> u8 {
        self.watch_a12(addr);
        self.mapper.mapped_ppu_read(&self.chr, addr)
    }

    pub fn ppu_write(&mut self, addr: usize, byte: u8) {
        self.watch_a12(addr);
        if self.chr_is_ram {
            self.mapper.mapped_ppu_write(&mut self.chr, addr, byte);
        }
    }

    /// Advances the pattern-bus timebase. Called once per PPU dot.
    #[inline]
    pub fn ppu_tick(&mut self) {
        self.ppu_dot_stamp += 1;
    }

    /// Rising edges on PPU address line 12, filtered so edges within
    /// `A12_FILTER_DOTS` of the previous rise are ignored, clock the mapper.
    fn watch_a12(&mut self, addr: usize) {
        let a12 = addr & 0x1000 != 0;

        if a12 && !self.a12_high {
            if self.ppu_dot_stamp.wrapping_sub(self.a12_last_rise) >= A12_FILTER_DOTS {
                self.mapper.notify_a12();
            }
            self.a12_last_rise = self.ppu_dot_stamp;
        }

        self.a12_high = a12;
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.mirroring == Mirroring::FOUR_SCREEN {
            return self.mirroring;
        }

        match self.mapper.get_updated_mirroring() {
            Some(mirroring) => mirroring,
            None => self.mirroring,
        }
    }

    pub fn irq_active(&self) -> bool {
        self.mapper.irq_active()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn battery_backed(&self) -> bool {
        self.battery_backed
    }

    pub fn save_ram(&self) -> Option<&[u8]> {
        self.mapper.save_ram()
    }

    pub fn load_save_ram(&mut self, data: &[u8]) -> bool {
        self.mapper.load_save_ram(data)
    }
}

#[cfg(test)]
impl CartridgeNes {
    pub fn test_new() -> Self {
        Self {
            prg_rom: Vec::new(),
            chr: vec![0; CHR_BANK_SIZE],
            chr_is_ram: true,
            battery_backed: false,
            mirroring: Mirroring::HORIZONTAL,
            region: Region::Ntsc,
            mapper: Box::new(TestMapper::new()),

            ppu_dot_stamp: 0,
            a12_high: false,
            a12_last_rise: 0,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn ines_image(mapper: u8, prg_banks: u8, chr_banks: u8) -> Vec<u8> {
        let mut data = vec![
            0x4E, 0x45, 0x53, 0x1A,
            prg_banks, chr_banks,
            (mapper & 0x0F) << 4,
            mapper & 0xF0,
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        data.resize(
            16 + prg_banks as usize * PRG_BANK_SIZE + chr_banks as usize * CHR_BANK_SIZE,
            0,
        );
        data
    }

    #[test]
    fn parses_a_minimal_nrom_image() {
        let mut data = ines_image(0, 1, 1);
        data[16] = 0xAB; // first PRG byte

        let mut cartridge = CartridgeNes::from_ines_bytes(&data).unwrap();

        assert_eq!(cartridge.cpu_read(0x8000), Some(0xAB));
        // single 16K bank mirrors into $C000
        assert_eq!(cartridge.cpu_read(0xC000), Some(0xAB));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = ines_image(0, 1, 1);
        data[0] = 0x00;

        assert!(matches!(
            CartridgeNes::from_ines_bytes(&data),
            Err(RomError::BadMagic)
        ));
    }

    #[test]
    fn rejects_truncated_prg_data() {
        let mut data = ines_image(0, 2, 1);
        data.truncate(16 + PRG_BANK_SIZE);

        assert!(matches!(
            CartridgeNes::from_ines_bytes(&data),
            Err(RomError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_mappers() {
        let data = ines_image(66, 1, 1);

        assert!(matches!(
            CartridgeNes::from_ines_bytes(&data),
            Err(RomError::UnsupportedMapper(66))
        ));
    }

    #[test]
    fn trainer_offsets_the_prg_data() {
        let mut data = ines_image(0, 1, 1);
        data[6] |= 0x04;
        data.resize(data.len() + 512, 0);
        // move PRG after the trainer
        data[16 + 512] = 0xCD;

        let mut cartridge = CartridgeNes::from_ines_bytes(&data).unwrap();
        assert_eq!(cartridge.cpu_read(0x8000), Some(0xCD));
    }

    #[test]
    fn chr_ram_is_writable_when_no_chr_banks_present() {
        let data = ines_image(0, 1, 0);
        let mut cartridge = CartridgeNes::from_ines_bytes(&data).unwrap();

        cartridge.ppu_write(0x0123, 0x42);
        assert_eq!(cartridge.ppu_read(0x0123), 0x42);
    }

    #[test]
    fn a12_edges_are_filtered_within_three_cpu_cycles() {
        let data = ines_image(4, 2, 1);
        let mut cartridge = CartridgeNes::from_ines_bytes(&data).unwrap();

        // latch 5, reload, enable
        cartridge.cpu_write(0xC000, 5);
        cartridge.cpu_write(0xC001, 0);
        cartridge.cpu_write(0xE001, 0);

        // six well-spaced rising edges clock the counter to zero
        for edge in 0..6 {
            for _ in 0..9 {
                cartridge.ppu_tick();
            }
            cartridge.ppu_read(0x1000);
            cartridge.ppu_read(0x0000);

            assert_eq!(cartridge.irq_active(), edge == 5, "edge {}", edge);
        }
    }

    #[test]
    fn rapid_a12_toggles_only_count_once() {
        let data = ines_image(4, 2, 1);
        let mut cartridge = CartridgeNes::from_ines_bytes(&data).unwrap();

        cartridge.cpu_write(0xC000, 1);
        cartridge.cpu_write(0xC001, 0);
        cartridge.cpu_write(0xE001, 0);

        for _ in 0..9 {
            cartridge.ppu_tick();
        }

        // back-to-back toggles with no low time are swallowed by the filter
        for _ in 0..8 {
            cartridge.ppu_read(0x1000);
            cartridge.ppu_read(0x0000);
            cartridge.ppu_tick();
        }

        assert!(!cartridge.irq_active(), "only the first edge clocked");
    }
}

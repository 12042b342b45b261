#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate bitflags;

mod apu;
mod bus;
mod cartridge;
mod cpu;
mod mapper;
mod nes;
mod ppu;

pub use apu::Apu2A03;
pub use bus::SystemBus;
pub use cartridge::{CartridgeNes, Mirroring, RomError};
pub use cpu::Cpu6502;
pub use nes::{AudioSink, Nes};
pub use ppu::*;

pub const DISPLAY_WIDTH: usize = 256;
pub const DISPLAY_HEIGHT: usize = 240;

/// Mono i16 samples are handed to the host in chunks of this size.
pub const AUDIO_CHUNK_SAMPLES: usize = 1024;

pub const NTSC_CPU_FREQUENCY: f32 = 1_789_773.0;
pub const PAL_CPU_FREQUENCY: f32 = 1_662_607.0;

/// Video region. Only the clock rates and frame geometry differ; peripheral
/// behavior is NTSC everywhere.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

impl Region {
    #[inline]
    pub fn cpu_hz(self) -> f32 {
        match self {
            Region::Ntsc => NTSC_CPU_FREQUENCY,
            Region::Pal => PAL_CPU_FREQUENCY,
        }
    }

    /// Total scanlines per frame, including post-render, vblank and pre-render.
    #[inline]
    pub fn scanlines_per_frame(self) -> i32 {
        match self {
            Region::Ntsc => 262,
            Region::Pal => 312,
        }
    }

    /// PPU dots advanced per CPU cycle, as a (numerator, denominator) pair:
    /// exactly 3 on NTSC, 3.2 on PAL.
    #[inline]
    pub fn dots_per_cpu_cycle(self) -> (u32, u32) {
        match self {
            Region::Ntsc => (3, 1),
            Region::Pal => (16, 5),
        }
    }
}

pub trait SystemControl {
    fn reset(&mut self);
}

use crate::apu::Apu2A03;
use crate::bus::SystemBus;
use crate::cartridge::{CartridgeNes, RomError};
use crate::cpu::Cpu6502;
use crate::ppu::{Colour, Ppu2C02};
use crate::{Region, SystemControl, AUDIO_CHUNK_SAMPLES, DISPLAY_HEIGHT, DISPLAY_WIDTH};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Instruction-step cap per frame. A frame needs roughly 10k instructions;
/// anything past this means the machine is wedged in a way even a jammed
/// CPU cannot produce.
const FRAME_STEP_LIMIT: u32 = 200_000;

/// Host audio output. Chunks are mono signed 16-bit at the configured rate.
pub trait AudioSink {
    /// Returns false to reject the buffer; the samples are then dropped.
    fn push_samples(&mut self, samples: &[i16]) -> bool;
}

/// The whole console: CPU (with the APU on die), PPU, and the bus holding
/// cartridge and PPU register file.
pub struct Nes {
    cpu: Cpu6502,
    ppu: Ppu2C02,
    bus: SystemBus,

    region: Region,
    dot_remainder: u32,

    sample_chunk: Vec<i16>,
    audio_sink: Option<Box<dyn AudioSink + Send>>,
}

impl Nes {
    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, RomError> {
        let cartridge = CartridgeNes::from_ines_bytes(data)?;
        Ok(Self::with_cartridge(cartridge))
    }

    pub fn with_cartridge(cartridge: CartridgeNes) -> Self {
        let region = cartridge.region();

        let mut nes = Self {
            cpu: Cpu6502::new(Apu2A03::new(DEFAULT_SAMPLE_RATE, region)),
            ppu: Ppu2C02::new(region),
            bus: SystemBus::new(cartridge),

            region,
            dot_remainder: 0,

            sample_chunk: Vec::with_capacity(AUDIO_CHUNK_SAMPLES),
            audio_sink: None,
        };

        nes.reset();
        nes
    }

    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink + Send>) {
        self.audio_sink = Some(sink);
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.ppu.reset();
        self.cpu.reset_with_bus(&mut self.bus);
        self.dot_remainder = 0;
        self.sample_chunk.clear();
    }

    /// Runs the machine until the PPU wraps from the pre-render line back to
    /// scanline 0, then returns the completed framebuffer. Each CPU
    /// instruction is followed by 3 PPU dots per cycle (16/5 on PAL) and one
    /// APU cycle per cycle.
    pub fn run_frame(&mut self) -> &[Colour; DISPLAY_WIDTH * DISPLAY_HEIGHT] {
        self.ppu.frame_complete = false;

        let (dots_per_cycle, dot_unit) = self.region.dots_per_cpu_cycle();
        let mut steps = 0;

        while !self.ppu.frame_complete {
            steps += 1;
            if steps > FRAME_STEP_LIMIT {
                log::warn!(
                    "frame step limit exceeded at scanline {} dot {}; returning partial frame",
                    self.ppu.scanline,
                    self.ppu.dot,
                );
                break;
            }

            let cycles = self.cpu.step_one_instruction(&mut self.bus);

            let dot_budget = cycles * dots_per_cycle + self.dot_remainder;
            self.dot_remainder = dot_budget % dot_unit;

            for _ in 0..dot_budget / dot_unit {
                self.ppu.clock(&mut self.bus);
            }

            for _ in 0..cycles {
                self.cpu.apu.cpu_clock(&mut self.bus);

                if let Some(sample) = self.cpu.apu.cpu_try_clock_sample() {
                    self.push_sample(sample);
                }
            }

            // interrupts raised during the PPU/APU slice take effect at the
            // next instruction boundary
            if self.bus.ppu_bus.take_nmi_request() {
                self.cpu.trigger_nmi();
            }

            let irq_line = self.bus.irq_active() || self.cpu.apu.irq_active();
            self.cpu.set_irq_line(irq_line);
        }

        self.ppu.framebuffer()
    }

    fn push_sample(&mut self, sample: i16) {
        self.sample_chunk.push(sample);

        if self.sample_chunk.len() < AUDIO_CHUNK_SAMPLES {
            return;
        }

        if let Some(sink) = &mut self.audio_sink {
            if !sink.push_samples(&self.sample_chunk) {
                log::warn!("audio sink rejected a buffer; dropping {} samples", self.sample_chunk.len());
            }
        }

        self.sample_chunk.clear();
    }

    /// Buttons for both controllers, A/B/Select/Start/Up/Down/Left/Right
    /// from the least significant bit.
    pub fn set_controller_state(&mut self, controller1: u8, controller2: u8) {
        self.bus.update_joypad_state(controller1, controller2);
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn cpu(&self) -> &Cpu6502 {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu2C02 {
        &self.ppu
    }

    pub fn cpu_jammed(&self) -> bool {
        self.cpu.jammed()
    }

    pub fn save_ram(&self) -> Option<&[u8]> {
        self.bus.cartridge.save_ram()
    }

    pub fn load_save_ram(&mut self, data: &[u8]) -> bool {
        self.bus.cartridge.load_save_ram(data)
    }
}

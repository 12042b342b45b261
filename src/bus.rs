use crate::cartridge::CartridgeNes;
use crate::ppu::PpuBus;
use crate::SystemControl;

const CPU_RAM_START: usize = 0x0000;
const CPU_RAM_END: usize = 0x1FFF;
const PPU_REG_START: usize = 0x2000;
const PPU_REG_END: usize = 0x3FFF;

pub const DMA_REG_ADDR: usize = 0x4014;
const JOYPAD1_REG: usize = 0x4016;
const JOYPAD2_REG: usize = 0x4017;

const CPU_RAM_LENGTH: usize = 0x800;

pub struct SystemBus {
    pub cartridge: CartridgeNes,
    pub ppu_bus: PpuBus,

    cpu_ram: [u8; CPU_RAM_LENGTH],

    // last value driven onto the data bus; undecoded reads return it
    open_bus: u8,

    controller_state: [u8; 2],
    controller_shift: [u8; 2],
    controller_index: [u8; 2],
    strobe: bool,

    // OAM DMA just completed; the CPU owes 513 (+1 on odd) stall cycles
    pub oam_dma_pending: bool,

    // APU's DMC stalls the CPU whenever it reads a sample byte
    pub dmc_read_stall: u8,
}

impl SystemControl for SystemBus {
    fn reset(&mut self) {
        self.cartridge.reset();
        self.ppu_bus.reset();
        self.open_bus = 0;
        self.controller_state = [0; 2];
        self.controller_shift = [0; 2];
        self.controller_index = [0; 2];
        self.strobe = false;
        self.oam_dma_pending = false;
        self.dmc_read_stall = 0;
    }
}

impl SystemBus {
    pub fn new(cartridge: CartridgeNes) -> Self {
        Self {
            cartridge,
            ppu_bus: PpuBus::new(),

            cpu_ram: [0; CPU_RAM_LENGTH],
            open_bus: 0,

            controller_state: [0; 2],
            controller_shift: [0; 2],
            controller_index: [0; 2],
            strobe: false,

            oam_dma_pending: false,
            dmc_read_stall: 0,
        }
    }

    pub fn cpu_read(&mut self, addr: usize, read_only: bool) -> u8 {
        let byte = match self.cartridge.cpu_read(addr) {
            Some(byte) => Some(byte),
            None => match addr {
                CPU_RAM_START..=CPU_RAM_END => Some(self.cpu_ram[addr % CPU_RAM_LENGTH]),
                PPU_REG_START..=PPU_REG_END => {
                    Some(self.ppu_bus.cpu_read_reg(addr, &mut self.cartridge, read_only))
                }
                JOYPAD1_REG | JOYPAD2_REG => Some(self.read_controller(addr & 0x01, read_only)),
                _ => None,
            },
        };

        let value = byte.unwrap_or(self.open_bus);
        if !read_only {
            self.open_bus = value;
        }

        value
    }

    pub fn cpu_write(&mut self, addr: usize, byte: u8) {
        self.open_bus = byte;

        if self.cartridge.cpu_write(addr, byte) {
            return;
        }

        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.cpu_ram[addr % CPU_RAM_LENGTH] = byte,
            PPU_REG_START..=PPU_REG_END => {
                self.ppu_bus.cpu_write_reg(addr, byte, &mut self.cartridge)
            }
            DMA_REG_ADDR => self.oam_dma(byte),
            JOYPAD1_REG => {
                let strobe = byte & 0x01 != 0;

                if self.strobe && !strobe {
                    self.controller_shift = self.controller_state;
                    self.controller_index = [0; 2];
                }

                self.strobe = strobe;
            }
            _ => {}
        }
    }

    /// Copies one 256-byte page into OAM and flags the CPU stall.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as usize) << 8;

        for i in 0..256 {
            let byte = self.cpu_read(base + i, false);
            self.ppu_bus.transfer_to_oam(i, byte);
        }

        self.oam_dma_pending = true;
    }

    fn read_controller(&mut self, index: usize, read_only: bool) -> u8 {
        let bit = if self.strobe {
            // while the strobe is held the shifter sits on the A button
            self.controller_state[index] & 0x01
        } else if self.controller_index[index] < 8 {
            let bit = (self.controller_shift[index] >> self.controller_index[index]) & 0x01;
            if !read_only {
                self.controller_index[index] += 1;
            }
            bit
        } else {
            // exhausted shifters read back 1
            1
        };

        // upper bits come from the open bus on a stock controller port
        0x40 | bit
    }

    pub fn ppu_read(&mut self, addr: usize) -> u8 {
        self.ppu_bus.ppu_read(addr, &mut self.cartridge)
    }

    pub fn update_joypad_state(&mut self, joypad_state1: u8, joypad_state2: u8) {
        self.controller_state[0] = joypad_state1;
        self.controller_state[1] = joypad_state2;
    }

    pub fn irq_active(&self) -> bool {
        self.cartridge.irq_active()
    }
}

#[cfg(test)]
impl SystemBus {
    pub fn test_new() -> Self {
        Self::new(CartridgeNes::test_new())
    }

    pub fn load_ram(&mut self, offset: usize, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.cpu_write(offset + i, byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_is_mirrored_every_0x800() {
        let mut bus = SystemBus::test_new();

        bus.cpu_write(0x0005, 0xAB);
        assert_eq!(bus.cpu_read(0x0805, false), 0xAB);
        assert_eq!(bus.cpu_read(0x1005, false), 0xAB);
        assert_eq!(bus.cpu_read(0x1805, false), 0xAB);
    }

    #[test]
    fn open_bus_returns_last_driven_value() {
        let mut bus = SystemBus::test_new();

        bus.cpu_write(0x0000, 0x5A);
        // $4000-$4013 is not decoded by the bus (APU lives on the CPU die)
        assert_eq!(bus.cpu_read(0x4000, false), 0x5A);

        bus.cpu_write(0x0000, 0xC3);
        assert_eq!(bus.cpu_read(0x4013, false), 0xC3);
    }

    #[test]
    fn oam_dma_copies_a_full_page() {
        let mut bus = SystemBus::test_new();

        for i in 0..256 {
            bus.cpu_write(0x0200 + i, (i ^ 0x55) as u8);
        }

        bus.cpu_write(DMA_REG_ADDR, 0x02);

        assert!(bus.oam_dma_pending);
        for i in 0..256 {
            assert_eq!(bus.ppu_bus.read_oam(i), (i ^ 0x55) as u8);
        }
    }

    #[test]
    fn controller_strobe_latches_buttons_in_order() {
        let mut bus = SystemBus::test_new();

        // A, Start, Right
        bus.update_joypad_state(0b1000_1001, 0);

        bus.cpu_write(JOYPAD1_REG, 1);
        bus.cpu_write(JOYPAD1_REG, 0);

        let expected = [1, 0, 0, 1, 0, 0, 0, 1];
        for (i, &bit) in expected.iter().enumerate() {
            assert_eq!(bus.cpu_read(JOYPAD1_REG, false), 0x40 | bit, "read {}", i);
        }

        // exhausted shifter reads back 1
        assert_eq!(bus.cpu_read(JOYPAD1_REG, false), 0x41);
    }

    #[test]
    fn controller_reads_live_a_button_while_strobed() {
        let mut bus = SystemBus::test_new();

        bus.update_joypad_state(0x01, 0);
        bus.cpu_write(JOYPAD1_REG, 1);

        assert_eq!(bus.cpu_read(JOYPAD1_REG, false), 0x41);
        assert_eq!(bus.cpu_read(JOYPAD1_REG, false), 0x41);
    }
}

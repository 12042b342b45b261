mod opcode;

use crate::apu::Apu2A03;
use crate::bus::SystemBus;
use crate::SystemControl;

use self::opcode::{AddrMode, OPCODE_TABLE};

enum Flag { C, Z, I, D, B, U, V, N }

impl Flag {
    pub fn mask(&self) -> u8 {
        match self {
            Flag::C => 0b00000001,
            Flag::Z => 0b00000010,
            Flag::I => 0b00000100,
            Flag::D => 0b00001000,
            Flag::B => 0b00010000,
            Flag::U => 0b00100000,
            Flag::V => 0b01000000,
            Flag::N => 0b10000000,
        }
    }
}

const STACK_START: u16 = 0x100;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const OAM_DMA_STALL: u32 = 513;
const INTERRUPT_CYCLES: u32 = 7;

pub struct Cpu6502 {
    pub accumulator: u8,
    pub x_index_reg: u8,
    pub y_index_reg: u8,
    pub program_counter: u16,
    pub stack_pointer: u8,
    pub processor_status: u8,

    pub total_cycles: u64,

    // decode state for the instruction in flight
    addr_mode: AddrMode,
    operand_addr: u16,
    operand_data: u8,
    page_crossed: bool,
    index_dummy_read: bool,

    // interrupt unit
    pub nmi_pending: bool,
    pub nmi_delay: u8,
    irq_line: bool,
    inhibit: bool,
    pending_inhibit: bool,
    latency_remaining: u8,
    latency_armed: bool,
    in_nmi: bool,

    dma_stall_cycles: u32,

    jammed: bool,
    last_jam_pc: Option<u16>,

    // the 2A03 puts the APU on the CPU die; register traffic at
    // $4000-$4013/$4015/$4017 never reaches the external bus
    pub apu: Apu2A03,
}

impl SystemControl for Cpu6502 {
    fn reset(&mut self) {
        self.accumulator = 0;
        self.x_index_reg = 0;
        self.y_index_reg = 0;
        self.stack_pointer = 0xFD;
        self.processor_status = Flag::I.mask() | Flag::U.mask();

        self.total_cycles = 7;

        self.nmi_pending = false;
        self.nmi_delay = 0;
        self.irq_line = false;
        self.inhibit = true;
        self.pending_inhibit = true;
        self.latency_remaining = 0;
        self.latency_armed = false;
        self.in_nmi = false;

        self.dma_stall_cycles = 0;
        self.jammed = false;
        self.last_jam_pc = None;

        self.apu.reset();
    }
}

impl Cpu6502 {
    pub fn new(apu: Apu2A03) -> Self {
        Cpu6502 {
            accumulator: 0,
            x_index_reg: 0,
            y_index_reg: 0,
            program_counter: 0,
            stack_pointer: 0xFD,
            processor_status: Flag::I.mask() | Flag::U.mask(),

            total_cycles: 7,

            addr_mode: AddrMode::IMP,
            operand_addr: 0,
            operand_data: 0,
            page_crossed: false,
            index_dummy_read: false,

            nmi_pending: false,
            nmi_delay: 0,
            irq_line: false,
            inhibit: true,
            pending_inhibit: true,
            latency_remaining: 0,
            latency_armed: false,
            in_nmi: false,

            dma_stall_cycles: 0,
            jammed: false,
            last_jam_pc: None,

            apu,
        }
    }

    /// Full reset: registers, interrupt unit, and the jump through $FFFC.
    pub fn reset_with_bus(&mut self, bus: &mut SystemBus) {
        self.reset();
        self.program_counter = self.read_word(bus, RESET_VECTOR);
    }

    /// Executes one instruction (or services one interrupt) and returns the
    /// cycle count consumed, including page-cross, branch and DMA-stall
    /// penalties.
    pub fn step_one_instruction(&mut self, bus: &mut SystemBus) -> u32 {
        let mut cycles = self.dma_stall_cycles;
        self.dma_stall_cycles = 0;

        if bus.dmc_read_stall > 0 {
            cycles += bus.dmc_read_stall as u32;
            bus.dmc_read_stall = 0;
        }

        cycles += self.poll_interrupts(bus);

        let opcode = self.advance_pc(bus);
        let op = &OPCODE_TABLE[opcode as usize];
        self.index_dummy_read = op.index_dummy_read;
        cycles += op.execute_op(self, bus);

        // a $4014 write copied a page into OAM during this instruction
        if bus.oam_dma_pending {
            bus.oam_dma_pending = false;
            let parity = ((self.total_cycles + cycles as u64) & 1) as u32;
            cycles += OAM_DMA_STALL + parity;
        }

        self.apply_inhibit_latency();

        self.total_cycles += cycles as u64;
        cycles
    }

    /// Edge input from the PPU. Recognized at the next instruction boundary
    /// after the one-step scheduler delay.
    pub fn trigger_nmi(&mut self) {
        if !self.in_nmi {
            self.nmi_pending = true;
            self.nmi_delay = 1;
        }
    }

    /// Level input shared by the mapper and APU IRQ lines.
    pub fn set_irq_line(&mut self, level: bool) {
        self.irq_line = level;
    }

    pub fn trigger_irq(&mut self) {
        self.set_irq_line(true);
    }

    /// External stall cycles (DMC fetches etc.), paid at the next step.
    pub fn add_dma_stall(&mut self, cycles: u32) {
        self.dma_stall_cycles += cycles;
    }

    pub fn jammed(&self) -> bool {
        self.jammed
    }

    pub fn read_status_byte(&self) -> u8 {
        self.processor_status | Flag::U.mask()
    }

    pub fn write_status_byte(&mut self, byte: u8) {
        self.processor_status = (byte | Flag::U.mask()) & !Flag::B.mask();
        self.inhibit = byte & Flag::I.mask() != 0;
        self.pending_inhibit = self.inhibit;
        self.latency_remaining = 0;
        self.latency_armed = false;
    }

    fn poll_interrupts(&mut self, bus: &mut SystemBus) -> u32 {
        if self.jammed {
            return 0;
        }

        if self.nmi_pending {
            if self.nmi_delay == 0 {
                self.nmi_pending = false;
                self.in_nmi = true;
                return self.interrupt(bus, NMI_VECTOR);
            }
            self.nmi_delay -= 1;
        } else if self.irq_line && !self.inhibit {
            return self.interrupt(bus, IRQ_VECTOR);
        }

        0
    }

    fn interrupt(&mut self, bus: &mut SystemBus, vector: u16) -> u32 {
        self.push_word_to_stack(bus, self.program_counter);
        self.push_byte_to_stack(
            bus,
            (self.processor_status | Flag::U.mask()) & !Flag::B.mask(),
        );

        self.set_flag(Flag::I, true);
        self.inhibit = true;
        self.pending_inhibit = true;
        self.latency_remaining = 0;
        self.latency_armed = false;

        self.program_counter = self.read_word(bus, vector);

        INTERRUPT_CYCLES
    }

    /// CLI/SEI/PLP change IRQ recognition only after the instruction that
    /// follows the modifying one.
    fn schedule_inhibit(&mut self, inhibit: bool) {
        self.pending_inhibit = inhibit;
        self.latency_remaining = 1;
        self.latency_armed = false;
    }

    fn apply_inhibit_latency(&mut self) {
        if self.latency_armed {
            self.inhibit = self.pending_inhibit;
            self.latency_armed = false;
        } else if self.latency_remaining > 0 {
            self.latency_remaining -= 1;
            self.latency_armed = true;
        }
    }

    pub(super) fn add_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        self.add_to_accumulator(data);

        self.page_crossed as u32
    }

    pub(super) fn and_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator &= self.fetch_operand(bus);
        self.set_zero_negative(self.accumulator);

        self.page_crossed as u32
    }

    pub(super) fn arithmetic_shift_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shl(1);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b10000000 != 0);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn branch_if_carry_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = !self.get_flag(Flag::C);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_carry_set(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = self.get_flag(Flag::C);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = self.get_flag(Flag::Z);
        self.branch_on(condition)
    }

    pub(super) fn bit_test(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);

        self.set_flag(Flag::Z, self.accumulator & data == 0);
        self.set_flag(Flag::V, data & 0b01000000 != 0);
        self.set_flag(Flag::N, data & 0b10000000 != 0);

        0
    }

    pub(super) fn branch_if_minus(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = self.get_flag(Flag::N);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_not_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = !self.get_flag(Flag::Z);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_positive(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = !self.get_flag(Flag::N);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_overflow_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = !self.get_flag(Flag::V);
        self.branch_on(condition)
    }

    pub(super) fn branch_if_overflow_set(&mut self, _bus: &mut SystemBus) -> u32 {
        let condition = self.get_flag(Flag::V);
        self.branch_on(condition)
    }

    pub(super) fn clear_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::C, false);

        0
    }

    pub(super) fn clear_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::D, false);

        0
    }

    pub(super) fn clear_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::I, false);
        self.schedule_inhibit(false);

        0
    }

    pub(super) fn clear_overflow_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::V, false);

        0
    }

    pub(super) fn compare_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        self.compare(self.accumulator, data);

        self.page_crossed as u32
    }

    pub(super) fn compare_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        self.compare(self.x_index_reg, data);

        0
    }

    pub(super) fn compare_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        self.compare(self.y_index_reg, data);

        0
    }

    pub(super) fn decrement_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.fetch_operand(bus).wrapping_sub(1);
        self.write_to_operand(bus, result);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn decrement_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_sub(1);
        self.set_zero_negative(self.x_index_reg);

        0
    }

    pub(super) fn decrement_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_sub(1);
        self.set_zero_negative(self.y_index_reg);

        0
    }

    pub(super) fn exclusive_or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator ^= self.fetch_operand(bus);
        self.set_zero_negative(self.accumulator);

        self.page_crossed as u32
    }

    pub(super) fn force_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_word_to_stack(bus, self.program_counter.wrapping_add(1));
        self.push_byte_to_stack(
            bus,
            self.processor_status | Flag::B.mask() | Flag::U.mask(),
        );

        self.set_flag(Flag::I, true);
        self.inhibit = true;
        self.pending_inhibit = true;

        // a pending NMI hijacks the BRK vector
        let vector = if self.nmi_pending {
            self.nmi_pending = false;
            self.in_nmi = true;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        };

        self.program_counter = self.read_word(bus, vector);

        0
    }

    pub(super) fn increment_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.fetch_operand(bus).wrapping_add(1);
        self.write_to_operand(bus, result);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn increment_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_add(1);
        self.set_zero_negative(self.x_index_reg);

        0
    }

    pub(super) fn increment_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_add(1);
        self.set_zero_negative(self.y_index_reg);

        0
    }

    pub(super) fn jump(&mut self, _bus: &mut SystemBus) -> u32 {
        self.program_counter = self.operand_addr;

        0
    }

    pub(super) fn jump_to_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_word_to_stack(bus, self.program_counter.wrapping_sub(1));
        self.program_counter = self.operand_addr;

        0
    }

    pub(super) fn load_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.fetch_operand(bus);
        self.set_zero_negative(self.accumulator);

        self.page_crossed as u32
    }

    pub(super) fn load_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.fetch_operand(bus);
        self.set_zero_negative(self.x_index_reg);

        self.page_crossed as u32
    }

    pub(super) fn load_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.fetch_operand(bus);
        self.set_zero_negative(self.y_index_reg);

        self.page_crossed as u32
    }

    pub(super) fn logical_shift_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shr(1);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b00000001 != 0);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn no_operation(&mut self, bus: &mut SystemBus) -> u32 {
        // multi-byte NOPs still perform their operand read
        if !matches!(self.addr_mode, AddrMode::IMP | AddrMode::ACC | AddrMode::IMM) {
            self.fetch_operand(bus);
        }

        self.page_crossed as u32
    }

    pub(super) fn or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator |= self.fetch_operand(bus);
        self.set_zero_negative(self.accumulator);

        self.page_crossed as u32
    }

    pub(super) fn push_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(bus, self.accumulator);

        0
    }

    pub(super) fn push_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(
            bus,
            self.processor_status | Flag::B.mask() | Flag::U.mask(),
        );

        0
    }

    pub(super) fn pull_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.pop_byte_from_stack(bus);
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn pull_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        let status = self.pop_byte_from_stack(bus);
        self.processor_status = (status | Flag::U.mask()) & !Flag::B.mask();
        self.schedule_inhibit(status & Flag::I.mask() != 0);

        0
    }

    pub(super) fn return_from_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        let status = self.pop_byte_from_stack(bus);
        self.processor_status = (status | Flag::U.mask()) & !Flag::B.mask();

        // unlike PLP, the restored I bit gates IRQs with no latency
        self.inhibit = status & Flag::I.mask() != 0;
        self.pending_inhibit = self.inhibit;
        self.latency_remaining = 0;
        self.latency_armed = false;

        self.program_counter = self.pop_word_from_stack(bus);
        self.in_nmi = false;

        0
    }

    pub(super) fn return_from_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        self.program_counter = self.pop_word_from_stack(bus).wrapping_add(1);

        0
    }

    pub(super) fn rotate_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shl(1) | (self.get_flag(Flag::C) as u8);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b10000000 != 0);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn rotate_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shr(1) | ((self.get_flag(Flag::C) as u8) << 7);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b00000001 != 0);
        self.set_zero_negative(result);

        0
    }

    pub(super) fn set_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::C, true);

        0
    }

    pub(super) fn set_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::D, true);

        0
    }

    pub(super) fn set_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.set_flag(Flag::I, true);
        self.schedule_inhibit(true);

        0
    }

    pub(super) fn store_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_to_operand(bus, self.accumulator);

        0
    }

    pub(super) fn store_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_to_operand(bus, self.x_index_reg);

        0
    }

    pub(super) fn store_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_to_operand(bus, self.y_index_reg);

        0
    }

    pub(super) fn subtract_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        // the hardware runs SBC through the adder with the operand inverted
        let data = self.fetch_operand(bus);
        self.add_to_accumulator(!data);

        self.page_crossed as u32
    }

    pub(super) fn transfer_accumulator_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.accumulator;
        self.set_zero_negative(self.x_index_reg);

        0
    }

    pub(super) fn transfer_accumulator_to_y(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.accumulator;
        self.set_zero_negative(self.y_index_reg);

        0
    }

    pub(super) fn transfer_stack_pointer_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.stack_pointer;
        self.set_zero_negative(self.x_index_reg);

        0
    }

    pub(super) fn transfer_x_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.x_index_reg;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn transfer_x_to_stack_pointer(&mut self, _bus: &mut SystemBus) -> u32 {
        self.stack_pointer = self.x_index_reg;

        0
    }

    pub(super) fn transfer_y_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.y_index_reg;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn alr(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let masked = self.accumulator & data;

        self.accumulator = masked >> 1;
        self.set_flag(Flag::C, masked & 0x01 != 0);
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn anc(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator &= self.fetch_operand(bus);
        self.set_zero_negative(self.accumulator);
        self.set_flag(Flag::C, self.accumulator & 0b10000000 != 0);

        0
    }

    pub(super) fn ane(&mut self, bus: &mut SystemBus) -> u32 {
        // unstable: the magic constant models the floating bus term
        let data = self.fetch_operand(bus);
        self.accumulator = (self.accumulator | 0xEE) & self.x_index_reg & data;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn arr(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let masked = self.accumulator & data;

        self.accumulator = (masked >> 1) | ((self.get_flag(Flag::C) as u8) << 7);
        self.set_zero_negative(self.accumulator);

        let bit6 = (self.accumulator >> 6) & 0x01;
        let bit5 = (self.accumulator >> 5) & 0x01;
        self.set_flag(Flag::C, bit6 != 0);
        self.set_flag(Flag::V, bit6 ^ bit5 != 0);

        0
    }

    pub(super) fn dcp(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.fetch_operand(bus).wrapping_sub(1);
        self.write_to_operand(bus, result);
        self.compare(self.accumulator, result);

        0
    }

    pub(super) fn isc(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.fetch_operand(bus).wrapping_add(1);
        self.write_to_operand(bus, result);
        self.add_to_accumulator(!result);

        0
    }

    pub(super) fn las(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus) & self.stack_pointer;

        self.accumulator = data;
        self.x_index_reg = data;
        self.stack_pointer = data;
        self.set_zero_negative(data);

        self.page_crossed as u32
    }

    pub(super) fn lax(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);

        self.accumulator = data;
        self.x_index_reg = data;
        self.set_zero_negative(data);

        self.page_crossed as u32
    }

    pub(super) fn lxa(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);

        let result = (self.accumulator | 0xEE) & data;
        self.accumulator = result;
        self.x_index_reg = result;
        self.set_zero_negative(result);

        0
    }

    pub(super) fn rla(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shl(1) | (self.get_flag(Flag::C) as u8);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b10000000 != 0);
        self.accumulator &= result;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn rra(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shr(1) | ((self.get_flag(Flag::C) as u8) << 7);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b00000001 != 0);
        self.add_to_accumulator(result);

        0
    }

    pub(super) fn sax(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_to_operand(bus, self.accumulator & self.x_index_reg);

        0
    }

    pub(super) fn sbx(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let masked = self.accumulator & self.x_index_reg;

        self.set_flag(Flag::C, masked >= data);
        self.x_index_reg = masked.wrapping_sub(data);
        self.set_zero_negative(self.x_index_reg);

        0
    }

    pub(super) fn sha(&mut self, bus: &mut SystemBus) -> u32 {
        let value =
            self.accumulator & self.x_index_reg & ((self.operand_addr >> 8) as u8).wrapping_add(1);
        self.write_to_operand(bus, value);

        0
    }

    pub(super) fn shx(&mut self, bus: &mut SystemBus) -> u32 {
        let value = self.x_index_reg & ((self.operand_addr >> 8) as u8).wrapping_add(1);
        self.write_to_operand(bus, value);

        0
    }

    pub(super) fn shy(&mut self, bus: &mut SystemBus) -> u32 {
        let value = self.y_index_reg & ((self.operand_addr >> 8) as u8).wrapping_add(1);
        self.write_to_operand(bus, value);

        0
    }

    pub(super) fn slo(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shl(1);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b10000000 != 0);
        self.accumulator |= result;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn sre(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.fetch_operand(bus);
        let result = data.wrapping_shr(1);
        self.write_to_operand(bus, result);

        self.set_flag(Flag::C, data & 0b00000001 != 0);
        self.accumulator ^= result;
        self.set_zero_negative(self.accumulator);

        0
    }

    pub(super) fn tas(&mut self, bus: &mut SystemBus) -> u32 {
        self.stack_pointer = self.accumulator & self.x_index_reg;

        let value = self.stack_pointer & ((self.operand_addr >> 8) as u8).wrapping_add(1);
        self.write_to_operand(bus, value);

        0
    }

    pub(super) fn usbc(&mut self, bus: &mut SystemBus) -> u32 {
        self.subtract_with_carry(bus)
    }

    pub(super) fn jam(&mut self, _bus: &mut SystemBus) -> u32 {
        // rewind onto the KIL byte; the CPU makes no further progress but
        // the rest of the machine keeps ticking
        self.program_counter = self.program_counter.wrapping_sub(1);
        self.jammed = true;

        if self.last_jam_pc != Some(self.program_counter) {
            log::warn!("CPU jammed by KIL opcode at {:04X}", self.program_counter);
            self.last_jam_pc = Some(self.program_counter);
        }

        0
    }

    #[inline]
    pub(super) fn imp_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMP;

        self.set_operand_data(0);
    }

    #[inline]
    pub(super) fn acc_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ACC;

        self.set_operand_data(self.accumulator);
    }

    #[inline]
    pub(super) fn imm_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMM;
        let operand_data = self.advance_pc(bus);

        self.set_operand_data(operand_data);
    }

    #[inline]
    pub(super) fn zpg_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPG;
        let operand_addr = self.advance_pc(bus) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPX;
        let operand_addr = self.advance_pc(bus).wrapping_add(self.x_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpy_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPY;
        let operand_addr = self.advance_pc(bus).wrapping_add(self.y_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn rel_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::REL;

        // page crossing is judged from the branch instruction itself
        let operand_pc = self.program_counter;
        let offset = (self.advance_pc(bus) as i8) as i32;

        self.set_operand_addr((self.program_counter as i32 + offset) as u16);
        self.page_crossed = (operand_pc ^ self.operand_addr) & 0xFF00 != 0;
    }

    #[inline]
    pub(super) fn abs_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABS;
        let abs_address = self.fetch_abs_address(bus);

        self.set_operand_addr(abs_address);
    }

    #[inline]
    pub(super) fn abx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABX;
        let base = self.fetch_abs_address(bus);

        self.set_indexed_operand_addr(bus, base, self.x_index_reg);
    }

    #[inline]
    pub(super) fn aby_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABY;
        let base = self.fetch_abs_address(bus);

        self.set_indexed_operand_addr(bus, base, self.y_index_reg);
    }

    #[inline]
    pub(super) fn ind_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IND;
        let ptr = self.fetch_abs_address(bus);

        let lo = self.read_byte(bus, ptr) as u16;

        // the 6502 increments only the low pointer byte, so a pointer at
        // xxFF wraps within its page
        let hi = if ptr & 0xFF == 0xFF {
            self.read_byte(bus, ptr & 0xFF00)
        } else {
            self.read_byte(bus, ptr.wrapping_add(1))
        } as u16;

        self.set_operand_addr((hi << 8) | lo);
    }

    #[inline]
    pub(super) fn inx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::INX;
        let ptr = self.advance_pc(bus).wrapping_add(self.x_index_reg);

        let lo = self.read_byte(bus, ptr as u16) as u16;
        let hi = self.read_byte(bus, ptr.wrapping_add(1) as u16) as u16;

        self.set_operand_addr((hi << 8) | lo);
    }

    #[inline]
    pub(super) fn iny_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::INY;
        let ptr = self.advance_pc(bus);

        let lo = self.read_byte(bus, ptr as u16) as u16;
        let hi = self.read_byte(bus, ptr.wrapping_add(1) as u16) as u16;
        let base = (hi << 8) | lo;

        self.set_indexed_operand_addr(bus, base, self.y_index_reg);
    }

    /// Indexed modes: record the page cross and perform the partial-address
    /// dummy read the hardware makes before the high-byte fixup.
    #[inline]
    fn set_indexed_operand_addr(&mut self, bus: &mut SystemBus, base: u16, index: u8) {
        let addr = base.wrapping_add(index as u16);

        self.operand_addr = addr;
        self.page_crossed = (addr ^ base) & 0xFF00 != 0;

        if self.page_crossed || self.index_dummy_read {
            let partial = (base & 0xFF00) | (addr & 0x00FF);
            self.read_byte(bus, partial);
        }
    }

    /// Operand reads are deferred to the instruction body so that pure
    /// stores never touch their target address.
    #[inline]
    fn fetch_operand(&mut self, bus: &mut SystemBus) -> u8 {
        match self.addr_mode {
            AddrMode::IMP | AddrMode::ACC | AddrMode::IMM => self.operand_data,
            _ => {
                self.operand_data = self.read_byte(bus, self.operand_addr);
                self.operand_data
            }
        }
    }

    #[inline]
    fn write_to_operand(&mut self, bus: &mut SystemBus, byte: u8) {
        match self.addr_mode {
            AddrMode::ACC => self.accumulator = byte,
            _ => self.write_byte(bus, self.operand_addr, byte),
        }
    }

    #[inline]
    fn branch_on(&mut self, condition: bool) -> u32 {
        if condition {
            self.program_counter = self.operand_addr;

            1 + self.page_crossed as u32
        } else {
            0
        }
    }

    #[inline]
    fn add_to_accumulator(&mut self, data: u8) {
        let sum =
            self.accumulator as u16 + data as u16 + self.get_flag(Flag::C) as u16;
        let result = sum as u8;

        self.set_flag(Flag::C, sum > 0xFF);
        self.set_flag(
            Flag::V,
            (self.accumulator ^ result) & (data ^ result) & 0x80 != 0,
        );

        self.accumulator = result;
        self.set_zero_negative(result);
    }

    #[inline]
    fn compare(&mut self, register: u8, data: u8) {
        self.set_flag(Flag::C, register >= data);
        self.set_zero_negative(register.wrapping_sub(data));
    }

    #[inline]
    fn set_operand_addr(&mut self, operand_addr: u16) {
        self.operand_addr = operand_addr;
        self.page_crossed = false;
    }

    #[inline]
    fn set_operand_data(&mut self, operand_data: u8) {
        self.operand_data = operand_data;
        self.page_crossed = false;
    }

    #[inline]
    fn fetch_abs_address(&mut self, bus: &mut SystemBus) -> u16 {
        let lo = self.advance_pc(bus) as u16;
        let hi = self.advance_pc(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push_word_to_stack(&mut self, bus: &mut SystemBus, word: u16) {
        self.push_byte_to_stack(bus, ((word & 0xFF00) >> 8) as u8);
        self.push_byte_to_stack(bus, word as u8);
    }

    #[inline]
    fn pop_word_from_stack(&mut self, bus: &mut SystemBus) -> u16 {
        let lo = self.pop_byte_from_stack(bus) as u16;
        let hi = self.pop_byte_from_stack(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push_byte_to_stack(&mut self, bus: &mut SystemBus, byte: u8) {
        self.write_byte(bus, STACK_START | self.stack_pointer as u16, byte);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    #[inline]
    fn pop_byte_from_stack(&mut self, bus: &mut SystemBus) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        self.read_byte(bus, STACK_START | self.stack_pointer as u16)
    }

    #[inline]
    fn set_flag(&mut self, flag: Flag, val: bool) {
        let mask = flag.mask();
        if val {
            self.processor_status |= mask;
        } else {
            self.processor_status &= !mask;
        }
    }

    #[inline]
    fn get_flag(&self, flag: Flag) -> bool {
        (self.processor_status & flag.mask()) != 0
    }

    #[inline]
    fn set_zero_negative(&mut self, value: u8) {
        self.set_flag(Flag::Z, value == 0);
        self.set_flag(Flag::N, value & 0b10000000 != 0);
    }

    #[inline]
    fn advance_pc(&mut self, bus: &mut SystemBus) -> u8 {
        let ret = self.read_byte(bus, self.program_counter);
        self.program_counter = self.program_counter.wrapping_add(1);
        ret
    }

    #[inline]
    fn read_byte(&mut self, bus: &mut SystemBus, addr: u16) -> u8 {
        match addr {
            0x4015 => self.apu.read_status(),
            _ => bus.cpu_read(addr as usize, false),
        }
    }

    #[inline]
    fn read_word(&mut self, bus: &mut SystemBus, addr: u16) -> u16 {
        let lo = self.read_byte(bus, addr) as u16;
        let hi = self.read_byte(bus, addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn write_byte(&mut self, bus: &mut SystemBus, addr: u16, byte: u8) {
        match addr {
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(addr as usize, byte),
            _ => bus.cpu_write(addr as usize, byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cpu() -> (Cpu6502, SystemBus) {
        let cpu = Cpu6502::new(Apu2A03::test_new());
        let bus = SystemBus::test_new();
        (cpu, bus)
    }

    fn step(cpu: &mut Cpu6502, bus: &mut SystemBus) -> u32 {
        cpu.step_one_instruction(bus)
    }

    #[test]
    fn test_lda_addressing_modes() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(
            0x8000,
            &[0xA9, 0x11, 0xA5, 0xFE, 0xB5, 0xFC, 0xAD, 0x34, 0x12, 0xBD, 0x34, 0x12, 0xB9, 0x34, 0x12],
        );

        cpu.program_counter = 0x8000;
        cpu.x_index_reg = 2;
        cpu.y_index_reg = 3;
        bus.cpu_write(0xFE, 0x22);
        bus.cpu_write(0x1234, 0x33);
        bus.cpu_write(0x1236, 0x44);
        bus.cpu_write(0x1237, 0x55);

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0x8002);
        assert_eq!(cpu.accumulator, 0x11, "FAILED: imm");

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.accumulator, 0x22, "FAILED: zpg");

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.accumulator, 0x22, "FAILED: zpx");

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.accumulator, 0x33, "FAILED: abs");

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.accumulator, 0x44, "FAILED: abx");

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.accumulator, 0x55, "FAILED: aby");
    }

    #[test]
    fn test_stack() {
        let (mut cpu, mut bus) = test_cpu();

        cpu.push_byte_to_stack(&mut bus, 0x88);
        assert_eq!(cpu.pop_byte_from_stack(&mut bus), 0x88);

        cpu.push_word_to_stack(&mut bus, 0x1122);
        assert_eq!(cpu.pop_word_from_stack(&mut bus), 0x1122);

        cpu.push_word_to_stack(&mut bus, 0x3344);
        cpu.push_word_to_stack(&mut bus, 0x5566);

        assert_eq!(cpu.pop_word_from_stack(&mut bus), 0x5566);
        assert_eq!(cpu.pop_word_from_stack(&mut bus), 0x3344);
    }

    fn do_adc(operand1: u8, operand2: u8, result: u8, overflow: bool, carry: bool) {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x69, operand2]);

        cpu.program_counter = 0x8000;
        cpu.accumulator = operand1;

        step(&mut cpu, &mut bus);

        assert_eq!(cpu.accumulator, result, "Incorrect Result");
        assert_eq!(cpu.get_flag(Flag::C), carry, "Incorrect Carry Result");
        assert_eq!(cpu.get_flag(Flag::V), overflow, "Incorrect Overflow Result");
    }

    fn do_sbc(operand1: u8, operand2: u8, result: u8, overflow: bool, carry: bool) {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xE9, operand2]);

        cpu.program_counter = 0x8000;
        cpu.set_flag(Flag::C, true);
        cpu.accumulator = operand1;

        step(&mut cpu, &mut bus);

        assert_eq!(cpu.accumulator, result, "Incorrect Result");
        assert_eq!(cpu.get_flag(Flag::C), carry, "Incorrect Carry Result");
        assert_eq!(cpu.get_flag(Flag::V), overflow, "Incorrect Overflow Result");
    }

    #[test]
    fn test_adc() {
        do_adc(1, 1, 2, false, false);
        do_adc(0x7F, 0x7F, 0xFE, true, false);
        do_adc(50, 25, 75, false, false);
        do_adc(128, 128, 0, true, true);
        do_adc(0b01111111, 0b00000010, 0b10000001, true, false);
        do_adc(255, 1, 0, false, true);
    }

    #[test]
    fn test_sbc() {
        do_sbc(3, 1, 2, false, true);
        do_sbc(100, 50, 50, false, true);
        do_sbc(128, 1, 127, true, true);
        do_sbc(0, 1, 255, false, false);
    }

    #[test]
    fn reset_jumps_through_fffc() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0xFFFC, &[0x05, 0x80]);

        cpu.reset_with_bus(&mut bus);

        assert_eq!(cpu.program_counter, 0x8005);
        assert_eq!(cpu.stack_pointer, 0xFD);
        assert!(cpu.get_flag(Flag::I));
    }

    #[test]
    fn branch_taken_across_page_costs_four_cycles() {
        let (mut cpu, mut bus) = test_cpu();
        // BEQ +2 at $80FE: branch target $8102 is on the next page
        bus.load_ram(0x80FE, &[0xF0, 0x02]);

        cpu.program_counter = 0x80FE;
        cpu.set_flag(Flag::Z, true);

        let cycles = step(&mut cpu, &mut bus);

        assert_eq!(cycles, 4);
        assert_eq!(cpu.program_counter, 0x8102);
    }

    #[test]
    fn branch_not_taken_costs_base_cycles() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xF0, 0x02]);

        cpu.program_counter = 0x8000;
        cpu.set_flag(Flag::Z, false);

        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.program_counter, 0x8002);
    }

    #[test]
    fn indirect_jmp_wraps_within_the_pointer_page() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x6C, 0xFF, 0x10]);
        bus.cpu_write(0x10FF, 0x34);
        bus.cpu_write(0x1000, 0x12);
        bus.cpu_write(0x1100, 0x56);

        cpu.program_counter = 0x8000;
        step(&mut cpu, &mut bus);

        assert_eq!(cpu.program_counter, 0x1234);
    }

    #[test]
    fn lda_absolute_x_page_cross_costs_extra_cycle() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xBD, 0xFF, 0x00, 0xBD, 0x00, 0x01]);

        cpu.program_counter = 0x8000;
        cpu.x_index_reg = 1;

        assert_eq!(step(&mut cpu, &mut bus), 5, "crossing into $0100");
        assert_eq!(step(&mut cpu, &mut bus), 4, "no cross");
    }

    #[test]
    fn sta_absolute_x_always_costs_five_cycles() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x9D, 0x00, 0x01]);

        cpu.program_counter = 0x8000;
        cpu.x_index_reg = 0;
        cpu.accumulator = 0x42;

        assert_eq!(step(&mut cpu, &mut bus), 5);
        assert_eq!(bus.cpu_read(0x0100, false), 0x42);
    }

    #[test]
    fn php_sets_b_and_u_bits_plp_ignores_them() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x08, 0x28]);

        cpu.program_counter = 0x8000;
        cpu.processor_status = Flag::C.mask() | Flag::U.mask();

        step(&mut cpu, &mut bus);
        let pushed = bus.cpu_read(0x01FD, false);
        assert_eq!(pushed & 0x30, 0x30);

        step(&mut cpu, &mut bus);
        assert_eq!(cpu.processor_status & Flag::B.mask(), 0);
        assert_ne!(cpu.processor_status & Flag::U.mask(), 0);
    }

    #[test]
    fn irq_is_gated_by_inhibit_and_serviced_through_fffe() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xEA, 0xEA]);
        bus.load_ram(0x9000, &[0xEA, 0xEA]);
        bus.load_ram(0xFFFE, &[0x00, 0x90]);

        cpu.program_counter = 0x8000;
        cpu.trigger_irq();

        // I is set after reset: the IRQ must be held off
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0x8001);

        cpu.inhibit = false;
        cpu.processor_status &= !Flag::I.mask();

        let cycles = step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0x9001, "vectored then executed one NOP");
        assert_eq!(cycles, 7 + 2);
        assert!(cpu.get_flag(Flag::I));
    }

    #[test]
    fn cli_takes_effect_one_instruction_late() {
        let (mut cpu, mut bus) = test_cpu();
        // SEI, CLI, NOP, NOP
        bus.load_ram(0x8000, &[0x78, 0x58, 0xEA, 0xEA]);
        bus.load_ram(0x9000, &[0xEA, 0xEA]);
        bus.load_ram(0xFFFE, &[0x00, 0x90]);

        cpu.program_counter = 0x8000;
        step(&mut cpu, &mut bus); // SEI

        cpu.trigger_irq();

        step(&mut cpu, &mut bus); // CLI; recognition still inhibited
        assert_eq!(cpu.program_counter, 0x8002);

        step(&mut cpu, &mut bus); // NOP; latency window
        assert_eq!(cpu.program_counter, 0x8003);

        step(&mut cpu, &mut bus); // IRQ recognized, then one handler NOP runs
        assert_eq!(cpu.program_counter, 0x9001);
    }

    #[test]
    fn nmi_has_priority_and_hijacks_brk() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x00, 0xEA]);
        bus.load_ram(0xFFFA, &[0x00, 0xA0]);
        bus.load_ram(0xFFFE, &[0x00, 0x90]);

        cpu.program_counter = 0x8000;
        cpu.nmi_pending = true;
        cpu.nmi_delay = 2;

        // BRK executes while the NMI is pending: its vector is replaced
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0xA000);
        assert!(!cpu.nmi_pending);
    }

    #[test]
    fn kil_jams_the_cpu_but_keeps_burning_cycles() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x02]);

        cpu.program_counter = 0x8000;

        let cycles = step(&mut cpu, &mut bus);
        assert!(cycles > 0);
        assert!(cpu.jammed());
        assert_eq!(cpu.program_counter, 0x8000);

        // further steps keep the PC pinned and the clock running
        let cycles = step(&mut cpu, &mut bus);
        assert!(cycles > 0);
        assert_eq!(cpu.program_counter, 0x8000);
    }

    #[test]
    fn jammed_cpu_ignores_interrupts() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0x02]);
        bus.load_ram(0xFFFA, &[0x00, 0xA0]);

        cpu.program_counter = 0x8000;
        step(&mut cpu, &mut bus);

        cpu.trigger_nmi();
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0x8000);
    }

    #[test]
    fn lax_loads_both_registers() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xA7, 0x10]);
        bus.cpu_write(0x0010, 0x8E);

        cpu.program_counter = 0x8000;
        step(&mut cpu, &mut bus);

        assert_eq!(cpu.accumulator, 0x8E);
        assert_eq!(cpu.x_index_reg, 0x8E);
        assert!(cpu.get_flag(Flag::N));
    }

    #[test]
    fn dcp_decrements_then_compares() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xC7, 0x10]);
        bus.cpu_write(0x0010, 0x41);

        cpu.program_counter = 0x8000;
        cpu.accumulator = 0x40;
        step(&mut cpu, &mut bus);

        assert_eq!(bus.cpu_read(0x0010, false), 0x40);
        assert!(cpu.get_flag(Flag::Z));
        assert!(cpu.get_flag(Flag::C));
    }

    #[test]
    fn sbx_sets_carry_like_compare() {
        let (mut cpu, mut bus) = test_cpu();
        bus.load_ram(0x8000, &[0xCB, 0x02]);

        cpu.program_counter = 0x8000;
        cpu.accumulator = 0x0F;
        cpu.x_index_reg = 0x07;
        step(&mut cpu, &mut bus);

        assert_eq!(cpu.x_index_reg, 0x05);
        assert!(cpu.get_flag(Flag::C));
    }

    #[test]
    fn oam_dma_write_stalls_513_or_514_cycles() {
        let (mut cpu, mut bus) = test_cpu();
        // STA $4014 with A = 2
        bus.load_ram(0x8000, &[0x8D, 0x14, 0x40]);

        cpu.program_counter = 0x8000;
        cpu.accumulator = 0x02;

        let cycles = step(&mut cpu, &mut bus);
        let dma = cycles - 4;
        assert!(dma == 513 || dma == 514, "dma stall was {}", dma);
    }

    #[test]
    fn rti_restores_inhibit_without_latency() {
        let (mut cpu, mut bus) = test_cpu();
        // push a status byte with I clear and a return address, then RTI
        bus.load_ram(0x8000, &[0x40, 0xEA]);
        bus.load_ram(0x9000, &[0xEA, 0xEA]);
        bus.load_ram(0xFFFE, &[0x00, 0x90]);

        cpu.program_counter = 0x8000;
        cpu.push_word_to_stack(&mut bus, 0x8001);
        cpu.push_byte_to_stack(&mut bus, 0x20); // I clear

        cpu.trigger_irq();
        step(&mut cpu, &mut bus); // RTI

        assert_eq!(cpu.program_counter, 0x8001);
        assert!(!cpu.inhibit);

        // next boundary recognizes the IRQ immediately
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.program_counter, 0x9001);
    }
}

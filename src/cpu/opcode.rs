use crate::bus::SystemBus;

use super::Cpu6502;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    IMP, ACC, IMM,
    ZPG, ZPX, ZPY,
    REL, ABS, ABX,
    ABY, IND, INX, INY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,

    // Unofficial / Illegal Opcodes
    ALR, ANC, ANE, ARR, DCP, ISC, LAS, LAX, LXA, RLA, RRA, SAX, SBX, SHA,
    SHX, SHY, SLO, SRE, TAS, USBC, JAM,
}

pub struct Opcode {
    pub opcode: u8,
    pub instr: Instr,
    pub addr_mode: AddrMode,
    pub addr_mode_fn: fn(&mut Cpu6502, &mut SystemBus),
    pub instr_fn: fn(&mut Cpu6502, &mut SystemBus) -> u32,
    pub cycles: u32,
    pub illegal: bool,
    /// Indexed addressing performs the partial-address dummy read even
    /// without a page cross (stores and read-modify-write instructions).
    pub index_dummy_read: bool,
}

impl Opcode {
    pub fn execute_op(&self, cpu: &mut Cpu6502, bus: &mut SystemBus) -> u32 {
        (self.addr_mode_fn)(cpu, bus);
        let extra_cycles = (self.instr_fn)(cpu, bus);
        self.cycles + extra_cycles
    }

    pub fn new(opcode: u8, addr_mode: AddrMode, instr: Instr, cycles: u32, illegal: bool) -> Self {
        let addr_mode_fn = match addr_mode {
            AddrMode::IMP => Cpu6502::imp_addressing,
            AddrMode::ACC => Cpu6502::acc_addressing,
            AddrMode::IMM => Cpu6502::imm_addressing,
            AddrMode::ZPG => Cpu6502::zpg_addressing,
            AddrMode::ZPX => Cpu6502::zpx_addressing,
            AddrMode::ZPY => Cpu6502::zpy_addressing,
            AddrMode::REL => Cpu6502::rel_addressing,
            AddrMode::ABS => Cpu6502::abs_addressing,
            AddrMode::ABX => Cpu6502::abx_addressing,
            AddrMode::ABY => Cpu6502::aby_addressing,
            AddrMode::IND => Cpu6502::ind_addressing,
            AddrMode::INX => Cpu6502::inx_addressing,
            AddrMode::INY => Cpu6502::iny_addressing,
        };

        let instr_fn = match instr {
            Instr::ADC => Cpu6502::add_with_carry,
            Instr::AND => Cpu6502::and_accumulator,
            Instr::ASL => Cpu6502::arithmetic_shift_left,
            Instr::BCC => Cpu6502::branch_if_carry_clear,
            Instr::BCS => Cpu6502::branch_if_carry_set,
            Instr::BEQ => Cpu6502::branch_if_equal,
            Instr::BIT => Cpu6502::bit_test,
            Instr::BMI => Cpu6502::branch_if_minus,
            Instr::BNE => Cpu6502::branch_if_not_equal,
            Instr::BPL => Cpu6502::branch_if_positive,
            Instr::BRK => Cpu6502::force_interrupt,
            Instr::BVC => Cpu6502::branch_if_overflow_clear,
            Instr::BVS => Cpu6502::branch_if_overflow_set,
            Instr::CLC => Cpu6502::clear_carry_flag,
            Instr::CLD => Cpu6502::clear_decimal_mode,
            Instr::CLI => Cpu6502::clear_interrupt_disable,
            Instr::CLV => Cpu6502::clear_overflow_flag,
            Instr::CMP => Cpu6502::compare_accumulator,
            Instr::CPX => Cpu6502::compare_x_reg,
            Instr::CPY => Cpu6502::compare_y_reg,
            Instr::DEC => Cpu6502::decrement_memory,
            Instr::DEX => Cpu6502::decrement_x_reg,
            Instr::DEY => Cpu6502::decrement_y_reg,
            Instr::EOR => Cpu6502::exclusive_or_accumulator,
            Instr::INC => Cpu6502::increment_memory,
            Instr::INX => Cpu6502::increment_x_reg,
            Instr::INY => Cpu6502::increment_y_reg,
            Instr::JMP => Cpu6502::jump,
            Instr::JSR => Cpu6502::jump_to_subroutine,
            Instr::LDA => Cpu6502::load_accumulator,
            Instr::LDX => Cpu6502::load_x_reg,
            Instr::LDY => Cpu6502::load_y_reg,
            Instr::LSR => Cpu6502::logical_shift_right,
            Instr::NOP => Cpu6502::no_operation,
            Instr::ORA => Cpu6502::or_accumulator,
            Instr::PHA => Cpu6502::push_accumulator,
            Instr::PHP => Cpu6502::push_processor_status,
            Instr::PLA => Cpu6502::pull_accumulator,
            Instr::PLP => Cpu6502::pull_processor_status,
            Instr::ROL => Cpu6502::rotate_left,
            Instr::ROR => Cpu6502::rotate_right,
            Instr::RTI => Cpu6502::return_from_interrupt,
            Instr::RTS => Cpu6502::return_from_subroutine,
            Instr::SBC => Cpu6502::subtract_with_carry,
            Instr::SEC => Cpu6502::set_carry_flag,
            Instr::SED => Cpu6502::set_decimal_mode,
            Instr::SEI => Cpu6502::set_interrupt_disable,
            Instr::STA => Cpu6502::store_accumulator,
            Instr::STX => Cpu6502::store_x_reg,
            Instr::STY => Cpu6502::store_y_reg,
            Instr::TAX => Cpu6502::transfer_accumulator_to_x,
            Instr::TAY => Cpu6502::transfer_accumulator_to_y,
            Instr::TSX => Cpu6502::transfer_stack_pointer_to_x,
            Instr::TXA => Cpu6502::transfer_x_to_accumulator,
            Instr::TXS => Cpu6502::transfer_x_to_stack_pointer,
            Instr::TYA => Cpu6502::transfer_y_to_accumulator,

            Instr::ALR => Cpu6502::alr,
            Instr::ANC => Cpu6502::anc,
            Instr::ANE => Cpu6502::ane,
            Instr::ARR => Cpu6502::arr,
            Instr::DCP => Cpu6502::dcp,
            Instr::ISC => Cpu6502::isc,
            Instr::LAS => Cpu6502::las,
            Instr::LAX => Cpu6502::lax,
            Instr::LXA => Cpu6502::lxa,
            Instr::RLA => Cpu6502::rla,
            Instr::RRA => Cpu6502::rra,
            Instr::SAX => Cpu6502::sax,
            Instr::SBX => Cpu6502::sbx,
            Instr::SHA => Cpu6502::sha,
            Instr::SHX => Cpu6502::shx,
            Instr::SHY => Cpu6502::shy,
            Instr::SLO => Cpu6502::slo,
            Instr::SRE => Cpu6502::sre,
            Instr::TAS => Cpu6502::tas,
            Instr::USBC => Cpu6502::usbc,
            Instr::JAM => Cpu6502::jam,
        };

        let index_dummy_read = matches!(
            instr,
            Instr::STA | Instr::STX | Instr::STY | Instr::SAX
                | Instr::SHA | Instr::SHX | Instr::SHY | Instr::TAS
                | Instr::ASL | Instr::LSR | Instr::ROL | Instr::ROR
                | Instr::INC | Instr::DEC
                | Instr::SLO | Instr::RLA | Instr::SRE | Instr::RRA
                | Instr::DCP | Instr::ISC
        );

        Self {
            opcode,
            instr,
            addr_mode,
            addr_mode_fn,
            instr_fn,
            cycles,
            illegal,
            index_dummy_read,
        }
    }
}

lazy_static! {
    pub static ref OPCODE_TABLE: [Opcode; 256] = build_opcode_table();
}

fn build_opcode_table() -> [Opcode; 256] {
    use AddrMode::*;
    use Instr::*;

    // Every opcode not listed below is one of the twelve KIL encodings.
    let mut table: [Opcode; 256] =
        std::array::from_fn(|code| Opcode::new(code as u8, IMP, JAM, 2, true));

    let defs: &[(u8, Instr, AddrMode, u32, bool)] = &[
        // Load/Store
        (0xA9, LDA, IMM, 2, false), (0xA5, LDA, ZPG, 3, false), (0xB5, LDA, ZPX, 4, false),
        (0xAD, LDA, ABS, 4, false), (0xBD, LDA, ABX, 4, false), (0xB9, LDA, ABY, 4, false),
        (0xA1, LDA, AddrMode::INX, 6, false), (0xB1, LDA, AddrMode::INY, 5, false),
        (0xA2, LDX, IMM, 2, false), (0xA6, LDX, ZPG, 3, false), (0xB6, LDX, ZPY, 4, false),
        (0xAE, LDX, ABS, 4, false), (0xBE, LDX, ABY, 4, false),
        (0xA0, LDY, IMM, 2, false), (0xA4, LDY, ZPG, 3, false), (0xB4, LDY, ZPX, 4, false),
        (0xAC, LDY, ABS, 4, false), (0xBC, LDY, ABX, 4, false),
        (0x85, STA, ZPG, 3, false), (0x95, STA, ZPX, 4, false), (0x8D, STA, ABS, 4, false),
        (0x9D, STA, ABX, 5, false), (0x99, STA, ABY, 5, false), (0x81, STA, AddrMode::INX, 6, false),
        (0x91, STA, AddrMode::INY, 6, false),
        (0x86, STX, ZPG, 3, false), (0x96, STX, ZPY, 4, false), (0x8E, STX, ABS, 4, false),
        (0x84, STY, ZPG, 3, false), (0x94, STY, ZPX, 4, false), (0x8C, STY, ABS, 4, false),
        // Transfer
        (0xAA, TAX, IMP, 2, false), (0xA8, TAY, IMP, 2, false), (0xBA, TSX, IMP, 2, false),
        (0x8A, TXA, IMP, 2, false), (0x9A, TXS, IMP, 2, false), (0x98, TYA, IMP, 2, false),
        // Stack
        (0x48, PHA, IMP, 3, false), (0x68, PLA, IMP, 4, false),
        (0x08, PHP, IMP, 3, false), (0x28, PLP, IMP, 4, false),
        // Arithmetic
        (0x69, ADC, IMM, 2, false), (0x65, ADC, ZPG, 3, false), (0x75, ADC, ZPX, 4, false),
        (0x6D, ADC, ABS, 4, false), (0x7D, ADC, ABX, 4, false), (0x79, ADC, ABY, 4, false),
        (0x61, ADC, AddrMode::INX, 6, false), (0x71, ADC, AddrMode::INY, 5, false),
        (0xE9, SBC, IMM, 2, false), (0xE5, SBC, ZPG, 3, false), (0xF5, SBC, ZPX, 4, false),
        (0xED, SBC, ABS, 4, false), (0xFD, SBC, ABX, 4, false), (0xF9, SBC, ABY, 4, false),
        (0xE1, SBC, AddrMode::INX, 6, false), (0xF1, SBC, AddrMode::INY, 5, false),
        // Logic
        (0x29, AND, IMM, 2, false), (0x25, AND, ZPG, 3, false), (0x35, AND, ZPX, 4, false),
        (0x2D, AND, ABS, 4, false), (0x3D, AND, ABX, 4, false), (0x39, AND, ABY, 4, false),
        (0x21, AND, AddrMode::INX, 6, false), (0x31, AND, AddrMode::INY, 5, false),
        (0x49, EOR, IMM, 2, false), (0x45, EOR, ZPG, 3, false), (0x55, EOR, ZPX, 4, false),
        (0x4D, EOR, ABS, 4, false), (0x5D, EOR, ABX, 4, false), (0x59, EOR, ABY, 4, false),
        (0x41, EOR, AddrMode::INX, 6, false), (0x51, EOR, AddrMode::INY, 5, false),
        (0x09, ORA, IMM, 2, false), (0x05, ORA, ZPG, 3, false), (0x15, ORA, ZPX, 4, false),
        (0x0D, ORA, ABS, 4, false), (0x1D, ORA, ABX, 4, false), (0x19, ORA, ABY, 4, false),
        (0x01, ORA, AddrMode::INX, 6, false), (0x11, ORA, AddrMode::INY, 5, false),
        // Shift/Rotate
        (0x0A, ASL, ACC, 2, false), (0x06, ASL, ZPG, 5, false), (0x16, ASL, ZPX, 6, false),
        (0x0E, ASL, ABS, 6, false), (0x1E, ASL, ABX, 7, false),
        (0x4A, LSR, ACC, 2, false), (0x46, LSR, ZPG, 5, false), (0x56, LSR, ZPX, 6, false),
        (0x4E, LSR, ABS, 6, false), (0x5E, LSR, ABX, 7, false),
        (0x2A, ROL, ACC, 2, false), (0x26, ROL, ZPG, 5, false), (0x36, ROL, ZPX, 6, false),
        (0x2E, ROL, ABS, 6, false), (0x3E, ROL, ABX, 7, false),
        (0x6A, ROR, ACC, 2, false), (0x66, ROR, ZPG, 5, false), (0x76, ROR, ZPX, 6, false),
        (0x6E, ROR, ABS, 6, false), (0x7E, ROR, ABX, 7, false),
        // Compare
        (0xC9, CMP, IMM, 2, false), (0xC5, CMP, ZPG, 3, false), (0xD5, CMP, ZPX, 4, false),
        (0xCD, CMP, ABS, 4, false), (0xDD, CMP, ABX, 4, false), (0xD9, CMP, ABY, 4, false),
        (0xC1, CMP, AddrMode::INX, 6, false), (0xD1, CMP, AddrMode::INY, 5, false),
        (0xE0, CPX, IMM, 2, false), (0xE4, CPX, ZPG, 3, false), (0xEC, CPX, ABS, 4, false),
        (0xC0, CPY, IMM, 2, false), (0xC4, CPY, ZPG, 3, false), (0xCC, CPY, ABS, 4, false),
        // Bit Test
        (0x24, BIT, ZPG, 3, false), (0x2C, BIT, ABS, 4, false),
        // Increment/Decrement
        (0xE6, INC, ZPG, 5, false), (0xF6, INC, ZPX, 6, false), (0xEE, INC, ABS, 6, false),
        (0xFE, INC, ABX, 7, false), (0xE8, Instr::INX, IMP, 2, false), (0xC8, Instr::INY, IMP, 2, false),
        (0xC6, DEC, ZPG, 5, false), (0xD6, DEC, ZPX, 6, false), (0xCE, DEC, ABS, 6, false),
        (0xDE, DEC, ABX, 7, false), (0xCA, DEX, IMP, 2, false), (0x88, DEY, IMP, 2, false),
        // Branches
        (0x10, BPL, REL, 2, false), (0x30, BMI, REL, 2, false), (0x50, BVC, REL, 2, false),
        (0x70, BVS, REL, 2, false), (0x90, BCC, REL, 2, false), (0xB0, BCS, REL, 2, false),
        (0xD0, BNE, REL, 2, false), (0xF0, BEQ, REL, 2, false),
        // Jumps/Calls
        (0x4C, JMP, ABS, 3, false), (0x6C, JMP, IND, 5, false),
        (0x20, JSR, ABS, 6, false), (0x60, RTS, IMP, 6, false),
        // Interrupts
        (0x00, BRK, IMP, 7, false), (0x40, RTI, IMP, 6, false),
        // Flags
        (0x18, CLC, IMP, 2, false), (0x38, SEC, IMP, 2, false), (0x58, CLI, IMP, 2, false),
        (0x78, SEI, IMP, 2, false), (0xB8, CLV, IMP, 2, false), (0xD8, CLD, IMP, 2, false),
        (0xF8, SED, IMP, 2, false),
        // No Operation
        (0xEA, NOP, IMP, 2, false),
        // Unofficial NOPs in their eight encodings
        (0x1A, NOP, IMP, 2, true), (0x3A, NOP, IMP, 2, true), (0x5A, NOP, IMP, 2, true),
        (0x7A, NOP, IMP, 2, true), (0xDA, NOP, IMP, 2, true), (0xFA, NOP, IMP, 2, true),
        (0x80, NOP, IMM, 2, true), (0x82, NOP, IMM, 2, true), (0x89, NOP, IMM, 2, true),
        (0xC2, NOP, IMM, 2, true), (0xE2, NOP, IMM, 2, true),
        (0x04, NOP, ZPG, 3, true), (0x44, NOP, ZPG, 3, true), (0x64, NOP, ZPG, 3, true),
        (0x14, NOP, ZPX, 4, true), (0x34, NOP, ZPX, 4, true), (0x54, NOP, ZPX, 4, true),
        (0x74, NOP, ZPX, 4, true), (0xD4, NOP, ZPX, 4, true), (0xF4, NOP, ZPX, 4, true),
        (0x0C, NOP, ABS, 4, true),
        (0x1C, NOP, ABX, 4, true), (0x3C, NOP, ABX, 4, true), (0x5C, NOP, ABX, 4, true),
        (0x7C, NOP, ABX, 4, true), (0xDC, NOP, ABX, 4, true), (0xFC, NOP, ABX, 4, true),
        // LAX - Load Accumulator and X
        (0xA7, LAX, ZPG, 3, true), (0xB7, LAX, ZPY, 4, true), (0xAF, LAX, ABS, 4, true),
        (0xBF, LAX, ABY, 4, true), (0xA3, LAX, AddrMode::INX, 6, true), (0xB3, LAX, AddrMode::INY, 5, true),
        (0xAB, LXA, IMM, 2, true),
        // SAX - Store Accumulator AND X
        (0x87, SAX, ZPG, 3, true), (0x97, SAX, ZPY, 4, true), (0x8F, SAX, ABS, 4, true),
        (0x83, SAX, AddrMode::INX, 6, true),
        // DCP - Decrement and Compare
        (0xC7, DCP, ZPG, 5, true), (0xD7, DCP, ZPX, 6, true), (0xCF, DCP, ABS, 6, true),
        (0xDF, DCP, ABX, 7, true), (0xDB, DCP, ABY, 7, true), (0xC3, DCP, AddrMode::INX, 8, true),
        (0xD3, DCP, AddrMode::INY, 8, true),
        // ISC - Increment and Subtract with Carry
        (0xE7, ISC, ZPG, 5, true), (0xF7, ISC, ZPX, 6, true), (0xEF, ISC, ABS, 6, true),
        (0xFF, ISC, ABX, 7, true), (0xFB, ISC, ABY, 7, true), (0xE3, ISC, AddrMode::INX, 8, true),
        (0xF3, ISC, AddrMode::INY, 8, true),
        // SLO - Shift Left and OR
        (0x07, SLO, ZPG, 5, true), (0x17, SLO, ZPX, 6, true), (0x0F, SLO, ABS, 6, true),
        (0x1F, SLO, ABX, 7, true), (0x1B, SLO, ABY, 7, true), (0x03, SLO, AddrMode::INX, 8, true),
        (0x13, SLO, AddrMode::INY, 8, true),
        // RLA - Rotate Left and AND
        (0x27, RLA, ZPG, 5, true), (0x37, RLA, ZPX, 6, true), (0x2F, RLA, ABS, 6, true),
        (0x3F, RLA, ABX, 7, true), (0x3B, RLA, ABY, 7, true), (0x23, RLA, AddrMode::INX, 8, true),
        (0x33, RLA, AddrMode::INY, 8, true),
        // SRE - Shift Right and EOR
        (0x47, SRE, ZPG, 5, true), (0x57, SRE, ZPX, 6, true), (0x4F, SRE, ABS, 6, true),
        (0x5F, SRE, ABX, 7, true), (0x5B, SRE, ABY, 7, true), (0x43, SRE, AddrMode::INX, 8, true),
        (0x53, SRE, AddrMode::INY, 8, true),
        // RRA - Rotate Right and Add with Carry
        (0x67, RRA, ZPG, 5, true), (0x77, RRA, ZPX, 6, true), (0x6F, RRA, ABS, 6, true),
        (0x7F, RRA, ABX, 7, true), (0x7B, RRA, ABY, 7, true), (0x63, RRA, AddrMode::INX, 8, true),
        (0x73, RRA, AddrMode::INY, 8, true),
        // Immediate-mode combinations
        (0x0B, ANC, IMM, 2, true), (0x2B, ANC, IMM, 2, true),
        (0x4B, ALR, IMM, 2, true), (0x6B, ARR, IMM, 2, true),
        (0xCB, SBX, IMM, 2, true), (0xEB, USBC, IMM, 2, true),
        (0x8B, ANE, IMM, 2, true),
        // Stack-pointer / high-byte oddities
        (0xBB, LAS, ABY, 4, true), (0x9B, TAS, ABY, 5, true),
        (0x9E, SHX, ABY, 5, true), (0x9C, SHY, ABX, 5, true),
        (0x9F, SHA, ABY, 5, true), (0x93, SHA, AddrMode::INY, 6, true),
    ];

    for &(code, instr, addr_mode, cycles, illegal) in defs {
        table[code as usize] = Opcode::new(code, addr_mode, instr, cycles, illegal);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_undefined_opcode_is_a_kil_encoding() {
        let kil = [
            0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2,
        ];

        for code in 0..=255u8 {
            let op = &OPCODE_TABLE[code as usize];
            assert_eq!(op.opcode, code);
            assert_eq!(op.instr == Instr::JAM, kil.contains(&code), "opcode {:02X}", code);
        }
    }

    #[test]
    fn documented_opcodes_are_not_flagged_illegal() {
        assert!(!OPCODE_TABLE[0xA9].illegal);
        assert!(!OPCODE_TABLE[0xEA].illegal);
        assert!(OPCODE_TABLE[0x1A].illegal);
        assert!(OPCODE_TABLE[0xEB].illegal);
    }
}

//! Instruction handlers, one free function per mnemonic.
//!
//! Every handler runs after the step loop has moved the program counter past
//! the whole instruction, so control flow handlers assign the target directly.

use super::addressing_mode::{page_crossed, Operand};
use super::memory::CpuBus;
use super::register::Registers;
use super::status_flags::Flags;
use super::{CPU, BRK_VECTOR};

// operand plumbing

fn value(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) -> u8 {
  match operand {
    Operand::Immediate(value) => value,
    Operand::Memory { address, .. } => bus.read(address),
    Operand::Accumulator => cpu.registers.a,
    Operand::None | Operand::Relative(_) => {
      log::warn!("{:?} has no value to load", operand);
      0
    }
  }
}

fn store(bus: &mut dyn CpuBus, operand: Operand, data: u8) {
  match operand {
    Operand::Memory { address, .. } => bus.write(address, data),
    _ => log::warn!("cannot store to {:?}", operand),
  }
}

/// ASL/LSR/ROL/ROR/INC/DEC on A or on memory.
fn modify(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand, op: fn(&mut Registers, u8) -> u8) {
  match operand {
    Operand::Accumulator => {
      let data = cpu.registers.a;
      let result = op(&mut cpu.registers, data);
      cpu.registers.a = result;
    }
    Operand::Memory { address, .. } => {
      let data = bus.read(address);
      let result = op(&mut cpu.registers, data);
      bus.write(address, result);
    }
    _ => log::warn!("cannot modify {:?}", operand),
  }
}

fn branch(cpu: &mut CPU, operand: Operand, condition: bool) {
  if !condition {
    return;
  }
  if let Operand::Relative(offset) = operand {
    let next = cpu.registers.program_counter;
    let target = next.wrapping_add(offset as u16);
    cpu.cycles += 1;
    if page_crossed(next, target) {
      cpu.cycles += 1;
    }
    cpu.registers.program_counter = target;
  }
}

fn target(operand: Operand) -> Option<u16> {
  match operand {
    Operand::Memory { address, .. } => Some(address),
    _ => None,
  }
}

// load / store / transfer

/// LDA
pub fn lda(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.a = data;
  cpu.registers.set_nz_flags(data);
}

/// LDX
pub fn ldx(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.x = data;
  cpu.registers.set_nz_flags(data);
}

/// LDY
pub fn ldy(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.y = data;
  cpu.registers.set_nz_flags(data);
}

pub fn sta(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  store(bus, operand, cpu.registers.a);
}

pub fn stx(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  store(bus, operand, cpu.registers.x);
}

pub fn sty(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  store(bus, operand, cpu.registers.y);
}

pub fn tax(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.x = cpu.registers.a;
  cpu.registers.set_nz_flags(cpu.registers.x);
}

pub fn tay(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.y = cpu.registers.a;
  cpu.registers.set_nz_flags(cpu.registers.y);
}

pub fn tsx(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.x = cpu.registers.stack_pointer;
  cpu.registers.set_nz_flags(cpu.registers.x);
}

pub fn txa(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.a = cpu.registers.x;
  cpu.registers.set_nz_flags(cpu.registers.a);
}

/// TXS is the only transfer that leaves the flags alone.
pub fn txs(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.stack_pointer = cpu.registers.x;
}

pub fn tya(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.a = cpu.registers.y;
  cpu.registers.set_nz_flags(cpu.registers.a);
}

// arithmetic / logic

pub fn adc(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.add_to_a(data);
}

pub fn sbc(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.sub_from_a(data);
}

pub fn and(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.a &= data;
  cpu.registers.set_nz_flags(cpu.registers.a);
}

pub fn ora(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.a |= data;
  cpu.registers.set_nz_flags(cpu.registers.a);
}

pub fn eor(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.a ^= data;
  cpu.registers.set_nz_flags(cpu.registers.a);
}

/// BIT: Z from `A & M`, V and N straight from bits 6 and 7 of M.
pub fn bit(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  let status = &mut cpu.registers.status;
  status.set(Flags::Z, cpu.registers.a & data == 0);
  status.set(Flags::V, data & 0x40 != 0);
  status.set(Flags::N, data & 0x80 != 0);
}

pub fn cmp(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.compare(cpu.registers.a, data);
}

pub fn cpx(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.compare(cpu.registers.x, data);
}

pub fn cpy(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  let data = value(cpu, bus, operand);
  cpu.registers.compare(cpu.registers.y, data);
}

// increments, shifts, rotates

pub fn inc(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    let result = data.wrapping_add(1);
    registers.set_nz_flags(result);
    result
  });
}

pub fn dec(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    let result = data.wrapping_sub(1);
    registers.set_nz_flags(result);
    result
  });
}

pub fn inx(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.x = cpu.registers.x.wrapping_add(1);
  cpu.registers.set_nz_flags(cpu.registers.x);
}

pub fn iny(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.y = cpu.registers.y.wrapping_add(1);
  cpu.registers.set_nz_flags(cpu.registers.y);
}

pub fn dex(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.x = cpu.registers.x.wrapping_sub(1);
  cpu.registers.set_nz_flags(cpu.registers.x);
}

pub fn dey(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.y = cpu.registers.y.wrapping_sub(1);
  cpu.registers.set_nz_flags(cpu.registers.y);
}

pub fn asl(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    registers.status.set(Flags::C, data & 0x80 != 0);
    let result = data << 1;
    registers.set_nz_flags(result);
    result
  });
}

/// LSR
pub fn lsr(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    registers.status.set(Flags::C, data & 0x01 != 0);
    let result = data >> 1;
    registers.set_nz_flags(result);
    result
  });
}

pub fn rol(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    let carry_in = registers.status.contains(Flags::C) as u8;
    registers.status.set(Flags::C, data & 0x80 != 0);
    let result = (data << 1) | carry_in;
    registers.set_nz_flags(result);
    result
  });
}

pub fn ror(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  modify(cpu, bus, operand, |registers, data| {
    let carry_in = registers.status.contains(Flags::C) as u8;
    registers.status.set(Flags::C, data & 0x01 != 0);
    let result = (data >> 1) | (carry_in << 7);
    registers.set_nz_flags(result);
    result
  });
}

// flags

pub fn clc(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.remove(Flags::C);
}

pub fn cld(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.remove(Flags::D);
}

pub fn cli(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.remove(Flags::I);
}

pub fn clv(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.remove(Flags::V);
}

pub fn sec(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.insert(Flags::C);
}

pub fn sed(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.insert(Flags::D);
}

pub fn sei(cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.status.insert(Flags::I);
}

// stack

pub fn pha(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  let a = cpu.registers.a;
  cpu.push(bus, a);
}

pub fn php(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  let status = cpu.registers.status | Flags::PUSHED;
  cpu.push(bus, status.bits());
}

pub fn pla(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.a = cpu.pull(bus);
  cpu.registers.set_nz_flags(cpu.registers.a);
}

pub fn plp(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  let pulled = cpu.pull(bus);
  cpu.restore_status(pulled);
}

// control flow

pub fn jmp(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  if let Some(address) = target(operand) {
    cpu.registers.program_counter = address;
  }
}

/// JSR pushes the address of its own last byte; RTS adds the one back.
pub fn jsr(cpu: &mut CPU, bus: &mut dyn CpuBus, operand: Operand) {
  if let Some(address) = target(operand) {
    let return_address = cpu.registers.program_counter.wrapping_sub(1);
    cpu.push_u16(bus, return_address);
    cpu.registers.program_counter = address;
  }
}

pub fn rts(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  cpu.registers.program_counter = cpu.pull_u16(bus).wrapping_add(1);
}

pub fn rti(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  let pulled = cpu.pull(bus);
  cpu.restore_status(pulled);
  cpu.registers.program_counter = cpu.pull_u16(bus);
}

/// BRK skips a padding byte: the pushed return address is two past the opcode.
pub fn brk(cpu: &mut CPU, bus: &mut dyn CpuBus, _operand: Operand) {
  let return_address = cpu.registers.program_counter.wrapping_add(1);
  cpu.push_u16(bus, return_address);
  let status = cpu.registers.status | Flags::PUSHED;
  cpu.push(bus, status.bits());
  cpu.registers.status.insert(Flags::I);
  cpu.registers.program_counter = bus.read_u16(BRK_VECTOR);
}

pub fn nop(_cpu: &mut CPU, _bus: &mut dyn CpuBus, _operand: Operand) {}

pub fn bcc(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = !cpu.registers.status.contains(Flags::C);
  branch(cpu, operand, condition);
}

pub fn bcs(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = cpu.registers.status.contains(Flags::C);
  branch(cpu, operand, condition);
}

pub fn beq(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = cpu.registers.status.contains(Flags::Z);
  branch(cpu, operand, condition);
}

pub fn bne(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = !cpu.registers.status.contains(Flags::Z);
  branch(cpu, operand, condition);
}

pub fn bmi(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = cpu.registers.status.contains(Flags::N);
  branch(cpu, operand, condition);
}

pub fn bpl(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = !cpu.registers.status.contains(Flags::N);
  branch(cpu, operand, condition);
}

pub fn bvc(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = !cpu.registers.status.contains(Flags::V);
  branch(cpu, operand, condition);
}

pub fn bvs(cpu: &mut CPU, _bus: &mut dyn CpuBus, operand: Operand) {
  let condition = cpu.registers.status.contains(Flags::V);
  branch(cpu, operand, condition);
}

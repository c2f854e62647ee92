use crate::cpu::addressing_mode::{self, AddressingMode, Operand};
use crate::cpu::memory::CpuBus;
use crate::cpu::opcodes;
use crate::cpu::CPU;

/// One line in the format of the `nestest.log` reference trace, describing the
/// instruction about to execute. Memory is only peeked, never read.
pub fn trace(cpu: &CPU, bus: &dyn CpuBus) -> String {
  let begin = cpu.registers.program_counter;
  let code = bus.peek(begin);

  let ops = match opcodes::lookup(code) {
    Some(ops) => ops,
    None => {
      let asm_str = format!("{:04x}  {:02x}        ???", begin, code);
      return format_registers(cpu, &asm_str);
    }
  };

  let mut hex_dump = vec![code];
  let operand_count = ops.mode.operand_count() as u16;
  for i in 0..operand_count {
    hex_dump.push(bus.peek(begin.wrapping_add(1 + i)));
  }
  let operands = [
    hex_dump.get(1).copied().unwrap_or(0),
    hex_dump.get(2).copied().unwrap_or(0),
  ];
  let (mem_addr, stored_value) = match ops.mode.resolve(operands, cpu.registers.x, cpu.registers.y, bus) {
    Operand::Memory { address, .. } => (address, bus.peek(address)),
    _ => (0, 0),
  };

  let tmp = match ops.mode {
    AddressingMode::Implicit => String::from(""),
    AddressingMode::Accumulator => format!("A "),
    AddressingMode::Immediate => format!("#${:02x}", operands[0]),
    AddressingMode::ZeroPage => format!("${:02x} = {:02x}", mem_addr, stored_value),
    AddressingMode::ZeroPageX => format!("${:02x},X @ {:02x} = {:02x}", operands[0], mem_addr, stored_value),
    AddressingMode::ZeroPageY => format!("${:02x},Y @ {:02x} = {:02x}", operands[0], mem_addr, stored_value),
    AddressingMode::IndexedIndirect => format!(
      "(${:02x},X) @ {:02x} = {:04x} = {:02x}",
      operands[0],
      operands[0].wrapping_add(cpu.registers.x),
      mem_addr,
      stored_value
    ),
    AddressingMode::IndirectIndexed => format!(
      "(${:02x}),Y = {:04x} @ {:04x} = {:02x}",
      operands[0],
      mem_addr.wrapping_sub(cpu.registers.y as u16),
      mem_addr,
      stored_value
    ),
    AddressingMode::Relative => {
      let next = begin.wrapping_add(2);
      format!("${:04x}", next.wrapping_add((operands[0] as i8) as u16))
    }
    AddressingMode::Indirect => {
      let pointer = u16::from_le_bytes(operands);
      format!("(${:04x}) = {:04x}", pointer, addressing_mode::indirect(bus, pointer))
    }
    AddressingMode::Absolute => {
      // jump targets are code, not data
      if ops.mnemonic == "JMP" || ops.mnemonic == "JSR" {
        format!("${:04x}", mem_addr)
      } else {
        format!("${:04x} = {:02x}", mem_addr, stored_value)
      }
    }
    AddressingMode::AbsoluteX => format!(
      "${:04x},X @ {:04x} = {:02x}",
      u16::from_le_bytes(operands),
      mem_addr,
      stored_value
    ),
    AddressingMode::AbsoluteY => format!(
      "${:04x},Y @ {:04x} = {:02x}",
      u16::from_le_bytes(operands),
      mem_addr,
      stored_value
    ),
  };

  let hex_str = hex_dump
    .iter()
    .map(|z| format!("{:02x}", z))
    .collect::<Vec<String>>()
    .join(" ");
  let asm_str = format!("{:04x}  {:8} {: >4} {}", begin, hex_str, ops.mnemonic, tmp)
    .trim()
    .to_string();

  format_registers(cpu, &asm_str)
}

fn format_registers(cpu: &CPU, asm_str: &str) -> String {
  format!(
    "{:47} A:{:02x} X:{:02x} Y:{:02x} P:{:02x} SP:{:02x}",
    asm_str,
    cpu.registers.a,
    cpu.registers.x,
    cpu.registers.y,
    cpu.registers.status.bits(),
    cpu.registers.stack_pointer,
  )
  .to_ascii_uppercase()
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::bus::Bus;
  use crate::cartridge::mirroring::Mirroring;

  fn run_traced(bus: &mut Bus, cpu: &mut CPU) -> Vec<String> {
    let mut result: Vec<String> = vec![];
    while bus.peek(cpu.registers.program_counter) != 0x00 {
      result.push(trace(cpu, bus));
      cpu.step(bus).unwrap();
    }
    result
  }

  #[test]
  fn test_format_trace() {
    let mut bus = Bus::new(Mirroring::Vertical);
    bus.cpu_write(100, 0xa2);
    bus.cpu_write(101, 0x01);
    bus.cpu_write(102, 0xca);
    bus.cpu_write(103, 0x88);
    bus.cpu_write(104, 0x00);

    let mut cpu = CPU::new();
    cpu.registers.reset(0x64);
    cpu.registers.a = 1;
    cpu.registers.x = 2;
    cpu.registers.y = 3;
    let result = run_traced(&mut bus, &mut cpu);
    assert_eq!(
      "0064  A2 01     LDX #$01                        A:01 X:02 Y:03 P:24 SP:FD",
      result[0]
    );
    assert_eq!(
      "0066  CA        DEX                             A:01 X:01 Y:03 P:24 SP:FD",
      result[1]
    );
    assert_eq!(
      "0067  88        DEY                             A:01 X:00 Y:03 P:26 SP:FD",
      result[2]
    );
  }

  #[test]
  fn test_format_mem_access() {
    let mut bus = Bus::new(Mirroring::Vertical);
    // ORA ($33), Y
    bus.cpu_write(100, 0x11);
    bus.cpu_write(101, 0x33);

    //data
    bus.cpu_write(0x33, 00);
    bus.cpu_write(0x34, 04);

    //target cell
    bus.cpu_write(0x400, 0xAA);

    let mut cpu = CPU::new();
    cpu.registers.reset(0x64);
    cpu.registers.y = 0;
    let result = run_traced(&mut bus, &mut cpu);
    assert_eq!(
      "0064  11 33     ORA ($33),Y = 0400 @ 0400 = AA  A:00 X:00 Y:00 P:24 SP:FD",
      result[0]
    );
  }

  #[test]
  fn test_format_jumps_and_branches() {
    let mut bus = Bus::new(Mirroring::Vertical);
    // JMP $0070; ...; 0070: BNE $0064 (offset -14); JMP ($0200)
    for (i, byte) in [0x4C, 0x70, 0x00].iter().enumerate() {
      bus.cpu_write(0x64 + i as u16, *byte);
    }
    for (i, byte) in [0xD0, 0xF2, 0x6C, 0xFF, 0x02].iter().enumerate() {
      bus.cpu_write(0x70 + i as u16, *byte);
    }
    bus.cpu_write(0x02FF, 0x34);
    bus.cpu_write(0x0200, 0x12);

    let mut cpu = CPU::new();
    cpu.registers.reset(0x64);
    assert_eq!(
      "0064  4C 70 00  JMP $0070                       A:00 X:00 Y:00 P:24 SP:FD",
      trace(&cpu, &bus)
    );
    cpu.registers.program_counter = 0x70;
    assert_eq!(
      "0070  D0 F2     BNE $0064                       A:00 X:00 Y:00 P:24 SP:FD",
      trace(&cpu, &bus)
    );
    cpu.registers.program_counter = 0x72;
    assert_eq!(
      "0072  6C FF 02  JMP ($02FF) = 1234              A:00 X:00 Y:00 P:24 SP:FD",
      trace(&cpu, &bus)
    );
  }

  #[test]
  fn test_format_accumulator_and_illegal() {
    let mut bus = Bus::new(Mirroring::Vertical);
    bus.cpu_write(0x64, 0x0A);
    bus.cpu_write(0x65, 0x02);
    let mut cpu = CPU::new();
    cpu.registers.reset(0x64);
    assert_eq!(
      "0064  0A        ASL A                           A:00 X:00 Y:00 P:24 SP:FD",
      trace(&cpu, &bus)
    );
    cpu.registers.program_counter = 0x65;
    assert_eq!(
      "0065  02        ???                             A:00 X:00 Y:00 P:24 SP:FD",
      trace(&cpu, &bus)
    );
  }
}

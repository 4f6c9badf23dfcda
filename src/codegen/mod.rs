//! Generación de código ensamblador.
//!
//! Un único recorrido sobre la IR normalizada: por cada instrucción
//! se garantiza registro para sus operandos y su destino (en ese
//! orden), se elige el mnemónico según la forma de los operandos y se
//! escribe una línea al listado. Cada línea lleva al final, separado
//! por tabulación, un comentario con la instrucción IR que la originó.
//!
//! El emisor asume entrada ya legalizada por [`legalize`]: un
//! inmediato en posición no admitida por la ISA es un error de
//! programa, no de usuario, y se reporta como [`CodegenError::Malformed`].

pub mod legalize;
pub mod regs;

use std::io::Write;

use log::trace;
use thiserror::Error;

use crate::ir::{Instruction, IrModule, IrValue, IrVar};
use regs::Allocations;

/// Registro reservado para el valor de retorno. Nunca participa de la
/// asignación general.
const RETURN_REG: &str = "a0";

/// Fallo durante la asignación de registros o la emisión.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Todos los registros alojan valores aún vivos.
    #[error("no register is available for {value} at instruction {index}")]
    OutOfRegisters { value: IrVar, index: usize },

    /// Una instrucción llegó al emisor sin pasar por la normalización.
    #[error("operand shape not accepted by the target: {0}")]
    Malformed(Instruction),
}

/// Emite el listado ensamblador completo de un módulo.
///
/// El listado comienza con la directiva `.text` y contiene una línea
/// por instrucción IR. La emisión se detiene inmediatamente después
/// del primer `return`.
pub fn emit<W: Write>(module: &IrModule, output: &mut W) -> Result<(), CodegenError> {
    let mut regs = Allocations::new();
    writeln!(output, ".text")?;

    for (index, instruction) in module.instructions.iter().enumerate() {
        for operand in instruction.operands() {
            regs.allocate(operand, index, &module.instructions)?;
        }

        if let Some(dst) = instruction.dst() {
            regs.allocate(&IrValue::Var(dst.clone()), index, &module.instructions)?;
        }

        let code = lower(instruction, &regs)?;
        trace!("{} <- {}", code, instruction);
        writeln!(output, "\t{}\t# {}", code, instruction)?;

        if matches!(instruction, Instruction::Ret { .. }) {
            break;
        }
    }

    Ok(())
}

/// Traduce una instrucción ya asignada a su mnemónico.
fn lower(instruction: &Instruction, regs: &Allocations) -> Result<String, CodegenError> {
    use Instruction::*;

    let reg = |var: &IrVar| regs.var_reg(var).expect("operand was just allocated");
    let malformed = || CodegenError::Malformed(instruction.clone());

    let code = match instruction {
        Add { dst, lhs, rhs } => {
            let lhs = lhs.as_var().ok_or_else(malformed)?;
            match rhs {
                IrValue::Imm(imm) => format!("addi {}, {}, {}", reg(dst), reg(lhs), imm),
                IrValue::Var(rhs) => format!("add {}, {}, {}", reg(dst), reg(lhs), reg(rhs)),
            }
        }

        Sub { dst, lhs, rhs } => {
            let lhs = lhs.as_var().ok_or_else(malformed)?;
            match rhs {
                IrValue::Imm(imm) => format!("subi {}, {}, {}", reg(dst), reg(lhs), imm),
                IrValue::Var(rhs) => format!("sub {}, {}, {}", reg(dst), reg(lhs), reg(rhs)),
            }
        }

        // La multiplicación no tiene forma inmediata en el objetivo
        Mul { dst, lhs, rhs } => {
            let lhs = lhs.as_var().ok_or_else(malformed)?;
            let rhs = rhs.as_var().ok_or_else(malformed)?;
            format!("mul {}, {}, {}", reg(dst), reg(lhs), reg(rhs))
        }

        Mov { dst, src } => match src {
            IrValue::Imm(imm) => format!("li {}, {}", reg(dst), imm),
            IrValue::Var(src) => format!("mov {}, {}", reg(dst), reg(src)),
        },

        Ret { value } => match value {
            IrValue::Imm(imm) => format!("li {}, {}", RETURN_REG, imm),
            IrValue::Var(var) => format!("mv {}, {}", RETURN_REG, reg(var)),
        },
    };

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_of(lines: &[&str]) -> IrModule {
        let mut module = IrModule::new();
        module.instructions = lines.iter().map(|line| line.parse().unwrap()).collect();
        module
    }

    fn assemble(lines: &[&str]) -> Vec<String> {
        let mut output = Vec::new();
        emit(&module_of(lines), &mut output).unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn listing_opens_with_the_text_directive() {
        assert_eq!(assemble(&["return 0"])[0], ".text");
    }

    #[test]
    fn immediate_forms_are_selected_per_mnemonic() {
        assert_eq!(
            assemble(&["a = 1", "b = a + 2", "c = b - 3", "return c"])[1..],
            [
                "\tli t0, 1\t# a = 1",
                "\taddi t1, t0, 2\t# b = a + 2",
                "\tsubi t2, t1, 3\t# c = b - 3",
                "\tmv a0, t2\t# return c",
            ]
        );
    }

    #[test]
    fn register_forms_cover_all_binaries() {
        assert_eq!(
            assemble(&["a = 1", "b = 2", "c = a + b", "d = a - b", "e = c * d", "return e"])[3..],
            [
                "\tadd t2, t0, t1\t# c = a + b",
                "\tsub t3, t0, t1\t# d = a - b",
                "\tmul t4, t2, t3\t# e = c * d",
                "\tmv a0, t4\t# return e",
            ]
        );
    }

    #[test]
    fn moves_distinguish_immediates_from_registers() {
        assert_eq!(
            assemble(&["a = 7", "b = a", "return b"])[1..],
            [
                "\tli t0, 7\t# a = 7",
                "\tmov t1, t0\t# b = a",
                "\tmv a0, t1\t# return b",
            ]
        );
    }

    #[test]
    fn immediate_returns_load_directly() {
        assert_eq!(assemble(&["return 5"])[1], "\tli a0, 5\t# return 5");
    }

    #[test]
    fn emission_stops_after_the_return() {
        let listing = assemble(&["return 1", "a = 2"]);
        assert_eq!(listing.len(), 2);
    }

    #[test]
    fn unnormalized_input_is_rejected() {
        let mut output = Vec::new();
        let error = emit(&module_of(&["a = 1 + 2"]), &mut output).unwrap_err();
        assert!(matches!(error, CodegenError::Malformed(_)));

        let error = emit(&module_of(&["b = 1", "a = b * 2"]), &mut output).unwrap_err();
        assert!(matches!(error, CodegenError::Malformed(_)));
    }

    #[test]
    fn exhaustion_propagates_from_the_allocator() {
        let program = [
            "a = 1", "b = 2", "c = 3", "d = 4", "e = 5", "f = 6", "g = 7",
            "h = a + b",
            "i = c + d",
            "j = e + f",
            "k = g + h",
            "l = i + j",
            "m = k + l",
            "return m",
        ];

        let mut output = Vec::new();
        let error = emit(&module_of(&program), &mut output).unwrap_err();
        assert!(matches!(error, CodegenError::OutOfRegisters { .. }));
    }
}

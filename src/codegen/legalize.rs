//! Normalización de la representación intermedia.
//!
//! El objetivo acepta un inmediato únicamente como segundo operando
//! de `add`/`sub`; la multiplicación exige ambos operandos en
//! registro. Esta pasada reescribe la IR cruda para que toda
//! instrucción que llegue al emisor ya satisfaga esas formas:
//!
//! - dos inmediatos se pliegan en tiempo de compilación a un `Mov`
//!   del resultado,
//! - la suma con inmediato a la izquierda se conmuta,
//! - la resta y la multiplicación con inmediato a la izquierda
//!   materializan el inmediato en un temporal fresco (la resta porque
//!   el orden de operandos importa, la multiplicación por la simetría
//!   estructural con ese mismo patrón),
//! - la multiplicación con inmediato a la derecha también lo
//!   materializa.
//!
//! La reescritura termina en el primer `return`, inclusive: el
//! lenguaje produce un único bloque básico y todo lo posterior es
//! inalcanzable, así que se descarta aquí.

use log::trace;

use crate::ir::{Instruction, IrModule, IrValue, IrVar};

/// Operador de una instrucción binaria, solo para despacho interno.
#[derive(Copy, Clone, Debug)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    fn fold(self, lhs: i32, rhs: i32) -> i32 {
        match self {
            Op::Add => lhs.wrapping_add(rhs),
            Op::Sub => lhs.wrapping_sub(rhs),
            Op::Mul => lhs.wrapping_mul(rhs),
        }
    }

    fn build(self, dst: IrVar, lhs: IrValue, rhs: IrValue) -> Instruction {
        match self {
            Op::Add => Instruction::Add { dst, lhs, rhs },
            Op::Sub => Instruction::Sub { dst, lhs, rhs },
            Op::Mul => Instruction::Mul { dst, lhs, rhs },
        }
    }
}

/// Legaliza las formas de operando de un módulo completo.
///
/// El contador de temporales del módulo se conserva, por lo cual los
/// temporales sintetizados aquí nunca colisionan con los del front
/// end.
pub fn legalize(mut module: IrModule) -> IrModule {
    let raw = std::mem::take(&mut module.instructions);

    for instruction in raw {
        let (op, dst, lhs, rhs) = match instruction {
            Instruction::Add { dst, lhs, rhs } => (Op::Add, dst, lhs, rhs),
            Instruction::Sub { dst, lhs, rhs } => (Op::Sub, dst, lhs, rhs),
            Instruction::Mul { dst, lhs, rhs } => (Op::Mul, dst, lhs, rhs),

            mov @ Instruction::Mov { .. } => {
                module.instructions.push(mov);
                continue;
            }

            ret @ Instruction::Ret { .. } => {
                module.instructions.push(ret);
                break;
            }
        };

        match (op, lhs, rhs) {
            // Ambos operandos conocidos: se calcula aquí mismo
            (op, IrValue::Imm(lhs), IrValue::Imm(rhs)) => {
                let folded = op.fold(lhs, rhs);
                trace!("folding {} {:?} {} -> {}", lhs, op, rhs, folded);

                module.instructions.push(Instruction::Mov {
                    dst,
                    src: IrValue::Imm(folded),
                });
            }

            // La suma es conmutativa: el inmediato pasa al segundo
            // operando
            (Op::Add, lhs @ IrValue::Imm(_), rhs @ IrValue::Var(_)) => {
                module.instructions.push(Instruction::Add {
                    dst,
                    lhs: rhs,
                    rhs: lhs,
                });
            }

            // Resta y multiplicación con inmediato a la izquierda:
            // el inmediato se materializa en un temporal para
            // preservar el orden de operandos
            (op @ (Op::Sub | Op::Mul), lhs @ IrValue::Imm(_), rhs @ IrValue::Var(_)) => {
                let temp = module.temp();
                module.instructions.push(Instruction::Mov {
                    dst: temp.clone(),
                    src: lhs,
                });
                module
                    .instructions
                    .push(op.build(dst, IrValue::Var(temp), rhs));
            }

            // La multiplicación tampoco admite inmediato a la derecha
            (Op::Mul, lhs @ IrValue::Var(_), rhs @ IrValue::Imm(_)) => {
                let temp = module.temp();
                module.instructions.push(Instruction::Mov {
                    dst: temp.clone(),
                    src: rhs,
                });
                module
                    .instructions
                    .push(Instruction::Mul {
                        dst,
                        lhs,
                        rhs: IrValue::Var(temp),
                    });
            }

            // `add`/`sub` toleran inmediato como segundo operando;
            // variable/variable ya es legal para todos
            (op, lhs, rhs) => module.instructions.push(op.build(dst, lhs, rhs)),
        }
    }

    module
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_of(lines: &[&str]) -> IrModule {
        let mut module = IrModule::new();
        module.instructions = lines.iter().map(|line| line.parse().unwrap()).collect();

        // El contador debe quedar por encima de los temporales que
        // ya aparecen en el listado de entrada
        let temps = module
            .instructions
            .iter()
            .flat_map(|instruction| {
                let mut vars: Vec<&IrVar> = instruction
                    .operands()
                    .into_iter()
                    .filter_map(IrValue::as_var)
                    .collect();
                vars.extend(instruction.dst());
                vars
            })
            .filter_map(|var| match var {
                IrVar::Temp(index) => Some(*index + 1),
                IrVar::Named(_) => None,
            })
            .max()
            .unwrap_or(0);

        for _ in 0..temps {
            module.temp();
        }

        module
    }

    fn legalized(lines: &[&str]) -> Vec<String> {
        legalize(module_of(lines)).dump_lines()
    }

    #[test]
    fn folds_immediate_pairs_totally() {
        assert_eq!(legalized(&["a = 1 + 2"]), vec!["a = 3"]);
        assert_eq!(legalized(&["a = 1 - 2"]), vec!["a = -1"]);
        assert_eq!(legalized(&["a = 3 * -4"]), vec!["a = -12"]);
    }

    #[test]
    fn folding_wraps_like_the_target() {
        assert_eq!(
            legalized(&["a = 2147483647 + 1"]),
            vec![format!("a = {}", i32::MIN)]
        );
    }

    #[test]
    fn commutes_immediate_first_additions() {
        assert_eq!(legalized(&["a = 5 + b"]), vec!["a = b + 5"]);
    }

    #[test]
    fn materializes_immediate_first_subtractions() {
        assert_eq!(legalized(&["a = 5 - b"]), vec!["$0 = 5", "a = $0 - b"]);
    }

    #[test]
    fn materializes_multiplication_immediates_on_either_side() {
        assert_eq!(legalized(&["a = 2 * b"]), vec!["$0 = 2", "a = $0 * b"]);
        assert_eq!(legalized(&["a = b * 2"]), vec!["$0 = 2", "a = b * $0"]);
    }

    #[test]
    fn legal_shapes_pass_through() {
        let input = ["a = b + 2", "c = a - 7", "d = a + b", "e = d * a", "f = e", "return f"];
        assert_eq!(legalized(&input), input.to_vec());
    }

    #[test]
    fn stops_at_the_first_return() {
        assert_eq!(
            legalized(&["a = 1", "return a", "b = 2 * c", "return b"]),
            vec!["a = 1", "return a"]
        );
    }

    #[test]
    fn no_binary_instruction_survives_with_illegal_operands() {
        let output = legalize(module_of(&[
            "a = 1 + 2",
            "b = 3 - a",
            "c = 4 * a",
            "d = a * 5",
            "e = 6 + a",
            "return e",
        ]));

        for instruction in &output.instructions {
            match instruction {
                Instruction::Add { lhs, .. } | Instruction::Sub { lhs, .. } => {
                    assert!(!lhs.is_imm(), "{}", instruction);
                }

                Instruction::Mul { lhs, rhs, .. } => {
                    assert!(!lhs.is_imm() && !rhs.is_imm(), "{}", instruction);
                }

                _ => (),
            }
        }
    }
}

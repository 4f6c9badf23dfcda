//! Archivo de registros y asignación valor-registro.
//!
//! La asignación es un par de mapeos simétricos: un arreglo de
//! tamaño fijo de ocupantes opcionales indexado por registro, más un
//! mapa acompañante de valor a índice. Ambos lados se actualizan
//! siempre juntos, de modo que en todo instante un valor ocupa a lo
//! sumo un registro y un registro aloja a lo sumo un valor.
//!
//! No existe spill a memoria: cuando el archivo se agota, se busca un
//! registro recuperable mediante un escaneo de vida útil hacia
//! adelante y, si ninguno califica, la generación de código falla con
//! un error tipado.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use log::debug;

use super::CodegenError;
use crate::ir::{Instruction, IrValue, IrVar};

/// Registro de propósito general del objetivo.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
}

impl Reg {
    /// Archivo de registros disponible para asignación, en orden de
    /// preferencia.
    pub const FILE: [Reg; 7] = [
        Reg::T0,
        Reg::T1,
        Reg::T2,
        Reg::T3,
        Reg::T4,
        Reg::T5,
        Reg::T6,
    ];
}

impl Display for Reg {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Reg::*;

        let name = match self {
            T0 => "t0",
            T1 => "t1",
            T2 => "t2",
            T3 => "t3",
            T4 => "t4",
            T5 => "t5",
            T6 => "t6",
        };

        fmt.write_str(name)
    }
}

/// Asignación bidireccional entre valores IR y registros.
///
/// Vive únicamente durante la generación de código y se descarta al
/// terminar.
#[derive(Default)]
pub struct Allocations {
    slots: [Option<IrVar>; Reg::FILE.len()],
    by_value: HashMap<IrVar, usize>,
}

impl Allocations {
    pub fn new() -> Self {
        Allocations::default()
    }

    /// Registro asignado a una variable.
    pub fn var_reg(&self, var: &IrVar) -> Option<Reg> {
        self.by_value.get(var).map(|&slot| Reg::FILE[slot])
    }

    /// Garantiza que `value` tenga registro al momento de usarse en
    /// la instrucción `index`.
    ///
    /// Los inmediatos nunca ocupan registro. La operación es
    /// idempotente para valores ya residentes. Si no hay registro
    /// libre, un escaneo hacia adelante desde `index` busca un
    /// ocupante que ninguna instrucción restante lea; ese registro se
    /// recupera desalojando a su ocupante.
    pub fn allocate(
        &mut self,
        value: &IrValue,
        index: usize,
        instructions: &[Instruction],
    ) -> Result<(), CodegenError> {
        let var = match value {
            IrValue::Imm(_) => return Ok(()),
            IrValue::Var(var) => var,
        };

        if self.by_value.contains_key(var) {
            return Ok(());
        }

        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.bind(slot, var.clone());
            return Ok(());
        }

        // Escaneo de vida útil: solo cuentan las posiciones de
        // operando (lecturas). Un ocupante que de aquí en adelante
        // aparezca únicamente como destino se considera muerto y su
        // registro es recuperable.
        let mut live = [false; Reg::FILE.len()];
        for instruction in &instructions[index..] {
            for operand in instruction.operands() {
                let slot = operand.as_var().and_then(|used| self.by_value.get(used));
                if let Some(&slot) = slot {
                    live[slot] = true;
                }
            }
        }

        match live.iter().position(|&live| !live) {
            Some(slot) => {
                let evicted = self.slots[slot].take().expect("reclaimable slot is empty");
                self.by_value.remove(&evicted);
                debug!("evicting dead {} from {} for {}", evicted, Reg::FILE[slot], var);

                self.bind(slot, var.clone());
                Ok(())
            }

            None => Err(CodegenError::OutOfRegisters {
                value: var.clone(),
                index,
            }),
        }
    }

    /// Actualiza ambos lados del mapeo como una sola operación.
    fn bind(&mut self, slot: usize, var: IrVar) {
        debug_assert!(self.slots[slot].is_none(), "binding an occupied register");

        self.slots[slot] = Some(var.clone());
        self.by_value.insert(var, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn var(name: &str) -> IrVar {
        IrVar::Named(Arc::from(name))
    }

    fn value(name: &str) -> IrValue {
        IrValue::Var(var(name))
    }

    #[test]
    fn immediates_never_take_registers() {
        let mut regs = Allocations::new();
        regs.allocate(&IrValue::Imm(42), 0, &[]).unwrap();

        // El archivo completo sigue disponible para variables
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            regs.allocate(&value(name), 0, &[]).unwrap();
        }
    }

    #[test]
    fn allocation_is_idempotent_and_injective() {
        let mut regs = Allocations::new();

        for name in ["a", "b", "c"] {
            regs.allocate(&value(name), 0, &[]).unwrap();
        }

        let first = regs.var_reg(&var("a")).unwrap();
        regs.allocate(&value("a"), 1, &[]).unwrap();
        assert_eq!(regs.var_reg(&var("a")), Some(first));

        // Ningún registro aloja dos valores vivos
        let assigned: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| regs.var_reg(&var(name)).unwrap())
            .collect();

        for (index, reg) in assigned.iter().enumerate() {
            assert!(!assigned[index + 1..].contains(reg));
        }
    }

    #[test]
    fn dead_occupants_are_evicted() {
        let mut regs = Allocations::new();

        let names = ["a", "b", "c", "d", "e", "f", "g"];
        for name in names {
            regs.allocate(&value(name), 0, &[]).unwrap();
        }

        // Solo `b`..`g` se leen de aquí en adelante; `a` está muerta
        let tail: Vec<Instruction> = ["x = b + c", "y = d * e", "z = f - g"]
            .iter()
            .map(|line| line.parse().unwrap())
            .collect();

        let reclaimed = regs.var_reg(&var("a")).unwrap();
        regs.allocate(&value("h"), 0, &tail).unwrap();

        assert_eq!(regs.var_reg(&var("h")), Some(reclaimed));
        assert_eq!(regs.var_reg(&var("a")), None);
    }

    #[test]
    fn exhaustion_is_a_typed_failure() {
        let mut regs = Allocations::new();

        let names = ["a", "b", "c", "d", "e", "f", "g"];
        for name in names {
            regs.allocate(&value(name), 0, &[]).unwrap();
        }

        // Todos los ocupantes siguen vivos
        let tail: Vec<Instruction> = ["x = a + b", "y = c * d", "z = e - f", "return g"]
            .iter()
            .map(|line| line.parse().unwrap())
            .collect();

        let error = regs.allocate(&value("h"), 0, &tail).unwrap_err();
        assert!(matches!(
            error,
            CodegenError::OutOfRegisters { value, index: 0 } if value == var("h")
        ));
    }
}

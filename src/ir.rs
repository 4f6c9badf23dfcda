//! Representación intermedia.
//!
//! La IR es una lista plana de instrucciones de tres direcciones
//! sobre valores etiquetados: inmediatos (puros datos, jamás
//! residentes en registro) y variables (con identidad, nombradas o
//! temporales). El lenguaje no tiene control de flujo, así que la
//! lista entera es un único bloque básico; todo lo que siga al primer
//! `return` es inalcanzable.
//!
//! El volcado textual es una línea por instrucción y es reversible:
//! [`Instruction`] implementa tanto [`Display`] como [`FromStr`] y
//! ambas direcciones son inversas exactas.

use std::{
    fmt::{self, Display},
    str::FromStr,
    sync::Arc,
};

use thiserror::Error;

/// Una variable IR, con identidad.
///
/// Dos usos del mismo identificador fuente resuelven a la misma
/// variable nombrada; los temporales se distinguen por índice. Las
/// variables se comparten entre instrucciones pero nunca se mutan.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrVar {
    /// Variable nombrada por un identificador del programa fuente.
    Named(Arc<str>),

    /// Temporal anónimo, único dentro de un [`IrModule`].
    Temp(u32),
}

impl Display for IrVar {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrVar::Named(name) => fmt.write_str(name),
            IrVar::Temp(index) => write!(fmt, "${}", index),
        }
    }
}

/// Un valor operando de la IR.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrValue {
    /// Literal conocido en tiempo de compilación.
    Imm(i32),

    /// Referencia a una variable.
    Var(IrVar),
}

impl IrValue {
    pub fn is_imm(&self) -> bool {
        matches!(self, IrValue::Imm(_))
    }

    pub fn as_var(&self) -> Option<&IrVar> {
        match self {
            IrValue::Var(var) => Some(var),
            IrValue::Imm(_) => None,
        }
    }
}

impl From<IrVar> for IrValue {
    fn from(var: IrVar) -> Self {
        IrValue::Var(var)
    }
}

impl Display for IrValue {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Imm(value) => write!(fmt, "{}", value),
            IrValue::Var(var) => var.fmt(fmt),
        }
    }
}

/// Una instrucción de la representación intermedia.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Add { dst: IrVar, lhs: IrValue, rhs: IrValue },
    Sub { dst: IrVar, lhs: IrValue, rhs: IrValue },
    Mul { dst: IrVar, lhs: IrValue, rhs: IrValue },
    Mov { dst: IrVar, src: IrValue },
    Ret { value: IrValue },
}

impl Instruction {
    /// Operandos leídos por la instrucción, sin incluir el destino.
    ///
    /// Este es el conjunto que el asignador de registros inspecciona
    /// para decidir vida útil: una posición de destino no cuenta como
    /// uso.
    pub fn operands(&self) -> Vec<&IrValue> {
        use Instruction::*;

        match self {
            Add { lhs, rhs, .. } | Sub { lhs, rhs, .. } | Mul { lhs, rhs, .. } => vec![lhs, rhs],
            Mov { src, .. } => vec![src],
            Ret { value } => vec![value],
        }
    }

    /// Destino escrito por la instrucción, si lo hay.
    pub fn dst(&self) -> Option<&IrVar> {
        use Instruction::*;

        match self {
            Add { dst, .. } | Sub { dst, .. } | Mul { dst, .. } | Mov { dst, .. } => Some(dst),
            Ret { .. } => None,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Add { dst, lhs, rhs } => write!(fmt, "{} = {} + {}", dst, lhs, rhs),
            Sub { dst, lhs, rhs } => write!(fmt, "{} = {} - {}", dst, lhs, rhs),
            Mul { dst, lhs, rhs } => write!(fmt, "{} = {} * {}", dst, lhs, rhs),
            Mov { dst, src } => write!(fmt, "{} = {}", dst, src),
            Ret { value } => write!(fmt, "return {}", value),
        }
    }
}

/// Error al reconstruir IR desde su forma textual.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IrParseError {
    #[error("malformed instruction: {0:?}")]
    BadInstruction(String),

    #[error("malformed operand: {0:?}")]
    BadOperand(String),
}

impl FromStr for IrValue {
    type Err = IrParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || IrParseError::BadOperand(text.to_owned());

        if let Some(index) = text.strip_prefix('$') {
            let index = index.parse().map_err(|_| bad())?;
            return Ok(IrValue::Var(IrVar::Temp(index)));
        }

        if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            return text.parse().map(IrValue::Imm).map_err(|_| bad());
        }

        let is_word = !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric());
        if is_word {
            Ok(IrValue::Var(IrVar::Named(Arc::from(text))))
        } else {
            Err(bad())
        }
    }
}

impl FromStr for IrVar {
    type Err = IrParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.parse()? {
            IrValue::Var(var) => Ok(var),
            IrValue::Imm(_) => Err(IrParseError::BadOperand(text.to_owned())),
        }
    }
}

impl FromStr for Instruction {
    type Err = IrParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        use Instruction::*;

        let line = line.trim();
        if let Some(value) = line.strip_prefix("return ") {
            return Ok(Ret {
                value: value.trim().parse()?,
            });
        }

        let (dst, rest) = line
            .split_once(" = ")
            .ok_or_else(|| IrParseError::BadInstruction(line.to_owned()))?;
        let dst: IrVar = dst.trim().parse()?;

        let operators: [(&str, fn(IrVar, IrValue, IrValue) -> Instruction); 3] = [
            (" + ", |dst, lhs, rhs| Add { dst, lhs, rhs }),
            (" - ", |dst, lhs, rhs| Sub { dst, lhs, rhs }),
            (" * ", |dst, lhs, rhs| Mul { dst, lhs, rhs }),
        ];

        for (separator, op) in operators {
            if let Some((lhs, rhs)) = rest.split_once(separator) {
                return Ok(op(dst, lhs.trim().parse()?, rhs.trim().parse()?));
            }
        }

        Ok(Mov {
            dst,
            src: rest.trim().parse()?,
        })
    }
}

/// Lista de instrucciones más el contador de temporales.
///
/// El contador pertenece al módulo y no a una fase: así los
/// temporales que sintetiza el normalizador jamás colisionan con los
/// del front end.
#[derive(Clone, Debug, Default)]
pub struct IrModule {
    pub instructions: Vec<Instruction>,
    next_temp: u32,
}

impl IrModule {
    pub fn new() -> Self {
        IrModule::default()
    }

    /// Sintetiza un temporal nuevo, único en este módulo.
    pub fn temp(&mut self) -> IrVar {
        let index = self.next_temp;
        self.next_temp += 1;

        IrVar::Temp(index)
    }

    /// Volcado textual, una instrucción por línea en orden de emisión.
    pub fn dump_lines(&self) -> Vec<String> {
        self.instructions
            .iter()
            .map(Instruction::to_string)
            .collect()
    }
}

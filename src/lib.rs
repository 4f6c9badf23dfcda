//! Compilador para un lenguaje imperativo de línea recta.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente. Este
//! archivo se somete primero a análisis léxico en [`lex`], de lo cual
//! se obtiene un flujo de tokens. A diferencia de un parser por
//! descenso recursivo, el análisis sintáctico es dirigido por tabla:
//! [`grammar`] define las producciones del lenguaje junto a su rol
//! semántico, [`table`] construye a partir de ellas la tabla SLR(1)
//! de acciones y saltos, y [`parse`] ejecuta el autómata
//! shift/reduce. El autómata no conoce semántica alguna: en cada
//! acción notifica a una lista de observadores registrados. Dos
//! observadores corren sobre el mismo parse: [`semantic`] anota tipos
//! declarados en la tabla de símbolos ([`symtab`]) e [`irgen`]
//! construye la representación intermedia descrita en [`ir`].
//!
//! # Back end
//! En esta sección el compilador deja de ser agnóstico al sistema
//! objetivo. La representación intermedia se normaliza primero en
//! [`codegen::legalize`] para que cada instrucción tenga operandos
//! admitidos por la ISA objetivo (RISC-V), y luego un único recorrido
//! en [`codegen`] asigna registros físicos y emite el listado
//! ensamblador. No hay spill a memoria: agotar el archivo de
//! registros es un error fatal tipado.
//!
//! El lenguaje no tiene saltos ni ciclos: todo programa es un único
//! bloque básico terminado por un `return`. Esa restricción es
//! deliberada y atraviesa todas las fases.

pub mod codegen;
pub mod error;
pub mod grammar;
pub mod ir;
pub mod irgen;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod symtab;
pub mod table;

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::CompileError,
    ir::IrModule,
    irgen::IrBuilder,
    lex::{Lexer, Token},
    parse::Parser,
    semantic::TypePropagator,
    symtab::SymbolTable,
    table::LrTable,
};

/// Artefactos producidos por una compilación completa.
#[derive(Debug)]
pub struct Artifacts {
    /// Flujo de tokens producido por el análisis léxico.
    pub tokens: Vec<Token>,

    /// Tabla de símbolos luego de la propagación de tipos.
    pub symbols: SymbolTable,

    /// Representación intermedia tal y como la emite el front end,
    /// antes de normalizar.
    pub ir: IrModule,

    /// Listado ensamblador final.
    pub asm: String,
}

/// Compila un programa fuente completo hasta ensamblador.
///
/// Orquesta todas las fases en orden: léxico, sintáctico con ambos
/// observadores semánticos, normalización de IR y emisión de código.
/// Cualquier fase puede fallar con un error tipado; ninguna fase
/// posterior se ejecuta tras un fallo.
pub fn compile(source: &str) -> Result<Artifacts, CompileError> {
    let symbols = Rc::new(RefCell::new(SymbolTable::new()));

    let tokens = Lexer::new(source, Rc::clone(&symbols))
        .try_exhaustive()
        .map_err(CompileError::Lex)?;

    let grammar = grammar::grammar();
    let table = LrTable::build(&grammar);

    let mut types = TypePropagator::new();
    let mut builder = IrBuilder::new();

    let mut parser = Parser::new(&table, &grammar, &tokens, Rc::clone(&symbols));
    parser.register_observer(&mut types);
    parser.register_observer(&mut builder);
    parser.run().map_err(CompileError::Syntax)?;
    drop(parser);

    let ir = builder.finish();
    let legal = codegen::legalize::legalize(ir.clone());

    let mut asm = Vec::new();
    codegen::emit(&legal, &mut asm).map_err(CompileError::Codegen)?;
    let asm = String::from_utf8(asm).expect("emitter wrote invalid UTF-8");

    // Los observadores retienen su referencia a la tabla hasta salir
    // de alcance, así que se entrega una copia
    let symbols = symbols.borrow().clone();

    Ok(Artifacts {
        tokens,
        symbols,
        ir,
        asm,
    })
}

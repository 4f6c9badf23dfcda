//! Error unificado de compilación.
//!
//! Cada fase define su propio enum de error junto a su módulo; aquí
//! solo se agregan bajo un mismo tipo para que el llamador decida qué
//! hacer con el fallo. La política es uniforme: ninguna fase escribe
//! a consola ni continúa tras detectar un error, todo se propaga como
//! `Result`.

use thiserror::Error;

use crate::{codegen::CodegenError, lex::LexerError, parse::SyntaxError};

/// Fallo en alguna fase de la compilación.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    /// El análisis léxico encontró un carácter fuera del alfabeto o
    /// una constante fuera de rango.
    #[error("lexical error: {0}")]
    Lex(#[from] LexerError),

    /// La tabla LR prescribió Error para el par (estado, token).
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// La generación de código agotó el archivo de registros o
    /// recibió una instrucción sin normalizar.
    #[error("code generation failed: {0}")]
    Codegen(#[from] CodegenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    // `anyhow::Context` en la CLI exige errores transferibles entre
    // hilos; ninguna variante debe cargar un tipo que no lo sea
    #[test]
    fn compile_errors_cross_thread_boundaries() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CompileError>();
    }
}

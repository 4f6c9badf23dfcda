//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Los espacios en blanco se
//! descartan durante esta operación. El alfabeto del lenguaje es
//! mínimo: letras, dígitos, los signos `; = + - * ( )` y espacios en
//! blanco; cualquier otro carácter es un error léxico con posición
//! exacta.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el
//! hecho de lo que son y no incluyen lexemas. Los identificadores sí
//! incluyen su lexema original, y además se registran de inmediato en
//! la tabla de símbolos con tipo sin determinar. Las constantes
//! literales se resuelven a sus valores en vez de preservar sus
//! lexemas.
//!
//! # Marcador de fin
//! El flujo siempre termina con exactamente un [`Token::Eof`], que el
//! autómata sintáctico usa como lookahead de aceptación.

use std::{
    cell::RefCell,
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::Chars,
};

use thiserror::Error;

use crate::symtab::SymbolTable;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// Carácter fuera del alfabeto reconocido.
    #[error("bad character {0:?} at {1}")]
    BadChar(char, Position),

    /// Una constante entera se encuentra fuera de rango.
    #[error("integer literal overflow at {0}, valid range is [0, {max}]", max = i32::MAX)]
    IntOverflow(Position),
}

/// Una posición línea-columna en el archivo fuente.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Incrementa el número de columna.
    fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}:{}", self.line, self.column)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(String),

    /// Literal de entero.
    IntConst(i32),

    /// Palabra clave `int`.
    Int,

    /// Palabra clave `return`.
    Return,

    /// `=`
    Assign,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `;`
    Semicolon,

    /// Marcador de fin del flujo.
    Eof,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            IntConst(integer) => write!(fmt, "literal `{}`", integer),
            Int => fmt.write_str("keyword `int`"),
            Return => fmt.write_str("keyword `return`"),
            Assign => fmt.write_str("`=`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            Semicolon => fmt.write_str("`;`"),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Máquina de estados para análisis léxico.
///
/// El lexer puede encontrarse en uno de diversos estados. La salida
/// del lexer, así como su siguiente estado, se define a partir de
/// tanto su estado actual como el siguiente carácter encontrado en el
/// flujo de entrada.
pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    state: State,
    here: Position,
    symbols: Rc<RefCell<SymbolTable>>,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido sin
    /// consumir la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que el
    /// siguiente carácter sea un dígito.
    Integer(i32),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial sobre un texto fuente.
    pub fn new(source: &'a str, symbols: Rc<RefCell<SymbolTable>>) -> Self {
        Lexer {
            source: source.chars().peekable(),
            state: State::Start,
            here: Position::default(),
            symbols,
        }
    }

    /// Reduce la entrada completa a un flujo de tokens terminado en
    /// [`Token::Eof`], o al primer error léxico encontrado.
    pub fn try_exhaustive(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        for result in &mut self {
            tokens.push(result?);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use {State::*, Token::*};

        let token = loop {
            let next_char = self.source.peek().copied();

            // Switch table principal, determina cambios de estado y
            // de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                (Start, None) => return Ok(None),

                // Tokens triviales
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('=')) => self.state = Complete(Assign),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),

                // Inicio de una constante numérica. No se consume el
                // dígito aquí: la lógica de acumulación ya existe en
                // el caso del estado de constante entera, por lo que
                // la constante inicia en cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_ascii_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c, self.here)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break Ok(std::mem::replace(token, Eof)),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).expect("digit out of base") as i32;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow(self.here)),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(IntConst(*integer)),

                // Extensión de términos
                (Word(word), Some(c)) if c.is_ascii_alphanumeric() => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => match word.as_str() {
                    "int" => break Ok(Int),
                    "return" => break Ok(Return),
                    _ => {
                        let id = std::mem::take(word);

                        let mut symbols = self.symbols.borrow_mut();
                        if !symbols.has(&id) {
                            symbols.add(&id);
                        }

                        break Ok(Id(id));
                    }
                },
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(c) = self.source.next() {
                self.here = match c {
                    '\n' => self.here.newline(),
                    _ => self.here.advance(),
                };
            }
        };

        token.map(Some)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;
                Some(Ok(token))
            }

            Err(error) => Some(Err(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Result<Vec<Token>, LexerError> {
        let symbols = Rc::new(RefCell::new(SymbolTable::new()));
        Lexer::new(source, symbols).try_exhaustive()
    }

    #[test]
    fn tokenizes_straight_line_program() {
        use Token::*;

        let tokens = lex("int a;\na = 1 + 2;\nreturn a;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Int,
                Id("a".into()),
                Semicolon,
                Id("a".into()),
                Assign,
                IntConst(1),
                Plus,
                IntConst(2),
                Semicolon,
                Return,
                Id("a".into()),
                Semicolon,
                Eof,
            ]
        );
    }

    #[test]
    fn registers_identifiers_in_symbol_table() {
        let symbols = Rc::new(RefCell::new(SymbolTable::new()));
        Lexer::new("int abc; abc = 42;", Rc::clone(&symbols))
            .try_exhaustive()
            .unwrap();

        assert!(symbols.borrow().has("abc"));
        assert!(!symbols.borrow().has("int"));
    }

    #[test]
    fn rejects_characters_outside_the_alphabet() {
        let error = lex("a = 1 / 2;").unwrap_err();
        assert!(matches!(error, LexerError::BadChar('/', _)));

        match error {
            LexerError::BadChar(_, position) => assert_eq!(position.to_string(), "1:7"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn rejects_overflowing_literals() {
        assert!(matches!(
            lex("a = 99999999999;"),
            Err(LexerError::IntOverflow(_))
        ));

        // El máximo representable sí se acepta
        let tokens = lex("a = 2147483647;").unwrap();
        assert!(tokens.contains(&Token::IntConst(i32::MAX)));
    }
}

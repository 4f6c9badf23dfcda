//! Análisis sintáctico dirigido por tabla.
//!
//! El driver ejecuta el ciclo shift/reduce/accept/error sobre el
//! flujo de tokens, manteniendo una pila de estados y una pila de
//! símbolos de igual profundidad en todo momento. El driver no
//! contiene semántica alguna: en cada acción notifica, en orden de
//! registro, a los observadores suscritos mediante el protocolo
//! [`ActionObserver`]. Los observadores mantienen sus propias pilas
//! de valores privadas y jamás ven las pilas del driver; toda
//! comunicación entre pasadas ocurre a través de la tabla de símbolos
//! o de la lista de instrucciones IR que cada observador produce.
//!
//! Un par (estado, token) sin acción definida aborta el parse con un
//! [`SyntaxError`] tipado; no hay recuperación de errores.

use std::{cell::RefCell, rc::Rc};

use log::trace;
use thiserror::Error;

use crate::{
    grammar::{Grammar, GrammarSym, NonTerminal, Production, Terminal},
    lex::Token,
    symtab::SymbolTable,
    table::{LrAction, LrTable, State},
};

/// Error de sintaxis: la tabla prescribió Error para el estado
/// actual y el token a la vista.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected {token} in state {state}")]
pub struct SyntaxError {
    pub state: State,
    pub token: Token,
}

/// Observador de acciones del autómata.
///
/// Cada observador recibe todos los eventos del parse, en orden de
/// registro, antes de que el driver mute sus pilas. Un observador
/// típico mantiene una pila de valores paralela a la pila de símbolos
/// del driver.
pub trait ActionObserver {
    /// El driver presta la tabla de símbolos compartida al momento
    /// del registro.
    fn bind_symbols(&mut self, _symbols: Rc<RefCell<SymbolTable>>) {}

    /// Se consumió `token` estando en `state`.
    fn on_shift(&mut self, state: State, token: &Token);

    /// Se reducirá por `production` estando en `state`. Se invoca
    /// antes de mutar las pilas del driver.
    fn on_reduce(&mut self, state: State, production: &Production);

    /// El programa fue aceptado.
    fn on_accept(&mut self, _state: State) {}
}

/// Entrada de la pila de símbolos del driver.
///
/// Envuelve un token consumido o el no terminal resultado de una
/// reducción. El driver no adjunta valores semánticos: esos viven en
/// las pilas privadas de los observadores.
enum ParseSym {
    Token(Token),
    Reduced(NonTerminal),
}

impl ParseSym {
    /// Verifica que el símbolo corresponda al esperado por el cuerpo
    /// de una producción.
    fn is(&self, sym: GrammarSym) -> bool {
        match (self, sym) {
            (ParseSym::Token(token), GrammarSym::T(terminal)) => Terminal::of(token) == terminal,
            (ParseSym::Reduced(head), GrammarSym::N(nonterminal)) => *head == nonterminal,
            _ => false,
        }
    }
}

/// Driver del autómata LR.
pub struct Parser<'a> {
    table: &'a LrTable,
    grammar: &'a Grammar,
    tokens: &'a [Token],
    symbols: Rc<RefCell<SymbolTable>>,
    observers: Vec<&'a mut dyn ActionObserver>,
}

impl<'a> Parser<'a> {
    /// Crea un driver sobre un flujo de tokens terminado en
    /// [`Token::Eof`].
    pub fn new(
        table: &'a LrTable,
        grammar: &'a Grammar,
        tokens: &'a [Token],
        symbols: Rc<RefCell<SymbolTable>>,
    ) -> Self {
        Parser {
            table,
            grammar,
            tokens,
            symbols,
            observers: Vec::new(),
        }
    }

    /// Registra un nuevo observador y le presta la tabla de símbolos.
    pub fn register_observer(&mut self, observer: &'a mut dyn ActionObserver) {
        observer.bind_symbols(Rc::clone(&self.symbols));
        self.observers.push(observer);
    }

    /// Consume el flujo completo y ejecuta el autómata hasta aceptar
    /// o fallar.
    pub fn run(&mut self) -> Result<(), SyntaxError> {
        let mut states = vec![self.table.initial()];
        let mut stack = vec![ParseSym::Token(Token::Eof)];

        let mut cursor = 0;
        loop {
            // Invariante: ambas pilas tienen la misma profundidad
            debug_assert_eq!(states.len(), stack.len());

            let token = self.tokens.get(cursor).unwrap_or(&Token::Eof);
            let state = *states.last().expect("state stack underflow");

            match self.table.action(state, Terminal::of(token)) {
                LrAction::Shift(next) => {
                    trace!("{}: shift {} -> {}", state, token, next);
                    for observer in &mut self.observers {
                        observer.on_shift(state, token);
                    }

                    states.push(next);
                    stack.push(ParseSym::Token(token.clone()));
                    cursor += 1;
                }

                LrAction::Reduce(index) => {
                    let production = self.grammar.production(index);
                    trace!("{}: reduce {}", state, production);

                    // Los observadores ven el evento antes de que las
                    // pilas cambien
                    for observer in &mut self.observers {
                        observer.on_reduce(state, production);
                    }

                    // Los símbolos desapilados deben deletrear el
                    // cuerpo de la producción, de atrás hacia adelante
                    for &expected in production.body.iter().rev() {
                        states.pop();
                        let popped = stack.pop().expect("symbol stack underflow");
                        debug_assert!(popped.is(expected), "stack mismatch at {}", production);
                    }

                    let top = *states.last().expect("state stack underflow");
                    states.push(self.table.goto_state(top, production.head));
                    stack.push(ParseSym::Reduced(production.head));
                }

                LrAction::Accept => {
                    trace!("{}: accept after {} tokens", state, cursor);
                    for observer in &mut self.observers {
                        observer.on_accept(state);
                    }

                    return Ok(());
                }

                LrAction::Error => {
                    return Err(SyntaxError {
                        state,
                        token: token.clone(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::grammar, lex::Lexer};

    /// Observador que reproduce la contabilidad de pila del driver
    /// sobre una pila propia.
    #[derive(Default)]
    struct Recorder {
        depth: usize,
        shifts: usize,
        reduces: Vec<usize>,
        accepted: bool,
    }

    impl ActionObserver for Recorder {
        fn on_shift(&mut self, _state: State, _token: &Token) {
            self.depth += 1;
            self.shifts += 1;
        }

        fn on_reduce(&mut self, _state: State, production: &Production) {
            assert!(self.depth >= production.body.len(), "stack underflow");

            self.depth -= production.body.len();
            self.depth += 1;
            self.reduces.push(production.index);
        }

        fn on_accept(&mut self, _state: State) {
            self.accepted = true;
        }
    }

    fn tokens(source: &str) -> Vec<Token> {
        let symbols = Rc::new(RefCell::new(SymbolTable::new()));
        Lexer::new(source, symbols).try_exhaustive().unwrap()
    }

    fn drive(source: &str) -> (Result<(), SyntaxError>, Recorder) {
        let grammar = grammar();
        let table = LrTable::build(&grammar);
        let tokens = tokens(source);

        let symbols = Rc::new(RefCell::new(SymbolTable::new()));
        let mut recorder = Recorder::default();

        let mut parser = Parser::new(&table, &grammar, &tokens, symbols);
        parser.register_observer(&mut recorder);
        let result = parser.run();

        (result, recorder)
    }

    #[test]
    fn accepts_a_valid_program_with_balanced_stacks() {
        let (result, recorder) = drive("int a; a = 1 + 2 * (3 - 4); return a;");

        result.unwrap();
        assert!(recorder.accepted);

        // Tras aceptar, la pila de valores contiene únicamente el
        // símbolo objetivo
        assert_eq!(recorder.depth, 1);

        // Cada token salvo el marcador de fin se consume exactamente
        // una vez
        assert_eq!(recorder.shifts, tokens("int a; a = 1 + 2 * (3 - 4); return a;").len() - 1);
    }

    #[test]
    fn reduces_never_include_the_augmentation() {
        let (result, recorder) = drive("return 1;");

        result.unwrap();
        assert!(!recorder.reduces.contains(&0));
        assert!(!recorder.reduces.is_empty());
    }

    #[test]
    fn rejects_bad_syntax_with_the_offending_token() {
        let (result, recorder) = drive("int a; a = ; return a;");

        let error = result.unwrap_err();
        assert_eq!(error.token, Token::Semicolon);
        assert!(!recorder.accepted);
    }

    #[test]
    fn rejects_truncated_programs() {
        let (result, _) = drive("return 1 +");
        assert!(matches!(result, Err(SyntaxError { token: Token::Eof, .. })));
    }

    #[test]
    fn rejects_programs_without_a_final_semicolon() {
        let (result, _) = drive("return 1");
        assert!(matches!(result, Err(SyntaxError { token: Token::Eof, .. })));
    }
}

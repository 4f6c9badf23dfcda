//! Propagación de tipos declarados.
//!
//! Observador puramente dirigido por reducciones: cuando el autómata
//! reduce una declaración, el tipo que viajó con la palabra clave
//! (fijado al momento del shift) se escribe en la entrada de la tabla
//! de símbolos del identificador declarado. No hay verificación de
//! redeclaración ni marcha atrás: la última escritura gana.

use std::{cell::RefCell, rc::Rc};

use crate::{
    grammar::{Production, Role},
    lex::Token,
    parse::ActionObserver,
    symtab::{SourceType, SymbolTable},
    table::State,
};

/// Entrada de la pila de valores privada del observador.
struct Sym {
    token: Option<Token>,
    typ: Option<SourceType>,
}

impl Sym {
    fn empty() -> Self {
        Sym {
            token: None,
            typ: None,
        }
    }
}

/// Observador que anota tipos declarados en la tabla de símbolos.
pub struct TypePropagator {
    symbols: Option<Rc<RefCell<SymbolTable>>>,
    stack: Vec<Sym>,
}

impl TypePropagator {
    pub fn new() -> Self {
        TypePropagator {
            symbols: None,
            stack: Vec::new(),
        }
    }
}

impl Default for TypePropagator {
    fn default() -> Self {
        TypePropagator::new()
    }
}

impl ActionObserver for TypePropagator {
    fn bind_symbols(&mut self, symbols: Rc<RefCell<SymbolTable>>) {
        self.symbols = Some(symbols);
    }

    fn on_shift(&mut self, _state: State, token: &Token) {
        // Solo las palabras clave de tipo cargan un tipo; el resto
        // de los tokens viajan sin anotación
        let typ = match token {
            Token::Int => Some(SourceType::Int),
            _ => None,
        };

        self.stack.push(Sym {
            token: Some(token.clone()),
            typ,
        });
    }

    fn on_reduce(&mut self, _state: State, production: &Production) {
        match production.role {
            // `Stmt -> Decl id`: el tipo que subió con `Decl` se
            // escribe en la entrada del identificador
            Role::Declaration => {
                let id = self.stack.pop().expect("value stack underflow");
                let decl = self.stack.pop().expect("value stack underflow");

                let name = match id.token {
                    Some(Token::Id(name)) => name,
                    other => panic!("declaration of a non-identifier: {:?}", other),
                };

                let symbols = self.symbols.as_ref().expect("unbound symbol table");
                let mut symbols = symbols.borrow_mut();
                if !symbols.has(&name) {
                    symbols.add(&name);
                }

                let entry = symbols.get_mut(&name).expect("symbol just inserted");
                entry.typ = decl.typ;

                self.stack.push(Sym::empty());
            }

            // `Decl -> int`: el tipo de la palabra clave fluye hacia
            // arriba sin cambios
            Role::TypeName => {
                let keyword = self.stack.pop().expect("value stack underflow");
                self.stack.push(Sym {
                    token: None,
                    typ: keyword.typ,
                });
            }

            // Contabilidad estructural pura
            _ => {
                for _ in 0..production.body.len() {
                    self.stack.pop().expect("value stack underflow");
                }

                self.stack.push(Sym::empty());
            }
        }
    }
}

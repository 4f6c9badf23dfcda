//! Tabla de análisis LR.
//!
//! Construye la tabla SLR(1) de acciones y saltos a partir de la
//! gramática: colección canónica de ítems LR(0) más conjuntos FIRST y
//! FOLLOW. La construcción ocurre una sola vez al inicio; el resto
//! del compilador consume la tabla únicamente a través de la interfaz
//! de lectura ([`LrTable::action`], [`LrTable::goto_state`],
//! [`LrTable::initial`]) y nunca inspecciona los conjuntos de ítems.
//!
//! La gramática del lenguaje es fija y SLR(1); un conflicto durante
//! la construcción es un defecto de programación, no una condición de
//! ejecución, y por tanto detiene el proceso de inmediato.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt::{self, Display},
};

use log::debug;

use crate::grammar::{Grammar, GrammarSym, NonTerminal, Terminal};

/// Identificador opaco de un estado del autómata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(u32);

impl Display for State {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let State(id) = self;
        write!(fmt, "s{}", id)
    }
}

/// Acción que la tabla prescribe para un par (estado, terminal).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LrAction {
    /// Consumir el token y pasar al estado sucesor.
    Shift(State),

    /// Reducir por la producción con el índice dado.
    Reduce(usize),

    /// El programa completo fue reconocido.
    Accept,

    /// Ninguna acción definida: error de sintaxis.
    Error,
}

/// Ítem LR(0): una producción con un punto de avance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    production: usize,
    dot: usize,
}

/// Tabla de acciones y saltos, de solo lectura una vez construida.
pub struct LrTable {
    actions: HashMap<(State, Terminal), LrAction>,
    gotos: HashMap<(State, NonTerminal), State>,
    initial: State,
}

impl LrTable {
    /// Construye la tabla SLR(1) para una gramática.
    ///
    /// # Panics
    /// Si la gramática presenta un conflicto shift/reduce o
    /// reduce/reduce bajo SLR(1).
    pub fn build(grammar: &Grammar) -> LrTable {
        let first = first_sets(grammar);
        let follow = follow_sets(grammar, &first);

        let mut states: Vec<BTreeSet<Item>> = Vec::new();
        let mut index_of: HashMap<BTreeSet<Item>, usize> = HashMap::new();

        let start = closure(grammar, BTreeSet::from([Item { production: 0, dot: 0 }]));
        index_of.insert(start.clone(), 0);
        states.push(start);

        let mut actions = HashMap::new();
        let mut gotos = HashMap::new();

        let mut pending = 0;
        while pending < states.len() {
            let from = State(pending as u32);

            // Núcleos de los sucesores, agrupados por símbolo tras el punto
            let mut kernels: BTreeMap<GrammarSym, BTreeSet<Item>> = BTreeMap::new();
            for item in &states[pending] {
                let body = &grammar.production(item.production).body;
                if let Some(sym) = body.get(item.dot) {
                    kernels.entry(*sym).or_default().insert(Item {
                        production: item.production,
                        dot: item.dot + 1,
                    });
                }
            }

            for (sym, kernel) in kernels {
                let successor = closure(grammar, kernel);
                let target = match index_of.get(&successor) {
                    Some(&index) => State(index as u32),
                    None => {
                        let index = states.len();
                        index_of.insert(successor.clone(), index);
                        states.push(successor);
                        State(index as u32)
                    }
                };

                match sym {
                    GrammarSym::T(terminal) => {
                        install(&mut actions, from, terminal, LrAction::Shift(target));
                    }

                    GrammarSym::N(nonterminal) => {
                        gotos.insert((from, nonterminal), target);
                    }
                }
            }

            // Ítems completos: aceptación para el aumento, reduce
            // sobre FOLLOW(cabeza) para el resto
            for item in &states[pending] {
                let production = grammar.production(item.production);
                if item.dot < production.body.len() {
                    continue;
                }

                if item.production == 0 {
                    install(&mut actions, from, Terminal::Eof, LrAction::Accept);
                    continue;
                }

                for &terminal in &follow[&production.head] {
                    install(
                        &mut actions,
                        from,
                        terminal,
                        LrAction::Reduce(item.production),
                    );
                }
            }

            pending += 1;
        }

        debug!(
            "built SLR(1) table: {} states, {} actions, {} gotos",
            states.len(),
            actions.len(),
            gotos.len()
        );

        LrTable {
            actions,
            gotos,
            initial: State(0),
        }
    }

    /// Acción para un par (estado, terminal). La ausencia de entrada
    /// es en sí misma la acción de error.
    pub fn action(&self, state: State, terminal: Terminal) -> LrAction {
        self.actions
            .get(&(state, terminal))
            .copied()
            .unwrap_or(LrAction::Error)
    }

    /// Estado sucesor tras reducir a un no terminal.
    ///
    /// Toda reducción válida tiene un salto definido; que falte es un
    /// defecto de construcción de la tabla.
    pub fn goto_state(&self, state: State, nonterminal: NonTerminal) -> State {
        *self
            .gotos
            .get(&(state, nonterminal))
            .expect("missing goto entry for a valid reduce")
    }

    /// Estado inicial del autómata.
    pub fn initial(&self) -> State {
        self.initial
    }
}

/// Registra una acción, verificando que no contradiga otra existente.
fn install(
    actions: &mut HashMap<(State, Terminal), LrAction>,
    state: State,
    terminal: Terminal,
    action: LrAction,
) {
    if let Some(existing) = actions.insert((state, terminal), action) {
        if existing != action {
            panic!(
                "SLR(1) conflict at ({}, {:?}): {:?} vs {:?}",
                state, terminal, existing, action
            );
        }
    }
}

/// Cierre de un conjunto de ítems LR(0).
fn closure(grammar: &Grammar, items: BTreeSet<Item>) -> BTreeSet<Item> {
    let mut closed = items;
    let mut frontier: Vec<Item> = closed.iter().copied().collect();

    while let Some(item) = frontier.pop() {
        let body = &grammar.production(item.production).body;
        let nonterminal = match body.get(item.dot) {
            Some(GrammarSym::N(nonterminal)) => *nonterminal,
            _ => continue,
        };

        for production in &grammar.productions {
            if production.head != nonterminal {
                continue;
            }

            let item = Item {
                production: production.index,
                dot: 0,
            };

            if closed.insert(item) {
                frontier.push(item);
            }
        }
    }

    closed
}

type TerminalSets = HashMap<NonTerminal, BTreeSet<Terminal>>;

/// Conjuntos FIRST por no terminal.
///
/// La gramática no tiene producciones vacías, por lo cual solo el
/// primer símbolo de cada cuerpo aporta a FIRST.
fn first_sets(grammar: &Grammar) -> TerminalSets {
    let mut first: TerminalSets = TerminalSets::new();

    let mut changed = true;
    while changed {
        changed = false;

        for production in &grammar.productions {
            let added: BTreeSet<Terminal> = match production.body[0] {
                GrammarSym::T(terminal) => BTreeSet::from([terminal]),
                GrammarSym::N(nonterminal) => {
                    first.get(&nonterminal).cloned().unwrap_or_default()
                }
            };

            let target = first.entry(production.head).or_default();
            for terminal in added {
                changed |= target.insert(terminal);
            }
        }
    }

    first
}

/// Conjuntos FOLLOW por no terminal.
fn follow_sets(grammar: &Grammar, first: &TerminalSets) -> TerminalSets {
    let mut follow: TerminalSets = TerminalSets::new();
    follow
        .entry(NonTerminal::Goal)
        .or_default()
        .insert(Terminal::Eof);

    let mut changed = true;
    while changed {
        changed = false;

        for production in &grammar.productions {
            for (position, sym) in production.body.iter().enumerate() {
                let nonterminal = match sym {
                    GrammarSym::N(nonterminal) => *nonterminal,
                    GrammarSym::T(_) => continue,
                };

                let added: BTreeSet<Terminal> = match production.body.get(position + 1) {
                    Some(GrammarSym::T(terminal)) => BTreeSet::from([*terminal]),
                    Some(GrammarSym::N(next)) => {
                        first.get(next).cloned().unwrap_or_default()
                    }

                    // Al final del cuerpo, FOLLOW(cabeza) fluye al símbolo
                    None => follow.get(&production.head).cloned().unwrap_or_default(),
                };

                let target = follow.entry(nonterminal).or_default();
                for terminal in added {
                    changed |= target.insert(terminal);
                }
            }
        }
    }

    follow
}

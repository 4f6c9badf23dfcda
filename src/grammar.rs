//! Gramática del lenguaje y roles semánticos.
//!
//! El autómata sintáctico opera sobre símbolos gramaticales, no sobre
//! tokens concretos: cada token se proyecta a su terminal mediante
//! [`Terminal::of`]. Las producciones llevan, además de cabeza y
//! cuerpo, un rol semántico resuelto una única vez al construir la
//! gramática. Los observadores despachan sobre ese rol y nunca sobre
//! el índice numérico de la producción, de modo que renumerar la
//! gramática no afecta la semántica.

use std::fmt::{self, Display};

use crate::lex::Token;

/// Símbolo terminal de la gramática.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    Int,
    Return,
    Id,
    IntConst,
    Assign,
    Plus,
    Minus,
    Times,
    OpenParen,
    CloseParen,
    Semicolon,
    Eof,
}

impl Terminal {
    /// Proyecta un token a su terminal.
    pub fn of(token: &Token) -> Terminal {
        match token {
            Token::Int => Terminal::Int,
            Token::Return => Terminal::Return,
            Token::Id(_) => Terminal::Id,
            Token::IntConst(_) => Terminal::IntConst,
            Token::Assign => Terminal::Assign,
            Token::Plus => Terminal::Plus,
            Token::Minus => Terminal::Minus,
            Token::Times => Terminal::Times,
            Token::OpenParen => Terminal::OpenParen,
            Token::CloseParen => Terminal::CloseParen,
            Token::Semicolon => Terminal::Semicolon,
            Token::Eof => Terminal::Eof,
        }
    }
}

/// Símbolo no terminal de la gramática.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NonTerminal {
    /// Símbolo de aumento, solo aparece en la producción 0.
    Goal,
    Program,
    StmtList,
    Stmt,
    Decl,
    Expr,
    Term,
    Factor,
}

impl Display for NonTerminal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NonTerminal::*;

        let string = match self {
            Goal => "Goal",
            Program => "Program",
            StmtList => "StmtList",
            Stmt => "Stmt",
            Decl => "Decl",
            Expr => "Expr",
            Term => "Term",
            Factor => "Factor",
        };

        fmt.write_str(string)
    }
}

/// Un símbolo cualquiera en el cuerpo de una producción.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarSym {
    T(Terminal),
    N(NonTerminal),
}

/// Rol semántico de una producción.
///
/// Los observadores deciden qué hacer en cada reduce a partir de este
/// tag y no del índice de la producción.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// `Stmt -> Decl id`
    Declaration,

    /// `Decl -> int`: propaga el tipo de la palabra clave hacia arriba.
    TypeName,

    /// `Stmt -> id = Expr`
    Assignment,

    /// `Stmt -> return Expr`
    Return,

    /// `Expr -> Expr + Term`
    Add,

    /// `Expr -> Expr - Term`
    Sub,

    /// `Term -> Term * Factor`
    Mul,

    /// `Factor -> ( Expr )`
    Paren,

    /// Producciones de un solo operando significativo cuyo valor
    /// fluye hacia arriba sin cambios.
    Pass,

    /// Todo lo demás: solo contabilidad estructural de pila.
    Other,
}

/// Una producción de la gramática.
#[derive(Clone, Debug)]
pub struct Production {
    pub index: usize,
    pub head: NonTerminal,
    pub body: Vec<GrammarSym>,
    pub role: Role,
}

impl Display for Production {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} ->", self.head)?;
        for sym in &self.body {
            match sym {
                GrammarSym::T(terminal) => write!(fmt, " {:?}", terminal)?,
                GrammarSym::N(nonterminal) => write!(fmt, " {}", nonterminal)?,
            }
        }

        Ok(())
    }
}

/// La gramática completa del lenguaje.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub productions: Vec<Production>,
}

impl Grammar {
    /// Obtiene una producción por índice.
    pub fn production(&self, index: usize) -> &Production {
        &self.productions[index]
    }
}

/// Construye la gramática del lenguaje.
///
/// La producción 0 es el aumento `Goal -> Program` que la
/// construcción de la tabla usa para decidir aceptación; nunca se
/// reduce.
pub fn grammar() -> Grammar {
    use {GrammarSym::*, NonTerminal::*, Role::*, Terminal as T};

    let rules = vec![
        (Goal, vec![N(Program)], Other),
        (Program, vec![N(StmtList)], Other),
        (StmtList, vec![N(Stmt), T(T::Semicolon), N(StmtList)], Other),
        (StmtList, vec![N(Stmt), T(T::Semicolon)], Other),
        (Stmt, vec![N(Decl), T(T::Id)], Declaration),
        (Decl, vec![T(T::Int)], TypeName),
        (Stmt, vec![T(T::Id), T(T::Assign), N(Expr)], Assignment),
        (Stmt, vec![T(T::Return), N(Expr)], Role::Return),
        (Expr, vec![N(Expr), T(T::Plus), N(Term)], Add),
        (Expr, vec![N(Expr), T(T::Minus), N(Term)], Sub),
        (Expr, vec![N(Term)], Pass),
        (Term, vec![N(Term), T(T::Times), N(Factor)], Mul),
        (Term, vec![N(Factor)], Pass),
        (Factor, vec![T(T::OpenParen), N(Expr), T(T::CloseParen)], Paren),
        (Factor, vec![T(T::Id)], Pass),
        (Factor, vec![T(T::IntConst)], Pass),
    ];

    let productions = rules
        .into_iter()
        .enumerate()
        .map(|(index, (head, body, role))| Production {
            index,
            head,
            body,
            role,
        })
        .collect();

    Grammar { productions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_resolved_at_construction() {
        let grammar = grammar();

        let declarations: Vec<_> = grammar
            .productions
            .iter()
            .filter(|production| production.role == Role::Declaration)
            .collect();

        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].head, NonTerminal::Stmt);
        assert_eq!(declarations[0].body.len(), 2);

        // Exactamente una producción por operador binario
        for role in [Role::Add, Role::Sub, Role::Mul] {
            let count = grammar
                .productions
                .iter()
                .filter(|production| production.role == role)
                .count();
            assert_eq!(count, 1, "{:?}", role);
        }
    }

    #[test]
    fn augmentation_is_production_zero() {
        let grammar = grammar();
        let goal = grammar.production(0);

        assert_eq!(goal.head, NonTerminal::Goal);
        assert_eq!(goal.body, vec![GrammarSym::N(NonTerminal::Program)]);
    }
}

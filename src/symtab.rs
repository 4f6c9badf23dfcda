//! Tabla de símbolos.
//!
//! Mapea nombres de identificadores a registros mutables. El lexer
//! inserta cada identificador apenas lo reconoce, con tipo aún sin
//! determinar; el observador de tipos ([`crate::semantic`]) completa
//! el campo durante el parse. No hay ámbitos anidados: el lenguaje
//! tiene un único ámbito plano.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

/// Tipo declarable en el lenguaje fuente.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceType {
    Int,
}

impl Display for SourceType {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Int => fmt.write_str("int"),
        }
    }
}

/// Registro asociado a un identificador.
#[derive(Clone, Debug, Default)]
pub struct SymbolEntry {
    /// Tipo declarado, o `None` mientras no se haya visto una
    /// declaración. La última declaración gana.
    pub typ: Option<SourceType>,
}

/// Mapeo de nombre a registro de símbolo.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Consulta si el nombre ya fue registrado.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registra un nombre nuevo con tipo sin determinar.
    pub fn add(&mut self, name: &str) {
        self.entries.insert(name.to_owned(), SymbolEntry::default());
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        self.entries.get_mut(name)
    }

    /// Listado textual de la tabla, una línea por símbolo, en orden
    /// alfabético para que la salida sea determinista.
    pub fn dump_lines(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let entry = &self.entries[name];
                match entry.typ {
                    Some(typ) => format!("{}: {}", name, typ),
                    None => format!("{}: <undetermined>", name),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_lookup() {
        let mut table = SymbolTable::new();
        assert!(!table.has("a"));

        table.add("a");
        assert!(table.has("a"));
        assert!(table.get("a").unwrap().typ.is_none());

        table.get_mut("a").unwrap().typ = Some(SourceType::Int);
        assert_eq!(table.get("a").unwrap().typ, Some(SourceType::Int));
    }

    #[test]
    fn dump_is_sorted() {
        let mut table = SymbolTable::new();
        table.add("b");
        table.add("a");
        table.get_mut("a").unwrap().typ = Some(SourceType::Int);

        assert_eq!(table.dump_lines(), vec!["a: int", "b: <undetermined>"]);
    }
}

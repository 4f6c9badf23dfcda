//! Construcción de la representación intermedia.
//!
//! Segundo observador del parse. En cada shift adjunta al símbolo un
//! valor IR (inmediato para constantes, variable nombrada para
//! identificadores, nada para el resto); en cada reduce despacha por
//! el rol semántico de la producción y emite instrucciones de tres
//! direcciones. El orden de pops importa: el operando derecho se
//! desapila siempre antes que el izquierdo, reflejando el orden LIFO
//! de los shifts.
//!
//! Cuando el lado derecho de una asignación es el temporal que acaba
//! de definir la instrucción recién emitida, el constructor retitula
//! esa instrucción con el destino real en vez de emitir un `Mov`
//! redundante; en cualquier otro caso la asignación es un `Mov`.

use std::sync::Arc;

use log::trace;

use crate::{
    grammar::{Production, Role},
    ir::{Instruction, IrModule, IrValue, IrVar},
    lex::Token,
    parse::ActionObserver,
    table::State,
};

/// Entrada de la pila de valores privada del observador.
struct Sym {
    value: Option<IrValue>,
}

/// Observador que emite IR durante el parse.
pub struct IrBuilder {
    stack: Vec<Sym>,
    module: IrModule,
}

impl IrBuilder {
    pub fn new() -> Self {
        IrBuilder {
            stack: Vec::new(),
            module: IrModule::new(),
        }
    }

    /// Entrega el módulo IR construido.
    pub fn finish(self) -> IrModule {
        self.module
    }

    fn pop(&mut self) -> Option<IrValue> {
        self.stack.pop().expect("value stack underflow").value
    }

    fn pop_value(&mut self) -> IrValue {
        self.pop().expect("operand without IR value")
    }

    fn pop_var(&mut self) -> IrVar {
        match self.pop_value() {
            IrValue::Var(var) => var,
            IrValue::Imm(imm) => panic!("expected a variable, found immediate {}", imm),
        }
    }

    fn push_value(&mut self, value: Option<IrValue>) {
        self.stack.push(Sym { value });
    }

    fn emit(&mut self, instruction: Instruction) {
        trace!("emit {}", instruction);
        self.module.instructions.push(instruction);
    }

    /// Reescribe el destino de la última instrucción emitida si es
    /// exactamente el temporal dado.
    fn retarget_last(&mut self, temp: &IrVar, target: &IrVar) -> bool {
        use Instruction::*;

        if !matches!(temp, IrVar::Temp(_)) {
            return false;
        }

        match self.module.instructions.last_mut() {
            Some(Add { dst, .. }) | Some(Sub { dst, .. }) | Some(Mul { dst, .. })
                if dst == temp =>
            {
                *dst = target.clone();
                true
            }

            _ => false,
        }
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        IrBuilder::new()
    }
}

impl ActionObserver for IrBuilder {
    fn on_shift(&mut self, _state: State, token: &Token) {
        let value = match token {
            Token::IntConst(integer) => Some(IrValue::Imm(*integer)),

            // Usos repetidos del mismo identificador resuelven a la
            // misma variable
            Token::Id(name) => Some(IrValue::Var(IrVar::Named(Arc::from(name.as_str())))),

            _ => None,
        };

        self.push_value(value);
    }

    fn on_reduce(&mut self, _state: State, production: &Production) {
        match production.role {
            // `Stmt -> id = Expr`
            Role::Assignment => {
                let rhs = self.pop_value();
                self.pop(); // `=`
                let target = self.pop_var();

                let absorbed = match &rhs {
                    IrValue::Var(temp) => self.retarget_last(temp, &target),
                    IrValue::Imm(_) => false,
                };

                if !absorbed {
                    self.emit(Instruction::Mov {
                        dst: target,
                        src: rhs,
                    });
                }

                self.push_value(None);
            }

            // `Stmt -> return Expr`
            Role::Return => {
                let value = self.pop_value();
                self.pop(); // `return`

                self.emit(Instruction::Ret { value });
                self.push_value(None);
            }

            Role::Add | Role::Sub | Role::Mul => {
                let rhs = self.pop_value();
                self.pop(); // operador
                let lhs = self.pop_value();

                let dst = self.module.temp();
                let instruction = match production.role {
                    Role::Add => Instruction::Add {
                        dst: dst.clone(),
                        lhs,
                        rhs,
                    },
                    Role::Sub => Instruction::Sub {
                        dst: dst.clone(),
                        lhs,
                        rhs,
                    },
                    _ => Instruction::Mul {
                        dst: dst.clone(),
                        lhs,
                        rhs,
                    },
                };

                self.emit(instruction);
                self.push_value(Some(IrValue::Var(dst)));
            }

            // `Factor -> ( Expr )`: el valor interior fluye hacia arriba
            Role::Paren => {
                self.pop(); // `)`
                let value = self.pop();
                self.pop(); // `(`

                self.push_value(value);
            }

            // Producciones de un único símbolo significativo
            Role::Pass => {
                let value = self.pop();
                self.push_value(value);
            }

            // Contabilidad estructural pura
            Role::Declaration | Role::TypeName | Role::Other => {
                for _ in 0..production.body.len() {
                    self.pop();
                }

                self.push_value(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::grammar,
        lex::Lexer,
        parse::Parser,
        symtab::SymbolTable,
        table::LrTable,
    };
    use std::{cell::RefCell, rc::Rc};

    fn build(source: &str) -> IrModule {
        let symbols = Rc::new(RefCell::new(SymbolTable::new()));
        let tokens = Lexer::new(source, Rc::clone(&symbols))
            .try_exhaustive()
            .unwrap();

        let grammar = grammar();
        let table = LrTable::build(&grammar);

        let mut builder = IrBuilder::new();
        let mut parser = Parser::new(&table, &grammar, &tokens, symbols);
        parser.register_observer(&mut builder);
        parser.run().unwrap();
        drop(parser);

        builder.finish()
    }

    fn lines(module: &IrModule) -> Vec<String> {
        module.dump_lines()
    }

    #[test]
    fn simple_assignments_are_movs() {
        let module = build("int a; a = 1; return a;");
        assert_eq!(lines(&module), vec!["a = 1", "return a"]);
    }

    #[test]
    fn assignment_absorbs_the_outermost_temporary() {
        let module = build("int a; a = 1 + 2; return a;");
        assert_eq!(lines(&module), vec!["a = 1 + 2", "return a"]);
    }

    #[test]
    fn inner_temporaries_survive() {
        let module = build("int a; int b; b = 2; a = (1 + b) * 3; return a;");
        assert_eq!(
            lines(&module),
            vec!["b = 2", "$0 = 1 + b", "a = $0 * 3", "return a"]
        );
    }

    #[test]
    fn absorbed_temporaries_keep_their_index() {
        let mut module = build("int a; int b; a = 5; b = 2 * a; return b;");
        assert_eq!(lines(&module), vec!["a = 5", "b = 2 * a", "return b"]);

        // La reducción absorbida por el retitulado ya consumió `$0`;
        // el siguiente temporal sintetizado es `$1`
        assert_eq!(module.temp(), IrVar::Temp(1));
    }

    #[test]
    fn copies_between_variables_are_movs() {
        let module = build("int a; int b; a = 1; b = a; return b;");
        assert_eq!(lines(&module), vec!["a = 1", "b = a", "return b"]);
    }

    #[test]
    fn operand_order_follows_the_source() {
        let module = build("int a; int b; a = 4; b = a - 3; return b;");
        assert_eq!(lines(&module), vec!["a = 4", "b = a - 3", "return b"]);

        let module = build("int a; int b; a = 4; b = 3 - a; return b;");
        assert_eq!(lines(&module), vec!["a = 4", "b = 3 - a", "return b"]);
    }

    #[test]
    fn precedence_shapes_the_temporaries() {
        let module = build("int a; a = 1 + 2 * 3; return a;");
        assert_eq!(
            lines(&module),
            vec!["$0 = 2 * 3", "a = 1 + $0", "return a"]
        );
    }

    #[test]
    fn returns_may_carry_any_value() {
        let module = build("return 5;");
        assert_eq!(lines(&module), vec!["return 5"]);

        let module = build("int a; a = 1; return a + 1;");
        assert_eq!(
            lines(&module),
            vec!["a = 1", "$0 = a + 1", "return $0"]
        );
    }
}

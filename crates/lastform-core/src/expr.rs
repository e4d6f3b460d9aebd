//! A small arithmetic formula compiler.
//!
//! This is the floor, not the ceiling: numbers, variable names, `+ - * /`,
//! unary minus and parentheses. Anything richer is the embedder's job via
//! [`FormulaCompiler`].

use crate::formula::{CompileError, CompiledFormula, EvalError, FormulaCompiler};

/// Compiles formulas in the built-in arithmetic language.
#[derive(Debug, Default)]
pub struct ExprCompiler;

impl FormulaCompiler for ExprCompiler {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledFormula>, CompileError> {
        let compiled = ExprFormula::parse(source)?;
        Ok(Box::new(compiled))
    }
}

/// A parsed arithmetic expression with its read list.
#[derive(Debug, Clone)]
pub struct ExprFormula {
    reads: Vec<String>,
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    Num(f64),
    /// Index into the read list.
    Var(usize),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
}

impl ExprFormula {
    /// Parses `source` into an executable expression.
    pub fn parse(source: &str) -> Result<Self, CompileError> {
        let mut parser = Parser {
            src: source,
            bytes: source.as_bytes(),
            pos: 0,
            reads: Vec::new(),
        };
        parser.skip_ws();
        if parser.at_end() {
            return Err(CompileError::new("empty formula"));
        }
        let root = parser.expr()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(CompileError::new(format!(
                "unexpected trailing input at offset {}: '{}'",
                parser.pos,
                &parser.src[parser.pos..]
            )));
        }
        Ok(Self {
            reads: parser.reads,
            root,
        })
    }
}

impl CompiledFormula for ExprFormula {
    fn reads(&self) -> &[String] {
        &self.reads
    }

    fn eval(&self, inputs: &[f64]) -> Result<f64, EvalError> {
        if inputs.len() != self.reads.len() {
            return Err(EvalError::new(format!(
                "expected {} inputs, got {}",
                self.reads.len(),
                inputs.len()
            )));
        }
        Ok(eval_node(&self.root, inputs))
    }
}

fn eval_node(node: &Node, inputs: &[f64]) -> f64 {
    match node {
        Node::Num(n) => *n,
        Node::Var(i) => inputs[*i],
        Node::Neg(a) => -eval_node(a, inputs),
        Node::Add(a, b) => eval_node(a, inputs) + eval_node(b, inputs),
        Node::Sub(a, b) => eval_node(a, inputs) - eval_node(b, inputs),
        Node::Mul(a, b) => eval_node(a, inputs) * eval_node(b, inputs),
        Node::Div(a, b) => eval_node(a, inputs) / eval_node(b, inputs),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    reads: Vec<String>,
}

fn is_var_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_var_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Node, CompileError> {
        let mut node = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    node = Node::Add(Box::new(node), Box::new(self.term()?));
                }
                Some(b'-') => {
                    self.pos += 1;
                    node = Node::Sub(Box::new(node), Box::new(self.term()?));
                }
                _ => return Ok(node),
            }
        }
    }

    /// term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Node, CompileError> {
        let mut node = self.factor()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    node = Node::Mul(Box::new(node), Box::new(self.factor()?));
                }
                Some(b'/') => {
                    self.pos += 1;
                    node = Node::Div(Box::new(node), Box::new(self.factor()?));
                }
                _ => return Ok(node),
            }
        }
    }

    /// factor := number | name | '(' expr ')' | '-' factor
    fn factor(&mut self) -> Result<Node, CompileError> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.factor()?)))
            }
            Some(b'(') => {
                self.pos += 1;
                let node = self.expr()?;
                self.skip_ws();
                if self.peek() != Some(b')') {
                    return Err(CompileError::new(format!(
                        "missing ')' at offset {}",
                        self.pos
                    )));
                }
                self.pos += 1;
                Ok(node)
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            Some(b) if is_var_start(b) => Ok(self.variable()),
            Some(b) => Err(CompileError::new(format!(
                "unexpected character '{}' at offset {}",
                b as char, self.pos
            ))),
            None => Err(CompileError::new("unexpected end of formula")),
        }
    }

    fn number(&mut self) -> Result<Node, CompileError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || b == b'.')
        {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
            .map(Node::Num)
            .map_err(|_| CompileError::new(format!("invalid number '{text}' at offset {start}")))
    }

    fn variable(&mut self) -> Node {
        let start = self.pos;
        self.pos += 1;
        while self.peek().is_some_and(is_var_cont) {
            self.pos += 1;
        }
        let name = &self.src[start..self.pos];
        // Reuse the slot if the same name was already referenced.
        let index = match self.reads.iter().position(|r| r == name) {
            Some(i) => i,
            None => {
                self.reads.push(name.to_string());
                self.reads.len() - 1
            }
        };
        Node::Var(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(src: &str) -> ExprFormula {
        ExprFormula::parse(src).unwrap()
    }

    // -- parsing -----------------------------------------------------------

    #[test]
    fn constant() {
        let f = compile("42");
        assert!(f.reads().is_empty());
        assert_eq!(f.eval(&[]).unwrap(), 42.0);
    }

    #[test]
    fn precedence() {
        let f = compile("2 + 3 * 4");
        assert_eq!(f.eval(&[]).unwrap(), 14.0);
    }

    #[test]
    fn parentheses() {
        let f = compile("(2 + 3) * 4");
        assert_eq!(f.eval(&[]).unwrap(), 20.0);
    }

    #[test]
    fn unary_minus() {
        let f = compile("-3 + 5");
        assert_eq!(f.eval(&[]).unwrap(), 2.0);
    }

    #[test]
    fn decimal_numbers() {
        let f = compile("0.5 * 3");
        assert_eq!(f.eval(&[]).unwrap(), 1.5);
    }

    // -- variables ---------------------------------------------------------

    #[test]
    fn variables_in_reference_order() {
        let f = compile("toe_spring + heel_height * 2");
        assert_eq!(f.reads(), &["toe_spring", "heel_height"]);
        assert_eq!(f.eval(&[5.0, 40.0]).unwrap(), 85.0);
    }

    #[test]
    fn repeated_variable_shares_slot() {
        let f = compile("w * w");
        assert_eq!(f.reads(), &["w"]);
        assert_eq!(f.eval(&[3.0]).unwrap(), 9.0);
    }

    // -- errors ------------------------------------------------------------

    #[test]
    fn empty_formula_rejected() {
        assert!(ExprFormula::parse("   ").is_err());
    }

    #[test]
    fn trailing_garbage_rejected() {
        let err = ExprFormula::parse("1 + 2 )").unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn unbalanced_paren_rejected() {
        assert!(ExprFormula::parse("(1 + 2").is_err());
    }

    #[test]
    fn wrong_input_count_rejected() {
        let f = compile("a + b");
        assert!(f.eval(&[1.0]).is_err());
    }

    // -- compiler seam -----------------------------------------------------

    #[test]
    fn compiler_trait_object() {
        let compiler = ExprCompiler;
        let f = FormulaCompiler::compile(&compiler, "a / 2").unwrap();
        assert_eq!(f.reads(), &["a"]);
        assert_eq!(f.eval(&[10.0]).unwrap(), 5.0);
    }
}

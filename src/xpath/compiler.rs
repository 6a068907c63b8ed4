//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat op list for the stack
//! evaluator. Namespace prefixes in name tests are resolved here, against
//! the `NamespaceContext` the expression is compiled with.

use super::functions;
use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::dom::NamespaceContext;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the union of one
    /// location step applied to each node; predicates filter per context node
    Step {
        axis: Axis,
        test: CompiledNodeTest,
        predicates: Vec<CompiledExpr>,
    },
    /// Filter the whole node-set on top of the stack
    Predicate(Box<CompiledExpr>),
    Union,
    Number(f64),
    String(String),
    /// Function name and argument count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
    Variable(String),
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any,
    /// Unprefixed: matches on local name in any namespace
    Name(String),
    /// Prefixed: local name and resolved namespace URI
    QName { uri: String, local: String },
    /// prefix:* with the prefix resolved
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

struct Compiler<'n> {
    namespaces: &'n NamespaceContext,
}

impl Compiler<'_> {
    fn compile(&self, expr: &Expr) -> Result<CompiledExpr, String> {
        let mut ops = Vec::new();
        self.compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(&self, expr: &Expr, ops: &mut Vec<Op>) -> Result<(), String> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                self.compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                self.compile_expr(base, ops)?;
                ops.push(self.compile_step(step)?);
            }
            Expr::Filter(base, pred) => {
                self.compile_expr(base, ops)?;
                ops.push(Op::Predicate(Box::new(self.compile(pred)?)));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(self.compile_step(step)?);
            }
            Expr::Function(name, args) => {
                if !functions::is_known(name) {
                    return Err(format!("Unknown function: {}()", name));
                }
                for arg in args {
                    self.compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
        Ok(())
    }

    fn resolve(&self, prefix: &str) -> Result<String, String> {
        self.namespaces
            .uri_for(prefix)
            .map(str::to_string)
            .ok_or_else(|| format!("Unbound namespace prefix: {}", prefix))
    }

    fn compile_step(&self, step: &Step) -> Result<Op, String> {
        let test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(prefix, local) => CompiledNodeTest::QName {
                uri: self.resolve(prefix)?,
                local: local.clone(),
            },
            NodeTest::NamespaceWildcard(prefix) => {
                CompiledNodeTest::NamespaceWildcard(self.resolve(prefix)?)
            }
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(target) => {
                CompiledNodeTest::ProcessingInstruction(target.clone())
            }
        };
        let predicates = step
            .predicates
            .iter()
            .map(|p| self.compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Op::Step {
            axis: step.axis,
            test,
            predicates,
        })
    }
}

/// Compile with the default namespace bindings (`dtb`, `xhtml`, ...)
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    compile_with(xpath, &NamespaceContext::default())
}

/// Compile an XPath expression string against the given prefix bindings
pub fn compile_with(xpath: &str, namespaces: &NamespaceContext) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    Compiler { namespaces }.compile(&expr)
}

//! XPath 1.0 Engine
//!
//! - All 13 axes, with namespace-aware name tests
//! - Core function library
//! - Compiled expression caching through `XPathFactory`

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod factory;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compiler::{compile, compile_with, CompiledExpr};
pub use eval::{evaluate, evaluate_compiled, evaluate_from_node, EvalContext, Variables};
pub use factory::XPathFactory;
pub use value::XPathValue;

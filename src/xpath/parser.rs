//! XPath expression parser
//!
//! Binary operators are handled by precedence climbing over a single
//! table; paths, steps and primaries by plain recursive descent.

use super::lexer::{Lexer, Token};

#[derive(Debug, Clone)]
pub enum Expr {
    /// `/` on its own, or the start of an absolute path
    Root,
    Union(Box<Expr>, Box<Expr>),
    /// `base/step`
    Path(Box<Expr>, Box<Step>),
    /// `primary[predicate]`
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    Variable(String),
    /// A step evaluated against the context node
    Step(Box<Step>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Operator and binding strength for a token, tighter binds higher
    fn from_token(token: &Token) -> Option<(BinaryOp, u8)> {
        let entry = match token {
            Token::Or => (BinaryOp::Or, 1),
            Token::And => (BinaryOp::And, 2),
            Token::Eq => (BinaryOp::Eq, 3),
            Token::NotEq => (BinaryOp::NotEq, 3),
            Token::Lt => (BinaryOp::Lt, 4),
            Token::LtEq => (BinaryOp::LtEq, 4),
            Token::Gt => (BinaryOp::Gt, 4),
            Token::GtEq => (BinaryOp::GtEq, 4),
            Token::Plus => (BinaryOp::Add, 5),
            Token::Minus => (BinaryOp::Sub, 5),
            Token::Multiply => (BinaryOp::Mul, 6),
            Token::Div => (BinaryOp::Div, 6),
            Token::Mod => (BinaryOp::Mod, 6),
            _ => return None,
        };
        Some(entry)
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// `.`, `..` and the hidden step behind `//`
    fn any_node(axis: Axis) -> Self {
        Step {
            axis,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

const AXIS_NAMES: [(&str, Axis); 13] = [
    ("ancestor", Axis::Ancestor),
    ("ancestor-or-self", Axis::AncestorOrSelf),
    ("attribute", Axis::Attribute),
    ("child", Axis::Child),
    ("descendant", Axis::Descendant),
    ("descendant-or-self", Axis::DescendantOrSelf),
    ("following", Axis::Following),
    ("following-sibling", Axis::FollowingSibling),
    ("namespace", Axis::Namespace),
    ("parent", Axis::Parent),
    ("preceding", Axis::Preceding),
    ("preceding-sibling", Axis::PrecedingSibling),
    ("self", Axis::Self_),
];

impl Axis {
    pub fn from_name(name: &str) -> Option<Self> {
        AXIS_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|&(_, axis)| axis)
    }
}

#[derive(Debug, Clone)]
pub enum NodeTest {
    /// `*`
    Any,
    Name(String),
    /// `prefix:local`
    QName(String, String),
    /// `prefix:*`
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    /// `processing-instruction('target'?)`
    ProcessingInstruction(Option<String>),
}

pub struct Parser<'a> {
    tokens: Lexer<'a>,
    token: Token,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut tokens = Lexer::new(input);
        let token = tokens.next_token();
        Parser {
            tokens,
            token,
            lookahead: None,
        }
    }

    /// Parse the whole input; anything left over is an error
    pub fn parse(&mut self) -> Result<Expr, String> {
        let expr = self.expression()?;
        if self.token == Token::Eof {
            Ok(expr)
        } else {
            Err(unexpected(&self.token))
        }
    }

    fn bump(&mut self) -> Token {
        let next = self
            .lookahead
            .take()
            .unwrap_or_else(|| self.tokens.next_token());
        std::mem::replace(&mut self.token, next)
    }

    fn next_is(&mut self, token: &Token) -> bool {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.tokens.next_token());
        }
        self.lookahead.as_ref() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.token == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn require(&mut self, token: Token, label: &str) -> Result<(), String> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(format!("Expected {}, found {}", label, describe(&self.token)))
        }
    }

    fn expression(&mut self) -> Result<Expr, String> {
        self.binary(1)
    }

    /// Left-associative operators binding at least as tight as `floor`
    fn binary(&mut self, floor: u8) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some((op, strength)) = BinaryOp::from_token(&self.token) {
            if strength < floor {
                break;
            }
            self.bump();
            let rhs = self.binary(strength + 1)?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Negate(Box::new(self.unary()?)))
        } else {
            let mut expr = self.path()?;
            while self.eat(&Token::Pipe) {
                expr = Expr::Union(Box::new(expr), Box::new(self.path()?));
            }
            Ok(expr)
        }
    }

    fn path(&mut self) -> Result<Expr, String> {
        let head = if self.eat(&Token::Slash) {
            if !self.at_step() {
                return Ok(Expr::Root);
            }
            Expr::Path(Box::new(Expr::Root), Box::new(self.step()?))
        } else if self.eat(&Token::DoubleSlash) {
            self.descend(Expr::Root)?
        } else if self.at_step() {
            Expr::Step(Box::new(self.step()?))
        } else {
            self.filtered()?
        };
        self.relative_steps(head)
    }

    fn relative_steps(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            if self.eat(&Token::Slash) {
                expr = Expr::Path(Box::new(expr), Box::new(self.step()?));
            } else if self.eat(&Token::DoubleSlash) {
                expr = self.descend(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// `base//step` as `base/descendant-or-self::node()/step`
    fn descend(&mut self, base: Expr) -> Result<Expr, String> {
        let hidden = Expr::Path(Box::new(base), Box::new(Step::any_node(Axis::DescendantOrSelf)));
        Ok(Expr::Path(Box::new(hidden), Box::new(self.step()?)))
    }

    fn at_step(&mut self) -> bool {
        match self.token {
            // function call when followed by `(`
            Token::Name(_) => !self.next_is(&Token::LeftParen),
            Token::Star
            | Token::At
            | Token::Dot
            | Token::DoubleDot
            | Token::Axis(_)
            | Token::NameTest(_)
            | Token::NodeType(_) => true,
            _ => false,
        }
    }

    fn filtered(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        while self.token == Token::LeftBracket {
            let predicate = self.predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(predicate));
        }
        Ok(expr)
    }

    fn predicate(&mut self) -> Result<Expr, String> {
        self.require(Token::LeftBracket, "[")?;
        let expr = self.expression()?;
        self.require(Token::RightBracket, "]")?;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.bump() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::String(s) => Ok(Expr::String(s)),
            Token::Dollar => match self.bump() {
                Token::Name(name) | Token::NameTest(name) => Ok(Expr::Variable(name)),
                other => Err(format!("Expected variable name, found {}", describe(&other))),
            },
            Token::LeftParen => {
                let inner = self.expression()?;
                self.require(Token::RightParen, ")")?;
                Ok(inner)
            }
            Token::Name(function) => {
                self.require(Token::LeftParen, "(")?;
                Ok(Expr::Function(function, self.arguments()?))
            }
            other => Err(unexpected(&other)),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.require(Token::RightParen, ")")?;
        }
        Ok(args)
    }

    fn step(&mut self) -> Result<Step, String> {
        let axis = match &self.token {
            Token::Dot => {
                self.bump();
                return Ok(Step::any_node(Axis::Self_));
            }
            Token::DoubleDot => {
                self.bump();
                return Ok(Step::any_node(Axis::Parent));
            }
            Token::At => {
                self.bump();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(name).ok_or_else(|| format!("Unknown axis: {}", name))?;
                self.bump();
                self.require(Token::DoubleColon, "::")?;
                axis
            }
            _ => Axis::Child,
        };
        let node_test = self.node_test()?;
        let mut predicates = Vec::new();
        while self.token == Token::LeftBracket {
            predicates.push(self.predicate()?);
        }
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, String> {
        match self.bump() {
            Token::Star => Ok(NodeTest::Any),
            Token::Name(name) => Ok(NodeTest::Name(name)),
            Token::NameTest(qname) => Ok(match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname),
            }),
            Token::NodeType(kind) => {
                self.require(Token::LeftParen, "(")?;
                let mut target = None;
                if kind == "processing-instruction" {
                    if let Token::String(literal) = &self.token {
                        target = Some(literal.clone());
                        self.bump();
                    }
                }
                self.require(Token::RightParen, ")")?;
                Ok(match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(target),
                })
            }
            other => Err(format!("Expected node test, found {}", describe(&other))),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Eof => "end of expression".to_string(),
        Token::Error(message) => message.clone(),
        other => format!("{:?}", other),
    }
}

fn unexpected(token: &Token) -> String {
    if let Token::Error(message) = token {
        return message.clone();
    }
    format!("Unexpected {}", describe(token))
}

pub fn parse(input: &str) -> Result<Expr, String> {
    if input.trim().is_empty() {
        return Err("Empty expression".to_string());
    }
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let expr = parse("/root/child").unwrap();
        assert!(matches!(expr, Expr::Path(..)));
    }

    #[test]
    fn test_step_predicate_attached() {
        let expr = parse("item[@id='test']").unwrap();
        match expr {
            Expr::Step(step) => assert_eq!(step.predicates.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_relative_descendant() {
        let expr = parse(".//p").unwrap();
        assert!(matches!(expr, Expr::Path(..)));
    }

    #[test]
    fn test_function() {
        let expr = parse("count(//item)").unwrap();
        assert!(matches!(expr, Expr::Function(name, _) if name == "count"));
    }

    #[test]
    fn test_parent_inside_path() {
        assert!(parse("p/../q").is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("//p[").is_err());
        assert!(parse("//p)").is_err());
        assert!(parse("p[@id='x]").is_err());
        assert!(parse("bogus::p").is_err());
    }
}

//! XPath Lexer
//!
//! Tokenizes XPath expressions. `*` and the operator names (`and`, `or`,
//! `mod`, `div`) are only treated as operators when they follow a complete
//! operand, so `//div` is a name test and `a * b` a multiplication.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * (name test)
    Multiply,    // * (operator)
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,
    Or,
    Mod,
    Div,

    // Brackets
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:* or prefix:local
    NodeType(String), // node, text, comment, processing-instruction (before `(`)
    Axis(String),     // axis name (before `::`)

    DoubleColon,
    Comma,
    Dollar,

    /// Lexical error (unterminated literal, stray character)
    Error(String),

    Eof,
}

impl Token {
    /// True if an operator may follow this token
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::String(_)
                | Token::Name(_)
                | Token::NameTest(_)
                | Token::Star
                | Token::Dot
                | Token::DoubleDot
                | Token::RightParen
                | Token::RightBracket
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Whether the previous token completed an operand
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            after_operand: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        let token = self.scan();
        self.after_operand = token.ends_operand();
        token
    }

    fn take(&mut self, width: usize, token: Token) -> Token {
        self.advance(width);
        token
    }

    /// Two-character operators, checked before the one-character table
    fn pair(&self) -> Option<Token> {
        let rest = self.remaining();
        let token = if rest.starts_with("//") {
            Token::DoubleSlash
        } else if rest.starts_with("..") {
            Token::DoubleDot
        } else if rest.starts_with("!=") {
            Token::NotEq
        } else if rest.starts_with("<=") {
            Token::LtEq
        } else if rest.starts_with(">=") {
            Token::GtEq
        } else if rest.starts_with("::") {
            Token::DoubleColon
        } else {
            return None;
        };
        Some(token)
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Token::Eof;
        };
        if let Some(token) = self.pair() {
            return self.take(2, token);
        }
        let token = match c {
            '/' => Token::Slash,
            '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                return self.read_number();
            }
            '.' => Token::Dot,
            '*' if self.after_operand => Token::Multiply,
            '*' => Token::Star,
            '@' => Token::At,
            '|' => Token::Pipe,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => Token::Eq,
            '<' => Token::Lt,
            '>' => Token::Gt,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ',' => Token::Comma,
            '$' => Token::Dollar,
            '"' | '\'' => return self.read_string(c),
            '0'..='9' => return self.read_number(),
            _ if is_name_start_char(c) => return self.read_name_or_keyword(),
            _ => Token::Error(format!("unexpected character '{}'", c)),
        };
        self.take(c.len_utf8(), token)
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }
        match self.input[start..self.pos].parse() {
            Ok(value) => Token::Number(value),
            Err(_) => Token::Error(format!("bad number '{}'", &self.input[start..self.pos])),
        }
    }

    fn read_string(&mut self, quote: char) -> Token {
        self.advance(1);
        let start = self.pos;
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.advance(len + 1);
                Token::String(value)
            }
            None => {
                self.pos = self.input.len();
                Token::Error("unterminated string literal".to_string())
            }
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.after_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            self.advance(1);
            if self.peek() == Some('*') {
                self.advance(1);
                return Token::NameTest(format!("{}:*", name));
            }
            let local = self.read_ncname();
            if local.is_empty() {
                return Token::Error(format!("missing local name after '{}:'", name));
            }
            return Token::NameTest(format!("{}:{}", name, local));
        }

        let save = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            return Token::Axis(name.to_string());
        }
        if self.peek() == Some('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::Name(name.to_string()),
            };
        }
        self.pos = save;
        Token::Name(name.to_string())
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        tokens
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let mut lexer = Lexer::new("/root/child");
        assert_eq!(lexer.next_token(), Token::Slash);
        assert_eq!(lexer.next_token(), Token::Name("root".to_string()));
        assert_eq!(lexer.next_token(), Token::Slash);
        assert_eq!(lexer.next_token(), Token::Name("child".to_string()));
        assert_eq!(lexer.next_token(), Token::Eof);
    }

    #[test]
    fn test_operator_names_are_contextual() {
        let tokens = Lexer::new("//div[1 div 2]").tokenize();
        assert_eq!(tokens[1], Token::Name("div".to_string()));
        assert_eq!(tokens[4], Token::Div);
    }

    #[test]
    fn test_star_is_contextual() {
        let tokens = Lexer::new("count(*) * 2").tokenize();
        assert_eq!(tokens[2], Token::Star);
        assert_eq!(tokens[4], Token::Multiply);
    }

    #[test]
    fn test_prefixed_name_and_axis() {
        let tokens = Lexer::new("child::dtb:level1/dtb:*").tokenize();
        assert_eq!(tokens[0], Token::Axis("child".to_string()));
        assert_eq!(tokens[1], Token::DoubleColon);
        assert_eq!(tokens[2], Token::NameTest("dtb:level1".to_string()));
        assert_eq!(tokens[4], Token::NameTest("dtb:*".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("p[@id='x]").tokenize();
        assert!(matches!(tokens.last(), Some(Token::Error(_))));
    }

    #[test]
    fn test_number() {
        let tokens = Lexer::new("position() = .5").tokenize();
        assert!(matches!(tokens.last(), Some(Token::Number(n)) if *n == 0.5));
    }
}

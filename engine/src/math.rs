//! Restricted arithmetic for the `math` block.
//!
//! Numbers, `+ - * / % ^`, parentheses, unary minus, the constants `pi` and
//! `e`, and the functions `abs round floor ceil sqrt min max`. Nothing else:
//! no names, no assignment, no evaluation of arbitrary code.

use thiserror::Error;

/// Deepest parenthesis/unary nesting accepted.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function or constant '{0}'")]
    UnknownName(String),
    #[error("{name} takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("expression nested too deeply")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", format_number(*n)),
            Token::Ident(name) => format!("'{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// Evaluate `source` to a finite number.
pub fn evaluate(source: &str) -> Result<f64, MathError> {
    let tokens = tokenize(source)?;
    let mut parser = MathParser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_expr(0)?;
    if let Some(token) = parser.peek() {
        return Err(MathError::UnexpectedToken(token.describe()));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MathError::NotFinite)
    }
}

/// Whole numbers print without a fraction; everything else uses the
/// shortest round-tripping form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, MathError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }

            '0'..='9' | '.' => {
                let start = i;
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent: 1e3, 2.5E-4
                if i < len && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < len && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < len && chars[j].is_ascii_digit() {
                        i = j;
                        while i < len && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| MathError::UnexpectedToken(format!("number '{}'", literal)))?;
                tokens.push(Token::Number(n));
            }

            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident.eq_ignore_ascii_case("x") {
                    tokens.push(Token::Star);
                } else {
                    tokens.push(Token::Ident(ident.to_lowercase()));
                }
            }

            '+' => {
                i += 1;
                tokens.push(Token::Plus);
            }
            '-' => {
                i += 1;
                tokens.push(Token::Minus);
            }
            '*' | '×' => {
                i += 1;
                tokens.push(Token::Star);
            }
            '/' | '÷' => {
                i += 1;
                tokens.push(Token::Slash);
            }
            '%' => {
                i += 1;
                tokens.push(Token::Percent);
            }
            '^' => {
                i += 1;
                tokens.push(Token::Caret);
            }
            '(' => {
                i += 1;
                tokens.push(Token::LParen);
            }
            ')' => {
                i += 1;
                tokens.push(Token::RParen);
            }
            ',' => {
                i += 1;
                tokens.push(Token::Comma);
            }

            other => return Err(MathError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct MathParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_ADDITIVE: u8 = 12;       // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16;          // -
const BP_POWER: u8 = 18;          // ^

impl MathParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), MathError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(MathError::UnexpectedToken(token.describe())),
            None => Err(MathError::UnexpectedEnd),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<f64, MathError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(MathError::TooDeep);
        }

        let mut left = self.parse_prefix()?;

        while let Some(token) = self.peek() {
            let Some((l_bp, r_bp)) = infix_bp(token) else { break };
            if l_bp < min_bp {
                break;
            }

            let Some(operator) = self.advance() else { break };
            let right = self.parse_expr(r_bp)?;

            left = match operator {
                Token::Plus => left + right,
                Token::Minus => left - right,
                Token::Star => left * right,
                Token::Slash if right == 0.0 => return Err(MathError::DivisionByZero),
                Token::Slash => left / right,
                Token::Percent if right == 0.0 => return Err(MathError::DivisionByZero),
                Token::Percent => left % right,
                Token::Caret => left.powf(right),
                other => return Err(MathError::UnexpectedToken(other.describe())),
            };
        }

        self.depth -= 1;
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<f64, MathError> {
        let token = self.advance().ok_or(MathError::UnexpectedEnd)?;

        match token {
            Token::Number(n) => Ok(n),
            Token::Minus => Ok(-self.parse_expr(BP_UNARY)?),
            Token::Plus => self.parse_expr(BP_UNARY),
            Token::LParen => {
                let value = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Token::Ident(name) => self.parse_name(&name),
            other => Err(MathError::UnexpectedToken(other.describe())),
        }
    }

    /// A constant, or a function call with parenthesised arguments.
    fn parse_name(&mut self, name: &str) -> Result<f64, MathError> {
        match name {
            "pi" => return Ok(std::f64::consts::PI),
            "e" => return Ok(std::f64::consts::E),
            _ => {}
        }

        let (name, arity): (&'static str, &'static str) = match name {
            "abs" => ("abs", "1"),
            "round" => ("round", "1"),
            "floor" => ("floor", "1"),
            "ceil" => ("ceil", "1"),
            "sqrt" => ("sqrt", "1"),
            "min" => ("min", "at least 1"),
            "max" => ("max", "at least 1"),
            other => return Err(MathError::UnknownName(other.to_string())),
        };

        self.expect(Token::LParen)?;
        let mut args = vec![self.parse_expr(0)?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            args.push(self.parse_expr(0)?);
        }
        self.expect(Token::RParen)?;

        let single = || match args.as_slice() {
            [value] => Ok(*value),
            _ => Err(MathError::Arity {
                name,
                expected: arity,
                got: args.len(),
            }),
        };
        match name {
            "abs" => single().map(f64::abs),
            "round" => single().map(f64::round),
            "floor" => single().map(f64::floor),
            "ceil" => single().map(f64::ceil),
            "sqrt" => single().map(f64::sqrt),
            "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
            _ => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        Token::Caret => Some((BP_POWER, BP_POWER)),
        _ => None,
    }
}

//! Formula parsing from the ASCII infix grammar.
//!
//! Precedence, loosest first: `->` (right assoc), `|`, `&`, `U` (right
//! assoc), then the prefix operators `!`, `X`, `G`, `F`. The words `X`, `U`,
//! `G`, `F`, `true` and `false` are reserved; everything else matching
//! `[A-Za-z_][A-Za-z0-9_]*` is a predicate name.

use std::collections::BTreeSet;

use super::{ContractError, Formula};

/// Deepest operator nesting accepted before parsing is refused.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Not,
    And,
    Or,
    Implies,
    Next,
    Until,
    Globally,
    Eventually,
    LParen,
    RParen,
    True,
    False,
    Ident(String),
    End,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::Not => "'!'".to_string(),
            Self::And => "'&'".to_string(),
            Self::Or => "'|'".to_string(),
            Self::Implies => "'->'".to_string(),
            Self::Next => "'X'".to_string(),
            Self::Until => "'U'".to_string(),
            Self::Globally => "'G'".to_string(),
            Self::Eventually => "'F'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::True => "'true'".to_string(),
            Self::False => "'false'".to_string(),
            Self::Ident(name) => format!("predicate '{}'", name),
            Self::End => "end of formula".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn syntax(position: usize, message: impl Into<String>) -> ContractError {
    ContractError::Syntax {
        position,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ContractError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let kind = match c {
            b'!' => TokenKind::Not,
            b'&' => TokenKind::And,
            b'|' => TokenKind::Or,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'-' => {
                if bytes.get(pos + 1) != Some(&b'>') {
                    return Err(syntax(start, "expected '->'"));
                }
                pos += 1;
                TokenKind::Implies
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos + 1 < bytes.len()
                    && (bytes[pos + 1].is_ascii_alphanumeric() || bytes[pos + 1] == b'_')
                {
                    pos += 1;
                }
                match &input[start..=pos] {
                    "X" => TokenKind::Next,
                    "U" => TokenKind::Until,
                    "G" => TokenKind::Globally,
                    "F" => TokenKind::Eventually,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    word => TokenKind::Ident(word.to_string()),
                }
            }
            _ => {
                let symbol = input[start..].chars().next().unwrap_or('?');
                return Err(syntax(start, format!("unknown operator symbol '{}'", symbol)));
            }
        };

        tokens.push(Token {
            kind,
            position: start,
        });
        pos += 1;
    }

    tokens.push(Token {
        kind: TokenKind::End,
        position: input.len(),
    });
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    alphabet: Option<&'a BTreeSet<String>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.cursor].clone();
        if token.kind != TokenKind::End {
            self.cursor += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ContractError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(syntax(
                self.peek().position,
                format!("formula nested deeper than {} levels", MAX_NESTING),
            ));
        }
        Ok(())
    }

    fn parse_formula(&mut self) -> Result<Formula, ContractError> {
        self.descend()?;
        let result = self.parse_implication();
        self.depth -= 1;
        result
    }

    fn parse_implication(&mut self) -> Result<Formula, ContractError> {
        let lhs = self.parse_disjunction()?;
        if self.peek().kind == TokenKind::Implies {
            self.advance();
            let rhs = self.parse_formula()?;
            return Ok(Formula::implies(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_disjunction(&mut self) -> Result<Formula, ContractError> {
        let mut lhs = self.parse_conjunction()?;
        while self.peek().kind == TokenKind::Or {
            self.advance();
            let rhs = self.parse_conjunction()?;
            lhs = Formula::or(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_conjunction(&mut self) -> Result<Formula, ContractError> {
        let mut lhs = self.parse_until()?;
        while self.peek().kind == TokenKind::And {
            self.advance();
            let rhs = self.parse_until()?;
            lhs = Formula::and(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_until(&mut self) -> Result<Formula, ContractError> {
        let lhs = self.parse_unary()?;
        if self.peek().kind == TokenKind::Until {
            self.advance();
            self.descend()?;
            let rhs = self.parse_until();
            self.depth -= 1;
            return Ok(Formula::until(lhs, rhs?));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Formula, ContractError> {
        let kind = self.peek().kind.clone();
        let wrap: fn(Formula) -> Formula = match kind {
            TokenKind::Not => Formula::not,
            TokenKind::Next => Formula::next,
            TokenKind::Globally => Formula::globally,
            TokenKind::Eventually => Formula::eventually,
            _ => return self.parse_primary(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(wrap(operand?))
    }

    fn parse_primary(&mut self) -> Result<Formula, ContractError> {
        let token = self.advance();
        match token.kind {
            TokenKind::True => Ok(Formula::True),
            TokenKind::False => Ok(Formula::False),
            TokenKind::Ident(name) => {
                if let Some(alphabet) = self.alphabet {
                    if !alphabet.contains(&name) {
                        return Err(ContractError::UnknownPredicate {
                            predicate: name,
                            position: token.position,
                        });
                    }
                }
                Ok(Formula::Atom(name))
            }
            TokenKind::LParen => {
                let inner = self.parse_formula()?;
                let close = self.advance();
                if close.kind != TokenKind::RParen {
                    return Err(syntax(
                        close.position,
                        format!(
                            "expected ')' to close '(' at position {}, found {}",
                            token.position,
                            close.kind.describe()
                        ),
                    ));
                }
                Ok(inner)
            }
            TokenKind::End => Err(syntax(token.position, "unexpected end of formula, expected operand")),
            other => Err(syntax(
                token.position,
                format!("expected operand, found {}", other.describe()),
            )),
        }
    }
}

/// Parse formula text. Any identifier is accepted as a predicate.
pub fn parse_formula(input: &str) -> Result<Formula, ContractError> {
    parse(input, None)
}

/// Parse formula text, requiring every predicate to come from `alphabet`.
pub fn parse_formula_with_alphabet(
    input: &str,
    alphabet: &BTreeSet<String>,
) -> Result<Formula, ContractError> {
    parse(input, Some(alphabet))
}

fn parse(input: &str, alphabet: Option<&BTreeSet<String>>) -> Result<Formula, ContractError> {
    let tokens = tokenize(input)?;
    if tokens.len() == 1 {
        return Err(syntax(0, "empty formula"));
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
        alphabet,
    };
    let formula = parser.parse_formula()?;

    let trailing = parser.peek();
    if trailing.kind != TokenKind::End {
        return Err(syntax(
            trailing.position,
            format!("unexpected {} after complete formula", trailing.kind.describe()),
        ));
    }
    Ok(formula)
}

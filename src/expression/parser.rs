//! Expression Parsing
//!
//! Turns `"king - man + woman"` into `[+king, -man, +woman]`.
//!
//! Tokens are separated by whitespace. `+` and `-` are operators only when
//! they stand alone, so `well-known` and `-king` are single words.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::vector::{fold_case, EmbeddingStore};

/// Direction in which a term contributes to the sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    /// Multiplier applied to the term's vector
    pub fn factor(self) -> f32 {
        match self {
            Sign::Plus => 1.0,
            Sign::Minus => -1.0,
        }
    }

    fn as_char(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Sign::Plus),
            "-" => Some(Sign::Minus),
            _ => None,
        }
    }
}

/// One word of the expression with its sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTerm {
    pub word: String,
    pub sign: Sign,
}

impl SignedTerm {
    pub fn plus(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            sign: Sign::Plus,
        }
    }

    pub fn minus(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            sign: Sign::Minus,
        }
    }
}

impl fmt::Display for SignedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign.as_char(), self.word)
    }
}

/// What to do with two adjacent words that have no operator between them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSignPolicy {
    /// `"king queen"` parses as `"king + queen"`
    #[default]
    ImplicitPlus,
    /// `"king queen"` is a [`ParseError::MissingSign`]
    Reject,
}

impl FromStr for MissingSignPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "implicit-plus" | "plus" => Ok(MissingSignPolicy::ImplicitPlus),
            "reject" | "error" => Ok(MissingSignPolicy::Reject),
            other => Err(format!("unknown missing-sign policy '{}'", other)),
        }
    }
}

/// Expression parser
#[derive(Debug, Clone, Default)]
pub struct Parser {
    missing_sign: MissingSignPolicy,
    case_sensitive: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose case policy matches `store`
    pub fn for_store(store: &EmbeddingStore) -> Self {
        Self::new().with_case_sensitive(store.case_sensitive())
    }

    pub fn with_missing_sign(mut self, policy: MissingSignPolicy) -> Self {
        self.missing_sign = policy;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn missing_sign(&self) -> MissingSignPolicy {
        self.missing_sign
    }

    /// Parse an expression into signed terms, in order
    pub fn parse(&self, text: &str) -> Result<Vec<SignedTerm>, ParseError> {
        let mut terms = Vec::new();
        // Sign waiting for its word, with the token position it came from
        let mut pending: Option<(Sign, usize)> = None;

        for (idx, token) in text.split_whitespace().enumerate() {
            let position = idx + 1;

            if let Some(sign) = Sign::from_token(token) {
                if let Some((previous, at)) = pending {
                    return Err(ParseError::DanglingSign {
                        sign: previous.as_char(),
                        position: at,
                    });
                }
                pending = Some((sign, position));
                continue;
            }

            let sign = match pending.take() {
                Some((sign, _)) => sign,
                None if terms.is_empty() => Sign::Plus,
                None => match self.missing_sign {
                    MissingSignPolicy::ImplicitPlus => Sign::Plus,
                    MissingSignPolicy::Reject => {
                        return Err(ParseError::MissingSign {
                            word: token.to_string(),
                            position,
                        })
                    }
                },
            };

            let word = fold_case(token, self.case_sensitive).into_owned();
            terms.push(SignedTerm { word, sign });
        }

        if let Some((sign, position)) = pending {
            return Err(ParseError::DanglingSign {
                sign: sign.as_char(),
                position,
            });
        }
        if terms.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(terms)
    }
}

/// Parse with the default policy (case-insensitive, implicit plus)
pub fn parse(text: &str) -> Result<Vec<SignedTerm>, ParseError> {
    Parser::new().parse(text)
}

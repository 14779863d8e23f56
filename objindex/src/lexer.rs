// Lexer for recorded event traces.
//
// Tokenizes trace text: one callback event per line, `#` comments, object
// handles written `@N`. Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in trace text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Trace token types.
///
/// Event names are matched as fixed strings; hyphenated names win over the
/// identifier regex because logos prefers `#[token]` at equal length.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+|#[^\n]*")]
pub enum Token {
    // ── Events ──
    #[token("script-enter")]
    ScriptEnter,
    #[token("script-exit")]
    ScriptExit,
    #[token("function-enter")]
    FunctionEnter,
    #[token("function-exit")]
    FunctionExit,
    #[token("literal")]
    Literal,
    #[token("call")]
    Call,
    #[token("call-done")]
    CallDone,
    #[token("get")]
    Get,
    #[token("put")]
    Put,
    #[token("reclaim")]
    Reclaim,

    // ── Modifiers and primitive constants ──
    #[token("new")]
    New,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,

    // ── Literals ──
    /// Heap object handle (e.g. `@12`).
    #[regex(r"@[0-9]+", parse_object_ref)]
    ObjectRef(u64),

    /// Unsigned integer: program point ids, or numeric primitives.
    #[regex(r"[0-9]+", parse_int)]
    Int(u64),

    /// Negative or fractional numeric primitive.
    #[regex(r"-[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),

    /// String literal with `\"` and `\\` escapes.
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    StringLit(String),

    /// Any other word; only ever a parse error.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
    Ident,

    // ── Structure ──
    /// One or more newlines (event terminator).
    #[regex(r"\n+")]
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::ScriptEnter => write!(f, "script-enter"),
            Token::ScriptExit => write!(f, "script-exit"),
            Token::FunctionEnter => write!(f, "function-enter"),
            Token::FunctionExit => write!(f, "function-exit"),
            Token::Literal => write!(f, "literal"),
            Token::Call => write!(f, "call"),
            Token::CallDone => write!(f, "call-done"),
            Token::Get => write!(f, "get"),
            Token::Put => write!(f, "put"),
            Token::Reclaim => write!(f, "reclaim"),
            Token::New => write!(f, "new"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Undefined => write!(f, "undefined"),
            Token::ObjectRef(n) => write!(f, "@{n}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Number(v) => write!(f, "{v}"),
            Token::StringLit(s) => write!(f, "\"{s}\""),
            Token::Ident => write!(f, "<ident>"),
            Token::Newline => write!(f, "<newline>"),
        }
    }
}

// ── Callbacks ──

fn parse_object_ref(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    lex.slice()[1..].parse().ok()
}

fn parse_int(lex: &mut logos::Lexer<'_, Token>) -> Option<u64> {
    lex.slice().parse().ok()
}

fn parse_number(lex: &mut logos::Lexer<'_, Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1]; // strip quotes
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                '"' => result.push('"'),
                '\\' => result.push('\\'),
                _ => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

// ── Public API ──

/// Lex a trace into tokens.
///
/// Lexing is non-fatal: errors are collected and the lexer continues past
/// bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected input: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

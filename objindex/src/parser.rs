// Parser for recorded event traces.
//
// Parses a token stream (from the lexer) into a `Trace`: one event per
// line, blank lines and comments ignored. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns the trace plus diagnostics for every lex or
//   syntax error; a trace is only returned when no error occurred.
// Failure modes: syntax errors produce `Rich` errors, converted to
//   `Diagnostic`s.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::id::{ObjectId, ProgramPointId};
use crate::lexer::Token;
use crate::shadow::{Primitive, Value};
use crate::trace::{Event, EventKind, LineIndex, Trace};

/// Result of parsing: trace plus any diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    pub trace: Option<Trace>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse trace text. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let mut diagnostics: Vec<Diagnostic> = lex_result
        .errors
        .iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Diagnostic::new(DiagLevel::Error, span, e.message.clone()).with_code(codes::E_LEX)
        })
        .collect();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (kinds, parse_errors) = trace_parser().parse(stream).into_output_errors();

    diagnostics.extend(parse_errors.into_iter().map(|e| {
        let (code, hint) = match e.reason() {
            chumsky::error::RichReason::Custom(_) => (codes::E_PID_RANGE, None),
            _ => (
                codes::E_SYNTAX,
                Some("each line holds one event, e.g. `literal 7 @1`"),
            ),
        };
        let diag = Diagnostic::new(DiagLevel::Error, *e.span(), e.to_string()).with_code(code);
        match hint {
            Some(h) => diag.with_hint(h),
            None => diag,
        }
    }));

    let trace = match kinds {
        Some(kinds) if diagnostics.is_empty() => {
            let lines = LineIndex::new(source);
            Some(Trace {
                events: kinds
                    .into_iter()
                    .map(|(kind, span)| Event {
                        kind,
                        span,
                        line: lines.line(span.start),
                    })
                    .collect(),
            })
        }
        _ => None,
    };

    ParseResult { trace, diagnostics }
}

// ── Grammar ──

fn trace_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<(EventKind, SimpleSpan)>, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Newlines ──

    let nl = just(Token::Newline).repeated().ignored();

    // ── Program point id ──

    let pid = select! {
        Token::Int(n) => n,
    }
    .try_map(|n, span| {
        u32::try_from(n)
            .map(ProgramPointId)
            .map_err(|_| Rich::custom(span, format!("program point id {} is out of range", n)))
    });

    // ── Values ──

    let object = select! {
        Token::ObjectRef(n) => ObjectId(n),
    };

    let primitive = select! {
        Token::Int(n) => Primitive::Number(n as f64),
        Token::Number(v) => Primitive::Number(v),
        Token::StringLit(s) => Primitive::Str(s),
        Token::True => Primitive::Bool(true),
        Token::False => Primitive::Bool(false),
        Token::Null => Primitive::Null,
        Token::Undefined => Primitive::Undefined,
    };

    let value = object
        .clone()
        .map(Value::Object)
        .or(primitive.map(Value::Primitive));

    // ── Events ──

    let script_enter = just(Token::ScriptEnter)
        .ignore_then(
            select! {
                Token::StringLit(s) => s,
            }
            .or_not(),
        )
        .map(|file| EventKind::ScriptEnter { file });

    let script_exit = just(Token::ScriptExit).to(EventKind::ScriptExit);
    let function_enter = just(Token::FunctionEnter).to(EventKind::FunctionEnter);
    let function_exit = just(Token::FunctionExit).to(EventKind::FunctionExit);

    let literal = just(Token::Literal)
        .ignore_then(pid.clone())
        .then(value.clone())
        .map(|(pid, value)| EventKind::Literal { pid, value });

    let call_start = just(Token::Call)
        .ignore_then(pid.clone())
        .map(|pid| EventKind::CallStart { pid });

    let call_done = just(Token::CallDone)
        .ignore_then(pid.clone())
        .then(just(Token::New).or_not().map(|n| n.is_some()))
        .then(value.clone())
        .then(value.clone())
        .map(
            |(((pid, is_constructor), callee), result)| EventKind::CallCompleted {
                pid,
                is_constructor,
                callee,
                result,
            },
        );

    let field_read = just(Token::Get)
        .ignore_then(pid.clone())
        .then(value.clone())
        .map(|(pid, base)| EventKind::FieldRead { pid, base });

    let field_write = just(Token::Put)
        .ignore_then(pid.clone())
        .then(value.clone())
        .map(|(pid, base)| EventKind::FieldWrite { pid, base });

    let reclaim = just(Token::Reclaim)
        .ignore_then(object)
        .map(|object| EventKind::Reclaim { object });

    // ── Event dispatch ──

    let event = choice((
        script_enter,
        script_exit,
        function_enter,
        function_exit,
        literal,
        call_start,
        call_done,
        field_read,
        field_write,
        reclaim,
    ))
    .map_with(|kind, e| (kind, e.span()));

    // ── Trace ──

    nl.clone()
        .ignore_then(
            event
                .separated_by(just(Token::Newline).repeated().at_least(1))
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(nl)
}

// ── Tests ──

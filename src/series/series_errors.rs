//! Error types of the series pipeline.
//!
//! `ParseError` covers everything detected while turning a raw string into a token list
//! (structural errors). `EvalError` covers failures of a single evaluation that are not plain
//! numeric domain problems: domain problems (non-integer sum bound, `log(a;1)`, division by zero)
//! never raise an error, they produce the NaN sentinel instead.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    EmptyInput,
    #[error("brackets are not balanced")]
    UnbalancedBrackets,
    #[error("empty brackets")]
    EmptyBrackets,
    #[error("two operators in a row at position {0}")]
    ConsecutiveOperators(usize),
    #[error("absolute value bar without a closing partner")]
    UnmatchedAbsBar,
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
    #[error("character '{0}' is not allowed here")]
    DisallowedCharacter(char),
    #[error("index variable '{0}' clashes with a variable already in scope")]
    CaptureConflict(char),
    #[error("variable '{0}' is not bound by any enclosing sum, product or integral")]
    UnboundVariable(char),
    #[error("'{0}' is not a valid index variable")]
    InvalidIndexVariable(String),
    #[error("{name} expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function '{0}' must be followed by a bracketed argument list")]
    AmbiguousArity(String),
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("literal {0} is not finite")]
    NonFiniteLiteral(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("evaluation exceeded the recursion limit of {0}")]
    DepthExceeded(usize),
    #[error("malformed token list: {0}")]
    MalformedTokenList(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings document could not be parsed: {0}")]
    Parse(String),
    #[error("setting {section}.{key} has an invalid value '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    #[error("unknown setting {section}.{key}")]
    UnknownKey { section: String, key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! # Normalizer
//!
//! Turns the string a user typed into a canonical infix string the bracketer can read:
//! whitespace is stripped, aliases folded, `|a|` rewritten to `abs(a)`, implicit multiplication
//! made explicit, unary signs turned into binary ones and `°`/`%` expanded. Character-level
//! validation (bracket balance, doubled operators, malformed numbers, foreign letters) happens
//! here as well.
//!
//! The output is a fixed point: normalizing it again returns the same string.
use crate::series::series_engine::{Constant, Keyword};
use crate::series::series_errors::ParseError;
use crate::series::utils::{
    check_brackets, check_consecutive_operators, find_pair_from_closing_bracket,
    find_pair_to_this_bracket, replace_abs_bars,
};
use log::trace;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static ALIASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"arcsinh|arccosh|arctanh|arccoth|arcsin|arccos|arctan|arccot|integral|product|PI|Pi|E|,",
    )
    .expect("alias pattern is valid")
});

/// One lexical unit of a normalized expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme {
    Number(String),
    Keyword(Keyword),
    Letter(char),
    Operator(char),
    Open,
    Close,
    Separator,
    Degree,
    Percent,
}

impl Lexeme {
    fn is_open(&self) -> bool {
        matches!(self, Lexeme::Open)
    }

    fn is_close(&self) -> bool {
        matches!(self, Lexeme::Close)
    }

    /// can end an operand
    fn closes_operand(&self) -> bool {
        matches!(
            self,
            Lexeme::Number(_)
                | Lexeme::Letter(_)
                | Lexeme::Close
                | Lexeme::Degree
                | Lexeme::Percent
                | Lexeme::Keyword(Keyword::Constant(_))
        )
    }

    /// can start an operand
    fn opens_operand(&self) -> bool {
        matches!(
            self,
            Lexeme::Number(_) | Lexeme::Letter(_) | Lexeme::Keyword(_) | Lexeme::Open
        )
    }

    fn is_sign(&self) -> bool {
        matches!(self, Lexeme::Operator('+') | Lexeme::Operator('-'))
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lexeme::Number(digits) => write!(f, "{}", digits),
            Lexeme::Keyword(keyword) => write!(f, "{}", keyword.name()),
            Lexeme::Letter(c) | Lexeme::Operator(c) => write!(f, "{}", c),
            Lexeme::Open => write!(f, "("),
            Lexeme::Close => write!(f, ")"),
            Lexeme::Separator => write!(f, ";"),
            Lexeme::Degree => write!(f, "°"),
            Lexeme::Percent => write!(f, "%"),
        }
    }
}

pub fn render(lexemes: &[Lexeme]) -> String {
    lexemes.iter().map(|lexeme| lexeme.to_string()).collect()
}

/// Splits a whitespace-free string into lexemes. Names are matched longest first against the
/// keyword table; any other letter becomes a single `Letter`.
pub fn lex(s: &str) -> Result<Vec<Lexeme>, ParseError> {
    let mut lexemes = Vec::new();
    let mut pos = 0;
    while pos < s.len() {
        let rest = &s[pos..];
        let Some(c) = rest.chars().next() else {
            break;
        };
        if c.is_ascii_digit() || c == '.' {
            let length = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let digits = &rest[..length];
            if digits.matches('.').count() > 1 || digits == "." {
                return Err(ParseError::MalformedNumber(digits.to_string()));
            }
            let digits = if digits.starts_with('.') {
                format!("0{}", digits)
            } else {
                digits.to_string()
            };
            lexemes.push(Lexeme::Number(digits));
            pos += length;
            continue;
        }
        if c.is_ascii_alphabetic() {
            if let Some((keyword, length)) = Keyword::longest_prefix(rest) {
                lexemes.push(Lexeme::Keyword(keyword));
                pos += length;
            } else {
                lexemes.push(Lexeme::Letter(c));
                pos += c.len_utf8();
            }
            continue;
        }
        let lexeme = match c {
            '+' | '-' | '*' | '/' | '^' => Lexeme::Operator(c),
            '(' => Lexeme::Open,
            ')' => Lexeme::Close,
            ';' => Lexeme::Separator,
            '°' => Lexeme::Degree,
            '%' => Lexeme::Percent,
            other => return Err(ParseError::DisallowedCharacter(other)),
        };
        lexemes.push(lexeme);
        pos += c.len_utf8();
    }
    Ok(lexemes)
}

fn fold_aliases(s: &str) -> String {
    ALIASES
        .replace_all(s, |caps: &Captures| {
            let alias = &caps[0];
            match alias {
                "PI" | "Pi" => "pi".to_string(),
                "E" => "e".to_string(),
                "," => ".".to_string(),
                "integral" => "int".to_string(),
                "product" => "prod".to_string(),
                // arcsin -> asin etc.
                _ => format!("a{}", &alias[3..]),
            }
        })
        .into_owned()
}

/// Positions of the top-level `;` inside the call whose `(` sits at `open`, and the index of the
/// matching `)`.
fn argument_separators(lexemes: &[Lexeme], open: usize) -> Option<(Vec<usize>, usize)> {
    let close = find_pair_to_this_bracket(lexemes, open, Lexeme::is_open, Lexeme::is_close)?;
    let mut depth = 0;
    let mut separators = Vec::new();
    for (i, lexeme) in lexemes.iter().enumerate().take(close).skip(open + 1) {
        match lexeme {
            Lexeme::Open => depth += 1,
            Lexeme::Close => depth -= 1,
            Lexeme::Separator if depth == 0 => separators.push(i),
            _ => {}
        }
    }
    Some((separators, close))
}

/// Index variables declared by the aggregates of the expression, i.e. the single letter forming
/// the 4th argument of every `sum`, `prod` and `int`.
fn collect_index_variables(lexemes: &[Lexeme]) -> Result<HashSet<char>, ParseError> {
    let mut declared = HashSet::new();
    for (i, lexeme) in lexemes.iter().enumerate() {
        if !matches!(lexeme, Lexeme::Keyword(Keyword::Aggregate(_))) {
            continue;
        }
        if lexemes.get(i + 1) != Some(&Lexeme::Open) {
            continue;
        }
        let Some((separators, close)) = argument_separators(lexemes, i + 1) else {
            continue;
        };
        if separators.len() != 3 {
            continue;
        }
        if let [Lexeme::Letter(c)] = &lexemes[separators[2] + 1..close] {
            if *c == 'x' || *c == 'n' {
                return Err(ParseError::CaptureConflict(*c));
            }
            declared.insert(*c);
        }
    }
    Ok(declared)
}

fn check_letters(lexemes: &[Lexeme], declared: &HashSet<char>) -> Result<(), ParseError> {
    for lexeme in lexemes {
        if let Lexeme::Letter(c) = lexeme {
            if !matches!(c, 'x' | 'n' | 'i') && !declared.contains(c) {
                return Err(ParseError::DisallowedCharacter(*c));
            }
        }
    }
    Ok(())
}

fn insert_implicit_multiplication(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut result: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    for lexeme in lexemes {
        if let Some(previous) = result.last() {
            if previous.closes_operand() && lexeme.opens_operand() {
                result.push(Lexeme::Operator('*'));
            }
        }
        result.push(lexeme);
    }
    result
}

/// End (exclusive) of the argument that starts at `start`: the next top-level `;` or the
/// unmatched `)`.
fn argument_end(lexemes: &[Lexeme], start: usize) -> usize {
    let mut depth = 0i64;
    for (i, lexeme) in lexemes.iter().enumerate().skip(start) {
        match lexeme {
            Lexeme::Open => depth += 1,
            Lexeme::Close => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            Lexeme::Separator if depth == 0 => return i,
            _ => {}
        }
    }
    lexemes.len()
}

fn rewrite_unary_signs(mut lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let zero = || Lexeme::Number("0".to_string());
    let mut i = 0;
    while i < lexemes.len() {
        if lexemes[i].is_sign() {
            match i.checked_sub(1).map(|j| &lexemes[j]) {
                None | Some(Lexeme::Open) => {
                    lexemes.insert(i, zero());
                    i += 1;
                }
                Some(Lexeme::Separator) => {
                    let end = argument_end(&lexemes, i);
                    lexemes.insert(end, Lexeme::Close);
                    lexemes.splice(i..i, [Lexeme::Open, zero()]);
                    i += 2;
                }
                _ => {}
            }
        }
        i += 1;
    }
    lexemes
}

/// Start of the operand immediately left of position `mark` (a `°` or `%`).
fn operand_start(lexemes: &[Lexeme], mark: usize) -> Option<usize> {
    let last = mark.checked_sub(1)?;
    match &lexemes[last] {
        Lexeme::Number(_) | Lexeme::Letter(_) | Lexeme::Keyword(Keyword::Constant(_)) => Some(last),
        Lexeme::Close => {
            let open =
                find_pair_from_closing_bracket(lexemes, last, Lexeme::is_open, Lexeme::is_close)?;
            match open.checked_sub(1).map(|j| &lexemes[j]) {
                Some(Lexeme::Keyword(keyword)) if !matches!(keyword, Keyword::Constant(_)) => {
                    Some(open - 1)
                }
                _ => Some(open),
            }
        }
        _ => None,
    }
}

fn expand_degrees_and_percents(mut lexemes: Vec<Lexeme>) -> Result<Vec<Lexeme>, ParseError> {
    while let Some(mark) = lexemes
        .iter()
        .position(|l| matches!(l, Lexeme::Degree | Lexeme::Percent))
    {
        let symbol = if lexemes[mark] == Lexeme::Degree { '°' } else { '%' };
        let start = operand_start(&lexemes, mark).ok_or(ParseError::DisallowedCharacter(symbol))?;
        let mut replacement = vec![Lexeme::Open];
        replacement.extend(lexemes[start..mark].iter().cloned());
        replacement.push(Lexeme::Operator('*'));
        if symbol == '°' {
            replacement.extend([
                Lexeme::Keyword(Keyword::Constant(Constant::Pi)),
                Lexeme::Operator('/'),
                Lexeme::Number("180".to_string()),
            ]);
        } else {
            replacement.push(Lexeme::Number("0.01".to_string()));
        }
        replacement.push(Lexeme::Close);
        lexemes.splice(start..=mark, replacement);
    }
    Ok(lexemes)
}

/// Rewrites a raw user expression into canonical infix form.
///
/// # Examples
/// ```rust, ignore
/// assert_eq!(normalize("2x + |n|").unwrap(), "2*x+abs(n)");
/// assert_eq!(normalize("-sin 30°").unwrap(), "0-sin(30*pi/180)");
/// ```
pub fn normalize(raw: &str) -> Result<String, ParseError> {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    check_brackets(&stripped)?;
    check_consecutive_operators(&stripped)?;
    let folded = fold_aliases(&stripped);
    let without_bars = replace_abs_bars(&folded)?;
    check_brackets(&without_bars)?;
    let lexemes = lex(&without_bars)?;
    let declared = collect_index_variables(&lexemes)?;
    check_letters(&lexemes, &declared)?;
    let lexemes = insert_implicit_multiplication(lexemes);
    let lexemes = rewrite_unary_signs(lexemes);
    let lexemes = expand_degrees_and_percents(lexemes)?;
    let normalized = render(&lexemes);
    trace!("normalized '{}' into '{}'", raw, normalized);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::series_engine::{AggregateKind, Function};

    #[test]
    fn test_lex() {
        let lexemes = lex("2.5sinh(x)+pi").unwrap();
        assert_eq!(
            lexemes,
            vec![
                Lexeme::Number("2.5".to_string()),
                Lexeme::Keyword(Keyword::Function(Function::Sinh)),
                Lexeme::Open,
                Lexeme::Letter('x'),
                Lexeme::Close,
                Lexeme::Operator('+'),
                Lexeme::Keyword(Keyword::Constant(Constant::Pi)),
            ]
        );
        assert_eq!(lex(".5").unwrap(), vec![Lexeme::Number("0.5".to_string())]);
        assert_eq!(
            lex("1.2.3"),
            Err(ParseError::MalformedNumber("1.2.3".to_string()))
        );
        assert_eq!(lex("x$"), Err(ParseError::DisallowedCharacter('$')));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(normalize("arcsin(x)").unwrap(), "asin(x)");
        assert_eq!(normalize("arcsinh(x)").unwrap(), "asinh(x)");
        assert_eq!(normalize("PI+E").unwrap(), "pi+e");
        assert_eq!(normalize("1,5x").unwrap(), "1.5*x");
        assert_eq!(
            normalize("integral(0;1;t;t)").unwrap(),
            "int(0;1;t;t)"
        );
        assert_eq!(normalize("product(1;3;k;k)").unwrap(), "prod(1;3;k;k)");
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(normalize("2x").unwrap(), "2*x");
        assert_eq!(normalize("2 x n").unwrap(), "2*x*n");
        assert_eq!(normalize("x(x+1)").unwrap(), "x*(x+1)");
        assert_eq!(normalize("(x+1)(x-1)").unwrap(), "(x+1)*(x-1)");
        assert_eq!(normalize("2pi x").unwrap(), "2*pi*x");
        assert_eq!(normalize("3sin(x)").unwrap(), "3*sin(x)");
        assert_eq!(normalize("xe").unwrap(), "x*e");
        assert_eq!(normalize("2i").unwrap(), "2*i");
    }

    #[test]
    fn test_abs_bars() {
        assert_eq!(normalize("|x|").unwrap(), "abs(x)");
        assert_eq!(normalize("2|x-1|").unwrap(), "2*abs(x-1)");
        assert_eq!(normalize("|x"), Err(ParseError::UnmatchedAbsBar));
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(normalize("-x").unwrap(), "0-x");
        assert_eq!(normalize("+x").unwrap(), "0+x");
        assert_eq!(normalize("2*(-x)").unwrap(), "2*(0-x)");
        assert_eq!(
            normalize("sum(-3;n;-k;k)").unwrap(),
            "sum(0-3;n;(0-k);k)"
        );
        assert_eq!(normalize("log(x;-2)").unwrap(), "log(x;(0-2))");
    }

    #[test]
    fn test_degrees_and_percents() {
        assert_eq!(normalize("30°").unwrap(), "(30*pi/180)");
        assert_eq!(normalize("sin30°").unwrap(), "sin(30*pi/180)");
        assert_eq!(normalize("50%x").unwrap(), "(50*0.01)*x");
        assert_eq!(normalize("(x+1)%").unwrap(), "((x+1)*0.01)");
        assert_eq!(normalize("sin(x)°").unwrap(), "(sin(x)*pi/180)");
        assert_eq!(normalize("°"), Err(ParseError::DisallowedCharacter('°')));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(normalize("   "), Err(ParseError::EmptyInput));
        assert_eq!(normalize("(x+1"), Err(ParseError::UnbalancedBrackets));
        assert_eq!(normalize("x+()"), Err(ParseError::EmptyBrackets));
        assert_eq!(normalize("3++2"), Err(ParseError::ConsecutiveOperators(2)));
        assert_eq!(
            normalize("1..2"),
            Err(ParseError::MalformedNumber("1..2".to_string()))
        );
        assert_eq!(normalize("x+y"), Err(ParseError::DisallowedCharacter('y')));
        assert_eq!(normalize("x#2"), Err(ParseError::DisallowedCharacter('#')));
    }

    #[test]
    fn test_index_variables() {
        assert_eq!(normalize("sum(1;n;k^2;k)").unwrap(), "sum(1;n;k^2;k)");
        assert_eq!(normalize("sum(1;n;x;i)").unwrap(), "sum(1;n;x;i)");
        assert_eq!(
            normalize("int(0;1;x;x)"),
            Err(ParseError::CaptureConflict('x'))
        );
        assert_eq!(
            normalize("prod(1;3;n;n)"),
            Err(ParseError::CaptureConflict('n'))
        );
        // k is only declared by the aggregate
        assert_eq!(normalize("k+1"), Err(ParseError::DisallowedCharacter('k')));
        let lexemes = lex("sum(1;n;k;k)").unwrap();
        assert_eq!(
            lexemes[0],
            Lexeme::Keyword(Keyword::Aggregate(AggregateKind::Sum))
        );
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "2x^2 - 3x + 1",
            "-|x|+sum(-1;n;-k x;k)",
            "sin30° + 5%",
            ".5x(n+1)",
            "int(0;x;t^2;t)+log(x;2)",
            "PI*E*2i",
        ];
        for input in inputs {
            let once = normalize(input).unwrap();
            assert_eq!(normalize(&once).unwrap(), once, "input {}", input);
        }
    }
}

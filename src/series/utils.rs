// the collection of utility functions for bracket parsing and proceeding
use crate::series::series_errors::ParseError;

pub const SIMPLE_OPERATORS: [char; 5] = ['+', '-', '*', '/', '^'];

pub fn is_simple_operator(c: char) -> bool {
    SIMPLE_OPERATORS.contains(&c)
}

/// Every `(` must close and no pair may be empty.
pub fn check_brackets(s: &str) -> Result<(), ParseError> {
    let mut depth: usize = 0;
    let mut previous = None;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(ParseError::UnbalancedBrackets);
                }
                if previous == Some('(') {
                    return Err(ParseError::EmptyBrackets);
                }
                depth -= 1;
            }
            _ => {}
        }
        previous = Some(c);
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(ParseError::UnbalancedBrackets)
    }
}

/// Rejects two simple operators in a row, reporting the char position of the second one.
pub fn check_consecutive_operators(s: &str) -> Result<(), ParseError> {
    let chars: Vec<char> = s.chars().collect();
    match chars
        .windows(2)
        .position(|pair| is_simple_operator(pair[0]) && is_simple_operator(pair[1]))
    {
        Some(position) => Err(ParseError::ConsecutiveOperators(position + 1)),
        None => Ok(()),
    }
}

/// Index of the item closing the bracket opened at `open`, counting nested pairs.
pub fn find_pair_to_this_bracket<T>(
    items: &[T],
    open: usize,
    is_open: impl Fn(&T) -> bool,
    is_close: impl Fn(&T) -> bool,
) -> Option<usize> {
    let mut depth = 0usize;
    for (i, item) in items.iter().enumerate().skip(open) {
        if is_open(item) {
            depth += 1;
        } else if is_close(item) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the item opening the bracket closed at `close`.
pub fn find_pair_from_closing_bracket<T>(
    items: &[T],
    close: usize,
    is_open: impl Fn(&T) -> bool,
    is_close: impl Fn(&T) -> bool,
) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        if is_close(&items[i]) {
            depth += 1;
        } else if is_open(&items[i]) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Rewrites `|a|` into `abs(a)`. Each bar pairs with the nearest following bar at the same
/// bracket depth.
pub fn replace_abs_bars(s: &str) -> Result<String, ParseError> {
    let mut chars: Vec<char> = s.chars().collect();
    while let Some(start) = chars.iter().position(|c| *c == '|') {
        let mut depth = 0i64;
        let mut end = None;
        for (i, c) in chars.iter().enumerate().skip(start + 1) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        break;
                    }
                }
                '|' if depth == 0 => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or(ParseError::UnmatchedAbsBar)?;
        chars[end] = ')';
        chars.splice(start..start + 1, "abs(".chars());
    }
    Ok(chars.into_iter().collect())
}

//! Low-level token parsers shared by the statement and pattern grammars.
//!
//! `nom` handles the genuinely tabular bits (tag/count fields, numeric and
//! string literals); the higher-level line-dispatch and recursive-descent
//! modifier-chain walk in [`crate::statements`] and [`crate::pattern`] stay
//! as plain Rust, since BeatBax's grammar is closer to shell-like line
//! dispatch than fixed-width binary records.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{pair, preceded, terminated},
    IResult,
};

/// Consumes zero or more spaces/tabs (never newlines; BeatBax is line-oriented).
pub fn ws0(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ' ' || c == '\t')(input)
}

/// An identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// A double-quoted string literal with `\"` and `\\` escapes, yielding the
/// unescaped contents.
pub fn quoted_string(input: &str) -> IResult<&str, String> {
    let escaped = escaped_transform(
        is_not("\"\\"),
        '\\',
        alt((value("\"", tag("\"")), value("\\", tag("\\")))),
    );
    map(
        preceded(char('"'), terminated(opt(escaped), char('"'))),
        |s: Option<String>| s.unwrap_or_default(),
    )(input)
}

/// A signed integer, `-?\d+`.
pub fn signed_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i64>())(input)
}

/// An unsigned integer, `\d+`.
pub fn unsigned_int(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

/// A floating-point literal, `-?\d+(\.\d+)?`.
pub fn float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(
            pair(opt(char('-')), digit1),
            opt(pair(char('.'), digit1)),
        )),
        |s: &str| s.parse::<f64>(),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_stops_at_non_ident_chars() {
        assert_eq!(identifier("lead_synth rest"), Ok((" rest", "lead_synth")));
    }

    #[test]
    fn quoted_string_unescapes() {
        assert_eq!(
            quoted_string(r#""hello \"world\"" trailing"#),
            Ok((" trailing", "hello \"world\"".to_string()))
        );
    }

    #[test]
    fn quoted_string_handles_empty() {
        assert_eq!(quoted_string("\"\" rest"), Ok((" rest", String::new())));
    }

    #[test]
    fn float_parses_integers_and_decimals() {
        assert_eq!(float("140 x"), Ok((" x", 140.0)));
        assert_eq!(float("-3.5x"), Ok(("x", -3.5)));
    }

    #[test]
    fn signed_int_parses_negative() {
        assert_eq!(signed_int("-2)"), Ok((")", -2)));
    }
}

//! Shell-style tokenization of a request line.
//!
//! Tokens are separated by spaces or tabs. A single- or double-quoted span
//! groups characters, including spaces, into one token; `''` passes an
//! empty argument; adjacent spans concatenate, so `a' b'c` is the single
//! token `a bc`.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, map},
    multi::{many0, many1},
    sequence::{delimited, preceded, terminated},
    IResult,
};
use smallvec::SmallVec;
use snafu::Snafu;

/// Commands carry at most six tokens; spill to the heap is the exception.
pub(crate) type TokenList = SmallVec<[String; 8]>;

/// The line could not be tokenized (unbalanced quote).
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("malformed command line"))]
pub struct TokenizeError;

fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| delimited(char(quote), take_while(|c| c != quote), char(quote))(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, ' ' | '\t' | '\'' | '"'))(input)
}

fn segment(input: &str) -> IResult<&str, &str> {
    alt((quoted('\''), quoted('"'), bare))(input)
}

fn token(input: &str) -> IResult<&str, String> {
    map(many1(segment), |segments| segments.concat())(input)
}

/// Split `line` into tokens.
///
/// Anything left over after the tokens (in practice a dangling quote) is
/// an error; silently dropping bytes from a command would be worse than
/// rejecting it.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let parsed: IResult<&str, Vec<String>> =
        all_consuming(preceded(space0, many0(terminated(token, space0))))(line);

    match parsed {
        Ok((_, tokens)) => Ok(tokens),
        Err(_) => Err(TokenizeError),
    }
}

/// As [`tokenize`], into the stack-allocated list used by the parser.
pub(crate) fn tokenize_small(line: &str) -> Result<TokenList, TokenizeError> {
    tokenize(line).map(TokenList::from_vec)
}

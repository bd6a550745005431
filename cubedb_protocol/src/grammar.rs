//! The `col=val('&'col=val)*` grammar shared by `INSERT` rows and
//! `COUNT`/`PCOUNT` filters.
//!
//! The two consumers disagree about repeated columns: a row keeps the last
//! value, a filter ORs the values. Both behaviours live in the request
//! types; this module only extracts the pairs.

use cubedb_data::{FilterSpec, RowSpec};
use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::all_consuming,
    multi::separated_list1,
    sequence::separated_pair,
    IResult,
};
use snafu::Snafu;

/// The kv string did not match the grammar.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("malformed column=value list \"{}\"", input))]
pub struct GrammarError {
    input: String,
}

fn pair(input: &str) -> IResult<&str, (String, String)> {
    let column = take_while1(|c| c != '=' && c != '&');
    let value = take_while1(|c| c != '&');
    let (rest, (column, value)) = separated_pair(column, char('='), value)(input)?;
    Ok((rest, (column.to_string(), value.to_string())))
}

fn pairs(input: &str) -> Result<Vec<(String, String)>, GrammarError> {
    let parsed: IResult<&str, Vec<(String, String)>> =
        all_consuming(separated_list1(char('&'), pair))(input);
    match parsed {
        Ok((_, pairs)) => Ok(pairs),
        Err(_) => Err(GrammarError {
            input: input.to_string(),
        }),
    }
}

/// Parse an `INSERT` kv argument into a row; the last value wins per
/// column.
pub fn parse_row(input: &str) -> Result<RowSpec, GrammarError> {
    Ok(RowSpec::from_pairs(pairs(input)?))
}

/// Parse a filter argument; repeated columns accumulate an any-of set.
pub fn parse_filter(input: &str) -> Result<FilterSpec, GrammarError> {
    Ok(FilterSpec::from_pairs(pairs(input)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pair() {
        let row = parse_row("a=1").unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "1")]);
    }

    #[test]
    fn several_pairs() {
        let row = parse_row("a=3&b=2").unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn repeated_column_last_wins_for_rows() {
        let row = parse_row("a=1&a=2").unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "2")]);
    }

    #[test]
    fn repeated_column_accumulates_for_filters() {
        let filter = parse_filter("a=1&a=2").unwrap();
        let (column, values) = filter.iter().next().unwrap();
        assert_eq!(column, "a");
        assert_eq!(values.iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn value_may_contain_equals() {
        let row = parse_row("a=x=y").unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "x=y")]);
    }

    #[test]
    fn malformed_lists_are_rejected() {
        for bad in ["", "a", "a=", "=1", "a=1&", "&a=1", "a=1&&b=2", "a==&"] {
            assert!(parse_row(bad).is_err(), "{:?} should not parse", bad);
        }
    }
}

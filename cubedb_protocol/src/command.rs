//! Request parsing: verb lookup, arity validation and argument
//! normalization.

use crate::grammar;
use crate::reply::WireError;
use crate::tokenizer;
use cubedb_data::{
    is_clean_text, FilterSpec, PartitionRange, QuerySpec, RowCount, RowSpec,
};
use observability_deps::tracing::trace;

/// A fully parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe.
    Ping,
    /// Usage listing.
    Help,
    /// Acknowledge and close the connection.
    Quit,
    /// List cube names.
    Cubes,
    /// Create an empty cube.
    AddCube {
        /// Cube to create.
        cube: String,
    },
    /// Delete a cube and its partitions.
    DelCube {
        /// Cube to delete.
        cube: String,
    },
    /// List a cube's partition names.
    Cube {
        /// Cube to list.
        cube: String,
    },
    /// List observed values per column over a partition range.
    Part {
        /// Cube to inspect.
        cube: String,
        /// Range; a lone `from` selects that single partition, and `to` is
        /// inclusive.
        range: PartitionRange,
    },
    /// Delete a single partition or a half-open range of them.
    DelPart {
        /// Cube to delete from.
        cube: String,
        /// Single partition name, or the inclusive lower bound.
        from: String,
        /// Exclusive upper bound; absent for the single-partition form.
        to: Option<String>,
    },
    /// Add a row with a count.
    Insert {
        /// Target cube, created on demand.
        cube: String,
        /// Target partition, created on demand.
        partition: String,
        /// The row's column values.
        row: RowSpec,
        /// How many observations the row represents.
        count: RowCount,
    },
    /// Count over a partition range.
    Count {
        /// Cube to query.
        cube: String,
        /// Range, filter and optional group column.
        query: QuerySpec,
    },
    /// Count per partition over a range.
    PCount {
        /// Cube to query.
        cube: String,
        /// Range, filter and optional group column.
        query: QuerySpec,
    },
    /// Persist the store to the dump path.
    Dump,
}

impl Command {
    /// Parse one request line.
    ///
    /// Every failure maps to the wire code the dispatcher replies with;
    /// parsing never inspects the store.
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let tokens = tokenizer::tokenize_small(line).map_err(|_| WireError::MalformedArgument)?;

        let verb = match tokens.first() {
            Some(verb) => verb.to_ascii_uppercase(),
            // An empty line names no verb; treat it as one we don't know.
            None => return Err(WireError::UnknownCommand),
        };
        let args = &tokens[1..];

        for arg in args {
            if !is_clean_text(arg) {
                return Err(WireError::MalformedArgument);
            }
        }

        trace!(%verb, args = args.len(), "parsed request tokens");

        match verb.as_str() {
            "PING" => arity(args, 0, 0).map(|_| Self::Ping),
            "HELP" => arity(args, 0, 0).map(|_| Self::Help),
            "QUIT" => arity(args, 0, 0).map(|_| Self::Quit),
            "CUBES" => arity(args, 0, 0).map(|_| Self::Cubes),
            "DUMP" => arity(args, 0, 0).map(|_| Self::Dump),
            "ADDCUBE" => {
                arity(args, 1, 1)?;
                Ok(Self::AddCube {
                    cube: required(&args[0])?,
                })
            }
            "DELCUBE" => {
                arity(args, 1, 1)?;
                Ok(Self::DelCube {
                    cube: required(&args[0])?,
                })
            }
            "CUBE" => {
                arity(args, 1, 1)?;
                Ok(Self::Cube {
                    cube: required(&args[0])?,
                })
            }
            "PART" => {
                arity(args, 1, 3)?;
                Ok(Self::Part {
                    cube: required(&args[0])?,
                    range: PartitionRange::new(optional(args, 1), optional(args, 2)),
                })
            }
            "DELPART" => {
                arity(args, 2, 3)?;
                // Only the empty string makes `to` absent here; the
                // original client always sends three arguments, padding
                // the single-partition form with ''.
                let to = args.get(2).filter(|to| !to.is_empty()).cloned();
                Ok(Self::DelPart {
                    cube: required(&args[0])?,
                    from: required(&args[1])?,
                    to,
                })
            }
            "INSERT" => {
                arity(args, 4, 4)?;
                Ok(Self::Insert {
                    cube: required(&args[0])?,
                    partition: required(&args[1])?,
                    row: parse_row(&args[2])?,
                    count: parse_count(&args[3])?,
                })
            }
            "COUNT" => {
                arity(args, 1, 5)?;
                Ok(Self::Count {
                    cube: required(&args[0])?,
                    query: parse_query(args)?,
                })
            }
            "PCOUNT" => {
                arity(args, 1, 5)?;
                Ok(Self::PCount {
                    cube: required(&args[0])?,
                    query: parse_query(args)?,
                })
            }
            _ => Err(WireError::UnknownCommand),
        }
    }
}

fn arity(args: &[String], min: usize, max: usize) -> Result<(), WireError> {
    if args.len() < min || args.len() > max {
        return Err(WireError::WrongArgumentCount);
    }
    Ok(())
}

/// A positional argument that must carry a value.
fn required(arg: &str) -> Result<String, WireError> {
    if arg.is_empty() {
        return Err(WireError::WrongArgument);
    }
    Ok(arg.to_string())
}

/// An optional positional argument: absent, empty and the literal `null`
/// all mean "not given".
fn optional(args: &[String], index: usize) -> Option<String> {
    args.get(index)
        .filter(|arg| !arg.is_empty() && arg.as_str() != "null")
        .cloned()
}

fn parse_row(kv: &str) -> Result<RowSpec, WireError> {
    grammar::parse_row(kv).map_err(|_| WireError::MalformedArgument)
}

fn parse_query(args: &[String]) -> Result<QuerySpec, WireError> {
    let filter = match optional(args, 3) {
        Some(kv) => grammar::parse_filter(&kv).map_err(|_| WireError::MalformedArgument)?,
        None => FilterSpec::none(),
    };
    Ok(QuerySpec {
        range: PartitionRange::new(optional(args, 1), optional(args, 2)),
        filter,
        group: optional(args, 4),
    })
}

/// `count` must be numeric (else malformed) and positive (else wrong
/// argument).
fn parse_count(token: &str) -> Result<RowCount, WireError> {
    if let Ok(value) = token.parse::<u64>() {
        return RowCount::try_new(value).map_err(|_| WireError::WrongArgument);
    }
    if token.parse::<i64>().is_ok() {
        return Err(WireError::WrongArgument);
    }
    Err(WireError::MalformedArgument)
}

/// The `HELP` reply: one usage line per verb.
pub fn help_lines() -> Vec<String> {
    [
        "PING - liveness probe, replies PONG",
        "HELP - this listing",
        "QUIT - close the connection",
        "CUBES - list cube names",
        "ADDCUBE <cube> - create an empty cube",
        "DELCUBE <cube> - delete a cube and its partitions",
        "CUBE <cube> - list a cube's partition names",
        "PART <cube> [<from> [<to>]] - list observed values per column",
        "DELPART <cube> <from> [<to>] - delete one partition or a [from,to) range",
        "INSERT <cube> <partition> <col=val&...> <count> - add a row",
        "COUNT <cube> [<from> [<to> [<filter> [<group>]]]] - count over a range",
        "PCOUNT <cube> [<from> [<to> [<filter> [<group>]]]] - count per partition",
        "DUMP - persist the store to the dump path",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, WireError> {
        Command::parse(line)
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse("ping"), Ok(Command::Ping));
        assert_eq!(parse("PiNg"), Ok(Command::Ping));
        assert_eq!(parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn unknown_verb_and_empty_line() {
        assert_eq!(parse("RANDOM CMD"), Err(WireError::UnknownCommand));
        assert_eq!(parse(""), Err(WireError::UnknownCommand));
        assert_eq!(parse("   "), Err(WireError::UnknownCommand));
    }

    #[test]
    fn zero_arg_verbs_reject_arguments() {
        assert_eq!(parse("QUIT arg"), Err(WireError::WrongArgumentCount));
        assert_eq!(parse("PING x"), Err(WireError::WrongArgumentCount));
        assert_eq!(parse("CUBES x"), Err(WireError::WrongArgumentCount));
    }

    #[test]
    fn addcube() {
        assert_eq!(
            parse("ADDCUBE cube"),
            Ok(Command::AddCube {
                cube: "cube".to_string()
            })
        );
        assert_eq!(parse("ADDCUBE"), Err(WireError::WrongArgumentCount));
        assert_eq!(parse("ADDCUBE a b"), Err(WireError::WrongArgumentCount));
        assert_eq!(parse("ADDCUBE ''"), Err(WireError::WrongArgument));
    }

    #[test]
    fn quoted_names_reach_the_command() {
        assert_eq!(
            parse("ADDCUBE 'a cube'"),
            Ok(Command::AddCube {
                cube: "a cube".to_string()
            })
        );
    }

    #[test]
    fn insert() {
        let parsed = parse("INSERT cube p1 a=1&b=2 3").unwrap();
        match parsed {
            Command::Insert {
                cube,
                partition,
                row,
                count,
            } => {
                assert_eq!(cube, "cube");
                assert_eq!(partition, "p1");
                assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "1"), ("b", "2")]);
                assert_eq!(count.get(), 3);
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert_eq!(parse("INSERT cube p1 a 1"), Err(WireError::MalformedArgument));
        assert_eq!(parse("INSERT cube p1 a=1"), Err(WireError::WrongArgumentCount));
        assert_eq!(
            parse("INSERT cube p1 a=1 nope"),
            Err(WireError::MalformedArgument)
        );
        assert_eq!(parse("INSERT cube p1 a=1 0"), Err(WireError::WrongArgument));
        assert_eq!(parse("INSERT cube p1 a=1 -2"), Err(WireError::WrongArgument));
    }

    #[test]
    fn count_argument_normalization() {
        // All five positions, '' padded: everything optional is absent.
        let parsed = parse("COUNT 'cube' '' '' '' ''").unwrap();
        assert_eq!(
            parsed,
            Command::Count {
                cube: "cube".to_string(),
                query: QuerySpec::default(),
            }
        );

        // `null` works for every optional position.
        let parsed = parse("COUNT cube null null null null").unwrap();
        assert_eq!(
            parsed,
            Command::Count {
                cube: "cube".to_string(),
                query: QuerySpec::default(),
            }
        );
    }

    #[test]
    fn count_with_everything() {
        let parsed = parse("COUNT cube p1 p9 a=1&a=2&b=3 b").unwrap();
        match parsed {
            Command::Count { cube, query } => {
                assert_eq!(cube, "cube");
                assert_eq!(query.range.from.as_deref(), Some("p1"));
                assert_eq!(query.range.to.as_deref(), Some("p9"));
                assert_eq!(query.group.as_deref(), Some("b"));
                let filter: Vec<_> = query
                    .filter
                    .iter()
                    .map(|(c, vs)| (c, vs.len()))
                    .collect();
                assert_eq!(filter, vec![("a", 2), ("b", 1)]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn count_rejects_bad_filter() {
        assert_eq!(
            parse("COUNT cube p1 p9 a&b=1"),
            Err(WireError::MalformedArgument)
        );
    }

    #[test]
    fn delpart_forms() {
        assert_eq!(
            parse("DELPART cube part"),
            Ok(Command::DelPart {
                cube: "cube".to_string(),
                from: "part".to_string(),
                to: None,
            })
        );
        // The client pads the single form with ''.
        assert_eq!(
            parse("DELPART 'cube' 'part' ''"),
            Ok(Command::DelPart {
                cube: "cube".to_string(),
                from: "part".to_string(),
                to: None,
            })
        );
        assert_eq!(
            parse("DELPART cube p1 p3"),
            Ok(Command::DelPart {
                cube: "cube".to_string(),
                from: "p1".to_string(),
                to: Some("p3".to_string()),
            })
        );
        assert_eq!(parse("DELPART cube"), Err(WireError::WrongArgumentCount));
        assert_eq!(parse("DELPART cube '' p3"), Err(WireError::WrongArgument));
    }

    #[test]
    fn part_forms() {
        assert_eq!(
            parse("PART cube"),
            Ok(Command::Part {
                cube: "cube".to_string(),
                range: PartitionRange::all(),
            })
        );
        assert_eq!(
            parse("PART cube p1"),
            Ok(Command::Part {
                cube: "cube".to_string(),
                range: PartitionRange::new(Some("p1".to_string()), None),
            })
        );
        assert_eq!(
            parse("PART cube p1 p2"),
            Ok(Command::Part {
                cube: "cube".to_string(),
                range: PartitionRange::new(Some("p1".to_string()), Some("p2".to_string())),
            })
        );
    }

    #[test]
    fn control_characters_are_malformed() {
        assert_eq!(
            parse("ADDCUBE 'tab\there'"),
            Err(WireError::MalformedArgument)
        );
        assert_eq!(parse("ADDCUBE 'oops"), Err(WireError::MalformedArgument));
    }

    #[test]
    fn help_covers_every_verb() {
        let help = help_lines();
        for verb in [
            "PING", "HELP", "QUIT", "CUBES", "ADDCUBE", "DELCUBE", "CUBE", "PART", "DELPART",
            "INSERT", "COUNT", "PCOUNT", "DUMP",
        ] {
            assert!(
                help.iter().any(|line| line.starts_with(verb)),
                "missing help for {}",
                verb
            );
        }
    }
}

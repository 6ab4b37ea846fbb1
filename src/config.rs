use clap::{App, Arg, ArgMatches};
use std::collections::BTreeMap;
use thiserror::Error;
use tisvm::harness::{TestSuite, DEFAULT_MAX_TICKS};
use tisvm::grid::DEFAULT_CAPACITY;
use tisvm::Discipline;

pub struct Config {
    pub program_paths: Vec<String>,
    pub columns: usize,
    pub capacity: usize,
    pub suite: TestSuite,
    pub max_ticks: usize,
    pub optimize: bool,
    pub discipline: Discipline,
    pub dump_programs: bool,
    pub dump_result: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("--{option}: `{value}` is not a non-negative integer")]
    Count { option: &'static str, value: String },

    #[error("--columns must be at least 1")]
    NoColumns,

    #[error("--{option}: `{value}` does not have the form COL=v,v,..")]
    Assignment { option: &'static str, value: String },

    #[error("--{option}: column {col} is outside of the {columns} column(s) of the grid")]
    Column {
        option: &'static str,
        col: usize,
        columns: usize,
    },

    #[error("--discipline: {0}")]
    Discipline(String),
}

const AFTER_HELP: &str = r##"
Every PROGRAM file holds the assembly of one node. The files fill the grid
row by row, `--columns` nodes per row. Column k reads the values given by
`--input k=..` on the UP port of its top node and writes to output k from
the DOWN port of its bottom node.

Example:
    tisvm --columns 2 --input 0=1,2,3,4 --input 1=5,6,7,8 \
          --expect 0=6,8,10,12 adder.tis forward.tis

Set RUST_LOG=debug to see what the compiler and optimizer do.
"##;

fn app() -> App<'static, 'static> {
    App::new("tisvm")
        .version("0.1")
        .about("Runs a grid of channel-connected accumulator nodes against a test suite.")
        .arg(
            Arg::with_name("programs")
                .value_name("PROGRAM")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("columns")
                .long("columns")
                .takes_value(true)
                .help("Nodes per grid row [default: number of programs]"),
        )
        .arg(
            Arg::with_name("capacity")
                .long("capacity")
                .takes_value(true)
                .help("Capacity of every channel, 0 makes each transfer a rendezvous [default: 1]"),
        )
        .arg(
            Arg::with_name("input")
                .long("input")
                .value_name("COL=v,..")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Values fed into the top of a column"),
        )
        .arg(
            Arg::with_name("expect")
                .long("expect")
                .value_name("COL=v,..")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Values expected at the bottom of a column"),
        )
        .arg(
            Arg::with_name("max_ticks")
                .long("max-ticks")
                .takes_value(true)
                .help("Tick budget [default: 1000]"),
        )
        .arg(
            Arg::with_name("optimize")
                .long("optimize")
                .help("Runs every program through the peephole optimizer first"),
        )
        .arg(
            Arg::with_name("discipline")
                .long("discipline")
                .takes_value(true)
                .possible_values(&["lockstep", "first-settled"])
                .help("When a tick ends [default: lockstep]"),
        )
        .arg(
            Arg::with_name("dump_programs")
                .long("dump-programs")
                .help("Prints every program as it is loaded into the grid"),
        )
        .arg(
            Arg::with_name("dump_result")
                .long("dump-result")
                .help("Writes out the state of every node after the run"),
        )
        .after_help(AFTER_HELP)
}

pub fn parse_command_line_args() -> Result<Config, ConfigError> {
    config_from(&app().get_matches())
}

fn config_from(arg_matches: &ArgMatches) -> Result<Config, ConfigError> {
    let program_paths: Vec<String> = arg_matches
        .values_of("programs")
        .map(|vs| vs.map(str::to_owned).collect())
        .unwrap_or_default();

    let columns = match arg_matches.value_of("columns") {
        Some(v) => parse_count("columns", v)?,
        None => program_paths.len().max(1),
    };
    if columns == 0 {
        return Err(ConfigError::NoColumns);
    }

    let suite = TestSuite {
        inputs: parse_assignments(arg_matches, "input", columns)?,
        outputs: parse_assignments(arg_matches, "expect", columns)?,
    };

    let discipline = match arg_matches.value_of("discipline") {
        Some(v) => v.parse().map_err(ConfigError::Discipline)?,
        None => Discipline::default(),
    };

    Ok(Config {
        program_paths,
        columns,
        capacity: match arg_matches.value_of("capacity") {
            Some(v) => parse_count("capacity", v)?,
            None => DEFAULT_CAPACITY,
        },
        suite,
        max_ticks: match arg_matches.value_of("max_ticks") {
            Some(v) => parse_count("max-ticks", v)?,
            None => DEFAULT_MAX_TICKS,
        },
        optimize: arg_matches.is_present("optimize"),
        discipline,
        dump_programs: arg_matches.is_present("dump_programs"),
        dump_result: arg_matches.is_present("dump_result"),
    })
}

fn parse_count(option: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Count {
        option,
        value: value.to_owned(),
    })
}

/// Collects every `COL=v,v,..` given for `option`. Repeating a column
/// appends to its values.
fn parse_assignments(
    arg_matches: &ArgMatches,
    option: &'static str,
    columns: usize,
) -> Result<BTreeMap<usize, Vec<i64>>, ConfigError> {
    let mut assignments: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
    for text in arg_matches.values_of(option).into_iter().flatten() {
        let malformed = || ConfigError::Assignment {
            option,
            value: text.to_owned(),
        };
        let pos = text.find('=').ok_or_else(malformed)?;
        let col: usize = text[..pos].trim().parse().map_err(|_| malformed())?;
        if col >= columns {
            return Err(ConfigError::Column {
                option,
                col,
                columns,
            });
        }
        let values_text = text[pos + 1..].trim();
        let mut values = Vec::new();
        if !values_text.is_empty() {
            for v in values_text.split(',') {
                values.push(v.trim().parse::<i64>().map_err(|_| malformed())?);
            }
        }
        assignments.entry(col).or_default().extend(values);
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {

    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["tisvm"];
        argv.extend_from_slice(args);
        config_from(&app().get_matches_from_safe(argv).unwrap())
    }

    #[test]
    fn test_defaults() {
        let conf = parse(&["a.tis", "b.tis"]).unwrap();
        assert_eq!(conf.program_paths, vec!["a.tis", "b.tis"]);
        assert_eq!(conf.columns, 2);
        assert_eq!(conf.capacity, 1);
        assert_eq!(conf.max_ticks, 1000);
        assert_eq!(conf.discipline, Discipline::Lockstep);
        assert!(!conf.optimize && !conf.dump_programs && !conf.dump_result);
        assert_eq!(conf.suite, TestSuite::new());
    }

    #[test]
    fn test_suite_options() {
        let conf = parse(&[
            "--columns",
            "2",
            "--input",
            "0=1,2",
            "--input",
            "1=-5",
            "--input",
            "0=3",
            "--expect",
            "0=",
            "--discipline",
            "first-settled",
            "--capacity",
            "0",
            "a.tis",
        ])
        .unwrap();
        assert_eq!(
            conf.suite,
            TestSuite::new()
                .input(0, vec![1, 2, 3])
                .input(1, vec![-5])
                .output(0, vec![])
        );
        assert_eq!(conf.discipline, Discipline::FirstSettled);
        assert_eq!(conf.capacity, 0);
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            parse(&["--max-ticks", "ten", "a.tis"]).err(),
            Some(ConfigError::Count {
                option: "max-ticks",
                value: "ten".to_owned()
            })
        );
        assert_eq!(
            parse(&["--columns", "0", "a.tis"]).err(),
            Some(ConfigError::NoColumns)
        );
        assert_eq!(
            parse(&["--input", "1=2", "a.tis"]).err(),
            Some(ConfigError::Column {
                option: "input",
                col: 1,
                columns: 1
            })
        );
        assert_eq!(
            parse(&["--expect", "0=x", "a.tis"]).err(),
            Some(ConfigError::Assignment {
                option: "expect",
                value: "0=x".to_owned()
            })
        );
    }
}

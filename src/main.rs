mod config;

use config::{parse_command_line_args, Config};
use std::error::Error;
use std::fs;
use std::process;
use tisvm::{compile, decompile, optimize, GridBuilder, Harness};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the program of every node. With `--optimize`, each program is
/// compiled, optimized and written back out as label-free source.
fn load(conf: &Config) -> Result<Vec<String>, Box<dyn Error>> {
    let mut sources = Vec::with_capacity(conf.program_paths.len());
    for path in conf.program_paths.iter() {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        if conf.optimize {
            let compilation = compile(&text).map_err(|e| format!("{}: {}", path, e))?;
            let optimized = optimize(&compilation.program);
            debug!(
                path = %path,
                before = compilation.program.len(),
                after = optimized.len(),
                "optimized node program"
            );
            sources.push(decompile(&optimized));
        } else {
            sources.push(text);
        }
    }
    Ok(sources)
}

fn build_harness(conf: &Config, sources: Vec<String>) -> Result<Harness, Box<dyn Error>> {
    let cols = conf.columns;
    let rows = (sources.len() + cols - 1) / cols;
    let mut builder = GridBuilder::new(rows, cols).capacity(conf.capacity);
    for (i, source) in sources.into_iter().enumerate() {
        builder = builder.node(i / cols, i % cols, source);
    }
    let grid = builder.build()?;
    Ok(grid.into_harness(&conf.suite).with_discipline(conf.discipline))
}

/// Runs the suite and prints what came out. Returns whether every output
/// port received as many values as expected.
fn run(conf: &Config) -> Result<bool, Box<dyn Error>> {
    let sources = load(conf)?;
    if conf.dump_programs {
        for (i, source) in sources.iter().enumerate() {
            println!("# node {}:{}", i / conf.columns, i % conf.columns);
            println!("{}\n", source.trim_end());
        }
    }

    let mut harness = build_harness(conf, sources)?;
    harness.run(conf.max_ticks);
    let evaluation = harness.evaluation();

    for (port, values) in evaluation.outputs.iter() {
        match conf.suite.outputs.get(port) {
            Some(expected) if expected != values => {
                println!("output {}: {:?} (expected {:?})", port, values, expected)
            }
            _ => println!("output {}: {:?}", port, values),
        }
    }
    println!("ticks: {}", evaluation.statistics.ticks);
    for (port, backlog) in evaluation.statistics.input_backlog.iter() {
        if *backlog > 0 {
            warn!(port, backlog, "input values were never consumed");
        }
        println!("input {} backlog: {}", port, backlog);
    }

    let complete = harness.is_complete();
    println!("{}", if complete { "completed" } else { "budget exhausted" });

    if conf.dump_result {
        println!("Final state of the nodes:");
        for unit in harness.units() {
            println!("{}", unit);
        }
    }
    Ok(complete)
}

fn main() {
    init_logging();
    let conf = match parse_command_line_args() {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("Invalid arguments: {}", e);
            process::exit(2);
        }
    };
    match run(&conf) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Failed to run the grid: {}", e);
            process::exit(2);
        }
    }
}

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::interpreter::{Interpreter, InterpreterConfig, DEFAULT_MAX_CALL_DEPTH};
use rox::parser::Parser;
use rox::scanner::{tokenize, Scanner};
use rox::{Failure, Lox};

/// `sysexits.h` `EX_IOERR`.
const EXIT_IO_ERROR: i32 = 74;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to FILE (app.log if no FILE is given)
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "app.log"
    )]
    log: Option<PathBuf>,

    /// Calls nested deeper than this fail with "Stack overflow."
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses a program from a file and prints its AST as JSON
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file as UTF‑8 text
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

/// Reads the source for a subcommand, or exits: 0 without a path (nothing to
/// do), 74 if the file cannot be read.
fn source_or_exit(command: &str, filename: Option<PathBuf>) -> String {
    let Some(filename) = filename else {
        info!("No filepath provided for {}", command);
        println!("No input filepath was provided. Exiting...");
        std::process::exit(0);
    };

    match read_file(&filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_IO_ERROR);
        }
    }
}

fn init_logger(path: &Path) -> Result<()> {
    // Create or truncate the log file
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn report(failure: &Failure) -> ! {
    for diagnostic in failure.diagnostics() {
        eprintln!("{}", diagnostic);
    }

    debug!("Exiting with code {}", failure.exit_code());
    std::process::exit(failure.exit_code());
}

fn repl(config: InterpreterConfig) -> Result<()> {
    info!("Starting REPL");

    let mut lox = Lox::new(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush prompt")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        // Ctrl-D
        if read == 0 {
            println!();
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        if let Err(failure) = lox.run_line(&line) {
            for diagnostic in failure.diagnostics() {
                eprintln!("{}", diagnostic);
            }
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if let Some(path) = &args.log {
        init_logger(path)?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let config = InterpreterConfig {
        max_call_depth: args.max_call_depth,
    };

    match args.commands {
        Commands::Tokenize { filename } => {
            info!("Running Tokenize subcommand");
            let source = source_or_exit("Tokenize", filename);
            let mut tokenized = true;

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) => {
                        debug!("Scanned token: {}", token);
                        println!("{}", token);
                    }

                    Err(e) => {
                        tokenized = false;
                        debug!("Tokenization debug: {}", e);
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = source_or_exit("Parse", filename);
            let (tokens, lex_errors) = tokenize(&source);

            match Parser::new(tokens).parse() {
                Ok(program) if lex_errors.is_empty() => {
                    info!("Program parsed successfully");
                    println!("{}", AstPrinter::print(&program));
                }

                Ok(_) => report(&Failure::Static(lex_errors)),

                Err(parse_errors) => {
                    let mut errors = lex_errors;
                    errors.extend(parse_errors);
                    report(&Failure::Static(errors));
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");
            let source = source_or_exit("Evaluate", filename);
            let (tokens, lex_errors) = tokenize(&source);

            if !lex_errors.is_empty() {
                report(&Failure::Static(lex_errors));
            }

            let expr = match Parser::new(tokens).parse_expression() {
                Ok(expr) => expr,
                Err(errors) => report(&Failure::Static(errors)),
            };

            let mut interpreter = Interpreter::with_config(config);

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => report(&Failure::Runtime(e)),
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source = source_or_exit("Run", filename);

            debug!("Provided input:\n{}", source);

            let mut lox = Lox::new(config);

            match lox.run(&source) {
                Ok(()) => info!("Program executed successfully"),
                Err(failure) => report(&failure),
            }
        }

        Commands::Repl => repl(config)?,
    }

    Ok(())
}

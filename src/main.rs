use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::parser::Parser;
use lox::runner::{RunError, Runner};
use lox::scanner::{scan_tokens, Scanner};

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token instead of the plain format
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program; starts a prompt without a file
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("{:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'treelox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn report_and_exit(err: &RunError) -> ! {
    debug!("Run failed: {}", err);
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    for item in Scanner::new(source) {
        match item {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    Ok(())
}

/// Interactive prompt.  Each line runs against the same session; errors are
/// printed and the loop carries on.
fn repl() -> Result<()> {
    info!("Starting interactive prompt");

    let mut runner = Runner::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        match runner.run_line(&line) {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    println!();
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            tokenize(&source, json)?;
        }

        Commands::Parse { filename } => {
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            let (tokens, lex_errors) = scan_tokens(&source);

            match Parser::new(tokens).parse_expression() {
                Ok(expr) if lex_errors.is_empty() => println!("{}", AstPrinter::print(&expr)),
                Ok(_) => report_and_exit(&RunError::Static(lex_errors)),
                Err(parse_errors) => {
                    let mut errors = lex_errors;
                    errors.extend(parse_errors);
                    report_and_exit(&RunError::Static(errors));
                }
            }
        }

        Commands::Evaluate { filename } => {
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            let mut runner = Runner::new();

            match runner.evaluate(&source) {
                Ok(value) => println!("{}", value),
                Err(e) => report_and_exit(&e),
            }
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                let source = read_file(filename)?;
                let mut runner = Runner::new();

                if let Err(e) = runner.run(&source) {
                    report_and_exit(&e);
                }

                info!("Program executed successfully");
            }
            None => repl()?,
        },
    }

    Ok(())
}

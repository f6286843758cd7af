//! hornlog CLI - consult a program and run its queries.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use hornlog::{parse, Database, Program, Query, Term};

fn print_usage() {
    eprintln!("hornlog - embeddable Prolog-style logic engine");
    eprintln!();
    eprintln!("Usage: hornlog [options] <input.pl>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --ast         Print parsed clauses and exit");
    eprintln!("  --tokens      Print tokens and exit");
    eprintln!("  -h, --help    Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  hornlog program.pl           Load clauses, run ?- queries");
    eprintln!("  hornlog --ast program.pl     Print parsed clauses");
}

fn print_ast(program: &Program) {
    println!("=== Clauses ===");
    for (i, clause) in program.clauses.iter().enumerate() {
        println!("Clause {}: {}", i + 1, clause);
    }

    if !program.queries.is_empty() {
        println!("\n=== Queries ===");
        for query in &program.queries {
            println!("  ?- {}.", query.goal);
        }
    }
}

fn print_tokens(input: &str) {
    let mut lexer = hornlog::Lexer::new(input);
    println!("=== Tokens ===");
    loop {
        match lexer.next_token() {
            Ok(token) => {
                println!("{:?}", token);
                if token == hornlog::Token::Eof {
                    break;
                }
            }
            Err(e) => {
                eprintln!("Lexer error: {}", e);
                break;
            }
        }
    }
}

/// Run one query, printing a line of bindings per solution. Returns false
/// if the query faulted.
fn run_query(db: &Rc<Database>, query: &Query) -> bool {
    println!("?- {}.", query.goal);
    let mut any = false;
    for result in db.ask(query.goal.clone()) {
        match result {
            Ok(solution) => {
                any = true;
                if query.vars.is_empty() {
                    println!("true.");
                    // Without variables there is nothing more to show.
                    break;
                }
                let bindings: Vec<String> = query
                    .vars
                    .iter()
                    .map(|(name, var)| {
                        format!("{} = {}", name, solution.resolve(&Term::Var(var.clone())))
                    })
                    .collect();
                println!("{}.", bindings.join(", "));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return false;
            }
        }
    }
    if !any {
        println!("false.");
    }
    true
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let mut input_file: Option<PathBuf> = None;
    let mut print_ast_flag = false;
    let mut print_tokens_flag = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "--ast" => {
                print_ast_flag = true;
            }
            "--tokens" => {
                print_tokens_flag = true;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                return ExitCode::from(1);
            }
            _ => {
                input_file = Some(PathBuf::from(&args[i]));
            }
        }
        i += 1;
    }

    let input_file = match input_file {
        Some(f) => f,
        None => {
            eprintln!("Error: No input file specified");
            print_usage();
            return ExitCode::from(1);
        }
    };

    // Read input file
    let input = match fs::read_to_string(&input_file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_file.display(), e);
            return ExitCode::from(1);
        }
    };

    // Print tokens if requested
    if print_tokens_flag {
        print_tokens(&input);
        return ExitCode::SUCCESS;
    }

    // Parse the program
    let program = match parse(&input) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return ExitCode::from(1);
        }
    };

    // Print AST if requested
    if print_ast_flag {
        print_ast(&program);
        return ExitCode::SUCCESS;
    }

    // Load the clauses
    let mut db = Database::with_builtins();
    for clause in program.clauses {
        if let Err(e) = db.tell(clause) {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    }

    // Run the queries
    let db = Rc::new(db);
    for query in &program.queries {
        if !run_query(&db, query) {
            return ExitCode::from(1);
        }
    }

    ExitCode::SUCCESS
}

use std::fs;
use clap::{Parser, Subcommand};

use simplescript::backends::BackendType;
use simplescript::parser;

#[derive(Parser)]
#[command(name = "simplescript")]
#[command(about = "SimpleScript front end: source to three-address code", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Компилирует исходник в выбранное представление
    Compile {
        /// Исходник
        input: String,

        /// Целевое представление
        #[arg(short, long, default_value = "tac")]
        target: String,

        /// Выходной файл
        #[arg(short, long)]
        output: Option<String>,

        /// Показать ast
        #[arg(long)]
        show_ast: bool,

        /// Печатать листинг в stdout вместо файла
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Показать токены и ast без компиляции
    Parse {
        /// Исходник
        input: String,
    },

    /// Список поддерживаемых представлений
    Targets,
}

/// Автоматическое имя: input.ssc -> input.tac
fn default_output_path(input: &str, backend_type: BackendType) -> String {
    let base_name = input.strip_suffix(".ssc").unwrap_or(input);
    format!("{}.{}", base_name, backend_type.extension())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { input, target, output, show_ast, stdout } => {
            let Some(backend_type) = BackendType::from_name(&target) else {
                eprintln!("Unknown target: {}", target);
                return Ok(());
            };

            let source = fs::read_to_string(&input)?;
            let program = parser::parse(&source)?;

            if show_ast {
                // при --stdout листинг должен остаться чистым
                if stdout {
                    eprintln!("=== AST ===");
                    eprintln!("{:#?}", program);
                } else {
                    println!("=== AST ===");
                    println!("{:#?}", program);
                }
            }

            let mut backend = backend_type.create();
            let listing = backend.compile(&program)?;

            if stdout {
                println!("{}", listing);
                return Ok(());
            }

            println!("Compiling {} for {}...", input, target);

            let output_path = match output {
                Some(path) => path,
                None => default_output_path(&input, backend_type),
            };

            fs::write(&output_path, format!("{}\n", listing))?;
            println!("Compiled to: {}", output_path);
            println!("Instructions: {}", listing.lines().count());

            println!("Listing:");
            for (i, line) in listing.lines().enumerate() {
                println!("  {:4}: {}", i + 1, line);
            }
        }
        Commands::Parse { input } => {
            println!("Parsing {}...", input);

            let source = fs::read_to_string(&input)?;

            println!("=== SOURCE ===");
            println!("{}", source);
            println!("=== TOKENS ===");

            for token in parser::lexer::tokenize(&source) {
                match token.text() {
                    Some(text) => println!("{:<10} {:<12} {}", token.kind, text, token.span),
                    None => println!("{:<10} {:<12} {}", token.kind, "", token.span),
                }
            }

            println!("=== AST ===");
            match parser::parse(&source) {
                Ok(program) => {
                    println!("{:#?}", program);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                }
            }
        }
        Commands::Targets => {
            println!("Supported targets:");
            for backend in BackendType::all() {
                println!("  {:8} - {}", backend.name(), backend.description());
            }
        }
    }

    Ok(())
}

use c2cpp_common::{Language, SourceFile, Span};
use c2cpp_config::TranslatorConfig;
use c2cpp_core::Catalog;
use c2cpp_driver::Driver;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "c2cpp")]
#[command(author, version, about = "Translate C programs into idiomatic C++")]
struct Cli {
    /// Configuration file (defaults to c2cpp.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate C files to C++
    Translate {
        /// C source files to translate
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path (single input only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the translation instead of writing it
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Check that files translate without writing anything
    Check {
        /// C source files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the catalog or translation of a source file
    Dump {
        /// Source file to dump
        file: PathBuf,

        /// What to dump
        #[arg(long, default_value = "catalog")]
        format: DumpFormat,
    },

    /// Read C code from stdin until a line containing only DONE
    Interactive {
        /// Also save the translation to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DumpFormat {
    /// Dump the source catalog
    Catalog,
    /// Dump the translated C++
    Cpp,
}

/// Pick the driver for a file: explicit `--config`, else `c2cpp.toml` in
/// the file's directory.
fn driver_for(config: Option<&Path>, file: Option<&Path>) -> Result<Driver> {
    if let Some(path) = config {
        tracing::debug!(config = %path.display(), "using explicit configuration");
        let config = TranslatorConfig::from_file(path)
            .map_err(|e| miette::miette!("Failed to load {}: {}", path.display(), e))?;
        return Ok(Driver::with_config(config));
    }
    let dir = file
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Driver::for_directory(dir)
}

fn print_catalog(source: &SourceFile, catalog: &Catalog) {
    let heading = |span: Span| {
        let at = source.location(span);
        format!("line {}: {}", at.line, source.line_text(at.line).trim())
    };

    println!("catalog of {} ({} lines)", source.name(), source.line_count());
    println!("includes:");
    for include in &catalog.includes {
        let (open, close) = if include.quoted { ('"', '"') } else { ('<', '>') };
        println!("  {}{}{}", open, include.name, close);
    }
    println!("constants:");
    for define in catalog.defines.values() {
        println!("  {} = {} ({:?})", define.name, define.value, define.kind());
    }
    println!("directives: {}", catalog.directives.len());
    println!("structs:");
    for def in catalog.structs.values() {
        let alias = def
            .alias
            .as_ref()
            .map(|a| format!(", alias {}", a))
            .unwrap_or_default();
        println!(
            "  {} at {} ({} fields{})",
            def.name,
            source.location(def.span),
            def.fields.len(),
            alias
        );
        for method in &def.methods {
            println!("    {} at {}", method.name, heading(method.span));
        }
    }
    println!("functions:");
    for function in &catalog.functions {
        println!("  {} at {}", function.name, heading(function.span));
    }
    println!("prototypes: {}", catalog.prototypes.len());
    println!("type declarations: {}", catalog.type_decls.len());
    println!("globals:");
    for global in &catalog.globals {
        println!("  {}", global);
    }
}

/// Read stdin up to a `DONE` line or end of input.
fn read_interactive_source() -> Result<String> {
    eprintln!("Enter C code, then a line containing only DONE:");
    let mut source = String::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.into_diagnostic()?;
        if line.trim() == "DONE" {
            break;
        }
        source.push_str(&line);
        source.push('\n');
    }
    Ok(source)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Translate {
            files,
            output,
            stdout,
        } => {
            if output.is_some() && files.len() > 1 {
                return Err(miette::miette!("--output takes a single input file"));
            }

            for file in &files {
                let driver = driver_for(config, Some(file.as_path()))?;
                if stdout {
                    print!("{}", driver.translate_file(file)?);
                    continue;
                }
                let output_path = output
                    .clone()
                    .unwrap_or_else(|| Driver::output_path_for(file));
                driver.translate_to_file(file, &output_path)?;
                println!("Translated {} -> {}", file.display(), output_path.display());
            }
        }

        Commands::Check { files } => {
            for file in &files {
                let driver = driver_for(config, Some(file.as_path()))?;
                match driver.translate_file(file) {
                    Ok(_) => println!("{}: OK", file.display()),
                    Err(e) => {
                        eprintln!("{}: Error", file.display());
                        return Err(e);
                    }
                }
            }
        }

        Commands::Dump { file, format } => {
            let driver = driver_for(config, Some(file.as_path()))?;

            match format {
                DumpFormat::Catalog => {
                    let (source, catalog) = driver.catalog_for_file(&file)?;
                    print_catalog(&source, &catalog);
                }
                DumpFormat::Cpp => {
                    print!("{}", driver.translate_file(&file)?);
                }
            }
        }

        Commands::Interactive { save } => {
            let driver = driver_for(config, None)?;
            let source = read_interactive_source()?;
            let translated = driver.translate_source(&SourceFile::new(
                PathBuf::from("<stdin>"),
                source,
                Language::C,
            ))?;

            println!("\nTranslated C++ code:");
            println!("{}", "=".repeat(50));
            print!("{}", translated);
            println!("{}", "=".repeat(50));
            std::io::stdout().flush().into_diagnostic()?;

            if let Some(path) = save {
                let path = if path.extension().is_some_and(|e| e == "cpp") {
                    path
                } else {
                    let mut name = path.into_os_string();
                    name.push(".cpp");
                    PathBuf::from(name)
                };
                std::fs::write(&path, &translated)
                    .map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}

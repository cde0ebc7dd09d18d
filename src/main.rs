//! Command-line interface for xsdcore

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use xsdcore::{Diagnostic, Error, Limits, SchemaSet, SchemaSetLoader};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdcore")]
#[command(author, version, about = "XML Schema 1.0 loading and resolution tool", long_about = None)]
struct Cli {
    /// Use the strict resource limits
    #[arg(long, global = true)]
    strict_limits: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and resolve a schema, then print its component counts
    Inspect {
        /// Path to the root XSD document
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// List global elements and types by name
        #[arg(short, long)]
        names: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Load and resolve a schema, reporting every diagnostic
    Check {
        /// Path to the root XSD document
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output diagnostics as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    init_tracing();
    let cli = Cli::parse();
    let limits = if cli.strict_limits {
        Limits::strict()
    } else {
        Limits::default()
    };

    let code = match cli.command {
        Commands::Inspect { schema, names, json } => cmd_inspect(&schema, limits, names, json),
        Commands::Check { schema, json } => cmd_check(&schema, limits, json),
    };
    std::process::exit(code);
}

#[cfg(feature = "cli")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn build(schema: &Path, limits: Limits) -> Result<Arc<SchemaSet>, Error> {
    SchemaSetLoader::filesystem()
        .with_limits(limits)
        .build(&schema.to_string_lossy())
}

#[cfg(feature = "cli")]
fn cmd_inspect(schema: &Path, limits: Limits, names: bool, json: bool) -> i32 {
    let set = match build(schema, limits) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let counts = set.counts();

    if json {
        let mut output = serde_json::json!({
            "schema": schema.to_string_lossy(),
            "counts": counts,
        });
        if names {
            output["elements"] = set.elements().map(|(q, _)| q.to_string()).collect();
            output["types"] = set.types().map(|(q, _)| q.to_string()).collect();
        }
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        return 0;
    }

    println!("xsdcore v{}", xsdcore::VERSION);
    println!();
    println!("Schema: {}", schema.display());
    println!("  Documents:            {}", counts.documents);
    println!("  Types:                {}", counts.types);
    println!("  Elements:             {}", counts.elements);
    println!("  Attributes:           {}", counts.attributes);
    println!("  Model groups:         {}", counts.groups);
    println!("  Attribute groups:     {}", counts.attribute_groups);
    println!("  Notations:            {}", counts.notations);
    println!("  Identity constraints: {}", counts.identity_constraints);
    println!("  Substitution groups:  {}", counts.substitution_groups);

    if names {
        println!("\n=== Global Elements ===");
        for (qname, element) in set.elements() {
            let type_name = set
                .element_type(element)
                .and_then(|t| t.name())
                .map(|n| n.to_string())
                .unwrap_or_else(|| "anonymous".to_string());
            println!("  {} : {}", qname, type_name);
        }
        println!("\n=== Global Types ===");
        for (qname, definition) in set.types() {
            let kind = if definition.is_simple() { "simple" } else { "complex" };
            println!("  {} ({})", qname, kind);
        }
    }
    0
}

#[cfg(feature = "cli")]
fn cmd_check(schema: &Path, limits: Limits, json: bool) -> i32 {
    let diagnostics: Vec<Diagnostic> = match build(schema, limits) {
        Ok(_) => Vec::new(),
        Err(e) => e.diagnostics(),
    };

    if json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 2;
            }
        }
    } else if diagnostics.is_empty() {
        println!("{}: ok", schema.display());
    } else {
        for diagnostic in &diagnostics {
            println!("{}", diagnostic);
        }
        println!("{} error(s)", diagnostics.len());
    }

    if diagnostics.is_empty() {
        0
    } else {
        1
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use polyglot::compiler::{compile, compile_set, Emitter, RustEmitter, RustOptions, Schema};
use polyglot::{plans_to_json, CompileError, CompiledSchema, ImportTable};

#[derive(Parser)]
#[command(name = "polyglotc")]
#[command(about = "Compile schema IR documents into polyglot codec plans or Rust code", long_about = None)]
struct Cli {
    /// Log every pipeline stage (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// JSON IR document of the schema to compile
    #[arg(short, long)]
    input: PathBuf,

    /// JSON IR document of a schema the input imports (repeatable)
    #[arg(long = "import")]
    imports: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the codec plans and mapping decisions as JSON
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a Rust module implementing the codecs
    GenRust {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Crate generated code reaches the runtime through
        #[arg(long, default_value = "polyglot")]
        runtime_crate: String,

        /// Derive serde traits on generated types
        #[arg(long)]
        serde: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_schema(path: &Path) -> Result<Schema, CompileError> {
    let text = fs::read_to_string(path)?;
    Schema::from_json(&text)
}

/// Compiles the imports, then the input against them.
fn load(args: &InputArgs) -> Result<CompiledSchema, CompileError> {
    let imports = args.imports.iter().map(|path| read_schema(path)).collect::<Result<Vec<_>, _>>()?;
    let mut table = ImportTable::new();
    for (name, result) in compile_set(&imports, &mut table)? {
        result?;
        debug!(schema = %name, "import compiled");
    }

    let schema = read_schema(&args.input)?;
    compile(&schema, &table)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), CompileError> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text)?;
            info!("wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn main() -> Result<(), CompileError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Plan { input, output } => {
            let compiled = load(input)?;
            let json = plans_to_json(&compiled)? + "\n";
            write_output(output.as_deref(), &json)
        }

        Commands::GenRust { input, output, runtime_crate, serde } => {
            let compiled = load(input)?;
            let emitter = RustEmitter::new(RustOptions { runtime_crate: runtime_crate.clone(), serde: *serde });
            let rust_code = emitter.emit(&compiled)?;
            let path = output.as_ref().map(|dir| dir.join(emitter.file_name(&compiled)));
            write_output(path.as_deref(), &rust_code)
        }
    }
}

use clap::{Parser, Subcommand};
use foundry_import::config::{self, ImportConfig};
use foundry_import::import::{self, ImportSources};
use foundry_import::output;
use foundry_import::render::HtmdRenderer;
use foundry_import::vault::DiskVault;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Flags that override `import.toml` for a single run.
#[derive(clap::Args, Clone, Default)]
struct OverrideArgs {
    /// Folder inside the vault that receives the import
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Foundry data directory that asset paths are relative to
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Write a note into every imported folder
    #[arg(long)]
    folder_notes: bool,
}

impl OverrideArgs {
    fn apply(self, mut config: ImportConfig) -> Result<ImportConfig, config::ConfigError> {
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if let Some(data_root) = self.data_root {
            config.data_root = data_root;
        }
        if self.folder_notes {
            config.folder_notes = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser)]
#[command(name = "foundry-import")]
#[command(about = "Convert Foundry VTT journal exports into a markdown vault")]
#[command(long_about = "\
Convert Foundry VTT journal exports into a markdown vault

Reads the folder and journal entry exports of a world (one JSON record per
line) and writes one markdown note per entry, nested the way the journal
folders are nested.

Output structure:

  <vault>/<destination>/
  ├── Lore/                        # Journal folder
  │   ├── Lore.md                  # Folder note (--folder-notes)
  │   └── Intro.md                 # Entry with no pages, or exactly one
  ├── Atlas/                       # Entry with several pages
  │   ├── Atlas.md                 # Table of contents linking every page
  │   ├── North.md
  │   └── South.md
  └── assets/                      # Images and media copied from the data root
      └── map.png

References between entries (@JournalEntry[id]{label}, @UUID[JournalEntry.id])
become [[wiki links]]; embedded images become ![[embeds]].

Run 'foundry-import gen-config' to generate a documented import.toml.")]
#[command(version)]
struct Cli {
    /// Folder export (one JSON folder record per line)
    #[arg(long, default_value = "folders.db", global = true)]
    folders: PathBuf,

    /// Journal entry export (one JSON entry record per line)
    #[arg(long, default_value = "journal.db", global = true)]
    journal: PathBuf,

    /// Vault root directory
    #[arg(long, default_value = ".", global = true)]
    vault: PathBuf,

    /// Config file (defaults to ./import.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import the exports into the vault
    Import(OverrideArgs),
    /// Show what an import would write, without writing anything
    Check(OverrideArgs),
    /// Print a stock import.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let sources = ImportSources {
        folders: cli.folders.clone(),
        journal: cli.journal.clone(),
    };

    match cli.command {
        Command::Import(overrides) => {
            let config = overrides.apply(config::load_config(cli.config.as_deref())?)?;
            let vault = DiskVault::new(&cli.vault);
            let renderer = HtmdRenderer::new();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_import_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = import::run_import(&config, &sources, &vault, &renderer, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let summary = result?;
            output::print_summary(&summary);
            if summary.has_problems() {
                eprintln!("Import finished with problems; see the messages above");
            }
        }
        Command::Check(overrides) => {
            let config = overrides.apply(config::load_config(cli.config.as_deref())?)?;
            println!("==> Checking {}", sources.journal.display());
            let plan = import::plan(&config, &sources, &HtmdRenderer::new())?;
            output::print_plan(&plan);
            println!("==> Nothing written");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Send diagnostics to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

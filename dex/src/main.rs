//! Creature dex command-line application.
//!
//! The first run downloads every collection into the cache directory; later
//! runs start from the local snapshots.
//!
//! ```bash
//! cargo run -p dex -- search --primary fire --generation I
//! cargo run -p dex -- show rattata alola
//! cargo run -p dex -- weakness grass poison
//! cargo run -p dex -- team my.team
//! ```

mod render;

use clap::{Args, Parser, Subcommand};
use dex_core::prefs::PREFS_FILE;
use dex_core::{
    CreatureFilter, DexConfig, Direction, Mode, Pokedex, Preferences, SortOrder, StartupError, Team,
};
use log::error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dex", about = "Browse creatures and type matchups")]
struct Cli {
    /// Directory holding the snapshots and saved filters
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// API root to download from
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> DexConfig {
        let mut config = DexConfig::from_env();
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(api) = &self.api {
            config = config.with_api_base(api);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List creatures matching the filters
    Search(SearchArgs),

    /// Show one creature in detail
    Show {
        #[arg(required = true)]
        name: Vec<String>,
    },

    /// Type matchups of one or more types
    Weakness {
        #[arg(required = true)]
        types: Vec<String>,

        /// Score how the types hit others instead of how they are hit
        #[arg(long)]
        offense: bool,
    },

    /// Matchups of a saved team file
    Team { file: PathBuf },

    /// Discard the local data and download everything again
    Refresh,
}

#[derive(Args, Default)]
struct SearchArgs {
    /// Name or part of a name; close misspellings also match
    name: Option<String>,

    #[arg(long)]
    primary: Option<String>,

    #[arg(long)]
    secondary: Option<String>,

    /// Roman numeral, e.g. IV
    #[arg(long)]
    generation: Option<String>,

    /// Sort by name instead of dex number
    #[arg(long)]
    by_name: bool,

    /// Start from the filters of the previous search
    #[arg(long)]
    last: bool,

    /// Largest edit distance still counted as a name match
    #[arg(long)]
    fuzzy: Option<usize>,
}

impl SearchArgs {
    /// Apply the given flags on top of `base`.
    fn into_filter(self, base: CreatureFilter) -> CreatureFilter {
        let mut filter = base;
        if let Some(name) = self.name {
            filter = filter.with_name(name);
        }
        if let Some(primary) = self.primary {
            filter = filter.with_primary(primary);
        }
        if let Some(secondary) = self.secondary {
            filter = filter.with_secondary(secondary);
        }
        if let Some(generation) = self.generation {
            filter = filter.with_generation(generation);
        }
        if self.by_name {
            filter = filter.sorted_by(SortOrder::Name);
        }
        if let Some(threshold) = self.fuzzy {
            filter = filter.with_fuzzy_threshold(threshold);
        }
        filter
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config();

    let opened = match cli.command {
        Commands::Refresh => Pokedex::refresh(&config).await,
        _ => Pokedex::open(&config).await,
    };
    let dex = match opened {
        Ok(dex) => dex,
        Err(e) => exit_on_startup_error(e),
    };

    let prefs_path = config.cache_dir.join(PREFS_FILE);
    match cli.command {
        Commands::Search(args) => {
            let base = if args.last {
                saved_prefs(&dex, &prefs_path).await.filter
            } else {
                CreatureFilter::default()
            };
            let filter = args.into_filter(base);

            print!("{}", render::creature_table(&dex, &dex.filter_creatures(&filter)));
            Preferences::new(Mode::Creatures, filter).save(&prefs_path).await?;
        }
        Commands::Show { name } => {
            let name = name.join(" ");
            let creature = dex
                .creature(&name)
                .ok_or_else(|| format!("No creature named '{name}'"))?;
            print!("{}", render::creature_detail(&dex, creature));
        }
        Commands::Weakness { types, offense } => {
            let direction = if offense { Direction::Offense } else { Direction::Defense };
            let result = dex.classify(&types, direction);
            for name in &result.unknown {
                eprintln!("Unknown type '{name}'");
            }
            print!("{}", render::matchups(direction, &result));

            let mut prefs = saved_prefs(&dex, &prefs_path).await;
            prefs.mode = Mode::Weakness;
            prefs.save(&prefs_path).await?;
        }
        Commands::Team { file } => {
            let team = Team::load(&file).await?;
            match dex.team_report(&team) {
                Some(report) => print!("{}", render::team_report(&report)),
                None => println!("The team in {} has no types.", file.display()),
            }
        }
        Commands::Refresh => {
            println!(
                "Downloaded {} creatures, {} moves, {} abilities and {} types.",
                dex.creatures().len(),
                dex.moves().len(),
                dex.abilities().len(),
                dex.types().len()
            );
        }
    }

    Ok(())
}

async fn saved_prefs(dex: &Pokedex, path: &Path) -> Preferences {
    Preferences::load(path)
        .await
        .map(|prefs| dex.sanitize(prefs))
        .unwrap_or_default()
}

fn exit_on_startup_error(err: StartupError) -> ! {
    error!("Startup failed: {err}");
    eprintln!("Error: {}", err.user_message());
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["dex", "--cache-dir", "/tmp/dex", "weakness", "grass", "poison", "--offense"]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/dex")));
        match cli.command {
            Commands::Weakness { types, offense } => {
                assert_eq!(types, vec!["grass", "poison"]);
                assert!(offense);
            }
            _ => panic!("expected weakness"),
        }

        let cli = Cli::parse_from(["dex", "show", "rattata", "alola"]);
        assert!(matches!(cli.command, Commands::Show { name } if name == ["rattata", "alola"]));
    }

    #[test]
    fn test_search_flags_override_saved_filter() {
        let saved = CreatureFilter::new().with_name("char").with_primary("Fire").with_generation("I");
        let args = SearchArgs {
            primary: Some("water".to_string()),
            by_name: true,
            ..Default::default()
        };

        let filter = args.into_filter(saved);
        assert_eq!(filter.name.as_deref(), Some("char"));
        assert_eq!(filter.primary.as_deref(), Some("Water"));
        assert_eq!(filter.generation.as_deref(), Some("I"));
        assert_eq!(filter.order, SortOrder::Name);
    }

    #[test]
    fn test_blank_flag_clears_saved_filter() {
        let saved = CreatureFilter::new().with_secondary("Flying");
        let args = SearchArgs {
            secondary: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(args.into_filter(saved).secondary, None);
    }
}

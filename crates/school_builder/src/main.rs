//! School Builder CLI
//!
//! school.txt reclassification, merge review, JSON export and static bundling

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use school_core::{Classifier, DatabaseFormat, Stage};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "school_builder")]
#[command(about = "Maintain the school database: classify, merge, export and bundle", long_about = None)]
struct Cli {
    /// Only print warnings and errors on stderr
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// province,city,name[,alias...]
    Plain,
    /// province,city,stage1/stage2,name[,alias...]
    Staged,
}

#[cfg(feature = "cli")]
impl From<Format> for DatabaseFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Plain => DatabaseFormat::Plain,
            Format::Staged => DatabaseFormat::Staged,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Recompute the stage column of every school
    Reclassify {
        /// Input database
        #[arg(long, default_value = "data/school.txt")]
        r#in: PathBuf,

        /// Output database (staged format)
        #[arg(long, default_value = "data/school_new.txt")]
        out: PathBuf,

        /// Column layout of the input
        #[arg(long, value_enum, default_value = "plain")]
        format: Format,

        /// Classification rules (YAML); embedded rules when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Apply reviewed merge commands
    Merge {
        /// Input database
        #[arg(long, default_value = "data/school.txt")]
        r#in: PathBuf,

        /// Merge command file
        #[arg(long, default_value = "dist/merge_preview.txt")]
        commands: PathBuf,

        /// Output database
        #[arg(long, default_value = "data/school_new.txt")]
        out: PathBuf,

        /// Column layout of the input
        #[arg(long, value_enum, default_value = "plain")]
        format: Format,
    },

    /// Classify school names given on the command line
    Classify {
        /// School names
        #[arg(required = true)]
        names: Vec<String>,

        /// Classification rules (YAML); embedded rules when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Export classified schools as JSON for the static bundle
    Export {
        /// Input database
        #[arg(long, default_value = "data/school.txt")]
        r#in: PathBuf,

        /// Output JSON
        #[arg(long, default_value = "dist/school.json")]
        out: PathBuf,

        /// Column layout of the input
        #[arg(long, value_enum, default_value = "plain")]
        format: Format,

        /// Classification rules (YAML); embedded rules when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Bundle static JSON assets and classified schools
    Bundle {
        /// Directory of static JSON assets
        #[arg(long, default_value = "static")]
        static_dir: PathBuf,

        /// Classified schools JSON
        #[arg(long, default_value = "dist/school.json")]
        schools: PathBuf,

        /// Output bundle
        #[arg(long, default_value = "dist/static.json")]
        out: PathBuf,

        /// Output manifest
        #[arg(long, default_value = "dist/static.info.json")]
        info: PathBuf,

        /// Keep the classified schools file after bundling
        #[arg(long, default_value = "false")]
        keep_schools: bool,
    },

    /// Verify a bundle against its manifest
    Verify {
        /// Bundle file
        #[arg(long, default_value = "dist/static.json")]
        bundle: PathBuf,

        /// Manifest file
        #[arg(long, default_value = "dist/static.info.json")]
        info: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Reclassify {
            r#in,
            out,
            format,
            rules,
        } => {
            println!("🔨 Reclassifying schools...");
            println!("   Input:  {}", r#in.display());
            println!("   Output: {}", out.display());

            let ruleset = school_builder::load_ruleset(rules.as_deref())?;
            let report = school_builder::reclassify_file(&r#in, format.into(), &out, &ruleset)?;

            println!("\n✅ Reclassified {} schools", report.records);
            println!("   Changed: {}", report.changed);
            println!("   Unknown: {}", report.unknown.len());
            println!("   Unknown provinces: {}", report.unknown_provinces);
            for (stage, count) in &report.stage_counts {
                println!("   {:<6} {}", stage.label(), count);
            }
        }

        Commands::Merge {
            r#in,
            commands,
            out,
            format,
        } => {
            println!("🔨 Applying merge commands...");
            println!("   Input:    {}", r#in.display());
            println!("   Commands: {}", commands.display());
            println!("   Output:   {}", out.display());

            let summary = school_builder::merge_file(&r#in, format.into(), &commands, &out)?;

            println!("\n✅ Merge finished, results saved to {}", out.display());
            println!("   Aliases bound: {}", summary.bound);
            println!("   Promoted:      {}", summary.promoted);
            println!("   Created:       {}", summary.created);
            println!("   Split:         {}", summary.split);
        }

        Commands::Classify { names, rules } => {
            let ruleset = school_builder::load_ruleset(rules.as_deref())?;
            let classifier = Classifier::new(&ruleset);
            for name in names {
                let stages = classifier.classify(&name);
                let labels: Vec<&str> = stages.iter().map(Stage::label).collect();
                println!("{}\t{}", name, labels.join("/"));
            }
        }

        Commands::Export {
            r#in,
            out,
            format,
            rules,
        } => {
            println!("🔨 Exporting classified schools...");
            println!("   Input:  {}", r#in.display());
            println!("   Output: {}", out.display());

            let ruleset = school_builder::load_ruleset(rules.as_deref())?;
            let count = school_builder::export_schools(&r#in, format.into(), &out, &ruleset)?;

            println!("\n✅ Exported {} schools", count);
        }

        Commands::Bundle {
            static_dir,
            schools,
            out,
            info,
            keep_schools,
        } => {
            println!("🔨 Building static bundle...");
            println!("   Static:  {}", static_dir.display());
            println!("   Schools: {}", schools.display());
            println!("   Output:  {}", out.display());

            let paths = school_builder::BundlePaths {
                static_dir: &static_dir,
                schools: &schools,
                output: &out,
                info: &info,
            };
            let meta = school_builder::build_bundle(&paths, keep_schools)?;

            println!("\n✅ Bundle built successfully!");
            println!(
                "   Size:     {} bytes ({:.2} KB)",
                meta.size,
                meta.size as f64 / 1024.0
            );
            println!("   SHA-512:  {}", meta.sha512);
            println!("\n📄 Manifest saved to: {}", info.display());
        }

        Commands::Verify { bundle, info } => {
            println!("🔍 Verifying bundle integrity...");
            if school_builder::verify_bundle(&bundle, &info)? {
                println!("✅ Bundle verification passed");
            } else {
                anyhow::bail!("❌ Bundle verification failed - checksum mismatch!")
            }
        }
    }

    Ok(())
}

/// Diagnostics go to stderr, filtered by `RUST_LOG`
#[cfg(feature = "cli")]
fn init_tracing(quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("school_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}

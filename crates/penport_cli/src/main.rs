//! `penport` command line entry point.
//!
//! # Responsibility
//! - Export templates, project types or projects from a SQLite database into
//!   a ZIP archive.
//! - Import such an archive into a SQLite database in one transaction.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use penport_core::{
    core_version, default_log_level, init_logging, open_db, ArchiveBundle, ArchiveKind,
    ArchiveOptions, ArchiveService, ImportedRoot, SqliteArchiveStore,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// SQLite database holding the archive store.
    #[clap(long, global = true, default_value = "penport.db")]
    db: PathBuf,
    /// Absolute directory for rolling log files; logging is off without it.
    #[clap(long, global = true)]
    log_dir: Option<String>,
    #[clap(long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the given roots into a new archive.
    Export {
        #[clap(value_enum)]
        kind: KindArg,
        #[clap(long)]
        out: PathBuf,
        /// Leave project notebooks and project files out.
        #[clap(long)]
        shareable: bool,
        #[clap(required = true)]
        ids: Vec<Uuid>,
    },
    /// Import every root of an archive.
    Import {
        #[clap(value_enum)]
        kind: KindArg,
        archive: PathBuf,
        /// User recorded as uploader of imported attachments.
        #[clap(long)]
        uploaded_by: Option<Uuid>,
        /// Skip project notebooks and project files.
        #[clap(long)]
        shareable: bool,
    },
    /// Print the core version.
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Templates,
    ProjectTypes,
    Projects,
}

impl From<KindArg> for ArchiveKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Templates => Self::Templates,
            KindArg::ProjectTypes => Self::ProjectTypes,
            KindArg::Projects => Self::Projects,
        }
    }
}

fn log_level(cli: &Cli) -> &str {
    cli.log_level.as_deref().unwrap_or(default_log_level())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(log_level(&cli), log_dir).context("failed to initialize logging")?;
    }

    if let Command::Version = cli.command {
        println!("penport_core version={}", core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let store = SqliteArchiveStore::try_new(&conn)
        .with_context(|| format!("`{}` is not an archive store", cli.db.display()))?;
    let service = ArchiveService::new(store);

    match cli.command {
        Command::Export {
            kind,
            out,
            shareable,
            ids,
        } => {
            let options = options_for(shareable);
            let bundle = match ArchiveKind::from(kind) {
                ArchiveKind::Templates => service.export_templates(&ids, options),
                ArchiveKind::ProjectTypes => service.export_project_types(&ids, options),
                ArchiveKind::Projects => service.export_projects(&ids, options),
            }
            .context("export failed")?;
            let bytes = bundle.to_zip_bytes().context("failed to encode archive")?;
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write `{}`", out.display()))?;
            println!(
                "exported {} {} to {}",
                ids.len(),
                ArchiveKind::from(kind),
                out.display()
            );
        }
        Command::Import {
            kind,
            archive,
            uploaded_by,
            shareable,
        } => {
            let bytes = std::fs::read(&archive)
                .with_context(|| format!("failed to read `{}`", archive.display()))?;
            let bundle = ArchiveBundle::from_zip_bytes(&bytes)
                .with_context(|| format!("`{}` is not a readable archive", archive.display()))?;
            let mut options = options_for(shareable);
            if let Some(user_id) = uploaded_by {
                options = options.with_uploaded_by(user_id);
            }
            let roots = service
                .import_archive(kind.into(), &bundle, options)
                .context("import failed")?;
            for root in roots {
                println!("{}", describe_root(root));
            }
        }
        Command::Version => {}
    }
    Ok(())
}

fn options_for(shareable: bool) -> ArchiveOptions {
    if shareable {
        ArchiveOptions::shareable()
    } else {
        ArchiveOptions::default()
    }
}

fn describe_root(root: ImportedRoot) -> String {
    match root {
        ImportedRoot::Template(id) => format!("template {id}"),
        ImportedRoot::ProjectType(id) => format!("project_type {id}"),
        ImportedRoot::Project(id) => format!("project {id}"),
    }
}

use crate::app::Args;
use anyhow::Result;
use grip_config::Config;
use grip_core::DirectoryReader;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Stdout,
    File(PathBuf),
}

/// `-` or stdin input exports to stdout, otherwise to `out_filename` or
/// `<readme without extension>.html` relative to the working directory.
fn export_target(readme: Option<&Path>, cwd: &Path, out_filename: Option<&str>) -> Target {
    match (out_filename, readme) {
        (Some("-"), _) | (None, None) => Target::Stdout,
        (Some(out_filename), _) => Target::File(PathBuf::from(out_filename)),
        (None, Some(readme)) => {
            let relative = readme.strip_prefix(cwd).unwrap_or(readme);
            Target::File(relative.with_extension("html"))
        }
    }
}

/// Renders the Readme to a standalone HTML file.
pub async fn run(args: &Args, config: &Config) -> Result<()> {
    let readme = if args.is_stdin() {
        None
    } else {
        let reader = DirectoryReader::new(args.path.as_deref().map(Path::new), false)?;
        Some(reader.root_filename().to_path_buf())
    };

    let cwd = std::env::current_dir()?;
    let target = export_target(readme.as_deref(), &cwd, args.address.as_deref());

    let quiet = args.quiet || config.quiet;
    if let Target::File(out_filename) = &target {
        if !quiet {
            eprintln!("Exporting to {}", out_filename.display());
        }
    }

    let reader = args.reader(args.path.as_deref())?;
    let grip = args.grip(config, reader, false, !args.no_inline)?;
    let page = grip.render(None).await?;

    match target {
        Target::Stdout => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            match writeln!(lock, "{page}") {
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                result => result?,
            }
        }
        Target::File(out_filename) => tokio::fs::write(out_filename, page).await?,
    }

    Ok(())
}

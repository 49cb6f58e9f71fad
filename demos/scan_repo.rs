//! Scan an ebuild repository and print one line per result.
//!
//! Usage:
//! ```bash
//! cargo run --example scan_repo -- /var/db/repos/gentoo --check ProfilesCheck
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use portage_lint::{CheckKind, ScanOptions, Scanner, Severity};
use tracing_subscriber::EnvFilter;

/// Run portage-lint checks over a repository
#[derive(Parser, Debug)]
#[command(name = "scan_repo", about, long_about = None)]
struct Cli {
    /// Repository to scan
    repo: PathBuf,

    /// Master repository (can be specified multiple times)
    #[arg(short, long)]
    master: Vec<PathBuf>,

    /// Directory holding glsa-*.xml advisories
    #[arg(long)]
    glsa_dir: Option<PathBuf>,

    /// Treat the target as the gentoo repository (default: by repo id)
    #[arg(long)]
    gentoo_repo: Option<bool>,

    /// Only run this check, e.g. ProfilesCheck (can be specified multiple times)
    #[arg(short, long)]
    check: Vec<CheckKind>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> ScanOptions {
        let mut options = ScanOptions::new(&self.repo);
        for master in &self.master {
            options = options.master(master);
        }
        if let Some(dir) = &self.glsa_dir {
            options = options.glsa_dir(dir);
        }
        if let Some(gentoo_repo) = self.gentoo_repo {
            options = options.gentoo_repo(gentoo_repo);
        }
        if !self.check.is_empty() {
            options = options.checks(self.check.iter().copied());
        }
        options
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let reports = match Scanner::new(cli.options()).and_then(|mut scanner| scanner.run()) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    for report in &reports {
        println!(
            "{} {}: {}: {}",
            report.severity(),
            report.name(),
            report.scope(),
            report
        );
    }
    if reports.iter().any(|r| r.severity() == Severity::Error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_arguments() {
        let cli = Cli::try_parse_from([
            "scan_repo",
            "/repo",
            "--master",
            "/gentoo",
            "-c",
            "GlsaCheck",
            "--check",
            "PythonCheck",
            "--gentoo-repo",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.master, [PathBuf::from("/gentoo")]);
        assert_eq!(cli.check, [CheckKind::Glsa, CheckKind::Python]);
        assert_eq!(cli.gentoo_repo, Some(false));

        let err = Cli::try_parse_from(["scan_repo", "/repo", "--check", "Bogus"]).unwrap_err();
        assert!(err.to_string().contains("unknown check: Bogus"));
        assert!(Cli::try_parse_from(["scan_repo"]).is_err());
    }
}

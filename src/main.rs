use anyhow::Result;
use clap::{Parser, ValueEnum};

use chart_release::charts::CommandRefresher;
use chart_release::cli::{ReleaseOutcome, ReleaseRequest, Releaser};
use chart_release::config;
use chart_release::domain::ReleaseKind;
use chart_release::git::Git2Repository;
use chart_release::ui;
use chart_release::ReleaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Release,
    Rc,
    Preview,
}

impl From<KindArg> for ReleaseKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Release => ReleaseKind::Release,
            KindArg::Rc => ReleaseKind::ReleaseCandidate,
            KindArg::Preview => ReleaseKind::Preview,
        }
    }
}

#[derive(clap::Parser)]
#[command(
    name = "chart-release",
    version,
    about = "Bump Helm chart versions, then commit, tag and push a release"
)]
struct Args {
    #[arg(short, long, value_enum, default_value = "release", help = "Kind of release to cut")]
    kind: KindArg,

    #[arg(short, long, help = "Skip the confirmation prompt")]
    yes: bool,

    #[arg(long, help = "Create commit, tag and branch locally but do not push")]
    dry_run: bool,

    #[arg(short, long, help = "Fail unless this branch is checked out")]
    branch: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short = 'C', long, default_value = ".", help = "Path inside the repository")]
    repo: String,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

impl Args {
    fn init_logging(&self) {
        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        // RUST_LOG, when set, overrides the -v level
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .init();
    }
}

fn main() {
    let args = Args::parse();
    args.init_logging();

    if let Err(e) = run(&args) {
        let category = e
            .downcast_ref::<ReleaseError>()
            .map(ReleaseError::category)
            .unwrap_or("error");
        ui::display_error(category, &e.to_string());
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let repo = Git2Repository::open(&args.repo)?;
    let repo_root = repo.workdir()?;
    let config = config::load_config(&repo_root, args.config.as_deref())?;

    let refresher = CommandRefresher::new(config.dependencies.command.clone());
    if refresher.is_disabled() {
        ui::display_warning("Dependency refresh is disabled in configuration");
    }

    let request = ReleaseRequest {
        kind: args.kind.into(),
        yes: args.yes,
        dry_run: args.dry_run,
        branch: args.branch.clone(),
    };

    let releaser = Releaser::new(repo, &config, repo_root, refresher, ui::ConsoleConfirmation);
    match releaser.release(&request)? {
        ReleaseOutcome::Declined => {
            ui::display_status("Release cancelled, nothing was changed");
        }
        ReleaseOutcome::Released(report) => {
            ui::display_release_report(&report);
            if report.pushed {
                ui::display_success(&format!("Pushed {} to {}", report.tag, report.remote));
            } else {
                ui::display_manual_push_instruction(&report.remote, &report.push_refs);
            }
        }
    }

    Ok(())
}

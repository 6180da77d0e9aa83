use clap::Parser;
use extsort::cli::{OrganizeCommand, run_cli_with_config};
use extsort::organizer::Mode;
use extsort::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Sort the files of a folder into subfolders named after their extension")]
struct Args {
    /// Folder to organize
    #[arg(value_hint = clap::ValueHint::DirPath, default_value = "")]
    folder: String,

    /// Copy files into their bucket instead of moving them
    #[arg(short, long)]
    copy: bool,

    /// Only show what would be done
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Revert the previous organization of FOLDER
    #[arg(short, long, conflicts_with_all = ["copy", "dry_run"])]
    undo: bool,

    /// TOML file with exclude/include filters
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = if args.undo {
        OrganizeCommand::Undo
    } else {
        OrganizeCommand::Organize {
            mode: if args.copy { Mode::Copy } else { Mode::Move },
            dry_run: args.dry_run,
        }
    };

    match run_cli_with_config(command, &args.folder, args.config.as_deref()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

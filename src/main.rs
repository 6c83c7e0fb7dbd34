use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use diffnav::input::{self, Input};
use diffnav::{DiffNavError, ParseError, config};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(Parser)]
#[command(name = "diffnav", version)]
#[command(about = "A git diff pager with a file tree. Pipe a diff into it: git diff | diffnav")]
struct Cli {
    /// Show diffs in unified layout instead of side-by-side
    #[arg(short, long)]
    unified: bool,

    /// Write debug logs to debug.log in the current directory
    #[arg(long, env = "DEBUG")]
    debug: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "diffnav", &mut std::io::stdout());
        return Ok(());
    }

    if cli.debug {
        init_logging()?;
    }

    let text = match input::read_stdin()? {
        Input::Missing => {
            println!("No diff, exiting");
            return Ok(());
        }
        Input::Blank => {
            println!("No input provided, exiting");
            return Ok(());
        }
        Input::Diff(text) => text,
    };

    let mut controller = match diffnav::open(&text, cli.unified, &config::load()) {
        Ok(controller) => controller,
        Err(DiffNavError::ParseError(ParseError::Empty)) => {
            println!("No diff, exiting");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    diffnav::tui::run(&mut controller)?;
    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

use crate::config::DEFAULT_CONFIG_PATH;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Find and click the templates.
    Run,
    /// Record clicks until ESC, then replay them.
    Record,
    /// Score every template once without clicking.
    Probe,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub config_path: PathBuf,
    pub loop_times: Option<u32>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    /// `None` when the process should exit right away (help, version or a
    /// bad argument, which is reported on stderr).
    pub fn parse_from<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mode: Option<Mode> = None;
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let mut loop_times: Option<u32> = None;

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("Click Sprite v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--run" {
                mode = Some(Mode::Run);
            } else if arg == "--record" {
                mode = Some(Mode::Record);
            } else if arg == "--probe" {
                mode = Some(Mode::Probe);
            } else if let Some(val) = arg.strip_prefix("--config=") {
                if val.is_empty() {
                    eprintln!("❌ --config needs a path");
                    return None;
                }
                config_path = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--loops=") {
                match val.parse::<u32>() {
                    Ok(n) if n >= 1 => loop_times = Some(n),
                    _ => {
                        eprintln!("❌ Invalid loop count: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode: mode.unwrap_or(Mode::Run),
            config_path,
            loop_times,
        })
    }
}

fn print_help() {
    println!("🖱️ Click Sprite - screen template auto-clicker");
    println!();
    println!("USAGE:");
    println!("    click-sprite [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Same as --run");
    println!("    --run               Find each template on screen and click it");
    println!("    --record            Record clicks until ESC, then replay them");
    println!("    --probe             Print the match score of every template once");
    println!("    --config=PATH       Settings file (default: {})", DEFAULT_CONFIG_PATH);
    println!("    --loops=N           Override loop_times from the settings file");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("Press ESC at any time to stop everything.");
    println!();
    println!("EXAMPLES:");
    println!("    click-sprite --run --loops=3");
    println!("    click-sprite --probe --config=profiles/daily.json");
}

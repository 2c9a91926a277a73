use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, info};
use magnetic::config::PlayerConfig;
use magnetic::error::VmError;
use magnetic::host::Host;
use magnetic::host_headless::HeadlessHost;
use magnetic::interpreter::Interpreter;
use magnetic::terminal::TerminalHost;
use magnetic::vm::{LoadStatus, Vm};

#[derive(Debug, Default)]
struct Args {
    story: PathBuf,
    gfx: Option<PathBuf>,
    hints: Option<PathBuf>,
    sound: Option<PathBuf>,
    seed: Option<u32>,
    config: Option<PathBuf>,
    headless: bool,
    windows: bool,
}

fn usage(program: &str) {
    println!("magnetic - interpreter for Magnetic Scrolls adventure games");
    println!();
    println!(
        "Usage: {} <story.mag> [--gfx <file>] [--hints <file>] [--sound <file>]",
        program
    );
    println!("       [--seed <n>] [--config <file>] [--windows] [--headless]");
    println!();
    println!("  --gfx       picture file (.gfx)");
    println!("  --hints     hints file (.hnt)");
    println!("  --sound     music file (.snd)");
    println!("  --seed      fixed random seed, for reproducible play");
    println!("  --config    settings file (default: magnetic.toml if present)");
    println!("  --windows   story is from the Magnetic Windows collection");
    println!("  --headless  read all input from stdin, print the transcript at the end");
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut story = None;
    let mut it = args.iter().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--gfx" => parsed.gfx = Some(value(arg.as_str())?.into()),
            "--hints" => parsed.hints = Some(value(arg.as_str())?.into()),
            "--sound" => parsed.sound = Some(value(arg.as_str())?.into()),
            "--config" => parsed.config = Some(value(arg.as_str())?.into()),
            "--seed" => {
                let v = value(arg.as_str())?;
                parsed.seed = Some(v.parse().map_err(|_| format!("Invalid seed: {}", v))?);
            }
            "--headless" => parsed.headless = true,
            "--windows" => parsed.windows = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            path if story.is_none() => story = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument: {}", extra)),
        }
    }
    parsed.story = story.ok_or("No story file given")?;
    Ok(parsed)
}

/// Print a friendly message for load failures and exit.
fn load_failed(path: &Path, e: VmError) -> ! {
    match &e {
        VmError::Io(io) if io.kind() == io::ErrorKind::NotFound => {
            eprintln!("Error: Story file not found: {}", path.display());
            eprintln!();
            eprintln!("Please check:");
            eprintln!("• File path is correct");
            eprintln!("• You're running from the right directory");
        }
        VmError::Malformed { .. } => {
            eprintln!("Error: {} is not a usable story file: {}", path.display(), e);
        }
        _ => eprintln!("Error: Cannot load '{}': {}", path.display(), e),
    }
    process::exit(1);
}

/// Run to completion. The flag is set when the game died with a fatal error.
fn play<H: Host>(vm: Vm, host: H, config: PlayerConfig) -> (Interpreter<H>, bool) {
    let mut interpreter = Interpreter::new(vm, host, config);
    let failed = match interpreter.run() {
        Ok(outcome) => {
            debug!("run ended: {:?}", outcome);
            false
        }
        Err(e) => {
            debug!("run failed: {}", e);
            true
        }
    };
    (interpreter, failed)
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return;
    }
    let args = match parse_args(&args) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            process::exit(2);
        }
    };

    let mut config = match PlayerConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.windows {
        config.magnetic_windows = true;
    }

    let gfx = args.gfx.as_deref().filter(|_| config.graphics);
    let (vm, status) = match Vm::load(
        &args.story,
        gfx,
        args.hints.as_deref(),
        args.sound.as_deref(),
        config.rand_mode(),
    ) {
        Ok(loaded) => loaded,
        Err(e) => load_failed(&args.story, e),
    };
    info!(
        "{} loaded ({})",
        args.story.display(),
        match status {
            LoadStatus::TextOnly => "text only",
            LoadStatus::WithGraphics => "with graphics",
        }
    );

    let failed = if args.headless {
        let mut input = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut input) {
            eprintln!("Error: Cannot read input: {}", e);
            process::exit(1);
        }
        let (interpreter, failed) = play(vm, HeadlessHost::with_input(&input), config);
        print!("{}", interpreter.host().output());
        failed
    } else {
        let host = TerminalHost::new(&args.story, config.status_line);
        play(vm, host, config).1
    };
    if failed {
        process::exit(1);
    }
}

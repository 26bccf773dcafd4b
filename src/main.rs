use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use cinder::{assemble, Cell, Machine, Program, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Cinder is a tiny fantasy console: 24K of RAM, a 96x96 screen, a stack
/// machine, and an assembler to feed it.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.casm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a text `.casm` or binary `.cbin` file to halt
    Run {
        /// `.casm` or `.cbin` file to run
        name: PathBuf,
        /// Write the final memory snapshot to a file
        #[arg(long)]
        dump: Option<PathBuf>,
        /// Render the final frame to the terminal
        #[arg(long)]
        show: bool,
    },
    /// Create a binary `.cbin` file to run later or view compiled data
    Compile {
        /// `.casm` file to compile
        name: PathBuf,
        /// Destination to output the .cbin file
        dest: Option<PathBuf>,
    },
    /// Check a `.casm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(cinder::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run { name, dump, show } => run(&name, dump.as_deref(), show),
            Command::Compile { name, dest } => {
                file_message(Green, "Assembling", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let program = assemble(&contents)?;

                let out_file_name =
                    dest.unwrap_or(name.with_extension("cbin").file_name().unwrap().into());
                let mut file = File::create(&out_file_name).into_diagnostic()?;
                file.write_all(&program.to_bytes()).into_diagnostic()?;

                message(Green, "Finished", "emit binary");
                file_message(Green, "Saved", &out_file_name);
                Ok(())
            }
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let _ = assemble(&contents)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, None, false)
    } else {
        println!("\n~ cinder v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 140, 64).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &std::path::Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &PathBuf, dump: Option<&std::path::Path>, show: bool) -> Result<()> {
    let program = load_program(name)?;

    let mut machine = Machine::new();
    machine.load(&program);

    message(MsgColor::Green, "Running", "loaded image");
    match machine.run() {
        Ok(()) => message(MsgColor::Cyan, "Halted", "clean"),
        Err(e) => {
            message(MsgColor::Red, "Faulted", &e.to_string());
            return Err(e).into_diagnostic();
        }
    }

    if let Some(path) = dump {
        write_dump(path, &machine.snapshot())?;
        file_message(MsgColor::Green, "Dumped", path);
    }
    if show {
        show_frame(machine.frame());
    }

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

fn load_program(name: &PathBuf) -> Result<Program> {
    let Some(ext) = name.extension() else {
        bail!("File has no extension. Exiting...");
    };
    match ext.to_str() {
        Some("casm") => {
            file_message(MsgColor::Green, "Assembling", name);
            let contents = fs::read_to_string(name).into_diagnostic()?;
            assemble(&contents)
        }
        Some("cbin") => {
            file_message(MsgColor::Green, "Loading", name);
            let bytes = fs::read(name).into_diagnostic()?;
            Program::from_bytes(&bytes).into_diagnostic()
        }
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

/// Flat little-endian cells, the whole address space.
fn write_dump(path: &std::path::Path, cells: &[Cell]) -> Result<()> {
    let mut bytes = Vec::with_capacity(cells.len() * 4);
    for cell in cells {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    fs::write(path, bytes).into_diagnostic()
}

/// Color indices map onto a fixed 8-entry palette; anything larger wraps.
/// Presentation policy lives here, outside the core.
const PALETTE: [(u8, u8, u8); 8] = [
    (0x00, 0x00, 0x00), // black
    (0xFF, 0xF1, 0xE8), // white
    (0xFF, 0x00, 0x4D), // red
    (0xFF, 0xA3, 0x00), // orange
    (0xFF, 0xEC, 0x27), // yellow
    (0x00, 0xE4, 0x36), // green
    (0x29, 0xAD, 0xFF), // blue
    (0x83, 0x76, 0x9C), // lavender
];

/// Render the frame with half-block glyphs, two pixel rows per text row.
fn show_frame(frame: &[Cell]) {
    for row in (0..SCREEN_HEIGHT).step_by(2) {
        let mut line = String::new();
        for col in 0..SCREEN_WIDTH {
            let top = PALETTE[frame[col + row * SCREEN_WIDTH] as usize % PALETTE.len()];
            let bottom = PALETTE[frame[col + (row + 1) * SCREEN_WIDTH] as usize % PALETTE.len()];
            let glyph = "▀"
                .truecolor(top.0, top.1, top.2)
                .on_truecolor(bottom.0, bottom.1, bottom.2);
            line.push_str(&glyph.to_string());
        }
        println!("{line}");
    }
}

const LOGO: &str = r#"
          (
   (      )\ )            (
 ( )\    (()/(   (    (   )\)
 )((_)    /(_))  )\   )\ ((_)(
((_)_    (_))   ((_) ((_) _ )\
 / __|   |_ _|  | \ | | || ((_)
| (__     | |   | .\| | _||  _|
 \___|   |___|  |_|\__||___|_| "#;

const SHORT_INFO: &str = r"
Welcome to cinder, a tiny fantasy console with its own assembly language.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");

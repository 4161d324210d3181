use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};

use aspserial::{
    configure_line, read_serial, write_serial, DisplayMode, Renderer, TransferOptions,
    UsbTransport,
};
use aspserial_shared::{BaudRate, DataBits, LineConfig, Parity};

const RULE: &str = "--------------------------------------------";

#[derive(Parser, Debug)]
#[command(name = "aspserial")]
#[command(about = "Exchange bytes with a target board through the aspserial programmer")]
#[command(group(ArgGroup::new("direction").required(true).args(["read", "write"])))]
#[command(group(ArgGroup::new("display").args(["hex", "decimal", "binary"])))]
struct Args {
    /// Receive bytes from the target
    #[arg(short = 'l', long)]
    read: bool,

    /// Send bytes to the target
    #[arg(short = 'e', long)]
    write: bool,

    /// Stop after this many bytes (runs until interrupted otherwise)
    #[arg(short = 'n', long = "bytes", value_name = "N")]
    bytes: Option<u64>,

    /// Output file when reading, input file when writing
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Show bytes in hexadecimal
    #[arg(short = 'x', long)]
    hex: bool,

    /// Show bytes in decimal
    #[arg(short, long)]
    decimal: bool,

    /// Show bytes in binary
    #[arg(short, long)]
    binary: bool,

    /// Start a new line every N bytes
    #[arg(short = 's', long = "break-every", value_name = "N", default_value_t = 0)]
    break_every: usize,

    /// Line rate in baud
    #[arg(long, value_name = "RATE", default_value = "2400", value_parser = parse_baud)]
    baud: BaudRate,

    /// Data bits per character (5-8)
    #[arg(long, default_value = "8", value_parser = parse_bits)]
    bits: DataBits,

    /// Parity: none, even or odd
    #[arg(long, default_value = "none", value_parser = parse_parity)]
    parity: Parity,
}

impl Args {
    fn display_mode(&self) -> DisplayMode {
        if self.hex {
            DisplayMode::Hex
        } else if self.decimal {
            DisplayMode::Decimal
        } else if self.binary {
            DisplayMode::Binary
        } else {
            DisplayMode::Byte
        }
    }

    fn line_config(&self) -> LineConfig {
        LineConfig {
            baud: self.baud,
            data_bits: self.bits,
            parity: self.parity,
        }
    }
}

fn parse_baud(s: &str) -> Result<BaudRate, String> {
    let rate: u32 = s.parse().map_err(|e| format!("{}", e))?;
    BaudRate::from_bits_per_second(rate).ok_or_else(|| {
        let rates: Vec<String> = BaudRate::ALL
            .iter()
            .map(|b| b.bits_per_second().to_string())
            .collect();
        format!("unsupported rate, use one of {}", rates.join(", "))
    })
}

fn parse_bits(s: &str) -> Result<DataBits, String> {
    let bits: u8 = s.parse().map_err(|e| format!("{}", e))?;
    DataBits::from_selector(bits).ok_or_else(|| "expected 5, 6, 7 or 8".to_string())
}

fn parse_parity(s: &str) -> Result<Parity, String> {
    match s.to_ascii_lowercase().as_str() {
        "none" | "n" => Ok(Parity::None),
        "even" | "e" => Ok(Parity::Even),
        "odd" | "o" => Ok(Parity::Odd),
        _ => Err("expected none, even or odd".to_string()),
    }
}

fn parity_name(parity: Parity) -> &'static str {
    match parity {
        Parity::None => "no",
        Parity::Even => "even",
        Parity::Odd => "odd",
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    // Setup Ctrl-C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        eprintln!("\nInterrupted, stopping...");
    })
    .context("installing Ctrl-C handler")?;

    let mut options = TransferOptions {
        budget: args.bytes,
        ..Default::default()
    };

    // Open the file before touching the device so a bad path fails early
    let source: Option<File> = match (&args.file, args.write) {
        (Some(path), true) => {
            let file = File::open(path)
                .with_context(|| format!("opening input file {}", path.display()))?;
            let size = file
                .metadata()
                .with_context(|| format!("reading size of {}", path.display()))?
                .len();
            options.budget = Some(options.budget.map_or(size, |b| b.min(size)));
            Some(file)
        }
        _ => None,
    };

    let mut transport = UsbTransport::open().context("opening programmer")?;
    log::info!("programmer found");

    let config = args.line_config();
    configure_line(&mut transport, &config).context("configuring serial line")?;
    eprintln!("OK: programmer found, serial line set to");
    eprintln!(
        "    {} baud, {} bits, {} parity.",
        config.baud.bits_per_second(),
        config.data_bits.selector(),
        parity_name(config.parity)
    );
    eprintln!("{}", RULE);

    let total = if args.read {
        let sink: Box<dyn Write> = match &args.file {
            Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
                format!("creating output file {}", path.display())
            })?)),
            None => Box::new(io::stdout().lock()),
        };
        let mut renderer = Renderer::new(sink, args.display_mode(), args.break_every);
        read_serial(&mut transport, &mut renderer, &options, &running)
            .context("reading from target")?
    } else {
        let mut input: Box<dyn Read> = match source {
            Some(file) => Box::new(BufReader::new(file)),
            None => Box::new(io::stdin().lock()),
        };
        let mut echo = Renderer::new(io::stderr(), args.display_mode(), args.break_every);
        write_serial(&mut transport, &mut input, &mut echo, &options, &running)
            .context("writing to target")?
    };

    eprintln!("\n{}", RULE);
    eprintln!("aspserial: {} bytes transmitted or received", total);
    Ok(())
}

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::time::Instant;

use log::info;
use traceanon_engines::{
    AnonKey, I64Anonymizer, Ipv4Anonymizer, Ipv6Anonymizer, MacAddr, MacAnonymizer,
    OctetStringAnonymizer, U64Anonymizer,
};

use crate::cli::{AddrArgs, Int64Args, InputArgs, KeyArgs, KeyMaterialArgs, Uint64Args};
use crate::error::CommandError;

/// One anonymization subcommand: how to parse an input line and how to feed
/// it to the engine in either mode.
trait LineEngine {
    type Value;

    /// Whether surrounding whitespace on a line is insignificant for this
    /// input kind. The octet-string engine treats lines as raw bytes and
    /// keeps it.
    fn trims_whitespace(&self) -> bool {
        true
    }

    fn parse(&self, line: &str) -> Result<Self::Value, String>;
    fn mark(&mut self, value: &Self::Value);
    fn map(&mut self, value: &Self::Value) -> String;
    fn map_lex(&mut self, value: &Self::Value) -> String;
}

fn make_key(args: &KeyMaterialArgs) -> AnonKey {
    match &args.passphrase {
        Some(passphrase) => AnonKey::from_passphrase(passphrase),
        None => {
            info!("no passphrase given, drawing a random key");
            AnonKey::from_random()
        }
    }
}

fn input_label(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) if path.as_os_str() != "-" => path.display().to_string(),
        _ => "<stdin>".to_string(),
    }
}

fn open_input(file: &Option<PathBuf>) -> io::Result<Box<dyn BufRead>> {
    match file {
        Some(path) if path.as_os_str() != "-" => Ok(Box::new(BufReader::new(File::open(path)?))),
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Process the input line by line. The default mode streams; the
/// order-preserving mode buffers everything for the mark pass and maps in a
/// second pass. Blank lines pass through empty.
fn run_lines<E: LineEngine>(
    engine: &mut E,
    reader: impl BufRead,
    lex: bool,
    label: &str,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let io_err = |source| CommandError::Io {
        path: label.to_string(),
        source,
    };

    if lex {
        let mut parsed = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let text = if engine.trims_whitespace() {
                line.trim()
            } else {
                line.as_str()
            };
            if text.is_empty() {
                parsed.push(None);
                continue;
            }
            let value = engine.parse(text).map_err(|message| CommandError::Parse {
                path: label.to_string(),
                line: number + 1,
                message,
            })?;
            engine.mark(&value);
            parsed.push(Some(value));
        }
        for value in &parsed {
            match value {
                Some(value) => writeln!(out, "{}", engine.map_lex(value)),
                None => writeln!(out),
            }
            .map_err(io_err)?;
        }
    } else {
        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let text = if engine.trims_whitespace() {
                line.trim()
            } else {
                line.as_str()
            };
            if text.is_empty() {
                writeln!(out).map_err(io_err)?;
                continue;
            }
            let value = engine.parse(text).map_err(|message| CommandError::Parse {
                path: label.to_string(),
                line: number + 1,
                message,
            })?;
            writeln!(out, "{}", engine.map(&value)).map_err(io_err)?;
        }
    }
    out.flush().map_err(io_err)
}

fn run_engine<E: LineEngine>(engine: &mut E, input: &InputArgs) -> Result<(), CommandError> {
    let label = input_label(&input.file);
    let reader = open_input(&input.file).map_err(|source| CommandError::Io {
        path: label.clone(),
        source,
    })?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run_lines(engine, reader, input.lex, &label, &mut out)
}

struct Ipv4Cmd(Ipv4Anonymizer);

impl LineEngine for Ipv4Cmd {
    type Value = Ipv4Addr;

    fn parse(&self, line: &str) -> Result<Ipv4Addr, String> {
        line.parse()
            .map_err(|_| format!("invalid IPv4 address {line:?}"))
    }

    fn mark(&mut self, value: &Ipv4Addr) {
        self.0.set_used(*value, 32);
    }

    fn map(&mut self, value: &Ipv4Addr) -> String {
        self.0.map_pref(*value).to_string()
    }

    fn map_lex(&mut self, value: &Ipv4Addr) -> String {
        self.0.map_pref_lex(*value).to_string()
    }
}

struct Ipv6Cmd(Ipv6Anonymizer);

impl LineEngine for Ipv6Cmd {
    type Value = Ipv6Addr;

    fn parse(&self, line: &str) -> Result<Ipv6Addr, String> {
        line.parse()
            .map_err(|_| format!("invalid IPv6 address {line:?}"))
    }

    fn mark(&mut self, value: &Ipv6Addr) {
        self.0.set_used(*value, 128);
    }

    fn map(&mut self, value: &Ipv6Addr) -> String {
        self.0.map_pref(*value).to_string()
    }

    fn map_lex(&mut self, value: &Ipv6Addr) -> String {
        self.0.map_pref_lex(*value).to_string()
    }
}

struct MacCmd(MacAnonymizer);

impl LineEngine for MacCmd {
    type Value = MacAddr;

    fn parse(&self, line: &str) -> Result<MacAddr, String> {
        line.parse().map_err(|_| format!("invalid MAC address {line:?}"))
    }

    fn mark(&mut self, value: &MacAddr) {
        self.0.set_used(*value);
    }

    fn map(&mut self, value: &MacAddr) -> String {
        self.0.map(*value).to_string()
    }

    fn map_lex(&mut self, value: &MacAddr) -> String {
        self.0.map_lex(*value).to_string()
    }
}

struct Uint64Cmd(U64Anonymizer);

impl LineEngine for Uint64Cmd {
    type Value = u64;

    fn parse(&self, line: &str) -> Result<u64, String> {
        line.parse()
            .map_err(|_| format!("invalid unsigned integer {line:?}"))
    }

    fn mark(&mut self, value: &u64) {
        self.0.set_used(*value);
    }

    fn map(&mut self, value: &u64) -> String {
        self.0.map(*value).to_string()
    }

    fn map_lex(&mut self, value: &u64) -> String {
        self.0.map_lex(*value).to_string()
    }
}

struct Int64Cmd(I64Anonymizer);

impl LineEngine for Int64Cmd {
    type Value = i64;

    fn parse(&self, line: &str) -> Result<i64, String> {
        line.parse()
            .map_err(|_| format!("invalid signed integer {line:?}"))
    }

    fn mark(&mut self, value: &i64) {
        self.0.set_used(*value);
    }

    fn map(&mut self, value: &i64) -> String {
        self.0.map(*value).to_string()
    }

    fn map_lex(&mut self, value: &i64) -> String {
        self.0.map_lex(*value).to_string()
    }
}

struct OctsCmd(OctetStringAnonymizer);

impl OctsCmd {
    fn into_string(bytes: Vec<u8>) -> String {
        // Classified bytes map within ASCII and everything else passes
        // through, so UTF-8 survives the substitution.
        String::from_utf8(bytes).expect("class-preserving map keeps UTF-8 intact")
    }
}

impl LineEngine for OctsCmd {
    type Value = String;

    fn trims_whitespace(&self) -> bool {
        false
    }

    fn parse(&self, line: &str) -> Result<String, String> {
        Ok(line.to_string())
    }

    fn mark(&mut self, value: &String) {
        self.0.set_used(value.as_bytes());
    }

    fn map(&mut self, value: &String) -> String {
        Self::into_string(self.0.map(value.as_bytes()))
    }

    fn map_lex(&mut self, value: &String) -> String {
        Self::into_string(self.0.map_lex(value.as_bytes()))
    }
}

pub fn run_ipv4(args: AddrArgs) -> Result<(), CommandError> {
    let key = make_key(&args.input.key);
    let mut engine = Ipv4Anonymizer::new();
    engine.set_key(&key);
    let started = Instant::now();
    let mut cmd = Ipv4Cmd(engine);
    run_engine(&mut cmd, &args.input)?;
    if args.stats {
        eprintln!(
            "traceanon: {} trie nodes, {:?} elapsed",
            cmd.0.nodes_count(),
            started.elapsed()
        );
    }
    Ok(())
}

pub fn run_ipv6(args: AddrArgs) -> Result<(), CommandError> {
    let key = make_key(&args.input.key);
    let mut engine = Ipv6Anonymizer::new();
    engine.set_key(&key);
    let started = Instant::now();
    let mut cmd = Ipv6Cmd(engine);
    run_engine(&mut cmd, &args.input)?;
    if args.stats {
        eprintln!(
            "traceanon: {} trie nodes, {:?} elapsed",
            cmd.0.nodes_count(),
            started.elapsed()
        );
    }
    Ok(())
}

pub fn run_mac(args: InputArgs) -> Result<(), CommandError> {
    let key = make_key(&args.key);
    let mut engine = MacAnonymizer::new();
    engine.set_key(&key);
    run_engine(&mut MacCmd(engine), &args)
}

pub fn run_uint64(args: Uint64Args) -> Result<(), CommandError> {
    if args.lower > args.upper {
        return Err(CommandError::InvalidRange {
            lower: args.lower.to_string(),
            upper: args.upper.to_string(),
        });
    }
    let key = make_key(&args.input.key);
    let mut engine = U64Anonymizer::new(args.lower, args.upper);
    engine.set_key(&key);
    run_engine(&mut Uint64Cmd(engine), &args.input)
}

pub fn run_int64(args: Int64Args) -> Result<(), CommandError> {
    if args.lower > args.upper {
        return Err(CommandError::InvalidRange {
            lower: args.lower.to_string(),
            upper: args.upper.to_string(),
        });
    }
    let key = make_key(&args.input.key);
    let mut engine = I64Anonymizer::new(args.lower, args.upper);
    engine.set_key(&key);
    run_engine(&mut Int64Cmd(engine), &args.input)
}

pub fn run_octs(args: InputArgs) -> Result<(), CommandError> {
    let key = make_key(&args.key);
    let mut engine = OctetStringAnonymizer::new();
    engine.set_key(&key);
    run_engine(&mut OctsCmd(engine), &args)
}

pub fn run_key(args: KeyArgs) -> Result<(), CommandError> {
    let key = make_key(&args.key);
    println!("secret: {}", hex_string(key.secret()));
    println!("pad:    {}", hex_string(&key.pad()));
    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

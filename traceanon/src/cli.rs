use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "traceanon",
    version,
    about = r#"
traceanon rewrites the sensitive identifiers in line-oriented trace material
with deterministic, key-derived pseudonyms.

EXAMPLES:
    # Anonymize IPv4 addresses, one per line, preserving shared prefixes:
    traceanon ipv4 -p "my key" addrs.txt

    # Additionally preserve the numeric order of the observed addresses:
    traceanon ipv4 -p "my key" -l addrs.txt

    # Map integers into the range [1000, 9999], reading stdin:
    traceanon uint64 1000 9999

    # Generate a fresh random key:
    traceanon key
"#
)]
pub struct Opt {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Anonymize IPv4 addresses, preserving prefix relationships.
    Ipv4(AddrArgs),

    /// Anonymize IPv6 addresses, preserving prefix relationships.
    Ipv6(AddrArgs),

    /// Anonymize MAC addresses, preserving the I/G and U/L bits.
    Mac(InputArgs),

    /// Map signed 64-bit integers into the pseudonym range [LOWER, UPPER].
    Int64(Int64Args),

    /// Map unsigned 64-bit integers into the pseudonym range [LOWER, UPPER].
    Uint64(Uint64Args),

    /// Anonymize octet strings, preserving length and character classes.
    Octs(InputArgs),

    /// Generate key material and print it as hex.
    Key(KeyArgs),
}

#[derive(Debug, Args)]
pub struct KeyMaterialArgs {
    /// Derive the key from this passphrase instead of drawing a random key.
    #[arg(short, long)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    #[command(flatten)]
    pub key: KeyMaterialArgs,

    /// Preserve the order of the observed input set. Buffers the whole input
    /// for a second pass.
    #[arg(short = 'l', long = "lex")]
    pub lex: bool,

    /// Input file with one value per line; "-" or omitted reads stdin.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AddrArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the trie node count and elapsed time on stderr when done.
    #[arg(short = 'c', long = "stats")]
    pub stats: bool,
}

#[derive(Debug, Args)]
pub struct Uint64Args {
    /// Smallest pseudonym value.
    pub lower: u64,

    /// Largest pseudonym value.
    pub upper: u64,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct Int64Args {
    /// Smallest pseudonym value.
    #[arg(allow_hyphen_values = true)]
    pub lower: i64,

    /// Largest pseudonym value.
    #[arg(allow_hyphen_values = true)]
    pub upper: i64,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct KeyArgs {
    #[command(flatten)]
    pub key: KeyMaterialArgs,
}

mod cli;
mod commands;
mod error;

use clap::Parser;

fn main() {
    env_logger::init();

    // clap's own failure path exits with code 2; usage errors are expected
    // to exit 1, so report the error ourselves. Help and version output are
    // not errors and keep exit code 0.
    let opt = match cli::Opt::try_parse() {
        Ok(opt) => opt,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    let result = match opt.action {
        cli::Action::Ipv4(args) => commands::run_ipv4(args),
        cli::Action::Ipv6(args) => commands::run_ipv6(args),
        cli::Action::Mac(args) => commands::run_mac(args),
        cli::Action::Int64(args) => commands::run_int64(args),
        cli::Action::Uint64(args) => commands::run_uint64(args),
        cli::Action::Octs(args) => commands::run_octs(args),
        cli::Action::Key(args) => commands::run_key(args),
    };

    if let Err(err) = result {
        eprintln!("traceanon: {err}");
        std::process::exit(1);
    }
}

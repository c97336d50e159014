//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = transit_audit_cli::run() {
        eprintln!("transit-audit: {err}");
        std::process::exit(1);
    }
}

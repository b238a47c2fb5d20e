use clap::Parser;
use snafu::ErrorCompat;

mod args;
mod tab;

fn main() {
    let args = args::Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let res = tab::run_tabulation(
        args.config,
        args.data,
        args.excel_worksheet_name,
        args.out,
        args.reference,
    );
    if let Err(e) = res {
        eprintln!("svytab: error: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

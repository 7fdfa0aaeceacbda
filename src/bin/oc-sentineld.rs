// src/bin/oc-sentineld.rs
use clap::Parser;
use oc_sentinel::{Opts, run};

fn main() {
    let opts = Opts::parse();
    if let Err(e) = run(&opts) {
        eprintln!("oc-sentineld: {e}");
        std::process::exit(1);
    }
}

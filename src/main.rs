use log::error;
use crate::console::Console;
use crate::ledger::{LedgerConfig, LedgerStore};

mod chart;
mod console;
mod csv_handler;
mod ledger;
mod transaction;

fn main() {
    env_logger::init();
    let store = LedgerStore::new(LedgerConfig::from_env());

    let stdin = std::io::stdin();
    let mut console = Console::new(store, stdin.lock(), std::io::stdout(), Box::new(chart::render));
    if let Err(err) = console.run() {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

use super::Session;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use hitman_core::ledger::{Ledger, LedgerSet};
use std::collections::BTreeMap;

#[derive(Subcommand)]
pub enum LedgerSubcommand {
    /// Show every recorded id, grouped by set
    Show,
}

pub fn run(session: &Session, subcmd: LedgerSubcommand) -> anyhow::Result<()> {
    match subcmd {
        LedgerSubcommand::Show => show(session),
    }
}

fn show(session: &Session) -> anyhow::Result<()> {
    let ledger = Ledger::load(&session.dir).context("failed to load ledger")?;

    if session.json {
        let sets: BTreeMap<&str, Vec<&str>> = LedgerSet::all()
            .iter()
            .map(|&set| (set.as_str(), ledger.ids(set).collect()))
            .collect();
        return print_json(&sets);
    }

    println!("Ledger: {}", ledger.path().display());
    for &set in LedgerSet::all() {
        println!("{set} ({})", ledger.len(set));
        for id in ledger.ids(set) {
            println!("  {id}");
        }
    }
    Ok(())
}

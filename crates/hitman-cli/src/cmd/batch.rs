use super::Session;
use crate::output::print_json;
use anyhow::Context;
use hitman_core::batcher::{describe_plan, plan, run_plan, BatchParams, PsiturkPublisher};
use hitman_core::config::ExperimentConfig;
use hitman_core::diagnostics::StderrDiagnostics;
use hitman_core::paths;
use hitman_core::types::Usd;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, Write};
use std::path::Path;

pub struct BatchArgs {
    pub assignments: u32,
    pub reward: String,
    pub duration: f64,
    pub max_per_hit: u32,
    pub sleep: u64,
    pub window: u64,
    pub yes: bool,
}

/// Append-mode handle on the batch log in `dir`.
pub fn open_log(dir: &Path) -> anyhow::Result<File> {
    let path = paths::batch_log_path(dir);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))
}

pub fn run(session: &Session, args: BatchArgs) -> anyhow::Result<()> {
    let reward: Usd = args.reward.parse()?;
    let params = BatchParams {
        total_assignments: args.assignments,
        reward,
        duration_hours: args.duration,
        max_per_hit: args.max_per_hit,
        spacing_secs: args.sleep,
        window_secs: args.window,
    };
    let plan = plan(&params)?;
    let diag = session.diagnostics();

    if let Ok(config) = ExperimentConfig::load(&session.dir) {
        if config.launches_in_sandbox() {
            tracing::warn!("config.txt sets launch_in_sandbox_mode = true");
            eprintln!("warning: config.txt sets launch_in_sandbox_mode; HITs go to the sandbox");
        }
    }

    // The operator must see the plan before the prompt even when stdout is JSON.
    if session.json {
        describe_plan(&plan, &params, &StderrDiagnostics);
    } else {
        describe_plan(&plan, &params, &*diag);
    }
    if !args.yes {
        let stdin = std::io::stdin();
        let proceed = confirm(stdin.lock(), std::io::stderr(), "Publish these HITs?")?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    tracing::info!(
        assignments = params.total_assignments,
        reward = %params.reward,
        rounds = plan.rounds.len(),
        "batch started"
    );
    let mut publisher = PsiturkPublisher::new(&session.dir);
    let report = run_plan(
        &plan,
        &params,
        &mut publisher,
        &mut |d| std::thread::sleep(d),
        &*diag,
    );
    tracing::info!(
        published = report.hits_published,
        failed = report.hits_failed,
        "batch finished"
    );

    if session.json {
        return print_json(&report);
    }
    println!(
        "Published {} HIT(s) with {} assignment(s) over {} round(s); {} failed.",
        report.hits_published, report.assignments_published, report.rounds, report.hits_failed
    );
    Ok(())
}

/// Ask `prompt` until the answer is yes or no. End of input counts as no.
fn confirm<R: BufRead, W: Write>(mut input: R, mut out: W, prompt: &str) -> anyhow::Result<bool> {
    loop {
        write!(out, "{prompt} [y/N] ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(out, "Please answer yes or no.")?,
        }
    }
}

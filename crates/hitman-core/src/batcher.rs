//! Paced publishing of HIT batches.
//!
//! Posting many small HITs over a short window instead of one large HIT
//! keeps each HIT at or under the per-HIT assignment cap. The total is split
//! into rounds spaced a fixed interval apart; each round publishes full HITs
//! of `max_per_hit` assignments plus one smaller HIT for the rest.

use crate::diagnostics::Diagnostics;
use crate::error::{HitmanError, Result};
use crate::types::Usd;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const DEFAULT_MAX_PER_HIT: u32 = 9;
pub const DEFAULT_SPACING_SECS: u64 = 5;
pub const DEFAULT_WINDOW_SECS: u64 = 60;
/// Upper bound on `window / spacing`.
pub const MAX_ROUNDS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Parameters and plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BatchParams {
    pub total_assignments: u32,
    pub reward: Usd,
    pub duration_hours: f64,
    pub max_per_hit: u32,
    pub spacing_secs: u64,
    pub window_secs: u64,
}

impl BatchParams {
    pub fn validate(&self) -> Result<()> {
        if self.total_assignments == 0 {
            return Err(HitmanError::InvalidBatch(
                "number of assignments must be positive".into(),
            ));
        }
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err(HitmanError::InvalidBatch(format!(
                "invalid HIT duration: {} hours",
                self.duration_hours
            )));
        }
        if self.max_per_hit == 0 {
            return Err(HitmanError::InvalidBatch(
                "max assignments per HIT must be positive".into(),
            ));
        }
        if self.spacing_secs == 0 || self.window_secs == 0 {
            return Err(HitmanError::InvalidBatch(
                "sleep time and window must be positive".into(),
            ));
        }
        if self.window_secs / self.spacing_secs > MAX_ROUNDS {
            return Err(HitmanError::InvalidBatch(format!(
                "window of {}s at {}s spacing exceeds {MAX_ROUNDS} rounds",
                self.window_secs, self.spacing_secs
            )));
        }
        Ok(())
    }
}

/// The HITs one round publishes, by assignment count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub number: u32,
    pub assignments: u32,
    pub hits: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPlan {
    pub rounds: Vec<Round>,
    pub per_round: u32,
    pub remainder: u32,
    pub spacing_secs: u64,
    pub window_secs: u64,
}

impl BatchPlan {
    pub fn total_assignments(&self) -> u32 {
        self.rounds.iter().map(|r| r.assignments).sum()
    }

    pub fn total_hits(&self) -> usize {
        self.rounds.iter().map(|r| r.hits.len()).sum()
    }
}

/// Split `params.total_assignments` across rounds.
///
/// Rounds = window / spacing (at least one). Every round gets the same
/// share, and the leftover is handed out one per round from the first.
pub fn plan(params: &BatchParams) -> Result<BatchPlan> {
    params.validate()?;
    let n_rounds = u32::try_from((params.window_secs / params.spacing_secs).max(1))
        .map_err(|_| HitmanError::InvalidBatch("too many rounds".into()))?;
    let per_round = params.total_assignments / n_rounds;
    let remainder = params.total_assignments - per_round * n_rounds;

    let rounds = (1..=n_rounds)
        .map(|number| {
            let assignments = per_round + u32::from(number <= remainder);
            let full = assignments / params.max_per_hit;
            let rest = assignments % params.max_per_hit;
            let mut hits = vec![params.max_per_hit; full as usize];
            if rest > 0 {
                hits.push(rest);
            }
            Round {
                number,
                assignments,
                hits,
            }
        })
        .collect();

    Ok(BatchPlan {
        rounds,
        per_round,
        remainder,
        spacing_secs: params.spacing_secs,
        window_secs: params.window_secs,
    })
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HitSpec {
    pub assignments: u32,
    pub reward: Usd,
    pub duration_hours: f64,
}

/// Posts one HIT to the marketplace.
pub trait HitPublisher {
    fn publish(&mut self, hit: &HitSpec) -> Result<()>;
}

/// Publishes through the psiTurk shell: `psiturk -e "hit create N REWARD HOURS"`.
#[derive(Debug, Clone)]
pub struct PsiturkPublisher {
    program: String,
    dir: PathBuf,
}

impl PsiturkPublisher {
    pub fn new(dir: &Path) -> Self {
        Self {
            program: "psiturk".to_string(),
            dir: dir.to_path_buf(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn command_line(hit: &HitSpec) -> String {
        format!(
            "hit create {} {} {:.2}",
            hit.assignments, hit.reward, hit.duration_hours
        )
    }
}

impl HitPublisher for PsiturkPublisher {
    fn publish(&mut self, hit: &HitSpec) -> Result<()> {
        let command = Self::command_line(hit);
        tracing::info!("> {} -e \"{}\"", self.program, command);
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(&command)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| HitmanError::Publish(format!("cannot run {}: {e}", self.program)))?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!("{line}");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HitmanError::Publish(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rounds: u32,
    pub hits_published: u32,
    pub assignments_published: u32,
    pub hits_failed: u32,
}

/// Describe the plan to the operator before confirmation.
pub fn describe_plan(plan: &BatchPlan, params: &BatchParams, diag: &dyn Diagnostics) {
    diag.note(&format!("Total time: {} seconds", plan.window_secs));
    diag.note(&format!("Spacing: {} seconds", plan.spacing_secs));
    diag.note(&format!("Total assignments: {}", params.total_assignments));
    diag.note(&format!(
        "Assignments per round (ignoring modulus): {}",
        plan.per_round
    ));
    diag.note(&format!(
        "Assignments remainder to distribute: {}",
        plan.remainder
    ));
    diag.note(&format!("Number of rounds: {}", plan.rounds.len()));
    diag.note(&format!(
        "HITs to publish: {} (max {} assignments each, ${} per assignment)",
        plan.total_hits(),
        params.max_per_hit,
        params.reward
    ));
}

/// Publish every round of `plan`, calling `sleep` between rounds.
///
/// A HIT that fails to publish is reported and the schedule carries on.
pub fn run_plan(
    plan: &BatchPlan,
    params: &BatchParams,
    publisher: &mut dyn HitPublisher,
    sleep: &mut dyn FnMut(Duration),
    diag: &dyn Diagnostics,
) -> BatchReport {
    let mut report = BatchReport::default();
    let spacing = Duration::from_secs(plan.spacing_secs);
    for (i, round) in plan.rounds.iter().enumerate() {
        diag.note(&format!("ROUND {}", round.number));
        diag.note(&format!(
            "TOTAL assignments for this round: {}",
            round.assignments
        ));
        for &assignments in &round.hits {
            diag.note(&format!("Creating a HIT with {assignments} assignments"));
            let hit = HitSpec {
                assignments,
                reward: params.reward,
                duration_hours: params.duration_hours,
            };
            match publisher.publish(&hit) {
                Ok(()) => {
                    report.hits_published += 1;
                    report.assignments_published += assignments;
                }
                Err(e) => {
                    diag.failure(&format!("HIT with {assignments} assignments"), &e);
                    report.hits_failed += 1;
                }
            }
        }
        report.rounds += 1;
        if i + 1 < plan.rounds.len() {
            diag.note(&format!("Sleeping for {} seconds...", plan.spacing_secs));
            sleep(spacing);
        }
    }
    diag.note("Finished!");
    report
}

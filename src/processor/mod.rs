//! Main processing engine.
//!
//! Drives a race run: roster, stage list and current-stage marker first,
//! then every listed stage in order. Each stage resolves to a
//! [`StageOutcome`]; rest days are skipped, merged stages are folded into the
//! rider map, and the first stage that has not been run ends the loop.
//! Snapshots of completed stages are written as they are merged, so output
//! for earlier stages stays on disk if a later stage fails.

pub mod client;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::client::RaceApi;
use self::writer::OutputWriter;

use crate::aggregator::{RiderAggregator, Roster};
use crate::cleaner::{clean_record, record_stage_id, rider_ref, stage_detail_from_records};
use crate::config::RaceConfig;
use crate::error::{RaceError, Result};
use crate::models::{
    ProcessingStats, RawRecord, RiderMap, StageDescriptor, StageDetail, StageOutcome,
};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What fetching a stage produced, before any merging
#[derive(Debug)]
enum StageFetch {
    RestDay,
    NotYetRun,
    Ready {
        records: Vec<RawRecord>,
        detail: StageDetail,
    },
}

/// Riders and per-stage outcomes of a stage loop
#[derive(Debug, Default)]
pub struct RaceProgress {
    pub riders: RiderMap,
    /// Number of non-rest-day stages; the length of every series
    pub num_stages: usize,
    /// Outcome per handled stage, by stage number
    pub outcomes: Vec<(String, StageOutcome)>,
}

impl RaceProgress {
    pub fn count(&self, outcome: StageOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// Stage number the loop stopped at, if it stopped early
    pub fn halted_at(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|(_, o)| *o == StageOutcome::NotYetRun)
            .map(|(number, _)| number.as_str())
    }
}

/// Processor for one race run
#[derive(Debug)]
pub struct RaceProcessor<A> {
    api: A,
    config: RaceConfig,
    rest_day: Regex,
    show_progress: bool,
}

impl<A: RaceApi> RaceProcessor<A> {
    /// Create a processor; fails if the configuration is invalid
    pub fn new(api: A, config: RaceConfig) -> Result<Self> {
        config.validate()?;
        let rest_day = config.rest_day_regex()?;
        Ok(Self {
            api,
            config,
            rest_day,
            show_progress: false,
        })
    }

    /// Print step messages and a progress bar while running
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn is_rest_day(&self, stage: &StageDescriptor) -> bool {
        self.rest_day.is_match(stage.stage_number.trim())
    }

    fn step(&self, message: &str) {
        if self.show_progress {
            println!("{}", message.bright_yellow());
        }
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        if self.show_progress {
            println!("{}", "Starting race processing".bright_green().bold());
            println!("  {} {}", "API:".bright_cyan(), self.config.api_base_url);
            println!("  {} {}", "Race:".bright_cyan(), self.config.race_id);
            println!(
                "  {} {}",
                "Output:".bright_cyan(),
                self.config.output_dir.display()
            );
        }

        let mut writer = OutputWriter::new(&self.config.output_dir)?;

        // Step 1: Roster
        let roster = if self.config.fetch_roster {
            self.step("Fetching roster...");
            let roster = Roster::from_records(self.api.fetch_roster().await?)?;
            info!("Roster has {} riders", roster.len());
            Some(roster)
        } else {
            debug!("Roster fetch disabled, riders come from stage data");
            None
        };

        // Step 2: Stage list
        self.step("Fetching stage list...");
        let stages = self.api.fetch_stages().await?;
        writer.write_stages(&stages)?;
        info!("Race lists {} stages", stages.len());

        // Step 3: Current stage marker
        let current = if self.config.use_current_stage {
            self.api.fetch_current_stage().await?
        } else {
            None
        };

        // Step 4: Stages
        self.step("Processing stages...");
        let progress = self
            .run_stages(&stages, current.as_ref(), roster.as_ref(), Some(&mut writer))
            .await?;

        // Step 5: Rider snapshot and tables
        self.step("Writing rider snapshot and tables...");
        writer.write_riders(&progress.riders)?;
        writer.write_tables(&progress.riders, progress.num_stages)?;

        let stats = ProcessingStats {
            stages_listed: stages.len(),
            stages_merged: progress.count(StageOutcome::Merged),
            rest_days_skipped: progress.count(StageOutcome::SkippedRestDay),
            halted_at: progress.halted_at().map(str::to_string),
            riders: progress.riders.len(),
            files_written: writer.into_written(),
            processing_time: start_time.elapsed(),
        };

        if self.show_progress {
            print_summary(&stats);
        }
        Ok(stats)
    }

    /// Handle `stages` in order until one has not been run yet.
    ///
    /// Cleaned snapshots of merged stages go to `writer` when stage
    /// snapshots are enabled.
    pub async fn run_stages(
        &self,
        stages: &[StageDescriptor],
        current: Option<&StageDescriptor>,
        roster: Option<&Roster>,
        mut writer: Option<&mut OutputWriter>,
    ) -> Result<RaceProgress> {
        let num_stages = stages.iter().filter(|s| !self.is_rest_day(s)).count();
        let aggregator = RiderAggregator::new(num_stages, roster);

        let current_position = current.and_then(|marker| {
            let position = stages.iter().position(|s| s.stage_id == marker.stage_id);
            if position.is_none() {
                warn!(
                    "Current stage {} is not in the stage list, ignoring it",
                    marker.stage_id
                );
            }
            position
        });

        let progress_bar = self.progress_bar(stages.len() as u64);
        let mut progress = RaceProgress {
            num_stages,
            ..Default::default()
        };
        let mut stage_index = 0;

        for (position, stage) in stages.iter().enumerate() {
            progress_bar.set_message(format!("stage {}", stage.stage_number));

            let fetched = self.fetch_stage(position, stage, current_position).await?;
            let outcome = match fetched {
                StageFetch::RestDay => StageOutcome::SkippedRestDay,
                StageFetch::NotYetRun => StageOutcome::NotYetRun,
                StageFetch::Ready { records, detail } => {
                    if self.config.write_stage_snapshots {
                        if let Some(writer) = writer.as_deref_mut() {
                            writer.write_stage_snapshot(&stage.stage_number, &records)?;
                        }
                    }

                    progress.riders = aggregator
                        .merge_stage(std::mem::take(&mut progress.riders), stage_index, &detail)
                        .map_err(|e| e.in_stage(stage.stage_number.clone(), None))?;
                    stage_index += 1;

                    info!(
                        "Merged stage {} ({} riders so far)",
                        stage.stage_number,
                        progress.riders.len()
                    );
                    StageOutcome::Merged
                }
            };

            progress.outcomes.push((stage.stage_number.clone(), outcome));
            progress_bar.inc(1);

            if outcome == StageOutcome::NotYetRun {
                info!(
                    "Stage {} has not been run yet, stopping",
                    stage.stage_number
                );
                break;
            }
        }

        progress_bar.finish_and_clear();
        Ok(progress)
    }

    /// Decide and fetch one stage; no rider data is touched here
    async fn fetch_stage(
        &self,
        position: usize,
        stage: &StageDescriptor,
        current_position: Option<usize>,
    ) -> Result<StageFetch> {
        if self.is_rest_day(stage) {
            debug!("Stage {} is a rest day", stage.stage_number);
            return Ok(StageFetch::RestDay);
        }

        if current_position.is_some_and(|current| position > current) {
            debug!(
                "Stage {} is after the current stage",
                stage.stage_number
            );
            return Ok(StageFetch::NotYetRun);
        }

        let raw = self.api.fetch_stage_detail(stage.stage_id).await?;
        let Some(first) = raw.first() else {
            debug!("Stage {} returned no classification", stage.stage_number);
            return Ok(StageFetch::NotYetRun);
        };

        // The API answers future stages with the latest completed one
        match record_stage_id(first) {
            Some(id) if id != stage.stage_id => {
                debug!(
                    "Stage {} (id {}) answered with data for stage id {}",
                    stage.stage_number, stage.stage_id, id
                );
                return Ok(StageFetch::NotYetRun);
            }
            None => debug!(
                "Stage {} records carry no stage id, accepting them",
                stage.stage_number
            ),
            Some(_) => {}
        }

        let records = raw
            .into_iter()
            .map(|record| {
                let rider = rider_ref(&record).ok().map(|r| r.to_string());
                clean_record(record).map_err(|e| e.in_stage(stage.stage_number.clone(), rider))
            })
            .collect::<Result<Vec<_>>>()?;

        let detail = stage_detail_from_records(&records)
            .map_err(|e| e.in_stage(stage.stage_number.clone(), None))?;

        Ok(StageFetch::Ready { records, detail })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(len);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            Ok(style) => progress_bar.set_style(style.progress_chars("#>-")),
            Err(e) => warn!("Invalid progress bar template: {}", e),
        }
        progress_bar
    }
}

/// Print the end-of-run summary
pub fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time.as_millis().to_string().bright_white()
    );
    println!(
        "  {} {} of {}",
        "Stages merged:".bright_cyan(),
        stats.stages_merged.to_string().bright_white().bold(),
        stats.stages_listed
    );
    println!(
        "  {} {}",
        "Rest days skipped:".bright_cyan(),
        stats.rest_days_skipped.to_string().bright_white()
    );
    if let Some(stage) = &stats.halted_at {
        println!(
            "  {} {}",
            "Race incomplete, stopped at stage:".bright_yellow(),
            stage.bright_white().bold()
        );
    }
    println!(
        "  {} {}",
        "Riders:".bright_cyan(),
        stats.riders.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Files written:".bright_cyan(),
        stats.files_written.len().to_string().bright_white()
    );
}

/// Error returned when a run is cancelled by the user
pub fn interrupted() -> RaceError {
    RaceError::Interrupted {
        reason: "Processing interrupted by user".to_string(),
    }
}

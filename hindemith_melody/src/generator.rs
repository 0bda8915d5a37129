// Exhaustive backtracking search for chapter-one melodies.
//
// The generator owns one live `Melody` per first interval and walks the
// successor table depth-first: push a candidate step, run the rule
// pipeline, then store (closed), recurse (open and under the depth bound)
// or just pop (illegal). Only closed legal melodies leave the search, as
// centered snapshots filed into the classification grid.
//
// When the search finishes, every final-interval group holding more than
// the per-group cap is shuffled with the seeded RNG, so the formatter's
// take-first-cap is a uniform sample instead of the earliest discoveries.
// With the shuffle disabled, or a fixed seed, two runs with the same config
// produce identical grids.
//
// Progress goes to tracing at most once per `progress_update_seconds`. The
// report reads state only.

use crate::buckets::{ClassificationGrid, GridSummary};
use crate::config::GeneratorConfig;
use crate::intervals::{FIRST_INTERVALS, successors};
use crate::melody::Melody;
use crate::rules::{RuleLimits, is_legal};
use hindemith_prng::MelodyRng;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct Generator {
    config: GeneratorConfig,
    limits: RuleLimits,
    grid: ClassificationGrid,
    rng: MelodyRng,
    melody_count: usize,
    progress_interval: Duration,
    last_report: Instant,
}

impl Generator {
    /// Allocate the grid for `config.max_melody_intervals`. The config is
    /// assumed to have passed `validate()`.
    pub fn new(config: GeneratorConfig, rng: MelodyRng) -> Self {
        Generator {
            limits: config.rule_limits(),
            grid: ClassificationGrid::new(config.max_melody_intervals),
            progress_interval: config.progress_interval(),
            config,
            rng,
            melody_count: 0,
            last_report: Instant::now(),
        }
    }

    /// Run the full search, then shuffle over-full groups if enabled.
    pub fn generate(&mut self) -> GridSummary {
        let started = Instant::now();
        self.last_report = started;
        info!(
            min_intervals = self.config.min_melody_intervals,
            max_intervals = self.config.max_melody_intervals,
            max_height = self.config.max_melody_height,
            start = %self.config.start_tone(),
            "Starting melody search"
        );

        for &first in FIRST_INTERVALS.iter() {
            let mut melody = Melody::new(self.config.start_tone());
            melody.push_interval(first);
            self.visit(&mut melody);
        }

        if self.config.shuffle {
            let cap = self.config.max_melodies_per_final_interval_subset;
            let shuffled = self.grid.shuffle_over_full(cap, &mut self.rng);
            debug!(groups = shuffled, cap, "Shuffled over-full groups");
        }

        let summary = self.grid.summary();
        for subset in &summary.subsets {
            info!(
                direction_changes = subset.direction_changes,
                length = subset.length,
                count = subset.count,
                "Subset"
            );
        }
        info!(
            melodies = self.melody_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search complete"
        );
        summary
    }

    /// Called right after an append: store, recurse, or nothing.
    fn visit(&mut self, melody: &mut Melody) {
        if !is_legal(melody, &self.limits) {
            return;
        }
        if melody.is_closed() {
            self.save_melody(melody);
        } else if melody.num_intervals() < self.config.max_melody_intervals {
            self.extend(melody);
        }
    }

    fn extend(&mut self, melody: &mut Melody) {
        let Some(previous) = melody.last_interval() else {
            return;
        };
        for &next in successors(previous) {
            melody.push_interval(next);
            self.visit(melody);
            melody.pop_interval();
        }
    }

    fn save_melody(&mut self, melody: &Melody) {
        let snapshot = melody.centered_on(self.config.start_tone());
        debug!(melody = %snapshot, "Accepted");
        self.grid.insert(snapshot);
        self.melody_count += 1;

        if self.last_report.elapsed() >= self.progress_interval {
            self.last_report = Instant::now();
            info!(
                melodies = self.melody_count,
                current = %melody.intervals_string(),
                "Search progress"
            );
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Closed melodies accepted so far.
    pub fn melody_count(&self) -> usize {
        self.melody_count
    }

    pub fn grid(&self) -> &ClassificationGrid {
        &self.grid
    }

    pub fn into_grid(self) -> ClassificationGrid {
        self.grid
    }
}

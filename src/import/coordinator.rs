use super::window::{Carry, ChunkPlan, ChunkWindow};
use crate::error::Result;
use crate::sink::{LogSink, ProgressSink};
use crate::source::{ChunkFetcher, LogSource, RangeProbe};
use crate::types::{Event, FetchStrategy, ImportRun, ImportSummary, RunId};
use crate::validate::validate_lines;
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

/// Drives one import from probe to finished run
///
/// The coordinator owns no state between calls; every [`execute`](Self::execute)
/// creates its own run, so one coordinator can serve concurrent imports.
#[derive(Clone)]
pub struct ImportCoordinator {
    probe: RangeProbe,
    fetcher: ChunkFetcher,
    logs: Arc<dyn LogSink>,
    progress: Arc<dyn ProgressSink>,
    events: Option<broadcast::Sender<Event>>,
}

/// Where an import currently stands
#[derive(Debug)]
enum Phase {
    Init,
    Probing,
    StreamingFull {
        run: ImportRun,
    },
    StreamingChunked {
        run: ImportRun,
        plan: ChunkPlan,
        window: ChunkWindow,
        carry: Carry,
        percent: u8,
    },
    Finishing {
        run: ImportRun,
    },
    Done(ImportRun),
}

/// Counters accumulated across phases
#[derive(Debug)]
struct Tally {
    run_id: Option<RunId>,
    strategy: FetchStrategy,
    windows: u64,
    accepted: u64,
    rejected: u64,
}

impl Tally {
    fn new() -> Self {
        Self {
            run_id: None,
            strategy: FetchStrategy::Full,
            windows: 0,
            accepted: 0,
            rejected: 0,
        }
    }

    fn into_summary(self, run: ImportRun) -> ImportSummary {
        ImportSummary {
            run,
            strategy: self.strategy,
            windows: self.windows,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }
}

impl ImportCoordinator {
    /// Wire a coordinator to its three capabilities
    pub fn new(
        source: Arc<dyn LogSource>,
        logs: Arc<dyn LogSink>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            probe: RangeProbe::new(source.clone()),
            fetcher: ChunkFetcher::new(source),
            logs,
            progress,
            events: None,
        }
    }

    /// Broadcast lifecycle events alongside progress updates
    pub fn with_events(mut self, events: broadcast::Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Import the log at `url`
    ///
    /// Transport and store failures end the run where it stands: the run
    /// stays `Started` at its last percent and the error is returned.
    pub async fn execute(&self, url: &Url) -> Result<ImportSummary> {
        let mut tally = Tally::new();
        let mut phase = Phase::Init;

        loop {
            if let Phase::Done(run) = phase {
                let summary = tally.into_summary(run);
                tracing::info!(
                    run_id = %summary.run.id,
                    %url,
                    strategy = ?summary.strategy,
                    windows = summary.windows,
                    accepted = summary.accepted,
                    rejected = summary.rejected,
                    "import finished"
                );
                self.emit(Event::ImportFinished {
                    run_id: summary.run.id,
                    accepted: summary.accepted,
                    rejected: summary.rejected,
                });
                return Ok(summary);
            }

            phase = match self.advance(url, phase, &mut tally).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(run_id = ?tally.run_id, %url, error = %e, "import failed");
                    self.emit(Event::ImportFailed {
                        url: url.to_string(),
                        run_id: tally.run_id,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };
        }
    }

    /// Perform the work of one phase and return the next
    async fn advance(&self, url: &Url, phase: Phase, tally: &mut Tally) -> Result<Phase> {
        match phase {
            Phase::Init => Ok(Phase::Probing),

            Phase::Probing => {
                let probe = self.probe.probe(url).await?;
                let run = self.progress.create_run().await?;
                tally.run_id = Some(run.id);
                tracing::info!(run_id = %run.id, %url, supports_ranges = probe.supports_ranges, "import started");
                self.emit(Event::ImportStarted {
                    run_id: run.id,
                    url: url.to_string(),
                });

                let plan = probe
                    .supports_ranges
                    .then(|| ChunkPlan::new(probe.total_length))
                    .flatten();

                Ok(match plan {
                    Some(plan) => {
                        tally.strategy = FetchStrategy::Chunked;
                        Phase::StreamingChunked {
                            run,
                            plan,
                            window: plan.first_window(),
                            carry: Carry::default(),
                            percent: 0,
                        }
                    }
                    None => {
                        tally.strategy = FetchStrategy::Full;
                        Phase::StreamingFull { run }
                    }
                })
            }

            Phase::StreamingFull { run } => {
                let lines = self.fetcher.fetch_all(url).await?;
                tally.windows += 1;
                self.persist(&lines, tally).await?;
                Ok(Phase::Finishing { run })
            }

            Phase::StreamingChunked {
                run,
                plan,
                window,
                mut carry,
                percent,
            } => {
                let lines = self
                    .fetcher
                    .fetch_range(url, window.from, window.last_byte())
                    .await?;
                tally.windows += 1;
                let complete = carry.absorb(lines);
                self.persist(&complete, tally).await?;

                let Some(next) = plan.next_window(window) else {
                    if !carry.is_empty() {
                        tracing::debug!(
                            run_id = %run.id,
                            bytes = carry.as_bytes().len(),
                            "dropping unterminated fragment at end of source"
                        );
                    }
                    return Ok(Phase::Finishing { run });
                };

                let percent = percent.saturating_add(1);
                let run = self.progress.update_run(run.id, percent).await?;
                self.emit(Event::ImportProgress {
                    run_id: run.id,
                    percent,
                });

                Ok(Phase::StreamingChunked {
                    run,
                    plan,
                    window: next,
                    carry,
                    percent,
                })
            }

            Phase::Finishing { run } => {
                let run = self.progress.finish_run(run.id).await?;
                Ok(Phase::Done(run))
            }

            Phase::Done(run) => Ok(Phase::Done(run)),
        }
    }

    async fn persist(&self, lines: &[String], tally: &mut Tally) -> Result<()> {
        let batch = validate_lines(lines.iter().map(String::as_str));
        self.logs.create_records(&batch.records).await?;
        tally.accepted += batch.records.len() as u64;
        tally.rejected += batch.rejected;
        Ok(())
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            // No subscribers is not an error
            events.send(event).ok();
        }
    }
}

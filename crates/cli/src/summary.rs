//! Run statistics.

use std::time::Duration;

use bootstrap::LoadOutcome;
use contracts::StatsSnapshot;
use dispatcher::MetricsSnapshot;
use event_bus::InterceptReport;
use observability::StatsSummary;

/// Statistics from one `run`
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Where the transport library came from
    pub library: LoadOutcome,
    /// Entries drained at installation
    pub intercept: InterceptReport,
    /// Values pushed after installation
    pub pushed: usize,
    /// Malformed input lines
    pub skipped_lines: usize,
    /// Relay counters
    pub stats: StatsSnapshot,
    /// Dispatch queue counters
    pub dispatch: MetricsSnapshot,
    /// Flush batch sizes
    pub batches: StatsSummary,
    /// Commands still waiting for a library
    pub buffered_commands: usize,
    /// Sticky context entries at the end of the run
    pub context_entries: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Share of named events that were forwarded, in percent
    pub fn forward_rate(&self) -> f64 {
        if self.stats.processed > 0 {
            let forwarded = self.stats.processed - self.stats.blocked - self.stats.not_allowed;
            (forwarded as f64 / self.stats.processed as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Library: {:?}", self.library);
        println!(
            "   ├─ Preloaded entries: {} ({} objects)",
            self.intercept.existing, self.intercept.observed
        );
        println!("   ├─ Pushed values: {}", self.pushed);
        println!("   └─ Skipped input lines: {}", self.skipped_lines);

        println!("\n📈 Events");
        println!("   ├─ Processed: {}", self.stats.processed);
        println!("   ├─ Blocked: {}", self.stats.blocked);
        println!("   ├─ Not allowed: {}", self.stats.not_allowed);
        println!("   ├─ Sent: {}", self.stats.sent);
        println!("   ├─ Forward rate: {:.2}%", self.forward_rate());
        println!("   └─ Context entries: {}", self.context_entries);

        println!("\n📤 Dispatch");
        println!("   ├─ Flushes: {}", self.dispatch.flush_count);
        println!("   ├─ Batch sizes: {}", self.batches);
        println!("   ├─ Failed sends: {}", self.dispatch.failure_count);
        println!("   ├─ Retried: {}", self.dispatch.retry_count);
        println!("   ├─ Dropped: {}", self.dispatch.dropped_count);
        println!("   └─ Buffered commands: {}", self.buffered_commands);

        println!();
    }
}

//! Fusion Thread - the single owner of scan index and object table.
//!
//! Each cycle:
//! 1. Wait (bounded) on the scan and detection mailboxes
//! 2. Rebuild the scan index from a new scan, if any
//! 3. Correlate every detection of a new frame against that index and feed
//!    the results to the tracker
//! 4. Evict stale objects
//! 5. Post the full table to the output mailbox
//!
//! Steps 2–5 run only when at least one input arrived, and always in this
//! order, so index mutation, table mutation and publication never
//! interleave within a cycle. Scan and detection streams are not
//! synchronized: a frame is correlated against whatever scan is current.
//!
//! This thread NEVER blocks on publishing; the output mailbox overwrites.

use crossbeam_channel::select;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{CorrelationConfig, ServiceConfig, TrackerConfig};
use crate::core::math::unix_time_secs;
use crate::core::types::{DetectionFrame, Scan};
use crate::error::{Error, Result};
use crate::fusion::{CorrelationOutcome, Correlator, ScanIndex, TrackUpdate, Tracker};
use crate::io::{
    ChannelStats, MailboxReceiver, MailboxSender, ObjectsMessage, Posted, PublisherStats,
};

/// Counters owned by the fusion worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    /// Cycles that processed at least one input
    pub cycles: u64,
    /// Scans applied to the index
    pub scans: u64,
    /// Scan points rejected by validation
    pub scan_points_dropped: u64,
    /// Detection frames processed
    pub frames: u64,
    /// Detections matched to a scan return
    pub ranged: u64,
    /// Detections forwarded without range
    pub bearing_only: u64,
    /// Detections dropped (outside coverage or malformed)
    pub detections_dropped: u64,
    /// Objects created
    pub created: u64,
    /// Objects evicted
    pub evicted: u64,
    /// Table messages posted for publication
    pub published: u64,
    /// Posted messages that replaced one the publisher had not sent yet
    pub output_replaced: u64,
}

/// Synchronous fusion pipeline: scan index, correlator and tracker.
///
/// Owns all mutable fusion state. [`FusionThread`] drives it from the
/// mailboxes; tests drive [`FusionService::process_cycle`] directly.
#[derive(Debug)]
pub struct FusionService {
    scan_index: ScanIndex,
    correlator: Correlator,
    tracker: Tracker,
    stats: FusionStats,
}

impl FusionService {
    /// Create a service with an empty index and table
    pub fn new(correlation: &CorrelationConfig, tracker: TrackerConfig) -> Self {
        Self {
            scan_index: ScanIndex::new(correlation),
            correlator: Correlator::new(correlation),
            tracker: Tracker::new(tracker),
            stats: FusionStats::default(),
        }
    }

    /// Replace the scan index with a new scan.
    pub fn apply_scan(&mut self, scan: &Scan) {
        let kept = self.scan_index.rebuild(&scan.points);
        let dropped = scan.len() - kept;
        self.stats.scans += 1;
        self.stats.scan_points_dropped += dropped as u64;

        log::trace!(
            "Scan: {} points ({} dropped), {} buckets",
            scan.len(),
            dropped,
            self.scan_index.len()
        );
    }

    /// Correlate and track every detection of a frame.
    pub fn apply_detections(&mut self, frame: &DetectionFrame, now: Instant) {
        self.stats.frames += 1;

        for detection in &frame.observations {
            let outcome = self.correlator.correlate(detection, &self.scan_index);
            match &outcome {
                CorrelationOutcome::Ranged(_) => self.stats.ranged += 1,
                CorrelationOutcome::BearingOnly(_) => self.stats.bearing_only += 1,
                CorrelationOutcome::OutsideHemisphere | CorrelationOutcome::Malformed => {
                    self.stats.detections_dropped += 1
                }
            }

            let Some(observation) = outcome.into_observation() else {
                continue;
            };
            match self.tracker.observe(&observation, now) {
                TrackUpdate::Created(_) => self.stats.created += 1,
                TrackUpdate::Updated(_) => {}
                TrackUpdate::Rejected => self.stats.detections_dropped += 1,
            }
        }
    }

    /// Run one fusion cycle.
    ///
    /// Applies the scan (first) and the detection frame, evicts, and returns
    /// the table message to publish. Returns `None` if there was no input.
    pub fn process_cycle(
        &mut self,
        scan: Option<&Scan>,
        detections: Option<&DetectionFrame>,
        now: Instant,
    ) -> Option<ObjectsMessage> {
        if scan.is_none() && detections.is_none() {
            return None;
        }
        self.stats.cycles += 1;

        if let Some(scan) = scan {
            self.apply_scan(scan);
        }
        if let Some(frame) = detections {
            self.apply_detections(frame, now);
        }

        self.stats.evicted += self.tracker.evict(now).len() as u64;

        Some(ObjectsMessage::from_snapshot(
            self.tracker.snapshot(),
            unix_time_secs(),
        ))
    }

    /// Object table (read-only)
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Current scan index (read-only)
    pub fn scan_index(&self) -> &ScanIndex {
        &self.scan_index
    }

    /// Counters so far
    pub fn stats(&self) -> FusionStats {
        self.stats
    }
}

/// Counters from other threads, included in the periodic stats line.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub channels: Vec<(&'static str, Arc<ChannelStats>)>,
    pub publisher: Option<Arc<PublisherStats>>,
}

/// Fusion Thread handle.
pub struct FusionThread {
    handle: JoinHandle<FusionStats>,
}

impl FusionThread {
    /// Spawn the fusion thread.
    pub fn spawn(
        service: FusionService,
        config: ServiceConfig,
        scans: MailboxReceiver<Scan>,
        detections: MailboxReceiver<DetectionFrame>,
        output: MailboxSender<ObjectsMessage>,
        diagnostics: Diagnostics,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("fusion".into())
            .spawn(move || {
                run_fusion_loop(
                    service,
                    config,
                    scans,
                    detections,
                    output,
                    diagnostics,
                    running,
                )
            })
            .map_err(|source| Error::Spawn {
                name: "fusion",
                source,
            })?;

        Ok(Self { handle })
    }

    /// Wait for thread to finish; returns the final counters.
    pub fn join(self) -> thread::Result<FusionStats> {
        self.handle.join()
    }
}

/// Run the fusion loop until shutdown or until both input channels close.
fn run_fusion_loop(
    mut service: FusionService,
    config: ServiceConfig,
    scans: MailboxReceiver<Scan>,
    detections: MailboxReceiver<DetectionFrame>,
    output: MailboxSender<ObjectsMessage>,
    diagnostics: Diagnostics,
    running: Arc<AtomicBool>,
) -> FusionStats {
    log::info!("Fusion thread started");

    let poll_timeout = Duration::from_millis(config.poll_timeout_ms);
    let stats_interval = (config.stats_interval_sec > 0.0)
        .then(|| Duration::from_secs_f64(config.stats_interval_sec));
    let mut last_stats = Instant::now();

    while running.load(Ordering::Relaxed) {
        let mut scan: Option<Scan> = None;
        let mut frame: Option<DetectionFrame> = None;
        let mut closed = false;

        select! {
            recv(scans.as_receiver()) -> msg => match msg {
                Ok(s) => scan = Some(s),
                Err(_) => closed = true,
            },
            recv(detections.as_receiver()) -> msg => match msg {
                Ok(f) => frame = Some(f),
                Err(_) => closed = true,
            },
            // Timeout to allow checking running flag
            default(poll_timeout) => {}
        }

        if closed {
            log::info!("Input channel closed, fusion thread exiting");
            break;
        }

        // Pick up whatever the other channel holds so both land in this cycle
        if scan.is_none() {
            scan = scans.take();
        }
        if frame.is_none() {
            frame = detections.take();
        }

        if let Some(message) = service.process_cycle(scan.as_ref(), frame.as_ref(), Instant::now()) {
            service.stats.published += 1;
            if output.post(message) == Posted::Replaced {
                service.stats.output_replaced += 1;
            }
        }

        if let Some(interval) = stats_interval
            && last_stats.elapsed() >= interval
        {
            log_stats(&service, &diagnostics);
            last_stats = Instant::now();
        }
    }

    log_stats(&service, &diagnostics);
    log::info!("Fusion thread stopped");
    service.stats()
}

fn log_stats(service: &FusionService, diagnostics: &Diagnostics) {
    let s = service.stats();
    log::info!(
        "Fusion: {} cycles, {} scans, {} frames, detections {} ranged / {} bearing-only / {} dropped, \
         {} live objects ({} created, {} evicted), {} published ({} superseded)",
        s.cycles,
        s.scans,
        s.frames,
        s.ranged,
        s.bearing_only,
        s.detections_dropped,
        service.tracker().len(),
        s.created,
        s.evicted,
        s.published,
        s.output_replaced
    );

    for (name, stats) in &diagnostics.channels {
        let c = stats.counts();
        log::info!(
            "  {}: {} received, {} decode errors, {} superseded",
            name,
            c.received,
            c.decode_errors,
            c.replaced
        );
    }

    if let Some(publisher) = &diagnostics.publisher {
        log::info!(
            "  tracked-objects: {} sent, {} dropped, {} send errors",
            publisher.sent(),
            publisher.dropped(),
            publisher.send_errors()
        );
    }
}

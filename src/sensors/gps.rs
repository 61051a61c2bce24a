use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nmea::{Nmea, SentenceType};

use crate::config::MAX_HDOP;
use crate::error::Result;
use crate::position::GeoPoint;
use crate::sensors::{
    EventSink, PositionErrorKind, PositionOptions, PositionSource, StopSignal, Subscription,
};

/// Longest the watch loop sleeps before checking the stop signal again.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// GPS receiver streaming NMEA 0183 sentences over a serial device.
pub struct NmeaGps {
    device: PathBuf,
}

impl NmeaGps {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl PositionSource for NmeaGps {
    fn name(&self) -> &str {
        "nmea-gps"
    }

    fn subscribe(&mut self, sink: EventSink, options: PositionOptions) -> Result<Subscription> {
        let device = self.device.clone();
        let lines = spawn_reader(move || {
            log::info!("Opening {}...", device.display());
            File::open(&device).map(BufReader::new)
        })?;
        Subscription::spawn("nmea-gps", move |stop| watch(lines, &sink, options, &stop))
    }
}

fn io_error_kind(e: &io::Error) -> PositionErrorKind {
    match e.kind() {
        io::ErrorKind::PermissionDenied => PositionErrorKind::PermissionDenied,
        _ => PositionErrorKind::PositionUnavailable,
    }
}

/// Open a line source and read it on a detached thread.
///
/// Opening and reading both block (a FIFO without a writer, a receiver that
/// went quiet), so neither happens on a thread anyone joins. The thread ends
/// after the first I/O error, which is forwarded, at end of stream, or once
/// the receiver is gone and the next line arrives.
pub fn spawn_reader<R, F>(open: F) -> Result<Receiver<io::Result<String>>>
where
    R: BufRead,
    F: FnOnce() -> io::Result<R> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("nmea-reader".to_string())
        .spawn(move || {
            let reader = match open() {
                Ok(reader) => reader,
                Err(e) => {
                    tx.send(Err(e)).ok();
                    return;
                }
            };
            for line in reader.lines() {
                let forwarded = match line {
                    Ok(content) => tx.send(Ok(content)),
                    // Garbled bytes on the wire, the stream itself is fine.
                    Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                        log::trace!("Skipping undecodable line: {}", e);
                        continue;
                    }
                    Err(e) => {
                        tx.send(Err(e)).ok();
                        return;
                    }
                };
                if forwarded.is_err() {
                    return;
                }
            }
        })?;
    Ok(rx)
}

/// Turn NMEA lines into position events until the stream ends, the
/// subscription stops, or the session goes away.
///
/// The timeout runs off the clock, not off incoming lines, so a receiver that
/// goes silent still produces a `Timeout` every `options.timeout`.
pub fn watch(
    lines: Receiver<io::Result<String>>,
    sink: &EventSink,
    options: PositionOptions,
    stop: &StopSignal,
) {
    let mut filter = FixFilter::new(options, Instant::now());

    while !stop.is_stopped() {
        let wait = filter.time_until_timeout(Instant::now()).min(POLL_SLICE);
        let delivered = match lines.recv_timeout(wait) {
            Ok(Ok(content)) => match filter.feed(content.trim(), Instant::now()) {
                Some(point) => {
                    log::debug!(
                        "Fix {} (satellites: {:?}, HDOP: {:?})",
                        point,
                        filter.satellites(),
                        filter.hdop()
                    );
                    sink.position(point)
                }
                None => true,
            },
            Ok(Err(e)) => {
                log::warn!("GPS stream failed: {}", e);
                sink.position_error(io_error_kind(&e));
                return;
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("NMEA stream closed");
                sink.position_error(PositionErrorKind::PositionUnavailable);
                return;
            }
        };
        if !delivered {
            return;
        }

        if filter.poll_timeout(Instant::now()) {
            log::warn!("No fresh fix within {:?}", options.timeout);
            if !sink.position_error(PositionErrorKind::Timeout) {
                return;
            }
        }
    }
}

/// Turns a stream of NMEA sentences into fresh position fixes.
///
/// Only sentences that carry a fix the receiver marks valid produce a
/// reading; a void RMC or a GGA with fix quality 0 repeating the last known
/// coordinates is dropped. Without
/// `allow_cached_fix`, a fix epoch is delivered at most once even when several
/// sentences (GGA, RMC, ...) describe it.
pub struct FixFilter {
    nmea: Nmea,
    options: PositionOptions,
    last_epoch: Option<String>,
    deadline: Instant,
}

impl FixFilter {
    pub fn new(options: PositionOptions, now: Instant) -> Self {
        Self {
            nmea: Nmea::default(),
            options,
            last_epoch: None,
            deadline: now + options.timeout,
        }
    }

    pub fn satellites(&self) -> Option<u32> {
        self.nmea.num_of_fix_satellites
    }

    pub fn hdop(&self) -> Option<f32> {
        self.nmea.hdop
    }

    /// Parse one sentence. Returns a position only for a fresh, acceptable fix.
    pub fn feed(&mut self, sentence: &str, now: Instant) -> Option<GeoPoint> {
        let sentence_type = match self.nmea.parse(sentence) {
            Ok(sentence_type) => sentence_type,
            Err(e) => {
                log::trace!("Parse error on '{}': {}", sentence, e);
                return None;
            }
        };
        if !matches!(
            sentence_type,
            SentenceType::GGA | SentenceType::RMC | SentenceType::GLL | SentenceType::GNS
        ) {
            return None;
        }

        let (Some(latitude), Some(longitude)) = (self.nmea.latitude, self.nmea.longitude) else {
            return None;
        };

        if !self.nmea.fix_type.is_some_and(|fix| fix.is_valid()) {
            log::debug!("Ignoring {:?} without a valid fix", sentence_type);
            return None;
        }

        if self.options.high_accuracy
            && sentence_type == SentenceType::GGA
            && let Some(hdop) = self.nmea.hdop
            && hdop > MAX_HDOP
        {
            log::debug!("Rejecting fix with HDOP {:.1}", hdop);
            return None;
        }

        if !self.options.allow_cached_fix {
            let epoch = self.nmea.fix_time.map(|t| t.to_string());
            if epoch.is_some() && epoch == self.last_epoch {
                return None;
            }
            self.last_epoch = epoch;
        }

        self.deadline = now + self.options.timeout;
        Some(GeoPoint::new(latitude, longitude))
    }

    /// Time left before `poll_timeout` fires.
    pub fn time_until_timeout(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// True once the timeout has passed without a fix; the deadline then
    /// restarts so the next report comes one timeout later.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline = now + self.options.timeout;
        true
    }
}

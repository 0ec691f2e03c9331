//! Synthetic sensor feed for bench testing the fusion daemon.
//!
//! Publishes a front-hemisphere lidar scan and camera detections for a few
//! objects drifting across the field of view, and optionally prints the
//! tracked-objects feed coming back.
//!
//! # Usage
//!
//! ```bash
//! # Daemon on localhost, print what it publishes
//! cargo run --bin drishti-sim -- --listen tcp://localhost:5557
//!
//! # Daemon on another host, reproducible noise
//! cargo run --bin drishti-sim -- --seed 42 --objects 5
//! drishti --detections tcp://192.168.1.30:5555 --scan tcp://192.168.1.30:5556
//! ```
//!
//! The simulator stands in for the camera and lidar producers, so it binds
//! the detections and scan publishers; the daemon connects to them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use drishti::core::types::ScanPoint;
use drishti::io::{DetectionEntry, DetectionsMessage, ObjectsMessage, encode_scan};

/// Labels the simulated detector emits
const LABELS: [&str; 4] = ["person", "bicycle", "car", "dog"];

/// Background return when nothing is in the way (mm)
const BACKGROUND_MM: f64 = 4500.0;

/// Simulated camera field of view (degrees, each side)
const CAMERA_HALF_FOV_DEG: f64 = 60.0;

/// Apparent area of a 1 m² target at 1 m (px²)
const AREA_AT_1M: f64 = 400_000.0;

#[derive(Parser, Debug)]
#[command(name = "drishti-sim")]
#[command(about = "Publish synthetic lidar scans and camera detections")]
struct Args {
    /// Endpoint to publish detections on
    #[arg(long, default_value = "tcp://*:5555")]
    detections: String,

    /// Endpoint to publish scans on
    #[arg(long, default_value = "tcp://*:5556")]
    scan: String,

    /// Scan publish rate (Hz)
    #[arg(long, default_value = "10.0")]
    scan_rate: f64,

    /// Detection publish rate (Hz)
    #[arg(long, default_value = "15.0")]
    detection_rate: f64,

    /// Number of simulated objects
    #[arg(short, long, default_value = "3")]
    objects: usize,

    /// Probability that a visible object is detected in a frame
    #[arg(long, default_value = "0.9")]
    detect_prob: f64,

    /// RNG seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Daemon's tracked-objects endpoint to subscribe to and print
    #[arg(long, value_name = "ENDPOINT")]
    listen: Option<String>,

    /// Stop after this many seconds (0 = until interrupted)
    #[arg(long, default_value = "0")]
    duration: f64,
}

/// One object moving through the scene.
struct SimObject {
    label: &'static str,
    bearing_deg: f64,
    distance_mm: f64,
    /// Bearing drift (deg/s)
    bearing_rate: f64,
    /// Range drift (mm/s)
    range_rate: f64,
    /// Angular half-width as seen by the lidar (deg)
    half_width_deg: f64,
}

impl SimObject {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            label: LABELS[rng.random_range(0..LABELS.len())],
            bearing_deg: rng.random_range(-50.0..50.0),
            distance_mm: rng.random_range(800.0..4000.0),
            bearing_rate: rng.random_range(-8.0..8.0),
            range_rate: rng.random_range(-300.0..300.0),
            half_width_deg: rng.random_range(1.5..4.0),
        }
    }

    /// Advance by `dt` seconds, bouncing off the scene limits.
    fn step(&mut self, dt: f64) {
        self.bearing_deg += self.bearing_rate * dt;
        if self.bearing_deg.abs() > 70.0 {
            self.bearing_rate = -self.bearing_rate;
            self.bearing_deg = self.bearing_deg.clamp(-70.0, 70.0);
        }

        self.distance_mm += self.range_rate * dt;
        if !(500.0..=4200.0).contains(&self.distance_mm) {
            self.range_rate = -self.range_rate;
            self.distance_mm = self.distance_mm.clamp(500.0, 4200.0);
        }
    }

    fn area_px2(&self) -> f64 {
        let d_m = self.distance_mm / 1000.0;
        AREA_AT_1M / (d_m * d_m)
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Publish interval for a rate in Hz.
///
/// Rejects rates that are not finite and positive, or whose period does not
/// fit a `Duration`.
fn period_from_rate(name: &str, rate_hz: f64) -> Result<Duration, String> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(format!("{} must be a positive number of Hz, got {}", name, rate_hz));
    }
    match Duration::try_from_secs_f64(1.0 / rate_hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(format!("{} of {} Hz is out of range", name, rate_hz)),
    }
}

/// PUB socket for one simulated producer.
fn bind_publisher(
    context: &zmq::Context,
    endpoint: &str,
) -> Result<zmq::Socket, Box<dyn std::error::Error>> {
    let socket = context.socket(zmq::PUB)?;
    socket.set_sndhwm(1)?;
    socket.set_linger(0)?;
    socket
        .bind(endpoint)
        .map_err(|e| format!("cannot bind {}: {}", endpoint, e))?;
    Ok(socket)
}

/// Non-blocking send; a full queue just drops the message.
fn publish(socket: &zmq::Socket, payload: &[u8], what: &str) {
    match socket.send(payload, zmq::DONTWAIT) {
        Ok(()) | Err(zmq::Error::EAGAIN) => {}
        Err(e) => log::warn!("{} send failed: {}", what, e),
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let scan_period = period_from_rate("scan rate", args.scan_rate)?;
    let detection_period = period_from_rate("detection rate", args.detection_rate)?;

    let context = zmq::Context::new();
    let detections_socket = bind_publisher(&context, &args.detections)?;
    let scan_socket = bind_publisher(&context, &args.scan)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))?;

    let listener = match &args.listen {
        Some(endpoint) => Some(spawn_listener(&context, endpoint, running.clone())?),
        None => None,
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut objects: Vec<SimObject> = (0..args.objects).map(|_| SimObject::random(&mut rng)).collect();

    log::info!(
        "Publishing {} objects: scans to {} at {} Hz, detections to {} at {} Hz",
        objects.len(),
        args.scan,
        args.scan_rate,
        args.detections,
        args.detection_rate
    );

    let started = Instant::now();
    let mut last_step = started;
    let mut next_scan = started;
    let mut next_detection = started;
    let mut frame: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if args.duration > 0.0 && now.duration_since(started).as_secs_f64() >= args.duration {
            break;
        }

        let dt = now.duration_since(last_step).as_secs_f64();
        last_step = now;
        for object in &mut objects {
            object.step(dt);
        }

        if now >= next_scan {
            let payload = encode_scan(&synth_scan(&objects, &mut rng));
            publish(&scan_socket, payload.as_bytes(), "Scan");
            next_scan += scan_period;
        }

        if now >= next_detection {
            let message = synth_detections(&objects, frame, args.detect_prob, &mut rng);
            match message.encode() {
                Ok(bytes) => publish(&detections_socket, &bytes, "Detection"),
                Err(e) => log::error!("Failed to encode detections: {}", e),
            }
            frame += 1;
            next_detection += detection_period;
        }

        thread::sleep(Duration::from_millis(5));
    }

    running.store(false, Ordering::Relaxed);
    if let Some(handle) = listener {
        let _ = handle.join();
    }

    log::info!("Sent {} detection frames", frame);
    Ok(())
}

/// One return per degree across the front hemisphere.
fn synth_scan(objects: &[SimObject], rng: &mut StdRng) -> Vec<ScanPoint> {
    (-90..=90)
        .map(|bearing| {
            let bearing = bearing as f64;
            let nearest = objects
                .iter()
                .filter(|o| (o.bearing_deg - bearing).abs() <= o.half_width_deg)
                .map(|o| o.distance_mm)
                .fold(BACKGROUND_MM, f64::min);
            let noise = rng.random_range(-15.0..15.0);
            ScanPoint::new(bearing, (nearest + noise).round())
        })
        .collect()
}

fn synth_detections(
    objects: &[SimObject],
    frame: u64,
    detect_prob: f64,
    rng: &mut StdRng,
) -> DetectionsMessage {
    let mut detections = Vec::new();
    for (i, o) in objects.iter().enumerate() {
        if o.bearing_deg.abs() > CAMERA_HALF_FOV_DEG || !rng.random_bool(detect_prob.clamp(0.0, 1.0)) {
            continue;
        }

        let area = o.area_px2() * rng.random_range(0.9..1.1);
        let half = area.sqrt() / 2.0;
        let cx = 640.0 + o.bearing_deg / CAMERA_HALF_FOV_DEG * 640.0;
        detections.push(DetectionEntry {
            label: o.label.to_string(),
            confidence: rng.random_range(0.55..0.95),
            angle_deg: o.bearing_deg + rng.random_range(-1.0..1.0),
            area,
            bbox: Some([cx - half, 360.0 - half, cx + half, 360.0 + half]),
            track_id: Some(i as i64),
        });
    }

    DetectionsMessage {
        timestamp: Some(drishti::core::math::unix_time_secs()),
        frame: Some(frame),
        detections,
    }
}

/// Print every tracked-objects message published on `endpoint`.
fn spawn_listener(
    context: &zmq::Context,
    endpoint: &str,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>, Box<dyn std::error::Error>> {
    let socket = context.socket(zmq::SUB)?;
    socket.set_conflate(true)?;
    socket.set_linger(0)?;
    socket.set_rcvtimeo(100)?;
    socket
        .connect(endpoint)
        .map_err(|e| format!("cannot connect {}: {}", endpoint, e))?;
    socket.set_subscribe(b"")?;
    log::info!("Listening for tracked objects on {}", endpoint);

    let handle = thread::Builder::new()
        .name("sim-listener".into())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                let payload = match socket.recv_bytes(0) {
                    Ok(payload) => payload,
                    Err(zmq::Error::EAGAIN) | Err(zmq::Error::EINTR) => continue,
                    Err(e) => {
                        log::error!("Listener recv error: {}", e);
                        thread::sleep(Duration::from_millis(100));
                        continue;
                    }
                };

                match ObjectsMessage::decode(&payload) {
                    Ok(message) => print_objects(&message),
                    Err(e) => log::warn!("Bad objects message: {}", e),
                }
            }
        })?;
    Ok(handle)
}

fn print_objects(message: &ObjectsMessage) {
    let summary: Vec<String> = message
        .objects
        .iter()
        .map(|o| match o.distance_mm {
            Some(d) => format!("{} {:+.1}° {:.0}mm", o.label, o.angle_deg, d),
            None => format!("{} {:+.1}° ?", o.label, o.angle_deg),
        })
        .collect();
    println!("[{:.3}] {} objects: {}", message.timestamp, message.objects.len(), summary.join(", "));
}

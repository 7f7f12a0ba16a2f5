//! airsniff — ESP-IDF std firmware
//!
//! Thread-based implementation using FreeRTOS threads and std::sync::mpsc
//! channels. The WiFi driver's promiscuous callback copies each frame header
//! into a bounded channel; a capture thread feeds them to the session, while
//! the main thread reads NDJSON commands from the serial console. Both paths
//! take the same session lock.

mod led;

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use airsniff::board;
use airsniff::comm::{self, LineReader};
use airsniff::protocol::{DeviceMessage, MsgBuffer, VERSION};
use airsniff::radio::{Radio, RadioConfig, RadioController};
use airsniff::reporter::{ReportSink, Reporter};
use airsniff::{CaptureSession, Frame};

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::sys::{
    esp, esp_random, esp_wifi_get_channel, esp_wifi_set_channel, esp_wifi_set_country,
    esp_wifi_set_promiscuous, esp_wifi_set_promiscuous_rx_cb, wifi_country_t,
    wifi_promiscuous_pkt_t, wifi_promiscuous_pkt_type_t, wifi_second_chan_t,
    wifi_second_chan_t_WIFI_SECOND_CHAN_NONE, EspError,
};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};

use led::Led;

/// Header bytes kept per frame; enough for the sender address.
const HEADER_COPY: usize = 32;

/// One frame as copied out of the driver callback.
struct CapturedFrame {
    /// Session generation current when the driver delivered the frame
    generation: u32,
    header: heapless::Vec<u8, HEADER_COPY>,
    len: u16,
    channel: u8,
    tag: u32,
}

type Session = CaptureSession<EspRadio, FreeRtos, ChannelSink, Led>;

// ── Global frame channel sender (for WiFi promisc callback) ──────────

static FRAME_TX: Mutex<Option<SyncSender<CapturedFrame>>> = Mutex::new(None);

/// Mirror of `CaptureSession::generation`, published by the command loop.
static GENERATION: AtomicU32 = AtomicU32::new(0);

// ── WiFi promiscuous callback ────────────────────────────────────────

/// WiFi promiscuous mode callback.
///
/// Runs in the WiFi driver task context (not ISR on ESP-IDF, but still
/// must be non-blocking). Copies the header and sends it to the capture
/// thread via try_send; frames are dropped when the channel is full.
unsafe extern "C" fn promisc_rx_cb(buf: *mut std::ffi::c_void, pkt_type: wifi_promiscuous_pkt_type_t) {
    let pkt = unsafe { &*(buf as *const wifi_promiscuous_pkt_t) };
    let sig_len = pkt.rx_ctrl.sig_len() as usize;
    let copy = sig_len.min(HEADER_COPY);

    // Safety: payload is `sig_len` bytes starting at pkt.payload
    let payload = unsafe { std::slice::from_raw_parts(pkt.payload.as_ptr(), copy) };

    let mut header = heapless::Vec::new();
    let _ = header.extend_from_slice(payload);
    let frame = CapturedFrame {
        generation: GENERATION.load(Ordering::Acquire),
        header,
        len: sig_len as u16,
        channel: pkt.rx_ctrl.channel() as u8,
        tag: pkt_type as u32,
    };

    if let Ok(guard) = FRAME_TX.try_lock() {
        if let Some(ref tx) = *guard {
            let _ = tx.try_send(frame);
        }
    }
}

// ── Radio driver ─────────────────────────────────────────────────────

/// WiFi driver in station mode with promiscuous capture on top.
struct EspRadio {
    _wifi: BlockingWifi<EspWifi<'static>>,
}

impl Radio for EspRadio {
    type Error = EspError;

    fn set_channel(&mut self, channel: u8) -> Result<(), EspError> {
        esp!(unsafe { esp_wifi_set_channel(channel, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE) })
    }

    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), EspError> {
        esp!(unsafe { esp_wifi_set_promiscuous(enabled) })
    }

    fn register_frame_callback(&mut self) -> Result<(), EspError> {
        esp!(unsafe { esp_wifi_set_promiscuous_rx_cb(Some(promisc_rx_cb)) })
    }

    fn unregister_frame_callback(&mut self) -> Result<(), EspError> {
        esp!(unsafe { esp_wifi_set_promiscuous_rx_cb(None) })
    }

    fn channel(&self) -> u8 {
        let mut primary = 0u8;
        let mut second: wifi_second_chan_t = wifi_second_chan_t_WIFI_SECOND_CHAN_NONE;
        match esp!(unsafe { esp_wifi_get_channel(&mut primary, &mut second) }) {
            Ok(()) => primary,
            Err(_) => 0,
        }
    }

    fn random(&mut self) -> u32 {
        unsafe { esp_random() }
    }
}

// ── Output sink ──────────────────────────────────────────────────────

/// Hands serialized lines to the output thread; drops when full.
struct ChannelSink(SyncSender<MsgBuffer>);

impl ReportSink for ChannelSink {
    fn emit(&mut self, line: &[u8]) {
        if let Ok(msg) = MsgBuffer::from_slice(line) {
            let _ = self.0.try_send(msg);
        }
    }
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();

    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("airsniff v{} starting on {} (std)", VERSION, board::BOARD_NAME);

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── Channels ─────────────────────────────────────────────────────

    let (frame_tx, frame_rx) = mpsc::sync_channel::<CapturedFrame>(32);
    let (output_tx, output_rx) = mpsc::sync_channel::<MsgBuffer>(16);

    // Store frame_tx globally for WiFi promisc callback
    *FRAME_TX.lock().map_err(|_| anyhow::anyhow!("frame channel lock poisoned"))? = Some(frame_tx);

    // ── WiFi driver ──────────────────────────────────────────────────

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi.set_configuration(&esp_idf_svc::wifi::Configuration::Client(Default::default()))?;

    // Full 1-13 band
    let country = wifi_country_t {
        cc: [b'U' as _, b'S' as _, 0],
        schan: 1,
        nchan: 13,
        ..Default::default()
    };
    unsafe {
        esp!(esp_wifi_set_country(&country))?;
    }
    wifi.start()?;
    log::info!("WiFi driver started");

    // ── Session ──────────────────────────────────────────────────────

    let radio = RadioController::new(EspRadio { _wifi: wifi }, FreeRtos, RadioConfig::new());
    let reporter = Reporter::new(ChannelSink(output_tx), Led::new()?);
    let session: Arc<Mutex<Session>> = Arc::new(Mutex::new(CaptureSession::new(radio, reporter)));

    // ── Output thread ────────────────────────────────────────────────

    thread::Builder::new()
        .name("output".into())
        .stack_size(4096)
        .spawn(move || {
            output_thread(output_rx);
        })?;
    log::info!("Output thread spawned");

    // ── Capture thread ───────────────────────────────────────────────

    let capture_session = Arc::clone(&session);
    thread::Builder::new()
        .name("capture".into())
        .stack_size(4096)
        .spawn(move || {
            capture_thread(frame_rx, capture_session);
        })?;
    log::info!("Capture thread spawned");

    // ── Commands — run on main thread ────────────────────────────────

    log::info!(
        "Ready at {} baud; send {{\"cmd\":\"start\"}} to begin",
        comm::SERIAL_BAUD
    );
    command_loop(session)
}

// ── Capture thread ───────────────────────────────────────────────────

fn capture_thread(frame_rx: mpsc::Receiver<CapturedFrame>, session: Arc<Mutex<Session>>) {
    log::info!("Capture thread started");

    while let Ok(captured) = frame_rx.recv() {
        let frame = Frame {
            data: &captured.header,
            len: captured.len,
            channel: captured.channel,
            tag: captured.tag,
        };
        match session.lock() {
            Ok(mut s) => {
                s.on_queued_frame(captured.generation, &frame);
            }
            Err(_) => {
                log::error!("Session lock poisoned, capture thread exiting");
                return;
            }
        }
    }
}

// ── Output thread ────────────────────────────────────────────────────

fn output_thread(output_rx: mpsc::Receiver<MsgBuffer>) {
    log::info!("Output thread started");

    let mut stdout = std::io::stdout();
    while let Ok(msg) = output_rx.recv() {
        if stdout.write_all(&msg).and_then(|()| stdout.flush()).is_err() {
            log::warn!("Serial write failed");
        }
    }
}

// ── Command loop ─────────────────────────────────────────────────────

fn command_loop(session: Arc<Mutex<Session>>) -> ! {
    let mut stdin = std::io::stdin();
    let mut reader = LineReader::new();
    let mut buf = [0u8; 64];

    loop {
        let n = match stdin.read(&mut buf) {
            Ok(n) if n > 0 => n,
            // Console VFS is non-blocking: nothing pending
            _ => {
                thread::sleep(Duration::from_millis(20));
                continue;
            }
        };

        for &byte in &buf[..n] {
            let Some(line) = reader.feed(byte) else {
                continue;
            };
            let Ok(mut s) = session.lock() else {
                log::error!("Session lock poisoned");
                continue;
            };
            match comm::parse_command(line) {
                Ok(cmd) => {
                    let _ = comm::handle_command(&cmd, &mut s);
                    // Frames still queued from an earlier capture go stale
                    GENERATION.store(s.generation(), Ordering::Release);
                }
                Err(e) => {
                    log::warn!("Rejected command line: {}", e);
                    s.emit(&DeviceMessage::Error {
                        cmd: "unknown",
                        error: e.code(),
                    });
                }
            }
        }
    }
}

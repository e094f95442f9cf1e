//! Telemetry consumer: reads the EKF snapshot on two independent cadences
//! and encodes MAVLink frames for a sink, decoupled from the producer by a
//! bounded channel so a slow sink never stalls the estimator thread.

use crate::ekf::EkfFacade;
use crate::mavlink::{self, GlobalPositionInt, Heartbeat, Message};
use crossbeam::channel::{tick, Receiver, Sender, TrySendError};
use log::{info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One encoded MAVLink frame, tagged with the message it carries so a sink
/// can log or route without re-parsing the bytes.
pub struct TelemetryFrame {
    pub message_name: &'static str,
    pub bytes: Vec<u8>,
}

/// Reference sink: logs each frame as it arrives. A real deployment would
/// swap in a socket or serial writer behind the same channel without
/// touching the producer.
pub fn logging_sink(rx: Receiver<TelemetryFrame>) -> JoinHandle<()> {
    thread::spawn(move || {
        for frame in rx.iter() {
            info!("telemetry: {} ({} bytes)", frame.message_name, frame.bytes.len());
        }
    })
}

/// Producer side: a 1 Hz heartbeat and a 5 Hz global-position-int, each
/// built from the facade's current snapshot.
pub struct TelemetryTx {
    handle: Option<JoinHandle<()>>,
}

impl TelemetryTx {
    pub fn spawn(ekf: Arc<EkfFacade>, out: Sender<TelemetryFrame>, shutdown: Receiver<()>) -> Self {
        let handle = thread::spawn(move || {
            let heartbeat_tick = tick(Duration::from_secs(1));
            let position_tick = tick(Duration::from_millis(200));
            let mut seq: u8 = 0;
            loop {
                crossbeam::channel::select! {
                    recv(heartbeat_tick) -> _ => {
                        let heartbeat = Message::Heartbeat(Heartbeat {
                            mav_type: 2,
                            autopilot: 3,
                            base_mode: 0,
                            custom_mode: 0,
                            system_status: 4,
                            mavlink_version: 3,
                        });
                        let bytes = mavlink::encode_frame(seq, 1, 1, &heartbeat);
                        seq = seq.wrapping_add(1);
                        send_or_warn(&out, "HEARTBEAT", bytes);
                    }
                    recv(position_tick) -> _ => {
                        let snap = ekf.snapshot();
                        let position = Message::GlobalPositionInt(GlobalPositionInt {
                            time_boot_ms: 0,
                            lat: (snap.position.x * 1e7) as i32,
                            lon: (snap.position.y * 1e7) as i32,
                            alt: (snap.position.z * 1000.0) as i32,
                            relative_alt: (snap.position.z * 1000.0) as i32,
                            vx: (snap.velocity.x * 100.0) as i16,
                            vy: (snap.velocity.y * 100.0) as i16,
                            vz: (snap.velocity.z * 100.0) as i16,
                            hdg: 0,
                        });
                        let bytes = mavlink::encode_frame(seq, 1, 1, &position);
                        seq = seq.wrapping_add(1);
                        send_or_warn(&out, "GLOBAL_POSITION_INT", bytes);
                    }
                    recv(shutdown) -> _ => break,
                }
            }
        });
        TelemetryTx { handle: Some(handle) }
    }

    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn send_or_warn(out: &Sender<TelemetryFrame>, message_name: &'static str, bytes: Vec<u8>) {
    match out.try_send(TelemetryFrame { message_name, bytes }) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(_)) => warn!("telemetry sink fell behind, dropping {message_name} frame"),
    }
}

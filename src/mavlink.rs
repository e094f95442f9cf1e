//! MAVLink v1.0 frame encode/decode. Pure in-memory serialization — no
//! networking of any kind, per the telemetry-byte-stream scope: a caller
//! owns whatever socket or serial port the bytes travel over.

use crate::error::{EstimatorError, Result};

pub const MAGIC: u8 = 0xFE;
pub const HEARTBEAT_MSG_ID: u8 = 0;
pub const GLOBAL_POSITION_INT_MSG_ID: u8 = 33;

const HEARTBEAT_CRC_EXTRA: u8 = 50;
const GLOBAL_POSITION_INT_CRC_EXTRA: u8 = 104;

/// CRC-16/MCRF4XX, the X.25-style checksum MAVLink uses over the header
/// (minus the magic byte), the payload, and a message-specific "extra" byte
/// appended only for the checksum calculation, never transmitted.
fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    let mut tmp = (byte ^ (crc as u8)) as u16;
    tmp ^= tmp << 4;
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

fn crc_for(header_tail: &[u8], payload: &[u8], crc_extra: u8) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in header_tail {
        crc = crc_accumulate(b, crc);
    }
    for &b in payload {
        crc = crc_accumulate(b, crc);
    }
    crc_accumulate(crc_extra, crc)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heartbeat {
    pub mav_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub custom_mode: u32,
    pub system_status: u8,
    pub mavlink_version: u8,
}

impl Heartbeat {
    fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        buf.extend_from_slice(&self.custom_mode.to_le_bytes());
        buf.push(self.mav_type);
        buf.push(self.autopilot);
        buf.push(self.base_mode);
        buf.push(self.system_status);
        buf.push(self.mavlink_version);
        buf
    }

    fn decode_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 9 {
            return Err(EstimatorError::SensorRead("heartbeat payload too short".into()));
        }
        Ok(Heartbeat {
            custom_mode: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            mav_type: payload[4],
            autopilot: payload[5],
            base_mode: payload[6],
            system_status: payload[7],
            mavlink_version: payload[8],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPositionInt {
    pub time_boot_ms: u32,
    pub lat: i32,
    pub lon: i32,
    pub alt: i32,
    pub relative_alt: i32,
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    pub hdg: u16,
}

impl GlobalPositionInt {
    fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(28);
        buf.extend_from_slice(&self.time_boot_ms.to_le_bytes());
        buf.extend_from_slice(&self.lat.to_le_bytes());
        buf.extend_from_slice(&self.lon.to_le_bytes());
        buf.extend_from_slice(&self.alt.to_le_bytes());
        buf.extend_from_slice(&self.relative_alt.to_le_bytes());
        buf.extend_from_slice(&self.vx.to_le_bytes());
        buf.extend_from_slice(&self.vy.to_le_bytes());
        buf.extend_from_slice(&self.vz.to_le_bytes());
        buf.extend_from_slice(&self.hdg.to_le_bytes());
        buf
    }

    fn decode_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 28 {
            return Err(EstimatorError::SensorRead("global_position_int payload too short".into()));
        }
        let i32_at = |o: usize| i32::from_le_bytes([payload[o], payload[o + 1], payload[o + 2], payload[o + 3]]);
        let i16_at = |o: usize| i16::from_le_bytes([payload[o], payload[o + 1]]);
        Ok(GlobalPositionInt {
            time_boot_ms: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            lat: i32_at(4),
            lon: i32_at(8),
            alt: i32_at(12),
            relative_alt: i32_at(16),
            vx: i16_at(20),
            vy: i16_at(22),
            vz: i16_at(24),
            hdg: u16::from_le_bytes([payload[26], payload[27]]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Heartbeat(Heartbeat),
    GlobalPositionInt(GlobalPositionInt),
}

/// Encodes `msg` into a complete v1.0 frame: 6-byte header, payload, 2-byte
/// little-endian CRC.
pub fn encode_frame(seq: u8, sys_id: u8, comp_id: u8, msg: &Message) -> Vec<u8> {
    let (msg_id, payload, crc_extra) = match msg {
        Message::Heartbeat(h) => (HEARTBEAT_MSG_ID, h.encode_payload(), HEARTBEAT_CRC_EXTRA),
        Message::GlobalPositionInt(g) => {
            (GLOBAL_POSITION_INT_MSG_ID, g.encode_payload(), GLOBAL_POSITION_INT_CRC_EXTRA)
        }
    };

    let len = payload.len() as u8;
    let header_tail = [len, seq, sys_id, comp_id, msg_id];

    let mut frame = Vec::with_capacity(6 + payload.len() + 2);
    frame.push(MAGIC);
    frame.extend_from_slice(&header_tail);
    frame.extend_from_slice(&payload);

    let crc = crc_for(&header_tail, &payload, crc_extra);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Parses one frame from the front of `bytes`, returning the message and
/// the number of bytes consumed. Rejects a bad magic byte, a truncated
/// frame, or a CRC mismatch.
pub fn decode_frame(bytes: &[u8]) -> Result<(Message, usize)> {
    if bytes.len() < 6 {
        return Err(EstimatorError::SensorRead("frame shorter than header".into()));
    }
    if bytes[0] != MAGIC {
        return Err(EstimatorError::SensorRead(format!("bad magic byte: {:#x}", bytes[0])));
    }
    let len = bytes[1] as usize;
    let seq = bytes[2];
    let sys_id = bytes[3];
    let comp_id = bytes[4];
    let msg_id = bytes[5];

    let total = 6 + len + 2;
    if bytes.len() < total {
        return Err(EstimatorError::SensorRead("frame shorter than declared length".into()));
    }

    let payload = &bytes[6..6 + len];
    let crc_extra = match msg_id {
        HEARTBEAT_MSG_ID => HEARTBEAT_CRC_EXTRA,
        GLOBAL_POSITION_INT_MSG_ID => GLOBAL_POSITION_INT_CRC_EXTRA,
        other => return Err(EstimatorError::SensorRead(format!("unsupported message id {other}"))),
    };

    let header_tail = [len as u8, seq, sys_id, comp_id, msg_id];
    let expected_crc = crc_for(&header_tail, payload, crc_extra);
    let actual_crc = u16::from_le_bytes([bytes[6 + len], bytes[6 + len + 1]]);
    if expected_crc != actual_crc {
        return Err(EstimatorError::SensorRead(format!(
            "crc mismatch: expected {expected_crc:#06x}, got {actual_crc:#06x}"
        )));
    }

    let message = match msg_id {
        HEARTBEAT_MSG_ID => Message::Heartbeat(Heartbeat::decode_payload(payload)?),
        GLOBAL_POSITION_INT_MSG_ID => {
            Message::GlobalPositionInt(GlobalPositionInt::decode_payload(payload)?)
        }
        _ => unreachable!("checked above"),
    };

    Ok((message, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_roundtrips() {
        let hb = Heartbeat {
            mav_type: 2,
            autopilot: 3,
            base_mode: 0,
            custom_mode: 42,
            system_status: 4,
            mavlink_version: 3,
        };
        let frame = encode_frame(7, 1, 1, &Message::Heartbeat(hb));
        let (decoded, consumed) = decode_frame(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded, Message::Heartbeat(hb));
    }

    #[test]
    fn global_position_int_roundtrips() {
        let gp = GlobalPositionInt {
            time_boot_ms: 1000,
            lat: 377749000,
            lon: -1224194000,
            alt: 15000,
            relative_alt: 15000,
            vx: 100,
            vy: -50,
            vz: 0,
            hdg: 9000,
        };
        let frame = encode_frame(1, 1, 1, &Message::GlobalPositionInt(gp));
        let (decoded, _) = decode_frame(&frame).unwrap();
        assert_eq!(decoded, Message::GlobalPositionInt(gp));
    }

    #[test]
    fn corrupted_payload_fails_crc_check() {
        let hb = Heartbeat {
            mav_type: 2,
            autopilot: 3,
            base_mode: 0,
            custom_mode: 42,
            system_status: 4,
            mavlink_version: 3,
        };
        let mut frame = encode_frame(7, 1, 1, &Message::Heartbeat(hb));
        let last = frame.len() - 3;
        frame[last] ^= 0xFF;
        assert!(decode_frame(&frame).is_err());
    }

    #[test]
    fn bad_magic_byte_is_rejected() {
        let mut frame = encode_frame(0, 1, 1, &Message::Heartbeat(Heartbeat {
            mav_type: 0,
            autopilot: 0,
            base_mode: 0,
            custom_mode: 0,
            system_status: 0,
            mavlink_version: 3,
        }));
        frame[0] = 0x00;
        assert!(decode_frame(&frame).is_err());
    }
}

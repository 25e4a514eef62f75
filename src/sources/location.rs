//! Location providers
//!
//! Location is optional: a provider that is not ready, or has no 2D fix,
//! simply yields `None`.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Deserialize;

use crate::models::LocationSnapshot;

const GPSD_TIMEOUT: Duration = Duration::from_secs(2);

/// Lines to read while waiting for the POLL reply
const MAX_REPLY_LINES: usize = 32;

const MODE_2D: u8 = 2;
const MODE_3D: u8 = 3;

pub trait LocationProvider: Send + Sync {
    fn is_ready(&self) -> bool;
    fn current_fix(&self) -> Option<LocationSnapshot>;
}

/// Used when GPS is disabled or gpsd was unreachable at startup
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn is_ready(&self) -> bool {
        false
    }

    fn current_fix(&self) -> Option<LocationSnapshot> {
        None
    }
}

// ============================================================================
// GPSD
// ============================================================================

/// gpsd JSON protocol client (`?WATCH` + `?POLL`)
#[derive(Debug, Clone)]
pub struct GpsdProvider {
    addr: SocketAddr,
}

impl GpsdProvider {
    /// Resolve and probe gpsd once; later fetches reconnect per request
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve {}", host)))?;

        TcpStream::connect_timeout(&addr, GPSD_TIMEOUT)?;
        Ok(Self { addr })
    }

    fn fetch(&self) -> io::Result<Option<LocationSnapshot>> {
        let mut stream = TcpStream::connect_timeout(&self.addr, GPSD_TIMEOUT)?;
        stream.set_read_timeout(Some(GPSD_TIMEOUT))?;
        stream.set_write_timeout(Some(GPSD_TIMEOUT))?;
        stream.write_all(b"?WATCH={\"enable\":true};\n?POLL;\n")?;

        let reader = BufReader::new(stream);
        for line in reader.lines().take(MAX_REPLY_LINES) {
            if let Some(poll) = parse_poll(&line?) {
                return Ok(fix_from_poll(&poll));
            }
        }

        Err(io::Error::new(io::ErrorKind::TimedOut, "no POLL reply from gpsd"))
    }
}

impl LocationProvider for GpsdProvider {
    fn is_ready(&self) -> bool {
        true
    }

    fn current_fix(&self) -> Option<LocationSnapshot> {
        match self.fetch() {
            Ok(fix) => fix,
            Err(e) => {
                tracing::warn!("GPS data fetch error: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PollReply {
    class: String,
    #[serde(default)]
    tpv: Vec<Tpv>,
    #[serde(default)]
    sky: Vec<Sky>,
}

#[derive(Debug, Deserialize)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    #[serde(rename = "altMSL")]
    alt_msl: Option<f64>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sky {
    #[serde(rename = "uSat")]
    used_count: Option<u32>,
    #[serde(default)]
    satellites: Vec<Satellite>,
}

#[derive(Debug, Deserialize)]
struct Satellite {
    #[serde(default)]
    used: bool,
}

/// Parse one gpsd line, keeping only POLL replies
pub(crate) fn parse_poll(line: &str) -> Option<PollReply> {
    serde_json::from_str::<PollReply>(line)
        .ok()
        .filter(|reply| reply.class == "POLL")
}

pub(crate) fn fix_from_poll(poll: &PollReply) -> Option<LocationSnapshot> {
    let tpv = poll.tpv.first()?;
    if tpv.mode < MODE_2D {
        return None;
    }

    let altitude = if tpv.mode == MODE_3D {
        tpv.alt.or(tpv.alt_msl).unwrap_or(0.0)
    } else {
        0.0
    };

    let satellites = poll
        .sky
        .first()
        .map(|sky| {
            sky.used_count
                .unwrap_or_else(|| sky.satellites.iter().filter(|s| s.used).count() as u32)
        })
        .unwrap_or(0);

    Some(LocationSnapshot {
        latitude: tpv.lat?,
        longitude: tpv.lon?,
        altitude,
        time: tpv.time.clone(),
        satellites,
    })
}

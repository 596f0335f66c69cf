#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wallwatch::config::{Config, RegisterSpec};

#[derive(Default)]
struct Registers {
    values: HashMap<u16, u16>,
    failures: HashSet<u16>,
}

/// Minimal Modbus TCP server answering function 0x03 from a register map
pub struct FakeStation {
    addr: SocketAddr,
    registers: Arc<Mutex<Registers>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeStation {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registers = Arc::new(Mutex::new(Registers::default()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let registers = registers.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, registers.clone()));
                }
            })
        };

        Self {
            addr,
            registers,
            connections,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_u16(&self, address: u16, value: u16) {
        let mut regs = self.registers.lock().unwrap();
        regs.failures.remove(&address);
        regs.values.insert(address, value);
    }

    /// Store a 32-bit value, high word first
    pub fn set_u32(&self, address: u16, value: u32) {
        self.set_u16(address, (value >> 16) as u16);
        self.set_u16(address + 1, value as u16);
    }

    /// Spread up to 20 ASCII bytes over the tag registers, NUL padded
    pub fn set_tag(&self, specs: &[RegisterSpec; 5], text: &str) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(20, 0);
        for (spec, chunk) in specs.iter().zip(bytes.chunks(4)) {
            let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.set_u32(spec.address, value);
        }
    }

    /// Answer reads starting at `address` with an exception
    pub fn fail(&self, address: u16) {
        self.registers.lock().unwrap().failures.insert(address);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeStation {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, registers: Arc<Mutex<Registers>>) {
    let mut header = [0u8; 7];
    loop {
        if stream.read_exact(&mut header).await.is_err() {
            return;
        }
        let len = u16::from_be_bytes([header[4], header[5]]) as usize;
        let mut pdu = vec![0u8; len.saturating_sub(1)];
        if stream.read_exact(&mut pdu).await.is_err() {
            return;
        }

        let body = respond(&pdu, &registers);
        let mut frame = header[..4].to_vec();
        frame.extend_from_slice(&((body.len() + 1) as u16).to_be_bytes());
        frame.push(header[6]);
        frame.extend_from_slice(&body);
        if stream.write_all(&frame).await.is_err() {
            return;
        }
    }
}

fn respond(pdu: &[u8], registers: &Mutex<Registers>) -> Vec<u8> {
    let function = pdu.first().copied().unwrap_or(0);
    if function != 0x03 || pdu.len() < 5 {
        return vec![function | 0x80, 0x01];
    }
    let address = u16::from_be_bytes([pdu[1], pdu[2]]);
    let count = u16::from_be_bytes([pdu[3], pdu[4]]);

    let regs = registers.lock().unwrap();
    if regs.failures.contains(&address) {
        return vec![0x83, 0x02];
    }
    let mut body = vec![0x03, (count * 2) as u8];
    for offset in 0..count {
        let value = regs.values.get(&(address + offset)).copied().unwrap_or(0);
        body.extend_from_slice(&value.to_be_bytes());
    }
    body
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Config pointing at a fake station, with short timeouts
pub fn config_for(station: &FakeStation) -> Config {
    let mut config = Config::default();
    config.modbus.host = "127.0.0.1".to_string();
    config.modbus.port = station.port();
    config.modbus.connect_timeout_ms = 1000;
    config.modbus.operation_timeout_ms = 1000;
    config.session_log.enabled = false;
    config.signal.own_number = "+4917600000000".to_string();
    config.signal.recipients = vec!["+4915100000001".to_string()];
    config.poll_interval_secs = 1;
    config
}

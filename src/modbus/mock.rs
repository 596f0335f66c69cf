use super::{Connector, RegisterTransport};
use crate::error::{Result, WallwatchError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted register contents keyed by start address
#[derive(Clone, Default)]
pub struct MockTransport {
    registers: HashMap<u16, Vec<u16>>,
    failures: HashSet<u16>,
    requests: Arc<Mutex<Vec<(u16, u16)>>>,
    closes: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registers(mut self, address: u16, values: &[u16]) -> Self {
        self.set_registers(address, values);
        self
    }

    pub fn with_failure(mut self, address: u16) -> Self {
        self.failures.insert(address);
        self
    }

    pub fn set_registers(&mut self, address: u16, values: &[u16]) {
        self.failures.remove(&address);
        self.registers.insert(address, values.to_vec());
    }

    pub fn set_failure(&mut self, address: u16) {
        self.failures.insert(address);
    }

    pub fn requests(&self) -> Vec<(u16, u16)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RegisterTransport for MockTransport {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.requests.lock().unwrap().push((address, count));
        if self.failures.contains(&address) {
            return Err(WallwatchError::read(format!("mock failure at {}", address)));
        }
        let values = self.registers.get(&address).cloned().unwrap_or_default();
        Ok(values.into_iter().take(count as usize).collect())
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out clones of a shared [`MockTransport`]
#[derive(Clone, Default)]
pub struct MockConnector {
    transport: Arc<Mutex<MockTransport>>,
    refuse: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            ..Default::default()
        }
    }

    pub fn set_registers(&self, address: u16, values: &[u16]) {
        self.transport.lock().unwrap().set_registers(address, values);
    }

    pub fn set_failure(&self, address: u16) {
        self.transport.lock().unwrap().set_failure(address);
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.transport.lock().unwrap().closes()
    }

    pub fn requests(&self) -> Vec<(u16, u16)> {
        self.transport.lock().unwrap().requests()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(WallwatchError::connect("mock connection refused"));
        }
        let transport = self.transport.lock().unwrap().clone();
        Ok(Box::new(transport))
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

//! Hardware doubles for host tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::vec::Vec;

use crate::interrupts::pic::PicDriver;
use crate::io::PortIo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAccess {
    Byte(u16, u8),
    Word(u16, u16),
}

/// Records every port write; reads are served from per-port queues and
/// return 0 once a queue runs dry.
#[derive(Default)]
pub struct RecordingPorts {
    writes: Mutex<Vec<PortAccess>>,
    bytes: Mutex<HashMap<u16, VecDeque<u8>>>,
    words: Mutex<HashMap<u16, VecDeque<u16>>>,
}

impl RecordingPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaked() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }

    pub fn writes(&self) -> Vec<PortAccess> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn queue_byte(&self, port: u16, value: u8) {
        self.bytes.lock().unwrap().entry(port).or_default().push_back(value);
    }

    pub fn queue_word(&self, port: u16, value: u16) {
        self.words.lock().unwrap().entry(port).or_default().push_back(value);
    }
}

impl PortIo for RecordingPorts {
    fn inb(&self, port: u16) -> u8 {
        self.bytes
            .lock()
            .unwrap()
            .get_mut(&port)
            .and_then(|q| q.pop_front())
            .unwrap_or(0)
    }

    fn outb(&self, port: u16, value: u8) {
        self.writes.lock().unwrap().push(PortAccess::Byte(port, value));
    }

    fn inw(&self, port: u16) -> u16 {
        self.words
            .lock()
            .unwrap()
            .get_mut(&port)
            .and_then(|q| q.pop_front())
            .unwrap_or(0)
    }

    fn outw(&self, port: u16, value: u16) {
        self.writes.lock().unwrap().push(PortAccess::Word(port, value));
    }
}

type MaskHook = Box<dyn Fn([u8; 2]) + Send + Sync>;

/// Interrupt controller double: two mask registers, an EOI log, a
/// configurable probe result and an optional hook run on every mask write.
pub struct FakePic {
    name: &'static str,
    present: bool,
    masks: Mutex<[u8; 2]>,
    eois: Mutex<Vec<u8>>,
    init: Mutex<Option<(u8, u8, bool)>>,
    mask_hook: Mutex<Option<MaskHook>>,
}

impl FakePic {
    pub fn leaked(name: &'static str, present: bool) -> &'static Self {
        Box::leak(Box::new(Self {
            name,
            present,
            masks: Mutex::new([0, 0]),
            eois: Mutex::new(Vec::new()),
            init: Mutex::new(None),
            mask_hook: Mutex::new(None),
        }))
    }

    pub fn eois(&self) -> Vec<u8> {
        self.eois.lock().unwrap().clone()
    }

    pub fn init_args(&self) -> Option<(u8, u8, bool)> {
        *self.init.lock().unwrap()
    }

    /// Runs `hook` with the new masks after each `set_masks`.
    pub fn on_set_masks(&self, hook: impl Fn([u8; 2]) + Send + Sync + 'static) {
        *self.mask_hook.lock().unwrap() = Some(Box::new(hook));
    }
}

impl PicDriver for FakePic {
    fn name(&self) -> &'static str {
        self.name
    }

    fn probe(&self) -> bool {
        self.present
    }

    fn initialize(&self, primary_base: u8, secondary_base: u8, auto_eoi: bool) {
        *self.init.lock().unwrap() = Some((primary_base, secondary_base, auto_eoi));
    }

    fn send_end_of_interrupt(&self, irq: u8) {
        self.eois.lock().unwrap().push(irq);
    }

    fn masks(&self) -> [u8; 2] {
        *self.masks.lock().unwrap()
    }

    fn set_masks(&self, masks: [u8; 2]) {
        *self.masks.lock().unwrap() = masks;
        if let Some(hook) = self.mask_hook.lock().unwrap().as_ref() {
            hook(masks);
        }
    }
}

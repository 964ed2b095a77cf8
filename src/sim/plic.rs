use crate::arch::Mmio;
use crate::param::NCPU;
use crate::trap::plic::{
    CLAIM_OFFSET, CONTEXT_BASE, CONTEXT_STRIDE, ENABLE_BASE, ENABLE_STRIDE, PENDING_BASE,
    PRIORITY_BASE,
};

/// Sources the model implements (ids 1..64). Higher ids behave like
/// missing sources: priority reads back 0 and never raises.
pub const SIM_SOURCES: usize = 64;

const CONTEXTS: usize = 2 * NCPU;
const WORDS: usize = SIM_SOURCES / 32;
const PRIORITY_MASK: u32 = 0b111;

/// A PLIC behind the QEMU `virt` register layout.
///
/// Claim reads pick the highest-priority pending source that is enabled
/// for the context and above its threshold (lowest id on ties), clear its
/// pending bit and hold it in service until the matching completion.
#[derive(Clone, Debug)]
pub struct SimPlic {
    base: usize,
    priority: [u32; SIM_SOURCES],
    pending: u64,
    in_service: u64,
    enable: [[u32; WORDS]; CONTEXTS],
    threshold: [u32; CONTEXTS],
    completions: [u32; SIM_SOURCES],
    complete_writes: u32,
}

impl SimPlic {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            priority: [0; SIM_SOURCES],
            pending: 0,
            in_service: 0,
            enable: [[0; WORDS]; CONTEXTS],
            threshold: [0; CONTEXTS],
            completions: [0; SIM_SOURCES],
            complete_writes: 0,
        }
    }

    /// A device asserts its interrupt line. Ignored while the source is
    /// in service: the gateway forwards nothing until completion.
    pub fn raise(&mut self, id: u32) {
        let id = id as usize;
        if id == 0 || id >= SIM_SOURCES || self.in_service & (1 << id) != 0 {
            return;
        }
        self.pending |= 1 << id;
    }

    pub fn is_pending(&self, id: u32) -> bool {
        (id as usize) < SIM_SOURCES && self.pending & (1 << id) != 0
    }

    pub fn in_service(&self, id: u32) -> bool {
        (id as usize) < SIM_SOURCES && self.in_service & (1 << id) != 0
    }

    /// Accepted completions of `id`.
    pub fn completions(&self, id: u32) -> u32 {
        self.completions.get(id as usize).copied().unwrap_or(0)
    }

    /// Every write to any claim/complete register, accepted or not.
    pub fn complete_writes(&self) -> u32 {
        self.complete_writes
    }

    fn enabled(&self, ctx: usize, id: usize) -> bool {
        self.enable[ctx][id / 32] & (1 << (id % 32)) != 0
    }

    fn claim(&mut self, ctx: usize) -> u32 {
        let mut best: Option<(usize, u32)> = None;
        for id in 1..SIM_SOURCES {
            if self.pending & (1 << id) == 0 || !self.enabled(ctx, id) {
                continue;
            }
            let priority = self.priority[id];
            if priority <= self.threshold[ctx] {
                continue;
            }
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((id, priority));
            }
        }
        match best {
            Some((id, _)) => {
                self.pending &= !(1 << id);
                self.in_service |= 1 << id;
                id as u32
            }
            None => 0,
        }
    }

    fn complete(&mut self, ctx: usize, id: u32) {
        self.complete_writes += 1;
        let id = id as usize;
        if id == 0 || id >= SIM_SOURCES || !self.enabled(ctx, id) {
            return;
        }
        if self.in_service & (1 << id) != 0 {
            self.in_service &= !(1 << id);
            self.completions[id] += 1;
        }
    }
}

/// Register decoded from an offset into the PLIC window.
enum Reg {
    Priority(usize),
    Pending(usize),
    Enable { ctx: usize, word: usize },
    Threshold(usize),
    Claim(usize),
    Unmapped,
}

fn decode(offset: usize) -> Reg {
    if offset < PENDING_BASE {
        let id = (offset - PRIORITY_BASE) / 4;
        return if id < SIM_SOURCES {
            Reg::Priority(id)
        } else {
            Reg::Unmapped
        };
    }
    if offset < ENABLE_BASE {
        let word = (offset - PENDING_BASE) / 4;
        return if word < WORDS {
            Reg::Pending(word)
        } else {
            Reg::Unmapped
        };
    }
    if offset < CONTEXT_BASE {
        let ctx = (offset - ENABLE_BASE) / ENABLE_STRIDE;
        let word = (offset - ENABLE_BASE) % ENABLE_STRIDE / 4;
        return if ctx < CONTEXTS && word < WORDS {
            Reg::Enable { ctx, word }
        } else {
            Reg::Unmapped
        };
    }
    let ctx = (offset - CONTEXT_BASE) / CONTEXT_STRIDE;
    if ctx >= CONTEXTS {
        return Reg::Unmapped;
    }
    match (offset - CONTEXT_BASE) % CONTEXT_STRIDE {
        0 => Reg::Threshold(ctx),
        CLAIM_OFFSET => Reg::Claim(ctx),
        _ => Reg::Unmapped,
    }
}

impl SimPlic {
    fn reg(&self, addr: usize) -> Reg {
        match addr.checked_sub(self.base) {
            Some(offset) if offset % 4 == 0 => decode(offset),
            _ => Reg::Unmapped,
        }
    }
}

impl Mmio for SimPlic {
    fn read8(&mut self, _addr: usize) -> u8 {
        0
    }

    fn write8(&mut self, _addr: usize, _value: u8) {}

    fn read32(&mut self, addr: usize) -> u32 {
        match self.reg(addr) {
            Reg::Priority(id) => self.priority[id],
            Reg::Pending(word) => (self.pending >> (word * 32)) as u32,
            Reg::Enable { ctx, word } => self.enable[ctx][word],
            Reg::Threshold(ctx) => self.threshold[ctx],
            Reg::Claim(ctx) => self.claim(ctx),
            Reg::Unmapped => 0,
        }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        match self.reg(addr) {
            // source 0 does not exist
            Reg::Priority(0) => {}
            Reg::Priority(id) => self.priority[id] = value & PRIORITY_MASK,
            Reg::Enable { ctx, word } => {
                let value = if word == 0 { value & !1 } else { value };
                self.enable[ctx][word] = value;
            }
            Reg::Threshold(ctx) => self.threshold[ctx] = value & PRIORITY_MASK,
            Reg::Claim(ctx) => self.complete(ctx, value),
            Reg::Pending(_) | Reg::Unmapped => {}
        }
    }
}

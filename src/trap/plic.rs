//! The RISC-V Platform Level Interrupt Controller (PLIC).
//!
//! Each hart has a machine-mode and a supervisor-mode context; the kernel
//! only ever programs the supervisor one, `2 * hart + 1`.

use core::num::NonZeroU32;

use log::{debug, warn};

use crate::arch::Mmio;
use crate::error::{KernelError, Result};
use crate::param::{HartId, NCPU};

// register offsets from the PLIC base, qemu virt layout.
pub(crate) const PRIORITY_BASE: usize = 0x0; // one word per source
pub(crate) const PENDING_BASE: usize = 0x1000; // pending bitmap
pub(crate) const ENABLE_BASE: usize = 0x2000; // per-context enable bitmap
pub(crate) const ENABLE_STRIDE: usize = 0x80;
pub(crate) const CONTEXT_BASE: usize = 0x20_0000; // per-context threshold
pub(crate) const CONTEXT_STRIDE: usize = 0x1000;
pub(crate) const CLAIM_OFFSET: usize = 0x4; // claim/complete, after threshold

/// Highest source id the controller can address.
pub const MAX_SOURCE: u32 = 1023;

/// An interrupt source id. Id 0 is what the claim register returns when
/// nothing is pending, so it is never a valid source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(NonZeroU32);

impl SourceId {
    pub const fn new(id: u32) -> Result<Self> {
        if id > MAX_SOURCE {
            return Err(KernelError::InvalidSource(id));
        }
        match NonZeroU32::new(id) {
            Some(id) => Ok(Self(id)),
            None => Err(KernelError::InvalidSource(id)),
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }

    // enable bitmaps pack 32 sources per word.
    const fn word(self) -> usize {
        (self.get() / 32) as usize
    }

    const fn bit(self) -> u32 {
        1 << (self.get() % 32)
    }
}

/// Source priority. 0 means "never interrupt".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const DISABLED: Priority = Priority(0);
    pub const DEFAULT: Priority = Priority(1);
    pub const MAX: Priority = Priority(7);
    /// Threshold that lets every source with a nonzero priority through.
    pub const ACCEPT_ALL: Priority = Priority(0);

    pub const fn new(level: u32) -> Result<Self> {
        if level <= Self::MAX.0 as u32 {
            Ok(Self(level as u8))
        } else {
            Err(KernelError::InvalidPriority(level))
        }
    }

    pub const fn get(self) -> u32 {
        self.0 as u32
    }
}

/// How far a hart's context has been brought up. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlicState {
    Uninitialized,
    /// Source priorities are written.
    Configured,
    /// The hart's threshold is set; claims can succeed.
    Armed,
}

/// Ownership of one claimed interrupt. Handing it back to
/// [`Plic::complete`] is the only way to let the source fire again.
#[must_use = "a claimed interrupt stays masked until it is completed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Claim {
    hart: HartId,
    source: SourceId,
}

impl Claim {
    pub fn hart(&self) -> HartId {
        self.hart
    }

    pub fn source(&self) -> SourceId {
        self.source
    }
}

pub struct Plic<M: Mmio> {
    io: M,
    base: usize,
    state: [PlicState; NCPU],
}

impl<M: Mmio> Plic<M> {
    pub const fn new(io: M, base: usize) -> Self {
        Self {
            io,
            base,
            state: [PlicState::Uninitialized; NCPU],
        }
    }

    pub fn io(&self) -> &M {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut M {
        &mut self.io
    }

    pub fn state(&self, hart: HartId) -> PlicState {
        self.state[hart.get()]
    }

    /// Gives every source in `sources` a non-zero priority, so the
    /// controller forwards it once enabled.
    pub fn configure(&mut self, sources: &[SourceId]) {
        for &source in sources {
            self.set_priority(source, Priority::DEFAULT);
            // missing sources are hardwired to zero.
            if self.priority(source) == Priority::DISABLED {
                warn!("source {} did not accept a priority", source.get());
            }
        }
        for state in self.state.iter_mut() {
            if *state == PlicState::Uninitialized {
                *state = PlicState::Configured;
            }
        }
        debug!("configured {} interrupt sources", sources.len());
    }

    pub fn set_priority(&mut self, source: SourceId, priority: Priority) {
        let addr = self.priority_addr(source);
        self.io.write32(addr, priority.get());
    }

    pub fn priority(&mut self, source: SourceId) -> Priority {
        let addr = self.priority_addr(source);
        let raw = self.io.read32(addr);
        // only the low three bits are implemented.
        Priority((raw & 0b111) as u8)
    }

    pub fn is_pending(&mut self, source: SourceId) -> bool {
        let addr = self.base + PENDING_BASE + 4 * source.word();
        self.io.read32(addr) & source.bit() != 0
    }

    /// Sets the source's enable bit for the hart's supervisor context.
    pub fn enable(&mut self, hart: HartId, source: SourceId) {
        let addr = self.enable_addr(hart, source);
        let word = self.io.read32(addr);
        self.io.write32(addr, word | source.bit());
    }

    pub fn disable(&mut self, hart: HartId, source: SourceId) {
        let addr = self.enable_addr(hart, source);
        let word = self.io.read32(addr);
        self.io.write32(addr, word & !source.bit());
    }

    pub fn is_enabled(&mut self, hart: HartId, source: SourceId) -> bool {
        let addr = self.enable_addr(hart, source);
        self.io.read32(addr) & source.bit() != 0
    }

    /// Sets the priority a source must exceed to reach the hart.
    pub fn set_threshold(&mut self, hart: HartId, level: Priority) {
        let addr = self.threshold_addr(hart);
        self.io.write32(addr, level.get());
        let state = &mut self.state[hart.get()];
        if *state == PlicState::Configured {
            *state = PlicState::Armed;
        }
    }

    pub fn threshold(&mut self, hart: HartId) -> Priority {
        let addr = self.threshold_addr(hart);
        let raw = self.io.read32(addr);
        Priority((raw & 0b111) as u8)
    }

    /// Asks the PLIC which interrupt the hart should serve.
    pub fn claim(&mut self, hart: HartId) -> Option<Claim> {
        let addr = self.claim_addr(hart);
        let id = self.io.read32(addr);
        // out-of-range ids cannot come from real hardware; treat as none.
        let source = SourceId::new(id).ok()?;
        Some(Claim { hart, source })
    }

    /// Tells the PLIC the hart has served this interrupt.
    pub fn complete(&mut self, claim: Claim) {
        let Claim { hart, source } = claim;
        let addr = self.claim_addr(hart);
        self.io.write32(addr, source.get());
    }

    fn priority_addr(&self, source: SourceId) -> usize {
        self.base + PRIORITY_BASE + 4 * source.get() as usize
    }

    fn enable_addr(&self, hart: HartId, source: SourceId) -> usize {
        self.base + ENABLE_BASE + ENABLE_STRIDE * s_context(hart) + 4 * source.word()
    }

    fn threshold_addr(&self, hart: HartId) -> usize {
        self.base + CONTEXT_BASE + CONTEXT_STRIDE * s_context(hart)
    }

    fn claim_addr(&self, hart: HartId) -> usize {
        self.threshold_addr(hart) + CLAIM_OFFSET
    }
}

// supervisor-mode context of a hart.
const fn s_context(hart: HartId) -> usize {
    2 * hart.get() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::layout::{PLIC, UART0_IRQ, VIRTIO0_IRQ};
    use crate::sim::SimPlic;

    fn source(id: u32) -> SourceId {
        SourceId::new(id).unwrap()
    }

    fn hart(id: usize) -> HartId {
        HartId::new(id).unwrap()
    }

    fn armed(sources: &[SourceId]) -> Plic<SimPlic> {
        let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
        plic.configure(sources);
        for &s in sources {
            plic.enable(HartId::BOOT, s);
        }
        plic.set_threshold(HartId::BOOT, Priority::ACCEPT_ALL);
        plic
    }

    #[test]
    fn source_ids_exclude_sentinel() {
        assert_eq!(SourceId::new(0), Err(KernelError::InvalidSource(0)));
        assert_eq!(source(1).get(), 1);
        assert_eq!(source(MAX_SOURCE).get(), MAX_SOURCE);
        assert_eq!(
            SourceId::new(MAX_SOURCE + 1),
            Err(KernelError::InvalidSource(MAX_SOURCE + 1))
        );
    }

    #[test]
    fn priorities_are_three_bits() {
        assert_eq!(Priority::new(7), Ok(Priority::MAX));
        assert_eq!(Priority::new(8), Err(KernelError::InvalidPriority(8)));
    }

    #[test]
    fn register_addresses_follow_virt_layout() {
        let plic = Plic::new(SimPlic::new(PLIC), PLIC);
        assert_eq!(plic.priority_addr(source(10)), 0x0c00_0028);
        assert_eq!(plic.enable_addr(hart(0), source(10)), 0x0c00_2080);
        assert_eq!(plic.enable_addr(hart(1), source(33)), 0x0c00_2184);
        assert_eq!(plic.threshold_addr(hart(0)), 0x0c20_1000);
        assert_eq!(plic.claim_addr(hart(0)), 0x0c20_1004);
        assert_eq!(plic.claim_addr(hart(2)), 0x0c20_5004);
    }

    #[test]
    fn state_moves_forward_only() {
        let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
        assert_eq!(plic.state(HartId::BOOT), PlicState::Uninitialized);

        // arming before configuration does not skip a state.
        plic.set_threshold(HartId::BOOT, Priority::ACCEPT_ALL);
        assert_eq!(plic.state(HartId::BOOT), PlicState::Uninitialized);

        plic.configure(&[source(UART0_IRQ)]);
        assert_eq!(plic.state(hart(3)), PlicState::Configured);
        plic.set_threshold(HartId::BOOT, Priority::ACCEPT_ALL);
        assert_eq!(plic.state(HartId::BOOT), PlicState::Armed);

        plic.configure(&[source(UART0_IRQ)]);
        assert_eq!(plic.state(HartId::BOOT), PlicState::Armed);
    }

    #[test]
    fn configure_writes_default_priority() {
        let plic = &mut armed(&[source(UART0_IRQ), source(VIRTIO0_IRQ)]);
        assert_eq!(plic.priority(source(UART0_IRQ)), Priority::DEFAULT);
        assert_eq!(plic.priority(source(VIRTIO0_IRQ)), Priority::DEFAULT);
        assert_eq!(plic.priority(source(2)), Priority::DISABLED);
    }

    #[test]
    fn enable_preserves_other_bits() {
        let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
        plic.enable(HartId::BOOT, source(1));
        plic.enable(HartId::BOOT, source(10));
        plic.enable(HartId::BOOT, source(33));
        assert!(plic.is_enabled(HartId::BOOT, source(1)));
        assert!(plic.is_enabled(HartId::BOOT, source(10)));
        assert!(plic.is_enabled(HartId::BOOT, source(33)));
        assert!(!plic.is_enabled(hart(1), source(10)));

        plic.disable(HartId::BOOT, source(1));
        assert!(!plic.is_enabled(HartId::BOOT, source(1)));
        assert!(plic.is_enabled(HartId::BOOT, source(10)));

        let addr0 = plic.enable_addr(HartId::BOOT, source(1));
        let addr1 = plic.enable_addr(HartId::BOOT, source(33));
        let word0 = plic.io_mut().read32(addr0);
        let word1 = plic.io_mut().read32(addr1);
        assert_eq!(word0, 1 << 10);
        assert_eq!(word1, 1 << 1);
    }

    #[test]
    fn claim_then_complete() {
        let uart = source(UART0_IRQ);
        let mut plic = armed(&[uart]);
        assert_eq!(plic.claim(HartId::BOOT), None);

        plic.io_mut().raise(UART0_IRQ);
        assert!(plic.is_pending(uart));
        let claim = plic.claim(HartId::BOOT).unwrap();
        assert_eq!(claim.source(), uart);
        assert_eq!(claim.hart(), HartId::BOOT);
        assert!(!plic.is_pending(uart));

        // in service: raising again is held back by the gateway.
        plic.io_mut().raise(UART0_IRQ);
        assert_eq!(plic.claim(HartId::BOOT), None);

        plic.complete(claim);
        assert_eq!(plic.io().completions(UART0_IRQ), 1);
        assert_eq!(plic.claim(HartId::BOOT), None);
    }

    #[test]
    fn claim_prefers_higher_priority() {
        let uart = source(UART0_IRQ);
        let disk = source(VIRTIO0_IRQ);
        let mut plic = armed(&[uart, disk]);
        plic.set_priority(uart, Priority::MAX);
        plic.io_mut().raise(VIRTIO0_IRQ);
        plic.io_mut().raise(UART0_IRQ);

        let first = plic.claim(HartId::BOOT).unwrap();
        assert_eq!(first.source(), uart);
        let second = plic.claim(HartId::BOOT).unwrap();
        assert_eq!(second.source(), disk);
        plic.complete(first);
        plic.complete(second);
    }

    #[test]
    fn threshold_masks_lower_priorities() {
        let uart = source(UART0_IRQ);
        let mut plic = armed(&[uart]);
        plic.set_threshold(HartId::BOOT, Priority::DEFAULT);
        assert_eq!(plic.threshold(HartId::BOOT), Priority::DEFAULT);
        plic.io_mut().raise(UART0_IRQ);
        assert_eq!(plic.claim(HartId::BOOT), None);

        plic.set_priority(uart, Priority::new(2).unwrap());
        assert_eq!(plic.claim(HartId::BOOT).map(|c| c.source()), Some(uart));
    }

    #[test]
    fn accept_all_threshold_passes_default_priority() {
        let uart = source(UART0_IRQ);
        let mut plic = armed(&[uart]);
        plic.set_threshold(HartId::BOOT, Priority::MAX);
        plic.set_threshold(HartId::BOOT, Priority::ACCEPT_ALL);
        assert_eq!(plic.threshold(HartId::BOOT).get(), 0);

        plic.io_mut().raise(UART0_IRQ);
        let claim = plic.claim(HartId::BOOT).unwrap();
        assert_eq!(claim.source(), uart);
        plic.complete(claim);
    }

    #[test]
    fn disabled_source_is_never_claimed() {
        let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
        plic.configure(&[source(UART0_IRQ)]);
        plic.set_threshold(HartId::BOOT, Priority::ACCEPT_ALL);
        plic.io_mut().raise(UART0_IRQ);
        assert_eq!(plic.claim(HartId::BOOT), None);
        assert_eq!(plic.claim(hart(1)), None);
    }
}

//! Supervisor trap handling.
//!
//! `kernelvec` saves the interrupted registers and calls `kerneltrap`,
//! which decodes `scause` and hands the trap to a [`Dispatcher`].

use log::{trace, warn};
use riscv::register::scause::{Exception, Interrupt, Trap};

use crate::arch::Mmio;
use crate::error::{KernelError, Result};
use crate::param::HartId;

pub mod plic;

#[cfg(test)]
mod tests_prop;

use plic::{Plic, SourceId};

// the top bit of scause is set for interrupts.
const INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

/// Splits a raw `scause` value into interrupt or exception cause.
pub fn decode_cause(scause: usize) -> Trap {
    let code = scause & !INTERRUPT_BIT;
    if scause & INTERRUPT_BIT != 0 {
        Trap::Interrupt(Interrupt::from(code))
    } else {
        Trap::Exception(Exception::from(code))
    }
}

/// Services a device interrupt after the PLIC has handed it to this hart.
///
/// Handlers run in trap context with interrupts off. The dispatcher
/// completes the claim after `handle` returns, whatever the handler did.
pub trait IrqHandler {
    fn handle(&self, source: SourceId);
}

/// What one trap turned out to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapOutcome {
    /// A routed device interrupt was handled and completed.
    Serviced,
    /// The PLIC handed over a source nobody registered for. Completed anyway.
    Unrouted,
    /// An external interrupt with nothing left to claim.
    Spurious,
    /// An interrupt class the kernel does not handle yet.
    Ignored(Interrupt),
    /// A synchronous exception. The kernel cannot recover from these.
    Fatal(Exception),
}

#[derive(Clone, Copy)]
struct Route<'a> {
    source: SourceId,
    handler: &'a (dyn IrqHandler + Sync),
}

/// Owns the PLIC and a fixed table of routes from source id to handler.
pub struct Dispatcher<'a, M: Mmio, const N: usize = 4> {
    plic: Plic<M>,
    routes: [Option<Route<'a>>; N],
}

impl<'a, M: Mmio, const N: usize> Dispatcher<'a, M, N> {
    pub const fn new(plic: Plic<M>) -> Self {
        Self {
            plic,
            routes: [None; N],
        }
    }

    pub fn plic(&self) -> &Plic<M> {
        &self.plic
    }

    pub fn plic_mut(&mut self) -> &mut Plic<M> {
        &mut self.plic
    }

    /// Routes `source` to `handler`. Each source takes one handler.
    pub fn register(
        &mut self,
        source: SourceId,
        handler: &'a (dyn IrqHandler + Sync),
    ) -> Result<()> {
        if self.route(source).is_some() {
            return Err(KernelError::DuplicateRoute(source));
        }
        let slot = self
            .routes
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(KernelError::RouteTableFull)?;
        *slot = Some(Route { source, handler });
        Ok(())
    }

    pub fn is_routed(&self, source: SourceId) -> bool {
        self.route(source).is_some()
    }

    fn route(&self, source: SourceId) -> Option<&'a (dyn IrqHandler + Sync)> {
        self.routes
            .iter()
            .flatten()
            .find(|route| route.source == source)
            .map(|route| route.handler)
    }

    /// Handles one trap taken on `hart`.
    pub fn dispatch(&mut self, hart: HartId, trap: Trap) -> TrapOutcome {
        match trap {
            Trap::Interrupt(Interrupt::SupervisorExternal) => self.service_external(hart),
            Trap::Interrupt(other) => {
                trace!("hart {}: ignoring {:?}", hart.get(), other);
                TrapOutcome::Ignored(other)
            }
            Trap::Exception(cause) => TrapOutcome::Fatal(cause),
        }
    }

    /// Claims the pending device interrupt, runs its handler and
    /// completes the claim.
    pub fn service_external(&mut self, hart: HartId) -> TrapOutcome {
        let claim = match self.plic.claim(hart) {
            Some(claim) => claim,
            // another hart got there first, or the device went quiet.
            None => return TrapOutcome::Spurious,
        };

        let source = claim.source();
        let outcome = match self.route(source) {
            Some(handler) => {
                handler.handle(source);
                TrapOutcome::Serviced
            }
            None => {
                warn!("hart {}: unexpected interrupt source {}", hart.get(), source.get());
                TrapOutcome::Unrouted
            }
        };

        // always complete, or the source never fires again.
        self.plic.complete(claim);
        outcome
    }
}

#![cfg(test)]
//! Property tests for the claim/complete handshake as the dispatcher
//! drives it.

use core::sync::atomic::{AtomicU32, Ordering};

use proptest::prelude::*;
use riscv::register::scause::{Interrupt, Trap};

use super::plic::{Plic, Priority, SourceId};
use super::{Dispatcher, IrqHandler, TrapOutcome};
use crate::memory::layout::PLIC;
use crate::param::{HartId, NCPU};
use crate::sim::{SimPlic, SIM_SOURCES};

const EXTERNAL: Trap = Trap::Interrupt(Interrupt::SupervisorExternal);

struct Tally(AtomicU32);

impl IrqHandler for Tally {
    fn handle(&self, _source: SourceId) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn arb_source() -> impl Strategy<Value = SourceId> {
    (1..SIM_SOURCES as u32).prop_map(|id| SourceId::new(id).unwrap())
}

fn arb_hart() -> impl Strategy<Value = HartId> {
    (0..NCPU).prop_map(|id| HartId::new(id).unwrap())
}

fn armed(hart: HartId, source: SourceId) -> Plic<SimPlic> {
    let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
    plic.configure(&[source]);
    plic.enable(hart, source);
    plic.set_threshold(hart, Priority::ACCEPT_ALL);
    plic
}

proptest! {
    #[test]
    fn pending_source_is_claimed_exactly_once(hart in arb_hart(), source in arb_source(), repeats in 1usize..4) {
        let mut plic = armed(hart, source);
        for _ in 0..repeats {
            plic.io_mut().raise(source.get());
            let claim = plic.claim(hart);
            prop_assert_eq!(claim.as_ref().map(|c| c.source()), Some(source));
            prop_assert!(plic.claim(hart).is_none());
            plic.complete(claim.unwrap());
            prop_assert!(plic.claim(hart).is_none());
        }
        prop_assert_eq!(plic.io().completions(source.get()), repeats as u32);
    }

    #[test]
    fn idle_controller_claims_nothing(hart in arb_hart()) {
        let mut plic = Plic::new(SimPlic::new(PLIC), PLIC);
        plic.configure(&[]);
        plic.set_threshold(hart, Priority::ACCEPT_ALL);
        prop_assert!(plic.claim(hart).is_none());
    }

    #[test]
    fn dispatcher_completes_once_per_claim(source in arb_source(), routed in any::<bool>(), raises in prop::collection::vec(any::<bool>(), 1..16)) {
        let tally = Tally(AtomicU32::new(0));
        let mut dispatcher: Dispatcher<'_, SimPlic> = Dispatcher::new(armed(HartId::BOOT, source));
        if routed {
            dispatcher.register(source, &tally).unwrap();
        }

        let mut claimed = 0u32;
        for raise in raises {
            if raise {
                dispatcher.plic_mut().io_mut().raise(source.get());
            }
            match dispatcher.dispatch(HartId::BOOT, EXTERNAL) {
                TrapOutcome::Serviced | TrapOutcome::Unrouted => claimed += 1,
                TrapOutcome::Spurious => prop_assert!(!raise),
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
            // a sentinel claim never reaches the complete register.
            prop_assert_eq!(dispatcher.plic().io().complete_writes(), claimed);
        }
        prop_assert_eq!(dispatcher.plic().io().completions(source.get()), claimed);
        let handled = tally.0.load(Ordering::Relaxed);
        prop_assert_eq!(handled, if routed { claimed } else { 0 });
    }
}

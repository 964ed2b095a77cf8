#![cfg(test)]
//! Property tests for the console line discipline.

use proptest::prelude::*;

use super::screen::{Echo, ScreenBuffer};

const WIDTH: usize = 8;
const CAP: usize = 4 * WIDTH;

fn printable() -> impl Strategy<Value = u8> {
    0x20u8..=0x7e
}

fn any_input() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4 * CAP)
}

fn echo_of(screen: &mut ScreenBuffer<CAP>, byte: u8) -> Vec<u8> {
    let mut tx = Vec::new();
    screen.accept(byte).transmit(|b| tx.push(b));
    tx
}

proptest! {
    #[test]
    fn cursor_stays_on_screen(input in any_input()) {
        let mut screen: ScreenBuffer<CAP> = ScreenBuffer::new(WIDTH);
        for byte in input {
            screen.accept(byte);
            prop_assert!(screen.cursor() <= screen.capacity());
        }
    }

    #[test]
    fn overflow_is_echoed_but_not_stored(text in prop::collection::vec(printable(), CAP + 1..3 * CAP)) {
        let mut screen: ScreenBuffer<CAP> = ScreenBuffer::new(WIDTH);
        let mut tx = Vec::new();
        for &byte in &text {
            tx.extend(echo_of(&mut screen, byte));
        }
        prop_assert_eq!(&tx, &text);
        prop_assert_eq!(screen.cursor(), CAP);
        prop_assert_eq!(screen.cells(), &text[..CAP]);
    }

    #[test]
    fn newline_rounds_to_next_boundary(text in prop::collection::vec(printable(), 0..CAP), cr in any::<bool>()) {
        let mut screen: ScreenBuffer<CAP> = ScreenBuffer::new(WIDTH);
        for &byte in &text {
            screen.accept(byte);
        }
        let column = text.len();
        let expected = if column % WIDTH == 0 {
            column
        } else {
            (column / WIDTH + 1) * WIDTH
        };
        let tx = echo_of(&mut screen, if cr { b'\r' } else { b'\n' });
        prop_assert_eq!(tx, b"\r\n".to_vec());
        prop_assert_eq!(screen.cursor(), expected.min(CAP));
    }

    #[test]
    fn backspace_at_origin_changes_nothing(input in any_input(), del in any::<bool>()) {
        let mut screen: ScreenBuffer<CAP> = ScreenBuffer::new(WIDTH);
        for byte in input {
            screen.accept(byte);
        }
        while screen.backspace() {}
        let before = screen.cells().to_vec();

        let byte = if del { 0x7f } else { 0x08 };
        prop_assert_eq!(screen.accept(byte), Echo::Silent);
        prop_assert_eq!(screen.cursor(), 0);
        prop_assert_eq!(screen.cells(), &before[..]);
    }
}

//! Activity LED.
//!
//! The LED blinks a fixed pattern at power-up, then lights whenever a byte
//! arrives on any channel and goes dark whenever a byte leaves on the shared
//! line. Under steady traffic it flickers; stuck on means data is arriving
//! but the radio is holding CTS.

use sibuf_core::{ArbitrationPolicy, Engine};

/// A single on/off output.
pub trait StatusLed {
    /// Drives the LED.
    fn set(&mut self, on: bool);
}

impl<L: StatusLed + ?Sized> StatusLed for &mut L {
    fn set(&mut self, on: bool) {
        (**self).set(on);
    }
}

/// One step of a blink pattern: LED state and how long to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkStep {
    /// LED state.
    pub on: bool,
    /// Hold time in milliseconds.
    pub millis: u32,
}

const fn on(millis: u32) -> BlinkStep {
    BlinkStep { on: true, millis }
}

const fn off(millis: u32) -> BlinkStep {
    BlinkStep { on: false, millis }
}

/// Power-up pattern: five short blinks.
pub const STARTUP_BLINK: [BlinkStep; 10] = [
    on(130),
    off(170),
    on(130),
    off(170),
    on(130),
    off(170),
    on(130),
    off(170),
    on(130),
    off(170),
];

/// Plays `pattern` on `led`, calling `delay_ms` for each hold time.
pub fn play_pattern<L, D>(led: &mut L, pattern: &[BlinkStep], mut delay_ms: D)
where
    L: StatusLed,
    D: FnMut(u32),
{
    for step in pattern {
        led.set(step.on);
        delay_ms(step.millis);
    }
}

/// Tracks engine counters and drives the LED from traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityIndicator {
    received: u64,
    sent: u64,
    lit: bool,
}

impl ActivityIndicator {
    /// Creates an indicator with the LED assumed off.
    pub const fn new() -> Self {
        Self {
            received: 0,
            sent: 0,
            lit: false,
        }
    }

    /// Current LED state.
    #[inline]
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Updates from running totals. A send after a receive in the same tick
    /// leaves the LED off. Returns the new state when it changed.
    pub fn observe(&mut self, received_total: u64, sent_total: u64) -> Option<bool> {
        let mut lit = self.lit;
        if received_total > self.received {
            lit = true;
        }
        if sent_total > self.sent {
            lit = false;
        }
        self.received = received_total;
        self.sent = sent_total;

        if lit == self.lit {
            return None;
        }
        self.lit = lit;
        Some(lit)
    }

    /// Reads the totals from `engine` and drives `led` if the state changed.
    pub fn update<P: ArbitrationPolicy, L: StatusLed>(&mut self, engine: &Engine<P>, led: &mut L) {
        let received = engine.channel_stats().map(|s| s.bytes_received).sum();
        let sent = engine.stats().bytes_relayed;
        if let Some(state) = self.observe(received, sent) {
            led.set(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Led {
        history: Vec<bool>,
    }

    impl StatusLed for Led {
        fn set(&mut self, on: bool) {
            self.history.push(on);
        }
    }

    #[test]
    fn test_startup_pattern() {
        let mut led = Led::default();
        let mut total = 0;
        play_pattern(&mut led, &STARTUP_BLINK, |ms| total += ms);
        assert_eq!(total, 1500);
        assert_eq!(led.history.iter().filter(|&&on| on).count(), 5);
        assert_eq!(led.history.last(), Some(&false));
    }

    #[test]
    fn test_activity_follows_traffic() {
        let mut ind = ActivityIndicator::new();
        assert_eq!(ind.observe(0, 0), None);
        assert_eq!(ind.observe(1, 0), Some(true));
        assert_eq!(ind.observe(2, 0), None);
        assert_eq!(ind.observe(2, 1), Some(false));
        // Receive and send in one tick: off wins
        assert_eq!(ind.observe(3, 2), None);
        assert!(!ind.is_lit());
    }
}

//! Transmit-lock arbitration between channels.
//!
//! The [`Arbiter`] holds at most one lock. While free, it asks its
//! [`ArbitrationPolicy`] which `Ready` channel to grant; while held, it
//! waits for the holder to drain its output queue and leave `Transmit`,
//! then releases. At most one channel is ever in `Transmit`.
//!
//! A released lock is never re-granted in the same update, so every record
//! is followed by at least one tick with no holder.
//!
//! # Policies
//!
//! | Policy | Behavior |
//! |--------|----------|
//! | [`PriorityPolicy`] | Lowest index wins. A busy low-index channel can starve higher indices. |
//! | [`RoundRobinPolicy`] | Scan starts after the last granted channel. |

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use crate::channel::Channel;
use crate::frame::FramingState;

/// Chooses which `Ready` channel receives a free transmit lock.
pub trait ArbitrationPolicy {
    /// Returns the index of the channel to grant, or `None` if no channel
    /// should be granted this tick.
    ///
    /// Implementations must only return channels in [`FramingState::Ready`].
    fn select(&mut self, channels: &[Channel]) -> Option<usize>;

    /// Short lowercase policy name.
    fn name(&self) -> &'static str;
}

impl<P: ArbitrationPolicy + ?Sized> ArbitrationPolicy for Box<P> {
    fn select(&mut self, channels: &[Channel]) -> Option<usize> {
        (**self).select(channels)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Strict priority by channel index.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy;

impl ArbitrationPolicy for PriorityPolicy {
    fn select(&mut self, channels: &[Channel]) -> Option<usize> {
        channels
            .iter()
            .position(|ch| ch.state() == FramingState::Ready)
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}

/// Rotating priority: the channel after the last grant is examined first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinPolicy {
    next: usize,
}

impl ArbitrationPolicy for RoundRobinPolicy {
    fn select(&mut self, channels: &[Channel]) -> Option<usize> {
        let n = channels.len();
        let chosen = (0..n)
            .map(|offset| (self.next + offset) % n)
            .find(|&i| channels[i].state() == FramingState::Ready)?;
        self.next = (chosen + 1) % n;
        Some(chosen)
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Selects a built-in policy at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// [`PriorityPolicy`]
    #[default]
    Priority,
    /// [`RoundRobinPolicy`]
    RoundRobin,
}

impl PolicyKind {
    /// Creates a boxed instance of the policy.
    pub fn build(self) -> Box<dyn ArbitrationPolicy + Send> {
        match self {
            Self::Priority => Box::new(PriorityPolicy),
            Self::RoundRobin => Box::new(RoundRobinPolicy::default()),
        }
    }

    /// Short lowercase policy name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::RoundRobin => "round-robin",
        }
    }
}

/// Lock change reported by [`Arbiter::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    /// The channel was moved to `Transmit` and now holds the lock.
    Granted(usize),
    /// The channel finished draining and gave up the lock.
    Released(usize),
}

/// Owner of the transmit lock.
#[derive(Debug, Clone)]
pub struct Arbiter<P = PriorityPolicy> {
    policy: P,
    holder: Option<usize>,
    grants: u64,
}

impl<P: ArbitrationPolicy> Arbiter<P> {
    /// Creates a free arbiter using `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            holder: None,
            grants: 0,
        }
    }

    /// Index of the channel holding the lock.
    #[inline]
    pub fn holder(&self) -> Option<usize> {
        self.holder
    }

    /// Total number of grants so far.
    #[inline]
    pub fn grants(&self) -> u64 {
        self.grants
    }

    /// Active policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Assigns or releases the lock.
    ///
    /// The holder keeps the lock until it leaves `Transmit`, which
    /// [`Channel::advance`] does once the output queue is drained. A free
    /// lock goes to the channel the policy picks.
    pub fn update(&mut self, channels: &mut [Channel]) -> Option<LockEvent> {
        if let Some(index) = self.holder {
            let transmitting = channels
                .get(index)
                .is_some_and(|ch| ch.state() == FramingState::Transmit);
            if transmitting {
                return None;
            }
            self.holder = None;
            #[cfg(feature = "tracing")]
            tracing::debug!(channel = index, "transmit lock released");
            return Some(LockEvent::Released(index));
        }

        let index = self.policy.select(channels)?;
        // A policy that picks a missing or non-Ready channel grants nothing.
        if !channels.get_mut(index).is_some_and(Channel::grant) {
            return None;
        }
        self.holder = Some(index);
        self.grants += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(channel = index, policy = self.policy.name(), "transmit lock granted");
        Some(LockEvent::Granted(index))
    }
}

impl Default for Arbiter<PriorityPolicy> {
    fn default() -> Self {
        Self::new(PriorityPolicy)
    }
}

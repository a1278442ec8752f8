// File: shoutbot-core/src/services/cooldown.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Ready,
    Active { remaining: StdDuration },
}

impl Cooldown {
    pub fn is_active(&self) -> bool {
        matches!(self, Cooldown::Active { .. })
    }
}

/// Which window refused a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownBlock {
    Channel { remaining: StdDuration },
    User { remaining: StdDuration },
    /// Another shoutout for the channel is between reserve and commit.
    InFlight,
}

#[derive(Default)]
struct CooldownState {
    channel_fired: HashMap<String, DateTime<Utc>>,
    user_fired: HashMap<(String, String), DateTime<Utc>>,
    /// Channels with a shoutout between reserve and commit.
    in_flight: HashSet<String>,
}

/// Last-fired timestamps per channel and per (channel, user).
///
/// Both maps sit behind one mutex so check-then-stamp is atomic. Entries never
/// expire; the only question ever asked is how long ago something fired.
pub struct CooldownTracker {
    channel_window: Duration,
    user_window: Duration,
    state: Mutex<CooldownState>,
}

fn to_chrono(d: StdDuration) -> Duration {
    Duration::from_std(d).unwrap_or_else(|_| Duration::days(36_500))
}

fn cooldown_for(window: Duration, last: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> Cooldown {
    match last {
        Some(last) if now - *last < window => Cooldown::Active {
            remaining: (window - (now - *last)).to_std().unwrap_or_default(),
        },
        _ => Cooldown::Ready,
    }
}

impl CooldownTracker {
    pub fn new(channel_window: StdDuration, user_window: StdDuration) -> Self {
        Self {
            channel_window: to_chrono(channel_window),
            user_window: to_chrono(user_window),
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn channel_cooldown(&self, channel: &str) -> Cooldown {
        self.channel_cooldown_at(channel, Utc::now())
    }

    pub fn channel_cooldown_at(&self, channel: &str, now: DateTime<Utc>) -> Cooldown {
        let state = self.state.lock();
        cooldown_for(self.channel_window, state.channel_fired.get(channel), now)
    }

    pub fn user_cooldown(&self, channel: &str, user: &str) -> Cooldown {
        self.user_cooldown_at(channel, user, Utc::now())
    }

    pub fn user_cooldown_at(&self, channel: &str, user: &str, now: DateTime<Utc>) -> Cooldown {
        let state = self.state.lock();
        let key = (channel.to_string(), user.to_string());
        cooldown_for(self.user_window, state.user_fired.get(&key), now)
    }

    /// Stamps both windows. Only call after the shoutout actually went out.
    pub fn record_fired(&self, channel: &str, user: &str) {
        self.record_fired_at(channel, user, Utc::now());
    }

    pub fn record_fired_at(&self, channel: &str, user: &str, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        stamp(&mut state, channel, user, now);
    }

    /// Checks both windows and, if both have elapsed, claims the channel until
    /// the returned reservation is committed or dropped. A second caller for
    /// the same channel gets `CooldownBlock::InFlight` in the meantime.
    pub fn try_reserve(
        self: &Arc<Self>,
        channel: &str,
        user: &str,
    ) -> Result<CooldownReservation, CooldownBlock> {
        self.try_reserve_at(channel, user, Utc::now())
    }

    pub fn try_reserve_at(
        self: &Arc<Self>,
        channel: &str,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<CooldownReservation, CooldownBlock> {
        let mut state = self.state.lock();

        if state.in_flight.contains(channel) {
            return Err(CooldownBlock::InFlight);
        }
        if let Cooldown::Active { remaining } =
            cooldown_for(self.channel_window, state.channel_fired.get(channel), now)
        {
            return Err(CooldownBlock::Channel { remaining });
        }
        let key = (channel.to_string(), user.to_string());
        if let Cooldown::Active { remaining } =
            cooldown_for(self.user_window, state.user_fired.get(&key), now)
        {
            return Err(CooldownBlock::User { remaining });
        }

        state.in_flight.insert(channel.to_string());
        Ok(CooldownReservation {
            tracker: Arc::clone(self),
            channel: channel.to_string(),
            user: user.to_string(),
            done: false,
        })
    }

    fn release(&self, channel: &str) {
        self.state.lock().in_flight.remove(channel);
    }
}

fn stamp(state: &mut CooldownState, channel: &str, user: &str, now: DateTime<Utc>) {
    state.channel_fired.insert(channel.to_string(), now);
    state
        .user_fired
        .insert((channel.to_string(), user.to_string()), now);
}

/// A claimed (channel, user) slot. `commit` stamps both windows; dropping it
/// without committing leaves the timestamps exactly as they were.
pub struct CooldownReservation {
    tracker: Arc<CooldownTracker>,
    channel: String,
    user: String,
    done: bool,
}

impl CooldownReservation {
    pub fn commit(self) {
        self.commit_at(Utc::now());
    }

    pub fn commit_at(mut self, now: DateTime<Utc>) {
        let mut state = self.tracker.state.lock();
        stamp(&mut state, &self.channel, &self.user, now);
        state.in_flight.remove(&self.channel);
        drop(state);
        self.done = true;
    }
}

impl Drop for CooldownReservation {
    fn drop(&mut self) {
        if !self.done {
            self.tracker.release(&self.channel);
        }
    }
}

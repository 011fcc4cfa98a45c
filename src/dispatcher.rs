//! Conversation state machine
//!
//! Validates and executes state transitions against a user aggregate. Each
//! hop runs guard check -> exit action of the sticky state being left ->
//! state mutation -> entry action. Entry actions of transient states chain
//! straight back to `Wait`, so only the `WaitFor*` family, `Stop` and `Wait`
//! are resting states. Replies are collected in order and returned to the
//! caller; the dispatcher itself sends nothing.

use crate::error::{Error, Result};
use crate::locate::LocateZone;
use crate::measurement::Measurement;
use crate::reminder::{ForgotTracker, Reminder};
use crate::replies;
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation states. Exactly one per user at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Initial,
    Start,
    Wait,
    WaitForTz,
    WaitForTzWhen,
    WaitForTzHistory,
    WaitForMorningTime,
    WaitForEveningTime,
    Record,
    History,
    Status,
    Stop,
    NotifyMorning,
    NotifyEvening,
    NotifyForgot,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Initial => "initial",
            State::Start => "start",
            State::Wait => "wait",
            State::WaitForTz => "wait_for_tz",
            State::WaitForTzWhen => "wait_for_tz_when",
            State::WaitForTzHistory => "wait_for_tz_history",
            State::WaitForMorningTime => "wait_for_morning_time",
            State::WaitForEveningTime => "wait_for_evening_time",
            State::Record => "record",
            State::History => "history",
            State::Status => "status",
            State::Stop => "stop",
            State::NotifyMorning => "notify_morning",
            State::NotifyEvening => "notify_evening",
            State::NotifyForgot => "notify_forgot",
        };
        write!(f, "{}", name)
    }
}

/// The fixed transition table: which source states may trigger `to`.
pub fn can_transit(from: State, to: State) -> bool {
    use State::*;
    match to {
        Start => from == Initial,
        // Catch-all return-to-idle, and stop-from-anywhere.
        Wait | Stop => true,
        WaitForTz | WaitForTzWhen | WaitForTzHistory => matches!(from, Stop | Wait),
        WaitForMorningTime => matches!(from, Stop | Wait | WaitForTzWhen),
        WaitForEveningTime => from == WaitForMorningTime,
        Record => from == Wait,
        History => matches!(from, Stop | Wait | WaitForTzHistory),
        NotifyMorning | NotifyEvening | NotifyForgot => from == Wait,
        Status => matches!(from, Stop | Wait),
        Initial => false,
    }
}

/// Executes one inbound trigger (or one scheduler notification) against a
/// user aggregate.
pub struct Dispatcher<'a> {
    user: &'a mut User,
    input: Option<&'a str>,
    resolver: &'a dyn LocateZone,
    now: DateTime<Utc>,
    replies: Vec<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        user: &'a mut User,
        input: Option<&'a str>,
        resolver: &'a dyn LocateZone,
        now: DateTime<Utc>,
    ) -> Dispatcher<'a> {
        Dispatcher {
            user,
            input,
            resolver,
            now,
            replies: Vec::new(),
        }
    }

    /// Run the transition chain starting at `target`; returns the ordered
    /// outbound replies. On error the chain stops and the caller must not
    /// persist the aggregate.
    pub fn transit(mut self, target: State) -> Result<Vec<String>> {
        let mut next = Some(target);
        while let Some(target) = next.take() {
            tracing::debug!(chat_id = self.user.chat_id, from = %self.user.state, to = %target, "transition");
            next = self.step(target)?;
        }
        Ok(self.replies)
    }

    fn step(&mut self, target: State) -> Result<Option<State>> {
        if !can_transit(self.user.state, target) {
            return Err(Error::IllegalTransition {
                from: self.user.state,
                target,
            });
        }

        self.exit_current()?;
        self.user.state = target;
        self.enter(target)
    }

    fn say(&mut self, text: impl Into<String>) {
        self.replies.push(text.into());
    }

    fn input(&self) -> Result<&'a str> {
        self.input.ok_or(Error::MissingInput(self.user.state))
    }

    /// Exit actions of the sticky states. Failure here leaves `state`
    /// untouched, so the user's next message is reinterpreted in the same
    /// context.
    fn exit_current(&mut self) -> Result<()> {
        match self.user.state {
            State::WaitForMorningTime => {
                let zone = self
                    .user
                    .zone
                    .ok_or(Error::MissingZone(self.user.chat_id))?;
                let reminder = Reminder::create(self.input()?, zone, self.now)?;
                self.user.reminder_morning = Some(reminder);
            }
            State::WaitForEveningTime => {
                let zone = self
                    .user
                    .zone
                    .ok_or(Error::MissingZone(self.user.chat_id))?;
                let reminder = Reminder::create(self.input()?, zone, self.now)?;
                self.user.reminder_evening = Some(reminder);
                self.user.forgot = ForgotTracker::new();
                self.say(replies::thanks());
                self.say(replies::reminder_summary(self.user));
            }
            State::WaitForTz | State::WaitForTzWhen | State::WaitForTzHistory => {
                let zone = self.resolver.resolve(self.input()?)?;
                self.user.zone = Some(zone);
                self.say(replies::thanks());
                self.say(replies::zone_confirmation(&zone));
            }
            _ => {}
        }
        Ok(())
    }

    /// Entry actions. Returning `Some(state)` chains the bounce-back hop.
    fn enter(&mut self, target: State) -> Result<Option<State>> {
        match target {
            State::Start => {
                self.say(replies::welcome());
                Ok(Some(State::Wait))
            }
            State::Stop => {
                self.user.reminder_morning = None;
                self.user.reminder_evening = None;
                self.say(replies::stopped());
                Ok(None)
            }
            State::History => {
                self.say(replies::history(self.user));
                Ok(Some(State::Wait))
            }
            State::Record => {
                let measurement = Measurement::parse(self.input()?, self.now)?;
                self.user.measurements.push(measurement);
                self.user.forgot.reset();
                self.say(replies::recorded());
                Ok(Some(State::Wait))
            }
            State::Status => {
                self.say(replies::reminder_summary(self.user));
                Ok(Some(State::Wait))
            }
            State::NotifyMorning => {
                let reminder = self
                    .user
                    .reminder_morning
                    .as_mut()
                    .ok_or(Error::MissingReminder("morning", self.user.chat_id))?;
                reminder.advance(self.now)?;
                self.say(replies::notify_morning());
                self.user.forgot.update(self.now);
                Ok(Some(State::Wait))
            }
            State::NotifyEvening => {
                let reminder = self
                    .user
                    .reminder_evening
                    .as_mut()
                    .ok_or(Error::MissingReminder("evening", self.user.chat_id))?;
                reminder.advance(self.now)?;
                self.say(replies::notify_evening());
                self.user.forgot.update(self.now);
                Ok(Some(State::Wait))
            }
            State::NotifyForgot => {
                self.say(replies::notify_forgot());
                self.user.forgot.reset();
                Ok(Some(State::Wait))
            }
            State::WaitForMorningTime => {
                self.say(replies::ask_morning_time());
                Ok(None)
            }
            State::WaitForEveningTime => {
                self.say(replies::ask_evening_time());
                Ok(None)
            }
            State::WaitForTz => {
                self.say(replies::ask_city());
                Ok(None)
            }
            State::WaitForTzWhen => {
                self.say(replies::ask_city_for_reminders());
                Ok(None)
            }
            State::WaitForTzHistory => {
                self.say(replies::ask_city_for_history());
                Ok(None)
            }
            State::Wait | State::Initial => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::FixedZones;
    use crate::timezone::Zone;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn resolver() -> FixedZones {
        FixedZones::single("Moscow", Zone::from_name("Europe/Moscow").unwrap())
    }

    fn transit(user: &mut User, target: State, input: Option<&str>) -> Result<Vec<String>> {
        let resolver = resolver();
        Dispatcher::new(user, input, &resolver, now()).transit(target)
    }

    #[test]
    fn test_guard_table() {
        use State::*;
        assert!(can_transit(Initial, Start));
        assert!(!can_transit(Wait, Start));
        assert!(can_transit(Stop, Wait));
        assert!(can_transit(WaitForMorningTime, Stop));
        assert!(can_transit(Wait, Record));
        assert!(!can_transit(Stop, Record));
        assert!(can_transit(WaitForTzWhen, WaitForMorningTime));
        assert!(!can_transit(WaitForTz, WaitForMorningTime));
        assert!(can_transit(WaitForMorningTime, WaitForEveningTime));
        assert!(!can_transit(Wait, WaitForEveningTime));
        assert!(can_transit(WaitForTzHistory, History));
        assert!(can_transit(Wait, NotifyMorning));
        assert!(!can_transit(Stop, NotifyMorning));
        assert!(can_transit(Stop, Status));
        assert!(!can_transit(Wait, Initial));
    }

    #[test]
    fn test_start_bounces_to_wait() {
        let mut user = User::new(42);
        let replies = transit(&mut user, State::Start, Some("/start")).unwrap();

        assert_eq!(user.state, State::Wait);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("blood-pressure"));
    }

    #[test]
    fn test_record_from_wait() {
        let mut user = User::new(42);
        user.state = State::Wait;

        let replies = transit(&mut user, State::Record, Some("150/95")).unwrap();

        assert_eq!(user.state, State::Wait);
        assert_eq!(user.measurements.len(), 1);
        assert_eq!(user.measurements[0].high, 150);
        assert_eq!(user.measurements[0].low, 95);
        assert_eq!(replies, vec![replies::recorded().to_string()]);
    }

    #[test]
    fn test_record_from_stop_is_illegal() {
        let mut user = User::new(42);
        user.state = State::Stop;

        let err = transit(&mut user, State::Record, Some("150/95")).unwrap_err();
        assert!(matches!(err, Error::IllegalTransition { .. }));
        assert_eq!(user.state, State::Stop);
        assert!(user.measurements.is_empty());
    }

    #[test]
    fn test_record_resets_forgot() {
        let mut user = User::new(42);
        user.state = State::Wait;
        user.forgot.update(now());

        transit(&mut user, State::Record, Some("120/70")).unwrap();
        assert!(user.forgot.last_notified.is_none());
    }

    #[test]
    fn test_record_malformed_keeps_state_record_in_memory_only() {
        let mut user = User::new(42);
        user.state = State::Wait;

        let err = transit(&mut user, State::Record, Some("banana")).unwrap_err();
        assert!(matches!(err, Error::MalformedReading(_)));
        assert!(user.measurements.is_empty());
    }

    #[test]
    fn test_stop_clears_reminders() {
        let zone = Zone::from_name("Europe/Moscow").unwrap();
        let mut user = User::new(42);
        user.state = State::Wait;
        user.zone = Some(zone);
        user.reminder_morning = Some(Reminder::create("07:30", zone, now()).unwrap());
        user.reminder_evening = Some(Reminder::create("21:00", zone, now()).unwrap());

        let replies = transit(&mut user, State::Stop, Some("/stop")).unwrap();

        assert_eq!(user.state, State::Stop);
        assert!(user.reminder_morning.is_none());
        assert!(user.reminder_evening.is_none());
        assert_eq!(replies, vec![replies::stopped().to_string()]);
    }

    #[test]
    fn test_tz_exit_sets_zone() {
        let mut user = User::new(42);
        user.state = State::Wait;

        transit(&mut user, State::WaitForTz, Some("/where")).unwrap();
        assert_eq!(user.state, State::WaitForTz);

        let replies = transit(&mut user, State::Wait, Some("Moscow")).unwrap();
        assert_eq!(user.state, State::Wait);
        assert_eq!(user.zone.unwrap().name(), "Europe/Moscow");
        assert_eq!(replies[0], replies::thanks());
        assert!(replies[1].contains("UTC +0300"));
    }

    #[test]
    fn test_tz_exit_unknown_city_keeps_state() {
        let mut user = User::new(42);
        user.state = State::WaitForTz;

        let err = transit(&mut user, State::Wait, Some("Atlantis")).unwrap_err();
        assert!(matches!(err, Error::InvalidLocation(_)));
        assert_eq!(user.state, State::WaitForTz);
        assert!(user.zone.is_none());
    }

    #[test]
    fn test_reminder_setup_flow() {
        let mut user = User::new(42);
        user.state = State::Wait;

        // /when without a zone goes through WaitForTzWhen.
        let replies = transit(&mut user, State::WaitForTzWhen, Some("/when")).unwrap();
        assert!(replies[0].contains("where you live"));

        // City resolves, then the morning-time prompt follows.
        let replies = transit(&mut user, State::WaitForMorningTime, Some("Moscow")).unwrap();
        assert_eq!(user.state, State::WaitForMorningTime);
        assert_eq!(replies.last().unwrap(), replies::ask_morning_time());

        // Morning time parses on exit; evening prompt follows.
        let replies = transit(&mut user, State::WaitForEveningTime, Some("07:30")).unwrap();
        let morning = user.reminder_morning.as_ref().unwrap();
        assert_eq!((morning.hour, morning.minute), (7, 30));
        assert_eq!(morning.zone.name(), "Europe/Moscow");
        assert_eq!(replies, vec![replies::ask_evening_time().to_string()]);

        // Evening time parses on exit; fresh forgot tracker; confirmation.
        user.forgot.update(now());
        let replies = transit(&mut user, State::Wait, Some("21:00")).unwrap();
        assert_eq!(user.state, State::Wait);
        let evening = user.reminder_evening.as_ref().unwrap();
        assert_eq!((evening.hour, evening.minute), (21, 0));
        assert!(user.forgot.last_notified.is_none());
        assert_eq!(replies[0], replies::thanks());
        assert!(replies[1].contains("Morning at 07:30"));
    }

    #[test]
    fn test_invalid_time_keeps_sticky_state() {
        let zone = Zone::from_name("Europe/Moscow").unwrap();
        let mut user = User::new(42);
        user.state = State::WaitForMorningTime;
        user.zone = Some(zone);

        let err = transit(&mut user, State::WaitForEveningTime, Some("25:99")).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeFormat(_)));
        assert_eq!(user.state, State::WaitForMorningTime);
        assert!(user.reminder_morning.is_none());
    }

    #[test]
    fn test_notify_morning_advances_and_marks_forgot() {
        let zone = Zone::from_name("Europe/Moscow").unwrap();
        let mut user = User::new(42);
        user.state = State::Wait;
        user.zone = Some(zone);
        let mut reminder = Reminder::create("07:30", zone, now()).unwrap();
        // Simulate the due instant having passed.
        reminder.next_due = now() - chrono::Duration::minutes(1);
        let due_at = reminder.next_due;
        user.reminder_morning = Some(reminder);

        let replies = transit(&mut user, State::NotifyMorning, None).unwrap();

        assert_eq!(user.state, State::Wait);
        assert_eq!(replies, vec![replies::notify_morning().to_string()]);
        assert_eq!(
            user.reminder_morning.as_ref().unwrap().next_due,
            due_at + chrono::Duration::hours(24)
        );
        assert_eq!(user.forgot.last_notified, Some(now()));
    }

    #[test]
    fn test_notify_morning_premature() {
        let zone = Zone::from_name("Europe/Moscow").unwrap();
        let mut user = User::new(42);
        user.state = State::Wait;
        user.zone = Some(zone);
        user.reminder_morning = Some(Reminder::create("07:30", zone, now()).unwrap());

        let err = transit(&mut user, State::NotifyMorning, None).unwrap_err();
        assert!(matches!(err, Error::PrematureAdvance));
        assert!(user.forgot.last_notified.is_none());
    }

    #[test]
    fn test_notify_morning_without_reminder() {
        let mut user = User::new(42);
        user.state = State::Wait;

        let err = transit(&mut user, State::NotifyMorning, None).unwrap_err();
        assert!(matches!(err, Error::MissingReminder("morning", 42)));
    }

    #[test]
    fn test_notify_forgot_resets_tracker() {
        let mut user = User::new(42);
        user.state = State::Wait;
        user.forgot.update(now() - chrono::Duration::hours(2));

        let replies = transit(&mut user, State::NotifyForgot, None).unwrap();

        assert_eq!(user.state, State::Wait);
        assert_eq!(replies, vec![replies::notify_forgot().to_string()]);
        assert!(user.forgot.last_notified.is_none());
    }

    #[test]
    fn test_history_bounces_to_wait() {
        let mut user = User::new(42);
        user.state = State::Wait;

        let replies = transit(&mut user, State::History, Some("/history")).unwrap();
        assert_eq!(user.state, State::Wait);
        assert_eq!(replies, vec!["No measurements saved yet".to_string()]);
    }

    #[test]
    fn test_status_without_reminders() {
        let mut user = User::new(42);
        user.state = State::Wait;

        let replies = transit(&mut user, State::Status, Some("/status")).unwrap();
        assert_eq!(user.state, State::Wait);
        assert_eq!(replies, vec![replies::stopped().to_string()]);
    }
}

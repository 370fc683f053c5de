//! Placeholder records for demo and emulator runs.
//!
//! Only used when `sample_mode` is enabled in the export configuration. The
//! persona is fictional: every number is in the 555-01xx range and every email
//! address uses the reserved `example.com` domain.

use chrono::{DateTime, Utc};

use crate::models::{CallKind, CallRecord, ContactRecord, MessageKind, MessageRecord};

/// Source of substitute records for the categories that support fallback.
pub trait FixtureProvider: Send + Sync {
    fn contacts(&self) -> Vec<ContactRecord>;
    fn messages(&self) -> Vec<MessageRecord>;
    fn calls(&self) -> Vec<CallRecord>;
}

const HOUR_MS: i64 = 60 * 60 * 1000;
const MINUTE_MS: i64 = 60 * 1000;

const FAMILY: &[(&str, &str, &str)] = &[
    ("Sam Rivera", "555-0101", "sam.rivera@example.com"),
    ("Jordan Rivera", "555-0102", "jordan.rivera@example.com"),
    ("Dad", "555-0103", ""),
    ("Mom", "555-0104", ""),
];

const COLLEAGUES: &[(&str, &str, &str)] = &[
    ("Priya Patel", "555-0111", "priya.patel@example.com"),
    ("Marcus Chen", "555-0112", "marcus.chen@example.com"),
    ("Elena Novak", "555-0113", "elena.novak@example.com"),
    ("Tom Okafor", "555-0114", "tom.okafor@example.com"),
    ("Grace Kim", "555-0115", "grace.kim@example.com"),
];

const SERVICES: &[(&str, &str)] = &[
    ("Harbor Bank Support", "555-0120"),
    ("Summit Credit Union", "555-0121"),
    ("Northside Bank", "555-0122"),
    ("Lakeview Savings", "555-0123"),
    ("Orbit Card Services", "555-0124"),
    ("Pioneer Card", "555-0125"),
];

const FRIENDS: &[(&str, &str, &str)] = &[
    ("Alex Moreno", "555-0131", "alex.moreno@example.com"),
    ("Casey Brooks", "555-0132", "casey.brooks@example.com"),
    ("Riley Shaw", "555-0133", "riley.shaw@example.com"),
];

const OTHERS: &[(&str, &str)] = &[
    ("Courier", "555-0141"),
    ("Dentist", "555-0142"),
    ("Gym", "555-0143"),
];

const BANK_ALERTS: &[&str] = &[
    "Harbor Bank: deposit of $500.00 received. Balance $2,500.00",
    "Harbor Bank: withdrawal of $150.00. Balance $2,000.00",
    "Harbor Bank: transfer of $300.00 sent. Balance $2,150.00",
    "Harbor Bank: deposit of $1,000.00 received. Balance $2,450.00",
    "Harbor Bank: withdrawal of $50.00. Balance $1,450.00",
];

const CARD_ALERTS: &[&str] = &[
    "Orbit Card: purchase approved $45.00 at Corner Coffee",
    "Orbit Card: purchase approved $28.00 at Burger Stop",
    "Orbit Card: purchase approved $120.00 at City Cinema",
    "Orbit Card: purchase approved $15.00 at QuickMart",
    "Orbit Card: purchase approved $85.00 at Beauty Hall",
];

const WORK_MESSAGES: &[(&str, &str)] = &[
    ("555-0111", "Team meeting tomorrow 10am, 3rd floor room. Please prepare your update."),
    ("555-0112", "Could you review the client proposal? Feedback by this afternoon would help."),
    ("555-0113", "Please send the executive briefing deck before 3pm today."),
    ("555-0114", "Quarterly results report is due next Monday."),
    ("555-0115", "Client visit confirmed for tomorrow, please arrive by 2pm."),
];

const SENT_MESSAGES: &[(&str, &str)] = &[
    ("555-0111", "Got it, I'll be ready."),
    ("555-0112", "Review done, sending feedback shortly."),
    ("555-0101", "Are we still on for dinner tonight?"),
    ("555-0102", "Movie this weekend?"),
];

const FAMILY_MESSAGES: &[(&str, &str)] = &[
    ("555-0103", "Can I come home this weekend?"),
    ("555-0104", "How are you feeling? I'll call soon."),
    ("555-0101", "Free to meet up next week?"),
];

/// Fixed persona dataset anchored at a point in time.
///
/// Output is fully determined by the anchor, so two instances with the same
/// anchor produce identical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFixtures {
    anchor_ms: i64,
}

impl SampleFixtures {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor_ms: anchor.timestamp_millis(),
        }
    }

    /// Fixtures anchored at the current time
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.anchor_ms).unwrap_or_default()
    }

    fn at(&self, hours_ago: i64, minutes_ago: i64) -> i64 {
        self.anchor_ms - hours_ago * HOUR_MS - minutes_ago * MINUTE_MS
    }

    fn name_for(number: &str) -> Option<String> {
        FAMILY
            .iter()
            .chain(COLLEAGUES)
            .chain(FRIENDS)
            .map(|(name, phone, _)| (*name, *phone))
            .chain(SERVICES.iter().copied())
            .chain(OTHERS.iter().copied())
            .find(|(_, phone)| *phone == number)
            .map(|(name, _)| name.to_string())
    }
}

impl Default for SampleFixtures {
    fn default() -> Self {
        Self::now()
    }
}

fn message(address: &str, body: &str, timestamp: i64, kind: MessageKind) -> MessageRecord {
    MessageRecord {
        address: address.to_string(),
        body: body.to_string(),
        timestamp,
        kind,
    }
}

impl FixtureProvider for SampleFixtures {
    fn contacts(&self) -> Vec<ContactRecord> {
        let with_email = |&(name, phone, email): &(&str, &str, &str)| ContactRecord {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
        };
        let without_email = |&(name, phone): &(&str, &str)| ContactRecord {
            name: name.to_string(),
            phone: phone.to_string(),
            email: String::new(),
        };

        FAMILY
            .iter()
            .chain(COLLEAGUES)
            .map(with_email)
            .chain(SERVICES.iter().map(without_email))
            .chain(FRIENDS.iter().map(with_email))
            .chain(OTHERS.iter().map(without_email))
            .collect()
    }

    fn messages(&self) -> Vec<MessageRecord> {
        let mut messages = Vec::new();

        for (i, body) in (0i64..).zip(BANK_ALERTS) {
            messages.push(message("555-0120", body, self.at(i * 24, 10 * i), MessageKind::Received));
        }
        for (i, body) in (0i64..).zip(CARD_ALERTS) {
            messages.push(message("555-0124", body, self.at(i * 24 + 2, 15 * i), MessageKind::Received));
        }
        for (i, (address, body)) in (0i64..).zip(WORK_MESSAGES) {
            messages.push(message(address, body, self.at(i * 12 + 1, 0), MessageKind::Received));
        }
        for (i, (address, body)) in (0i64..).zip(SENT_MESSAGES) {
            messages.push(message(address, body, self.at(i * 6, 30), MessageKind::Sent));
        }
        for (i, (address, body)) in (0i64..).zip(FAMILY_MESSAGES) {
            messages.push(message(address, body, self.at(i * 48 + 3, 0), MessageKind::Received));
        }

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages
    }

    fn calls(&self) -> Vec<CallRecord> {
        let mut calls = Vec::new();
        let mut push = |number: &str, timestamp: i64, duration: u64, kind: CallKind| {
            calls.push(CallRecord::new(number.to_string(), Self::name_for(number), timestamp, duration, kind));
        };

        for (i, (_, number, _)) in (0i64..).zip(COLLEAGUES) {
            push(*number, self.at(i * 8, 30), 60 + i as u64 * 30, CallKind::Incoming);
        }
        for (i, number) in (0i64..).zip(["555-0111", "555-0112", "555-0120"]) {
            push(number, self.at(i * 12 + 4, 15), 120 + i as u64 * 20, CallKind::Outgoing);
        }
        for (i, (_, number, _)) in (0i64..).zip(FAMILY) {
            let kind = if i % 2 == 0 { CallKind::Incoming } else { CallKind::Outgoing };
            push(*number, self.at(i * 24 + 5, 0), 300 + i as u64 * 60, kind);
        }
        for (i, (_, number, _)) in (0i64..).zip(FRIENDS) {
            push(*number, self.at(i * 72 + 6, 30), 180 + i as u64 * 30, CallKind::Outgoing);
        }
        for (i, number) in (0i64..).zip(["555-0141", "555-0142", "555-0122"]) {
            push(number, self.at(i * 6 + 2, 45), 0, CallKind::Missed);
        }

        calls.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn fixtures() -> SampleFixtures {
        SampleFixtures::new(Utc.with_ymd_and_hms(2024, 11, 18, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_deterministic_for_anchor() {
        assert_eq!(fixtures().messages(), fixtures().messages());
        assert_eq!(fixtures().calls(), fixtures().calls());
    }

    #[test]
    fn test_persona_sizes() {
        let f = fixtures();
        assert_eq!(f.contacts().len(), 21);
        assert_eq!(f.messages().len(), 22);
        assert_eq!(f.calls().len(), 18);
    }

    #[test]
    fn test_contact_phones_unique() {
        let contacts = fixtures().contacts();
        let phones: HashSet<_> = contacts.iter().map(|c| c.phone.as_str()).collect();
        assert_eq!(phones.len(), contacts.len());
    }

    #[test]
    fn test_sorted_descending_and_not_after_anchor() {
        let f = fixtures();
        let anchor = f.anchor().timestamp_millis();

        let messages = f.messages();
        assert!(messages.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(messages.iter().all(|m| m.timestamp <= anchor));

        let calls = f.calls();
        assert!(calls.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(calls.iter().all(|c| c.name().is_some()));
    }
}

//! Calendar scan, add, skip and delete behavior against the scripted phone.

mod common;

use chrono::NaiveDate;
use common::{quick_protocol, MockPhone};
use sbnlink::at::AtEngine;
use sbnlink::error::LinkError;
use sbnlink::objects::calendar::encode_vcalendar;
use sbnlink::objects::{CalendarEntry, CalendarKind};
use sbnlink::transport::ChannelTransport;

fn entry(location: u32, year: i32, text: &str) -> CalendarEntry {
    CalendarEntry {
        location,
        kind: CalendarKind::Meeting,
        start: NaiveDate::from_ymd_opt(year, 6, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        text: text.to_string(),
    }
}

fn seed(phone: &mut MockPhone, wire_location: u32, e: &CalendarEntry) {
    phone
        .slots
        .insert(("vcs".to_string(), wire_location), encode_vcalendar(e));
}

#[tokio::test]
async fn scan_skips_vacant_slots_and_remembers_position() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut scripted = MockPhone::new(dev_t);
    // Wire slots 2 and 6 occupied: public locations 3 and 7.
    seed(&mut scripted, 2, &entry(3, 2031, "Dentist"));
    seed(&mut scripted, 6, &entry(7, 2031, "Review"));
    let phone = tokio::spawn(scripted.run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let first = engine.next_calendar_entry(Some(0)).await.unwrap();
    assert_eq!(first.location, 3);
    assert_eq!(first.text, "Dentist");
    let second = engine.next_calendar_entry(None).await.unwrap();
    assert_eq!(second.location, 7);
    assert_eq!(second.text, "Review");
    // Scan runs off the end of the sequence.
    let err = engine.next_calendar_entry(None).await.unwrap_err();
    assert!(matches!(err, LinkError::Empty));

    drop(engine);
    let phone = phone.await.unwrap();
    // Every probe is a vcs read and locations never repeat.
    assert!(phone.commands.iter().all(|c| c.starts_with("AT^SBNR=\"vcs\"")));
}

#[tokio::test]
async fn add_then_scan_finds_the_entry() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let phone = tokio::spawn(MockPhone::new(dev_t).run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let e = entry(4, 2031, "Call Jane");
    engine.add_calendar_entry(&e, false).await.unwrap();
    let found = engine.next_calendar_entry(Some(0)).await.unwrap();
    assert_eq!(found.location, 4);
    assert_eq!(found.kind, CalendarKind::Meeting);
    assert_eq!(found.start, e.start);
    assert_eq!(found.text, "Call Jane");

    drop(engine);
    phone.await.unwrap();
}

#[tokio::test]
async fn past_entry_is_skipped_with_success_unless_forced() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let phone = tokio::spawn(MockPhone::new(dev_t).run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let stale = entry(4, 1999, "Y2K prep");
    engine.add_calendar_entry(&stale, false).await.unwrap();
    drop(engine);
    let phone = phone.await.unwrap();
    assert!(phone.commands.is_empty(), "skip must produce no traffic");
    assert!(phone.slots.is_empty());

    // Forcing writes it anyway.
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut forced = MockPhone::new(dev_t);
    forced.slots.clear();
    let phone = tokio::spawn(forced.run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());
    engine.add_calendar_entry(&stale, true).await.unwrap();
    drop(engine);
    let phone = phone.await.unwrap();
    assert!(phone.slots.contains_key(&("vcs".to_string(), 3)));
}

#[tokio::test]
async fn delete_clears_the_slot() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut scripted = MockPhone::new(dev_t);
    seed(&mut scripted, 3, &entry(4, 2031, "Dentist"));
    let phone = tokio::spawn(scripted.run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    engine.delete_calendar_entry(4).await.unwrap();

    drop(engine);
    let phone = phone.await.unwrap();
    assert!(phone.slots.is_empty());
    assert_eq!(phone.commands, vec!["AT^SBNW=\"vcs\",3,0".to_string()]);
}

#[tokio::test]
async fn location_zero_is_rejected_without_traffic() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let phone = tokio::spawn(MockPhone::new(dev_t).run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let bad = entry(0, 2031, "nowhere");
    let err = engine.add_calendar_entry(&bad, true).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidLocation));
    let err = engine.delete_calendar_entry(0).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidLocation));

    drop(engine);
    let phone = phone.await.unwrap();
    assert!(phone.commands.is_empty());
}

#[tokio::test]
async fn undecodable_slot_is_an_invalid_location() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut scripted = MockPhone::new(dev_t);
    scripted
        .slots
        .insert(("vcs".to_string(), 0), b"BEGIN:VCALENDAR no dtstart".to_vec());
    let phone = tokio::spawn(scripted.run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let err = engine.next_calendar_entry(Some(0)).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidLocation));

    drop(engine);
    phone.await.unwrap();
}

#[tokio::test]
async fn rejected_probe_ends_scan_without_advancing() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut scripted = MockPhone::new(dev_t);
    scripted.error_locations.insert(("vcs".to_string(), 1));
    seed(&mut scripted, 2, &entry(3, 2031, "Dentist"));
    let phone = tokio::spawn(scripted.run());
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    // Probe of public location 2 (wire 1) answers ERROR: the scan fails
    // and the cached position stays put, so retrying hits it again.
    let err = engine.next_calendar_entry(Some(1)).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidLocation));
    let err = engine.next_calendar_entry(None).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidLocation));

    drop(engine);
    let phone = phone.await.unwrap();
    assert_eq!(phone.commands.len(), 2);
}

//! Deadline and shutdown behavior with an unresponsive device.

mod common;

use std::time::{Duration, Instant};

use common::quick_protocol;
use sbnlink::at::AtEngine;
use sbnlink::error::LinkError;
use sbnlink::transport::ChannelTransport;

#[tokio::test]
async fn silent_device_times_out_each_operation_cleanly() {
    // Keep the far end alive but never answer.
    let (eng_t, _dev_t) = ChannelTransport::pair();
    let mut engine = AtEngine::new(eng_t, quick_protocol());

    let err = engine.read_ringtone(1).await.unwrap_err();
    assert!(matches!(err, LinkError::Timeout));
    // Stale wait state is gone: the next operation fails the same way
    // instead of tripping over a leftover pending request.
    let err = engine.read_phonebook_entry(1).await.unwrap_err();
    assert!(matches!(err, LinkError::Timeout));
}

#[tokio::test]
async fn shutdown_aborts_a_long_wait() {
    let (eng_t, _dev_t) = ChannelTransport::pair();
    let mut protocol = quick_protocol();
    protocol.reply_timeout_ms = 30_000;
    let mut engine = AtEngine::new(eng_t, protocol);
    let handle = engine.shutdown_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.signal();
    });
    let started = Instant::now();
    let err = engine.read_ringtone(1).await.unwrap_err();
    assert!(matches!(err, LinkError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn device_lost_mid_exchange_is_an_io_error() {
    let (eng_t, dev_t) = ChannelTransport::pair();
    let mut engine = AtEngine::new(eng_t, quick_protocol());
    drop(dev_t);

    let err = engine.read_ringtone(1).await.unwrap_err();
    assert!(matches!(err, LinkError::Io(_)));
}

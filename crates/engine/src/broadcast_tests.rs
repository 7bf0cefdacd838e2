// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tf_core::{Broadcast, TaskId};

#[test]
fn emit_without_subscribers_is_silent() {
    let broadcaster = Broadcaster::new();
    broadcaster.emit(Broadcast::TurnEnd { task_id: TaskId::new("T") });
}

#[tokio::test]
async fn subscribers_receive_events_in_order() {
    let broadcaster = Broadcaster::new();
    let mut rx = broadcaster.subscribe();
    broadcaster.emit(Broadcast::StreamingStart { task_id: TaskId::new("T") });
    broadcaster.emit(Broadcast::StreamingEnd { task_id: TaskId::new("T") });

    assert_eq!(rx.recv().await.unwrap().kind(), "agent:streaming_start");
    assert_eq!(rx.recv().await.unwrap().kind(), "agent:streaming_end");
}

#[tokio::test]
async fn each_subscriber_gets_every_event() {
    let broadcaster = Broadcaster::new();
    let mut a = broadcaster.subscribe();
    let mut b = broadcaster.subscribe();
    broadcaster.emit(Broadcast::TurnEnd { task_id: TaskId::new("T") });
    assert_eq!(a.recv().await.unwrap().kind(), "agent:turn_end");
    assert_eq!(b.recv().await.unwrap().kind(), "agent:turn_end");
}

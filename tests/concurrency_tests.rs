//! Concurrency stress tests: barrier-synchronized task fan-out against a single
//! shared service instance.

mod test_helpers;

use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test]
async fn concurrent_joins_never_exceed_room_capacity() {
    let harness = test_helpers::build_state();
    let service = harness.state.service.clone();

    let created = service
        .create_room("Alice".into(), "general knowledge".into(), 5, 4, 30)
        .await
        .expect("room creation succeeds");
    let pin = trivia_room_server::engine::Pin::normalize(&created.0.pin);

    let attempts = 20usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::with_capacity(attempts);

    for i in 0..attempts {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let pin = pin.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.join_room(&pin, format!("Player{i}")).await.is_ok()
        }));
    }

    let mut successful_joins = 0usize;
    for handle in handles {
        if handle.await.unwrap() {
            successful_joins += 1;
        }
    }

    // Capacity is 4 and the host already occupies one seat, so at most 3 of the
    // 20 concurrent join attempts may succeed.
    assert_eq!(successful_joins, 3, "only 3 more participants should fit alongside the host");

    let room = service.get_room(&pin).await.unwrap();
    assert_eq!(room.participants.len(), 4);
}

#[tokio::test]
async fn concurrent_room_creation_under_the_service_never_collides_pins() {
    let harness = test_helpers::build_state();
    let service = harness.state.service.clone();

    let attempts = 24usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::with_capacity(attempts);

    for i in 0..attempts {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service
                .create_room(format!("Host{i}"), "trivia".into(), 5, 10, 30)
                .await
                .unwrap()
                .0
                .pin
        }));
    }

    let mut pins = std::collections::HashSet::new();
    for handle in handles {
        pins.insert(handle.await.unwrap());
    }
    assert_eq!(pins.len(), attempts);
}

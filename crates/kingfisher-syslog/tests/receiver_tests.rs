//! End-to-end receiver tests over a real loopback socket.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use kingfisher_core::Counters;
use kingfisher_syslog::queue;
use kingfisher_syslog::receiver;

async fn wait_for<F: Fn() -> bool>(condition: F, deadline: Duration) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn datagrams_flow_into_the_queue() {
    let socket = receiver::bind_socket("127.0.0.1:0".parse().expect("addr"), 0).expect("bind");
    let local = socket.local_addr().expect("local addr");
    let (work_queue, _inboxes) = queue::work_queue(1, 100);
    let counters = Counters::new();
    let shutdown = CancellationToken::new();
    let receiver_task = tokio::spawn(receiver::receive_loop(
        socket,
        work_queue.clone(),
        counters.clone(),
        shutdown.clone(),
    ));

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").expect("sender socket");
    for n in 0..3 {
        sender
            .send_to(format!("message {n}").as_bytes(), local)
            .expect("send");
    }

    let counters_probe = counters.clone();
    assert!(
        wait_for(move || counters_probe.snapshot().received == 3, Duration::from_secs(3)).await,
        "receiver did not see all datagrams"
    );
    assert_eq!(counters.snapshot().enqueued, 3);
    assert_eq!(work_queue.depth(), 3);

    shutdown.cancel();
    receiver_task.await.expect("receiver task");
}

// With the queue capped at 4 and nobody consuming, ten back-to-back
// datagrams must produce at least six overflow drops, and the drop count
// must equal received minus enqueued.
#[tokio::test]
async fn overflow_drops_are_counted() {
    let socket = receiver::bind_socket("127.0.0.1:0".parse().expect("addr"), 0).expect("bind");
    let local = socket.local_addr().expect("local addr");
    let (work_queue, _inboxes) = queue::work_queue(1, 4);
    let counters = Counters::new();
    let shutdown = CancellationToken::new();
    let receiver_task = tokio::spawn(receiver::receive_loop(
        socket,
        work_queue.clone(),
        counters.clone(),
        shutdown.clone(),
    ));

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").expect("sender socket");
    for n in 0..10 {
        sender
            .send_to(format!("message {n}").as_bytes(), local)
            .expect("send");
    }

    let counters_probe = counters.clone();
    assert!(
        wait_for(move || counters_probe.snapshot().received == 10, Duration::from_secs(3)).await,
        "receiver did not see all datagrams"
    );

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.enqueued, 4);
    assert_eq!(snapshot.overflow_drops, 6);
    assert_eq!(snapshot.received - snapshot.enqueued, snapshot.overflow_drops);
    assert_eq!(work_queue.depth(), 4);

    shutdown.cancel();
    receiver_task.await.expect("receiver task");
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_dropped() {
    let socket = receiver::bind_socket("127.0.0.1:0".parse().expect("addr"), 0).expect("bind");
    let local = socket.local_addr().expect("local addr");
    let (work_queue, inboxes) = queue::work_queue(1, 10);
    let counters = Counters::new();
    let shutdown = CancellationToken::new();
    let receiver_task = tokio::spawn(receiver::receive_loop(
        socket,
        work_queue.clone(),
        counters.clone(),
        shutdown.clone(),
    ));

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").expect("sender socket");
    sender
        .send_to(&[b'o', b'k', 0xff, 0xfe, b'!'], local)
        .expect("send");

    let counters_probe = counters.clone();
    assert!(
        wait_for(move || counters_probe.snapshot().enqueued == 1, Duration::from_secs(3)).await,
        "datagram was not enqueued"
    );

    match inboxes[0]
        .recv_timeout(Duration::from_millis(200))
        .await
    {
        kingfisher_syslog::queue::Inbound::Item(datagram) => {
            assert!(datagram.text.starts_with("ok"));
            assert!(datagram.text.contains('\u{FFFD}'));
            assert!(datagram.text.ends_with('!'));
        }
        other => panic!("expected an item, got {other:?}"),
    }

    shutdown.cancel();
    receiver_task.await.expect("receiver task");
}

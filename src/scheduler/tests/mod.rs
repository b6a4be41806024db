use std::sync::Arc;
use std::time::Duration;

use crate::types::{BookId, FileVariant, Task};

use super::TaskQueue;

fn high(id: i64) -> Task {
    Task::new(BookId(id), FileVariant::Fb2, 0)
}

fn normal(id: i64) -> Task {
    Task::new(BookId(id), FileVariant::Epub, 0)
}

#[tokio::test]
async fn test_high_band_dispatches_first() {
    let queue = TaskQueue::new(100);

    queue.enqueue(normal(1)).await;
    queue.enqueue(high(2)).await;
    queue.enqueue(normal(3)).await;
    queue.enqueue(high(4)).await;
    queue.mark_producing_done();

    let order: Vec<i64> = [
        queue.dequeue().await.unwrap(),
        queue.dequeue().await.unwrap(),
        queue.dequeue().await.unwrap(),
        queue.dequeue().await.unwrap(),
    ]
    .iter()
    .map(|t| t.book_id.0)
    .collect();

    assert_eq!(order, vec![2, 4, 1, 3]);
}

#[tokio::test]
async fn test_fifo_within_band() {
    let queue = TaskQueue::new(100);

    for id in 0..20 {
        queue.enqueue(normal(id)).await;
    }
    queue.mark_producing_done();

    for expected in 0..20 {
        let task = queue.dequeue().await.unwrap();
        assert_eq!(task.book_id.0, expected);
        queue.task_done();
    }
}

#[tokio::test]
async fn test_dequeue_blocks_until_enqueue() {
    let queue = Arc::new(TaskQueue::new(100));

    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.dequeue().await })
    };

    // Give the consumer time to park on the empty queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!consumer.is_finished());

    queue.enqueue(high(7)).await;
    let task = consumer.await.unwrap().unwrap();
    assert_eq!(task.book_id.0, 7);
}

#[tokio::test]
async fn test_drains_after_producing_done() {
    let queue = Arc::new(TaskQueue::new(100));
    queue.enqueue(normal(1)).await;

    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            let mut seen = 0;
            while queue.dequeue().await.is_some() {
                seen += 1;
                queue.task_done();
            }
            seen
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.mark_producing_done();

    let seen = tokio::time::timeout(Duration::from_secs(2), consumer)
        .await
        .expect("consumer should terminate once drained")
        .unwrap();
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn test_empty_run_terminates() {
    let queue = Arc::new(TaskQueue::new(100));
    queue.mark_producing_done();

    let drained = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
        .await
        .expect("dequeue should observe the drained queue");
    assert!(drained.is_none());
}

#[tokio::test]
async fn test_retry_from_in_flight_task_is_not_lost() {
    // A worker holding the last task re-enqueues it after the producer is
    // done; a second parked worker must receive the retry instead of exiting.
    let queue = Arc::new(TaskQueue::new(100));
    queue.enqueue(Task::new(BookId(1), FileVariant::Fb2, 1)).await;
    queue.mark_producing_done();

    let holder = queue.dequeue().await.unwrap();

    let second = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.dequeue().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished(), "worker must wait on the in-flight task");

    queue.requeue(holder.retried()).await;
    queue.task_done();

    let retried = second.await.unwrap().expect("retry must be dispatched");
    assert_eq!(retried.retries_remaining, 0);
    queue.task_done();

    assert!(queue.dequeue().await.is_none());
}

#[tokio::test]
async fn test_drain_cascades_to_all_workers() {
    let queue = Arc::new(TaskQueue::new(100));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                while queue.dequeue().await.is_some() {
                    queue.task_done();
                }
            })
        })
        .collect();

    for id in 0..16 {
        queue.enqueue(normal(id)).await;
    }
    queue.mark_producing_done();

    for worker in workers {
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .expect("every worker should terminate")
            .unwrap();
    }
    assert_eq!(queue.pending_count().await, 0);
    assert_eq!(queue.in_flight_count(), 0);
}

#[tokio::test]
async fn test_no_task_consumed_twice() {
    let queue = Arc::new(TaskQueue::new(1000));
    let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                while let Some(task) = queue.dequeue().await {
                    seen.lock().await.push(task.book_id.0);
                    queue.task_done();
                }
            })
        })
        .collect();

    for id in 0..200 {
        queue.enqueue(if id % 3 == 0 { high(id) } else { normal(id) }).await;
    }
    queue.mark_producing_done();

    for worker in workers {
        worker.await.unwrap();
    }

    let mut ids = seen.lock().await.clone();
    ids.sort_unstable();
    assert_eq!(ids, (0..200).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_bounded_capacity_applies_backpressure() {
    let queue = Arc::new(TaskQueue::new(2));
    queue.enqueue(normal(1)).await;
    queue.enqueue(normal(2)).await;

    let blocked = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.enqueue(normal(3)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished(), "enqueue must block at capacity");

    // Popping one slot unblocks the producer.
    let first = queue.dequeue().await.unwrap();
    assert_eq!(first.book_id.0, 1);
    tokio::time::timeout(Duration::from_secs(1), blocked)
        .await
        .expect("enqueue should proceed once space frees")
        .unwrap();

    queue.task_done();
    assert_eq!(queue.pending_count().await, 2);
}

#[tokio::test]
async fn test_requeue_bypasses_capacity() {
    let queue = Arc::new(TaskQueue::new(1));
    queue.enqueue(Task::new(BookId(1), FileVariant::Epub, 1)).await;

    let held = queue.dequeue().await.unwrap();
    queue.enqueue(normal(2)).await; // refills the single slot

    // The retry path must not block even though the queue is full.
    tokio::time::timeout(Duration::from_millis(200), queue.requeue(held.retried()))
        .await
        .expect("requeue must not wait for capacity");
    queue.task_done();

    assert_eq!(queue.pending_count().await, 2);
}

#[tokio::test]
async fn test_producing_flag_observable() {
    let queue = TaskQueue::new(10);
    assert!(queue.is_producing());
    queue.mark_producing_done();
    assert!(!queue.is_producing());
}

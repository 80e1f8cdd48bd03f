use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc::channel,
    },
    time::Duration,
};

use gifsheet::{CancelToken, ComposeOpts, Document, EffectSettings, Frame, WorkerPool, compose};

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn different_names_run_independently() {
    let pool = WorkerPool::with_default_threads().unwrap();
    pool.submit("a", |_| 1u32);
    pool.submit("b", |_| 2u32);

    let mut got = vec![
        pool.recv_timeout(WAIT).unwrap(),
        pool.recv_timeout(WAIT).unwrap(),
    ];
    got.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!((got[0].name.as_str(), got[0].value), ("a", 1));
    assert_eq!((got[1].name.as_str(), got[1].value), ("b", 2));
}

#[test]
fn burst_of_submissions_delivers_only_the_latest() {
    let pool = WorkerPool::new(2).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let (release_tx, release_rx) = channel::<()>();
    let (started_tx, started_rx) = channel::<()>();

    {
        let runs = Arc::clone(&runs);
        pool.submit("preview", move |_: &CancelToken| {
            runs.fetch_add(1, Ordering::SeqCst);
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            0usize
        });
    }
    started_rx.recv().unwrap();

    let mut last = 0;
    for i in 1..=10usize {
        let runs = Arc::clone(&runs);
        last = pool.submit("preview", move |_| {
            runs.fetch_add(1, Ordering::SeqCst);
            i
        });
    }
    assert_eq!(last, 11);
    assert!(pool.is_running("preview"));
    release_tx.send(()).unwrap();

    let out = pool.recv_timeout(WAIT).unwrap();
    assert_eq!(out.value, 10);
    assert_eq!(out.generation, 11);
    assert!(pool.wait_idle(WAIT));
    assert!(pool.poll().is_none());
    // the first job and the last replacement
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(pool.latest_generation("preview"), 11);
}

#[test]
fn in_flight_job_sees_cancellation() {
    let pool = WorkerPool::new(1).unwrap();
    let (started_tx, started_rx) = channel::<()>();
    let (release_tx, release_rx) = channel::<()>();
    let (seen_tx, seen_rx) = channel::<bool>();

    pool.submit("job", move |token: &CancelToken| {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
        seen_tx.send(token.is_cancelled()).unwrap();
        "old"
    });
    started_rx.recv().unwrap();
    pool.submit("job", |_| "new");
    release_tx.send(()).unwrap();

    assert!(seen_rx.recv_timeout(WAIT).unwrap());
    assert_eq!(pool.recv_timeout(WAIT).unwrap().value, "new");
}

#[test]
fn compositing_runs_off_thread() {
    let pool = WorkerPool::with_default_threads().unwrap();
    let frames: Vec<Frame> = (0..7)
        .map(|i| Frame::solid(8, 8, [i * 30, 0, 0, 255]))
        .collect();

    let expected = compose(&frames, &ComposeOpts::default(), &EffectSettings::default()).unwrap();
    pool.submit("sheet", move |_| {
        compose(&frames, &ComposeOpts::default(), &EffectSettings::default())
    });
    let out = pool.recv_timeout(WAIT).unwrap();
    assert_eq!(out.value.unwrap(), expected);
}

#[test]
fn document_snapshot_renders_in_background() {
    let pool = WorkerPool::with_default_threads().unwrap();
    let mut doc = Document::default();
    doc.config.auto_size = true;
    doc.set_frames(vec![Frame::solid(4, 4, [1, 2, 3, 255]); 3]);

    let snapshot = doc.clone();
    pool.submit("preview", move |_| snapshot.render_preview(6, 6).image);
    let img = pool.recv_timeout(WAIT).unwrap().value;
    assert_eq!(img.dimensions(), (6, 2));
}

#[test]
fn pool_keeps_serving_after_a_job_panics() {
    let pool = WorkerPool::new(1).unwrap();
    pool.submit("sheet", |_| -> u32 { panic!("bad frame data") });
    assert!(pool.wait_idle(WAIT));

    pool.submit("sheet", |_| 11u32);
    let out = pool.recv_timeout(WAIT).unwrap();
    assert_eq!((out.name.as_str(), out.generation, out.value), ("sheet", 2, 11));
}

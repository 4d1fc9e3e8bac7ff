//! Many callers against one file system: commits are serialized, racing
//! creators of the same path see exactly one winner, and the namespace
//! invariants hold once the dust settles.

use bytes::Bytes;
use cafs_fs::{FileSystem, FsConfig, NamespaceStateMachine};
use futures::future::join_all;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creators_have_one_winner() {
    init_logging();
    let fs = FileSystem::in_memory(&FsConfig::default());
    assert!(fs.create_directory("/race").await.unwrap());

    let tasks = (0..32).map(|i| {
        let fs = fs.clone();
        tokio::spawn(async move {
            fs.create_file("/race/winner", Bytes::from(format!("writer {i}")))
                .await
                .unwrap()
        })
    });
    let results: Vec<bool> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(results.iter().filter(|won| **won).count(), 1);

    // the winner's bytes are what is read back
    let body = fs.read_file("/race/winner").await.unwrap().unwrap();
    assert!(body.starts_with(b"writer "));
    let meta = fs.stat("/race/winner").await.unwrap().unwrap();
    assert_eq!(meta.size(), body.len() as u64);

    // every losing blob is retained as well
    assert_eq!(fs.content().len().await.unwrap(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_trees_keep_invariants() {
    init_logging();
    let fs = FileSystem::in_memory(&FsConfig::default());

    let tasks = (0..8).map(|worker| {
        let fs = fs.clone();
        tokio::spawn(async move {
            let dir = format!("/w{worker}");
            assert!(fs.create_directory(&dir).await.unwrap());
            for i in 0..10 {
                let path = format!("{dir}/f{i}");
                assert!(fs.create_file(&path, Bytes::from(path.clone())).await.unwrap());
                // read-your-writes for every caller
                assert_eq!(
                    fs.read_file(&path).await.unwrap().unwrap(),
                    Bytes::from(path.clone())
                );
            }
            for i in (0..10).step_by(2) {
                assert!(fs.delete(&format!("{dir}/f{i}")).await.unwrap());
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    for worker in 0..8 {
        let listing = fs.list_directory(&format!("/w{worker}")).await.unwrap();
        let names: Vec<_> = listing.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["f1", "f3", "f5", "f7", "f9"]);
    }

    // the committed log is a total order every replica can follow
    let log = fs.metadata().log_entries().await.unwrap();
    assert_eq!(log.len(), 8 * (1 + 10 + 5));
    let root_created = fs.stat("/").await.unwrap().unwrap().created_time();
    let replica = NamespaceStateMachine::replay(Default::default(), root_created, &log).unwrap();
    replica.check_invariants().unwrap();
    assert_eq!(replica.len(), 1 + 8 + 8 * 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn child_creation_races_parent_creation() {
    init_logging();
    let fs = FileSystem::in_memory(&FsConfig::default());

    let child = {
        let fs = fs.clone();
        tokio::spawn(async move {
            // spin until the parent becomes visible
            loop {
                if fs.create_directory("/parent/child").await.unwrap() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
    };
    let parent = {
        let fs = fs.clone();
        tokio::spawn(async move { fs.create_directory("/parent").await.unwrap() })
    };

    assert!(parent.await.unwrap());
    child.await.unwrap();

    let log = fs.metadata().log_entries().await.unwrap();
    let paths: Vec<_> = log
        .iter()
        .map(|e| e.operation.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/parent", "/parent/child"]);
}

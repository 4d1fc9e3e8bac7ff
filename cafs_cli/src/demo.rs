//! Walk-through of the consistency guarantees against an in-memory node.

use std::io::Write;

use bytes::Bytes;
use cafs_fs::{EntryKind, FileSystem};
use tracing::info;

/// What the walk-through observed, for callers that want to check it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DemoReport {
    pub hello_size: u64,
    pub blobs_after_dedup: usize,
    pub temp_listing: Vec<String>,
    pub missing_parent_rejected: bool,
    pub duplicate_rejected: bool,
    pub committed_ops: usize,
}

fn banner(out: &mut impl Write, title: &str) -> anyhow::Result<()> {
    writeln!(out, "\n{}\n{title}\n{}", "=".repeat(40), "=".repeat(40))?;
    Ok(())
}

async fn print_listing(fs: &FileSystem, path: &str, out: &mut impl Write) -> anyhow::Result<Vec<String>> {
    let entries = fs.list_directory(path).await?;
    writeln!(out, "listing {path}:")?;
    if entries.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for entry in &entries {
        let kind = match entry.kind {
            EntryKind::Directory => "dir ",
            EntryKind::File => "file",
        };
        writeln!(out, "  {kind} {} ({} bytes)", entry.name, entry.size)?;
    }
    Ok(entries.into_iter().map(|e| e.name).collect())
}

pub async fn run(fs: &FileSystem, out: &mut impl Write) -> anyhow::Result<DemoReport> {
    let mut report = DemoReport::default();

    banner(out, "basic file operations")?;
    fs.create_directory("/projects").await?;
    let hello = Bytes::from_static(b"Hello, distributed world!");
    fs.create_file("/projects/hello.txt", hello).await?;
    print_listing(fs, "/projects", out).await?;
    if let Some(body) = fs.read_file("/projects/hello.txt").await? {
        writeln!(out, "read back: {}", String::from_utf8_lossy(&body))?;
    }
    if let Some(meta) = fs.stat("/projects/hello.txt").await? {
        report.hello_size = meta.size();
        writeln!(out, "hash: {}", meta.content_hash_hex())?;
    }

    banner(out, "content deduplication")?;
    let before = fs.content().len().await?;
    let same = Bytes::from_static(b"This is identical content");
    fs.create_file("/projects/file1.txt", same.clone()).await?;
    fs.create_file("/projects/file2.txt", same).await?;
    fs.create_file(
        "/projects/file3.txt",
        Bytes::from_static(b"This is different content"),
    )
    .await?;
    report.blobs_after_dedup = fs.content().len().await?;
    writeln!(
        out,
        "3 files written, {} new blobs stored",
        report.blobs_after_dedup - before
    )?;
    print_listing(fs, "/projects", out).await?;

    banner(out, "operation ordering")?;
    fs.create_directory("/temp").await?;
    fs.create_file("/temp/doc1.txt", Bytes::from_static(b"Document 1")).await?;
    fs.create_file("/temp/doc2.txt", Bytes::from_static(b"Document 2")).await?;
    report.temp_listing = print_listing(fs, "/temp", out).await?;

    banner(out, "consistency guarantees")?;
    report.missing_parent_rejected = !fs
        .create_file("/nonexistent/file.txt", Bytes::from_static(b"Should fail"))
        .await?;
    writeln!(
        out,
        "create in missing directory: {}",
        verdict(report.missing_parent_rejected)
    )?;
    report.duplicate_rejected = !fs
        .create_file("/projects/hello.txt", Bytes::from_static(b"Duplicate"))
        .await?;
    writeln!(
        out,
        "create over existing file: {}",
        verdict(report.duplicate_rejected)
    )?;

    report.committed_ops = fs.metadata().log_entries().await?.len();
    info!(committed = report.committed_ops, "demo complete");
    writeln!(out, "\n{} operations committed", report.committed_ops)?;
    Ok(report)
}

fn verdict(rejected: bool) -> &'static str {
    if rejected {
        "rejected as expected"
    } else {
        "unexpectedly accepted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_fs::FsConfig;

    #[tokio::test]
    async fn demo_observes_every_guarantee() {
        let fs = FileSystem::in_memory(&FsConfig::default());
        let mut out = Vec::new();
        let report = run(&fs, &mut out).await.unwrap();

        assert_eq!(
            report,
            DemoReport {
                hello_size: 25,
                blobs_after_dedup: 3,
                temp_listing: vec!["doc1.txt".into(), "doc2.txt".into()],
                missing_parent_rejected: true,
                duplicate_rejected: true,
                // 2 dirs + 1 hello + 3 files + 2 docs
                committed_ops: 8,
            }
        );
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("read back: Hello, distributed world!"));
        assert!(!text.contains("unexpectedly accepted"));
    }
}

//! Line oriented command scripts, one command per line:
//!
//! ```text
//! mkdir /projects
//! put /projects/hello.txt Hello, distributed world!
//! cat /projects/hello.txt
//! ls /projects
//! stat /projects/hello.txt
//! rm /projects/hello.txt
//! log
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::io::Write;

use anyhow::{Context, anyhow, bail};
use bytes::Bytes;
use cafs_fs::{EntryKind, FileSystem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCmd {
    Mkdir(String),
    /// Everything after the path, verbatim, is the file body.
    Put { path: String, body: String },
    Cat(String),
    Ls(String),
    Rm(String),
    Stat(String),
    Log,
}

pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptCmd>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim_start();
    let (path, tail) = rest.split_once(' ').unwrap_or((rest, ""));
    let require_path = || -> anyhow::Result<String> {
        if path.is_empty() {
            Err(anyhow!("`{verb}` needs a path"))
        } else {
            Ok(path.to_owned())
        }
    };

    let cmd = match verb {
        "mkdir" => ScriptCmd::Mkdir(require_path()?),
        "put" => ScriptCmd::Put {
            path: require_path()?,
            body: tail.to_owned(),
        },
        "cat" => ScriptCmd::Cat(require_path()?),
        "ls" => ScriptCmd::Ls(if path.is_empty() { "/".into() } else { path.into() }),
        "rm" => ScriptCmd::Rm(require_path()?),
        "stat" => ScriptCmd::Stat(require_path()?),
        "log" => ScriptCmd::Log,
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(cmd))
}

pub fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptCmd>> {
    let mut cmds = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if let Some(cmd) = parse_line(line).with_context(|| format!("line {}", n + 1))? {
            cmds.push(cmd);
        }
    }
    Ok(cmds)
}

fn outcome(ok: bool) -> &'static str {
    if ok { "ok" } else { "rejected" }
}

/// Runs `cmd` against `fs`, writing human readable results to `out`.
pub async fn execute(fs: &FileSystem, cmd: &ScriptCmd, out: &mut impl Write) -> anyhow::Result<()> {
    match cmd {
        ScriptCmd::Mkdir(path) => {
            let ok = fs.create_directory(path).await?;
            writeln!(out, "mkdir {path}: {}", outcome(ok))?;
        }
        ScriptCmd::Put { path, body } => {
            let ok = fs
                .create_file(path, Bytes::copy_from_slice(body.as_bytes()))
                .await?;
            writeln!(out, "put {path} ({} bytes): {}", body.len(), outcome(ok))?;
        }
        ScriptCmd::Cat(path) => match fs.read_file(path).await? {
            Some(bytes) => writeln!(out, "{}", String::from_utf8_lossy(&bytes))?,
            None => writeln!(out, "cat {path}: no such file")?,
        },
        ScriptCmd::Ls(path) => {
            let entries = fs.list_directory(path).await?;
            if entries.is_empty() {
                writeln!(out, "{path}: (empty)")?;
            }
            for entry in entries {
                let marker = match entry.kind {
                    EntryKind::Directory => "d",
                    EntryKind::File => "-",
                };
                writeln!(
                    out,
                    "{marker} {:>8} {} {}",
                    entry.size,
                    entry.created.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                    entry.name
                )?;
            }
        }
        ScriptCmd::Rm(path) => {
            let ok = fs.delete(path).await?;
            writeln!(out, "rm {path}: {}", outcome(ok))?;
        }
        ScriptCmd::Stat(path) => match fs.stat(path).await? {
            Some(meta) => writeln!(
                out,
                "{} kind={} size={} hash={} created={}",
                meta.path(),
                meta.kind(),
                meta.size(),
                meta.content_hash_hex(),
                meta.created_time().to_rfc3339()
            )?,
            None => writeln!(out, "stat {path}: no such entry")?,
        },
        ScriptCmd::Log => {
            for entry in fs.metadata().log_entries().await? {
                writeln!(
                    out,
                    "#{} term={} {} {} ({})",
                    entry.index,
                    entry.term,
                    entry.operation.name(),
                    entry.operation.path(),
                    entry.operation.op_id()
                )?;
            }
        }
    }
    Ok(())
}

pub async fn run_script(fs: &FileSystem, text: &str, out: &mut impl Write) -> anyhow::Result<()> {
    for cmd in parse_script(text)? {
        execute(fs, &cmd, out).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_fs::FsConfig;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("  # comment").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(
            parse_line("mkdir /a").unwrap(),
            Some(ScriptCmd::Mkdir("/a".into()))
        );
        assert_eq!(
            parse_line("put /a/b.txt Hello, distributed world!").unwrap(),
            Some(ScriptCmd::Put {
                path: "/a/b.txt".into(),
                body: "Hello, distributed world!".into()
            })
        );
        assert_eq!(parse_line("ls").unwrap(), Some(ScriptCmd::Ls("/".into())));
        assert_eq!(parse_line("log").unwrap(), Some(ScriptCmd::Log));
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(parse_line("cat").is_err());
        assert!(parse_line("chmod /a").is_err());
        let err = parse_script("mkdir /a\nbogus\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[tokio::test]
    async fn runs_a_session() {
        let fs = FileSystem::in_memory(&FsConfig::default());
        let mut out = Vec::new();
        run_script(
            &fs,
            "mkdir /projects\n\
             put /projects/hello.txt Hello, distributed world!\n\
             put /nonexistent/file.txt nope\n\
             cat /projects/hello.txt\n\
             rm /projects/missing\n",
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "mkdir /projects: ok",
                "put /projects/hello.txt (25 bytes): ok",
                "put /nonexistent/file.txt (4 bytes): rejected",
                "Hello, distributed world!",
                "rm /projects/missing: rejected",
            ]
        );
    }

    #[tokio::test]
    async fn lists_and_logs() {
        let fs = FileSystem::in_memory(&FsConfig::default());
        let mut out = Vec::new();
        run_script(&fs, "mkdir /d\nput /d/f x\nls /d\nlog\n", &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l.starts_with("-        1 ") && l.ends_with(" f")));
        assert!(text.contains("#0 term=1 create_directory /d"));
        assert!(text.contains("#1 term=1 create_file /d/f"));
    }
}

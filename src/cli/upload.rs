use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gitdrop_core::model::DEFAULT_BRANCH;
use gitdrop_core::{
    FileStatus, FileUpload, HttpRelay, RepositoryCoordinate, StatusObserver, UploadDriver,
};
use url::Url;

use crate::context::Context;

pub fn args() -> Command {
    Command::new("upload")
        .about("upload files into a GitHub branch, one commit per file")
        .arg_required_else_help(true)
        .arg(
            Arg::new("owner")
                .short('o')
                .long("owner")
                .help("repository owner")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("repo")
                .short('r')
                .long("repo")
                .help("repository name")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("branch")
                .short('b')
                .long("branch")
                .help("existing branch to commit to")
                .default_value(DEFAULT_BRANCH)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("prefix")
                .short('p')
                .long("prefix")
                .help("repository directory to place the files in")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("endpoint")
                .short('e')
                .long("endpoint")
                .help("relay base url (default $GITDROP_ENDPOINT or http://localhost:3000)")
                .value_parser(value_parser!(Url))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("FILES")
                .help("files to upload, in order")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append),
        )
}

struct ConsoleObserver;

impl StatusObserver for ConsoleObserver {
    fn on_status(&self, file: &FileUpload) {
        match &file.status {
            FileStatus::Error(_) => eprintln!("{}: {}", file.file_name, file.status),
            _ => println!("{}: {}", file.file_name, file.status),
        }
    }
}

/// Repository path for a local file: its base name, under `prefix` if given.
pub fn repository_path(file: &Path, prefix: Option<&str>) -> anyhow::Result<String> {
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", file.display()))?;

    Ok(match prefix.map(|prefix| prefix.trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}/{name}"),
        _ => name.to_string(),
    })
}

pub async fn handlers(matches: &ArgMatches, context: &Context) -> anyhow::Result<()> {
    let owner = matches.get_one::<String>("owner").context("owner expected")?;
    let repo = matches.get_one::<String>("repo").context("repo expected")?;
    let branch = matches
        .get_one::<String>("branch")
        .map(|branch| branch.as_str())
        .unwrap_or(DEFAULT_BRANCH);
    let prefix = matches.get_one::<String>("prefix").map(|prefix| prefix.as_str());
    let endpoint = matches
        .get_one::<Url>("endpoint")
        .unwrap_or(&context.endpoint);

    let mut files = vec![];
    for path in matches.get_many::<PathBuf>("FILES").into_iter().flatten() {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        files.push((repository_path(path, prefix)?, content));
    }

    let relay = HttpRelay::new(endpoint, context.timeout)?;
    tracing::debug!("relaying {} file(s) to {}", files.len(), relay.upload_url());

    let driver = UploadDriver::new(
        Arc::new(relay),
        RepositoryCoordinate::new(owner, repo, branch),
    )
    .with_observer(Arc::new(ConsoleObserver));

    let uploads = driver.run(files).await;

    let failed = uploads
        .iter()
        .filter(|upload| matches!(upload.status, FileStatus::Error(_)))
        .count();

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed to upload", failed, uploads.len());
    }

    Ok(())
}

use clap::Command;

mod context;
mod upload;

use context::Context;

fn cli() -> Command {
    Command::new("gitdrop")
        .about("drop files into GitHub branches")
        .version("0.1.1")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(upload::args())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = cli().get_matches();

    let context = Context::from_env()?;

    match matches.subcommand() {
        Some(("upload", submatches)) => Ok(upload::handlers(submatches, &context).await?),
        _ => unreachable!(), // If all subcommands are defined above, anything else is unreachable
    }
}

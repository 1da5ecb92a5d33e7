mod commands;
pub mod flags;
mod reporter;

use commands::*;
use structopt::StructOpt;
use tracing::{error, log};

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "mirrorfetch",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Download a file from the first of several mirrors that works"
)]
struct Mirrorfetch {
    #[structopt(subcommand, help = "the command to run")]
    cmd: Command,
}

impl Mirrorfetch {
    async fn run(self) -> Result<(), anyhow::Error> {
        human_panic::setup_panic!(Metadata {
            name: "mirrorfetch".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            authors: env!("CARGO_PKG_AUTHORS").into(),
            homepage: "".into(),
        });

        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .format_timestamp_micros()
            .format_module_path(false)
            .parse_env("MIRRORFETCH_LOG")
            .try_init()?;

        let result = self.cmd.run().await;

        if let Err(ref err) = result {
            error!("{:?}", &err);
        };

        result
    }
}

#[derive(StructOpt, Debug, Clone)]
enum Command {
    Download(DownloadCommand),
    CachePath(CachePathCommand),
}

impl Command {
    async fn run(self) -> Result<(), anyhow::Error> {
        match self {
            Command::Download(x) => x.run().await,
            Command::CachePath(x) => x.run().await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    Mirrorfetch::from_args().run().await
}

use super::*;
use mirrorfetch_core::cache::FileCache;
use mirrorfetch_core::Config;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "cache-path",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Print where a URL would be cached, without downloading it",
)]
pub struct CachePathCommand {
    #[structopt(help = r"The URL to look up.")]
    url: String,

    #[structopt(flatten)]
    flags: Flags,
}

impl CachePathCommand {
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let config = Config::try_from(self.flags)?;
        let cache = FileCache::new(&config);
        println!("{}", cache.cache_path(&self.url).display());
        Ok(())
    }
}

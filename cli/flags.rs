use mirrorfetch_core::{Config, ConfigError};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Default, Debug, Clone, StructOpt)]
pub struct Flags {
    #[structopt(
        help = r"Where to cache downloads that have no explicit target path.

Defaults to $MIRRORFETCH_CACHE_DIR, or the user's cache directory.
",
        long = "cache-dir"
    )]
    pub(crate) cache_dir: Option<PathBuf>,

    #[structopt(
        help = r"Copy local (file://) mirrors into the target path instead of using them where they are.",
        long = "copy-local-files"
    )]
    pub(crate) copy_local_files: bool,
}

impl TryFrom<Flags> for Config {
    type Error = ConfigError;

    fn try_from(flags: Flags) -> Result<Self, Self::Error> {
        let mut config = Config::builder();

        config.copy_local_files(flags.copy_local_files);

        if let Some(cache_dir) = flags.cache_dir {
            config.cache_root(cache_dir);
        }

        config.build()
    }
}

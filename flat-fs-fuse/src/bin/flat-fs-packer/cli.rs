use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Directory of files to pack
    #[arg(long, short)]
    pub source: PathBuf,

    /// Output image path
    #[arg(long, short)]
    pub image: PathBuf,

    /// Image size in sectors
    #[arg(long, default_value_t = 16 * 2048)]
    pub sectors: usize,
}

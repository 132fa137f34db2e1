mod cli;

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use clap::Parser;
use cli::Cli;
use flat_fs::{FlatFileSystem, SectorId, SECTOR_SIZE};
use flat_fs_fuse::{BlockFile, MemFreeMap};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("image={:?} sectors={}", cli.image, cli.sectors);

    let block_file = Arc::new(BlockFile(Mutex::new({
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&cli.image)?;
        fd.set_len((cli.sectors * SECTOR_SIZE) as u64)?;

        fd
    })));

    let mut sources: Vec<PathBuf> = fs::read_dir(&cli.source)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    sources.sort();

    // one pinned header sector per file, data extents from the rest
    let free_map = MemFreeMap::new(cli.sectors);
    free_map.reserve(SectorId::new(0), sources.len());
    let fs = FlatFileSystem::new(block_file, Box::new(free_map));

    for (nth, path) in sources.iter().enumerate() {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        let header = SectorId::new(nth as u32);
        fs.create(header, data.len()).expect("image out of space");
        let inode = fs.open(header);
        assert_eq!(data.len(), inode.write_at(0, &data));
        fs.close(inode);

        println!("{}: header={:?} bytes={}", path.display(), header, data.len());
    }

    fs.sync_all();
    Ok(())
}

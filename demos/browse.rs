use std::env;

use vfs_tree::{FsBackend, FsCursor, ZipFS};

fn main() {
    let Some(archive) = env::args().nth(1) else {
        eprintln!("usage: browse <archive.zip> [path]");
        std::process::exit(2);
    };
    let start = env::args().nth(2).unwrap_or_default();

    // indexes the archive directory once; entry data stays compressed until opened
    let fs = ZipFS::open(&archive).unwrap();
    for skipped in fs.conflicts() {
        println!("skipped ambiguous entry: {skipped}");
    }

    let top = fs.resolve(&start);
    if !top.exists() {
        eprintln!("{start}: no such entry in {archive}");
        std::process::exit(1);
    }

    // files are listed with their size, directories with a trailing slash
    for cursor in top.tree() {
        let path = cursor.full_path().unwrap_or_default();
        if cursor.is_dir() {
            println!("{path}/");
        } else {
            println!("{path} ({} bytes)", cursor.length());
        }
    }
}

use std::io::Read;

use vfs::*;

fn main() -> VfsResult<()> {
    // Pack a brfs blob
    brfs::pack("src", "./src.brfs")?;
    // then open it
    let fs: VfsPath = brfs::load("./src.brfs")?.into();
    // walk_dir descends into subdirectories for us
    for entry in fs.walk_dir()? {
        let entry = entry?;
        match entry.metadata()?.file_type {
            VfsFileType::File => {
                println!("File {{ file: {:?} }}", entry.as_str());
                let mut buf = String::new();
                entry.open_file()?.read_to_string(&mut buf)?;
                println!("{} bytes", buf.len());
            }
            VfsFileType::Directory => println!("Dir {{ path: {:?} }}", entry.as_str()),
        }
    }
    std::fs::remove_file("./src.brfs")?;
    Ok(())
}

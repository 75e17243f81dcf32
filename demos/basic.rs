use std::io::Read;

fn main() -> std::io::Result<()> {
    // Pack a brfs blob
    brfs::pack("src", "./src.brfs")?;
    // then open it
    let fs = brfs::load("./src.brfs")?;
    // iterating over and printing what's inside is as easy as using std::fs
    list(&fs, "/")?;

    let mut lib = String::new();
    fs.open("lib.rs")?.read_to_string(&mut lib)?;
    println!("{}", lib.lines().next().unwrap_or_default());

    std::fs::remove_file("./src.brfs")?;
    Ok(())
}

fn list(fs: &brfs::Vfs, dir: &str) -> std::io::Result<()> {
    for entry in fs.read_dir(dir)? {
        if entry.metadata().is_file() {
            println!(
                "File {{ file: {:?}, inner: {:?} }}",
                entry.path(),
                fs.open(entry.path())?
            );
        } else {
            println!("Dir {{ path: {:?} }}", entry.path());
            list(fs, entry.path())?;
        }
    }
    Ok(())
}

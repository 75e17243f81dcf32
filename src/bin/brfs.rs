#[cfg(not(feature = "cli"))]
compile_error!("Need cli feature to compile brfs cli");

use std::path::{Path, PathBuf};

use argh::FromArgs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs, PartialEq, Debug)]
/// Embed a compressed read-only file system in Rust executables
struct Args {
    #[argh(switch, short = 'v')]
    /// log every packed file
    verbose: bool,
    #[argh(subcommand)]
    cmd: Command,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Command {
    Pack(PackOpt),
    Unpack(UnpackOpt),
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "pack")]
/// Pack files and folders into a blob plus generated Rust source
struct PackOpt {
    #[argh(option, default = "String::from(\"public\")")]
    /// the input files and directories, comma separated, "public" by default
    src: String,
    #[argh(option, short = 'o')]
    /// name of the generated file, follows input by default
    output: Option<String>,
    #[argh(option, default = "String::from(\"br\")")]
    /// name of the exposed static, "br" by default
    var: String,
    #[argh(option)]
    /// globs of the files to include, e.g. "*.html,*.css"
    include: Option<String>,
    #[argh(option)]
    /// globs of the files to exclude, e.g. "*.map"
    exclude: Option<String>,
    #[argh(option, default = "11")]
    /// compression quality (1-11), the highest by default
    quality: u32,
    #[argh(switch)]
    /// embed the blob in the generated source instead of a separate file
    inline: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "unpack")]
/// Unpack a blob into a folder
struct UnpackOpt {
    #[argh(positional)]
    /// path to the blob to unpack
    src: String,
    #[argh(positional)]
    /// folder to unpack into
    dst: String,
}

fn pack(opt: PackOpt) -> anyhow::Result<()> {
    let inputs: Vec<&str> = opt.src.split(',').filter(|s| !s.is_empty()).collect();
    let mut config = brfs::PackConfig::new(inputs)
        .variable(opt.var)
        .quality(opt.quality)
        .inline(opt.inline);
    if let Some(output) = opt.output {
        config = config.output(output);
    }
    if let Some(include) = opt.include {
        config = config.include(include);
    }
    if let Some(exclude) = opt.exclude {
        config = config.exclude(exclude);
    }
    let summary = config.validate()?.pack()?;
    println!(
        "packed {} files ({} -> {} bytes) into {}",
        summary.files,
        summary.raw_bytes,
        summary.packed_bytes,
        summary.source.display()
    );
    Ok(())
}

fn unpack(fs: &brfs::Vfs, src_dir: &str, dst_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dst_dir)?;
    for entry in fs.read_dir(src_dir)? {
        let dst = dst_dir.join(entry.file_name());
        if entry.metadata().is_file() {
            let mut src = fs.open(entry.path())?;
            let mut out = std::fs::File::create(&dst)?;
            std::io::copy(&mut src, &mut out)?;
            info!(path = entry.path(), "unpacked");
        } else {
            unpack(fs, entry.path(), &dst)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.cmd {
        Command::Pack(opt) => pack(opt)?,
        Command::Unpack(opt) => {
            let fs = brfs::load(&opt.src)?;
            unpack(&fs, "/", &PathBuf::from(opt.dst))?;
        }
    }
    Ok(())
}

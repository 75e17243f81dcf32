#![cfg(feature = "build")]

use std::error::Error;
use std::fs;

use brfs::{ConfigError, PackConfig};
use tracing_test::traced_test;

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    fs::create_dir_all(public.join("css")).unwrap();
    fs::create_dir_all(public.join("js")).unwrap();
    fs::write(public.join("index.html"), "<h1>hello</h1>\n".repeat(40)).unwrap();
    fs::write(public.join("css/site.css"), "h1 { color: red }\n".repeat(20)).unwrap();
    fs::write(public.join("js/app.js"), "console.log(1)\n").unwrap();
    fs::write(public.join("js/app.js.map"), "{}").unwrap();
    dir
}

#[test]
#[traced_test]
fn packs_a_site_into_source_and_blob() -> Result<(), Box<dyn Error>> {
    let dir = site();
    let summary = PackConfig::new([dir.path().join("public")])
        .variable("ASSETS")
        .exclude("*.map")
        .validate()?
        .pack()?;

    assert_eq!(summary.files, 3);
    assert_eq!(summary.source, dir.path().join("public.gen.rs"));
    let blob_path = summary.blob.clone().unwrap();
    assert_eq!(blob_path, dir.path().join("public.brfs"));

    let code = fs::read_to_string(&summary.source)?;
    assert!(code.contains("pub static ASSETS: ::brfs::Embedded"));
    assert!(code.contains("include_bytes!(\"public.brfs\")"));

    let vfs = brfs::load(&blob_path)?;
    assert_eq!(vfs.read("index.html")?, "<h1>hello</h1>\n".repeat(40).as_bytes());
    assert_eq!(vfs.read("js/app.js")?, b"console.log(1)\n");
    assert!(!vfs.exists("js/app.js.map"));
    assert!(logs_contain("filtered out"));
    assert!(logs_contain("wrote bundle"));
    Ok(())
}

#[test]
fn inline_output_contains_the_blob() -> Result<(), Box<dyn Error>> {
    let dir = site();
    let output = dir.path().join("gen/assets.rs");
    fs::create_dir_all(output.parent().unwrap())?;
    let summary = PackConfig::new([dir.path().join("public/js")])
        .output(&output)
        .include("*.js")
        .inline(true)
        .validate()?
        .pack()?;

    assert_eq!(summary.files, 1);
    assert_eq!(summary.blob, None);
    assert!(!dir.path().join("gen/assets.brfs").exists());
    let code = fs::read_to_string(dir.path().join("gen/assets.gen.rs"))?;
    assert!(code.contains("pub static br: ::brfs::Embedded = ::brfs::Embedded::new(b\""));

    // Read the literal the way rustc would and load it as a bundle.
    let start = code.find("b\"").unwrap();
    let end = code.rfind(')').unwrap();
    let blob = syn::parse_str::<syn::LitByteStr>(&code[start..end])?.value();
    let vfs = brfs::Vfs::new(blob)?;
    assert_eq!(vfs.read("app.js")?, b"console.log(1)\n");
    Ok(())
}

#[test]
fn invalid_options_write_nothing() {
    let dir = site();
    let public = dir.path().join("public");
    let err = PackConfig::new([&public])
        .include("*.html")
        .exclude("*.css")
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingFilters));
    assert!(!dir.path().join("public.gen.rs").exists());
    assert!(!dir.path().join("public.brfs").exists());
}

#[test]
fn pack_helper_round_trips_a_folder() -> Result<(), Box<dyn Error>> {
    let dir = site();
    let target = dir.path().join("site.brfs");
    brfs::pack(dir.path().join("public"), &target)?;
    let vfs = brfs::load(&target)?;
    let names: Vec<String> = vfs.read_dir("/")?.map(|e| e.file_name().to_string()).collect();
    assert_eq!(names, ["css", "index.html", "js"]);
    assert_eq!(vfs.read_dir("js")?.count(), 2);
    Ok(())
}

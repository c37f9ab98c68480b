mod common;

use common::project;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn skald(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skald"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn build(source: &Path, output: &Path) -> Output {
    skald(&[
        "build",
        "--source",
        source.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--threads",
        "2",
    ])
}

#[test]
fn test_build_exits_zero() {
    let project = project();
    let out = project.path().join("out");
    let output = build(project.path(), &out);
    assert_eq!(Some(0), output.status.code(), "{:?}", output);
    assert!(out.join("index.html").is_file());
    assert!(out.join("static/style.css").is_file());
}

#[test]
fn test_build_errors_exit_one() {
    let project = project();
    let root = project.path();

    // output over the project root
    assert_eq!(Some(1), build(root, root).status.code());
    assert!(root.join("static/style.css").is_file());

    // missing source directory
    let missing = root.join("missing");
    assert_eq!(Some(1), build(&missing, &root.join("out")).status.code());

    // unparseable thread count
    let status = skald(&["build", "-s", root.to_str().unwrap(), "-j", "many"]).status;
    assert_eq!(Some(1), status.code());

    // duplicate slug
    let posts = root.join("_posts");
    fs::copy(
        posts.join("2021-04-03-grpc-streaming.md"),
        posts.join("2021-04-03-gRPC_Streaming.md"),
    )
    .unwrap();
    assert_eq!(Some(1), build(root, &root.join("out")).status.code());
    assert!(!root.join("out").exists());
}

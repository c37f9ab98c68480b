mod common;

use common::project;
use skald::build::{self, build_site, BuildStats};
use skald::config::Config;
use skald::index::CategoryIndex;
use skald::registry::{self, Error as LoadError};
use skald::render::Error as RenderError;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn config(project: &Path, threads: usize) -> Config {
    Config::from_directory(project, Some(&project.join("out")), Some(threads)).unwrap()
}

/// Lists every file under `dir` with its contents, sorted by relative path.
fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            files.push((
                entry.path().strip_prefix(dir).unwrap().to_owned(),
                fs::read(entry.path()).unwrap(),
            ));
        }
    }
    files
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

#[test]
fn test_build_site() {
    let project = project();
    let config = config(project.path(), 1);
    let stats = build_site(&config).unwrap();
    assert_eq!(
        BuildStats {
            posts: 2,
            categories: 2,
            pages: 7,
            static_files: 1,
        },
        stats
    );

    let out = project.path().join("out");
    let paths: Vec<String> = snapshot(&out)
        .into_iter()
        .map(|(path, _)| path.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(
        vec![
            "categories/dotnet/index.html",
            "categories/grpc/index.html",
            "feed.atom",
            "index.html",
            "pages/index.html",
            "posts/2021-03-27-tuning-kestrel.html",
            "posts/2021-04-03-grpc-streaming.html",
            "static/style.css",
        ],
        paths
    );

    let grpc = read(out.join("posts/2021-04-03-grpc-streaming.html"));
    assert!(grpc.contains("<title>gRPC streaming in ASP.NET Core</title>"));
    assert!(grpc.contains(
        r#"<a href="https://notes.example.org/index.html">Field Notes</a>"#
    ));
    assert!(grpc.contains(
        r#"href="https://notes.example.org/posts/2021-03-27-tuning-kestrel.html">Kestrel tuning</a>"#
    ));
    assert!(grpc.contains(
        r#"<a href="https://notes.example.org/categories/grpc/index.html">grpc</a>"#
    ));
    assert!(grpc.contains(
        r#"<a rel="next" href="https://notes.example.org/posts/2021-03-27-tuning-kestrel.html">older</a>"#
    ));
    assert!(!grpc.contains(r#"rel="prev""#));

    let home = read(out.join("index.html"));
    assert_eq!(home, read(out.join("pages/index.html")));
    let (newer, older) = (
        home.find("gRPC streaming").unwrap(),
        home.find("Tuning Kestrel").unwrap(),
    );
    assert!(newer < older);
    assert!(home.contains("Read more"));
    assert!(!home.contains("MaxConcurrentConnections"));

    let dotnet = read(out.join("categories/dotnet/index.html"));
    assert!(dotnet.contains("<h1>Posts in dotnet</h1>"));
    assert!(
        dotnet.find("gRPC streaming").unwrap() < dotnet.find("Tuning Kestrel").unwrap()
    );
    let grpc_index = read(out.join("categories/grpc/index.html"));
    assert!(!grpc_index.contains("Tuning Kestrel"));

    let feed = read(out.join("feed.atom"));
    assert!(feed.contains("<updated>2021-04-03T00:00:00+00:00</updated>"));
    assert!(feed.contains("<name>Kim Doe</name>"));
}

#[test]
fn test_build_is_idempotent() {
    let project = project();
    let out = project.path().join("out");

    build_site(&config(project.path(), 1)).unwrap();
    let first = snapshot(&out);
    build_site(&config(project.path(), 4)).unwrap();
    assert_eq!(first, snapshot(&out));
}

#[test]
fn test_build_keeps_unmanaged_files() {
    let project = project();
    let out = project.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("CNAME"), "notes.example.org").unwrap();
    fs::create_dir_all(out.join("posts")).unwrap();
    fs::write(out.join("posts/2020-01-01-deleted.html"), "stale").unwrap();

    build_site(&config(project.path(), 1)).unwrap();
    assert!(out.join("CNAME").exists());
    assert!(!out.join("posts/2020-01-01-deleted.html").exists());
}

#[test]
fn test_duplicate_slug_writes_nothing() {
    let project = project();
    let posts = project.path().join("_posts");
    fs::create_dir_all(posts.join("drafts")).unwrap();
    fs::copy(
        posts.join("2021-04-03-grpc-streaming.md"),
        posts.join("drafts/2021-04-03-gRPC_Streaming.md"),
    )
    .unwrap();

    for threads in &[1, 4] {
        match build_site(&config(project.path(), *threads)) {
            Err(build::Error::Load(LoadError::DuplicateSlug(err))) => {
                assert_eq!("2021-04-03-grpc-streaming", err.slug);
            }
            other => panic!("wanted duplicate slug error; found {:?}", other),
        }
    }
    assert!(snapshot(&project.path().join("out")).is_empty());
}

#[test]
fn test_malformed_front_matter_names_file() {
    let project = project();
    let bad = project.path().join("_posts/2021-05-01-broken.md");
    fs::write(&bad, "---\ntitle: [unclosed\n---\nbody\n").unwrap();

    match build_site(&config(project.path(), 1)) {
        Err(build::Error::Load(LoadError::Parse { path, .. })) => assert_eq!(bad, path),
        other => panic!("wanted parse error; found {:?}", other),
    }
    assert!(snapshot(&project.path().join("out")).is_empty());
}

#[test]
fn test_unknown_layout_leaves_previous_build() {
    let project = project();
    let out = project.path().join("out");
    build_site(&config(project.path(), 1)).unwrap();
    let before = snapshot(&out);

    fs::write(
        project.path().join("_posts/2021-05-01-gallery.md"),
        "---\ntitle: Gallery\nlayout: gallery\n---\n![a cat](cat.png)\n",
    )
    .unwrap();
    match build_site(&config(project.path(), 1)) {
        Err(build::Error::Render(RenderError::UnknownLayout(err))) => {
            assert_eq!("gallery", err.layout);
            assert_eq!("2021-05-01-gallery", err.page);
        }
        other => panic!("wanted unknown layout error; found {:?}", other),
    }
    assert_eq!(before, snapshot(&out));
}

#[test]
fn test_category_index_from_registry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("2021-01-01-a.md"),
        "---\ncategories: [x]\n---\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("2021-02-01-b.md"),
        "---\ncategories: [x, y]\n---\n",
    )
    .unwrap();

    let registry = registry::load(dir.path(), 2).unwrap();
    let index = CategoryIndex::build(&registry);
    let slugs = |category| {
        index
            .get(category)
            .unwrap()
            .iter()
            .map(|p| p.slug.clone())
            .collect::<Vec<String>>()
    };
    assert_eq!(vec!["2021-02-01-b", "2021-01-01-a"], slugs("x"));
    assert_eq!(vec!["2021-02-01-b"], slugs("y"));
}

#[test]
fn test_output_over_project_root_is_rejected() {
    let project = project();
    let root = project.path();
    assert!(Config::from_directory(root, Some(root), Some(1)).is_err());
    assert!(Config::from_directory(root, Some(&root.join("static")), Some(1)).is_err());
    assert!(root.join("static/style.css").is_file());
}

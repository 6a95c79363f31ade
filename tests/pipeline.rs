//! End-to-end pipeline tests over a fixture project built in a temp
//! directory: config cascade, template composition, category gathering,
//! pruning, listing depth, and incremental skip behavior.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use stilt::config;
use stilt::content::ContentTree;
use stilt::mirror::DirNode;
use stilt::render::Site;
use stilt::templates::TemplateDir;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A minimal project: one "blog" section with a single listing depth,
/// two categories, and one page.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "config/_site.yaml", "name: Demo\nvars:\n  motto: hello\n");
    write(
        root,
        "config/blog.yaml",
        concat!(
            "name: Blog\n",
            "templates:\n",
            "  content: entry\n",
            "  category: cat\n",
            "  listings:\n",
            "    - front\n",
            "categories:\n",
            "  - name: Tutorials\n",
            "  - name: Notes\n",
        ),
    );
    write(root, "templates/layout.html", "[{{ page.content }}]");
    write(root, "templates/blog/entry.html", "BODY");
    write(
        root,
        "templates/blog/front.html",
        "{% for p in pages %}{{ p.title }};{% endfor %}",
    );
    write(
        root,
        "templates/blog/cat.html",
        "{% for p in pages %}{{ p.title }};{% endfor %}",
    );
    write(root, "content/blog/first.html", "first body");
    tmp
}

/// One full build pass, the way the binary wires it.
fn build(root: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let conf = config::load(root)?;
    let tmpls = TemplateDir::load(&root.join("templates"))?;
    let content = ContentTree::new(&root.join("content"))?;
    let out = root.join("build");
    fs::create_dir_all(&out)?;
    let mut dst = DirNode::build(&out)?;
    let site = Site::new(&conf, &tmpls)?;
    site.render(&content, &mut dst, force)?;
    Ok(())
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[test]
fn two_pass_composition_wraps_content_in_layout() {
    let tmp = project();
    build(tmp.path(), false).unwrap();

    assert_eq!(read(tmp.path(), "build/blog/first.html"), "[BODY]");
}

#[test]
fn page_scope_carries_sidecar_fields_and_cascaded_vars() {
    let tmp = project();
    write(
        tmp.path(),
        "templates/blog/entry.html",
        "{{ page.title }}|{{ page.author }}|{{ page.category }}|{{ vars.motto }}",
    );
    write(tmp.path(), "templates/layout.html", "{{ page.content }}");
    write(
        tmp.path(),
        "content/blog/first.yaml",
        "title: First Post\nauthor: ada\ndate: 2021-06-01\ncategory: Tutorials\n",
    );

    build(tmp.path(), false).unwrap();
    assert_eq!(
        read(tmp.path(), "build/blog/first.html"),
        "First Post|ada|Tutorials|hello"
    );
}

#[test]
fn category_gathers_deep_pages_and_only_matching_ones() {
    let tmp = project();
    write(tmp.path(), "content/blog/a/b/c/deep.html", "deep body");
    write(
        tmp.path(),
        "content/blog/a/b/c/deep.yaml",
        "title: Deep Dive\ncategory: Tutorials\n",
    );
    write(tmp.path(), "content/blog/note.html", "note body");
    write(
        tmp.path(),
        "content/blog/note.yaml",
        "title: A Note\ncategory: Notes\n",
    );

    build(tmp.path(), false).unwrap();

    let tutorials = read(tmp.path(), "build/blog/tutorials/index.html");
    assert!(tutorials.contains("Deep Dive"));
    assert!(!tutorials.contains("A Note"));

    let notes = read(tmp.path(), "build/blog/notes/index.html");
    assert!(notes.contains("A Note"));
    assert!(!notes.contains("Deep Dive"));
}

#[test]
fn pruning_removes_only_directories_missing_from_source() {
    let tmp = project();
    write(tmp.path(), "content/blog/real/post.html", "kept");

    // A destination directory with no source counterpart.
    write(tmp.path(), "build/blog/stale/junk.html", "junk");

    build(tmp.path(), false).unwrap();

    assert!(!tmp.path().join("build/blog/stale").exists());
    assert!(tmp.path().join("build/blog/real/post.html").exists());
    // Category output is not prunable: it has no source directory.
    assert!(tmp.path().join("build/blog/tutorials/index.html").exists());

    // A second pass must leave category output alone too.
    build(tmp.path(), false).unwrap();
    assert!(tmp.path().join("build/blog/tutorials/index.html").exists());
}

#[test]
fn stale_destination_section_is_removed() {
    let tmp = project();
    write(tmp.path(), "build/oldsect/page.html", "old");

    build(tmp.path(), false).unwrap();
    assert!(!tmp.path().join("build/oldsect").exists());
    assert!(tmp.path().join("build/blog").exists());
}

#[test]
fn listing_list_exhausts_with_depth() {
    let tmp = project();
    write(tmp.path(), "content/blog/sub/post.html", "nested");

    build(tmp.path(), false).unwrap();

    // One listing template: index at the section root only.
    assert!(tmp.path().join("build/blog/index.html").exists());
    assert!(!tmp.path().join("build/blog/sub/index.html").exists());
    // The nested page itself still renders.
    assert!(tmp.path().join("build/blog/sub/post.html").exists());
}

#[test]
fn directory_index_lists_pages_newest_first() {
    let tmp = project();
    write(
        tmp.path(),
        "content/blog/first.yaml",
        "title: January\ndate: 2021-01-01\n",
    );
    write(tmp.path(), "content/blog/second.html", "second body");
    write(
        tmp.path(),
        "content/blog/second.yaml",
        "title: June\ndate: 2021-06-01\n",
    );

    build(tmp.path(), false).unwrap();
    assert_eq!(read(tmp.path(), "build/blog/index.html"), "[June;January;]");
}

#[test]
fn unchanged_page_is_skipped_until_forced() {
    let tmp = project();
    build(tmp.path(), false).unwrap();
    let artifact = tmp.path().join("build/blog/first.html");
    let first_mtime = fs::metadata(&artifact).unwrap().modified().unwrap();

    // No input changed: the page artifact must not be rewritten.
    thread::sleep(Duration::from_millis(50));
    build(tmp.path(), false).unwrap();
    assert_eq!(
        fs::metadata(&artifact).unwrap().modified().unwrap(),
        first_mtime
    );

    // An edited content template is picked up.
    thread::sleep(Duration::from_millis(50));
    write(tmp.path(), "templates/blog/entry.html", "EDITED");
    build(tmp.path(), false).unwrap();
    assert_eq!(read(tmp.path(), "build/blog/first.html"), "[EDITED]");

    // Force rewrites even without changes.
    let edited_mtime = fs::metadata(&artifact).unwrap().modified().unwrap();
    thread::sleep(Duration::from_millis(50));
    build(tmp.path(), true).unwrap();
    assert!(fs::metadata(&artifact).unwrap().modified().unwrap() > edited_mtime);
}

#[test]
fn sidecar_edit_alone_triggers_a_rerender() {
    let tmp = project();
    write(tmp.path(), "templates/blog/entry.html", "{{ page.title }}");
    write(tmp.path(), "content/blog/first.yaml", "title: Before\n");
    build(tmp.path(), false).unwrap();
    assert_eq!(read(tmp.path(), "build/blog/first.html"), "[Before]");

    thread::sleep(Duration::from_millis(50));
    write(tmp.path(), "content/blog/first.yaml", "title: After\n");
    build(tmp.path(), false).unwrap();
    assert_eq!(read(tmp.path(), "build/blog/first.html"), "[After]");
}

#[test]
fn unsupported_content_is_skipped_without_aborting() {
    let tmp = project();
    write(tmp.path(), "content/blog/draft.md", "# not renderable");

    build(tmp.path(), false).unwrap();
    assert!(!tmp.path().join("build/blog/draft.html").exists());
    assert!(tmp.path().join("build/blog/first.html").exists());
}

#[test]
fn section_without_config_is_skipped() {
    let tmp = project();
    write(tmp.path(), "content/misc/loose.html", "loose");

    build(tmp.path(), false).unwrap();
    assert!(!tmp.path().join("build/misc").exists());
    assert!(tmp.path().join("build/blog/first.html").exists());
}

#[test]
fn missing_layout_is_an_error() {
    let tmp = project();
    fs::remove_file(tmp.path().join("templates/layout.html")).unwrap();
    assert!(build(tmp.path(), false).is_err());
}

#[test]
fn missing_content_template_is_an_error() {
    let tmp = project();
    fs::remove_file(tmp.path().join("templates/blog/entry.html")).unwrap();
    assert!(build(tmp.path(), false).is_err());
}

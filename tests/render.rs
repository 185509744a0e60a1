use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use blogsync::load_config::{Entry, SiteConfig, SiteIndex, SitePaths};
use blogsync::render::{
    escape_html, escape_xml, fill, is_up_to_date, render_index, render_rss, RenderError,
    SiteRenderer,
};
use filetime::{set_file_mtime, FileTime};
use tempfile::tempdir;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn entry(title: &str, name: &str) -> Entry {
    Entry {
        title: title.to_string(),
        source: PathBuf::from(format!("{name}.md")),
        output: PathBuf::from(format!("posts/{name}.html")),
        date: Some("2024-03-01".to_string()),
    }
}

fn site(root: &Path, entries: Vec<Entry>) -> SiteConfig {
    let paths = SitePaths::under(root);
    fs::create_dir_all(&paths.content_root).unwrap();
    fs::create_dir_all(&paths.template_root).unwrap();
    fs::write(
        paths.template_root.join("entry.html"),
        "<title>{{ title }} - {{ site_title }}</title><time>{{ date }}</time>{{ content }}",
    )
    .unwrap();
    fs::write(
        paths.template_root.join("index.html"),
        "<h1>{{ site_title }}</h1>{{ entries }}",
    )
    .unwrap();
    SiteConfig {
        index: SiteIndex {
            title: "Notes & Things".to_string(),
            ftp_host: String::new(),
            ftp_user: String::new(),
            ftp_dir: String::new(),
            ftp_port: 21,
            entries,
        },
        paths,
    }
}

fn touch(path: &Path, modified: SystemTime) {
    set_file_mtime(path, FileTime::from_system_time(modified)).unwrap();
}

#[test]
fn build_renders_entries_and_front_page() {
    let root = tempdir().unwrap();
    let config = site(root.path(), vec![entry("Hello <World>", "hello")]);
    fs::write(config.paths.content_root.join("hello.md"), "# Heading\n\nSome *text*.\n").unwrap();

    let report = SiteRenderer::new(&config).build().unwrap();

    let page = fs::read_to_string(config.paths.output_root.join("posts/hello.html")).unwrap();
    assert!(page.contains("<title>Hello &lt;World&gt; - Notes &amp; Things</title>"));
    assert!(page.contains("<time>2024-03-01</time>"));
    assert!(page.contains("<h1>Heading</h1>"));
    assert!(page.contains("<em>text</em>"));

    let front = fs::read_to_string(config.paths.output_root.join("index.html")).unwrap();
    assert!(front.contains("<h1>Notes &amp; Things</h1>"));
    assert!(front.contains("<li><a href=\"posts/hello.html\">Hello &lt;World&gt;</a></li>"));

    assert_eq!(report.rendered.len(), 2);
    assert!(report.skipped.is_empty());
}

#[test]
fn build_skips_entries_whose_output_is_newer() {
    let root = tempdir().unwrap();
    let config = site(root.path(), vec![entry("Old", "old"), entry("New", "new")]);
    let paths = &config.paths;

    fs::write(paths.content_root.join("old.md"), "old").unwrap();
    fs::write(paths.content_root.join("new.md"), "new").unwrap();
    fs::create_dir_all(paths.output_root.join("posts")).unwrap();
    fs::write(paths.output_root.join("posts/old.html"), "kept").unwrap();
    touch(&paths.content_root.join("old.md"), at(1_000));
    touch(&paths.output_root.join("posts/old.html"), at(2_000));

    let report = SiteRenderer::new(&config).build().unwrap();

    assert_eq!(report.skipped, vec![paths.output_root.join("posts/old.html")]);
    assert_eq!(
        fs::read_to_string(paths.output_root.join("posts/old.html")).unwrap(),
        "kept"
    );
    assert!(paths.output_root.join("posts/new.html").exists());
}

#[test]
fn output_with_equal_mtime_is_rebuilt() {
    let root = tempdir().unwrap();
    let source = root.path().join("a.md");
    let output = root.path().join("a.html");
    fs::write(&source, "a").unwrap();
    fs::write(&output, "a").unwrap();
    touch(&source, at(1_000));
    touch(&output, at(1_000));
    assert!(!is_up_to_date(&source, &output));

    touch(&output, at(1_001));
    assert!(is_up_to_date(&source, &output));
    assert!(!is_up_to_date(&source, &root.path().join("missing.html")));
}

#[test]
fn missing_template_is_reported() {
    let root = tempdir().unwrap();
    let config = site(root.path(), Vec::new());
    fs::remove_file(config.paths.template_root.join("entry.html")).unwrap();

    let err = SiteRenderer::new(&config).build().unwrap_err();
    assert!(matches!(err, RenderError::Template { .. }));
}

#[test]
fn missing_source_is_reported() {
    let root = tempdir().unwrap();
    let config = site(root.path(), vec![entry("Gone", "gone")]);
    let err = SiteRenderer::new(&config).build().unwrap_err();
    assert!(matches!(err, RenderError::Source { path, .. } if path.ends_with("gone.md")));
}

#[test]
fn fill_accepts_both_placeholder_spellings() {
    let out = fill("{{ a }}/{{a}}/{{ b }}", &[("a", "1")]);
    assert_eq!(out, "1/1/{{ b }}");
}

#[test]
fn index_lists_entries_in_order() {
    let out = render_index(
        "{{ entries }}",
        "t",
        &[entry("One", "one"), entry("Two", "two")],
    );
    let one = out.find("One").unwrap();
    let two = out.find("Two").unwrap();
    assert!(one < two);
    assert!(out.starts_with("<ul>") && out.ends_with("</ul>"));
}

#[test]
fn escape_html_covers_markup_characters() {
    assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
}

#[test]
fn build_writes_feed_and_archives_when_templates_exist() {
    let root = tempdir().unwrap();
    let mut second = entry("Tips & <Tricks>", "tips");
    second.date = None;
    let config = site(root.path(), vec![entry("Hello", "hello"), second]);
    let paths = &config.paths;
    fs::write(paths.content_root.join("hello.md"), "hi").unwrap();
    fs::write(paths.content_root.join("tips.md"), "tips").unwrap();
    fs::write(
        paths.template_root.join("rss.xml"),
        "<rss><channel><title>{{ site_title }}</title>{{ items }}</channel></rss>",
    )
    .unwrap();
    fs::write(
        paths.template_root.join("archives.html"),
        "<h1>{{ site_title }} archives</h1>{{ entries }}",
    )
    .unwrap();

    let report = SiteRenderer::new(&config).build().unwrap();
    assert!(report.rendered.contains(&paths.output_root.join("rss.xml")));
    assert!(report.rendered.contains(&paths.output_root.join("archives.html")));

    let feed = fs::read_to_string(paths.output_root.join("rss.xml")).unwrap();
    assert!(feed.contains("<title>Notes &amp; Things</title>"));
    assert!(feed.contains(
        "<item><title>Hello</title><link>posts/hello.html</link><pubDate>2024-03-01</pubDate></item>"
    ));
    assert!(feed.contains(
        "<item><title>Tips &amp; &lt;Tricks&gt;</title><link>posts/tips.html</link></item>"
    ));

    let archives = fs::read_to_string(paths.output_root.join("archives.html")).unwrap();
    assert!(archives.contains("<h1>Notes &amp; Things archives</h1>"));
    assert!(archives.contains("<li><time>2024-03-01</time> <a href=\"posts/hello.html\">Hello</a></li>"));
    assert!(archives.contains("<li><time></time> <a href=\"posts/tips.html\">Tips &amp; &lt;Tricks&gt;</a></li>"));
}

#[test]
fn feed_and_archives_are_skipped_without_templates() {
    let root = tempdir().unwrap();
    let config = site(root.path(), Vec::new());

    let report = SiteRenderer::new(&config).build().unwrap();
    assert_eq!(report.rendered, vec![config.paths.output_root.join("index.html")]);
    assert!(!config.paths.output_root.join("rss.xml").exists());
    assert!(!config.paths.output_root.join("archives.html").exists());
}

#[test]
fn feed_items_are_xml_escaped() {
    let mut item = entry("Rock 'n' roll", "rock");
    item.date = Some("Mon, 01 Jan 2024 <noon>".to_string());
    let feed = render_rss("{{ items }}", "t", &[item]);
    assert_eq!(
        feed,
        "<item><title>Rock &apos;n&apos; roll</title><link>posts/rock.html</link>\
         <pubDate>Mon, 01 Jan 2024 &lt;noon&gt;</pubDate></item>"
    );
    assert_eq!(escape_xml("a'b\"c"), "a&apos;b&quot;c");
}

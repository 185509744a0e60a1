/// `render` module: the build stage that turns the site index into files in
/// the output tree.
///
/// Each entry's markdown source is rendered into `templates/entry.html`; the
/// front page is rendered into `templates/index.html`. Placeholders use the
/// `{{ name }}` form and are substituted literally.
///
/// The RSS feed (`templates/rss.xml`) and the archives page
/// (`templates/archives.html`) are rendered when their template exists.
use crate::load_config::{Entry, SiteConfig};
use pulldown_cmark::{html, Options, Parser};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

pub const ENTRY_TEMPLATE: &str = "entry.html";
pub const INDEX_TEMPLATE: &str = "index.html";
pub const INDEX_OUTPUT: &str = "index.html";
pub const RSS_TEMPLATE: &str = "rss.xml";
pub const RSS_OUTPUT: &str = "rss.xml";
pub const ARCHIVES_TEMPLATE: &str = "archives.html";
pub const ARCHIVES_OUTPUT: &str = "archives.html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read entry source {path:?}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub struct SiteRenderer<'a> {
    config: &'a SiteConfig,
}

impl<'a> SiteRenderer<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self { config }
    }

    /// Renders every stale entry and rewrites the front page, feed and archives.
    pub fn build(&self) -> Result<RenderReport, RenderError> {
        let paths = &self.config.paths;
        info!(entries = self.config.index.entries.len(), output_root = %paths.output_root.display(), "[BUILD] starting");

        let entry_template = read_template(&paths.template_root.join(ENTRY_TEMPLATE))?;
        let mut report = RenderReport::default();

        for entry in &self.config.index.entries {
            let source = paths.content_root.join(&entry.source);
            let output = paths.output_root.join(&entry.output);

            if is_up_to_date(&source, &output) {
                println!("Skipping entry {}", entry.source.display());
                debug!(source = %source.display(), "[BUILD] output newer than source");
                report.skipped.push(output);
                continue;
            }

            let markdown = fs::read_to_string(&source).map_err(|e| {
                error!(error = ?e, source = %source.display(), "[BUILD][ERROR] cannot read entry source");
                RenderError::Source {
                    path: source.clone(),
                    source: e,
                }
            })?;
            let page = render_entry(&entry_template, &self.config.index.title, entry, &markdown);
            write_output(&output, &page)?;
            info!(output = %output.display(), "[BUILD] rendered entry");
            report.rendered.push(output);
        }

        let index_template = read_template(&paths.template_root.join(INDEX_TEMPLATE))?;
        let front = render_index(
            &index_template,
            &self.config.index.title,
            &self.config.index.entries,
        );
        let front_path = paths.output_root.join(INDEX_OUTPUT);
        write_output(&front_path, &front)?;
        report.rendered.push(front_path);

        let listings: [(&str, &str, ListingRenderer); 2] = [
            (RSS_TEMPLATE, RSS_OUTPUT, render_rss),
            (ARCHIVES_TEMPLATE, ARCHIVES_OUTPUT, render_archives),
        ];
        for (template_name, output_name, render) in listings {
            let template_path = paths.template_root.join(template_name);
            let Some(template) = read_optional_template(&template_path)? else {
                debug!(template = %template_path.display(), "[BUILD] no template, skipping page");
                continue;
            };
            let page = render(&template, &self.config.index.title, &self.config.index.entries);
            let output = paths.output_root.join(output_name);
            write_output(&output, &page)?;
            report.rendered.push(output);
        }

        info!(
            rendered = report.rendered.len(),
            skipped = report.skipped.len(),
            "[BUILD] complete"
        );
        Ok(report)
    }
}

/// True when `output` exists and was modified strictly after `source`.
pub fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(out)) => out > src,
        _ => false,
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn render_entry(template: &str, site_title: &str, entry: &Entry, markdown: &str) -> String {
    let site_title = escape_html(site_title);
    let title = escape_html(&entry.title);
    let date = escape_html(entry.date.as_deref().unwrap_or(""));
    let content = markdown_to_html(markdown);
    fill(
        template,
        &[
            ("site_title", site_title.as_str()),
            ("title", title.as_str()),
            ("date", date.as_str()),
            ("content", content.as_str()),
        ],
    )
}

type ListingRenderer = fn(&str, &str, &[Entry]) -> String;

/// Site-relative link to an entry's output, `/`-separated.
pub fn entry_href(entry: &Entry) -> String {
    entry
        .output
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn render_index(template: &str, site_title: &str, entries: &[Entry]) -> String {
    let mut list = String::from("<ul>\n");
    for entry in entries {
        list.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&entry_href(entry)),
            escape_html(&entry.title)
        ));
    }
    list.push_str("</ul>");
    let site_title = escape_html(site_title);
    fill(
        template,
        &[("site_title", site_title.as_str()), ("entries", list.as_str())],
    )
}

/// Feed template: `{{ site_title }}` and `{{ items }}`, one `<item>` per entry.
pub fn render_rss(template: &str, site_title: &str, entries: &[Entry]) -> String {
    let mut items = String::new();
    for entry in entries {
        items.push_str("<item>");
        items.push_str(&format!("<title>{}</title>", escape_xml(&entry.title)));
        items.push_str(&format!("<link>{}</link>", escape_xml(&entry_href(entry))));
        if let Some(date) = &entry.date {
            items.push_str(&format!("<pubDate>{}</pubDate>", escape_xml(date)));
        }
        items.push_str("</item>\n");
    }
    let site_title = escape_xml(site_title);
    fill(
        template,
        &[("site_title", site_title.as_str()), ("items", items.trim_end())],
    )
}

/// Archives template: `{{ site_title }}` and `{{ entries }}`, every entry with its date.
pub fn render_archives(template: &str, site_title: &str, entries: &[Entry]) -> String {
    let mut list = String::from("<ul>\n");
    for entry in entries {
        let date = entry.date.as_deref().unwrap_or("");
        list.push_str(&format!(
            "<li><time>{}</time> <a href=\"{}\">{}</a></li>\n",
            escape_html(date),
            escape_html(&entry_href(entry)),
            escape_html(&entry.title)
        ));
    }
    list.push_str("</ul>");
    let site_title = escape_html(site_title);
    fill(
        template,
        &[("site_title", site_title.as_str()), ("entries", list.as_str())],
    )
}

/// Replaces `{{ key }}` (with or without inner spaces) for every pair.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out
            .replace(&format!("{{{{ {key} }}}}"), value)
            .replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// XML text escaping; uses `&apos;`, which HTML 4 lacks.
pub fn escape_xml(text: &str) -> String {
    escape_html(text).replace("&#39;", "&apos;")
}

fn read_optional_template(path: &Path) -> Result<Option<String>, RenderError> {
    match fs::read_to_string(path) {
        Ok(template) => Ok(Some(template)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!(error = ?e, template = %path.display(), "[BUILD][ERROR] cannot read template");
            Err(RenderError::Template {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

fn read_template(path: &Path) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, template = %path.display(), "[BUILD][ERROR] cannot read template");
        RenderError::Template {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn write_output(path: &Path, content: &str) -> Result<(), RenderError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|e| {
        error!(error = ?e, output = %path.display(), "[BUILD][ERROR] cannot write output");
        RenderError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

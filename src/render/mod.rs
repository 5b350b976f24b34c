//! Renders the download page from the manifest and release list. Tera with
//! an embedded default template; a `page.html` in the template directory
//! overrides it.

use std::path::Path;

use serde::Serialize;

use crate::config::ShelfConfig;
use crate::error::Result;
use crate::manifest::TarballRecord;

pub const DEFAULT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>{{ page.title }}</title>
</head>
<body>
<center>
<h3>Download</h3>

<h4>Release Tarballs</h4>
<blockquote>
{% for release in releases %}<a href="{{ release.href }}">{{ release.name | escape }}</a><br>
{% endfor %}</blockquote>

<h4>Generated Tarballs</h4>
<table border=1 cellpadding=4 cellspacing=0 frame=box>
    <tr><th bgcolor=#AABBCC colspan=6>{{ page.heading }}</th></tr>

    <tr align=center bgcolor=#AABBCC>
        <td width=100>Version</td>
        <td width=150>Snapshot Date / Time</td>
        <td>Tarball Name</td>
        <td>Size</td>
        <td width=100>&nbsp;</td>
        <td>&nbsp;</td>
    </tr>

    <tr>
    <th colspan=6 bgcolor=#DDDDDD align=left>
      <form method="post" action="/generate">
        <input type="submit" name="submit" value="Generate">
      </form>
    </th>
    </tr>

    {% for row in rows %}<tr align=center>
        <td>{{ row.version | escape }}</td>
        <td>{{ row.date }} &nbsp;/&nbsp; {{ row.time }}</td>
        <td align=left><a href="{{ row.href }}">{{ row.filename | escape }}</a></td>
        <td>{{ row.size }}</td>
        <td><a href="{{ row.href }}"><input type="button" value="Download"></a></td>
        <td>
            <form method="post" action="/delete">
            <input type="hidden" name="filename" value="{{ row.delete_value | escape }}">
            <input type="submit" value="Delete">
            </form>
        </td>
    </tr>
    {% endfor %}
</table>
<p>
<a href="/"><input type="button" value="&lt;- Back"></a>
</center>
</body>
</html>
"#;

#[derive(Serialize)]
struct PageMeta<'a> {
    title: &'a str,
    heading: &'a str,
}

#[derive(Serialize)]
struct ReleaseLink {
    name: String,
    href: String,
}

#[derive(Serialize)]
struct Row {
    version: String,
    date: String,
    time: String,
    filename: String,
    href: String,
    size: String,
    delete_value: String,
}

/// Load Tera templates from the template directory, falling back to the
/// embedded default for `page.html`.
pub fn load_templates(template_dir: &Path) -> Result<tera::Tera> {
    let mut tera = if template_dir.exists() {
        let glob_pattern = format!("{}/**/*.html", template_dir.display());
        match tera::Tera::new(&glob_pattern) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("failed to parse user templates, using defaults: {e}");
                tera::Tera::default()
            }
        }
    } else {
        tera::Tera::default()
    };

    // Auto-escaping is off: hrefs are percent-encoded here and text cells go
    // through the explicit `escape` filter in the template.
    tera.autoescape_on(vec![]);

    if tera.get_template("page.html").is_err() {
        tera.add_raw_template("page.html", DEFAULT_PAGE)?;
    }

    Ok(tera)
}

/// Download href for an entry of one of the served directories. The relative
/// directory prefix is the URL namespace; only the entry name needs encoding.
pub fn download_href(dir_rel: &str, filename: &str) -> String {
    format!(
        "/{}/{}",
        dir_rel.trim_matches('/'),
        urlencoding::encode(filename)
    )
}

/// The page-relative path a delete form posts back, e.g.
/// `Download/Generated/pkg-200901151230.tar.gz`.
pub fn delete_value(dir_rel: &str, filename: &str) -> String {
    format!("{}/{}", dir_rel.trim_matches('/'), filename)
}

/// Render the full download page from an ordered manifest and release list.
pub fn render_page(
    tera: &tera::Tera,
    config: &ShelfConfig,
    manifest: &[TarballRecord],
    releases: &[String],
) -> Result<String> {
    let rows: Vec<Row> = manifest
        .iter()
        .map(|record| {
            let time = if record.version.is_empty() {
                String::new()
            } else {
                record.snapshot.time_label()
            };
            Row {
                version: record.version.clone(),
                date: record.snapshot.date_label(),
                time,
                filename: record.filename.clone(),
                href: download_href(&config.dirs.generated_dir, &record.filename),
                size: format!("{}K", record.size_kb),
                delete_value: delete_value(&config.dirs.generated_dir, &record.filename),
            }
        })
        .collect();

    let release_links: Vec<ReleaseLink> = releases
        .iter()
        .map(|name| ReleaseLink {
            name: name.clone(),
            href: download_href(&config.dirs.releases_dir, name),
        })
        .collect();

    let mut context = tera::Context::new();
    context.insert(
        "page",
        &PageMeta {
            title: &config.page.title,
            heading: &config.page.heading,
        },
    );
    context.insert("rows", &rows);
    context.insert("releases", &release_links);

    Ok(tera.render("page.html", &context)?)
}

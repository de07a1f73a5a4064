//! Defines the [`Property`] type and the [`Writer`] which regenerates a
//! property's stub pages on disk. This module owns the pipeline's only
//! mutation of persistent state: each property's output directory is removed
//! wholesale and rebuilt from the current set of values, so pages for values
//! no longer referenced by any post do not survive the run.

use gtmpl::{Context, Template, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

const PAGE_EXTENSION: &str = ".md";

/// The template applied to every stub page. The `layout` field names the
/// layout the downstream site generator renders the page with; the remaining
/// line binds the singular property name to the value as authored.
const PAGE_TEMPLATE: &str = "---
layout: {{.layout}}
{{.singular}}: {{.value}}
---
";

/// Maps a property name to the singular form used in the generated pages
/// (`categories/travel.md` declares `category: Travel`). Property names
/// without a known singular form map to themselves.
pub fn singular_form(name: &str) -> &str {
    match name {
        "categories" => "category",
        "tags" => "tag",
        _ => name,
    }
}

/// A categorical post property whose distinct values each get a stub page.
#[derive(Clone, Debug)]
pub struct Property {
    /// The property's name as it appears in post front matter, e.g.
    /// `categories`.
    pub name: String,

    /// The singular form used for the `layout` and value fields of the
    /// generated pages, e.g. `category`.
    pub singular: String,

    /// The directory into which the property's pages are written. The whole
    /// directory is deleted and recreated on every run.
    pub output_directory: PathBuf,
}

impl Property {
    /// Creates a property rooted at `root` with the singular form and output
    /// directory derived from `name`.
    pub fn new(name: &str, root: &Path) -> Property {
        Property {
            singular: singular_form(name).to_owned(),
            output_directory: root.join(name),
            name: name.to_owned(),
        }
    }
}

/// Parses the built-in stub page template.
pub fn page_template() -> Result<Template> {
    let mut template = Template::default();
    template.parse(PAGE_TEMPLATE)?;
    Ok(template)
}

/// Responsible for templating and writing a property's stub pages to disk.
pub struct Writer<'a> {
    /// The template for stub pages, normally [`page_template`].
    pub template: &'a Template,
}

impl Writer<'_> {
    /// Regenerates the pages for `property` from the values collected across
    /// all posts. The input may contain duplicates; values are deduplicated
    /// by exact string equality in first-seen order. The output directory is
    /// reset before anything is written, so an empty `values` leaves behind
    /// an existing-but-empty directory.
    ///
    /// Two values differing only in case are distinct values but share one
    /// lowercased file name; the first keeps the name and the conflict is
    /// reported on stderr rather than letting the last write win silently.
    pub fn write_pages(&self, property: &Property, values: &[String]) -> Result<()> {
        reset_dir(&property.output_directory)?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut claimed: HashMap<String, &str> = HashMap::new();
        for value in values {
            if !seen.insert(value) {
                continue;
            }
            let file_name = format!("{}{}", value.to_lowercase(), PAGE_EXTENSION);
            if let Some(holder) = claimed.get(&file_name) {
                eprintln!(
                    "Warning: {} `{}` and `{}` both map to `{}`; keeping `{}`",
                    property.singular,
                    holder,
                    value,
                    property.output_directory.join(&file_name).display(),
                    holder
                );
                continue;
            }
            let path = property.output_directory.join(&file_name);
            claimed.insert(file_name, value);
            println!("Writing {}", path.display());
            self.write_page(property, value, &path)?;
        }
        Ok(())
    }

    /// Templates a single stub page and writes it to `path`.
    fn write_page(&self, property: &Property, value: &str, path: &Path) -> Result<()> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "layout".to_owned(),
            Value::String(format!("{}page", property.singular)),
        );
        m.insert("singular".to_owned(), (&property.singular).into());
        m.insert("value".to_owned(), Value::String(value.to_owned()));

        let context = Context::from(Value::Object(m))?;
        self.template.execute(&mut File::create(path)?, &context)?;
        Ok(())
    }
}

/// Removes `dir` and everything in it (tolerating its absence), then
/// recreates it empty.
fn reset_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => (),
        Err(err) => match err.kind() {
            io::ErrorKind::NotFound => (),
            _ => {
                return Err(Error::Clean {
                    path: dir.to_owned(),
                    err,
                })
            }
        },
    }
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) => Err(Error::Clean {
            path: dir.to_owned(),
            err,
        }),
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while resetting an output directory.
    Clean { path: PathBuf, err: io::Error },

    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Clean { path, err } => {
                write!(f, "Resetting directory '{}': {}", path.display(), err)
            }
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Clean { path: _, err } => Some(err),
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

//! Defines the logic for pulling property values out of posts: scanning the
//! posts directory ([`scan`]) and parsing each post's front matter into a
//! [`Frontmatter`] from which the values of a named property can be read.
//! Post bodies are never parsed; everything after the closing fence is
//! ignored.

use std::{
    fmt,
    fs::{read_dir, File},
    io,
    path::{Path, PathBuf},
};

use serde_yaml::{Mapping, Value};

const MARKDOWN_EXTENSION: &str = ".md";

/// Searches a posts directory for post files (extension = `.md`) and returns
/// a lazy stream of their paths. Directory entries are yielded in whatever
/// order the OS reports them; downstream stages don't depend on ordering.
/// Nothing is cached, so every call re-reads the directory.
pub fn scan(dir: &Path) -> io::Result<impl Iterator<Item = io::Result<PathBuf>>> {
    Ok(read_dir(dir)?.filter_map(|result| match result {
        Err(err) => Some(Err(err)),
        Ok(entry) => {
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            if file_name.ends_with(MARKDOWN_EXTENSION) {
                Some(Ok(entry.path()))
            } else {
                None
            }
        }
    }))
}

/// The parsed front matter of a single post. Each post file must be
/// structured as follows:
///
/// 1. Initial front matter fence (`---`)
/// 2. YAML mapping with arbitrary fields
/// 3. Terminal front matter fence (`---`)
/// 4. Post body (ignored)
///
/// For example:
///
/// ```md
/// ---
/// title: Hello, world!
/// categories: Travel
/// tags: [greet, world]
/// ---
/// # Hello
///
/// World
/// ```
pub struct Frontmatter {
    mapping: Mapping,
}

impl Frontmatter {
    /// Reads and parses the front matter of the post file at `path`. Errors
    /// are annotated with the offending path.
    pub fn load(path: &Path) -> Result<Frontmatter> {
        match Frontmatter::load_file(path) {
            Ok(frontmatter) => Ok(frontmatter),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", path.display()),
                Box::new(e),
            )),
        }
    }

    fn load_file(path: &Path) -> Result<Frontmatter> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        Frontmatter::from_str(&contents)
    }

    /// Parses the front matter from a post's full raw text.
    pub fn from_str(input: &str) -> Result<Frontmatter> {
        Ok(Frontmatter {
            mapping: serde_yaml::from_str(front_matter(input)?)?,
        })
    }

    /// Returns the values of `property`, normalized to a flat list:
    ///
    /// * key missing or explicitly null → empty list
    /// * single scalar → one-element list
    /// * sequence → one element per entry (null entries are dropped)
    ///
    /// Scalar-vs-sequence discrimination inspects the parsed YAML node's
    /// variant; a value that is neither (a nested mapping or sequence of
    /// sequences) is an error.
    pub fn property_values(&self, property: &str) -> Result<Vec<String>> {
        match self.mapping.get(&Value::String(property.to_owned())) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(entries)) => {
                let mut values = Vec::with_capacity(entries.len());
                for entry in entries {
                    if let Some(value) = scalar_to_string(entry, property)? {
                        values.push(value);
                    }
                }
                Ok(values)
            }
            Some(scalar) => Ok(scalar_to_string(scalar, property)?.into_iter().collect()),
        }
    }
}

/// Locates the front matter in a post's raw text: the content between the
/// opening fence (which must be the first line) and the closing fence. A
/// fence is a line consisting solely of `---`; a `---` embedded in a longer
/// line doesn't count.
fn front_matter(input: &str) -> Result<&str> {
    const FENCE: &str = "---";
    let rest = match input.strip_prefix(FENCE) {
        Some(rest) if rest.is_empty() || rest.starts_with('\n') => rest,
        _ => return Err(Error::MissingOpeningFence),
    };

    // `rest` starts with the newline that terminated the opening fence line.
    let mut line_start = 1;
    while line_start <= rest.len() {
        let line = &rest[line_start..];
        if line == FENCE || (line.starts_with(FENCE) && line[FENCE.len()..].starts_with('\n')) {
            return Ok(&rest[..line_start]);
        }
        match line.find('\n') {
            Some(i) => line_start += i + 1,
            None => break,
        }
    }
    Err(Error::MissingClosingFence)
}

/// Renders a scalar YAML node as a property value. Nulls become `None` so
/// callers can drop them; booleans and numbers are stringified the same way
/// they would interpolate into the generated page.
fn scalar_to_string(value: &Value, property: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(Error::UnsupportedValue {
            property: property.to_owned(),
        }),
    }
}

/// Represents the result of a front-matter parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading property values out of a post.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting front matter
    /// fence (`---`).
    MissingOpeningFence,

    /// Returned when a post source file is missing its terminal front matter
    /// fence (`---` i.e., the starting fence was found but the ending one
    /// was missing).
    MissingClosingFence,

    /// Returned when there was an error parsing the front matter as a YAML
    /// mapping.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a property's value is neither a scalar nor a sequence
    /// of scalars.
    UnsupportedValue { property: String },

    /// Returned for other I/O errors.
    Io(io::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Whether this error describes the post's content (as opposed to an I/O
    /// failure reading it). Content errors are candidates for the
    /// skip-and-warn policy; I/O failures never are.
    pub fn is_format(&self) -> bool {
        match self {
            Error::MissingOpeningFence
            | Error::MissingClosingFence
            | Error::DeserializeYaml(_)
            | Error::UnsupportedValue { .. } => true,
            Error::Io(_) => false,
            Error::Annotated(_, err) => err.is_format(),
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingOpeningFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::MissingClosingFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::UnsupportedValue { property } => {
                write!(
                    f,
                    "Property `{}` must be a scalar or a list of scalars",
                    property
                )
            }
            Error::Io(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingOpeningFence => None,
            Error::MissingClosingFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::UnsupportedValue { .. } => None,
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
